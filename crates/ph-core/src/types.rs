//! Common data types for paramhist

use std::iter::FusedIterator;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Analytic integration capability advertised by a function for a set of variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegralCode {
    /// No analytic integral; the caller integrates numerically.
    None,
    /// Closed-form integral over the full observable set.
    AllObservables,
}

impl IntegralCode {
    /// Numeric code (`0` = none, `1` = all observables).
    pub fn code(self) -> i32 {
        match self {
            IntegralCode::None => 0,
            IntegralCode::AllObservables => 1,
        }
    }

    /// Parse a numeric code.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(IntegralCode::None),
            1 => Ok(IntegralCode::AllObservables),
            other => Err(Error::Validation(format!("unknown integral code {other}"))),
        }
    }

    /// `true` if an analytic integral is available.
    pub fn is_analytic(self) -> bool {
        self != IntegralCode::None
    }
}

/// Lazy sequence of points derived from the boundaries of one axis.
///
/// Produced by sampling-hint and bin-boundary queries. The sequence is finite,
/// cheap to clone (edges are reference counted) and can be restarted with
/// [`BoundaryPoints::restart`].
#[derive(Debug, Clone)]
pub struct BoundaryPoints {
    edges: Arc<[f64]>,
    lo: f64,
    hi: f64,
    /// Half-gap around each boundary; `None` yields the boundaries themselves.
    delta: Option<f64>,
    pos: usize,
    pending: Option<f64>,
}

impl BoundaryPoints {
    /// Relative widening applied to the queried range by [`Self::sampling_hint`].
    pub const WIDEN_FRACTION: f64 = 0.01;
    /// Gap around each boundary, relative to the widened range.
    pub const DELTA_FRACTION: f64 = 1e-8;

    /// An empty sequence.
    pub fn empty() -> Self {
        Self {
            edges: Arc::from(&[] as &[f64]),
            lo: 0.0,
            hi: 0.0,
            delta: None,
            pos: 0,
            pending: None,
        }
    }

    /// Pairs of points just left and right of every boundary in `[lo, hi]` widened
    /// by 1% of `hi - lo` on each side.
    pub fn sampling_hint(edges: Arc<[f64]>, lo: f64, hi: f64) -> Self {
        let pad = Self::WIDEN_FRACTION * (hi - lo);
        let (lo, hi) = (lo - pad, hi + pad);
        let delta = (hi - lo) * Self::DELTA_FRACTION;
        Self { edges, lo, hi, delta: Some(delta), pos: 0, pending: None }
    }

    /// The boundaries that fall inside `[lo, hi]`.
    pub fn boundaries(edges: Arc<[f64]>, lo: f64, hi: f64) -> Self {
        Self { edges, lo, hi, delta: None, pos: 0, pending: None }
    }

    /// Range the boundaries are matched against (after widening).
    pub fn range(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Rewind to the first point.
    pub fn restart(&mut self) {
        self.pos = 0;
        self.pending = None;
    }
}

impl Iterator for BoundaryPoints {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if let Some(p) = self.pending.take() {
            return Some(p);
        }
        while let Some(&b) = self.edges.get(self.pos) {
            self.pos += 1;
            if b >= self.lo && b <= self.hi {
                return match self.delta {
                    Some(d) => {
                        self.pending = Some(b + d);
                        Some(b - d)
                    }
                    None => Some(b),
                };
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = usize::from(self.pending.is_some());
        let per_edge = if self.delta.is_some() { 2 } else { 1 };
        let left = self.edges.len().saturating_sub(self.pos);
        (pending, Some(pending + per_edge * left))
    }
}

impl FusedIterator for BoundaryPoints {}

//! N-dimensional binned template.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ph_core::{Error, Result};

use crate::axis::Axis;

/// Template shared between functions. Updates through any handle are visible to all.
///
/// Only bin contents and errors can change through the handle. The axes, and so
/// the bin count, are fixed once the template is shared.
#[derive(Debug, Clone)]
pub struct SharedHist(Arc<RwLock<DataHist>>);

impl SharedHist {
    /// Wrap `hist` into a new shared handle.
    pub fn new(hist: DataHist) -> Self {
        Self(Arc::new(RwLock::new(hist)))
    }

    /// Read access to the template.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, DataHist>> {
        self.0.read().map_err(|_| Error::Computation("template lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DataHist>> {
        self.0.write().map_err(|_| Error::Computation("template lock poisoned".into()))
    }

    /// Overwrite the content of bin `bin`.
    pub fn set_weight(&self, bin: usize, w: f64) -> Result<()> {
        self.write()?.set_weight(bin, w)
    }

    /// Overwrite the error of bin `bin`.
    pub fn set_weight_error(&self, bin: usize, err: f64) -> Result<()> {
        self.write()?.set_weight_error(bin, err)
    }

    /// Add weight `w` at `x`. Returns the filled bin.
    pub fn fill(&self, x: &[f64], w: f64) -> Result<usize> {
        self.write()?.fill(x, w)
    }

    /// Total number of bins.
    pub fn n_bins(&self) -> Result<usize> {
        Ok(self.read()?.n_bins())
    }

    /// Whether both handles refer to the same template.
    pub fn ptr_eq(&self, other: &SharedHist) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Weighted bin contents over the cartesian product of one or more axes.
///
/// Global bin indices are row-major: the last axis varies fastest.
#[derive(Debug, Clone)]
pub struct DataHist {
    axes: Vec<Axis>,
    strides: Vec<usize>,
    weights: Vec<f64>,
    /// Sum of squared weights. `None` means Poisson errors, `sqrt(|w|)`.
    sumw2: Option<Vec<f64>>,
}

impl DataHist {
    /// Empty template (all contents zero).
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        let n = Self::validate_axes(&axes)?;
        let strides = Self::strides(&axes);
        Ok(Self { axes, strides, weights: vec![0.0; n], sumw2: None })
    }

    /// Template with given contents and optional per-bin errors.
    pub fn from_contents(
        axes: Vec<Axis>,
        contents: Vec<f64>,
        errors: Option<Vec<f64>>,
    ) -> Result<Self> {
        let n = Self::validate_axes(&axes)?;
        if contents.len() != n {
            return Err(Error::Validation(format!(
                "DataHist contents length mismatch: expected {n}, got {}",
                contents.len()
            )));
        }
        if let Some((i, w)) = contents.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(Error::Validation(format!(
                "DataHist contents[{i}] must be finite, got {w}"
            )));
        }
        let n_negative = contents.iter().filter(|w| **w < 0.0).count();
        if n_negative > 0 {
            log::warn!("DataHist has {n_negative} bins with negative content");
        }
        let sumw2 = match errors {
            None => None,
            Some(errs) => {
                if errs.len() != n {
                    return Err(Error::Validation(format!(
                        "DataHist errors length mismatch: expected {n}, got {}",
                        errs.len()
                    )));
                }
                if let Some((i, e)) =
                    errs.iter().enumerate().find(|(_, e)| !(e.is_finite() && **e >= 0.0))
                {
                    return Err(Error::Validation(format!(
                        "DataHist errors[{i}] must be finite and >=0, got {e}"
                    )));
                }
                Some(errs.iter().map(|e| e * e).collect())
            }
        };
        let strides = Self::strides(&axes);
        Ok(Self { axes, strides, weights: contents, sumw2 })
    }

    /// Wrap into a shared handle.
    pub fn into_shared(self) -> SharedHist {
        SharedHist::new(self)
    }

    fn validate_axes(axes: &[Axis]) -> Result<usize> {
        if axes.is_empty() {
            return Err(Error::Validation("DataHist requires at least one axis".into()));
        }
        let mut seen = HashSet::with_capacity(axes.len());
        for ax in axes {
            if !seen.insert(ax.name()) {
                return Err(Error::Validation(format!("duplicate axis name '{}'", ax.name())));
            }
        }
        axes.iter().try_fold(1usize, |acc, ax| {
            acc.checked_mul(ax.n_bins())
                .ok_or_else(|| Error::Validation("DataHist bin count overflows usize".into()))
        })
    }

    fn strides(axes: &[Axis]) -> Vec<usize> {
        let mut strides = vec![1usize; axes.len()];
        for i in (0..axes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * axes[i + 1].n_bins();
        }
        strides
    }

    /// Axes in observable order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Axis by name.
    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name() == name)
    }

    /// Position of the axis named `name`.
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name() == name)
    }

    /// Total number of bins.
    pub fn n_bins(&self) -> usize {
        self.weights.len()
    }

    /// Global bin index of the observable tuple `x`.
    pub fn resolve(&self, x: &[f64]) -> Result<usize> {
        if x.len() != self.axes.len() {
            return Err(Error::Index(format!(
                "expected {} observable values, got {}",
                self.axes.len(),
                x.len()
            )));
        }
        let mut idx = 0usize;
        for ((ax, &xi), &stride) in self.axes.iter().zip(x).zip(&self.strides) {
            let k = ax.bin_index(xi).ok_or_else(|| {
                Error::Index(format!(
                    "value {xi} outside axis '{}' [{}, {}]",
                    ax.name(),
                    ax.min(),
                    ax.max()
                ))
            })?;
            idx += k * stride;
        }
        Ok(idx)
    }

    /// Per-axis bin coordinates of global bin `bin`.
    pub fn bin_coordinates(&self, bin: usize) -> Result<Vec<usize>> {
        self.check_bin(bin)?;
        Ok(self
            .axes
            .iter()
            .zip(&self.strides)
            .map(|(ax, &stride)| (bin / stride) % ax.n_bins())
            .collect())
    }

    /// Global bin index from per-axis coordinates.
    pub fn bin_from_coordinates(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.axes.len() {
            return Err(Error::Validation(format!(
                "expected {} bin coordinates, got {}",
                self.axes.len(),
                coords.len()
            )));
        }
        let mut idx = 0usize;
        for ((ax, &c), &stride) in self.axes.iter().zip(coords).zip(&self.strides) {
            if c >= ax.n_bins() {
                return Err(Error::bin_out_of_range(c, ax.n_bins()));
            }
            idx += c * stride;
        }
        Ok(idx)
    }

    /// Center of global bin `bin`.
    pub fn bin_center(&self, bin: usize) -> Result<Vec<f64>> {
        let coords = self.bin_coordinates(bin)?;
        self.axes.iter().zip(coords).map(|(ax, c)| ax.bin_center(c)).collect()
    }

    /// Product of the bin widths of global bin `bin`.
    pub fn bin_volume(&self, bin: usize) -> Result<f64> {
        let coords = self.bin_coordinates(bin)?;
        self.axes.iter().zip(coords).try_fold(1.0, |v, (ax, c)| Ok(v * ax.bin_width(c)?))
    }

    /// Content of bin `bin`.
    pub fn weight(&self, bin: usize) -> Result<f64> {
        self.check_bin(bin)?;
        Ok(self.weights[bin])
    }

    /// Error of bin `bin`: `sqrt(sumw2)` if tracked, else `sqrt(|w|)`.
    pub fn weight_error(&self, bin: usize) -> Result<f64> {
        self.check_bin(bin)?;
        Ok(match &self.sumw2 {
            Some(s) => s[bin].sqrt(),
            None => self.weights[bin].abs().sqrt(),
        })
    }

    /// All contents in bin order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of all contents.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Overwrite the content of bin `bin`.
    pub fn set_weight(&mut self, bin: usize, w: f64) -> Result<()> {
        self.check_bin(bin)?;
        if !w.is_finite() {
            return Err(Error::Validation(format!("bin content must be finite, got {w}")));
        }
        self.weights[bin] = w;
        Ok(())
    }

    /// Overwrite the error of bin `bin`.
    pub fn set_weight_error(&mut self, bin: usize, err: f64) -> Result<()> {
        self.check_bin(bin)?;
        if !(err.is_finite() && err >= 0.0) {
            return Err(Error::Validation(format!("bin error must be finite and >=0, got {err}")));
        }
        self.sumw2_mut()[bin] = err * err;
        Ok(())
    }

    /// Add weight `w` at `x`. Returns the filled bin.
    pub fn fill(&mut self, x: &[f64], w: f64) -> Result<usize> {
        if !w.is_finite() {
            return Err(Error::Validation(format!("fill weight must be finite, got {w}")));
        }
        let bin = self.resolve(x)?;
        if w != 1.0 || self.sumw2.is_some() {
            self.sumw2_mut()[bin] += w * w;
        }
        self.weights[bin] += w;
        Ok(bin)
    }

    /// Switch to explicit squared-weight bookkeeping, seeded with Poisson errors.
    fn sumw2_mut(&mut self) -> &mut Vec<f64> {
        let weights = &self.weights;
        self.sumw2.get_or_insert_with(|| weights.iter().map(|w| w.abs()).collect())
    }

    fn check_bin(&self, bin: usize) -> Result<()> {
        if bin >= self.weights.len() {
            return Err(Error::bin_out_of_range(bin, self.weights.len()));
        }
        Ok(())
    }
}

//! One-dimensional binnings.

use std::sync::Arc;

use ph_core::{Error, Result};

/// A named axis partitioned into contiguous bins.
///
/// Bin `k` covers `[edges[k], edges[k+1])`; the last bin also contains the upper edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    edges: Arc<[f64]>,
    uniform: bool,
}

impl Axis {
    /// `n_bins` equal-width bins over `[min, max]`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, min: f64, max: f64) -> Result<Self> {
        let name = name.into();
        if n_bins == 0 {
            return Err(Error::Validation(format!("axis '{name}' requires at least 1 bin")));
        }
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(Error::Validation(format!(
                "axis '{name}' requires finite min < max, got ({min}, {max})"
            )));
        }
        let width = (max - min) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| min + width * i as f64).collect();
        edges.push(max);
        Ok(Self { name, edges: Arc::from(edges), uniform: true })
    }

    /// Bins with explicit, strictly increasing edges.
    pub fn variable(name: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if edges.len() < 2 {
            return Err(Error::Validation(format!(
                "axis '{name}' requires at least 2 bin edges, got {}",
                edges.len()
            )));
        }
        for (i, e) in edges.iter().enumerate() {
            if !e.is_finite() {
                return Err(Error::Validation(format!(
                    "axis '{name}' edges[{i}] must be finite, got {e}"
                )));
            }
            if i > 0 && edges[i - 1] >= *e {
                return Err(Error::Validation(format!(
                    "axis '{name}' edges must be strictly increasing, \
                     got edges[{}]={} and edges[{i}]={e}",
                    i - 1,
                    edges[i - 1],
                )));
            }
        }
        Ok(Self { name, edges: Arc::from(edges), uniform: false })
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the first bin.
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// All bin boundaries, ascending (length `n_bins + 1`).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Reference-counted handle to the boundaries.
    pub fn shared_edges(&self) -> Arc<[f64]> {
        Arc::clone(&self.edges)
    }

    /// `true` if the axis was built with equal-width bins.
    pub fn is_uniform(&self) -> bool {
        self.uniform
    }

    /// Width of bin `bin`.
    pub fn bin_width(&self, bin: usize) -> Result<f64> {
        self.check_bin(bin)?;
        Ok(self.edges[bin + 1] - self.edges[bin])
    }

    /// Center of bin `bin`.
    pub fn bin_center(&self, bin: usize) -> Result<f64> {
        self.check_bin(bin)?;
        Ok(0.5 * (self.edges[bin] + self.edges[bin + 1]))
    }

    /// Bin containing `x`, or `None` when `x` lies outside `[min, max]` or is not finite.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if !x.is_finite() || x < self.min() || x > self.max() {
            return None;
        }
        let n = self.n_bins();
        if x >= self.max() {
            return Some(n - 1);
        }
        // `k` is the number of edges <= x, so the bin is k-1.
        let k = self.edges.partition_point(|e| *e <= x);
        Some(k.saturating_sub(1).min(n - 1))
    }

    fn check_bin(&self, bin: usize) -> Result<()> {
        let n = self.n_bins();
        if bin >= n {
            return Err(Error::bin_out_of_range(bin, n));
        }
        Ok(())
    }
}

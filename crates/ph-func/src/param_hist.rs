//! Histogram function with one scale parameter per bin.
//!
//! Instead of the bare bin contents the function yields `gamma_i * bin_i`
//! (relative mode) or `gamma_i` (absolute mode). The `gamma_i` parameterize the
//! statistical uncertainty of a histogram template; combined with
//! [`crate::HistConstraint`] they implement the Barlow-Beeston method.

use std::collections::HashSet;
use std::sync::RwLockReadGuard;

use ph_binning::{DataHist, SharedHist};
use ph_core::{BoundaryPoints, Error, IntegralCode, RealFunction, Result};

use crate::store::{Parameter, ParameterStore};

/// Initial guess window for freshly created bin parameters.
pub const GAMMA_BOUNDS: (f64, f64) = (0.0, 1000.0);

/// Per-bin parameterized histogram function.
///
/// `Clone` keeps aliasing the same parameters and template.
#[derive(Debug, Clone)]
pub struct ParamHistFunc {
    name: String,
    observables: Vec<String>,
    hist: SharedHist,
    params: ParameterStore,
    relative: bool,
}

impl ParamHistFunc {
    /// Create a function owning one fresh parameter per bin of `hist`.
    ///
    /// Every parameter starts constant. In relative mode the value is `1` and the
    /// error `1/sqrt(nominal)`; in absolute mode the value is the nominal content
    /// and the error `sqrt(nominal)`. A relative-mode bin without positive content
    /// gets an infinite error (see [`Self::degenerate_bins`]).
    pub fn new(name: impl Into<String>, hist: SharedHist, relative: bool) -> Result<Self> {
        let name = name.into();
        let (observables, params) = {
            let h = hist.read()?;
            let mut params = Vec::with_capacity(h.n_bins());
            for (i, &nominal) in h.weights().iter().enumerate() {
                let (value, error) = if relative {
                    let error = if nominal > 0.0 {
                        1.0 / nominal.sqrt()
                    } else {
                        log::warn!(
                            "{name}: bin {i} has nominal content {nominal}; \
                             relative error seed set to +inf"
                        );
                        f64::INFINITY
                    };
                    (1.0, error)
                } else {
                    (nominal, nominal.abs().sqrt())
                };
                params.push(Parameter {
                    name: format!("{name}_gamma_bin_{i}"),
                    value,
                    error,
                    bounds: GAMMA_BOUNDS,
                    constant: true,
                });
            }
            (observable_names(&h), ParameterStore::from_parameters(params))
        };
        Ok(Self { name, observables, hist, params, relative })
    }

    /// Create a function over `hist` that reuses the parameters of `donor`.
    ///
    /// The parameters are aliased, not copied: setting a value through either
    /// function changes both.
    pub fn with_shared_params(
        name: impl Into<String>,
        hist: SharedHist,
        donor: &ParamHistFunc,
        relative: bool,
    ) -> Result<Self> {
        let name = name.into();
        let observables = {
            let h = hist.read()?;
            if h.n_bins() != donor.params.len() {
                return Err(Error::Validation(format!(
                    "{name}: template has {} bins but donor '{}' has {} parameters",
                    h.n_bins(),
                    donor.name,
                    donor.params.len()
                )));
            }
            observable_names(&h)
        };
        Ok(Self { name, observables, hist, params: donor.params.clone(), relative })
    }

    /// Copy of this function under another name, aliasing the same parameters.
    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self.clone() }
    }

    pub(crate) fn template(&self) -> Result<RwLockReadGuard<'_, DataHist>> {
        self.hist.read()
    }

    /// Handle to the template this function reads nominal contents from.
    pub fn shared_template(&self) -> &SharedHist {
        &self.hist
    }

    /// Parameter store (one parameter per bin).
    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    /// Whether parameters scale the nominal content.
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Number of bins (and parameters).
    pub fn n_bins(&self) -> usize {
        self.params.len()
    }

    /// Parameter value of bin `bin`.
    pub fn actual(&self, bin: usize) -> Result<f64> {
        self.params.get(bin)
    }

    /// Set the parameter value of bin `bin`.
    pub fn set_actual(&self, bin: usize, value: f64) -> Result<()> {
        self.params.set(bin, value)
    }

    /// Current template content of bin `bin`.
    pub fn nominal(&self, bin: usize) -> Result<f64> {
        self.template()?.weight(bin)
    }

    /// Current template error of bin `bin`.
    pub fn nominal_error(&self, bin: usize) -> Result<f64> {
        self.template()?.weight_error(bin)
    }

    /// Function value of bin `bin`, ignoring the observables.
    pub fn bin_value(&self, bin: usize) -> Result<f64> {
        let h = self.template()?;
        self.value_in(&h, bin)
    }

    fn value_in(&self, h: &DataHist, bin: usize) -> Result<f64> {
        let gamma = self.params.get(bin)?;
        Ok(if self.relative { gamma * h.weight(bin)? } else { gamma })
    }

    /// Evaluate `points` (row-major, one row per observable tuple) into `out`.
    pub fn evaluate_batch(&self, points: &[f64], out: &mut [f64]) -> Result<()> {
        let dim = self.observables.len();
        if points.len() != out.len() * dim {
            return Err(Error::Validation(format!(
                "{}: expected {} coordinates for {} points, got {}",
                self.name,
                out.len() * dim,
                out.len(),
                points.len()
            )));
        }
        let h = self.template()?;
        for (x, o) in points.chunks_exact(dim).zip(out.iter_mut()) {
            let bin = h.resolve(x)?;
            *o = self.value_in(&h, bin)?;
        }
        Ok(())
    }

    /// Relative-mode bins whose nominal content is not positive.
    pub fn degenerate_bins(&self) -> Result<Vec<usize>> {
        if !self.relative {
            return Ok(Vec::new());
        }
        let h = self.template()?;
        Ok(h.weights().iter().enumerate().filter(|(_, w)| !(**w > 0.0)).map(|(i, _)| i).collect())
    }

    /// Fail with [`Error::DegenerateBin`] on the first degenerate bin.
    pub fn check_degenerate(&self) -> Result<()> {
        match self.degenerate_bins()?.first() {
            Some(&bin) => Err(Error::DegenerateBin { bin }),
            None => Ok(()),
        }
    }
}

fn observable_names(h: &DataHist) -> Vec<String> {
    h.axes().iter().map(|a| a.name().to_string()).collect()
}

impl RealFunction for ParamHistFunc {
    fn name(&self) -> &str {
        &self.name
    }

    fn observables(&self) -> &[String] {
        &self.observables
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let h = self.template()?;
        let bin = h.resolve(x)?;
        self.value_in(&h, bin)
    }

    /// Only integration over exactly the full observable set is analytic.
    fn analytic_integral_code(&self, vars: &[&str]) -> IntegralCode {
        let requested: HashSet<&str> = vars.iter().copied().collect();
        let own: HashSet<&str> = self.observables.iter().map(String::as_str).collect();
        if requested == own { IntegralCode::AllObservables } else { IntegralCode::None }
    }

    /// Sum of all bin values times the bin volume.
    ///
    /// The bin volume is taken as `prod (max - min) / n_bins` over the axes, so the
    /// result is only correct for uniform binning.
    fn analytic_integral(&self, code: IntegralCode) -> Result<f64> {
        if code != IntegralCode::AllObservables {
            return Err(Error::Validation(format!(
                "{}: unsupported analytic integral code {}",
                self.name,
                code.code()
            )));
        }
        let h = self.template()?;
        let values = self.params.values()?;
        let mut sum = 0.0;
        for (i, gamma) in values.iter().enumerate() {
            sum += if self.relative { gamma * h.weight(i)? } else { *gamma };
        }

        let mut bin_volume = 1.0;
        for ax in h.axes() {
            if !ax.is_uniform() {
                log::debug!(
                    "{}: analytic integral assumes uniform binning but axis '{}' is variable",
                    self.name,
                    ax.name()
                );
            }
            bin_volume *= (ax.max() - ax.min()) / ax.n_bins() as f64;
        }
        Ok(sum * bin_volume)
    }

    fn sampling_hint(&self, obs: &str, lo: f64, hi: f64) -> BoundaryPoints {
        match self.axis_edges(obs) {
            Some(edges) => BoundaryPoints::sampling_hint(edges, lo, hi),
            None => BoundaryPoints::empty(),
        }
    }

    fn bin_boundaries(&self, obs: &str, lo: f64, hi: f64) -> BoundaryPoints {
        match self.axis_edges(obs) {
            Some(edges) => BoundaryPoints::boundaries(edges, lo, hi),
            None => BoundaryPoints::empty(),
        }
    }
}

impl ParamHistFunc {
    fn axis_edges(&self, obs: &str) -> Option<std::sync::Arc<[f64]>> {
        match self.template() {
            Ok(h) => h.axis(obs).map(|a| a.shared_edges()),
            Err(e) => {
                log::warn!("{}: no boundaries for '{obs}': {e}", self.name);
                None
            }
        }
    }
}

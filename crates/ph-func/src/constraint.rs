//! Barlow-Beeston Poisson constraint on per-bin parameters.
//!
//! Each floating bin `i` with nominal `n_i` and error `s_i` contributes an
//! auxiliary Poisson measurement with `tau_i = (n_i / s_i)^2`: observed `tau_i`,
//! expected `gamma_i * tau_i`. `tau_i` is fixed when the constraint is built;
//! in absolute mode `gamma_i` is the parameter over the current nominal content.

use serde::Serialize;
use statrs::function::gamma::ln_gamma;

use ph_core::{Error, RealFunction, Result};

use crate::param_hist::ParamHistFunc;
use crate::store::ParameterStore;

/// Floor applied to the expected auxiliary count.
const MIN_EXPECTED: f64 = 1e-10;

#[derive(Debug, Clone)]
struct ConstrainedBin {
    /// Aliases the parameters and template of the constrained function.
    func: ParamHistFunc,
    bin: usize,
    tau: f64,
    ln_factorial: f64,
}

impl ConstrainedBin {
    /// Factor turning the stored value into a scale factor: `1` or `1/nominal`.
    fn scale(&self) -> Result<f64> {
        if self.func.is_relative() {
            return Ok(1.0);
        }
        let nominal = self.func.nominal(self.bin)?;
        if !(nominal > 0.0) {
            return Err(Error::DegenerateBin { bin: self.bin });
        }
        Ok(1.0 / nominal)
    }
}

/// Description of one constraint term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintTerm {
    /// Constrained parameter.
    pub parameter: String,
    /// Bin of that parameter.
    pub bin: usize,
    /// Effective number of template entries, `(nominal / error)^2`.
    pub tau: f64,
}

/// Poisson constraint over the floating parameters of one or more functions.
#[derive(Debug, Clone)]
pub struct HistConstraint {
    name: String,
    bins: Vec<ConstrainedBin>,
}

impl HistConstraint {
    /// Constrain every parameter of `funcs` that is floating now.
    ///
    /// Bins without positive nominal content or error are left unconstrained.
    /// Functions sharing a parameter store with an earlier one are skipped.
    pub fn new(name: impl Into<String>, funcs: &[&ParamHistFunc]) -> Result<Self> {
        let name = name.into();
        let mut seen: Vec<&ParameterStore> = Vec::new();
        let mut bins = Vec::new();
        for func in funcs {
            let params = func.parameters();
            if seen.iter().any(|s| s.shares_with(params)) {
                log::debug!("{name}: parameters of '{}' already constrained", func.name());
                continue;
            }
            seen.push(params);

            for bin in params.free_indices()? {
                let nominal = func.nominal(bin)?;
                let error = func.nominal_error(bin)?;
                if !(nominal > 0.0 && error > 0.0) {
                    log::debug!(
                        "{name}: skipping bin {bin} of '{}' (nominal={nominal}, error={error})",
                        func.name()
                    );
                    continue;
                }
                let tau = (nominal / error).powi(2);
                bins.push(ConstrainedBin {
                    func: (*func).clone(),
                    bin,
                    tau,
                    ln_factorial: ln_gamma(tau + 1.0),
                });
            }
        }
        Ok(Self { name, bins })
    }

    /// Constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of constrained bins.
    pub fn n_terms(&self) -> usize {
        self.bins.len()
    }

    /// Constrained parameters, in term order.
    pub fn terms(&self) -> Result<Vec<ConstraintTerm>> {
        self.bins
            .iter()
            .map(|b| {
                let parameter = b.func.parameters().name(b.bin)?;
                Ok(ConstraintTerm { parameter, bin: b.bin, tau: b.tau })
            })
            .collect()
    }

    /// Negative log-likelihood at the current parameter values.
    pub fn nll(&self) -> Result<f64> {
        let mut nll = 0.0;
        for b in &self.bins {
            let gamma = b.func.actual(b.bin)? * b.scale()?;
            let expected = (gamma * b.tau).max(MIN_EXPECTED);
            nll += expected - b.tau * expected.ln() + b.ln_factorial;
        }
        Ok(nll)
    }

    /// Gradient of [`Self::nll`] with respect to each constrained parameter, in term order.
    pub fn gradient(&self) -> Result<Vec<f64>> {
        self.bins
            .iter()
            .map(|b| {
                let scale = b.scale()?;
                let raw = b.func.actual(b.bin)? * scale * b.tau;
                if raw <= MIN_EXPECTED {
                    return Ok(0.0);
                }
                Ok(scale * b.tau * (1.0 - b.tau / raw))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ph_binning::{Axis, DataHist};

    fn func(relative: bool, contents: Vec<f64>) -> ParamHistFunc {
        let n = contents.len();
        let hist = DataHist::from_contents(
            vec![Axis::uniform("x", n, 0.0, n as f64).unwrap()],
            contents,
            None,
        )
        .unwrap()
        .into_shared();
        let f = ParamHistFunc::new("bkg", hist, relative).unwrap();
        for i in 0..n {
            f.parameters().set_constant(i, false).unwrap();
        }
        f
    }

    #[test]
    fn test_tau_from_poisson_errors() {
        let f = func(true, vec![4.0, 9.0]);
        let c = HistConstraint::new("bb", &[&f]).unwrap();
        let terms = c.terms().unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].parameter, "bkg_gamma_bin_1");
        assert_relative_eq!(terms[0].tau, 4.0);
        assert_relative_eq!(terms[1].tau, 9.0);
    }

    #[test]
    fn test_constant_and_empty_bins_skipped() {
        let f = func(true, vec![4.0, 0.0, 9.0]);
        f.parameters().set_constant(2, true).unwrap();
        let c = HistConstraint::new("bb", &[&f]).unwrap();
        assert_eq!(c.n_terms(), 1);
        assert_eq!(c.terms().unwrap()[0].bin, 0);
    }

    #[test]
    fn test_minimum_at_nominal() {
        let f = func(true, vec![4.0, 9.0]);
        let c = HistConstraint::new("bb", &[&f]).unwrap();
        let at_one = c.nll().unwrap();
        for g in [0.8, 1.2] {
            f.set_actual(1, g).unwrap();
            assert!(c.nll().unwrap() > at_one);
        }
        f.set_actual(1, 1.0).unwrap();
        for d in c.gradient().unwrap() {
            assert_relative_eq!(d, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_absolute_mode_scales_by_nominal() {
        let f = func(false, vec![4.0, 9.0]);
        let c = HistConstraint::new("bb", &[&f]).unwrap();
        for d in c.gradient().unwrap() {
            assert_relative_eq!(d, 0.0, epsilon = 1e-12);
        }
        let r = func(true, vec![4.0, 9.0]);
        let cr = HistConstraint::new("bb", &[&r]).unwrap();
        assert_relative_eq!(c.nll().unwrap(), cr.nll().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_absolute_mode_follows_template_updates() {
        let f = func(false, vec![4.0, 9.0]);
        let c = HistConstraint::new("bb", &[&f]).unwrap();
        assert_relative_eq!(c.terms().unwrap()[0].tau, 4.0);
        // Doubling the nominal halves the effective gamma of bin 0.
        f.shared_template().set_weight(0, 8.0).unwrap();
        let r = func(true, vec![4.0, 9.0]);
        let cr = HistConstraint::new("bb", &[&r]).unwrap();
        r.set_actual(0, 0.5).unwrap();
        assert_relative_eq!(c.nll().unwrap(), cr.nll().unwrap(), epsilon = 1e-12);
        assert_relative_eq!(c.gradient().unwrap()[0], cr.gradient().unwrap()[0] / 8.0);
        // tau stays as built.
        assert_relative_eq!(c.terms().unwrap()[0].tau, 4.0);

        f.shared_template().set_weight(1, 0.0).unwrap();
        assert!(matches!(c.nll(), Err(Error::DegenerateBin { bin: 1 })));
        assert!(matches!(c.gradient(), Err(Error::DegenerateBin { bin: 1 })));
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let f = func(true, vec![4.0, 9.0]);
        let c = HistConstraint::new("bb", &[&f]).unwrap();
        f.set_actual(0, 1.3).unwrap();
        let g = c.gradient().unwrap()[0];
        let h = 1e-6;
        f.set_actual(0, 1.3 + h).unwrap();
        let up = c.nll().unwrap();
        f.set_actual(0, 1.3 - h).unwrap();
        let down = c.nll().unwrap();
        assert_relative_eq!(g, (up - down) / (2.0 * h), epsilon = 1e-5);
    }

    #[test]
    fn test_shared_store_constrained_once() {
        let f = func(true, vec![4.0, 9.0]);
        let g = f.clone_named("bkg_copy");
        let c = HistConstraint::new("bb", &[&f, &g]).unwrap();
        assert_eq!(c.n_terms(), 2);
    }
}

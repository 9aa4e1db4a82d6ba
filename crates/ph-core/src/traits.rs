//! Core traits for paramhist
//!
//! Consumers such as fitters, integrators and plotters depend on the
//! [`RealFunction`] interface, not on concrete function types.

use crate::types::{BoundaryPoints, IntegralCode};
use crate::{Error, Result};

/// Real-valued function of a set of named observables.
pub trait RealFunction: Send + Sync {
    /// Function name.
    fn name(&self) -> &str;

    /// Observable names (stable order). `evaluate` expects one value per name.
    fn observables(&self) -> &[String];

    /// Evaluate at the observable tuple `x`.
    fn evaluate(&self, x: &[f64]) -> Result<f64>;

    /// Which analytic integral, if any, covers integration over `vars`.
    fn analytic_integral_code(&self, _vars: &[&str]) -> IntegralCode {
        IntegralCode::None
    }

    /// Value of the analytic integral selected by `code`.
    fn analytic_integral(&self, code: IntegralCode) -> Result<f64> {
        Err(Error::Validation(format!(
            "{} has no analytic integral for code {}",
            self.name(),
            code.code()
        )))
    }

    /// Points that a curve sampler should evaluate along `obs` in `[lo, hi]`.
    fn sampling_hint(&self, _obs: &str, _lo: f64, _hi: f64) -> BoundaryPoints {
        BoundaryPoints::empty()
    }

    /// Discontinuities along `obs` in `[lo, hi]`.
    fn bin_boundaries(&self, _obs: &str, _lo: f64, _hi: f64) -> BoundaryPoints {
        BoundaryPoints::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant {
        obs: Vec<String>,
    }

    impl RealFunction for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn observables(&self) -> &[String] {
            &self.obs
        }

        fn evaluate(&self, _x: &[f64]) -> Result<f64> {
            Ok(1.0)
        }
    }

    #[test]
    fn test_defaults_decline() {
        let f = Constant { obs: vec!["x".into()] };
        assert_eq!(f.analytic_integral_code(&["x"]), IntegralCode::None);
        assert!(f.analytic_integral(IntegralCode::AllObservables).is_err());
        assert_eq!(f.sampling_hint("x", 0.0, 1.0).count(), 0);
        assert_eq!(f.bin_boundaries("x", 0.0, 1.0).count(), 0);
        assert_eq!(f.evaluate(&[0.5]).unwrap(), 1.0);
    }
}

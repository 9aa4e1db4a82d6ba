//! # ph-func
//!
//! Per-bin parameterized histogram functions for paramhist.
//!
//! This crate provides:
//! - [`ParameterStore`]: one parameter per bin, shareable between functions
//! - [`ParamHistFunc`]: `gamma_i * nominal_i` (relative) or `gamma_i` (absolute),
//!   with analytic integration, sampling hints and bin-boundary queries
//! - [`integrate`]: analytic integral with an exact bin-sum fallback
//! - [`HistConstraint`]: Barlow-Beeston Poisson constraint on floating bins
//! - [`spec`]: JSON template specs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraint;
pub mod integral;
pub mod param_hist;
pub mod spec;
pub mod store;

pub use constraint::{ConstraintTerm, HistConstraint};
pub use integral::{bin_sum_integral, integrate};
pub use param_hist::{GAMMA_BOUNDS, ParamHistFunc};
pub use ph_core::{BoundaryPoints, Error, IntegralCode, RealFunction, Result};
pub use spec::{FunctionSpecV0, PARAMHIST_SPEC_V0};
pub use store::{Parameter, ParameterStore};

//! # ph-core
//!
//! Core types, traits, and error handling for paramhist.
//!
//! This crate provides:
//! - Common error types
//! - The [`RealFunction`] trait implemented by binned functions
//! - Integral codes and boundary-point sequences shared by consumers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result, checked_index};
pub use traits::RealFunction;
pub use types::{BoundaryPoints, IntegralCode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

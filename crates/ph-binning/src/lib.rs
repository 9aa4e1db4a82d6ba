//! # ph-binning
//!
//! Binning index for paramhist: one-dimensional [`Axis`] partitions and the
//! N-dimensional [`DataHist`] template that resolves observable tuples to
//! bins and serves nominal contents and errors.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod data_hist;

pub use axis::Axis;
pub use data_hist::{DataHist, SharedHist};

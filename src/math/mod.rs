//! Numerical building blocks: least squares and NaN-aware statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;

//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - frequency and aggregation enums (`Frequency`, `Aggregation`, `AlignMode`)
//! - display units (`Unit`)
//! - parser-chain diagnostics (`ParseStage`)

pub mod types;

pub use types::*;

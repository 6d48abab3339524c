//! `dsa-engine` library crate.
//!
//! The binary (`dsa`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., future dashboard/daemon, notebooks, etc.)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod math;
pub mod metrics;
pub mod qa;
pub mod report;
pub mod timeseries;

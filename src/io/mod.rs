//! Input/output helpers.
//!
//! - CSV and pasted-text ingest + validation (`ingest`)
//! - result exports (CSV/JSON) (`export`)
//! - TOML scenario catalogues (`scenario_file`)

pub mod export;
pub mod ingest;
pub mod scenario_file;

pub use export::*;
pub use ingest::*;
pub use scenario_file::*;

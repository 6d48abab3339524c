//! Error type shared across the engine.
//!
//! Fail-fast conditions (bad metric ids, disallowed frequencies, unparsable
//! period labels, shape mismatches) surface as `EngineError`. Conditions that
//! are expected in normal use, such as a calibration sample that is too short
//! or a quantile request with no usable columns, are reported as empty values
//! (`Option`/empty series) by the functions that detect them, not as errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown metric id, disallowed frequency, invalid horizon, and similar
    /// misconfiguration detectable before any computation runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Pasted or derived value list whose length does not match the expected
    /// index length.
    #[error("input shape mismatch: expected {expected} values, got {got}")]
    InputShape { expected: usize, got: usize },

    /// Every stage of the period parser chain failed for a label.
    #[error("could not parse period label '{label}' for metric '{metric}'")]
    UnparsableLabel { metric: String, label: String },

    /// A derived metric's dependency chain loops back on itself.
    #[error("cyclic metric dependency: {path}")]
    CyclicDependency { path: String },

    /// Required raw metrics have no stored observations.
    #[error("missing required metrics: {}", ids.join(", "))]
    MissingRequired { ids: Vec<String> },

    #[error("{context} '{}': {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid scenario file '{}': {message}", path.display())]
    ScenarioFile { path: PathBuf, message: String },
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Configuration(message.into())
    }

    /// Process exit code for the `dsa` binary. Usage/configuration problems
    /// map to 2, missing data to 3, internal resolution failures to 4.
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Configuration(_)
            | EngineError::InputShape { .. }
            | EngineError::UnparsableLabel { .. }
            | EngineError::Io { .. }
            | EngineError::Csv { .. }
            | EngineError::ScenarioFile { .. } => 2,
            EngineError::MissingRequired { .. } => 3,
            EngineError::CyclicDependency { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(EngineError::config("bad id").exit_code(), 2);
        assert_eq!(
            EngineError::MissingRequired {
                ids: vec!["gdp_nominal".to_string()]
            }
            .exit_code(),
            3
        );
        assert_eq!(
            EngineError::CyclicDependency {
                path: "a -> b -> a".to_string()
            }
            .exit_code(),
            4
        );
    }

    #[test]
    fn missing_required_lists_ids() {
        let err = EngineError::MissingRequired {
            ids: vec!["psnd_ex".to_string(), "psnb_ex".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing required metrics: psnd_ex, psnb_ex"
        );
    }
}

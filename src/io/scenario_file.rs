//! TOML scenario catalogues.
//!
//! A scenario file holds `[[scenario]]` tables with a `name` and any of the
//! four shock fields; omitted fields default to zero. Entries whose names
//! collide with the built-in catalogue replace them at merge time.

use std::path::Path;

use serde::Deserialize;

use crate::engine::ShockScenario;
use crate::error::EngineError;

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    scenario: Vec<ShockScenario>,
}

/// Load shock scenarios from a TOML file.
pub fn load_scenarios(path: &Path) -> Result<Vec<ShockScenario>, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
        context: "failed to read scenario file",
        path: path.to_path_buf(),
        source: e,
    })?;
    let parsed: ScenarioFile =
        toml::from_str(&text).map_err(|e| EngineError::ScenarioFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(parsed.scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_scenarios_with_defaulted_fields() {
        let contents = r#"
            [[scenario]]
            name = "Rate +300bps"
            r_pp = 0.05

            [[scenario]]
            name = "Custom squeeze"
            description = "pb -2% GDP"
            pb_pp = -0.02
        "#;
        let (_dir, path) = write_temp(contents);
        let scenarios = load_scenarios(&path).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "Rate +300bps");
        assert_eq!(scenarios[0].r_pp, 0.05);
        assert_eq!(scenarios[0].g_pp, 0.0);
        assert_eq!(scenarios[1].pb_pp, -0.02);
        assert_eq!(scenarios[1].description, "pb -2% GDP");
    }

    #[test]
    fn empty_file_yields_no_scenarios() {
        let (_dir, path) = write_temp("");
        assert!(load_scenarios(&path).unwrap().is_empty());
    }

    #[test]
    fn malformed_toml_is_a_scenario_file_error() {
        let (_dir, path) = write_temp("[[scenario]]\nr_pp = 0.05\n");
        let err = load_scenarios(&path).unwrap_err();
        assert!(matches!(err, EngineError::ScenarioFile { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            load_scenarios(&path),
            Err(EngineError::Io { .. })
        ));
    }
}

//! Optional project configuration, grounded in the teacher's TOML-backed
//! lint config (`lint::LintConfig::from_toml`/`default_config`): a project
//! can drop a `cn.toml` next to its sources to set defaults that `cnc
//! build`'s CLI flags override, rather than having to repeat them on every
//! invocation.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    pub freestanding: Option<bool>,
    pub target: Option<String>,
    pub opt: Option<String>,
    pub keep_c: Option<bool>,
}

impl ProjectConfig {
    /// Looks for `cn.toml` in `dir`. Absence is not an error — most
    /// invocations rely on CLI flags alone — but a malformed file is.
    pub fn load_from_dir(dir: &Path) -> Result<Self, String> {
        let path = dir.join("cn.toml");
        if !path.exists() {
            return Ok(ProjectConfig::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_from_dir(dir.path()).expect("missing file is not an error");
        assert_eq!(config.freestanding, None);
    }

    #[test]
    fn parses_declared_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cn.toml"), "freestanding = true\ntarget = \"thumbv7em-none-eabi\"\nopt = \"O2\"\n")
            .unwrap();
        let config = ProjectConfig::load_from_dir(dir.path()).expect("valid config parses");
        assert_eq!(config.freestanding, Some(true));
        assert_eq!(config.target.as_deref(), Some("thumbv7em-none-eabi"));
        assert_eq!(config.opt.as_deref(), Some("O2"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cn.toml"), "this is not valid toml {{{").unwrap();
        assert!(ProjectConfig::load_from_dir(dir.path()).is_err());
    }
}

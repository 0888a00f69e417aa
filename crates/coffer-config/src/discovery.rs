//! Config file discovery and loading.
//!
//! Resolution order (first match wins):
//! 1. An explicit path given by the caller
//! 2. The file named by `COFFER_CONFIG`
//! 3. `./coffer.toml`
//!
//! With no file found, every section takes its defaults.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{CofferConfig, ConfigError, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "coffer.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "COFFER_CONFIG";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration.
    pub config: CofferConfig,
    /// File the configuration came from, if any.
    pub source: Option<PathBuf>,
}

/// Discover, load and validate the configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let env_path = std::env::var(CONFIG_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    load_config_with_options(explicit, env_path.as_deref(), Path::new("."))
}

/// Discovery with the environment and working directory made explicit.
///
/// An explicit or environment-provided path must exist; the project-local
/// file is optional.
pub fn load_config_with_options(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    project_dir: &Path,
) -> Result<LoadedConfig> {
    let required = explicit.or(env_path);
    let source = match required {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = project_dir.join(PROJECT_CONFIG_FILE);
            local.is_file().then_some(local)
        }
    };

    let config = match &source {
        Some(path) => load_config_file(path)?,
        None => CofferConfig::default(),
    };
    config.validate()?;

    debug!(source = ?source, "Configuration loaded");
    Ok(LoadedConfig { config, source })
}

/// Load a config from a specific file path.
pub fn load_config_file(path: &Path) -> Result<CofferConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    CofferConfig::from_toml_str(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &CofferConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[session]
max_in_memory = 12
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.session.max_in_memory, 12);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/coffer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_discovery_prefers_explicit_then_env_then_project() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let env = dir.path().join("env.toml");
        fs::write(&explicit, "[session]\nmax_in_memory = 1\n").unwrap();
        fs::write(&env, "[session]\nmax_in_memory = 2\n").unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[session]\nmax_in_memory = 3\n").unwrap();

        let loaded = load_config_with_options(Some(&explicit), Some(&env), dir.path()).unwrap();
        assert_eq!(loaded.config.session.max_in_memory, 1);
        assert_eq!(loaded.source.as_deref(), Some(explicit.as_path()));

        let loaded = load_config_with_options(None, Some(&env), dir.path()).unwrap();
        assert_eq!(loaded.config.session.max_in_memory, 2);

        let loaded = load_config_with_options(None, None, dir.path()).unwrap();
        assert_eq!(loaded.config.session.max_in_memory, 3);
    }

    #[test]
    fn test_discovery_without_files_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config_with_options(None, None, dir.path()).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config, CofferConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config_with_options(Some(&missing), None, dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[storage]\nbackend = \"file\"\n").unwrap();
        let err = load_config_with_options(Some(&path), None, dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("coffer.toml");
        let mut config = CofferConfig::default();
        config.logging.json = true;

        save_config(&config, &path).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}

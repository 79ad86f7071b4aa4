//! Configuration Loader
//!
//! Layers, lowest precedence first: built-in defaults, `config/taskspec.toml`,
//! `config/taskspec.<environment>.toml`, then `TASKSPEC__SECTION__KEY`
//! environment variables.

use super::ControlPlaneConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG_DIRECTORY: &str = "config";
const CONFIG_BASENAME: &str = "taskspec";
const ENV_PREFIX: &str = "TASKSPEC";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `path`, or from the default config directory when `None`
    pub fn load(path: Option<&Path>) -> Result<ControlPlaneConfig> {
        let environment = Self::detect_environment();
        match path {
            Some(path) => Self::load_file(path, &environment),
            None => Self::load_from_directory(Path::new(DEFAULT_CONFIG_DIRECTORY), &environment),
        }
    }

    /// Load `<dir>/taskspec.toml` and `<dir>/taskspec.<environment>.toml`;
    /// both are optional.
    pub fn load_from_directory(dir: &Path, environment: &str) -> Result<ControlPlaneConfig> {
        let base = dir.join(format!("{CONFIG_BASENAME}.toml"));
        let overlay = dir.join(format!("{CONFIG_BASENAME}.{environment}.toml"));

        debug!(
            base = %base.display(),
            overlay = %overlay.display(),
            environment = %environment,
            "Loading control-plane configuration"
        );

        let builder = config::Config::builder()
            .add_source(config::File::from(base).required(false))
            .add_source(config::File::from(overlay).required(false));
        Self::finish(builder)
    }

    /// Load one explicit file, which must exist
    pub fn load_file(path: &Path, environment: &str) -> Result<ControlPlaneConfig> {
        debug!(
            path = %path.display(),
            environment = %environment,
            "Loading control-plane configuration file"
        );
        let builder =
            config::Config::builder().add_source(config::File::from(PathBuf::from(path)).required(true));
        Self::finish(builder)
    }

    pub fn detect_environment() -> String {
        std::env::var("TASKSPEC_ENV").unwrap_or_else(|_| "development".to_string())
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<ControlPlaneConfig> {
        let loaded: ControlPlaneConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlPlaneError;
    use std::io::Write;

    #[test]
    fn test_missing_directory_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_from_directory(dir.path(), "test").unwrap();
        assert_eq!(config, ControlPlaneConfig::default());
    }

    #[test]
    fn test_environment_overlay_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("taskspec.toml"),
            "[resolver]\npoll_interval_ms = 50\n[identity]\nmax_mint_attempts = 3\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("taskspec.test.toml"),
            "[resolver]\npoll_interval_ms = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_directory(dir.path(), "test").unwrap();
        assert_eq!(config.resolver.poll_interval_ms, 5);
        assert_eq!(config.identity.max_mint_attempts, 3);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_file(&dir.path().join("absent.toml"), "test");
        assert!(matches!(result, Err(ControlPlaneError::Configuration(_))));
    }

    #[test]
    fn test_invalid_values_rejected_after_load() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[profiling]\nflush_interval_ms = 0").unwrap();
        let result = ConfigLoader::load_file(file.path(), "test");
        assert!(matches!(result, Err(ControlPlaneError::Configuration(_))));
    }
}

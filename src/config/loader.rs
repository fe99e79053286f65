//! Configuration loader for cronhook
//!
//! `ConfigLoader` merges every configuration source with proper precedence.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "CRONHOOK_CONFIG_DIR";

/// Environment variable for a single configuration file
const CONFIG_FILE_ENV: &str = "CRONHOOK_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "CRONHOOK";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// Sources, lowest priority first:
/// 1. `default.toml` (required in layered mode)
/// 2. `{environment}.toml`
/// 3. `local.toml`
/// 4. `CRONHOOK_*` environment variables
///
/// In single-file mode only the given file and the environment are read.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a loader from `CRONHOOK_CONFIG_DIR`, `CRONHOOK_CONFIG_FILE`
    /// and `CRONHOOK_APP_ENV`.
    ///
    /// # Errors
    ///
    /// Returns an error if both the directory and the file variable are set.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && config_dir.is_some() {
            return Err(ConfigError::mutual_exclusivity(
                "CRONHOOK_CONFIG_DIR and CRONHOOK_CONFIG_FILE cannot both be set. \
                 Use CRONHOOK_CONFIG_DIR for layered configuration or \
                 CRONHOOK_CONFIG_FILE for a single configuration file.",
            ));
        }

        Ok(Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Layered loading from an explicit directory
    pub fn from_dir(config_dir: impl Into<PathBuf>, environment: AppEnvironment) -> Self {
        Self {
            config_dir: config_dir.into(),
            config_file: None,
            environment,
        }
    }

    /// Single-file loading, used by `--config`
    pub fn from_file(config_file: impl Into<PathBuf>, environment: AppEnvironment) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(config_file.into()),
            environment,
        }
    }

    /// Overrides the environment picked up from `CRONHOOK_APP_ENV`
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    /// Load, deserialize and validate the configuration.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let settings = self.load_unvalidated()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load without validation so CLI overrides can be applied first.
    pub fn load_unvalidated(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let mut settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;
        settings.application.environment = self.environment;
        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = match self.config_file {
            Some(ref config_file) => Self::add_file_source(builder, config_file, true)?,
            None => self.build_layered_config(builder)?,
        };

        // CRONHOOK_SERVER__PORT -> server.port
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        );

        builder.build().map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = Self::add_file_source(builder, &self.config_dir.join("default.toml"), true)?;

        let env_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));
        let builder = Self::add_file_source(builder, &env_path, false)?;

        Self::add_file_source(builder, &self.config_dir.join("local.toml"), false)
    }

    fn add_file_source(
        builder: ConfigBuilder<DefaultState>,
        path: &Path,
        required: bool,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if required && !path.is_file() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        let name = path.to_str().ok_or_else(|| {
            ConfigError::ParseError(format!("Non UTF-8 configuration path: {}", path.display()))
        })?;

        Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::StoreBackend;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Serialises tests that touch process environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    const BASE: &str = r#"
        [server]
        port = 8080

        [database]
        url = "postgres://localhost/cronhook"
    "#;

    #[test]
    fn test_missing_default_toml_is_an_error() {
        let dir = setup_config_dir(&[]);
        let loader = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development);
        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_default_toml_only() {
        let dir = setup_config_dir(&[("default.toml", BASE)]);
        let settings = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development)
            .load()
            .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.scheduler.max_attempts, 3);
        assert_eq!(settings.application.environment, AppEnvironment::Development);
    }

    #[test]
    fn test_environment_then_local_override() {
        let dir = setup_config_dir(&[
            ("default.toml", BASE),
            ("production.toml", "[server]\nport = 9000\n[scheduler]\nmax_attempts = 5\n"),
            ("local.toml", "[server]\nport = 9100\n"),
        ]);
        let settings = ConfigLoader::from_dir(dir.path(), AppEnvironment::Production)
            .load()
            .unwrap();

        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.scheduler.max_attempts, 5);
        assert_eq!(settings.application.environment, AppEnvironment::Production);
    }

    #[test]
    fn test_other_environment_file_is_ignored() {
        let dir = setup_config_dir(&[
            ("default.toml", BASE),
            ("staging.toml", "[server]\nport = 7000\n"),
        ]);
        let settings = ConfigLoader::from_dir(dir.path(), AppEnvironment::Test)
            .load()
            .unwrap();
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_single_file_mode() {
        let dir = setup_config_dir(&[("custom.toml", "[database]\nbackend = \"memory\"\n")]);
        let settings =
            ConfigLoader::from_file(dir.path().join("custom.toml"), AppEnvironment::Test)
                .load()
                .unwrap();
        assert_eq!(settings.database.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = setup_config_dir(&[(
            "default.toml",
            "[database]\nbackend = \"memory\"\n[scheduler]\nmax_attempts = 0\n",
        )]);
        let loader = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development);

        assert!(matches!(
            loader.load(),
            Err(ConfigError::ValidationError { .. })
        ));
        assert!(loader.load_unvalidated().is_ok());
    }

    #[test]
    fn test_env_var_override_wins() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = setup_config_dir(&[("default.toml", BASE)]);

        unsafe { std::env::set_var("CRONHOOK_SCHEDULER__ATTEMPT_TIMEOUT_SECS", "25") };
        let result = ConfigLoader::from_dir(dir.path(), AppEnvironment::Development).load();
        unsafe { std::env::remove_var("CRONHOOK_SCHEDULER__ATTEMPT_TIMEOUT_SECS") };

        assert_eq!(result.unwrap().scheduler.attempt_timeout_secs, 25);
    }

    #[test]
    fn test_dir_and_file_variables_are_exclusive() {
        let _guard = ENV_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var(CONFIG_DIR_ENV, "/etc/cronhook");
            std::env::set_var(CONFIG_FILE_ENV, "/etc/cronhook.toml");
        }
        let result = ConfigLoader::new();
        unsafe {
            std::env::remove_var(CONFIG_DIR_ENV);
            std::env::remove_var(CONFIG_FILE_ENV);
        }

        assert!(matches!(
            result,
            Err(ConfigError::MutualExclusivityError(_))
        ));
    }
}

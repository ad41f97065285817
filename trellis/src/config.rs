//! Framework configuration is an [ApplicationConfig] declared in the environment, which means it
//! can be injected into any other component, just like it's used by
//! [Application](crate::application::Application) to configure itself.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `TRELLIS_` or the `trellis.json` file. Declaring an
//! [ApplicationConfig] in a user module replaces the default one altogether.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "TRELLIS";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "trellis.json";

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Should all declared components be constructed before running runners.
    pub eager_initialization: bool,
    /// Should the environment be torn down after runners finish.
    pub teardown_on_exit: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            eager_initialization: false,
            teardown_on_exit: true,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            eager_initialization: value
                .eager_initialization
                .unwrap_or(default.eager_initialization),
            teardown_on_exit: value.teardown_on_exit.unwrap_or(default.teardown_on_exit),
        }
    }
}

impl ApplicationConfig {
    /// Loads the config from [CONFIG_FILE] and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Self::init_from_file(CONFIG_FILE)
    }

    /// Loads the config from given file, if it exists, and the environment.
    pub fn init_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::init(path, CONFIG_ENV_PREFIX)
    }

    fn init(path: &str, env_prefix: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(env_prefix))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    eager_initialization: Option<bool>,
    teardown_on_exit: Option<bool>,
}

#[cfg(test)]
mod tests {
    use crate::config::ApplicationConfig;
    use std::{env, fs};

    #[test]
    fn should_use_defaults_without_file() {
        let config =
            ApplicationConfig::init("missing-trellis-config.json", "TRELLIS_DEFAULTS_TEST").unwrap();
        assert_eq!(config, ApplicationConfig::default());
    }

    #[test]
    fn should_overlay_environment_variables() {
        env::set_var("TRELLIS_EAGER_INITIALIZATION", "true");
        let config = ApplicationConfig::init_from_file("missing-trellis-config.json");
        env::remove_var("TRELLIS_EAGER_INITIALIZATION");

        let config = config.unwrap();
        assert!(config.eager_initialization);
        assert!(config.install_tracing_logger);
        assert!(config.teardown_on_exit);
    }

    #[test]
    fn should_overlay_file_values() {
        let path = env::temp_dir().join("trellis-config-test.json");
        fs::write(&path, r#"{ "eager_initialization": true }"#).unwrap();

        let config = ApplicationConfig::init_from_file(&path.to_string_lossy()).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(config.eager_initialization);
        assert!(config.install_tracing_logger);
        assert!(config.teardown_on_exit);
    }
}

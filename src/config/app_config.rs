use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub helper: HelperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Registry policies of the experiment manager
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ManagerConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    pub unknown_experiment_policy: UnknownExperimentPolicy,
}

/// What `add_experiment` does when the id is already registered
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with a conflict and keep the registered experiment
    #[default]
    Reject,
    /// Replace the registered experiment, detaching its listener first
    Overwrite,
}

/// What `activate_experiment` does when the id is not registered
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnknownExperimentPolicy {
    /// Succeed without doing anything
    #[default]
    Ignore,
    /// Fail with a not-found error
    Report,
}

/// Which helper the manager is built with
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HelperConfig {
    #[serde(default)]
    pub kind: HelperKind,
    /// Fixed groups served by the static helper
    #[serde(default)]
    pub assignments: Vec<StaticAssignment>,
    /// Deliver callbacks on the tokio runtime after this many milliseconds
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// One experiment id and the group it is always assigned
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StaticAssignment {
    pub experiment: String,
    pub group: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HelperKind {
    #[default]
    Unavailable,
    Static,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local` and `EXPERIMENTS__*`
    /// environment variables, after reading `.env` if present
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("EXPERIMENTS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse an inline TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

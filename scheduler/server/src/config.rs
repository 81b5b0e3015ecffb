use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_db_url")]
    pub db_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the front-end files.
    #[serde(default = "default_web_dir")]
    pub web_dir: PathBuf,
    /// Maximum number of tasks returned by the task list.
    #[serde(default = "default_list_limit")]
    pub list_limit: u64,
}

impl Config {
    /// Loads configuration from `TODO_`-prefixed environment variables,
    /// e.g. `TODO_PORT` or `TODO_DB_URL`.
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("TODO").try_parsing(true))
            .build()?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }
}

fn default_db_url() -> String {
    "sqlite://scheduler.db?mode=rwc".to_string()
}

fn default_port() -> u16 {
    7540
}

fn default_web_dir() -> PathBuf {
    PathBuf::from("./web")
}

fn default_list_limit() -> u64 {
    50
}

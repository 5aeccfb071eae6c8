use importer::ImportConfig;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/spoglio.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Layered configuration: defaults, then the TOML file, then `SPOGLIO_*`
/// environment variables (nested keys separated by `__`, e.g.
/// `SPOGLIO_IMPORT__PROVIDER__KIND=local-llm`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub import: ImportConfig,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SPOGLIO").separator("__"))
            .build()?
            .try_deserialize()
    }
}

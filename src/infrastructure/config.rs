use crate::application::dashboard_view::ViewConfig;
use crate::domain::series::MissingValuePolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub refresh: RefreshSettings,
    pub layout: LayoutSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Soft timeout for every backend call, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    pub row_limit: usize,
    pub missing_values: MissingValuePolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutSettings {
    pub columns: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl AppConfig {
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            refresh_interval: Duration::from_secs(self.refresh.interval_secs.max(1)),
            row_limit: self.refresh.row_limit,
            soft_timeout: Duration::from_secs(self.api.timeout_secs.max(1)),
            grid_columns: self.layout.columns,
            missing_values: self.refresh.missing_values,
        }
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("api.base_url", "http://127.0.0.1:5000")?
        .set_default("api.timeout_secs", 30)?
        .set_default("refresh.interval_secs", 5)?
        .set_default("refresh.row_limit", 5000)?
        .set_default("refresh.missing_values", "drop")?
        .set_default("layout.columns", 12)?
        .set_default("server.bind", "0.0.0.0:8080")
}

/// Defaults, then `config/dashboards.{toml,yaml,json}` if present, then
/// `DASHBOARDS__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = defaults()?
        .add_source(config::File::with_name("config/dashboards").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARDS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Join the API base URL, a path and percent-encoded query parameters
pub fn endpoint_url(base_url: &str, path: &str, params: &BTreeMap<&str, String>) -> String {
    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    for (i, (key, value)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
    url
}

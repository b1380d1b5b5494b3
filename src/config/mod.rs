pub mod cli;
pub mod toml_config;

use crate::core::broadcast::DEFAULT_POLL_INTERVAL;
use crate::core::fetcher::{FeedSettings, DEFAULT_FEED_URL, DEFAULT_USER_AGENT};
use crate::core::resolver::{RetryPolicy, TransportConfig};
use crate::utils::error::{AlertError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_required_field, validate_url,
    Validate,
};
use std::time::Duration;

pub use cli::CliConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 合併後的系統設定，啟動時建立一次
#[derive(Debug, Clone)]
pub struct Settings {
    pub transport: TransportConfig,
    pub location: String,
    pub poll_interval: Duration,
    pub feed: FeedSettings,
    pub retry: RetryPolicy,
}

impl Settings {
    /// 讀取設定檔並套用命令列覆蓋
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path).map_err(|e| AlertError::ConfigError {
                message: format!("Failed to load config file '{}': {}", path.display(), e),
            })?,
            None => TomlConfig::from_file_or_default(DEFAULT_CONFIG_PATH)?,
        };

        let settings = Self::merge(file, cli)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 命令列的值優先於設定檔
    pub fn merge(file: TomlConfig, cli: &CliConfig) -> Result<Self> {
        let TomlConfig {
            interface,
            weather,
            retry,
        } = file;

        let kind = cli
            .interface_type
            .map(|kind| kind.to_string())
            .or(interface.r#type);
        let transport = TransportConfig::from_settings(
            kind.as_deref(),
            cli.port.clone().or(interface.port),
            cli.host.clone().or(interface.hostname),
            interface.channel.unwrap_or(0),
        )?;

        let location = cli.location.clone().or(weather.location);
        let location = validate_required_field("weather.location", &location)?
            .trim()
            .to_string();

        let poll_interval = cli
            .interval
            .or(weather.poll_interval_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let feed = FeedSettings {
            url_template: weather
                .feed_url
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            user_agent: weather
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            request_timeout: Duration::from_secs(weather.request_timeout_seconds.unwrap_or(30)),
        };

        let default_retry = RetryPolicy::default();
        let retry = RetryPolicy {
            delay: retry
                .delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(default_retry.delay),
            max_attempts: retry.max_attempts,
        };

        Ok(Self {
            transport,
            location,
            poll_interval,
            feed,
            retry,
        })
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("weather.location", &self.location)?;
        validate_positive_number("weather.poll_interval_seconds", self.poll_interval.as_secs(), 1)?;
        validate_positive_number(
            "weather.request_timeout_seconds",
            self.feed.request_timeout.as_secs(),
            1,
        )?;
        validate_non_empty_string("weather.user_agent", &self.feed.user_agent)?;

        if !self.feed.url_template.contains("{location}") {
            tracing::warn!(
                "weather.feed_url has no {{location}} placeholder, every cycle will poll {}",
                self.feed.url_template
            );
        }
        validate_url(
            "weather.feed_url",
            &self.feed.url_template.replace("{location}", &self.location),
        )?;

        validate_positive_number("retry.delay_seconds", self.retry.delay.as_secs(), 1)?;
        if let Some(max) = self.retry.max_attempts {
            validate_positive_number("retry.max_attempts", u64::from(max), 1)?;
        }

        Ok(())
    }
}

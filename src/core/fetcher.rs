use crate::core::{Alert, AlertSource};
use crate::utils::error::Result;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://api.weather.gov/alerts/active/area/{location}";
pub const DEFAULT_USER_AGENT: &str = "MeshtasticWeatherAlertSystem/1.0";

#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// `{location}` 會被替換成地區代碼
    pub url_template: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_FEED_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Option<FeatureProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
}

impl From<Feature> for Alert {
    fn from(feature: Feature) -> Self {
        let props = feature.properties.unwrap_or_default();
        Alert::new(
            props.id.or(feature.id),
            props.event,
            props.headline,
            props.description,
            props.instruction,
        )
    }
}

/// 呼叫警報 feed 並解析成 Alert。HTTP client 在建立時產生一次，之後重複使用。
pub struct AlertFetcher {
    client: Client,
    settings: FeedSettings,
}

impl AlertFetcher {
    pub fn new(settings: FeedSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn feed_url(&self, location: &str) -> String {
        self.settings.url_template.replace("{location}", location)
    }

    /// 解析 feed 回應本文
    pub fn parse_alerts(body: &str) -> Result<Vec<Alert>> {
        let document: FeedDocument = serde_json::from_str(body)?;
        Ok(document.features.into_iter().map(Alert::from).collect())
    }
}

#[async_trait::async_trait]
impl AlertSource for AlertFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<Alert>> {
        let url = self.feed_url(location);
        tracing::debug!("Making feed request to: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Feed response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to fetch weather alerts: {} {}", status.as_u16(), body);
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        let alerts = Self::parse_alerts(&body)?;
        tracing::debug!("Parsed {} alerts for {}", alerts.len(), location);
        Ok(alerts)
    }
}

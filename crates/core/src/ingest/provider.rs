use crate::config::Settings;
use crate::domain::snapshot::Snapshot;
use crate::time::report_day::date_key;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PATH: &str = "/v1/market_snapshots";

/// Where a day's market snapshot comes from.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// `Ok(None)` when no snapshot exists for `date`.
    async fn fetch_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>>;
}

/// Snapshot served as JSON over HTTP: `GET {base}{path}?date=YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
}

impl HttpSnapshotSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_snapshot_base_url()?.to_string();
        let api_key = settings.snapshot_api_key.clone();

        let timeout_secs = std::env::var("SNAPSHOT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let path = std::env::var("SNAPSHOT_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build snapshot http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSnapshotSource {
    fn source_name(&self) -> &'static str {
        "http_json"
    }

    async fn fetch_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&[("date", date_key(date))])
            .send()
            .await
            .context("snapshot request failed")?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = res
            .text()
            .await
            .context("failed to read snapshot response")?;
        if !status.is_success() {
            anyhow::bail!("snapshot source HTTP {status}: {text}");
        }

        parse_snapshot(&text).map(Some)
    }
}

/// Parses a snapshot document, failing on any shape mismatch.
pub fn parse_snapshot(text: &str) -> Result<Snapshot> {
    serde_json::from_str::<Snapshot>(text).context("snapshot document does not match expected shape")
}

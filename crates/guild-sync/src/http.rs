//! [`HttpFeed`]: the feed as two static JSON files on a web server.
//!
//! Freshness comes from the `Last-Modified` header of a `HEAD` request, so a
//! check that finds nothing new costs no body download.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, header::LAST_MODIFIED};
use serde::Deserialize;

use crate::{Error, FeedError, FeedSource, Resource, Result};

fn default_timeout_secs() -> u64 { 30 }

/// Where the feed documents live.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  pub organisations_url: String,
  pub events_url:        String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
}

impl FeedConfig {
  pub fn new(
    organisations_url: impl Into<String>,
    events_url: impl Into<String>,
  ) -> Self {
    Self {
      organisations_url: organisations_url.into(),
      events_url:        events_url.into(),
      timeout_secs:      default_timeout_secs(),
    }
  }
}

/// HTTP client for the feed.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpFeed {
  client: Client,
  config: FeedConfig,
}

impl HttpFeed {
  pub fn new(config: FeedConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(Error::Client)?;
    Ok(Self { client, config })
  }

  fn url(&self, resource: Resource) -> &str {
    match resource {
      Resource::Organisations => &self.config.organisations_url,
      Resource::Events => &self.config.events_url,
    }
  }

  async fn checked(
    &self,
    resource: Resource,
    req: reqwest::RequestBuilder,
  ) -> Result<reqwest::Response, FeedError> {
    let resp = req
      .send()
      .await
      .map_err(|e| FeedError::Unreachable(resource, e))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(FeedError::Status { resource, status });
    }
    Ok(resp)
  }
}

/// Parse an HTTP-date (`Wed, 01 Jan 2025 12:00:00 GMT`).
fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc2822(raw.trim())
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

impl FeedSource for HttpFeed {
  async fn last_modified(
    &self,
    resource: Resource,
  ) -> Result<DateTime<Utc>, FeedError> {
    let req = self.client.head(self.url(resource));
    let resp = self.checked(resource, req).await?;

    let header = resp
      .headers()
      .get(LAST_MODIFIED)
      .ok_or(FeedError::MissingLastModified(resource))?;
    let raw = String::from_utf8_lossy(header.as_bytes());

    parse_http_date(&raw)
      .ok_or_else(|| FeedError::InvalidLastModified(resource, raw.into_owned()))
  }

  async fn fetch(&self, resource: Resource) -> Result<String, FeedError> {
    let req = self.client.get(self.url(resource));
    let resp = self.checked(resource, req).await?;

    resp
      .text()
      .await
      .map_err(|e| FeedError::Unreachable(resource, e))
  }
}

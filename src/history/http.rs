//! HTTP history feed.
//!
//! `GET <url>` returning a JSON array of outcome records, oldest first.
//! Any non-2xx status, transport error or malformed body is a fetch
//! failure; the store decides what to serve instead.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::HistorySource;
use crate::types::{OutcomeSequence, PredictorError};

pub struct HttpHistorySource {
    http: Client,
    url: String,
}

impl HttpHistorySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("taixiu-predictor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build history HTTP client")?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HistorySource for HttpHistorySource {
    async fn fetch_history(&self) -> Result<OutcomeSequence> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PredictorError::UpstreamFetch(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::UpstreamFetch(format!("HTTP {status}: {body}")).into());
        }

        let records: OutcomeSequence = response
            .json()
            .await
            .context("Failed to parse history response")?;

        debug!(url = %self.url, count = records.len(), "History fetched");
        Ok(records)
    }

    fn name(&self) -> &str {
        "http"
    }
}

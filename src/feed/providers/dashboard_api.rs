// src/feed/providers/dashboard_api.rs
//
// The remote dashboard API as a `FeedSource`. Transport problems surface as
// `RoundError::Fetch`; a body that doesn't match the documented shape is
// `RoundError::Data`, so callers can tell the two apart.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;

use crate::feed::types::{EventQuery, FeedSource, GameEvent, Prediction, RoundError};

pub struct ApiFeedSource {
    base_url: String,
    client: reqwest::Client,
}

impl ApiFeedSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn events_url(&self, query: &EventQuery) -> String {
        let mut url = format!(
            "{}/events?withPredictions={}&limit={}",
            self.base_url, query.include_predictions, query.limit
        );
        if let Some(league) = query.league.as_deref().filter(|l| !l.trim().is_empty()) {
            url.push_str("&league=");
            url.push_str(league.trim());
        }
        if let Some(day) = query.day.as_deref().filter(|d| !d.trim().is_empty()) {
            url.push_str("&day=");
            url.push_str(day.trim());
        }
        url
    }

    async fn get_text(&self, url: &str) -> Result<String, RoundError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RoundError::Fetch(anyhow!(e).context("dashboard api request failed")))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| RoundError::Fetch(anyhow!(e).context("dashboard api error status")))?;
        resp.text()
            .await
            .map_err(|e| RoundError::Fetch(anyhow!(e).context("dashboard api body read")))
    }
}

#[async_trait]
impl FeedSource for ApiFeedSource {
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<GameEvent>, RoundError> {
        let body = self.get_text(&self.events_url(query)).await?;
        parse_events_json(&body)
    }

    async fn fetch_predictions(&self) -> Result<Vec<Prediction>, RoundError> {
        let url = format!("{}/predictions", self.base_url);
        let body = self.get_text(&url).await?;
        parse_predictions_json(&body)
    }

    fn name(&self) -> &'static str {
        "DashboardApi"
    }
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<GameEvent>,
}

#[derive(Debug, Deserialize)]
struct PredictionsResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

pub fn parse_events_json(raw: &str) -> Result<Vec<GameEvent>, RoundError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str::<EventsResponse>(trimmed)
        .map(|r| r.events)
        .map_err(|e| RoundError::Data(anyhow::Error::new(e).context("invalid events json")))
}

pub fn parse_predictions_json(raw: &str) -> Result<Vec<Prediction>, RoundError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str::<PredictionsResponse>(trimmed)
        .map(|r| r.predictions)
        .map_err(|e| RoundError::Data(anyhow::Error::new(e).context("invalid predictions json")))
}

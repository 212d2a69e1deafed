//! Sports Club Stats playoff chance feed.
//!
//! A single JSON document carries one series per team, labelled with the
//! team name; the last point of each series is today's chance. The feed's
//! `Last-Modified` header is the update timestamp.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header::LAST_MODIFIED;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::OddsProvider;
use crate::data::teams::find_team_by_label;
use crate::types::ProviderKind;

const FEED_URL: &str = "http://www.sportsclubstats.com/d/NHL_ChanceWillMakePlayoffs_Small_A.json";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    data: Vec<Series>,
}

#[derive(Debug, Deserialize)]
struct Series {
    label: String,
    #[serde(default)]
    data: Vec<Option<f64>>,
}

/// Parse a `Last-Modified` header value.
pub fn parse_last_modified(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value.trim())
        .with_context(|| format!("Unrecognised Last-Modified header: {value:?}"))
}

/// Parse the feed into percentages keyed by team abbreviation.
pub fn parse_feed(body: &str) -> Result<BTreeMap<String, f64>> {
    let feed: Feed = serde_json::from_str(body).context("Failed to parse Sports Club Stats feed")?;
    let mut odds = BTreeMap::new();

    for series in feed.data {
        let Some(team) = find_team_by_label(&series.label) else {
            warn!(label = %series.label, "Unknown team label in Sports Club Stats feed");
            continue;
        };
        match series.data.iter().rev().flatten().next() {
            Some(&chance) if chance.is_finite() && (0.0..=100.0).contains(&chance) => {
                odds.insert(team.abbreviation.to_string(), chance);
            }
            other => {
                warn!(team = team.abbreviation, value = ?other, "No usable Sports Club Stats value");
            }
        }
    }

    if odds.is_empty() {
        anyhow::bail!("Sports Club Stats feed contained no teams");
    }

    Ok(odds)
}

pub struct SportsClubStatsClient {
    http: Client,
}

impl SportsClubStatsClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("playoff-odds/0.1.0")
            .build()
            .context("Failed to build HTTP client for Sports Club Stats")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl OddsProvider for SportsClubStatsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SportsClubStats
    }

    async fn last_update(&self) -> Result<DateTime<FixedOffset>> {
        let resp = self
            .http
            .head(FEED_URL)
            .send()
            .await
            .context("Sports Club Stats HEAD request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Sports Club Stats error {}", resp.status());
        }

        let header = resp
            .headers()
            .get(LAST_MODIFIED)
            .context("Sports Club Stats response has no Last-Modified header")?
            .to_str()
            .context("Last-Modified header is not valid text")?;

        parse_last_modified(header)
    }

    async fn league_odds(&self) -> Result<BTreeMap<String, f64>> {
        debug!(url = FEED_URL, "Fetching Sports Club Stats feed");

        let resp = self
            .http
            .get(FEED_URL)
            .send()
            .await
            .context("Sports Club Stats request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Sports Club Stats error {}", resp.status());
        }

        let body = resp.text().await.context("Failed to read Sports Club Stats feed")?;
        parse_feed(&body)
    }
}

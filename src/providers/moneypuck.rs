//! MoneyPuck simulation feed.
//!
//! `update_date.txt` holds a single timestamp such as
//! `2024-03-09 00:50:54.979432-05:00`. `simulations_recent.csv` holds one
//! row per team and scenario; the `ALL` scenario's `madePlayoffs` column is
//! the playoff probability as a 0–1 fraction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::OddsProvider;
use crate::types::ProviderKind;

const UPDATE_DATE_URL: &str = "https://moneypuck.com/moneypuck/simulations/update_date.txt";
const SIMULATIONS_URL: &str = "https://moneypuck.com/moneypuck/simulations/simulations_recent.csv";

/// Scenario row carrying the unconditioned probabilities.
const ALL_SCENARIO: &str = "ALL";

#[derive(Debug, Deserialize)]
struct SimulationRow {
    #[serde(rename = "teamCode")]
    team_code: String,
    // Column name is misspelled upstream.
    scenerio: String,
    #[serde(rename = "madePlayoffs")]
    made_playoffs: f64,
}

/// MoneyPuck uses dotted codes for a few teams in some exports.
fn normalize_team_code(code: &str) -> String {
    match code.trim() {
        "T.B" => "TBL".to_string(),
        "N.J" => "NJD".to_string(),
        "S.J" => "SJS".to_string(),
        "L.A" => "LAK".to_string(),
        other => other.to_uppercase(),
    }
}

/// Parse the contents of `update_date.txt`.
pub fn parse_update_date(body: &str) -> Result<DateTime<FixedOffset>> {
    let body = body.trim();
    DateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S%.f%:z")
        .or_else(|_| DateTime::parse_from_rfc3339(body))
        .with_context(|| format!("Unrecognised MoneyPuck update date: {body:?}"))
}

/// Parse the simulations CSV into percentages keyed by team abbreviation.
pub fn parse_simulations(body: &str) -> Result<BTreeMap<String, f64>> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut odds = BTreeMap::new();

    for row in reader.deserialize::<SimulationRow>() {
        let row = row.context("Failed to parse MoneyPuck simulations row")?;
        if row.scenerio != ALL_SCENARIO {
            continue;
        }
        if !row.made_playoffs.is_finite() || !(0.0..=1.0).contains(&row.made_playoffs) {
            warn!(team = %row.team_code, value = row.made_playoffs, "Ignoring out-of-range MoneyPuck probability");
            continue;
        }
        odds.insert(normalize_team_code(&row.team_code), row.made_playoffs * 100.0);
    }

    if odds.is_empty() {
        anyhow::bail!("MoneyPuck simulations contained no {ALL_SCENARIO} rows");
    }

    Ok(odds)
}

pub struct MoneyPuckClient {
    http: Client,
}

impl MoneyPuckClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("playoff-odds/0.1.0")
            .build()
            .context("Failed to build HTTP client for MoneyPuck")?;
        Ok(Self { http })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching MoneyPuck resource");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("MoneyPuck request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("MoneyPuck error {status} for {url}");
        }

        resp.text().await.context("Failed to read MoneyPuck response")
    }
}

#[async_trait]
impl OddsProvider for MoneyPuckClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MoneyPuck
    }

    async fn last_update(&self) -> Result<DateTime<FixedOffset>> {
        let body = self.get_text(UPDATE_DATE_URL).await?;
        parse_update_date(&body)
    }

    async fn league_odds(&self) -> Result<BTreeMap<String, f64>> {
        let body = self.get_text(SIMULATIONS_URL).await?;
        parse_simulations(&body)
    }
}

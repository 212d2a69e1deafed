//! NHL standings provider.
//!
//! API: `https://api-web.nhle.com/v1/standings/now`
//! Auth: none.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::StandingsSource;
use crate::types::{ClinchIndicator, Conference, PipelineError, Standing};

const STANDINGS_URL: &str = "https://api-web.nhle.com/v1/standings/now";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    standings: Vec<ApiStanding>,
}

#[derive(Debug, Deserialize)]
struct LocalizedName {
    default: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStanding {
    team_abbrev: LocalizedName,
    team_name: LocalizedName,
    conference_abbrev: String,
    division_abbrev: String,
    #[serde(default)]
    division_sequence: u32,
    #[serde(default)]
    conference_sequence: u32,
    #[serde(default)]
    wildcard_sequence: u32,
    #[serde(default)]
    games_played: u32,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    wins: u32,
    #[serde(default)]
    losses: u32,
    #[serde(default)]
    ot_losses: u32,
    #[serde(default)]
    regulation_wins: u32,
    #[serde(default)]
    regulation_plus_ot_wins: u32,
    #[serde(default)]
    clinch_indicator: Option<String>,
}

impl ApiStanding {
    fn into_standing(self) -> Option<Standing> {
        let conference = Conference::from_abbrev(&self.conference_abbrev)?;
        Some(Standing {
            team: self.team_abbrev.default,
            team_name: self.team_name.default,
            conference,
            division: self.division_abbrev,
            division_sequence: self.division_sequence,
            conference_sequence: self.conference_sequence,
            wildcard_sequence: self.wildcard_sequence,
            games_played: self.games_played,
            points: self.points,
            wins: self.wins,
            losses: self.losses,
            ot_losses: self.ot_losses,
            regulation_wins: self.regulation_wins,
            regulation_plus_ot_wins: self.regulation_plus_ot_wins,
            clinch: self
                .clinch_indicator
                .as_deref()
                .and_then(ClinchIndicator::from_code),
        })
    }
}

/// Parse the body of the standings endpoint.
pub fn parse_standings(body: &str) -> Result<Vec<Standing>> {
    let response: StandingsResponse =
        serde_json::from_str(body).context("Failed to parse NHL standings response")?;

    let standings = response
        .standings
        .into_iter()
        .filter_map(|row| {
            let team = row.team_abbrev.default.clone();
            let standing = row.into_standing();
            if standing.is_none() {
                warn!(team = %team, "Skipping standing with unknown conference");
            }
            standing
        })
        .collect();

    Ok(standings)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct NhlStandingsClient {
    http: Client,
    url: String,
}

impl NhlStandingsClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("playoff-odds/0.1.0")
            .build()
            .context("Failed to build NHL HTTP client")?;
        Ok(Self {
            http,
            url: STANDINGS_URL.to_string(),
        })
    }

    async fn fetch(&self) -> Result<Vec<Standing>> {
        debug!(url = %self.url, "Fetching NHL standings");

        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("NHL standings request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("NHL standings error {status}: {body}");
        }

        let body = resp.text().await.context("Failed to read NHL standings body")?;
        parse_standings(&body)
    }
}

#[async_trait]
impl StandingsSource for NhlStandingsClient {
    async fn standings(&self) -> Result<Vec<Standing>, PipelineError> {
        let standings = self
            .fetch()
            .await
            .map_err(|e| PipelineError::StandingsUnavailable(format!("{e:#}")))?;
        if standings.is_empty() {
            return Err(PipelineError::StandingsUnavailable(
                "standings feed returned no teams".to_string(),
            ));
        }
        Ok(standings)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "wildCardIndicator": true,
        "standings": [
            {
                "clinchIndicator": "x",
                "conferenceAbbrev": "E",
                "divisionAbbrev": "M",
                "divisionSequence": 1,
                "conferenceSequence": 1,
                "wildcardSequence": 0,
                "gamesPlayed": 64,
                "points": 90,
                "wins": 44,
                "losses": 18,
                "otLosses": 2,
                "regulationWins": 35,
                "regulationPlusOtWins": 41,
                "teamAbbrev": { "default": "NYR" },
                "teamName": { "default": "New York Rangers", "fr": "Rangers de New York" }
            },
            {
                "conferenceAbbrev": "W",
                "divisionAbbrev": "C",
                "divisionSequence": 5,
                "conferenceSequence": 8,
                "wildcardSequence": 2,
                "gamesPlayed": 65,
                "points": 76,
                "wins": 37,
                "losses": 26,
                "otLosses": 2,
                "regulationWins": 29,
                "regulationPlusOtWins": 34,
                "teamAbbrev": { "default": "NSH" },
                "teamName": { "default": "Nashville Predators" }
            },
            {
                "conferenceAbbrev": "X",
                "divisionAbbrev": "Q",
                "teamAbbrev": { "default": "ZZZ" },
                "teamName": { "default": "Exhibition" }
            }
        ]
    }"#;

    #[test]
    fn test_parse_standings() {
        let standings = parse_standings(FIXTURE).unwrap();
        assert_eq!(standings.len(), 2);

        let nyr = &standings[0];
        assert_eq!(nyr.team, "NYR");
        assert_eq!(nyr.conference, Conference::Eastern);
        assert_eq!(nyr.clinch, Some(ClinchIndicator::ClinchedPlayoffs));
        assert_eq!(nyr.record(), "44-18-2");

        let nsh = &standings[1];
        assert_eq!(nsh.team_name, "Nashville Predators");
        assert_eq!(nsh.wildcard_sequence, 2);
        assert_eq!(nsh.regulation_plus_ot_wins, 34);
        assert!(nsh.clinch.is_none());
    }

    #[test]
    fn test_parse_standings_invalid() {
        assert!(parse_standings("<html>down for maintenance</html>").is_err());
    }
}

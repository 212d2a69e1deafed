//! Shared types for the playoff odds bot.
//!
//! These types form the data model used across all modules: static team
//! identity, league standings, provider odds, the snapshot that gets
//! fingerprinted, and the domain error kinds.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Below this percentage a figure counts as zero for suppression purposes.
pub const ZERO_ODDS_THRESHOLD: f64 = 0.01;

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// NHL conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Conference {
    Eastern,
    Western,
}

impl Conference {
    /// Single-letter abbreviation used by the league API.
    pub fn abbrev(&self) -> &'static str {
        match self {
            Conference::Eastern => "E",
            Conference::Western => "W",
        }
    }

    pub fn from_abbrev(abbrev: &str) -> Option<Self> {
        match abbrev {
            "E" => Some(Conference::Eastern),
            "W" => Some(Conference::Western),
            _ => None,
        }
    }
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conference::Eastern => write!(f, "Eastern Conference"),
            Conference::Western => write!(f, "Western Conference"),
        }
    }
}

/// Static team identity. The full roster lives in `data::teams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    /// Three-letter league code, e.g. `NSH`.
    pub abbreviation: &'static str,
    /// Full display name, e.g. `Nashville Predators`.
    pub name: &'static str,
    /// Location name as used by Sports Club Stats, e.g. `Nashville`.
    pub short_name: &'static str,
    /// Hashtag without the leading `#`.
    pub hashtag: &'static str,
    /// Brand color as `#RRGGBB`.
    pub color: &'static str,
    pub conference: Conference,
    /// Division abbreviation as used by the league API (`A`, `M`, `C`, `P`).
    pub division: &'static str,
}

impl Team {
    /// Team name with whitespace and dots stripped, for use as a hashtag.
    pub fn compact_name(&self) -> String {
        self.name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .collect()
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.abbreviation)
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// Official playoff status published by the league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClinchIndicator {
    Eliminated,
    ClinchedPlayoffs,
    ClinchedDivision,
    ClinchedConference,
    PresidentsTrophy,
    /// A code we have no label for. Still counts as an official status.
    Other(String),
}

impl ClinchIndicator {
    /// Parse a league clinch code. Empty codes mean "no status".
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        match code {
            "" => None,
            "e" => Some(ClinchIndicator::Eliminated),
            "x" => Some(ClinchIndicator::ClinchedPlayoffs),
            "y" => Some(ClinchIndicator::ClinchedDivision),
            "z" => Some(ClinchIndicator::ClinchedConference),
            "p" => Some(ClinchIndicator::PresidentsTrophy),
            other => Some(ClinchIndicator::Other(other.to_string())),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ClinchIndicator::Eliminated => "e",
            ClinchIndicator::ClinchedPlayoffs => "x",
            ClinchIndicator::ClinchedDivision => "y",
            ClinchIndicator::ClinchedConference => "z",
            ClinchIndicator::PresidentsTrophy => "p",
            ClinchIndicator::Other(code) => code,
        }
    }

    /// Text drawn in place of the odds columns.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ClinchIndicator::Eliminated => Some("Eliminated"),
            ClinchIndicator::ClinchedPlayoffs => Some("Clinched Playoffs"),
            ClinchIndicator::ClinchedDivision => Some("Clinched Division"),
            ClinchIndicator::ClinchedConference => Some("Clinched Conference"),
            ClinchIndicator::PresidentsTrophy => Some("Presidents' Trophy"),
            ClinchIndicator::Other(_) => None,
        }
    }

    /// Text shown on a team card in place of its odds.
    pub fn headline(&self) -> String {
        match self.label() {
            Some(label) => label.to_string(),
            None => format!("Status: {}", self.code()),
        }
    }
}

/// A team's current record, as published by the league for today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Team abbreviation, e.g. `NSH`.
    pub team: String,
    pub team_name: String,
    pub conference: Conference,
    /// Division abbreviation (`A`, `M`, `C`, `P`).
    pub division: String,
    pub division_sequence: u32,
    pub conference_sequence: u32,
    pub wildcard_sequence: u32,
    pub games_played: u32,
    pub points: u32,
    pub wins: u32,
    pub losses: u32,
    pub ot_losses: u32,
    pub regulation_wins: u32,
    pub regulation_plus_ot_wins: u32,
    pub clinch: Option<ClinchIndicator>,
}

impl Standing {
    /// `W-L-OTL` record string.
    pub fn record(&self) -> String {
        format!("{}-{}-{}", self.wins, self.losses, self.ot_losses)
    }

    /// Helper to build a test standing with sensible defaults.
    #[cfg(test)]
    pub fn sample(team: &str, conference: Conference, division: &str) -> Self {
        Standing {
            team: team.to_string(),
            team_name: format!("Team {team}"),
            conference,
            division: division.to_string(),
            division_sequence: 1,
            conference_sequence: 1,
            wildcard_sequence: 1,
            games_played: 60,
            points: 70,
            wins: 32,
            losses: 22,
            ot_losses: 6,
            regulation_wins: 26,
            regulation_plus_ot_wins: 30,
            clinch: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// The statistical providers the bot knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
    MoneyPuck,
    SportsClubStats,
}

impl ProviderKind {
    /// Short column heading for the league table.
    pub fn short_label(&self) -> &'static str {
        match self {
            ProviderKind::MoneyPuck => "MP",
            ProviderKind::SportsClubStats => "SCS",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::MoneyPuck => write!(f, "MoneyPuck"),
            ProviderKind::SportsClubStats => write!(f, "Sports Club Stats"),
        }
    }
}

/// One provider's full fetch for this run: its update timestamp plus the
/// league-wide mapping from team abbreviation to playoff percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOdds {
    pub provider: ProviderKind,
    pub last_update: DateTime<FixedOffset>,
    pub odds: BTreeMap<String, f64>,
}

impl ProviderOdds {
    /// Look up one team's sample.
    pub fn sample(&self, team: &str) -> Result<OddsSample, PipelineError> {
        self.odds
            .get(team)
            .map(|&percentage| OddsSample {
                provider: self.provider,
                team: team.to_string(),
                percentage,
                last_update: self.last_update,
            })
            .ok_or_else(|| PipelineError::TeamNotFound {
                provider: self.provider,
                team: team.to_string(),
            })
    }
}

/// A single provider's estimate for one team.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsSample {
    pub provider: ProviderKind,
    pub team: String,
    /// 0–100 inclusive.
    pub percentage: f64,
    pub last_update: DateTime<FixedOffset>,
}

/// What a snapshot covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    League,
    Team(String),
}

impl Scope {
    /// Suffix used in cache keys.
    pub fn key_suffix(&self) -> &str {
        match self {
            Scope::League => "league",
            Scope::Team(abbrev) => abbrev,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_suffix())
    }
}

/// The union of all fresh providers' odds for one scope at one point in time.
///
/// Ordered maps keep the serialized form canonical: providers and teams
/// always appear in sorted key order.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsSnapshot {
    pub scope: Scope,
    pub odds: BTreeMap<ProviderKind, BTreeMap<String, f64>>,
}

impl OddsSnapshot {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            odds: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, provider: ProviderKind, team: &str, percentage: f64) {
        self.odds
            .entry(provider)
            .or_default()
            .insert(team.to_string(), percentage);
    }

    pub fn is_empty(&self) -> bool {
        self.odds.values().all(|teams| teams.is_empty())
    }

    /// Providers present in this snapshot, in canonical order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.odds
            .iter()
            .filter(|(_, teams)| !teams.is_empty())
            .map(|(provider, _)| *provider)
            .collect()
    }

    pub fn value(&self, provider: ProviderKind, team: &str) -> Option<f64> {
        self.odds.get(&provider).and_then(|teams| teams.get(team)).copied()
    }

    /// True when every included figure is effectively 0%.
    pub fn is_effectively_zero(&self) -> bool {
        !self.is_empty()
            && self
                .odds
                .values()
                .flat_map(|teams| teams.values())
                .all(|&p| p < ZERO_ODDS_THRESHOLD)
    }

    /// Canonical serialization used for change detection.
    pub fn fingerprint(&self) -> Result<String, PipelineError> {
        serde_json::to_string(&self.odds)
            .map_err(|e| PipelineError::Cache(format!("Failed to serialise snapshot: {e}")))
    }

    /// Rebuild a snapshot from a stored fingerprint. Records written by
    /// older releases may not parse; those yield `None`.
    pub fn from_fingerprint(scope: Scope, fingerprint: &str) -> Option<Self> {
        serde_json::from_str(fingerprint)
            .ok()
            .map(|odds| Self { scope, odds })
    }
}

// ---------------------------------------------------------------------------
// Publication
// ---------------------------------------------------------------------------

/// PNG bytes produced by the rasterizer. Not `Clone`: an image is handed
/// to the publisher by value and uploaded once.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderedImage {
    bytes: Vec<u8>,
}

impl RenderedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A previously published status that later posts can reply to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub status_id: String,
    pub uri: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error kinds for the publication pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        provider: ProviderKind,
        message: String,
    },

    #[error("Team {team} not found in {provider} feed")]
    TeamNotFound { provider: ProviderKind, team: String },

    #[error("Standings unavailable: {0}")]
    StandingsUnavailable(String),

    #[error("Publish failed after {attempts} attempts: {message}")]
    PublishTransport { attempts: u32, message: String },

    #[error("Publish rejected (HTTP {status}): {message}")]
    PublishRejected { status: u16, message: String },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Mock collaborators for integration testing.
//!
//! Deterministic providers, standings, cache, social client and renderer,
//! all in-memory with no external dependencies. Every mock records what
//! it was asked to do so tests can assert on side effects.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use playoff_odds::data::StandingsSource;
use playoff_odds::providers::OddsProvider;
use playoff_odds::render::{ImageRenderer, Scene};
use playoff_odds::social::{MediaAttachment, PostedStatus, SocialClient, SocialError, StatusRequest};
use playoff_odds::storage::CacheStore;
use playoff_odds::types::{
    Conference, PipelineError, ProviderKind, RenderedImage, Standing,
};

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub struct StaticProvider {
    kind: ProviderKind,
    last_update: DateTime<FixedOffset>,
    odds: BTreeMap<String, f64>,
    unavailable: bool,
}

impl StaticProvider {
    pub fn new(kind: ProviderKind, last_update: &str, odds: &[(&str, f64)]) -> Self {
        Self {
            kind,
            last_update: DateTime::parse_from_rfc3339(last_update).expect("valid timestamp"),
            odds: odds.iter().map(|(t, v)| (t.to_string(), *v)).collect(),
            unavailable: false,
        }
    }

    pub fn unavailable(kind: ProviderKind) -> Self {
        Self {
            unavailable: true,
            ..Self::new(kind, "2024-03-09T00:00:00Z", &[])
        }
    }
}

#[async_trait]
impl OddsProvider for StaticProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn last_update(&self) -> Result<DateTime<FixedOffset>> {
        if self.unavailable {
            return Err(anyhow!("HTTP 503"));
        }
        Ok(self.last_update)
    }

    async fn league_odds(&self) -> Result<BTreeMap<String, f64>> {
        if self.unavailable {
            return Err(anyhow!("HTTP 503"));
        }
        Ok(self.odds.clone())
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

pub struct StaticStandings {
    standings: Option<Vec<Standing>>,
    calls: AtomicUsize,
}

impl StaticStandings {
    pub fn new(standings: Vec<Standing>) -> Self {
        Self {
            standings: Some(standings),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            standings: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StandingsSource for StaticStandings {
    async fn standings(&self) -> Result<Vec<Standing>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.standings
            .clone()
            .ok_or_else(|| PipelineError::StandingsUnavailable("HTTP 502".into()))
    }
}

/// A standing with a plausible record.
pub fn standing(
    team: &str,
    team_name: &str,
    conference: Conference,
    division: &str,
    division_sequence: u32,
    wildcard_sequence: u32,
    points: u32,
) -> Standing {
    Standing {
        team: team.to_string(),
        team_name: team_name.to_string(),
        conference,
        division: division.to_string(),
        division_sequence,
        conference_sequence: division_sequence,
        wildcard_sequence,
        games_played: 66,
        points,
        wins: points / 2,
        losses: 66 - points / 2 - 4,
        ot_losses: 4,
        regulation_wins: points / 2 - 5,
        regulation_plus_ot_wins: points / 2 - 2,
        clinch: None,
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// A store whose backend is down.
pub struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, PipelineError> {
        Err(PipelineError::Cache("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), PipelineError> {
        Err(PipelineError::Cache("connection refused".into()))
    }

    async fn del(&self, _key: &str) -> Result<(), PipelineError> {
        Err(PipelineError::Cache("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// Records uploads and statuses. Optionally fails every call.
#[derive(Default)]
pub struct RecordingSocial {
    upload_attempts: AtomicUsize,
    descriptions: Mutex<Vec<String>>,
    statuses: Mutex<Vec<(String, StatusRequest)>>,
    failure: Option<SocialError>,
}

impl RecordingSocial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: SocialError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.load(Ordering::SeqCst)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.descriptions.lock().unwrap().clone()
    }

    /// `(status id, request)` per created status, in order.
    pub fn statuses(&self) -> Vec<(String, StatusRequest)> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialClient for RecordingSocial {
    async fn upload_media(
        &self,
        image: &RenderedImage,
        description: &str,
    ) -> Result<MediaAttachment, SocialError> {
        let attempt = self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        assert!(!image.is_empty());
        self.descriptions.lock().unwrap().push(description.to_string());
        Ok(MediaAttachment {
            id: format!("media-{attempt}"),
            rate_limit_remaining: Some(100),
        })
    }

    async fn create_status(&self, request: &StatusRequest) -> Result<PostedStatus, SocialError> {
        let mut statuses = self.statuses.lock().unwrap();
        let id = format!("status-{}", statuses.len());
        statuses.push((id.clone(), request.clone()));
        Ok(PostedStatus {
            id,
            uri: None,
            rate_limit_remaining: Some(100),
        })
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Returns fixed bytes and keeps every scene it was given.
#[derive(Default)]
pub struct CountingRenderer {
    pub scenes: Vec<Scene>,
}

impl ImageRenderer for CountingRenderer {
    fn render(&mut self, scene: &Scene) -> Result<RenderedImage, PipelineError> {
        self.scenes.push(scene.clone());
        Ok(RenderedImage::new(vec![0x89, b'P', b'N', b'G']))
    }
}

//! Odds provider integrations.
//!
//! Defines the `OddsProvider` trait and provides implementations for:
//! - MoneyPuck: simulation CSV, whole-league query
//! - Sports Club Stats: JSON history feed, per-team label lookup
//!
//! Providers keep no state between calls. A run calls [`fetch_all`] once
//! and carries the resulting [`ProviderOdds`] values around explicitly.

pub mod moneypuck;
pub mod sportsclubstats;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::types::{PipelineError, ProviderKind, ProviderOdds};

/// Abstraction over playoff probability feeds.
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// When the provider last refreshed its numbers.
    async fn last_update(&self) -> Result<DateTime<FixedOffset>>;

    /// Playoff percentage (0–100) for every team in the feed.
    async fn league_odds(&self) -> Result<BTreeMap<String, f64>>;
}

/// Fetch one provider's timestamp and league odds.
pub async fn fetch(provider: &dyn OddsProvider) -> Result<ProviderOdds, PipelineError> {
    let unavailable = |e: anyhow::Error| PipelineError::ProviderUnavailable {
        provider: provider.kind(),
        message: format!("{e:#}"),
    };

    let last_update = provider.last_update().await.map_err(unavailable)?;
    let odds = provider.league_odds().await.map_err(unavailable)?;

    Ok(ProviderOdds {
        provider: provider.kind(),
        last_update,
        odds,
    })
}

/// Fetch every provider in order. A failing provider is logged and left
/// out; its figures are never fabricated.
pub async fn fetch_all(providers: &[Box<dyn OddsProvider>]) -> Vec<ProviderOdds> {
    let mut fetched = Vec::with_capacity(providers.len());

    for provider in providers {
        info!(provider = %provider.kind(), "Retrieving odds");
        match fetch(provider.as_ref()).await {
            Ok(odds) => {
                info!(
                    provider = %odds.provider,
                    teams = odds.odds.len(),
                    last_update = %odds.last_update,
                    "Odds retrieved"
                );
                fetched.push(odds);
            }
            Err(e) => {
                warn!(provider = %provider.kind(), error = %e, "Provider unavailable, omitting its figures");
            }
        }
    }

    fetched
}

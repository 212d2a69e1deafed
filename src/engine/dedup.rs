//! Change detection against previously published snapshots.
//!
//! Each scope (the league, or one team) has a cache key holding the
//! fingerprint of the last snapshot that was successfully published.
//! A snapshot is publishable only when its fingerprint differs from that
//! record, compared as exact strings. The record is replaced only after a
//! publish succeeds.

use tracing::{debug, info};

use crate::data::teams::TEAMS;
use crate::storage::CacheStore;
use crate::types::{OddsSnapshot, PipelineError, Scope};

/// `<namespace>-<scope>`, e.g. `hockey-bot-odds-NSH`.
pub fn cache_key(namespace: &str, scope: &Scope) -> String {
    format!("{namespace}-{}", scope.key_suffix())
}

/// Outcome of comparing a snapshot with its stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Same fingerprint as last published: skip render and publish.
    Unchanged,
    /// Different or no record. Carries the previous fingerprint, if any.
    Changed { previous: Option<String> },
}

/// Result of a change check, holding what the caller needs to write the
/// record back after publishing.
#[derive(Debug, Clone)]
pub struct ChangeCheck {
    pub key: String,
    pub fingerprint: String,
    pub decision: Decision,
}

impl ChangeCheck {
    pub fn should_publish(&self) -> bool {
        matches!(self.decision, Decision::Changed { .. })
    }

    /// Decode the previous record for delta display.
    pub fn previous_snapshot(&self, scope: &Scope) -> Option<OddsSnapshot> {
        match &self.decision {
            Decision::Changed { previous: Some(fp) } => {
                OddsSnapshot::from_fingerprint(scope.clone(), fp)
            }
            _ => None,
        }
    }
}

/// Which records `clear` removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    /// One team's record.
    Team(String),
    /// The league record and every roster team's record.
    All,
}

pub struct Deduplicator<'a> {
    store: &'a dyn CacheStore,
    namespace: String,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a dyn CacheStore, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn key(&self, scope: &Scope) -> String {
        cache_key(&self.namespace, scope)
    }

    /// Compare `snapshot` with the stored record for its scope.
    pub async fn check(&self, snapshot: &OddsSnapshot) -> Result<ChangeCheck, PipelineError> {
        let key = self.key(&snapshot.scope);
        let fingerprint = snapshot.fingerprint()?;
        let cached = self.store.get(&key).await?;

        debug!(key = %key, fingerprint = %fingerprint, cached = ?cached, "Comparing with cached odds");

        let decision = match cached {
            Some(previous) if previous == fingerprint => Decision::Unchanged,
            previous => Decision::Changed { previous },
        };

        Ok(ChangeCheck {
            key,
            fingerprint,
            decision,
        })
    }

    /// Store the fingerprint of a snapshot that was just published.
    pub async fn record(&self, check: &ChangeCheck) -> Result<(), PipelineError> {
        self.store.set(&check.key, &check.fingerprint).await?;
        info!(key = %check.key, "Cache updated");
        Ok(())
    }

    /// Remove stored records so the next run republishes. Returns the keys
    /// that were cleared.
    pub async fn clear(&self, scope: &ClearScope) -> Result<Vec<String>, PipelineError> {
        let keys: Vec<String> = match scope {
            ClearScope::Team(abbrev) => vec![self.key(&Scope::Team(abbrev.clone()))],
            ClearScope::All => std::iter::once(self.key(&Scope::League))
                .chain(
                    TEAMS
                        .iter()
                        .map(|t| self.key(&Scope::Team(t.abbreviation.to_string()))),
                )
                .collect(),
        };

        for key in &keys {
            info!(key = %key, "Clearing cache");
            self.store.del(key).await?;
        }

        Ok(keys)
    }
}

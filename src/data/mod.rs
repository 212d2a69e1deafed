//! League reference data.
//!
//! Defines the `StandingsSource` trait, the NHL standings client and the
//! static team roster.

pub mod nhl;
pub mod teams;

use async_trait::async_trait;

use crate::types::{PipelineError, Standing};

/// Abstraction over the league standings feed.
#[async_trait]
pub trait StandingsSource: Send + Sync {
    /// Today's standings. Failure is fatal for the league-level image.
    async fn standings(&self) -> Result<Vec<Standing>, PipelineError>;
}

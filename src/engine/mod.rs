//! Core engine: freshness → change detection → standings → publish.

pub mod dedup;
pub mod pipeline;
pub mod publisher;
pub mod staleness;
pub mod standings;

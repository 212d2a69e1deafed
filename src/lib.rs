//! playoff-odds: NHL playoff odds publication bot.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod providers;
pub mod storage;
pub mod engine;
pub mod render;
pub mod social;

//! Tài/Xỉu predictor — pattern analysis and weighted scoring over a dice
//! outcome feed, with optional advisory enrichment.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod history;
pub mod analysis;
pub mod scoring;
pub mod llm;
pub mod engine;
pub mod api;

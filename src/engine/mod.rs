//! Core engine — the analyse → score → enrich → cache pipeline.

pub mod advisor;
pub mod cache;
pub mod pipeline;
pub mod warmer;

pub use pipeline::Predictor;

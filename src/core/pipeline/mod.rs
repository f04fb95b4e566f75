//! Per-record enrichment pipeline

pub mod enrichment;

pub use enrichment::{EncounterPipeline, RecordOutcome};

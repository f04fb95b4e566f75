//! Day-by-day harvest orchestration

pub mod coordinator;
pub mod summary;

pub use coordinator::{HarvestCoordinator, HarvestSettings};
pub use summary::HarvestSummary;

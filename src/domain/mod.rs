//! Domain models and types for the harvester.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ReferenceHandle`], [`GroupKey`], [`GroupKeys`])
//! - **Domain models** ([`EncounterCandidate`], [`EnrichedMessage`])
//! - **Error types** ([`HarvestError`], [`SourceError`])
//! - **Result type alias** ([`Result`])
//! - **Calendar helpers** for the `YYYY-MM-DD` dates used by the cursor
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, HarvestError>`]:
//!
//! ```rust
//! use harvester::domain::{HarvestError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = harvester::config::load_config("harvester.toml")?;
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod encounter;
pub mod errors;
pub mod ids;
pub mod message;
pub mod result;

// Re-export commonly used types for convenience
pub use encounter::{EncounterCandidate, Period};
pub use errors::{HarvestError, SourceError};
pub use ids::{GroupKey, GroupKeys, ReferenceHandle};
pub use message::{EncounterRecord, EnrichedMessage, ResolvedPatient, ResolvedPractitioner};
pub use result::Result;

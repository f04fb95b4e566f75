//! Result type alias for the harvester

use super::errors::HarvestError;

/// Result type alias for harvester operations
///
/// # Examples
///
/// ```
/// use harvester::domain::result::Result;
/// use harvester::domain::errors::HarvestError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(HarvestError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, HarvestError>;

//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers the pipeline routes on. Each type
//! validates its format at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Typed pointer to a related FHIR resource
///
/// A reference has the form `<ResourceType>/<id>`. The trailing id segment is
/// used for routing, while the full relative path is dereferenced against the
/// source base URL. Absolute references (`http://...`) are dereferenced as-is.
///
/// # Examples
///
/// ```
/// use harvester::domain::ids::ReferenceHandle;
/// use std::str::FromStr;
///
/// let handle = ReferenceHandle::from_str("Practitioner/123").unwrap();
/// assert_eq!(handle.resource_type(), Some("Practitioner"));
/// assert_eq!(handle.id(), "123");
/// assert_eq!(
///     handle.dereference_url("https://hapi.fhir.org/baseR4/"),
///     "https://hapi.fhir.org/baseR4/Practitioner/123"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceHandle(String);

impl ReferenceHandle {
    /// Creates a new ReferenceHandle from a reference string
    ///
    /// # Errors
    ///
    /// Returns `Err` if the reference is empty or ends with a separator
    pub fn new(reference: impl Into<String>) -> Result<Self, String> {
        let reference = reference.into().trim().to_string();
        if reference.is_empty() {
            return Err("Reference cannot be empty".to_string());
        }
        if reference.ends_with('/') {
            return Err(format!("Reference has no id segment: {reference}"));
        }
        Ok(Self(reference))
    }

    /// Returns the full reference as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing id segment (the whole reference when it has no separator)
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resource type segment preceding the id, if present
    pub fn resource_type(&self) -> Option<&str> {
        let mut segments = self.0.rsplit('/');
        segments.next();
        segments.next().filter(|s| !s.is_empty())
    }

    /// Whether the reference is an absolute URL
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// Builds the URL used to fetch the referenced resource
    pub fn dereference_url(&self, base_url: &str) -> String {
        if self.is_absolute() {
            return self.0.clone();
        }
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.0.trim_start_matches('/')
        )
    }
}

impl fmt::Display for ReferenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReferenceHandle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ReferenceHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordering/partition key for the downstream queue
///
/// Messages that share a group key are delivered in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(String);

/// Longest group key accepted by FIFO queues
pub const MAX_GROUP_KEY_LEN: usize = 128;

impl GroupKey {
    /// Creates a new GroupKey
    ///
    /// # Errors
    ///
    /// Returns `Err` if the key is empty or longer than 128 characters
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("Group key cannot be empty".to_string());
        }
        if key.chars().count() > MAX_GROUP_KEY_LEN {
            return Err(format!(
                "Group key exceeds {MAX_GROUP_KEY_LEN} characters: {key}"
            ));
        }
        Ok(Self(key))
    }

    /// Returns the group key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Fixed set of ordering lanes assigned by entry position
///
/// Entry `i` of a day's batch goes to lane `i % len`, so with the default two
/// lanes even positions get the first key and odd positions the second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKeys(Vec<GroupKey>);

impl GroupKeys {
    /// Builds the lane set from raw keys
    ///
    /// # Errors
    ///
    /// Returns `Err` if no keys are given or any key is invalid
    pub fn new<I, S>(keys: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(GroupKey::new)
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err("At least one group key is required".to_string());
        }
        Ok(Self(keys))
    }

    /// Group key for the entry at `position` in its day's batch
    pub fn for_position(&self, position: usize) -> &GroupKey {
        &self.0[position % self.0.len()]
    }

    /// Number of lanes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; construction rejects an empty set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

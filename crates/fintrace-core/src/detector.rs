//! Detector metadata.
//!
//! Every detector carries a `DetectorMetadata` describing what it is and
//! whether its search is bounded by a [`crate::budget::SearchBudget`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a detector explores the graph.
///
/// Determines whether the engine hands it a meaningful search budget:
/// - `Enumeration`: path/cycle enumeration, cost grows combinatorially with density
/// - `Scan`: linear or sort-dominated passes over transactions or accounts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Depth-first enumeration of paths or cycles.
    Enumeration,
    /// Single pass over grouped transactions or account aggregates.
    Scan,
}

impl SearchKind {
    /// Returns true if this detector enumerates paths.
    #[must_use]
    pub const fn is_enumeration(&self) -> bool {
        matches!(self, SearchKind::Enumeration)
    }

    /// Returns the kind name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Enumeration => "enumeration",
            SearchKind::Scan => "scan",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detector metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorMetadata {
    /// Unique detector identifier (e.g., "detection/cycles").
    pub id: String,

    /// How the detector explores the graph.
    pub search: SearchKind,

    /// Human-readable description.
    pub description: String,

    /// Version of the detector rules.
    ///
    /// Bumped whenever thresholds or scoring change so reports can be compared.
    pub version: u32,
}

impl DetectorMetadata {
    /// Metadata for an enumerating detector.
    #[must_use]
    pub fn enumeration(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            search: SearchKind::Enumeration,
            description: String::new(),
            version: 1,
        }
    }

    /// Metadata for a scanning detector.
    #[must_use]
    pub fn scan(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            search: SearchKind::Scan,
            description: String::new(),
            version: 1,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

impl Default for DetectorMetadata {
    fn default() -> Self {
        Self::scan("unnamed")
    }
}

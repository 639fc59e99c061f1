//! Hierarchical property identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ArchiveError;

/// A property in the archive: facility / device / location / property.
///
/// Each segment is one directory level under the archive root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyPath {
    pub facility: String,
    pub device: String,
    pub location: String,
    pub property: String,
}

impl PropertyPath {
    pub fn new(
        facility: impl Into<String>,
        device: impl Into<String>,
        location: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            facility: facility.into(),
            device: device.into(),
            location: location.into(),
            property: property.into(),
        }
    }

    /// Human-readable key, `facility/device/location/property`.
    pub fn display_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.facility, self.device, self.location, self.property
        )
    }

    /// Directory holding this property's partitions under `root`.
    pub fn dir_under(&self, root: &Path) -> PathBuf {
        root.join(&self.facility)
            .join(&self.device)
            .join(&self.location)
            .join(&self.property)
    }

    /// Check whether the display key contains every needle.
    pub fn matches_all(&self, needles: &[&str]) -> bool {
        let key = self.display_key();
        needles.iter().all(|n| key.contains(n))
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_key())
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({})", self.display_key())
    }
}

impl FromStr for PropertyPath {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().trim_matches('/').split('/').collect();
        match parts.as_slice() {
            [fac, dev, loc, prop] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Self::new(*fac, *dev, *loc, *prop))
            }
            _ => Err(ArchiveError::InvalidPropertyPath(s.to_string())),
        }
    }
}

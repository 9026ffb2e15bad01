// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Account entry identifiers.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Identifies one configured EyeOnWater account.
///
/// Every [`CoordinatorEvent`](super::CoordinatorEvent) carries the id of
/// the account it was published for, which is what
/// [`EventBus::subscribe_entry`](super::EventBus::subscribe_entry) filters
/// on. The id serializes as a plain UUID string, so a host can persist it
/// and hand it back after a restart.
///
/// # Examples
///
/// ```
/// use eyeonwater::event::EntryId;
///
/// let stored = EntryId::new().to_string();
/// let restored: EntryId = stored.parse().unwrap();
/// assert_eq!(restored.to_string(), stored);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a random entry id for a newly configured account.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

// Log lines only need enough of the id to tell accounts apart
impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "EntryId({})", &simple[..8])
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for EntryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORED: &str = "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8";

    #[test]
    fn accounts_get_distinct_ids() {
        assert_ne!(EntryId::new(), EntryId::new());
    }

    #[test]
    fn parses_stored_id() {
        let id: EntryId = STORED.parse().unwrap();
        assert_eq!(id.to_string(), STORED);
        assert_eq!(format!(" {STORED}\n").parse::<EntryId>().unwrap(), id);
    }

    #[test]
    fn parses_simple_form() {
        let id: EntryId = "a1a2a3a4b1b2c1c2d1d2d3d4d5d6d7d8".parse().unwrap();
        assert_eq!(id.to_string(), STORED);
    }

    #[test]
    fn rejects_garbage() {
        assert!("kitchen".parse::<EntryId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: EntryId = STORED.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{STORED}\""));
        assert_eq!(serde_json::from_str::<EntryId>(&json).unwrap(), id);
    }

    #[test]
    fn debug_shows_a_prefix() {
        let id: EntryId = STORED.parse().unwrap();
        assert_eq!(format!("{id:?}"), "EntryId(a1a2a3a4)");
    }
}

//! Document key and login identifier derivation.
//!
//! Station documents are keyed by [`normalize_key`] of their display name so
//! that re-importing the same spreadsheet overwrites instead of duplicating.
//! Because normalization is lossy, [`KeyRegistry`] refuses two *different*
//! display names that land on the same key. Station rows go through
//! [`KeyRegistry::register_unique`], which also refuses a repeated name, since
//! either case would overwrite one station document with another.

use std::collections::HashMap;

use crate::error::{PssError, PssResult};

/// Trim, lowercase and strip every whitespace character.
///
/// `"River Side PTR"` and `" riverside ptr "` both become `"riversideptr"`.
pub fn normalize_key(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Tracks key -> first display name for one run.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    seen: HashMap<String, String>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name and return its key.
    ///
    /// The same display name may be registered repeatedly; a different one
    /// normalizing to an existing key is a [`PssError::KeyCollision`].
    pub fn register(&mut self, display_name: &str) -> PssResult<String> {
        let display = display_name.trim();
        let key = normalize_key(display);
        match self.seen.get(&key) {
            Some(existing) if existing != display => Err(PssError::KeyCollision {
                key,
                first: existing.clone(),
                second: display.to_string(),
            }),
            Some(_) => Ok(key),
            None => {
                self.seen.insert(key.clone(), display.to_string());
                Ok(key)
            }
        }
    }

    /// Register a display name whose key must not have been seen at all.
    ///
    /// One station row per key: a repeated name, even spelled identically,
    /// would overwrite the earlier row's document.
    pub fn register_unique(&mut self, display_name: &str) -> PssResult<String> {
        let display = display_name.trim();
        let key = normalize_key(display);
        if let Some(existing) = self.seen.get(&key) {
            return Err(PssError::KeyCollision {
                key,
                first: existing.clone(),
                second: display.to_string(),
            });
        }
        self.seen.insert(key.clone(), display.to_string());
        Ok(key)
    }
}

/// Deterministic login identifiers: `base + station_index * stride + personnel_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginScheme {
    pub base: u64,
    pub stride: u64,
}

impl Default for LoginScheme {
    fn default() -> Self {
        Self {
            base: 9_100_000_000,
            stride: 100,
        }
    }
}

impl LoginScheme {
    pub fn new(base: u64, stride: u64) -> Self {
        Self { base, stride }
    }

    /// Login id for the `personnel_index`-th person of the `station_index`-th row.
    ///
    /// Fails when the personnel index would spill into the next station's range.
    pub fn derive(&self, station_index: usize, personnel_index: usize) -> Result<String, String> {
        let personnel = personnel_index as u64;
        if personnel >= self.stride {
            return Err(format!(
                "station has more than {} personnel; login identifiers would overlap the next station",
                self.stride
            ));
        }
        (station_index as u64)
            .checked_mul(self.stride)
            .and_then(|offset| offset.checked_add(personnel))
            .and_then(|offset| self.base.checked_add(offset))
            .map(|id| id.to_string())
            .ok_or_else(|| "login identifier overflows".to_string())
    }
}

/// Rejects any login identifier handed out twice during one run.
#[derive(Debug, Default)]
pub struct LoginRegistry {
    owners: HashMap<String, String>,
}

impl LoginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `owner` describes who holds the id, e.g. `"lineman A @ riversideptr"`.
    pub fn register(&mut self, login_id: &str, owner: &str) -> PssResult<()> {
        if let Some(first) = self.owners.get(login_id) {
            return Err(PssError::LoginCollision {
                login_id: login_id.to_string(),
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        self.owners.insert(login_id.to_string(), owner.to_string());
        Ok(())
    }
}

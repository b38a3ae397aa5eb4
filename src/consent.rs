use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slog::{debug, Logger};
use time::OffsetDateTime;

use crate::errors::StorageError;
use crate::storage::Storage;

/// The storage key under which the consent record is persisted. Kept
/// stable across releases so earlier decisions remain valid.
pub const CONSENT_STORAGE_KEY: &str = "lx_cookie_consent_v1";

/// A single optional cookie category. The necessary baseline is always
/// active and is not modeled here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Functional,
    Analytics,
    Marketing,
}

/// The per-category opt-in flags of a consent decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryFlags {
    #[serde(default)]
    pub functional: bool,

    #[serde(default)]
    pub analytics: bool,

    #[serde(default)]
    pub marketing: bool,
}

impl CategoryFlags {
    /// Returns flags with every category granted.
    pub fn all() -> Self {
        CategoryFlags {
            functional: true,
            analytics: true,
            marketing: true,
        }
    }

    pub fn get(&self, category: Category) -> bool {
        match category {
            Category::Functional => self.functional,
            Category::Analytics => self.analytics,
            Category::Marketing => self.marketing,
        }
    }

    pub fn set(&mut self, category: Category, value: bool) {
        match category {
            Category::Functional => self.functional = value,
            Category::Analytics => self.analytics = value,
            Category::Marketing => self.marketing = value,
        }
    }
}

/// The persisted record of a visitor's cookie decision.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ConsentRecord {
    /// Whether the visitor has made an explicit choice.
    #[serde(default)]
    pub decided: bool,

    /// The per-category flags of the latest decision.
    #[serde(flatten)]
    pub flags: CategoryFlags,

    /// The time of the latest decision.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

impl Default for ConsentRecord {
    fn default() -> Self {
        ConsentRecord {
            decided: false,
            flags: CategoryFlags::default(),
            timestamp: None,
        }
    }
}

/// Reads and writes the persisted consent record. Pure data access; the
/// banner and modal live in [`crate::consent_ui`].
pub struct ConsentStore {
    storage: Arc<dyn Storage>,
    key: String,
    logger: Logger,
}

impl ConsentStore {
    /// Creates a store over the given substrate, using the fixed key.
    pub fn new(storage: Arc<dyn Storage>, logger: Logger) -> Self {
        ConsentStore {
            storage,
            key: CONSENT_STORAGE_KEY.to_owned(),
            logger,
        }
    }

    /// Returns the persisted record merged over defaults. Never fails:
    /// absence, a storage error, or an unparsable value all yield the
    /// default undecided record.
    pub fn read(&self) -> ConsentRecord {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ConsentRecord::default(),
            Err(e) => {
                debug!(self.logger, "failed to read consent record"; "error" => format!("{:?}", e));
                return ConsentRecord::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!(self.logger, "discarding unparsable consent record"; "error" => format!("{:?}", e));
                ConsentRecord::default()
            }
        }
    }

    /// Persists a decision built from the given flags over defaults. Each
    /// decision fully replaces the previous record; `decided` is set and
    /// the timestamp refreshed.
    pub fn write(&self, flags: CategoryFlags) -> Result<ConsentRecord, StorageError> {
        let record = ConsentRecord {
            decided: true,
            flags,
            timestamp: Some(OffsetDateTime::now_utc()),
        };

        let raw = serde_json::to_string(&record)
            .map_err(|source| StorageError::Encoding { source })?;
        self.storage.set(&self.key, &raw)?;

        Ok(record)
    }
}

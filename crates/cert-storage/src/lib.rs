mod backend;
pub mod config;
mod envelope;
mod store;

pub use backend::{KeyValueStore, MemoryStore, SqliteStore, STORAGE_SCHEMA_VERSION};
pub use config::{load_config, resolve_data_dir, CertdashConfig};
pub use envelope::{decode_collection, encode_collection, Decoded, COLLECTION_SCHEMA_VERSION};
pub use store::{Caches, CertificationFilter, CollectionChange, Record, Store, SubscriptionId};

use cert_core::dashboard::LayoutError;
use cert_core::lifecycle::{DraftError, LifecycleError};
use cert_core::WorkflowError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DATABASE_FILE: &str = "certdash.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Certifications,
    Workflows,
    Dashboards,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Certifications,
        Collection::Workflows,
        Collection::Dashboards,
    ];

    /// Storage key, also the `collection` field of the envelope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Certifications => "certifications",
            Collection::Workflows => "workflows",
            Collection::Dashboards => "dashboards",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        Collection::ALL
            .into_iter()
            .find(|collection| collection.as_str() == normalized)
            .ok_or_else(|| format!("Unknown collection: {normalized}"))
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
    #[error("stored {collection} data is unreadable: {reason}")]
    Corrupt { collection: Collection, reason: String },
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: String },
    #[error("{collection} record {id} already exists")]
    AlreadyExists { collection: Collection, id: String },
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound { .. }
                | StorageError::Lifecycle(LifecycleError::TaskNotFound(_))
                | StorageError::Layout(LayoutError::WidgetNotFound(_))
        )
    }
}

//! Versioned JSON envelope around each persisted collection:
//! `{"schemaVersion": 1, "collection": "<name>", "records": [...]}`.

use crate::{Collection, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const COLLECTION_SCHEMA_VERSION: u64 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T> {
    schema_version: u64,
    collection: &'a str,
    records: &'a [T],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    /// Payload was a pre-envelope bare array and should be rewritten.
    pub migrated: bool,
}

pub fn encode_collection<T: Serialize>(
    collection: Collection,
    records: &[T],
) -> Result<String, StorageError> {
    serde_json::to_string(&Envelope {
        schema_version: COLLECTION_SCHEMA_VERSION,
        collection: collection.as_str(),
        records,
    })
    .map_err(|err| StorageError::Serialization(err.to_string()))
}

pub fn decode_collection<T: DeserializeOwned>(
    collection: Collection,
    payload: &str,
) -> Result<Decoded<T>, StorageError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| corrupt(collection, format!("invalid JSON: {err}")))?;

    match value {
        Value::Array(_) => Ok(Decoded {
            records: decode_records(collection, value)?,
            migrated: true,
        }),
        Value::Object(mut map) => {
            let version = map
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .ok_or_else(|| corrupt(collection, "missing schemaVersion"))?;
            if version == 0 || version > COLLECTION_SCHEMA_VERSION {
                return Err(corrupt(
                    collection,
                    format!(
                        "schema version {version} is not supported (max {COLLECTION_SCHEMA_VERSION})"
                    ),
                ));
            }
            let owner = map.get("collection").and_then(Value::as_str);
            if owner != Some(collection.as_str()) {
                return Err(corrupt(
                    collection,
                    format!("envelope belongs to {}", owner.unwrap_or("<none>")),
                ));
            }
            let records = map
                .remove("records")
                .ok_or_else(|| corrupt(collection, "missing records"))?;
            Ok(Decoded {
                records: decode_records(collection, records)?,
                migrated: false,
            })
        }
        _ => Err(corrupt(collection, "expected an envelope object or array")),
    }
}

fn decode_records<T: DeserializeOwned>(
    collection: Collection,
    records: Value,
) -> Result<Vec<T>, StorageError> {
    serde_json::from_value(records)
        .map_err(|err| corrupt(collection, format!("bad record: {err}")))
}

fn corrupt(collection: Collection, reason: impl Into<String>) -> StorageError {
    StorageError::Corrupt {
        collection,
        reason: reason.into(),
    }
}

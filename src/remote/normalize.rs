//! Raw wire shapes and their normalization into canonical records.
//!
//! The service's endpoints grew independently and return slightly different
//! field sets for the same concepts. The raw structs here deserialize
//! exactly what each endpoint sends — tolerantly where the service is known
//! to be inconsistent — and a single `into_*` path produces the canonical
//! shape. Fields beyond the ones listed in the contract are ignored.

use crate::item::{Item, Operation, OperationStatus};
use serde::{Deserialize, Deserializer};

/// Accept an id that arrives as either a JSON string or a number.
///
/// The operations endpoint returns numeric ids while the website endpoints
/// return strings; both mean the same handle.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);
    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
}

fn default_progress() -> u8 {
    0
}

/// Clamp whatever the service reports into the documented 0–100 range.
fn clamp_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
    Ok(raw.clamp(0, 100) as u8)
}

// ── Upload ───────────────────────────────────────────────────────────────

/// `POST /upload` success body.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadRaw {
    #[serde(deserialize_with = "string_or_number")]
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

impl UploadRaw {
    /// Fold the upload response into a tracked `uploaded` item.
    pub fn into_item(self) -> Item {
        Item::file(self.file_id, self.filename, self.size)
    }
}

/// `POST /upload/website` success body, normalized.
///
/// `file_id` is nullable here: the service may register the site before any
/// artifact exists.
#[derive(Debug, Clone, Deserialize)]
pub struct WebsiteRegistration {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub file_id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub operation_id: String,
    #[serde(default)]
    pub status: Option<OperationStatus>,
}

// ── Convert ──────────────────────────────────────────────────────────────

/// `POST /convert` and `POST /convert/website` success body.
#[derive(Debug, Deserialize)]
pub(crate) struct ConvertAcceptedRaw {
    #[serde(deserialize_with = "string_or_number")]
    pub operation_id: String,
    #[serde(default)]
    pub status: Option<OperationStatus>,
}

impl ConvertAcceptedRaw {
    /// A freshly accepted operation: no progress, no result yet.
    pub fn into_operation(self) -> Operation {
        Operation {
            id: self.operation_id,
            status: self.status.unwrap_or(OperationStatus::Queued),
            progress: 0,
            result_file_id: None,
            error_message: None,
        }
    }
}

/// One entry of a `POST /batch-convert` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOperation {
    #[serde(deserialize_with = "string_or_number")]
    pub operation_id: String,
    #[serde(default)]
    pub status: Option<OperationStatus>,
    #[serde(default)]
    pub queue_position: Option<u32>,
}

/// `POST /batch-convert` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchAccepted {
    #[serde(deserialize_with = "string_or_number")]
    pub batch_id: String,
    pub operations: Vec<BatchOperation>,
}

// ── Status ───────────────────────────────────────────────────────────────

/// `GET /operations/{id}` and `GET /websites/{id}/status` body.
///
/// The website variant omits `operation_id` and adds `error_message`; one
/// raw shape covers both with defaults.
#[derive(Debug, Deserialize)]
pub(crate) struct OperationStatusRaw {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub operation_id: Option<String>,
    pub status: OperationStatus,
    #[serde(default = "default_progress", deserialize_with = "clamp_progress")]
    pub progress: u8,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub result_file_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl OperationStatusRaw {
    /// Normalize into the canonical operation, filling in the id the caller
    /// polled when the body omitted it.
    pub fn into_operation(self, polled_id: &str) -> Operation {
        Operation {
            id: self.operation_id.unwrap_or_else(|| polled_id.to_string()),
            status: self.status,
            progress: self.progress,
            result_file_id: self.result_file_id,
            error_message: self.error_message,
        }
    }
}

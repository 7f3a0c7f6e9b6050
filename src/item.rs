//! The item and operation data model.
//!
//! An [`Item`] is the unit of work the wizard tracks: one user-submitted
//! file or website, carried from upload through conversion to download.
//! An [`Operation`] is the remote service's handle for a single conversion
//! job. An item owns at most one in-flight operation; once the operation
//! reaches a terminal state its outcome is folded back into the item and
//! the handle is discarded.

use serde::{Deserialize, Serialize};

/// Sentinel `original_format` for website items.
pub const SITE_FORMAT: &str = "site";

/// Fixed intermediate target format for phase one of a website conversion.
///
/// The service cannot render an arbitrary URL straight into an arbitrary
/// output format; it first normalizes the site into a bundle artifact, then
/// the ordinary file-conversion path renders the bundle.
pub const SITE_BUNDLE_FORMAT: &str = "site_bundle";

/// Lifecycle status of an [`Item`].
///
/// Allowed transitions (a new conversion request may re-enter `Converting`
/// from either terminal state):
///
/// ```text
/// uploading → uploaded → converting → converted
///                              └────→ error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Transient: the upload step has submitted the file but has no id yet.
    Uploading,
    /// Tracked and ready for a target format to be chosen.
    Uploaded,
    /// A conversion is in flight.
    Converting,
    /// Terminal success; `result_file_id` identifies the artifact.
    Converted,
    /// Terminal failure. No automatic retry.
    Error,
}

impl ItemStatus {
    /// `converted` and `error` are terminal for an item.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Converted | ItemStatus::Error)
    }
}

/// A user-submitted file or website tracked through the conversion wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier. For file items this is assigned by the service at
    /// upload time; for website items it is client-generated until a remote
    /// id is available.
    pub id: String,
    /// Display name: filename or URL.
    pub name: String,
    /// Size in bytes; 0 for website items before bundling.
    #[serde(default)]
    pub size_bytes: u64,
    /// Lower-case extension, or [`SITE_FORMAT`] for websites.
    pub original_format: String,
    /// Chosen output format, once the user has selected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_format: Option<String>,
    pub status: ItemStatus,
    /// When true, `url` must be present.
    #[serde(default)]
    pub is_website: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Set only at `converted`; may differ from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_id: Option<String>,
    /// User intent flag for the downstream graph-visualization feature;
    /// carried, not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_graph: Option<bool>,
}

impl Item {
    /// Create a tracked file item from the service's upload response fields.
    pub fn file(id: impl Into<String>, name: impl Into<String>, size_bytes: u64) -> Self {
        let name = name.into();
        let original_format = extension_of(&name);
        Item {
            id: id.into(),
            name,
            size_bytes,
            original_format,
            target_format: None,
            status: ItemStatus::Uploaded,
            is_website: false,
            url: None,
            result_file_id: None,
            generate_graph: None,
        }
    }

    /// Create a website item with a client-generated id.
    pub fn website(id: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Item {
            id: id.into(),
            name: url.clone(),
            size_bytes: 0,
            original_format: SITE_FORMAT.to_string(),
            target_format: None,
            status: ItemStatus::Uploaded,
            is_website: true,
            url: Some(url),
            result_file_id: None,
            generate_graph: None,
        }
    }

    /// Display name after conversion: the suffix after the last `.` is
    /// replaced by `target_format`; a name without an extension gets the
    /// suffix appended. Website names are URLs, where a dot is part of the
    /// hostname rather than an extension, so they always append.
    ///
    /// `"report.docx"` + `"pdf"` → `"report.pdf"`;
    /// `"https://example.com"` + `"pdf"` → `"https://example.com.pdf"`.
    pub fn converted_name(&self, target_format: &str) -> String {
        if self.is_website {
            return format!("{}.{}", self.name, target_format);
        }
        match self.name.rfind('.') {
            Some(dot) => format!("{}.{}", &self.name[..dot], target_format),
            None => format!("{}.{}", self.name, target_format),
        }
    }

    /// The artifact id to fetch for download: `result_file_id` when the
    /// conversion produced one, otherwise the item's own id.
    pub fn download_id(&self) -> &str {
        self.result_file_id.as_deref().unwrap_or(&self.id)
    }

    /// Suggested local filename for the downloaded artifact:
    /// the base name plus the target format (or the original format when no
    /// target was chosen). Falls back to the current display name when
    /// neither format is known.
    pub fn download_name(&self) -> String {
        let format = self
            .target_format
            .as_deref()
            .or_else(|| (!self.original_format.is_empty()).then_some(self.original_format.as_str()));
        match format {
            Some(f) => format!("{}.{}", base_name(&self.name), f),
            None => self.name.clone(),
        }
    }
}

/// Lower-case extension of a filename; empty when there is none.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name[dot + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// The name with its final `.suffix` stripped; unchanged when there is no `.`.
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}

/// A shallow partial update for [`crate::store::ItemStore::update`].
///
/// Only the populated fields are merged into the matching item; everything
/// else is left untouched. `result_file_id` is doubly optional so a patch
/// can distinguish "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub size_bytes: Option<u64>,
    pub status: Option<ItemStatus>,
    pub target_format: Option<String>,
    pub result_file_id: Option<Option<String>>,
    pub generate_graph: Option<bool>,
}

impl ItemPatch {
    /// A patch that only changes the status.
    pub fn status(status: ItemStatus) -> Self {
        ItemPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    /// The terminal-success patch: status, artifact id, and renamed display
    /// name in one atomic update.
    pub fn converted(name: String, result_file_id: Option<String>) -> Self {
        ItemPatch {
            name: Some(name),
            status: Some(ItemStatus::Converted),
            result_file_id: Some(result_file_id),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, item: &mut Item) {
        if let Some(ref name) = self.name {
            item.name = name.clone();
        }
        if let Some(size) = self.size_bytes {
            item.size_bytes = size;
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(ref target) = self.target_format {
            item.target_format = Some(target.clone());
        }
        if let Some(ref result) = self.result_file_id {
            item.result_file_id = result.clone();
        }
        if let Some(generate) = self.generate_graph {
            item.generate_graph = Some(generate);
        }
    }
}

/// Status of a remote [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// Any status string the service may add later; treated as still
    /// in flight so polling keeps going until the deadline.
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    /// `completed` and `failed` are terminal for an operation.
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

/// Canonical view of one remote conversion job.
///
/// Every status endpoint, whatever its exact field names, is normalized into
/// this shape by [`crate::remote::normalize`]. Completed or failed
/// operations are not retained — their outcome is folded back into the
/// owning [`Item`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub status: OperationStatus,
    /// 0–100; monotonically non-decreasing while polled.
    pub progress: u8,
    /// Populated only at `completed`.
    pub result_file_id: Option<String>,
    /// Display-only failure detail from the service; never parsed for
    /// control flow.
    pub error_message: Option<String>,
}

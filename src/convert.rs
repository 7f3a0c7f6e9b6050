//! The conversion orchestrator: drive every item with a chosen target
//! format through upload → convert → poll → resolve.
//!
//! ## Per-item protocol
//!
//! ```text
//! mark converting (synchronous, before any network call)
//!  │
//!  ├─ file item     submit /convert(source = item.id, target)
//!  │
//!  ├─ website item  phase 1: /convert/website(url, "site_bundle")
//!  │                         poll website status → bundle file id
//!  │                phase 2: /convert(source = bundle id, target)
//!  │
//!  └─ poll operation status until completed | failed | deadline
//!       completed → item converted, result id + renamed display name
//!       failed / any error → item error (no retry)
//! ```
//!
//! Items run as an unordered set of independent tasks via
//! `buffer_unordered`; one item's failure never cancels or blocks the
//! others, and [`Orchestrator::convert_all`] returns only after every task
//! has settled. Each task touches only its own item in the store, so
//! concurrent updates to sibling items are never clobbered.

use crate::config::OrchestratorConfig;
use crate::error::{ConvertError, ItemError};
use crate::item::{Item, ItemPatch, ItemStatus, Operation, OperationStatus, SITE_BUNDLE_FORMAT};
use crate::remote::ServiceClient;
use crate::store::ItemStore;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// How one item's conversion ended.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item_id: String,
    /// Display name at resolution time (renamed on success).
    pub name: String,
    /// `None` on success; the terminal error otherwise.
    pub error: Option<ItemError>,
}

impl ItemOutcome {
    pub fn is_converted(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of one [`Orchestrator::convert_all`] run.
#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    pub total_items: usize,
    pub converted_items: usize,
    pub failed_items: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<ItemOutcome>,
}

/// Drives conversions against the remote service and folds results back
/// into the shared [`ItemStore`].
///
/// The orchestrator never creates items on its own; they enter the store
/// through the upload step ([`upload_file`](Self::upload_file) /
/// [`add_website`](Self::add_website)) or directly via the store API.
#[derive(Clone)]
pub struct Orchestrator {
    client: ServiceClient,
    store: ItemStore,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, store: ItemStore) -> Result<Self, ConvertError> {
        let client = ServiceClient::new(&config)?;
        Ok(Orchestrator {
            client,
            store,
            config,
        })
    }

    /// Build an orchestrator around an existing client (tests point this at
    /// a mock server).
    pub fn with_client(
        config: OrchestratorConfig,
        store: ItemStore,
        client: ServiceClient,
    ) -> Self {
        Orchestrator {
            client,
            store,
            config,
        }
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ── Upload step ───────────────────────────────────────────────────────

    /// Upload a local file and track the resulting item.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<Item, ConvertError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConvertError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConvertError::FileReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        info!("Uploading '{filename}' ({} bytes)", bytes.len());
        let item = self
            .client
            .upload_file(&filename, bytes, self.config.user_id.as_deref())
            .await
            .map_err(|e| ConvertError::UploadFailed {
                name: filename.clone(),
                source: e,
            })?;

        self.store.add(item.clone());
        Ok(item)
    }

    /// Upload several files concurrently, joining all uploads.
    ///
    /// A failed upload is logged and skipped — the remaining files are
    /// still tracked, matching the upload step's per-file tolerance.
    pub async fn upload_files(&self, paths: &[PathBuf]) -> Vec<Result<Item, ConvertError>> {
        stream::iter(paths.iter().map(|path| self.upload_file(path)))
            .buffer_unordered(self.config.concurrency)
            .inspect(|result| {
                if let Err(e) = result {
                    warn!("Upload failed: {e}");
                }
            })
            .collect()
            .await
    }

    /// Track a website item with a client-generated id. No network call is
    /// made; the service first sees the URL when conversion starts.
    pub fn add_website(&self, url: impl Into<String>) -> Item {
        let url = url.into();
        let item = Item::website(generate_item_id(), url);
        self.store.add(item.clone());
        item
    }

    // ── Conversion ────────────────────────────────────────────────────────

    /// Convert every tracked item that has a chosen target format.
    ///
    /// Completes only after all per-item tasks have settled; per-item
    /// failures are contained in the returned summary.
    pub async fn convert_all(&self) -> ConversionSummary {
        let eligible: Vec<Item> = self
            .store
            .items()
            .into_iter()
            .filter(|i| i.target_format.is_some())
            .collect();
        self.convert_items(eligible).await
    }

    /// Convert the given items as an unordered set of independent tasks.
    pub async fn convert_items(&self, items: Vec<Item>) -> ConversionSummary {
        let start = Instant::now();
        let total = items.len();
        info!("Starting conversion of {total} items");

        let outcomes: Vec<ItemOutcome> = stream::iter(
            items
                .into_iter()
                .map(|item| async move { self.convert_item(item).await }),
        )
        .buffer_unordered(self.config.concurrency)
        .collect()
        .await;

        let converted = outcomes.iter().filter(|o| o.is_converted()).count();
        let failed = outcomes.len() - converted;
        let summary = ConversionSummary {
            total_items: total,
            converted_items: converted,
            failed_items: failed,
            duration_ms: start.elapsed().as_millis() as u64,
            outcomes,
        };
        info!(
            "Conversion run complete: {}/{} converted, {} failed, {}ms",
            converted, total, failed, summary.duration_ms
        );
        summary
    }

    /// Run the full protocol for one item and resolve it to a terminal
    /// state. Always returns an outcome — errors are folded into the item,
    /// never propagated.
    pub async fn convert_item(&self, item: Item) -> ItemOutcome {
        // The UI must show in-progress state even if the first request is
        // slow or fails outright, so the status flips before any await on
        // the network.
        self.store
            .update(&item.id, ItemPatch::status(ItemStatus::Converting));

        match self.run_item_protocol(&item).await {
            Ok(operation) => {
                let target = item.target_format.as_deref().unwrap_or_default();
                let new_name = item.converted_name(target);
                self.store.update(
                    &item.id,
                    ItemPatch::converted(new_name.clone(), operation.result_file_id),
                );
                info!("Item '{}' converted → '{new_name}'", item.id);
                ItemOutcome {
                    item_id: item.id,
                    name: new_name,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Item '{}' failed: {e}", item.id);
                self.store
                    .update(&item.id, ItemPatch::status(ItemStatus::Error));
                ItemOutcome {
                    item_id: item.id,
                    name: item.name,
                    error: Some(e),
                }
            }
        }
    }

    /// Submit and poll to a terminal, completed operation.
    async fn run_item_protocol(&self, item: &Item) -> Result<Operation, ItemError> {
        let target = item
            .target_format
            .as_deref()
            .ok_or_else(|| ItemError::NoTargetFormat {
                id: item.id.clone(),
            })?;

        let source_id = if item.is_website {
            self.bundle_website(item).await?
        } else {
            item.id.clone()
        };

        let accepted = self
            .client
            .convert_file(&source_id, target, self.config.user_id_or_empty())
            .await?;
        debug!(
            "Item '{}': conversion accepted as operation '{}'",
            item.id, accepted.id
        );

        let operation = self.poll_operation(&accepted.id, false).await?;
        match operation.status {
            OperationStatus::Completed => Ok(operation),
            _ => Err(ItemError::RemoteFailed {
                message: operation.error_message,
            }),
        }
    }

    /// Phase one of the website protocol: normalize the site into a bundle
    /// artifact and return the bundle's file id.
    async fn bundle_website(&self, item: &Item) -> Result<String, ItemError> {
        let url = item.url.as_deref().unwrap_or(&item.name);
        let accepted = self
            .client
            .convert_website(url, SITE_BUNDLE_FORMAT, self.config.user_id_or_empty())
            .await?;
        debug!(
            "Item '{}': bundling '{url}' as operation '{}'",
            item.id, accepted.id
        );

        let operation = self.poll_operation(&accepted.id, true).await?;
        match operation.status {
            OperationStatus::Completed => {
                operation
                    .result_file_id
                    .ok_or_else(|| ItemError::MissingBundleId {
                        url: url.to_string(),
                    })
            }
            _ => Err(ItemError::RemoteFailed {
                message: operation.error_message,
            }),
        }
    }

    /// Poll an operation until it reaches a terminal status.
    ///
    /// Exponential backoff between polls, capped at
    /// `poll_max_backoff_ms`, with an overall `poll_timeout_secs` deadline
    /// that forces [`ItemError::PollTimeout`].
    async fn poll_operation(
        &self,
        operation_id: &str,
        website: bool,
    ) -> Result<Operation, ItemError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.poll_timeout_secs);
        let mut backoff_ms = self.config.poll_backoff_ms;

        loop {
            let operation = if website {
                self.client.website_status(operation_id).await?
            } else {
                self.client.operation_status(operation_id).await?
            };
            debug!(
                "Operation '{operation_id}': {:?} ({}%)",
                operation.status, operation.progress
            );

            if operation.status.is_terminal() {
                return Ok(operation);
            }
            if Instant::now() + Duration::from_millis(backoff_ms) > deadline {
                return Err(ItemError::PollTimeout {
                    operation_id: operation_id.to_string(),
                    secs: self.config.poll_timeout_secs,
                });
            }

            sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms = (backoff_ms * 2).min(self.config.poll_max_backoff_ms);
        }
    }

    // ── Download ──────────────────────────────────────────────────────────

    /// Fetch an item's artifact: `result_file_id` when the conversion
    /// produced one, otherwise the item's own id.
    pub async fn download(
        &self,
        item: &Item,
    ) -> Result<crate::remote::DownloadedArtifact, ConvertError> {
        let file_id = item.download_id();
        self.client
            .download(file_id)
            .await
            .map_err(|e| ConvertError::DownloadFailed {
                file_id: file_id.to_string(),
                source: e,
            })
    }

    /// Download an item's artifact into `dir` and return the written path.
    ///
    /// The filename prefers the service's `Content-Disposition` hint, then
    /// the item-derived suggested name. Written atomically via a temp file
    /// and rename.
    pub async fn download_to(
        &self,
        item: &Item,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, ConvertError> {
        let artifact = self.download(item).await?;
        let filename = artifact
            .suggested_name
            .unwrap_or_else(|| item.download_name());
        let path = dir.as_ref().join(&filename);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ConvertError::OutputWriteFailed {
                    path: path.clone(),
                    source: e,
                }
            })?;
        }
        let tmp_path = path.with_extension("part");
        tokio::fs::write(&tmp_path, &artifact.bytes)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        info!("Downloaded '{}' → {}", item.name, path.display());
        Ok(path)
    }
}

/// Client-generated id for items the service has not seen yet (website
/// entries before bundling).
fn generate_item_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("local_{nanos:x}_{count}")
}

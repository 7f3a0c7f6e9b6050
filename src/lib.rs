//! # anyconvert
//!
//! Client-side orchestration for a remote file/website conversion service.
//!
//! ## Why this crate?
//!
//! The conversion service does the heavy lifting — rendering, format
//! translation, website crawling — but a client still has to shepherd each
//! submitted item through a multi-request protocol: upload it, submit the
//! conversion, poll the operation, reconcile inconsistent response shapes,
//! and resolve the item to a terminal state without letting one failure
//! take down its siblings. This crate is that shepherd, plus the shared
//! item store a multi-step wizard needs to survive restarts.
//!
//! ## Protocol Overview
//!
//! ```text
//! item (file or website)
//!  │
//!  ├─ 1. Upload    multipart upload, or local registration for websites
//!  ├─ 2. Select    caller sets target_format on the item
//!  ├─ 3. Convert   file: one request; website: bundle first, then convert
//!  ├─ 4. Poll      status until completed/failed, backoff + deadline
//!  └─ 5. Resolve   converted (result id, renamed) | error — then download
//! ```
//!
//! Items convert concurrently and independently; a run completes when every
//! item has settled.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anyconvert::{ItemPatch, ItemStore, Orchestrator, OrchestratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OrchestratorConfig::builder()
//!         .base_url("https://convert.example.com/api")
//!         .build()?;
//!     let store = ItemStore::open("wizard.json")?;
//!     let orchestrator = Orchestrator::new(config, store)?;
//!
//!     let item = orchestrator.upload_file("report.docx").await?;
//!     orchestrator.store().update(&item.id, ItemPatch {
//!         target_format: Some("pdf".into()),
//!         ..Default::default()
//!     });
//!
//!     let summary = orchestrator.convert_all().await;
//!     println!("{}/{} converted", summary.converted_items, summary.total_items);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `anyconvert` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! anyconvert = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod item;
pub mod remote;
pub mod store;
pub mod stream;
pub mod wizard;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OrchestratorConfig, OrchestratorConfigBuilder};
pub use convert::{ConversionSummary, ItemOutcome, Orchestrator};
pub use error::{ConvertError, ItemError};
pub use item::{
    Item, ItemPatch, ItemStatus, Operation, OperationStatus, SITE_BUNDLE_FORMAT, SITE_FORMAT,
};
pub use remote::{BatchRequestEntry, DownloadedArtifact, ServiceClient, WebsiteRegistration};
pub use store::{ItemStore, StoreObserver};
pub use stream::{convert_items_stream, convert_stream, OutcomeStream};
pub use wizard::WizardStep;

//! The boundary with the remote conversion service.
//!
//! [`client`] owns the HTTP plumbing; [`normalize`] owns the response
//! shapes. Endpoints disagree on field names and types for the same concept
//! (an operation id may arrive as a string or a number, a result file id as
//! a string or null), so each response type gets exactly one normalization
//! path into the canonical [`crate::item::Operation`] / [`crate::item::Item`]
//! shapes instead of field-name guesses at call sites.

pub mod client;
pub mod normalize;

pub use client::{BatchRequestEntry, DownloadedArtifact, ServiceClient};
pub use normalize::{BatchAccepted, BatchOperation, WebsiteRegistration};

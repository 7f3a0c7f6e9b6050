//! Streaming conversion API: emit item outcomes as they settle.
//!
//! ## Why stream?
//!
//! A batch with a slow website bundle and a handful of quick file
//! conversions takes as long as its slowest member. A stream-based API lets
//! callers render each item's terminal state the moment it is known — a
//! results list filling in live — instead of waiting for the whole run.
//!
//! Unlike the eager [`crate::convert::Orchestrator::convert_all`] which
//! returns only after every item settles, [`convert_stream`] yields an
//! [`ItemOutcome`] per item in completion order (not submission order; key
//! by `item_id` if order matters). The store is updated identically in both
//! APIs — the stream only changes how outcomes are delivered.

use crate::convert::{ItemOutcome, Orchestrator};
use crate::item::Item;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-item terminal outcomes.
pub type OutcomeStream<'a> = Pin<Box<dyn Stream<Item = ItemOutcome> + Send + 'a>>;

/// Convert every tracked item with a chosen target format, yielding each
/// outcome as the item settles.
///
/// Outcomes arrive in completion order. Every yielded outcome corresponds
/// to a store item already resolved to `converted` or `error`; failures are
/// carried in [`ItemOutcome::error`], never as a stream error.
pub fn convert_stream(orchestrator: &Orchestrator) -> OutcomeStream<'_> {
    let eligible: Vec<Item> = orchestrator
        .store()
        .items()
        .into_iter()
        .filter(|i| i.target_format.is_some())
        .collect();
    info!("Starting streaming conversion of {} items", eligible.len());
    convert_items_stream(orchestrator, eligible)
}

/// Stream conversions for an explicit set of items.
pub fn convert_items_stream(orchestrator: &Orchestrator, items: Vec<Item>) -> OutcomeStream<'_> {
    let concurrency = orchestrator.config().concurrency;
    let s = stream::iter(
        items
            .into_iter()
            .map(move |item| orchestrator.convert_item(item)),
    )
    .buffer_unordered(concurrency);
    Box::pin(s)
}

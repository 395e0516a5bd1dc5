//! SICC Services Layer
//!
//! This crate hosts the cross-collection workflows of the dashboard: the customer tree
//! loader, the `*ByParent` index built over a loaded tree, the required-documents
//! generator, the dashboard summary and the catalog operations. Every service talks to
//! the backend through [`sicc_core::ItemStore`], so the same code runs against the
//! Directus client and against the in-memory store used in tests.

pub mod catalog;
pub mod dashboard;
pub mod index;
pub mod required_documents;
pub mod tree;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use sicc_core::{SiccError, SiccResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub use catalog::{CatalogService, CustomerPage};
pub use dashboard::{DashboardCounts, DashboardService, DashboardSummary, StatusSlice};
pub use index::TreeIndex;
pub use required_documents::{GenerationInput, GenerationResult, RequiredDocumentsGenerator};
pub use tree::{CustomerTree, CustomerTreeLoader, DegradedStep, TreeStep};

/// Run a read, abandoning it with [`SiccError::Aborted`] once `cancel` fires.
pub async fn cancellable<T, F>(cancel: &CancellationToken, read: F) -> SiccResult<T>
where
    F: Future<Output = SiccResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SiccError::Aborted),
        result = read => result,
    }
}

/// Cache-busting token for one load: the current time in epoch milliseconds.
pub(crate) fn cache_bust_token() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

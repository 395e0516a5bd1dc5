//! Dashboard summary: entity counts, document status breakdown and upcoming documents.

use serde::Serialize;
use serde_json::Value;
use sicc_core::constants::{collections, fields};
use sicc_core::models::{Document, DocumentStatus};
use sicc_core::store::decode_rows;
use sicc_core::{ItemQuery, ItemStore, SiccResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{cache_bust_token, cancellable};

const UPCOMING_LIMIT: i64 = 5;
const EMPTY_STATUS_LABEL: &str = "Pendiente";
const MISSING_STATUS_KEY: &str = "Sin estado";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub customers: u64,
    pub sites: u64,
    pub requirements: u64,
    pub providers: u64,
}

/// One row of the document status breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlice {
    pub key: String,
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub counts: DashboardCounts,
    pub document_status: Vec<StatusSlice>,
    pub upcoming_documents: Vec<Document>,
}

/// Count of one aggregate row: `count["*"]`, then `count`, then `total`. Numbers may
/// arrive as strings.
fn aggregate_count(row: &Value) -> u64 {
    let as_count = |v: &Value| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    let count = row.get("count");
    count
        .and_then(|c| c.get("*"))
        .and_then(as_count)
        .or_else(|| count.and_then(as_count))
        .or_else(|| row.get("total").and_then(as_count))
        .unwrap_or(0)
}

/// Fold `groupBy[]=status` rows into labeled slices, summing repeated keys in
/// first-seen order.
pub fn status_breakdown(rows: &[Value]) -> Vec<StatusSlice> {
    let mut slices: Vec<StatusSlice> = Vec::new();
    for row in rows {
        let key = match row.get("status") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => MISSING_STATUS_KEY.to_string(),
        };
        let value = aggregate_count(row);
        match slices.iter_mut().find(|s| s.key == key) {
            Some(slice) => slice.value += value,
            None => slices.push(StatusSlice {
                label: DocumentStatus::label_for_key(&key),
                key,
                value,
            }),
        }
    }

    if slices.is_empty() {
        slices.push(StatusSlice {
            key: EMPTY_STATUS_LABEL.to_string(),
            label: EMPTY_STATUS_LABEL.to_string(),
            value: 0,
        });
    }
    slices
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn ItemStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Run the six summary reads concurrently. Any failure fails the whole summary.
    #[tracing::instrument(skip_all)]
    pub async fn summary(&self, cancel: &CancellationToken) -> SiccResult<DashboardSummary> {
        let token = cache_bust_token();
        let count_query = ItemQuery::new()
            .fields(&["id"])
            .limit(1)
            .with_filter_count()
            .cache_bust(Some(&token));
        let status_query = ItemQuery::new()
            .group_count("status")
            .cache_bust(Some(&token));
        let upcoming_query = ItemQuery::new()
            .fields(fields::UPCOMING_DOCUMENT)
            .sort("proximaFechaPresentacion")
            .limit(UPCOMING_LIMIT)
            .cache_bust(Some(&token));

        let store = self.store.as_ref();
        let (customers, sites, requirements, providers, status, upcoming) = cancellable(
            cancel,
            async {
                tokio::try_join!(
                    store.list(collections::CUSTOMERS, &count_query),
                    store.list(collections::SITES, &count_query),
                    store.list(collections::REQUIREMENTS, &count_query),
                    store.list(collections::PROVIDERS, &count_query),
                    store.list(collections::PROVIDER_DOCUMENTS, &status_query),
                    store.list(collections::PROVIDER_DOCUMENTS, &upcoming_query),
                )
            },
        )
        .await?;

        let summary = DashboardSummary {
            counts: DashboardCounts {
                customers: customers.filter_count(),
                sites: sites.filter_count(),
                requirements: requirements.filter_count(),
                providers: providers.filter_count(),
            },
            document_status: status_breakdown(&status.data),
            upcoming_documents: decode_rows(collections::PROVIDER_DOCUMENTS, upcoming.data)?,
        };

        tracing::debug!(
            customers = summary.counts.customers,
            providers = summary.counts.providers,
            statuses = summary.document_status.len(),
            "Dashboard summary loaded"
        );
        Ok(summary)
    }
}

//! Item store abstraction
//!
//! The dashboard treats the backend as a collection store: list with a query, read one
//! row, create one or many rows, patch a row. The Directus client implements this trait
//! over HTTP; tests use an in-memory implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SiccError, SiccResult};
use crate::query::ItemQuery;
use crate::relation::ItemId;

/// `meta` block of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// `{data: [...], meta: {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ItemsMeta>,
}

impl ItemsResponse {
    /// `meta.filter_count`, or zero when the backend omitted it.
    pub fn filter_count(&self) -> u64 {
        self.meta
            .as_ref()
            .and_then(|m| m.filter_count)
            .unwrap_or(0)
    }
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// `GET /items/{collection}?{query}`
    async fn list(&self, collection: &str, query: &ItemQuery) -> SiccResult<ItemsResponse>;

    /// `GET /items/{collection}/{id}?fields={csv}`
    async fn get(
        &self,
        collection: &str,
        id: &ItemId,
        query: &ItemQuery,
    ) -> SiccResult<Option<Value>>;

    /// `POST /items/{collection}` with a single object
    async fn create(&self, collection: &str, item: Value) -> SiccResult<Value>;

    /// `POST /items/{collection}` with an array body
    async fn create_many(&self, collection: &str, items: Vec<Value>) -> SiccResult<Vec<Value>>;

    /// `PATCH /items/{collection}/{id}`
    async fn update(&self, collection: &str, id: &ItemId, patch: Value) -> SiccResult<Value>;
}

/// List rows and decode them into `T`.
pub async fn fetch_items<T: DeserializeOwned>(
    store: &dyn ItemStore,
    collection: &str,
    query: &ItemQuery,
) -> SiccResult<Vec<T>> {
    let response = store.list(collection, query).await?;
    decode_rows(collection, response.data)
}

/// Read one row and decode it into `T`.
pub async fn fetch_item<T: DeserializeOwned>(
    store: &dyn ItemStore,
    collection: &str,
    id: &ItemId,
    query: &ItemQuery,
) -> SiccResult<Option<T>> {
    match store.get(collection, id, query).await? {
        Some(Value::Null) | None => Ok(None),
        Some(row) => serde_json::from_value(row).map(Some).map_err(|e| {
            SiccError::InvalidResponse(format!("{} row {}: {}", collection, id, e))
        }),
    }
}

pub fn decode_rows<T: DeserializeOwned>(collection: &str, rows: Vec<Value>) -> SiccResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| SiccError::InvalidResponse(format!("{} row: {}", collection, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_response_tolerates_missing_data_and_meta() {
        let response: ItemsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.data.is_empty());
        assert_eq!(response.filter_count(), 0);
    }

    #[test]
    fn items_response_reads_filter_count() {
        let response: ItemsResponse =
            serde_json::from_value(json!({ "data": [{ "id": 1 }], "meta": { "filter_count": 12 } }))
                .unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.filter_count(), 12);
    }

    #[test]
    fn decode_rows_reports_collection_on_failure() {
        #[derive(Debug, Deserialize)]
        struct Row {
            #[allow(dead_code)]
            id: i64,
        }
        let err = decode_rows::<Row>("sites", vec![json!({ "id": "x" })]).unwrap_err();
        assert!(err.to_string().contains("sites"));
    }
}

//! `/items/{collection}` endpoints.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use sicc_core::{ItemId, ItemQuery, ItemStore, ItemsResponse, SiccError, SiccResult};

use crate::{read_json, DataEnvelope, DirectusClient};

impl DirectusClient {
    fn items_url(&self, collection: &str) -> String {
        self.build_url(&format!("/items/{}", collection))
    }

    fn item_url(&self, collection: &str, id: &ItemId) -> String {
        self.build_url(&format!("/items/{}/{}", collection, id))
    }
}

#[async_trait]
impl ItemStore for DirectusClient {
    async fn list(&self, collection: &str, query: &ItemQuery) -> SiccResult<ItemsResponse> {
        let url = self.items_url(collection);
        let pairs = query.to_pairs();
        tracing::debug!(collection, params = pairs.len(), "GET items");
        self.execute_json(|client| client.get(&url).query(&pairs))
            .await
    }

    async fn get(
        &self,
        collection: &str,
        id: &ItemId,
        query: &ItemQuery,
    ) -> SiccResult<Option<Value>> {
        let url = self.item_url(collection, id);
        let pairs = query.to_pairs();
        tracing::debug!(collection, id = %id, "GET item");
        let response = self
            .execute(|client| client.get(&url).query(&pairs))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: DataEnvelope<Value> = read_json(response).await?;
        Ok(envelope.data.filter(|v| !v.is_null()))
    }

    async fn create(&self, collection: &str, item: Value) -> SiccResult<Value> {
        let url = self.items_url(collection);
        tracing::debug!(collection, "POST item");
        let envelope: DataEnvelope<Value> = self
            .execute_json(|client| client.post(&url).json(&item))
            .await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    async fn create_many(&self, collection: &str, items: Vec<Value>) -> SiccResult<Vec<Value>> {
        let url = self.items_url(collection);
        tracing::debug!(collection, count = items.len(), "POST items (bulk)");
        let envelope: DataEnvelope<Value> = self
            .execute_json(|client| client.post(&url).json(&items))
            .await?;
        match envelope.data {
            Some(Value::Array(rows)) => Ok(rows),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(SiccError::InvalidResponse(format!(
                "expected an array from bulk insert into {}, got {}",
                collection, other
            ))),
        }
    }

    async fn update(&self, collection: &str, id: &ItemId, patch: Value) -> SiccResult<Value> {
        let url = self.item_url(collection, id);
        tracing::debug!(collection, id = %id, "PATCH item");
        let envelope: DataEnvelope<Value> = self
            .execute_json(|client| client.patch(&url).json(&patch))
            .await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

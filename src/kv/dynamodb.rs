//! DynamoDB [`KvBackend`] for production deployments.
//!
//! Table schema:
//! - `session_id` (S) — partition key, the session namespace
//! - `data_key` (S) — sort key, the session data key
//! - `value` (B) — raw value bytes
//! - `ttl` (N) — Unix timestamp for DynamoDB automatic cleanup
//!
//! DynamoDB reaps expired items lazily, so `ttl` is also checked on read.

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{KvBackend, KvError};

const PARTITION_KEY: &str = "session_id";
const SORT_KEY: &str = "data_key";
/// BatchWriteItem accepts at most 25 requests.
const BATCH_LIMIT: usize = 25;

/// DynamoDB key-value backend.
pub struct DynamoDbKv {
    client: Client,
    table_name: String,
}

impl DynamoDbKv {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    fn item_key(namespace: &str, key: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (PARTITION_KEY.to_string(), AttributeValue::S(namespace.to_string())),
            (SORT_KEY.to_string(), AttributeValue::S(key.to_string())),
        ])
    }

    /// All sort keys stored under `namespace`, following query pagination.
    async fn keys_in(&self, namespace: &str) -> Result<Vec<String>, KvError> {
        let mut keys = Vec::new();
        let mut start_key = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :ns")
                .expression_attribute_names("#pk", PARTITION_KEY)
                .expression_attribute_values(":ns", AttributeValue::S(namespace.to_string()))
                .projection_expression(SORT_KEY)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| KvError::Request(DisplayErrorContext(&e).to_string()))?;

            for item in page.items() {
                let key = item
                    .get(SORT_KEY)
                    .and_then(|v| v.as_s().ok())
                    .ok_or_else(|| KvError::Protocol(format!("item without {SORT_KEY}")))?;
                keys.push(key.clone());
            }

            match page.last_evaluated_key() {
                Some(last) if !last.is_empty() => start_key = Some(last.clone()),
                _ => return Ok(keys),
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl KvBackend for DynamoDbKv {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::item_key(namespace, key)))
            .send()
            .await
            .map_err(|e| KvError::Request(DisplayErrorContext(&e).to_string()))?;

        let Some(item) = result.item() else {
            return Ok(None);
        };

        let ttl = item
            .get("ttl")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        if ttl <= now_secs() {
            return Ok(None);
        }

        let value = item
            .get("value")
            .and_then(|v| v.as_b().ok())
            .ok_or_else(|| KvError::Protocol(format!("{namespace}/{key} has no binary value")))?;
        Ok(Some(value.as_ref().to_vec()))
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), KvError> {
        let expires_at = now_secs().saturating_add(ttl.as_secs());

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(PARTITION_KEY, AttributeValue::S(namespace.to_string()))
            .item(SORT_KEY, AttributeValue::S(key.to_string()))
            .item("value", AttributeValue::B(Blob::new(value)))
            .item("ttl", AttributeValue::N(expires_at.to_string()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to save session key {}/{}: {}", namespace, key, e);
                KvError::Request(DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), KvError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::item_key(namespace, key)))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete session key {}/{}: {}", namespace, key, e);
                KvError::Request(DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), KvError> {
        let keys = self.keys_in(namespace).await?;

        for chunk in keys.chunks(BATCH_LIMIT) {
            let requests = chunk
                .iter()
                .map(|key| {
                    DeleteRequest::builder()
                        .set_key(Some(Self::item_key(namespace, key)))
                        .build()
                        .map(|delete| WriteRequest::builder().delete_request(delete).build())
                        .map_err(|e| KvError::Protocol(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let result = self
                .client
                .batch_write_item()
                .request_items(&self.table_name, requests)
                .send()
                .await
                .map_err(|e| KvError::Request(DisplayErrorContext(&e).to_string()))?;

            let unprocessed: usize = result
                .unprocessed_items()
                .map(|items| items.values().map(Vec::len).sum())
                .unwrap_or(0);
            if unprocessed > 0 {
                return Err(KvError::Request(format!(
                    "{unprocessed} deletes left unprocessed for {namespace}"
                )));
            }
        }

        Ok(())
    }
}

//! Typed operations over the commerce admin API
//!
//! Wraps the throttled transport with the field/tag/note vocabulary the
//! reconciliation core needs. Field upserts are list-then-act: the
//! remote API has no atomic create-or-update, so an upsert lists the
//! record's fields first and then creates or updates. That is race-free
//! only because the batch runner serializes all mutating calls for one
//! record; raising per-record concurrency would reintroduce the race.

use crate::models::{FieldKind, FieldOp, RemoteRecord};
use partsdesk_common::{Error, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use super::transport::Transport;

/// A field as the remote API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteField {
    pub id: u64,
    pub namespace: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Deserialize)]
struct FieldsEnvelope {
    metafields: Vec<RemoteField>,
}

#[derive(Deserialize)]
struct OrdersEnvelope {
    orders: Vec<OrderSummary>,
}

#[derive(Deserialize)]
struct OrderSummary {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: OrderDetail,
}

#[derive(Deserialize)]
struct OrderDetail {
    #[serde(default)]
    tags: String,
    #[serde(default)]
    note: Option<String>,
}

/// Remote field store client.
pub struct RecordStoreClient {
    transport: Arc<dyn Transport>,
}

impl RecordStoreClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// All fields on a record, with IDs, untrimmed.
    pub async fn list_fields_raw(&self, record_id: u64) -> Result<Vec<RemoteField>> {
        let value = self
            .transport
            .call(
                Method::GET,
                &format!("orders/{}/metafields.json", record_id),
                None,
            )
            .await?;
        let envelope: FieldsEnvelope = serde_json::from_value(value)?;
        Ok(envelope.metafields)
    }

    /// Sparse `namespace.key → value` map of a record's fields.
    ///
    /// Entries with an empty namespace or key are dropped; on duplicate
    /// composite keys (should not occur upstream) the last entry wins.
    pub async fn list_fields(&self, record_id: u64) -> Result<HashMap<String, String>> {
        let mut map = HashMap::new();
        for field in self.list_fields_raw(record_id).await? {
            let namespace = field.namespace.trim();
            let key = field.key.trim();
            if namespace.is_empty() || key.is_empty() {
                continue;
            }
            map.insert(format!("{}.{}", namespace, key), field.value.trim().to_string());
        }
        Ok(map)
    }

    /// Create-or-update one field. The type hint applies only on
    /// creation; an existing field keeps its type and gets a new value.
    pub async fn upsert_field(
        &self,
        record_id: u64,
        namespace: &str,
        key: &str,
        value: &str,
        kind: Option<FieldKind>,
    ) -> Result<()> {
        let existing = self.find_field(record_id, namespace, key).await?;

        match existing {
            Some(field) => {
                tracing::debug!(record_id, namespace, key, "Updating existing field");
                self.transport
                    .call(
                        Method::PUT,
                        &format!("metafields/{}.json", field.id),
                        Some(json!({ "metafield": { "id": field.id, "value": value } })),
                    )
                    .await?;
            }
            None => {
                let kind = kind.unwrap_or(FieldKind::SingleLine);
                tracing::debug!(record_id, namespace, key, "Creating field");
                self.transport
                    .call(
                        Method::POST,
                        &format!("orders/{}/metafields.json", record_id),
                        Some(json!({
                            "metafield": {
                                "namespace": namespace,
                                "key": key,
                                "value": value,
                                "type": kind.api_type(),
                            }
                        })),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Delete one field; silently a no-op when it does not exist.
    pub async fn delete_field_if_present(
        &self,
        record_id: u64,
        namespace: &str,
        key: &str,
    ) -> Result<()> {
        if let Some(field) = self.find_field(record_id, namespace, key).await? {
            tracing::debug!(record_id, namespace, key, "Deleting field");
            self.transport
                .call(Method::DELETE, &format!("metafields/{}.json", field.id), None)
                .await?;
        }
        Ok(())
    }

    /// Apply one planned mutation.
    pub async fn apply(&self, record_id: u64, op: &FieldOp) -> Result<()> {
        match op {
            FieldOp::Upsert {
                namespace,
                key,
                value,
                kind,
            } => {
                self.upsert_field(record_id, namespace, key, value, Some(*kind))
                    .await
            }
            FieldOp::Delete { namespace, key } => {
                self.delete_field_if_present(record_id, namespace, key).await
            }
        }
    }

    /// Resolve an order code like `C#1234` to its record.
    ///
    /// The remote search may match fuzzily, so the candidate's code is
    /// re-validated against the expected string before it is accepted.
    pub async fn find_record_by_code(&self, code: &str) -> Result<RemoteRecord> {
        // '#' would end the path as a fragment; percent-encode it.
        let encoded = code.replace('#', "%23");
        let value = self
            .transport
            .call(
                Method::GET,
                &format!("orders.json?name={}&status=any&fields=id,name", encoded),
                None,
            )
            .await?;
        let envelope: OrdersEnvelope = serde_json::from_value(value)?;

        envelope
            .orders
            .into_iter()
            .find(|order| order.name == code)
            .map(|order| RemoteRecord {
                id: order.id,
                code: order.name,
            })
            .ok_or_else(|| Error::NotFound(format!("No order with code {}", code)))
    }

    /// Ordered tag list; the remote stores tags as one comma-joined string.
    pub async fn get_tags(&self, record_id: u64) -> Result<Vec<String>> {
        let detail = self.get_order(record_id).await?;
        Ok(split_tags(&detail.tags))
    }

    pub async fn replace_tags(&self, record_id: u64, tags: &[String]) -> Result<()> {
        self.transport
            .call(
                Method::PUT,
                &format!("orders/{}.json", record_id),
                Some(json!({ "order": { "id": record_id, "tags": tags.join(", ") } })),
            )
            .await?;
        Ok(())
    }

    /// The record's single free-text note blob.
    pub async fn get_note(&self, record_id: u64) -> Result<String> {
        let detail = self.get_order(record_id).await?;
        Ok(detail.note.unwrap_or_default())
    }

    /// Replace the whole note; the remote API has no append primitive.
    pub async fn replace_note(&self, record_id: u64, note: &str) -> Result<()> {
        self.transport
            .call(
                Method::PUT,
                &format!("orders/{}.json", record_id),
                Some(json!({ "order": { "id": record_id, "note": note } })),
            )
            .await?;
        Ok(())
    }

    async fn get_order(&self, record_id: u64) -> Result<OrderDetail> {
        let value = self
            .transport
            .call(
                Method::GET,
                &format!("orders/{}.json?fields=id,name,tags,note", record_id),
                None,
            )
            .await?;
        let envelope: OrderEnvelope = serde_json::from_value(value)?;
        Ok(envelope.order)
    }

    async fn find_field(
        &self,
        record_id: u64,
        namespace: &str,
        key: &str,
    ) -> Result<Option<RemoteField>> {
        let fields = self.list_fields_raw(record_id).await?;
        Ok(fields
            .into_iter()
            .find(|f| f.namespace.trim() == namespace && f.key.trim() == key))
    }
}

/// Split a comma-joined tag string into an ordered set: trimmed,
/// empties dropped, first occurrence wins.
pub fn split_tags(tags: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for tag in tags.split(',') {
        let tag = tag.trim();
        if !tag.is_empty() && !result.iter().any(|t| t == tag) {
            result.push(tag.to_string());
        }
    }
    result
}

//! Shared test fixture: an in-memory commerce admin API behind the
//! `Transport` trait, stateful enough to exercise the list-then-act
//! upsert, tag and note round trips, and per-record batch isolation.

use async_trait::async_trait;
use partsdesk_common::{Error, Result};
use partsdesk_rc::Transport;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FakeOrder {
    pub name: String,
    pub tags: String,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct StoredField {
    pub id: u64,
    pub order_id: u64,
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub kind: String,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub orders: HashMap<u64, FakeOrder>,
    pub fields: Vec<StoredField>,
    pub next_field_id: u64,
    /// Every call received, `"METHOD path"`, in order.
    pub calls: Vec<String>,
}

/// In-memory stand-in for the remote commerce API.
pub struct FakeCommerceApi {
    pub state: Mutex<FakeState>,
}

impl FakeCommerceApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_field_id: 1,
                ..FakeState::default()
            }),
        }
    }

    pub fn add_order(&self, id: u64, name: &str, tags: &str, note: &str) {
        self.state.lock().unwrap().orders.insert(
            id,
            FakeOrder {
                name: name.to_string(),
                tags: tags.to_string(),
                note: note.to_string(),
            },
        );
    }

    pub fn add_field(&self, order_id: u64, namespace: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_field_id;
        state.next_field_id += 1;
        state.fields.push(StoredField {
            id,
            order_id,
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            kind: "single_line_text_field".to_string(),
        });
    }

    pub fn field_value(&self, order_id: u64, namespace: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .fields
            .iter()
            .find(|f| f.order_id == order_id && f.namespace == namespace && f.key == key)
            .map(|f| f.value.clone())
    }

    pub fn field_kind(&self, order_id: u64, namespace: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .fields
            .iter()
            .find(|f| f.order_id == order_id && f.namespace == namespace && f.key == key)
            .map(|f| f.kind.clone())
    }

    pub fn order(&self, order_id: u64) -> FakeOrder {
        self.state.lock().unwrap().orders[&order_id].clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn handle(&self, method: &Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{} {}", method, path));

        let (route, query) = match path.split_once('?') {
            Some((route, query)) => (route, query),
            None => (path, ""),
        };

        // GET orders.json?name=...
        if *method == Method::GET && route == "orders.json" {
            let wanted = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("name="))
                .unwrap_or("")
                .replace("%23", "#");
            let mut orders: Vec<Value> = state
                .orders
                .iter()
                .filter(|(_, o)| o.name == wanted)
                .map(|(id, o)| json!({ "id": id, "name": o.name }))
                .collect();
            if orders.is_empty() {
                // The real search is fuzzy: near misses come back as
                // candidates and the client must re-validate the code.
                orders = state
                    .orders
                    .iter()
                    .map(|(id, o)| json!({ "id": id, "name": o.name }))
                    .collect();
            }
            return Ok(json!({ "orders": orders }));
        }

        // orders/{id}/metafields.json
        if let Some(order_id) = parse_segment(route, "orders/", "/metafields.json") {
            require_order(&state, order_id)?;
            if *method == Method::GET {
                let fields: Vec<Value> = state
                    .fields
                    .iter()
                    .filter(|f| f.order_id == order_id)
                    .map(|f| {
                        json!({
                            "id": f.id,
                            "namespace": f.namespace,
                            "key": f.key,
                            "value": f.value,
                            "type": f.kind,
                        })
                    })
                    .collect();
                return Ok(json!({ "metafields": fields }));
            }
            if *method == Method::POST {
                let field = &body.expect("POST body")["metafield"];
                let id = state.next_field_id;
                state.next_field_id += 1;
                state.fields.push(StoredField {
                    id,
                    order_id,
                    namespace: field["namespace"].as_str().unwrap().to_string(),
                    key: field["key"].as_str().unwrap().to_string(),
                    value: field["value"].as_str().unwrap().to_string(),
                    kind: field["type"].as_str().unwrap().to_string(),
                });
                return Ok(json!({ "metafield": { "id": id } }));
            }
        }

        // metafields/{id}.json
        if let Some(field_id) = parse_segment(route, "metafields/", ".json") {
            if *method == Method::PUT {
                let value = body.expect("PUT body")["metafield"]["value"]
                    .as_str()
                    .unwrap()
                    .to_string();
                let field = state
                    .fields
                    .iter_mut()
                    .find(|f| f.id == field_id)
                    .ok_or_else(|| Error::Transport {
                        status: 404,
                        message: "Not Found".to_string(),
                    })?;
                // Type is immutable after creation; only the value moves.
                field.value = value;
                return Ok(json!({ "metafield": { "id": field_id } }));
            }
            if *method == Method::DELETE {
                state.fields.retain(|f| f.id != field_id);
                return Ok(Value::Null);
            }
        }

        // orders/{id}.json
        if let Some(order_id) = parse_segment(route, "orders/", ".json") {
            require_order(&state, order_id)?;
            if *method == Method::GET {
                let order = &state.orders[&order_id];
                return Ok(json!({
                    "order": {
                        "id": order_id,
                        "name": order.name,
                        "tags": order.tags,
                        "note": order.note,
                    }
                }));
            }
            if *method == Method::PUT {
                let patch = body.expect("PUT body")["order"].clone();
                let order = state.orders.get_mut(&order_id).unwrap();
                if let Some(tags) = patch["tags"].as_str() {
                    order.tags = tags.to_string();
                }
                if let Some(note) = patch["note"].as_str() {
                    order.note = note.to_string();
                }
                return Ok(json!({ "order": { "id": order_id } }));
            }
        }

        Err(Error::Transport {
            status: 404,
            message: format!("no fake route for {} {}", method, path),
        })
    }
}

fn parse_segment(route: &str, prefix: &str, suffix: &str) -> Option<u64> {
    route
        .strip_prefix(prefix)?
        .strip_suffix(suffix)?
        .parse()
        .ok()
}

fn require_order(state: &FakeState, order_id: u64) -> Result<()> {
    if state.orders.contains_key(&order_id) {
        Ok(())
    } else {
        Err(Error::Transport {
            status: 404,
            message: "Not Found".to_string(),
        })
    }
}

#[async_trait]
impl Transport for FakeCommerceApi {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        self.handle(&method, path, body.as_ref())
    }
}

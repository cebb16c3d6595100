/*!
Construction de payloads snapshot

Forme attendue par les contrats `fleetview/nodes/snapshot@v1` et
`fleetview/map/snapshot@v1` : `{ "ts": "...", "items": [ ... ] }`.
*/

use serde_json::{json, Value};

use crate::test_utils::minutes_ago;

pub const NODES_SNAPSHOT_TOPIC: &str = "fleetview/nodes/snapshot@v1";
pub const MAP_SNAPSHOT_TOPIC: &str = "fleetview/map/snapshot@v1";

#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    items: Vec<Value>,
    ts: Option<String>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, item: Value) -> Self {
        self.items.push(item);
        self
    }

    pub fn items<I: IntoIterator<Item = Value>>(mut self, items: I) -> Self {
        self.items.extend(items);
        self
    }

    pub fn ts(mut self, ts: &str) -> Self {
        self.ts = Some(ts.to_string());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "ts": self.ts.unwrap_or_else(|| minutes_ago(0)),
            "items": self.items,
        })
    }

    /// Convertit en bytes JSON pour envoi MQTT
    pub fn to_bytes(self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).unwrap_or_default()
    }
}

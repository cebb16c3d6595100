/*!
Builders de records bruts

Produisent du `serde_json::Value` tel que le reçoit le kernel, pour que les
tests passent par la normalisation comme en production. `without` et `set_field`
permettent de fabriquer des records incomplets ou mal typés.
*/

use serde_json::{json, Map, Value};

use crate::test_utils::minutes_ago;

/// Record nœud brut (forme `NodeRecord` côté réseau, camelCase)
#[derive(Debug, Clone)]
pub struct NodeFixture {
    payload: Map<String, Value>,
}

impl NodeFixture {
    /// Nœud online, sain, avec stockage et RAM renseignés
    pub fn new(id: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(id));
        payload.insert("status".into(), json!("online"));
        payload.insert("healthScore".into(), json!(80.0));
        payload.insert("tier".into(), json!("Good"));
        payload.insert("storageUsed".into(), json!(500u64));
        payload.insert("storageTotal".into(), json!(1000u64));
        payload.insert("ramUsed".into(), json!(2048u64));
        payload.insert("ramTotal".into(), json!(8192u64));
        payload.insert("version".into(), json!("0.7.0"));
        payload.insert("region".into(), json!("eu-west"));
        payload.insert("ip".into(), json!("10.0.0.1"));
        payload.insert("lastSeen".into(), json!(minutes_ago(1)));
        Self { payload }
    }

    /// Définit un champ brut quelconque (y compris avec un type invalide)
    pub fn set_field<S: Into<String>>(mut self, field: S, value: Value) -> Self {
        self.payload.insert(field.into(), value);
        self
    }

    /// Retire un champ pour simuler une donnée absente
    pub fn without(mut self, field: &str) -> Self {
        self.payload.remove(field);
        self
    }

    pub fn status(self, status: &str) -> Self {
        self.set_field("status", json!(status))
    }

    pub fn health(self, score: f64) -> Self {
        self.set_field("healthScore", json!(score))
    }

    pub fn tier(self, tier: &str) -> Self {
        self.set_field("tier", json!(tier))
    }

    pub fn storage(self, used: u64, total: u64) -> Self {
        self.set_field("storageUsed", json!(used))
            .set_field("storageTotal", json!(total))
    }

    pub fn storage_utilization(self, percent: f64) -> Self {
        self.set_field("storageUtilization", json!(percent))
    }

    pub fn ram(self, used: u64, total: u64) -> Self {
        self.set_field("ramUsed", json!(used))
            .set_field("ramTotal", json!(total))
    }

    pub fn version(self, version: &str) -> Self {
        self.set_field("version", json!(version))
    }

    pub fn region(self, region: &str) -> Self {
        self.set_field("region", json!(region))
    }

    pub fn ip(self, ip: &str) -> Self {
        self.set_field("ip", json!(ip))
    }

    pub fn last_seen(self, last_seen: &str) -> Self {
        self.set_field("lastSeen", json!(last_seen))
    }

    pub fn build(self) -> Value {
        Value::Object(self.payload)
    }
}

/// Nœud carte brut (forme `MapNode` côté réseau)
#[derive(Debug, Clone)]
pub struct MapNodeFixture {
    payload: Map<String, Value>,
}

impl MapNodeFixture {
    pub fn new(id: &str, lat: f64, lng: f64) -> Self {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(id));
        payload.insert("lat".into(), json!(lat));
        payload.insert("lng".into(), json!(lng));
        payload.insert("status".into(), json!("online"));
        payload.insert("healthScore".into(), json!(90.0));
        payload.insert("storageUtilization".into(), json!(50.0));
        payload.insert("version".into(), json!("0.7.0"));
        payload.insert("lastSeen".into(), json!(minutes_ago(1)));
        payload.insert("region".into(), json!("eu-west"));
        payload.insert("country".into(), json!("France"));
        Self { payload }
    }

    pub fn set_field<S: Into<String>>(mut self, field: S, value: Value) -> Self {
        self.payload.insert(field.into(), value);
        self
    }

    pub fn without(mut self, field: &str) -> Self {
        self.payload.remove(field);
        self
    }

    pub fn status(self, status: &str) -> Self {
        self.set_field("status", json!(status))
    }

    pub fn health(self, score: f64) -> Self {
        self.set_field("healthScore", json!(score))
    }

    pub fn storage_utilization(self, percent: f64) -> Self {
        self.set_field("storageUtilization", json!(percent))
    }

    pub fn last_seen_minutes_ago(self, minutes: i64) -> Self {
        self.set_field("lastSeen", json!(minutes_ago(minutes)))
    }

    pub fn city(self, city: &str) -> Self {
        self.set_field("city", json!(city))
    }

    pub fn build(self) -> Value {
        Value::Object(self.payload)
    }
}

/// Flotte de `count` nœuds aux ids uniques (`node-000`, `node-001`...)
/// avec statuts, scores et régions variés.
pub fn fleet(count: usize) -> Vec<Value> {
    const REGIONS: [&str; 3] = ["eu-west", "us-east", "ap-south"];

    (0..count)
        .map(|i| {
            let health = ((i * 37) % 101) as f64;
            let tier = if health >= 85.0 {
                "Excellent"
            } else if health >= 60.0 {
                "Good"
            } else {
                "Poor"
            };
            NodeFixture::new(&format!("node-{i:03}"))
                .status(if i % 4 == 0 { "offline" } else { "online" })
                .health(health)
                .tier(tier)
                .storage((i as u64 + 1) * 10, 1000)
                .region(REGIONS[i % REGIONS.len()])
                .ip(&format!("10.0.{}.{}", i / 256, i % 256))
                .build()
        })
        .collect()
}

/*!
Normalisation des records bruts

RÔLE : Transforme le JSON reçu, de qualité inconnue, en [`NodeRecord`] et
[`MapNode`].

FONCTIONNEMENT :
- Rien n'échoue ici : champ absent ou mal typé → valeur par défaut sûre
- Noms de champs en camelCase, alias snake_case acceptés
- Un record invalide n'interrompt jamais un rafraîchissement
*/

use serde_json::Value;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use crate::model::{MapNode, NodeRecord, NodeStatus, Tier};

/// Au-delà, un epoch est lu en millisecondes
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Normalise un record nœud brut. `position` est son index dans la collection
/// reçue, utilisé seulement pour l'identité de repli.
pub fn normalize_record(raw: &Value, position: usize) -> NodeRecord {
    let id = text(raw, &["id"])
        .or_else(|| text(raw, &["pubkey", "publicKey", "public_key"]))
        .or_else(|| text(raw, &["ip"]))
        .unwrap_or_else(|| format!("unknown-{position}"));

    NodeRecord {
        status: text(raw, &["status"])
            .map(|s| NodeStatus::from_wire(&s))
            .unwrap_or(NodeStatus::Unknown),
        health_score: number(raw, &["healthScore", "health_score"]).into(),
        tier: text(raw, &["tier"]).and_then(|t| Tier::from_wire(&t)),
        storage_used: bytes(raw, &["storageUsed", "storage_used"]).unwrap_or(0),
        storage_total: bytes(raw, &["storageTotal", "storage_total"]).unwrap_or(0),
        storage_utilization: number(raw, &["storageUtilization", "storage_utilization"]),
        ram_used: bytes(raw, &["ramUsed", "ram_used"]),
        ram_total: bytes(raw, &["ramTotal", "ram_total"]),
        version: text(raw, &["version"]).unwrap_or_default(),
        region: text(raw, &["region"]).unwrap_or_default(),
        ip: text(raw, &["ip"]).unwrap_or_default(),
        last_seen: field(raw, &["lastSeen", "last_seen"]).and_then(parse_timestamp),
        id,
    }
}

pub fn normalize_records(raw: &[Value]) -> Vec<NodeRecord> {
    raw.iter()
        .enumerate()
        .map(|(position, record)| normalize_record(record, position))
        .collect()
}

/// Normalise un nœud carte. `None` s'il n'est pas plaçable : pas d'identité,
/// coordonnées absentes ou hors bornes.
pub fn normalize_map_node(raw: &Value) -> Option<MapNode> {
    let id = text(raw, &["id", "pubkey"])?;
    let lat = number(raw, &["lat", "latitude"]).filter(|v| (-90.0..=90.0).contains(v));
    let lng = number(raw, &["lng", "lon", "longitude"]).filter(|v| (-180.0..=180.0).contains(v));

    let (Some(lat), Some(lng)) = (lat, lng) else {
        debug!(node = %id, "dropping map node without usable coordinates");
        return None;
    };

    Some(MapNode {
        lat,
        lng,
        status: text(raw, &["status"])
            .map(|s| NodeStatus::from_wire(&s))
            .unwrap_or(NodeStatus::Unknown),
        health_score: number(raw, &["healthScore", "health_score"]).into(),
        storage_utilization: number(raw, &["storageUtilization", "storage_utilization"]).unwrap_or(0.0),
        version: text(raw, &["version"]).unwrap_or_default(),
        last_seen: field(raw, &["lastSeen", "last_seen"]).and_then(parse_timestamp),
        region: text(raw, &["region"]).unwrap_or_default(),
        country: text(raw, &["country"]).unwrap_or_default(),
        city: text(raw, &["city"]),
        id,
    })
}

pub fn normalize_map_nodes(raw: &[Value]) -> Vec<MapNode> {
    raw.iter().filter_map(normalize_map_node).collect()
}

/// Horodatage RFC 3339, ISO 8601 (sans offset → UTC) ou epoch en secondes /
/// millisecondes. Valeur hors plage → `None`.
pub fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            OffsetDateTime::parse(s, &Rfc3339)
                .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
                .ok()
                .or_else(|| {
                    PrimitiveDateTime::parse(s, &Iso8601::DEFAULT)
                        .ok()
                        .map(PrimitiveDateTime::assume_utc)
                })
                .or_else(|| s.parse::<f64>().ok().and_then(from_epoch))
        }
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(value: f64) -> Option<OffsetDateTime> {
    if !value.is_finite() {
        return None;
    }
    let nanos = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        (value as i128).checked_mul(1_000_000)?
    } else if value.fract() == 0.0 {
        (value as i128).checked_mul(1_000_000_000)?
    } else {
        (value * 1e9) as i128
    };
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|v| !v.is_null())
}

/// Chaîne non vide nettoyée ; les nombres sont acceptés et convertis
fn text(raw: &Value, keys: &[&str]) -> Option<String> {
    let s = match field(raw, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Nombre fini, depuis un nombre JSON ou une chaîne numérique
fn number(raw: &Value, keys: &[&str]) -> Option<f64> {
    let value = match field(raw, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Nombre d'octets ; négatif → 0
fn bytes(raw: &Value, keys: &[&str]) -> Option<u64> {
    number(raw, keys).map(|v| v.max(0.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_devkit::{init_test_logging, MapNodeFixture, NodeFixture};
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_complete_record() {
        let raw = NodeFixture::new("node-a").health(91.5).tier("Excellent").build();
        let record = normalize_record(&raw, 0);

        assert_eq!(record.id, "node-a");
        assert_eq!(record.status, NodeStatus::Online);
        assert_eq!(record.health_score.get(), Some(91.5));
        assert_eq!(record.tier, Some(Tier::Excellent));
        assert_eq!(record.storage_used, 500);
        assert_eq!(record.storage_total, 1000);
        assert_eq!(record.ram_total, Some(8192));
        assert_eq!(record.last_seen, Some(datetime!(2024-06-01 11:59:00 UTC)));
    }

    #[test]
    fn test_empty_object_gets_safe_defaults() {
        let record = normalize_record(&json!({}), 7);

        assert_eq!(record.id, "unknown-7");
        assert_eq!(record.status, NodeStatus::Unknown);
        assert!(!record.health_score.is_reported());
        assert_eq!(record.health_score.sort_value(), 0.0);
        assert_eq!(record.tier, None);
        assert_eq!(record.storage_total, 0);
        assert_eq!(record.ram_used, None);
        assert_eq!(record.version, "");
        assert_eq!(record.last_seen, None);
    }

    #[test]
    fn test_non_object_input_does_not_panic() {
        let record = normalize_record(&json!("garbage"), 3);
        assert_eq!(record.id, "unknown-3");
    }

    #[test]
    fn test_identity_fallback_chain() {
        let by_pubkey = normalize_record(&json!({"pubkey": "pk1", "ip": "1.2.3.4"}), 0);
        assert_eq!(by_pubkey.id, "pk1");

        let by_ip = normalize_record(&json!({"id": "   ", "ip": "1.2.3.4"}), 0);
        assert_eq!(by_ip.id, "1.2.3.4");
    }

    #[test]
    fn test_mistyped_fields() {
        let raw = NodeFixture::new("x")
            .set_field("healthScore", json!("72.5"))
            .set_field("storageUsed", json!(-40))
            .set_field("storageTotal", json!({"nested": true}))
            .set_field("tier", json!("Legendary"))
            .set_field("lastSeen", json!("yesterday-ish"))
            .build();
        let record = normalize_record(&raw, 0);

        assert_eq!(record.health_score.get(), Some(72.5));
        assert_eq!(record.storage_used, 0);
        assert_eq!(record.storage_total, 0);
        assert_eq!(record.tier, None);
        assert_eq!(record.last_seen, None);
    }

    #[test]
    fn test_snake_case_aliases() {
        let record = normalize_record(
            &json!({"id": "s", "health_score": 50, "storage_used": 1, "storage_total": 4}),
            0,
        );
        assert_eq!(record.health_score.get(), Some(50.0));
        assert_eq!(record.storage_ratio(), Some(0.25));
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = datetime!(2023-11-14 22:13:20 UTC);
        assert_eq!(parse_timestamp(&json!("2023-11-14T22:13:20Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2023-11-14T23:13:20+01:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_700_000_000)), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_700_000_000_000u64)), Some(expected));
        assert_eq!(parse_timestamp(&json!("1700000000")), Some(expected));
        assert_eq!(parse_timestamp(&json!("not a date")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
    }

    #[test]
    fn test_huge_epoch_values_are_absent() {
        assert_eq!(parse_timestamp(&json!(1e33)), None);
        assert_eq!(parse_timestamp(&json!(-1e33)), None);
        assert_eq!(parse_timestamp(&json!("1e35")), None);
        assert_eq!(parse_timestamp(&json!(f64::MAX)), None);
        assert_eq!(parse_timestamp(&json!(1e15)), None);

        let record = normalize_record(&json!({"id": "x", "lastSeen": "1e35"}), 0);
        assert_eq!(record.id, "x");
        assert_eq!(record.last_seen, None);
    }

    #[test]
    fn test_normalize_records_keeps_order() {
        let raw = vec![json!({"id": "b"}), json!({}), json!({"id": "a"})];
        let ids: Vec<String> = normalize_records(&raw).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "unknown-1", "a"]);
    }

    #[test]
    fn test_map_node_requires_coordinates() {
        init_test_logging();
        let ok = MapNodeFixture::new("m1", 48.85, 2.35).city("Paris").build();
        let node = normalize_map_node(&ok).unwrap();
        assert_eq!(node.city.as_deref(), Some("Paris"));
        assert_eq!(node.storage_utilization, 50.0);

        let missing = MapNodeFixture::new("m2", 0.0, 0.0).without("lat").build();
        assert!(normalize_map_node(&missing).is_none());

        let out_of_range = MapNodeFixture::new("m3", 91.0, 0.0).build();
        assert!(normalize_map_node(&out_of_range).is_none());

        let nodes = normalize_map_nodes(&[ok, missing, out_of_range]);
        assert_eq!(nodes.len(), 1);
    }
}

use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::KernelConfig;
use crate::contracts::{ContractError, ContractRegistry};
use crate::health::HealthTracker;
use crate::models::{IngestReport, SnapshotIn};
use crate::state::{FleetSnapshot, Shared};

pub const NODES_SNAPSHOT_TOPIC: &str = "fleetview/nodes/snapshot@v1";
pub const MAP_SNAPSHOT_TOPIC: &str = "fleetview/map/snapshot@v1";
pub const HEALTH_TOPIC: &str = "fleetview/kernel/health@v1";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("payload is not UTF-8")]
    NotUtf8,
    #[error("no ingestion for topic {0}")]
    UnknownTopic(String),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("unexpected snapshot shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Client id unique par process : deux kernels sur le même broker ne
/// doivent pas s'éjecter mutuellement.
pub fn mqtt_options(cfg: &KernelConfig, role: &str) -> MqttOptions {
    let mqtt = cfg.mqtt_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let client_id = format!("fleetview-kernel-{role}-{}", &suffix[..8]);
    let mut opts = MqttOptions::new(client_id, mqtt.host, mqtt.port);
    opts.set_keep_alive(Duration::from_secs(15));
    opts
}

/// Valide puis applique un snapshot reçu sur `topic`. Le snapshot remplace
/// entièrement la collection correspondante.
pub fn ingest_payload(
    topic: &str,
    payload: &[u8],
    snapshot: &Shared<FleetSnapshot>,
    contracts: &ContractRegistry,
) -> Result<IngestReport, IngestError> {
    if topic != NODES_SNAPSHOT_TOPIC && topic != MAP_SNAPSHOT_TOPIC {
        return Err(IngestError::UnknownTopic(topic.to_string()));
    }
    let txt = std::str::from_utf8(payload).map_err(|_| IngestError::NotUtf8)?;
    let value = contracts.validate_message(topic, txt)?;
    let items = serde_json::from_value::<SnapshotIn>(value)?.into_items();

    let mut snap = snapshot.lock();
    let accepted = if topic == NODES_SNAPSHOT_TOPIC {
        snap.replace_nodes(&items)
    } else {
        snap.replace_map_nodes(&items)
    };
    Ok(IngestReport { accepted, received: items.len(), version: snap.version })
}

pub fn spawn_mqtt_listener(
    snapshot: Shared<FleetSnapshot>,
    cfg: KernelConfig,
    contracts: ContractRegistry,
    health: HealthTracker,
) {
    task::spawn(async move {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(&cfg, "ingest"), 10);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    health.mark_mqtt_connected();
                    info!("MQTT connected, subscribing to snapshot topics");
                    for topic in [NODES_SNAPSHOT_TOPIC, MAP_SNAPSHOT_TOPIC] {
                        if let Err(e) = client.subscribe(topic, QoS::AtLeastOnce).await {
                            warn!(topic, error = ?e, "MQTT subscribe failed");
                        }
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    match ingest_payload(&p.topic, &p.payload, &snapshot, &contracts) {
                        Ok(report) => debug!(
                            topic = %p.topic,
                            accepted = report.accepted,
                            received = report.received,
                            version = report.version,
                            "snapshot ingested"
                        ),
                        Err(e) => warn!(topic = %p.topic, error = %e, "snapshot rejected"),
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => health.mark_mqtt_disconnected(),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = ?e, "MQTT error, retrying");
                    health.increment_reconnects();
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state;
    use fleetview_devkit::{fleet, init_test_logging, MapNodeFixture, SnapshotBuilder};

    async fn shipped_contracts() -> ContractRegistry {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/contracts/mqtt");
        ContractRegistry::load_contracts_from_dir(dir).await.unwrap()
    }

    #[tokio::test]
    async fn test_ingest_nodes_snapshot_replaces_collection() {
        let contracts = shipped_contracts().await;
        let snapshot = new_state(FleetSnapshot::default());

        let first = SnapshotBuilder::new().items(fleet(10)).to_bytes();
        let report = ingest_payload(NODES_SNAPSHOT_TOPIC, &first, &snapshot, &contracts).unwrap();
        assert_eq!((report.accepted, report.version), (10, 1));

        let second = SnapshotBuilder::new().items(fleet(3)).to_bytes();
        ingest_payload(NODES_SNAPSHOT_TOPIC, &second, &snapshot, &contracts).unwrap();
        assert_eq!(snapshot.lock().nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_ingest_map_snapshot_counts_placed_nodes() {
        let contracts = shipped_contracts().await;
        let snapshot = new_state(FleetSnapshot::default());
        let payload = SnapshotBuilder::new()
            .item(MapNodeFixture::new("a", 1.0, 1.0).build())
            .item(MapNodeFixture::new("b", 95.0, 1.0).build())
            .to_bytes();

        let report = ingest_payload(MAP_SNAPSHOT_TOPIC, &payload, &snapshot, &contracts).unwrap();
        assert_eq!((report.accepted, report.received), (1, 2));
    }

    #[tokio::test]
    async fn test_invalid_payloads_leave_snapshot_untouched() {
        init_test_logging();
        let contracts = shipped_contracts().await;
        let snapshot = new_state(FleetSnapshot::default());

        assert!(matches!(
            ingest_payload(NODES_SNAPSHOT_TOPIC, br#"{"ts":"x"}"#, &snapshot, &contracts),
            Err(IngestError::Contract(_))
        ));
        assert!(matches!(
            ingest_payload(NODES_SNAPSHOT_TOPIC, &[0xff, 0xfe], &snapshot, &contracts),
            Err(IngestError::NotUtf8)
        ));
        assert!(matches!(
            ingest_payload(HEALTH_TOPIC, b"{}", &snapshot, &contracts),
            Err(IngestError::UnknownTopic(_))
        ));
        assert_eq!(snapshot.lock().version, 0);
    }

    #[test]
    fn test_client_ids_are_unique() {
        let cfg = KernelConfig::default();
        let a = mqtt_options(&cfg, "ingest");
        let b = mqtt_options(&cfg, "ingest");
        assert!(a.client_id().starts_with("fleetview-kernel-ingest-"));
        assert_ne!(a.client_id(), b.client_id());
    }
}

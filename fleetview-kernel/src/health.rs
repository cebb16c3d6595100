use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::task;
use tracing::{debug, warn};

use crate::config::KernelConfig;
use crate::contracts::ContractRegistry;
use crate::mqtt::{mqtt_options, HEALTH_TOPIC};
use crate::state::{FleetSnapshot, Shared};

const PUBLISH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MqttStatus {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub data_version: u64,
    pub nodes_tracked: u32,
    pub map_nodes_tracked: u32,
    pub contracts_loaded: u32,
    pub last_refresh: Option<String>,
    /// Pas de snapshot depuis plus de deux intervalles de rafraîchissement
    pub stale: bool,
    pub memory_usage_mb: Option<f32>,
    pub mqtt_status: MqttStatus,
    pub mqtt_reconnects: u32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    mqtt_reconnects: Arc<AtomicU32>,
    mqtt_status: Arc<parking_lot::Mutex<MqttStatus>>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            mqtt_reconnects: Arc::new(AtomicU32::new(0)),
            mqtt_status: Arc::new(parking_lot::Mutex::new(MqttStatus::Connecting)),
        }
    }

    pub fn mark_mqtt_connected(&self) {
        *self.mqtt_status.lock() = MqttStatus::Connected;
    }

    pub fn mark_mqtt_disconnected(&self) {
        *self.mqtt_status.lock() = MqttStatus::Disconnected;
    }

    pub fn increment_reconnects(&self) {
        self.mqtt_reconnects.fetch_add(1, Ordering::Relaxed);
        *self.mqtt_status.lock() = MqttStatus::Reconnecting;
    }

    pub fn get_health(
        &self,
        contracts: &ContractRegistry,
        snapshot: &Shared<FleetSnapshot>,
        refresh_interval_secs: u64,
    ) -> KernelHealth {
        let now = OffsetDateTime::now_utc();
        let snap = snapshot.lock();

        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            data_version: snap.version,
            nodes_tracked: snap.nodes.len() as u32,
            map_nodes_tracked: snap.map_nodes.len() as u32,
            contracts_loaded: contracts.list_contracts().len() as u32,
            last_refresh: snap.refreshed_at.and_then(|at| at.format(&Rfc3339).ok()),
            stale: snap.is_stale(now, refresh_interval_secs),
            memory_usage_mb: memory_usage_mb(),
            mqtt_status: *self.mqtt_status.lock(),
            mqtt_reconnects: self.mqtt_reconnects.load(Ordering::Relaxed),
        }
    }

    /// Publie le health kernel toutes les 30s sur `fleetview/kernel/health@v1`
    pub fn spawn_health_publisher(
        &self,
        cfg: KernelConfig,
        contracts: ContractRegistry,
        snapshot: Shared<FleetSnapshot>,
    ) {
        let tracker = self.clone();

        task::spawn(async move {
            let (client, mut eventloop) = rumqttc::AsyncClient::new(mqtt_options(&cfg, "health"), 10);
            let mut interval = tokio::time::interval(PUBLISH_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let health = tracker.get_health(&contracts, &snapshot, cfg.refresh_interval_secs);
                        let Ok(payload) = serde_json::to_string(&health) else { continue };
                        match client.publish(HEALTH_TOPIC, rumqttc::QoS::AtLeastOnce, false, payload).await {
                            Ok(()) => debug!(
                                uptime = health.uptime_seconds,
                                version = health.data_version,
                                "published kernel health"
                            ),
                            Err(e) => warn!(error = ?e, "failed to publish kernel health"),
                        }
                    },
                    event = eventloop.poll() => {
                        if let Err(e) = event {
                            warn!(error = ?e, "health MQTT connection error");
                            tokio::time::sleep(Duration::from_secs(2)).await;
                        }
                    }
                }
            }
        });
    }
}

/// RSS du process via /proc (Linux uniquement)
fn memory_usage_mb() -> Option<f32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb as f32 / 1024.0)
}

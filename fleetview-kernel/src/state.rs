use anyhow::Context;
use fleetview_core::{normalize_map_nodes, normalize_records, MapNode, NodeRecord};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;

use crate::models::SnapshotFile;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Dernière collection complète reçue. Chaque ingestion remplace tout,
/// rien n'est fusionné avec l'état précédent.
#[derive(Debug, Default)]
pub struct FleetSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub map_nodes: Vec<MapNode>,
    /// Incrémenté à chaque remplacement
    pub version: u64,
    pub refreshed_at: Option<OffsetDateTime>,
}

impl FleetSnapshot {
    pub fn replace_nodes(&mut self, raw: &[Value]) -> usize {
        self.nodes = normalize_records(raw);
        self.touch();
        self.nodes.len()
    }

    /// Retourne le nombre de nœuds placés (ceux sans coordonnées sont ignorés).
    pub fn replace_map_nodes(&mut self, raw: &[Value]) -> usize {
        self.map_nodes = normalize_map_nodes(raw);
        self.touch();
        self.map_nodes.len()
    }

    pub fn is_stale(&self, now: OffsetDateTime, refresh_interval_secs: u64) -> bool {
        let limit = time::Duration::seconds(refresh_interval_secs.saturating_mul(2) as i64);
        match self.refreshed_at {
            Some(at) => now - at > limit,
            None => true,
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.refreshed_at = Some(OffsetDateTime::now_utc());
    }
}

/// Charge le snapshot initial déclaré dans `snapshot_file`.
pub async fn load_snapshot_file<P: AsRef<Path>>(path: P, snapshot: &Shared<FleetSnapshot>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let txt = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read snapshot file {}", path.display()))?;
    let file: SnapshotFile = serde_json::from_str(&txt)
        .with_context(|| format!("invalid snapshot file {}", path.display()))?;

    let mut snap = snapshot.lock();
    let nodes = snap.replace_nodes(&file.nodes);
    let map_nodes = snap.replace_map_nodes(&file.map_nodes);
    info!(nodes, map_nodes, path = %path.display(), "initial snapshot loaded");
    Ok(())
}

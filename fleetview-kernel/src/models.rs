use fleetview_core::geo::{Cluster, LayerDiff, MarkerStyle};
use fleetview_core::overlay::{FixedRegions, ScreenPoint, Viewport};
use fleetview_core::{Column, ColumnVisibility, FleetError, NodeDisplay, NodeRecord, ViewState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload d'un snapshot (MQTT ou HTTP) : `{ "ts": ..., "items": [...] }`.
/// Un tableau nu est aussi accepté côté HTTP.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SnapshotIn {
    Envelope {
        #[serde(default)]
        ts: Option<String>,
        items: Vec<Value>,
    },
    Bare(Vec<Value>),
}

impl SnapshotIn {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Envelope { items, .. } => items,
            Self::Bare(items) => items,
        }
    }
}

/// Fichier de snapshot initial (`snapshot_file`)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub map_nodes: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub received: usize,
    pub version: u64,
}

/// Paramètres de `GET /nodes/view`, tous optionnels.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub tier: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    /// Colonnes masquées, séparées par des virgules
    pub hide: Option<String>,
}

impl ViewQuery {
    pub fn into_view_state(self, default_page_size: usize) -> Result<ViewState, FleetError> {
        let mut state = ViewState { page_size: default_page_size, ..ViewState::default() };

        if let Some(search) = self.search {
            state.search_text = search;
        }
        if let Some(status) = self.status {
            state.status_filter = status.parse()?;
        }
        if let Some(tier) = self.tier {
            state.tier_filter = tier.parse()?;
        }
        if let Some(sort) = self.sort {
            state.sort_field = sort.parse()?;
        }
        if let Some(dir) = self.dir {
            state.sort_direction = dir.parse()?;
        }
        if let Some(page) = self.page {
            state.current_page = page;
        }
        if let Some(size) = self.page_size {
            state.page_size = size;
        }
        if let Some(hide) = self.hide {
            let hidden = hide
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<Column>)
                .collect::<Result<Vec<_>, _>>()?;
            state.column_visibility = ColumnVisibility::hiding(hidden);
        }
        Ok(state)
    }
}

/// Paramètres de `GET /map/clusters` et `GET /map/markers`
#[derive(Debug, Default, Deserialize)]
pub struct ClusterQuery {
    pub zoom: Option<u8>,
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    pub point: ScreenPoint,
    pub viewport: Viewport,
    /// Géométrie des panneaux ; celle de la config sinon
    #[serde(default)]
    pub regions: Option<FixedRegions>,
}

/// Un marqueur prêt à dessiner : le cluster, plus le style du nœud quand
/// le cluster n'en contient qu'un.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerView {
    #[serde(flatten)]
    pub cluster: Cluster,
    pub count: usize,
    pub expansion_zoom: Option<u8>,
    pub style: Option<MarkerStyle>,
}

/// Fiche d'un nœud : le record normalisé plus ses champs d'affichage
#[derive(Debug, Serialize)]
pub struct NodeDetail {
    #[serde(flatten)]
    pub record: NodeRecord,
    pub display: NodeDisplay,
}

#[derive(Debug, Serialize)]
pub struct MarkersResponse {
    pub zoom: u8,
    pub diff: LayerDiff,
    pub markers: Vec<MarkerView>,
}

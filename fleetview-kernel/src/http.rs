/**
 * API REST FLEETVIEW - Serveur HTTP du kernel
 *
 * RÔLE :
 * Expose les trois points d'entrée du cœur (vue paginée, clusters carte,
 * placement des popups) sur le dernier snapshot reçu.
 *
 * FONCTIONNEMENT :
 * - Routes : /health, /system/health, /contracts, /nodes, /map
 * - Chaque requête recalcule la vue à partir du snapshot courant, sans cache
 * - Valeurs de contrôle inconnues (tri, filtre, colonne) → 400
 *
 * SÉCURITÉ :
 * - Header x-api-key obligatoire sur toutes routes sauf /health
 * - FLEETVIEW_API_KEY absente → tout est refusé
 */

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fleetview_core::geo::{compute_clusters, expansion_zoom, marker_style, Cluster, ClusterOptions, MarkerLayer};
use fleetview_core::overlay::{place_overlay, PopupPlacement};
use fleetview_core::{compute_view, node_display, summarize, FleetError, FleetSummary, NodeView};
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::KernelConfig;
use crate::contracts::{Contract, ContractRegistry};
use crate::health::{HealthTracker, KernelHealth};
use crate::models::{
    ClusterQuery, IngestReport, MarkerView, MarkersResponse, NodeDetail, OverlayRequest, SnapshotIn,
    ViewQuery,
};
use crate::state::{FleetSnapshot, Shared};

pub const API_KEY_ENV: &str = "FLEETVIEW_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidControl(#[from] FleetError),
    #[error("node '{0}' not found")]
    NodeNotFound(String),
    #[error("contract '{0}' not found")]
    ContractNotFound(String),
    #[error("zoom {zoom} is above max zoom {max}")]
    ZoomOutOfRange { zoom: u8, max: u8 },
    #[error("missing or invalid API key")]
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidControl(_) | Self::ZoomOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Self::NodeNotFound(_) | Self::ContractNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn api_key_matches(headers: &HeaderMap, expected: &str) -> bool {
    !expected.is_empty()
        && headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, ApiError> {
    // Health check toujours accessible
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var(API_KEY_ENV).unwrap_or_default();
    if expected.is_empty() {
        warn!("{API_KEY_ENV} not set, API access denied");
        return Err(ApiError::Unauthorized);
    }
    if !api_key_matches(req.headers(), &expected) {
        warn!(path = %req.uri().path(), "rejected request without a valid API key");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

#[derive(Clone)]
pub struct AppState {
    pub snapshot: Shared<FleetSnapshot>,
    pub cfg: Arc<KernelConfig>,
    pub contracts: ContractRegistry,
    pub health_tracker: HealthTracker,
    /// Marqueurs actuellement affichés, pour le diff de `/map/markers`
    pub markers: Shared<MarkerLayer>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/contracts", get(list_contracts))
        .route("/contracts/{*name}", get(get_contract))
        .route("/nodes", post(replace_nodes))
        .route("/nodes/view", get(get_view))
        .route("/nodes/summary", get(get_summary))
        .route("/nodes/{id}", get(get_node))
        .route("/map/nodes", post(replace_map_nodes))
        .route("/map/clusters", get(get_clusters))
        .route("/map/markers", get(get_markers))
        .route("/map/overlay", post(place_popup))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.contracts, &app.snapshot, app.cfg.refresh_interval_secs))
}

// GET /contracts
async fn list_contracts(State(app): State<AppState>) -> Json<Vec<String>> {
    Json(app.contracts.list_contracts())
}

// GET /contracts/{name} (ex: /contracts/nodes/snapshot@v1)
async fn get_contract(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Contract>, ApiError> {
    app.contracts
        .get_contract(&name)
        .cloned()
        .map(Json)
        .ok_or(ApiError::ContractNotFound(name))
}

// POST /nodes (remplacement complet)
async fn replace_nodes(State(app): State<AppState>, Json(body): Json<SnapshotIn>) -> Json<IngestReport> {
    let items = body.into_items();
    let mut snap = app.snapshot.lock();
    let accepted = snap.replace_nodes(&items);
    info!(accepted, version = snap.version, "node snapshot replaced over HTTP");
    Json(IngestReport { accepted, received: items.len(), version: snap.version })
}

// GET /nodes/view?search=&status=&tier=&sort=&dir=&page=&page_size=&hide=
async fn get_view(
    State(app): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<NodeView>, ApiError> {
    let view_state = query.into_view_state(app.cfg.view.page_size)?;
    let snap = app.snapshot.lock();
    Ok(Json(compute_view(&snap.nodes, &view_state)))
}

// GET /nodes/summary
async fn get_summary(State(app): State<AppState>) -> Json<FleetSummary> {
    Json(summarize(&app.snapshot.lock().nodes))
}

// GET /nodes/{id}
async fn get_node(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NodeDetail>, ApiError> {
    let snap = app.snapshot.lock();
    let Some(node) = snap.nodes.iter().find(|n| n.id == id) else {
        return Err(ApiError::NodeNotFound(id));
    };
    Ok(Json(NodeDetail {
        display: node_display(node, OffsetDateTime::now_utc()),
        record: node.clone(),
    }))
}

// POST /map/nodes (remplacement complet)
async fn replace_map_nodes(State(app): State<AppState>, Json(body): Json<SnapshotIn>) -> Json<IngestReport> {
    let items = body.into_items();
    let mut snap = app.snapshot.lock();
    let accepted = snap.replace_map_nodes(&items);
    info!(accepted, received = items.len(), "map snapshot replaced over HTTP");
    Json(IngestReport { accepted, received: items.len(), version: snap.version })
}

fn cluster_options(cfg: &KernelConfig, query: &ClusterQuery) -> Result<ClusterOptions, ApiError> {
    let zoom = query.zoom.unwrap_or(cfg.map.default_zoom);
    if zoom > cfg.map.max_zoom {
        return Err(ApiError::ZoomOutOfRange { zoom, max: cfg.map.max_zoom });
    }
    Ok(ClusterOptions {
        radius_px: query.radius.unwrap_or(cfg.map.cluster_radius_px),
        zoom,
        max_zoom: cfg.map.max_zoom,
    })
}

// GET /map/clusters?zoom=&radius=
async fn get_clusters(
    State(app): State<AppState>,
    Query(query): Query<ClusterQuery>,
) -> Result<Json<Vec<Cluster>>, ApiError> {
    let options = cluster_options(&app.cfg, &query)?;
    let snap = app.snapshot.lock();
    Ok(Json(compute_clusters(&snap.map_nodes, &options)))
}

// GET /map/markers?zoom=&radius=
// Clusters + style + diff par rapport au rendu précédent
async fn get_markers(
    State(app): State<AppState>,
    Query(query): Query<ClusterQuery>,
) -> Result<Json<MarkersResponse>, ApiError> {
    let options = cluster_options(&app.cfg, &query)?;
    let now = OffsetDateTime::now_utc();
    let window = app.cfg.recent_window();

    let snap = app.snapshot.lock();
    let clusters = compute_clusters(&snap.map_nodes, &options);
    let diff = app.markers.lock().reconcile(&clusters);

    let markers = clusters
        .into_iter()
        .map(|cluster| {
            let style = if cluster.is_singleton() {
                snap.map_nodes
                    .iter()
                    .find(|n| n.id == cluster.id)
                    .map(|n| marker_style(n, now, window))
            } else {
                None
            };
            MarkerView {
                count: cluster.count(),
                expansion_zoom: expansion_zoom(&cluster, &snap.map_nodes, &options),
                style,
                cluster,
            }
        })
        .collect();

    Ok(Json(MarkersResponse { zoom: options.zoom, diff, markers }))
}

// POST /map/overlay
async fn place_popup(State(app): State<AppState>, Json(req): Json<OverlayRequest>) -> Json<PopupPlacement> {
    let regions = req.regions.unwrap_or(app.cfg.overlay);
    Json(place_overlay(req.point, req.viewport, &regions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state;
    use fleetview_core::overlay::{PopupSide, ScreenPoint, Viewport};
    use fleetview_devkit::{fleet, MapNodeFixture, NodeFixture};
    use serde_json::Value;

    fn test_state() -> AppState {
        AppState {
            snapshot: new_state(FleetSnapshot::default()),
            cfg: Arc::new(KernelConfig::default()),
            contracts: ContractRegistry::new(),
            health_tracker: HealthTracker::new(),
            markers: new_state(MarkerLayer::new()),
        }
    }

    fn bare(items: Vec<Value>) -> Json<SnapshotIn> {
        Json(SnapshotIn::Bare(items))
    }

    #[test]
    fn test_api_key_check() {
        let mut headers = HeaderMap::new();
        assert!(!api_key_matches(&headers, "secret"));
        headers.insert("x-api-key", "secret".parse().unwrap());
        assert!(api_key_matches(&headers, "secret"));
        assert!(!api_key_matches(&headers, "other"));
        assert!(!api_key_matches(&headers, ""));
    }

    #[test]
    fn test_error_status_codes() {
        let bad = ApiError::from(FleetError::UnknownSortField("colour".into()));
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NodeNotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_view_paginates_with_global_rank() {
        let app = test_state();
        replace_nodes(State(app.clone()), bare(fleet(25))).await;

        let query = ViewQuery { page: Some(2), ..Default::default() };
        let Json(view) = get_view(State(app), Query(query)).await.unwrap();
        assert_eq!(view.total_count, 25);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.items.len(), 5);
        assert_eq!(view.items[0].rank, 21);
    }

    #[tokio::test]
    async fn test_view_rejects_unknown_sort() {
        let app = test_state();
        let query = ViewQuery { sort: Some("colour".into()), ..Default::default() };
        let err = get_view(State(app), Query(query)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_filter_result_is_not_an_error() {
        let app = test_state();
        replace_nodes(State(app.clone()), bare(fleet(5))).await;
        let query = ViewQuery { search: Some("no-such-node".into()), ..Default::default() };
        let Json(view) = get_view(State(app), Query(query)).await.unwrap();
        assert!(view.is_empty);
        assert_eq!(view.total_pages, 0);
    }

    #[tokio::test]
    async fn test_node_lookup() {
        let app = test_state();
        replace_nodes(
            State(app.clone()),
            bare(vec![NodeFixture::new("abc").health(42.0).build()]),
        )
        .await;

        let Json(node) = get_node(State(app.clone()), Path("abc".into())).await.unwrap();
        assert_eq!(node.record.health_score.get(), Some(42.0));
        assert_eq!(node.display.health, "42.0");

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["healthScore"], 42.0);
        assert_eq!(json["display"]["storage"], "500 B / 1000 B");
        let err = get_node(State(app), Path("zzz".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_counts_unique_nodes() {
        let app = test_state();
        let mut items = fleet(8);
        items.push(items[0].clone());
        replace_nodes(State(app.clone()), bare(items)).await;
        let Json(summary) = get_summary(State(app)).await;
        assert_eq!(summary.total, 8);
    }

    #[tokio::test]
    async fn test_markers_reconcile_between_calls() {
        let app = test_state();
        replace_map_nodes(
            State(app.clone()),
            bare(vec![
                MapNodeFixture::new("paris-1", 48.8566, 2.3522).build(),
                MapNodeFixture::new("paris-2", 48.8606, 2.3376).build(),
                MapNodeFixture::new("tokyo", 35.6762, 139.6503).build(),
            ]),
        )
        .await;

        let Json(first) = get_markers(State(app.clone()), Query(ClusterQuery::default())).await.unwrap();
        assert_eq!(first.diff.added.len(), 2);
        let paris = first.markers.iter().find(|m| m.count == 2).unwrap();
        assert!(paris.style.is_none());
        assert!(paris.expansion_zoom.is_some());
        let tokyo = first.markers.iter().find(|m| m.count == 1).unwrap();
        assert!(tokyo.style.is_some());

        let Json(again) = get_markers(State(app.clone()), Query(ClusterQuery::default())).await.unwrap();
        assert!(again.diff.is_noop());

        let zoomed = ClusterQuery { zoom: Some(16), radius: None };
        let Json(close) = get_markers(State(app), Query(zoomed)).await.unwrap();
        assert_eq!(close.markers.len(), 3);
        assert_eq!(close.diff.removed, vec!["cluster:paris-1"]);
    }

    #[tokio::test]
    async fn test_zoom_above_max_is_rejected() {
        let app = test_state();
        let query = ClusterQuery { zoom: Some(30), radius: None };
        let err = get_clusters(State(app), Query(query)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_contract_lookup() {
        let mut app = test_state();
        app.contracts.insert(Contract {
            topic: "fleetview/nodes/snapshot@v1".into(),
            schema: serde_json::json!({ "type": "object" }),
        });
        let Json(contract) = get_contract(State(app.clone()), Path("nodes/snapshot@v1".into())).await.unwrap();
        assert_eq!(contract.topic, "fleetview/nodes/snapshot@v1");
        let err = get_contract(State(app), Path("nope".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_overlay_uses_configured_regions() {
        let app = test_state();
        let req = OverlayRequest {
            point: ScreenPoint { x: 1100.0, y: 100.0 },
            viewport: Viewport { width: 1280.0, height: 800.0 },
            regions: None,
        };
        let Json(placement) = place_popup(State(app), Json(req)).await;
        assert_eq!(placement.side, PopupSide::Left);
    }
}

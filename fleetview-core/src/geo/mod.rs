//! Moteur carte : clustering, style des marqueurs, réconciliation de la couche

pub mod cluster;
pub mod layer;
pub mod marker;

pub use cluster::{
    compute_clusters, expansion_zoom, project, spiderfy, Cluster, ClusterOptions, GeoBounds,
    PixelPoint, SpiderLeg,
};
pub use layer::{LayerDiff, MarkerLayer};
pub use marker::{
    is_recent, is_recent_within, marker_radius, marker_style, HealthBand, MarkerStyle, RECENT_WINDOW,
};

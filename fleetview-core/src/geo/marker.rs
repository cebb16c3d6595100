//! Apparence des marqueurs. Fonction pure des champs du nœud : le clustering
//! ne change jamais son rendu.

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::model::{MapNode, NodeStatus};

pub const COLOR_INACTIVE: &str = "#6b7280";
pub const COLOR_EXCELLENT: &str = "#10b981";
pub const COLOR_GOOD: &str = "#f59e0b";
pub const COLOR_POOR: &str = "#ef4444";

pub const EXCELLENT_THRESHOLD: f64 = 85.0;
pub const GOOD_THRESHOLD: f64 = 60.0;

pub const MIN_RADIUS_PX: f64 = 6.0;
pub const MAX_RADIUS_PX: f64 = 16.0;

/// Durée pendant laquelle un nœud online pulse après sa dernière remontée
pub const RECENT_WINDOW: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Inactive,
    Excellent,
    Good,
    Poor,
}

impl HealthBand {
    /// Offline et inconnu : gris quel que soit le score.
    /// Online sans score remonté : bande "poor".
    pub fn of(node: &MapNode) -> Self {
        if node.status != NodeStatus::Online {
            return Self::Inactive;
        }
        match node.health_score.get() {
            Some(score) if score >= EXCELLENT_THRESHOLD => Self::Excellent,
            Some(score) if score >= GOOD_THRESHOLD => Self::Good,
            _ => Self::Poor,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Inactive => COLOR_INACTIVE,
            Self::Excellent => COLOR_EXCELLENT,
            Self::Good => COLOR_GOOD,
            Self::Poor => COLOR_POOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub band: HealthBand,
    pub color: &'static str,
    pub radius_px: f64,
    pub recent: bool,
}

pub fn marker_style(node: &MapNode, now: OffsetDateTime, recent_window: Duration) -> MarkerStyle {
    let band = HealthBand::of(node);
    MarkerStyle {
        band,
        color: band.color(),
        radius_px: marker_radius(node.storage_utilization),
        recent: is_recent_within(node, now, recent_window),
    }
}

/// Linéaire en utilisation, borné à `[MIN_RADIUS_PX, MAX_RADIUS_PX]`
pub fn marker_radius(storage_utilization: f64) -> f64 {
    let fraction = if storage_utilization.is_finite() {
        (storage_utilization / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    MIN_RADIUS_PX + fraction * (MAX_RADIUS_PX - MIN_RADIUS_PX)
}

/// Online et vu dans les [`RECENT_WINDOW`] avant `now`. Un `lastSeen` dans le
/// futur (horloges décalées) compte comme récent.
pub fn is_recent(node: &MapNode, now: OffsetDateTime) -> bool {
    is_recent_within(node, now, RECENT_WINDOW)
}

pub fn is_recent_within(node: &MapNode, now: OffsetDateTime, window: Duration) -> bool {
    node.status == NodeStatus::Online && node.last_seen.is_some_and(|seen| now - seen <= window)
}

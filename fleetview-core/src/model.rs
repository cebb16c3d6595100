/*!
Types canoniques partagés par le pipeline de vue et le moteur carte

Tout est produit par [`crate::normalize`] : une fois en [`NodeRecord`] ou
[`MapNode`], un record est utilisable sans revérifier ses champs.
*/

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Joignabilité d'un nœud telle que remontée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    /// Toute autre valeur que online/offline
    Unknown,
}

impl NodeStatus {
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    /// Rang de tri : online, puis offline, puis le reste
    pub fn rank(&self) -> u8 {
        match self {
            Self::Online => 0,
            Self::Offline => 1,
            Self::Unknown => 2,
        }
    }
}

/// Catégorie de santé calculée en amont à partir du score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Excellent,
    Good,
    Poor,
}

impl Tier {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Poor => "Poor",
        }
    }

    /// Rang de tri ; un tier absent passe après toutes les catégories
    pub fn rank(tier: Option<Tier>) -> u8 {
        match tier {
            Some(Self::Excellent) => 0,
            Some(Self::Good) => 1,
            Some(Self::Poor) => 2,
            None => 3,
        }
    }
}

/// Score de santé qui retient si l'amont en a réellement remonté un.
///
/// Les comparaisons utilisent [`HealthScore::sort_value`] (repli à `0.0`) ;
/// l'affichage passe par [`HealthScore::get`] pour rendre "absent" en `N/A`
/// et non en zéro.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub struct HealthScore {
    value: f64,
    reported: bool,
}

impl HealthScore {
    pub fn reported(value: f64) -> Self {
        Self { value, reported: true }
    }

    pub fn absent() -> Self {
        Self { value: 0.0, reported: false }
    }

    pub fn get(&self) -> Option<f64> {
        self.reported.then_some(self.value)
    }

    pub fn is_reported(&self) -> bool {
        self.reported
    }

    pub fn sort_value(&self) -> f64 {
        self.value
    }
}

impl From<Option<f64>> for HealthScore {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::reported(v),
            _ => Self::absent(),
        }
    }
}

impl From<HealthScore> for Option<f64> {
    fn from(score: HealthScore) -> Self {
        score.get()
    }
}

/// Un nœud de stockage surveillé
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Clé d'identité, jamais vide après normalisation
    pub id: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub health_score: HealthScore,
    pub tier: Option<Tier>,
    pub storage_used: u64,
    pub storage_total: u64,
    /// Pourcentage d'utilisation tel que remonté, s'il a été envoyé
    pub storage_utilization: Option<f64>,
    pub ram_used: Option<u64>,
    pub ram_total: Option<u64>,
    pub version: String,
    pub region: String,
    pub ip: String,
    /// `None` si absent ou illisible
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
}

impl NodeRecord {
    /// `storage_used / storage_total`, indéfini pour un total nul
    pub fn storage_ratio(&self) -> Option<f64> {
        ratio(self.storage_used, self.storage_total)
    }

    /// Utilisation explicite si remontée, sinon le ratio calculé en pourcentage
    pub fn storage_utilization_percent(&self) -> Option<f64> {
        self.storage_utilization
            .or_else(|| self.storage_ratio().map(|r| r * 100.0))
    }

    pub fn has_ram_data(&self) -> bool {
        self.ram_used.is_some() || self.ram_total.is_some()
    }

    pub fn ram_utilization_percent(&self) -> Option<f64> {
        match (self.ram_used, self.ram_total) {
            (Some(used), Some(total)) => ratio(used, total).map(|r| r * 100.0),
            _ => None,
        }
    }
}

fn ratio(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 / total as f64)
}

/// Nœud placé géographiquement pour la carte du monde
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNode {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub status: NodeStatus,
    #[serde(default)]
    pub health_score: HealthScore,
    /// Attendu dans 0-100, non vérifié
    pub storage_utilization: f64,
    pub version: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
    pub region: String,
    pub country: String,
    pub city: Option<String>,
}

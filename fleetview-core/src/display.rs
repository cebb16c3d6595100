/*!
Rendu texte des records

Le tri ne passe jamais par ces fonctions : elles ne servent qu'à l'affichage
(fiche nœud, tableau). Un score absent s'affiche `N/A`, jamais `0`.
*/

use serde::Serialize;
use time::OffsetDateTime;

use crate::model::{HealthScore, NodeRecord};

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// `"N/A"` si aucun score n'a été remonté, une décimale sinon
pub fn format_health(score: &HealthScore) -> String {
    match score.get() {
        Some(value) => format!("{value:.1}"),
        None => "N/A".to_string(),
    }
}

/// Pourcentage borné à [0, 100] pour les jauges. Non fini → 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.1}%"),
        _ => "N/A".to_string(),
    }
}

/// Unités binaires : `1536` → `"1.5 KB"`
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", BYTE_UNITS[unit])
}

/// Âge relatif de `last_seen` à `now` ; date absente ou illisible → `"Unknown"`
pub fn format_last_seen(last_seen: Option<OffsetDateTime>, now: OffsetDateTime) -> String {
    let Some(seen) = last_seen else {
        return "Unknown".to_string();
    };
    let secs = (now - seen).whole_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

/// Champs prêts à afficher pour la fiche d'un nœud
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDisplay {
    pub health: String,
    /// `"used / total"`
    pub storage: String,
    pub storage_percent: String,
    /// Remplissage de la jauge, dans [0, 100]
    pub storage_gauge: f64,
    /// `None` quand le nœud ne remonte aucune donnée RAM
    pub ram: Option<String>,
    pub ram_percent: Option<String>,
    pub last_seen: String,
}

pub fn node_display(record: &NodeRecord, now: OffsetDateTime) -> NodeDisplay {
    let storage_percent = record.storage_utilization_percent();
    let ram_side = |bytes: Option<u64>| bytes.map_or_else(|| "N/A".to_string(), format_bytes);

    NodeDisplay {
        health: format_health(&record.health_score),
        storage: format!(
            "{} / {}",
            format_bytes(record.storage_used),
            format_bytes(record.storage_total)
        ),
        storage_percent: format_percent(storage_percent),
        storage_gauge: storage_percent.map_or(0.0, clamp_percent),
        ram: record
            .has_ram_data()
            .then(|| format!("{} / {}", ram_side(record.ram_used), ram_side(record.ram_total))),
        ram_percent: record
            .has_ram_data()
            .then(|| format_percent(record.ram_utilization_percent())),
        last_seen: format_last_seen(record.last_seen, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    #[test]
    fn test_health_absent_vs_zero() {
        assert_eq!(format_health(&HealthScore::absent()), "N/A");
        assert_eq!(format_health(&HealthScore::reported(0.0)), "0.0");
        assert_eq!(format_health(&HealthScore::reported(87.26)), "87.3");
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(140.0), 100.0);
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
        assert_eq!(format_bytes(u64::MAX), "16384.0 PB");
    }

    #[test]
    fn test_format_last_seen() {
        let now = datetime!(2024-06-01 12:00:00 UTC);
        assert_eq!(format_last_seen(None, now), "Unknown");
        assert_eq!(format_last_seen(Some(now - Duration::seconds(20)), now), "just now");
        assert_eq!(format_last_seen(Some(now - Duration::minutes(7)), now), "7m ago");
        assert_eq!(format_last_seen(Some(now - Duration::hours(5)), now), "5h ago");
        assert_eq!(format_last_seen(Some(now - Duration::days(3)), now), "3d ago");
        assert_eq!(format_last_seen(Some(now + Duration::minutes(2)), now), "just now");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(format_percent(Some(12.34)), "12.3%");
    }

    #[test]
    fn test_node_display_fields() {
        use crate::normalize::normalize_record;
        use fleetview_devkit::{reference_now, NodeFixture};

        let full = normalize_record(&NodeFixture::new("a").storage(1536, 3072).build(), 0);
        let shown = node_display(&full, reference_now());
        assert_eq!(shown.health, "80.0");
        assert_eq!(shown.storage, "1.5 KB / 3.0 KB");
        assert_eq!(shown.storage_percent, "50.0%");
        assert_eq!(shown.storage_gauge, 50.0);
        assert_eq!(shown.ram.as_deref(), Some("2.0 KB / 8.0 KB"));
        assert_eq!(shown.ram_percent.as_deref(), Some("25.0%"));
        assert_eq!(shown.last_seen, "1m ago");

        let sparse = normalize_record(
            &NodeFixture::new("b")
                .without("healthScore")
                .without("ramUsed")
                .without("ramTotal")
                .without("lastSeen")
                .storage(0, 0)
                .storage_utilization(130.0)
                .build(),
            1,
        );
        let shown = node_display(&sparse, reference_now());
        assert_eq!(shown.health, "N/A");
        assert_eq!(shown.storage_percent, "130.0%");
        assert_eq!(shown.storage_gauge, 100.0);
        assert_eq!(shown.ram, None);
        assert_eq!(shown.last_seen, "Unknown");
    }
}

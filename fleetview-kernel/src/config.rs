/**
 * CONFIGURATION KERNEL - Chargement de kernel.yaml
 *
 * RÔLE : Paramètres du serveur (bind HTTP, broker MQTT) et réglages par
 * défaut de la vue (taille de page, rayon de clustering, géométrie des panneaux).
 *
 * FONCTIONNEMENT : chemin via FLEETVIEW_KERNEL_CONFIG (défaut "kernel.yaml").
 * Fichier absent, vide ou invalide → configuration par défaut + warning.
 * Chaque section est optionnelle dans le YAML.
 */

use fleetview_core::overlay::FixedRegions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::Duration;
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "FLEETVIEW_KERNEL_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub http: HttpConf,
    pub mqtt: Option<MqttConf>,
    pub view: ViewConf,
    pub map: MapConf,
    pub overlay: FixedRegions,
    /// Cadence attendue des snapshots. Sert uniquement à signaler des données périmées.
    pub refresh_interval_secs: u64,
    /// Snapshot JSON chargé au démarrage (`{ "nodes": [...], "mapNodes": [...] }`)
    pub snapshot_file: Option<String>,
    pub contracts_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConf {
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConf {
    pub cluster_radius_px: f64,
    pub max_zoom: u8,
    pub default_zoom: u8,
    pub recent_window_secs: i64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            http: HttpConf::default(),
            mqtt: Some(MqttConf::default()),
            view: ViewConf::default(),
            map: MapConf::default(),
            overlay: FixedRegions::default(),
            refresh_interval_secs: 30,
            snapshot_file: None,
            contracts_dir: "contracts/mqtt".into(),
        }
    }
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

impl Default for MqttConf {
    fn default() -> Self {
        Self { host: "localhost".into(), port: 1883 }
    }
}

impl Default for ViewConf {
    fn default() -> Self {
        Self { page_size: fleetview_core::DEFAULT_PAGE_SIZE }
    }
}

impl Default for MapConf {
    fn default() -> Self {
        Self {
            cluster_radius_px: 80.0,
            max_zoom: 18,
            default_zoom: 2,
            recent_window_secs: 300,
        }
    }
}

impl KernelConfig {
    pub fn mqtt_or_default(&self) -> MqttConf {
        self.mqtt.clone().unwrap_or_default()
    }

    pub fn recent_window(&self) -> Duration {
        Duration::seconds(self.map.recent_window_secs.max(0))
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "kernel.yaml".into());
    load_config_from(path).await
}

pub async fn load_config_from<P: AsRef<Path>>(path: P) -> KernelConfig {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "no kernel config found, using defaults");
        return KernelConfig::default();
    }

    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable kernel config, using defaults");
            return KernelConfig::default();
        }
    };
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }

    match serde_yaml::from_str(&txt) {
        Ok(cfg) => {
            info!(path = %path.display(), "kernel config loaded");
            cfg
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid kernel config, using defaults");
            KernelConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let cfg = load_config_from("/nonexistent/kernel.yaml").await;
        assert_eq!(cfg.view.page_size, 20);
        assert_eq!(cfg.map.cluster_radius_px, 80.0);
        assert_eq!(cfg.map.max_zoom, 18);
        assert_eq!(cfg.refresh_interval_secs, 30);
        assert_eq!(cfg.http.bind, "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_partial_yaml_keeps_other_defaults() {
        let file = write_config(
            "view:\n  page_size: 50\nmap:\n  cluster_radius_px: 60\nmqtt:\n  host: broker.lan\n  port: 1884\n",
        );
        let cfg = load_config_from(file.path()).await;
        assert_eq!(cfg.view.page_size, 50);
        assert_eq!(cfg.map.cluster_radius_px, 60.0);
        assert_eq!(cfg.map.max_zoom, 18);
        assert_eq!(cfg.mqtt_or_default().host, "broker.lan");
        assert_eq!(cfg.mqtt_or_default().port, 1884);
        assert_eq!(cfg.recent_window(), Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_overlay_geometry_override() {
        let file = write_config("overlay:\n  filterPanel:\n    width: 400\n  gap: 8\n");
        let cfg = load_config_from(file.path()).await;
        assert_eq!(cfg.overlay.filter_panel.width, 400.0);
        assert_eq!(cfg.overlay.filter_panel.height, 420.0);
        assert_eq!(cfg.overlay.gap, 8.0);
        assert_eq!(cfg.overlay.popup_width, 280.0);
    }

    #[tokio::test]
    async fn test_invalid_yaml_falls_back() {
        let file = write_config("view: [not, a, map\n");
        let cfg = load_config_from(file.path()).await;
        assert_eq!(cfg.view.page_size, 20);
    }
}

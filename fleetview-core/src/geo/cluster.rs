/*!
Clustering glouton des nœuds carte, en espace écran

FONCTIONNEMENT :
- Projection Web Mercator en pixels au zoom demandé
- Chaque point libre, dans l'ordre d'entrée, amorce un cluster qui absorbe
  tous les points libres à moins de `radius_px`
- Un rayon fixe en pixels couvre moins de terrain quand le zoom augmente :
  les clusters se scindent en zoomant
*/

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::dedupe::dedupe_by_key;
use crate::model::{MapNode, NodeStatus};

pub const TILE_SIZE: f64 = 256.0;
/// Web Mercator n'est pas défini aux pôles
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

const CIRCLE_FOOT_SEPARATION: f64 = 25.0;
const CIRCLE_START_ANGLE: f64 = PI / 6.0;
const SPIRAL_THRESHOLD: usize = 9;
const SPIRAL_FOOT_SEPARATION: f64 = 28.0;
const SPIRAL_LENGTH_START: f64 = 11.0;
const SPIRAL_LENGTH_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterOptions {
    pub radius_px: f64,
    pub zoom: u8,
    pub max_zoom: u8,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self { radius_px: 80.0, zoom: 2, max_zoom: 18 }
    }
}

/// Coordonnées pixels monde à un zoom donné
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn distance(&self, other: &PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Projette une coordonnée en pixels monde au zoom `zoom`
pub fn project(lat: f64, lng: f64, zoom: u8) -> PixelPoint {
    let scale = TILE_SIZE * 2f64.powi(i32::from(zoom));
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    PixelPoint {
        x: (lng + 180.0) / 360.0 * scale,
        y: (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// Un marqueur carte : un nœud seul ou un agrégat de nœuds proches
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Id du nœud pour un singleton, `cluster:<id amorce>` sinon
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub member_ids: Vec<String>,
    pub online: usize,
    pub offline: usize,
    pub bounds: GeoBounds,
}

impl Cluster {
    pub fn count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.member_ids.len() == 1
    }

    fn from_members(members: &[&MapNode]) -> Self {
        let count = members.len() as f64;
        let seed = members[0];
        let mut bounds = GeoBounds { south: seed.lat, west: seed.lng, north: seed.lat, east: seed.lng };
        let (mut lat_sum, mut lng_sum) = (0.0, 0.0);
        let (mut online, mut offline) = (0, 0);

        for node in members {
            lat_sum += node.lat;
            lng_sum += node.lng;
            bounds.south = bounds.south.min(node.lat);
            bounds.north = bounds.north.max(node.lat);
            bounds.west = bounds.west.min(node.lng);
            bounds.east = bounds.east.max(node.lng);
            match node.status {
                NodeStatus::Online => online += 1,
                NodeStatus::Offline => offline += 1,
                NodeStatus::Unknown => {}
            }
        }

        let id = if members.len() == 1 {
            seed.id.clone()
        } else {
            format!("cluster:{}", seed.id)
        };

        Self {
            id,
            lat: lat_sum / count,
            lng: lng_sum / count,
            member_ids: members.iter().map(|n| n.id.clone()).collect(),
            online,
            offline,
            bounds,
        }
    }
}

/// Regroupe `nodes` en clusters au zoom `options.zoom`. Un id en double garde
/// sa première occurrence : un nœud n'apparaît jamais dans deux marqueurs.
pub fn compute_clusters(nodes: &[MapNode], options: &ClusterOptions) -> Vec<Cluster> {
    let unique = dedupe_by_key(nodes.iter().collect::<Vec<_>>(), |node| node.id.clone());
    let radius = if options.radius_px.is_finite() { options.radius_px.max(0.0) } else { 0.0 };
    let points: Vec<PixelPoint> = unique
        .iter()
        .map(|node| project(node.lat, node.lng, options.zoom))
        .collect();

    let mut assigned = vec![false; unique.len()];
    let mut clusters = Vec::new();

    for seed in 0..unique.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![unique[seed]];

        for candidate in (seed + 1)..unique.len() {
            if !assigned[candidate] && points[seed].distance(&points[candidate]) <= radius {
                assigned[candidate] = true;
                members.push(unique[candidate]);
            }
        }
        clusters.push(Cluster::from_members(&members));
    }

    clusters
}

/// Premier zoom au-delà de `options.zoom` où les membres de `cluster` ne
/// forment plus un seul cluster. `None` : ils restent groupés jusqu'à
/// `max_zoom`, il faut les déployer (spiderfy).
pub fn expansion_zoom(cluster: &Cluster, nodes: &[MapNode], options: &ClusterOptions) -> Option<u8> {
    if cluster.is_singleton() {
        return None;
    }
    let members: Vec<MapNode> = nodes
        .iter()
        .filter(|node| cluster.member_ids.contains(&node.id))
        .cloned()
        .collect();

    (options.zoom.saturating_add(1)..=options.max_zoom).find(|zoom| {
        let at_zoom = ClusterOptions { zoom: *zoom, ..*options };
        compute_clusters(&members, &at_zoom).len() > 1
    })
}

/// Position écran d'un membre une fois le cluster déployé
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiderLeg {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Dispose les membres de `cluster` autour de `center` (pixels écran) : en
/// cercle pour les petits groupes, en spirale au-delà de [`SPIRAL_THRESHOLD`].
pub fn spiderfy(cluster: &Cluster, center: PixelPoint) -> Vec<SpiderLeg> {
    let count = cluster.count();
    let positions = if count >= SPIRAL_THRESHOLD {
        spiral_positions(count, center)
    } else {
        circle_positions(count, center)
    };

    cluster
        .member_ids
        .iter()
        .zip(positions)
        .map(|(id, p)| SpiderLeg { id: id.clone(), x: p.x, y: p.y })
        .collect()
}

fn circle_positions(count: usize, center: PixelPoint) -> Vec<PixelPoint> {
    let circumference = CIRCLE_FOOT_SEPARATION * (2.0 + count as f64);
    let leg_length = circumference / (2.0 * PI);
    let angle_step = 2.0 * PI / count.max(1) as f64;

    (0..count)
        .map(|i| {
            let angle = CIRCLE_START_ANGLE + i as f64 * angle_step;
            PixelPoint {
                x: center.x + leg_length * angle.cos(),
                y: center.y + leg_length * angle.sin(),
            }
        })
        .collect()
}

fn spiral_positions(count: usize, center: PixelPoint) -> Vec<PixelPoint> {
    let mut leg_length = SPIRAL_LENGTH_START;
    let mut angle = 0.0;

    (0..count)
        .map(|i| {
            angle += SPIRAL_FOOT_SEPARATION / leg_length + i as f64 * 0.0005;
            let point = PixelPoint {
                x: center.x + leg_length * angle.cos(),
                y: center.y + leg_length * angle.sin(),
            };
            leg_length += 2.0 * PI * SPIRAL_LENGTH_FACTOR / angle;
            point
        })
        .collect()
}

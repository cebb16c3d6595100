/*!
Suivi de la couche de marqueurs

La couche retient ce que le rendu affiche, indexé par id de cluster. La
réconciliation avec un nouveau jeu de clusters donne les ajouts, retraits et
mises à jour exacts, et laisse la couche égale au nouveau jeu : aucun
marqueur perdu ni dupliqué.
*/

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::cluster::Cluster;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Même id, position ou membres modifiés
    pub updated: Vec<String>,
    pub unchanged: usize,
}

impl LayerDiff {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkerLayer {
    markers: BTreeMap<String, Cluster>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Cluster> {
        self.markers.get(id)
    }

    pub fn markers(&self) -> impl Iterator<Item = &Cluster> {
        self.markers.values()
    }

    /// Remplace le contenu par `clusters` et rapporte les changements.
    /// Un id de cluster en double garde sa première occurrence.
    pub fn reconcile(&mut self, clusters: &[Cluster]) -> LayerDiff {
        let mut next: BTreeMap<String, Cluster> = BTreeMap::new();
        for cluster in clusters {
            next.entry(cluster.id.clone()).or_insert_with(|| cluster.clone());
        }

        let mut diff = LayerDiff::default();
        for (id, cluster) in &next {
            match self.markers.get(id) {
                None => diff.added.push(id.clone()),
                Some(previous) if previous != cluster => diff.updated.push(id.clone()),
                Some(_) => diff.unchanged += 1,
            }
        }
        diff.removed = self
            .markers
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();

        self.markers = next;
        debug!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            updated = diff.updated.len(),
            "marker layer reconciled"
        );
        diff
    }

    /// Retire tous les marqueurs et renvoie leurs ids
    pub fn clear(&mut self) -> Vec<String> {
        std::mem::take(&mut self.markers).into_keys().collect()
    }
}

//! Dédoublonnage par clé d'identité. Garde la première occurrence dans l'ordre
//! reçu ; la vue l'applique après le tri, donc "première" = la mieux classée.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::debug;

use crate::model::NodeRecord;

/// Garde le premier élément de chaque clé, dans l'ordre d'entrée
pub fn dedupe_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

pub fn dedupe_records<'a>(records: Vec<&'a NodeRecord>) -> Vec<&'a NodeRecord> {
    let before = records.len();
    let mut seen: HashSet<&'a str> = HashSet::with_capacity(before);
    let kept: Vec<&'a NodeRecord> = records
        .into_iter()
        .filter(|record| {
            let record: &'a NodeRecord = *record;
            seen.insert(record.id.as_str())
        })
        .collect();
    if kept.len() < before {
        debug!(collapsed = before - kept.len(), "collapsed duplicate node records");
    }
    kept
}

/*!
Moteur de tri

Ordonne les records selon une clé dérivée. Le tri est stable dans les deux
sens : l'ordre décroissant inverse la comparaison, pas le résultat, donc les
records à clé égale gardent leur ordre d'entrée.

Certaines clés ne forment pas un ordre total (un `lastSeen` illisible est égal
à toute date), cas sur lequel `slice::sort_by` peut paniquer. D'où un tri
fusion local qui accepte n'importe quel comparateur.
*/

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::FleetError;
use crate::model::{NodeRecord, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Id,
    Status,
    HealthScore,
    Tier,
    /// Trie sur le *taux* d'utilisation du stockage, pas sur les octets utilisés
    StorageUsed,
    StorageUtilization,
    RamUsed,
    RamUtilization,
    Version,
    Region,
    LastSeen,
}

impl SortField {
    pub const ALL: [SortField; 11] = [
        Self::Id,
        Self::Status,
        Self::HealthScore,
        Self::Tier,
        Self::StorageUsed,
        Self::StorageUtilization,
        Self::RamUsed,
        Self::RamUtilization,
        Self::Version,
        Self::Region,
        Self::LastSeen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Status => "status",
            Self::HealthScore => "healthScore",
            Self::Tier => "tier",
            Self::StorageUsed => "storageUsed",
            Self::StorageUtilization => "storageUtilization",
            Self::RamUsed => "ramUsed",
            Self::RamUtilization => "ramUtilization",
            Self::Version => "version",
            Self::Region => "region",
            Self::LastSeen => "lastSeen",
        }
    }
}

impl FromStr for SortField {
    type Err = FleetError;

    /// Accepte le nom camelCase du fil ou sa forme snake_case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.trim().chars().filter(|c| *c != '_').collect();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| FleetError::UnknownSortField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(FleetError::UnknownSortDirection(s.to_string())),
        }
    }
}

/// Tri après clic sur un en-tête : même colonne → sens inversé, nouvelle
/// colonne → décroissant.
pub fn next_sort(
    current: SortField,
    direction: SortDirection,
    clicked: SortField,
) -> (SortField, SortDirection) {
    if current == clicked {
        (current, direction.toggled())
    } else {
        (clicked, SortDirection::Desc)
    }
}

/// Comparaison croissante de deux records sur `field`
pub fn compare_by(field: SortField, a: &NodeRecord, b: &NodeRecord) -> Ordering {
    match field {
        SortField::Id => locale_cmp(&a.id, &b.id),
        SortField::Status => a.status.rank().cmp(&b.status.rank()),
        SortField::HealthScore => numeric_cmp(a.health_score.sort_value(), b.health_score.sort_value()),
        SortField::Tier => Tier::rank(a.tier).cmp(&Tier::rank(b.tier)),
        SortField::StorageUsed => numeric_cmp(
            a.storage_ratio().unwrap_or(0.0),
            b.storage_ratio().unwrap_or(0.0),
        ),
        SortField::StorageUtilization => numeric_cmp(
            a.storage_utilization_percent().unwrap_or(0.0),
            b.storage_utilization_percent().unwrap_or(0.0),
        ),
        SortField::RamUsed => a.ram_used.unwrap_or(0).cmp(&b.ram_used.unwrap_or(0)),
        SortField::RamUtilization => numeric_cmp(
            a.ram_utilization_percent().unwrap_or(0.0),
            b.ram_utilization_percent().unwrap_or(0.0),
        ),
        SortField::Version => locale_cmp(&a.version, &b.version),
        SortField::Region => locale_cmp(&a.region, &b.region),
        SortField::LastSeen => match (a.last_seen, b.last_seen) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        },
    }
}

/// Tri stable de `records` sur `field` dans le sens `direction`
pub fn sort_records<'a>(
    mut records: Vec<&'a NodeRecord>,
    field: SortField,
    direction: SortDirection,
) -> Vec<&'a NodeRecord> {
    stable_sort_by(&mut records, |a, b| {
        let ordering = compare_by(field, a, b);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    records
}

/// Valeurs hors bornes ou non finies : jamais d'abandon, l'incomparable
/// compte comme égal.
fn numeric_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Ordre alphabétique insensible à la casse et aux accents : "e" < "é" < "f".
/// À clé égale, la forme sans accent passe devant, puis la minuscule ("a" < "A").
fn locale_cmp(a: &str, b: &str) -> Ordering {
    folded(a)
        .cmp(folded(b))
        .then_with(|| lowered(a).cmp(lowered(b)))
        .then_with(|| b.cmp(a))
}

/// Décomposition NFD sans les diacritiques, en minuscules
fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn lowered(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// Tri fusion ascendant. Stable, ne panique pas quel que soit le comparateur.
fn stable_sort_by<T, F>(items: &mut Vec<T>, mut compare: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    if len < 2 {
        return;
    }

    let mut scratch = items.clone();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            merge(&items[start..mid], &items[mid..end], &mut scratch[start..end], &mut compare);
            start = end;
        }
        std::mem::swap(items, &mut scratch);
        width *= 2;
    }
}

fn merge<T, F>(left: &[T], right: &[T], out: &mut [T], compare: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        let take_left = j >= right.len()
            || (i < left.len() && compare(&left[i], &right[j]) != Ordering::Greater);
        if take_left {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}

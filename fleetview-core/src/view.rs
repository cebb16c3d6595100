/*!
Calcul de la vue nœuds

RÔLE : Point d'entrée unique appelé par la couche de présentation.

FONCTIONNEMENT : `compute_view` est une fonction pure d'un snapshot de records
et d'un [`ViewState`]. Chaque appel enchaîne filtre → tri → dédoublonnage →
pagination, sans rien garder d'un appel à l'autre.
*/

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dedupe::dedupe_records;
use crate::error::FleetError;
use crate::filter::{filter_records, RecordFilter, StatusFilter, TierFilter};
use crate::model::{NodeRecord, NodeStatus, Tier};
use crate::paginate::paginate;
use crate::sort::{sort_records, SortDirection, SortField};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Colonnes du tableau masquables côté présentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Rank,
    Id,
    Status,
    HealthScore,
    Tier,
    Storage,
    Ram,
    Version,
    Region,
    LastSeen,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Self::Rank,
        Self::Id,
        Self::Status,
        Self::HealthScore,
        Self::Tier,
        Self::Storage,
        Self::Ram,
        Self::Version,
        Self::Region,
        Self::LastSeen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rank => "rank",
            Self::Id => "id",
            Self::Status => "status",
            Self::HealthScore => "healthScore",
            Self::Tier => "tier",
            Self::Storage => "storage",
            Self::Ram => "ram",
            Self::Version => "version",
            Self::Region => "region",
            Self::LastSeen => "lastSeen",
        }
    }
}

impl FromStr for Column {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.trim().chars().filter(|c| *c != '_').collect();
        Self::ALL
            .into_iter()
            .find(|column| column.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| FleetError::UnknownColumn(s.to_string()))
    }
}

/// Colonnes masquées par l'utilisateur ; tout le reste est visible
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnVisibility {
    hidden: BTreeSet<Column>,
}

impl ColumnVisibility {
    pub fn hiding<I: IntoIterator<Item = Column>>(columns: I) -> Self {
        Self { hidden: columns.into_iter().collect() }
    }

    pub fn set_visible(&mut self, column: Column, visible: bool) {
        if visible {
            self.hidden.remove(&column);
        } else {
            self.hidden.insert(column);
        }
    }

    pub fn is_visible(&self, column: Column) -> bool {
        !self.hidden.contains(&column)
    }

    pub fn visible_columns(&self) -> Vec<Column> {
        Column::ALL.into_iter().filter(|c| self.is_visible(*c)).collect()
    }
}

/// Tous les contrôles du tableau nœuds. Appartient à l'appelant, passé à
/// chaque recalcul.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewState {
    pub search_text: String,
    pub status_filter: StatusFilter,
    pub tier_filter: TierFilter,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// Commence à 1
    pub current_page: usize,
    pub page_size: usize,
    pub column_visibility: ColumnVisibility,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            status_filter: StatusFilter::All,
            tier_filter: TierFilter::All,
            sort_field: SortField::HealthScore,
            sort_direction: SortDirection::Desc,
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            column_visibility: ColumnVisibility::default(),
        }
    }
}

impl ViewState {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            search_text: self.search_text.clone(),
            status: self.status_filter,
            tier: self.tier_filter,
        }
    }

    /// Page à afficher après passage des contrôles de `previous` à `self` :
    /// tout changement de filtre ou de tri ramène en page 1.
    pub fn page_after_change(&self, previous: &ViewState) -> usize {
        let controls_changed = self.search_text != previous.search_text
            || self.status_filter != previous.status_filter
            || self.tier_filter != previous.tier_filter
            || self.sort_field != previous.sort_field
            || self.sort_direction != previous.sort_direction
            || self.page_size != previous.page_size;
        if controls_changed {
            1
        } else {
            self.current_page
        }
    }
}

/// Record accompagné de son rang (base 1) dans toute la vue ordonnée
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedNode {
    pub rank: usize,
    #[serde(flatten)]
    pub node: NodeRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub items: Vec<RankedNode>,
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub clamped_page: usize,
    /// Aucun record ne passe les filtres : état valide, pas une erreur
    pub is_empty: bool,
    pub columns: Vec<Column>,
}

/// Records filtrés, triés et dédoublonnés, avant pagination
pub fn ordered_records<'a>(records: &'a [NodeRecord], state: &ViewState) -> Vec<&'a NodeRecord> {
    let filtered = filter_records(records, &state.filter());
    let sorted = sort_records(filtered, state.sort_field, state.sort_direction);
    dedupe_records(sorted)
}

pub fn compute_view(records: &[NodeRecord], state: &ViewState) -> NodeView {
    let ordered = ordered_records(records, state);
    let page = paginate(&ordered, state.page_size, state.current_page);

    let items = page
        .items
        .iter()
        .enumerate()
        .map(|(index, node)| RankedNode {
            rank: page.global_rank(index),
            node: (*node).clone(),
        })
        .collect();

    NodeView {
        items,
        total_count: page.total_count,
        total_pages: page.total_pages,
        page: page.page,
        clamped_page: page.clamped_page,
        is_empty: page.total_count == 0,
        columns: state.column_visibility.visible_columns(),
    }
}

/// Chiffres clés de la flotte, sur les records uniques, sans tenir compte des filtres
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub unknown: usize,
    pub excellent: usize,
    pub good: usize,
    pub poor: usize,
    pub untiered: usize,
    /// Moyenne sur les records qui remontent un score ; `None` si aucun
    pub average_health: Option<f64>,
    pub storage_used: u64,
    pub storage_total: u64,
    pub storage_utilization: Option<f64>,
}

pub fn summarize(records: &[NodeRecord]) -> FleetSummary {
    let unique = dedupe_records(records.iter().collect());
    let mut summary = FleetSummary { total: unique.len(), ..Default::default() };
    let mut health_sum = 0.0;
    let mut health_count = 0usize;

    for record in unique {
        match record.status {
            NodeStatus::Online => summary.online += 1,
            NodeStatus::Offline => summary.offline += 1,
            NodeStatus::Unknown => summary.unknown += 1,
        }
        match record.tier {
            Some(Tier::Excellent) => summary.excellent += 1,
            Some(Tier::Good) => summary.good += 1,
            Some(Tier::Poor) => summary.poor += 1,
            None => summary.untiered += 1,
        }
        if let Some(score) = record.health_score.get() {
            health_sum += score;
            health_count += 1;
        }
        summary.storage_used = summary.storage_used.saturating_add(record.storage_used);
        summary.storage_total = summary.storage_total.saturating_add(record.storage_total);
    }

    summary.average_health = (health_count > 0).then(|| health_sum / health_count as f64);
    summary.storage_utilization = (summary.storage_total > 0)
        .then(|| summary.storage_used as f64 / summary.storage_total as f64 * 100.0);
    summary
}

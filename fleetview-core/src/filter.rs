/*!
Filtres de la vue nœuds : recherche texte, statut, tier

Les prédicats sont indépendants et combinés en intersection : leur ordre
d'application ne change rien. Un prédicat à "all" (ou une recherche vide)
laisse tout passer.
*/

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FleetError;
use crate::model::{NodeRecord, NodeStatus, Tier};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Online,
    Offline,
}

impl StatusFilter {
    pub fn matches(&self, status: NodeStatus) -> bool {
        match self {
            Self::All => true,
            Self::Online => status == NodeStatus::Online,
            Self::Offline => status == NodeStatus::Offline,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(FleetError::UnknownStatusFilter(s.to_string())),
        }
    }
}

/// Sur le fil : `"all"`, `"excellent"`, `"good"`, `"poor"`, comme le paramètre `tier`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TierFilter {
    #[default]
    All,
    Only(Tier),
}

impl TierFilter {
    /// Un record sans tier ne correspond jamais à un tier précis
    pub fn matches(&self, tier: Option<Tier>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => tier == Some(*wanted),
        }
    }
}

impl TierFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(Tier::Excellent) => "excellent",
            Self::Only(Tier::Good) => "good",
            Self::Only(Tier::Poor) => "poor",
        }
    }
}

impl TryFrom<String> for TierFilter {
    type Error = FleetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TierFilter> for String {
    fn from(filter: TierFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl FromStr for TierFilter {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Tier::from_wire(trimmed)
            .map(Self::Only)
            .ok_or_else(|| FleetError::UnknownTierFilter(s.to_string()))
    }
}

/// Partie filtrage des contrôles de la vue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub search_text: String,
    pub status: StatusFilter,
    pub tier: TierFilter,
}

impl RecordFilter {
    pub fn matches(&self, record: &NodeRecord) -> bool {
        let query = normalized_query(&self.search_text);
        self.matches_with_query(record, query.as_deref())
    }

    fn matches_with_query(&self, record: &NodeRecord, query: Option<&str>) -> bool {
        self.status.matches(record.status)
            && self.tier.matches(record.tier)
            && query.map_or(true, |q| matches_search(record, q))
    }
}

/// Applique tous les prédicats de `filter` en conservant l'ordre d'entrée
pub fn filter_records<'a, I>(records: I, filter: &RecordFilter) -> Vec<&'a NodeRecord>
where
    I: IntoIterator<Item = &'a NodeRecord>,
{
    let query = normalized_query(&filter.search_text);
    records
        .into_iter()
        .filter(|record| filter.matches_with_query(record, query.as_deref()))
        .collect()
}

/// Requête nettoyée en minuscules, `None` si elle correspond à tout
fn normalized_query(search_text: &str) -> Option<String> {
    let query = search_text.trim().to_lowercase();
    (!query.is_empty()).then_some(query)
}

fn matches_search(record: &NodeRecord, query: &str) -> bool {
    [&record.id, &record.region, &record.version, &record.ip]
        .iter()
        .any(|field| field.to_lowercase().contains(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_records;
    use fleetview_devkit::{fleet, NodeFixture};

    fn sample() -> Vec<NodeRecord> {
        normalize_records(&[
            NodeFixture::new("Alpha-1").region("eu-west").version("0.7.0").ip("10.0.0.1").build(),
            NodeFixture::new("beta-2").status("offline").tier("Poor").region("us-east").ip("192.168.1.9").build(),
            NodeFixture::new("gamma-3").without("tier").region("ap-south").version("0.8.1").build(),
        ])
    }

    fn ids(records: &[&NodeRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let records = sample();
        assert_eq!(filter_records(&records, &RecordFilter::default()).len(), 3);
    }

    #[test]
    fn test_whitespace_search_returns_full_collection() {
        let records = normalize_records(&fleet(12));
        let filter = RecordFilter { search_text: "  ".into(), ..Default::default() };
        assert_eq!(filter_records(&records, &filter).len(), 12);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let records = sample();
        let search = |text: &str| {
            let filter = RecordFilter { search_text: text.into(), ..Default::default() };
            ids(&filter_records(&records, &filter))
        };

        assert_eq!(search("ALPHA"), vec!["Alpha-1"]);
        assert_eq!(search(" US-EAST "), vec!["beta-2"]);
        assert_eq!(search("0.8"), vec!["gamma-3"]);
        assert_eq!(search("192.168"), vec!["beta-2"]);
        assert!(search("nothing-matches").is_empty());
    }

    #[test]
    fn test_status_filter() {
        let records = sample();
        let filter = RecordFilter { status: StatusFilter::Offline, ..Default::default() };
        assert_eq!(ids(&filter_records(&records, &filter)), vec!["beta-2"]);
    }

    #[test]
    fn test_tier_filter_never_matches_absent_tier() {
        let records = sample();
        let filter = RecordFilter { tier: TierFilter::Only(Tier::Good), ..Default::default() };
        assert_eq!(ids(&filter_records(&records, &filter)), vec!["Alpha-1"]);
    }

    #[test]
    fn test_predicates_intersect() {
        let records = sample();
        let filter = RecordFilter {
            search_text: "a".into(),
            status: StatusFilter::Online,
            tier: TierFilter::All,
        };
        assert_eq!(ids(&filter_records(&records, &filter)), vec!["Alpha-1", "gamma-3"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = normalize_records(&fleet(40));
        let filter = RecordFilter {
            search_text: "us-".into(),
            status: StatusFilter::Online,
            tier: TierFilter::Only(Tier::Poor),
        };
        let once = filter_records(&records, &filter);
        let twice = filter_records(once.clone(), &filter);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("online".parse::<StatusFilter>(), Ok(StatusFilter::Online));
        assert!("sleeping".parse::<StatusFilter>().is_err());
        assert_eq!("excellent".parse::<TierFilter>(), Ok(TierFilter::Only(Tier::Excellent)));
        assert_eq!("".parse::<TierFilter>(), Ok(TierFilter::All));
        assert_eq!(
            "gold".parse::<TierFilter>(),
            Err(FleetError::UnknownTierFilter("gold".into()))
        );
    }
}

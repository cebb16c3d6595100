/// Erreurs de lecture des contrôles de vue depuis leurs chaînes.
///
/// Le pipeline lui-même n'échoue jamais ; ces erreurs ne viennent que d'une
/// valeur de contrôle inconnue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FleetError {
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),
    #[error("Unknown sort direction: {0}")]
    UnknownSortDirection(String),
    #[error("Unknown status filter: {0}")]
    UnknownStatusFilter(String),
    #[error("Unknown tier filter: {0}")]
    UnknownTierFilter(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

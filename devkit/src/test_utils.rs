/*!
Utilitaires communs aux tests du workspace
*/

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

/// Active les logs `tracing` dans la sortie capturée des tests.
/// Appel multiple sans effet (le premier subscriber gagne).
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// Instant de référence fixe pour rendre les tests déterministes
pub fn reference_now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_717_243_200).unwrap_or(OffsetDateTime::UNIX_EPOCH) // 2024-06-01T12:00:00Z
}

/// Horodatage RFC3339 situé `minutes` avant [`reference_now`]
pub fn minutes_ago(minutes: i64) -> String {
    (reference_now() - Duration::minutes(minutes))
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_ago_is_rfc3339() {
        assert_eq!(minutes_ago(0), "2024-06-01T12:00:00Z");
        assert_eq!(minutes_ago(10), "2024-06-01T11:50:00Z");
    }

    #[test]
    fn test_init_logging_twice() {
        init_test_logging();
        init_test_logging();
    }
}

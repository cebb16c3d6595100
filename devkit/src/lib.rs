/*!
# FleetView DevKit - Fixtures pour tests du pipeline et de la carte

Bibliothèque partagée par les tests du workspace:
- Builders de records bruts (JSON) pour la vue nœuds, y compris malformés
- Builders de nœuds carte
- Payloads snapshot conformes aux contrats MQTT
- Init du logging pour tests
*/

pub mod fixtures;
pub mod snapshot;
pub mod test_utils;

pub use fixtures::{fleet, MapNodeFixture, NodeFixture};
pub use snapshot::{SnapshotBuilder, MAP_SNAPSHOT_TOPIC, NODES_SNAPSHOT_TOPIC};
pub use test_utils::{init_test_logging, minutes_ago, reference_now};

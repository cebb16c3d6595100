/*!
# FleetView Core - Calcul pur derrière la vue santé de la flotte

COMPOSANTS :
- Vue nœuds : `normalize → filter → sort → dedupe → paginate` en une passe ([`compute_view`])
- Carte : regroupement des nœuds en marqueurs ([`compute_clusters`])
- Popups : placement hors des panneaux fixes ([`place_overlay`])

Chaque point d'entrée prend un snapshot de ses entrées et rend un résultat
neuf. Aucun état entre deux appels, sauf [`geo::MarkerLayer`] que l'appelant
possède explicitement.
*/

pub mod dedupe;
pub mod display;
pub mod error;
pub mod filter;
pub mod geo;
pub mod model;
pub mod normalize;
pub mod overlay;
pub mod paginate;
pub mod sort;
pub mod view;

pub use dedupe::{dedupe_by_key, dedupe_records};
pub use display::{node_display, NodeDisplay};
pub use error::FleetError;
pub use filter::{filter_records, RecordFilter, StatusFilter, TierFilter};
pub use geo::{compute_clusters, Cluster, ClusterOptions, MarkerLayer};
pub use model::{HealthScore, MapNode, NodeRecord, NodeStatus, Tier};
pub use normalize::{normalize_map_node, normalize_map_nodes, normalize_record, normalize_records};
pub use overlay::{place_overlay, FixedRegions, PopupPlacement, PopupSide, ScreenPoint, Viewport};
pub use paginate::{paginate, Page};
pub use sort::{next_sort, sort_records, SortDirection, SortField};
pub use view::{
    compute_view, summarize, Column, ColumnVisibility, FleetSummary, NodeView, RankedNode, ViewState,
    DEFAULT_PAGE_SIZE,
};

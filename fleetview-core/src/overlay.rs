/*!
Placement des popups autour des panneaux fixes de la carte

Deux panneaux recouvrent la carte : les filtres en haut à droite, la légende
en bas à gauche. Chacun réserve une zone d'exclusion (son rectangle agrandi
de `padding`). Point dans la zone filtres → popup à gauche ; dans la zone
légende → popup à droite ; sinon au-dessus.
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Rectangle écran aligné sur les axes, origine en haut à gauche
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Bords inclus
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn inflate(&self, by: f64) -> Rect {
        Rect {
            x: self.x - by,
            y: self.y - by,
            width: self.width + 2.0 * by,
            height: self.height + 2.0 * by,
        }
    }
}

/// Taille et marges d'un panneau accroché à un coin du viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedPanel {
    pub width: f64,
    pub height: f64,
    /// Distance aux bords du viewport
    pub margin: f64,
    /// Marge autour du panneau que les popups doivent aussi éviter
    pub padding: f64,
}

impl Default for FixedPanel {
    fn default() -> Self {
        Self { width: 320.0, height: 420.0, margin: 16.0, padding: 24.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixedRegions {
    pub filter_panel: FixedPanel,
    pub legend: FixedPanel,
    pub popup_width: f64,
    /// Écart entre le point et le bord du popup
    pub gap: f64,
}

impl Default for FixedRegions {
    fn default() -> Self {
        Self {
            filter_panel: FixedPanel::default(),
            legend: FixedPanel { width: 200.0, height: 160.0, margin: 16.0, padding: 24.0 },
            popup_width: 280.0,
            gap: 12.0,
        }
    }
}

impl FixedRegions {
    pub fn filter_panel_rect(&self, viewport: Viewport) -> Rect {
        let panel = &self.filter_panel;
        Rect {
            x: viewport.width - panel.margin - panel.width,
            y: panel.margin,
            width: panel.width,
            height: panel.height,
        }
    }

    pub fn legend_rect(&self, viewport: Viewport) -> Rect {
        let panel = &self.legend;
        Rect {
            x: panel.margin,
            y: viewport.height - panel.margin - panel.height,
            width: panel.width,
            height: panel.height,
        }
    }

    pub fn filter_panel_exclusion(&self, viewport: Viewport) -> Rect {
        self.filter_panel_rect(viewport).inflate(self.filter_panel.padding)
    }

    pub fn legend_exclusion(&self, viewport: Viewport) -> Rect {
        self.legend_rect(viewport).inflate(self.legend.padding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupSide {
    Above,
    Left,
    Right,
}

/// Décalage de l'ancre du popup par rapport au point, en pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupPlacement {
    pub side: PopupSide,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl PopupPlacement {
    fn for_side(side: PopupSide, regions: &FixedRegions) -> Self {
        let sideways = regions.popup_width / 2.0 + regions.gap;
        let (offset_x, offset_y) = match side {
            PopupSide::Above => (0.0, -regions.gap),
            PopupSide::Left => (-sideways, 0.0),
            PopupSide::Right => (sideways, 0.0),
        };
        Self { side, offset_x, offset_y }
    }
}

/// Choisit le côté du popup pour `point`. Sur un petit viewport où les deux
/// zones se chevauchent, le panneau filtres l'emporte.
pub fn place_overlay(point: ScreenPoint, viewport: Viewport, regions: &FixedRegions) -> PopupPlacement {
    let side = if regions.filter_panel_exclusion(viewport).contains(point) {
        PopupSide::Left
    } else if regions.legend_exclusion(viewport).contains(point) {
        PopupSide::Right
    } else {
        PopupSide::Above
    };
    PopupPlacement::for_side(side, regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport { width: 1280.0, height: 800.0 };

    fn place(x: f64, y: f64) -> PopupPlacement {
        place_overlay(ScreenPoint { x, y }, VIEWPORT, &FixedRegions::default())
    }

    #[test]
    fn test_region_geometry() {
        let regions = FixedRegions::default();
        assert_eq!(
            regions.filter_panel_rect(VIEWPORT),
            Rect { x: 944.0, y: 16.0, width: 320.0, height: 420.0 }
        );
        assert_eq!(
            regions.legend_rect(VIEWPORT),
            Rect { x: 16.0, y: 624.0, width: 200.0, height: 160.0 }
        );
    }

    #[test]
    fn test_point_under_filter_panel_opens_left() {
        let placement = place(1100.0, 100.0);
        assert_eq!(placement.side, PopupSide::Left);
        assert_eq!(placement.offset_x, -152.0);
        assert_eq!(placement.offset_y, 0.0);
    }

    #[test]
    fn test_point_under_legend_opens_right() {
        let placement = place(100.0, 700.0);
        assert_eq!(placement.side, PopupSide::Right);
        assert_eq!(placement.offset_x, 152.0);
    }

    #[test]
    fn test_default_is_above() {
        let placement = place(640.0, 400.0);
        assert_eq!(placement.side, PopupSide::Above);
        assert_eq!((placement.offset_x, placement.offset_y), (0.0, -12.0));
    }

    #[test]
    fn test_padding_extends_exclusion() {
        // 10px à gauche du panneau filtres, dans sa marge de 24px
        assert_eq!(place(934.0, 100.0).side, PopupSide::Left);
        assert_eq!(place(900.0, 100.0).side, PopupSide::Above);
        // juste au-dessus de la légende
        assert_eq!(place(100.0, 610.0).side, PopupSide::Right);
    }

    #[test]
    fn test_filter_panel_wins_on_overlap() {
        let tiny = Viewport { width: 300.0, height: 300.0 };
        let point = ScreenPoint { x: 150.0, y: 150.0 };
        let regions = FixedRegions::default();
        assert!(regions.legend_exclusion(tiny).contains(point));
        assert_eq!(place_overlay(point, tiny, &regions).side, PopupSide::Left);
    }
}

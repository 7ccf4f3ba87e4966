//! Turns the current marker set into what the map draws: cluster bubbles
//! and pins.

use crate::map::cluster::{self, Cluster, ClusterOptions, SizeTier};
use crate::map::markers::{CategoryTable, MarkerSet, RestaurantMarker};
use crate::map::projection::LatLng;

pub const DEFAULT_PIN_COLOR: &str = "#E53E3E";
pub const SELECTED_PIN_COLOR: &str = "#1A202C";
pub const CLUSTER_COLOR: &str = "#FF6B35";

const PIN_PATH: &str = "M12 2C8.13 2 5 5.13 5 9c0 5.25 7 13 7 13s7-7.75 7-13c0-3.87-3.13-7-7-7z";

#[derive(Debug, Clone, PartialEq)]
pub struct PinStyle {
    pub color: String,
    pub size_px: u32,
    /// Featured restaurants get a white dot inside the pin.
    pub inner_dot: bool,
    pub selected: bool,
}

impl PinStyle {
    pub fn for_marker(
        marker: &RestaurantMarker,
        categories: &CategoryTable,
        selected_slug: Option<&str>,
    ) -> Self {
        let selected = selected_slug == Some(marker.slug.as_str());
        let color = if selected {
            SELECTED_PIN_COLOR
        } else {
            categories.color_of(marker.category_id).unwrap_or(DEFAULT_PIN_COLOR)
        };
        Self {
            color: color.to_string(),
            size_px: if marker.is_featured { 36 } else { 28 },
            inner_dot: marker.is_featured,
            selected,
        }
    }

    /// Pixel offset of the pin tip from the icon's top-left corner.
    pub fn anchor(&self) -> (u32, u32) {
        (self.size_px / 2, self.size_px)
    }

    pub fn to_svg(&self) -> String {
        let dot = if self.inner_dot {
            r#"<circle cx="12" cy="9" r="2.5" fill="white"/>"#
        } else {
            ""
        };
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 24 24" fill="{color}" stroke="white" stroke-width="1.5"><path d="{path}"/>{dot}</svg>"#,
            size = self.size_px,
            color = self.color,
            path = PIN_PATH,
            dot = dot,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGlyph {
    pub count: usize,
    pub tier: SizeTier,
}

impl ClusterGlyph {
    pub fn for_count(count: usize) -> Self {
        Self {
            count,
            tier: SizeTier::for_count(count),
        }
    }

    pub fn to_html(&self) -> String {
        let size = self.tier.diameter_px();
        format!(
            "<div style=\"width:{size}px;height:{size}px;border-radius:50%;background:{bg};color:white;display:flex;align-items:center;justify-content:center;font-weight:{weight};font-size:{font}px;box-shadow:0 2px 8px rgba(0,0,0,0.2)\">{count}</div>",
            size = size,
            bg = CLUSTER_COLOR,
            weight = self.tier.font_weight(),
            font = self.tier.font_size_px(),
            count = self.count,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapGlyph {
    Pin {
        marker_id: i64,
        slug: String,
        /// Tooltip text.
        title: String,
        position: LatLng,
        style: PinStyle,
    },
    Cluster {
        cluster: Cluster,
        glyph: ClusterGlyph,
    },
}

impl MapGlyph {
    /// Marker ids this glyph stands for.
    pub fn marker_ids(&self) -> Vec<i64> {
        match self {
            MapGlyph::Pin { marker_id, .. } => vec![*marker_id],
            MapGlyph::Cluster { cluster, .. } => cluster.member_ids.clone(),
        }
    }
}

/// Clusters the set at `zoom`; singleton clusters are drawn as pins.
pub fn render_layer(
    markers: &MarkerSet,
    categories: &CategoryTable,
    zoom: f64,
    selected_slug: Option<&str>,
    options: &ClusterOptions,
) -> Vec<MapGlyph> {
    cluster::cluster_markers(markers.as_slice(), zoom, options)
        .into_iter()
        .filter_map(|c| {
            if !c.is_single() {
                let glyph = ClusterGlyph::for_count(c.len());
                return Some(MapGlyph::Cluster { cluster: c, glyph });
            }
            let m = markers.get(c.member_ids[0])?;
            Some(MapGlyph::Pin {
                marker_id: m.id,
                slug: m.slug.clone(),
                title: m.name.clone(),
                position: m.position(),
                style: PinStyle::for_marker(m, categories, selected_slug),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::map::markers::{marker, Category};

    fn categories() -> CategoryTable {
        CategoryTable::new(vec![Category {
            id: 1,
            name: "Vietnamese".into(),
            slug: "vietnamese".into(),
            icon: Some("🍜".into()),
            color: Some("#38A169".into()),
        }])
    }

    #[test]
    fn pins_take_category_color_unless_selected() {
        let mut m = marker(1, 10.0, 106.0);
        let table = categories();
        assert_eq!(PinStyle::for_marker(&m, &table, None).color, "#38A169");
        assert_eq!(
            PinStyle::for_marker(&m, &table, Some("restaurant-1")).color,
            SELECTED_PIN_COLOR
        );
        m.category_id = Some(42);
        assert_eq!(PinStyle::for_marker(&m, &table, None).color, DEFAULT_PIN_COLOR);
    }

    #[test]
    fn featured_pins_are_larger_with_a_dot() {
        let mut m = marker(1, 10.0, 106.0);
        m.is_featured = true;
        let style = PinStyle::for_marker(&m, &categories(), None);
        assert_eq!(style.size_px, 36);
        assert_eq!(style.anchor(), (18, 36));
        assert!(style.to_svg().contains("<circle"));

        m.is_featured = false;
        let plain = PinStyle::for_marker(&m, &categories(), None);
        assert_eq!(plain.size_px, 28);
        assert!(!plain.to_svg().contains("<circle"));
    }

    #[test]
    fn cluster_glyph_shows_count() {
        let html = ClusterGlyph::for_count(120).to_html();
        assert!(html.contains("width:60px"));
        assert!(html.contains(">120</div>"));
        assert!(html.contains(CLUSTER_COLOR));
    }

    #[test]
    fn layer_accounts_for_every_marker_once() {
        let set = MarkerSet::from(vec![
            marker(1, 10.7756, 106.7019),
            marker(2, 10.7757, 106.7020),
            marker(3, 20.0, 120.0),
        ]);
        let glyphs = render_layer(&set, &categories(), 12.0, None, &ClusterOptions::default());
        assert_eq!(glyphs.len(), 2);
        assert!(matches!(glyphs[0], MapGlyph::Cluster { ref glyph, .. } if glyph.count == 2));
        assert!(matches!(glyphs[1], MapGlyph::Pin { marker_id: 3, .. }));

        let ids: BTreeSet<i64> = glyphs.iter().flat_map(|g| g.marker_ids()).collect();
        assert_eq!(ids, set.ids());
    }
}

//! Sidebar cards. Always a projection of the same [`MarkerSet`] the map
//! layer draws, so the two can never disagree about which restaurants match.

use std::collections::BTreeSet;

use crate::map::layer::DEFAULT_PIN_COLOR;
use crate::map::markers::{CategoryTable, MarkerSet, RestaurantMarker};
use crate::services::restaurant_service::price_range_label;

const FALLBACK_ICON: &str = "🍽️";

#[derive(Debug, Clone, PartialEq)]
pub struct CardBadge {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardItem {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub address: String,
    pub badge: Option<CardBadge>,
    pub icon: String,
    /// e.g. `4.5`
    pub rating: String,
    pub rating_count: i64,
    pub price: &'static str,
    pub capacity: Option<i64>,
    pub tables: Option<i64>,
    pub is_featured: bool,
    pub image_url: Option<String>,
}

impl CardItem {
    fn from_marker(m: &RestaurantMarker, categories: &CategoryTable) -> Self {
        let category = categories.get(m.category_id);
        Self {
            id: m.id,
            slug: m.slug.clone(),
            name: m.name.clone(),
            address: m.address.clone(),
            badge: category.map(|c| CardBadge {
                name: c.name.clone(),
                color: c.color.clone().unwrap_or_else(|| DEFAULT_PIN_COLOR.to_string()),
            }),
            icon: category
                .and_then(|c| c.icon.clone())
                .unwrap_or_else(|| FALLBACK_ICON.to_string()),
            rating: format!("{:.1}", m.rating),
            rating_count: m.rating_count,
            price: price_range_label(m.price_range),
            capacity: m.capacity,
            tables: m.tables,
            is_featured: m.is_featured,
            image_url: m.primary_image.as_ref().map(|img| img.url.clone()),
        }
    }
}

/// One card per marker, in marker order.
pub fn project_cards(markers: &MarkerSet, categories: &CategoryTable) -> Vec<CardItem> {
    markers
        .iter()
        .map(|m| CardItem::from_marker(m, categories))
        .collect()
}

pub fn card_ids(cards: &[CardItem]) -> BTreeSet<i64> {
    cards.iter().map(|c| c.id).collect()
}

/// Header above the list: "1 venue", "12 venues".
pub fn venue_count_label(count: usize) -> String {
    if count == 1 {
        "1 venue".to_string()
    } else {
        format!("{} venues", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::markers::{marker, Category};

    #[test]
    fn cards_match_markers_one_to_one() {
        let set = MarkerSet::from(vec![marker(3, 10.0, 106.0), marker(1, 10.1, 106.1)]);
        let cards = project_cards(&set, &CategoryTable::default());
        assert_eq!(card_ids(&cards), set.ids());
        assert_eq!(cards[0].id, 3);
        assert!(project_cards(&MarkerSet::default(), &CategoryTable::default()).is_empty());
    }

    #[test]
    fn card_resolves_category_through_table() {
        let mut m = marker(1, 10.0, 106.0);
        m.rating = 4.55;
        m.price_range = 3;
        let table = CategoryTable::new(vec![Category {
            id: 1,
            name: "Vietnamese".into(),
            slug: "vietnamese".into(),
            icon: Some("🍜".into()),
            color: None,
        }]);
        let cards = project_cards(&MarkerSet::from(vec![m]), &table);
        let card = &cards[0];
        let badge = card.badge.as_ref().unwrap();
        assert_eq!(badge.name, "Vietnamese");
        assert_eq!(badge.color, DEFAULT_PIN_COLOR);
        assert_eq!(card.icon, "🍜");
        assert_eq!(card.price, "$$$");
        assert_eq!(card.rating.len(), 3);
    }

    #[test]
    fn unknown_category_falls_back() {
        let markers = MarkerSet::from(vec![marker(1, 0.0, 0.0)]);
        let cards = project_cards(&markers, &CategoryTable::default());
        let card = &cards[0];
        assert!(card.badge.is_none());
        assert_eq!(card.icon, FALLBACK_ICON);
    }

    #[test]
    fn venue_label_pluralizes() {
        assert_eq!(venue_count_label(0), "0 venues");
        assert_eq!(venue_count_label(1), "1 venue");
    }
}

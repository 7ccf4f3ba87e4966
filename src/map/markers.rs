use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::map::projection::LatLng;
use crate::services::restaurant_service::ImageUrlView;

/// A marker as the client keeps it. The server also embeds the joined
/// category, but the client only holds `category_id` and resolves it
/// through its own [`CategoryTable`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestaurantMarker {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_price_range")]
    pub price_range: i64,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub tables: Option<i64>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub rating_count: i64,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub primary_image: Option<ImageUrlView>,
}

fn default_price_range() -> i64 {
    2
}

impl RestaurantMarker {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// The current result of the viewport query. Cheap to clone; shared by the
/// map layer and the card list so both always render the same set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet(Arc<[RestaurantMarker]>);

impl MarkerSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RestaurantMarker> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[RestaurantMarker] {
        &self.0
    }

    pub fn get(&self, id: i64) -> Option<&RestaurantMarker> {
        self.0.iter().find(|m| m.id == id)
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&RestaurantMarker> {
        self.0.iter().find(|m| m.slug == slug)
    }

    pub fn ids(&self) -> BTreeSet<i64> {
        self.0.iter().map(|m| m.id).collect()
    }
}

impl From<Vec<RestaurantMarker>> for MarkerSet {
    fn from(markers: Vec<RestaurantMarker>) -> Self {
        Self(markers.into())
    }
}

impl<'a> IntoIterator for &'a MarkerSet {
    type Item = &'a RestaurantMarker;
    type IntoIter = std::slice::Iter<'a, RestaurantMarker>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Categories by id, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable(HashMap<i64, Category>);

impl CategoryTable {
    pub fn new(categories: Vec<Category>) -> Self {
        Self(categories.into_iter().map(|c| (c.id, c)).collect())
    }

    /// A marker's category, if it has one the table knows about.
    pub fn get(&self, id: Option<i64>) -> Option<&Category> {
        id.and_then(|id| self.0.get(&id))
    }

    pub fn color_of(&self, id: Option<i64>) -> Option<&str> {
        self.get(id).and_then(|c| c.color.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn marker(id: i64, lat: f64, lng: f64) -> RestaurantMarker {
    RestaurantMarker {
        id,
        name: format!("Restaurant {}", id),
        slug: format!("restaurant-{}", id),
        address: String::new(),
        latitude: lat,
        longitude: lng,
        price_range: 2,
        capacity: None,
        tables: None,
        rating: 0.0,
        rating_count: 0,
        is_featured: false,
        category_id: Some(1),
        primary_image: None,
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::database::{category_repo, restaurant_image_repo, restaurant_repo};
use crate::error::AppError;
use crate::models::{RestaurantImageRow, RestaurantListRow, RestaurantMarkerRow, RestaurantRow};
use crate::services::category_service::CategoryView;
use crate::services::image_service::ImageUrls;
use crate::services::restaurant_filters::{ListFilter, MarkerFilter};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerCategoryView {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrlView {
    pub url: String,
}

/// One map pin. `category` is resolved by join at query time; clients key
/// their own category lookups on `category_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantMarkerView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_range: i64,
    pub capacity: Option<i64>,
    pub tables: Option<i64>,
    pub rating: f64,
    pub rating_count: i64,
    pub is_featured: bool,
    pub category_id: i64,
    pub category: Option<MarkerCategoryView>,
    pub primary_image: Option<ImageUrlView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantImageView {
    pub id: i64,
    pub url: String,
    pub caption: Option<String>,
    pub is_primary: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDetailView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub opening_hours: Option<BTreeMap<String, String>>,
    pub price_range: i64,
    pub price_range_label: String,
    pub capacity: Option<i64>,
    pub tables: Option<i64>,
    pub rating: f64,
    pub rating_count: i64,
    pub is_featured: bool,
    pub is_active: bool,
    pub category: Option<CategoryView>,
    pub images: Vec<RestaurantImageView>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListCategoryView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantListItemView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub price_range: i64,
    pub price_range_label: String,
    pub rating: f64,
    pub rating_count: i64,
    pub is_featured: bool,
    pub is_active: bool,
    pub category: Option<ListCategoryView>,
    pub primary_image: Option<RestaurantImageView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: i64,
    pub last_page: i64,
    pub per_page: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Geo Filter Query: every active, non-deleted restaurant inside the box (if
/// any), in the category set (if any), whose name contains the search text
/// (if any). Not paginated.
pub async fn list_map_markers(
    pool: &SqlitePool,
    images: &ImageUrls,
    filter: &MarkerFilter,
) -> Result<Vec<RestaurantMarkerView>, AppError> {
    let category_ids_json = filter.category_ids_json();
    let rows = restaurant_repo::list_for_map(
        pool,
        category_ids_json.as_deref(),
        filter.bounds.map(|b| b.as_ranges()),
    )
    .await?;

    let markers = rows
        .into_iter()
        .filter(|row| filter.matches_search(&row.name))
        .map(|row| marker_view(row, images))
        .collect::<Vec<_>>();

    debug!(
        "🗺️ Map query: bounds={:?}, categories={}, search={:?} -> {} markers",
        filter.bounds,
        filter.category_ids.len(),
        filter.search,
        markers.len()
    );

    Ok(markers)
}

pub async fn list_page(
    pool: &SqlitePool,
    images: &ImageUrls,
    filter: &ListFilter,
) -> Result<Page<RestaurantListItemView>, AppError> {
    let binds = filter.to_binds();
    let total = restaurant_repo::count_filtered(pool, &binds).await?;
    let rows = restaurant_repo::list_page(pool, &binds, filter.per_page, filter.offset()).await?;

    Ok(Page {
        data: rows.into_iter().map(|row| list_item_view(row, images)).collect(),
        meta: PageMeta {
            current_page: filter.page,
            last_page: last_page(total, filter.per_page),
            per_page: filter.per_page,
            total,
        },
    })
}

pub async fn load_detail(
    pool: &SqlitePool,
    images: &ImageUrls,
    slug: &str,
) -> Result<RestaurantDetailView, AppError> {
    let Some(row) = restaurant_repo::find_active_by_slug(pool, slug).await? else {
        return Err(AppError::NotFound(format!("Restaurant [{}]", slug)));
    };

    let category = category_repo::find_by_id(pool, row.category_id)
        .await?
        .map(CategoryView::from);
    let image_rows = restaurant_image_repo::list_for_restaurant(pool, row.id).await?;

    Ok(detail_view(row, category, image_rows, images))
}

pub fn price_range_label(price_range: i64) -> &'static str {
    match price_range {
        1 => "$",
        2 => "$$",
        3 => "$$$",
        4 => "$$$$",
        _ => "$$",
    }
}

fn last_page(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 1;
    }
    (total + per_page - 1) / per_page
}

fn marker_view(row: RestaurantMarkerRow, images: &ImageUrls) -> RestaurantMarkerView {
    let category = row.category_name.map(|name| MarkerCategoryView {
        id: row.category_id,
        name,
        icon: row.category_icon,
        color: row.category_color,
    });
    let primary_image = row.primary_image_path.map(|path| ImageUrlView {
        url: images.url(row.primary_image_disk.as_deref().unwrap_or("public"), &path),
    });

    RestaurantMarkerView {
        id: row.id,
        name: row.name,
        slug: row.slug,
        address: row.address,
        latitude: row.latitude,
        longitude: row.longitude,
        price_range: row.price_range,
        capacity: row.capacity,
        tables: row.tables,
        rating: row.rating,
        rating_count: row.rating_count,
        is_featured: row.is_featured != 0,
        category_id: row.category_id,
        category,
        primary_image,
    }
}

fn list_item_view(row: RestaurantListRow, images: &ImageUrls) -> RestaurantListItemView {
    let category = match (row.category_name, row.category_slug) {
        (Some(name), Some(slug)) => Some(ListCategoryView {
            id: row.category_id,
            name,
            slug,
            icon: row.category_icon,
            color: row.category_color,
        }),
        _ => None,
    };
    let primary_image = match (row.primary_image_id, row.primary_image_path) {
        (Some(id), Some(path)) => Some(RestaurantImageView {
            id,
            url: images.url(row.primary_image_disk.as_deref().unwrap_or("public"), &path),
            caption: row.primary_image_caption,
            is_primary: true,
            sort_order: 0,
        }),
        _ => None,
    };

    RestaurantListItemView {
        id: row.id,
        name: row.name,
        slug: row.slug,
        address: row.address,
        city: row.city,
        district: row.district,
        latitude: row.latitude,
        longitude: row.longitude,
        phone: row.phone,
        price_range: row.price_range,
        price_range_label: price_range_label(row.price_range).to_string(),
        rating: row.rating,
        rating_count: row.rating_count,
        is_featured: row.is_featured != 0,
        is_active: row.is_active != 0,
        category,
        primary_image,
    }
}

fn detail_view(
    row: RestaurantRow,
    category: Option<CategoryView>,
    image_rows: Vec<RestaurantImageRow>,
    images: &ImageUrls,
) -> RestaurantDetailView {
    let opening_hours = parse_opening_hours(row.opening_hours.as_deref(), &row.slug);
    let images = image_rows
        .into_iter()
        .map(|img| RestaurantImageView {
            id: img.id,
            url: images.url(&img.disk, &img.path),
            caption: img.caption,
            is_primary: img.is_primary != 0,
            sort_order: img.sort_order,
        })
        .collect();

    RestaurantDetailView {
        id: row.id,
        name: row.name,
        slug: row.slug,
        description: row.description,
        address: row.address,
        city: row.city,
        district: row.district,
        latitude: row.latitude,
        longitude: row.longitude,
        phone: row.phone,
        website: row.website,
        email: row.email,
        opening_hours,
        price_range: row.price_range,
        price_range_label: price_range_label(row.price_range).to_string(),
        capacity: row.capacity,
        tables: row.tables,
        rating: row.rating,
        rating_count: row.rating_count,
        is_featured: row.is_featured != 0,
        is_active: row.is_active != 0,
        category,
        images,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn parse_opening_hours(raw: Option<&str>, slug: &str) -> Option<BTreeMap<String, String>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match serde_json::from_str::<BTreeMap<String, String>>(raw) {
        Ok(hours) => Some(hours),
        Err(e) => {
            warn!("Unreadable opening_hours for {}: {}", slug, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_labels_cover_the_four_tiers() {
        assert_eq!(price_range_label(1), "$");
        assert_eq!(price_range_label(4), "$$$$");
        assert_eq!(price_range_label(9), "$$");
    }

    #[test]
    fn last_page_rounds_up_and_never_drops_below_one() {
        assert_eq!(last_page(0, 15), 1);
        assert_eq!(last_page(15, 15), 1);
        assert_eq!(last_page(16, 15), 2);
    }

    #[test]
    fn opening_hours_tolerate_garbage() {
        let hours = parse_opening_hours(Some(r#"{"mon":"07:00-22:00"}"#), "pho").unwrap();
        assert_eq!(hours.get("mon").map(String::as_str), Some("07:00-22:00"));
        assert!(parse_opening_hours(Some("not json"), "pho").is_none());
        assert!(parse_opening_hours(None, "pho").is_none());
    }

    #[test]
    fn marker_without_category_or_image_serializes_nulls() {
        let row = RestaurantMarkerRow {
            id: 1,
            category_id: 3,
            name: "Phở Hùng".into(),
            slug: "pho-hung".into(),
            address: "3 Pasteur".into(),
            latitude: 10.77564,
            longitude: 106.70508,
            price_range: 1,
            capacity: None,
            tables: None,
            rating: 4.5,
            rating_count: 10,
            is_featured: 1,
            category_name: None,
            category_icon: None,
            category_color: None,
            primary_image_disk: None,
            primary_image_path: None,
        };
        let view = marker_view(row, &ImageUrls::new("http://localhost/storage"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["category_id"], 3);
        assert!(json["category"].is_null());
        assert!(json["primary_image"].is_null());
        assert_eq!(json["is_featured"], true);
    }
}

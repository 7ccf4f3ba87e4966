use sqlx::SqlitePool;

use crate::models::{RestaurantListRow, RestaurantMarkerRow, RestaurantRow};

const SQL_LIST_FOR_MAP: &str = r#"
SELECT
  r.id,
  r.category_id,
  r.name,
  r.slug,
  r.address,
  r.latitude,
  r.longitude,
  r.price_range,
  r.capacity,
  r.tables,
  r.rating,
  r.rating_count,
  r.is_featured,
  c.name AS category_name,
  c.icon AS category_icon,
  c.color AS category_color,
  pi.disk AS primary_image_disk,
  pi.path AS primary_image_path
FROM restaurants r
LEFT JOIN categories c
  ON c.id = r.category_id
LEFT JOIN restaurant_images pi
  ON pi.id = (
    SELECT i.id
    FROM restaurant_images i
    WHERE i.restaurant_id = r.id
      AND i.is_primary = 1
    ORDER BY i.sort_order ASC, i.id ASC
    LIMIT 1
  )
WHERE r.is_deleted = 0
  AND r.is_active = 1
  AND (
    ? IS NULL
    OR r.category_id IN (SELECT value FROM json_each(?))
  )
  AND (
    ? IS NULL
    OR (
      r.latitude BETWEEN ? AND ?
      AND r.longitude BETWEEN ? AND ?
    )
  )
ORDER BY r.id ASC
"#;

/// Markers for the map. `category_ids_json` is a JSON array of ids and
/// `bbox` is `(min_lat, max_lat, min_lng, max_lng)`. Name search is applied
/// by the caller, SQLite's `lower()` only folds ASCII.
pub async fn list_for_map(
    pool: &SqlitePool,
    category_ids_json: Option<&str>,
    bbox: Option<(f64, f64, f64, f64)>,
) -> sqlx::Result<Vec<RestaurantMarkerRow>> {
    let (min_lat, max_lat, min_lng, max_lng) = bbox
        .map(|v| (Some(v.0), Some(v.1), Some(v.2), Some(v.3)))
        .unwrap_or((None, None, None, None));

    sqlx::query_as::<_, RestaurantMarkerRow>(SQL_LIST_FOR_MAP)
        .bind(category_ids_json)
        .bind(category_ids_json)
        .bind(min_lat)
        .bind(min_lat)
        .bind(max_lat)
        .bind(min_lng)
        .bind(max_lng)
        .fetch_all(pool)
        .await
}

/// Filters shared by the listing page and its count query.
#[derive(Debug, Default, Clone)]
pub struct ListFilterBinds {
    pub q_like: String,
    pub category_ids_json: Option<String>,
    pub price_ranges_json: Option<String>,
    pub is_featured: Option<bool>,
}

const SQL_LIST_PAGE: &str = r#"
SELECT
  r.id,
  r.category_id,
  r.name,
  r.slug,
  r.address,
  r.city,
  r.district,
  r.latitude,
  r.longitude,
  r.phone,
  r.price_range,
  r.rating,
  r.rating_count,
  r.is_featured,
  r.is_active,
  c.name AS category_name,
  c.slug AS category_slug,
  c.icon AS category_icon,
  c.color AS category_color,
  pi.id AS primary_image_id,
  pi.disk AS primary_image_disk,
  pi.path AS primary_image_path,
  pi.caption AS primary_image_caption
FROM restaurants r
LEFT JOIN categories c
  ON c.id = r.category_id
LEFT JOIN restaurant_images pi
  ON pi.id = (
    SELECT i.id
    FROM restaurant_images i
    WHERE i.restaurant_id = r.id
      AND i.is_primary = 1
    ORDER BY i.sort_order ASC, i.id ASC
    LIMIT 1
  )
WHERE r.is_deleted = 0
  AND r.is_active = 1
  AND (
    ? = ''
    OR lower(r.name) LIKE ? ESCAPE '\'
    OR lower(r.address) LIKE ? ESCAPE '\'
    OR lower(COALESCE(r.description, '')) LIKE ? ESCAPE '\'
  )
  AND (
    ? IS NULL
    OR r.category_id IN (SELECT value FROM json_each(?))
  )
  AND (
    ? IS NULL
    OR r.price_range IN (SELECT value FROM json_each(?))
  )
  AND (
    ? IS NULL
    OR r.is_featured = ?
  )
ORDER BY r.created_at DESC, r.id DESC
LIMIT ? OFFSET ?
"#;

pub async fn list_page(
    pool: &SqlitePool,
    filters: &ListFilterBinds,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<RestaurantListRow>> {
    let featured = filters.is_featured.map(i64::from);

    sqlx::query_as::<_, RestaurantListRow>(SQL_LIST_PAGE)
        .bind(&filters.q_like)
        .bind(&filters.q_like)
        .bind(&filters.q_like)
        .bind(&filters.q_like)
        .bind(filters.category_ids_json.as_deref())
        .bind(filters.category_ids_json.as_deref())
        .bind(filters.price_ranges_json.as_deref())
        .bind(filters.price_ranges_json.as_deref())
        .bind(featured)
        .bind(featured)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

const SQL_COUNT_PAGE: &str = r#"
SELECT COUNT(*)
FROM restaurants r
WHERE r.is_deleted = 0
  AND r.is_active = 1
  AND (
    ? = ''
    OR lower(r.name) LIKE ? ESCAPE '\'
    OR lower(r.address) LIKE ? ESCAPE '\'
    OR lower(COALESCE(r.description, '')) LIKE ? ESCAPE '\'
  )
  AND (
    ? IS NULL
    OR r.category_id IN (SELECT value FROM json_each(?))
  )
  AND (
    ? IS NULL
    OR r.price_range IN (SELECT value FROM json_each(?))
  )
  AND (
    ? IS NULL
    OR r.is_featured = ?
  )
"#;

pub async fn count_filtered(pool: &SqlitePool, filters: &ListFilterBinds) -> sqlx::Result<i64> {
    let featured = filters.is_featured.map(i64::from);

    sqlx::query_scalar::<_, i64>(SQL_COUNT_PAGE)
        .bind(&filters.q_like)
        .bind(&filters.q_like)
        .bind(&filters.q_like)
        .bind(&filters.q_like)
        .bind(filters.category_ids_json.as_deref())
        .bind(filters.category_ids_json.as_deref())
        .bind(filters.price_ranges_json.as_deref())
        .bind(filters.price_ranges_json.as_deref())
        .bind(featured)
        .bind(featured)
        .fetch_one(pool)
        .await
}

const SQL_FIND_ACTIVE_BY_SLUG: &str = r#"
SELECT
  id,
  category_id,
  name,
  slug,
  description,
  address,
  city,
  district,
  latitude,
  longitude,
  phone,
  website,
  email,
  opening_hours,
  price_range,
  capacity,
  tables,
  rating,
  rating_count,
  is_active,
  is_featured,
  created_at,
  updated_at
FROM restaurants
WHERE slug = ?
  AND is_deleted = 0
  AND is_active = 1
LIMIT 1
"#;

pub async fn find_active_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> sqlx::Result<Option<RestaurantRow>> {
    sqlx::query_as::<_, RestaurantRow>(SQL_FIND_ACTIVE_BY_SLUG)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub struct NewRestaurant<'a> {
    pub category_id: i64,
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub address: &'a str,
    pub city: Option<&'a str>,
    pub district: Option<&'a str>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<&'a str>,
    pub website: Option<&'a str>,
    pub email: Option<&'a str>,
    pub opening_hours_json: Option<&'a str>,
    pub price_range: i64,
    pub capacity: Option<i64>,
    pub tables: Option<i64>,
    pub rating: f64,
    pub rating_count: i64,
    pub is_active: bool,
    pub is_featured: bool,
}

const SQL_UPSERT_RESTAURANT: &str = r#"
INSERT INTO restaurants (
  category_id, name, slug, description, address, city, district,
  latitude, longitude, phone, website, email, opening_hours,
  price_range, capacity, tables, rating, rating_count, is_active, is_featured
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (slug) DO UPDATE SET
  category_id = excluded.category_id,
  name = excluded.name,
  description = excluded.description,
  address = excluded.address,
  city = excluded.city,
  district = excluded.district,
  latitude = excluded.latitude,
  longitude = excluded.longitude,
  phone = excluded.phone,
  website = excluded.website,
  email = excluded.email,
  opening_hours = excluded.opening_hours,
  price_range = excluded.price_range,
  capacity = excluded.capacity,
  tables = excluded.tables,
  rating = excluded.rating,
  rating_count = excluded.rating_count,
  is_active = excluded.is_active,
  is_featured = excluded.is_featured,
  is_deleted = 0,
  updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
RETURNING id
"#;

pub async fn upsert_by_slug(
    pool: &SqlitePool,
    restaurant: &NewRestaurant<'_>,
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_UPSERT_RESTAURANT)
        .bind(restaurant.category_id)
        .bind(restaurant.name)
        .bind(restaurant.slug)
        .bind(restaurant.description)
        .bind(restaurant.address)
        .bind(restaurant.city)
        .bind(restaurant.district)
        .bind(restaurant.latitude)
        .bind(restaurant.longitude)
        .bind(restaurant.phone)
        .bind(restaurant.website)
        .bind(restaurant.email)
        .bind(restaurant.opening_hours_json)
        .bind(restaurant.price_range)
        .bind(restaurant.capacity)
        .bind(restaurant.tables)
        .bind(restaurant.rating)
        .bind(restaurant.rating_count)
        .bind(restaurant.is_active as i64)
        .bind(restaurant.is_featured as i64)
        .fetch_one(pool)
        .await
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(
        "UPDATE restaurants SET is_deleted = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

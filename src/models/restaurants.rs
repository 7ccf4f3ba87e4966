/// Full restaurant record, as read for the detail endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestaurantRow {
    pub id: i64,
    pub category_id: i64,
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
    pub opening_hours: Option<String>,
    pub price_range: i64,
    pub capacity: Option<i64>,
    pub tables: Option<i64>,
    pub rating: f64,
    pub rating_count: i64,
    pub is_active: i64,
    pub is_featured: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Map projection: only what a pin and its tooltip/card need. Category
/// columns come from a join so they always reflect the category table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestaurantMarkerRow {
    pub id: i64,
    pub category_id: i64,
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
    pub is_featured: i64,
    pub category_name: Option<String>,
    pub category_icon: Option<String>,
    pub category_color: Option<String>,
    pub primary_image_disk: Option<String>,
    pub primary_image_path: Option<String>,
}

/// Row for the paginated listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestaurantListRow {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub price_range: i64,
    pub rating: f64,
    pub rating_count: i64,
    pub is_featured: i64,
    pub is_active: i64,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub category_icon: Option<String>,
    pub category_color: Option<String>,
    pub primary_image_id: Option<i64>,
    pub primary_image_disk: Option<String>,
    pub primary_image_path: Option<String>,
    pub primary_image_caption: Option<String>,
}

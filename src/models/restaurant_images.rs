#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestaurantImageRow {
    pub id: i64,
    pub restaurant_id: i64,
    pub path: String,
    pub disk: String,
    pub caption: Option<String>,
    pub is_primary: i64,
    pub sort_order: i64,
}

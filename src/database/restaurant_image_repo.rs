use sqlx::SqlitePool;

use crate::models::RestaurantImageRow;

const SQL_LIST_FOR_RESTAURANT: &str = r#"
SELECT
  id,
  restaurant_id,
  path,
  disk,
  caption,
  is_primary,
  sort_order
FROM restaurant_images
WHERE restaurant_id = ?
ORDER BY sort_order ASC, id ASC
"#;

pub async fn list_for_restaurant(
    pool: &SqlitePool,
    restaurant_id: i64,
) -> sqlx::Result<Vec<RestaurantImageRow>> {
    sqlx::query_as::<_, RestaurantImageRow>(SQL_LIST_FOR_RESTAURANT)
        .bind(restaurant_id)
        .fetch_all(pool)
        .await
}

pub struct NewRestaurantImage<'a> {
    pub restaurant_id: i64,
    pub path: &'a str,
    pub disk: &'a str,
    pub caption: Option<&'a str>,
    pub is_primary: bool,
    pub sort_order: i64,
}

/// Inserts an image. A new primary image demotes the previous one, so a
/// restaurant has at most one primary image.
pub async fn insert(pool: &SqlitePool, image: &NewRestaurantImage<'_>) -> sqlx::Result<i64> {
    let mut tx = pool.begin().await?;

    if image.is_primary {
        sqlx::query("UPDATE restaurant_images SET is_primary = 0 WHERE restaurant_id = ?")
            .bind(image.restaurant_id)
            .execute(&mut *tx)
            .await?;
    }

    let id = sqlx::query_scalar::<_, i64>(
        r#"
INSERT INTO restaurant_images (restaurant_id, path, disk, caption, is_primary, sort_order)
VALUES (?, ?, ?, ?, ?, ?)
RETURNING id
"#,
    )
    .bind(image.restaurant_id)
    .bind(image.path)
    .bind(image.disk)
    .bind(image.caption)
    .bind(image.is_primary as i64)
    .bind(image.sort_order)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

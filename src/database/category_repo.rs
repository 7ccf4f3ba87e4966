use sqlx::SqlitePool;

use crate::models::CategoryRow;

const SQL_LIST_ACTIVE_CATEGORIES: &str = r#"
SELECT
  id,
  name,
  slug,
  icon,
  color,
  description,
  sort_order,
  is_active,
  created_at,
  updated_at
FROM categories
WHERE is_deleted = 0
  AND is_active = 1
ORDER BY sort_order ASC, name ASC
"#;

pub async fn list_active(pool: &SqlitePool) -> sqlx::Result<Vec<CategoryRow>> {
    sqlx::query_as::<_, CategoryRow>(SQL_LIST_ACTIVE_CATEGORIES)
        .fetch_all(pool)
        .await
}

const SQL_FIND_ACTIVE_CATEGORY: &str = r#"
SELECT
  id,
  name,
  slug,
  icon,
  color,
  description,
  sort_order,
  is_active,
  created_at,
  updated_at
FROM categories
WHERE id = ?
  AND is_deleted = 0
  AND is_active = 1
LIMIT 1
"#;

pub async fn find_active_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<CategoryRow>> {
    sqlx::query_as::<_, CategoryRow>(SQL_FIND_ACTIVE_CATEGORY)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Lookup used when the caller already holds a category id from a
/// restaurant row; deleted categories still resolve so the reference stays
/// displayable.
const SQL_FIND_CATEGORY: &str = r#"
SELECT
  id,
  name,
  slug,
  icon,
  color,
  description,
  sort_order,
  is_active,
  created_at,
  updated_at
FROM categories
WHERE id = ?
LIMIT 1
"#;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<CategoryRow>> {
    sqlx::query_as::<_, CategoryRow>(SQL_FIND_CATEGORY)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub icon: Option<&'a str>,
    pub color: Option<&'a str>,
    pub description: Option<&'a str>,
    pub sort_order: i64,
    pub is_active: bool,
}

const SQL_UPSERT_CATEGORY: &str = r#"
INSERT INTO categories (name, slug, icon, color, description, sort_order, is_active)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (slug) DO UPDATE SET
  name = excluded.name,
  icon = excluded.icon,
  color = excluded.color,
  description = excluded.description,
  sort_order = excluded.sort_order,
  is_active = excluded.is_active,
  is_deleted = 0,
  updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
RETURNING id
"#;

pub async fn upsert_by_slug(pool: &SqlitePool, category: &NewCategory<'_>) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_UPSERT_CATEGORY)
        .bind(category.name)
        .bind(category.slug)
        .bind(category.icon)
        .bind(category.color)
        .bind(category.description)
        .bind(category.sort_order)
        .bind(category.is_active as i64)
        .fetch_one(pool)
        .await
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(
        "UPDATE categories SET is_deleted = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

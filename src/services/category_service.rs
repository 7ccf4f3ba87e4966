use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::database::category_repo;
use crate::error::AppError;
use crate::models::CategoryRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CategoryRow> for CategoryView {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            icon: row.icon,
            color: row.color,
            description: row.description,
            sort_order: row.sort_order,
            is_active: row.is_active != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn list_active(pool: &SqlitePool) -> Result<Vec<CategoryView>, AppError> {
    let rows = category_repo::list_active(pool).await?;
    Ok(rows.into_iter().map(CategoryView::from).collect())
}

pub async fn find_active(pool: &SqlitePool, id: i64) -> Result<CategoryView, AppError> {
    category_repo::find_active_by_id(pool, id)
        .await?
        .map(CategoryView::from)
        .ok_or_else(|| AppError::NotFound(format!("Category [{}]", id)))
}

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::database::category_repo::{self, NewCategory};
use crate::database::restaurant_image_repo::{self, NewRestaurantImage};
use crate::database::restaurant_repo::{self, NewRestaurant};

#[derive(Debug, Default)]
pub struct SeedReport {
    pub categories: usize,
    pub restaurants: usize,
    pub images: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub restaurants: Vec<SeedRestaurant>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedRestaurant {
    pub name: String,
    pub slug: Option<String>,
    /// Slug of the category.
    pub category: String,
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
    #[serde(default = "default_price_range")]
    pub price_range: i64,
    pub capacity: Option<i64>,
    pub tables: Option<i64>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub rating_count: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub images: Vec<SeedImage>,
}

#[derive(Debug, Deserialize)]
pub struct SeedImage {
    pub path: String,
    #[serde(default = "default_disk")]
    pub disk: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

fn default_true() -> bool {
    true
}

fn default_price_range() -> i64 {
    2
}

fn default_disk() -> String {
    "public".to_string()
}

const DEFAULT_DESCRIPTION: &str =
    "A beloved local eatery known for its authentic flavors and warm atmosphere.";

fn default_opening_hours() -> BTreeMap<String, String> {
    [
        ("mon", "07:00-22:00"),
        ("tue", "07:00-22:00"),
        ("wed", "07:00-22:00"),
        ("thu", "07:00-22:00"),
        ("fri", "07:00-23:00"),
        ("sat", "07:00-23:00"),
        ("sun", "08:00-22:00"),
    ]
    .into_iter()
    .map(|(d, h)| (d.to_string(), h.to_string()))
    .collect()
}

/// URL-safe slug: transliterated, lowercase, hyphen separated. An explicit
/// non-empty slug wins over the derived one.
pub fn slug_or_derived(slug: Option<&str>, name: &str) -> String {
    slug.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(slug::slugify)
        .unwrap_or_else(|| slug::slugify(name))
}

/// Upserts categories then restaurants (keyed by slug). Restaurants whose
/// category is unknown or whose coordinates are out of range are skipped.
pub async fn seed_directory(pool: &SqlitePool, seed: &SeedFile) -> sqlx::Result<SeedReport> {
    let mut report = SeedReport::default();
    let mut category_ids: HashMap<String, i64> = HashMap::new();

    for (order, c) in seed.categories.iter().enumerate() {
        let slug = slug_or_derived(c.slug.as_deref(), &c.name);
        let id = category_repo::upsert_by_slug(
            pool,
            &NewCategory {
                name: &c.name,
                slug: &slug,
                icon: c.icon.as_deref(),
                color: c.color.as_deref(),
                description: c.description.as_deref(),
                sort_order: order as i64,
                is_active: c.is_active,
            },
        )
        .await?;
        category_ids.insert(slug, id);
        report.categories += 1;
    }

    for r in &seed.restaurants {
        let Some(category_id) = category_ids.get(&slug::slugify(&r.category)).copied() else {
            warn!("🌱 Unknown category '{}' for restaurant '{}'", r.category, r.name);
            report.skipped += 1;
            continue;
        };
        if !(-90.0..=90.0).contains(&r.latitude) || !(-180.0..=180.0).contains(&r.longitude) {
            warn!(
                "🌱 Out of range coordinates ({}, {}) for restaurant '{}'",
                r.latitude, r.longitude, r.name
            );
            report.skipped += 1;
            continue;
        }

        let slug = slug_or_derived(r.slug.as_deref(), &r.name);
        let hours = r.opening_hours.clone().unwrap_or_else(default_opening_hours);
        let hours_json = serde_json::to_string(&hours).ok();

        let restaurant_id = restaurant_repo::upsert_by_slug(
            pool,
            &NewRestaurant {
                category_id,
                name: &r.name,
                slug: &slug,
                description: Some(r.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)),
                address: &r.address,
                city: r.city.as_deref(),
                district: r.district.as_deref(),
                latitude: r.latitude,
                longitude: r.longitude,
                phone: r.phone.as_deref(),
                website: r.website.as_deref(),
                email: r.email.as_deref(),
                opening_hours_json: hours_json.as_deref(),
                price_range: r.price_range.clamp(1, 4),
                capacity: r.capacity,
                tables: r.tables,
                rating: r.rating,
                rating_count: r.rating_count,
                is_active: r.is_active,
                is_featured: r.is_featured,
            },
        )
        .await?;
        report.restaurants += 1;

        // Images are only attached on first seed of a restaurant.
        if !restaurant_image_repo::list_for_restaurant(pool, restaurant_id)
            .await?
            .is_empty()
        {
            continue;
        }
        for (order, img) in r.images.iter().enumerate() {
            restaurant_image_repo::insert(
                pool,
                &NewRestaurantImage {
                    restaurant_id,
                    path: &img.path,
                    disk: &img.disk,
                    caption: img.caption.as_deref(),
                    is_primary: img.is_primary,
                    sort_order: order as i64,
                },
            )
            .await?;
            report.images += 1;
        }
    }

    info!(
        "🌱 Seed done: categories={}, restaurants={}, images={}, skipped={}",
        report.categories, report.restaurants, report.images, report.skipped
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_transliterated() {
        assert_eq!(slug_or_derived(None, "Phở Hùng"), "pho-hung");
        assert_eq!(slug_or_derived(Some("  "), "Café & Drinks"), "cafe-drinks");
        assert_eq!(slug_or_derived(Some("Custom Slug"), "ignored"), "custom-slug");
    }

    #[test]
    fn seed_file_fills_defaults() {
        let seed: SeedFile = serde_json::from_str(
            r#"{"restaurants":[{"name":"A","category":"thai","address":"x","latitude":1.0,"longitude":2.0}]}"#,
        )
        .unwrap();
        let r = &seed.restaurants[0];
        assert!(seed.categories.is_empty());
        assert_eq!(r.price_range, 2);
        assert!(r.is_active);
        assert!(!r.is_featured);
        assert!(r.images.is_empty());
    }

    #[tokio::test]
    async fn seeding_skips_unknown_categories_and_is_idempotent() {
        let pool = crate::database::connect_in_memory().await.unwrap();
        crate::database::migrate(&pool).await.unwrap();

        let seed: SeedFile = serde_json::from_str(
            r##"{
              "categories":[{"name":"Thai","color":"#805AD5"}],
              "restaurants":[
                {"name":"The Racha Room","category":"thai","address":"107 Truong Dinh","latitude":10.779,"longitude":106.685,
                 "images":[{"path":"restaurants/racha.jpg","is_primary":true}]},
                {"name":"Nowhere","category":"martian","address":"?","latitude":0.0,"longitude":0.0}
              ]
            }"##,
        )
        .unwrap();

        let first = seed_directory(&pool, &seed).await.unwrap();
        assert_eq!(first.categories, 1);
        assert_eq!(first.restaurants, 1);
        assert_eq!(first.skipped, 1);

        seed_directory(&pool, &seed).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM restaurant_images")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(images, 1);
    }
}

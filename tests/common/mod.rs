#![allow(dead_code)]

use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use foodmap::database::category_repo::{self, NewCategory};
use foodmap::database::restaurant_image_repo::{self, NewRestaurantImage};
use foodmap::database::restaurant_repo::{self, NewRestaurant};
use foodmap::services::image_service::ImageUrls;
use foodmap::web::{self, AppState};

pub const STORAGE_URL: &str = "http://localhost/storage";

/// One fixture restaurant as inserted, for computing expected results.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub id: i64,
    pub slug: &'static str,
    pub name: &'static str,
    pub category_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub visible: bool,
}

pub struct Fixture {
    pub pool: SqlitePool,
    pub vietnamese: i64,
    pub cafe: i64,
    pub restaurants: Vec<Seeded>,
}

impl Fixture {
    pub fn router(&self) -> Router {
        web::router(AppState {
            pool: self.pool.clone(),
            images: ImageUrls::new(STORAGE_URL),
        })
    }

    pub fn id_of(&self, slug: &str) -> i64 {
        self.restaurants
            .iter()
            .find(|r| r.slug == slug)
            .map(|r| r.id)
            .unwrap()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Seeded> {
        self.restaurants.iter().filter(|r| r.visible)
    }
}

async fn category(pool: &SqlitePool, name: &str, slug: &str, color: &str, order: i64) -> i64 {
    category_repo::upsert_by_slug(
        pool,
        &NewCategory {
            name,
            slug,
            icon: Some("🍽️"),
            color: Some(color),
            description: None,
            sort_order: order,
            is_active: true,
        },
    )
    .await
    .unwrap()
}

#[allow(clippy::too_many_arguments)]
async fn restaurant(
    pool: &SqlitePool,
    category_id: i64,
    name: &str,
    slug: &str,
    latitude: f64,
    longitude: f64,
    is_active: bool,
    is_featured: bool,
) -> i64 {
    restaurant_repo::upsert_by_slug(
        pool,
        &NewRestaurant {
            category_id,
            name,
            slug,
            description: Some("Fixture"),
            address: "District 1",
            city: Some("Ho Chi Minh City"),
            district: Some("District 1"),
            latitude,
            longitude,
            phone: None,
            website: None,
            email: None,
            opening_hours_json: Some(r#"{"mon":"07:00-22:00"}"#),
            price_range: if is_featured { 3 } else { 1 },
            capacity: Some(40),
            tables: Some(10),
            rating: 4.5,
            rating_count: 100,
            is_active,
            is_featured,
        },
    )
    .await
    .unwrap()
}

/// Five visible restaurants (four in central HCMC, one in Hanoi) plus one
/// inactive and one soft-deleted restaurant right next to them.
pub async fn fixture() -> Fixture {
    let pool = foodmap::database::connect_in_memory().await.unwrap();
    foodmap::database::migrate(&pool).await.unwrap();

    let vietnamese = category(&pool, "Vietnamese", "vietnamese", "#E53E3E", 0).await;
    let cafe = category(&pool, "Cafe", "cafe", "#D69E2E", 1).await;

    let rows: [(&'static str, &'static str, i64, f64, f64, bool, bool); 7] = [
        ("Phở Hùng", "pho-hung", vietnamese, 10.7756, 106.7019, true, false),
        ("Bún Chả 145", "bun-cha-145", vietnamese, 10.7790, 106.6990, true, false),
        ("Cộng Cà Phê", "cong-ca-phe", cafe, 10.7769, 106.7009, true, false),
        ("Hanoi Corner", "hanoi-corner", vietnamese, 21.0285, 105.8542, true, false),
        ("The Workshop", "the-workshop", cafe, 10.7740, 106.7040, true, true),
        ("Closed Place", "closed-place", vietnamese, 10.7760, 106.7020, false, false),
        ("Deleted Place", "deleted-place", vietnamese, 10.7761, 106.7021, true, false),
    ];

    let mut restaurants = Vec::new();
    for (name, slug, category_id, lat, lng, active, featured) in rows {
        let id = restaurant(&pool, category_id, name, slug, lat, lng, active, featured).await;
        restaurants.push(Seeded {
            id,
            slug,
            name,
            category_id,
            latitude: lat,
            longitude: lng,
            visible: active && slug != "deleted-place",
        });
    }

    let deleted = restaurants.iter().find(|r| r.slug == "deleted-place").unwrap().id;
    restaurant_repo::soft_delete(&pool, deleted).await.unwrap();

    let pho = restaurants[0].id;
    restaurant_image_repo::insert(
        &pool,
        &NewRestaurantImage {
            restaurant_id: pho,
            path: "restaurants/pho-hung.jpg",
            disk: "public",
            caption: Some("Front"),
            is_primary: true,
            sort_order: 0,
        },
    )
    .await
    .unwrap();

    Fixture {
        pool,
        vietnamese,
        cafe,
        restaurants,
    }
}

pub async fn get(router: &Router, uri: &str) -> (u16, Value) {
    let resp = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn ids(body: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    ids
}

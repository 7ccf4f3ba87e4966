use std::collections::BTreeSet;

use crate::database::restaurant_repo::ListFilterBinds;
use crate::error::{AppError, ValidationErrors};

/// Decoded query string, in order of appearance. Repeated keys are kept.
pub type QueryPairs = Vec<(String, String)>;

pub fn parse_query_pairs(raw: Option<&str>) -> Result<QueryPairs, AppError> {
    serde_urlencoded::from_str::<QueryPairs>(raw.unwrap_or("")).map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.add("query", "The query string could not be decoded.");
        AppError::Validation(errors)
    })
}

const SW_LAT_KEYS: &[&str] = &["sw_lat", "southWestLat"];
const SW_LNG_KEYS: &[&str] = &["sw_lng", "southWestLng"];
const NE_LAT_KEYS: &[&str] = &["ne_lat", "northEastLat"];
const NE_LNG_KEYS: &[&str] = &["ne_lng", "northEastLng"];
const CATEGORY_KEYS: &[&str] = &["category_id", "category_id[]", "categoryIds", "categoryIds[]"];
const SEARCH_KEYS: &[&str] = &["search", "searchText"];
const PRICE_KEYS: &[&str] = &["price_range", "price_range[]"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south_west_lat: f64,
    pub south_west_lng: f64,
    pub north_east_lat: f64,
    pub north_east_lng: f64,
}

impl BoundingBox {
    /// Inclusive on every edge, like SQL `BETWEEN`.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.south_west_lat..=self.north_east_lat).contains(&lat)
            && (self.south_west_lng..=self.north_east_lng).contains(&lng)
    }

    /// `(min_lat, max_lat, min_lng, max_lng)`
    pub fn as_ranges(&self) -> (f64, f64, f64, f64) {
        (
            self.south_west_lat,
            self.north_east_lat,
            self.south_west_lng,
            self.north_east_lng,
        )
    }
}

/// Validated Geo Filter Query input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerFilter {
    pub bounds: Option<BoundingBox>,
    pub category_ids: BTreeSet<i64>,
    pub search: Option<String>,
}

impl MarkerFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut errors = ValidationErrors::new();

        let sw_lat = parse_coordinate(pairs, SW_LAT_KEYS, 90.0, &mut errors);
        let sw_lng = parse_coordinate(pairs, SW_LNG_KEYS, 180.0, &mut errors);
        let ne_lat = parse_coordinate(pairs, NE_LAT_KEYS, 90.0, &mut errors);
        let ne_lng = parse_coordinate(pairs, NE_LNG_KEYS, 180.0, &mut errors);

        // All four or nothing: a partial box never filters.
        let bounds = match (sw_lat, sw_lng, ne_lat, ne_lng) {
            (Some(sw_lat), Some(sw_lng), Some(ne_lat), Some(ne_lng)) => {
                if sw_lat > ne_lat {
                    errors.add("sw_lat", "The sw_lat field must not be greater than ne_lat.");
                }
                if sw_lng > ne_lng {
                    errors.add("sw_lng", "The sw_lng field must not be greater than ne_lng.");
                }
                Some(BoundingBox {
                    south_west_lat: sw_lat,
                    south_west_lng: sw_lng,
                    north_east_lat: ne_lat,
                    north_east_lng: ne_lng,
                })
            }
            _ => None,
        };

        let category_ids = parse_id_set(pairs, CATEGORY_KEYS, "category_id", &mut errors);
        let search = single(pairs, SEARCH_KEYS).map(str::to_string);

        errors.into_result(Self {
            bounds,
            category_ids,
            search,
        })
    }

    pub fn category_ids_json(&self) -> Option<String> {
        ids_json(&self.category_ids)
    }

    /// Case-insensitive substring match on the name; always true without a
    /// search term.
    pub fn matches_search(&self, name: &str) -> bool {
        match self.search.as_deref() {
            Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }

    /// The full predicate the map query applies to an active, non-deleted
    /// restaurant.
    pub fn matches(&self, lat: f64, lng: f64, category_id: i64, name: &str) -> bool {
        self.bounds.map_or(true, |b| b.contains(lat, lng))
            && (self.category_ids.is_empty() || self.category_ids.contains(&category_id))
            && self.matches_search(name)
    }
}

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;

/// Validated input of the paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub search: Option<String>,
    pub category_ids: BTreeSet<i64>,
    pub price_ranges: BTreeSet<i64>,
    pub is_featured: Option<bool>,
    pub page: i64,
    pub per_page: i64,
}

impl ListFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut errors = ValidationErrors::new();

        let page = parse_integer(pairs, &["page"], "page", &mut errors)
            .unwrap_or(1)
            .max(1);
        let per_page = parse_integer(pairs, &["per_page", "perPage"], "per_page", &mut errors)
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        if (page - 1).checked_mul(per_page).is_none() {
            errors.add("page", "The page field is too large.");
        }

        let category_ids = parse_id_set(pairs, CATEGORY_KEYS, "category_id", &mut errors);
        let price_ranges = parse_id_set(pairs, PRICE_KEYS, "price_range", &mut errors);
        if price_ranges.iter().any(|p| !(1..=4).contains(p)) {
            errors.add("price_range", "The price_range field must be between 1 and 4.");
        }

        let is_featured = match single(pairs, &["is_featured", "isFeatured"]) {
            None => None,
            Some(raw) => match parse_bool(raw) {
                Some(v) => Some(v),
                None => {
                    errors.add("is_featured", "The is_featured field must be true or false.");
                    None
                }
            },
        };

        errors.into_result(Self {
            search: single(pairs, SEARCH_KEYS).map(str::to_string),
            category_ids,
            price_ranges,
            is_featured,
            page,
            per_page,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn to_binds(&self) -> ListFilterBinds {
        ListFilterBinds {
            q_like: self.search.as_deref().map(like_pattern).unwrap_or_default(),
            category_ids_json: ids_json(&self.category_ids),
            price_ranges_json: ids_json(&self.price_ranges),
            is_featured: self.is_featured,
        }
    }
}

/// Lowercased `%term%` with LIKE wildcards escaped by `\`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.trim().to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn ids_json(ids: &BTreeSet<i64>) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    serde_json::to_string(ids).ok()
}

/// Every non-empty value for any of `keys`, comma separated values split.
fn values<'a>(pairs: &'a [(String, String)], keys: &'a [&str]) -> impl Iterator<Item = &'a str> {
    pairs
        .iter()
        .filter(move |(k, _)| keys.contains(&k.as_str()))
        .flat_map(|(_, v)| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Last non-empty value for any of `keys`.
fn single<'a>(pairs: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| keys.contains(&k.as_str()))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .last()
}

fn parse_coordinate(
    pairs: &[(String, String)],
    keys: &[&str],
    limit: f64,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    let field = keys[0];
    let raw = single(pairs, keys)?;
    match raw.parse::<f64>() {
        Ok(v) if !v.is_finite() => {
            errors.add(field, format!("The {field} field must be a number."));
            None
        }
        Ok(v) if v.abs() > limit => {
            errors.add(
                field,
                format!("The {field} field must be between -{limit} and {limit}."),
            );
            None
        }
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("The {field} field must be a number."));
            None
        }
    }
}

fn parse_integer(
    pairs: &[(String, String)],
    keys: &[&str],
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<i64> {
    let raw = single(pairs, keys)?;
    match raw.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("The {field} field must be an integer."));
            None
        }
    }
}

fn parse_id_set(
    pairs: &[(String, String)],
    keys: &[&str],
    field: &str,
    errors: &mut ValidationErrors,
) -> BTreeSet<i64> {
    let mut ids = BTreeSet::new();
    for raw in values(pairs, keys) {
        match raw.parse::<i64>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => errors.add(field, format!("The {field} field must contain integers.")),
        }
    }
    ids
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

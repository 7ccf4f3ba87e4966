//! Restaurant directory: a public JSON API over a SQLite catalogue plus the
//! client-side map pipeline (viewport refresh, marker clustering, card list
//! and detail overlay) that consumes it.

pub mod config;
pub mod database;
pub mod error;
pub mod map;
pub mod models;
pub mod services;
pub mod web;

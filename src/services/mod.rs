pub mod category_service;
pub mod image_service;
pub mod restaurant_filters;
pub mod restaurant_service;
pub mod seed_service;

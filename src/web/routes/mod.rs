pub mod categories;
pub mod restaurants;

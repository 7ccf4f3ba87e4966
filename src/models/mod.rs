pub mod categories;
pub mod restaurant_images;
pub mod restaurants;

pub use categories::CategoryRow;
pub use restaurant_images::RestaurantImageRow;
pub use restaurants::{RestaurantListRow, RestaurantMarkerRow, RestaurantRow};

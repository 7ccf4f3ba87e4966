//! Spherical Web-Mercator, the projection slippy-map widgets render in.

use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 256.0;
/// Latitude at which the square Mercator world ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// World pixel coordinates: origin top-left, y grows southwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Width (and height) of the whole world in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

pub fn project(position: LatLng, zoom: f64) -> Point {
    let lat = position.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = lat.to_radians().sin();
    let x = (position.lng + 180.0) / 360.0;
    let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI);
    let size = world_size(zoom);
    Point {
        x: x * size,
        y: y * size,
    }
}

pub fn unproject(point: Point, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let x = point.x / size;
    let y = point.y / size;
    let n = PI - 2.0 * PI * y;
    LatLng {
        lat: n.sinh().atan().to_degrees(),
        lng: x * 360.0 - 180.0,
    }
}

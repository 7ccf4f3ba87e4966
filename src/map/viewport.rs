use serde::{Deserialize, Serialize};

use crate::map::projection::{self, LatLng, Point};

/// The lat/lng rectangle visible on the map. Always derived from the live
/// widget, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub south_west_lat: f64,
    pub south_west_lng: f64,
    pub north_east_lat: f64,
    pub north_east_lng: f64,
}

/// Where the widget should look: center and zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(
        south_west_lat: f64,
        south_west_lng: f64,
        north_east_lat: f64,
        north_east_lng: f64,
    ) -> Self {
        Self {
            south_west_lat,
            south_west_lng,
            north_east_lat,
            north_east_lng,
        }
    }

    /// Smallest box holding every position, `None` for an empty input.
    pub fn enclosing<I: IntoIterator<Item = LatLng>>(positions: I) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut vp = Self::new(first.lat, first.lng, first.lat, first.lng);
        for p in iter {
            vp.south_west_lat = vp.south_west_lat.min(p.lat);
            vp.south_west_lng = vp.south_west_lng.min(p.lng);
            vp.north_east_lat = vp.north_east_lat.max(p.lat);
            vp.north_east_lng = vp.north_east_lng.max(p.lng);
        }
        Some(vp)
    }

    /// The box a `width` x `height` pixel widget shows around `center`.
    pub fn from_center(center: LatLng, zoom: f64, width: f64, height: f64) -> Self {
        let c = projection::project(center, zoom);
        let sw = projection::unproject(
            Point {
                x: c.x - width / 2.0,
                y: c.y + height / 2.0,
            },
            zoom,
        );
        let ne = projection::unproject(
            Point {
                x: c.x + width / 2.0,
                y: c.y - height / 2.0,
            },
            zoom,
        );
        Self::new(sw.lat, sw.lng, ne.lat, ne.lng)
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.south_west_lat..=self.north_east_lat).contains(&lat)
            && (self.south_west_lng..=self.north_east_lng).contains(&lng)
    }

    pub fn is_degenerate(&self) -> bool {
        self.south_west_lat == self.north_east_lat && self.south_west_lng == self.north_east_lng
    }

    pub fn center(&self) -> LatLng {
        let sw = projection::project(LatLng::new(self.south_west_lat, self.south_west_lng), 0.0);
        let ne = projection::project(LatLng::new(self.north_east_lat, self.north_east_lng), 0.0);
        projection::unproject(
            Point {
                x: (sw.x + ne.x) / 2.0,
                y: (sw.y + ne.y) / 2.0,
            },
            0.0,
        )
    }

    /// Box suitable for the marker query: latitudes clamped, longitudes
    /// wrapped into [-180, 180]. A view wider than the world, or one that
    /// straddles the antimeridian, queries the full longitude range.
    pub fn to_query_box(&self) -> Viewport {
        let south = self.south_west_lat.clamp(-90.0, 90.0);
        let north = self.north_east_lat.clamp(-90.0, 90.0);

        let span = self.north_east_lng - self.south_west_lng;
        let (west, east) = if span >= 360.0 {
            (-180.0, 180.0)
        } else {
            let w = wrap_lng(self.south_west_lng);
            let e = wrap_lng(self.north_east_lng);
            if w <= e {
                (w, e)
            } else {
                (-180.0, 180.0)
            }
        };

        Viewport::new(south.min(north), west, south.max(north), east)
    }

    /// Center and the largest integer zoom (capped at `max_zoom`) at which
    /// the whole box fits a `width` x `height` widget.
    pub fn fit(&self, width: f64, height: f64, max_zoom: f64) -> MapView {
        let sw = projection::project(LatLng::new(self.south_west_lat, self.south_west_lng), 0.0);
        let ne = projection::project(LatLng::new(self.north_east_lat, self.north_east_lng), 0.0);
        let dx = (ne.x - sw.x).abs();
        let dy = (sw.y - ne.y).abs();

        let zoom_x = if dx > 0.0 { (width / dx).log2() } else { f64::INFINITY };
        let zoom_y = if dy > 0.0 { (height / dy).log2() } else { f64::INFINITY };
        let zoom = zoom_x.min(zoom_y).floor().clamp(0.0, max_zoom);

        MapView {
            center: self.center(),
            zoom,
        }
    }
}

fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

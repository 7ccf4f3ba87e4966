use tracing::{debug, warn};

use crate::map::api_client::ClientError;
use crate::services::restaurant_service::RestaurantDetailView;

/// Identifies one detail fetch. Only the newest ticket may resolve the
/// overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailErrorKind {
    NotFound,
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum OverlayState {
    #[default]
    Closed,
    Loading {
        slug: String,
    },
    Shown(Box<RestaurantDetailView>),
    Error {
        slug: String,
        kind: DetailErrorKind,
    },
}

impl OverlayState {
    /// The highlighted restaurant, whatever phase its panel is in.
    pub fn selected_slug(&self) -> Option<&str> {
        match self {
            OverlayState::Closed => None,
            OverlayState::Loading { slug } | OverlayState::Error { slug, .. } => Some(slug),
            OverlayState::Shown(detail) => Some(&detail.slug),
        }
    }
}

/// The detail panel opened by clicking a pin or a card.
#[derive(Debug, Default)]
pub struct SelectionOverlay {
    state: OverlayState,
    issued: u64,
    current: Option<SelectionTicket>,
}

impl SelectionOverlay {
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn selected_slug(&self) -> Option<&str> {
        self.state.selected_slug()
    }

    /// Starts loading `slug`. Returns `None` when that restaurant is
    /// already loading or shown.
    pub fn select(&mut self, slug: &str) -> Option<SelectionTicket> {
        match &self.state {
            OverlayState::Loading { slug: s } if s == slug => return None,
            OverlayState::Shown(d) if d.slug == slug => return None,
            _ => {}
        }
        self.issued += 1;
        let ticket = SelectionTicket(self.issued);
        self.current = Some(ticket);
        self.state = OverlayState::Loading { slug: slug.to_string() };
        Some(ticket)
    }

    /// Applies a fetch result. Results for an older selection, or arriving
    /// after the panel was closed, are ignored.
    pub fn resolve(
        &mut self,
        ticket: SelectionTicket,
        result: Result<RestaurantDetailView, ClientError>,
    ) -> bool {
        if self.current != Some(ticket) {
            debug!("Ignoring detail response for superseded selection {:?}", ticket);
            return false;
        }
        let OverlayState::Loading { slug } = &self.state else {
            return false;
        };
        self.state = match result {
            Ok(detail) => OverlayState::Shown(Box::new(detail)),
            Err(ClientError::NotFound) => OverlayState::Error {
                slug: slug.clone(),
                kind: DetailErrorKind::NotFound,
            },
            Err(e) => {
                warn!("Could not load restaurant {}: {}", slug, e);
                OverlayState::Error {
                    slug: slug.clone(),
                    kind: DetailErrorKind::Unavailable,
                }
            }
        };
        self.current = None;
        true
    }

    pub fn close(&mut self) {
        self.state = OverlayState::Closed;
        self.current = None;
    }
}

#[cfg(test)]
pub(crate) fn detail(slug: &str) -> RestaurantDetailView {
    RestaurantDetailView {
        id: 1,
        name: "Phở Hùng".into(),
        slug: slug.into(),
        description: None,
        address: "3 Pasteur".into(),
        city: Some("Ho Chi Minh City".into()),
        district: Some("District 1".into()),
        latitude: 10.77564,
        longitude: 106.70508,
        phone: None,
        website: None,
        email: None,
        opening_hours: None,
        price_range: 1,
        price_range_label: "$".into(),
        capacity: None,
        tables: None,
        rating: 4.5,
        rating_count: 812,
        is_featured: false,
        is_active: true,
        category: None,
        images: Vec::new(),
        created_at: "2024-01-01 00:00:00".into(),
        updated_at: "2024-01-01 00:00:00".into(),
    }
}

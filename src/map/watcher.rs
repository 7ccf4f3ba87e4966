//! Keeps the marker set in step with the viewport and filters.
//!
//! Viewport changes are debounced: every settle event replaces the pending
//! one, and a request goes out only after the view has been quiet for the
//! debounce window. Filter changes go out at once. Every request carries a
//! sequence number and only the response to the newest one is applied, so
//! a slow early response can never overwrite a fresh one.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::map::api_client::ClientError;
use crate::map::markers::{MarkerSet, RestaurantMarker};
use crate::map::viewport::Viewport;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// User-chosen filters. An empty category set or blank search means "no
/// filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapFilters {
    pub category_ids: BTreeSet<i64>,
    pub search: String,
}

impl MapFilters {
    pub fn toggle_category(&mut self, id: i64) {
        if !self.category_ids.remove(&id) {
            self.category_ids.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.category_ids.clear();
        self.search.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.category_ids.is_empty() && self.search.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerQuery {
    pub bounds: Option<Viewport>,
    pub category_ids: BTreeSet<i64>,
    pub search: Option<String>,
}

impl MarkerQuery {
    pub fn new(viewport: Option<&Viewport>, filters: &MapFilters) -> Self {
        let search = filters.search.trim();
        Self {
            bounds: viewport.map(Viewport::to_query_box),
            category_ids: filters.category_ids.clone(),
            search: (!search.is_empty()).then(|| search.to_string()),
        }
    }

    /// Query-string pairs for the map endpoint.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(b) = &self.bounds {
            pairs.push(("sw_lat", b.south_west_lat.to_string()));
            pairs.push(("sw_lng", b.south_west_lng.to_string()));
            pairs.push(("ne_lat", b.north_east_lat.to_string()));
            pairs.push(("ne_lng", b.north_east_lng.to_string()));
        }
        for id in &self.category_ids {
            pairs.push(("category_id[]", id.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRequest {
    pub seq: u64,
    pub query: MarkerQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer request was issued meanwhile; the response was dropped.
    Superseded,
    /// The fetch failed; the previous markers stay on screen.
    Failed,
}

/// Single-slot debounce timer. Time is passed in, never read.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Replaces whatever was pending and restarts the window.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.window, value));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending value once its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((at, _)) if *at <= now => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }
}

#[derive(Debug)]
pub struct ViewportWatcher {
    filters: MapFilters,
    debounce: Debouncer<Viewport>,
    viewport: Option<Viewport>,
    next_seq: u64,
    latest_issued: Option<u64>,
    applied_seq: Option<u64>,
    markers: MarkerSet,
}

impl ViewportWatcher {
    pub fn new(filters: MapFilters, debounce: Duration) -> Self {
        Self {
            filters,
            debounce: Debouncer::new(debounce),
            viewport: None,
            next_seq: 0,
            latest_issued: None,
            applied_seq: None,
            markers: MarkerSet::default(),
        }
    }

    /// The map became visible: fetch right away.
    pub fn mount(&mut self, viewport: Viewport) -> MarkerRequest {
        self.debounce.cancel();
        self.issue(viewport)
    }

    /// The view stopped moving. Nothing is sent until [`Self::poll`] finds
    /// the debounce window elapsed.
    pub fn on_view_settled(&mut self, viewport: Viewport, now: Instant) {
        self.debounce.schedule(viewport, now);
    }

    /// New filters are fetched immediately against the most recent view.
    /// Returns `None` when nothing changed or no view is known yet.
    pub fn set_filters(&mut self, filters: MapFilters) -> Option<MarkerRequest> {
        if filters == self.filters {
            return None;
        }
        self.filters = filters;
        let viewport = self.debounce.cancel().or(self.viewport)?;
        Some(self.issue(viewport))
    }

    pub fn poll(&mut self, now: Instant) -> Option<MarkerRequest> {
        let viewport = self.debounce.take_due(now)?;
        Some(self.issue(viewport))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn on_response(
        &mut self,
        seq: u64,
        result: Result<Vec<RestaurantMarker>, ClientError>,
    ) -> RefreshOutcome {
        if self.latest_issued != Some(seq) {
            debug!(
                "🗺️ Dropping stale marker response seq={} (latest={:?})",
                seq, self.latest_issued
            );
            return RefreshOutcome::Superseded;
        }
        match result {
            Ok(markers) => {
                debug!("🗺️ Applied {} markers for seq={}", markers.len(), seq);
                self.markers = MarkerSet::from(markers);
                self.applied_seq = Some(seq);
                RefreshOutcome::Applied
            }
            Err(e) => {
                warn!("🗺️ Marker fetch seq={} failed, keeping current markers: {}", seq, e);
                RefreshOutcome::Failed
            }
        }
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn filters(&self) -> &MapFilters {
        &self.filters
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn applied_seq(&self) -> Option<u64> {
        self.applied_seq
    }

    pub fn latest_issued(&self) -> Option<u64> {
        self.latest_issued
    }

    fn issue(&mut self, viewport: Viewport) -> MarkerRequest {
        self.next_seq += 1;
        self.latest_issued = Some(self.next_seq);
        self.viewport = Some(viewport);
        MarkerRequest {
            seq: self.next_seq,
            query: MarkerQuery::new(Some(&viewport), &self.filters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::markers::marker;

    fn vp(lat: f64) -> Viewport {
        Viewport::new(lat, 106.6, lat + 0.1, 106.8)
    }

    #[test]
    fn burst_of_moves_issues_one_request_for_the_last_view() {
        let t0 = Instant::now();
        let mut w = ViewportWatcher::new(MapFilters::default(), DEFAULT_DEBOUNCE);
        w.mount(vp(10.0));

        w.on_view_settled(vp(10.1), t0);
        w.on_view_settled(vp(10.2), t0 + Duration::from_millis(100));
        w.on_view_settled(vp(10.3), t0 + Duration::from_millis(250));

        assert!(w.poll(t0 + Duration::from_millis(400)).is_none());
        assert_eq!(w.next_deadline(), Some(t0 + Duration::from_millis(550)));

        let req = w.poll(t0 + Duration::from_millis(550)).unwrap();
        assert_eq!(req.seq, 2);
        assert_eq!(req.query.bounds, Some(vp(10.3)));
        assert!(w.poll(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn only_the_latest_response_is_applied() {
        let t0 = Instant::now();
        let mut w = ViewportWatcher::new(MapFilters::default(), DEFAULT_DEBOUNCE);
        let first = w.mount(vp(10.0));
        w.on_view_settled(vp(10.5), t0);
        let second = w.poll(t0 + DEFAULT_DEBOUNCE).unwrap();

        assert_eq!(
            w.on_response(second.seq, Ok(vec![marker(2, 10.55, 106.7)])),
            RefreshOutcome::Applied
        );
        assert_eq!(
            w.on_response(first.seq, Ok(vec![marker(1, 10.05, 106.7)])),
            RefreshOutcome::Superseded
        );
        assert_eq!(w.markers().ids(), BTreeSet::from([2]));
        assert_eq!(w.applied_seq(), Some(second.seq));
    }

    #[test]
    fn failures_keep_previous_markers() {
        let mut w = ViewportWatcher::new(MapFilters::default(), DEFAULT_DEBOUNCE);
        let first = w.mount(vp(10.0));
        w.on_response(first.seq, Ok(vec![marker(1, 10.05, 106.7)]));

        let mut filters = MapFilters::default();
        filters.toggle_category(5);
        let second = w.set_filters(filters).unwrap();
        assert_eq!(
            w.on_response(second.seq, Err(ClientError::Status(503))),
            RefreshOutcome::Failed
        );
        assert_eq!(w.markers().ids(), BTreeSet::from([1]));
        assert_eq!(w.applied_seq(), Some(first.seq));
    }

    #[test]
    fn filter_change_fires_immediately_with_the_newest_view() {
        let t0 = Instant::now();
        let mut w = ViewportWatcher::new(MapFilters::default(), DEFAULT_DEBOUNCE);
        assert!(w
            .set_filters(MapFilters {
                search: "pho".into(),
                ..Default::default()
            })
            .is_none());

        w.mount(vp(10.0));
        w.on_view_settled(vp(11.0), t0);
        let req = w
            .set_filters(MapFilters {
                category_ids: [3, 1].into(),
                search: "  bún ".into(),
            })
            .unwrap();
        assert_eq!(req.query.bounds, Some(vp(11.0)));
        assert_eq!(req.query.search.as_deref(), Some("bún"));
        assert!(w.next_deadline().is_none());

        let same = w.filters().clone();
        assert!(w.set_filters(same).is_none());
    }

    #[test]
    fn query_pairs_use_short_names_and_bracketed_categories() {
        let q = MarkerQuery::new(
            Some(&Viewport::new(10.7, 106.6, 10.8, 106.8)),
            &MapFilters {
                category_ids: [5, 2].into(),
                search: String::new(),
            },
        );
        let pairs = q.to_query_pairs();
        assert_eq!(pairs[0], ("sw_lat", "10.7".to_string()));
        assert_eq!(pairs[3], ("ne_lng", "106.8".to_string()));
        assert_eq!(pairs[4], ("category_id[]", "2".to_string()));
        assert_eq!(pairs[5], ("category_id[]", "5".to_string()));
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn toggling_a_category_twice_clears_it() {
        let mut f = MapFilters::default();
        f.toggle_category(4);
        assert!(f.category_ids.contains(&4));
        f.toggle_category(4);
        assert!(f.is_empty());
    }
}

//! Drives one map screen: owns the watcher and the selection overlay, runs
//! fetches in the background and publishes a snapshot after every change.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::map::api_client::{ClientError, MapBackend};
use crate::map::card_list::{self, CardItem};
use crate::map::markers::{Category, CategoryTable, MarkerSet, RestaurantMarker};
use crate::map::selection::{OverlayState, SelectionOverlay, SelectionTicket};
use crate::map::viewport::Viewport;
use crate::map::watcher::{
    MapFilters, MarkerRequest, RefreshOutcome, ViewportWatcher, DEFAULT_DEBOUNCE,
};
use crate::services::restaurant_service::RestaurantDetailView;

#[derive(Debug, Clone)]
pub enum MapEvent {
    /// The user finished panning or zooming.
    ViewSettled(Viewport),
    FiltersChanged(MapFilters),
    /// A pin or card was clicked.
    Select(String),
    CloseDetail,
}

#[derive(Debug, Clone, Default)]
pub struct MapSnapshot {
    pub markers: MarkerSet,
    pub cards: Vec<CardItem>,
    pub categories: Arc<CategoryTable>,
    pub overlay: OverlayState,
    /// The restaurant whose pin is drawn as selected.
    pub selected_slug: Option<String>,
    pub applied_seq: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub initial_viewport: Viewport,
    pub filters: MapFilters,
    pub debounce: Duration,
}

impl SessionOptions {
    pub fn new(initial_viewport: Viewport) -> Self {
        Self {
            initial_viewport,
            filters: MapFilters::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Error)]
#[error("map session has stopped")]
pub struct SessionClosed;

pub struct MapHandle {
    events: mpsc::Sender<MapEvent>,
    snapshots: watch::Receiver<MapSnapshot>,
    task: JoinHandle<()>,
}

impl MapHandle {
    pub async fn send(&self, event: MapEvent) -> Result<(), SessionClosed> {
        self.events.send(event).await.map_err(|_| SessionClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<MapSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stops the session once queued events are handled.
    pub async fn shutdown(self) {
        drop(self.events);
        if let Err(e) = self.task.await {
            warn!("🗺️ Map session ended abnormally: {}", e);
        }
    }
}

enum Completed {
    Markers {
        seq: u64,
        result: Result<Vec<RestaurantMarker>, ClientError>,
    },
    Detail {
        ticket: SelectionTicket,
        result: Result<RestaurantDetailView, ClientError>,
    },
    Categories(Result<Vec<Category>, ClientError>),
}

pub fn spawn_session<B: MapBackend>(backend: Arc<B>, options: SessionOptions) -> MapHandle {
    let (events_tx, events_rx) = mpsc::channel(64);
    let (snap_tx, snap_rx) = watch::channel(MapSnapshot::default());
    let task = tokio::spawn(run(backend, options, events_rx, snap_tx));
    MapHandle {
        events: events_tx,
        snapshots: snap_rx,
        task,
    }
}

struct Session<B> {
    backend: Arc<B>,
    watcher: ViewportWatcher,
    overlay: SelectionOverlay,
    categories: Arc<CategoryTable>,
    cards: Vec<CardItem>,
    done: mpsc::UnboundedSender<Completed>,
}

impl<B: MapBackend> Session<B> {
    fn fetch_markers(&self, request: MarkerRequest) {
        let backend = Arc::clone(&self.backend);
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = backend.fetch_markers(&request.query).await;
            let _ = done.send(Completed::Markers {
                seq: request.seq,
                result,
            });
        });
    }

    fn fetch_categories(&self) {
        let backend = Arc::clone(&self.backend);
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = backend.fetch_categories().await;
            let _ = done.send(Completed::Categories(result));
        });
    }

    fn fetch_detail(&self, slug: String, ticket: SelectionTicket) {
        let backend = Arc::clone(&self.backend);
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = backend.fetch_detail(&slug).await;
            let _ = done.send(Completed::Detail { ticket, result });
        });
    }

    fn handle_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::ViewSettled(viewport) => self.watcher.on_view_settled(viewport, now()),
            MapEvent::FiltersChanged(filters) => {
                if let Some(request) = self.watcher.set_filters(filters) {
                    self.fetch_markers(request);
                }
            }
            MapEvent::Select(slug) => {
                if let Some(ticket) = self.overlay.select(&slug) {
                    self.fetch_detail(slug, ticket);
                }
            }
            MapEvent::CloseDetail => self.overlay.close(),
        }
    }

    fn handle_completed(&mut self, completed: Completed) {
        match completed {
            Completed::Markers { seq, result } => {
                if self.watcher.on_response(seq, result) == RefreshOutcome::Applied {
                    self.cards = card_list::project_cards(self.watcher.markers(), &self.categories);
                }
            }
            Completed::Detail { ticket, result } => {
                self.overlay.resolve(ticket, result);
            }
            Completed::Categories(Ok(list)) => {
                self.categories = Arc::new(CategoryTable::new(list));
                self.cards = card_list::project_cards(self.watcher.markers(), &self.categories);
            }
            Completed::Categories(Err(e)) => {
                warn!("🗺️ Could not load categories, pins use default colors: {}", e);
            }
        }
    }

    fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            markers: self.watcher.markers().clone(),
            cards: self.cards.clone(),
            categories: Arc::clone(&self.categories),
            overlay: self.overlay.state().clone(),
            selected_slug: self.overlay.selected_slug().map(str::to_string),
            applied_seq: self.watcher.applied_seq(),
        }
    }
}

async fn run<B: MapBackend>(
    backend: Arc<B>,
    options: SessionOptions,
    mut events: mpsc::Receiver<MapEvent>,
    snapshots: watch::Sender<MapSnapshot>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut session = Session {
        backend,
        watcher: ViewportWatcher::new(options.filters, options.debounce),
        overlay: SelectionOverlay::default(),
        categories: Arc::new(CategoryTable::default()),
        cards: Vec::new(),
        done: done_tx,
    };

    let first = session.watcher.mount(options.initial_viewport);
    session.fetch_markers(first);
    session.fetch_categories();
    snapshots.send_replace(session.snapshot());
    info!("🗺️ Map session started");

    loop {
        let deadline = session.watcher.next_deadline();
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                session.handle_event(event);
            }
            Some(completed) = done_rx.recv() => session.handle_completed(completed),
            _ = sleep_until(deadline) => {
                if let Some(request) = session.watcher.poll(now()) {
                    session.fetch_markers(request);
                }
            }
        }
        snapshots.send_replace(session.snapshot());
    }

    info!("🗺️ Map session stopped");
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::map::markers::{marker, Category};
    use crate::map::selection::{detail, DetailErrorKind};
    use crate::map::watcher::MarkerQuery;

    /// Answers like the server would, after a scripted delay per call.
    struct FakeBackend {
        world: Vec<RestaurantMarker>,
        delays: Mutex<Vec<Duration>>,
        marker_calls: AtomicUsize,
        queries: Mutex<Vec<MarkerQuery>>,
        categories_delay: Duration,
    }

    impl FakeBackend {
        fn new(delays_ms: &[u64]) -> Arc<Self> {
            Self::with_categories_delay(delays_ms, Duration::ZERO)
        }

        fn with_categories_delay(delays_ms: &[u64], categories_delay: Duration) -> Arc<Self> {
            let mut featured = marker(3, 10.7800, 106.6950);
            featured.category_id = Some(2);
            Arc::new(Self {
                world: vec![
                    marker(1, 10.7756, 106.7019),
                    marker(2, 10.7769, 106.7009),
                    featured,
                    marker(4, 21.0285, 105.8542),
                ],
                delays: Mutex::new(
                    delays_ms.iter().rev().map(|ms| Duration::from_millis(*ms)).collect(),
                ),
                marker_calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                categories_delay,
            })
        }
    }

    impl MapBackend for FakeBackend {
        fn fetch_markers(
            &self,
            query: &MarkerQuery,
        ) -> impl std::future::Future<Output = Result<Vec<RestaurantMarker>, ClientError>> + Send {
            self.marker_calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            let delay = self.delays.lock().unwrap().pop().unwrap_or(Duration::from_millis(10));
            let hits: Vec<RestaurantMarker> = self
                .world
                .iter()
                .filter(|m| query.bounds.map_or(true, |b| b.contains(m.latitude, m.longitude)))
                .filter(|m| {
                    query.category_ids.is_empty()
                        || m.category_id.is_some_and(|c| query.category_ids.contains(&c))
                })
                .cloned()
                .collect();
            async move {
                tokio::time::sleep(delay).await;
                Ok(hits)
            }
        }

        async fn fetch_categories(&self) -> Result<Vec<Category>, ClientError> {
            tokio::time::sleep(self.categories_delay).await;
            Ok(vec![Category {
                id: 1,
                name: "Vietnamese".into(),
                slug: "vietnamese".into(),
                icon: None,
                color: Some("#38A169".into()),
            }])
        }

        async fn fetch_detail(&self, slug: &str) -> Result<RestaurantDetailView, ClientError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if slug == "does-not-exist" {
                return Err(ClientError::NotFound);
            }
            Ok(detail(slug))
        }
    }

    fn district_one() -> Viewport {
        Viewport::new(10.76, 106.68, 10.79, 106.71)
    }

    fn hanoi() -> Viewport {
        Viewport::new(21.0, 105.8, 21.1, 105.9)
    }

    #[tokio::test(start_paused = true)]
    async fn mount_loads_markers_and_cards_together() {
        let backend = FakeBackend::new(&[]);
        let handle = spawn_session(Arc::clone(&backend), SessionOptions::new(district_one()));
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.applied_seq == Some(1) && !s.categories.is_empty())
            .await
            .unwrap();
        let snap = handle.snapshot();
        assert_eq!(snap.markers.ids(), BTreeSet::from([1, 2, 3]));
        assert_eq!(card_list::card_ids(&snap.cards), snap.markers.ids());
        assert_eq!(snap.categories.len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_categories_do_not_hold_up_the_first_markers() {
        let backend = FakeBackend::with_categories_delay(&[], Duration::from_secs(30));
        let started = tokio::time::Instant::now();
        let handle = spawn_session(Arc::clone(&backend), SessionOptions::new(district_one()));
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.applied_seq == Some(1)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        let snap = handle.snapshot();
        assert!(snap.categories.is_empty());
        assert!(snap.cards.iter().all(|c| c.badge.is_none()));

        // events are served while categories are still loading
        handle.send(MapEvent::Select("restaurant-1".into())).await.unwrap();
        rx.wait_for(|s| matches!(s.overlay, OverlayState::Shown(_))).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        rx.wait_for(|s| !s.categories.is_empty()).await.unwrap();
        let snap = handle.snapshot();
        assert_eq!(snap.applied_seq, Some(1));
        let card = snap.cards.iter().find(|c| c.id == 1).unwrap();
        assert_eq!(card.badge.as_ref().map(|b| b.name.as_str()), Some("Vietnamese"));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_moves_are_debounced_into_one_fetch() {
        let backend = FakeBackend::new(&[]);
        let handle = spawn_session(Arc::clone(&backend), SessionOptions::new(district_one()));
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.applied_seq == Some(1)).await.unwrap();

        for lat in [10.0, 10.2, 10.4, 10.6] {
            handle
                .send(MapEvent::ViewSettled(Viewport::new(lat, 106.6, lat + 0.3, 106.8)))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        handle.send(MapEvent::ViewSettled(hanoi())).await.unwrap();
        rx.wait_for(|s| s.applied_seq == Some(2)).await.unwrap();

        assert_eq!(backend.marker_calls.load(Ordering::SeqCst), 2);
        assert_eq!(handle.snapshot().markers.ids(), BTreeSet::from([4]));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_response_never_overwrites_newer_markers() {
        // mount fast, first move slow, second move fast
        let backend = FakeBackend::new(&[10, 2_000, 10]);
        let handle = spawn_session(Arc::clone(&backend), SessionOptions::new(district_one()));
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.applied_seq == Some(1)).await.unwrap();

        handle.send(MapEvent::ViewSettled(district_one())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.send(MapEvent::ViewSettled(hanoi())).await.unwrap();
        rx.wait_for(|s| s.applied_seq == Some(3)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.applied_seq, Some(3));
        assert_eq!(snap.markers.ids(), BTreeSet::from([4]));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_refetches_without_waiting() {
        let backend = FakeBackend::new(&[]);
        let handle = spawn_session(Arc::clone(&backend), SessionOptions::new(district_one()));
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.applied_seq == Some(1)).await.unwrap();

        let filters = MapFilters {
            category_ids: BTreeSet::from([2]),
            search: String::new(),
        };
        handle.send(MapEvent::FiltersChanged(filters)).await.unwrap();
        rx.wait_for(|s| s.applied_seq == Some(2)).await.unwrap();

        assert_eq!(handle.snapshot().markers.ids(), BTreeSet::from([3]));
        let last = backend.queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.category_ids, BTreeSet::from([2]));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_missing_restaurant_shows_not_found() {
        let backend = FakeBackend::new(&[]);
        let handle = spawn_session(backend, SessionOptions::new(district_one()));
        let mut rx = handle.subscribe();

        handle.send(MapEvent::Select("does-not-exist".into())).await.unwrap();
        rx.wait_for(|s| matches!(s.overlay, OverlayState::Error { .. })).await.unwrap();
        assert_eq!(
            handle.snapshot().overlay,
            OverlayState::Error {
                slug: "does-not-exist".into(),
                kind: DetailErrorKind::NotFound
            }
        );

        handle.send(MapEvent::Select("restaurant-1".into())).await.unwrap();
        rx.wait_for(|s| s.selected_slug.as_deref() == Some("restaurant-1"))
            .await
            .unwrap();
        rx.wait_for(|s| matches!(s.overlay, OverlayState::Shown(_))).await.unwrap();
        assert_eq!(handle.snapshot().selected_slug.as_deref(), Some("restaurant-1"));
        handle.send(MapEvent::CloseDetail).await.unwrap();
        rx.wait_for(|s| s.overlay == OverlayState::Closed).await.unwrap();
        assert!(handle.snapshot().selected_slug.is_none());
        handle.shutdown().await;
    }
}

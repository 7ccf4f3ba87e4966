//! Screen-space marker clustering.
//!
//! Markers are projected to world pixels at the current zoom and two markers
//! closer than `radius_px` end up in the same cluster, transitively. This is
//! single-linkage grouping, so the output depends only on the marker set and
//! the zoom: re-running it is idempotent, and zooming in can only split
//! clusters apart.

use std::collections::HashMap;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::map::markers::RestaurantMarker;
use crate::map::projection::{self, LatLng};
use crate::map::viewport::{MapView, Viewport};

pub const DEFAULT_RADIUS_PX: f64 = 60.0;
pub const DEFAULT_MAX_ZOOM: f64 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    pub radius_px: f64,
    pub max_zoom: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius_px: DEFAULT_RADIUS_PX,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Ascending marker ids.
    pub member_ids: Vec<i64>,
    pub center: LatLng,
    pub bounds: Viewport,
}

/// What a click on a cluster glyph asks the map to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterAction {
    ZoomTo(MapView),
    /// Members cannot be separated by zooming; fan them out instead.
    Spiderfy(Vec<i64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=9 => SizeTier::Small,
            10..=99 => SizeTier::Medium,
            _ => SizeTier::Large,
        }
    }

    pub fn diameter_px(self) -> u32 {
        match self {
            SizeTier::Small => 40,
            SizeTier::Medium => 50,
            SizeTier::Large => 60,
        }
    }

    pub fn font_size_px(self) -> u32 {
        match self {
            SizeTier::Small => 14,
            SizeTier::Medium | SizeTier::Large => 16,
        }
    }

    pub fn font_weight(self) -> u32 {
        match self {
            SizeTier::Small => 600,
            SizeTier::Medium => 700,
            SizeTier::Large => 800,
        }
    }
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.member_ids.len() == 1
    }

    pub fn tier(&self) -> SizeTier {
        SizeTier::for_count(self.len())
    }

    /// Zoom in far enough to show every member, at least one level deeper
    /// than now. At max zoom, or when all members share one position,
    /// zooming cannot help.
    pub fn on_click(
        &self,
        zoom: f64,
        width: f64,
        height: f64,
        options: &ClusterOptions,
    ) -> ClusterAction {
        if zoom >= options.max_zoom || self.bounds.is_degenerate() {
            return ClusterAction::Spiderfy(self.member_ids.clone());
        }
        let fitted = self.bounds.fit(width, height, options.max_zoom);
        let target = fitted.zoom.max(zoom.floor() + 1.0).min(options.max_zoom);
        ClusterAction::ZoomTo(MapView {
            center: fitted.center,
            zoom: target,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // smaller index stays root
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

/// Groups markers at `zoom`. Clusters are ordered by their smallest member
/// id; the input order does not matter.
pub fn cluster_markers(
    markers: &[RestaurantMarker],
    zoom: f64,
    options: &ClusterOptions,
) -> Vec<Cluster> {
    if markers.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<&RestaurantMarker> = markers.iter().collect();
    order.sort_by_key(|m| m.id);

    let points: Vec<IndexedPoint> = order
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let p = projection::project(m.position(), zoom);
            IndexedPoint { idx, x: p.x, y: p.y }
        })
        .collect();
    let tree = RTree::bulk_load(points.clone());

    let radius_2 = options.radius_px * options.radius_px;
    let mut sets = DisjointSet::new(points.len());
    for p in &points {
        for near in tree.locate_within_distance([p.x, p.y], radius_2) {
            if near.idx > p.idx {
                sets.union(p.idx, near.idx);
            }
        }
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<&RestaurantMarker>> = Vec::new();
    for (idx, m) in order.iter().enumerate() {
        let root = sets.find(idx);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(*m);
    }

    groups.into_iter().filter_map(|members| build_cluster(&members)).collect()
}

fn build_cluster(members: &[&RestaurantMarker]) -> Option<Cluster> {
    let bounds = Viewport::enclosing(members.iter().map(|m| m.position()))?;
    let n = members.len() as f64;
    let lat = members.iter().map(|m| m.latitude).sum::<f64>() / n;
    let lng = members.iter().map(|m| m.longitude).sum::<f64>() / n;
    Some(Cluster {
        member_ids: members.iter().map(|m| m.id).collect(),
        center: LatLng::new(lat, lng),
        bounds,
    })
}

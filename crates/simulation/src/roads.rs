//! Road model: editor-authored polylines with a cached cumulative arc-length
//! table used for point-at-distance queries.

use bevy::prelude::*;

use crate::geometry::len_xz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub u32);

/// A road polyline on the XZ plane. `cum_len` caches cumulative arc length
/// per point (`cum_len[0] == 0`, same length as `pts`).
///
/// The table is NOT rebuilt automatically when `pts` changes; mutation sites
/// call [`Road::rebuild_cum`], and the derivation cascade runs
/// [`RoadNetwork::ensure_cum_lengths`] before any query as a backstop.
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub pts: Vec<Vec3>,
    pub cum_len: Vec<f32>,
}

impl Road {
    pub fn new(id: RoadId, pts: Vec<Vec3>) -> Self {
        Self {
            id,
            pts,
            cum_len: Vec::new(),
        }
    }

    /// Rebuild the cumulative arc-length table from the current points.
    pub fn rebuild_cum(&mut self) {
        self.cum_len.clear();
        self.cum_len.reserve(self.pts.len());
        if self.pts.is_empty() {
            return;
        }
        self.cum_len.push(0.0);
        let mut acc = 0.0;
        for i in 0..self.pts.len() - 1 {
            acc += len_xz(self.pts[i], self.pts[i + 1]);
            self.cum_len.push(acc);
        }
    }

    pub fn total_len(&self) -> f32 {
        self.cum_len.last().copied().unwrap_or(0.0)
    }

    /// Point and unit tangent at arc length `d`, clamped to `[0, total_len]`.
    /// Degenerate roads (fewer than two points, or a stale table) return the
    /// first point (or origin) with an X tangent.
    pub fn point_at(&self, d: f32) -> (Vec3, Vec3) {
        if self.pts.len() < 2 || self.cum_len.len() != self.pts.len() {
            let p = self.pts.first().copied().unwrap_or(Vec3::ZERO);
            return (p, Vec3::X);
        }
        let d = d.clamp(0.0, self.total_len());

        let mut i = 0;
        while i + 1 < self.cum_len.len() && self.cum_len[i + 1] < d {
            i += 1;
        }

        let a = self.pts[i];
        let b = self.pts[i + 1];
        let seg_len = len_xz(a, b).max(1e-6);
        let t = (d - self.cum_len[i]) / seg_len;

        let mut dir = b - a;
        dir.y = 0.0;
        let tangent = if dir.length_squared() > 1e-12 {
            dir.normalize()
        } else {
            Vec3::X
        };

        let mut p = a + (b - a) * t;
        p.y = 0.0;
        (p, tangent)
    }
}

/// All roads in the edited city. Ids are process-assigned and monotonically
/// increasing; they are never reused, so undo of a create followed by redo
/// restores the same id.
#[derive(Resource)]
pub struct RoadNetwork {
    pub roads: Vec<Road>,
    pub next_road_id: u32,
}

impl Default for RoadNetwork {
    fn default() -> Self {
        Self {
            roads: Vec::new(),
            next_road_id: 1,
        }
    }
}

impl RoadNetwork {
    pub fn allocate_id(&mut self) -> RoadId {
        let id = RoadId(self.next_road_id);
        self.next_road_id += 1;
        id
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.iter().find(|r| r.id == id)
    }

    pub fn road_mut(&mut self, id: RoadId) -> Option<&mut Road> {
        self.roads.iter_mut().find(|r| r.id == id)
    }

    pub fn remove(&mut self, id: RoadId) -> Option<Road> {
        let idx = self.roads.iter().position(|r| r.id == id)?;
        Some(self.roads.remove(idx))
    }

    /// Rebuild any arc-length table that is out of sync with its point list.
    /// Run at the head of the derivation cascade so stale tables can never be
    /// observed by queries.
    pub fn ensure_cum_lengths(&mut self) {
        for r in &mut self.roads {
            if r.cum_len.len() != r.pts.len() {
                r.rebuild_cum();
            }
        }
    }
}

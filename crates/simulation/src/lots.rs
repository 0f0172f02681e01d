//! Lot derivation: walks each road at fixed arc steps and proposes oriented
//! rectangular lots on both sides, validated against the buildability grid.
//!
//! Lots carry no stable identity. Every rebuild throws the whole set away
//! and regenerates it from the current road network and zone registry.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::chunk::{ChunkKey, ZoneChunkMap, FLAG_BLOCKED, FLAG_BUILDABLE};
use crate::config::{
    LOT_COVERAGE_MIN, LOT_DEDUP_CELL, LOT_DEPTH, LOT_SETBACK, LOT_STEP, LOT_WIDTH,
    ROAD_HALF_WIDTH,
};
use crate::rasterizer::{
    right_of, should_cull_for_intersection, zone_rect_coverage, zone_rect_majority_type,
};
use crate::roads::{RoadId, RoadNetwork};
use crate::zones::{ZoneKind, ZoneRegistry};

// ---------------------------------------------------------------------------
// Lot cells
// ---------------------------------------------------------------------------

/// One derived building site beside a road. Regenerated wholesale on every
/// rebuild; indices into [`LotSet::lots`] are only valid until the next edit.
#[derive(Debug, Clone)]
pub struct LotCell {
    pub road_id: RoadId,
    /// -1 for the left side of the tangent, +1 for the right.
    pub side: i8,
    /// Arc-length interval of the lot along its road.
    pub d0: f32,
    pub d1: f32,
    pub center: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    /// Resolved zone type, `None` for an unzoned buildable lot.
    pub kind: Option<ZoneKind>,
}

#[derive(Resource, Default)]
pub struct LotSet {
    pub lots: Vec<LotCell>,
    /// Chunk -> indices into `lots`, for spatial iteration.
    pub by_chunk: HashMap<ChunkKey, Vec<usize>>,
}

impl LotSet {
    pub fn clear(&mut self) {
        self.lots.clear();
        self.by_chunk.clear();
    }
}

fn dedup_key(center: Vec3) -> u64 {
    let gx = (center.x / LOT_DEDUP_CELL).floor() as i32;
    let gz = (center.z / LOT_DEDUP_CELL).floor() as i32;
    ((gx as u32 as u64) << 32) | gz as u32 as u64
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Regenerate the full lot set from the current roads, zones and grid.
pub fn rebuild_lots(
    net: &RoadNetwork,
    zones: &ZoneRegistry,
    chunks: &ZoneChunkMap,
    lots: &mut LotSet,
) {
    lots.clear();
    let mut claimed: HashSet<u64> = HashSet::new();
    let lateral = ROAD_HALF_WIDTH + LOT_SETBACK + LOT_DEPTH * 0.5;

    for road in &net.roads {
        if road.pts.len() < 2 {
            continue;
        }
        let total = road.total_len();
        let mut d = LOT_STEP * 0.5;
        while d <= total {
            let (p, forward) = road.point_at(d);
            let right = right_of(forward);
            for side in [-1i8, 1] {
                let center = p + right * side as f32 * lateral;
                if should_cull_for_intersection(net, road.id, center, forward) {
                    continue;
                }
                let coverage = zone_rect_coverage(
                    chunks,
                    center,
                    forward,
                    right,
                    LOT_WIDTH,
                    LOT_DEPTH,
                    FLAG_BUILDABLE,
                    FLAG_BLOCKED,
                );
                if coverage < LOT_COVERAGE_MIN {
                    continue;
                }
                if !claimed.insert(dedup_key(center)) {
                    continue;
                }
                let (d0, d1) = (d - LOT_STEP * 0.5, d + LOT_STEP * 0.5);
                let kind = zones.is_lot_zoned(road.id, side, d0, d1).or_else(|| {
                    zone_rect_majority_type(chunks, center, forward, right, LOT_WIDTH, LOT_DEPTH)
                });
                let index = lots.lots.len();
                lots.lots.push(LotCell {
                    road_id: road.id,
                    side,
                    d0,
                    d1,
                    center,
                    forward,
                    right,
                    kind,
                });
                lots.by_chunk
                    .entry(ChunkKey::from_world(center))
                    .or_default()
                    .push(index);
            }
            d += LOT_STEP;
        }
    }
}

//! Buildability rasterizer: stamps road influence, road-surface exclusion,
//! zone strips and the water mask into the chunk cell grids.
//!
//! All stamping is idempotent: buildable is a union, blocked is an absorbing
//! overwrite, and a full rebuild always clears every chunk first, so
//! rebuilding twice from the same network produces byte-identical grids.

use bevy::prelude::*;

use crate::chunk::{
    cell_center, WaterMap, ZoneChunkMap, FLAG_BLOCKED, FLAG_BUILDABLE, FLAG_ZONED, TYPE_MASK,
    TYPE_SHIFT,
};
use crate::config::{
    BUILDABLE_BAND_ROWS, CELL_SIZE, COVERAGE_SAMPLES, INTERSECTION_ALIGN_DOT,
    INTERSECTION_CLEARANCE, RASTER_STEP, ROAD_HALF_WIDTH,
};
use crate::geometry::closest_distance_along_road;
use crate::roads::{Road, RoadId, RoadNetwork};
use crate::zones::{ZoneKind, ZoneRegistry, SIDE_LEFT, SIDE_RIGHT};

/// Horizontal right-hand perpendicular of a road tangent.
pub fn right_of(tangent: Vec3) -> Vec3 {
    let r = tangent.cross(Vec3::Y);
    if r.length_squared() > 1e-12 {
        r.normalize()
    } else {
        Vec3::Z
    }
}

/// True if `point` sits near another, non-parallel road: within the
/// intersection clearance of any road other than `current` whose local
/// tangent is not aligned with `forward`. Suppresses buildable cells, lots
/// and placements at or near crossings.
pub fn should_cull_for_intersection(
    net: &RoadNetwork,
    current: RoadId,
    point: Vec3,
    forward: Vec3,
) -> bool {
    for other in &net.roads {
        if other.id == current || other.pts.len() < 2 {
            continue;
        }
        let hit = closest_distance_along_road(other, point);
        if hit.dist_sq < INTERSECTION_CLEARANCE * INTERSECTION_CLEARANCE
            && hit.tangent.dot(forward).abs() < INTERSECTION_ALIGN_DOT
        {
            return true;
        }
    }
    false
}

/// Mark a band of cells on both sides of `road` as buildable, starting just
/// outside the road's physical half-width. Any flat space near a road is
/// potentially developable; cells near intersections are excluded.
pub fn stamp_road_influence(net: &RoadNetwork, road: &Road, chunks: &mut ZoneChunkMap) {
    let total = road.total_len();
    let mut d = 0.0;
    while d <= total {
        let (p, tan) = road.point_at(d);
        let right = right_of(tan);
        for side in [-1.0f32, 1.0] {
            for row in 0..BUILDABLE_BAND_ROWS {
                let lateral = ROAD_HALF_WIDTH + (row as f32 + 0.5) * CELL_SIZE;
                let pos = p + right * side * lateral;
                if should_cull_for_intersection(net, road.id, pos, tan) {
                    continue;
                }
                chunks.update_cell(pos, |f| {
                    if f & FLAG_BLOCKED != 0 {
                        f
                    } else {
                        f | FLAG_BUILDABLE
                    }
                });
            }
        }
        d += RASTER_STEP;
    }
}

/// Mark the physical road bed blocked, clearing buildable/zoned/type.
/// The road surface always wins over any zoning.
pub fn stamp_road_surface_blocked(road: &Road, chunks: &mut ZoneChunkMap) {
    let total = road.total_len();
    let mut d = 0.0;
    while d <= total {
        let (p, tan) = road.point_at(d);
        let right = right_of(tan);
        let mut off = -ROAD_HALF_WIDTH;
        while off <= ROAD_HALF_WIDTH {
            let pos = p + right * off;
            chunks.update_cell(pos, |f| {
                (f & !(FLAG_BUILDABLE | FLAG_ZONED | TYPE_MASK)) | FLAG_BLOCKED
            });
            off += RASTER_STEP;
        }
        d += RASTER_STEP;
    }
}

/// Write one strip's zoned bit and type field over its band. Zoning only
/// lands on buildable, unblocked cells; the road bed and water keep winning.
pub fn stamp_zone_strip(
    road: &Road,
    lo: f32,
    hi: f32,
    side_mask: u8,
    kind: ZoneKind,
    depth: f32,
    chunks: &mut ZoneChunkMap,
) {
    let rows = ((depth / CELL_SIZE).ceil() as usize).max(1);
    let kind_bits = kind.cell_bits();
    let mut d = lo.max(0.0);
    let hi = hi.min(road.total_len());
    while d <= hi {
        let (p, tan) = road.point_at(d);
        let right = right_of(tan);
        for (side, bit) in [(-1.0f32, SIDE_LEFT), (1.0, SIDE_RIGHT)] {
            if side_mask & bit == 0 {
                continue;
            }
            for row in 0..rows {
                let lateral = ROAD_HALF_WIDTH + (row as f32 + 0.5) * CELL_SIZE;
                let pos = p + right * side * lateral;
                chunks.update_cell(pos, |f| {
                    if f & FLAG_BUILDABLE != 0 && f & FLAG_BLOCKED == 0 {
                        (f & !TYPE_MASK) | FLAG_ZONED | kind_bits
                    } else {
                        f
                    }
                });
            }
        }
        d += RASTER_STEP;
    }
}

/// Stamp every water cell as blocked, clearing buildable/zoned/type.
pub fn stamp_water_mask(water: &WaterMap, chunks: &mut ZoneChunkMap) {
    for (key, wchunk) in &water.chunks {
        for (idx, cell) in wchunk.cells.iter().enumerate() {
            if *cell == 0 {
                continue;
            }
            chunks.update_cell(cell_center(*key, idx), |f| {
                (f & !(FLAG_BUILDABLE | FLAG_ZONED | TYPE_MASK)) | FLAG_BLOCKED
            });
        }
    }
}

/// Full rebuild of the zoning grid: clear all chunks, then re-stamp the
/// whole network. Road list order does not affect the result — buildable is
/// a union and blocked absorbs.
pub fn rebuild_zone_grid(
    net: &RoadNetwork,
    zones: &ZoneRegistry,
    water: &WaterMap,
    chunks: &mut ZoneChunkMap,
) {
    chunks.clear();
    for road in &net.roads {
        if road.pts.len() >= 2 {
            stamp_road_influence(net, road, chunks);
        }
    }
    for strip in &zones.strips {
        if let Some(road) = net.road(strip.road_id) {
            if road.pts.len() >= 2 {
                let (lo, hi) = strip.span();
                stamp_zone_strip(road, lo, hi, strip.side_mask, strip.kind, strip.depth, chunks);
            }
        }
    }
    for road in &net.roads {
        if road.pts.len() >= 2 {
            stamp_road_surface_blocked(road, chunks);
        }
    }
    stamp_water_mask(water, chunks);
}

/// Fraction of sample points inside the oriented rectangle whose cell flags
/// contain all of `required`. Returns `0.0` immediately if any sample hits a
/// `forbidden` flag: a single road or water cell invalidates the whole
/// candidate rectangle.
pub fn zone_rect_coverage(
    chunks: &ZoneChunkMap,
    center: Vec3,
    forward: Vec3,
    right: Vec3,
    width: f32,
    depth: f32,
    required: u8,
    forbidden: u8,
) -> f32 {
    let n = COVERAGE_SAMPLES;
    let mut hits = 0usize;
    for i in 0..n {
        for j in 0..n {
            let u = (i as f32 + 0.5) / n as f32 - 0.5;
            let v = (j as f32 + 0.5) / n as f32 - 0.5;
            let pos = center + forward * (u * width) + right * (v * depth);
            let flags = chunks.flags_at(pos);
            if flags & forbidden != 0 {
                return 0.0;
            }
            if flags & required == required {
                hits += 1;
            }
        }
    }
    hits as f32 / (n * n) as f32
}

/// Category-aware variant of the coverage test: the majority zone type among
/// zoned cells inside the rectangle, or `None` if no sample is zoned.
pub fn zone_rect_majority_type(
    chunks: &ZoneChunkMap,
    center: Vec3,
    forward: Vec3,
    right: Vec3,
    width: f32,
    depth: f32,
) -> Option<ZoneKind> {
    let n = COVERAGE_SAMPLES;
    let mut counts = [0usize; 4];
    for i in 0..n {
        for j in 0..n {
            let u = (i as f32 + 0.5) / n as f32 - 0.5;
            let v = (j as f32 + 0.5) / n as f32 - 0.5;
            let pos = center + forward * (u * width) + right * (v * depth);
            let flags = chunks.flags_at(pos);
            if flags & FLAG_ZONED != 0 {
                counts[((flags & TYPE_MASK) >> TYPE_SHIFT) as usize] += 1;
            }
        }
    }
    let (best, &count) = counts
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| **c)
        .unwrap_or((0, &0));
    if count == 0 {
        None
    } else {
        Some(ZoneKind::from_bits(best as u8))
    }
}

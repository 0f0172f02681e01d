//! CPU-side geometry handed to the renderer: the road ribbon mesh and the
//! buildable/zoned overlay triangle soup. The renderer only reads these.

use bevy::prelude::*;

use crate::chunk::{
    cell_center, VisibleChunks, ZoneChunkMap, FLAG_BLOCKED, FLAG_BUILDABLE, FLAG_ZONED,
};
use crate::config::{CELL_SIZE, ROAD_HALF_WIDTH};
use crate::rasterizer::right_of;
use crate::roads::RoadNetwork;

// Slight lift above the ground plane so the ribbon and overlay never
// z-fight with terrain.
const ROAD_Y: f32 = 0.03;
const OVERLAY_Y: f32 = 0.04;

// ---------------------------------------------------------------------------
// Road ribbon
// ---------------------------------------------------------------------------

/// Flat triangle soup for every road, two triangles per polyline segment.
#[derive(Resource, Default)]
pub struct RoadMesh {
    pub verts: Vec<Vec3>,
}

pub fn build_road_ribbon(net: &RoadNetwork, mesh: &mut RoadMesh) {
    mesh.verts.clear();
    for road in &net.roads {
        for w in road.pts.windows(2) {
            let (a, b) = (w[0], w[1]);
            let dir = Vec3::new(b.x - a.x, 0.0, b.z - a.z);
            if dir.length_squared() < 1e-8 {
                continue;
            }
            let right = right_of(dir.normalize()) * ROAD_HALF_WIDTH;
            let a = Vec3::new(a.x, ROAD_Y, a.z);
            let b = Vec3::new(b.x, ROAD_Y, b.z);
            let (al, ar) = (a - right, a + right);
            let (bl, br) = (b - right, b + right);
            mesh.verts.extend([al, bl, br, al, br, ar]);
        }
    }
}

// ---------------------------------------------------------------------------
// Buildable / zoned overlay
// ---------------------------------------------------------------------------

/// Per-cell overlay quads for the chunks currently on screen, split into two
/// soups so the renderer can color them differently.
#[derive(Resource, Default)]
pub struct OverlayMesh {
    pub buildable: Vec<Vec3>,
    pub zoned: Vec<Vec3>,
}

fn push_cell_quad(out: &mut Vec<Vec3>, center: Vec3) {
    let h = CELL_SIZE * 0.5;
    let a = Vec3::new(center.x - h, OVERLAY_Y, center.z - h);
    let b = Vec3::new(center.x + h, OVERLAY_Y, center.z - h);
    let c = Vec3::new(center.x + h, OVERLAY_Y, center.z + h);
    let d = Vec3::new(center.x - h, OVERLAY_Y, center.z + h);
    out.extend([a, b, c, a, c, d]);
}

pub fn build_overlay(chunks: &ZoneChunkMap, visible: &VisibleChunks, mesh: &mut OverlayMesh) {
    mesh.buildable.clear();
    mesh.zoned.clear();
    for (key, chunk) in &chunks.chunks {
        if !visible.contains(*key) {
            continue;
        }
        for (idx, &flags) in chunk.flags.iter().enumerate() {
            if flags & FLAG_BLOCKED != 0 {
                continue;
            }
            if flags & FLAG_ZONED != 0 {
                push_cell_quad(&mut mesh.zoned, cell_center(*key, idx));
            } else if flags & FLAG_BUILDABLE != 0 {
                push_cell_quad(&mut mesh.buildable, cell_center(*key, idx));
            }
        }
    }
}

/// Rebuild the overlay whenever the grid or the camera's visible chunk set
/// changed this frame.
pub fn refresh_overlay(
    chunks: Res<ZoneChunkMap>,
    visible: Res<VisibleChunks>,
    mut mesh: ResMut<OverlayMesh>,
) {
    if chunks.is_changed() || visible.is_changed() {
        build_overlay(&chunks, &visible, &mut mesh);
    }
}

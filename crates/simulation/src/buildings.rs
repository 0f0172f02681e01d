//! Building placement: converts zoned lots into placed instances with
//! deterministic seeds, clearance and overlap rejection, and a transient
//! spawn animation that promotes instances into settled per-chunk storage.

use bevy::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use xxhash_rust::xxh32::xxh32;

use crate::chunk::{ChunkKey, VisibleChunks, ZoneChunkMap, FLAG_BLOCKED};
use crate::config::{
    BUILDING_CLEARANCE, BUILDING_GAP, BUILDING_HASH_CELL, CELL_SIZE, LOT_DEDUP_CELL,
    ROAD_HALF_WIDTH, SPAWN_ANIM_DURATION, SPAWN_JITTER_MAX, ZONE_DEPTH,
};
use crate::geometry::closest_distance_along_road;
use crate::lots::LotSet;
use crate::roads::RoadNetwork;
use crate::zones::ZoneKind;

// ---------------------------------------------------------------------------
// Asset catalog
// ---------------------------------------------------------------------------

/// Handle into the externally managed mesh/asset registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u32);

#[derive(Debug, Clone, Copy)]
pub struct AssetDef {
    pub asset: AssetId,
    /// Unscaled width/height/depth of the placed box.
    pub base_size: Vec3,
}

/// Maps zone categories to their default placeable asset.
#[derive(Resource)]
pub struct AssetCatalog {
    pub by_category: HashMap<String, AssetDef>,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        let mut by_category = HashMap::new();
        for (i, kind) in [
            ZoneKind::Residential,
            ZoneKind::Commercial,
            ZoneKind::Industrial,
            ZoneKind::Office,
        ]
        .into_iter()
        .enumerate()
        {
            by_category.insert(
                kind.category().to_string(),
                AssetDef {
                    asset: AssetId(i as u32 + 1),
                    base_size: kind.base_size(),
                },
            );
        }
        Self { by_category }
    }
}

impl AssetCatalog {
    pub fn resolve(&self, kind: ZoneKind) -> AssetDef {
        match self.by_category.get(kind.category()) {
            Some(def) => *def,
            None => {
                warn!("no asset registered for category {}", kind.category());
                AssetDef {
                    asset: AssetId(0),
                    base_size: ZoneKind::Residential.base_size(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BuildingInstance {
    pub asset: AssetId,
    pub pos: Vec3,
    pub yaw: f32,
    pub scale: Vec3,
    pub seed: u32,
}

impl BuildingInstance {
    pub fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, Quat::from_rotation_y(self.yaw), self.pos)
    }

    /// Model matrix shrunk by the spawn animation factor.
    pub fn model_scaled(&self, factor: f32) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale * factor,
            Quat::from_rotation_y(self.yaw),
            self.pos,
        )
    }

    pub fn radius(&self) -> f32 {
        0.5 * (self.scale.x * self.scale.x + self.scale.z * self.scale.z).sqrt()
    }
}

/// All placed instances, grouped by chunk and asset so the renderer can
/// upload one instance buffer per (chunk, asset) pair.
#[derive(Resource, Default)]
pub struct BuildingChunks {
    pub chunks: HashMap<ChunkKey, HashMap<AssetId, Vec<BuildingInstance>>>,
    /// Chunks whose instance buffers need a re-upload.
    pub render_dirty: HashSet<ChunkKey>,
}

impl BuildingChunks {
    pub fn insert(&mut self, instance: BuildingInstance) -> (ChunkKey, usize) {
        let key = ChunkKey::from_world(instance.pos);
        let list = self
            .chunks
            .entry(key)
            .or_default()
            .entry(instance.asset)
            .or_default();
        list.push(instance);
        self.render_dirty.insert(key);
        (key, list.len() - 1)
    }

    pub fn clear(&mut self) {
        self.render_dirty.extend(self.chunks.keys().copied());
        self.chunks.clear();
    }

    pub fn instance_count(&self) -> usize {
        self.chunks
            .values()
            .flat_map(|per_asset| per_asset.values())
            .map(Vec::len)
            .sum()
    }

    pub fn instances(&self) -> impl Iterator<Item = &BuildingInstance> {
        self.chunks
            .values()
            .flat_map(|per_asset| per_asset.values())
            .flatten()
    }

    /// Full-size model matrices for settled instances in visible chunks,
    /// grouped by asset. Instances still animating are skipped here and
    /// rendered from the spawn list instead.
    pub fn settled_models(
        &self,
        visible: &VisibleChunks,
        spawn: &SpawnList,
    ) -> HashMap<AssetId, Vec<Mat4>> {
        let mut out: HashMap<AssetId, Vec<Mat4>> = HashMap::new();
        for (key, per_asset) in &self.chunks {
            if !visible.contains(*key) {
                continue;
            }
            for (asset, list) in per_asset {
                for (index, instance) in list.iter().enumerate() {
                    if spawn.is_animating(*key, *asset, index) {
                        continue;
                    }
                    out.entry(*asset).or_default().push(instance.model());
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Spawn animation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SpawnEntry {
    pub key: ChunkKey,
    pub asset: AssetId,
    pub index: usize,
    pub spawn_time: f32,
}

/// Instances currently growing in. Each entry points at an instance that is
/// already stored in [`BuildingChunks`]; promotion just drops the entry.
#[derive(Resource, Default)]
pub struct SpawnList {
    pub entries: Vec<SpawnEntry>,
}

fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

impl SpawnList {
    pub fn is_animating(&self, key: ChunkKey, asset: AssetId, index: usize) -> bool {
        self.entries
            .iter()
            .any(|e| e.key == key && e.asset == asset && e.index == index)
    }

    /// Eased model matrices for animating instances in visible chunks.
    pub fn visible_models(
        &self,
        chunks: &BuildingChunks,
        visible: &VisibleChunks,
        now: f32,
    ) -> Vec<(AssetId, Mat4)> {
        let mut out = Vec::new();
        for entry in &self.entries {
            if !visible.contains(entry.key) {
                continue;
            }
            let Some(instance) = chunks
                .chunks
                .get(&entry.key)
                .and_then(|per_asset| per_asset.get(&entry.asset))
                .and_then(|list| list.get(entry.index))
            else {
                continue;
            };
            let t = (now - entry.spawn_time) / SPAWN_ANIM_DURATION;
            if t < 0.0 {
                continue;
            }
            out.push((entry.asset, instance.model_scaled(ease_out(t))));
        }
        out
    }
}

/// Promote finished spawn entries into settled storage.
pub fn step_spawn_animations(
    time: Res<Time>,
    mut spawn: ResMut<SpawnList>,
    mut chunks: ResMut<BuildingChunks>,
) {
    if spawn.entries.is_empty() {
        return;
    }
    let now = time.elapsed_secs();
    let before = spawn.entries.len();
    let dirty = &mut chunks.render_dirty;
    spawn.entries.retain(|e| {
        let done = now - e.spawn_time >= SPAWN_ANIM_DURATION;
        if done {
            dirty.insert(e.key);
        }
        !done
    });
    let promoted = before - spawn.entries.len();
    if promoted > 0 {
        debug!("promoted {promoted} buildings to settled storage");
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

fn coarse_key(pos: Vec3) -> u64 {
    let gx = (pos.x / LOT_DEDUP_CELL).floor() as i32;
    let gz = (pos.z / LOT_DEDUP_CELL).floor() as i32;
    ((gx as u32 as u64) << 32) | gz as u32 as u64
}

fn hash_cell(pos: Vec3) -> (i32, i32) {
    (
        (pos.x / BUILDING_HASH_CELL).floor() as i32,
        (pos.z / BUILDING_HASH_CELL).floor() as i32,
    )
}

fn min_centerline_dist_sq(net: &RoadNetwork, pos: Vec3) -> f32 {
    let mut best = f32::INFINITY;
    for road in &net.roads {
        if road.pts.len() < 2 {
            continue;
        }
        best = best.min(closest_distance_along_road(road, pos).dist_sq);
    }
    best
}

/// Deterministic per-site seed from the quantized position and lot identity.
fn placement_seed(pos: Vec3, road_id: u32, side: i8) -> u32 {
    let mut buf = [0u8; 16];
    buf[0..4].copy_from_slice(&((pos.x * 10.0).round() as i32).to_le_bytes());
    buf[4..8].copy_from_slice(&((pos.z * 10.0).round() as i32).to_le_bytes());
    buf[8..12].copy_from_slice(&road_id.to_le_bytes());
    buf[12..16].copy_from_slice(&(side as i32).to_le_bytes());
    xxh32(&buf, 0)
}

fn align_up(v: f32) -> f32 {
    ((v / CELL_SIZE).ceil() * CELL_SIZE).max(CELL_SIZE)
}

/// Regenerate every building from the current lot set. With `animate` the
/// new instances enter through the spawn list; otherwise they appear settled
/// immediately (bulk rebuilds after a load).
#[allow(clippy::too_many_arguments)]
pub fn rebuild_buildings(
    net: &RoadNetwork,
    lots: &LotSet,
    grid: &ZoneChunkMap,
    catalog: &AssetCatalog,
    chunks: &mut BuildingChunks,
    spawn: &mut SpawnList,
    now: f32,
    animate: bool,
) {
    chunks.clear();
    spawn.entries.clear();

    let mut occupied: HashSet<u64> = HashSet::new();
    let mut placed: HashMap<(i32, i32), Vec<(Vec3, f32)>> = HashMap::new();
    let mut max_radius: f32 = 0.0;

    for lot in &lots.lots {
        let Some(kind) = lot.kind else {
            continue;
        };
        if grid.flags_at(lot.center) & FLAG_BLOCKED != 0 {
            continue;
        }
        let def = catalog.resolve(kind);

        let aligned_w = align_up(def.base_size.x);
        let aligned_d = align_up(def.base_size.z);
        if aligned_d > ZONE_DEPTH {
            continue;
        }
        let radius = 0.5 * (aligned_w * aligned_w + aligned_d * aligned_d).sqrt();

        let clear = min_centerline_dist_sq(net, lot.center).sqrt() - ROAD_HALF_WIDTH;
        if clear < BUILDING_CLEARANCE {
            continue;
        }
        if occupied.contains(&coarse_key(lot.center)) {
            continue;
        }

        // Disk-overlap test against every neighbor the hash window can reach.
        let reach = radius + max_radius + BUILDING_GAP;
        let window = (reach / BUILDING_HASH_CELL).ceil() as i32;
        let (cx, cz) = hash_cell(lot.center);
        let mut overlaps = false;
        'window: for dx in -window..=window {
            for dz in -window..=window {
                let Some(neighbors) = placed.get(&(cx + dx, cz + dz)) else {
                    continue;
                };
                for (other_pos, other_radius) in neighbors {
                    let min_dist = radius + other_radius + BUILDING_GAP;
                    if lot.center.distance_squared(*other_pos) < min_dist * min_dist {
                        overlaps = true;
                        break 'window;
                    }
                }
            }
        }
        if overlaps {
            continue;
        }

        let seed = placement_seed(lot.center, lot.road_id.0, lot.side);
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        let time_jitter: f32 = rng.gen_range(0.0..SPAWN_JITTER_MAX);
        let scale_jitter: f32 = rng.gen_range(0.95..1.05);

        let facing = -(lot.side as f32) * lot.right;
        let yaw = facing.x.atan2(facing.z);
        let mut pos = lot.center;
        pos.y = def.base_size.y * 0.5 * scale_jitter;

        let instance = BuildingInstance {
            asset: def.asset,
            pos,
            yaw,
            scale: def.base_size * scale_jitter,
            seed,
        };
        let (key, index) = chunks.insert(instance);
        if animate {
            spawn.entries.push(SpawnEntry {
                key,
                asset: def.asset,
                index,
                spawn_time: now + time_jitter,
            });
        }

        occupied.insert(coarse_key(lot.center));
        placed
            .entry(hash_cell(lot.center))
            .or_default()
            .push((lot.center, radius));
        max_radius = max_radius.max(radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::WaterMap;
    use crate::config::{LOT_DEPTH, LOT_SETBACK};
    use crate::lots::rebuild_lots;
    use crate::rasterizer::rebuild_zone_grid;
    use crate::roads::Road;
    use crate::zones::{ZoneRegistry, ZoneStrip, SIDE_BOTH};

    fn derive_city(kind: ZoneKind) -> (RoadNetwork, BuildingChunks, SpawnList) {
        let mut net = RoadNetwork::default();
        let id = net.allocate_id();
        let mut road = Road::new(id, vec![Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0)]);
        road.rebuild_cum();
        net.roads.push(road);

        let mut zones = ZoneRegistry::default();
        let zid = zones.allocate_id();
        zones
            .strips
            .push(ZoneStrip::new(zid, id, 0.0, 100.0, SIDE_BOTH, kind));

        let mut grid = ZoneChunkMap::default();
        rebuild_zone_grid(&net, &zones, &WaterMap::default(), &mut grid);
        let mut lots = LotSet::default();
        rebuild_lots(&net, &zones, &grid, &mut lots);

        let catalog = AssetCatalog::default();
        let mut chunks = BuildingChunks::default();
        let mut spawn = SpawnList::default();
        rebuild_buildings(&net, &lots, &grid, &catalog, &mut chunks, &mut spawn, 0.0, true);
        (net, chunks, spawn)
    }

    #[test]
    fn test_placement_produces_instances_with_spawn_entries() {
        let (_, chunks, spawn) = derive_city(ZoneKind::Residential);
        assert!(chunks.instance_count() > 0);
        assert_eq!(spawn.entries.len(), chunks.instance_count());
    }

    #[test]
    fn test_road_clearance_holds_for_every_instance() {
        let (net, chunks, _) = derive_city(ZoneKind::Residential);
        for instance in chunks.instances() {
            let ground = Vec3::new(instance.pos.x, 0.0, instance.pos.z);
            let clear = min_centerline_dist_sq(&net, ground).sqrt() - ROAD_HALF_WIDTH;
            assert!(clear >= BUILDING_CLEARANCE - 1e-3);
        }
    }

    #[test]
    fn test_pairwise_disk_clearance() {
        let (_, chunks, _) = derive_city(ZoneKind::Commercial);
        let all: Vec<&BuildingInstance> = chunks.instances().collect();
        assert!(all.len() > 1);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                let pa = Vec3::new(a.pos.x, 0.0, a.pos.z);
                let pb = Vec3::new(b.pos.x, 0.0, b.pos.z);
                // Placement guarantees aligned-radius sums plus the gap;
                // the gap absorbs the up-to-5% scale jitter on each radius.
                let min_dist = a.radius() + b.radius();
                assert!(
                    pa.distance(pb) >= min_dist,
                    "instances at {pa:?} and {pb:?} overlap"
                );
            }
        }
    }

    #[test]
    fn test_yaw_faces_the_road() {
        let (_, chunks, _) = derive_city(ZoneKind::Residential);
        for instance in chunks.instances() {
            let facing = Vec3::new(instance.yaw.sin(), 0.0, instance.yaw.cos());
            // Road runs along X at z = 0; the offset from the road to the
            // instance must point away from the facing direction.
            let offset = Vec3::new(0.0, 0.0, instance.pos.z);
            assert!(facing.dot(offset) < 0.0);
            let expected = ROAD_HALF_WIDTH + LOT_SETBACK + LOT_DEPTH * 0.5;
            assert!((instance.pos.z.abs() - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_seed_is_deterministic_across_rebuilds() {
        let (_, first, _) = derive_city(ZoneKind::Office);
        let (_, second, _) = derive_city(ZoneKind::Office);
        let mut a: Vec<u32> = first.instances().map(|i| i.seed).collect();
        let mut b: Vec<u32> = second.instances().map(|i| i.seed).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_spawn_entries_promote_after_duration() {
        let (_, chunks, mut spawn) = derive_city(ZoneKind::Residential);
        let visible = {
            let mut v = VisibleChunks::default();
            v.set_rect(Vec3::new(-500.0, 0.0, -500.0), Vec3::new(500.0, 0.0, 500.0));
            v
        };
        // Mid-animation every instance is shrunk below full size.
        let mid = spawn.visible_models(&chunks, &visible, 0.1);
        assert!(!mid.is_empty());

        let done = SPAWN_ANIM_DURATION + SPAWN_JITTER_MAX + 0.01;
        spawn
            .entries
            .retain(|e| done - e.spawn_time < SPAWN_ANIM_DURATION);
        assert!(spawn.entries.is_empty());
        let settled = chunks.settled_models(&visible, &spawn);
        let total: usize = settled.values().map(Vec::len).sum();
        assert_eq!(total, chunks.instance_count());
    }

    #[test]
    fn test_ease_out_curve() {
        assert_eq!(ease_out(0.0), 0.0);
        assert_eq!(ease_out(1.0), 1.0);
        assert!(ease_out(0.5) > 0.5);
        assert_eq!(ease_out(2.0), 1.0);
    }

    #[test]
    fn test_catalog_resolves_all_kinds() {
        let catalog = AssetCatalog::default();
        let mut seen = HashSet::new();
        for kind in [
            ZoneKind::Residential,
            ZoneKind::Commercial,
            ZoneKind::Industrial,
            ZoneKind::Office,
        ] {
            let def = catalog.resolve(kind);
            assert!(def.asset.0 != 0);
            assert!(seen.insert(def.asset));
        }
    }
}

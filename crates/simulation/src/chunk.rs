//! Spatial chunk model: the infinite XZ plane partitioned into fixed-size
//! square chunks, each owning a dense per-cell flag grid. Chunks are created
//! lazily on first write and always reflect the current network state — a
//! chunk is either fully re-stamped or absent, never partially stale.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use xxhash_rust::xxh32::xxh32;

use crate::config::{CELL_SIZE, CHUNK_CELLS, CHUNK_SIZE};

// Per-cell flag byte. Four concerns packed into one byte for cache density
// across large chunk grids: three flag bits plus a 2-bit zone-type field in
// the upper bits.
pub const FLAG_BUILDABLE: u8 = 1 << 0;
pub const FLAG_ZONED: u8 = 1 << 1;
pub const FLAG_BLOCKED: u8 = 1 << 2;
pub const TYPE_SHIFT: u8 = 6;
pub const TYPE_MASK: u8 = 0b1100_0000;

/// Chunk coordinate `(cx, cz)` packed into one 64-bit key: `cx` in the high
/// 32 bits, `cz` in the low 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(pub u64);

impl ChunkKey {
    pub fn pack(cx: i32, cz: i32) -> Self {
        Self(((cx as u32 as u64) << 32) | cz as u32 as u64)
    }

    pub fn unpack(self) -> (i32, i32) {
        ((self.0 >> 32) as u32 as i32, self.0 as u32 as i32)
    }

    pub fn from_world(p: Vec3) -> Self {
        Self::pack(
            (p.x / CHUNK_SIZE).floor() as i32,
            (p.z / CHUNK_SIZE).floor() as i32,
        )
    }
}

/// Splits a world position into (chunk key, flat cell index within chunk).
pub fn cell_address(p: Vec3) -> (ChunkKey, usize) {
    let gx = (p.x / CELL_SIZE).floor() as i64;
    let gz = (p.z / CELL_SIZE).floor() as i64;
    let n = CHUNK_CELLS as i64;
    let key = ChunkKey::pack(gx.div_euclid(n) as i32, gz.div_euclid(n) as i32);
    let lx = gx.rem_euclid(n) as usize;
    let lz = gz.rem_euclid(n) as usize;
    (key, lz * CHUNK_CELLS + lx)
}

/// World-space center of a cell addressed by chunk key + flat index.
pub fn cell_center(key: ChunkKey, index: usize) -> Vec3 {
    let (cx, cz) = key.unpack();
    let lx = index % CHUNK_CELLS;
    let lz = index / CHUNK_CELLS;
    Vec3::new(
        cx as f32 * CHUNK_SIZE + (lx as f32 + 0.5) * CELL_SIZE,
        0.0,
        cz as f32 * CHUNK_SIZE + (lz as f32 + 0.5) * CELL_SIZE,
    )
}

/// Dense per-cell flag grid for one chunk.
#[derive(Clone)]
pub struct ZoneChunk {
    pub flags: Vec<u8>,
}

impl Default for ZoneChunk {
    fn default() -> Self {
        Self {
            flags: vec![0; CHUNK_CELLS * CHUNK_CELLS],
        }
    }
}

/// All zoning chunks, keyed by packed chunk coordinate.
#[derive(Resource, Default)]
pub struct ZoneChunkMap {
    pub chunks: HashMap<ChunkKey, ZoneChunk>,
}

impl ZoneChunkMap {
    /// Flags of the cell containing `p`; `0` where no chunk exists yet.
    pub fn flags_at(&self, p: Vec3) -> u8 {
        let (key, idx) = cell_address(p);
        self.chunks.get(&key).map_or(0, |c| c.flags[idx])
    }

    /// Mutate the cell containing `p`, creating its chunk on first write.
    pub fn update_cell(&mut self, p: Vec3, f: impl FnOnce(u8) -> u8) {
        let (key, idx) = cell_address(p);
        let chunk = self.chunks.entry(key).or_default();
        chunk.flags[idx] = f(chunk.flags[idx]);
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Deterministic hash over all chunk flag grids, iterated in key order.
    /// Two grids derived from identical input hash identically.
    pub fn state_hash(&self) -> u32 {
        let mut keys: Vec<ChunkKey> = self.chunks.keys().copied().collect();
        keys.sort();
        let mut acc = 0u32;
        for key in keys {
            acc = xxh32(&key.0.to_le_bytes(), acc);
            acc = xxh32(&self.chunks[&key].flags, acc);
        }
        acc
    }
}

/// Binary water grid for one chunk (1 = water).
#[derive(Clone)]
pub struct WaterChunk {
    pub cells: Vec<u8>,
}

impl Default for WaterChunk {
    fn default() -> Self {
        Self {
            cells: vec![0; CHUNK_CELLS * CHUNK_CELLS],
        }
    }
}

/// Water classification sampled onto the cell grid. An input, not derived:
/// loaded once from an external raster mask and immutable until explicitly
/// cleared or reloaded.
#[derive(Resource, Default)]
pub struct WaterMap {
    pub chunks: HashMap<ChunkKey, WaterChunk>,
}

impl WaterMap {
    pub fn set_water(&mut self, p: Vec3) {
        let (key, idx) = cell_address(p);
        self.chunks.entry(key).or_default().cells[idx] = 1;
    }

    pub fn is_water(&self, p: Vec3) -> bool {
        let (key, idx) = cell_address(p);
        self.chunks.get(&key).is_some_and(|c| c.cells[idx] != 0)
    }

    /// Consume a decoded raster mask: one byte per cell, row-major,
    /// non-zero = water. `origin` is the world position of the mask's first
    /// cell; decoding the image itself happens outside the core.
    pub fn apply_mask(&mut self, origin: Vec3, width: usize, height: usize, data: &[u8]) {
        for row in 0..height {
            for col in 0..width {
                if data[row * width + col] != 0 {
                    self.set_water(Vec3::new(
                        origin.x + (col as f32 + 0.5) * CELL_SIZE,
                        0.0,
                        origin.z + (row as f32 + 0.5) * CELL_SIZE,
                    ));
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// Chunk keys currently on screen, fed by the (external) camera layer.
/// Overlay meshes and animating-instance uploads are restricted to this set;
/// the underlying derived data exists regardless of visibility.
#[derive(Resource, Default)]
pub struct VisibleChunks {
    pub set: HashSet<ChunkKey>,
}

impl VisibleChunks {
    /// Replace the visible set with every chunk touching the given XZ rect.
    pub fn set_rect(&mut self, min: Vec3, max: Vec3) {
        self.set.clear();
        let cx0 = (min.x / CHUNK_SIZE).floor() as i32;
        let cz0 = (min.z / CHUNK_SIZE).floor() as i32;
        let cx1 = (max.x / CHUNK_SIZE).floor() as i32;
        let cz1 = (max.z / CHUNK_SIZE).floor() as i32;
        for cx in cx0..=cx1 {
            for cz in cz0..=cz1 {
                self.set.insert(ChunkKey::pack(cx, cz));
            }
        }
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.set.contains(&key)
    }
}

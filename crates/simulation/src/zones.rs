//! Zone strips: user-authored annotations layered on top of the rasterized
//! buildability grid. A strip covers an arc-length interval of one road, on
//! one or both sides, and assigns a development type to the adjacent band.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chunk::TYPE_SHIFT;
use crate::config::{CELL_SIZE, ZONE_DEPTH};
use crate::roads::RoadId;

pub const SIDE_LEFT: u8 = 1;
pub const SIDE_RIGHT: u8 = 2;
pub const SIDE_BOTH: u8 = SIDE_LEFT | SIDE_RIGHT;

/// Development type of a zone strip. Closed set; the discriminant doubles as
/// the 2-bit type field stored in each cell's flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Residential,
    Commercial,
    Industrial,
    Office,
}

impl ZoneKind {
    pub fn to_bits(self) -> u8 {
        match self {
            ZoneKind::Residential => 0,
            ZoneKind::Commercial => 1,
            ZoneKind::Industrial => 2,
            ZoneKind::Office => 3,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => ZoneKind::Residential,
            1 => ZoneKind::Commercial,
            2 => ZoneKind::Industrial,
            _ => ZoneKind::Office,
        }
    }

    /// Cell-byte representation: type field shifted into the upper bits.
    pub fn cell_bits(self) -> u8 {
        self.to_bits() << TYPE_SHIFT
    }

    /// Category string used to resolve an asset from the (external) catalog.
    pub fn category(self) -> &'static str {
        match self {
            ZoneKind::Residential => "residential",
            ZoneKind::Commercial => "commercial",
            ZoneKind::Industrial => "industrial",
            ZoneKind::Office => "office",
        }
    }

    /// Default building box (width, height, depth) when the catalog has no
    /// entry for this category.
    pub fn base_size(self) -> Vec3 {
        match self {
            ZoneKind::Residential => Vec3::new(8.0, 6.0, 12.0),
            ZoneKind::Commercial => Vec3::new(12.0, 8.0, 12.0),
            ZoneKind::Industrial => Vec3::new(14.0, 7.0, 14.0),
            ZoneKind::Office => Vec3::new(10.0, 18.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u32);

/// One zone annotation: an arc-length interval `[d0, d1]` along a road
/// (either order; normalized via [`ZoneStrip::span`]), a side mask, a type
/// and a fixed depth.
#[derive(Debug, Clone)]
pub struct ZoneStrip {
    pub id: ZoneId,
    pub road_id: RoadId,
    pub d0: f32,
    pub d1: f32,
    pub side_mask: u8,
    pub kind: ZoneKind,
    pub depth: f32,
}

impl ZoneStrip {
    pub fn new(id: ZoneId, road_id: RoadId, d0: f32, d1: f32, side_mask: u8, kind: ZoneKind) -> Self {
        Self {
            id,
            road_id,
            d0,
            d1,
            side_mask,
            kind,
            depth: ZONE_DEPTH,
        }
    }

    /// Normalized `(lo, hi)` interval.
    pub fn span(&self) -> (f32, f32) {
        (self.d0.min(self.d1), self.d0.max(self.d1))
    }
}

/// Snap an arc-length interval outward to whole-cell boundaries.
pub fn snap_span(d0: f32, d1: f32) -> (f32, f32) {
    let lo = d0.min(d1);
    let hi = d0.max(d1);
    (
        (lo / CELL_SIZE).floor() * CELL_SIZE,
        (hi / CELL_SIZE).ceil() * CELL_SIZE,
    )
}

/// Two 1D arc-length intervals overlap iff `max(lo) <= min(hi)`.
pub fn zones_overlap(a0: f32, a1: f32, b0: f32, b1: f32) -> bool {
    let lo = a0.min(a1).max(b0.min(b1));
    let hi = a0.max(a1).min(b0.max(b1));
    hi >= lo
}

/// All zone strips, in authoring order.
#[derive(Resource)]
pub struct ZoneRegistry {
    pub strips: Vec<ZoneStrip>,
    pub next_zone_id: u32,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self {
            strips: Vec::new(),
            next_zone_id: 1,
        }
    }
}

impl ZoneRegistry {
    pub fn allocate_id(&mut self) -> ZoneId {
        let id = ZoneId(self.next_zone_id);
        self.next_zone_id += 1;
        id
    }

    /// True if `[d0, d1]` on `road_id` would arc-length-overlap an existing
    /// strip that shares at least one side.
    pub fn overlaps_existing(&self, road_id: RoadId, side_mask: u8, d0: f32, d1: f32) -> bool {
        self.strips.iter().any(|z| {
            z.road_id == road_id
                && z.side_mask & side_mask != 0
                && zones_overlap(d0, d1, z.d0, z.d1)
        })
    }

    /// First strip on the same road and side overlapping the lot's interval.
    /// First-match semantics: the no-overlap invariant on add means at most
    /// one strip can normally match.
    pub fn is_lot_zoned(&self, road_id: RoadId, side: i8, d0: f32, d1: f32) -> Option<ZoneKind> {
        let side_bit = if side < 0 { SIDE_LEFT } else { SIDE_RIGHT };
        self.strips
            .iter()
            .find(|z| {
                z.road_id == road_id
                    && z.side_mask & side_bit != 0
                    && zones_overlap(d0, d1, z.d0, z.d1)
            })
            .map(|z| z.kind)
    }

    /// Remove and return every strip referencing `road_id` (one atomic batch,
    /// kept by the issuing command for undo).
    pub fn clear_for_road(&mut self, road_id: RoadId) -> Vec<ZoneStrip> {
        let mut removed = Vec::new();
        self.strips.retain(|z| {
            if z.road_id == road_id {
                removed.push(z.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn remove(&mut self, id: ZoneId) -> Option<ZoneStrip> {
        let idx = self.strips.iter().position(|z| z.id == id)?;
        Some(self.strips.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_span_expands_outward() {
        let (lo, hi) = snap_span(3.1, 9.9);
        assert_eq!((lo, hi), (2.0, 10.0));
        // Reversed input normalizes.
        let (lo, hi) = snap_span(9.9, 3.1);
        assert_eq!((lo, hi), (2.0, 10.0));
    }

    #[test]
    fn test_zones_overlap() {
        assert!(zones_overlap(0.0, 10.0, 5.0, 15.0));
        assert!(zones_overlap(10.0, 0.0, 15.0, 5.0));
        // Touching endpoints count as overlap.
        assert!(zones_overlap(0.0, 10.0, 10.0, 20.0));
        assert!(!zones_overlap(0.0, 10.0, 10.1, 20.0));
    }

    #[test]
    fn test_overlap_requires_shared_side() {
        let mut reg = ZoneRegistry::default();
        let id = reg.allocate_id();
        reg.strips.push(ZoneStrip::new(
            id,
            RoadId(1),
            0.0,
            20.0,
            SIDE_LEFT,
            ZoneKind::Residential,
        ));

        assert!(reg.overlaps_existing(RoadId(1), SIDE_LEFT, 10.0, 30.0));
        assert!(reg.overlaps_existing(RoadId(1), SIDE_BOTH, 10.0, 30.0));
        // Opposite side of the same span is allowed.
        assert!(!reg.overlaps_existing(RoadId(1), SIDE_RIGHT, 10.0, 30.0));
        // Other roads never conflict.
        assert!(!reg.overlaps_existing(RoadId(2), SIDE_LEFT, 10.0, 30.0));
    }

    #[test]
    fn test_is_lot_zoned_first_match() {
        let mut reg = ZoneRegistry::default();
        let a = reg.allocate_id();
        reg.strips.push(ZoneStrip::new(
            a,
            RoadId(1),
            0.0,
            20.0,
            SIDE_BOTH,
            ZoneKind::Commercial,
        ));
        let b = reg.allocate_id();
        reg.strips.push(ZoneStrip::new(
            b,
            RoadId(1),
            20.0,
            40.0,
            SIDE_BOTH,
            ZoneKind::Industrial,
        ));

        // A lot spanning the shared boundary resolves to the first strip.
        assert_eq!(
            reg.is_lot_zoned(RoadId(1), -1, 18.0, 22.0),
            Some(ZoneKind::Commercial)
        );
        assert_eq!(
            reg.is_lot_zoned(RoadId(1), 1, 25.0, 30.0),
            Some(ZoneKind::Industrial)
        );
        assert_eq!(reg.is_lot_zoned(RoadId(2), 1, 0.0, 10.0), None);
    }

    #[test]
    fn test_clear_for_road_is_a_batch() {
        let mut reg = ZoneRegistry::default();
        for span in [(0.0, 10.0), (20.0, 30.0)] {
            let id = reg.allocate_id();
            reg.strips.push(ZoneStrip::new(
                id,
                RoadId(1),
                span.0,
                span.1,
                SIDE_BOTH,
                ZoneKind::Residential,
            ));
        }
        let other = reg.allocate_id();
        reg.strips.push(ZoneStrip::new(
            other,
            RoadId(2),
            0.0,
            10.0,
            SIDE_BOTH,
            ZoneKind::Office,
        ));

        let removed = reg.clear_for_road(RoadId(1));
        assert_eq!(removed.len(), 2);
        assert_eq!(reg.strips.len(), 1);
        assert_eq!(reg.strips[0].road_id, RoadId(2));
    }

    #[test]
    fn test_kind_bits_roundtrip() {
        for kind in [
            ZoneKind::Residential,
            ZoneKind::Commercial,
            ZoneKind::Industrial,
            ZoneKind::Office,
        ] {
            assert_eq!(ZoneKind::from_bits(kind.to_bits()), kind);
        }
    }
}

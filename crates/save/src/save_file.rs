//! Versioned JSON snapshot of the authoritative editor model.
//!
//! Only roads and zone strips are persisted; the grid, lots and building
//! instances are derived data and are rebuilt after a load. The id counters
//! round-trip exactly so ids allocated after a load never collide with
//! loaded ones.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use simulation::roads::{Road, RoadId, RoadNetwork};
use simulation::zones::{ZoneId, ZoneKind, ZoneRegistry, ZoneStrip};

use crate::atomic_write::atomic_write;
use crate::save_error::SaveError;

/// Current save format version. Bump on any schema change.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct RoadSave {
    pub id: u32,
    pub pts: Vec<[f32; 3]>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStripSave {
    pub id: u32,
    pub road_id: u32,
    pub d0: f32,
    pub d1: f32,
    pub side_mask: u8,
    pub kind: ZoneKind,
    pub depth: f32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub version: u32,
    pub next_road_id: u32,
    pub next_zone_id: u32,
    pub roads: Vec<RoadSave>,
    pub zones: Vec<ZoneStripSave>,
}

impl SaveFile {
    /// Snapshot the authoritative model.
    pub fn capture(net: &RoadNetwork, zones: &ZoneRegistry) -> Self {
        Self {
            version: SAVE_VERSION,
            next_road_id: net.next_road_id,
            next_zone_id: zones.next_zone_id,
            roads: net
                .roads
                .iter()
                .map(|r| RoadSave {
                    id: r.id.0,
                    pts: r.pts.iter().map(|p| [p.x, p.y, p.z]).collect(),
                })
                .collect(),
            zones: zones
                .strips
                .iter()
                .map(|s| ZoneStripSave {
                    id: s.id.0,
                    road_id: s.road_id.0,
                    d0: s.d0,
                    d1: s.d1,
                    side_mask: s.side_mask,
                    kind: s.kind,
                    depth: s.depth,
                })
                .collect(),
        }
    }

    /// Replace the authoritative model with this snapshot. Roads land on the
    /// ground plane regardless of stored heights, and cumulative lengths are
    /// rebuilt immediately so the model is queryable before the next frame.
    pub fn apply(&self, net: &mut RoadNetwork, zones: &mut ZoneRegistry) {
        net.roads = self
            .roads
            .iter()
            .map(|r| {
                let mut road = Road::new(
                    RoadId(r.id),
                    r.pts
                        .iter()
                        .map(|p| Vec3::new(p[0], 0.0, p[2]))
                        .collect(),
                );
                road.rebuild_cum();
                road
            })
            .collect();
        net.next_road_id = self.next_road_id;

        zones.strips = self
            .zones
            .iter()
            .map(|s| ZoneStrip {
                id: ZoneId(s.id),
                road_id: RoadId(s.road_id),
                d0: s.d0,
                d1: s.d1,
                side_mask: s.side_mask,
                kind: s.kind,
                depth: s.depth,
            })
            .collect();
        zones.next_zone_id = self.next_zone_id;
    }
}

/// Serialize and atomically write the current model to `path`.
pub fn save_city(path: &Path, net: &RoadNetwork, zones: &ZoneRegistry) -> Result<(), SaveError> {
    let file = SaveFile::capture(net, zones);
    let bytes = serde_json::to_vec_pretty(&file)?;
    atomic_write(path, &bytes)?;
    Ok(())
}

/// Read and parse a save file. The version field is checked before any
/// deserialization of the payload, so a mismatched save fails without
/// touching editor state.
pub fn load_city(path: &Path) -> Result<SaveFile, SaveError> {
    let bytes = fs::read(path)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    let found = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or(SaveError::MissingVersion)? as u32;
    if found != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found,
        });
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::zones::SIDE_BOTH;
    use std::path::PathBuf;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("layout_save_file_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_model() -> (RoadNetwork, ZoneRegistry) {
        let mut net = RoadNetwork::default();
        let id = net.allocate_id();
        let mut road = Road::new(
            id,
            vec![Vec3::ZERO, Vec3::new(60.0, 0.0, 0.0), Vec3::new(60.0, 0.0, 80.0)],
        );
        road.rebuild_cum();
        net.roads.push(road);

        let mut zones = ZoneRegistry::default();
        let zid = zones.allocate_id();
        zones
            .strips
            .push(ZoneStrip::new(zid, id, 0.0, 60.0, SIDE_BOTH, ZoneKind::Office));
        (net, zones)
    }

    #[test]
    fn test_round_trip_preserves_model_and_counters() {
        let dir = test_dir("roundtrip");
        let path = dir.join("city.json");
        let (net, zones) = sample_model();

        save_city(&path, &net, &zones).unwrap();
        let loaded = load_city(&path).unwrap();

        let mut net2 = RoadNetwork::default();
        let mut zones2 = ZoneRegistry::default();
        loaded.apply(&mut net2, &mut zones2);

        assert_eq!(net2.roads.len(), 1);
        assert_eq!(net2.roads[0].id, net.roads[0].id);
        assert_eq!(net2.roads[0].pts, net.roads[0].pts);
        assert_eq!(net2.next_road_id, net.next_road_id);

        assert_eq!(zones2.strips.len(), 1);
        assert_eq!(zones2.strips[0].kind, ZoneKind::Office);
        assert_eq!(zones2.strips[0].side_mask, SIDE_BOTH);
        assert_eq!(zones2.next_zone_id, zones.next_zone_id);

        // Ids allocated after the load continue past loaded ones.
        assert_eq!(net2.allocate_id().0, net.next_road_id);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_version_mismatch_is_a_hard_failure() {
        let dir = test_dir("version");
        let path = dir.join("city.json");
        let (net, zones) = sample_model();
        save_city(&path, &net, &zones).unwrap();

        // Rewrite the version field only.
        let mut value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        value["version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let err = load_city(&path).unwrap_err();
        assert!(matches!(
            err,
            SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: 99
            }
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_version_is_rejected() {
        let dir = test_dir("no_version");
        let path = dir.join("city.json");
        fs::write(&path, b"{\"roads\":[]}").unwrap();
        assert!(matches!(
            load_city(&path).unwrap_err(),
            SaveError::MissingVersion
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_json_is_rejected() {
        let dir = test_dir("corrupt");
        let path = dir.join("city.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(load_city(&path).unwrap_err(), SaveError::Json(_)));
        let _ = fs::remove_dir_all(&dir);
    }
}

//! Core city-layout model: roads, zone strips, the chunked buildability
//! grid, derived lots and building instances, and the undo/redo edit stack.
//!
//! Everything here is headless. The renderer, camera and input layers live
//! outside this crate and communicate only through the resources exposed
//! here: they submit [`commands::EditCommand`] events, update
//! [`chunk::VisibleChunks`], and read the derived meshes and instance
//! batches.

use bevy::prelude::*;

pub mod buildings;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod geometry;
pub mod lots;
pub mod meshes;
pub mod rasterizer;
pub mod roads;
pub mod zones;

use buildings::{AssetCatalog, BuildingChunks, SpawnList};
use chunk::{VisibleChunks, WaterMap, ZoneChunkMap};
use commands::{CommandStack, EditCommand, RedoRequested, UndoRequested};
use lots::LotSet;
use meshes::{OverlayMesh, RoadMesh};
use roads::RoadNetwork;
use zones::ZoneRegistry;

// ---------------------------------------------------------------------------
// Dirty-flag cascade
// ---------------------------------------------------------------------------

/// Marks which derived layers must be recomputed on the next frame.
///
/// Derivation is strictly ordered: roads feed the zone grid, the grid feeds
/// lots, lots feed buildings. A road edit therefore invalidates everything
/// downstream of it.
#[derive(Resource)]
pub struct DirtyFlags {
    pub roads: bool,
    pub zones: bool,
    pub buildings: bool,
    /// One-shot: the next building rebuild places instances settled instead
    /// of animating them in. Set by bulk operations such as a save load.
    pub skip_spawn_animation: bool,
}

impl Default for DirtyFlags {
    fn default() -> Self {
        // Everything dirty at startup so the first frame derives a
        // consistent (if empty) state.
        Self {
            roads: true,
            zones: true,
            buildings: true,
            skip_spawn_animation: false,
        }
    }
}

impl DirtyFlags {
    /// Invalidate every derived layer, as after a load.
    pub fn mark_all(&mut self) {
        self.roads = true;
        self.zones = true;
        self.buildings = true;
    }
}

/// Runs the full derivation cascade for whatever is dirty this frame. All
/// stages run to completion synchronously, so later systems in the same
/// frame always observe a consistent derived state.
#[allow(clippy::too_many_arguments)]
pub fn run_derivation(
    time: Res<Time>,
    mut dirty: ResMut<DirtyFlags>,
    mut net: ResMut<RoadNetwork>,
    zones: Res<ZoneRegistry>,
    water: Res<WaterMap>,
    catalog: Res<AssetCatalog>,
    mut grid: ResMut<ZoneChunkMap>,
    mut lot_set: ResMut<LotSet>,
    mut road_mesh: ResMut<RoadMesh>,
    mut building_chunks: ResMut<BuildingChunks>,
    mut spawn: ResMut<SpawnList>,
) {
    if !(dirty.roads || dirty.zones || dirty.buildings) {
        return;
    }

    if dirty.roads {
        net.ensure_cum_lengths();
        meshes::build_road_ribbon(&net, &mut road_mesh);
    }
    if dirty.roads || dirty.zones {
        rasterizer::rebuild_zone_grid(&net, &zones, &water, &mut grid);
        lots::rebuild_lots(&net, &zones, &grid, &mut lot_set);
        dirty.buildings = true;
    }
    if dirty.buildings {
        buildings::rebuild_buildings(
            &net,
            &lot_set,
            &grid,
            &catalog,
            &mut building_chunks,
            &mut spawn,
            time.elapsed_secs(),
            !dirty.skip_spawn_animation,
        );
    }

    dirty.roads = false;
    dirty.zones = false;
    dirty.buildings = false;
    dirty.skip_spawn_animation = false;
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RoadNetwork>()
            .init_resource::<ZoneRegistry>()
            .init_resource::<ZoneChunkMap>()
            .init_resource::<WaterMap>()
            .init_resource::<VisibleChunks>()
            .init_resource::<LotSet>()
            .init_resource::<AssetCatalog>()
            .init_resource::<BuildingChunks>()
            .init_resource::<SpawnList>()
            .init_resource::<RoadMesh>()
            .init_resource::<OverlayMesh>()
            .init_resource::<DirtyFlags>()
            .init_resource::<CommandStack>()
            .add_event::<EditCommand>()
            .add_event::<UndoRequested>()
            .add_event::<RedoRequested>()
            .add_systems(
                Update,
                (
                    commands::process_edit_commands,
                    commands::process_undo,
                    commands::process_redo,
                    run_derivation,
                    meshes::refresh_overlay,
                    buildings::step_spawn_animations,
                )
                    .chain(),
            );
    }
}

#[cfg(test)]
pub mod test_harness;

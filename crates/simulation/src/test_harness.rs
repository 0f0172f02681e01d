//! # TestEditor — headless integration test harness
//!
//! Wraps `bevy::app::App` + `SimulationPlugin` for driving the editor core
//! without a window or renderer. Time advances in fixed 100ms steps per
//! `tick()`, so animation timing is deterministic.

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use crate::buildings::{BuildingChunks, SpawnList};
use crate::chunk::{VisibleChunks, WaterMap, ZoneChunkMap};
use crate::commands::{CommandStack, EditCommand, EditRejection};
use crate::config::CELL_SIZE;
use crate::lots::LotSet;
use crate::roads::{Road, RoadId, RoadNetwork};
use crate::zones::{ZoneKind, ZoneRegistry, ZoneStrip};
use crate::{DirtyFlags, SimulationPlugin};

/// Seconds of simulated time per `tick()`.
pub const TICK_SECS: f32 = 0.1;

pub struct TestEditor {
    pub app: App,
}

impl TestEditor {
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(
            100,
        )));
        // First update derives the empty initial state.
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    pub fn exec(&mut self, cmd: EditCommand) -> Result<(), EditRejection> {
        let world = self.app.world_mut();
        world.resource_scope(|world, mut stack: Mut<CommandStack>| {
            world.resource_scope(|world, mut roads: Mut<RoadNetwork>| {
                world.resource_scope(|world, mut zones: Mut<ZoneRegistry>| {
                    let mut dirty = world.resource_mut::<DirtyFlags>();
                    stack.exec(cmd, &mut roads, &mut zones, &mut dirty)
                })
            })
        })
    }

    /// Add a road and return its id. Panics on rejection; tests that
    /// exercise rejection call `exec` directly.
    pub fn add_road(&mut self, pts: &[Vec3]) -> RoadId {
        let id = self
            .app
            .world_mut()
            .resource_mut::<RoadNetwork>()
            .allocate_id();
        self.exec(EditCommand::AddRoad {
            road: Road::new(id, pts.to_vec()),
        })
        .unwrap();
        id
    }

    pub fn add_zone(
        &mut self,
        road_id: RoadId,
        d0: f32,
        d1: f32,
        side_mask: u8,
        kind: ZoneKind,
    ) -> Result<(), EditRejection> {
        let id = self
            .app
            .world_mut()
            .resource_mut::<ZoneRegistry>()
            .allocate_id();
        self.exec(EditCommand::AddZone {
            strip: ZoneStrip::new(id, road_id, d0, d1, side_mask, kind),
        })
    }

    pub fn undo(&mut self) -> bool {
        let world = self.app.world_mut();
        world.resource_scope(|world, mut stack: Mut<CommandStack>| {
            world.resource_scope(|world, mut roads: Mut<RoadNetwork>| {
                world.resource_scope(|world, mut zones: Mut<ZoneRegistry>| {
                    let mut dirty = world.resource_mut::<DirtyFlags>();
                    stack.undo(&mut roads, &mut zones, &mut dirty)
                })
            })
        })
    }

    pub fn redo(&mut self) -> bool {
        let world = self.app.world_mut();
        world.resource_scope(|world, mut stack: Mut<CommandStack>| {
            world.resource_scope(|world, mut roads: Mut<RoadNetwork>| {
                world.resource_scope(|world, mut zones: Mut<ZoneRegistry>| {
                    let mut dirty = world.resource_mut::<DirtyFlags>();
                    stack.redo(&mut roads, &mut zones, &mut dirty)
                })
            })
        })
    }

    // -----------------------------------------------------------------------
    // World setup
    // -----------------------------------------------------------------------

    /// Mark a world-space XZ rectangle as water.
    pub fn flood_rect(&mut self, min: Vec3, max: Vec3) {
        let mut water = self.app.world_mut().resource_mut::<WaterMap>();
        let mut x = min.x + CELL_SIZE * 0.5;
        while x < max.x {
            let mut z = min.z + CELL_SIZE * 0.5;
            while z < max.z {
                water.set_water(Vec3::new(x, 0.0, z));
                z += CELL_SIZE;
            }
            x += CELL_SIZE;
        }
        // Water is rasterizer input, so the grid must re-derive.
        self.app.world_mut().resource_mut::<DirtyFlags>().zones = true;
    }

    pub fn set_visible_rect(&mut self, min: Vec3, max: Vec3) {
        self.app
            .world_mut()
            .resource_mut::<VisibleChunks>()
            .set_rect(min, max);
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advance one frame (100ms of simulated time).
    pub fn tick(&mut self) {
        self.app.update();
    }

    /// Tick until at least `secs` of simulated time have passed.
    pub fn advance(&mut self, secs: f32) {
        let ticks = (secs / TICK_SECS).ceil() as usize;
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn now(&self) -> f32 {
        self.app.world().resource::<Time>().elapsed_secs()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn roads(&self) -> &RoadNetwork {
        self.app.world().resource::<RoadNetwork>()
    }

    pub fn zones(&self) -> &ZoneRegistry {
        self.app.world().resource::<ZoneRegistry>()
    }

    pub fn grid(&self) -> &ZoneChunkMap {
        self.app.world().resource::<ZoneChunkMap>()
    }

    pub fn lots(&self) -> &LotSet {
        self.app.world().resource::<LotSet>()
    }

    pub fn buildings(&self) -> &BuildingChunks {
        self.app.world().resource::<BuildingChunks>()
    }

    pub fn spawn_list(&self) -> &SpawnList {
        self.app.world().resource::<SpawnList>()
    }
}

impl Default for TestEditor {
    fn default() -> Self {
        Self::new()
    }
}

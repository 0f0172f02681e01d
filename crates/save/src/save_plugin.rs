//! Event-driven save/load entry points.
//!
//! The UI layer fires `SaveGameEvent` / `LoadGameEvent` with a target path;
//! the systems here run the serialization and, on load, reset the undo
//! history and invalidate every derived layer. The post-load rebuild places
//! buildings settled rather than replaying the spawn animation for an
//! entire city at once.

use bevy::prelude::*;
use std::path::PathBuf;

use simulation::commands::CommandStack;
use simulation::roads::RoadNetwork;
use simulation::zones::ZoneRegistry;
use simulation::DirtyFlags;

use crate::save_file::{load_city, save_city};

#[derive(Event)]
pub struct SaveGameEvent {
    pub path: PathBuf,
}

#[derive(Event)]
pub struct LoadGameEvent {
    pub path: PathBuf,
}

pub fn process_save_events(
    mut events: EventReader<SaveGameEvent>,
    net: Res<RoadNetwork>,
    zones: Res<ZoneRegistry>,
) {
    for event in events.read() {
        match save_city(&event.path, &net, &zones) {
            Ok(()) => info!("saved city to {}", event.path.display()),
            Err(e) => warn!("save to {} failed: {e}", event.path.display()),
        }
    }
}

pub fn process_load_events(
    mut events: EventReader<LoadGameEvent>,
    mut net: ResMut<RoadNetwork>,
    mut zones: ResMut<ZoneRegistry>,
    mut stack: ResMut<CommandStack>,
    mut dirty: ResMut<DirtyFlags>,
) {
    for event in events.read() {
        match load_city(&event.path) {
            Ok(file) => {
                file.apply(&mut net, &mut zones);
                // History refers to pre-load state; it cannot survive a load.
                stack.clear();
                dirty.mark_all();
                dirty.skip_spawn_animation = true;
                info!(
                    "loaded {} roads and {} zone strips from {}",
                    net.roads.len(),
                    zones.strips.len(),
                    event.path.display()
                );
            }
            Err(e) => warn!("load from {} failed: {e}", event.path.display()),
        }
    }
}

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveGameEvent>()
            .add_event::<LoadGameEvent>()
            .add_systems(Update, (process_save_events, process_load_events));
    }
}

//! Undo/redo command stack for road and zone edits.
//!
//! Every mutation of the road network or zone registry goes through an
//! `EditCommand`. Executing a command validates it, applies it, pushes it
//! onto the undo stack (capped at 100 entries) and clears the redo stack.
//! Commands only touch the authoritative model and set dirty flags; the
//! derived layers (grid, lots, buildings) are recomputed lazily on the next
//! frame.

use bevy::prelude::*;
use std::fmt;

use crate::config::{MAX_HISTORY, MIN_ROAD_LENGTH};
use crate::geometry::len_xz;
use crate::roads::{Road, RoadId, RoadNetwork};
use crate::zones::{snap_span, ZoneRegistry, ZoneStrip};
use crate::DirtyFlags;

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Expected user-input rejections. A rejected command is a no-op plus a
/// status message, never a crash or a partial edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRejection {
    /// The road (or extension) is shorter than the minimum length.
    RoadTooShort,
    /// A road needs at least two points at all times.
    TooFewPoints,
    /// An extension must contribute at least one point.
    EmptyExtension,
    /// The snapped zone interval is empty.
    DegenerateZoneSpan,
    /// The requested interval overlaps an existing strip on the same side.
    ZoneOverlap,
    UnknownRoad(RoadId),
    BadPointIndex(usize),
}

impl fmt::Display for EditRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditRejection::RoadTooShort => write!(f, "road is too short"),
            EditRejection::TooFewPoints => write!(f, "a road needs at least two points"),
            EditRejection::EmptyExtension => write!(f, "extension has no points"),
            EditRejection::DegenerateZoneSpan => write!(f, "zone interval is empty"),
            EditRejection::ZoneOverlap => {
                write!(f, "zone interval overlaps an existing strip")
            }
            EditRejection::UnknownRoad(id) => write!(f, "unknown road {}", id.0),
            EditRejection::BadPointIndex(i) => write!(f, "road has no point {i}"),
        }
    }
}

// ---------------------------------------------------------------------------
// EditCommand enum — each variant stores enough data to reverse the edit
// ---------------------------------------------------------------------------

/// A single undoable/redoable edit.
#[derive(Debug, Clone, Event)]
pub enum EditCommand {
    /// A new road polyline, with its id already allocated by the caller.
    AddRoad { road: Road },
    /// Points appended to one end of an existing road.
    ExtendRoad {
        road_id: RoadId,
        added: Vec<Vec3>,
        at_start: bool,
    },
    MoveRoadPoint {
        road_id: RoadId,
        index: usize,
        old_pos: Vec3,
        new_pos: Vec3,
    },
    /// `removed` is filled in by `apply` so the point can be restored.
    DeleteRoadPoint {
        road_id: RoadId,
        index: usize,
        removed: Option<Vec3>,
    },
    /// A new zone strip; its interval is snapped to cell boundaries on apply.
    AddZone { strip: ZoneStrip },
    /// `removed` is filled in by `apply` for restoration on undo.
    ClearZonesForRoad {
        road_id: RoadId,
        removed: Vec<ZoneStrip>,
    },
}

impl EditCommand {
    pub fn validate(
        &self,
        roads: &RoadNetwork,
        zones: &ZoneRegistry,
    ) -> Result<(), EditRejection> {
        match self {
            EditCommand::AddRoad { road } => {
                if road.pts.len() < 2 {
                    return Err(EditRejection::TooFewPoints);
                }
                let len: f32 = road.pts.windows(2).map(|w| len_xz(w[0], w[1])).sum();
                if len < MIN_ROAD_LENGTH {
                    return Err(EditRejection::RoadTooShort);
                }
                Ok(())
            }
            EditCommand::ExtendRoad {
                road_id,
                added,
                at_start,
            } => {
                let road = roads
                    .road(*road_id)
                    .ok_or(EditRejection::UnknownRoad(*road_id))?;
                if added.is_empty() {
                    return Err(EditRejection::EmptyExtension);
                }
                let junction = if *at_start {
                    road.pts[0]
                } else {
                    road.pts[road.pts.len() - 1]
                };
                let mut len = len_xz(junction, added[0]);
                len += added.windows(2).map(|w| len_xz(w[0], w[1])).sum::<f32>();
                if len < MIN_ROAD_LENGTH {
                    return Err(EditRejection::RoadTooShort);
                }
                Ok(())
            }
            EditCommand::MoveRoadPoint { road_id, index, .. } => {
                let road = roads
                    .road(*road_id)
                    .ok_or(EditRejection::UnknownRoad(*road_id))?;
                if *index >= road.pts.len() {
                    return Err(EditRejection::BadPointIndex(*index));
                }
                Ok(())
            }
            EditCommand::DeleteRoadPoint { road_id, index, .. } => {
                let road = roads
                    .road(*road_id)
                    .ok_or(EditRejection::UnknownRoad(*road_id))?;
                if *index >= road.pts.len() {
                    return Err(EditRejection::BadPointIndex(*index));
                }
                if road.pts.len() <= 2 {
                    return Err(EditRejection::TooFewPoints);
                }
                Ok(())
            }
            EditCommand::AddZone { strip } => {
                roads
                    .road(strip.road_id)
                    .ok_or(EditRejection::UnknownRoad(strip.road_id))?;
                let (lo, hi) = snap_span(strip.d0, strip.d1);
                if hi <= lo {
                    return Err(EditRejection::DegenerateZoneSpan);
                }
                if zones.overlaps_existing(strip.road_id, strip.side_mask, lo, hi) {
                    return Err(EditRejection::ZoneOverlap);
                }
                Ok(())
            }
            EditCommand::ClearZonesForRoad { road_id, .. } => {
                roads
                    .road(*road_id)
                    .ok_or(EditRejection::UnknownRoad(*road_id))?;
                Ok(())
            }
        }
    }

    pub fn apply(
        &mut self,
        roads: &mut RoadNetwork,
        zones: &mut ZoneRegistry,
        dirty: &mut DirtyFlags,
    ) {
        match self {
            EditCommand::AddRoad { road } => {
                let mut road = road.clone();
                road.rebuild_cum();
                roads.roads.push(road);
                dirty.roads = true;
            }
            EditCommand::ExtendRoad {
                road_id,
                added,
                at_start,
            } => {
                if let Some(road) = roads.road_mut(*road_id) {
                    if *at_start {
                        // New points lead into the old first point, so they
                        // arrive ordered from the far end inward.
                        road.pts.splice(0..0, added.iter().copied());
                    } else {
                        road.pts.extend(added.iter().copied());
                    }
                    road.rebuild_cum();
                    dirty.roads = true;
                }
            }
            EditCommand::MoveRoadPoint {
                road_id,
                index,
                new_pos,
                ..
            } => {
                if let Some(road) = roads.road_mut(*road_id) {
                    road.pts[*index] = *new_pos;
                    road.rebuild_cum();
                    dirty.roads = true;
                }
            }
            EditCommand::DeleteRoadPoint {
                road_id,
                index,
                removed,
            } => {
                if let Some(road) = roads.road_mut(*road_id) {
                    *removed = Some(road.pts.remove(*index));
                    road.rebuild_cum();
                    dirty.roads = true;
                }
            }
            EditCommand::AddZone { strip } => {
                let (lo, hi) = snap_span(strip.d0, strip.d1);
                strip.d0 = lo;
                strip.d1 = hi;
                zones.strips.push(strip.clone());
                dirty.zones = true;
            }
            EditCommand::ClearZonesForRoad { road_id, removed } => {
                *removed = zones.clear_for_road(*road_id);
                dirty.zones = true;
            }
        }
    }

    pub fn invert(
        &mut self,
        roads: &mut RoadNetwork,
        zones: &mut ZoneRegistry,
        dirty: &mut DirtyFlags,
    ) {
        match self {
            EditCommand::AddRoad { road } => {
                roads.remove(road.id);
                dirty.roads = true;
            }
            EditCommand::ExtendRoad {
                road_id,
                added,
                at_start,
            } => {
                if let Some(road) = roads.road_mut(*road_id) {
                    let n = added.len();
                    if *at_start {
                        road.pts.drain(0..n);
                    } else {
                        let keep = road.pts.len() - n;
                        road.pts.truncate(keep);
                    }
                    road.rebuild_cum();
                    dirty.roads = true;
                }
            }
            EditCommand::MoveRoadPoint {
                road_id,
                index,
                old_pos,
                ..
            } => {
                if let Some(road) = roads.road_mut(*road_id) {
                    road.pts[*index] = *old_pos;
                    road.rebuild_cum();
                    dirty.roads = true;
                }
            }
            EditCommand::DeleteRoadPoint {
                road_id,
                index,
                removed,
            } => {
                if let (Some(road), Some(point)) = (roads.road_mut(*road_id), *removed) {
                    road.pts.insert(*index, point);
                    road.rebuild_cum();
                    dirty.roads = true;
                }
            }
            EditCommand::AddZone { strip } => {
                zones.remove(strip.id);
                dirty.zones = true;
            }
            EditCommand::ClearZonesForRoad { removed, .. } => {
                zones.strips.extend(removed.iter().cloned());
                dirty.zones = true;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandStack resource
// ---------------------------------------------------------------------------

#[derive(Resource, Default)]
pub struct CommandStack {
    pub undo_stack: Vec<EditCommand>,
    pub redo_stack: Vec<EditCommand>,
}

impl CommandStack {
    /// Validate and apply a command, recording it for undo. On rejection the
    /// model is untouched and the history unchanged.
    pub fn exec(
        &mut self,
        mut cmd: EditCommand,
        roads: &mut RoadNetwork,
        zones: &mut ZoneRegistry,
        dirty: &mut DirtyFlags,
    ) -> Result<(), EditRejection> {
        cmd.validate(roads, zones)?;
        cmd.apply(roads, zones, dirty);
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(())
    }

    /// Returns false when there is nothing to undo.
    pub fn undo(
        &mut self,
        roads: &mut RoadNetwork,
        zones: &mut ZoneRegistry,
        dirty: &mut DirtyFlags,
    ) -> bool {
        let Some(mut cmd) = self.undo_stack.pop() else {
            return false;
        };
        cmd.invert(roads, zones, dirty);
        self.redo_stack.push(cmd);
        true
    }

    /// Returns false when there is nothing to redo.
    pub fn redo(
        &mut self,
        roads: &mut RoadNetwork,
        zones: &mut ZoneRegistry,
        dirty: &mut DirtyFlags,
    ) -> bool {
        let Some(mut cmd) = self.redo_stack.pop() else {
            return false;
        };
        cmd.apply(roads, zones, dirty);
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

// ---------------------------------------------------------------------------
// Events and systems
// ---------------------------------------------------------------------------

/// Marker event: the user wants to undo.
#[derive(Event)]
pub struct UndoRequested;

/// Marker event: the user wants to redo.
#[derive(Event)]
pub struct RedoRequested;

/// Executes submitted edit commands against the model. Rejections are
/// logged and otherwise ignored.
pub fn process_edit_commands(
    mut events: EventReader<EditCommand>,
    mut stack: ResMut<CommandStack>,
    mut roads: ResMut<RoadNetwork>,
    mut zones: ResMut<ZoneRegistry>,
    mut dirty: ResMut<DirtyFlags>,
) {
    for cmd in events.read() {
        if let Err(rejection) = stack.exec(cmd.clone(), &mut roads, &mut zones, &mut dirty) {
            warn!("edit rejected: {rejection}");
        }
    }
}

pub fn process_undo(
    mut events: EventReader<UndoRequested>,
    mut stack: ResMut<CommandStack>,
    mut roads: ResMut<RoadNetwork>,
    mut zones: ResMut<ZoneRegistry>,
    mut dirty: ResMut<DirtyFlags>,
) {
    for _ in events.read() {
        stack.undo(&mut roads, &mut zones, &mut dirty);
    }
}

pub fn process_redo(
    mut events: EventReader<RedoRequested>,
    mut stack: ResMut<CommandStack>,
    mut roads: ResMut<RoadNetwork>,
    mut zones: ResMut<ZoneRegistry>,
    mut dirty: ResMut<DirtyFlags>,
) {
    for _ in events.read() {
        stack.redo(&mut roads, &mut zones, &mut dirty);
    }
}

//! Fixed constants for the editor core. Chunk size and cell resolution are
//! process-lifetime constants; derived data is never migrated between
//! different grid configurations.

/// Edge length of one zoning cell in world units.
pub const CELL_SIZE: f32 = 2.0;
/// Cells per chunk edge; each chunk owns a `CHUNK_CELLS` x `CHUNK_CELLS` grid.
pub const CHUNK_CELLS: usize = 128;
/// Edge length of one chunk in world units.
pub const CHUNK_SIZE: f32 = CELL_SIZE * CHUNK_CELLS as f32;

/// Physical road bed width in world units.
pub const ROAD_WIDTH: f32 = 10.0;
pub const ROAD_HALF_WIDTH: f32 = ROAD_WIDTH * 0.5;

/// Arc-length step used when stamping bands into the cell grid.
/// Half a cell so diagonal roads leave no gaps.
pub const RASTER_STEP: f32 = CELL_SIZE * 0.5;

/// Rows of cells marked buildable on each side of a road, starting just
/// outside the road bed.
pub const BUILDABLE_BAND_ROWS: usize = 16;

/// Depth of a zone strip away from the road edge.
pub const ZONE_DEPTH: f32 = 30.0;

/// Arc-length spacing between candidate lots along a road.
pub const LOT_STEP: f32 = 16.0;
/// Candidate lot rectangle extent along the road tangent.
pub const LOT_WIDTH: f32 = 14.0;
/// Candidate lot rectangle extent away from the road.
pub const LOT_DEPTH: f32 = 12.0;
/// Gap between the road edge and the near edge of a lot. Matches the
/// building road clearance so accepted lots always pass the placement
/// clearance check.
pub const LOT_SETBACK: f32 = 10.0;
/// Fraction of coverage samples that must be buildable for a lot to pass.
pub const LOT_COVERAGE_MIN: f32 = 0.85;
/// Samples per axis for the rectangle coverage test.
pub const COVERAGE_SAMPLES: usize = 8;
/// Coarse grid cell used to deduplicate near-identical lots and as the
/// first-pass occupancy check during building placement.
pub const LOT_DEDUP_CELL: f32 = 6.0;

/// Candidate points closer than this to another, non-parallel road are
/// culled (intersection exclusion).
pub const INTERSECTION_CLEARANCE: f32 = 18.0;
/// Two roads with |tangent dot| above this count as parallel and do not
/// trigger intersection culling against each other.
pub const INTERSECTION_ALIGN_DOT: f32 = 0.9;

/// Required distance from a building center to the nearest road edge.
pub const BUILDING_CLEARANCE: f32 = 10.0;
/// Minimum gap between the bounding disks of two placed buildings.
pub const BUILDING_GAP: f32 = 1.0;
/// Bucket edge length of the spatial hash used for pairwise overlap tests.
pub const BUILDING_HASH_CELL: f32 = 8.0;

/// Duration of the spawn scale-in animation, in seconds.
pub const SPAWN_ANIM_DURATION: f32 = 0.35;
/// Maximum per-instance start-time jitter, in seconds.
pub const SPAWN_JITTER_MAX: f32 = 0.12;

/// Roads (and road extensions) shorter than this are rejected as degenerate.
pub const MIN_ROAD_LENGTH: f32 = 1.0;

/// Maximum number of commands kept on the undo stack.
pub const MAX_HISTORY: usize = 100;

//! 2D segment/polyline math on the XZ plane. Y is ignored everywhere; all
//! returned points have `y = 0`.

use bevy::prelude::*;

use crate::roads::Road;

/// XZ-plane distance between two points.
pub fn len_xz(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(b.x - a.x, b.z - a.z).length()
}

/// Projects `p` onto the segment `a..b` (XZ only), clamped to the segment.
/// Returns the closest point and the clamped parameter `t` in `[0, 1]`.
pub fn closest_param_on_segment_xz(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ap = Vec2::new(p.x - a.x, p.z - a.z);
    let ab = Vec2::new(b.x - a.x, b.z - a.z);
    let ab2 = ab.length_squared();
    let t = if ab2 > 1e-8 {
        (ap.dot(ab) / ab2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut closest = a + (b - a) * t;
    closest.y = 0.0;
    (closest, t)
}

/// Result of projecting a point onto a road polyline.
#[derive(Debug, Clone, Copy)]
pub struct RoadHit {
    /// Squared XZ distance to the closest point on the road.
    pub dist_sq: f32,
    /// Arc length from the road start to the closest point.
    pub along: f32,
    /// Unit tangent of the winning segment.
    pub tangent: Vec3,
}

impl RoadHit {
    /// Sentinel for degenerate roads: infinitely far away, no match.
    pub const NONE: RoadHit = RoadHit {
        dist_sq: f32::INFINITY,
        along: 0.0,
        tangent: Vec3::X,
    };
}

/// Scans every segment of `road` and returns the closest hit. Linear in the
/// road's point count; roads are short editor-authored polylines, not
/// imported networks, so no acceleration structure is kept.
///
/// A road with fewer than two points yields [`RoadHit::NONE`]; callers must
/// treat that as "no match".
pub fn closest_distance_along_road(road: &Road, p: Vec3) -> RoadHit {
    if road.pts.len() < 2 {
        return RoadHit::NONE;
    }

    let mut best = RoadHit::NONE;
    for i in 0..road.pts.len() - 1 {
        let a = road.pts[i];
        let b = road.pts[i + 1];
        let (closest, t) = closest_param_on_segment_xz(p, a, b);
        let dist_sq = Vec2::new(p.x - closest.x, p.z - closest.z).length_squared();
        if dist_sq < best.dist_sq {
            let seg_len = len_xz(a, b);
            let along = road.cum_len.get(i).copied().unwrap_or(0.0) + t * seg_len;

            let mut dir = b - a;
            dir.y = 0.0;
            let tangent = if dir.length_squared() > 1e-12 {
                dir.normalize()
            } else {
                Vec3::X
            };
            best = RoadHit {
                dist_sq,
                along,
                tangent,
            };
        }
    }
    best
}

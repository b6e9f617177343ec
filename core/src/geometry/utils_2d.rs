//! 2D geometry utilities used by the reference solver's residuals.
//!
//! Everything works on plain `[f64; 2]` values read out of the solver's
//! parameter array.

use std::f64::consts::{PI, TAU};

use super::EPSILON;

// =============================================================================
// Point Operations
// =============================================================================

/// Compute squared distance between two 2D points.
#[inline]
pub fn distance_squared(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    let d = sub_2d(p2, p1);
    dot_2d(d, d)
}

/// Compute distance between two 2D points.
#[inline]
pub fn distance(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    distance_squared(p1, p2).sqrt()
}

/// Midpoint between two 2D points.
#[inline]
pub fn midpoint(p1: [f64; 2], p2: [f64; 2]) -> [f64; 2] {
    [(p1[0] + p2[0]) * 0.5, (p1[1] + p2[1]) * 0.5]
}

/// Point on a circle of `radius` around `center` at `angle`.
#[inline]
pub fn arc_point(center: [f64; 2], radius: f64, angle: f64) -> [f64; 2] {
    [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()]
}

// =============================================================================
// Vector Operations
// =============================================================================

/// `a - b`
#[inline]
pub fn sub_2d(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

/// 2D cross product (z-component of 3D cross product).
/// Positive if v2 is counter-clockwise from v1.
#[inline]
pub fn cross_2d(v1: [f64; 2], v2: [f64; 2]) -> f64 {
    v1[0] * v2[1] - v1[1] * v2[0]
}

/// 2D dot product.
#[inline]
pub fn dot_2d(v1: [f64; 2], v2: [f64; 2]) -> f64 {
    v1[0] * v2[0] + v1[1] * v2[1]
}

#[inline]
pub fn length_2d(v: [f64; 2]) -> f64 {
    dot_2d(v, v).sqrt()
}

/// Normalize a 2D vector. Returns [0, 0] if vector is zero.
#[inline]
pub fn normalize_2d(v: [f64; 2]) -> [f64; 2] {
    let len = length_2d(v);
    if len < EPSILON {
        [0.0, 0.0]
    } else {
        [v[0] / len, v[1] / len]
    }
}

/// Perpendicular vector (90° counter-clockwise rotation).
#[inline]
pub fn perpendicular_ccw(v: [f64; 2]) -> [f64; 2] {
    [-v[1], v[0]]
}

// =============================================================================
// Line Operations
// =============================================================================

/// Signed distance from `point` to the infinite line through `start` and `end`.
/// Falls back to the distance to `start` for a degenerate line.
pub fn signed_distance_point_to_line(start: [f64; 2], end: [f64; 2], point: [f64; 2]) -> f64 {
    let dir = sub_2d(end, start);
    let len = length_2d(dir);
    if len < EPSILON {
        return distance(start, point);
    }
    cross_2d(dir, sub_2d(point, start)) / len
}

// =============================================================================
// Angles
// =============================================================================

/// Wrap an angle difference into `(-PI, PI]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed angle from `v1` to `v2`.
#[inline]
pub fn angle_between(v1: [f64; 2], v2: [f64; 2]) -> f64 {
    cross_2d(v1, v2).atan2(dot_2d(v1, v2))
}

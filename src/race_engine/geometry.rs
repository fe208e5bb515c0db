//! Geometry - Points, cubic Bezier evaluation and racing-line sampling
//!
//! The racing line is a closed chain of cubic Bezier segments. Every segment
//! is sampled at a fixed number of parameter steps, so the path is a dense
//! point list whose order is the direction of travel.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Samples taken per Bezier segment (t = j / 60, j = 0..59)
pub const SEGMENT_SAMPLES: usize = 60;

/// A 2D point or vector in world pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
}

impl PathPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: PathPoint) -> PathPoint {
        PathPoint::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: PathPoint) -> PathPoint {
        PathPoint::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f32) -> PathPoint {
        PathPoint::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalize(self) -> PathPoint {
        let len = self.length();
        if len > f32::EPSILON {
            self.scale(1.0 / len)
        } else {
            PathPoint::default()
        }
    }

    /// Rotate 90 degrees (x, y) -> (-y, x)
    pub fn perpendicular(self) -> PathPoint {
        PathPoint::new(-self.y, self.x)
    }
}

/// Euclidean distance between two points
pub fn distance(a: PathPoint, b: PathPoint) -> f32 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Heading in radians from `from` towards `to`
pub fn heading_to(from: PathPoint, to: PathPoint) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Wrap an angle into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = PI - (PI - angle).rem_euclid(TAU);
    // rem_euclid can round up to TAU for tiny negative inputs
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Evaluate a cubic Bezier curve at `t` in [0, 1] (Bernstein basis)
pub fn cubic_bezier(
    p0: PathPoint,
    cp1: PathPoint,
    cp2: PathPoint,
    p3: PathPoint,
    t: f32,
) -> PathPoint {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;

    PathPoint {
        x: b0 * p0.x + b1 * cp1.x + b2 * cp2.x + b3 * p3.x,
        y: b0 * p0.y + b1 * cp1.y + b2 * cp2.y + b3 * p3.y,
    }
}

/// An editable anchor with tangent handles stored as offsets from the anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierNode {
    pub x: f32,
    pub y: f32,
    pub handle_in: PathPoint,
    pub handle_out: PathPoint,
}

impl BezierNode {
    pub const fn new(x: f32, y: f32, handle_in: PathPoint, handle_out: PathPoint) -> Self {
        Self {
            x,
            y,
            handle_in,
            handle_out,
        }
    }

    pub fn anchor(&self) -> PathPoint {
        PathPoint::new(self.x, self.y)
    }

    /// Absolute position of the incoming control point
    pub fn control_in(&self) -> PathPoint {
        self.anchor().add(self.handle_in)
    }

    /// Absolute position of the outgoing control point
    pub fn control_out(&self) -> PathPoint {
        self.anchor().add(self.handle_out)
    }
}

/// Sample the closed Bezier chain described by `nodes`.
///
/// Each consecutive node pair (the last one wrapping to the first) yields
/// [`SEGMENT_SAMPLES`] points, so the result always holds
/// `SEGMENT_SAMPLES * nodes.len()` points. Segment joins are not
/// deduplicated. Callers that need a meaningful track validate the node
/// count first (see `track::validate_nodes`).
pub fn generate_path(nodes: &[BezierNode]) -> Vec<PathPoint> {
    let count = nodes.len();
    let mut path = Vec::with_capacity(count * SEGMENT_SAMPLES);

    for (i, start) in nodes.iter().enumerate() {
        let end = &nodes[(i + 1) % count];
        let p0 = start.anchor();
        let cp1 = start.control_out();
        let cp2 = end.control_in();
        let p3 = end.anchor();

        for j in 0..SEGMENT_SAMPLES {
            let t = j as f32 / SEGMENT_SAMPLES as f32;
            path.push(cubic_bezier(p0, cp1, cp2, p3, t));
        }
    }

    path
}

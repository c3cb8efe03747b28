//! Shared planar geometry helpers.
//!
//! Everything here operates on plain `f64` coordinates in map units. The
//! crate never owns CRS definitions; see [`crate::project`] for the
//! reprojection seam.

use serde::{Deserialize, Serialize};

/// A point in the mesh's planar coordinate system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Point2) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Linear interpolation between `self` and `other` at parameter `t`.
    #[inline]
    pub fn lerp(self, other: Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Axis-aligned bounding rectangle `(xmin, ymin, xmax, ymax)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// An inverted extent that any `expand` call will overwrite.
    pub fn empty() -> Self {
        Self {
            xmin: f64::MAX,
            ymin: f64::MAX,
            xmax: f64::MIN,
            ymax: f64::MIN,
        }
    }

    /// Grow the extent to cover `(x, y)`.
    pub fn expand(&mut self, x: f64, y: f64) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
    }

    /// Closed-interval containment test; boundary points count as inside.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Total length of a polyline.
pub fn polyline_length(points: &[Point2]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

/// Point at arc-length `distance` along a polyline.
///
/// Distances beyond the ends clamp to the first/last vertex. Returns `None`
/// for an empty polyline.
pub fn point_at_distance(points: &[Point2], distance: f64) -> Option<Point2> {
    let (&first, rest) = points.split_first()?;
    if distance <= 0.0 || rest.is_empty() {
        return Some(first);
    }
    let mut walked = 0.0;
    let mut prev = first;
    for &next in rest {
        let seg = prev.distance(next);
        if seg > 0.0 && walked + seg >= distance {
            let t = (distance - walked) / seg;
            return Some(prev.lerp(next, t));
        }
        walked += seg;
        prev = next;
    }
    Some(prev)
}

/// Ray-casting point-in-polygon test.
///
/// The polygon is implicitly closed; boundary behavior follows the usual
/// crossing-parity convention.
pub fn point_in_polygon(x: f64, y: f64, vertices: &[Point2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.y > y) != (vj.y > y)) && (x < (vj.x - vi.x) * (y - vi.y) / (vj.y - vi.y) + vi.x) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Signed area of a polygon (positive for counter-clockwise winding).
pub fn polygon_area(vertices: &[Point2]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    acc * 0.5
}

/// 2D cross product of vectors `a` and `b`.
#[inline]
pub(crate) fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

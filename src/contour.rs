//! Contour/isoband engine.
//!
//! Works element by element on the per-node scalar view of an output:
//! isolines collect edge crossings where vertex values straddle a break
//! value; isobands clip each element polygon against the two break planes
//! of an interval (Sutherland-Hodgman in value space). Elements touching a
//! NODATA value are skipped entirely, so no partial geometry leaks through
//! holes.
//!
//! Segments at one level are deduplicated but not merged into polylines;
//! multi-segment output per level is expected.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::dataset::{Dataset, Output, ValueLocation, is_nodata};
use crate::error::MeshScopeError;
use crate::geometry::{Point2, polygon_area};
use crate::mesh::Mesh;

/// Where break values come from.
#[derive(Clone, Debug, PartialEq)]
pub enum Breaks {
    /// Evenly spaced levels at this interval, spanning the output's value
    /// range.
    Interval(f64),
    /// Explicit ordered break values (e.g. from a
    /// [`ColorMap`](crate::colormap::ColorMap)).
    Explicit(Vec<f64>),
}

/// All line segments of one isoline level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IsolineLevel {
    pub level: f64,
    pub segments: Vec<[Point2; 2]>,
}

/// All polygons of one isoband interval `[lower, upper)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IsobandLevel {
    pub lower: f64,
    pub upper: f64,
    pub polygons: Vec<Vec<Point2>>,
}

/// Resolve a break source against an output's value range.
///
/// A degenerate range (`min == max`) with no explicit list yields no
/// breaks, and therefore no geometry; that is not an error.
pub fn resolve_breaks(breaks: &Breaks, output: &Output) -> Result<Vec<f64>, MeshScopeError> {
    match breaks {
        Breaks::Explicit(values) => Ok(values.clone()),
        Breaks::Interval(step) => {
            if !(*step > 0.0) {
                return Err(MeshScopeError::InvalidData(format!(
                    "contour interval must be positive, got {step}"
                )));
            }
            let Some((min, max)) = output
                .values()
                .filter(|&v| !is_nodata(v))
                .minmax()
                .into_option()
            else {
                return Ok(Vec::new());
            };
            if min == max {
                return Ok(Vec::new());
            }
            // Levels are computed by index, not by repeated addition: for
            // values where `step` is below one ulp, `level += step` would
            // stall and never reach `max`.
            let start = (min / step).floor() * step;
            let mut levels = Vec::new();
            let mut i = 0u64;
            loop {
                let level = start + i as f64 * step;
                if level > max {
                    break;
                }
                if level >= min {
                    levels.push(level);
                }
                i += 1;
            }
            // Rounding can land consecutive indices on the same value.
            levels.dedup();
            Ok(levels)
        }
    }
}

/// Generate isolines for every resolved break value.
pub fn isolines(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    breaks: &Breaks,
) -> Result<Vec<IsolineLevel>, MeshScopeError> {
    let levels = resolve_breaks(breaks, output)?;
    let node_values = node_scalar_values(mesh, dataset, output);
    let mut result: Vec<IsolineLevel> = levels
        .iter()
        .map(|&level| IsolineLevel {
            level,
            segments: Vec::new(),
        })
        .collect();
    let mut seen: Vec<HashSet<SegmentKey>> = vec![HashSet::new(); levels.len()];

    for element_index in 0..mesh.element_count() {
        let Some(corners) = element_corner_values(mesh, element_index, &node_values) else {
            continue;
        };
        for (li, &level) in levels.iter().enumerate() {
            let crossings = edge_crossings(&corners, level);
            // Pair crossings in the order found; a saddle quad yields two
            // segments.
            for pair in crossings.chunks_exact(2) {
                let segment = [pair[0], pair[1]];
                if seen[li].insert(SegmentKey::new(&segment)) {
                    result[li].segments.push(segment);
                }
            }
        }
    }
    Ok(result)
}

/// Generate isobands for every interval between consecutive break values.
pub fn isobands(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    breaks: &Breaks,
) -> Result<Vec<IsobandLevel>, MeshScopeError> {
    let levels = resolve_breaks(breaks, output)?;
    let node_values = node_scalar_values(mesh, dataset, output);
    let mut result: Vec<IsobandLevel> = levels
        .windows(2)
        .map(|w| IsobandLevel {
            lower: w[0],
            upper: w[1],
            polygons: Vec::new(),
        })
        .collect();

    for element_index in 0..mesh.element_count() {
        let Some(corners) = element_corner_values(mesh, element_index, &node_values) else {
            continue;
        };
        for band in result.iter_mut() {
            let clipped = clip_band(&corners, band.lower, band.upper);
            // Clips that collapse onto a break plane have no area and are
            // not emitted.
            if clipped.len() >= 3 && polygon_area(&clipped).abs() > 1e-12 {
                band.polygons.push(clipped);
            }
        }
    }
    Ok(result)
}

/// Per-node scalar values for contouring.
///
/// Node-located outputs are used directly. Element-located outputs are
/// converted by averaging each node's adjacent element values, skipping
/// holes; a node with only NODATA neighbors stays NODATA.
fn node_scalar_values(mesh: &Mesh, dataset: &Dataset, output: &Output) -> Vec<f64> {
    match dataset.location() {
        ValueLocation::Node => output.values().collect(),
        ValueLocation::Element => {
            let mut sums = vec![0.0; mesh.node_count()];
            let mut counts = vec![0usize; mesh.node_count()];
            for element_index in 0..mesh.element_count() {
                let v = output.value(element_index);
                if is_nodata(v) || !output.is_active(element_index) {
                    continue;
                }
                let Ok(element) = mesh.element(element_index) else {
                    continue;
                };
                for &n in element.node_indices() {
                    sums[n] += v;
                    counts[n] += 1;
                }
            }
            sums.iter()
                .zip(&counts)
                .map(|(&s, &c)| {
                    if c == 0 {
                        crate::dataset::NODATA
                    } else {
                        s / c as f64
                    }
                })
                .collect()
        }
    }
}

/// Vertex positions and values of a contourable element.
///
/// Returns `None` for invalid, non-2D, and NODATA-touching elements.
fn element_corner_values(
    mesh: &Mesh,
    element_index: usize,
    node_values: &[f64],
) -> Option<Vec<(Point2, f64)>> {
    let element = mesh.element(element_index).ok()?;
    if !element.is_valid(mesh.node_count()) || element.element_type().dimension() < 2 {
        return None;
    }
    let mut corners = Vec::with_capacity(element.node_indices().len());
    for &n in element.node_indices() {
        let v = *node_values.get(n)?;
        if is_nodata(v) {
            return None;
        }
        let node = mesh.node(n).ok()?;
        corners.push((Point2::new(node.x, node.y), v));
    }
    Some(corners)
}

/// Points where element edges cross `level`, walking edges in order.
fn edge_crossings(corners: &[(Point2, f64)], level: f64) -> Vec<Point2> {
    let n = corners.len();
    let mut crossings = Vec::new();
    for i in 0..n {
        let (pa, va) = corners[i];
        let (pb, vb) = corners[(i + 1) % n];
        // Half-open straddle test: one endpoint >= level, the other below.
        let a_above = va >= level;
        let b_above = vb >= level;
        if a_above != b_above {
            let t = (level - va) / (vb - va);
            crossings.push(pa.lerp(pb, t));
        }
    }
    crossings
}

/// Clip an element polygon to the value band `[lower, upper)`.
///
/// Two half-plane passes in value space; crossing points interpolate both
/// coordinates and value linearly along the edge.
fn clip_band(corners: &[(Point2, f64)], lower: f64, upper: f64) -> Vec<Point2> {
    let kept = clip_half(corners, |v| v >= lower, lower);
    let kept = clip_half(&kept, |v| v <= upper, upper);
    kept.into_iter().map(|(p, _)| p).collect()
}

fn clip_half(
    corners: &[(Point2, f64)],
    keep: impl Fn(f64) -> bool,
    level: f64,
) -> Vec<(Point2, f64)> {
    let n = corners.len();
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(n + 2);
    for i in 0..n {
        let (pa, va) = corners[i];
        let (pb, vb) = corners[(i + 1) % n];
        let keep_a = keep(va);
        let keep_b = keep(vb);
        if keep_a {
            out.push((pa, va));
        }
        if keep_a != keep_b && vb != va {
            let t = (level - va) / (vb - va);
            out.push((pa.lerp(pb, t), level));
        }
    }
    out
}

/// Hashable key for segment deduplication: endpoint bit patterns in
/// canonical order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct SegmentKey([u64; 4]);

impl SegmentKey {
    fn new(segment: &[Point2; 2]) -> Self {
        let a = [segment[0].x.to_bits(), segment[0].y.to_bits()];
        let b = [segment[1].x.to_bits(), segment[1].y.to_bits()];
        if a <= b {
            Self([a[0], a[1], b[0], b[1]])
        } else {
            Self([b[0], b[1], a[0], a[1]])
        }
    }
}

//! Point sampler: interpolated values at arbitrary `(x, y)` positions.
//!
//! Sampling locates the containing element through the mesh's spatial
//! index, then evaluates the element's natural shape function: barycentric
//! weights for triangles, inverse-bilinear for quads, and a barycentric fan
//! for general convex polygons. Per-element outputs are piecewise-constant;
//! no interpolation happens for them.
//!
//! Holes propagate strictly: a point outside the mesh, an inactive (dry)
//! element, or any NODATA contributing node yields
//! [`NODATA`](crate::dataset::NODATA). There is no partial blending across
//! holes.
//!
//! Weights sum to 1 inside an element by construction, and values along a
//! shared edge depend only on that edge's two endpoints, so sampling is
//! continuous across element boundaries regardless of which adjacent
//! element the point-location step picks.

use crate::dataset::{Dataset, NODATA, Output, ValueLocation, is_nodata};
use crate::geometry::{Point2, cross};
use crate::mesh::{ElementType, Mesh, barycentric, fan_triangles};

/// Sample the scalar view of `output` at `(x, y)`.
///
/// Vector outputs yield their magnitude. Returns NODATA for points outside
/// the mesh, inactive elements, and holes.
pub fn value_at(mesh: &Mesh, dataset: &Dataset, output: &Output, x: f64, y: f64) -> f64 {
    sample(mesh, dataset, output, x, y, |out, i| out.value(i))
}

/// Sample the `(x, y)` vector components of `output` at a point.
///
/// Scalar outputs and holes yield `(NODATA, NODATA)`; both components are
/// interpolated with the same weights.
pub fn vector_value_at(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    x: f64,
    y: f64,
) -> (f64, f64) {
    let vx = sample(mesh, dataset, output, x, y, |out, i| out.vector_value(i).0);
    if is_nodata(vx) {
        return (NODATA, NODATA);
    }
    let vy = sample(mesh, dataset, output, x, y, |out, i| out.vector_value(i).1);
    if is_nodata(vy) {
        return (NODATA, NODATA);
    }
    (vx, vy)
}

/// Sample with a caller-supplied per-index accessor (scalar view or one
/// vector component).
fn sample(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    x: f64,
    y: f64,
    read: impl Fn(&Output, usize) -> f64,
) -> f64 {
    let Some(element_index) = mesh.find_containing_element(x, y) else {
        return NODATA;
    };
    if !output.is_active(element_index) {
        return NODATA;
    }
    match dataset.location() {
        ValueLocation::Element => read(output, element_index),
        ValueLocation::Node => {
            let element = match mesh.element(element_index) {
                Ok(e) => e,
                Err(_) => return NODATA,
            };
            let values: Vec<f64> = element
                .node_indices()
                .iter()
                .map(|&n| read(output, n))
                .collect();
            if values.iter().copied().any(is_nodata) {
                return NODATA;
            }
            let vertices = mesh.element_vertices(element_index);
            match element.element_type() {
                ElementType::Triangle => interpolate_triangle(&vertices, &values, x, y),
                ElementType::Quad => interpolate_quad(&vertices, &values, x, y),
                ElementType::Polygon => interpolate_fan(&vertices, &values, x, y),
                // Point/line/undefined cells are never returned by the
                // containment query.
                _ => NODATA,
            }
        }
    }
}

fn interpolate_triangle(vertices: &[Point2], values: &[f64], x: f64, y: f64) -> f64 {
    match barycentric(vertices[0], vertices[1], vertices[2], x, y) {
        Some([l1, l2, l3]) => l1 * values[0] + l2 * values[1] + l3 * values[2],
        None => NODATA,
    }
}

/// Bilinear interpolation on a quad via analytic inverse mapping.
///
/// Solves `p = (1-u)(1-v)a + u(1-v)b + uv c + (1-u)v d` for `(u, v)` and
/// applies the tensor-product weights. Falls back to the fan interpolant
/// when the inverse mapping is numerically degenerate.
fn interpolate_quad(vertices: &[Point2], values: &[f64], x: f64, y: f64) -> f64 {
    let Some((u, v)) = inverse_bilinear(vertices, x, y) else {
        return interpolate_fan(vertices, values, x, y);
    };
    let w0 = (1.0 - u) * (1.0 - v);
    let w1 = u * (1.0 - v);
    let w2 = u * v;
    let w3 = (1.0 - u) * v;
    w0 * values[0] + w1 * values[1] + w2 * values[2] + w3 * values[3]
}

/// Invert the bilinear map of a quad at `(x, y)`.
///
/// Returns `None` when no parameter pair in `[0, 1]^2` (with tolerance)
/// exists, which for points inside the quad only happens in degenerate
/// configurations.
fn inverse_bilinear(vertices: &[Point2], x: f64, y: f64) -> Option<(f64, f64)> {
    const PARAM_TOL: f64 = 1e-9;
    let (a, b, c, d) = (vertices[0], vertices[1], vertices[2], vertices[3]);
    let (ex, ey) = (b.x - a.x, b.y - a.y);
    let (fx, fy) = (d.x - a.x, d.y - a.y);
    let (gx, gy) = (a.x - b.x + c.x - d.x, a.y - b.y + c.y - d.y);
    let (hx, hy) = (x - a.x, y - a.y);

    let k2 = cross(gx, gy, fx, fy);
    let k1 = cross(ex, ey, fx, fy) + cross(hx, hy, gx, gy);
    let k0 = cross(hx, hy, ex, ey);

    let mut candidates: [Option<f64>; 2] = [None, None];
    if k2.abs() < 1e-12 {
        if k1.abs() < 1e-12 {
            return None;
        }
        candidates[0] = Some(-k0 / k1);
    } else {
        let disc = k1 * k1 - 4.0 * k0 * k2;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        candidates[0] = Some((-k1 - root) / (2.0 * k2));
        candidates[1] = Some((-k1 + root) / (2.0 * k2));
    }

    for v in candidates.into_iter().flatten() {
        if !(-PARAM_TOL..=1.0 + PARAM_TOL).contains(&v) {
            continue;
        }
        // Pick the better-conditioned axis for u.
        let dx = ex + gx * v;
        let dy = ey + gy * v;
        let u = if dx.abs() >= dy.abs() {
            if dx.abs() < 1e-12 {
                continue;
            }
            (hx - fx * v) / dx
        } else {
            if dy.abs() < 1e-12 {
                continue;
            }
            (hy - fy * v) / dy
        };
        if (-PARAM_TOL..=1.0 + PARAM_TOL).contains(&u) {
            return Some((u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)));
        }
    }
    None
}

/// Barycentric interpolation on the fan triangle containing the point.
///
/// Used for general convex polygons. Edge continuity holds because fan
/// boundary edges coincide with polygon edges.
fn interpolate_fan(vertices: &[Point2], values: &[f64], x: f64, y: f64) -> f64 {
    let mut best: Option<(f64, f64)> = None; // (worst weight, value)
    for (i, (a, b, c)) in fan_triangles(vertices).enumerate() {
        let Some([l1, l2, l3]) = barycentric(a, b, c, x, y) else {
            continue;
        };
        let worst = l1.min(l2).min(l3);
        let value = l1 * values[0] + l2 * values[i + 1] + l3 * values[i + 2];
        // Track the triangle the point is deepest inside; fp noise near
        // fan diagonals then still resolves to a containing triangle.
        if best.is_none_or(|(w, _)| worst > w) {
            best = Some((worst, value));
        }
    }
    match best {
        Some((worst, value)) if worst >= -1e-9 => value,
        _ => NODATA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetKind;
    use crate::mesh::{Element, Node};

    fn quad_mesh() -> Mesh {
        let nodes = vec![
            Node::new(0.0, 0.0),
            Node::new(2.0, 0.0),
            Node::new(2.0, 2.0),
            Node::new(0.0, 2.0),
        ];
        let elements = vec![Element::new(ElementType::Quad, vec![0, 1, 2, 3])];
        Mesh::from_parts(nodes, elements).unwrap()
    }

    fn node_dataset(values: Vec<f64>) -> Dataset {
        let mut ds = Dataset::new("Depth", DatasetKind::Scalar, ValueLocation::Node);
        ds.add_output(Output::scalar(0.0, values)).unwrap();
        ds
    }

    #[test]
    fn bilinear_center_is_corner_mean() {
        let mesh = quad_mesh();
        let ds = node_dataset(vec![0.0, 1.0, 2.0, 3.0]);
        let out = ds.output(0).unwrap();
        let v = value_at(&mesh, &ds, out, 1.0, 1.0);
        assert!((v - 1.5).abs() < 1e-12);
    }

    #[test]
    fn bilinear_reproduces_corners_and_edges() {
        let mesh = quad_mesh();
        let ds = node_dataset(vec![0.0, 4.0, 8.0, 2.0]);
        let out = ds.output(0).unwrap();
        // Corner node values (sampled just inside the corner).
        assert!((value_at(&mesh, &ds, out, 1e-9, 1e-9) - 0.0).abs() < 1e-6);
        // Midpoint of the bottom edge interpolates its two endpoints only.
        assert!((value_at(&mesh, &ds, out, 1.0, 0.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn outside_mesh_is_nodata() {
        let mesh = quad_mesh();
        let ds = node_dataset(vec![1.0; 4]);
        let out = ds.output(0).unwrap();
        assert!(is_nodata(value_at(&mesh, &ds, out, 5.0, 5.0)));
    }

    #[test]
    fn nodata_vertex_poisons_the_element() {
        let mesh = quad_mesh();
        let ds = node_dataset(vec![1.0, 1.0, NODATA, 1.0]);
        let out = ds.output(0).unwrap();
        assert!(is_nodata(value_at(&mesh, &ds, out, 1.0, 1.0)));
    }

    #[test]
    fn inactive_element_is_nodata() {
        let mesh = quad_mesh();
        let mut ds = Dataset::new("Depth", DatasetKind::Scalar, ValueLocation::Node);
        ds.add_output(Output::scalar(0.0, vec![1.0; 4]).with_active(vec![false]))
            .unwrap();
        let out = ds.output(0).unwrap();
        assert!(is_nodata(value_at(&mesh, &ds, out, 1.0, 1.0)));
    }

    #[test]
    fn element_located_values_are_piecewise_constant() {
        let mesh = quad_mesh();
        let mut ds = Dataset::new("Flux", DatasetKind::Scalar, ValueLocation::Element);
        ds.add_output(Output::scalar(0.0, vec![7.25])).unwrap();
        let out = ds.output(0).unwrap();
        assert_eq!(value_at(&mesh, &ds, out, 0.3, 0.3), 7.25);
        assert_eq!(value_at(&mesh, &ds, out, 1.9, 1.9), 7.25);
    }

    #[test]
    fn vector_sampling_interpolates_components() {
        let mesh = quad_mesh();
        let mut ds = Dataset::new("Velocity", DatasetKind::Vector, ValueLocation::Node);
        ds.add_output(Output::vector(
            0.0,
            vec![(1.0, 0.0), (1.0, 0.0), (1.0, 2.0), (1.0, 2.0)],
        ))
        .unwrap();
        let out = ds.output(0).unwrap();
        let (vx, vy) = vector_value_at(&mesh, &ds, out, 1.0, 1.0);
        assert!((vx - 1.0).abs() < 1e-12);
        assert!((vy - 1.0).abs() < 1e-12);
        // Scalar view of the same sample is the interpolated magnitude
        // field, not the magnitude of the interpolated vector.
        let m = value_at(&mesh, &ds, out, 1.0, 1.0);
        assert!(m > 0.0);
    }

    #[test]
    fn vector_query_on_scalar_output_is_nodata() {
        let mesh = quad_mesh();
        let ds = node_dataset(vec![1.0; 4]);
        let out = ds.output(0).unwrap();
        assert_eq!(vector_value_at(&mesh, &ds, out, 1.0, 1.0), (NODATA, NODATA));
    }

    #[test]
    fn inverse_bilinear_on_skewed_quad() {
        // Non-axis-aligned quad; interpolation must still reproduce a
        // linear field exactly (bilinear reproduces linears).
        let nodes = vec![
            Node::new(0.0, 0.0),
            Node::new(3.0, 1.0),
            Node::new(4.0, 4.0),
            Node::new(-1.0, 2.0),
        ];
        let elements = vec![Element::new(ElementType::Quad, vec![0, 1, 2, 3])];
        let mesh = Mesh::from_parts(nodes.clone(), elements).unwrap();
        // Linear field f(x, y) = 2x + y.
        let values: Vec<f64> = nodes.iter().map(|n| 2.0 * n.x + n.y).collect();
        let ds = node_dataset(values);
        let out = ds.output(0).unwrap();
        let (px, py) = (1.5, 1.75);
        let v = value_at(&mesh, &ds, out, px, py);
        assert!((v - (2.0 * px + py)).abs() < 1e-9, "got {v}");
    }
}

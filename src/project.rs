//! Reprojection collaborator seam.
//!
//! The core never manages CRS definitions. When a caller works in a CRS
//! other than the mesh's, it supplies a [`Projector`] mapping query
//! coordinates into mesh coordinates; the core invokes it once per point,
//! strictly for coordinate transforms, never for value computation.

use crate::dataset::{Dataset, Output};
use crate::mesh::Mesh;
use crate::sample::value_at;

/// A coordinate transform supplied by an external CRS service.
pub trait Projector {
    /// Transform a point, returning the projected `(x, y)`.
    fn project(&self, x: f64, y: f64) -> (f64, f64);
}

/// The no-op transform, for callers already in mesh coordinates.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityProjection;

impl Projector for IdentityProjection {
    #[inline]
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}

/// Any closure `(x, y) -> (x, y)` is a projector.
impl<F> Projector for F
where
    F: Fn(f64, f64) -> (f64, f64),
{
    #[inline]
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        self(x, y)
    }
}

/// Sample an output at a point given in a foreign CRS.
///
/// `projector` maps the query point into mesh coordinates; interpolation
/// then proceeds exactly as for a native-CRS query, so the sampled value is
/// independent of the CRS the caller works in.
pub fn value_at_projected(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    projector: &dyn Projector,
    x: f64,
    y: f64,
) -> f64 {
    let (mx, my) = projector.project(x, y);
    value_at(mesh, dataset, output, mx, my)
}

//! Mesh calculator: derive new datasets from expressions over existing ones.
//!
//! An expression combines quoted dataset references (`"Depth"`), numeric
//! literals, arithmetic (`+ - * / ^`), comparisons (`< <= > >= = !=`),
//! logic (`and`, `or`, `not`) and the functions `min`, `max`, `abs` and
//! `if`. Evaluation runs element-wise over the shared value location of the
//! referenced datasets, once per time step selected by a [`TimeFilter`],
//! and appends the result to the mesh's dataset store as a new scalar
//! dataset. Outside an optional [`SpatialFilter`] the result is NODATA.
//!
//! ```no_run
//! use mesh_scope::calc::{self, TimeFilter};
//! # let mut mesh: mesh_scope::mesh::Mesh = unimplemented!();
//! let index = calc::evaluate(
//!     &mut mesh,
//!     r#"if("Depth" > 0.05, "Depth" * "Velocity", 0)"#,
//!     TimeFilter::all(),
//!     None,
//!     "Unit Discharge",
//! )?;
//! # Ok::<(), mesh_scope::error::MeshScopeError>(())
//! ```

use crate::geometry::{Extent, Point2, point_in_polygon};

mod eval;
mod lexer;
mod parser;

pub use eval::{evaluate, is_valid, validate};
pub use parser::{BinaryOp, Expr, Function, UnaryOp, parse};

/// Closed time interval, in the time unit the outputs carry (hours).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeFilter {
    pub from: f64,
    pub to: f64,
}

impl TimeFilter {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Every time step of the referenced datasets.
    pub fn all() -> Self {
        Self {
            from: f64::NEG_INFINITY,
            to: f64::INFINITY,
        }
    }
}

/// Restricts a calculator result to part of the mesh.
///
/// Points are tested in mesh coordinates: node positions for node-located
/// results, element centroids for element-located ones.
#[derive(Clone, Debug, PartialEq)]
pub enum SpatialFilter {
    /// Keep values inside an axis-aligned rectangle.
    BoundingBox(Extent),
    /// Keep values inside a polygon given as a closed ring of vertices.
    Mask(Vec<Point2>),
}

impl SpatialFilter {
    /// Whether a point lies inside the filter region. Boundary points
    /// count as inside for the bounding box and follow the ray-casting
    /// parity rule for masks.
    pub fn contains(&self, point: Point2) -> bool {
        match self {
            SpatialFilter::BoundingBox(extent) => extent.contains(point.x, point.y),
            SpatialFilter::Mask(ring) => point_in_polygon(point.x, point.y, ring),
        }
    }
}

//! # mesh-scope
//!
//! mesh-scope is a data model and computation engine for unstructured 2D
//! meshes carrying simulation results, of the kind produced by hydraulic and
//! coastal models. It manages mesh topology, node/element result datasets and
//! their time steps, and derives presentation- and analysis-ready products
//! from them: point samples, cross-sections, time series, contours, rasters,
//! and calculator-defined datasets.
//!
//! ## Features
//! - Mesh store with validated topology and a lazily built R-tree spatial index
//! - Dataset store for bed, scalar and vector results on nodes or elements
//! - Barycentric/bilinear point sampling with strict NODATA propagation
//! - Cross-section, time-series and line-integral extraction along polylines
//! - Isoline and isoband generation and regular-grid rasterization
//! - An expression calculator deriving new datasets with time and spatial
//!   filters
//!
//! ## Determinism
//!
//! Every derived product is a pure function of the mesh, its datasets and
//! the request parameters. Queries on element boundaries resolve to the
//! lowest-indexed containing element, so repeated runs are bit-identical,
//! with or without the `parallel` feature.
//!
//! ## Usage
//! Add `mesh-scope` as a dependency in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mesh-scope = "0.1"
//! # Optional: rayon-backed rasterization
//! # features = ["parallel"]
//! ```
//!
//! Meshes are built programmatically or by a format loader implementing
//! [`loader::MeshLoader`]; coordinate transforms come from a caller-supplied
//! [`project::Projector`]. The crate itself never reads mesh formats or
//! manages CRS definitions.

pub mod calc;
pub mod colormap;
pub mod contour;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod mesh;
pub mod profile;
pub mod project;
pub mod raster;
pub mod sample;

pub use crate::error::MeshScopeError;

/// Commonly used items, re-exported for convenience.
pub mod prelude {
    pub use crate::calc::{SpatialFilter, TimeFilter};
    pub use crate::dataset::{
        Dataset, DatasetKind, NODATA, Output, OutputValues, ValueLocation, is_nodata,
    };
    pub use crate::error::MeshScopeError;
    pub use crate::geometry::{Extent, Point2};
    pub use crate::loader::{MeshBuilder, MeshLoader};
    pub use crate::mesh::{Element, ElementType, Mesh, Node};
    pub use crate::project::{IdentityProjection, Projector};
}

//! Mesh loader seam and programmatic mesh construction.
//!
//! Format parsing (2DM, NetCDF/UGRID, and friends) lives outside this
//! crate. A loader implements [`MeshLoader`] and uses [`MeshBuilder`] to
//! populate the arenas; the builder enforces the structural invariants once,
//! at build time, so loaded meshes are valid by construction.
//!
//! Load-time failures are explicit errors; a loader never silently returns
//! an empty mesh.

use std::path::Path;

use crate::dataset::Dataset;
use crate::error::MeshScopeError;
use crate::mesh::{Element, ElementType, Mesh, Node};

/// External mesh-loader collaborator.
///
/// Implementations fail with `FileNotFound`, `UnknownFormat`,
/// `IncompatibleMesh` or `NotEnoughMemory` from
/// [`MeshScopeError`] when a mesh cannot be materialized, and with
/// `InvalidData` / `UnknownFormat` when additional result data cannot be
/// attached to an existing mesh.
pub trait MeshLoader {
    /// Load a mesh (topology, coordinates, and any datasets the format
    /// carries) from `path`.
    fn load_mesh(&self, path: &Path) -> Result<Mesh, MeshScopeError>;

    /// Append result datasets from `path` to an already loaded mesh.
    fn load_additional_data(&self, mesh: &mut Mesh, path: &Path) -> Result<(), MeshScopeError>;
}

/// Incremental mesh construction for loaders and tests.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    datasets: Vec<Dataset>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its index.
    pub fn add_node(&mut self, x: f64, y: f64) -> usize {
        self.nodes.push(Node::new(x, y));
        self.nodes.len() - 1
    }

    /// Append a node with a z coordinate, returning its index.
    pub fn add_node_z(&mut self, x: f64, y: f64, z: f64) -> usize {
        self.nodes.push(Node::with_z(x, y, z));
        self.nodes.len() - 1
    }

    /// Append an element, returning its index. Node references are checked
    /// at build time, not here, so loaders can add elements before nodes.
    pub fn add_element(&mut self, element_type: ElementType, nodes: Vec<usize>) -> usize {
        self.elements.push(Element::new(element_type, nodes));
        self.elements.len() - 1
    }

    /// Queue a dataset to be attached after the arenas are validated.
    pub fn add_dataset(&mut self, dataset: Dataset) -> &mut Self {
        self.datasets.push(dataset);
        self
    }

    /// Validate and assemble the mesh.
    pub fn build(self) -> Result<Mesh, MeshScopeError> {
        let mut mesh = Mesh::from_parts(self.nodes, self.elements)?;
        for dataset in self.datasets {
            mesh.add_dataset(dataset)?;
        }
        Ok(mesh)
    }
}

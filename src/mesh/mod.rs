//! Mesh store: node and element arenas plus geometric queries.
//!
//! A [`Mesh`] owns an ordered, index-addressed sequence of [`Node`]s and
//! [`Element`]s, fixed after load, and the [`DatasetStore`] holding result
//! data attached to them. Elements reference nodes by dense index into the
//! node arena; there are no handles or back-pointers anywhere in the model.
//!
//! Geometric queries are pure; the only hidden side effect is the one-time
//! lazy build of the element spatial index on the first containment query.

pub mod index;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, DatasetStore, ValueLocation};
use crate::error::MeshScopeError;
use crate::geometry::{Extent, Point2};
use crate::mesh::index::SpatialIndex;

/// A mesh vertex. Immutable once the mesh is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Node {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Element topology kind. `Undefined` is the sentinel for invalid or
/// unsupported cells; such elements stay in storage for index stability but
/// are excluded from every query.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ElementType {
    #[default]
    Undefined,
    Point,
    Line,
    Triangle,
    Quad,
    Polygon,
}

impl ElementType {
    /// Topological dimension of the cell. `Undefined` reports 0.
    pub fn dimension(self) -> u8 {
        match self {
            ElementType::Undefined | ElementType::Point => 0,
            ElementType::Line => 1,
            ElementType::Triangle | ElementType::Quad | ElementType::Polygon => 2,
        }
    }

    /// Whether `count` vertices is an acceptable node count for this type.
    pub fn vertex_count_ok(self, count: usize) -> bool {
        match self {
            ElementType::Undefined => false,
            ElementType::Point => count == 1,
            ElementType::Line => count >= 2,
            ElementType::Triangle => count == 3,
            ElementType::Quad => count == 4,
            ElementType::Polygon => count >= 3,
        }
    }
}

/// One mesh cell: a type plus an ordered list of node indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    element_type: ElementType,
    nodes: Vec<usize>,
}

impl Element {
    pub fn new(element_type: ElementType, nodes: Vec<usize>) -> Self {
        Self {
            element_type,
            nodes,
        }
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Ordered node indices into the mesh's node arena.
    #[inline]
    pub fn node_indices(&self) -> &[usize] {
        &self.nodes
    }

    /// An element is valid iff its type is defined, its vertex count fits
    /// the type, it references at least 2 distinct nodes, and every
    /// reference is within the node arena.
    pub fn is_valid(&self, node_count: usize) -> bool {
        if !self.element_type.vertex_count_ok(self.nodes.len()) {
            return false;
        }
        if self.nodes.iter().any(|&n| n >= node_count) {
            return false;
        }
        let mut distinct: Vec<usize> = self.nodes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len() >= 2
    }
}

/// The mesh store: arenas of nodes and elements plus owned datasets.
///
/// Node and element counts are fixed after construction; the only mutation
/// the store allows is appending datasets (from loaders or the calculator).
#[derive(Debug)]
pub struct Mesh {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    extent: Extent,
    datasets: DatasetStore,
    spatial_index: OnceCell<SpatialIndex>,
}

/// Tolerance on normalized barycentric coordinates for point-in-element
/// tests. Dimensionless, so independent of coordinate scale.
const INSIDE_TOL: f64 = 1e-9;

/// Denominator threshold below which a triangle is treated as degenerate.
const DEGENERATE_DENOM: f64 = 1e-12;

impl Mesh {
    /// Assemble a mesh from loader-produced arenas.
    ///
    /// Fails with [`MeshScopeError::EmptyMesh`] when there are no nodes and
    /// with [`MeshScopeError::NodeReferenceOutOfBounds`] when any element
    /// references a node outside the arena. The extent is computed here,
    /// once, and cached.
    pub fn from_parts(nodes: Vec<Node>, elements: Vec<Element>) -> Result<Self, MeshScopeError> {
        if nodes.is_empty() {
            return Err(MeshScopeError::EmptyMesh);
        }
        for (i, element) in elements.iter().enumerate() {
            if let Some(&bad) = element.node_indices().iter().find(|&&n| n >= nodes.len()) {
                return Err(MeshScopeError::NodeReferenceOutOfBounds {
                    element: i,
                    node: bad,
                    count: nodes.len(),
                });
            }
        }
        let mut extent = Extent::empty();
        for node in &nodes {
            extent.expand(node.x, node.y);
        }
        Ok(Self {
            nodes,
            elements,
            extent,
            datasets: DatasetStore::default(),
            spatial_index: OnceCell::new(),
        })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Indexed node access.
    pub fn node(&self, index: usize) -> Result<&Node, MeshScopeError> {
        self.nodes
            .get(index)
            .ok_or(MeshScopeError::NodeIndexOutOfRange {
                index,
                count: self.nodes.len(),
            })
    }

    /// Indexed element access.
    pub fn element(&self, index: usize) -> Result<&Element, MeshScopeError> {
        self.elements
            .get(index)
            .ok_or(MeshScopeError::ElementIndexOutOfRange {
                index,
                count: self.elements.len(),
            })
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Bounding rectangle over all nodes; computed at load time and cached.
    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Vertex coordinates of an element, in node order.
    ///
    /// Out-of-range indices yield an empty vector; callers that have not
    /// validated the element must check first.
    pub fn element_vertices(&self, element_index: usize) -> Vec<Point2> {
        let Some(element) = self.elements.get(element_index) else {
            return Vec::new();
        };
        element
            .node_indices()
            .iter()
            .filter_map(|&n| self.nodes.get(n))
            .map(|n| Point2::new(n.x, n.y))
            .collect()
    }

    /// Arithmetic mean of an element's vertex coordinates.
    pub fn element_centroid(&self, element_index: usize) -> Option<Point2> {
        let vertices = self.element_vertices(element_index);
        if vertices.is_empty() {
            return None;
        }
        let n = vertices.len() as f64;
        let (sx, sy) = vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), v| (sx + v.x, sy + v.y));
        Some(Point2::new(sx / n, sy / n))
    }

    /// The spatial index, building it on first use.
    ///
    /// `OnceCell` serializes concurrent first-queries around the build;
    /// afterwards reads are lock-free.
    pub fn spatial_index(&self) -> &SpatialIndex {
        self.spatial_index.get_or_init(|| SpatialIndex::build(self))
    }

    /// Find the element containing `(x, y)`, or `None` when the point lies
    /// outside the mesh.
    ///
    /// Degenerate and invalid elements never match. When a point sits
    /// exactly on a shared edge, the lowest-indexed adjacent element is
    /// returned so repeated queries are deterministic; interpolated values
    /// agree across the edge either way.
    pub fn find_containing_element(&self, x: f64, y: f64) -> Option<usize> {
        if !self.extent.contains(x, y) {
            return None;
        }
        self.spatial_index()
            .candidates(x, y)
            .filter(|&i| self.point_in_element(i, x, y))
            .min()
    }

    /// Exact point-in-element test via fan triangulation.
    ///
    /// Works for any convex cell; edge points are accepted on both sides of
    /// a shared edge (tolerance on barycentric coordinates).
    pub(crate) fn point_in_element(&self, element_index: usize, x: f64, y: f64) -> bool {
        let vertices = self.element_vertices(element_index);
        fan_triangles(&vertices)
            .any(|(a, b, c)| barycentric(a, b, c, x, y).is_some_and(|w| w.iter().all(|&l| l >= -INSIDE_TOL)))
    }

    /// Sample a dataset's output at a point. Convenience wrapper over
    /// [`crate::sample::value_at`] resolving indices first.
    pub fn value(
        &self,
        dataset_index: usize,
        output_index: usize,
        x: f64,
        y: f64,
    ) -> Result<f64, MeshScopeError> {
        let dataset = self.datasets.dataset(dataset_index)?;
        let output = dataset.output(output_index)?;
        Ok(crate::sample::value_at(self, dataset, output, x, y))
    }

    /// Read-only access to the dataset store.
    #[inline]
    pub fn datasets(&self) -> &DatasetStore {
        &self.datasets
    }

    /// Append a dataset, validating its outputs against this mesh.
    ///
    /// Every output must hold exactly one value per node or per element,
    /// matching the dataset's value location; a mismatch is an
    /// [`MeshScopeError::IncompatibleMesh`] structural failure. The dataset
    /// is fully constructed before it becomes visible in the store.
    pub fn add_dataset(&mut self, dataset: Dataset) -> Result<usize, MeshScopeError> {
        let expected = match dataset.location() {
            ValueLocation::Node => self.node_count(),
            ValueLocation::Element => self.element_count(),
        };
        for i in 0..dataset.output_count() {
            let output = dataset.output(i)?;
            if output.len() != expected {
                return Err(MeshScopeError::IncompatibleMesh(format!(
                    "dataset {:?} output {i} holds {} values, mesh requires {expected}",
                    dataset.name(),
                    output.len()
                )));
            }
            if let Some(active) = output.active_flags()
                && active.len() != self.element_count()
            {
                return Err(MeshScopeError::IncompatibleMesh(format!(
                    "dataset {:?} output {i} has {} active flags, mesh has {} elements",
                    dataset.name(),
                    active.len(),
                    self.element_count()
                )));
            }
        }
        Ok(self.datasets.add(dataset))
    }
}

/// Barycentric coordinates of `(x, y)` in triangle `(a, b, c)`, or `None`
/// for a degenerate triangle.
pub(crate) fn barycentric(a: Point2, b: Point2, c: Point2, x: f64, y: f64) -> Option<[f64; 3]> {
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < DEGENERATE_DENOM {
        return None;
    }
    let l1 = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / denom;
    let l2 = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / denom;
    Some([l1, l2, 1.0 - l1 - l2])
}

/// Triangles `(v0, vi, vi+1)` fanned from the first vertex.
pub(crate) fn fan_triangles(
    vertices: &[Point2],
) -> impl Iterator<Item = (Point2, Point2, Point2)> + '_ {
    let first = vertices.first().copied();
    vertices
        .windows(2)
        .skip(1)
        .filter_map(move |pair| first.map(|f| (f, pair[0], pair[1])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Mesh {
        // Unit square split along the (0,0)-(1,1) diagonal.
        let nodes = vec![
            Node::new(0.0, 0.0),
            Node::new(1.0, 0.0),
            Node::new(1.0, 1.0),
            Node::new(0.0, 1.0),
        ];
        let elements = vec![
            Element::new(ElementType::Triangle, vec![0, 1, 2]),
            Element::new(ElementType::Triangle, vec![0, 2, 3]),
        ];
        Mesh::from_parts(nodes, elements).unwrap()
    }

    #[test]
    fn from_parts_rejects_bad_references() {
        let nodes = vec![Node::new(0.0, 0.0), Node::new(1.0, 0.0)];
        let elements = vec![Element::new(ElementType::Line, vec![0, 7])];
        let err = Mesh::from_parts(nodes, elements).unwrap_err();
        assert_eq!(
            err,
            MeshScopeError::NodeReferenceOutOfBounds {
                element: 0,
                node: 7,
                count: 2
            }
        );
        assert_eq!(
            Mesh::from_parts(vec![], vec![]).unwrap_err(),
            MeshScopeError::EmptyMesh
        );
    }

    #[test]
    fn element_validity() {
        let tri = Element::new(ElementType::Triangle, vec![0, 1, 2]);
        assert!(tri.is_valid(3));
        assert!(!tri.is_valid(2)); // reference out of bounds
        // Collapsed triangle: three references, one distinct node.
        let collapsed = Element::new(ElementType::Triangle, vec![0, 0, 0]);
        assert!(!collapsed.is_valid(3));
        assert!(!Element::new(ElementType::Undefined, vec![0, 1]).is_valid(3));
        // Point elements never reach two distinct nodes.
        assert!(!Element::new(ElementType::Point, vec![0]).is_valid(3));
        assert!(Element::new(ElementType::Line, vec![0, 1]).is_valid(2));
    }

    #[test]
    fn extent_is_cached_over_all_nodes() {
        let mesh = two_triangles();
        assert_eq!(mesh.extent(), Extent::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn indexed_access_checks_bounds() {
        let mesh = two_triangles();
        assert!(mesh.node(3).is_ok());
        assert!(matches!(
            mesh.node(4),
            Err(MeshScopeError::NodeIndexOutOfRange { index: 4, count: 4 })
        ));
        assert!(matches!(
            mesh.element(2),
            Err(MeshScopeError::ElementIndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn containment_picks_the_right_triangle() {
        let mesh = two_triangles();
        // Below the diagonal.
        assert_eq!(mesh.find_containing_element(0.7, 0.2), Some(0));
        // Above the diagonal.
        assert_eq!(mesh.find_containing_element(0.2, 0.7), Some(1));
        // Outside the mesh.
        assert_eq!(mesh.find_containing_element(1.5, 0.5), None);
        // Exactly on the shared diagonal: deterministic lowest index.
        assert_eq!(mesh.find_containing_element(0.5, 0.5), Some(0));
    }

    #[test]
    fn degenerate_elements_are_never_found() {
        let nodes = vec![
            Node::new(0.0, 0.0),
            Node::new(1.0, 0.0),
            Node::new(2.0, 0.0),
        ];
        // Zero-area triangle along the x axis.
        let elements = vec![Element::new(ElementType::Triangle, vec![0, 1, 2])];
        let mesh = Mesh::from_parts(nodes, elements).unwrap();
        assert_eq!(mesh.find_containing_element(1.0, 0.0), None);
        assert!(mesh.spatial_index().is_empty());
    }

    #[test]
    fn mesh_and_index_format_for_diagnostics() {
        // Error-path assertions rely on `Mesh: Debug`, index included.
        let mesh = two_triangles();
        let _ = mesh.spatial_index();
        let text = format!("{mesh:?}");
        assert!(text.contains("nodes"));
    }

    #[test]
    fn centroid_is_vertex_mean() {
        let mesh = two_triangles();
        let c = mesh.element_centroid(0).unwrap();
        assert!((c.x - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.y - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(mesh.element_centroid(9), None);
    }
}

//! R-tree spatial index over element bounding boxes.
//!
//! The index stores one axis-aligned envelope per valid 2D element and is
//! consulted by [`Mesh::find_containing_element`](crate::mesh::Mesh::find_containing_element)
//! to avoid O(N) scans on large meshes. It is built lazily, once, on first
//! query; after construction it is immutable and reads are lock-free.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::geometry::polygon_area;
use crate::mesh::Mesh;

/// Bounding box of one element, as stored in the R-tree.
#[derive(Clone, Debug)]
pub(crate) struct ElementEnvelope {
    pub element_index: usize,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl RTreeObject for ElementEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

impl PointDistance for ElementEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min_x - point[0]).max(0.0).max(point[0] - self.max_x);
        let dy = (self.min_y - point[1]).max(0.0).max(point[1] - self.max_y);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        point[0] >= self.min_x
            && point[0] <= self.max_x
            && point[1] >= self.min_y
            && point[1] <= self.max_y
    }
}

/// Immutable spatial index over the valid 2D elements of a mesh.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<ElementEnvelope>,
}

/// Area below which an element is treated as degenerate and left out of
/// the index (and therefore out of every containment query).
const DEGENERATE_AREA: f64 = 1e-12;

impl SpatialIndex {
    /// Build the index from all valid, non-degenerate 2D elements.
    pub fn build(mesh: &Mesh) -> Self {
        let mut envelopes = Vec::new();
        let mut degenerate = 0usize;
        for (i, element) in mesh.elements().iter().enumerate() {
            if !element.is_valid(mesh.node_count()) || element.element_type().dimension() < 2 {
                continue;
            }
            let vertices = mesh.element_vertices(i);
            if polygon_area(&vertices).abs() <= DEGENERATE_AREA {
                degenerate += 1;
                continue;
            }
            let mut min_x = f64::MAX;
            let mut min_y = f64::MAX;
            let mut max_x = f64::MIN;
            let mut max_y = f64::MIN;
            for v in &vertices {
                min_x = min_x.min(v.x);
                min_y = min_y.min(v.y);
                max_x = max_x.max(v.x);
                max_y = max_y.max(v.y);
            }
            envelopes.push(ElementEnvelope {
                element_index: i,
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        if degenerate > 0 {
            log::warn!("spatial index: skipped {degenerate} degenerate element(s)");
        }
        log::debug!(
            "spatial index: {} of {} elements indexed",
            envelopes.len(),
            mesh.element_count()
        );
        Self {
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Indices of elements whose bounding box contains `(x, y)`.
    ///
    /// Candidates only; the caller still runs the exact point-in-element
    /// test. Order is unspecified.
    pub fn candidates(&self, x: f64, y: f64) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .locate_all_at_point(&[x, y])
            .map(|e| e.element_index)
    }

    /// Number of indexed elements.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no element made it into the index.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

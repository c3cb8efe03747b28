#![allow(dead_code)]

use mesh_scope::prelude::*;

/// 3x3 nodes, 2x2 quads over [0,2]x[0,2]. Node index i sits at
/// (i % 3, i / 3).
pub fn grid_mesh() -> Mesh {
    let mut b = MeshBuilder::new();
    for y in 0..3 {
        for x in 0..3 {
            b.add_node(x as f64, y as f64);
        }
    }
    for y in 0..2 {
        for x in 0..2 {
            let n = y * 3 + x;
            b.add_element(ElementType::Quad, vec![n, n + 1, n + 4, n + 3]);
        }
    }
    b.build().unwrap()
}

/// Attach a node-located bed dataset whose value at node i is i, and
/// return its index. Linear in space: value(x, y) = x + 3y.
pub fn add_index_bed(mesh: &mut Mesh) -> usize {
    let values = (0..mesh.node_count()).map(|i| i as f64).collect();
    let mut bed = Dataset::new("Bed Elevation", DatasetKind::Bed, ValueLocation::Node);
    bed.add_output(Output::scalar(0.0, values)).unwrap();
    mesh.add_dataset(bed).unwrap()
}

/// Attach a time-varying node scalar dataset, one output per entry.
pub fn add_node_scalar(mesh: &mut Mesh, name: &str, outputs: &[(f64, Vec<f64>)]) -> usize {
    let mut ds = Dataset::new(name, DatasetKind::Scalar, ValueLocation::Node);
    for (time, values) in outputs {
        ds.add_output(Output::scalar(*time, values.clone())).unwrap();
    }
    mesh.add_dataset(ds).unwrap()
}

mod common;

use common::{add_node_scalar, grid_mesh};
use mesh_scope::calc::{self, SpatialFilter, TimeFilter};
use mesh_scope::prelude::*;

#[test]
fn piecewise_expression_matches_hand_computation() {
    let mut mesh = grid_mesh();
    let mut values = vec![0.1; 9];
    values[1] = 0.5;
    values[2] = NODATA;
    add_node_scalar(&mut mesh, "storm_depth", &[(0.0, values)]);
    let expr = r#"if("storm_depth" > 0.2, 2 * "storm_depth", "storm_depth" ^ 2 - 2 + 1)"#;
    let idx = calc::evaluate(&mut mesh, expr, TimeFilter::all(), None, "classified").unwrap();
    let ds = mesh.datasets().dataset(idx).unwrap();
    assert_eq!(ds.kind(), DatasetKind::Scalar);
    assert_eq!(ds.location(), ValueLocation::Node);
    let out = ds.output(0).unwrap();
    // 0.1 fails the test: 0.1^2 - 1. 0.5 passes: 1.0. NODATA stays NODATA.
    assert!((out.value(0) - (0.01 - 1.0)).abs() < 1e-12);
    assert!((out.value(1) - 1.0).abs() < 1e-12);
    assert!(is_nodata(out.value(2)));
}

#[test]
fn depth_from_surface_and_steady_bed() {
    let mut mesh = grid_mesh();
    add_node_scalar(&mut mesh, "Bed", &[(0.0, vec![1.0; 9])]);
    add_node_scalar(
        &mut mesh,
        "Water Surface",
        &[(0.0, vec![1.5; 9]), (2.0, vec![4.0; 9])],
    );
    let idx = calc::evaluate(
        &mut mesh,
        r#"max("Water Surface" - "Bed", 0)"#,
        TimeFilter::all(),
        None,
        "Depth",
    )
    .unwrap();
    let ds = mesh.datasets().dataset(idx).unwrap();
    // The steady bed joins both surface time steps.
    assert_eq!(ds.output_count(), 2);
    assert_eq!(ds.output(0).unwrap().time(), 0.0);
    assert_eq!(ds.output(1).unwrap().time(), 2.0);
    assert_eq!(ds.output(0).unwrap().value(4), 0.5);
    assert_eq!(ds.output(1).unwrap().value(4), 3.0);
}

#[test]
fn bounding_box_filter_blanks_the_outside() {
    let mut mesh = grid_mesh();
    add_node_scalar(&mut mesh, "d", &[(0.0, (0..9).map(|i| i as f64).collect())]);
    let filter = SpatialFilter::BoundingBox(Extent::new(0.5, 0.5, 2.0, 2.0));
    let idx = calc::evaluate(
        &mut mesh,
        r#""d" + 10"#,
        TimeFilter::all(),
        Some(&filter),
        "shifted",
    )
    .unwrap();
    let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
    // Nodes in the left column and bottom row fall outside the box.
    for i in [0usize, 1, 2, 3, 6] {
        assert!(is_nodata(out.value(i)), "node {i} should be masked");
    }
    for i in [4usize, 5, 7, 8] {
        assert_eq!(out.value(i), i as f64 + 10.0);
    }
}

#[test]
fn polygon_mask_follows_its_ring() {
    let mut mesh = grid_mesh();
    add_node_scalar(&mut mesh, "d", &[(0.0, vec![1.0; 9])]);
    // A triangle over the lower-left half.
    let ring = vec![
        Point2::new(-0.1, -0.1),
        Point2::new(2.5, -0.1),
        Point2::new(-0.1, 2.5),
    ];
    let idx = calc::evaluate(
        &mut mesh,
        r#""d""#,
        TimeFilter::all(),
        Some(&SpatialFilter::Mask(ring)),
        "masked",
    )
    .unwrap();
    let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
    assert_eq!(out.value(0), 1.0); // (0,0)
    assert!(is_nodata(out.value(8))); // (2,2)
}

#[test]
fn result_nests_under_a_parent_group() {
    let mut mesh = grid_mesh();
    add_node_scalar(&mut mesh, "Depth", &[(0.0, vec![1.0; 9])]);
    let idx = calc::evaluate(
        &mut mesh,
        r#""Depth" * 2"#,
        TimeFilter::all(),
        None,
        "Depth/doubled",
    )
    .unwrap();
    let ds = mesh.datasets().dataset(idx).unwrap();
    assert_eq!(ds.name(), "Depth/doubled");
    assert_eq!(ds.parent(), mesh.datasets().index_of_name("Depth"));
}

#[test]
fn validation_reports_bad_expressions_without_evaluating() {
    let mut mesh = grid_mesh();
    add_node_scalar(&mut mesh, "d", &[(0.0, vec![1.0; 9])]);
    let before = mesh.datasets().dataset_count();
    assert!(calc::validate(&mesh, r#""d" * 2"#).is_ok());
    assert!(matches!(
        calc::validate(&mesh, r#""missing" * 2"#),
        Err(MeshScopeError::UnknownDatasetReference(_))
    ));
    assert!(matches!(
        calc::validate(&mesh, r#""d" * * 2"#),
        Err(MeshScopeError::ExpressionSyntax { .. })
    ));
    assert_eq!(mesh.datasets().dataset_count(), before);
}

#[test]
fn empty_time_window_is_an_error() {
    let mut mesh = grid_mesh();
    add_node_scalar(&mut mesh, "d", &[(0.0, vec![1.0; 9])]);
    let result = calc::evaluate(
        &mut mesh,
        r#""d" + 1"#,
        TimeFilter::new(5.0, 9.0),
        None,
        "r",
    );
    assert!(matches!(result, Err(MeshScopeError::InvalidData(_))));
}

//! Expression evaluation over dataset outputs.
//!
//! Evaluation runs once per time step and per value index (node or
//! element), with strict NODATA propagation: any NODATA operand produces a
//! NODATA result. The exceptions are short-circuiting forms — `if` never
//! evaluates its branches under a NODATA condition (the result is NODATA),
//! and `and`/`or` may settle on a non-NODATA operand alone. Invalid
//! numeric operations (division by zero, a negative base under a
//! fractional exponent) yield NODATA for that point only; other points in
//! the same output stay valid.

use hashbrown::HashMap;

use crate::calc::parser::{BinaryOp, Expr, Function, UnaryOp, parse};
use crate::calc::{SpatialFilter, TimeFilter};
use crate::dataset::{
    Dataset, DatasetKind, NODATA, Output, TIME_TOLERANCE, ValueLocation, is_nodata,
};
use crate::error::MeshScopeError;
use crate::geometry::Point2;
use crate::mesh::Mesh;

/// Check an expression without evaluating it: syntax, known dataset
/// references, and a single shared value location across operands.
pub fn validate(mesh: &Mesh, expression: &str) -> Result<(), MeshScopeError> {
    let expr = parse(expression)?;
    resolve_refs(mesh, &expr)?;
    Ok(())
}

/// Whether an expression would pass [`validate`].
pub fn is_valid(mesh: &Mesh, expression: &str) -> bool {
    validate(mesh, expression).is_ok()
}

/// Evaluate `expression` over every time step in `time_filter`, apply the
/// spatial filter, and append the result as a new scalar dataset named
/// `output_name`. Returns the new dataset's index.
pub fn evaluate(
    mesh: &mut Mesh,
    expression: &str,
    time_filter: TimeFilter,
    spatial_filter: Option<&SpatialFilter>,
    output_name: &str,
) -> Result<usize, MeshScopeError> {
    let expr = parse(expression)?;
    let (ref_indices, location) = resolve_refs(mesh, &expr)?;

    let times = filtered_times(mesh, &ref_indices, time_filter);
    if times.is_empty() {
        return Err(MeshScopeError::InvalidData(format!(
            "no time steps within [{}, {}] in the referenced datasets",
            time_filter.from, time_filter.to
        )));
    }

    let value_count = match location {
        ValueLocation::Node => mesh.node_count(),
        ValueLocation::Element => mesh.element_count(),
    };
    let coordinates = filter_coordinates(mesh, location, spatial_filter.is_some());

    // Build the dataset fully before it becomes visible in the store.
    let mut result = Dataset::new(output_name, DatasetKind::Scalar, location);
    if let Some(parent) = parent_index(mesh, output_name) {
        result = result.with_parent(parent);
    }
    for &time in &times {
        let operands = operands_at_time(mesh, &ref_indices, time);
        let mut values = Vec::with_capacity(value_count);
        for i in 0..value_count {
            let mut v = eval(&expr, &operands, location, i);
            if let (Some(filter), Some(coords)) = (spatial_filter, coordinates.as_ref())
                && !filter.contains(coords[i])
            {
                v = NODATA;
            }
            values.push(if v.is_finite() { v } else { NODATA });
        }
        result.add_output(Output::scalar(time, values))?;
    }
    mesh.add_dataset(result)
}

/// Resolve every dataset reference to a store index and check the operands
/// share one value location.
fn resolve_refs(mesh: &Mesh, expr: &Expr) -> Result<(HashMap<String, usize>, ValueLocation), MeshScopeError> {
    let names = expr.dataset_refs();
    if names.is_empty() {
        return Err(MeshScopeError::IncompatibleOperand(
            "expression references no dataset".into(),
        ));
    }
    let mut indices = HashMap::new();
    let mut location: Option<ValueLocation> = None;
    for name in names {
        let index = mesh
            .datasets()
            .index_of_name(name)
            .ok_or_else(|| MeshScopeError::UnknownDatasetReference(name.to_owned()))?;
        let ds = mesh.datasets().dataset(index)?;
        match location {
            None => location = Some(ds.location()),
            Some(l) if l != ds.location() => {
                return Err(MeshScopeError::IncompatibleOperand(format!(
                    "dataset {name:?} is {:?}-located but other operands are {l:?}-located",
                    ds.location()
                )));
            }
            Some(_) => {}
        }
        indices.insert(name.to_owned(), index);
    }
    // names is non-empty, so a location was recorded.
    Ok((indices, location.unwrap_or(ValueLocation::Node)))
}

/// Sorted, deduplicated union of the referenced datasets' output times
/// within the filter.
fn filtered_times(mesh: &Mesh, refs: &HashMap<String, usize>, filter: TimeFilter) -> Vec<f64> {
    let mut times = Vec::new();
    for &index in refs.values() {
        let Ok(ds) = mesh.datasets().dataset(index) else {
            continue;
        };
        for output in ds.outputs() {
            let t = output.time();
            if t >= filter.from - TIME_TOLERANCE && t <= filter.to + TIME_TOLERANCE {
                times.push(t);
            }
        }
    }
    times.sort_by(f64::total_cmp);
    times.dedup_by(|a, b| (*a - *b).abs() <= TIME_TOLERANCE);
    times
}

/// Per-reference output for one time step.
///
/// A time-varying dataset without a matching output contributes NODATA at
/// this time; a steady dataset contributes its single output everywhere.
fn operands_at_time<'a>(
    mesh: &'a Mesh,
    refs: &HashMap<String, usize>,
    time: f64,
) -> HashMap<String, Option<&'a Output>> {
    let mut operands = HashMap::new();
    for (name, &index) in refs {
        let output = mesh.datasets().dataset(index).ok().and_then(|ds| {
            match ds.output_index_for_time(time) {
                Some(i) => ds.output(i).ok(),
                None if !ds.time_varying() => ds.output(0).ok(),
                None => None,
            }
        });
        operands.insert(name.clone(), output);
    }
    operands
}

/// Coordinates used by the spatial filter: node positions or element
/// centroids. Only materialized when a filter is present.
fn filter_coordinates(
    mesh: &Mesh,
    location: ValueLocation,
    wanted: bool,
) -> Option<Vec<Point2>> {
    if !wanted {
        return None;
    }
    let coords = match location {
        ValueLocation::Node => mesh
            .nodes()
            .iter()
            .map(|n| Point2::new(n.x, n.y))
            .collect(),
        ValueLocation::Element => (0..mesh.element_count())
            .map(|i| mesh.element_centroid(i).unwrap_or_default())
            .collect(),
    };
    Some(coords)
}

/// Parent index for a hierarchical output name, resolved once at creation.
fn parent_index(mesh: &Mesh, output_name: &str) -> Option<usize> {
    let (prefix, _) = output_name.rsplit_once('/')?;
    mesh.datasets().index_of_name(prefix)
}

fn truthy(v: f64) -> bool {
    v != 0.0
}

fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Evaluate the expression at one value index.
fn eval(
    expr: &Expr,
    operands: &HashMap<String, Option<&Output>>,
    location: ValueLocation,
    index: usize,
) -> f64 {
    match expr {
        Expr::Number(v) => *v,
        Expr::DatasetRef(name) => match operands.get(name).copied().flatten() {
            Some(output) => {
                if location == ValueLocation::Element && !output.is_active(index) {
                    NODATA
                } else {
                    output.value(index)
                }
            }
            None => NODATA,
        },
        Expr::Unary(op, inner) => {
            let v = eval(inner, operands, location, index);
            if is_nodata(v) {
                return NODATA;
            }
            match op {
                UnaryOp::Neg => -v,
                UnaryOp::Not => bool_value(!truthy(v)),
            }
        }
        Expr::Binary(op, lhs, rhs) => match op {
            BinaryOp::And => {
                let a = eval(lhs, operands, location, index);
                if !is_nodata(a) && !truthy(a) {
                    return 0.0;
                }
                let b = eval(rhs, operands, location, index);
                if is_nodata(a) || is_nodata(b) {
                    return NODATA;
                }
                bool_value(truthy(b))
            }
            BinaryOp::Or => {
                let a = eval(lhs, operands, location, index);
                if !is_nodata(a) && truthy(a) {
                    return 1.0;
                }
                let b = eval(rhs, operands, location, index);
                if is_nodata(a) || is_nodata(b) {
                    return NODATA;
                }
                bool_value(truthy(b))
            }
            _ => {
                let a = eval(lhs, operands, location, index);
                if is_nodata(a) {
                    return NODATA;
                }
                let b = eval(rhs, operands, location, index);
                if is_nodata(b) {
                    return NODATA;
                }
                let v = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return NODATA;
                        }
                        a / b
                    }
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Lt => bool_value(a < b),
                    BinaryOp::Le => bool_value(a <= b),
                    BinaryOp::Gt => bool_value(a > b),
                    BinaryOp::Ge => bool_value(a >= b),
                    BinaryOp::Eq => bool_value(a == b),
                    BinaryOp::Ne => bool_value(a != b),
                    BinaryOp::And | BinaryOp::Or => unreachable!(),
                };
                if v.is_finite() { v } else { NODATA }
            }
        },
        Expr::Call(function, args) => match function {
            Function::If => {
                let cond = eval(&args[0], operands, location, index);
                if is_nodata(cond) {
                    return NODATA;
                }
                if truthy(cond) {
                    eval(&args[1], operands, location, index)
                } else {
                    eval(&args[2], operands, location, index)
                }
            }
            Function::Abs => {
                let v = eval(&args[0], operands, location, index);
                if is_nodata(v) { NODATA } else { v.abs() }
            }
            Function::Min | Function::Max => {
                let a = eval(&args[0], operands, location, index);
                if is_nodata(a) {
                    return NODATA;
                }
                let b = eval(&args[1], operands, location, index);
                if is_nodata(b) {
                    return NODATA;
                }
                if *function == Function::Min {
                    a.min(b)
                } else {
                    a.max(b)
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Extent;
    use crate::mesh::{Element, ElementType, Node};

    fn quad_mesh() -> Mesh {
        let nodes = vec![
            Node::new(0.0, 0.0),
            Node::new(1.0, 0.0),
            Node::new(1.0, 1.0),
            Node::new(0.0, 1.0),
        ];
        let elements = vec![Element::new(ElementType::Quad, vec![0, 1, 2, 3])];
        Mesh::from_parts(nodes, elements).unwrap()
    }

    fn add_scalar(mesh: &mut Mesh, name: &str, outputs: &[(f64, Vec<f64>)]) {
        let mut ds = Dataset::new(name, DatasetKind::Scalar, ValueLocation::Node);
        for (time, values) in outputs {
            ds.add_output(Output::scalar(*time, values.clone())).unwrap();
        }
        mesh.add_dataset(ds).unwrap();
    }

    #[test]
    fn arithmetic_over_one_dataset() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![1.0, 2.0, 3.0, 4.0])]);
        let idx = evaluate(&mut mesh, r#""d" * 2 + 1"#, TimeFilter::all(), None, "twice").unwrap();
        let ds = mesh.datasets().dataset(idx).unwrap();
        assert_eq!(ds.name(), "twice");
        assert_eq!(ds.output_count(), 1);
        let out = ds.output(0).unwrap();
        assert_eq!(out.value(0), 3.0);
        assert_eq!(out.value(3), 9.0);
    }

    #[test]
    fn nodata_poisons_only_its_point() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![1.0, NODATA, 3.0, 4.0])]);
        let idx = evaluate(&mut mesh, r#""d" + 1"#, TimeFilter::all(), None, "r").unwrap();
        let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
        assert_eq!(out.value(0), 2.0);
        assert!(is_nodata(out.value(1)));
        assert_eq!(out.value(2), 4.0);
    }

    #[test]
    fn division_by_zero_yields_nodata() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![1.0, 0.0, 2.0, 4.0])]);
        let idx = evaluate(&mut mesh, r#"1 / "d""#, TimeFilter::all(), None, "inv").unwrap();
        let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
        assert_eq!(out.value(0), 1.0);
        assert!(is_nodata(out.value(1)));
        assert_eq!(out.value(2), 0.5);
    }

    #[test]
    fn if_selects_per_point() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![0.1, 0.3, NODATA, 0.5])]);
        let expr = r#"if("d" > 0.2, 2 * "d", "d" ^ 2 - 2 + 1)"#;
        let idx = evaluate(&mut mesh, expr, TimeFilter::all(), None, "r").unwrap();
        let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
        assert!((out.value(0) - (0.1 * 0.1 - 1.0)).abs() < 1e-12);
        assert!((out.value(1) - 0.6).abs() < 1e-12);
        assert!(is_nodata(out.value(2)));
        assert!((out.value(3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn steady_dataset_joins_every_time_step() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "bed", &[(0.0, vec![1.0; 4])]);
        add_scalar(
            &mut mesh,
            "wse",
            &[(0.0, vec![2.0; 4]), (1.0, vec![3.0; 4])],
        );
        let idx =
            evaluate(&mut mesh, r#""wse" - "bed""#, TimeFilter::all(), None, "depth").unwrap();
        let ds = mesh.datasets().dataset(idx).unwrap();
        assert_eq!(ds.output_count(), 2);
        assert_eq!(ds.output(0).unwrap().value(0), 1.0);
        assert_eq!(ds.output(1).unwrap().value(0), 2.0);
    }

    #[test]
    fn time_filter_restricts_outputs() {
        let mut mesh = quad_mesh();
        add_scalar(
            &mut mesh,
            "d",
            &[(0.0, vec![1.0; 4]), (1.0, vec![2.0; 4]), (2.0, vec![3.0; 4])],
        );
        let idx = evaluate(
            &mut mesh,
            r#""d" + 0"#,
            TimeFilter::new(0.5, 1.5),
            None,
            "r",
        )
        .unwrap();
        let ds = mesh.datasets().dataset(idx).unwrap();
        assert_eq!(ds.output_count(), 1);
        assert_eq!(ds.output(0).unwrap().time(), 1.0);
    }

    #[test]
    fn bounding_box_filter_masks_outside_nodes() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![1.0; 4])]);
        let filter = SpatialFilter::BoundingBox(Extent::new(-0.1, -0.1, 0.5, 0.5));
        let idx = evaluate(
            &mut mesh,
            r#""d" * 3"#,
            TimeFilter::all(),
            Some(&filter),
            "r",
        )
        .unwrap();
        let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
        // Only node 0 at (0, 0) falls inside the box.
        assert_eq!(out.value(0), 3.0);
        assert!(is_nodata(out.value(1)));
        assert!(is_nodata(out.value(2)));
        assert!(is_nodata(out.value(3)));
    }

    #[test]
    fn rejects_unknown_and_missing_references() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![1.0; 4])]);
        assert!(matches!(
            evaluate(&mut mesh, r#""ghost" + 1"#, TimeFilter::all(), None, "r"),
            Err(MeshScopeError::UnknownDatasetReference(_))
        ));
        assert!(matches!(
            evaluate(&mut mesh, "1 + 2", TimeFilter::all(), None, "r"),
            Err(MeshScopeError::IncompatibleOperand(_))
        ));
    }

    #[test]
    fn rejects_mixed_value_locations() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "node", &[(0.0, vec![1.0; 4])]);
        let mut cell = Dataset::new("cell", DatasetKind::Scalar, ValueLocation::Element);
        cell.add_output(Output::scalar(0.0, vec![1.0])).unwrap();
        mesh.add_dataset(cell).unwrap();
        assert!(matches!(
            evaluate(&mut mesh, r#""node" + "cell""#, TimeFilter::all(), None, "r"),
            Err(MeshScopeError::IncompatibleOperand(_))
        ));
        assert!(validate(&mesh, r#""node" * 2"#).is_ok());
        assert!(!is_valid(&mesh, r#""node" +"#));
    }

    #[test]
    fn logic_short_circuits_around_nodata() {
        let mut mesh = quad_mesh();
        add_scalar(&mut mesh, "d", &[(0.0, vec![0.0, 1.0, NODATA, NODATA])]);
        let idx = evaluate(
            &mut mesh,
            r#""d" > 0.5 or "d" < -0.5"#,
            TimeFilter::all(),
            None,
            "r",
        )
        .unwrap();
        let out = mesh.datasets().dataset(idx).unwrap().output(0).unwrap();
        assert_eq!(out.value(0), 0.0);
        assert_eq!(out.value(1), 1.0);
        assert!(is_nodata(out.value(2)));
    }
}

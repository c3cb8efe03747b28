//! Line/profile extraction: cross-sections, time series, line integrals.
//!
//! Cross-sections walk a polyline at a fixed map-unit step, sampling the
//! output at every step and once more exactly at the line end. NODATA
//! samples surface as NaN so plot consumers see gaps, not zeros.
//!
//! Time series iterate a dataset's outputs in order, one sample per output
//! at the output's own time; no resampling happens between time steps.

use crate::dataset::{Dataset, Output, is_nodata};
use crate::error::MeshScopeError;
use crate::geometry::{Point2, point_at_distance, polyline_length};
use crate::mesh::Mesh;
use crate::sample::value_at;

/// A `(distance, value)` series along a line. Holes are NaN.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrossSection {
    pub distances: Vec<f64>,
    pub values: Vec<f64>,
}

/// A `(time, value)` series. Holes are NaN.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Sample `output` along `line` every `resolution` map units.
///
/// The final sample always lands exactly at the line's end distance, even
/// when it does not fall on a step boundary. `resolution` must be positive.
pub fn cross_section(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    line: &[Point2],
    resolution: f64,
) -> Result<CrossSection, MeshScopeError> {
    if !(resolution > 0.0) {
        return Err(MeshScopeError::InvalidData(format!(
            "cross-section resolution must be positive, got {resolution}"
        )));
    }
    if line.len() < 2 {
        return Err(MeshScopeError::InvalidData(
            "cross-section line needs at least 2 vertices".into(),
        ));
    }
    let length = polyline_length(line);
    let mut section = CrossSection::default();
    let mut distance = 0.0;
    loop {
        let at_end = distance >= length;
        let d = if at_end { length } else { distance };
        // point_at_distance cannot fail here: the line has vertices.
        if let Some(p) = point_at_distance(line, d) {
            let v = value_at(mesh, dataset, output, p.x, p.y);
            section.distances.push(d);
            section.values.push(if is_nodata(v) { f64::NAN } else { v });
        }
        if at_end {
            break;
        }
        distance += resolution;
    }
    Ok(section)
}

/// Sample every output of `dataset` at the same point, in output order.
///
/// The result always has exactly `dataset.output_count()` entries.
pub fn time_series(mesh: &Mesh, dataset: &Dataset, point: Point2) -> TimeSeries {
    let mut series = TimeSeries::default();
    for output in dataset.outputs() {
        let v = value_at(mesh, dataset, output, point.x, point.y);
        series.times.push(output.time());
        series.values.push(if is_nodata(v) { f64::NAN } else { v });
    }
    series
}

/// Integrate each output's cross-section along `line`, producing one value
/// per time step.
///
/// The series is split into maximal NaN-free runs; each run contributes
/// `sum(values) * run_length / count` and runs are summed over the whole
/// line. This Riemann-sum form (not exact trapezoidal) is documented
/// numeric behavior and is replicated exactly.
pub fn integral(
    mesh: &Mesh,
    dataset: &Dataset,
    line: &[Point2],
    resolution: f64,
) -> Result<TimeSeries, MeshScopeError> {
    let mut series = TimeSeries::default();
    for output in dataset.outputs() {
        let section = cross_section(mesh, dataset, output, line, resolution)?;
        series.times.push(output.time());
        series.values.push(integrate_runs(&section));
    }
    Ok(series)
}

fn integrate_runs(section: &CrossSection) -> f64 {
    let mut total = 0.0;
    let mut run_start = None::<usize>;
    let n = section.values.len();
    for i in 0..=n {
        let hole = i == n || section.values[i].is_nan();
        match (run_start, hole) {
            (None, false) => run_start = Some(i),
            (Some(start), true) => {
                let count = i - start;
                let run_length = section.distances[i - 1] - section.distances[start];
                let sum: f64 = section.values[start..i].iter().sum();
                total += sum * run_length / count as f64;
                run_start = None;
            }
            _ => {}
        }
    }
    total
}

//! Grid rasterizer: sample an output onto a regular grid.
//!
//! Cells are sampled at their centers, row-major with row 0 at the top
//! (north), matching the ESRI ASCII grid layout the exporter writes. Cells
//! outside the mesh hold [`NODATA`]. Rasterization is deterministic: the
//! same output and resolution always produce a bit-identical grid, with or
//! without the `parallel` feature.

use std::io::Write;

use crate::contour::{Breaks, isobands, isolines};
use crate::dataset::{Dataset, NODATA, Output};
use crate::error::MeshScopeError;
use crate::geometry::Extent;
use crate::mesh::Mesh;
use crate::project::{IdentityProjection, Projector};
use crate::sample::value_at;

/// A rasterized output: row-major values over a regular grid.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterGrid {
    pub extent: Extent,
    pub resolution: f64,
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

impl RasterGrid {
    /// Value at `(row, col)`; row 0 is the top row.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.values[row * self.width + col])
    }

    /// Center coordinates of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.extent.xmin + (col as f64 + 0.5) * self.resolution,
            self.extent.ymax - (row as f64 + 0.5) * self.resolution,
        )
    }
}

/// Rasterize `output` at `resolution` map units per cell over the mesh
/// extent, or over `extent` when supplied.
pub fn rasterize(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    resolution: f64,
    extent: Option<Extent>,
) -> Result<RasterGrid, MeshScopeError> {
    rasterize_projected(mesh, dataset, output, resolution, extent, &IdentityProjection)
}

/// Rasterize with cell centers projected into mesh coordinates first.
///
/// `projector` maps grid coordinates into the mesh's CRS, the same
/// direction [`value_at_projected`](crate::project::value_at_projected)
/// uses; the grid itself stays regular in the caller's CRS.
pub fn rasterize_projected<P: Projector + Sync + ?Sized>(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    resolution: f64,
    extent: Option<Extent>,
    projector: &P,
) -> Result<RasterGrid, MeshScopeError> {
    if !(resolution > 0.0) {
        return Err(MeshScopeError::InvalidData(format!(
            "raster resolution must be positive, got {resolution}"
        )));
    }
    let extent = extent.unwrap_or_else(|| mesh.extent());
    let width = ((extent.width() / resolution).ceil() as usize).max(1);
    let height = ((extent.height() / resolution).ceil() as usize).max(1);

    let sample_row = |row: usize| -> Vec<f64> {
        let y = extent.ymax - (row as f64 + 0.5) * resolution;
        (0..width)
            .map(|col| {
                let x = extent.xmin + (col as f64 + 0.5) * resolution;
                let (mx, my) = projector.project(x, y);
                let v = value_at(mesh, dataset, output, mx, my);
                if v.is_nan() { NODATA } else { v }
            })
            .collect()
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f64>> = {
        use rayon::prelude::*;
        // Indexed parallel iterator; collect preserves row order, so the
        // assembled grid is identical to the serial one.
        (0..height).into_par_iter().map(sample_row).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f64>> = (0..height).map(sample_row).collect();

    Ok(RasterGrid {
        extent,
        resolution,
        width,
        height,
        values: rows.concat(),
    })
}

/// Rasterize and write as an ESRI ASCII grid.
///
/// `projector` maps grid cell centers into mesh coordinates before
/// sampling; pass [`IdentityProjection`] when the grid CRS is the mesh's.
pub fn export_grid<W: Write, P: Projector + Sync + ?Sized>(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    resolution: f64,
    projector: &P,
    writer: &mut W,
) -> Result<RasterGrid, MeshScopeError> {
    let grid = rasterize_projected(mesh, dataset, output, resolution, None, projector)?;
    writeln!(writer, "ncols {}", grid.width)?;
    writeln!(writer, "nrows {}", grid.height)?;
    writeln!(writer, "xllcorner {}", grid.extent.xmin)?;
    writeln!(writer, "yllcorner {}", grid.extent.ymax - grid.height as f64 * resolution)?;
    writeln!(writer, "cellsize {resolution}")?;
    writeln!(writer, "NODATA_value {NODATA}")?;
    for row in grid.values.chunks(grid.width) {
        let mut line = String::with_capacity(row.len() * 8);
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(&format!("{v}"));
        }
        writeln!(writer, "{line}")?;
    }
    Ok(grid)
}

/// Generate contours and write them as one WKT record per line, projecting
/// every vertex through `projector`.
///
/// `use_lines` selects isolines (`LINESTRING` records, prefixed with their
/// level) over isobands (`POLYGON` records, prefixed with their interval).
pub fn export_contours<W: Write>(
    mesh: &Mesh,
    dataset: &Dataset,
    output: &Output,
    breaks: &Breaks,
    use_lines: bool,
    projector: &dyn Projector,
    writer: &mut W,
) -> Result<(), MeshScopeError> {
    if use_lines {
        for level in isolines(mesh, dataset, output, breaks)? {
            for segment in &level.segments {
                let (ax, ay) = projector.project(segment[0].x, segment[0].y);
                let (bx, by) = projector.project(segment[1].x, segment[1].y);
                writeln!(
                    writer,
                    "{}\tLINESTRING ({ax} {ay}, {bx} {by})",
                    level.level
                )?;
            }
        }
    } else {
        for band in isobands(mesh, dataset, output, breaks)? {
            for polygon in &band.polygons {
                let ring: Vec<String> = polygon
                    .iter()
                    .chain(polygon.first())
                    .map(|p| {
                        let (x, y) = projector.project(p.x, p.y);
                        format!("{x} {y}")
                    })
                    .collect();
                writeln!(
                    writer,
                    "{} {}\tPOLYGON (({}))",
                    band.lower,
                    band.upper,
                    ring.join(", ")
                )?;
            }
        }
    }
    Ok(())
}

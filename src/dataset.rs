//! Dataset/output store: time-indexed result data attached to a mesh.
//!
//! A [`Dataset`] is a named time sequence of [`Output`]s; each output holds
//! one value per node or per element (per the dataset's [`ValueLocation`]),
//! plus an optional per-element active mask for dry cells. Outputs are
//! immutable once pushed; the store itself only ever grows by appending
//! whole datasets, so existing indices are never renumbered.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::MeshScopeError;

/// Sentinel marking "no data at this node/element".
///
/// All consuming algorithms treat it as a hole, never as a numeric zero.
pub const NODATA: f64 = -9999.0;

/// Whether a value is a hole. The sentinel matches exactly; NaN arriving
/// from downstream arithmetic counts as a hole too.
#[inline]
pub fn is_nodata(value: f64) -> bool {
    value == NODATA || value.is_nan()
}

/// Tolerance used when matching output times, in hours. Deliberately loose
/// to absorb float/string round-trip error from result-file formats.
pub const TIME_TOLERANCE: f64 = 1e-6;

/// What a dataset's values represent.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum DatasetKind {
    /// Bed elevation; by convention dataset 0, with exactly one output.
    Bed,
    Scalar,
    Vector,
}

/// Whether values are keyed to nodes or to elements.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ValueLocation {
    Node,
    Element,
}

/// Value storage of one output: scalars, or (x, y) vector pairs.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputValues {
    Scalar(Vec<f64>),
    Vector(Vec<(f64, f64)>),
}

/// The values of a dataset at one time step. Immutable after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    time: f64,
    values: OutputValues,
    active: Option<Vec<bool>>,
}

impl Output {
    /// A scalar output at `time` (hours).
    pub fn scalar(time: f64, values: Vec<f64>) -> Self {
        Self {
            time,
            values: OutputValues::Scalar(values),
            active: None,
        }
    }

    /// A vector output at `time` (hours).
    pub fn vector(time: f64, values: Vec<(f64, f64)>) -> Self {
        Self {
            time,
            values: OutputValues::Vector(values),
            active: None,
        }
    }

    /// Attach a per-element active mask (`false` = dry cell, skipped by
    /// sampling and rendering).
    pub fn with_active(mut self, active: Vec<bool>) -> Self {
        self.active = Some(active);
        self
    }

    /// Output time in hours.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        match &self.values {
            OutputValues::Scalar(v) => v.len(),
            OutputValues::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar view of value `index`: the value itself, or the magnitude for
    /// vector outputs. Out-of-range indices read as NODATA.
    pub fn value(&self, index: usize) -> f64 {
        match &self.values {
            OutputValues::Scalar(v) => v.get(index).copied().unwrap_or(NODATA),
            OutputValues::Vector(v) => match v.get(index) {
                Some(&(x, y)) if !is_nodata(x) && !is_nodata(y) => (x * x + y * y).sqrt(),
                _ => NODATA,
            },
        }
    }

    /// Vector view of value `index`. Scalar outputs and holes read as
    /// `(NODATA, NODATA)`.
    pub fn vector_value(&self, index: usize) -> (f64, f64) {
        match &self.values {
            OutputValues::Vector(v) => match v.get(index) {
                Some(&(x, y)) if !is_nodata(x) && !is_nodata(y) => (x, y),
                _ => (NODATA, NODATA),
            },
            OutputValues::Scalar(_) => (NODATA, NODATA),
        }
    }

    /// Restartable iterator over the scalar view of all values.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| self.value(i))
    }

    /// Whether element `element_index` is active in this output. Elements
    /// are active by default when no mask is attached.
    #[inline]
    pub fn is_active(&self, element_index: usize) -> bool {
        match &self.active {
            Some(flags) => flags.get(element_index).copied().unwrap_or(false),
            None => true,
        }
    }

    pub(crate) fn active_flags(&self) -> Option<&[bool]> {
        self.active.as_deref()
    }

    fn is_vector(&self) -> bool {
        matches!(self.values, OutputValues::Vector(_))
    }
}

/// A named time series of outputs attached to one mesh.
#[derive(Clone, Debug)]
pub struct Dataset {
    name: String,
    parent: Option<usize>,
    kind: DatasetKind,
    location: ValueLocation,
    outputs: Vec<Output>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, kind: DatasetKind, location: ValueLocation) -> Self {
        Self {
            name: name.into(),
            parent: None,
            kind,
            location,
            outputs: Vec::new(),
        }
    }

    /// Record the parent dataset (by store index) of a derived dataset,
    /// resolved once at creation time.
    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Hierarchical name, "/"-separated for derived children
    /// (e.g. `"Depth/Maximum"`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store index of the parent dataset, for derived children.
    #[inline]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    #[inline]
    pub fn location(&self) -> ValueLocation {
        self.location
    }

    /// Append an output. All outputs of a dataset share its kind: scalar
    /// storage for `Bed`/`Scalar`, vector storage for `Vector`.
    pub fn add_output(&mut self, output: Output) -> Result<(), MeshScopeError> {
        let want_vector = self.kind == DatasetKind::Vector;
        if output.is_vector() != want_vector {
            return Err(MeshScopeError::OutputKindMismatch(if want_vector {
                "Vector"
            } else {
                "Scalar"
            }));
        }
        if let Some(first) = self.outputs.first()
            && first.len() != output.len()
        {
            return Err(MeshScopeError::OutputLengthMismatch {
                expected: first.len(),
                found: output.len(),
            });
        }
        self.outputs.push(output);
        Ok(())
    }

    #[inline]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Indexed output access.
    pub fn output(&self, index: usize) -> Result<&Output, MeshScopeError> {
        self.outputs
            .get(index)
            .ok_or(MeshScopeError::OutputIndexOutOfRange {
                index,
                count: self.outputs.len(),
            })
    }

    /// All outputs, in time order as loaded.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Index of the output whose time matches `time` within
    /// [`TIME_TOLERANCE`]. Linear scan, first match wins.
    pub fn output_index_for_time(&self, time: f64) -> Option<usize> {
        self.outputs
            .iter()
            .position(|o| (o.time() - time).abs() <= TIME_TOLERANCE)
    }

    /// `(min, max)` over all outputs, excluding NODATA holes. `None` when
    /// every value is a hole.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for output in &self.outputs {
            for v in output.values().filter(|&v| !is_nodata(v)) {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        range
    }

    /// Whether the dataset has more than one time step.
    #[inline]
    pub fn time_varying(&self) -> bool {
        self.outputs.len() > 1
    }
}

/// Append-only store of the datasets owned by one mesh.
#[derive(Clone, Debug, Default)]
pub struct DatasetStore {
    datasets: Vec<Dataset>,
    by_name: HashMap<String, usize>,
}

impl DatasetStore {
    #[inline]
    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    /// Indexed dataset access.
    pub fn dataset(&self, index: usize) -> Result<&Dataset, MeshScopeError> {
        self.datasets
            .get(index)
            .ok_or(MeshScopeError::DatasetIndexOutOfRange {
                index,
                count: self.datasets.len(),
            })
    }

    /// Exact-name lookup.
    pub fn dataset_by_name(&self, name: &str) -> Option<&Dataset> {
        self.index_of_name(name).and_then(|i| self.datasets.get(i))
    }

    /// Store index for an exact name.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Iterator over all datasets in store order.
    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    /// Append a fully constructed dataset, returning its new index.
    ///
    /// Indices are sequential and never reused. A duplicate name shadows
    /// the earlier dataset in name lookups only.
    pub(crate) fn add(&mut self, dataset: Dataset) -> usize {
        let index = self.datasets.len();
        if self.by_name.insert(dataset.name().to_owned(), index).is_some() {
            log::warn!(
                "dataset name {:?} already present; name lookup now resolves to index {index}",
                dataset.name()
            );
        }
        self.datasets.push(dataset);
        index
    }
}

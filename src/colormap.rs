//! Break-set / color-map carrier.
//!
//! A [`ColorMap`] is an ordered set of `(value, color, label)` breakpoints.
//! It is a rendering parameter carried alongside a dataset, not a storage
//! entity: the contour engine consumes its break values and exporters
//! consume its colors. The core never draws anything with it.

use serde::{Deserialize, Serialize};

/// One breakpoint of a color map. `color` is RGBA.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub value: f64,
    pub color: [u8; 4],
    pub label: String,
}

impl ColorStop {
    pub fn new(value: f64, color: [u8; 4], label: impl Into<String>) -> Self {
        Self {
            value,
            color,
            label: label.into(),
        }
    }
}

/// Ordered set of breakpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    stops: Vec<ColorStop>,
}

impl ColorMap {
    /// Build from stops, sorting by value.
    pub fn new(mut stops: Vec<ColorStop>) -> Self {
        stops.sort_by(|a, b| a.value.total_cmp(&b.value));
        Self { stops }
    }

    /// Evenly spaced unlabeled stops spanning `[min, max]`, all sharing
    /// `color`. Convenience for exporters that only need break values.
    pub fn from_range(min: f64, max: f64, count: usize, color: [u8; 4]) -> Self {
        if count == 0 || max <= min {
            return Self::default();
        }
        let step = (max - min) / count as f64;
        let stops = (0..=count)
            .map(|i| ColorStop::new(min + step * i as f64, color, String::new()))
            .collect();
        Self { stops }
    }

    #[inline]
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Break values in ascending order, for the contour engine.
    pub fn break_values(&self) -> Vec<f64> {
        self.stops.iter().map(|s| s.value).collect()
    }

    /// Color of the first stop whose value is `>= value` (discrete
    /// banding). `None` when the value is above every stop.
    pub fn color_for(&self, value: f64) -> Option<[u8; 4]> {
        self.stops
            .iter()
            .find(|s| value <= s.value)
            .map(|s| s.color)
    }
}

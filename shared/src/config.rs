//! Construction-time configuration. Built once, never merged at runtime.

use serde::{Deserialize, Serialize};

use crate::colors::{DEFAULT_RAMP, Rgb};
use crate::format::Unit;
use crate::layer::LayerStyle;
use crate::scale::{Bounds, Direction};
use crate::topology::LocationId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Min/max zoom relative to the full-map scale.
    pub extent: [f64; 2],
    pub increment: f64,
    /// Fit proportion for zooming to a set of locations.
    pub zoom_to_proportion: f64,
    /// Fit proportion when a feature is clicked.
    pub feature_proportion: f64,
    /// Wheel delta to zoom factor: `exp(-delta * sensitivity)`.
    pub wheel_sensitivity: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            extent: [0.3, 50.0],
            increment: 1.5,
            zoom_to_proportion: 0.6,
            feature_proportion: 0.9,
            wheel_sensitivity: 0.0015,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub colors: Vec<Rgb>,
    pub direction: Direction,
    pub domain: Bounds,
    pub extent: Bounds,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            colors: DEFAULT_RAMP.to_vec(),
            direction: Direction::default(),
            domain: [None, None],
            extent: [None, None],
        }
    }
}

/// Settings shared by the map chart and the legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Property holding the location id that data is keyed by.
    pub key: String,
    /// Class every feature element carries.
    pub class: String,
    /// Transition duration in ms; 0 disables animation.
    pub animation: f64,
    pub selected: Vec<LocationId>,
    pub filter: Bounds,
    pub unit: Unit,
    pub scale: ScaleConfig,
    #[serde(skip)]
    pub style: LayerStyle,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            key: "location_id".into(),
            class: "location-path".into(),
            animation: 1000.0,
            selected: Vec::new(),
            filter: [None, None],
            unit: Unit::default(),
            scale: ScaleConfig::default(),
            style: LayerStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub container: String,
    pub width: f64,
    pub height: f64,
    /// Share of the viewport the full map fills.
    pub proportion: f64,
    pub zoom: ZoomConfig,
    pub base: BaseConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            container: "#chart".into(),
            width: 1000.0,
            height: 500.0,
            proportion: 0.95,
            zoom: ZoomConfig::default(),
            base: BaseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 4.0,
            right: 20.0,
            bottom: 0.0,
            left: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub container: String,
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    /// Radius of a feature dot.
    pub radius: f64,
    /// Approximate number of axis ticks.
    pub ticks: usize,
    pub base: BaseConfig,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            container: "#legend".into(),
            width: 1000.0,
            height: 60.0,
            margin: Margin::default(),
            radius: 7.5,
            ticks: 10,
            base: BaseConfig {
                class: "density-circle".into(),
                ..BaseConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarChartConfig {
    pub width: f64,
    pub height: f64,
    /// Vertical distance from a bar's top to its label baseline.
    pub label_offset: f64,
    pub animation: f64,
}

impl Default for BarChartConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 300.0,
            label_offset: 14.0,
            animation: 500.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ChartConfig =
            serde_json::from_str(r#"{"width": 640, "zoom": {"increment": 2}, "base": {"scale": {"direction": "+"}}}"#)
                .expect("config parses");
        assert_eq!(config.width, 640.0);
        assert_eq!(config.height, 500.0);
        assert_eq!(config.zoom.increment, 2.0);
        assert_eq!(config.zoom.extent, [0.3, 50.0]);
        assert_eq!(config.base.scale.direction, Direction::Ascending);
        assert_eq!(config.base.scale.colors.len(), DEFAULT_RAMP.len());
    }

    #[test]
    fn legend_defaults_use_dot_class() {
        let legend = LegendConfig::default();
        assert_eq!(legend.base.class, "density-circle");
        assert_eq!(legend.margin.left, 20.0);
    }

    #[test]
    fn bounds_accept_nulls() {
        let scale: ScaleConfig =
            serde_json::from_str(r##"{"domain": [null, 10], "colors": ["#000", "rgb(255,255,255)"]}"##)
                .expect("scale parses");
        assert_eq!(scale.domain, [None, Some(10.0)]);
        assert_eq!(scale.colors, vec![Rgb(0, 0, 0), Rgb(255, 255, 255)]);
    }
}

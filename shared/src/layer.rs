//! Layers as supplied by callers and as rendered after derivation.

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::colors::Rgb;
use crate::geometry::Feature;
use crate::scale::Colorizer;
use crate::topology::{FeatureProperties, LocationId};

/// Value bound to one location. A fixed `color` wins over the scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub color: Option<Rgb>,
}

impl Datum {
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            color: None,
        }
    }
}

pub type LayerData = HashMap<LocationId, Datum>;

/// What a style function may consult besides the feature itself.
pub struct StyleContext<'a> {
    pub colorizer: &'a Colorizer,
}

impl StyleContext<'_> {
    /// Data-driven color: the datum's fixed color, else the scale's color for
    /// its value, else nothing (left to CSS).
    pub fn color(&self, datum: &Datum) -> Option<String> {
        if let Some(color) = datum.color {
            return Some(color.to_string());
        }
        datum
            .value
            .and_then(|v| self.colorizer.color(v))
            .map(|c| c.to_string())
    }
}

/// Receives the feature, the context and whether this is the first styling
/// of a freshly entered element.
pub type StyleFn = Rc<dyn Fn(&BoundFeature, &StyleContext<'_>, bool) -> Option<String>>;

#[derive(Clone, Default)]
pub enum Style {
    /// Color from the feature's data.
    #[default]
    Data,
    Fixed(Option<String>),
    Custom(StyleFn),
}

impl Style {
    pub fn resolve(
        &self,
        feature: &BoundFeature,
        ctx: &StyleContext<'_>,
        initial: bool,
    ) -> Option<String> {
        match self {
            Style::Data => ctx.color(&feature.datum),
            Style::Fixed(value) => value.clone(),
            Style::Custom(f) => f(feature, ctx, initial),
        }
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Data => f.write_str("Data"),
            Style::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Style::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Style {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Style::Data, Style::Data) => true,
            (Style::Fixed(a), Style::Fixed(b)) => a == b,
            (Style::Custom(a), Style::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Per-layer style overrides; unset entries fall back to the component default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStyle {
    pub fill: Option<Style>,
    pub stroke: Option<Style>,
}

impl LayerStyle {
    pub fn or(&self, defaults: &LayerStyle) -> LayerStyle {
        LayerStyle {
            fill: self.fill.clone().or_else(|| defaults.fill.clone()),
            stroke: self.stroke.clone().or_else(|| defaults.stroke.clone()),
        }
    }
}

/// Caller-supplied layer: one topology object group plus its data.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub key: String,
    /// Name of the topology object group to draw.
    pub object: String,
    pub data: Rc<LayerData>,
    pub extent: Option<[f64; 2]>,
    pub style: LayerStyle,
    /// Whether the legend plots a dot per feature of this layer.
    pub dots: bool,
}

impl Layer {
    pub fn new(key: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            object: object.into(),
            data: Rc::new(LayerData::new()),
            extent: None,
            style: LayerStyle::default(),
            dots: true,
        }
    }

    pub fn with_data(mut self, data: LayerData) -> Self {
        self.data = Rc::new(data);
        self
    }
}

/// A layer after derivation: features ready to draw.
#[derive(Debug, Clone)]
pub struct RenderableLayer {
    pub key: String,
    pub features: Rc<[Feature]>,
    pub data: Rc<LayerData>,
    pub extent: Option<[f64; 2]>,
    pub style: LayerStyle,
    pub dots: bool,
}

impl RenderableLayer {
    pub fn from_layer(layer: &Layer, features: Rc<[Feature]>) -> Self {
        Self {
            key: layer.key.clone(),
            features,
            data: layer.data.clone(),
            extent: layer.extent,
            style: layer.style.clone(),
            dots: layer.dots,
        }
    }

    /// Declared extent, else the min/max of the layer's values. `None` when
    /// the layer carries no values at all.
    pub fn value_extent(&self) -> Option<[f64; 2]> {
        if self.extent.is_some() {
            return self.extent;
        }
        self.data
            .values()
            .filter_map(|d| d.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                Some([lo, hi]) => Some([f64::min(lo, v), f64::max(hi, v)]),
                None => Some([v, v]),
            })
    }
}

/// A feature joined with its datum for one render pass.
#[derive(Debug, Clone)]
pub struct BoundFeature {
    pub feature: Feature,
    pub datum: Datum,
    /// Back-reference used only for style lookup.
    pub layer: Weak<RenderableLayer>,
}

impl BoundFeature {
    pub fn bind(feature: &Feature, layer: &Rc<RenderableLayer>, key_field: &str) -> Self {
        let datum = feature
            .properties
            .id_for(key_field)
            .and_then(|id| layer.data.get(&id).copied())
            .unwrap_or_default();
        Self {
            feature: feature.clone(),
            datum,
            layer: Rc::downgrade(layer),
        }
    }

    pub fn properties(&self) -> &FeatureProperties {
        &self.feature.properties
    }

    pub fn value(&self) -> Option<f64> {
        self.datum.value
    }

    /// Join identity within a layer: the synthetic key, else the location id.
    pub fn join_key(&self, key_field: &str) -> String {
        let props = self.properties();
        if !props.key.is_empty() {
            return props.key.clone();
        }
        props
            .id_for(key_field)
            .map(|id| id.to_string())
            .unwrap_or_default()
    }
}

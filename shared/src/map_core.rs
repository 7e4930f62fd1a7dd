//! State and styling shared by the map chart and its legend.

use std::rc::Rc;

use crate::colors::Rgb;
use crate::config::BaseConfig;
use crate::format::Unit;
use crate::layer::{BoundFeature, LayerStyle, RenderableLayer, Style, StyleContext};
use crate::scale::{Bounds, ColorScale, Colorizer, Direction};
use crate::selection::SelectionModel;
use crate::topology::{FeatureProperties, LocationId};

#[derive(Debug, Clone)]
pub struct MapCore {
    key: String,
    class: String,
    animation: f64,
    selection: SelectionModel,
    scale: ColorScale,
    filter: Bounds,
    unit: Unit,
    style: LayerStyle,
    layers: Vec<Rc<RenderableLayer>>,
}

impl MapCore {
    pub fn new(config: &BaseConfig) -> Self {
        let mut scale = ColorScale::new(config.scale.colors.clone(), config.scale.direction);
        scale.set_domain(config.scale.domain);
        scale.set_extent(config.scale.extent);
        let defaults = LayerStyle {
            fill: Some(Style::Data),
            stroke: Some(Style::Data),
        };
        Self {
            key: config.key.clone(),
            class: config.class.clone(),
            animation: config.animation,
            selection: SelectionModel::new(config.selected.iter().copied()),
            scale,
            filter: config.filter,
            unit: config.unit,
            style: config.style.or(&defaults),
            layers: Vec::new(),
        }
    }

    /// Property the data is keyed by.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Duration to animate with, `None` for an immediate change.
    pub fn transition(&self, animate: bool) -> Option<f64> {
        (animate && self.animation > 0.0).then_some(self.animation)
    }

    pub fn layers(&self) -> &[Rc<RenderableLayer>] {
        &self.layers
    }

    pub fn set_layers(&mut self, layers: Vec<Rc<RenderableLayer>>) {
        self.layers = layers;
    }

    /// Join every feature of `layer` with its datum.
    pub fn bind(&self, layer: &Rc<RenderableLayer>) -> Vec<BoundFeature> {
        layer
            .features
            .iter()
            .map(|f| BoundFeature::bind(f, layer, &self.key))
            .collect()
    }

    pub fn extent(&self) -> [f64; 2] {
        self.scale
            .extent(self.layers.iter().filter_map(|l| l.value_extent()))
    }

    pub fn domain(&self) -> Vec<f64> {
        self.scale.domain(self.extent())
    }

    pub fn colorizer(&self) -> Colorizer {
        self.colorizer_for(&self.domain())
    }

    pub fn colorizer_for(&self, domain: &[f64]) -> Colorizer {
        self.scale.colorizer(domain)
    }

    /// Ramp colors in the current direction.
    pub fn ramp(&self) -> Vec<Rgb> {
        self.scale.ramp()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn location(&self, properties: &FeatureProperties) -> Option<LocationId> {
        properties.id_for(&self.key)
    }

    pub fn is_selected(&self, properties: &FeatureProperties) -> bool {
        self.selection
            .is_selected(self.location(properties), &properties.disputes)
    }

    /// CSS classes of a feature element, in a stable order.
    pub fn classes(&self, feature: &BoundFeature) -> Vec<String> {
        let properties = feature.properties();
        let mut classes = vec![self.class.clone()];
        if properties.is_disputed() {
            classes.push("disputed".into());
        }
        if self.is_selected(properties) {
            classes.push("selected".into());
        }
        if feature.value().is_none() {
            classes.push("no-data".into());
        }
        if let Some(class) = &properties.class {
            classes.push(class.clone());
        }
        if let Some(value) = feature.value() {
            let below = self.filter[0].is_some_and(|lo| value < lo);
            let above = self.filter[1].is_some_and(|hi| value > hi);
            if below || above {
                classes.push("filtered".into());
            }
        }
        classes
    }

    /// Fill and stroke of a feature. `initial` is set on the first styling
    /// of a freshly entered element.
    pub fn styles(
        &self,
        feature: &BoundFeature,
        colorizer: &Colorizer,
        initial: bool,
    ) -> (Option<String>, Option<String>) {
        let style = match feature.layer.upgrade() {
            Some(layer) => layer.style.or(&self.style),
            None => self.style.clone(),
        };
        let ctx = StyleContext { colorizer };
        let fill = style.fill.unwrap_or_default().resolve(feature, &ctx, initial);
        let stroke = style
            .stroke
            .unwrap_or_default()
            .resolve(feature, &ctx, initial);
        (fill, stroke)
    }

    pub fn select(&mut self, ids: impl IntoIterator<Item = LocationId>) {
        self.selection.select(ids);
    }

    pub fn direction(&self) -> Direction {
        self.scale.direction()
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.scale.set_direction(direction);
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    pub fn filter(&self) -> Bounds {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Bounds) {
        self.filter = filter;
    }

    /// Domain override, unset bounds computed from the extent.
    pub fn domain_bounds(&self) -> Bounds {
        self.scale.domain_override()
    }

    pub fn set_domain(&mut self, domain: Bounds) {
        self.scale.set_domain(domain);
    }

    pub fn extent_bounds(&self) -> Bounds {
        self.scale.extent_override()
    }

    pub fn set_extent(&mut self, extent: Bounds) {
        self.scale.set_extent(extent);
    }
}

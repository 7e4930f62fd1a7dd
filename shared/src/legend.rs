//! Map legend: a color bar spanning the extent, one dot per valued feature
//! and a tick axis underneath.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::LegendConfig;
use crate::format::{tick_format, ticks};
use crate::layer::{BoundFeature, RenderableLayer};
use crate::map_core::MapCore;
use crate::scene::{AttrValue, Clock, Element, NodeId, Scene, SceneSink, fmt_number, style_value};
use crate::topology::LocationId;

const INNER_TICK: f64 = 3.0;
const OUTER_TICK: f64 = 7.0;
const TICK_PADDING: f64 = 3.0;

/// Linear map from the data extent onto the bar's pixel width.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
}

impl LinearScale {
    fn apply(&self, value: f64) -> f64 {
        let span = self.domain[1] - self.domain[0];
        let t = if span != 0.0 && span.is_finite() {
            (value - self.domain[0]) / span
        } else {
            0.5
        };
        self.range[0] + (self.range[1] - self.range[0]) * t
    }
}

#[derive(Debug, Clone, Copy)]
struct Scaffold {
    gradient: NodeId,
    bar: NodeId,
    dots: NodeId,
    axis: NodeId,
    domain_path: NodeId,
}

#[derive(Debug, Clone)]
struct Dot {
    node: NodeId,
    feature: BoundFeature,
}

pub struct MapLegend {
    config: LegendConfig,
    core: MapCore,
    scene: Scene,
    scaffold: Option<Scaffold>,
    stops: Vec<NodeId>,
    dots: Vec<(LocationId, Dot)>,
    exiting: HashMap<LocationId, NodeId>,
    ticks: HashMap<String, NodeId>,
    x: LinearScale,
}

impl MapLegend {
    pub fn new(config: &LegendConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            core: MapCore::new(&config.base),
            scene: Scene::new(clock),
            config: config.clone(),
            scaffold: None,
            stops: Vec::new(),
            dots: Vec::new(),
            exiting: HashMap::new(),
            ticks: HashMap::new(),
            x: LinearScale {
                domain: [0.0, 1.0],
                range: [0.0, 1.0],
            },
        }
    }

    pub fn core(&self) -> &MapCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut MapCore {
        &mut self.core
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// `id` of the gradient, derived from the container selector.
    pub fn gradient_id(&self) -> String {
        let container = self.config.container.split(' ').next().unwrap_or_default();
        format!("{}-gradient", container.replace('#', ""))
    }

    /// Dot node of a location, if it has a value on the legend.
    pub fn dot_for(&self, location: LocationId) -> Option<NodeId> {
        self.dots
            .iter()
            .find(|(id, _)| *id == location)
            .map(|(_, dot)| dot.node)
    }

    fn inner_width(&self) -> f64 {
        self.config.width - (self.config.margin.left + self.config.margin.right)
    }

    pub fn render(&mut self, layers: Vec<Rc<RenderableLayer>>) {
        let root = self.scene.root();
        let id = self.gradient_id();
        let inner = self.inner_width();
        let scene = &mut self.scene;
        scene.set(root, "height", AttrValue::Number(self.config.height));
        scene.set(root, "width", AttrValue::Number(self.config.width));

        let defs = scene.append(root, Element::Defs);
        let gradient = scene.append(defs, Element::LinearGradient);
        scene.set(gradient, "id", AttrValue::from(id.as_str()));
        scene.set(gradient, "x1", AttrValue::Percent(0.0));
        scene.set(gradient, "x2", AttrValue::Percent(100.0));
        scene.set(gradient, "y1", AttrValue::Percent(0.0));
        scene.set(gradient, "y2", AttrValue::Percent(0.0));

        let group = scene.append(root, Element::Group);
        scene.set(
            group,
            "transform",
            AttrValue::Translate(self.config.margin.left, self.config.margin.top),
        );

        let dots = scene.append(group, Element::Group);
        scene.set(dots, "class", AttrValue::from("dots"));
        scene.set(dots, "transform", AttrValue::Translate(0.0, 10.0));

        let color_bar = scene.append(group, Element::Group);
        scene.set(color_bar, "transform", AttrValue::Translate(0.0, 20.0));
        scene.set(color_bar, "class", AttrValue::from("color-bar"));
        let bar = scene.append(color_bar, Element::Rect);
        scene.set(bar, "x", AttrValue::from("0px"));
        scene.set(bar, "y", AttrValue::from("0px"));
        scene.set(bar, "height", AttrValue::from("15px"));
        scene.set(bar, "width", AttrValue::Number(inner));
        scene.set(bar, "stroke", AttrValue::from("none"));
        scene.set(bar, "fill", AttrValue::from(format!("url(#{id})")));

        let axis = scene.append(group, Element::Group);
        scene.set(axis, "transform", AttrValue::Translate(0.0, 40.0));
        scene.set(axis, "class", AttrValue::from("axis"));
        let domain_path = scene.append(axis, Element::Path);
        scene.set(domain_path, "class", AttrValue::from("domain"));

        self.scaffold = Some(Scaffold {
            gradient,
            bar,
            dots,
            axis,
            domain_path,
        });
        self.update(Some(layers), true);
    }

    pub fn update(&mut self, layers: Option<Vec<Rc<RenderableLayer>>>, animate: bool) {
        if let Some(layers) = layers {
            self.core.set_layers(layers);
        }
        let Some(scaffold) = self.scaffold else {
            tracing::debug!("legend update before render ignored");
            return;
        };
        let duration = self.core.transition(animate);
        let extent = self.core.extent();
        let domain = self.core.domain();
        self.x = LinearScale {
            domain: extent,
            range: [0.0, self.inner_width()],
        };

        self.update_gradient(scaffold.gradient, extent, &domain, duration);
        self.update_dots(scaffold.dots, &domain, duration);
        self.update_axis(scaffold, duration);

        for (_, dot) in &self.dots {
            if self.core.is_selected(dot.feature.properties()) {
                self.scene.raise(dot.node);
            }
        }
    }

    fn update_gradient(
        &mut self,
        gradient: NodeId,
        extent: [f64; 2],
        domain: &[f64],
        duration: Option<f64>,
    ) {
        let first = domain.first().copied().unwrap_or(extent[0]);
        let last = domain.last().copied().unwrap_or(extent[1]);
        let range = extent[0] - extent[1];
        let x1 = (extent[0] - first) / range * 100.0;
        let x2 = 100.0 - (last - extent[1]) / range * 100.0;
        let x1 = if x1.is_finite() { x1 } else { 0.0 };
        let x2 = if x2.is_finite() { x2 } else { 100.0 };
        self.scene
            .animate(gradient, "x1", AttrValue::Percent(x1), duration);
        self.scene
            .animate(gradient, "x2", AttrValue::Percent(x2), duration);

        let colors = self.core.ramp();
        while self.stops.len() > colors.len() {
            if let Some(stop) = self.stops.pop() {
                self.scene.remove(stop);
            }
        }
        let last_index = colors.len().saturating_sub(1).max(1) as f64;
        for (i, color) in colors.iter().enumerate() {
            match self.stops.get(i) {
                Some(&stop) => {
                    self.scene
                        .animate(stop, "stop-color", AttrValue::Color(*color), duration);
                }
                None => {
                    let stop = self.scene.append(gradient, Element::Stop);
                    self.scene
                        .set(stop, "offset", AttrValue::Number(i as f64 / last_index));
                    self.scene.set(stop, "stop-color", AttrValue::Color(*color));
                    self.stops.push(stop);
                }
            }
        }
    }

    fn update_dots(&mut self, group: NodeId, domain: &[f64], duration: Option<f64>) {
        let colorizer = self.core.colorizer_for(domain);
        let mut keyed: Vec<(LocationId, BoundFeature)> = Vec::new();
        let mut seen = HashSet::new();
        for layer in self.core.layers().iter().filter(|l| l.dots) {
            for feature in self.core.bind(layer) {
                if feature.value().is_none() {
                    continue;
                }
                let Some(location) = self.core.location(feature.properties()) else {
                    continue;
                };
                if seen.insert(location) {
                    keyed.push((location, feature));
                }
            }
        }

        let mut current: HashMap<LocationId, Dot> = self.dots.drain(..).collect();
        let exiting = &mut self.exiting;
        let scene = &mut self.scene;
        current.retain(|location, dot| {
            if seen.contains(location) {
                return true;
            }
            scene.exit(dot.node, duration);
            exiting.insert(*location, dot.node);
            false
        });
        exiting.retain(|_, node| scene.contains(*node));

        for (location, feature) in keyed {
            let cx = self.x.apply(feature.value().unwrap_or_default());
            let node = match current.remove(&location) {
                Some(dot) => dot.node,
                None => match self.exiting.remove(&location) {
                    Some(node) => {
                        self.scene.revive(node);
                        node
                    }
                    None => {
                        let node = self.scene.append(group, Element::Circle);
                        self.scene.set(node, "opacity", AttrValue::Number(0.0));
                        self.scene
                            .set(node, "r", AttrValue::Number(self.config.radius));
                        self.scene.set(node, "cx", AttrValue::Number(cx));
                        let (fill, stroke) = self.core.styles(&feature, &colorizer, true);
                        self.scene.set(node, "fill", style_value(fill));
                        self.scene.set(node, "stroke", style_value(stroke));
                        node
                    }
                },
            };

            let classes = self.core.classes(&feature).join(" ");
            self.scene.set(node, "class", AttrValue::from(classes));
            self.scene
                .animate(node, "opacity", AttrValue::Number(1.0), duration);
            self.scene
                .animate(node, "cx", AttrValue::Number(cx), duration);
            let (fill, stroke) = self.core.styles(&feature, &colorizer, false);
            self.scene.animate(node, "fill", style_value(fill), duration);
            self.scene
                .animate(node, "stroke", style_value(stroke), duration);

            self.dots.push((location, Dot { node, feature }));
        }
    }

    fn update_axis(&mut self, scaffold: Scaffold, duration: Option<f64>) {
        let [start, stop] = self.x.domain;
        let format = tick_format(self.x.domain, self.core.unit());
        let values = ticks(start, stop, self.config.ticks);

        let mut current = std::mem::take(&mut self.ticks);
        let mut next = HashMap::with_capacity(values.len());
        for value in values {
            let key = value.to_string();
            let x = self.x.apply(value);
            let node = match current.remove(&key) {
                Some(node) => {
                    self.scene
                        .animate(node, "transform", AttrValue::Translate(x, 0.0), duration);
                    node
                }
                None => {
                    let node = self.scene.append(scaffold.axis, Element::Group);
                    self.scene.set(node, "class", AttrValue::from("tick"));
                    self.scene.set(node, "transform", AttrValue::Translate(x, 0.0));
                    self.scene.set(node, "opacity", AttrValue::Number(0.0));
                    let line = self.scene.append(node, Element::Line);
                    self.scene.set(line, "x2", AttrValue::Number(0.0));
                    self.scene.set(line, "y2", AttrValue::Number(INNER_TICK));
                    let text = self.scene.append(node, Element::Text);
                    self.scene.set(text, "x", AttrValue::Number(0.0));
                    self.scene
                        .set(text, "y", AttrValue::Number(INNER_TICK.max(0.0) + TICK_PADDING));
                    self.scene.set(text, "dy", AttrValue::from(".71em"));
                    self.scene.set(text, "text-anchor", AttrValue::from("middle"));
                    node
                }
            };
            self.scene
                .animate(node, "opacity", AttrValue::Number(1.0), duration);
            if let Some(&text) = self.scene.children(node).get(1) {
                self.scene.set_text(text, &format(value));
            }
            next.insert(key, node);
        }
        for (_, node) in current {
            self.scene.exit(node, duration);
        }
        self.ticks = next;

        let [r0, r1] = self.x.range;
        self.scene.set(
            scaffold.domain_path,
            "d",
            AttrValue::from(format!(
                "M{},{OUTER_TICK}V0H{}V{OUTER_TICK}",
                fmt_number(r0),
                fmt_number(r1)
            )),
        );
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.config.width = width;
        self.config.height = height;
        let root = self.scene.root();
        self.scene.set(root, "height", AttrValue::Number(height));
        self.scene.set(root, "width", AttrValue::Number(width));
        let Some(scaffold) = self.scaffold else {
            return;
        };

        let inner = self.inner_width();
        self.scene.set(scaffold.bar, "width", AttrValue::Number(inner));
        self.x.range = [0.0, inner];
        self.update_axis(scaffold, None);
        for (_, dot) in &self.dots {
            let cx = self.x.apply(dot.feature.value().unwrap_or_default());
            self.scene.set(dot.node, "cx", AttrValue::Number(cx));
        }
    }

    pub fn flush(&mut self, sink: &mut dyn SceneSink) -> bool {
        self.scene.flush(sink)
    }
}

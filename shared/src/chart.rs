//! Map chart: one group per derived layer, one path per feature, kept in
//! step with the layers by key and projected through the viewport.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::ChartConfig;
use crate::events::{EventChannel, EventKind, MapEvent, ZoomOffset};
use crate::layer::{BoundFeature, RenderableLayer};
use crate::map_core::MapCore;
use crate::path::{PathProjector, feature_bounds};
use crate::scale::Colorizer;
use crate::scene::{AttrValue, Clock, Element, NodeId, Scene, SceneSink, style_value};
use crate::topology::LocationId;
use crate::viewport::{ViewportController, ZoomCommand, ZoomTarget};

#[derive(Debug, Clone)]
struct FeatureNode {
    key: String,
    node: NodeId,
    feature: BoundFeature,
}

#[derive(Debug)]
struct LayerNode {
    key: String,
    node: NodeId,
    layer: Rc<RenderableLayer>,
    features: Vec<FeatureNode>,
    /// Fading feature paths by join key.
    exiting: HashMap<String, NodeId>,
}

struct JoinContext<'a> {
    core: &'a MapCore,
    colorizer: &'a Colorizer,
    projector: &'a PathProjector,
    focus: Option<LocationId>,
    duration: Option<f64>,
}

impl JoinContext<'_> {
    fn classes(&self, feature: &BoundFeature) -> String {
        let mut classes = self.core.classes(feature);
        if self.focus.is_some() && self.core.location(feature.properties()) == self.focus {
            classes.push("focused".into());
        }
        classes.join(" ")
    }
}

impl LayerNode {
    /// Exit features whose key is gone, revive or enter the rest, then
    /// restyle everything.
    fn join(&mut self, scene: &mut Scene, ctx: &JoinContext<'_>) {
        let mut seen = HashSet::new();
        let mut keyed = Vec::with_capacity(self.layer.features.len());
        for feature in ctx.core.bind(&self.layer) {
            let key = feature.join_key(ctx.core.key());
            if !seen.insert(key.clone()) {
                tracing::warn!(layer = %self.key, %key, "duplicate feature key skipped");
                continue;
            }
            keyed.push((key, feature));
        }

        let mut current: HashMap<String, FeatureNode> = std::mem::take(&mut self.features)
            .into_iter()
            .map(|f| (f.key.clone(), f))
            .collect();
        let exiting = &mut self.exiting;
        current.retain(|key, f| {
            if seen.contains(key) {
                return true;
            }
            scene.exit(f.node, ctx.duration);
            exiting.insert(key.clone(), f.node);
            false
        });
        exiting.retain(|_, node| scene.contains(*node));

        for (key, feature) in keyed {
            let (node, fresh) = match current.remove(&key) {
                Some(existing) => {
                    if !Rc::ptr_eq(&existing.feature.feature.geometry, &feature.feature.geometry) {
                        scene.set(
                            existing.node,
                            "d",
                            AttrValue::from(ctx.projector.path(&feature.feature.geometry)),
                        );
                    }
                    (existing.node, false)
                }
                None => match self.exiting.remove(&key) {
                    Some(node) => {
                        scene.revive(node);
                        scene.animate(node, "opacity", AttrValue::Number(1.0), ctx.duration);
                        (node, true)
                    }
                    None => (scene.append(self.node, Element::Path), true),
                },
            };

            scene.set(node, "class", AttrValue::from(ctx.classes(&feature)));
            if fresh {
                scene.set(
                    node,
                    "d",
                    AttrValue::from(ctx.projector.path(&feature.feature.geometry)),
                );
                let (fill, stroke) = ctx.core.styles(&feature, ctx.colorizer, true);
                scene.set(node, "fill", style_value(fill));
                scene.set(node, "stroke", style_value(stroke));
            }
            let (fill, stroke) = ctx.core.styles(&feature, ctx.colorizer, false);
            scene.animate(node, "fill", style_value(fill), ctx.duration);
            scene.animate(node, "stroke", style_value(stroke), ctx.duration);

            self.features.push(FeatureNode { key, node, feature });
        }
    }
}

pub struct MapChart {
    core: MapCore,
    scene: Scene,
    viewport: ViewportController,
    layers: Vec<LayerNode>,
    exiting: HashMap<String, LayerNode>,
    events: EventChannel,
    rendered: bool,
}

impl MapChart {
    pub fn new(config: &ChartConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            core: MapCore::new(&config.base),
            scene: Scene::new(clock),
            viewport: ViewportController::new(config),
            layers: Vec::new(),
            exiting: HashMap::new(),
            events: EventChannel::new(),
            rendered: false,
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

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn extent(&self) -> [f64; 2] {
        self.core.extent()
    }

    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&MapEvent) + 'static) {
        self.events.subscribe(kind, handler);
    }

    /// Group node of a live layer.
    pub fn layer_node(&self, key: &str) -> Option<NodeId> {
        self.layers.iter().find(|l| l.key == key).map(|l| l.node)
    }

    /// Path node of a live feature, by layer key and join key.
    pub fn node_for(&self, layer: &str, key: &str) -> Option<NodeId> {
        self.layers
            .iter()
            .find(|l| l.key == layer)?
            .features
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.node)
    }

    /// Feature drawn by `node`, if it is a live feature path.
    pub fn feature_at(&self, node: NodeId) -> Option<&BoundFeature> {
        self.layers
            .iter()
            .flat_map(|l| l.features.iter())
            .find(|f| f.node == node)
            .map(|f| &f.feature)
    }

    pub fn render(&mut self, layers: Vec<Rc<RenderableLayer>>) {
        let root = self.scene.root();
        self.scene
            .set(root, "width", AttrValue::Number(self.viewport.width()));
        self.scene
            .set(root, "height", AttrValue::Number(self.viewport.height()));
        self.rendered = true;
        self.update(Some(layers), true);
    }

    /// Re-join layers (when given) and features, recomputing classes and
    /// styles. `animate` tweens every change over the configured duration.
    pub fn update(&mut self, layers: Option<Vec<Rc<RenderableLayer>>>, animate: bool) {
        if !self.rendered {
            tracing::debug!("chart update before render ignored");
            return;
        }
        let duration = self.core.transition(animate);
        if let Some(layers) = layers {
            self.join_layers(layers, duration);
        }

        let colorizer = self.core.colorizer();
        let projector = self.viewport.projector();
        let ctx = JoinContext {
            core: &self.core,
            colorizer: &colorizer,
            projector: &projector,
            focus: self.viewport.focus(),
            duration,
        };
        for layer in &mut self.layers {
            layer.join(&mut self.scene, &ctx);
        }
        self.raise_selected();
    }

    fn join_layers(&mut self, layers: Vec<Rc<RenderableLayer>>, duration: Option<f64>) {
        let keys_changed = self
            .layers
            .iter()
            .map(|l| l.key.as_str())
            .ne(layers.iter().map(|l| l.key.as_str()));
        if keys_changed {
            let bounds = feature_bounds(layers.iter().flat_map(|l| l.features.iter()));
            self.viewport.set_bounds(bounds);
        }

        let root = self.scene.root();
        let mut current: HashMap<String, LayerNode> =
            self.layers.drain(..).map(|l| (l.key.clone(), l)).collect();
        let gone: Vec<String> = current
            .keys()
            .filter(|key| !layers.iter().any(|l| &l.key == *key))
            .cloned()
            .collect();
        for key in gone {
            if let Some(layer) = current.remove(&key) {
                tracing::debug!(layer = %key, "layer exit");
                self.scene.exit(layer.node, duration);
                self.exiting.insert(key, layer);
            }
        }
        let scene = &self.scene;
        self.exiting.retain(|_, l| scene.contains(l.node));

        let mut next: Vec<LayerNode> = Vec::with_capacity(layers.len());
        for layer in layers {
            if next.iter().any(|l| l.key == layer.key) {
                tracing::warn!(layer = %layer.key, "duplicate layer key skipped");
                continue;
            }
            let key = layer.key.clone();
            let node = match current.remove(&key) {
                Some(mut existing) => {
                    existing.layer = layer;
                    existing
                }
                None => match self.exiting.remove(&key) {
                    Some(mut revived) => {
                        tracing::debug!(layer = %key, "layer revived");
                        self.scene.revive(revived.node);
                        revived.layer = layer;
                        revived
                    }
                    None => {
                        tracing::debug!(layer = %key, "layer enter");
                        let node = self.scene.append(root, Element::Group);
                        self.scene
                            .set(node, "class", AttrValue::from(format!("layer layer-{key}")));
                        self.scene.set(node, "opacity", AttrValue::Number(0.0));
                        LayerNode {
                            key,
                            node,
                            layer,
                            features: Vec::new(),
                            exiting: HashMap::new(),
                        }
                    }
                },
            };
            next.push(node);
        }

        let order: Vec<NodeId> = next.iter().map(|l| l.node).collect();
        self.scene.reorder(root, &order);
        for layer in &next {
            self.scene
                .animate(layer.node, "opacity", AttrValue::Number(1.0), duration);
        }
        self.core
            .set_layers(next.iter().map(|l| l.layer.clone()).collect());
        self.layers = next;
    }

    /// Selected features draw last within their layer.
    fn raise_selected(&mut self) {
        for layer in &self.layers {
            for f in &layer.features {
                if self.core.is_selected(f.feature.properties()) {
                    self.scene.raise(f.node);
                }
            }
        }
    }

    fn refresh_classes(&mut self) {
        let colorizer = self.core.colorizer();
        let projector = self.viewport.projector();
        let ctx = JoinContext {
            core: &self.core,
            colorizer: &colorizer,
            projector: &projector,
            focus: self.viewport.focus(),
            duration: None,
        };
        for f in self.layers.iter().flat_map(|l| l.features.iter()) {
            self.scene
                .set(f.node, "class", AttrValue::from(ctx.classes(&f.feature)));
        }
    }

    fn reproject(&mut self) {
        let projector = self.viewport.projector();
        for f in self.layers.iter().flat_map(|l| l.features.iter()) {
            self.scene.set(
                f.node,
                "d",
                AttrValue::from(projector.path(&f.feature.feature.geometry)),
            );
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        let root = self.scene.root();
        self.scene.set(root, "width", AttrValue::Number(width));
        self.scene.set(root, "height", AttrValue::Number(height));
        self.viewport.resize(width, height);
    }

    /// Restyle features when the focused location changed.
    fn refocus(&mut self, before: Option<LocationId>) {
        if self.viewport.focus() != before {
            self.refresh_classes();
        }
    }

    pub fn zoom(&mut self, command: ZoomCommand) {
        let now = self.scene.now();
        let focus = self.viewport.focus();
        match command {
            ZoomCommand::In => self.viewport.zoom_in(now),
            ZoomCommand::Out => self.viewport.zoom_out(now),
            ZoomCommand::Reset => self.viewport.reset(now),
            ZoomCommand::To(target) => {
                let locations = match target {
                    ZoomTarget::Selected => self.core.selection().ids().to_vec(),
                    ZoomTarget::Locations(ids) => ids,
                };
                let core = &self.core;
                let bounds = feature_bounds(
                    self.layers
                        .iter()
                        .flat_map(|l| l.layer.features.iter())
                        .filter(|f| {
                            core.location(&f.properties)
                                .is_some_and(|id| locations.contains(&id))
                        }),
                );
                if !self.viewport.zoom_to(bounds, now) {
                    tracing::debug!(?locations, "no feature matches zoom target");
                }
            }
        }
        self.refocus(focus);
    }

    /// Click on a feature path: zoom to it, or back out when it already has
    /// the focus.
    pub fn toggle_zoom(&mut self, node: NodeId) {
        let Some((location, bounds)) = self.feature_at(node).and_then(|f| {
            let location = self.core.location(f.properties())?;
            Some((location, feature_bounds([&f.feature])))
        }) else {
            return;
        };
        self.viewport.toggle(location, bounds, self.scene.now());
        self.refresh_classes();
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        let focus = self.viewport.focus();
        self.viewport.pan(dx, dy);
        self.refocus(focus);
    }

    pub fn zoom_at(&mut self, delta: f64, x: f64, y: f64) {
        let focus = self.viewport.focus();
        self.viewport.zoom_at(delta, x, y);
        self.refocus(focus);
    }

    /// Step the viewport. A changed transform reprojects every path and is
    /// announced as a `Zoom` event.
    pub fn tick(&mut self) -> Option<ZoomOffset> {
        let offset = self.viewport.advance(self.scene.now())?;
        self.reproject();
        self.events.emit(&MapEvent::Zoom(offset));
        Some(offset)
    }

    /// Tick, then push pending changes into `sink`. `true` while anything is
    /// still moving.
    pub fn flush(&mut self, sink: &mut dyn SceneSink) -> bool {
        self.tick();
        let animating = self.scene.flush(sink);
        animating || self.viewport.is_animating()
    }
}

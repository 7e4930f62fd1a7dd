//! Retained scene graph mirrored into the document by a [`SceneSink`].
//!
//! Nodes keep their [`NodeId`] for as long as they live, so a sink can map
//! them one-to-one onto DOM elements. Attribute changes are either applied
//! immediately or tweened over a duration; [`Scene::flush`] pushes everything
//! that changed since the previous flush.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use crate::colors::Rgb;

/// Source of the current time in milliseconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Clock advanced by hand. Used natively and in tests.
#[derive(Debug, Default)]
pub struct ManualClock(Cell<f64>);

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self(Cell::new(start))
    }

    pub fn set(&self, now: f64) {
        self.0.set(now);
    }

    pub fn advance(&self, delta: f64) {
        self.0.set(self.0.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Svg,
    Group,
    Path,
    Circle,
    Rect,
    Line,
    Text,
    Defs,
    LinearGradient,
    Stop,
}

impl Element {
    pub fn tag(self) -> &'static str {
        match self {
            Element::Svg => "svg",
            Element::Group => "g",
            Element::Path => "path",
            Element::Circle => "circle",
            Element::Rect => "rect",
            Element::Line => "line",
            Element::Text => "text",
            Element::Defs => "defs",
            Element::LinearGradient => "linearGradient",
            Element::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Percent(f64),
    Color(Rgb),
    Translate(f64, f64),
    Text(String),
}

impl AttrValue {
    pub fn render(&self) -> String {
        match self {
            AttrValue::Number(n) => fmt_number(*n),
            AttrValue::Percent(p) => format!("{}%", fmt_number(*p)),
            AttrValue::Color(c) => c.to_string(),
            AttrValue::Translate(x, y) => format!("translate({}, {})", fmt_number(*x), fmt_number(*y)),
            AttrValue::Text(s) => s.clone(),
        }
    }

    fn interpolate(from: Option<&AttrValue>, to: Option<&AttrValue>, t: f64) -> Option<AttrValue> {
        match (from, to) {
            (Some(AttrValue::Number(a)), Some(AttrValue::Number(b))) => {
                Some(AttrValue::Number(a + (b - a) * t))
            }
            (Some(AttrValue::Percent(a)), Some(AttrValue::Percent(b))) => {
                Some(AttrValue::Percent(a + (b - a) * t))
            }
            (Some(AttrValue::Color(a)), Some(AttrValue::Color(b))) => Some(AttrValue::Color(a.lerp(*b, t))),
            (Some(AttrValue::Translate(ax, ay)), Some(AttrValue::Translate(bx, by))) => Some(
                AttrValue::Translate(ax + (bx - ax) * t, ay + (by - ay) * t),
            ),
            // Not interpolable: jump straight to the target.
            (_, to) => to.cloned(),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<Rgb> for AttrValue {
    fn from(value: Rgb) -> Self {
        AttrValue::Color(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// Parse a style string into the most specific attribute value, so colors
/// produced by style functions can still be tweened.
pub fn style_value(style: Option<String>) -> Option<AttrValue> {
    let style = style?;
    match Rgb::parse(&style) {
        Some(color) => Some(AttrValue::Color(color)),
        None => Some(AttrValue::Text(style)),
    }
}

/// Shortest rendering of a coordinate: integers without a fraction, others
/// with at most three decimals.
pub fn fmt_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() && rounded.abs() < 1e15 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{rounded:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone)]
struct Tween {
    from: Option<AttrValue>,
    start: f64,
    duration: f64,
}

#[derive(Debug, Clone, Default)]
struct Attr {
    /// Target value; `None` removes the attribute.
    value: Option<AttrValue>,
    tween: Option<Tween>,
}

impl Attr {
    fn value_at(&self, now: f64) -> Option<AttrValue> {
        match &self.tween {
            Some(tween) if now < tween.start + tween.duration => {
                let t = ((now - tween.start) / tween.duration).clamp(0.0, 1.0);
                AttrValue::interpolate(tween.from.as_ref(), self.value.as_ref(), ease_cubic_in_out(t))
            }
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: BTreeMap<String, Attr>,
    text: Option<String>,
    exit_at: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Created(NodeId),
    Text(NodeId),
    Reordered(NodeId),
    Removed(NodeId),
}

/// Receiver of scene patches, typically an SVG document.
pub trait SceneSink {
    /// Create `element` and append it to `parent` (`None` for the root).
    fn create(&mut self, id: NodeId, parent: Option<NodeId>, element: Element);
    fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>);
    fn set_text(&mut self, id: NodeId, text: &str);
    /// Children of `parent` now draw in exactly this order.
    fn reorder(&mut self, parent: NodeId, children: &[NodeId]);
    fn remove(&mut self, id: NodeId);
}

pub struct Scene {
    clock: Rc<dyn Clock>,
    next_id: u64,
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    pending: Vec<Pending>,
    dirty: BTreeSet<(NodeId, String)>,
    announced: HashSet<NodeId>,
}

impl Scene {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                element: Element::Svg,
                parent: None,
                children: Vec::new(),
                attrs: BTreeMap::new(),
                text: None,
                exit_at: None,
            },
        );
        Self {
            clock,
            next_id: 1,
            root,
            nodes,
            pending: vec![Pending::Created(root)],
            dirty: BTreeSet::new(),
            announced: HashSet::new(),
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, id: NodeId) -> Option<Element> {
        self.nodes.get(&id).map(|n| n.element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Append a new child element to `parent`.
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                element,
                parent: Some(parent),
                children: Vec::new(),
                attrs: BTreeMap::new(),
                text: None,
                exit_at: None,
            },
        );
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        self.pending.push(Pending::Created(id));
        id
    }

    /// Current (possibly mid-transition) value of an attribute.
    pub fn get(&self, id: NodeId, name: &str) -> Option<AttrValue> {
        let now = self.now();
        self.nodes.get(&id)?.attrs.get(name)?.value_at(now)
    }

    /// Value the attribute is heading towards.
    pub fn target(&self, id: NodeId, name: &str) -> Option<AttrValue> {
        self.nodes.get(&id)?.attrs.get(name)?.value.clone()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id)?.text.as_deref()
    }

    /// Set an attribute immediately, cancelling any running tween on it.
    pub fn set(&mut self, id: NodeId, name: &str, value: impl Into<Option<AttrValue>>) {
        let value = value.into();
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let attr = node.attrs.entry(name.to_string()).or_default();
        attr.value = value;
        attr.tween = None;
        self.dirty.insert((id, name.to_string()));
    }

    /// Move an attribute to `value`, tweening when `duration` is positive.
    /// A running tween is retargeted from its current value.
    pub fn animate(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<Option<AttrValue>>,
        duration: Option<f64>,
    ) {
        let Some(duration) = duration.filter(|d| *d > 0.0) else {
            self.set(id, name, value);
            return;
        };
        let value = value.into();
        let now = self.now();
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let attr = node.attrs.entry(name.to_string()).or_default();
        let from = attr.value_at(now);
        if from == value && attr.tween.is_none() {
            return;
        }
        attr.tween = Some(Tween {
            from,
            start: now,
            duration,
        });
        attr.value = value;
        self.dirty.insert((id, name.to_string()));
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.text.as_deref() == Some(text) {
            return;
        }
        node.text = Some(text.to_string());
        self.pending.push(Pending::Text(id));
    }

    /// Fade a node out and drop it once the fade finishes. Without a
    /// duration the node is removed right away.
    pub fn exit(&mut self, id: NodeId, duration: Option<f64>) {
        match duration.filter(|d| *d > 0.0) {
            Some(d) => {
                let end = self.now() + d;
                self.animate(id, "opacity", AttrValue::Number(0.0), Some(d));
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.exit_at = Some(end);
                }
            }
            None => self.remove(id),
        }
    }

    pub fn is_exiting(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.exit_at.is_some())
    }

    /// Cancel a pending exit. The caller retargets opacity itself.
    pub fn revive(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.exit_at = None;
        }
    }

    /// Remove a node and its subtree immediately.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
        self.pending.push(Pending::Removed(id));
    }

    /// Put the listed children of `parent` in the given order. Children not
    /// listed (typically exiting ones) keep their relative order and draw first.
    pub fn reorder(&mut self, parent: NodeId, order: &[NodeId]) {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        let listed: HashSet<NodeId> = order.iter().copied().collect();
        let mut children: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|c| !listed.contains(c))
            .collect();
        children.extend(order.iter().copied().filter(|c| node.children.contains(c)));
        if children != node.children {
            node.children = children;
            self.pending.push(Pending::Reordered(parent));
        }
    }

    /// Move a node to the end of its parent's draw order.
    pub fn raise(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        if node.children.last() == Some(&id) {
            return;
        }
        node.children.retain(|c| *c != id);
        node.children.push(id);
        self.pending.push(Pending::Reordered(parent));
    }

    /// Whether any attribute is still tweening or any node is still exiting.
    pub fn is_animating(&self) -> bool {
        let now = self.now();
        self.nodes.values().any(|node| {
            node.exit_at.is_some()
                || node
                    .attrs
                    .values()
                    .any(|a| a.tween.as_ref().is_some_and(|t| now < t.start + t.duration))
        })
    }

    /// Push every change since the last flush into `sink`. Returns `true`
    /// while transitions are still running and another flush is needed.
    pub fn flush(&mut self, sink: &mut dyn SceneSink) -> bool {
        let now = self.now();

        let finished: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.exit_at.is_some_and(|end| now >= end))
            .map(|(id, _)| *id)
            .collect();
        for id in finished {
            self.remove(id);
        }

        for pending in std::mem::take(&mut self.pending) {
            match pending {
                Pending::Created(id) => {
                    let Some(node) = self.nodes.get(&id) else {
                        continue;
                    };
                    if !self.announced.insert(id) {
                        continue;
                    }
                    sink.create(id, node.parent, node.element);
                    if let Some(text) = &node.text {
                        sink.set_text(id, text);
                    }
                    for name in node.attrs.keys() {
                        self.dirty.insert((id, name.clone()));
                    }
                }
                Pending::Text(id) => {
                    if let Some(text) = self.nodes.get(&id).and_then(|n| n.text.as_deref())
                        && self.announced.contains(&id)
                    {
                        sink.set_text(id, text);
                    }
                }
                Pending::Reordered(parent) => {
                    if self.announced.contains(&parent)
                        && let Some(node) = self.nodes.get(&parent)
                    {
                        let children: Vec<NodeId> = node
                            .children
                            .iter()
                            .copied()
                            .filter(|c| self.announced.contains(c))
                            .collect();
                        sink.reorder(parent, &children);
                    }
                }
                Pending::Removed(id) => {
                    if self.announced.remove(&id) {
                        sink.remove(id);
                    }
                }
            }
        }
        // Descendants of removed nodes went with their ancestor.
        self.announced.retain(|a| self.nodes.contains_key(a));

        let mut animating = false;
        for (id, name) in std::mem::take(&mut self.dirty) {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let Some(attr) = node.attrs.get_mut(&name) else {
                continue;
            };
            let value = attr.value_at(now);
            let rendered = value.as_ref().map(AttrValue::render);
            sink.set_attribute(id, &name, rendered.as_deref());

            let running = attr
                .tween
                .as_ref()
                .is_some_and(|t| now < t.start + t.duration);
            if running {
                self.dirty.insert((id, name));
                animating = true;
            } else {
                attr.tween = None;
            }
        }

        tracing::trace!(nodes = self.nodes.len(), animating, "scene flushed");
        animating || self.nodes.values().any(|n| n.exit_at.is_some())
    }
}

/// Cubic ease-in-out: accelerating, then decelerating.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::{Element, NodeId, SceneSink};

    #[derive(Debug, Clone)]
    pub(crate) struct MemoryNode {
        pub element: Element,
        pub attrs: HashMap<String, String>,
        pub text: Option<String>,
        pub children: Vec<NodeId>,
    }

    /// In-memory document counting element creation and removal.
    #[derive(Debug, Default)]
    pub(crate) struct MemorySink {
        pub nodes: HashMap<NodeId, MemoryNode>,
        pub created: usize,
        pub removed: usize,
    }

    impl MemorySink {
        pub(crate) fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
            self.nodes.get(&id)?.attrs.get(name).map(String::as_str)
        }

        pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
            self.nodes
                .get(&id)
                .map(|n| n.children.clone())
                .unwrap_or_default()
        }

        pub(crate) fn has_class(&self, id: NodeId, class: &str) -> bool {
            self.attr(id, "class")
                .is_some_and(|c| c.split_whitespace().any(|part| part == class))
        }
    }

    impl SceneSink for MemorySink {
        fn create(&mut self, id: NodeId, parent: Option<NodeId>, element: Element) {
            self.created += 1;
            self.nodes.insert(
                id,
                MemoryNode {
                    element,
                    attrs: HashMap::new(),
                    text: None,
                    children: Vec::new(),
                },
            );
            if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
                parent.children.push(id);
            }
        }

        fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) {
            if let Some(node) = self.nodes.get_mut(&id) {
                match value {
                    Some(v) => {
                        node.attrs.insert(name.to_string(), v.to_string());
                    }
                    None => {
                        node.attrs.remove(name);
                    }
                }
            }
        }

        fn set_text(&mut self, id: NodeId, text: &str) {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.text = Some(text.to_string());
            }
        }

        fn reorder(&mut self, parent: NodeId, children: &[NodeId]) {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children = children.to_vec();
            }
        }

        fn remove(&mut self, id: NodeId) {
            self.removed += 1;
            let mut stack = vec![id];
            while let Some(current) = stack.pop() {
                if let Some(node) = self.nodes.remove(&current) {
                    stack.extend(node.children);
                }
            }
            for node in self.nodes.values_mut() {
                node.children.retain(|c| *c != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::testing::MemorySink;
    use super::*;

    fn scene() -> (Rc<ManualClock>, Scene) {
        let clock = Rc::new(ManualClock::new(0.0));
        let scene = Scene::new(clock.clone());
        (clock, scene)
    }

    #[test]
    fn flush_creates_nodes_with_attributes() {
        let (_, mut scene) = scene();
        let root = scene.root();
        let group = scene.append(root, Element::Group);
        scene.set(group, "class", AttrValue::from("layer"));
        let mut sink = MemorySink::default();

        assert!(!scene.flush(&mut sink));
        assert_eq!(sink.created, 2);
        assert_eq!(sink.children(root), vec![group]);
        assert_eq!(sink.attr(group, "class"), Some("layer"));
    }

    #[test]
    fn tweens_interpolate_until_done() {
        let (clock, mut scene) = scene();
        let node = scene.append(scene.root(), Element::Circle);
        scene.set(node, "cx", AttrValue::Number(0.0));
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);

        scene.animate(node, "cx", AttrValue::Number(100.0), Some(1000.0));
        clock.set(500.0);
        assert!(scene.flush(&mut sink));
        assert_eq!(sink.attr(node, "cx"), Some("50"));

        clock.set(1000.0);
        assert!(!scene.flush(&mut sink));
        assert_eq!(sink.attr(node, "cx"), Some("100"));
    }

    #[test]
    fn animate_without_duration_is_immediate() {
        let (_, mut scene) = scene();
        let node = scene.append(scene.root(), Element::Path);
        scene.animate(node, "fill", AttrValue::Color(Rgb(1, 2, 3)), None);
        let mut sink = MemorySink::default();
        assert!(!scene.flush(&mut sink));
        assert_eq!(sink.attr(node, "fill"), Some("rgb(1, 2, 3)"));
    }

    #[test]
    fn retargeting_starts_from_current_value() {
        let (clock, mut scene) = scene();
        let node = scene.append(scene.root(), Element::Circle);
        scene.set(node, "r", AttrValue::Number(0.0));
        scene.animate(node, "r", AttrValue::Number(10.0), Some(100.0));
        clock.set(50.0);
        scene.animate(node, "r", AttrValue::Number(0.0), Some(100.0));
        assert_eq!(scene.get(node, "r"), Some(AttrValue::Number(5.0)));
        assert_eq!(scene.target(node, "r"), Some(AttrValue::Number(0.0)));
    }

    #[test]
    fn exiting_nodes_are_removed_after_fade() {
        let (clock, mut scene) = scene();
        let node = scene.append(scene.root(), Element::Path);
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);

        scene.exit(node, Some(200.0));
        assert!(scene.flush(&mut sink));
        assert!(sink.nodes.contains_key(&node));

        clock.set(250.0);
        assert!(!scene.flush(&mut sink));
        assert!(!scene.contains(node));
        assert!(!sink.nodes.contains_key(&node));
        assert_eq!(sink.removed, 1);
    }

    #[test]
    fn every_exit_in_one_flush_reaches_the_sink() {
        let (clock, mut scene) = scene();
        let root = scene.root();
        let group = scene.append(root, Element::Group);
        let nodes: Vec<NodeId> = (0..3).map(|_| scene.append(group, Element::Circle)).collect();
        let nested = scene.append(nodes[0], Element::Text);
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);

        for &node in &nodes {
            scene.exit(node, Some(100.0));
        }
        clock.set(150.0);
        scene.flush(&mut sink);

        assert_eq!(sink.removed, 3);
        assert!(sink.children(group).is_empty());
        assert!(!sink.nodes.contains_key(&nested));
    }

    #[test]
    fn removals_after_a_flush_all_reach_the_sink() {
        let (_, mut scene) = scene();
        let root = scene.root();
        let a = scene.append(root, Element::Path);
        let b = scene.append(root, Element::Path);
        let c = scene.append(root, Element::Path);
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);

        scene.remove(a);
        scene.remove(c);
        scene.flush(&mut sink);
        assert_eq!(sink.removed, 2);
        assert_eq!(sink.children(root), vec![b]);
    }

    #[test]
    fn revived_nodes_survive() {
        let (clock, mut scene) = scene();
        let node = scene.append(scene.root(), Element::Path);
        scene.exit(node, Some(200.0));
        scene.revive(node);
        scene.animate(node, "opacity", AttrValue::Number(1.0), Some(200.0));
        clock.set(500.0);
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);
        assert!(scene.contains(node));
        assert_eq!(sink.attr(node, "opacity"), Some("1"));
    }

    #[test]
    fn nodes_created_and_removed_between_flushes_never_reach_the_sink() {
        let (_, mut scene) = scene();
        let node = scene.append(scene.root(), Element::Path);
        scene.remove(node);
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);
        assert_eq!(sink.created, 1);
        assert_eq!(sink.removed, 0);
    }

    #[test]
    fn reorder_and_raise_update_draw_order() {
        let (_, mut scene) = scene();
        let root = scene.root();
        let a = scene.append(root, Element::Group);
        let b = scene.append(root, Element::Group);
        let c = scene.append(root, Element::Group);
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);

        scene.reorder(root, &[c, a]);
        scene.flush(&mut sink);
        assert_eq!(sink.children(root), vec![b, c, a]);

        scene.raise(b);
        scene.flush(&mut sink);
        assert_eq!(sink.children(root), vec![c, a, b]);
    }

    #[test]
    fn removing_a_group_drops_its_subtree() {
        let (_, mut scene) = scene();
        let group = scene.append(scene.root(), Element::Group);
        let child = scene.append(group, Element::Path);
        scene.remove(group);
        assert!(!scene.contains(child));
        assert!(scene.children(scene.root()).is_empty());
    }

    #[test]
    fn text_content_is_forwarded() {
        let (_, mut scene) = scene();
        let label = scene.append(scene.root(), Element::Text);
        scene.set_text(label, "10%");
        let mut sink = MemorySink::default();
        scene.flush(&mut sink);
        assert_eq!(sink.nodes[&label].text.as_deref(), Some("10%"));

        scene.set_text(label, "20%");
        scene.flush(&mut sink);
        assert_eq!(sink.nodes[&label].text.as_deref(), Some("20%"));
    }

    #[test]
    fn numbers_render_compactly() {
        assert_eq!(fmt_number(3.0), "3");
        assert_eq!(fmt_number(-0.5), "-0.5");
        assert_eq!(fmt_number(1.23456), "1.235");
        assert_eq!(fmt_number(f64::NAN), "0");
        assert_eq!(AttrValue::Percent(12.5).render(), "12.5%");
        assert_eq!(AttrValue::Translate(1.0, 2.5).render(), "translate(1, 2.5)");
    }

    #[test]
    fn style_values_prefer_colors() {
        assert_eq!(
            style_value(Some("rgb(1, 2, 3)".into())),
            Some(AttrValue::Color(Rgb(1, 2, 3)))
        );
        assert_eq!(
            style_value(Some("none".into())),
            Some(AttrValue::Text("none".into()))
        );
        assert_eq!(style_value(None), None);
    }
}

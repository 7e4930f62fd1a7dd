use std::collections::{HashMap, HashSet};

use choropleth_shared::{Element, NodeId, SceneSink};
use wasm_bindgen::JsCast;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Attribute carrying the scene id, read back on pointer events.
pub(crate) const NODE_ATTR: &str = "data-node";

/// Presentation values set as inline style so they beat stylesheet rules.
fn is_style(name: &str) -> bool {
    matches!(name, "fill" | "stroke" | "opacity")
}

/// Mirrors one scene into real SVG elements under `container`.
pub(crate) struct SvgSink {
    document: web_sys::Document,
    container: web_sys::Element,
    elements: HashMap<NodeId, web_sys::Element>,
    lineage: Lineage,
}

/// Parent links of the mirrored nodes, so a removal can drop a whole
/// subtree without touching unrelated elements.
#[derive(Debug, Default)]
struct Lineage {
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, HashSet<NodeId>>,
}

impl Lineage {
    fn attach(&mut self, id: NodeId, parent: NodeId) {
        self.parents.insert(id, parent);
        self.children.entry(parent).or_default().insert(id);
    }

    /// Forget `id` and its descendants, returning every forgotten id.
    fn detach(&mut self, id: NodeId) -> Vec<NodeId> {
        if let Some(parent) = self.parents.get(&id)
            && let Some(siblings) = self.children.get_mut(parent)
        {
            siblings.remove(&id);
        }
        let mut gone = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.parents.remove(&current);
            if let Some(children) = self.children.remove(&current) {
                stack.extend(children);
            }
            gone.push(current);
        }
        gone
    }
}

impl SvgSink {
    pub(crate) fn new(container: web_sys::Element) -> Option<Self> {
        let document = container.owner_document()?;
        Some(Self {
            document,
            container,
            elements: HashMap::new(),
            lineage: Lineage::default(),
        })
    }
}

/// Scene id of the element under a pointer event, if it came from a scene.
pub(crate) fn node_of(target: Option<web_sys::EventTarget>) -> Option<NodeId> {
    let el = target?.dyn_into::<web_sys::Element>().ok()?;
    let raw = el.get_attribute(NODE_ATTR)?;
    raw.parse().ok().map(NodeId::from_raw)
}

impl SceneSink for SvgSink {
    fn create(&mut self, id: NodeId, parent: Option<NodeId>, element: Element) {
        let el = match self.document.create_element_ns(Some(SVG_NS), element.tag()) {
            Ok(el) => el,
            Err(e) => {
                web_sys::console::warn_1(&format!("create {} failed: {e:?}", element.tag()).into());
                return;
            }
        };
        el.set_attribute(NODE_ATTR, &id.raw().to_string()).ok();
        let host = match parent {
            Some(parent) => self.elements.get(&parent),
            None => Some(&self.container),
        };
        if let Some(host) = host {
            host.append_child(&el).ok();
        }
        if let Some(parent) = parent {
            self.lineage.attach(id, parent);
        }
        self.elements.insert(id, el);
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        let Some(el) = self.elements.get(&id) else {
            return;
        };
        if is_style(name)
            && let Some(svg) = el.dyn_ref::<web_sys::SvgElement>()
        {
            let style = svg.style();
            match value {
                Some(v) => style.set_property(name, v).ok(),
                None => style.remove_property(name).ok().map(|_| ()),
            };
            return;
        }
        match value {
            Some(v) => el.set_attribute(name, v).ok(),
            None => el.remove_attribute(name).ok(),
        };
    }

    fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(el) = self.elements.get(&id) {
            el.set_text_content(Some(text));
        }
    }

    fn reorder(&mut self, parent: NodeId, children: &[NodeId]) {
        let Some(host) = self.elements.get(&parent) else {
            return;
        };
        // appendChild moves an existing child to the end.
        for child in children {
            if let Some(el) = self.elements.get(child) {
                host.append_child(el).ok();
            }
        }
    }

    fn remove(&mut self, id: NodeId) {
        if let Some(el) = self.elements.get(&id) {
            el.remove();
        }
        // Descendants left the DOM with their ancestor.
        for gone in self.lineage.detach(id) {
            self.elements.remove(&gone);
        }
    }
}

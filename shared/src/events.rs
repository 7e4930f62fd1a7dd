use serde::{Deserialize, Serialize};

use crate::scale::Bounds;

/// Zoom state relative to the full-map viewbox.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoomOffset {
    pub scale: f64,
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    /// Slider moved: filter values changed.
    #[serde(rename = "filter")]
    Slide,
    /// Domain narrowed to the current filter values.
    Set,
    /// Filter and domain cleared.
    Reset,
    /// Extent changed underneath an unchanged slider.
    Refresh,
}

/// Filter state in data units, ready to apply to the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterChange {
    pub values: Bounds,
    pub domain: Bounds,
    pub action: FilterAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapEvent {
    Zoom(ZoomOffset),
    Filter(FilterChange),
}

impl MapEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MapEvent::Zoom(_) => EventKind::Zoom,
            MapEvent::Filter(_) => EventKind::Filter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Zoom,
    Filter,
}

type Handler = Box<dyn FnMut(&MapEvent)>;

/// Publish/subscribe channel owned by one component.
#[derive(Default)]
pub struct EventChannel {
    handlers: Vec<(EventKind, Handler)>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&MapEvent) + 'static) {
        self.handlers.push((kind, Box::new(handler)));
    }

    pub fn emit(&mut self, event: &MapEvent) {
        let kind = event.kind();
        for (_, handler) in self.handlers.iter_mut().filter(|(k, _)| *k == kind) {
            handler(event);
        }
    }

    pub fn subscribers(&self, kind: EventKind) -> usize {
        self.handlers.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

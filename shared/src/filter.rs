//! Range-slider filter over the data extent.
//!
//! Slider positions are kept as fractions of the extent; events carry them
//! scaled back into data units.

use crate::events::{EventChannel, EventKind, FilterAction, FilterChange, MapEvent};
use crate::scale::Bounds;

#[derive(Debug)]
pub struct MapFilter {
    extent: [f64; 2],
    values: Bounds,
    domain: Bounds,
    rendered: bool,
    events: EventChannel,
}

/// Fractions at (or beyond) either end mean "no bound".
fn normalize(bounds: Bounds) -> Bounds {
    bounds.map(|b| b.filter(|v| *v > 0.0 && *v < 1.0))
}

impl MapFilter {
    pub fn new(extent: [f64; 2]) -> Self {
        Self {
            extent,
            values: [None, None],
            domain: [None, None],
            rendered: false,
            events: EventChannel::new(),
        }
    }

    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&MapEvent) + 'static) {
        self.events.subscribe(kind, handler);
    }

    pub fn extent(&self) -> [f64; 2] {
        self.extent
    }

    /// Slider fractions, unset bounds shown at the ends.
    pub fn slider(&self) -> [f64; 2] {
        [self.values[0].unwrap_or(0.0), self.values[1].unwrap_or(1.0)]
    }

    pub fn values(&self) -> Bounds {
        self.values
    }

    pub fn domain(&self) -> Bounds {
        self.domain
    }

    /// Nothing to reset.
    pub fn reset_disabled(&self) -> bool {
        self.values.iter().chain(&self.domain).all(Option::is_none)
    }

    /// Data value at slider fraction `fraction`.
    pub fn scaled(&self, fraction: f64) -> f64 {
        self.extent[0] + (self.extent[1] - self.extent[0]) * fraction
    }

    pub fn render(&mut self, extent: [f64; 2]) -> FilterChange {
        self.extent = extent;
        self.rendered = true;
        self.update(FilterAction::Refresh)
    }

    pub fn slide(&mut self, fractions: [f64; 2]) -> Option<FilterChange> {
        self.values = fractions.map(Some);
        self.rendered.then(|| self.update(FilterAction::Slide))
    }

    /// Narrow the color domain to the current filter.
    pub fn set_scale(&mut self) -> Option<FilterChange> {
        self.domain = self.values;
        self.rendered.then(|| self.update(FilterAction::Set))
    }

    pub fn reset(&mut self) -> Option<FilterChange> {
        self.values = [None, None];
        self.domain = [None, None];
        self.rendered.then(|| self.update(FilterAction::Reset))
    }

    /// Re-emit in the new units when the extent moves.
    pub fn set_extent(&mut self, extent: [f64; 2]) -> Option<FilterChange> {
        if extent == self.extent {
            return None;
        }
        self.extent = extent;
        self.rendered.then(|| self.update(FilterAction::Refresh))
    }

    fn update(&mut self, action: FilterAction) -> FilterChange {
        self.values = normalize(self.values);
        self.domain = normalize(self.domain);
        let change = FilterChange {
            values: self.values.map(|v| v.map(|f| self.scaled(f))),
            domain: self.domain.map(|v| v.map(|f| self.scaled(f))),
            action,
        };
        tracing::debug!(?change, "filter changed");
        self.events.emit(&MapEvent::Filter(change));
        change
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn slide_scales_fractions_onto_extent() {
        let mut filter = MapFilter::new([0.0, 200.0]);
        filter.render([0.0, 200.0]);
        let change = filter.slide([0.25, 1.0]).expect("rendered");
        assert_eq!(change.values, [Some(50.0), None]);
        assert_eq!(change.domain, [None, None]);
        assert_eq!(change.action, FilterAction::Slide);
        assert_eq!(filter.slider(), [0.25, 1.0]);
        assert!(!filter.reset_disabled());
    }

    #[test]
    fn set_and_reset_move_the_domain() {
        let mut filter = MapFilter::new([0.0, 10.0]);
        filter.render([0.0, 10.0]);
        filter.slide([0.2, 0.6]);
        let set = filter.set_scale().expect("rendered");
        assert_eq!(set.domain, [Some(2.0), Some(6.0)]);

        let reset = filter.reset().expect("rendered");
        assert_eq!(reset.values, [None, None]);
        assert_eq!(reset.domain, [None, None]);
        assert!(filter.reset_disabled());
    }

    #[test]
    fn nothing_is_emitted_before_render() {
        let mut filter = MapFilter::new([0.0, 1.0]);
        let seen = Rc::new(RefCell::new(0));
        let count = seen.clone();
        filter.on(EventKind::Filter, move |_| *count.borrow_mut() += 1);
        assert!(filter.slide([0.5, 0.7]).is_none());
        filter.render([0.0, 1.0]);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn extent_changes_re_emit_in_new_units() {
        let mut filter = MapFilter::new([0.0, 1.0]);
        filter.render([0.0, 1.0]);
        filter.slide([0.5, 1.0]);
        assert!(filter.set_extent([0.0, 1.0]).is_none());
        let change = filter.set_extent([0.0, 40.0]).expect("extent moved");
        assert_eq!(change.values, [Some(20.0), None]);
        assert_eq!(change.action, FilterAction::Refresh);
    }
}

//! The map as one component: chart, optional legend and optional filter
//! over a single topology, with layers derived on demand.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::chart::MapChart;
use crate::config::{ChartConfig, LegendConfig};
use crate::events::{EventKind, FilterAction, FilterChange, MapEvent};
use crate::filter::MapFilter;
use crate::format::Unit;
use crate::geometry::GeometryDeriver;
use crate::layer::{Layer, RenderableLayer};
use crate::legend::MapLegend;
use crate::scale::{Bounds, Direction};
use crate::scene::{Clock, NodeId, SceneSink};
use crate::selection::SelectionModel;
use crate::topology::{LocationId, Topology};
use crate::viewport::ZoomCommand;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub chart: ChartConfig,
    pub legend: Option<LegendConfig>,
    /// Whether to host a range filter.
    pub filter: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            chart: ChartConfig::default(),
            legend: Some(LegendConfig::default()),
            filter: true,
        }
    }
}

/// Arguments of [`Map::render`] and [`Map::update`]. Unset fields keep
/// their current state.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub layers: Option<Vec<Layer>>,
    pub selected: Option<Vec<LocationId>>,
    pub direction: Option<Direction>,
    pub extent: Option<Bounds>,
    pub animate: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layers: None,
            selected: None,
            direction: None,
            extent: None,
            animate: true,
        }
    }
}

impl RenderOptions {
    pub fn layers(layers: Vec<Layer>) -> Self {
        Self {
            layers: Some(layers),
            ..Self::default()
        }
    }
}

pub struct Map {
    topology: Rc<Topology>,
    deriver: GeometryDeriver,
    layers: Vec<Layer>,
    selection: SelectionModel,
    chart: MapChart,
    legend: Option<MapLegend>,
    filter: Option<MapFilter>,
    rendered: bool,
}

impl Map {
    pub fn new(config: &MapConfig, topology: Rc<Topology>, clock: Rc<dyn Clock>) -> Self {
        let chart = MapChart::new(&config.chart, clock.clone());
        let filter = config.filter.then(|| MapFilter::new(chart.extent()));
        Self {
            topology,
            deriver: GeometryDeriver::with_key(config.chart.base.key.clone()),
            layers: Vec::new(),
            selection: SelectionModel::new(config.chart.base.selected.iter().copied()),
            legend: config
                .legend
                .as_ref()
                .map(|legend| MapLegend::new(legend, clock)),
            chart,
            filter,
            rendered: false,
        }
    }

    pub fn chart(&self) -> &MapChart {
        &self.chart
    }

    pub fn legend(&self) -> Option<&MapLegend> {
        self.legend.as_ref()
    }

    pub fn filter(&self) -> Option<&MapFilter> {
        self.filter.as_ref()
    }

    pub fn topology(&self) -> &Rc<Topology> {
        &self.topology
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Swap in a new topology; cached geometry is dropped and the layers
    /// are derived again.
    pub fn set_topology(&mut self, topology: Rc<Topology>) {
        self.topology = topology;
        self.deriver.invalidate();
        self.refresh(true, true);
    }

    fn derive(&mut self) -> Vec<Rc<RenderableLayer>> {
        self.deriver
            .derive_layers(&self.topology, &self.layers, &self.selection)
    }

    /// Apply the state carried by `options`. Returns whether the layers
    /// need deriving again.
    fn apply(&mut self, options: RenderOptions) -> bool {
        let relayer = options.layers.is_some() || options.selected.is_some();
        if let Some(layers) = options.layers {
            self.layers = layers;
        }
        if let Some(selected) = options.selected {
            self.select(selected, false);
        }
        if let Some(direction) = options.direction {
            self.set_direction(direction, false);
        }
        if let Some(extent) = options.extent {
            self.set_extent(extent, false);
        }
        relayer
    }

    pub fn render(&mut self, options: RenderOptions) {
        self.apply(options);
        let layers = self.derive();
        tracing::debug!(layers = layers.len(), "map render");
        self.chart.render(layers.clone());
        if let Some(legend) = &mut self.legend {
            legend.render(layers);
        }
        self.rendered = true;
        let extent = self.chart.extent();
        if let Some(filter) = &mut self.filter {
            filter.render(extent);
        }
    }

    pub fn update(&mut self, options: RenderOptions) {
        let animate = options.animate;
        let relayer = self.apply(options);
        self.refresh(relayer, animate);
    }

    fn refresh(&mut self, relayer: bool, animate: bool) {
        if !self.rendered {
            return;
        }
        let layers = relayer.then(|| self.derive());
        self.chart.update(layers.clone(), animate);
        if let Some(legend) = &mut self.legend {
            legend.update(layers, animate);
        }

        let extent = self.chart.extent();
        let change = self
            .filter
            .as_mut()
            .and_then(|filter| filter.set_extent(extent));
        if let Some(change) = change {
            self.apply_filter_change(change);
        }
    }

    pub fn resize(&mut self, chart: (f64, f64), legend: Option<(f64, f64)>) {
        self.chart.resize(chart.0, chart.1);
        if let (Some(component), Some((width, height))) = (&mut self.legend, legend) {
            component.resize(width, height);
        }
    }

    pub fn zoom(&mut self, command: ZoomCommand) {
        self.chart.zoom(command);
    }

    pub fn toggle_zoom(&mut self, node: NodeId) {
        self.chart.toggle_zoom(node);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.chart.pan(dx, dy);
    }

    pub fn zoom_at(&mut self, delta: f64, x: f64, y: f64) {
        self.chart.zoom_at(delta, x, y);
    }

    pub fn selected(&self) -> &[LocationId] {
        self.selection.ids()
    }

    /// Replace the selection. The selection mesh is derived again.
    pub fn select(&mut self, ids: impl IntoIterator<Item = LocationId>, update: bool) {
        self.selection.select(ids);
        let ids = self.selection.ids().to_vec();
        self.chart.core_mut().select(ids.iter().copied());
        if let Some(legend) = &mut self.legend {
            legend.core_mut().select(ids);
        }
        if update {
            self.refresh(true, true);
        }
    }

    pub fn direction(&self) -> Direction {
        self.chart.core().direction()
    }

    pub fn set_direction(&mut self, direction: Direction, update: bool) {
        self.chart.core_mut().set_direction(direction);
        if let Some(legend) = &mut self.legend {
            legend.core_mut().set_direction(direction);
        }
        if update {
            self.refresh(false, true);
        }
    }

    pub fn unit(&self) -> Unit {
        self.chart.core().unit()
    }

    pub fn set_unit(&mut self, unit: Unit, update: bool) {
        self.chart.core_mut().set_unit(unit);
        if let Some(legend) = &mut self.legend {
            legend.core_mut().set_unit(unit);
        }
        if update {
            self.refresh(false, true);
        }
    }

    /// Filter bounds in data units.
    pub fn filter_bounds(&self) -> Bounds {
        self.chart.core().filter()
    }

    pub fn set_filter(&mut self, filter: Bounds, update: bool) {
        self.chart.core_mut().set_filter(filter);
        if let Some(legend) = &mut self.legend {
            legend.core_mut().set_filter(filter);
        }
        if update {
            self.refresh(false, true);
        }
    }

    /// Color domain override.
    pub fn domain_bounds(&self) -> Bounds {
        self.chart.core().domain_bounds()
    }

    pub fn set_domain(&mut self, domain: Bounds, update: bool) {
        self.chart.core_mut().set_domain(domain);
        if let Some(legend) = &mut self.legend {
            legend.core_mut().set_domain(domain);
        }
        if update {
            self.refresh(false, true);
        }
    }

    pub fn extent(&self) -> [f64; 2] {
        self.chart.extent()
    }

    pub fn set_extent(&mut self, extent: Bounds, update: bool) {
        self.chart.core_mut().set_extent(extent);
        if let Some(legend) = &mut self.legend {
            legend.core_mut().set_extent(extent);
        }
        if update {
            self.refresh(false, true);
        }
    }

    /// Move the filter slider to `fractions` of the extent.
    pub fn filter_slide(&mut self, fractions: [f64; 2]) {
        if let Some(change) = self.filter.as_mut().and_then(|f| f.slide(fractions)) {
            self.apply_filter_change(change);
        }
    }

    /// Narrow the color domain to the filter.
    pub fn filter_set(&mut self) {
        if let Some(change) = self.filter.as_mut().and_then(MapFilter::set_scale) {
            self.apply_filter_change(change);
        }
    }

    pub fn filter_reset(&mut self) {
        if let Some(change) = self.filter.as_mut().and_then(MapFilter::reset) {
            self.apply_filter_change(change);
        }
    }

    /// Take over the filter's values and domain. Anything but a slide
    /// animates.
    fn apply_filter_change(&mut self, change: FilterChange) {
        let mut changed = false;
        if change.values != self.filter_bounds() {
            self.set_filter(change.values, false);
            changed = true;
        }
        if change.domain != self.domain_bounds() {
            self.set_domain(change.domain, false);
            changed = true;
        }
        if changed {
            self.refresh(false, change.action != FilterAction::Slide);
        }
    }

    /// Subscribe to zoom events of the chart or filter events of the filter.
    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&MapEvent) + 'static) {
        match kind {
            EventKind::Zoom => self.chart.on(kind, handler),
            EventKind::Filter => match &mut self.filter {
                Some(filter) => filter.on(kind, handler),
                None => tracing::debug!("filter subscription without a filter"),
            },
        }
    }

    /// Push pending changes of every component. `true` while anything is
    /// still moving.
    pub fn flush(
        &mut self,
        chart: &mut dyn SceneSink,
        legend: Option<&mut dyn SceneSink>,
    ) -> bool {
        let mut animating = self.chart.flush(chart);
        if let (Some(component), Some(sink)) = (&mut self.legend, legend) {
            animating |= component.flush(sink);
        }
        animating
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::geometry::BORDERS_LAYER;
    use crate::layer::{Datum, LayerData};
    use crate::scene::ManualClock;
    use crate::scene::testing::MemorySink;
    use crate::topology::tests::THREE_SQUARES;

    struct Fixture {
        clock: Rc<ManualClock>,
        map: Map,
        chart: MemorySink,
        legend: MemorySink,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Rc::new(ManualClock::new(0.0));
            let topology = Rc::new(Topology::from_json(THREE_SQUARES).expect("fixture parses"));
            Self {
                map: Map::new(&MapConfig::default(), topology, clock.clone()),
                clock,
                chart: MemorySink::default(),
                legend: MemorySink::default(),
            }
        }

        fn settle(&mut self) {
            self.clock.advance(5_000.0);
            self.map.flush(&mut self.chart, Some(&mut self.legend));
        }

        fn node(&self, layer: &str, key: &str) -> NodeId {
            self.map
                .chart()
                .node_for(layer, key)
                .expect("feature rendered")
        }
    }

    fn admin0(values: &[(LocationId, f64)]) -> Vec<Layer> {
        let data: LayerData = values.iter().map(|(id, v)| (*id, Datum::value(*v))).collect();
        vec![Layer::new("admin0", "admin0").with_data(data)]
    }

    #[test]
    fn render_draws_chart_and_legend() {
        let mut fx = Fixture::new();
        fx.map
            .render(RenderOptions::layers(admin0(&[(1, 0.0), (2, 100.0)])));
        fx.settle();

        assert_eq!(fx.map.extent(), [0.0, 100.0]);
        let legend = fx.map.legend().expect("legend configured");
        assert!(legend.dot_for(1).is_some());
        assert_eq!(legend.dot_for(3), None);
        assert!(fx.chart.has_class(fx.node("admin0", "key-3"), "no-data"));
        assert!(fx.map.chart().layer_node(BORDERS_LAYER).is_some());
    }

    #[test]
    fn selection_marks_features_and_rebuilds_the_mesh() {
        let mut fx = Fixture::new();
        fx.map
            .render(RenderOptions::layers(admin0(&[(1, 1.0), (2, 2.0), (3, 3.0)])));
        fx.settle();
        let mesh = fx.node(BORDERS_LAYER, "selected");
        assert_eq!(fx.chart.attr(mesh, "d"), Some(""));

        fx.map.select([2], true);
        fx.settle();

        assert_eq!(fx.map.selected(), &[2]);
        assert!(fx.chart.has_class(fx.node("admin0", "key-2"), "selected"));
        assert!(!fx.chart.has_class(fx.node("admin0", "key-1"), "selected"));
        assert_eq!(fx.node(BORDERS_LAYER, "selected"), mesh);
        assert!(fx.chart.attr(mesh, "d").is_some_and(|d| d.starts_with('M')));
        let dot = fx.map.legend().and_then(|l| l.dot_for(2)).expect("dot");
        assert!(fx.legend.has_class(dot, "selected"));
    }

    #[test]
    fn select_without_update_defers_drawing() {
        let mut fx = Fixture::new();
        fx.map
            .render(RenderOptions::layers(admin0(&[(1, 1.0), (2, 2.0)])));
        fx.settle();
        let mesh = fx.node(BORDERS_LAYER, "selected");

        fx.map.select([2], false);
        fx.settle();
        assert_eq!(fx.map.selected(), &[2]);
        assert_eq!(fx.map.chart().core().selection().ids(), &[2]);
        let legend = fx.map.legend().expect("legend configured");
        assert_eq!(legend.core().selection().ids(), &[2]);
        assert!(!fx.chart.has_class(fx.node("admin0", "key-2"), "selected"));
        assert_eq!(fx.chart.attr(mesh, "d"), Some(""));

        fx.map.select([2], true);
        fx.settle();
        assert!(fx.chart.has_class(fx.node("admin0", "key-2"), "selected"));
        assert!(fx.chart.attr(mesh, "d").is_some_and(|d| d.starts_with('M')));
    }

    #[test]
    fn replacing_the_topology_derives_fresh_geometry() {
        let mut fx = Fixture::new();
        fx.map
            .render(RenderOptions::layers(admin0(&[(1, 1.0), (2, 2.0)])));
        fx.map.select([2], true);
        fx.settle();
        let two = fx.node("admin0", "key-2");
        let mesh = fx.node(BORDERS_LAYER, "selected");
        assert!(!fx.chart.has_class(two, "no-data"));
        assert!(fx.chart.attr(mesh, "d").is_some_and(|d| d.starts_with('M')));

        // Square 2 now belongs to location 8, which has no data and is not selected.
        let replaced = Topology::from_json(&THREE_SQUARES.replace("\"2\"", "\"8\""))
            .expect("fixture parses");
        fx.map.set_topology(Rc::new(replaced));
        fx.settle();

        assert_eq!(fx.node("admin0", "key-2"), two);
        assert!(fx.chart.has_class(two, "no-data"));
        assert!(!fx.chart.has_class(two, "selected"));
        assert_eq!(fx.chart.attr(mesh, "d"), Some(""));
    }

    #[test]
    fn filter_slides_classify_features_without_animation() {
        let mut fx = Fixture::new();
        fx.map
            .render(RenderOptions::layers(admin0(&[(1, 0.0), (2, 50.0), (3, 100.0)])));
        fx.settle();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        fx.map.on(EventKind::Filter, move |event| {
            if let MapEvent::Filter(change) = event {
                log.borrow_mut().push(change.action);
            }
        });

        fx.map.filter_slide([0.25, 1.0]);
        assert_eq!(fx.map.filter_bounds(), [Some(25.0), None]);
        // A slide applies immediately; no flush needed to settle.
        fx.map.flush(&mut fx.chart, Some(&mut fx.legend));
        assert!(fx.chart.has_class(fx.node("admin0", "key-1"), "filtered"));
        assert!(!fx.chart.has_class(fx.node("admin0", "key-2"), "filtered"));

        fx.map.filter_set();
        assert_eq!(fx.map.domain_bounds(), [Some(25.0), None]);
        fx.map.filter_reset();
        assert_eq!(fx.map.filter_bounds(), [None, None]);
        assert_eq!(fx.map.domain_bounds(), [None, None]);
        fx.settle();
        assert!(!fx.chart.has_class(fx.node("admin0", "key-1"), "filtered"));

        assert_eq!(
            *seen.borrow(),
            vec![FilterAction::Slide, FilterAction::Set, FilterAction::Reset]
        );
    }

    #[test]
    fn extent_changes_refresh_the_filter() {
        let mut fx = Fixture::new();
        fx.map
            .render(RenderOptions::layers(admin0(&[(1, 0.0), (2, 100.0)])));
        fx.map.filter_slide([0.5, 1.0]);
        assert_eq!(fx.map.filter_bounds(), [Some(50.0), None]);

        fx.map.update(RenderOptions::layers(admin0(&[(1, 0.0), (2, 200.0)])));
        assert_eq!(fx.map.extent(), [0.0, 200.0]);
        assert_eq!(fx.map.filter_bounds(), [Some(100.0), None]);
    }

    #[test]
    fn setters_reach_both_components() {
        let mut fx = Fixture::new();
        fx.map.render(RenderOptions::layers(admin0(&[(1, 1.0)])));
        fx.map.set_direction(Direction::Ascending, true);
        fx.map.set_unit(Unit::Percent, false);
        let legend = fx.map.legend().expect("legend configured");
        assert_eq!(legend.core().direction(), Direction::Ascending);
        assert_eq!(legend.core().unit(), Unit::Percent);
        assert_eq!(fx.map.direction(), Direction::Ascending);
        assert_eq!(fx.map.unit(), Unit::Percent);
    }

    #[test]
    fn updates_before_render_only_record_state() {
        let mut fx = Fixture::new();
        fx.map.update(RenderOptions {
            selected: Some(vec![3]),
            ..RenderOptions::layers(admin0(&[(1, 1.0)]))
        });
        assert_eq!(fx.map.chart().layer_node("admin0"), None);
        assert_eq!(fx.map.layers().len(), 1);
        assert_eq!(fx.map.selected(), &[3]);
    }
}

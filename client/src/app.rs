use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;
use web_sys::{MouseEvent, PointerEvent, WheelEvent};

use choropleth_shared::format::{HoverValue, hover};
use choropleth_shared::{
    BarChart, BarChartConfig, Clock, DataRecord, Direction, EventKind, LocationId, Map, MapConfig,
    MapEvent, RenderOptions, Topology, create_layers, random_dataset,
};

use crate::config::{
    BAR_COUNT, CLICK_SLOP, DETAIL, LEGEND_HEIGHT, RESIZE_DEBOUNCE_MS, Settings,
};
use crate::controls::{BarControls, DirectionToggle, FilterControls, LocationSelect, ZoomControls};
use crate::fetch::{fetch_dataset, fetch_topology};
use crate::render_loop::{PerformanceClock, RenderScheduler};
use crate::svg::{SvgSink, node_of};

/// Everything drawn, with the DOM each scene is mirrored into.
struct Scenes {
    map: Map,
    bars: BarChart,
    chart_host: web_sys::Element,
    legend_host: web_sys::Element,
    chart_sink: SvgSink,
    legend_sink: SvgSink,
    bar_sink: SvgSink,
}

impl Scenes {
    fn flush(&mut self) -> bool {
        let map = self
            .map
            .flush(&mut self.chart_sink, Some(&mut self.legend_sink));
        let bars = self.bars.flush(&mut self.bar_sink);
        map || bars
    }

    fn fit(&mut self) {
        let chart = element_size(&self.chart_host);
        let legend = element_size(&self.legend_host);
        self.map.resize(chart, Some((legend.0, LEGEND_HEIGHT)));
    }
}

fn element_size(el: &web_sys::Element) -> (f64, f64) {
    let rect = el.get_bounding_client_rect();
    (rect.width().max(1.0), rect.height().max(1.0))
}

/// Filter state mirrored into the controls.
#[derive(Clone, Copy)]
pub(crate) struct FilterUi {
    pub slider: RwSignal<[f64; 2]>,
    pub labels: RwSignal<[String; 2]>,
    pub reset_disabled: RwSignal<bool>,
}

impl FilterUi {
    fn new() -> Self {
        Self {
            slider: RwSignal::new([0.0, 1.0]),
            labels: RwSignal::new([String::new(), String::new()]),
            reset_disabled: RwSignal::new(true),
        }
    }

    fn sync(&self, map: &Map) {
        let Some(filter) = map.filter() else {
            return;
        };
        let slider = filter.slider();
        let unit = map.unit();
        self.slider.set(slider);
        self.labels
            .set(slider.map(|f| hover(HoverValue::Value(filter.scaled(f)), unit, None)));
        self.reset_disabled.set(filter.reset_disabled());
    }
}

/// Shared access to the scenes for event handlers. Every change schedules
/// a flush.
#[derive(Clone)]
pub(crate) struct AppHandle {
    scenes: Rc<RefCell<Option<Scenes>>>,
    scheduler: Rc<RenderScheduler>,
    filter: FilterUi,
}

impl AppHandle {
    pub(crate) fn map(&self, f: impl FnOnce(&mut Map)) {
        let Ok(mut scenes) = self.scenes.try_borrow_mut() else {
            return;
        };
        if let Some(scenes) = scenes.as_mut() {
            f(&mut scenes.map);
            self.filter.sync(&scenes.map);
        }
        drop(scenes);
        self.scheduler.mark_dirty();
    }

    pub(crate) fn bars(&self, f: impl FnOnce(&mut BarChart)) {
        let Ok(mut scenes) = self.scenes.try_borrow_mut() else {
            return;
        };
        if let Some(scenes) = scenes.as_mut() {
            f(&mut scenes.bars);
        }
        drop(scenes);
        self.scheduler.mark_dirty();
    }

    fn fit(&self) {
        if let Ok(mut scenes) = self.scenes.try_borrow_mut()
            && let Some(scenes) = scenes.as_mut()
        {
            scenes.fit();
        }
        self.scheduler.mark_dirty();
    }
}

/// DOM hosts the scenes mount into.
struct Hosts {
    chart: web_sys::Element,
    legend: web_sys::Element,
    bars: web_sys::Element,
}

async fn load() -> Result<(Topology, Vec<DataRecord>), String> {
    let topology = fetch_topology().await?;
    let dataset = fetch_dataset().await?;
    Ok((topology, dataset))
}

/// Locations that have a value, in id order.
fn locations_with_data(dataset: &[DataRecord]) -> Vec<LocationId> {
    let mut ids: Vec<LocationId> = dataset
        .iter()
        .filter(|r| r.value.is_some())
        .map(|r| r.location_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn build(
    handle: &AppHandle,
    hosts: Hosts,
    topology: Topology,
    dataset: &[DataRecord],
    settings: &Settings,
    zoom: RwSignal<f64>,
) -> Result<(), String> {
    let clock: Rc<dyn Clock> = Rc::new(PerformanceClock::new());
    let (width, height) = element_size(&hosts.chart);

    let mut config = MapConfig::default();
    config.chart.width = width;
    config.chart.height = height;
    config.chart.base.scale.direction = settings.direction;
    if let Some(legend) = &mut config.legend {
        legend.width = element_size(&hosts.legend).0;
        legend.height = LEGEND_HEIGHT;
        legend.base.scale.direction = settings.direction;
    }

    let topology = Rc::new(topology);
    let layers = create_layers(&topology, dataset, DETAIL);
    tracing::info!(layers = layers.len(), records = dataset.len(), "map data loaded");

    let mut map = Map::new(&config, topology, clock.clone());
    map.on(EventKind::Zoom, move |event| {
        if let MapEvent::Zoom(offset) = event {
            zoom.set(offset.scale);
        }
    });
    map.render(RenderOptions {
        layers: Some(layers),
        selected: Some(settings.selected.clone()),
        ..RenderOptions::default()
    });
    handle.filter.sync(&map);

    let mut bars = BarChart::new(&BarChartConfig::default(), clock);
    bars.render(&random_dataset(BAR_COUNT, js_sys::Math::random));

    let no_document = || "container detached from the document".to_string();
    let scenes = Scenes {
        map,
        bars,
        chart_sink: SvgSink::new(hosts.chart.clone()).ok_or_else(no_document)?,
        legend_sink: SvgSink::new(hosts.legend.clone()).ok_or_else(no_document)?,
        bar_sink: SvgSink::new(hosts.bars).ok_or_else(no_document)?,
        chart_host: hosts.chart,
        legend_host: hosts.legend,
    };
    *handle.scenes.borrow_mut() = Some(scenes);
    handle.scheduler.mark_dirty();
    Ok(())
}

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Refit the map once the window has stopped resizing for a moment.
fn bind_resize(handle: AppHandle) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let pending: Rc<RefCell<Option<gloo_timers::callback::Timeout>>> = Rc::new(RefCell::new(None));
    let handler = Closure::<dyn Fn()>::new(move || {
        let handle = handle.clone();
        let timeout = gloo_timers::callback::Timeout::new(RESIZE_DEBOUNCE_MS, move || {
            handle.fit();
        });
        // Dropping the previous timeout cancels it.
        pending.borrow_mut().replace(timeout);
    });
    if window
        .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
        .is_err()
    {
        web_sys::console::warn_1(&"resize listener not installed".into());
        return;
    }

    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old.window.remove_event_listener_with_callback(
                "resize",
                old._handler.as_ref().unchecked_ref(),
            );
        }
        *slot.borrow_mut() = Some(ResizeBinding {
            window,
            _handler: handler,
        });
    });
}

struct WheelBinding {
    host: web_sys::Element,
    handler: Closure<dyn Fn(WheelEvent)>,
}

thread_local! {
    static WHEEL_BINDING: RefCell<Option<WheelBinding>> = const { RefCell::new(None) };
}

/// Wheel zoom on the chart host. The listener is registered as non-passive
/// so `prevent_default` keeps the page from scrolling.
fn bind_wheel(handle: AppHandle, host: web_sys::Element) {
    let target = host.clone();
    let handler = Closure::<dyn Fn(WheelEvent)>::new(move |e: WheelEvent| {
        e.prevent_default();
        let rect = target.get_bounding_client_rect();
        let x = e.client_x() as f64 - rect.left();
        let y = e.client_y() as f64 - rect.top();
        handle.map(|map| map.zoom_at(e.delta_y(), x, y));
    });
    let options = web_sys::AddEventListenerOptions::new();
    options.set_passive(false);
    if host
        .add_event_listener_with_callback_and_add_event_listener_options(
            "wheel",
            handler.as_ref().unchecked_ref(),
            &options,
        )
        .is_err()
    {
        web_sys::console::warn_1(&"wheel listener not installed".into());
        return;
    }

    WHEEL_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .host
                .remove_event_listener_with_callback("wheel", old.handler.as_ref().unchecked_ref());
        }
        *slot.borrow_mut() = Some(WheelBinding { host, handler });
    });
}

/// Root application component.
#[component]
pub fn App() -> impl IntoView {
    let settings = Settings::load();
    let status: RwSignal<Option<String>> = RwSignal::new(Some("Loading map…".into()));
    let direction: RwSignal<Direction> = RwSignal::new(settings.direction);
    let selected: RwSignal<Vec<LocationId>> = RwSignal::new(settings.selected.clone());
    let locations: RwSignal<Vec<LocationId>> = RwSignal::new(Vec::new());
    let zoom: RwSignal<f64> = RwSignal::new(1.0);

    let chart_ref = NodeRef::<leptos::html::Div>::new();
    let legend_ref = NodeRef::<leptos::html::Div>::new();
    let bars_ref = NodeRef::<leptos::html::Div>::new();

    let scenes: Rc<RefCell<Option<Scenes>>> = Rc::new(RefCell::new(None));
    let scheduler = RenderScheduler::new({
        let scenes = scenes.clone();
        move || {
            let Ok(mut scenes) = scenes.try_borrow_mut() else {
                return true;
            };
            scenes.as_mut().is_some_and(Scenes::flush)
        }
    });
    let handle = AppHandle {
        scenes,
        scheduler: Rc::new(scheduler),
        filter: FilterUi::new(),
    };

    Effect::new(move || {
        Settings {
            direction: direction.get(),
            selected: selected.get(),
        }
        .save();
    });

    // Fetch and build once the hosts are mounted.
    let started = Rc::new(Cell::new(false));
    Effect::new({
        let handle = handle.clone();
        move || {
            if started.get() {
                return;
            }
            let (Some(chart), Some(legend), Some(bars)) =
                (chart_ref.get(), legend_ref.get(), bars_ref.get())
            else {
                return;
            };
            started.set(true);
            let hosts = Hosts {
                chart: chart.into(),
                legend: legend.into(),
                bars: bars.into(),
            };
            let chart_host = hosts.chart.clone();
            let handle = handle.clone();
            spawn_local(async move {
                let built = match load().await {
                    Ok((topology, dataset)) => {
                        locations.set(locations_with_data(&dataset));
                        let settings = Settings {
                            direction: direction.get_untracked(),
                            selected: selected.get_untracked(),
                        };
                        build(&handle, hosts, topology, &dataset, &settings, zoom)
                    }
                    Err(e) => Err(e),
                };
                match built {
                    Ok(()) => {
                        status.set(None);
                        bind_wheel(handle.clone(), chart_host);
                        bind_resize(handle);
                    }
                    Err(e) => {
                        web_sys::console::warn_1(&format!("map load failed: {e}").into());
                        status.set(Some(format!("Could not load the map: {e}")));
                    }
                }
            });
        }
    });

    // --- Chart input ---

    let dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last = Rc::new(Cell::new((0.0f64, 0.0f64)));

    let on_pointer_down = {
        let dragging = dragging.clone();
        let drag_start = drag_start.clone();
        let last = last.clone();
        move |e: PointerEvent| {
            let at = (e.client_x() as f64, e.client_y() as f64);
            dragging.set(true);
            drag_start.set(at);
            last.set(at);
        }
    };

    let on_pointer_move = {
        let dragging = dragging.clone();
        let last = last.clone();
        let handle = handle.clone();
        move |e: PointerEvent| {
            if !dragging.get() {
                return;
            }
            let at = (e.client_x() as f64, e.client_y() as f64);
            let (dx, dy) = (at.0 - last.get().0, at.1 - last.get().1);
            last.set(at);
            handle.map(|map| map.pan(dx, dy));
        }
    };

    let on_pointer_up = {
        let dragging = dragging.clone();
        move |_: PointerEvent| dragging.set(false)
    };

    let on_click = {
        let handle = handle.clone();
        move |e: MouseEvent| {
            let (sx, sy) = drag_start.get();
            let moved = (e.client_x() as f64 - sx).abs().max((e.client_y() as f64 - sy).abs());
            if moved >= CLICK_SLOP {
                return;
            }
            if let Some(node) = node_of(e.target()) {
                handle.map(|map| map.toggle_zoom(node));
            }
        }
    };

    let filter = handle.filter;
    view! {
        <main class="app">
            <header class="toolbar">
                <ZoomControls handle=handle.clone() zoom=zoom />
                <DirectionToggle handle=handle.clone() direction=direction />
                <LocationSelect handle=handle.clone() locations=locations selected=selected />
            </header>
            <Show when=move || status.get().is_some()>
                <p class="status">{move || status.get().unwrap_or_default()}</p>
            </Show>
            <div
                class="chart"
                node_ref=chart_ref
                style="touch-action: none; cursor: grab;"
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=on_pointer_up
                on:pointerleave=move |_: PointerEvent| dragging.set(false)
                on:click=on_click
            />
            <div class="legend" node_ref=legend_ref />
            <FilterControls handle=handle.clone() filter=filter />
            <section class="bars">
                <div node_ref=bars_ref />
                <BarControls handle=handle.clone() />
            </section>
        </main>
    }
}

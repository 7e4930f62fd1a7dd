use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::MouseEvent;

use choropleth_shared::{Direction, LocationId, ZoomCommand, ZoomTarget, parse_selection, random_dataset};

use crate::app::{AppHandle, FilterUi};
use crate::config::BAR_COUNT;

#[component]
pub(crate) fn ZoomControls(handle: AppHandle, zoom: RwSignal<f64>) -> impl IntoView {
    let command = move |command: ZoomCommand| {
        let handle = handle.clone();
        move |_: MouseEvent| {
            let command = command.clone();
            handle.map(|map| map.zoom(command));
        }
    };

    view! {
        <div class="zoom-controls">
            <button title="Zoom in" on:click=command(ZoomCommand::In)>"+"</button>
            <button title="Zoom out" on:click=command(ZoomCommand::Out)>"-"</button>
            <button on:click=command(ZoomCommand::Reset)>"Reset"</button>
            <button on:click=command(ZoomCommand::To(ZoomTarget::Selected))>"Selected"</button>
            <span class="zoom-level">{move || format!("x{:.2}", zoom.get())}</span>
        </div>
    }
}

#[component]
pub(crate) fn DirectionToggle(handle: AppHandle, direction: RwSignal<Direction>) -> impl IntoView {
    let on_click = move |_: MouseEvent| {
        let next = direction.get_untracked().flipped();
        direction.set(next);
        handle.map(|map| map.set_direction(next, true));
    };

    view! {
        <button class="direction" on:click=on_click>
            {move || format!("Direction {}", direction.get())}
        </button>
    }
}

/// Multi-select of every location that has data.
#[component]
pub(crate) fn LocationSelect(
    handle: AppHandle,
    locations: RwSignal<Vec<LocationId>>,
    selected: RwSignal<Vec<LocationId>>,
) -> impl IntoView {
    let on_change = move |e: web_sys::Event| {
        let Some(select) = e
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlSelectElement>().ok())
        else {
            return;
        };
        let options = select.selected_options();
        let values: Vec<String> = (0..options.length())
            .filter_map(|i| options.item(i))
            .filter_map(|el| el.dyn_into::<web_sys::HtmlOptionElement>().ok())
            .map(|option| option.value())
            .collect();
        let ids = parse_selection(values.iter().map(String::as_str));
        selected.set(ids.clone());
        handle.map(|map| map.select(ids, true));
    };

    view! {
        <select multiple class="locations" on:change=on_change>
            {move || {
                let chosen = selected.get();
                locations
                    .get()
                    .into_iter()
                    .map(|id| {
                        let is_selected = chosen.contains(&id);
                        view! {
                            <option value=id.to_string() prop:selected=is_selected>
                                {format!("Location {id}")}
                            </option>
                        }
                    })
                    .collect_view()
            }}
        </select>
    }
}

/// Two-thumb range filter plus "set scale" and "reset".
#[component]
pub(crate) fn FilterControls(handle: AppHandle, filter: FilterUi) -> impl IntoView {
    let slide = {
        let handle = handle.clone();
        move |index: usize| {
            let handle = handle.clone();
            move |e: web_sys::Event| {
                let Ok(value) = event_target_value(&e).parse::<f64>() else {
                    return;
                };
                let mut fractions = filter.slider.get_untracked();
                fractions[index] = value;
                // Thumbs never cross.
                if index == 0 {
                    fractions[0] = fractions[0].min(fractions[1]);
                } else {
                    fractions[1] = fractions[1].max(fractions[0]);
                }
                handle.map(|map| map.filter_slide(fractions));
            }
        }
    };
    let on_set = {
        let handle = handle.clone();
        move |_: MouseEvent| handle.map(|map| map.filter_set())
    };
    let on_reset = move |_: MouseEvent| handle.map(|map| map.filter_reset());

    view! {
        <div class="filter">
            <label>
                <span>{move || filter.labels.get()[0].clone()}</span>
                <input
                    type="range"
                    min="0"
                    max="1"
                    step="0.00001"
                    prop:value=move || filter.slider.get()[0].to_string()
                    on:input=slide(0)
                />
            </label>
            <label>
                <input
                    type="range"
                    min="0"
                    max="1"
                    step="0.00001"
                    prop:value=move || filter.slider.get()[1].to_string()
                    on:input=slide(1)
                />
                <span>{move || filter.labels.get()[1].clone()}</span>
            </label>
            <button on:click=on_set>"Set scale"</button>
            <button on:click=on_reset prop:disabled=move || filter.reset_disabled.get()>
                "Reset"
            </button>
        </div>
    }
}

#[component]
pub(crate) fn BarControls(handle: AppHandle) -> impl IntoView {
    let on_click = move |_: MouseEvent| {
        let values = random_dataset(BAR_COUNT, js_sys::Math::random);
        handle.bars(|bars| bars.update(&values));
    };

    view! { <button class="randomize" on:click=on_click>"Randomize"</button> }
}

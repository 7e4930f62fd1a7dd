use choropleth_shared::{Direction, LocationId};

pub(crate) const TOPOLOGY_URL: &str = "/topo.json";
pub(crate) const DATASET_URL: &str = "/data.json";

/// Administrative levels drawn, counted from `admin0`.
pub(crate) const DETAIL: usize = 2;

pub(crate) const RESIZE_DEBOUNCE_MS: u32 = 150;
pub(crate) const LEGEND_HEIGHT: f64 = 60.0;
pub(crate) const BAR_COUNT: usize = 20;

/// Pointer travel below which a press counts as a click.
pub(crate) const CLICK_SLOP: f64 = 5.0;

const SETTINGS_KEY: &str = "choropleth_settings";

/// What survives a reload.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub direction: Direction,
    pub selected: Vec<LocationId>,
}

impl Settings {
    pub(crate) fn load() -> Self {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default()
    }

    pub(crate) fn save(&self) {
        use gloo_storage::Storage;
        if let Err(e) = gloo_storage::LocalStorage::set(SETTINGS_KEY, self) {
            web_sys::console::warn_1(&format!("settings not saved: {e}").into());
        }
    }
}

pub mod bar_chart;
pub mod chart;
pub mod colors;
pub mod config;
pub mod dataset;
pub mod events;
pub mod filter;
pub mod format;
pub mod geometry;
pub mod layer;
pub mod legend;
pub mod map;
pub mod map_core;
pub mod path;
pub mod scale;
pub mod scene;
pub mod selection;
pub mod topology;
pub mod viewport;

pub use bar_chart::{BarChart, random_dataset};
pub use chart::MapChart;
pub use colors::Rgb;
pub use config::*;
pub use dataset::{DataRecord, create_layers, parse_dataset};
pub use events::*;
pub use filter::MapFilter;
pub use format::Unit;
pub use layer::{Datum, Layer, LayerData, LayerStyle, Style};
pub use legend::MapLegend;
pub use map::{Map, MapConfig, RenderOptions};
pub use scale::{Bounds, Direction};
pub use scene::{AttrValue, Clock, Element, NodeId, SceneSink};
pub use selection::{SelectionModel, parse_selection};
pub use topology::{LocationId, Topology};
pub use viewport::{ZoomCommand, ZoomTarget};

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Numeric identifier of a location (country, subnational unit, ...).
pub type LocationId = i64;

/// A decoded arc vertex. `z` is the simplification weight; vertices from
/// unsimplified topologies carry `f64::INFINITY` so they are always kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Geometry as stored in the topology: references into the shared arc table.
/// A negative arc index `i` means arc `!i` traversed in reverse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
}

impl Shape {
    /// Every arc reference of the shape, grouped by ring/line.
    pub fn arc_lists(&self) -> Vec<&[i64]> {
        match self {
            Shape::Polygon { arcs } | Shape::MultiLineString { arcs } => {
                arcs.iter().map(Vec::as_slice).collect()
            }
            Shape::MultiPolygon { arcs } => arcs
                .iter()
                .flat_map(|polygon| polygon.iter().map(Vec::as_slice))
                .collect(),
            Shape::LineString { arcs } => vec![arcs.as_slice()],
            Shape::Point { .. } | Shape::MultiPoint { .. } => Vec::new(),
        }
    }
}

/// Normalized per-geometry properties, assigned during preprocessing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureProperties {
    /// Synthetic identity, unique within the geometry's group.
    pub key: String,
    pub location_id: Option<LocationId>,
    /// Competing claimants; non-empty only for disputed territories.
    pub disputes: Vec<LocationId>,
    /// Extra CSS class carried onto the rendered element.
    pub class: Option<String>,
    /// Source properties that were not consumed by preprocessing.
    pub extra: Map<String, Value>,
}

impl FeatureProperties {
    pub fn is_disputed(&self) -> bool {
        !self.disputes.is_empty()
    }

    /// Resolve the location id stored under `field`. `location_id` is the
    /// normalized field; anything else is looked up in the raw properties.
    pub fn id_for(&self, field: &str) -> Option<LocationId> {
        if field == "location_id" {
            return self.location_id;
        }
        self.extra.get(field).and_then(parse_location_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopoGeometry {
    pub shape: Shape,
    pub properties: Rc<FeatureProperties>,
}

/// A named object group of the topology (`admin0`, `admin1_disputes`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryGroup {
    pub name: String,
    pub geometries: Vec<TopoGeometry>,
}

/// Immutable, preprocessed topology.
#[derive(Debug, Clone)]
pub struct Topology {
    arcs: Vec<Vec<Position>>,
    objects: BTreeMap<String, Rc<GeometryGroup>>,
    version: u32,
}

#[derive(Deserialize)]
struct RawTopology {
    #[serde(default)]
    transform: Option<RawTransform>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    objects: BTreeMap<String, RawObject>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawTransform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Deserialize)]
struct RawObject {
    #[serde(default)]
    geometries: Vec<RawGeometry>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(flatten)]
    shape: Shape,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl Topology {
    /// Parse and preprocess a TopoJSON document.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let raw: RawTopology =
            serde_json::from_str(text).map_err(|e| format!("parse error: {e}"))?;
        let version = crc32fast::hash(text.as_bytes());
        Ok(Self::from_raw(raw, version))
    }

    fn from_raw(raw: RawTopology, version: u32) -> Self {
        let arcs = raw
            .arcs
            .iter()
            .map(|arc| decode_arc(arc, raw.transform))
            .collect();

        let mut objects = BTreeMap::new();
        for (name, object) in raw.objects {
            let disputed_group = name.contains("disputes");
            let geometries: Vec<TopoGeometry> = object
                .geometries
                .into_iter()
                .enumerate()
                .filter_map(|(index, geometry)| {
                    let properties =
                        normalize_properties(&name, disputed_group, index, geometry.properties)?;
                    Some(TopoGeometry {
                        shape: decode_points(geometry.shape, raw.transform),
                        properties: Rc::new(properties),
                    })
                })
                .collect();

            if geometries.is_empty() {
                tracing::debug!(group = %name, "dropping empty geometry group");
                continue;
            }
            objects.insert(
                name.clone(),
                Rc::new(GeometryGroup { name, geometries }),
            );
        }

        Self {
            arcs,
            objects,
            version,
        }
    }

    /// Content fingerprint of the source document.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn object(&self, name: &str) -> Option<&Rc<GeometryGroup>> {
        self.objects.get(name)
    }

    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Vertices of arc `index`, reversed for negative indices.
    pub fn arc_positions(&self, index: i64) -> Vec<Position> {
        let (arc, reversed) = if index < 0 {
            (!index, true)
        } else {
            (index, false)
        };
        let Some(positions) = usize::try_from(arc).ok().and_then(|i| self.arcs.get(i)) else {
            return Vec::new();
        };
        if reversed {
            positions.iter().rev().copied().collect()
        } else {
            positions.clone()
        }
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<RawTransform>) -> Vec<Position> {
    let (mut x, mut y) = (0.0, 0.0);
    arc.iter()
        .map(|point| {
            let px = point.first().copied().unwrap_or(0.0);
            let py = point.get(1).copied().unwrap_or(0.0);
            let z = point.get(2).copied().unwrap_or(f64::INFINITY);
            match transform {
                Some(t) => {
                    // Quantized arcs are delta-encoded.
                    x += px;
                    y += py;
                    Position {
                        x: x * t.scale[0] + t.translate[0],
                        y: y * t.scale[1] + t.translate[1],
                        z,
                    }
                }
                None => Position { x: px, y: py, z },
            }
        })
        .collect()
}

fn decode_points(shape: Shape, transform: Option<RawTransform>) -> Shape {
    let Some(t) = transform else {
        return shape;
    };
    let decode = |coordinates: Vec<f64>| -> Vec<f64> {
        coordinates
            .iter()
            .enumerate()
            .map(|(axis, value)| match axis {
                0 | 1 => value * t.scale[axis] + t.translate[axis],
                _ => *value,
            })
            .collect()
    };
    match shape {
        Shape::Point { coordinates } => Shape::Point {
            coordinates: decode(coordinates),
        },
        Shape::MultiPoint { coordinates } => Shape::MultiPoint {
            coordinates: coordinates.into_iter().map(decode).collect(),
        },
        other => other,
    }
}

fn normalize_properties(
    group: &str,
    disputed_group: bool,
    index: usize,
    mut raw: Map<String, Value>,
) -> Option<FeatureProperties> {
    let admin_id = raw.remove("admin_id").as_ref().and_then(parse_location_id);
    let loc_id = raw.remove("loc_id").as_ref().and_then(parse_location_id);
    let location_id = admin_id.or(loc_id);
    let disputes_raw = raw.remove("disputes");
    let class = raw
        .remove("class")
        .and_then(|v| v.as_str().map(str::to_string));
    let key = format!("key-{}", index + 1);

    if disputed_group {
        let disputes = disputes_raw
            .as_ref()
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(parse_location_id).collect())
            .unwrap_or_default();
        return Some(FeatureProperties {
            key,
            location_id,
            disputes,
            class,
            extra: raw,
        });
    }

    if group != "admin0" && location_id.is_none() {
        return None;
    }

    Some(FeatureProperties {
        key,
        location_id,
        disputes: Vec::new(),
        class,
        extra: raw,
    })
}

/// Accept ids given as JSON numbers or numeric strings.
pub fn parse_location_id(value: &Value) -> Option<LocationId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as LocationId)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<LocationId>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as LocationId))
        }
        _ => None,
    }
}

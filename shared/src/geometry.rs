//! Drawable features and border meshes derived from a [`Topology`].

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::layer::{Layer, LayerData, LayerStyle, RenderableLayer, Style};
use crate::selection::SelectionModel;
use crate::topology::{FeatureProperties, LocationId, Position, Shape, TopoGeometry, Topology};

/// Key of the synthesized mesh layer.
pub const BORDERS_LAYER: &str = "borders";

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Polygons, each a list of rings.
    Polygons(Vec<Vec<Vec<Position>>>),
    Lines(Vec<Vec<Position>>),
    Points(Vec<Position>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub properties: Rc<FeatureProperties>,
    pub geometry: Rc<Geometry>,
}

/// Tag of a mesh segment. Each arc gets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BorderKind {
    Border,
    Disputed,
    Selected,
}

impl BorderKind {
    pub const ALL: [BorderKind; 3] = [BorderKind::Border, BorderKind::Disputed, BorderKind::Selected];

    pub fn key(self) -> &'static str {
        match self {
            BorderKind::Border => "borders",
            BorderKind::Disputed => "disputed-borders",
            BorderKind::Selected => "selected",
        }
    }
}

/// Classify the segment between geometries `a` and `b`. `shared` is false
/// for exterior arcs, where both sides are the same geometry. Location ids
/// are read from the `key_field` property.
pub fn classify_border(
    a: &FeatureProperties,
    b: &FeatureProperties,
    shared: bool,
    selection: &SelectionModel,
    key_field: &str,
) -> BorderKind {
    let a_selected = selection.is_feature_selected(a, key_field);
    let b_selected = selection.is_feature_selected(b, key_field);
    let selected = if shared {
        a_selected != b_selected
    } else {
        a_selected
    };
    if selected {
        return BorderKind::Selected;
    }
    if shared && (contests(a, b, key_field) || contests(b, a, key_field)) {
        return BorderKind::Disputed;
    }
    BorderKind::Border
}

/// `owner` is an undisputed location claimed by the disputed `claim`.
fn contests(owner: &FeatureProperties, claim: &FeatureProperties, key_field: &str) -> bool {
    match owner.id_for(key_field) {
        Some(id) if !owner.is_disputed() => claim.is_disputed() && claim.disputes.contains(&id),
        _ => false,
    }
}

/// Convert one topology geometry into a drawable feature.
pub fn feature(topology: &Topology, geometry: &TopoGeometry) -> Feature {
    let stitched = match &geometry.shape {
        Shape::Polygon { arcs } => Geometry::Polygons(vec![rings(topology, arcs)]),
        Shape::MultiPolygon { arcs } => {
            Geometry::Polygons(arcs.iter().map(|polygon| rings(topology, polygon)).collect())
        }
        Shape::LineString { arcs } => Geometry::Lines(vec![stitch(topology, arcs)]),
        Shape::MultiLineString { arcs } => Geometry::Lines(rings(topology, arcs)),
        Shape::Point { coordinates } => Geometry::Points(vec![point(coordinates)]),
        Shape::MultiPoint { coordinates } => {
            Geometry::Points(coordinates.iter().map(|c| point(c)).collect())
        }
    };
    Feature {
        properties: geometry.properties.clone(),
        geometry: Rc::new(stitched),
    }
}

fn rings(topology: &Topology, lists: &[Vec<i64>]) -> Vec<Vec<Position>> {
    lists.iter().map(|arcs| stitch(topology, arcs)).collect()
}

/// Join consecutive arcs, dropping the joint point they share.
fn stitch(topology: &Topology, arcs: &[i64]) -> Vec<Position> {
    let mut points: Vec<Position> = Vec::new();
    for &arc in arcs {
        let positions = topology.arc_positions(arc);
        let skip = usize::from(!points.is_empty());
        points.extend(positions.into_iter().skip(skip));
    }
    points
}

fn point(coordinates: &[f64]) -> Position {
    Position {
        x: coordinates.first().copied().unwrap_or(0.0),
        y: coordinates.get(1).copied().unwrap_or(0.0),
        z: f64::INFINITY,
    }
}

/// Build the three tagged border features (`borders`, `disputed-borders`,
/// `selected`) over every geometry of `groups`.
pub fn mesh(
    topology: &Topology,
    groups: &[&str],
    selection: &SelectionModel,
    key_field: &str,
) -> Vec<Feature> {
    // arc index -> geometries referencing it, in document order
    let mut sides: BTreeMap<usize, Vec<(usize, &TopoGeometry)>> = BTreeMap::new();
    let mut ordinal = 0;
    for name in groups {
        let Some(group) = topology.object(name) else {
            continue;
        };
        for geometry in &group.geometries {
            for list in geometry.shape.arc_lists() {
                for &arc in list {
                    let index = if arc < 0 { !arc } else { arc };
                    let Ok(index) = usize::try_from(index) else {
                        continue;
                    };
                    sides.entry(index).or_default().push((ordinal, geometry));
                }
            }
            ordinal += 1;
        }
    }

    let mut lines: BTreeMap<BorderKind, Vec<Vec<Position>>> = BTreeMap::new();
    for (arc, refs) in &sides {
        let (Some(first), Some(last)) = (refs.first(), refs.last()) else {
            continue;
        };
        let shared = first.0 != last.0;
        let kind = classify_border(
            &first.1.properties,
            &last.1.properties,
            shared,
            selection,
            key_field,
        );
        lines
            .entry(kind)
            .or_default()
            .push(topology.arc_positions(*arc as i64));
    }

    BorderKind::ALL
        .iter()
        .map(|kind| Feature {
            properties: Rc::new(FeatureProperties {
                key: kind.key().to_string(),
                class: Some(kind.key().to_string()),
                ..Default::default()
            }),
            geometry: Rc::new(Geometry::Lines(lines.remove(kind).unwrap_or_default())),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MeshKey {
    groups: Vec<String>,
    selection: Vec<LocationId>,
}

const MESH_CACHE_LIMIT: usize = 16;

/// Converts raw layers into renderable ones, caching features and meshes by
/// topology version. Replacing the topology drops every cached entry.
#[derive(Debug)]
pub struct GeometryDeriver {
    key_field: String,
    version: Option<u32>,
    features: HashMap<String, Rc<[Feature]>>,
    meshes: HashMap<MeshKey, Rc<[Feature]>>,
}

impl Default for GeometryDeriver {
    fn default() -> Self {
        Self::with_key("location_id")
    }
}

impl GeometryDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deriver whose border selection reads location ids from `key_field`.
    pub fn with_key(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            version: None,
            features: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    pub fn invalidate(&mut self) {
        self.version = None;
        self.features.clear();
        self.meshes.clear();
    }

    fn sync(&mut self, topology: &Topology) {
        if self.version != Some(topology.version()) {
            if self.version.is_some() {
                tracing::debug!(version = topology.version(), "topology replaced, clearing geometry cache");
            }
            self.invalidate();
            self.version = Some(topology.version());
        }
    }

    /// Features of one object group; `None` if the group does not exist.
    pub fn features(&mut self, topology: &Topology, group: &str) -> Option<Rc<[Feature]>> {
        self.sync(topology);
        if let Some(cached) = self.features.get(group) {
            tracing::trace!(group, "feature cache hit");
            return Some(cached.clone());
        }
        let object = topology.object(group)?;
        let features: Rc<[Feature]> = object
            .geometries
            .iter()
            .map(|g| feature(topology, g))
            .collect();
        self.features.insert(group.to_string(), features.clone());
        Some(features)
    }

    pub fn mesh(
        &mut self,
        topology: &Topology,
        groups: &[&str],
        selection: &SelectionModel,
    ) -> Rc<[Feature]> {
        self.sync(topology);
        let mut ids = selection.ids().to_vec();
        ids.sort_unstable();
        let key = MeshKey {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            selection: ids,
        };
        if let Some(cached) = self.meshes.get(&key) {
            tracing::trace!(groups = ?key.groups, "mesh cache hit");
            return cached.clone();
        }
        if self.meshes.len() >= MESH_CACHE_LIMIT {
            self.meshes.clear();
        }
        let mesh: Rc<[Feature]> = mesh(topology, groups, selection, &self.key_field).into();
        self.meshes.insert(key, mesh.clone());
        mesh
    }

    /// One renderable layer per raw layer whose group exists, followed by
    /// the synthesized `borders` mesh layer.
    pub fn derive_layers(
        &mut self,
        topology: &Topology,
        layers: &[Layer],
        selection: &SelectionModel,
    ) -> Vec<Rc<RenderableLayer>> {
        let mut derived = Vec::with_capacity(layers.len() + 1);
        let mut groups = Vec::with_capacity(layers.len());
        for layer in layers {
            match self.features(topology, &layer.object) {
                Some(features) => {
                    if !groups.contains(&layer.object.as_str()) {
                        groups.push(layer.object.as_str());
                    }
                    derived.push(Rc::new(RenderableLayer::from_layer(layer, features)));
                }
                None => {
                    tracing::debug!(layer = %layer.key, group = %layer.object, "object group missing, layer omitted");
                }
            }
        }

        derived.push(Rc::new(RenderableLayer {
            key: BORDERS_LAYER.to_string(),
            features: self.mesh(topology, &groups, selection),
            data: Rc::new(LayerData::new()),
            extent: None,
            style: LayerStyle {
                fill: Some(Style::Fixed(None)),
                stroke: None,
            },
            dots: false,
        }));
        derived
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::topology::tests::THREE_SQUARES;

    fn topology() -> Topology {
        Topology::from_json(THREE_SQUARES).expect("fixture parses")
    }

    fn mesh_lines(topology: &Topology, selected: &[LocationId]) -> BTreeMap<&'static str, usize> {
        mesh(
            topology,
            &["admin0"],
            &SelectionModel::new(selected.iter().copied()),
            "location_id",
        )
            .iter()
            .map(|f| {
                let count = match f.geometry.as_ref() {
                    Geometry::Lines(lines) => lines.len(),
                    _ => 0,
                };
                let key = BorderKind::ALL
                    .iter()
                    .find(|k| k.key() == f.properties.key)
                    .map(|k| k.key())
                    .unwrap_or("?");
                (key, count)
            })
            .collect()
    }

    fn contains_arc(features: &[Feature], kind: BorderKind, from: (f64, f64), to: (f64, f64)) -> bool {
        features
            .iter()
            .filter(|f| f.properties.key == kind.key())
            .any(|f| match f.geometry.as_ref() {
                Geometry::Lines(lines) => lines.iter().any(|line| {
                    line.first().map(|p| (p.x, p.y)) == Some(from)
                        && line.last().map(|p| (p.x, p.y)) == Some(to)
                }),
                _ => false,
            })
    }

    #[test]
    fn polygons_are_stitched_into_closed_rings() {
        let topology = topology();
        let group = topology.object("admin0").expect("admin0");
        let square = feature(&topology, &group.geometries[0]);
        let Geometry::Polygons(polygons) = square.geometry.as_ref() else {
            panic!("expected polygons");
        };
        let ring: Vec<(f64, f64)> = polygons[0][0].iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            ring,
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn every_arc_gets_exactly_one_tag() {
        let topology = topology();
        let counts = mesh_lines(&topology, &[]);
        assert_eq!(counts.values().sum::<usize>(), topology.arc_count());
        assert_eq!(counts["borders"], 10);
        assert_eq!(counts["selected"], 0);
    }

    #[test]
    fn selection_border_follows_xor_rule() {
        let topology = topology();
        let shared = ((1.0, 0.0), (1.0, 1.0));

        let one = mesh(&topology, &["admin0"], &SelectionModel::new([1]), "location_id");
        assert!(contains_arc(&one, BorderKind::Selected, shared.0, shared.1));

        let both = mesh(&topology, &["admin0"], &SelectionModel::new([1, 2]), "location_id");
        assert!(!contains_arc(&both, BorderKind::Selected, shared.0, shared.1));
        assert!(contains_arc(&both, BorderKind::Border, shared.0, shared.1));

        let none = mesh(&topology, &["admin0"], &SelectionModel::default(), "location_id");
        assert!(!contains_arc(&none, BorderKind::Selected, shared.0, shared.1));
    }

    #[test]
    fn selected_outline_includes_exterior_arcs() {
        let topology = topology();
        // Square 1: three exterior arcs plus the arc shared with square 2.
        assert_eq!(mesh_lines(&topology, &[1])["selected"], 4);
        // Squares 1 and 2 together: the shared arc drops out.
        assert_eq!(mesh_lines(&topology, &[1, 2])["selected"], 6);
    }

    #[test]
    fn contested_borders_are_tagged_disputed() {
        let owner = FeatureProperties {
            location_id: Some(1),
            ..Default::default()
        };
        let claim = FeatureProperties {
            disputes: vec![1, 2],
            ..Default::default()
        };
        let other = FeatureProperties {
            location_id: Some(3),
            ..Default::default()
        };
        let nobody = SelectionModel::default();
        assert_eq!(classify_border(&owner, &claim, true, &nobody, "location_id"), BorderKind::Disputed);
        assert_eq!(classify_border(&claim, &owner, true, &nobody, "location_id"), BorderKind::Disputed);
        assert_eq!(classify_border(&other, &claim, true, &nobody, "location_id"), BorderKind::Border);
        assert_eq!(classify_border(&claim, &claim, false, &nobody, "location_id"), BorderKind::Border);
        // Selection wins over dispute.
        assert_eq!(
            classify_border(&owner, &claim, true, &SelectionModel::new([2]), "location_id"),
            BorderKind::Selected
        );
        assert_eq!(
            classify_border(&other, &claim, true, &SelectionModel::new([3]), "location_id"),
            BorderKind::Selected
        );
    }

    #[test]
    fn border_selection_reads_the_configured_key_field() {
        let district = |id: &str| FeatureProperties {
            location_id: Some(100),
            extra: [("district".to_string(), serde_json::Value::from(id))].into_iter().collect(),
            ..Default::default()
        };
        let (a, b) = (district("1"), district("2"));
        let selection = SelectionModel::new([1]);
        assert_eq!(classify_border(&a, &b, true, &selection, "district"), BorderKind::Selected);
        assert_eq!(classify_border(&a, &b, true, &selection, "location_id"), BorderKind::Border);

        let owner = district("4");
        let claim = FeatureProperties {
            disputes: vec![4],
            ..Default::default()
        };
        let nobody = SelectionModel::default();
        assert_eq!(classify_border(&owner, &claim, true, &nobody, "district"), BorderKind::Disputed);
    }

    #[test]
    fn derive_layers_omits_missing_groups_and_appends_borders() {
        let topology = topology();
        let mut deriver = GeometryDeriver::new();
        let layers = vec![Layer::new("admin0", "admin0"), Layer::new("admin1", "admin1")];
        let derived = deriver.derive_layers(&topology, &layers, &SelectionModel::default());
        let keys: Vec<&str> = derived.iter().map(|l| l.key.as_str()).collect();
        assert_eq!(keys, vec!["admin0", BORDERS_LAYER]);
        assert_eq!(derived[0].features.len(), 3);
        assert_eq!(derived[1].features.len(), 3);
    }

    #[test]
    fn features_are_cached_per_topology_version() {
        let topology = topology();
        let mut deriver = GeometryDeriver::new();
        let a = deriver.features(&topology, "admin0").expect("admin0");
        let b = deriver.features(&topology, "admin0").expect("admin0");
        assert!(Rc::ptr_eq(&a, &b));

        let replaced = Topology::from_json(&THREE_SQUARES.replace("\"2\"", "\"8\""))
            .expect("fixture parses");
        let c = deriver.features(&replaced, "admin0").expect("admin0");
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(c[1].properties.location_id, Some(8));
    }

    #[test]
    fn mesh_cache_is_keyed_by_selection() {
        let topology = topology();
        let mut deriver = GeometryDeriver::new();
        let a = deriver.mesh(&topology, &["admin0"], &SelectionModel::new([1, 2]));
        let b = deriver.mesh(&topology, &["admin0"], &SelectionModel::new([2, 1]));
        let c = deriver.mesh(&topology, &["admin0"], &SelectionModel::new([2]));
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));

        deriver.invalidate();
        let d = deriver.mesh(&topology, &["admin0"], &SelectionModel::new([1, 2]));
        assert!(!Rc::ptr_eq(&a, &d));
    }
}

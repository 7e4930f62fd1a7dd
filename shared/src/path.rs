//! SVG path data from feature geometry under a scale/translate transform.

use std::fmt::Write as _;

use crate::geometry::{Feature, Geometry};
use crate::scene::fmt_number;
use crate::topology::Position;

/// Radius of the circle drawn for point geometry.
const POINT_RADIUS: f64 = 4.5;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    pub fn extend(&mut self, x: f64, y: f64) {
        self.min[0] = self.min[0].min(x);
        self.min[1] = self.min[1].min(y);
        self.max[0] = self.max[0].max(x);
        self.max[1] = self.max[1].max(y);
    }

    pub fn union(self, other: Aabb) -> Aabb {
        Aabb {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }

    fn of_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for (x, y) in points {
            match bounds.as_mut() {
                Some(b) => b.extend(x, y),
                None => bounds = Some(Aabb::new([x, y], [x, y])),
            }
        }
        bounds
    }
}

fn positions(geometry: &Geometry) -> Box<dyn Iterator<Item = &Position> + '_> {
    match geometry {
        Geometry::Polygons(polygons) => Box::new(polygons.iter().flatten().flatten()),
        Geometry::Lines(lines) => Box::new(lines.iter().flatten()),
        Geometry::Points(points) => Box::new(points.iter()),
    }
}

/// Bounds of the untransformed geometry of `features`, every vertex counted.
pub fn feature_bounds<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<Aabb> {
    Aabb::of_points(
        features
            .into_iter()
            .flat_map(|f| positions(&f.geometry).map(|p| (p.x, p.y))),
    )
}

/// Projects geometry with `p * scale + translate`, dropping vertices whose
/// simplification weight is below `area` and rings outside `clip`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProjector {
    pub scale: f64,
    pub translate: [f64; 2],
    pub area: f64,
    pub clip: Option<Aabb>,
}

impl Default for PathProjector {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: [0.0, 0.0],
            area: 1.0,
            clip: None,
        }
    }
}

impl PathProjector {
    /// Projector for a zoom transform; the simplification threshold shrinks
    /// with the square of the scale.
    pub fn new(scale: f64, translate: [f64; 2], clip: Option<Aabb>) -> Self {
        let area = if scale > 0.0 { 1.0 / scale / scale } else { 1.0 };
        Self {
            scale,
            translate,
            area,
            clip,
        }
    }

    /// Clip rectangle for a viewport, padded so strokes at the edge survive.
    pub fn clip_extent(width: f64, height: f64) -> Aabb {
        Aabb::new([-5.0, -5.0], [width + 10.0, height + 10.0])
    }

    pub fn project(&self, p: &Position) -> (f64, f64) {
        (
            p.x * self.scale + self.translate[0],
            p.y * self.scale + self.translate[1],
        )
    }

    fn visible(&self, points: &[(f64, f64)]) -> bool {
        match (self.clip, Aabb::of_points(points.iter().copied())) {
            (Some(clip), Some(bounds)) => clip.intersects(&bounds),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    fn kept(&self, line: &[Position]) -> Vec<(f64, f64)> {
        line.iter()
            .filter(|p| p.z >= self.area)
            .map(|p| self.project(p))
            .collect()
    }

    /// Path data for `geometry`; empty when nothing is visible.
    pub fn path(&self, geometry: &Geometry) -> String {
        let mut d = String::new();
        match geometry {
            Geometry::Polygons(polygons) => {
                for ring in polygons.iter().flatten() {
                    let points = self.kept(ring);
                    if points.len() < 3 || !self.visible(&points) {
                        continue;
                    }
                    write_line(&mut d, &points);
                    d.push('Z');
                }
            }
            Geometry::Lines(lines) => {
                for line in lines {
                    let points = self.kept(line);
                    if points.len() < 2 || !self.visible(&points) {
                        continue;
                    }
                    write_line(&mut d, &points);
                }
            }
            Geometry::Points(points) => {
                for p in points {
                    let (x, y) = self.project(p);
                    if !self.visible(&[(x, y)]) {
                        continue;
                    }
                    let r = fmt_number(POINT_RADIUS);
                    let _ = write!(
                        d,
                        "M{},{}m0,{r}a{r},{r} 0 1,1 0,-{}a{r},{r} 0 1,1 0,{}z",
                        fmt_number(x),
                        fmt_number(y),
                        fmt_number(POINT_RADIUS * 2.0),
                        fmt_number(POINT_RADIUS * 2.0),
                    );
                }
            }
        }
        d
    }
}

fn write_line(d: &mut String, points: &[(f64, f64)]) {
    for (i, (x, y)) in points.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{command}{},{}", fmt_number(*x), fmt_number(*y));
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::topology::FeatureProperties;

    fn pos(x: f64, y: f64, z: f64) -> Position {
        Position { x, y, z }
    }

    fn square() -> Geometry {
        Geometry::Polygons(vec![vec![vec![
            pos(0.0, 0.0, f64::INFINITY),
            pos(1.0, 0.0, f64::INFINITY),
            pos(1.0, 1.0, f64::INFINITY),
            pos(0.0, 1.0, f64::INFINITY),
            pos(0.0, 0.0, f64::INFINITY),
        ]]])
    }

    #[test]
    fn projects_rings_into_closed_paths() {
        let projector = PathProjector::new(10.0, [5.0, 0.0], None);
        assert_eq!(projector.path(&square()), "M5,0L15,0L15,10L5,10L5,0Z");
    }

    #[test]
    fn low_weight_vertices_are_dropped_until_zoomed_in() {
        let line = Geometry::Lines(vec![vec![
            pos(0.0, 0.0, f64::INFINITY),
            pos(1.0, 1.0, 0.01),
            pos(2.0, 0.0, f64::INFINITY),
        ]]);
        assert_eq!(PathProjector::new(1.0, [0.0, 0.0], None).path(&line), "M0,0L2,0");
        assert_eq!(
            PathProjector::new(20.0, [0.0, 0.0], None).path(&line),
            "M0,0L20,20L40,0"
        );
    }

    #[test]
    fn rings_outside_the_clip_extent_are_culled() {
        let clip = Some(PathProjector::clip_extent(100.0, 100.0));
        let inside = PathProjector::new(10.0, [0.0, 0.0], clip);
        let outside = PathProjector::new(10.0, [500.0, 500.0], clip);
        assert!(!inside.path(&square()).is_empty());
        assert!(outside.path(&square()).is_empty());
    }

    #[test]
    fn points_render_as_circles() {
        let d = PathProjector::default().path(&Geometry::Points(vec![pos(1.0, 2.0, 0.0)]));
        assert_eq!(d, "M1,2m0,4.5a4.5,4.5 0 1,1 0,-9a4.5,4.5 0 1,1 0,9z");
    }

    #[test]
    fn bounds_cover_every_vertex() {
        let features = [Feature {
            properties: Rc::new(FeatureProperties::default()),
            geometry: Rc::new(square()),
        }];
        let bounds = feature_bounds(&features).expect("non-empty");
        assert_eq!(bounds, Aabb::new([0.0, 0.0], [1.0, 1.0]));
        assert_eq!(bounds.center(), [0.5, 0.5]);
        assert!(feature_bounds(&[]).is_none());
    }
}

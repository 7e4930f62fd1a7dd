//! Extent, domain and color ramp math.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::colors::{DEFAULT_RAMP, Rgb};

/// `[min, max]` where either bound may be unset (use the computed value).
pub type Bounds = [Option<f64>; 2];

/// Order in which the ramp is laid over the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+")]
    Ascending,
    #[default]
    #[serde(rename = "-")]
    Descending,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "+",
            Direction::Descending => "-",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Direction::Ascending),
            "-" => Ok(Direction::Descending),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Color ramp plus the domain/extent overrides that shape it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    colors: Vec<Rgb>,
    direction: Direction,
    domain: Bounds,
    extent: Bounds,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new(DEFAULT_RAMP.to_vec(), Direction::default())
    }
}

impl ColorScale {
    pub fn new(colors: Vec<Rgb>, direction: Direction) -> Self {
        let colors = if colors.is_empty() {
            DEFAULT_RAMP.to_vec()
        } else {
            colors
        };
        Self {
            colors,
            direction,
            domain: [None, None],
            extent: [None, None],
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn domain_override(&self) -> Bounds {
        self.domain
    }

    pub fn set_domain(&mut self, domain: Bounds) {
        self.domain = domain;
    }

    pub fn extent_override(&self) -> Bounds {
        self.extent
    }

    pub fn set_extent(&mut self, extent: Bounds) {
        self.extent = extent;
    }

    /// The ramp in the configured direction. `+` is the ramp as given.
    pub fn ramp(&self) -> Vec<Rgb> {
        match self.direction {
            Direction::Ascending => self.colors.clone(),
            Direction::Descending => self.colors.iter().rev().copied().collect(),
        }
    }

    /// Union of the per-layer extents, with overrides applied per bound.
    /// Non-finite bounds are skipped; no data at all yields `[0, 0]`.
    pub fn extent(&self, layer_extents: impl IntoIterator<Item = [f64; 2]>) -> [f64; 2] {
        let mut computed: Option<[f64; 2]> = None;
        for [lo, hi] in layer_extents {
            for value in [lo, hi].into_iter().filter(|v| v.is_finite()) {
                computed = Some(match computed {
                    Some([a, b]) => [a.min(value), b.max(value)],
                    None => [value, value],
                });
            }
        }
        let [lo, hi] = computed.unwrap_or([0.0, 0.0]);
        let lo = self.extent[0].unwrap_or(lo);
        let hi = self.extent[1].unwrap_or(hi);
        if lo > hi { [hi, lo] } else { [lo, hi] }
    }

    /// One break point per ramp color spanning the active domain. A
    /// degenerate or non-finite span falls back to `[0, 1]`.
    pub fn domain(&self, extent: [f64; 2]) -> Vec<f64> {
        let lo = self.domain[0].unwrap_or(extent[0]);
        let hi = self.domain[1].unwrap_or(extent[1]);
        let (lo, hi) = if !lo.is_finite() || !hi.is_finite() || lo == hi {
            (0.0, 1.0)
        } else {
            (lo, hi)
        };
        range(lo, hi, self.colors.len())
    }

    pub fn colorizer(&self, domain: &[f64]) -> Colorizer {
        Colorizer::new(domain, &self.ramp())
    }
}

/// `steps` evenly spaced values from `start` to `stop` inclusive.
pub fn range(start: f64, stop: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Piecewise-linear value → color mapping, clamped at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Colorizer {
    stops: Vec<(f64, Rgb)>,
}

impl Colorizer {
    pub fn new(domain: &[f64], colors: &[Rgb]) -> Self {
        let mut stops: Vec<(f64, Rgb)> = domain
            .iter()
            .copied()
            .zip(colors.iter().copied())
            .collect();
        if stops.first().map(|s| s.0) > stops.last().map(|s| s.0) {
            stops.reverse();
        }
        Self { stops }
    }

    /// `None` for non-finite values or an empty ramp.
    pub fn color(&self, value: f64) -> Option<Rgb> {
        if !value.is_finite() {
            return None;
        }
        let (first, last) = (self.stops.first()?, self.stops.last()?);
        if value <= first.0 {
            return Some(first.1);
        }
        if value >= last.0 {
            return Some(last.1);
        }
        let i = self
            .stops
            .windows(2)
            .position(|w| value >= w[0].0 && value <= w[1].0)?;
        let (d0, c0) = self.stops[i];
        let (d1, c1) = self.stops[i + 1];
        let span = d1 - d0;
        let t = if span > 0.0 { (value - d0) / span } else { 0.0 };
        Some(c0.lerp(c1, t))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn domain_spans_extent_with_one_stop_per_color() {
        let scale = ColorScale::default();
        assert_eq!(
            scale.domain([0.0, 100.0]),
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
        );
    }

    #[test]
    fn domain_is_non_decreasing_for_increasing_extents() {
        let scale = ColorScale::default();
        for (a, b) in [(-3.5, 2.0), (0.001, 0.002), (10.0, 1e9)] {
            let domain = scale.domain([a, b]);
            assert_eq!(domain.len(), DEFAULT_RAMP.len());
            assert!(domain.windows(2).all(|w| w[0] <= w[1]), "{domain:?}");
            assert_eq!(domain[0], a);
            assert_eq!(domain[domain.len() - 1], b);
        }
    }

    #[test]
    fn degenerate_extent_falls_back_to_unit_span() {
        let scale = ColorScale::default();
        let extent = scale.extent([[5.0, 5.0]]);
        assert_eq!(extent, [5.0, 5.0]);
        let domain = scale.domain(extent);
        assert_eq!(domain.first(), Some(&0.0));
        assert_eq!(domain.last(), Some(&1.0));
        assert_eq!(scale.domain([f64::NAN, 2.0]).last(), Some(&1.0));
    }

    #[test]
    fn extent_unions_layers_and_skips_missing_data() {
        let scale = ColorScale::default();
        assert_eq!(
            scale.extent([[1.0, 4.0], [f64::INFINITY, f64::NEG_INFINITY], [-2.0, 3.0]]),
            [-2.0, 4.0]
        );
        assert_eq!(scale.extent([]), [0.0, 0.0]);
    }

    #[test]
    fn extent_overrides_apply_per_bound() {
        let mut scale = ColorScale::default();
        scale.set_extent([None, Some(50.0)]);
        assert_eq!(scale.extent([[10.0, 20.0]]), [10.0, 50.0]);
        scale.set_extent([Some(30.0), None]);
        assert_eq!(scale.extent([[10.0, 20.0]]), [20.0, 30.0]);
    }

    #[test]
    fn domain_overrides_narrow_the_ramp() {
        let mut scale = ColorScale::default();
        scale.set_domain([Some(20.0), None]);
        let domain = scale.domain([0.0, 120.0]);
        assert_eq!(domain[0], 20.0);
        assert_eq!(domain[10], 120.0);
    }

    #[test]
    fn direction_reverses_the_ramp() {
        let mut scale = ColorScale::default();
        assert_eq!(scale.ramp()[0], DEFAULT_RAMP[10]);
        scale.set_direction("+".parse().expect("valid direction"));
        assert_eq!(scale.ramp()[0], DEFAULT_RAMP[0]);
        assert!("*".parse::<Direction>().is_err());
    }

    #[test]
    fn colorizer_clamps_and_interpolates() {
        let colorizer = Colorizer::new(&[0.0, 10.0], &[Rgb(0, 0, 0), Rgb(100, 200, 50)]);
        assert_eq!(colorizer.color(-5.0), Some(Rgb(0, 0, 0)));
        assert_eq!(colorizer.color(50.0), Some(Rgb(100, 200, 50)));
        assert_eq!(colorizer.color(5.0), Some(Rgb(50, 100, 25)));
        assert_eq!(colorizer.color(f64::NAN), None);
    }

    #[test]
    fn colorizer_handles_descending_domains() {
        let colorizer = Colorizer::new(&[10.0, 0.0], &[Rgb(0, 0, 0), Rgb(100, 100, 100)]);
        assert_eq!(colorizer.color(10.0), Some(Rgb(0, 0, 0)));
        assert_eq!(colorizer.color(0.0), Some(Rgb(100, 100, 100)));
        assert_eq!(colorizer.color(2.5), Some(Rgb(75, 75, 75)));
    }

    #[test]
    fn range_counts_inclusive_steps() {
        assert_eq!(range(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(range(1.0, 0.0, 2), vec![1.0, 0.0]);
        assert_eq!(range(4.0, 8.0, 1), vec![4.0]);
        assert!(range(0.0, 1.0, 0).is_empty());
    }
}

//! Pan/zoom state of the map chart.

use std::str::FromStr;

use crate::config::{ChartConfig, ZoomConfig};
use crate::events::ZoomOffset;
use crate::path::{Aabb, PathProjector};
use crate::scene::ease_cubic_in_out;
use crate::topology::LocationId;

/// World → screen transform: `p * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub translate: [f64; 2],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: [0.0, 0.0],
        }
    }
}

impl Transform {
    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.translate[0],
            wy * self.scale + self.translate[1],
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.translate[0]) / self.scale,
            (sy - self.translate[1]) / self.scale,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoomTarget {
    /// Whatever is currently selected.
    Selected,
    Locations(Vec<LocationId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoomCommand {
    In,
    Out,
    Reset,
    To(ZoomTarget),
}

impl FromStr for ZoomCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in" => Ok(ZoomCommand::In),
            "out" => Ok(ZoomCommand::Out),
            "reset" => Ok(ZoomCommand::Reset),
            "selected" => Ok(ZoomCommand::To(ZoomTarget::Selected)),
            other => Err(format!("unknown zoom direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tween {
    from: Transform,
    to: Transform,
    start: f64,
    duration: f64,
}

/// Full-map framing the zoom offset is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewbox {
    bounds: Option<Aabb>,
    /// Sum of the bounds' corners: twice the geometric center.
    center: [f64; 2],
    scale: f64,
    translate: [f64; 2],
}

impl Default for Viewbox {
    fn default() -> Self {
        Self {
            bounds: None,
            center: [0.0, 0.0],
            scale: 1.0,
            translate: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    zoom: ZoomConfig,
    width: f64,
    height: f64,
    proportion: f64,
    animation: f64,
    viewbox: Viewbox,
    offset: ZoomOffset,
    current: Transform,
    tween: Option<Tween>,
    focus: Option<LocationId>,
    changed: bool,
}

impl ViewportController {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            zoom: config.zoom.clone(),
            width: config.width,
            height: config.height,
            proportion: config.proportion,
            animation: config.base.animation,
            viewbox: Viewbox::default(),
            offset: ZoomOffset::default(),
            current: Transform::default(),
            tween: None,
            focus: None,
            changed: false,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn transform(&self) -> Transform {
        self.current
    }

    /// Where the transform is heading (the current one when idle).
    pub fn target(&self) -> Transform {
        self.tween.map(|t| t.to).unwrap_or(self.current)
    }

    pub fn offset(&self) -> ZoomOffset {
        self.offset
    }

    pub fn focus(&self) -> Option<LocationId> {
        self.focus
    }

    pub fn viewbox_scale(&self) -> f64 {
        self.viewbox.scale
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn projector(&self) -> PathProjector {
        PathProjector::new(
            self.current.scale,
            self.current.translate,
            Some(PathProjector::clip_extent(self.width, self.height)),
        )
    }

    /// Scale fitting `bounds` into the viewport at `proportion`.
    pub fn calc_scale(&self, bounds: &Aabb, proportion: f64) -> f64 {
        let fit = f64::max(
            bounds.width().abs() / self.width,
            bounds.height().abs() / self.height,
        );
        let scale = proportion / fit;
        if scale.is_nan() { 1.0 } else { scale }
    }

    /// Doubled center of a transform's view, in world units.
    pub fn calc_center(&self, transform: &Transform) -> [f64; 2] {
        [
            (self.width - transform.translate[0] * 2.0) / transform.scale,
            (self.height - transform.translate[1] * 2.0) / transform.scale,
        ]
    }

    pub fn calc_translate(&self, scale: f64, center: [f64; 2]) -> [f64; 2] {
        [
            (self.width - scale * center[0]) / 2.0,
            (self.height - scale * center[1]) / 2.0,
        ]
    }

    /// Allowed absolute scale range.
    pub fn scale_extent(&self) -> [f64; 2] {
        [
            self.zoom.extent[0] * self.viewbox.scale,
            self.zoom.extent[1] * self.viewbox.scale,
        ]
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        let [min, max] = self.scale_extent();
        scale.max(min).min(max)
    }

    fn framed(&self, scale: f64, center: [f64; 2]) -> Transform {
        let scale = self.clamp_scale(scale);
        Transform {
            scale,
            translate: self.calc_translate(scale, center),
        }
    }

    /// Frame the full map around `bounds` and reapply the current offset.
    pub fn set_bounds(&mut self, bounds: Option<Aabb>) {
        self.viewbox.bounds = bounds;
        self.viewbox.center = bounds
            .map(|b| [b.max[0] + b.min[0], b.max[1] + b.min[1]])
            .unwrap_or([0.0, 0.0]);
        self.resize(self.width, self.height);
    }

    /// Recompute the viewbox for new dimensions, keep the zoom offset relative
    /// to it, clamp, and apply without animation.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;

        self.viewbox.scale = match &self.viewbox.bounds {
            Some(bounds) => {
                let scale = self.calc_scale(bounds, self.proportion);
                if scale.is_finite() { scale } else { 1.0 }
            }
            None => 1.0,
        };
        self.viewbox.translate = self.calc_translate(self.viewbox.scale, self.viewbox.center);

        let translate = [
            self.viewbox.translate[0] + self.offset.translate[0],
            self.viewbox.translate[1] + self.offset.translate[1],
        ];
        let scale = self.viewbox.scale + self.offset.scale;
        let center = self.calc_center(&Transform { scale, translate });
        let target = self.framed(scale, center);

        self.tween = None;
        self.apply(target);
    }

    fn apply(&mut self, transform: Transform) {
        self.current = transform;
        self.offset = ZoomOffset {
            scale: transform.scale - self.viewbox.scale,
            translate: [
                transform.translate[0] - self.viewbox.translate[0],
                transform.translate[1] - self.viewbox.translate[1],
            ],
        };
        self.changed = true;
    }

    fn animate_to(&mut self, to: Transform, now: f64) {
        tracing::debug!(scale = to.scale, x = to.translate[0], y = to.translate[1], "zoom target");
        if self.animation > 0.0 {
            self.tween = Some(Tween {
                from: self.current,
                to,
                start: now,
                duration: self.animation,
            });
            self.changed = true;
        } else {
            self.tween = None;
            self.apply(to);
        }
    }

    pub fn zoom_in(&mut self, now: f64) {
        self.zoom_by(self.zoom.increment, now);
    }

    pub fn zoom_out(&mut self, now: f64) {
        self.zoom_by(1.0 / self.zoom.increment, now);
    }

    fn zoom_by(&mut self, factor: f64, now: f64) {
        self.focus = None;
        let base = self.target();
        let center = self.calc_center(&base);
        let target = self.framed(base.scale * factor, center);
        self.animate_to(target, now);
    }

    pub fn reset(&mut self, now: f64) {
        self.focus = None;
        let target = self.framed(self.viewbox.scale, self.viewbox.center);
        self.animate_to(target, now);
    }

    /// Fit `bounds` with extra padding. No bounds (nothing matched) is a no-op.
    pub fn zoom_to(&mut self, bounds: Option<Aabb>, now: f64) -> bool {
        let Some(bounds) = bounds else {
            return false;
        };
        self.focus = None;
        self.fit(&bounds, self.zoom.zoom_to_proportion, now);
        true
    }

    /// Click on a feature: zoom to it, or back out if it is already the focus.
    /// Every other zoom or pan releases the focus.
    pub fn toggle(&mut self, location: LocationId, bounds: Option<Aabb>, now: f64) {
        if self.focus == Some(location) {
            self.reset(now);
            return;
        }
        let Some(bounds) = bounds else {
            return;
        };
        self.focus = Some(location);
        self.fit(&bounds, self.zoom.feature_proportion, now);
    }

    fn fit(&mut self, bounds: &Aabb, proportion: f64, now: f64) {
        let scale = self.calc_scale(bounds, proportion);
        let center = [bounds.max[0] + bounds.min[0], bounds.max[1] + bounds.min[1]];
        let target = self.framed(scale, center);
        self.animate_to(target, now);
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.focus = None;
        let mut next = self.current;
        next.translate[0] += dx;
        next.translate[1] += dy;
        self.tween = None;
        self.apply(next);
    }

    /// Zoom toward a focus point (screen coordinates), e.g. on wheel input.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        self.focus = None;
        let factor = (-delta * self.zoom.wheel_sensitivity).exp();
        let scale = self.clamp_scale(self.current.scale * factor);
        let ratio = scale / self.current.scale;

        // Keep the point under the cursor fixed.
        let next = Transform {
            scale,
            translate: [
                screen_x - (screen_x - self.current.translate[0]) * ratio,
                screen_y - (screen_y - self.current.translate[1]) * ratio,
            ],
        };
        self.tween = None;
        self.apply(next);
    }

    /// Step any running transition. Returns the new offset if the transform
    /// changed since the previous call.
    pub fn advance(&mut self, now: f64) -> Option<ZoomOffset> {
        if let Some(tween) = self.tween {
            let elapsed = now - tween.start;
            if elapsed >= tween.duration {
                self.tween = None;
                self.apply(tween.to);
            } else {
                let t = ease_cubic_in_out((elapsed / tween.duration).clamp(0.0, 1.0));
                let from_center = self.calc_center(&tween.from);
                let to_center = self.calc_center(&tween.to);
                let scale = tween.from.scale * (tween.to.scale / tween.from.scale).powf(t);
                let center = [
                    from_center[0] + (to_center[0] - from_center[0]) * t,
                    from_center[1] + (to_center[1] - from_center[1]) * t,
                ];
                let translate = self.calc_translate(scale, center);
                self.apply(Transform { scale, translate });
            }
        }
        if std::mem::take(&mut self.changed) {
            Some(self.offset)
        } else {
            None
        }
    }
}

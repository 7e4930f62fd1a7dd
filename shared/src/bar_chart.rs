//! Bar chart over a plain list of values, one labelled bar per value.

use std::rc::Rc;

use crate::colors::Rgb;
use crate::config::BarChartConfig;
use crate::scene::{AttrValue, Clock, Element, NodeId, Scene, SceneSink, fmt_number};

/// `count` whole numbers in `[5, 25]`. `random` yields values in `[0, 1)`.
pub fn random_dataset(count: usize, mut random: impl FnMut() -> f64) -> Vec<f64> {
    (0..count)
        .map(|_| (random() * 21.0).floor() + 5.0)
        .collect()
}

fn bar_color(value: f64) -> Rgb {
    Rgb(0, 0, (value * 10.0).round().clamp(0.0, 255.0) as u8)
}

#[derive(Debug, Clone, Copy)]
struct Bar {
    rect: NodeId,
    label: NodeId,
}

pub struct BarChart {
    config: BarChartConfig,
    scene: Scene,
    bars: Vec<Bar>,
    /// Top of the y scale, fixed at render.
    y_max: f64,
}

impl BarChart {
    pub fn new(config: &BarChartConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            config: config.clone(),
            scene: Scene::new(clock),
            bars: Vec::new(),
            y_max: 0.0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Start and width of band `index` of `count`, rounded to whole pixels.
    fn band(&self, index: usize, count: usize) -> (f64, f64) {
        let step = (self.config.width / count.max(1) as f64).floor();
        let offset = ((self.config.width - step * count as f64) / 2.0).round();
        (offset + step * index as f64, step)
    }

    fn y(&self, value: f64) -> f64 {
        if self.y_max > 0.0 {
            self.config.height - value / self.y_max * self.config.height
        } else {
            self.config.height
        }
    }

    pub fn render(&mut self, values: &[f64]) {
        let root = self.scene.root();
        self.scene
            .set(root, "height", AttrValue::Number(self.config.height));
        self.scene
            .set(root, "width", AttrValue::Number(self.config.width));
        self.y_max = values.iter().copied().fold(0.0, f64::max);
        self.draw(values, None);
    }

    /// Retarget the bars to `values` by index.
    pub fn update(&mut self, values: &[f64]) {
        self.draw(values, Some(self.config.animation));
    }

    fn draw(&mut self, values: &[f64], duration: Option<f64>) {
        while self.bars.len() > values.len() {
            if let Some(bar) = self.bars.pop() {
                self.scene.exit(bar.rect, duration);
                self.scene.exit(bar.label, duration);
            }
        }

        let root = self.scene.root();
        for (i, value) in values.iter().copied().enumerate() {
            let (x, width) = self.band(i, values.len());
            let y = self.y(value);
            let bar = match self.bars.get(i) {
                Some(bar) => *bar,
                None => {
                    let rect = self.scene.append(root, Element::Rect);
                    let label = self.scene.append(root, Element::Text);
                    self.scene.set(label, "class", AttrValue::from("label"));
                    self.scene.set(rect, "y", AttrValue::Number(y));
                    self.scene
                        .set(rect, "height", AttrValue::Number(self.config.height - y));
                    self.scene.set(rect, "fill", AttrValue::Color(bar_color(value)));
                    self.scene.set(
                        label,
                        "y",
                        AttrValue::Number(y + self.config.label_offset),
                    );
                    let bar = Bar { rect, label };
                    self.bars.push(bar);
                    bar
                }
            };

            self.scene.set(bar.rect, "x", AttrValue::Number(x));
            self.scene.set(bar.rect, "width", AttrValue::Number(width));
            self.scene
                .animate(bar.rect, "y", AttrValue::Number(y), duration);
            self.scene.animate(
                bar.rect,
                "height",
                AttrValue::Number(self.config.height - y),
                duration,
            );
            self.scene
                .animate(bar.rect, "fill", AttrValue::Color(bar_color(value)), duration);

            self.scene.set_text(bar.label, &fmt_number(value));
            self.scene.animate(
                bar.label,
                "x",
                AttrValue::Number(x + width / 2.0),
                duration,
            );
            self.scene.animate(
                bar.label,
                "y",
                AttrValue::Number(y + self.config.label_offset),
                duration,
            );
        }
    }

    pub fn flush(&mut self, sink: &mut dyn SceneSink) -> bool {
        self.scene.flush(sink)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scene::ManualClock;
    use crate::scene::testing::MemorySink;

    fn chart() -> (Rc<ManualClock>, BarChart, MemorySink) {
        let clock = Rc::new(ManualClock::new(0.0));
        let chart = BarChart::new(&BarChartConfig::default(), clock.clone());
        (clock, chart, MemorySink::default())
    }

    #[test]
    fn bars_fill_bands_and_scale_to_the_maximum() {
        let (_, mut chart, mut sink) = chart();
        chart.render(&[5.0, 10.0, 15.0, 20.0]);
        chart.flush(&mut sink);

        let second = chart.bars[1];
        assert_eq!(sink.attr(second.rect, "x"), Some("150"));
        assert_eq!(sink.attr(second.rect, "width"), Some("150"));
        assert_eq!(sink.attr(second.rect, "y"), Some("150"));
        assert_eq!(sink.attr(second.rect, "height"), Some("150"));
        assert_eq!(sink.attr(second.rect, "fill"), Some("rgb(0, 0, 100)"));
        assert_eq!(sink.attr(second.label, "x"), Some("225"));
        assert_eq!(sink.attr(second.label, "y"), Some("164"));
        assert_eq!(
            sink.nodes.get(&second.label).and_then(|n| n.text.as_deref()),
            Some("10")
        );
        assert_eq!(sink.attr(chart.bars[3].rect, "y"), Some("0"));
    }

    #[test]
    fn updates_transition_by_index() {
        let (clock, mut chart, mut sink) = chart();
        chart.render(&[10.0, 20.0]);
        chart.flush(&mut sink);
        let rects: Vec<NodeId> = chart.bars.iter().map(|b| b.rect).collect();

        chart.update(&[20.0, 10.0]);
        clock.advance(250.0);
        assert!(chart.flush(&mut sink));
        let y: f64 = sink
            .attr(rects[0], "y")
            .and_then(|v| v.parse().ok())
            .expect("numeric y");
        assert!(y > 0.0 && y < 150.0, "{y}");

        clock.advance(1_000.0);
        assert!(!chart.flush(&mut sink));
        assert_eq!(sink.attr(rects[0], "y"), Some("0"));
        assert_eq!(sink.attr(rects[1], "y"), Some("150"));
        assert_eq!(chart.bars.iter().map(|b| b.rect).collect::<Vec<_>>(), rects);
    }

    #[test]
    fn surplus_bars_are_removed() {
        let (clock, mut chart, mut sink) = chart();
        chart.render(&[1.0, 2.0, 3.0]);
        chart.flush(&mut sink);
        chart.update(&[1.0]);
        clock.advance(1_000.0);
        chart.flush(&mut sink);
        assert_eq!(sink.children(chart.scene().root()).len(), 2);
    }

    #[test]
    fn random_values_stay_in_range() {
        let mut state = 0.0;
        let values = random_dataset(20, || {
            state = (state + 0.37) % 1.0;
            state
        });
        assert_eq!(values.len(), 20);
        assert!(values.iter().all(|v| (5.0..=25.0).contains(v) && v.fract() == 0.0));
        assert_eq!(random_dataset(1, || 0.999_999), vec![25.0]);
        assert_eq!(random_dataset(1, || 0.0), vec![5.0]);
    }
}

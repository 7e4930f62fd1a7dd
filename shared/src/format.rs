//! Axis ticks and value labels.

use serde::{Deserialize, Serialize};

/// How values of a measure are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Number,
    /// Fractions shown as percentages.
    Percent,
}

const SI_PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        -(10f64.powf(-power)) / factor
    }
}

/// Roughly `count` round values between `start` and `stop`, inclusive.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if !start.is_finite() || !stop.is_finite() || count == 0 {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let reverse = stop < start;
    let (start, stop) = if reverse { (stop, start) } else { (start, stop) };
    let increment = tick_increment(start, stop, count);
    if increment == 0.0 || !increment.is_finite() {
        return Vec::new();
    }

    let mut values: Vec<f64> = if increment > 0.0 {
        let (r0, r1) = ((start / increment).ceil(), (stop / increment).floor());
        (r0 as i64..=r1 as i64).map(|i| i as f64 * increment).collect()
    } else {
        let inverse = -increment;
        let (r0, r1) = ((start * inverse).ceil(), (stop * inverse).floor());
        (r0 as i64..=r1 as i64).map(|i| i as f64 / inverse).collect()
    };
    if reverse {
        values.reverse();
    }
    values
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TickStyle {
    Fixed(usize),
    Percent(usize),
    Si,
}

impl TickStyle {
    fn apply(self, value: f64) -> String {
        match self {
            TickStyle::Fixed(places) => format!("{value:.places$}"),
            TickStyle::Percent(places) => format!("{:.places$}%", value * 100.0),
            TickStyle::Si => si(value),
        }
    }
}

/// Label formatter for an axis over `domain`, precise enough to tell
/// neighbouring ticks apart. Large numbers use SI prefixes, `G` shown as `B`.
pub fn tick_format(domain: [f64; 2], unit: Unit) -> impl Fn(f64) -> String {
    let count = ticks(domain[0], domain[1], 10).len().saturating_sub(1);
    let max = domain[0].max(domain[1]);
    let increment = max / count as f64;

    let style = match unit {
        Unit::Percent => {
            let round_to = ((1.0 - (increment * 100.0).log10()) + 1.0).ceil() - 2.0;
            if round_to >= 1.0 {
                TickStyle::Percent(round_to.min(20.0) as usize)
            } else {
                TickStyle::Percent(0)
            }
        }
        Unit::Number => {
            let round_to = ((1.0 - increment.log10()) + 1.0).ceil() - 2.0;
            if round_to >= 1.0 {
                TickStyle::Fixed(round_to.min(20.0) as usize)
            } else {
                TickStyle::Si
            }
        }
    };
    move |value| style.apply(value).replace('G', "B")
}

/// Six significant digits with an SI prefix, trailing zeros trimmed.
fn si(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    let exponent = ((value.abs().log10() / 3.0).floor() as i32).clamp(-8, 8);
    let scaled = value / 1000f64.powi(exponent);
    let integer_digits = scaled.abs().log10().floor() as i32 + 1;
    let places = (6 - integer_digits).max(0) as usize;
    let text = format!("{scaled:.places$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    format!("{text}{}", SI_PREFIXES[(exponent + 8) as usize])
}

/// Round to `places` decimals, keeping more for small magnitudes so at
/// least two significant digits survive.
pub fn round(value: f64, places: i32) -> f64 {
    let magnitude = value.abs();
    let round_to = (1.0 - magnitude.log10()) + f64::from(places - 1);
    let round_to = if round_to >= f64::from(places) {
        round_to
    } else {
        f64::from(places)
    };
    if round_to >= 20.0 || round_to.is_nan() {
        return value;
    }
    let factor = 10f64.powi(round_to.trunc() as i32);
    let rounded = (magnitude * factor).round() / factor;
    if value < 0.0 { -rounded } else { rounded }
}

/// Thousands-separated rendering of the shortest decimal form.
fn group_thousands(value: f64) -> String {
    let text = value.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// A value to show on hover: a point estimate or a mean with bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoverValue {
    Value(f64),
    Interval {
        mean: Option<f64>,
        lower: Option<f64>,
        upper: Option<f64>,
    },
}

/// Hover label, e.g. `1,234.57`, `12.35% deaths` or `5 (4 — 6)`.
pub fn hover(value: HoverValue, unit: Unit, metric: Option<&str>) -> String {
    match value {
        HoverValue::Value(v) => {
            let v = if unit == Unit::Percent { v * 100.0 } else { v };
            let mut out = group_thousands(round(v, 2));
            if unit == Unit::Percent {
                out.push('%');
            }
            if let Some(metric) = metric {
                out.push(' ');
                out.push_str(metric);
            }
            out
        }
        HoverValue::Interval { mean, lower, upper } => {
            let mut out = mean
                .map(|m| hover(HoverValue::Value(m), unit, metric))
                .unwrap_or_default();
            if let (Some(l), Some(u)) = (lower, upper)
                && mean != Some(l)
                && mean != Some(u)
            {
                let lower = hover(HoverValue::Value(l), unit, None);
                let upper = hover(HoverValue::Value(u), unit, None);
                out.push_str(&format!(" ({lower} — {upper})"));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn ticks_pick_round_steps() {
        assert_eq!(
            ticks(0.0, 100.0, 10),
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
        );
        assert_eq!(ticks(0.5, 9.3, 5), vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!(ticks(0.0, 1.0, 5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(10.0, 0.0, 2), vec![10.0, 5.0, 0.0]);
        assert_eq!(ticks(3.0, 3.0, 10), vec![3.0]);
        assert!(ticks(f64::NAN, 1.0, 10).is_empty());
    }

    #[test]
    fn integer_scales_use_si_labels() {
        let format = tick_format([0.0, 100.0], Unit::Number);
        assert_eq!(format(50.0), "50");
        assert_eq!(format(1500.0), "1.5k");
        assert_eq!(format(2_500_000_000.0), "2.5B");
        assert_eq!(format(0.0), "0");
    }

    #[test]
    fn fractional_scales_use_fixed_decimals() {
        let format = tick_format([0.0, 1.0], Unit::Number);
        assert_eq!(format(0.5), "0.5");
        let format = tick_format([0.0, 0.05], Unit::Number);
        assert_eq!(format(0.025), "0.025");
    }

    #[test]
    fn percent_scales_multiply_by_hundred() {
        let format = tick_format([0.0, 0.5], Unit::Percent);
        assert_eq!(format(0.25), "25%");
        let format = tick_format([0.0, 0.01], Unit::Percent);
        assert_eq!(format(0.005), "0.5%");
    }

    #[test]
    fn round_keeps_two_significant_digits() {
        assert_eq!(round(1234.5678, 2), 1234.57);
        assert_eq!(round(-0.000123456, 2), -0.00012);
        assert_eq!(round(0.0, 2), 0.0);
    }

    #[test]
    fn hover_formats_values() {
        assert_eq!(hover(HoverValue::Value(1234.5678), Unit::Number, None), "1,234.57");
        assert_eq!(
            hover(HoverValue::Value(0.123456), Unit::Percent, Some("deaths")),
            "12.35% deaths"
        );
        assert_eq!(hover(HoverValue::Value(-1_000_000.0), Unit::Number, None), "-1,000,000");
    }

    #[test]
    fn hover_formats_intervals() {
        let interval = HoverValue::Interval {
            mean: Some(5.0),
            lower: Some(4.0),
            upper: Some(6.0),
        };
        assert_eq!(hover(interval, Unit::Number, None), "5 (4 — 6)");

        let collapsed = HoverValue::Interval {
            mean: Some(5.0),
            lower: Some(5.0),
            upper: Some(6.0),
        };
        assert_eq!(hover(collapsed, Unit::Number, None), "5");
    }
}

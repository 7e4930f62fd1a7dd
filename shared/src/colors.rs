use std::fmt;

use serde::{Deserialize, Serialize};

/// Default diverging ramp, dark red through pale yellow to dark blue.
pub const DEFAULT_RAMP: [Rgb; 11] = [
    Rgb(165, 0, 38),
    Rgb(215, 48, 39),
    Rgb(244, 109, 67),
    Rgb(253, 174, 97),
    Rgb(254, 224, 144),
    Rgb(255, 255, 191),
    Rgb(224, 243, 248),
    Rgb(171, 217, 233),
    Rgb(116, 173, 209),
    Rgb(69, 117, 180),
    Rgb(49, 54, 149),
];

/// An opaque sRGB color. Serializes as a CSS color string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `rgb(r, g, b)`, `rgba(r, g, b, a)` (alpha dropped), `#rrggbb` or `#rgb`.
    pub fn parse(css: &str) -> Option<Self> {
        let css = css.trim();
        if let Some(hex) = css.strip_prefix('#') {
            return parse_hex(hex);
        }

        let body = css
            .strip_prefix("rgba(")
            .or_else(|| css.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let mut channels = body.split(',').map(|part| part.trim().parse::<f64>());
        let r = channels.next()?.ok()?;
        let g = channels.next()?.ok()?;
        let b = channels.next()?.ok()?;
        Some(Self(channel(r), channel(g), channel(b)))
    }

    /// Component-wise linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb(
            lerp_u8(self.0, to.0, t),
            lerp_u8(self.1, to.1, t),
            lerp_u8(self.2, to.2, t),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    Some(Rgb(
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    ))
}

fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    channel(a as f64 + (b as f64 - a as f64) * t)
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_RAMP, Rgb};

    #[test]
    fn parses_css_rgb_and_hex() {
        assert_eq!(Rgb::parse("rgb(165,0,38)"), Some(Rgb(165, 0, 38)));
        assert_eq!(Rgb::parse(" rgba(1, 2, 3, 0.5) "), Some(Rgb(1, 2, 3)));
        assert_eq!(Rgb::parse("#ff8000"), Some(Rgb(255, 128, 0)));
        assert_eq!(Rgb::parse("#fff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::parse("teal"), None);
        assert_eq!(Rgb::parse("rgb(1, 2)"), None);
    }

    #[test]
    fn display_matches_css_syntax() {
        assert_eq!(DEFAULT_RAMP[0].to_string(), "rgb(165, 0, 38)");
        assert_eq!(Rgb::parse(&DEFAULT_RAMP[5].to_string()), Some(DEFAULT_RAMP[5]));
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let from = Rgb(0, 100, 200);
        let to = Rgb(100, 200, 0);
        assert_eq!(from.lerp(to, 0.0), from);
        assert_eq!(from.lerp(to, 1.0), to);
        assert_eq!(from.lerp(to, 0.5), Rgb(50, 150, 100));
        assert_eq!(from.lerp(to, 3.0), to);
    }

    #[test]
    fn deserializes_from_css_string() {
        let parsed: Vec<Rgb> = serde_json::from_str(r##"["#000000", "rgb(1,2,3)"]"##)
            .expect("colors should parse");
        assert_eq!(parsed, vec![Rgb(0, 0, 0), Rgb(1, 2, 3)]);
        assert!(serde_json::from_str::<Rgb>("\"nope\"").is_err());
    }
}

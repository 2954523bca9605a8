//! RGB color of a box.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// An sRGB color triple.
///
/// Serialized as `[r, g, b]`. Deserialization also accepts CSS-style
/// `"rgb(r, g, b)"`, `"rgba(r, g, b, a)"` and `"#rrggbb"` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled to [0, 1].
    pub fn normalized(self) -> [f64; 3] {
        [
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        ]
    }

    /// Euclidean distance between the normalized triples divided by sqrt(3):
    /// 0 for identical colors, 1 for black vs white.
    pub fn distance(self, other: Color) -> f64 {
        let a = self.normalized();
        let b = other.normalized();
        let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
        (sum.sqrt() / 3f64.sqrt()).min(1.0)
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from(v: [u8; 3]) -> Self {
        Color::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

fn channel(value: f64, src: &str) -> Result<u8, ClusterError> {
    if value.is_finite() && (0.0..=255.0).contains(&value) {
        Ok(value.round() as u8)
    } else {
        Err(ClusterError::InvalidColor(src.to_string()))
    }
}

impl FromStr for Color {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(ClusterError::InvalidColor(s.to_string()));
            }
            let parse = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16)
                    .map_err(|_| ClusterError::InvalidColor(s.to_string()))
            };
            return Ok(Color::new(parse(0..2)?, parse(2..4)?, parse(4..6)?));
        }

        let inner = text
            .strip_prefix("rgba(")
            .or_else(|| text.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ClusterError::InvalidColor(s.to_string()))?;
        let parts: Vec<f64> = inner
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ClusterError::InvalidColor(s.to_string()))?;
        // Alpha is accepted and ignored.
        if !(parts.len() == 3 || parts.len() == 4) {
            return Err(ClusterError::InvalidColor(s.to_string()));
        }
        Ok(Color::new(
            channel(parts[0], s)?,
            channel(parts[1], s)?,
            channel(parts[2], s)?,
        ))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Triple([f64; 3]),
    Text(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ClusterError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Triple([r, g, b]) => {
                let src = format!("[{r}, {g}, {b}]");
                Ok(Color::new(
                    channel(r, &src)?,
                    channel(g, &src)?,
                    channel(b, &src)?,
                ))
            }
            ColorRepr::Text(text) => text.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_bounds() {
        let black = Color::new(0, 0, 0);
        let white = Color::new(255, 255, 255);
        assert_eq!(black.distance(black), 0.0);
        assert!((black.distance(white) - 1.0).abs() < 1e-12);
        assert_eq!(black.distance(white), white.distance(black));
    }

    #[test]
    fn test_parse_css_forms() {
        assert_eq!("rgb(1, 2, 3)".parse::<Color>().unwrap(), Color::new(1, 2, 3));
        assert_eq!(
            "rgba(10, 20, 30, 0.5)".parse::<Color>().unwrap(),
            Color::new(10, 20, 30)
        );
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::new(255, 128, 0));
        assert!("rgb(1, 2)".parse::<Color>().is_err());
        assert!("rgb(1, 2, 300)".parse::<Color>().is_err());
        assert!("blue".parse::<Color>().is_err());
    }

    #[test]
    fn test_serde_forms() {
        let c: Color = serde_json::from_str("[12, 34, 56]").unwrap();
        assert_eq!(c, Color::new(12, 34, 56));
        let c: Color = serde_json::from_str(r#""rgb(12, 34, 56)""#).unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "[12,34,56]");
    }
}

//! Canvas coordinates.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static COORD_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s,]+").expect("coordinate separator pattern is valid")
});

/// A point on the map canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// The canvas origin, used when a coordinate field is absent.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Parses an `xy` field value such as `"100 50"`, `"100,50"` or `"-3, 7"`.
    ///
    /// Components are separated by runs of whitespace and/or commas. Missing,
    /// empty, malformed or non-finite components resolve to `0.0`; this never
    /// fails.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parts = COORD_SEPARATOR.split(text.trim());
        let x = parse_component(parts.next());
        let y = parse_component(parts.next());
        Self { x, y }
    }

    /// Integer-rounded components, ties to even.
    #[must_use]
    pub fn rounded(&self) -> (i64, i64) {
        (
            self.x.round_ties_even() as i64,
            self.y.round_ties_even() as i64,
        )
    }

    /// Whether `other` lies within `tolerance` of this point on both axes,
    /// boundary inclusive.
    #[must_use]
    pub fn within(&self, other: &Position, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Manhattan distance, used to rank several candidates inside a tolerance.
    #[must_use]
    pub fn manhattan(&self, other: &Position) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// The `X Y` field value with integer-rounded components.
    #[must_use]
    pub fn to_field(&self) -> String {
        let (x, y) = self.rounded();
        format!("{x} {y}")
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn parse_component(part: Option<&str>) -> f64 {
    part.map(str::trim)
        .filter(|p| !p.is_empty())
        .and_then(|p| p.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

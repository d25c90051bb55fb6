//! Normalized tap coordinates.
//!
//! Floor taps and goal taps share the same 0..100 shape but live in
//! different reference frames, so each gets its own type.

use serde::{Deserialize, Serialize};

pub const NORM_MIN: f64 = 0.0;
pub const NORM_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates lie in the closed range [0, 100].
    pub fn in_range(&self) -> bool {
        (NORM_MIN..=NORM_MAX).contains(&self.x) && (NORM_MIN..=NORM_MAX).contains(&self.y)
    }

    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.clamp(NORM_MIN, NORM_MAX),
            y: self.y.clamp(NORM_MIN, NORM_MAX),
        }
    }

    /// Integer projection used when exporting shot geometry.
    pub fn rounded(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Where a shot was taken from. x: 0 left boards .. 100 right boards,
/// y: 0 center line .. 100 goal line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorPoint(pub Point);

/// Where a shot crossed the goal mouth, goalie's perspective.
/// x: 0 left post .. 100 right post, y: 0 top bar .. 100 floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalPoint(pub Point);

impl FloorPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Point::new(x, y))
    }
    pub fn point(&self) -> Point {
        self.0
    }
}

impl GoalPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Point::new(x, y))
    }
    pub fn point(&self) -> Point {
        self.0
    }
}

/// Screen rectangle a tap landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Surface {
    /// Returns `None` for a degenerate rectangle.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) || !left.is_finite() || !top.is_finite() {
            return None;
        }
        Some(Self {
            left,
            top,
            width,
            height,
        })
    }

    /// Parse `"left,top,width,height"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [l, t, w, h] => Self::new(*l, *t, *w, *h),
            _ => None,
        }
    }

    /// Client coordinates to 0..100 units. Taps outside the rectangle
    /// produce values outside the range; nothing is clamped here.
    pub fn normalize(&self, client_x: f64, client_y: f64) -> Point {
        Point {
            x: (client_x - self.left) / self.width * 100.0,
            y: (client_y - self.top) / self.height * 100.0,
        }
    }
}

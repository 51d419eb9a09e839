//! Screen geometry primitives shared by the gesture synthesizer and the driver.
//!
//! Coordinates are device pixels with the origin at the top-left corner of the
//! screen, `x` growing to the right and `y` growing downwards (Android's
//! convention, and the one the Appium window rect reports).

use serde::{Deserialize, Serialize};

use crate::gesture::GestureError;

/// A point in screen pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position in pixels.
    pub x: i32,
    /// Vertical position in pixels.
    pub y: i32,
}

impl Point {
    /// Creates a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Adds an integer offset to this point.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to another point.
    pub fn distance_to(self, other: Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The size of the device screen in pixels.
///
/// Both dimensions are strictly positive; use [`ScreenSize::new`] to build
/// one from values reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    width: u32,
    height: u32,
}

impl ScreenSize {
    /// Largest dimension accepted. Keeps every derived coordinate inside `i32`.
    pub const MAX_DIMENSION: u32 = 1 << 20;

    /// Creates a screen size.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::DegenerateGeometry`] when either dimension is
    /// zero or larger than [`MAX_DIMENSION`](Self::MAX_DIMENSION).
    pub fn new(width: u32, height: u32) -> Result<Self, GestureError> {
        if width == 0 || height == 0 || width > Self::MAX_DIMENSION || height > Self::MAX_DIMENSION {
            return Err(GestureError::DegenerateGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Builds a screen size from the signed values a remote server reports.
    pub fn from_reported(width: i64, height: i64) -> Result<Self, GestureError> {
        let w = u32::try_from(width).unwrap_or(0);
        let h = u32::try_from(height).unwrap_or(0);
        Self::new(w, h)
    }

    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The center of the screen, using integer division.
    pub fn center(&self) -> Point {
        Point::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Returns true if the point lies within `[0, width) x [0, height)`.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as i64) < i64::from(self.width)
            && (point.y as i64) < i64::from(self.height)
    }

    /// Clamps a point onto the screen.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0, self.width as i32 - 1),
            point.y.clamp(0, self.height as i32 - 1),
        )
    }
}

impl std::fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_is_degenerate() {
        assert!(matches!(
            ScreenSize::new(0, 100),
            Err(GestureError::DegenerateGeometry { width: 0, height: 100 })
        ));
        assert!(ScreenSize::new(100, 0).is_err());
        assert!(ScreenSize::new(1, 1).is_ok());
    }

    #[test]
    fn negative_reported_size_is_degenerate() {
        assert!(ScreenSize::from_reported(-1, 200).is_err());
        let size = ScreenSize::from_reported(1080, 2400).unwrap();
        assert_eq!(size.width(), 1080);
        assert_eq!(size.height(), 2400);
    }

    #[test]
    fn center_uses_integer_division() {
        let size = ScreenSize::new(1081, 2401).unwrap();
        assert_eq!(size.center(), Point::new(540, 1200));
    }

    #[test]
    fn contains_is_half_open() {
        let size = ScreenSize::new(10, 20).unwrap();
        assert!(size.contains(Point::new(0, 0)));
        assert!(size.contains(Point::new(9, 19)));
        assert!(!size.contains(Point::new(10, 5)));
        assert!(!size.contains(Point::new(5, 20)));
        assert!(!size.contains(Point::new(-1, 5)));
    }

    #[test]
    fn clamp_pulls_points_on_screen() {
        let size = ScreenSize::new(10, 20).unwrap();
        assert_eq!(size.clamp(Point::new(-5, 25)), Point::new(0, 19));
        assert_eq!(size.clamp(Point::new(3, 4)), Point::new(3, 4));
    }

    #[test]
    fn distance_between_points() {
        assert_eq!(Point::new(0, 0).distance_to(Point::new(3, 4)), 5.0);
    }
}

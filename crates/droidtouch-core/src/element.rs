//! Remote element references and geometry.
//!
//! The automation server owns the element tree; the client only ever sees an
//! opaque element id plus whatever properties it asks for.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// An opaque reference to an element found in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The rectangle an element occupies, in screen pixels.
///
/// Coordinates have their origin at the top-left corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    /// The x-coordinate of the element's top-left corner.
    pub x: f64,
    /// The y-coordinate of the element's top-left corner.
    pub y: f64,
    /// The width of the element in pixels.
    pub width: f64,
    /// The height of the element in pixels.
    pub height: f64,
}

impl ElementRect {
    /// The center of the rectangle, truncated to whole pixels.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.width / 2.0) as i32,
            (self.y + self.height / 2.0) as i32,
        )
    }
}

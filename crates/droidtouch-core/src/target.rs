//! What a touch primitive acts on: a located element or a raw screen position.
//!
//! Targets are written as short strings on the command line and in scenario
//! files:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `540,1200` | screen position |
//! | `id=com.android.settings:id/search` | resource id |
//! | `aid=Navigate up` | accessibility id (content-desc) |
//! | `xpath=//android.widget.TextView[@text='Wi-Fi']` | XPath |
//! | `//android.widget.Button` | XPath (anything starting with `/` or `(`) |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::gesture::GestureError;

/// An element lookup strategy and its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    XPath(String),
    Id(String),
    AccessibilityId(String),
}

impl Locator {
    /// The WebDriver `using` strategy name.
    pub fn using(&self) -> &'static str {
        match self {
            Locator::XPath(_) => "xpath",
            Locator::Id(_) => "id",
            Locator::AccessibilityId(_) => "accessibility id",
        }
    }

    /// The selector value.
    pub fn value(&self) -> &str {
        match self {
            Locator::XPath(v) | Locator::Id(v) | Locator::AccessibilityId(v) => v,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Locator::XPath(_) => "xpath=",
            Locator::Id(_) => "id=",
            Locator::AccessibilityId(_) => "aid=",
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.prefix(), self.value())
    }
}

impl FromStr for Locator {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let locator = if let Some(v) = s.strip_prefix("id=") {
            Locator::Id(v.to_string())
        } else if let Some(v) = s.strip_prefix("aid=") {
            Locator::AccessibilityId(v.to_string())
        } else if let Some(v) = s.strip_prefix("xpath=") {
            Locator::XPath(v.to_string())
        } else if s.starts_with('/') || s.starts_with('(') {
            Locator::XPath(s.to_string())
        } else {
            return Err(GestureError::InvalidParameter(format!(
                "invalid locator '{s}': use id=, aid=, xpath= or an XPath starting with '/'"
            )));
        };
        if locator.value().is_empty() {
            return Err(GestureError::InvalidParameter(format!("empty locator '{s}'")));
        }
        Ok(locator)
    }
}

impl Serialize for Locator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where a tap, double tap or long press lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The center of the first element matching the locator.
    ByLocator(Locator),
    /// An absolute screen position.
    ByPosition(Point),
}

impl Target {
    pub fn position(x: i32, y: i32) -> Self {
        Target::ByPosition(Point::new(x, y))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::ByLocator(locator) => locator.fmt(f),
            Target::ByPosition(p) => write!(f, "{},{}", p.x, p.y),
        }
    }
}

fn parse_position(s: &str) -> Option<Point> {
    let (x, y) = s.split_once(',')?;
    Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

impl FromStr for Target {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_position(s) {
            Some(point) => Ok(Target::ByPosition(point)),
            None => s.parse().map(Target::ByLocator),
        }
    }
}

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//! Gesture path synthesis.
//!
//! Converts semantic gesture parameters (direction, degree, repeat count,
//! fixed coordinate) into [`FingerPath`]s that a multi-touch action executor
//! can submit to the device. Every function here is pure: identical inputs
//! always produce identical plans, and nothing touches the device.
//!
//! # Gestures
//!
//! - [`compute_pinch`] - two fingers moving along the 45°/225° diagonal
//! - [`compute_rotate`] - a pivot finger at the center and an orbiting finger
//! - [`compute_linear_gesture`] - single-finger scroll (vertical) or swipe (horizontal)
//!
//! # Example
//!
//! ```
//! use droidtouch_core::geometry::ScreenSize;
//! use droidtouch_core::gesture::{compute_rotate, RotationDirection};
//!
//! let screen = ScreenSize::new(1080, 2400).unwrap();
//! let plan = compute_rotate(screen, 90, RotationDirection::Clockwise, 2).unwrap();
//!
//! assert_eq!(plan.fingers.len(), 2);
//! assert_eq!(plan.repeat, 2);
//! ```

use std::f64::consts::FRAC_1_SQRT_2;

use serde::Serialize;
use thiserror::Error;

use crate::geometry::{Point, ScreenSize};

/// Hold time between press and the first move for pinch and rotate.
pub const MULTI_TOUCH_HOLD_MS: u64 = 50;

/// Hold time between press and move for scroll and swipe.
pub const LINEAR_HOLD_MS: u64 = 100;

/// Gap between the two taps of a double tap.
pub const DOUBLE_TAP_GAP_MS: u64 = 100;

/// Default hold time of a long press.
pub const LONG_PRESS_MS: u64 = 1000;

/// Angular spacing between rotate samples, in degrees.
pub const ROTATE_STEP_DEGREES: u32 = 5;

/// Angle at which the rotate arc starts, in degrees.
const ROTATE_START_DEGREES: u32 = 45;

/// Smallest and largest rotation accepted, in degrees.
pub const ROTATE_MIN_DEGREES: u32 = 5;
pub const ROTATE_MAX_DEGREES: u32 = 180;

/// Errors produced while validating gesture parameters or synthesizing paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// A direction, degree, count or coordinate was malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The screen is too small (or empty) for the requested gesture.
    #[error("degenerate geometry for a {width}x{height} screen")]
    DegenerateGeometry {
        /// Reported screen width.
        width: u32,
        /// Reported screen height.
        height: u32,
    },
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// Validates a direction token against an allow-list.
///
/// Matching is case-insensitive; the allow-list's spelling is returned.
///
/// ```
/// use droidtouch_core::gesture::validate_direction_token;
///
/// assert_eq!(validate_direction_token("UP", &["up", "down"]).unwrap(), "up");
/// assert!(validate_direction_token("sideways", &["up", "down"]).is_err());
/// ```
pub fn validate_direction_token<'a>(token: &str, allowed: &[&'a str]) -> Result<&'a str, GestureError> {
    crate::token::match_token(token, "direction", allowed)
}

token_enum! {
    /// Whether the fingers move towards or away from each other.
    pub enum PinchDirection as "direction" {
        /// Fingers move inward (zoom out).
        In => "in",
        /// Fingers move outward (zoom in).
        Out => "out",
    }
}

token_enum! {
    /// Sense of a rotate gesture, as seen on screen.
    pub enum RotationDirection as "direction" {
        Clockwise => "clockwise",
        CounterClockwise => "counterclockwise",
    }
}

token_enum! {
    /// Vertical scroll direction.
    pub enum ScrollDirection as "direction" {
        /// Finger moves from mid-screen towards the top quarter.
        Up => "up",
        /// Finger moves from mid-screen towards the bottom quarter.
        Down => "down",
    }
}

token_enum! {
    /// Horizontal swipe direction.
    pub enum SwipeDirection as "direction" {
        /// Finger moves from mid-screen towards the left quarter.
        Left => "left",
        /// Finger moves from mid-screen towards the right quarter.
        Right => "right",
    }
}

/// Screen axis a linear gesture travels along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A single-finger straight-line gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearGesture {
    /// Vertical movement.
    Scroll(ScrollDirection),
    /// Horizontal movement.
    Swipe(SwipeDirection),
}

impl LinearGesture {
    /// The axis this gesture moves along.
    pub fn axis(&self) -> Axis {
        match self {
            LinearGesture::Scroll(_) => Axis::Vertical,
            LinearGesture::Swipe(_) => Axis::Horizontal,
        }
    }
}

// ---------------------------------------------------------------------------
// Finger paths
// ---------------------------------------------------------------------------

/// One step of a finger's trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TouchStep {
    /// Put the finger down.
    Press(Point),
    /// Keep the finger where it is.
    Wait {
        /// Hold duration in milliseconds.
        ms: u64,
    },
    /// Drag the finger to a new point.
    MoveTo(Point),
    /// Lift the finger.
    Release,
}

/// The ordered press → ... → release trajectory of one simulated finger.
///
/// Built with [`FingerPath::press`]; a path always starts with a press and
/// ends with a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FingerPath {
    steps: Vec<TouchStep>,
}

/// Incremental builder returned by [`FingerPath::press`].
#[derive(Debug, Clone)]
pub struct PathBuilder {
    steps: Vec<TouchStep>,
}

impl FingerPath {
    /// Starts a path with the finger pressed at `point`.
    pub fn press(point: Point) -> PathBuilder {
        PathBuilder {
            steps: vec![TouchStep::Press(point)],
        }
    }

    /// The steps of this path, in order.
    pub fn steps(&self) -> &[TouchStep] {
        &self.steps
    }

    /// Every point the finger touches, in order (press point first).
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.steps.iter().filter_map(|step| match step {
            TouchStep::Press(p) | TouchStep::MoveTo(p) => Some(*p),
            _ => None,
        })
    }

    /// Where the finger goes down.
    pub fn start(&self) -> Point {
        match self.steps.first() {
            Some(TouchStep::Press(p)) => *p,
            // Unreachable through the builder, which always begins with a press.
            _ => Point::new(0, 0),
        }
    }

    /// The last point the finger touches before lifting.
    pub fn end(&self) -> Point {
        self.points().last().unwrap_or_else(|| self.start())
    }

    /// Continues a released path with another press at `point`, `gap_ms`
    /// after the release.
    pub fn press_again(self, gap_ms: u64, point: Point) -> PathBuilder {
        let mut steps = self.steps;
        if gap_ms > 0 {
            steps.push(TouchStep::Wait { ms: gap_ms });
        }
        steps.push(TouchStep::Press(point));
        PathBuilder { steps }
    }

    /// Total time spent in explicit waits, in milliseconds.
    pub fn hold_ms(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                TouchStep::Wait { ms } => *ms,
                _ => 0,
            })
            .sum()
    }
}

impl PathBuilder {
    /// Holds the finger in place for `ms` milliseconds.
    pub fn wait(mut self, ms: u64) -> Self {
        self.steps.push(TouchStep::Wait { ms });
        self
    }

    /// Drags the finger to `point`.
    pub fn move_to(mut self, point: Point) -> Self {
        self.steps.push(TouchStep::MoveTo(point));
        self
    }

    /// Lifts the finger, finishing the path.
    pub fn release(mut self) -> FingerPath {
        self.steps.push(TouchStep::Release);
        FingerPath { steps: self.steps }
    }
}

/// The output of the synthesizer: the finger paths performed together as a
/// single multi-touch action, and how many times to submit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GesturePlan {
    /// One path per finger; all fingers move simultaneously.
    pub fingers: Vec<FingerPath>,
    /// Number of times the executor submits the same paths.
    pub repeat: u32,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

fn ensure_repeat(repeat: u32) -> Result<(), GestureError> {
    if repeat == 0 {
        return Err(GestureError::InvalidParameter(
            "repeat count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn degenerate(screen: ScreenSize) -> GestureError {
    GestureError::DegenerateGeometry {
        width: screen.width(),
        height: screen.height(),
    }
}

/// Offset along the 45° diagonal for a given distance, clamped so that both
/// `center + offset` and `center - offset` stay on screen.
fn diagonal_offset(screen: ScreenSize, distance: f64) -> (i32, i32) {
    let component = (distance * FRAC_1_SQRT_2).trunc() as i32;
    let limit_x = ((screen.width() - 1) / 2) as i32;
    let limit_y = ((screen.height() - 1) / 2) as i32;
    (component.min(limit_x), component.min(limit_y))
}

/// Computes the two finger paths of a pinch gesture.
///
/// Both fingers travel along the 45°/225° diagonal through the screen center,
/// between one fifth and one half of the center-to-corner distance. Finger 2
/// is always the point reflection of finger 1 through the center.
///
/// # Errors
///
/// - [`GestureError::InvalidParameter`] if `repeat` is zero
/// - [`GestureError::DegenerateGeometry`] if the screen is too small for the
///   fingers to move at all
pub fn compute_pinch(
    screen: ScreenSize,
    direction: PinchDirection,
    repeat: u32,
) -> Result<GesturePlan, GestureError> {
    ensure_repeat(repeat)?;

    let center = screen.center();
    let reach = f64::from(center.x).hypot(f64::from(center.y));
    let far = diagonal_offset(screen, (reach / 2.0).floor());
    let near = diagonal_offset(screen, (reach / 5.0).floor());

    let (from, to) = match direction {
        PinchDirection::In => (far, near),
        PinchDirection::Out => (near, far),
    };
    if from == to {
        return Err(degenerate(screen));
    }

    let finger = |sign: i32| {
        FingerPath::press(center.offset(sign * from.0, sign * from.1))
            .wait(MULTI_TOUCH_HOLD_MS)
            .move_to(center.offset(sign * to.0, sign * to.1))
            .release()
    };

    Ok(GesturePlan {
        fingers: vec![finger(1), finger(-1)],
        repeat,
    })
}

/// A single tap at `point`.
pub fn tap_path(point: Point) -> FingerPath {
    FingerPath::press(point).release()
}

/// Two taps at `point` in quick succession.
pub fn double_tap_path(point: Point) -> FingerPath {
    FingerPath::press(point)
        .release()
        .press_again(DOUBLE_TAP_GAP_MS, point)
        .release()
}

/// A press held at `point` for `duration_ms` before lifting.
pub fn long_press_path(point: Point, duration_ms: u64) -> FingerPath {
    FingerPath::press(point).wait(duration_ms).release()
}

/// Checks that a rotation degree is in `[5, 180]` and a multiple of 5.
pub fn validate_rotation_degree(degree: u32) -> Result<(), GestureError> {
    if !(ROTATE_MIN_DEGREES..=ROTATE_MAX_DEGREES).contains(&degree) || degree % ROTATE_STEP_DEGREES != 0 {
        return Err(GestureError::InvalidParameter(format!(
            "invalid degree {degree}: must be from {ROTATE_MIN_DEGREES} to {ROTATE_MAX_DEGREES} and divisible by {ROTATE_STEP_DEGREES}"
        )));
    }
    Ok(())
}

/// Computes the two finger paths of a rotate gesture.
///
/// Finger 1 is a pivot pressed and released at the screen center. Finger 2
/// starts at 45° on a circle of radius `0.75 * min(cx, cy)` and moves in 5°
/// steps through `degree` degrees. The counterclockwise arc is the clockwise
/// arc mirrored across the 45° axis, so both start from the same point.
/// Sample `i` of it sits at angle `225° - 5°·i` reflected through the center.
///
/// Each offset from the center is truncated toward zero before it is added,
/// so points left of or above the center land one pixel closer to it than
/// truncating the absolute coordinate would put them. This keeps the two
/// directions exact mirror images of each other.
///
/// # Errors
///
/// - [`GestureError::InvalidParameter`] if `degree` is out of range, not a
///   multiple of 5, or `repeat` is zero
/// - [`GestureError::DegenerateGeometry`] if the radius is below one pixel
pub fn compute_rotate(
    screen: ScreenSize,
    degree: u32,
    direction: RotationDirection,
    repeat: u32,
) -> Result<GesturePlan, GestureError> {
    validate_rotation_degree(degree)?;
    ensure_repeat(repeat)?;

    let center = screen.center();
    let radius = (f64::from(center.x) * 0.75).min(f64::from(center.y) * 0.75);
    if radius < 1.0 {
        return Err(degenerate(screen));
    }

    let step_count = degree / ROTATE_STEP_DEGREES + 1;
    let orbit: Vec<Point> = (0..step_count)
        .map(|i| {
            let angle = f64::from(ROTATE_START_DEGREES + ROTATE_STEP_DEGREES * i).to_radians();
            let dx = (radius * angle.cos()).trunc() as i32;
            let dy = (radius * angle.sin()).trunc() as i32;
            let (dx, dy) = match direction {
                RotationDirection::Clockwise => (dx, dy),
                RotationDirection::CounterClockwise => (dy, dx),
            };
            screen.clamp(center.offset(dx, dy))
        })
        .collect();

    let Some((&first, rest)) = orbit.split_first() else {
        return Err(degenerate(screen));
    };
    let orbit_path = rest
        .iter()
        .fold(
            FingerPath::press(first).wait(MULTI_TOUCH_HOLD_MS),
            |path, &point| path.move_to(point),
        )
        .release();
    let pivot = FingerPath::press(center).release();

    Ok(GesturePlan {
        fingers: vec![pivot, orbit_path],
        repeat,
    })
}

/// Computes the single finger path of a scroll or swipe.
///
/// The finger starts at mid-screen and moves a quarter of the screen along
/// the gesture's axis. `fixed` pins the other coordinate (x for a scroll,
/// y for a swipe); it defaults to mid-screen.
///
/// # Errors
///
/// [`GestureError::InvalidParameter`] if `fixed` is off screen or `repeat`
/// is zero.
pub fn compute_linear_gesture(
    screen: ScreenSize,
    gesture: LinearGesture,
    fixed: Option<i32>,
    repeat: u32,
) -> Result<GesturePlan, GestureError> {
    ensure_repeat(repeat)?;

    let width = i64::from(screen.width());
    let height = i64::from(screen.height());
    let quarter = |extent: i64| (extent / 4) as i32;
    let three_quarters = |extent: i64| (extent * 3 / 4) as i32;
    let center = screen.center();

    let (start, end) = match gesture {
        LinearGesture::Scroll(direction) => {
            let x = fixed_coordinate(fixed, width, Axis::Vertical)?.unwrap_or(center.x);
            let end_y = match direction {
                ScrollDirection::Up => quarter(height),
                ScrollDirection::Down => three_quarters(height),
            };
            (Point::new(x, center.y), Point::new(x, end_y))
        }
        LinearGesture::Swipe(direction) => {
            let y = fixed_coordinate(fixed, height, Axis::Horizontal)?.unwrap_or(center.y);
            let end_x = match direction {
                SwipeDirection::Left => quarter(width),
                SwipeDirection::Right => three_quarters(width),
            };
            (Point::new(center.x, y), Point::new(end_x, y))
        }
    };

    Ok(GesturePlan {
        fingers: vec![FingerPath::press(start).wait(LINEAR_HOLD_MS).move_to(end).release()],
        repeat,
    })
}

fn fixed_coordinate(fixed: Option<i32>, extent: i64, axis: Axis) -> Result<Option<i32>, GestureError> {
    match fixed {
        Some(value) if value < 0 || i64::from(value) >= extent => {
            let name = match axis {
                Axis::Vertical => "x",
                Axis::Horizontal => "y",
            };
            Err(GestureError::InvalidParameter(format!(
                "fixed {name} position {value} is outside the screen (0..{extent})"
            )))
        }
        other => Ok(other),
    }
}

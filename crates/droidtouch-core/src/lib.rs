//! # droidtouch-core
//!
//! Core library for gesture automation on Android devices through an Appium
//! server.
//!
//! This crate synthesizes multi-touch gesture paths locally (pinch, rotate,
//! scroll, swipe) and delivers them, together with key events, device
//! controls and emulator telephony commands, over the W3C WebDriver protocol.
//!
//! ## Modules
//!
//! - [`geometry`] - Screen points and sizes
//! - [`gesture`] - Pure gesture path synthesis
//! - [`target`] - Element locators and tap targets
//! - [`keycode`] - Android key codes and power-key modes
//! - [`network`] - Network and telephony emulation parameters
//! - [`action`] - Action types and logging for automation operations
//! - [`driver`] - The backend-agnostic [`driver::AutomationDriver`] trait
//! - [`protocol`] - WebDriver command encoding and response decoding
//! - [`appium_client`] - HTTP transport to the Appium server
//! - [`appium_driver`] - The Appium implementation of the driver trait
//! - [`executor`] - Action execution engine with result handling
//! - [`capture`] - Saving UI dumps, screenshots and recordings
//! - [`scenario`] - JSON scenario files and their runner
//! - [`session`] - Action log persisted as JSON Lines
//! - [`server`] - Launching a local Appium server
//! - [`config`] - Persistent configuration in `~/.droidtouch/`
//!
//! ## External Dependencies
//!
//! Device-facing operations need a running Appium 2 server with the
//! UiAutomator2 driver and an attached device or emulator. The [`gesture`]
//! module has no such requirement.
//!
//! ## Example
//!
//! ```
//! use droidtouch_core::geometry::ScreenSize;
//! use droidtouch_core::gesture::{compute_pinch, PinchDirection};
//!
//! let screen = ScreenSize::new(1080, 2400).unwrap();
//! let plan = compute_pinch(screen, PinchDirection::Out, 1).unwrap();
//!
//! // The two fingers start as mirror images of each other.
//! let (a, b) = (plan.fingers[0].start(), plan.fingers[1].start());
//! assert_eq!(a.x + b.x, 2 * screen.center().x);
//! ```

#[macro_use]
mod token;

pub mod action;
pub mod appium_client;
pub mod appium_driver;
pub mod capabilities;
pub mod capture;
pub mod config;
pub mod driver;
pub mod element;
pub mod executor;
pub mod geometry;
pub mod gesture;
pub mod keycode;
pub mod network;
pub mod protocol;
pub mod scenario;
pub mod server;
pub mod session;
pub mod target;

#[cfg(test)]
mod testing;

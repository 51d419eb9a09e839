//! Session capabilities sent when creating an Appium session.
//!
//! Only `platformName` is a standard W3C capability; everything else is an
//! Appium vendor capability and goes out with the `appium:` prefix.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_platform_name() -> String {
    "Android".to_string()
}

fn default_automation_name() -> String {
    "UiAutomator2".to_string()
}

/// Capabilities for an Android session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default = "default_platform_name")]
    pub platform_name: String,

    #[serde(default = "default_automation_name")]
    pub automation_name: String,

    /// Device name or serial as shown by `adb devices`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udid: Option<String>,

    /// Package to launch, e.g. `com.android.settings`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_package: Option<String>,

    /// Activity to launch, e.g. `.Settings`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_activity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_reset: Option<bool>,

    /// Seconds the server waits for a command before ending the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_command_timeout: Option<u64>,

    /// Anything else, passed through as-is (prefixed unless it already
    /// carries a vendor prefix).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            platform_name: default_platform_name(),
            automation_name: default_automation_name(),
            device_name: None,
            udid: None,
            app_package: None,
            app_activity: None,
            no_reset: None,
            new_command_timeout: None,
            extra: Map::new(),
        }
    }
}

fn vendor_key(key: &str) -> String {
    if key == "platformName" || key.contains(':') {
        key.to_string()
    } else {
        format!("appium:{key}")
    }
}

impl Capabilities {
    /// The `alwaysMatch` object for a W3C new-session request.
    pub fn to_w3c(&self) -> Value {
        let mut caps = Map::new();
        caps.insert("platformName".into(), Value::String(self.platform_name.clone()));
        caps.insert(vendor_key("automationName"), Value::String(self.automation_name.clone()));

        let optional = [
            ("deviceName", self.device_name.clone().map(Value::String)),
            ("udid", self.udid.clone().map(Value::String)),
            ("appPackage", self.app_package.clone().map(Value::String)),
            ("appActivity", self.app_activity.clone().map(Value::String)),
            ("noReset", self.no_reset.map(Value::Bool)),
            ("newCommandTimeout", self.new_command_timeout.map(Value::from)),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                caps.insert(vendor_key(key), value);
            }
        }
        for (key, value) in &self.extra {
            caps.insert(vendor_key(key), value.clone());
        }
        Value::Object(caps)
    }

    /// A short description for log messages.
    pub fn describe(&self) -> String {
        let device = self
            .device_name
            .as_deref()
            .or(self.udid.as_deref())
            .unwrap_or("any device");
        match &self.app_package {
            Some(package) => format!("{device} ({package})"),
            None => device.to_string(),
        }
    }
}

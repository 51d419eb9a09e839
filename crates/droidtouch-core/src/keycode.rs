//! Android hardware key events.
//!
//! Key codes follow `android.view.KeyEvent`. Named keys cover the buttons a
//! test script typically reaches for; anything else can be sent as a raw
//! code through [`ActionType::PressKeycode`](crate::action::ActionType::PressKeycode).

token_enum! {
    /// A named Android key.
    pub enum AndroidKey as "key" {
        Back => "back",
        Home => "home",
        /// Recent apps.
        AppSwitch => "app_switch",
        Call => "call",
        EndCall => "end_call",
        Camera => "camera",
        Contacts => "contacts",
        Music => "music",
        VolumeMute => "volume_mute",
        VolumeUp => "volume_up",
        VolumeDown => "volume_down",
        Notification => "notification",
        Settings => "settings",
        Assist => "assist",
        Sleep => "sleep",
        Wakeup => "wakeup",
        Power => "power",
    }
}

impl AndroidKey {
    /// The `KeyEvent` code for this key.
    pub fn code(&self) -> u32 {
        match self {
            AndroidKey::Back => 4,
            AndroidKey::Home => 3,
            AndroidKey::AppSwitch => 187,
            AndroidKey::Call => 5,
            AndroidKey::EndCall => 6,
            AndroidKey::Camera => 27,
            AndroidKey::Contacts => 207,
            AndroidKey::Music => 209,
            AndroidKey::VolumeMute => 164,
            AndroidKey::VolumeUp => 24,
            AndroidKey::VolumeDown => 25,
            AndroidKey::Notification => 83,
            AndroidKey::Settings => 176,
            AndroidKey::Assist => 231,
            AndroidKey::Sleep => 223,
            AndroidKey::Wakeup => 224,
            AndroidKey::Power => 26,
        }
    }
}

token_enum! {
    /// What to do with the power button.
    pub enum PowerMode as "power mode" {
        /// Turn the screen off.
        Sleep => "sleep",
        /// Wake the screen. Does nothing useful if the device was powered off.
        On => "on",
        /// Hold the power button, which opens the power options menu.
        Off => "off",
    }
}

/// How a key event is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Short(AndroidKey),
    Long(AndroidKey),
}

impl PowerMode {
    /// The key event that implements this mode.
    pub fn key_press(&self) -> KeyPress {
        match self {
            PowerMode::Sleep => KeyPress::Short(AndroidKey::Sleep),
            PowerMode::On => KeyPress::Short(AndroidKey::Wakeup),
            PowerMode::Off => KeyPress::Long(AndroidKey::Power),
        }
    }

    /// A caveat worth logging before the key is sent, if any.
    pub fn caveat(&self) -> Option<&'static str> {
        match self {
            PowerMode::Sleep => None,
            PowerMode::On => Some("waking the screen may not work if the device was powered off"),
            PowerMode::Off => Some("long-pressing power opens the power options menu"),
        }
    }
}

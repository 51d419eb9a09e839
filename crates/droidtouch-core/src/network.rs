//! Network and telephony emulation parameters.
//!
//! Most of these only have an effect on an Android emulator; on a physical
//! device the remote server reports an error, which surfaces as a failed
//! action.

use serde::{Deserialize, Serialize};

token_enum! {
    /// Connectivity presets accepted by the network connection endpoint.
    pub enum NetworkType as "network type" {
        None => "none",
        Airplane => "airplane",
        Wifi => "wifi",
        Data => "data",
        /// Wi-Fi and mobile data together.
        All => "all",
    }
}

const AIRPLANE_BIT: u32 = 0b001;
const WIFI_BIT: u32 = 0b010;
const DATA_BIT: u32 = 0b100;

impl NetworkType {
    /// The connection bitmask sent to the device.
    pub fn bitmask(&self) -> u32 {
        match self {
            NetworkType::None => 0,
            NetworkType::Airplane => AIRPLANE_BIT,
            NetworkType::Wifi => WIFI_BIT,
            NetworkType::Data => DATA_BIT,
            NetworkType::All => WIFI_BIT | DATA_BIT,
        }
    }
}

/// Decoded connection bitmask as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub bitmask: u32,
    pub airplane: bool,
    pub wifi: bool,
    pub data: bool,
}

impl NetworkState {
    pub fn from_bitmask(bitmask: u32) -> Self {
        Self {
            bitmask,
            airplane: bitmask & AIRPLANE_BIT != 0,
            wifi: bitmask & WIFI_BIT != 0,
            data: bitmask & DATA_BIT != 0,
        }
    }

    /// The preset matching this state exactly, if there is one.
    pub fn preset(&self) -> Option<NetworkType> {
        NetworkType::ALL.iter().copied().find(|t| t.bitmask() == self.bitmask)
    }
}

impl std::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "airplane={} wifi={} data={} (bitmask {})",
            self.airplane, self.wifi, self.data, self.bitmask
        )
    }
}

token_enum! {
    /// Emulated network speed profiles.
    pub enum NetworkSpeed as "network speed" {
        Gsm => "gsm",
        Scsd => "scsd",
        Gprs => "gprs",
        Edge => "edge",
        Umts => "umts",
        Hsdpa => "hsdpa",
        Lte => "lte",
        Evdo => "evdo",
        Full => "full",
    }
}

token_enum! {
    /// Actions on an emulated incoming GSM call.
    pub enum GsmCallAction as "gsm call action" {
        Call => "call",
        Accept => "accept",
        Cancel => "cancel",
        Hold => "hold",
    }
}

token_enum! {
    /// Emulated GSM signal strength.
    pub enum GsmSignal as "gsm signal strength" {
        None => "none",
        Poor => "poor",
        Moderate => "moderate",
        Good => "good",
        Great => "great",
    }
}

impl GsmSignal {
    /// Numeric strength level, 0 (none) to 4 (great).
    pub fn level(&self) -> u8 {
        match self {
            GsmSignal::None => 0,
            GsmSignal::Poor => 1,
            GsmSignal::Moderate => 2,
            GsmSignal::Good => 3,
            GsmSignal::Great => 4,
        }
    }
}

token_enum! {
    /// Emulated GSM voice registration state.
    pub enum GsmVoiceState as "gsm voice state" {
        Unregistered => "unregistered",
        Home => "home",
        Roaming => "roaming",
        Searching => "searching",
        Denied => "denied",
        Off => "off",
        On => "on",
    }
}

//! LoRaWAN MAC-side definitions
//!
//! This module contains what the session manager needs to know about the
//! surrounding LoRaWAN stack:
//! - The MAC engine interface and its events
//! - Regional identity and channel plan families
//! - Network operators and their bootstrap profiles

/// MAC engine interface
pub mod mac;

/// Network operators and bootstrap profiles
pub mod network;

/// Regional identity
pub mod region;

pub use mac::{MacEngine, MacEvent, OsTime};
pub use network::{NetworkId, NetworkProfile};
pub use region::{ChannelPlanKind, CountryCode, Region};

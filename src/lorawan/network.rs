//! Network operators and their bootstrap profiles
//!
//! Each (network, region) pair gets two small hooks: a region init that runs
//! whenever no saved session could be restored (and again on MAC reset or
//! join start), and a post-join fixup that runs once a session exists. The
//! hooks are picked once, when the session manager is created.

use core::fmt;

use super::mac::MacEngine;
use super::region::{Region, SubBand};
use crate::config::device::{ProvisioningStyle, SessionConfig};

/// US915 DR0, SF10/125 kHz
const US915_DR_SF10: u8 = 0;
/// US915 DR1, SF9/125 kHz
const US915_DR_SF9: u8 = 1;
/// US915 DR3, SF7/125 kHz
const US915_DR_SF7: u8 = 3;
/// AU915 DR5, SF7/125 kHz
const AU915_DR_SF7: u8 = 5;
/// EU-like DR3, SF9/125 kHz
const LORAWAN_DR3: u8 = 3;

/// Supported network operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkId {
    /// The Things Network
    TheThingsNetwork,
    /// Actility ThingPark
    Actility,
    /// Helium
    Helium,
    /// machineQ
    MachineQ,
    /// Senet
    Senet,
    /// Senra
    Senra,
    /// Swisscom
    Swisscom,
    /// ChirpStack
    ChirpStack,
    /// Any other LoRaWAN network server
    Generic,
}

impl NetworkId {
    /// Human-readable network name
    pub fn name(self) -> &'static str {
        match self {
            NetworkId::TheThingsNetwork => "The Things Network",
            NetworkId::Actility => "Actility",
            NetworkId::Helium => "Helium",
            NetworkId::MachineQ => "machineQ",
            NetworkId::Senet => "Senet",
            NetworkId::Senra => "Senra",
            NetworkId::Swisscom => "Swisscom",
            NetworkId::ChirpStack => "ChirpStack",
            NetworkId::Generic => "Generic",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Region initialization hook
pub type RegionInitFn<M> = fn(&mut M, &SessionConfig);

/// Post-join fixup hook
pub type PostJoinFn<M> = fn(&mut M, ProvisioningStyle);

/// Bootstrap hooks for one network in one region
pub struct NetworkProfile<M: MacEngine> {
    /// Runs when no saved session was restored, on MAC reset and on join start
    pub region_init: RegionInitFn<M>,
    /// Runs after a join, or after installing an ABP session
    pub post_join: PostJoinFn<M>,
}

impl<M: MacEngine> Clone for NetworkProfile<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: MacEngine> Copy for NetworkProfile<M> {}

impl<M: MacEngine> NetworkProfile<M> {
    /// Profile that does nothing in either hook
    pub fn passive() -> Self {
        Self {
            region_init: no_region_init::<M>,
            post_join: no_post_join::<M>,
        }
    }

    /// Pick the hooks for a network/region pair
    pub fn select(config: &SessionConfig) -> Self {
        use NetworkId::*;
        use Region::*;

        let region_init: RegionInitFn<M> = match (config.network, config.region) {
            (TheThingsNetwork, Us915) => ttn_us915_region_init::<M>,
            (TheThingsNetwork, Au915) => ttn_au915_region_init::<M>,
            (Helium, Us915) => helium_us915_region_init::<M>,
            (MachineQ, Us915) => machineq_us915_region_init::<M>,
            (Actility, Us915) | (Senet, Us915) | (ChirpStack, Au915) => {
                configured_sub_band_region_init::<M>
            }
            _ => no_region_init::<M>,
        };

        let post_join: PostJoinFn<M> = match (config.network, config.region) {
            (TheThingsNetwork, Us915) => ttn_us915_post_join::<M>,
            (TheThingsNetwork, Eu868) => ttn_eu868_post_join::<M>,
            _ => no_post_join::<M>,
        };

        Self {
            region_init,
            post_join,
        }
    }
}

fn no_region_init<M: MacEngine>(_mac: &mut M, _config: &SessionConfig) {}

fn no_post_join<M: MacEngine>(_mac: &mut M, _style: ProvisioningStyle) {}

fn ttn_us915_region_init<M: MacEngine>(mac: &mut M, _config: &SessionConfig) {
    // must align with the sub-band the gateways listen on
    mac.set_dr_txpow(US915_DR_SF7, 21);
    mac.select_sub_band(SubBand::SubBand2.index());
}

fn ttn_au915_region_init<M: MacEngine>(mac: &mut M, _config: &SessionConfig) {
    mac.set_dr_txpow(AU915_DR_SF7, 30);
    mac.select_sub_band(SubBand::SubBand2.index());
}

fn helium_us915_region_init<M: MacEngine>(mac: &mut M, _config: &SessionConfig) {
    // Helium is an 8-channel network; probe only channels 8-15 and 65 before join
    mac.select_sub_band(SubBand::SubBand2.index());
    mac.set_dr_txpow(US915_DR_SF10, 21);
}

fn machineq_us915_region_init<M: MacEngine>(mac: &mut M, _config: &SessionConfig) {
    mac.set_dr_txpow(US915_DR_SF10, 21);
}

fn configured_sub_band_region_init<M: MacEngine>(mac: &mut M, config: &SessionConfig) {
    if let Some(sub_band) = config.sub_band {
        mac.select_sub_band(sub_band);
    }
}

fn ttn_us915_post_join<M: MacEngine>(mac: &mut M, _style: ProvisioningStyle) {
    mac.link_mut().rx2_data_rate = US915_DR_SF9;
}

fn ttn_eu868_post_join<M: MacEngine>(mac: &mut M, style: ProvisioningStyle) {
    // ABP sessions never see the RX2 settings from a join accept
    if style == ProvisioningStyle::Abp {
        mac.link_mut().rx2_data_rate = LORAWAN_DR3;
    }
}

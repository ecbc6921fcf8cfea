//! Device and network configuration
//!
//! This module contains the types the host uses to describe the device:
//! - Provisioning (ABP session or OTAA credentials)
//! - Network, region and country selection
//! - Optional bootstrap and validation settings

/// Provisioning info and session configuration
pub mod device;

pub use device::{AbpInfo, OtaaInfo, ProvisioningInfo, ProvisioningStyle, SessionConfig};

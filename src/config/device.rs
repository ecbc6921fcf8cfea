use crate::lorawan::network::NetworkId;
use crate::lorawan::region::{CountryCode, Region};

/// EUI-64 (8 bytes)
pub type EUI64 = [u8; 8];
/// AES-128 key (16 bytes)
pub type AESKey = [u8; 16];
/// Device Address (4 bytes)
pub type DevAddr = [u8; 4];

/// How the device gets its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProvisioningStyle {
    /// Not provisioned yet
    None,
    /// Activation by personalization
    Abp,
    /// Over-the-air activation
    Otaa,
}

/// Session parameters provisioned for ABP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbpInfo {
    /// Network ID
    pub net_id: u32,
    /// Device address
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_skey: AESKey,
    /// Application session key
    pub app_skey: AESKey,
    /// Initial uplink frame counter
    pub fcnt_up: u32,
    /// Initial downlink frame counter
    pub fcnt_down: u32,
}

/// Join parameters provisioned for OTAA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtaaInfo {
    /// Device EUI (unique device identifier)
    pub dev_eui: EUI64,
    /// Application (join) EUI
    pub app_eui: EUI64,
    /// Application root key
    pub app_key: AESKey,
}

/// Provisioning info returned by the host at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningInfo {
    /// Nothing provisioned
    None,
    /// ABP session
    Abp(AbpInfo),
    /// OTAA credentials
    Otaa(OtaaInfo),
}

impl ProvisioningInfo {
    /// Create OTAA provisioning info
    pub fn new_otaa(dev_eui: EUI64, app_eui: EUI64, app_key: AESKey) -> Self {
        ProvisioningInfo::Otaa(OtaaInfo {
            dev_eui,
            app_eui,
            app_key,
        })
    }

    /// Create ABP provisioning info with frame counters starting at zero
    pub fn new_abp(net_id: u32, dev_addr: DevAddr, nwk_skey: AESKey, app_skey: AESKey) -> Self {
        ProvisioningInfo::Abp(AbpInfo {
            net_id,
            dev_addr,
            nwk_skey,
            app_skey,
            fcnt_up: 0,
            fcnt_down: 0,
        })
    }

    /// Provisioning style
    pub fn style(&self) -> ProvisioningStyle {
        match self {
            ProvisioningInfo::None => ProvisioningStyle::None,
            ProvisioningInfo::Abp(_) => ProvisioningStyle::Abp,
            ProvisioningInfo::Otaa(_) => ProvisioningStyle::Otaa,
        }
    }

    /// True unless `None`
    pub fn is_provisioned(&self) -> bool {
        !matches!(self, ProvisioningInfo::None)
    }
}

/// Static identity of this device build: which network and region it was
/// configured for, plus optional bootstrap and validation knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Network operator
    pub network: NetworkId,
    /// Regulatory region
    pub region: Region,
    /// Country variant of the region
    pub country: CountryCode,
    /// Sub-band to pre-select on US-like plans, for networks that take it
    /// from configuration
    pub sub_band: Option<u8>,
    /// When set, a saved session is only restored if the saved session
    /// info carries this NetID
    pub expected_net_id: Option<u32>,
}

impl SessionConfig {
    /// Configuration for a network and region, no country variant
    pub fn new(network: NetworkId, region: Region) -> Self {
        Self {
            network,
            region,
            country: CountryCode::NONE,
            sub_band: None,
            expected_net_id: None,
        }
    }

    /// Set the country variant
    pub fn with_country(mut self, country: CountryCode) -> Self {
        self.country = country;
        self
    }

    /// Set the configured sub-band (0..=7); out-of-range values are ignored
    pub fn with_sub_band(mut self, sub_band: u8) -> Self {
        self.sub_band = if sub_band < 8 { Some(sub_band) } else { None };
        self
    }

    /// Also require a matching NetID before restoring a saved session
    pub fn with_expected_net_id(mut self, net_id: u32) -> Self {
        self.expected_net_id = Some(net_id);
        self
    }

    /// Region name including the country variant, e.g. `as923jp`
    pub fn region_name(&self) -> &'static str {
        self.region.display_name(self.country)
    }
}

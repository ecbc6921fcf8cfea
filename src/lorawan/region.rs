//! Regional identity
//!
//! Regions are identified by a stable numeric code that is written into every
//! saved session snapshot, together with an optional country code that
//! distinguishes regulatory sub-variants of a region (for example AS923 as
//! operated in Japan). Each region also fixes the shape of the channel plan
//! that gets saved for it.

use core::fmt;

/// Regulatory region, with the code that is stored in snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Region {
    /// No region configured
    Unknown = 0,
    /// EU 863-870 MHz
    Eu868 = 1,
    /// US 902-928 MHz
    Us915 = 2,
    /// China 779-787 MHz
    Cn783 = 3,
    /// EU 433 MHz
    Eu433 = 4,
    /// Australia 915-928 MHz
    Au915 = 5,
    /// China 470-510 MHz
    Cn490 = 6,
    /// Asia 923 MHz
    As923 = 7,
    /// South Korea 920-923 MHz
    Kr920 = 8,
    /// India 865-867 MHz
    In866 = 9,
}

/// Shape of the channel plan saved for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChannelPlanKind {
    /// Up to 16 channels, each with its own frequency, data rates and band
    FrequencyList = 0,
    /// 64 + 8 fixed channels, one enable bit each
    MaskList = 1,
    /// 96 fixed channels, one enable bit each
    WideMaskList = 2,
}

impl ChannelPlanKind {
    /// Decode a channel plan header tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChannelPlanKind::FrequencyList),
            1 => Some(ChannelPlanKind::MaskList),
            2 => Some(ChannelPlanKind::WideMaskList),
            _ => None,
        }
    }
}

impl Region {
    /// Every region that can be configured, in code order
    pub const ALL: [Region; 9] = [
        Region::Eu868,
        Region::Us915,
        Region::Cn783,
        Region::Eu433,
        Region::Au915,
        Region::Cn490,
        Region::As923,
        Region::Kr920,
        Region::In866,
    ];

    /// Decode a stored region code. Unrecognised codes map to `Unknown`.
    pub fn from_code(code: u8) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|r| *r as u8 == code)
            .unwrap_or(Region::Unknown)
    }

    /// Stored region code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Channel plan family used by this region
    pub fn channel_plan(self) -> Option<ChannelPlanKind> {
        match self {
            Region::Eu868
            | Region::Cn783
            | Region::Eu433
            | Region::As923
            | Region::Kr920
            | Region::In866 => Some(ChannelPlanKind::FrequencyList),
            Region::Us915 | Region::Au915 => Some(ChannelPlanKind::MaskList),
            Region::Cn490 => Some(ChannelPlanKind::WideMaskList),
            Region::Unknown => None,
        }
    }

    /// Short lower-case name, e.g. `eu868`
    pub fn name(self) -> &'static str {
        match self {
            Region::Unknown => "<<unknown>>",
            Region::Eu868 => "eu868",
            Region::Us915 => "us915",
            Region::Cn783 => "cn783",
            Region::Eu433 => "eu433",
            Region::Au915 => "au915",
            Region::Cn490 => "cn490",
            Region::As923 => "as923",
            Region::Kr920 => "kr920",
            Region::In866 => "in866",
        }
    }

    /// Display name taking the country variant into account
    pub fn display_name(self, country: CountryCode) -> &'static str {
        match (self, country) {
            (Region::As923, CountryCode::JP) => "as923jp",
            _ => self.name(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Two-letter country code, packed big-endian into 16 bits.
///
/// Zero means "no country variant".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CountryCode(u16);

impl CountryCode {
    /// No country variant
    pub const NONE: CountryCode = CountryCode(0);
    /// Japan (AS923 with Japanese listen-before-talk rules)
    pub const JP: CountryCode = CountryCode::from_chars('J', 'P');

    /// Pack an ISO 3166 alpha-2 code. Anything that is not two upper-case
    /// ASCII letters yields `NONE`.
    pub const fn from_chars(c1: char, c2: char) -> Self {
        if c1 < 'A' || c1 > 'Z' || c2 < 'A' || c2 > 'Z' {
            CountryCode::NONE
        } else {
            CountryCode(((c1 as u16) << 8) | c2 as u16)
        }
    }

    /// Wrap a raw stored value
    pub const fn from_raw(raw: u16) -> Self {
        CountryCode(raw)
    }

    /// Raw stored value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// True for `NONE`
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// US-like sub-bands of eight 125 kHz channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SubBand {
    /// Channels 0-7 and 64
    SubBand1 = 0,
    /// Channels 8-15 and 65
    SubBand2,
    /// Channels 16-23 and 66
    SubBand3,
    /// Channels 24-31 and 67
    SubBand4,
    /// Channels 32-39 and 68
    SubBand5,
    /// Channels 40-47 and 69
    SubBand6,
    /// Channels 48-55 and 70
    SubBand7,
    /// Channels 56-63 and 71
    SubBand8,
}

impl SubBand {
    /// Zero-based sub-band index as used by the MAC engine
    pub fn index(self) -> u8 {
        self as u8
    }
}

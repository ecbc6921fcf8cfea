//! Channel plan codec
//!
//! Two encodings sit behind one [`ChannelPlan`]:
//! - [`FrequencyList`] for EU-like regions: up to 16 channels, each with a
//!   packed uplink and downlink frequency, a data rate mask and a duty-cycle
//!   band, plus per-band duty-cycle state.
//! - [`MaskList`] for US-like and CN490 regions: fixed channels, one enable
//!   bit each, plus a channel re-use shuffle bitmap of the same size.
//!
//! Frequencies are stored in 100 Hz units in three big-endian bytes, which
//! covers up to 1,677,721,500 Hz.

use super::FormatError;
use crate::lorawan::region::ChannelPlanKind;

/// Size of the channel plan area inside a session snapshot
pub const CHANNEL_PLAN_AREA_SIZE: usize = FrequencyList::SIZE;

/// Largest frequency that fits the packed 24-bit field, in Hz
pub const MAX_PACKED_FREQUENCY: u32 = 0x00FF_FFFF * 100;

/// Size of the `{kind, size}` header at the start of every channel plan
const HEADER_SIZE: usize = 2;

/// Which packed frequency table to access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrequencyTable {
    /// Uplink frequencies
    Uplink,
    /// Downlink frequencies (DlChannelReq)
    Downlink,
}

/// Duty-cycle state of one band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelBand {
    /// Duty cycle limitation, 1/tx_duty_denom
    pub tx_duty_denom: u16,
    /// Maximum transmit power in this band
    pub tx_power: u8,
    /// Last channel used in this band
    pub last_channel: u8,
    /// Ticks until the band is available, relative to the snapshot time
    pub ostime_avail: u32,
}

/// Channel plan for EU-like regions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyList {
    /// Band number of each channel, two bits per channel
    pub channel_bands: u32,
    /// Enabled channels, one bit per channel
    pub channel_map: u16,
    /// Channel re-use shuffle bitmap
    pub shuffle_map: u16,
    /// Allowed data rates of each channel
    pub dr_map: [u16; FrequencyList::CHANNELS],
    uplink_freq: [u8; FrequencyList::CHANNELS * 3],
    downlink_freq: [u8; FrequencyList::CHANNELS * 3],
    /// Per-band duty-cycle state
    pub bands: [ChannelBand; FrequencyList::BANDS],
}

impl Default for FrequencyList {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyList {
    /// Number of channels
    pub const CHANNELS: usize = 16;
    /// Number of bands
    pub const BANDS: usize = 4;
    /// Encoded size, header included
    pub const SIZE: usize = 172;

    const OFF_CHANNEL_BANDS: usize = 4;
    const OFF_CHANNEL_MAP: usize = 8;
    const OFF_SHUFFLE_MAP: usize = 10;
    const OFF_DR_MAP: usize = 12;
    const OFF_UPLINK: usize = 44;
    const OFF_DOWNLINK: usize = 92;
    const OFF_BANDS: usize = 140;
    const BAND_SIZE: usize = 8;

    /// Empty plan: no channels, no bands
    pub fn new() -> Self {
        Self {
            channel_bands: 0,
            channel_map: 0,
            shuffle_map: 0,
            dr_map: [0; Self::CHANNELS],
            uplink_freq: [0; Self::CHANNELS * 3],
            downlink_freq: [0; Self::CHANNELS * 3],
            bands: [ChannelBand::default(); Self::BANDS],
        }
    }

    /// Assign a channel to a band (0..=3). Returns false if either is out of range.
    pub fn set_band(&mut self, channel: usize, band: u8) -> bool {
        if channel >= Self::CHANNELS || band as usize >= Self::BANDS {
            return false;
        }
        let shift = 2 * channel as u32;
        let mask = 0x3u32 << shift;
        let v = (band as u32) << shift;
        self.channel_bands ^= (self.channel_bands ^ v) & mask;
        true
    }

    /// Band of a channel, 0..=3. Zero for out-of-range channels.
    pub fn band(&self, channel: usize) -> u8 {
        if channel >= Self::CHANNELS {
            return 0;
        }
        ((self.channel_bands >> (2 * channel as u32)) & 0x3) as u8
    }

    fn table(&self, table: FrequencyTable) -> &[u8; Self::CHANNELS * 3] {
        match table {
            FrequencyTable::Uplink => &self.uplink_freq,
            FrequencyTable::Downlink => &self.downlink_freq,
        }
    }

    fn table_mut(&mut self, table: FrequencyTable) -> &mut [u8; Self::CHANNELS * 3] {
        match table {
            FrequencyTable::Uplink => &mut self.uplink_freq,
            FrequencyTable::Downlink => &mut self.downlink_freq,
        }
    }

    /// Recorded frequency of a channel in Hz; zero for out-of-range channels
    pub fn frequency(&self, table: FrequencyTable, channel: usize) -> u32 {
        if channel >= Self::CHANNELS {
            return 0;
        }
        let p = &self.table(table)[channel * 3..channel * 3 + 3];
        ((p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32) * 100
    }

    /// Record the frequency of a channel, rounded down to 100 Hz.
    ///
    /// Returns false if the channel is out of range or the frequency does not
    /// fit the packed field.
    pub fn set_frequency(&mut self, table: FrequencyTable, channel: usize, frequency: u32) -> bool {
        if channel >= Self::CHANNELS {
            return false;
        }
        let reduced = frequency / 100;
        if reduced > 0x00FF_FFFF {
            return false;
        }
        let p = &mut self.table_mut(table)[channel * 3..channel * 3 + 3];
        p[0] = (reduced >> 16) as u8;
        p[1] = (reduced >> 8) as u8;
        p[2] = reduced as u8;
        true
    }

    /// A channel is enabled when it is defined (non-zero uplink frequency)
    /// and its enable bit is set
    pub fn is_enabled(&self, channel: usize) -> bool {
        channel < Self::CHANNELS
            && self.channel_map & (1 << channel) != 0
            && self.frequency(FrequencyTable::Uplink, channel) != 0
    }

    /// Set the enable bit of a channel and return its previous value.
    /// Out-of-range channels are left alone and report false.
    pub fn enable(&mut self, channel: usize, enable: bool) -> bool {
        if channel >= Self::CHANNELS {
            return false;
        }
        let mask = 1u16 << channel;
        let previous = self.channel_map & mask != 0;
        if enable {
            self.channel_map |= mask;
        } else {
            self.channel_map &= !mask;
        }
        previous
    }

    /// Zero every per-channel and per-band field
    pub fn clear_all(&mut self) {
        *self = Self::new();
    }

    fn encode_body(&self, out: &mut [u8]) {
        out[Self::OFF_CHANNEL_BANDS..Self::OFF_CHANNEL_BANDS + 4]
            .copy_from_slice(&self.channel_bands.to_le_bytes());
        out[Self::OFF_CHANNEL_MAP..Self::OFF_CHANNEL_MAP + 2]
            .copy_from_slice(&self.channel_map.to_le_bytes());
        out[Self::OFF_SHUFFLE_MAP..Self::OFF_SHUFFLE_MAP + 2]
            .copy_from_slice(&self.shuffle_map.to_le_bytes());
        for (i, dr) in self.dr_map.iter().enumerate() {
            let off = Self::OFF_DR_MAP + 2 * i;
            out[off..off + 2].copy_from_slice(&dr.to_le_bytes());
        }
        out[Self::OFF_UPLINK..Self::OFF_DOWNLINK].copy_from_slice(&self.uplink_freq);
        out[Self::OFF_DOWNLINK..Self::OFF_BANDS].copy_from_slice(&self.downlink_freq);
        for (i, band) in self.bands.iter().enumerate() {
            let off = Self::OFF_BANDS + Self::BAND_SIZE * i;
            out[off..off + 2].copy_from_slice(&band.tx_duty_denom.to_le_bytes());
            out[off + 2] = band.tx_power;
            out[off + 3] = band.last_channel;
            out[off + 4..off + 8].copy_from_slice(&band.ostime_avail.to_le_bytes());
        }
    }

    fn decode_body(raw: &[u8]) -> Self {
        let mut plan = Self::new();
        plan.channel_bands = read_u32(raw, Self::OFF_CHANNEL_BANDS);
        plan.channel_map = read_u16(raw, Self::OFF_CHANNEL_MAP);
        plan.shuffle_map = read_u16(raw, Self::OFF_SHUFFLE_MAP);
        for (i, dr) in plan.dr_map.iter_mut().enumerate() {
            *dr = read_u16(raw, Self::OFF_DR_MAP + 2 * i);
        }
        plan.uplink_freq
            .copy_from_slice(&raw[Self::OFF_UPLINK..Self::OFF_DOWNLINK]);
        plan.downlink_freq
            .copy_from_slice(&raw[Self::OFF_DOWNLINK..Self::OFF_BANDS]);
        for (i, band) in plan.bands.iter_mut().enumerate() {
            let off = Self::OFF_BANDS + Self::BAND_SIZE * i;
            band.tx_duty_denom = read_u16(raw, off);
            band.tx_power = raw[off + 2];
            band.last_channel = raw[off + 3];
            band.ostime_avail = read_u32(raw, off + 4);
        }
        plan
    }
}

/// Channel plan for regions with fixed channel grids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskList {
    kind: ChannelPlanKind,
    channel_map: [u8; MaskList::MAX_MAP_BYTES],
    shuffle_map: [u8; MaskList::MAX_MAP_BYTES],
}

impl MaskList {
    /// Channels in a US915/AU915 plan (64 + 8)
    pub const US_CHANNELS: usize = 72;
    /// Channels in a CN490 plan
    pub const WIDE_CHANNELS: usize = 96;
    const MAX_MAP_BYTES: usize = 12;

    /// Empty 72-channel plan
    pub fn new() -> Self {
        Self::with_kind(ChannelPlanKind::MaskList)
    }

    /// Empty 96-channel plan
    pub fn new_wide() -> Self {
        Self::with_kind(ChannelPlanKind::WideMaskList)
    }

    fn with_kind(kind: ChannelPlanKind) -> Self {
        Self {
            kind,
            channel_map: [0; Self::MAX_MAP_BYTES],
            shuffle_map: [0; Self::MAX_MAP_BYTES],
        }
    }

    /// Plan kind, `MaskList` or `WideMaskList`
    pub fn kind(&self) -> ChannelPlanKind {
        self.kind
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        match self.kind {
            ChannelPlanKind::WideMaskList => Self::WIDE_CHANNELS,
            _ => Self::US_CHANNELS,
        }
    }

    /// Bytes per bitmap; a multiple of 16 bits to match the MAC engine
    pub fn map_len(&self) -> usize {
        2 * ((self.channels() + 15) / 16)
    }

    /// Encoded size, header included
    pub fn size(&self) -> usize {
        HEADER_SIZE + 2 * self.map_len()
    }

    /// Whether a channel's enable bit is set; false when out of range
    pub fn is_enabled(&self, channel: usize) -> bool {
        channel < self.channels() && self.channel_map[channel / 8] & (1 << (channel & 7)) != 0
    }

    /// Set or clear a channel's enable bit and return the previous value.
    /// Out-of-range channels are left alone and report false.
    pub fn enable(&mut self, channel: usize, enable: bool) -> bool {
        if channel >= self.channels() {
            return false;
        }
        let byte = &mut self.channel_map[channel / 8];
        let mask = 1u8 << (channel & 7);
        let previous = *byte & mask != 0;
        if enable {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        previous
    }

    /// Channel re-use shuffle bitmap
    pub fn shuffle_map(&self) -> &[u8] {
        &self.shuffle_map[..self.map_len()]
    }

    /// Copy in a shuffle bitmap. Extra source bytes are ignored, missing
    /// bytes are zeroed.
    pub fn set_shuffle_map(&mut self, map: &[u8]) {
        let len = self.map_len();
        self.shuffle_map = [0; Self::MAX_MAP_BYTES];
        let n = map.len().min(len);
        self.shuffle_map[..n].copy_from_slice(&map[..n]);
    }

    /// Clear every enable and shuffle bit
    pub fn clear_all(&mut self) {
        self.channel_map = [0; Self::MAX_MAP_BYTES];
        self.shuffle_map = [0; Self::MAX_MAP_BYTES];
    }

    fn encode_body(&self, out: &mut [u8]) {
        let len = self.map_len();
        out[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(&self.channel_map[..len]);
        out[HEADER_SIZE + len..HEADER_SIZE + 2 * len].copy_from_slice(&self.shuffle_map[..len]);
    }

    fn decode_body(kind: ChannelPlanKind, raw: &[u8]) -> Self {
        let mut plan = Self::with_kind(kind);
        let len = plan.map_len();
        plan.channel_map[..len].copy_from_slice(&raw[HEADER_SIZE..HEADER_SIZE + len]);
        plan.shuffle_map[..len].copy_from_slice(&raw[HEADER_SIZE + len..HEADER_SIZE + 2 * len]);
        plan
    }
}

impl Default for MaskList {
    fn default() -> Self {
        Self::new()
    }
}

/// Saved channel plan, in the shape of the device's region family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelPlan {
    /// EU-like plan
    FrequencyList(FrequencyList),
    /// US-like or CN490 plan
    MaskList(MaskList),
}

impl ChannelPlan {
    /// Empty plan of the given kind
    pub fn empty(kind: ChannelPlanKind) -> Self {
        match kind {
            ChannelPlanKind::FrequencyList => ChannelPlan::FrequencyList(FrequencyList::new()),
            ChannelPlanKind::MaskList => ChannelPlan::MaskList(MaskList::new()),
            ChannelPlanKind::WideMaskList => ChannelPlan::MaskList(MaskList::new_wide()),
        }
    }

    /// Header kind tag
    pub fn kind(&self) -> ChannelPlanKind {
        match self {
            ChannelPlan::FrequencyList(_) => ChannelPlanKind::FrequencyList,
            ChannelPlan::MaskList(m) => m.kind(),
        }
    }

    /// Header size field: the exact encoded size of this variant
    pub fn size(&self) -> usize {
        match self {
            ChannelPlan::FrequencyList(_) => FrequencyList::SIZE,
            ChannelPlan::MaskList(m) => m.size(),
        }
    }

    /// Whether a channel is enabled
    pub fn is_enabled(&self, channel: usize) -> bool {
        match self {
            ChannelPlan::FrequencyList(f) => f.is_enabled(channel),
            ChannelPlan::MaskList(m) => m.is_enabled(channel),
        }
    }

    /// Set a channel's enable bit, returning the previous value
    pub fn enable(&mut self, channel: usize, enable: bool) -> bool {
        match self {
            ChannelPlan::FrequencyList(f) => f.enable(channel, enable),
            ChannelPlan::MaskList(m) => m.enable(channel, enable),
        }
    }

    /// Zero all channel and band storage; the kind is kept
    pub fn clear_all(&mut self) {
        match self {
            ChannelPlan::FrequencyList(f) => f.clear_all(),
            ChannelPlan::MaskList(m) => m.clear_all(),
        }
    }

    /// Encode into the fixed-size snapshot area. Bytes past the variant's
    /// size are zero.
    pub fn encode(&self) -> [u8; CHANNEL_PLAN_AREA_SIZE] {
        let mut out = [0u8; CHANNEL_PLAN_AREA_SIZE];
        out[0] = self.kind() as u8;
        out[1] = self.size() as u8;
        match self {
            ChannelPlan::FrequencyList(f) => f.encode_body(&mut out),
            ChannelPlan::MaskList(m) => m.encode_body(&mut out),
        }
        out
    }

    /// Decode the snapshot area, checking the header kind and size
    pub fn decode(raw: &[u8]) -> Result<Self, FormatError> {
        if raw.len() < CHANNEL_PLAN_AREA_SIZE {
            return Err(FormatError::Truncated);
        }
        let kind = ChannelPlanKind::from_tag(raw[0]).ok_or(FormatError::ChannelPlanTag(raw[0]))?;
        let plan = match kind {
            ChannelPlanKind::FrequencyList => {
                ChannelPlan::FrequencyList(FrequencyList::decode_body(raw))
            }
            _ => ChannelPlan::MaskList(MaskList::decode_body(kind, raw)),
        };
        let expected = plan.size();
        if raw[1] as usize != expected {
            return Err(FormatError::ChannelPlanSize {
                expected,
                found: raw[1] as usize,
            });
        }
        Ok(plan)
    }
}

pub(crate) fn read_u16(raw: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([raw[off], raw[off + 1]])
}

pub(crate) fn read_u32(raw: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([raw[off], raw[off + 1], raw[off + 2], raw[off + 3]])
}

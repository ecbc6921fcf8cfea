//! Session state snapshots
//!
//! A snapshot carries every piece of MAC state that must survive a power
//! cycle to keep a session alive without rejoining: frame counters, data
//! rate and power, receive window settings, duty-cycle timers and the
//! channel plan. Timers are stored relative to the moment the snapshot was
//! taken, since the engine clock restarts at boot.
//!
//! The V1 layout is 216 bytes, little-endian, with the channel plan area at
//! offset 44. A blob is only decoded if its tag, its size and the channel
//! plan header all agree with the layout.

use super::channels::{read_u16, read_u32, ChannelPlan, CHANNEL_PLAN_AREA_SIZE};
use super::store::StateBlob;
use super::FormatError;
use crate::lorawan::region::{CountryCode, Region};

/// Size of a V1 snapshot
pub const SESSION_STATE_SIZE: usize = 216;

const TAG_NULL: u8 = 0x00;
const TAG_V1: u8 = 0x01;
const OFF_CHANNELS: usize = 44;

/// Version 1 snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStateV1 {
    /// Region the snapshot was taken in
    pub region: Region,
    /// Country variant the snapshot was taken in
    pub country: CountryCode,
    /// Uplink data rate
    pub link_dr: u8,
    /// Uplink frame counter
    pub fcnt_up: u32,
    /// Downlink frame counter
    pub fcnt_down: u32,
    /// Reserved for GPS time correlation, always zero
    pub gps_time: u32,
    /// Ticks until the global duty cycle allows an uplink
    pub global_avail: u32,
    /// RX2 frequency in Hz
    pub rx2_frequency: u32,
    /// Class B ping slot frequency in Hz
    pub ping_frequency: u32,
    /// ADR acknowledgement counter
    pub link_integrity: i16,
    /// Transmit power
    pub tx_power: i8,
    /// NbTrans
    pub redundancy: u8,
    /// Global duty cycle exponent
    pub duty_cycle: u8,
    /// RX1 data rate offset
    pub rx1_dr_offset: u8,
    /// RX2 data rate
    pub rx2_data_rate: u8,
    /// RX1 delay
    pub rx_delay: u8,
    /// TxParamSetupReq settings
    pub tx_param: u8,
    /// Class B beacon channel
    pub beacon_channel: u8,
    /// Class B ping slot data rate
    pub ping_dr: u8,
    /// Pending RXParamSetupAns
    pub rx_param_ans: u8,
    /// Pending DlChannelAns
    pub dl_channel_ans: u8,
    /// Pending RXTimingSetupAns
    pub rx_timing_setup_ans: u8,
    /// Channel plan
    pub channels: ChannelPlan,
}

impl SessionStateV1 {
    /// Snapshot with zeroed link state and an empty channel plan
    pub fn new(region: Region, country: CountryCode, channels: ChannelPlan) -> Self {
        Self {
            region,
            country,
            link_dr: 0,
            fcnt_up: 0,
            fcnt_down: 0,
            gps_time: 0,
            global_avail: 0,
            rx2_frequency: 0,
            ping_frequency: 0,
            link_integrity: 0,
            tx_power: 0,
            redundancy: 0,
            duty_cycle: 0,
            rx1_dr_offset: 0,
            rx2_data_rate: 0,
            rx_delay: 0,
            tx_param: 0,
            beacon_channel: 0,
            ping_dr: 0,
            rx_param_ans: 0,
            dl_channel_ans: 0,
            rx_timing_setup_ans: 0,
            channels,
        }
    }

    /// Encode to the 216-byte layout
    pub fn encode(&self) -> [u8; SESSION_STATE_SIZE] {
        let mut raw = [0u8; SESSION_STATE_SIZE];
        raw[0] = TAG_V1;
        raw[1] = SESSION_STATE_SIZE as u8;
        raw[2] = self.region.code();
        raw[3] = self.link_dr;
        raw[4..8].copy_from_slice(&self.fcnt_up.to_le_bytes());
        raw[8..12].copy_from_slice(&self.fcnt_down.to_le_bytes());
        raw[12..16].copy_from_slice(&self.gps_time.to_le_bytes());
        raw[16..20].copy_from_slice(&self.global_avail.to_le_bytes());
        raw[20..24].copy_from_slice(&self.rx2_frequency.to_le_bytes());
        raw[24..28].copy_from_slice(&self.ping_frequency.to_le_bytes());
        raw[28..30].copy_from_slice(&self.country.raw().to_le_bytes());
        raw[30..32].copy_from_slice(&self.link_integrity.to_le_bytes());
        raw[32] = self.tx_power as u8;
        raw[33] = self.redundancy;
        raw[34] = self.duty_cycle;
        raw[35] = self.rx1_dr_offset;
        raw[36] = self.rx2_data_rate;
        raw[37] = self.rx_delay;
        raw[38] = self.tx_param;
        raw[39] = self.beacon_channel;
        raw[40] = self.ping_dr;
        raw[41] = self.rx_param_ans;
        raw[42] = self.dl_channel_ans;
        raw[43] = self.rx_timing_setup_ans;
        raw[OFF_CHANNELS..].copy_from_slice(&self.channels.encode());
        raw
    }

    fn decode_body(raw: &[u8]) -> Result<Self, FormatError> {
        let area = &raw[OFF_CHANNELS..OFF_CHANNELS + CHANNEL_PLAN_AREA_SIZE];
        let channels = ChannelPlan::decode(area)?;
        Ok(Self {
            region: Region::from_code(raw[2]),
            country: CountryCode::from_raw(read_u16(raw, 28)),
            link_dr: raw[3],
            fcnt_up: read_u32(raw, 4),
            fcnt_down: read_u32(raw, 8),
            gps_time: read_u32(raw, 12),
            global_avail: read_u32(raw, 16),
            rx2_frequency: read_u32(raw, 20),
            ping_frequency: read_u32(raw, 24),
            link_integrity: read_u16(raw, 30) as i16,
            tx_power: raw[32] as i8,
            redundancy: raw[33],
            duty_cycle: raw[34],
            rx1_dr_offset: raw[35],
            rx2_data_rate: raw[36],
            rx_delay: raw[37],
            tx_param: raw[38],
            beacon_channel: raw[39],
            ping_dr: raw[40],
            rx_param_ans: raw[41],
            dl_channel_ans: raw[42],
            rx_timing_setup_ans: raw[43],
            channels,
        })
    }
}

/// Versioned session state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No state
    #[default]
    Null,
    /// Version 1 snapshot
    V1(SessionStateV1),
}

impl SessionState {
    /// True for a structurally valid snapshot. Whether its channel plan
    /// fits the device's region is checked by
    /// [`is_applicable`](crate::session::snapshot::is_applicable).
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionState::V1(_))
    }

    /// The V1 snapshot, if any
    pub fn as_v1(&self) -> Option<&SessionStateV1> {
        match self {
            SessionState::V1(v1) => Some(v1),
            SessionState::Null => None,
        }
    }

    /// Encode for storage. `Null` encodes to an empty blob.
    pub fn encode(&self) -> StateBlob {
        match self {
            SessionState::V1(v1) => StateBlob::from_slice(&v1.encode()).unwrap_or_default(),
            SessionState::Null => StateBlob::new(),
        }
    }

    /// Decode a stored blob. An empty blob or a `Null` tag yields `Null`.
    pub fn decode(raw: &[u8]) -> Result<Self, FormatError> {
        match raw.first() {
            None | Some(&TAG_NULL) => return Ok(SessionState::Null),
            Some(&TAG_V1) => {}
            Some(&tag) => return Err(FormatError::UnknownTag(tag)),
        }
        if raw.len() < 2 {
            return Err(FormatError::Truncated);
        }
        if raw[1] as usize != SESSION_STATE_SIZE {
            return Err(FormatError::SizeMismatch {
                expected: SESSION_STATE_SIZE,
                found: raw[1] as usize,
            });
        }
        if raw.len() < SESSION_STATE_SIZE {
            return Err(FormatError::Truncated);
        }
        SessionStateV1::decode_body(raw).map(SessionState::V1)
    }
}

/// Structural check of a stored blob: a V1 tag, the exact V1 size and a
/// well-formed channel plan
pub fn is_valid(raw: &[u8]) -> bool {
    matches!(SessionState::decode(raw), Ok(SessionState::V1(_)))
}

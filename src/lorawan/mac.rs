//! MAC engine seam
//!
//! The LoRaWAN MAC/PHY engine (framing, encryption, timing, radio control)
//! lives outside this crate. [`MacEngine`] is the narrow set of accessors and
//! mutators the session manager needs to capture and reapply session state,
//! plus a non-blocking event poll that drives the service loop.

use crate::config::device::{AESKey, DevAddr};

/// Engine time in ticks. Signed and wrapping, like the engine's own clock.
pub type OsTime = i32;

/// `LinkState::adr_ack_req` value meaning link-check mode is off
pub const LINK_CHECK_OFF: i16 = -128;

/// Maximum number of frequency-list channels the engine can expose
pub const MAX_FREQUENCY_CHANNELS: usize = 16;

/// Maximum number of duty-cycle bands the engine can expose
pub const MAX_BANDS: usize = 4;

/// Notification from the MAC engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacEvent {
    /// Beacon scan timed out
    ScanTimeout,
    /// Beacon found during scan
    BeaconFound,
    /// Expected beacon was not received
    BeaconMissed,
    /// Beacon received while tracking
    BeaconTracked,
    /// Join procedure started
    Joining,
    /// Join accept received, session established
    Joined,
    /// Join attempt failed
    JoinFailed,
    /// Rejoin after link loss failed
    RejoinFailed,
    /// Uplink done, receive windows closed
    TxComplete {
        /// False if a confirmed uplink was not acknowledged
        success: bool,
    },
    /// Beacon time sync lost
    LostTsync,
    /// MAC was reset (frame counter rollover)
    Reset,
    /// Downlink received outside the class A windows
    RxComplete,
    /// No downlink seen for too long
    LinkDead,
    /// Downlink seen again after `LinkDead`
    LinkAlive,
    /// Beacon scan found a beacon
    ScanFound,
    /// Radio started transmitting
    TxStart,
    /// Pending uplink was dropped
    TxCanceled,
    /// Receive window opened
    RxStart,
    /// Join request sent
    JoinTxComplete,
}

impl MacEvent {
    /// Upper-case event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            MacEvent::ScanTimeout => "SCAN_TIMEOUT",
            MacEvent::BeaconFound => "BEACON_FOUND",
            MacEvent::BeaconMissed => "BEACON_MISSED",
            MacEvent::BeaconTracked => "BEACON_TRACKED",
            MacEvent::Joining => "JOINING",
            MacEvent::Joined => "JOINED",
            MacEvent::JoinFailed => "JOIN_FAILED",
            MacEvent::RejoinFailed => "REJOIN_FAILED",
            MacEvent::TxComplete { .. } => "TXCOMPLETE",
            MacEvent::LostTsync => "LOST_TSYNC",
            MacEvent::Reset => "RESET",
            MacEvent::RxComplete => "RXCOMPLETE",
            MacEvent::LinkDead => "LINK_DEAD",
            MacEvent::LinkAlive => "LINK_ALIVE",
            MacEvent::ScanFound => "SCAN_FOUND",
            MacEvent::TxStart => "TXSTART",
            MacEvent::TxCanceled => "TXCANCELED",
            MacEvent::RxStart => "RXSTART",
            MacEvent::JoinTxComplete => "JOIN_TXCOMPLETE",
        }
    }
}

/// Session identity and keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionKeys {
    /// Network ID
    pub net_id: u32,
    /// Device address
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_skey: AESKey,
    /// Application session key
    pub app_skey: AESKey,
}

/// Scalar MAC state that survives a power cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkState {
    /// Current uplink data rate
    pub data_rate: u8,
    /// Uplink frame counter
    pub fcnt_up: u32,
    /// Downlink frame counter
    pub fcnt_down: u32,
    /// Absolute time at which the global duty cycle allows the next uplink
    pub global_duty_avail: OsTime,
    /// Global duty cycle exponent (1/2^n)
    pub global_duty_rate: u8,
    /// RX2 frequency in Hz
    pub rx2_frequency: u32,
    /// RX2 data rate
    pub rx2_data_rate: u8,
    /// Class B ping slot frequency in Hz
    pub ping_frequency: u32,
    /// Class B ping slot data rate
    pub ping_data_rate: u8,
    /// ADR acknowledgement counter, `LINK_CHECK_OFF` when disabled
    pub adr_ack_req: i16,
    /// Transmit power selected by ADR, dBm
    pub tx_power: i8,
    /// NbTrans, in bits 3:0
    pub redundancy: u8,
    /// RX1 data rate offset
    pub rx1_dr_offset: u8,
    /// RX1 delay in seconds
    pub rx_delay: u8,
    /// TxParamSetupReq settings
    pub tx_param: u8,
    /// Class B beacon channel
    pub beacon_channel: u8,
    /// Pending RXParamSetupAns
    pub rx_param_ans: u8,
    /// Pending DlChannelAns
    pub dl_channel_ans: u8,
    /// Pending RXTimingSetupAns
    pub rx_timing_setup_ans: u8,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            data_rate: 0,
            fcnt_up: 0,
            fcnt_down: 0,
            global_duty_avail: 0,
            global_duty_rate: 0,
            rx2_frequency: 0,
            rx2_data_rate: 0,
            ping_frequency: 0,
            ping_data_rate: 0,
            adr_ack_req: LINK_CHECK_OFF,
            tx_power: 0,
            redundancy: 0,
            rx1_dr_offset: 0,
            rx_delay: 1,
            tx_param: 0,
            beacon_channel: 0,
            rx_param_ans: 0,
            dl_channel_ans: 0,
            rx_timing_setup_ans: 0,
        }
    }
}

/// Frequency-list channel definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Uplink frequency in Hz, zero if the channel is undefined
    pub uplink_frequency: u32,
    /// Downlink frequency in Hz, zero to follow the uplink
    pub downlink_frequency: u32,
    /// One bit per allowed data rate
    pub dr_map: u16,
    /// Duty-cycle band, 0..=3
    pub band: u8,
}

/// Duty-cycle band state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandState {
    /// Duty cycle limit, 1/tx_cap
    pub tx_cap: u16,
    /// Maximum transmit power in this band
    pub tx_power: u8,
    /// Last channel used in this band
    pub last_channel: u8,
    /// Absolute time at which the band is available again
    pub avail: OsTime,
}

/// Received application data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downlink<'a> {
    /// FPort, zero when the frame carried no port
    pub port: u8,
    /// Decrypted payload
    pub payload: &'a [u8],
}

/// LoRaWAN MAC/PHY engine interface
pub trait MacEngine {
    /// Error type for engine operations
    type Error;

    /// Current engine time
    fn now(&self) -> OsTime;

    /// Reset the MAC. Session and pending transfers are discarded and the
    /// region default channel plan is reinstated.
    fn reset(&mut self);

    /// Stop the MAC and power down the radio
    fn shutdown(&mut self);

    /// Run the engine once; returns the next event if one is ready
    fn poll_event(&mut self) -> nb::Result<MacEvent, Self::Error>;

    /// Scalar link state
    fn link(&self) -> &LinkState;

    /// Mutable scalar link state
    fn link_mut(&mut self) -> &mut LinkState;

    /// Session identity and keys
    fn session_keys(&self) -> SessionKeys;

    /// Install session identity and keys (ABP or restored session)
    fn set_session(&mut self, keys: &SessionKeys);

    /// Number of channels the engine manages
    fn channel_count(&self) -> usize;

    /// Whether a channel is enabled
    fn is_channel_enabled(&self, channel: usize) -> bool;

    /// Enable a channel; false if the channel cannot be enabled
    fn enable_channel(&mut self, channel: usize) -> bool;

    /// Disable a channel; false if the channel cannot be disabled
    fn disable_channel(&mut self, channel: usize) -> bool;

    /// Channel definition (frequency-list regions only)
    fn channel(&self, channel: usize) -> Option<ChannelConfig>;

    /// Define a channel (frequency-list regions only). A zero uplink
    /// frequency undefines the channel.
    fn setup_channel(&mut self, channel: usize, config: &ChannelConfig) -> bool;

    /// Channel re-use shuffle bitmap, little-endian bytes
    fn shuffle_map(&self) -> &[u8];

    /// Replace the channel re-use shuffle bitmap
    fn set_shuffle_map(&mut self, map: &[u8]);

    /// Number of duty-cycle bands (frequency-list regions only)
    fn band_count(&self) -> usize;

    /// Band state
    fn band(&self, band: usize) -> Option<BandState>;

    /// Replace band state
    fn set_band(&mut self, band: usize, state: &BandState);

    /// Restrict a US-like plan to one sub-band; false where unsupported
    fn select_sub_band(&mut self, sub_band: u8) -> bool;

    /// Set uplink data rate and transmit power
    fn set_dr_txpow(&mut self, data_rate: u8, tx_power: i8);

    /// Enable or disable link-check mode
    fn set_link_check_mode(&mut self, enabled: bool);

    /// Start an OTAA join
    fn start_joining(&mut self) -> bool;

    /// True while a transmit/receive cycle is in progress
    fn tx_rx_pending(&self) -> bool;

    /// Queue an uplink
    fn set_tx_data(&mut self, port: u8, data: &[u8], confirmed: bool) -> Result<(), Self::Error>;

    /// Application data from the last receive, if any
    fn downlink(&self) -> Option<Downlink<'_>>;
}

use heapless::{Deque, Vec};
use lorawan_session::{
    config::device::ProvisioningInfo,
    lorawan::mac::{
        BandState, ChannelConfig, Downlink, LinkState, MacEngine, MacEvent, OsTime, SessionKeys,
        LINK_CHECK_OFF,
    },
    session::store::{AuxBlob, InfoBlob, SessionStore, StateBlob},
};

/// Mock MAC error type
#[derive(Debug, PartialEq)]
pub enum MockError {
    /// Uplink refused by the engine
    Rejected,
}

/// Channel model of the mock engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Plan {
    /// 16 defined channels, 4 duty-cycle bands
    EuLike,
    /// 64 + 8 fixed channels
    UsLike,
    /// 96 fixed channels
    CnLike,
}

const EU_CHANNELS: usize = 16;
const US_CHANNELS: usize = 72;
const CN_CHANNELS: usize = 96;
const SHUFFLE_BYTES: usize = 12;

/// Mock MAC engine for testing
pub struct MockMac {
    pub plan: Plan,
    pub now: OsTime,
    pub link: LinkState,
    pub keys: SessionKeys,
    pub channels: [ChannelConfig; EU_CHANNELS],
    pub enabled: [bool; CN_CHANNELS],
    pub shuffle: [u8; SHUFFLE_BYTES],
    pub bands: [BandState; 4],
    pub events: Deque<MacEvent, 16>,
    pub busy: bool,
    pub fail_tx: bool,
    pub resets: u32,
    pub joins_started: u32,
    pub sub_band: Option<u8>,
    pub last_tx: Option<(u8, Vec<u8, 256>, bool)>,
    pub rx: Option<(u8, Vec<u8, 64>)>,
}

impl MockMac {
    /// Engine with an EU868-like default plan
    pub fn eu_like() -> Self {
        Self::with_plan(Plan::EuLike)
    }

    /// Engine with a US915-like default plan
    pub fn us_like() -> Self {
        Self::with_plan(Plan::UsLike)
    }

    /// Engine with a CN490-like default plan
    pub fn cn_like() -> Self {
        Self::with_plan(Plan::CnLike)
    }

    fn with_plan(plan: Plan) -> Self {
        let mut mac = Self {
            plan,
            now: 0,
            link: LinkState::default(),
            keys: SessionKeys::default(),
            channels: [ChannelConfig::default(); EU_CHANNELS],
            enabled: [false; CN_CHANNELS],
            shuffle: [0; SHUFFLE_BYTES],
            bands: [BandState::default(); 4],
            events: Deque::new(),
            busy: false,
            fail_tx: false,
            resets: 0,
            joins_started: 0,
            sub_band: None,
            last_tx: None,
            rx: None,
        };
        mac.load_defaults();
        mac
    }

    fn load_defaults(&mut self) {
        self.link = LinkState::default();
        self.keys = SessionKeys::default();
        self.channels = [ChannelConfig::default(); EU_CHANNELS];
        self.enabled = [false; CN_CHANNELS];
        self.shuffle = [0; SHUFFLE_BYTES];
        self.bands = [BandState::default(); 4];
        self.sub_band = None;
        match self.plan {
            Plan::EuLike => {
                // the three join channels are fixed by the region
                for (ch, freq) in [868_100_000, 868_300_000, 868_500_000].into_iter().enumerate() {
                    self.channels[ch] = ChannelConfig {
                        uplink_frequency: freq,
                        downlink_frequency: 0,
                        dr_map: 0x003F,
                        band: 1,
                    };
                    self.enabled[ch] = true;
                }
                self.bands[0] = BandState { tx_cap: 100, tx_power: 14, last_channel: 0, avail: 0 };
                self.bands[1] = BandState { tx_cap: 100, tx_power: 14, last_channel: 0, avail: 0 };
                self.bands[2] = BandState { tx_cap: 1000, tx_power: 14, last_channel: 0, avail: 0 };
                self.bands[3] = BandState { tx_cap: 10, tx_power: 27, last_channel: 0, avail: 0 };
                self.link.rx2_frequency = 869_525_000;
            }
            Plan::UsLike => {
                self.enabled[..US_CHANNELS].fill(true);
                self.link.rx2_frequency = 923_300_000;
                self.link.rx2_data_rate = 8;
            }
            Plan::CnLike => {
                self.enabled.fill(true);
                self.link.rx2_frequency = 505_300_000;
            }
        }
    }

    /// Queue an event for the next `poll_event`
    pub fn push_event(&mut self, event: MacEvent) {
        self.events.push_back(event).unwrap();
    }

    /// Finish the pending uplink and queue `TxComplete`
    pub fn complete_tx(&mut self, success: bool) {
        self.busy = false;
        self.link.fcnt_up += 1;
        self.push_event(MacEvent::TxComplete { success });
    }

    /// Make a downlink available to the next receive notification
    pub fn set_downlink(&mut self, port: u8, payload: &[u8]) {
        let mut data = Vec::new();
        data.extend_from_slice(payload).unwrap();
        self.rx = Some((port, data));
    }
}

impl MacEngine for MockMac {
    type Error = MockError;

    fn now(&self) -> OsTime {
        self.now
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.busy = false;
        self.events.clear();
        self.load_defaults();
    }

    fn shutdown(&mut self) {
        self.busy = false;
    }

    fn poll_event(&mut self) -> nb::Result<MacEvent, Self::Error> {
        self.events.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn link(&self) -> &LinkState {
        &self.link
    }

    fn link_mut(&mut self) -> &mut LinkState {
        &mut self.link
    }

    fn session_keys(&self) -> SessionKeys {
        self.keys
    }

    fn set_session(&mut self, keys: &SessionKeys) {
        self.keys = *keys;
        // like the real engines, a new session restarts the counters
        self.link.fcnt_up = 0;
        self.link.fcnt_down = 0;
    }

    fn channel_count(&self) -> usize {
        match self.plan {
            Plan::EuLike => EU_CHANNELS,
            Plan::UsLike => US_CHANNELS,
            Plan::CnLike => CN_CHANNELS,
        }
    }

    fn is_channel_enabled(&self, channel: usize) -> bool {
        match self.plan {
            Plan::EuLike => {
                channel < EU_CHANNELS
                    && self.enabled[channel]
                    && self.channels[channel].uplink_frequency != 0
            }
            _ => channel < self.channel_count() && self.enabled[channel],
        }
    }

    fn enable_channel(&mut self, channel: usize) -> bool {
        match self.plan {
            Plan::EuLike if channel < EU_CHANNELS => {
                if self.channels[channel].uplink_frequency == 0 {
                    return false;
                }
                self.enabled[channel] = true;
                true
            }
            Plan::EuLike => false,
            _ if channel < self.channel_count() => {
                self.enabled[channel] = true;
                true
            }
            _ => false,
        }
    }

    fn disable_channel(&mut self, channel: usize) -> bool {
        if channel >= self.channel_count() {
            return false;
        }
        self.enabled[channel] = false;
        true
    }

    fn channel(&self, channel: usize) -> Option<ChannelConfig> {
        match self.plan {
            Plan::EuLike if channel < EU_CHANNELS => Some(self.channels[channel]),
            _ => None,
        }
    }

    fn setup_channel(&mut self, channel: usize, config: &ChannelConfig) -> bool {
        match self.plan {
            Plan::EuLike if channel < EU_CHANNELS => {
                self.channels[channel] = *config;
                self.enabled[channel] = config.uplink_frequency != 0;
                true
            }
            _ => false,
        }
    }

    fn shuffle_map(&self) -> &[u8] {
        match self.plan {
            Plan::EuLike => &self.shuffle[..2],
            Plan::UsLike => &self.shuffle[..10],
            Plan::CnLike => &self.shuffle[..],
        }
    }

    fn set_shuffle_map(&mut self, map: &[u8]) {
        let len = self.shuffle_map().len().min(map.len());
        self.shuffle[..len].copy_from_slice(&map[..len]);
    }

    fn band_count(&self) -> usize {
        match self.plan {
            Plan::EuLike => 4,
            _ => 0,
        }
    }

    fn band(&self, band: usize) -> Option<BandState> {
        if band < self.band_count() {
            Some(self.bands[band])
        } else {
            None
        }
    }

    fn set_band(&mut self, band: usize, state: &BandState) {
        if band < self.band_count() {
            self.bands[band] = *state;
        }
    }

    fn select_sub_band(&mut self, sub_band: u8) -> bool {
        if self.plan != Plan::UsLike || sub_band > 7 {
            return false;
        }
        self.sub_band = Some(sub_band);
        // enable only the 125 kHz channels of the sub-band and its 500 kHz channel
        for (i, enabled) in self.enabled[..US_CHANNELS].iter_mut().enumerate() {
            *enabled = if i < 64 {
                (i / 8) as u8 == sub_band
            } else {
                (i - 64) as u8 == sub_band
            };
        }
        true
    }

    fn set_dr_txpow(&mut self, data_rate: u8, tx_power: i8) {
        self.link.data_rate = data_rate;
        self.link.tx_power = tx_power;
    }

    fn set_link_check_mode(&mut self, enabled: bool) {
        self.link.adr_ack_req = if enabled { 0 } else { LINK_CHECK_OFF };
    }

    fn start_joining(&mut self) -> bool {
        self.joins_started += 1;
        true
    }

    fn tx_rx_pending(&self) -> bool {
        self.busy
    }

    fn set_tx_data(&mut self, port: u8, data: &[u8], confirmed: bool) -> Result<(), Self::Error> {
        if self.fail_tx {
            return Err(MockError::Rejected);
        }
        let mut payload = Vec::new();
        payload.extend_from_slice(data).map_err(|_| MockError::Rejected)?;
        self.last_tx = Some((port, payload, confirmed));
        self.busy = true;
        Ok(())
    }

    fn downlink(&self) -> Option<Downlink<'_>> {
        self.rx.as_ref().map(|(port, payload)| Downlink {
            port: *port,
            payload: payload.as_slice(),
        })
    }
}

/// In-memory store that counts writes and records callbacks
pub struct MemoryStore {
    pub provisioning: ProvisioningInfo,
    pub state: Option<StateBlob>,
    pub info: Option<InfoBlob>,
    pub aux: AuxBlob,
    pub state_writes: u32,
    pub info_writes: u32,
    pub read_only: bool,
    pub send_results: Vec<bool, 8>,
    pub received: Vec<(u8, Vec<u8, 64>), 4>,
    pub events: Vec<MacEvent, 32>,
}

impl MemoryStore {
    /// Empty store with the given provisioning
    pub fn new(provisioning: ProvisioningInfo) -> Self {
        Self {
            provisioning,
            state: None,
            info: None,
            aux: AuxBlob::new(),
            state_writes: 0,
            info_writes: 0,
            read_only: false,
            send_results: Vec::new(),
            received: Vec::new(),
            events: Vec::new(),
        }
    }

    /// OTAA-provisioned empty store
    pub fn otaa() -> Self {
        Self::new(ProvisioningInfo::new_otaa([0x01; 8], [0x02; 8], [0x03; 16]))
    }

    /// ABP-provisioned empty store
    pub fn abp() -> Self {
        Self::new(ProvisioningInfo::new_abp(
            0x13,
            [0x26, 0x01, 0x1B, 0xDA],
            [0x11; 16],
            [0x22; 16],
        ))
    }
}

impl SessionStore for MemoryStore {
    fn load_provisioning(&mut self) -> ProvisioningInfo {
        self.provisioning.clone()
    }

    fn load_session_state(&mut self) -> Option<StateBlob> {
        self.state.clone()
    }

    fn save_session_state(&mut self, state: &[u8]) -> bool {
        if self.read_only {
            return false;
        }
        let mut blob = StateBlob::new();
        if blob.extend_from_slice(state).is_err() {
            return false;
        }
        self.state = Some(blob);
        self.state_writes += 1;
        true
    }

    fn load_session_info(&mut self, aux: &mut AuxBlob) -> Option<InfoBlob> {
        aux.clear();
        aux.extend_from_slice(&self.aux).ok()?;
        self.info.clone()
    }

    fn save_session_info(&mut self, info: &[u8], aux: &[u8]) -> bool {
        if self.read_only {
            return false;
        }
        let mut blob = InfoBlob::new();
        if blob.extend_from_slice(info).is_err() {
            return false;
        }
        self.aux.clear();
        if self.aux.extend_from_slice(aux).is_err() {
            return false;
        }
        self.info = Some(blob);
        self.info_writes += 1;
        true
    }
}

/// Transmit-done callback recording the result
pub fn record_send(store: &mut MemoryStore, success: bool) {
    store.send_results.push(success).unwrap();
}

/// Receive callback recording port and payload
pub fn record_receive(store: &mut MemoryStore, port: u8, payload: &[u8]) {
    let mut data = Vec::new();
    data.extend_from_slice(payload).unwrap();
    store.received.push((port, data)).unwrap();
}

/// Listener recording every event
pub fn record_event(store: &mut MemoryStore, event: &MacEvent) {
    store.events.push(*event).unwrap();
}

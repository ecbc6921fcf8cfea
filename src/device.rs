//! Session manager
//!
//! [`SessionManager`] owns the MAC engine and the host store and ties them
//! together:
//! - Startup: restore a saved session, or bootstrap the region and activate
//! - Service loop: poll the engine and process its events
//! - Persistence: save session state whenever it may have moved, skipping
//!   writes when nothing changed
//! - Plumbing: queue uplinks, hand downlinks and events to the host
//!
//! Host callbacks are plain function pointers that receive the store, so
//! the host keeps its own state in its [`SessionStore`] implementation.

use heapless::Vec;
use log::{debug, info, trace, warn};

use crate::{
    config::device::{ProvisioningInfo, ProvisioningStyle, SessionConfig},
    lorawan::{
        mac::{MacEngine, MacEvent, OsTime, SessionKeys, LINK_CHECK_OFF},
        network::NetworkProfile,
    },
    session::{
        info::SessionInfo,
        snapshot,
        state::SessionState,
        store::{AuxBlob, SessionStore, MAX_AUX_SIZE},
    },
};

/// Maximum number of event listeners
pub const MAX_LISTENERS: usize = 4;

/// Largest application payload accepted for transmission
pub const MAX_PAYLOAD_SIZE: usize = 242;

/// Transmit completion callback; the flag is false if the uplink failed,
/// was rejected or was canceled
pub type SendDoneFn<S> = fn(&mut S, bool);

/// Downlink callback with port and payload
pub type ReceiveFn<S> = fn(&mut S, u8, &[u8]);

/// Event listener callback
pub type ListenerFn<S> = fn(&mut S, &MacEvent);

/// Why `begin` could not start the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BeginError {
    /// The store has no ABP or OTAA provisioning
    NotProvisioned,
    /// The configured region has no channel plan
    UnsupportedRegion,
}

/// Transmit error type
#[derive(Debug)]
pub enum SendError<E> {
    /// A transmit is already pending or the engine is busy
    Busy,
    /// Payload exceeds [`MAX_PAYLOAD_SIZE`]
    TooLarge,
    /// MAC engine error
    Mac(E),
}

impl<E> From<E> for SendError<E> {
    fn from(error: E) -> Self {
        SendError::Mac(error)
    }
}

/// How the session was established by `begin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activation {
    /// A saved session was restored; no join needed
    Restored,
    /// A fresh ABP session was installed
    Abp,
    /// An OTAA join was started
    Joining,
}

/// Owner of the MAC engine, the host store and the saved-state cache
pub struct SessionManager<M: MacEngine, S: SessionStore> {
    mac: M,
    store: S,
    config: SessionConfig,
    profile: NetworkProfile<M>,
    style: ProvisioningStyle,
    /// Last snapshot applied or written
    saved_state: SessionState,
    info_extra: AuxBlob,
    tx_pending: bool,
    send_done: Option<SendDoneFn<S>>,
    receive: Option<ReceiveFn<S>>,
    listeners: Vec<ListenerFn<S>, MAX_LISTENERS>,
}

impl<M: MacEngine, S: SessionStore> SessionManager<M, S> {
    /// Create a session manager using the network profile for `config`
    pub fn new(mac: M, store: S, config: SessionConfig) -> Self {
        let profile = NetworkProfile::select(&config);
        Self::with_profile(mac, store, config, profile)
    }

    /// Create a session manager with custom bootstrap hooks
    pub fn with_profile(
        mac: M,
        store: S,
        config: SessionConfig,
        profile: NetworkProfile<M>,
    ) -> Self {
        Self {
            mac,
            store,
            config,
            profile,
            style: ProvisioningStyle::None,
            saved_state: SessionState::Null,
            info_extra: AuxBlob::new(),
            tx_pending: false,
            send_done: None,
            receive: None,
            listeners: Vec::new(),
        }
    }

    /// Start the device: restore the saved session if there is an
    /// applicable one, otherwise bootstrap the region and activate from the
    /// provisioning info.
    pub fn begin(&mut self) -> Result<Activation, BeginError> {
        if self.config.region.channel_plan().is_none() {
            return Err(BeginError::UnsupportedRegion);
        }
        info!(
            "begin: network {} region {}",
            self.config.network,
            self.config.region_name()
        );

        self.mac.reset();
        // also picks up the auxiliary bytes saved with it
        let stored_info = self.load_session_info();
        let restored = self.restore_session_state();
        if !restored {
            self.region_init();
        }

        let provisioning = self.store.load_provisioning();
        self.style = provisioning.style();
        if !provisioning.is_provisioned() {
            warn!("device is not provisioned");
            return Err(BeginError::NotProvisioned);
        }

        if restored {
            let keys = stored_info
                .and_then(|info| info.keys())
                .or_else(|| abp_keys(&provisioning));
            match keys {
                Some(keys) => {
                    let link = self.mac.link();
                    let (fcnt_up, fcnt_down) = (link.fcnt_up, link.fcnt_down);
                    self.mac.set_session(&keys);
                    let link = self.mac.link_mut();
                    link.fcnt_up = fcnt_up;
                    link.fcnt_down = fcnt_down;
                    info!("session restored, FCntUp {} FCntDown {}", fcnt_up, fcnt_down);
                    return Ok(Activation::Restored);
                }
                None => {
                    warn!("saved state has no session keys, starting over");
                    self.mac.reset();
                    self.saved_state = SessionState::Null;
                    self.region_init();
                }
            }
        }

        match provisioning {
            ProvisioningInfo::Abp(abp) => {
                self.mac.set_session(&SessionKeys {
                    net_id: abp.net_id,
                    dev_addr: abp.dev_addr,
                    nwk_skey: abp.nwk_skey,
                    app_skey: abp.app_skey,
                });
                let link = self.mac.link_mut();
                link.fcnt_up = abp.fcnt_up;
                link.fcnt_down = abp.fcnt_down;
                (self.profile.post_join)(&mut self.mac, ProvisioningStyle::Abp);
                self.save_session_info();
                info!("ABP session installed");
                Ok(Activation::Abp)
            }
            ProvisioningInfo::Otaa(_) => {
                if !self.mac.start_joining() {
                    debug!("join already in progress");
                }
                Ok(Activation::Joining)
            }
            ProvisioningInfo::None => Err(BeginError::NotProvisioned),
        }
    }

    /// Run the engine once and process the event it reports, if any
    pub fn service(&mut self) -> Result<Option<MacEvent>, M::Error> {
        match self.mac.poll_event() {
            Ok(event) => {
                self.process_event(event);
                Ok(Some(event))
            }
            Err(nb::Error::WouldBlock) => Ok(None),
            Err(nb::Error::Other(e)) => Err(e),
        }
    }

    /// Handle one MAC event: save state where it may have moved, complete
    /// transfers, then pass the event to every listener.
    pub fn process_event(&mut self, event: MacEvent) {
        debug!("EV_{}", event.name());
        self.update_fcnt_down();

        match event {
            MacEvent::Joining => {
                // the engine reset the channel plan to the region default
                self.region_init();
                self.save_session_info();
                self.save_session_state();
            }
            MacEvent::Joined => {
                (self.profile.post_join)(&mut self.mac, self.style);
                self.save_session_info();
                self.save_session_state();
            }
            MacEvent::TxComplete { success } => {
                self.save_session_state();
                self.deliver_downlink();
                self.complete_send(success);
            }
            MacEvent::TxCanceled => {
                self.save_session_state();
                self.complete_send(false);
            }
            MacEvent::RxComplete => {
                self.save_session_state();
                self.deliver_downlink();
            }
            MacEvent::Reset => {
                // frame counter rollover; OTAA devices rejoin and save again
                self.region_init();
                self.save_session_state();
            }
            _ => {}
        }

        for listener in self.listeners.iter() {
            listener(&mut self.store, &event);
        }
    }

    /// Snapshot the engine at `now`
    pub fn build_session_state(&self, now: OsTime) -> SessionState {
        snapshot::build(&self.mac, self.config.region, self.config.country, now)
    }

    /// Whether a snapshot fits this device's region and country
    pub fn is_applicable(&self, state: &SessionState) -> bool {
        snapshot::is_applicable(state, self.config.region, self.config.country)
    }

    /// Apply a snapshot to the engine, rebasing its timers on `now`. On
    /// success the snapshot becomes the saved-state cache.
    pub fn apply_session_state(&mut self, state: &SessionState, now: OsTime) -> bool {
        if !snapshot::apply(&mut self.mac, state, self.config.region, self.config.country, now) {
            debug!("session state not applicable");
            return false;
        }
        self.saved_state = state.clone();
        true
    }

    /// Load the saved session state and apply it
    pub fn restore_session_state(&mut self) -> bool {
        let Some(blob) = self.store.load_session_state() else {
            debug!("no saved session state");
            return false;
        };
        let state = match SessionState::decode(&blob) {
            Ok(state) => state,
            Err(e) => {
                warn!("saved session state rejected: {:?}", e);
                return false;
            }
        };

        if let Some(expected) = self.config.expected_net_id {
            match self.load_session_info().and_then(|info| info.net_id()) {
                Some(net_id) if net_id == expected => {}
                Some(net_id) => {
                    debug!("saved session is for NetID {:06x}, expected {:06x}", net_id, expected);
                    return false;
                }
                None => {
                    debug!("no saved session info to check NetID against");
                    return false;
                }
            }
        }

        let now = self.mac.now();
        let restored = self.apply_session_state(&state, now);
        if restored {
            info!("restored saved session state");
        }
        restored
    }

    /// Snapshot the engine and persist it if it differs from the last
    /// snapshot saved or applied. Returns true if a write happened.
    pub fn save_session_state(&mut self) -> bool {
        let state = self.build_session_state(self.mac.now());
        if !state.is_valid() {
            return false;
        }
        let blob = state.encode();
        if blob == self.saved_state.encode() {
            trace!("session state unchanged");
            return false;
        }
        if !self.store.save_session_state(&blob) {
            warn!("session state was not saved");
            return false;
        }
        debug!("session state saved");
        self.saved_state = state;
        true
    }

    /// Persist the current session identity and keys, with the auxiliary
    /// bytes set by [`set_session_info_extra`](Self::set_session_info_extra)
    pub fn save_session_info(&mut self) -> bool {
        let info = SessionInfo::build(&self.mac.session_keys());
        let saved = self.store.save_session_info(&info.encode(), &self.info_extra);
        if !saved {
            warn!("session info was not saved");
        }
        saved
    }

    /// Set the auxiliary bytes saved with session info. False if longer
    /// than [`MAX_AUX_SIZE`].
    pub fn set_session_info_extra(&mut self, extra: &[u8]) -> bool {
        if extra.len() > MAX_AUX_SIZE {
            return false;
        }
        self.info_extra.clear();
        self.info_extra.extend_from_slice(extra).is_ok()
    }

    /// Queue an uplink. `done` fires exactly once: with the result when
    /// the uplink completes or is canceled, or with false right away if it
    /// is rejected here.
    pub fn send_buffer(
        &mut self,
        data: &[u8],
        done: Option<SendDoneFn<S>>,
        confirmed: bool,
        port: u8,
    ) -> Result<(), SendError<M::Error>> {
        let result: Result<(), SendError<M::Error>> = if !self.tx_ready() {
            Err(SendError::Busy)
        } else if data.len() > MAX_PAYLOAD_SIZE {
            Err(SendError::TooLarge)
        } else {
            self.mac
                .set_tx_data(port, data, confirmed)
                .map_err(SendError::Mac)
        };

        match result {
            Ok(()) => {
                trace!("queued {} bytes on port {}", data.len(), port);
                self.tx_pending = true;
                self.send_done = done;
            }
            Err(_) => {
                if let Some(done) = done {
                    done(&mut self.store, false);
                }
            }
        }
        result
    }

    /// True if an uplink can be queued now
    pub fn tx_ready(&self) -> bool {
        !self.tx_pending && !self.mac.tx_rx_pending()
    }

    /// Set the downlink callback
    pub fn set_receive_callback(&mut self, receive: Option<ReceiveFn<S>>) {
        self.receive = receive;
    }

    /// Add an event listener. False if all slots are taken.
    pub fn register_listener(&mut self, listener: ListenerFn<S>) -> bool {
        self.listeners.push(listener).is_ok()
    }

    /// Enable or disable link-check mode, returning the previous setting
    pub fn set_link_check_mode(&mut self, enabled: bool) -> bool {
        let previous = self.mac.link().adr_ack_req != LINK_CHECK_OFF;
        self.mac.set_link_check_mode(enabled);
        previous
    }

    /// Reset the MAC. A pending uplink completes with false.
    pub fn reset(&mut self) {
        self.mac.reset();
        self.complete_send(false);
    }

    /// Shut the MAC down. A pending uplink completes with false.
    pub fn shutdown(&mut self) {
        self.mac.shutdown();
        self.complete_send(false);
    }

    /// Last snapshot saved or applied
    pub fn saved_session_state(&self) -> &SessionState {
        &self.saved_state
    }

    /// Device configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Provisioning style found by `begin`
    pub fn provisioning_style(&self) -> ProvisioningStyle {
        self.style
    }

    /// MAC engine
    pub fn mac(&self) -> &M {
        &self.mac
    }

    /// Mutable MAC engine
    pub fn mac_mut(&mut self) -> &mut M {
        &mut self.mac
    }

    /// Host store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable host store
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the engine and the store
    pub fn release(self) -> (M, S) {
        (self.mac, self.store)
    }

    fn region_init(&mut self) {
        (self.profile.region_init)(&mut self.mac, &self.config);
    }

    fn load_session_info(&mut self) -> Option<SessionInfo> {
        let mut aux = AuxBlob::new();
        let blob = self.store.load_session_info(&mut aux)?;
        if self.info_extra.is_empty() {
            self.info_extra = aux;
        }
        match SessionInfo::read(&blob) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("saved session info rejected: {:?}", e);
                None
            }
        }
    }

    /// Save state if the downlink counter moved since the last save
    fn update_fcnt_down(&mut self) {
        let fcnt_down = self.mac.link().fcnt_down;
        match &self.saved_state {
            SessionState::V1(v1) if v1.fcnt_down == fcnt_down => {}
            _ => {
                self.save_session_state();
            }
        }
    }

    fn deliver_downlink(&mut self) {
        let Some(receive) = self.receive else {
            return;
        };
        if let Some(downlink) = self.mac.downlink() {
            receive(&mut self.store, downlink.port, downlink.payload);
        }
    }

    fn complete_send(&mut self, success: bool) {
        if !self.tx_pending {
            return;
        }
        self.tx_pending = false;
        if let Some(done) = self.send_done.take() {
            done(&mut self.store, success);
        }
    }
}

fn abp_keys(provisioning: &ProvisioningInfo) -> Option<SessionKeys> {
    match provisioning {
        ProvisioningInfo::Abp(abp) => Some(SessionKeys {
            net_id: abp.net_id,
            dev_addr: abp.dev_addr,
            nwk_skey: abp.nwk_skey,
            app_skey: abp.app_skey,
        }),
        _ => None,
    }
}

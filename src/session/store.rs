//! Persistence seam
//!
//! The host owns the storage medium. The session manager only hands it
//! self-describing byte blobs and asks for them back at startup; the blobs
//! carry their own tag and size, so the store needs no format awareness.

use heapless::Vec;

use super::info::SESSION_INFO_MAX_SIZE;
use super::state::SESSION_STATE_SIZE;
use crate::config::device::ProvisioningInfo;

/// Largest auxiliary buffer saved alongside session info
pub const MAX_AUX_SIZE: usize = 32;

/// Encoded session state
pub type StateBlob = Vec<u8, SESSION_STATE_SIZE>;

/// Encoded session info
pub type InfoBlob = Vec<u8, SESSION_INFO_MAX_SIZE>;

/// Application-specific bytes saved with session info
pub type AuxBlob = Vec<u8, MAX_AUX_SIZE>;

/// Host storage for provisioning and session data.
///
/// Only [`load_provisioning`](SessionStore::load_provisioning) is required.
/// The default persistence methods store nothing, which makes every boot
/// behave like a first power-up.
pub trait SessionStore {
    /// Provisioning for this device
    fn load_provisioning(&mut self) -> ProvisioningInfo;

    /// Last saved session state, if any
    fn load_session_state(&mut self) -> Option<StateBlob> {
        None
    }

    /// Persist session state. Returns false if nothing was written.
    fn save_session_state(&mut self, _state: &[u8]) -> bool {
        false
    }

    /// Last saved session info, if any. Auxiliary bytes saved with it are
    /// copied into `aux`.
    fn load_session_info(&mut self, _aux: &mut AuxBlob) -> Option<InfoBlob> {
        None
    }

    /// Persist session info with its auxiliary bytes (possibly empty).
    /// Returns false if nothing was written.
    fn save_session_info(&mut self, _info: &[u8], _aux: &[u8]) -> bool {
        false
    }
}

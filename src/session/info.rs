//! Session info records
//!
//! Session info is the identity of a session: NetID, device address and the
//! two session keys. It is written once after a join (or once an ABP session
//! is installed) and read back at startup.
//!
//! Two layouts exist. V1 carried the frame counters inline; V2 dropped them
//! because the counters now live in the session state snapshot. Both are
//! read, only V2 is built.

use super::channels::read_u32;
use super::store::InfoBlob;
use super::FormatError;
use crate::config::device::{AESKey, DevAddr};
use crate::lorawan::mac::SessionKeys;

/// Size of a V1 record
pub const SESSION_INFO_V1_SIZE: usize = 52;
/// Size of a V2 record
pub const SESSION_INFO_V2_SIZE: usize = 44;
/// Largest record
pub const SESSION_INFO_MAX_SIZE: usize = SESSION_INFO_V1_SIZE;

const HEADER_SIZE: usize = 4;
const TAG_NULL: u8 = 0x00;
const TAG_V1: u8 = 0x01;
const TAG_V2: u8 = 0x02;

/// Legacy layout with frame counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfoV1 {
    /// Network ID
    pub net_id: u32,
    /// Device address
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_skey: AESKey,
    /// Application session key
    pub app_skey: AESKey,
    /// Uplink frame counter
    pub fcnt_up: u32,
    /// Downlink frame counter
    pub fcnt_down: u32,
}

/// Current layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfoV2 {
    /// Network ID
    pub net_id: u32,
    /// Device address
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_skey: AESKey,
    /// Application session key
    pub app_skey: AESKey,
}

/// Versioned session info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInfo {
    /// No session
    Null,
    /// Legacy record
    V1(SessionInfoV1),
    /// Current record
    V2(SessionInfoV2),
}

impl SessionInfo {
    /// Current-format record for a live session
    pub fn build(keys: &SessionKeys) -> Self {
        SessionInfo::V2(SessionInfoV2 {
            net_id: keys.net_id,
            dev_addr: keys.dev_addr,
            nwk_skey: keys.nwk_skey,
            app_skey: keys.app_skey,
        })
    }

    /// Header tag
    pub fn tag(&self) -> u8 {
        match self {
            SessionInfo::Null => TAG_NULL,
            SessionInfo::V1(_) => TAG_V1,
            SessionInfo::V2(_) => TAG_V2,
        }
    }

    /// Encoded size
    pub fn size(&self) -> usize {
        match self {
            SessionInfo::Null => HEADER_SIZE,
            SessionInfo::V1(_) => SESSION_INFO_V1_SIZE,
            SessionInfo::V2(_) => SESSION_INFO_V2_SIZE,
        }
    }

    /// Session identity and keys. `None` for `Null` and for a record whose
    /// device address was never assigned, as written while a join is still
    /// in flight.
    pub fn keys(&self) -> Option<SessionKeys> {
        self.fields().filter(|keys| keys.dev_addr != [0; 4])
    }

    fn fields(&self) -> Option<SessionKeys> {
        match self {
            SessionInfo::Null => None,
            SessionInfo::V1(v1) => Some(SessionKeys {
                net_id: v1.net_id,
                dev_addr: v1.dev_addr,
                nwk_skey: v1.nwk_skey,
                app_skey: v1.app_skey,
            }),
            SessionInfo::V2(v2) => Some(SessionKeys {
                net_id: v2.net_id,
                dev_addr: v2.dev_addr,
                nwk_skey: v2.nwk_skey,
                app_skey: v2.app_skey,
            }),
        }
    }

    /// Network ID, if there is a session
    pub fn net_id(&self) -> Option<u32> {
        self.fields().map(|k| k.net_id)
    }

    /// `(fcnt_up, fcnt_down)`; only V1 records carry them
    pub fn frame_counters(&self) -> Option<(u32, u32)> {
        match self {
            SessionInfo::V1(v1) => Some((v1.fcnt_up, v1.fcnt_down)),
            _ => None,
        }
    }

    /// Encode to the little-endian record layout
    pub fn encode(&self) -> InfoBlob {
        let mut raw = [0u8; SESSION_INFO_MAX_SIZE];
        let size = self.size();
        raw[0] = self.tag();
        raw[1] = size as u8;
        if let Some(keys) = self.fields() {
            raw[4..8].copy_from_slice(&keys.net_id.to_le_bytes());
            raw[8..12].copy_from_slice(&keys.dev_addr);
            raw[12..28].copy_from_slice(&keys.nwk_skey);
            raw[28..44].copy_from_slice(&keys.app_skey);
        }
        if let Some((up, down)) = self.frame_counters() {
            raw[44..48].copy_from_slice(&up.to_le_bytes());
            raw[48..52].copy_from_slice(&down.to_le_bytes());
        }
        InfoBlob::from_slice(&raw[..size]).unwrap_or_default()
    }

    /// Decode a stored record, dispatching on its tag
    pub fn read(raw: &[u8]) -> Result<Self, FormatError> {
        if raw.len() < HEADER_SIZE {
            return Err(FormatError::Truncated);
        }
        let expected = match raw[0] {
            TAG_NULL => return Ok(SessionInfo::Null),
            TAG_V1 => SESSION_INFO_V1_SIZE,
            TAG_V2 => SESSION_INFO_V2_SIZE,
            tag => return Err(FormatError::UnknownTag(tag)),
        };
        if raw[1] as usize != expected {
            return Err(FormatError::SizeMismatch {
                expected,
                found: raw[1] as usize,
            });
        }
        if raw.len() < expected {
            return Err(FormatError::Truncated);
        }

        let mut dev_addr = [0u8; 4];
        dev_addr.copy_from_slice(&raw[8..12]);
        let mut nwk_skey = [0u8; 16];
        nwk_skey.copy_from_slice(&raw[12..28]);
        let mut app_skey = [0u8; 16];
        app_skey.copy_from_slice(&raw[28..44]);
        let net_id = read_u32(raw, 4);

        if raw[0] == TAG_V1 {
            Ok(SessionInfo::V1(SessionInfoV1 {
                net_id,
                dev_addr,
                nwk_skey,
                app_skey,
                fcnt_up: read_u32(raw, 44),
                fcnt_down: read_u32(raw, 48),
            }))
        } else {
            Ok(SessionInfo::V2(SessionInfoV2 {
                net_id,
                dev_addr,
                nwk_skey,
                app_skey,
            }))
        }
    }
}

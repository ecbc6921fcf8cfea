//! Session persistence
//!
//! This module contains the session snapshot machinery:
//! - Channel plan codec (frequency-list and mask-list regions)
//! - Session info records written after a join
//! - Session state snapshots and their binary layout
//! - Building, validating and applying snapshots against a live MAC engine
//! - The persistence seam implemented by the host

/// Channel plan codec
pub mod channels;

/// Session info records
pub mod info;

/// Building and applying snapshots
pub mod snapshot;

/// Session state snapshots
pub mod state;

/// Persistence seam
pub mod store;

pub use channels::{ChannelPlan, FrequencyList, FrequencyTable, MaskList};
pub use info::SessionInfo;
pub use state::{SessionState, SessionStateV1};
pub use store::{AuxBlob, InfoBlob, SessionStore, StateBlob};

/// Why a persisted blob could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    /// Fewer bytes than the header or the declared layout needs
    Truncated,
    /// Header tag is not a known version
    UnknownTag(u8),
    /// Header size does not match the layout selected by the tag
    SizeMismatch {
        /// Size of the layout selected by the tag
        expected: usize,
        /// Size recorded in the header
        found: usize,
    },
    /// Channel plan kind is not known
    ChannelPlanTag(u8),
    /// Channel plan size does not match its kind
    ChannelPlanSize {
        /// Size of the plan selected by the kind
        expected: usize,
        /// Size recorded in the plan header
        found: usize,
    },
}

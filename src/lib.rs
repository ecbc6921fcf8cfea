//! LoRaWAN session persistence for end devices
//!
//! This crate keeps a LoRaWAN session alive across power cycles. It sits on
//! top of an existing MAC/PHY engine, captures the engine's volatile session
//! state into a compact, versioned, region-aware snapshot, and reapplies it
//! at the next boot so the device resumes without rejoining.
//!
//! # Features
//! - Versioned binary snapshots with self-describing headers
//! - Frequency-list (EU-like) and mask-list (US-like, CN490) channel plans
//! - Region and country gate on restore
//! - Dirty-checked saves driven by MAC events
//! - Per-network bootstrap profiles (sub-band, data rate, RX2 fixups)
//! - No heap allocation, no unsafe code
//!
//! # Example
//! ```no_run
//! use lorawan_session::{
//!     config::SessionConfig,
//!     device::{Activation, SessionManager},
//!     lorawan::{MacEngine, NetworkId, Region},
//!     session::SessionStore,
//! };
//!
//! fn run<M: MacEngine, S: SessionStore>(mac: M, store: S) {
//!     let config = SessionConfig::new(NetworkId::TheThingsNetwork, Region::Eu868);
//!     let mut device = SessionManager::new(mac, store, config);
//!
//!     match device.begin() {
//!         // resumed with the saved frame counters and channel plan
//!         Ok(Activation::Restored) => {}
//!         Ok(_) => {}
//!         Err(_) => return,
//!     }
//!
//!     // events are processed, and state saved, inside service()
//!     while device.service().is_ok() {}
//! }
//! ```

#![warn(missing_docs)]
#![no_std]

/// Device and network configuration
pub mod config;

/// Session manager
pub mod device;

/// LoRaWAN MAC-side definitions
pub mod lorawan;

/// Session snapshots and persistence
pub mod session;

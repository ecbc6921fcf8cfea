//! Building and applying snapshots
//!
//! [`build`] captures the engine's live state, [`is_applicable`] gates a
//! snapshot on the device's region and country, and [`apply`] writes an
//! applicable snapshot back into the engine. Absolute engine times are
//! turned into offsets from `now` on build and rebased onto `now` on apply,
//! so building and applying at the same `now` is an identity.

use log::{debug, trace};

use super::channels::{ChannelBand, ChannelPlan, FrequencyList, FrequencyTable, MaskList};
use super::state::{SessionState, SessionStateV1};
use crate::lorawan::mac::{BandState, ChannelConfig, MacEngine, OsTime};
use crate::lorawan::region::{CountryCode, Region};

/// Offset of `at` from `now`. Times already in the past become zero.
fn relative(at: OsTime, now: OsTime) -> u32 {
    let delta = at.wrapping_sub(now);
    if delta < 0 {
        0
    } else {
        delta as u32
    }
}

/// Inverse of [`relative`]
fn rebase(offset: u32, now: OsTime) -> OsTime {
    now.wrapping_add(offset as OsTime)
}

/// Snapshot the engine's live state. Returns `Null` for a region without a
/// channel plan.
pub fn build<M: MacEngine>(
    mac: &M,
    region: Region,
    country: CountryCode,
    now: OsTime,
) -> SessionState {
    let Some(kind) = region.channel_plan() else {
        return SessionState::Null;
    };

    let mut plan = ChannelPlan::empty(kind);
    match &mut plan {
        ChannelPlan::FrequencyList(list) => capture_frequency_list(mac, list, now),
        ChannelPlan::MaskList(mask) => capture_mask_list(mac, mask),
    }

    let link = mac.link();
    let mut state = SessionStateV1::new(region, country, plan);
    state.link_dr = link.data_rate;
    state.fcnt_up = link.fcnt_up;
    state.fcnt_down = link.fcnt_down;
    state.gps_time = 0;
    state.global_avail = relative(link.global_duty_avail, now);
    state.rx2_frequency = link.rx2_frequency;
    state.link_integrity = link.adr_ack_req;
    state.tx_power = link.tx_power;
    state.redundancy = link.redundancy;
    state.duty_cycle = link.global_duty_rate;
    state.rx1_dr_offset = link.rx1_dr_offset;
    state.rx2_data_rate = link.rx2_data_rate;
    state.rx_delay = link.rx_delay;
    #[cfg(feature = "tx-param-setup")]
    {
        state.tx_param = link.tx_param;
    }
    #[cfg(feature = "class-b")]
    {
        state.ping_frequency = link.ping_frequency;
        state.ping_dr = link.ping_data_rate;
        state.beacon_channel = link.beacon_channel;
    }
    state.rx_param_ans = link.rx_param_ans;
    state.dl_channel_ans = link.dl_channel_ans;
    state.rx_timing_setup_ans = link.rx_timing_setup_ans;

    SessionState::V1(state)
}

fn capture_frequency_list<M: MacEngine>(mac: &M, list: &mut FrequencyList, now: OsTime) {
    let channels = mac.channel_count().min(FrequencyList::CHANNELS);
    for ch in 0..channels {
        if let Some(config) = mac.channel(ch) {
            list.set_frequency(FrequencyTable::Uplink, ch, config.uplink_frequency);
            #[cfg(feature = "dl-channel-req")]
            list.set_frequency(FrequencyTable::Downlink, ch, config.downlink_frequency);
            list.dr_map[ch] = config.dr_map;
            list.set_band(ch, config.band);
        }
        if mac.is_channel_enabled(ch) {
            list.enable(ch, true);
        }
    }

    let shuffle = mac.shuffle_map();
    list.shuffle_map = match shuffle {
        [] => 0,
        [lo] => *lo as u16,
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
    };

    let bands = mac.band_count().min(FrequencyList::BANDS);
    for (i, slot) in list.bands.iter_mut().enumerate().take(bands) {
        if let Some(band) = mac.band(i) {
            *slot = ChannelBand {
                tx_duty_denom: band.tx_cap,
                tx_power: band.tx_power,
                last_channel: band.last_channel,
                ostime_avail: relative(band.avail, now),
            };
        }
    }
}

fn capture_mask_list<M: MacEngine>(mac: &M, mask: &mut MaskList) {
    let channels = mac.channel_count().min(mask.channels());
    for ch in 0..channels {
        if mac.is_channel_enabled(ch) {
            mask.enable(ch, true);
        }
    }
    mask.set_shuffle_map(mac.shuffle_map());
}

/// Whether a snapshot may be applied on a device configured for `region`
/// and `country`: it must be a valid snapshot with the channel plan shape of
/// that region, taken in that same region and country.
pub fn is_applicable(state: &SessionState, region: Region, country: CountryCode) -> bool {
    let SessionState::V1(v1) = state else {
        return false;
    };
    if region.channel_plan() != Some(v1.channels.kind()) {
        debug!("saved channel plan {:?} does not fit {}", v1.channels.kind(), region);
        return false;
    }
    if v1.region != region || v1.country != country {
        debug!(
            "saved state is for {}, device is {}",
            v1.region.display_name(v1.country),
            region.display_name(country)
        );
        return false;
    }
    true
}

/// Write an applicable snapshot into the engine.
///
/// Returns false, touching nothing, if the snapshot is not applicable.
/// Frequency-list channels the engine has enabled when this is called are
/// treated as fixed region defaults and left untouched; call it right after
/// an engine reset.
pub fn apply<M: MacEngine>(
    mac: &mut M,
    state: &SessionState,
    region: Region,
    country: CountryCode,
    now: OsTime,
) -> bool {
    if !is_applicable(state, region, country) {
        return false;
    }
    let SessionState::V1(v1) = state else {
        return false;
    };

    let link = mac.link_mut();
    link.data_rate = v1.link_dr;
    link.fcnt_down = v1.fcnt_down;
    link.fcnt_up = v1.fcnt_up;
    // gps_time is reserved; elapsed time across the power cycle is taken as zero
    link.global_duty_avail = rebase(v1.global_avail, now);
    link.rx2_frequency = v1.rx2_frequency;
    link.adr_ack_req = v1.link_integrity;
    link.tx_power = v1.tx_power;
    link.redundancy = v1.redundancy;
    link.global_duty_rate = v1.duty_cycle;
    link.rx1_dr_offset = v1.rx1_dr_offset;
    link.rx2_data_rate = v1.rx2_data_rate;
    link.rx_delay = v1.rx_delay;
    #[cfg(feature = "tx-param-setup")]
    {
        link.tx_param = v1.tx_param;
    }
    #[cfg(feature = "class-b")]
    {
        link.ping_frequency = v1.ping_frequency;
        link.ping_data_rate = v1.ping_dr;
        link.beacon_channel = v1.beacon_channel;
    }
    link.rx_param_ans = v1.rx_param_ans;
    link.dl_channel_ans = v1.dl_channel_ans;
    link.rx_timing_setup_ans = v1.rx_timing_setup_ans;

    match &v1.channels {
        ChannelPlan::FrequencyList(list) => apply_frequency_list(mac, list, now),
        ChannelPlan::MaskList(mask) => apply_mask_list(mac, mask),
    }
    true
}

fn apply_frequency_list<M: MacEngine>(mac: &mut M, list: &FrequencyList, now: OsTime) {
    let channels = mac.channel_count().min(FrequencyList::CHANNELS);
    let mut fixed: u16 = 0;
    for ch in 0..channels {
        if mac.is_channel_enabled(ch) {
            fixed |= 1 << ch;
        }
    }

    for ch in 0..channels {
        if fixed & (1 << ch) != 0 {
            trace!("channel {} is a region default, skipped", ch);
            continue;
        }
        let config = ChannelConfig {
            uplink_frequency: list.frequency(FrequencyTable::Uplink, ch),
            #[cfg(feature = "dl-channel-req")]
            downlink_frequency: list.frequency(FrequencyTable::Downlink, ch),
            #[cfg(not(feature = "dl-channel-req"))]
            downlink_frequency: 0,
            dr_map: list.dr_map[ch],
            band: list.band(ch),
        };
        mac.setup_channel(ch, &config);
        if list.is_enabled(ch) {
            mac.enable_channel(ch);
        } else {
            mac.disable_channel(ch);
        }
    }

    mac.set_shuffle_map(&list.shuffle_map.to_le_bytes());

    let bands = mac.band_count().min(FrequencyList::BANDS);
    for (i, band) in list.bands.iter().enumerate().take(bands) {
        mac.set_band(
            i,
            &BandState {
                tx_cap: band.tx_duty_denom,
                tx_power: band.tx_power,
                last_channel: band.last_channel,
                avail: rebase(band.ostime_avail, now),
            },
        );
    }
}

fn apply_mask_list<M: MacEngine>(mac: &mut M, mask: &MaskList) {
    mac.set_shuffle_map(mask.shuffle_map());
    let channels = mac.channel_count().min(mask.channels());
    for ch in 0..channels {
        if mask.is_enabled(ch) {
            mac.enable_channel(ch);
        } else {
            mac.disable_channel(ch);
        }
    }
}

use lorawan_session::{
    config::device::{ProvisioningInfo, ProvisioningStyle, SessionConfig},
    lorawan::{
        mac::{ChannelConfig, MacEngine, MacEvent},
        region::{ChannelPlanKind, CountryCode, Region},
        NetworkId, NetworkProfile,
    },
    session::{
        channels::{ChannelPlan, FrequencyList, FrequencyTable, MaskList, MAX_PACKED_FREQUENCY},
        snapshot,
        state::{self, SessionState, SessionStateV1, SESSION_STATE_SIZE},
        FormatError,
    },
};

mod mock;
use mock::MockMac;

#[test]
fn test_frequency_round_trip() {
    let mut plan = FrequencyList::new();
    let frequencies = [100, 433_175_000, 868_100_000, 923_200_000, MAX_PACKED_FREQUENCY];
    for ch in 0..FrequencyList::CHANNELS {
        for table in [FrequencyTable::Uplink, FrequencyTable::Downlink] {
            for f in frequencies {
                assert!(plan.set_frequency(table, ch, f));
                assert_eq!(plan.frequency(table, ch), f);
            }
            // rounded down to 100 Hz
            assert!(plan.set_frequency(table, ch, 868_100_099));
            assert_eq!(plan.frequency(table, ch), 868_100_000);
        }
    }
}

#[test]
fn test_frequency_tables_are_independent() {
    let mut plan = FrequencyList::new();
    plan.set_frequency(FrequencyTable::Uplink, 2, 868_500_000);
    plan.set_frequency(FrequencyTable::Downlink, 2, 869_525_000);
    plan.set_frequency(FrequencyTable::Uplink, 3, 867_100_000);
    assert_eq!(plan.frequency(FrequencyTable::Uplink, 2), 868_500_000);
    assert_eq!(plan.frequency(FrequencyTable::Downlink, 2), 869_525_000);
    assert_eq!(plan.frequency(FrequencyTable::Downlink, 3), 0);
}

#[test]
fn test_mask_round_trip_every_channel() {
    for mut plan in [MaskList::new(), MaskList::new_wide()] {
        for ch in 0..plan.channels() {
            assert!(!plan.enable(ch, true));
            assert!(plan.is_enabled(ch));
            assert!(plan.enable(ch, false));
            assert!(!plan.is_enabled(ch));
        }
        assert!(!plan.enable(plan.channels(), true));
    }
}

#[test]
fn test_channel_plan_sizes() {
    assert_eq!(ChannelPlan::empty(ChannelPlanKind::FrequencyList).size(), 172);
    assert_eq!(ChannelPlan::empty(ChannelPlanKind::MaskList).size(), 22);
    assert_eq!(ChannelPlan::empty(ChannelPlanKind::WideMaskList).size(), 26);
}

#[test]
fn test_mask_list_encoding() {
    let mut mask = MaskList::new();
    mask.enable(0, true);
    mask.enable(71, true);
    mask.set_shuffle_map(&[0xFF, 0x01]);
    let raw = ChannelPlan::MaskList(mask.clone()).encode();
    assert_eq!(&raw[..2], &[1, 22]);
    assert_eq!(raw[2], 0x01);
    assert_eq!(raw[2 + 8], 0x80);
    assert_eq!(&raw[12..14], &[0xFF, 0x01]);
    assert!(raw[22..].iter().all(|b| *b == 0));
    assert_eq!(ChannelPlan::decode(&raw), Ok(ChannelPlan::MaskList(mask)));
}

#[test]
fn test_state_header_rejections() {
    let state = SessionStateV1::new(
        Region::Us915,
        CountryCode::NONE,
        ChannelPlan::empty(ChannelPlanKind::MaskList),
    );
    let good = state.encode();
    assert!(state::is_valid(&good));

    for size in 0..=255u8 {
        let mut raw = good;
        raw[1] = size;
        assert_eq!(state::is_valid(&raw), size as usize == SESSION_STATE_SIZE);
    }

    let mut raw = good;
    raw[0] = 0x02;
    assert_eq!(SessionState::decode(&raw), Err(FormatError::UnknownTag(2)));

    let mut raw = good;
    raw[44] = 0x00;
    assert_eq!(
        SessionState::decode(&raw),
        Err(FormatError::ChannelPlanSize {
            expected: 172,
            found: 22
        })
    );
}

#[test]
fn test_region_gate_holds_for_every_pair() {
    let countries = [CountryCode::NONE, CountryCode::JP, CountryCode::from_chars('K', 'R')];
    for saved_region in Region::ALL {
        let kind = saved_region.channel_plan().unwrap();
        for saved_country in countries {
            let state = SessionState::V1(SessionStateV1::new(
                saved_region,
                saved_country,
                ChannelPlan::empty(kind),
            ));
            for region in Region::ALL {
                for country in countries {
                    assert_eq!(
                        snapshot::is_applicable(&state, region, country),
                        region == saved_region && country == saved_country
                    );
                }
            }
        }
    }
}

#[test]
fn test_unknown_region_builds_nothing() {
    let mac = MockMac::eu_like();
    let state = snapshot::build(&mac, Region::Unknown, CountryCode::NONE, 0);
    assert_eq!(state, SessionState::Null);
}

#[test]
fn test_build_captures_frequency_list() {
    let mut mac = MockMac::eu_like();
    mac.setup_channel(
        3,
        &ChannelConfig {
            uplink_frequency: 867_100_000,
            downlink_frequency: 869_100_000,
            dr_map: 0x0030,
            band: 2,
        },
    );
    mac.link.fcnt_up = 500;

    let state = snapshot::build(&mac, Region::Eu868, CountryCode::NONE, 0);
    let v1 = state.as_v1().unwrap();
    assert_eq!(v1.fcnt_up, 500);
    let ChannelPlan::FrequencyList(list) = &v1.channels else {
        panic!("expected a frequency list");
    };
    assert!(list.is_enabled(0));
    assert!(list.is_enabled(3));
    assert!(!list.is_enabled(4));
    assert_eq!(list.frequency(FrequencyTable::Uplink, 3), 867_100_000);
    assert_eq!(list.dr_map[3], 0x0030);
    assert_eq!(list.band(3), 2);
    assert_eq!(list.bands[3].tx_duty_denom, 10);
    #[cfg(feature = "dl-channel-req")]
    assert_eq!(list.frequency(FrequencyTable::Downlink, 3), 869_100_000);
    #[cfg(not(feature = "dl-channel-req"))]
    assert_eq!(list.frequency(FrequencyTable::Downlink, 3), 0);
}

#[test]
fn test_class_b_fields() {
    let mut mac = MockMac::eu_like();
    mac.link.ping_frequency = 869_525_000;
    mac.link.ping_data_rate = 3;
    mac.link.beacon_channel = 1;
    let state = snapshot::build(&mac, Region::Eu868, CountryCode::NONE, 0);
    let v1 = state.as_v1().unwrap();
    if cfg!(feature = "class-b") {
        assert_eq!((v1.ping_frequency, v1.ping_dr, v1.beacon_channel), (869_525_000, 3, 1));
    } else {
        assert_eq!((v1.ping_frequency, v1.ping_dr, v1.beacon_channel), (0, 0, 0));
    }
}

#[test]
fn test_provisioning_info() {
    let otaa = ProvisioningInfo::new_otaa([0x01; 8], [0x02; 8], [0x03; 16]);
    assert_eq!(otaa.style(), ProvisioningStyle::Otaa);
    assert!(otaa.is_provisioned());
    let abp = ProvisioningInfo::new_abp(0x13, [1, 2, 3, 4], [0x01; 16], [0x02; 16]);
    assert_eq!(abp.style(), ProvisioningStyle::Abp);
    assert!(!ProvisioningInfo::None.is_provisioned());
}

#[test]
fn test_session_config_builders() {
    let config = SessionConfig::new(NetworkId::Senet, Region::Us915)
        .with_sub_band(9)
        .with_expected_net_id(0x13);
    assert_eq!(config.sub_band, None);
    assert_eq!(config.expected_net_id, Some(0x13));
    assert_eq!(config.with_sub_band(3).sub_band, Some(3));

    let jp = SessionConfig::new(NetworkId::TheThingsNetwork, Region::As923)
        .with_country(CountryCode::JP);
    assert_eq!(jp.region_name(), "as923jp");
    assert_eq!(NetworkId::TheThingsNetwork.name(), "The Things Network");
    assert_eq!(MacEvent::Joined.name(), "JOINED");
    assert_eq!(MacEvent::TxComplete { success: false }.name(), "TXCOMPLETE");
}

#[test]
fn test_configured_sub_band_profile() {
    let config = SessionConfig::new(NetworkId::Senet, Region::Us915).with_sub_band(3);
    let profile = NetworkProfile::<MockMac>::select(&config);
    let mut mac = MockMac::us_like();
    (profile.region_init)(&mut mac, &config);
    assert_eq!(mac.sub_band, Some(3));
    assert!(mac.is_channel_enabled(24));
    assert!(mac.is_channel_enabled(67));
    assert!(!mac.is_channel_enabled(23));

    let passive = NetworkProfile::<MockMac>::passive();
    let mut mac = MockMac::us_like();
    (passive.region_init)(&mut mac, &config);
    assert_eq!(mac.sub_band, None);
}

//! # Vehicle Codec Integration Tests
//!
//! Exercises the public codec API the way the router uses it:
//! - Origin independence of equality and hashing
//! - Diagnostic freeze frame decoding
//! - Payload rejection and permission immutability

use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use vhal_codec::diagnostic::{DiagnosticEvent, DiagnosticEventBuilder, DiagnosticFrameType};
use vhal_codec::validation::permissions::CAR_POWERTRAIN;
use vhal_codec::{
    CurrentPropValue, CurrentRawValues, LegacyPropValue, LegacyRawValues, PayloadValidator,
    PropValueBuilder, ValidationError, WireFormat, WireValue,
};
use vhal_types::property_ids::*;
use vhal_types::{
    ChangeMode, PropertyAccess, PropertyConfig, PropertyValue, RawPropValues, GLOBAL_AREA_ID,
};

fn hash_of(value: &PropertyValue) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn option<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

proptest! {
    #[test]
    fn prop_origins_agree_on_equality_and_hash(
        prop in prop::sample::select(vec![HW_KEY_INPUT, SWITCH_USER, OBD2_LIVE_FRAME, INFO_VIN]),
        area in 0i32..8,
        timestamp in any::<i64>(),
        int32s in prop::collection::vec(any::<i32>(), 0..6),
        floats in prop::collection::vec(-1.0e6f32..1.0e6f32, 0..6),
        int64s in prop::collection::vec(any::<i64>(), 0..6),
        bytes in prop::collection::vec(any::<u8>(), 0..6),
        string in "[a-zA-Z0-9|]{0,12}",
    ) {
        let current = WireValue::Current(CurrentPropValue {
            timestamp,
            area_id: area,
            prop,
            status: 0,
            value: CurrentRawValues {
                int32_values: int32s.clone(),
                float_values: floats.clone(),
                int64_values: int64s.clone(),
                byte_values: bytes.clone(),
                string_value: string.clone(),
            },
        });
        let legacy = WireValue::Legacy(LegacyPropValue {
            prop,
            timestamp,
            area_id: area,
            status: 0,
            value: LegacyRawValues {
                int32_values: option(&int32s),
                float_values: option(&floats),
                int64_values: option(&int64s),
                bytes: (!bytes.is_empty()).then(|| bytes.iter().map(|b| *b as i8).collect()),
                string_value: (!string.is_empty()).then(|| string.clone()),
            },
        });

        let a = PropValueBuilder::build_from_wire(&current);
        let b = PropValueBuilder::build_from_wire(&legacy);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));

        prop_assert_eq!(PropValueBuilder::new(WireFormat::Current).to_wire(&b), current);
        prop_assert_eq!(PropValueBuilder::new(WireFormat::Legacy).to_wire(&a), legacy);
    }
}

#[test]
fn test_freeze_frame_with_vendor_sensors() {
    let config = PropertyConfig::new(OBD2_FREEZE_FRAME, PropertyAccess::Read, ChangeMode::OnChange)
        .with_config_array(vec![8, 1]);

    let mut mask = vec![0u8; 14];
    mask[0] = 0x02;
    mask[5] = 0x02;
    let mut int32s = vec![0; 40];
    int32s[1] = 2;
    let mut floats = vec![0.0; 72];
    floats[1] = 0.125;
    let value = PropertyValue::new(
        OBD2_FREEZE_FRAME,
        GLOBAL_AREA_ID,
        1_000,
        0,
        RawPropValues {
            int32s,
            floats,
            int64s: Vec::new(),
            bytes: mask,
            string: "P0010".into(),
        },
    );

    let event = DiagnosticEvent::from_property_value(&value, &config).unwrap();
    let expected = DiagnosticEventBuilder::for_config(DiagnosticFrameType::Freeze, &config)
        .unwrap()
        .timestamp(1_000)
        .int_value(1, 2)
        .float_value(1, 0.125)
        .dtc("P0010");

    assert_eq!(event, expected.build());
    assert_eq!(event.int_values.len(), 1);
    assert_eq!(event.float_values.len(), 1);
    // The builder encodes the same frame the channel would report
    assert_eq!(expected.to_property_value().unwrap(), value);
}

#[test]
fn test_two_element_gear_rejected() {
    let validator = PayloadValidator::new();
    let value = PropertyValue::new(
        GEAR_SELECTION,
        GLOBAL_AREA_ID,
        0,
        0,
        RawPropValues::int32s(vec![0x0008, 0x0004]),
    );
    assert!(!validator.check_payload(&value));

    let builder = PropValueBuilder::new(WireFormat::Current);
    let single = builder.build_i32(GEAR_SELECTION, GLOBAL_AREA_ID, 0x0008);
    assert!(validator.check_payload(&single));
}

#[test]
fn test_system_permissions_are_immutable() {
    let mut validator = PayloadValidator::new();
    for code in [0x0, 0x1, 0x2, 0x10, 0xf000_0000_u32 as i32] {
        let err = validator
            .customize_vendor_permission(&[GEAR_SELECTION, code, code])
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::SystemPropertyRemap {
                property_id: vhal_types::Hex(GEAR_SELECTION)
            }
        );
        assert_eq!(validator.read_permission(GEAR_SELECTION), Some(CAR_POWERTRAIN));
        assert_eq!(validator.write_permission(GEAR_SELECTION), None);
    }
}

#[test]
fn test_vendor_ids_registered_from_configs() {
    let vendor = 0x2140_0042;
    let mut validator = PayloadValidator::new();
    assert!(!validator.is_supported(vendor));
    validator.register_configs(&[PropertyConfig::new(
        vendor,
        PropertyAccess::ReadWrite,
        ChangeMode::OnChange,
    )]);
    assert!(validator.is_supported(vendor));
    assert!(validator.write_permission(vendor).is_some());
}

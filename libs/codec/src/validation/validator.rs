//! Payload validation for outgoing property values
//!
//! A value is rejected before it reaches the channel when its containers do
//! not match the shape encoded in the property id, when an enum-typed
//! property carries a value outside its allowed set, or when a registered
//! area range excludes it.

use super::permissions::PermissionTable;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;
use vhal_types::{property_ids::*, AreaConfig, Hex, PropertyConfig, PropertyType, PropertyValue};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Permission array length {len} is not a multiple of 3")]
    MalformedPermissionArray { len: usize },

    #[error("System property {property_id} cannot be remapped")]
    SystemPropertyRemap { property_id: Hex },

    #[error("Property {property_id} is not a vendor property")]
    NotVendorProperty { property_id: Hex },

    #[error("Vendor property {property_id} was already customized")]
    AlreadyCustomized { property_id: Hex },

    #[error("Unknown permission code {code:#x} for property {property_id}")]
    UnknownPermissionCode { property_id: Hex, code: i32 },

    #[error("Property {property_id} has no value type")]
    UnknownPropertyType { property_id: Hex },

    #[error("Property {property_id} element count mismatch: {reason}")]
    ElementCount { property_id: Hex, reason: String },

    #[error("Property {property_id} value {value} not in allowed set")]
    ValueNotAllowed { property_id: Hex, value: i32 },

    #[error("Property {property_id} area {area_id} value out of range [{min}, {max}]")]
    OutOfRange {
        property_id: Hex,
        area_id: Hex,
        min: String,
        max: String,
    },
}

/// Allowed int32 values of an enum-typed property
#[derive(Debug, Clone, Copy)]
enum AllowedValues {
    /// Value must be one of the listed constants
    OneOf(&'static [i32]),
    /// Value must be an OR-combination of the listed flags
    Flags(&'static [i32]),
}

impl AllowedValues {
    fn contains(self, value: i32) -> bool {
        match self {
            AllowedValues::OneOf(values) => values.contains(&value),
            AllowedValues::Flags(flags) => {
                let all = flags.iter().fold(0, |acc, flag| acc | flag);
                value & !all == 0
            }
        }
    }
}

const VEHICLE_GEAR: &[i32] = &[
    0x0000, 0x0001, 0x0002, 0x0004, 0x0008, 0x0010, 0x0020, 0x0040, 0x0080, 0x0100, 0x0200,
    0x0400, 0x0800, 0x1000,
];
const IGNITION_STATE_VALUES: &[i32] = &[0, 1, 2, 3, 4, 5];
const TURN_SIGNAL_VALUES: &[i32] = &[0, 1, 2];
const DISTANCE_UNITS: &[i32] = &[0x20, 0x21, 0x23, 0x24];
const TEMPERATURE_UNITS: &[i32] = &[0x30, 0x31];
const FUEL_TYPES: &[i32] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
const BOOTUP_REASONS: &[i32] = &[0, 1, 2, 3];
const FAN_DIRECTION_FLAGS: &[i32] = &[0x1, 0x2, 0x4, 0x8];

fn allowed_values(property_id: i32) -> Option<AllowedValues> {
    let allowed = match property_id {
        GEAR_SELECTION | CURRENT_GEAR => AllowedValues::OneOf(VEHICLE_GEAR),
        IGNITION_STATE => AllowedValues::OneOf(IGNITION_STATE_VALUES),
        TURN_SIGNAL_STATE => AllowedValues::OneOf(TURN_SIGNAL_VALUES),
        DISTANCE_DISPLAY_UNITS => AllowedValues::OneOf(DISTANCE_UNITS),
        HVAC_TEMPERATURE_DISPLAY_UNITS => AllowedValues::OneOf(TEMPERATURE_UNITS),
        INFO_FUEL_TYPE => AllowedValues::OneOf(FUEL_TYPES),
        AP_POWER_BOOTUP_REASON => AllowedValues::OneOf(BOOTUP_REASONS),
        HVAC_FAN_DIRECTION => AllowedValues::Flags(FAN_DIRECTION_FLAGS),
        _ => return None,
    };
    Some(allowed)
}

/// Payload checks plus permission lookup
#[derive(Debug, Clone, Default)]
pub struct PayloadValidator {
    permissions: PermissionTable,
    area_configs: HashMap<i32, Vec<AreaConfig>>,
}

impl PayloadValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record area ranges and vendor ids of the configs reported by the channel
    pub fn register_configs<'a>(&mut self, configs: impl IntoIterator<Item = &'a PropertyConfig>) {
        let mut vendor_ids = HashSet::new();
        for config in configs {
            vendor_ids.insert(config.property_id);
            if !config.area_configs.is_empty() {
                self.area_configs
                    .insert(config.property_id, config.area_configs.clone());
            }
        }
        self.permissions.register_vendor_properties(vendor_ids);
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn read_permission(&self, property_id: i32) -> Option<&'static str> {
        self.permissions.read_permission(property_id)
    }

    pub fn write_permission(&self, property_id: i32) -> Option<&'static str> {
        self.permissions.write_permission(property_id)
    }

    pub fn is_supported(&self, property_id: i32) -> bool {
        self.permissions.is_supported(property_id)
    }

    pub fn customize_vendor_permission(
        &mut self,
        config_array: &[i32],
    ) -> Result<(), ValidationError> {
        self.permissions.customize_vendor_permission(config_array)
    }

    pub fn check_payload(&self, value: &PropertyValue) -> bool {
        match self.validate(value) {
            Ok(()) => true,
            Err(e) => {
                debug!("Rejected payload {}: {}", value, e);
                false
            }
        }
    }

    /// Same checks as `check_payload` with the reason of a rejection
    pub fn validate(&self, value: &PropertyValue) -> Result<(), ValidationError> {
        let property_id = value.property_id();
        let property_type =
            PropertyType::of(property_id).ok_or(ValidationError::UnknownPropertyType {
                property_id: Hex(property_id),
            })?;

        if property_type == PropertyType::Mixed {
            return Ok(());
        }
        check_element_counts(value, property_type)?;

        if let Some(allowed) = allowed_values(property_id) {
            if let Some(bad) = value.int32s().iter().find(|v| !allowed.contains(**v)) {
                return Err(ValidationError::ValueNotAllowed {
                    property_id: Hex(property_id),
                    value: *bad,
                });
            }
        }

        self.check_range(value, property_type)
    }

    fn check_range(
        &self,
        value: &PropertyValue,
        property_type: PropertyType,
    ) -> Result<(), ValidationError> {
        let Some(area) = self
            .area_configs
            .get(&value.property_id())
            .and_then(|areas| areas.iter().find(|a| a.area_id == value.area_id()))
        else {
            return Ok(());
        };

        let out_of_range = |min: String, max: String| ValidationError::OutOfRange {
            property_id: Hex(value.property_id()),
            area_id: Hex(value.area_id()),
            min,
            max,
        };

        match property_type {
            PropertyType::Int32 => {
                if let Some((min, max)) = area.int32_range() {
                    if !(min..=max).contains(&value.int32s()[0]) {
                        return Err(out_of_range(min.to_string(), max.to_string()));
                    }
                }
            }
            PropertyType::Int64 => {
                if let Some((min, max)) = area.int64_range() {
                    if !(min..=max).contains(&value.int64s()[0]) {
                        return Err(out_of_range(min.to_string(), max.to_string()));
                    }
                }
            }
            PropertyType::Float => {
                if let Some((min, max)) = area.float_range() {
                    if !(min..=max).contains(&value.floats()[0]) {
                        return Err(out_of_range(min.to_string(), max.to_string()));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_element_counts(
    value: &PropertyValue,
    property_type: PropertyType,
) -> Result<(), ValidationError> {
    let property_id = value.property_id();
    let counts = [
        ("int32", value.int32s().len()),
        ("float", value.floats().len()),
        ("int64", value.int64s().len()),
        ("byte", value.bytes().len()),
        ("string", usize::from(!value.string().is_empty())),
    ];
    let fail = |reason: String| ValidationError::ElementCount {
        property_id: Hex(property_id),
        reason,
    };

    let (expected, scalar) = match property_type {
        PropertyType::Boolean | PropertyType::Int32 => ("int32", true),
        PropertyType::Int32Vec => ("int32", false),
        PropertyType::Float => ("float", true),
        PropertyType::FloatVec => ("float", false),
        PropertyType::Int64 => ("int64", true),
        PropertyType::Int64Vec => ("int64", false),
        PropertyType::Bytes => ("byte", false),
        PropertyType::String => ("string", false),
        PropertyType::Mixed => return Ok(()),
    };

    for (name, len) in counts {
        if name == expected {
            if scalar && len != 1 {
                return Err(fail(format!("expected one {} element, found {}", name, len)));
            }
            if !scalar && matches!(name, "int32" | "float" | "int64") && len == 0 {
                return Err(fail(format!("expected at least one {} element", name)));
            }
        } else if len != 0 {
            return Err(fail(format!("unexpected {} elements for {:?}", name, property_type)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhal_types::{ChangeMode, PropertyAccess, RawPropValues, GLOBAL_AREA_ID};

    fn value(property_id: i32, values: RawPropValues) -> PropertyValue {
        PropertyValue::new(property_id, GLOBAL_AREA_ID, 0, 0, values)
    }

    fn ints(property_id: i32, values: Vec<i32>) -> PropertyValue {
        value(property_id, RawPropValues::int32s(values))
    }

    #[test]
    fn test_gear_enum_membership() {
        let validator = PayloadValidator::new();
        assert!(validator.check_payload(&ints(GEAR_SELECTION, vec![0x0008])));
        assert!(validator.check_payload(&ints(GEAR_SELECTION, vec![0x1000])));
        assert!(!validator.check_payload(&ints(GEAR_SELECTION, vec![0x0003])));
    }

    #[test]
    fn test_two_element_scalar_rejected() {
        let validator = PayloadValidator::new();
        let err = validator
            .validate(&ints(GEAR_SELECTION, vec![0x0008, 0x0004]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::ElementCount { .. }));
    }

    #[test]
    fn test_scalar_with_stray_container_rejected() {
        let validator = PayloadValidator::new();
        let mut values = RawPropValues::floats(vec![21.5]);
        values.int32s = vec![1];
        assert!(!validator.check_payload(&value(HVAC_TEMPERATURE_SET, values)));
    }

    #[test]
    fn test_fan_direction_flags() {
        let validator = PayloadValidator::new();
        assert!(validator.check_payload(&ints(HVAC_FAN_DIRECTION, vec![0x1 | 0x2])));
        assert!(!validator.check_payload(&ints(HVAC_FAN_DIRECTION, vec![0x10])));
    }

    #[test]
    fn test_vectors_need_an_element() {
        let validator = PayloadValidator::new();
        assert!(!validator.check_payload(&value(HW_KEY_INPUT, RawPropValues::default())));
        assert!(validator.check_payload(&ints(HW_KEY_INPUT, vec![0, 4, 0])));
        assert!(validator.check_payload(&ints(INFO_FUEL_TYPE, vec![1, 10])));
        assert!(!validator.check_payload(&ints(INFO_FUEL_TYPE, vec![1, 40])));
    }

    #[test]
    fn test_string_may_not_carry_numbers() {
        let validator = PayloadValidator::new();
        assert!(validator.check_payload(&value(INFO_VIN, RawPropValues::string("1GCARVIN"))));
        let mut values = RawPropValues::string("1GCARVIN");
        values.int64s = vec![7];
        assert!(!validator.check_payload(&value(INFO_VIN, values)));
    }

    #[test]
    fn test_mixed_skips_checks() {
        let validator = PayloadValidator::new();
        let mut values = RawPropValues::int32s(vec![1, 2, 3]);
        values.string = "anything".into();
        assert!(validator.check_payload(&value(SWITCH_USER, values)));
    }

    #[test]
    fn test_registered_area_range() {
        let mut validator = PayloadValidator::new();
        let config =
            PropertyConfig::new(HVAC_FAN_SPEED, PropertyAccess::ReadWrite, ChangeMode::OnChange)
                .with_area(AreaConfig::new(0x1).with_int32_range(1, 6));
        validator.register_configs([&config]);

        let speed = |area, v| {
            PropertyValue::new(HVAC_FAN_SPEED, area, 0, 0, RawPropValues::int32s(vec![v]))
        };
        assert!(validator.check_payload(&speed(0x1, 3)));
        assert!(!validator.check_payload(&speed(0x1, 7)));
        // Areas without a declared range are unbounded
        assert!(validator.check_payload(&speed(0x4, 7)));
    }
}

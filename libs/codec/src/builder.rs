//! Property value construction
//!
//! `PropValueBuilder` converts between the wire encodings and the unified
//! `PropertyValue`, and builds values from typed arguments. A builder is bound
//! to the wire format of the channel it feeds; decoding accepts either format.
//!
//! ```rust
//! use vhal_codec::{PropValueBuilder, WireFormat};
//! use vhal_types::property_ids::GEAR_SELECTION;
//!
//! let builder = PropValueBuilder::new(WireFormat::Current);
//! let value = builder.build_i32(GEAR_SELECTION, 0, 8);
//! let wire = builder.to_wire(&value);
//! assert_eq!(PropValueBuilder::build_from_wire(&wire), value);
//! ```

use crate::wire::{
    CurrentPropValue, CurrentRawValues, LegacyPropValue, LegacyRawValues, WireFormat, WireValue,
};
use once_cell::sync::Lazy;
use std::time::Instant;
use vhal_types::{PropertyStatus, PropertyValue, RawPropValues};

static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic nanoseconds since the codec was first used
pub fn elapsed_nanos() -> i64 {
    i64::try_from(CLOCK_ORIGIN.elapsed().as_nanos()).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropValueBuilder {
    format: WireFormat,
}

impl PropValueBuilder {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Decode either wire encoding into the unified value
    pub fn build_from_wire(wire: &WireValue) -> PropertyValue {
        match wire {
            WireValue::Current(value) => PropertyValue::new(
                value.prop,
                value.area_id,
                value.timestamp,
                value.status,
                RawPropValues {
                    int32s: value.value.int32_values.clone(),
                    floats: value.value.float_values.clone(),
                    int64s: value.value.int64_values.clone(),
                    bytes: value.value.byte_values.clone(),
                    string: value.value.string_value.clone(),
                },
            ),
            WireValue::Legacy(value) => PropertyValue::new(
                value.prop,
                value.area_id,
                value.timestamp,
                value.status,
                RawPropValues {
                    int32s: value.value.int32_values.clone().unwrap_or_default(),
                    floats: value.value.float_values.clone().unwrap_or_default(),
                    int64s: value.value.int64_values.clone().unwrap_or_default(),
                    bytes: value
                        .value
                        .bytes
                        .as_deref()
                        .unwrap_or_default()
                        .iter()
                        .map(|&b| b as u8)
                        .collect(),
                    string: value.value.string_value.clone().unwrap_or_default(),
                },
            ),
        }
    }

    /// Encode into this builder's wire format
    pub fn to_wire(&self, value: &PropertyValue) -> WireValue {
        match self.format {
            WireFormat::Current => WireValue::Current(CurrentPropValue {
                timestamp: value.timestamp(),
                area_id: value.area_id(),
                prop: value.property_id(),
                status: value.status(),
                value: CurrentRawValues {
                    int32_values: value.int32s().to_vec(),
                    float_values: value.floats().to_vec(),
                    int64_values: value.int64s().to_vec(),
                    byte_values: value.bytes().to_vec(),
                    string_value: value.string().to_owned(),
                },
            }),
            WireFormat::Legacy => WireValue::Legacy(LegacyPropValue {
                prop: value.property_id(),
                timestamp: value.timestamp(),
                area_id: value.area_id(),
                status: value.status(),
                value: LegacyRawValues {
                    int32_values: non_empty(value.int32s()),
                    float_values: non_empty(value.floats()),
                    int64_values: non_empty(value.int64s()),
                    bytes: (!value.bytes().is_empty())
                        .then(|| value.bytes().iter().map(|&b| b as i8).collect()),
                    string_value: (!value.string().is_empty()).then(|| value.string().to_owned()),
                },
            }),
        }
    }

    pub fn build_bool(&self, property_id: i32, area_id: i32, value: bool) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::int32s(vec![i32::from(value)]))
    }

    pub fn build_i32(&self, property_id: i32, area_id: i32, value: i32) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::int32s(vec![value]))
    }

    pub fn build_i32s(&self, property_id: i32, area_id: i32, values: Vec<i32>) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::int32s(values))
    }

    pub fn build_f32(&self, property_id: i32, area_id: i32, value: f32) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::floats(vec![value]))
    }

    pub fn build_f32s(&self, property_id: i32, area_id: i32, values: Vec<f32>) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::floats(values))
    }

    pub fn build_i64(&self, property_id: i32, area_id: i32, value: i64) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::int64s(vec![value]))
    }

    pub fn build_i64s(&self, property_id: i32, area_id: i32, values: Vec<i64>) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::int64s(values))
    }

    pub fn build_bytes(&self, property_id: i32, area_id: i32, values: Vec<u8>) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::bytes(values))
    }

    pub fn build_string(
        &self,
        property_id: i32,
        area_id: i32,
        value: impl Into<String>,
    ) -> PropertyValue {
        self.build_raw(property_id, area_id, RawPropValues::string(value))
    }

    /// Build a mixed value; containers are taken as already packed
    pub fn build_mixed(
        &self,
        property_id: i32,
        area_id: i32,
        timestamp: i64,
        status: i32,
        values: RawPropValues,
    ) -> PropertyValue {
        PropertyValue::new(property_id, area_id, timestamp, status, values)
    }

    fn build_raw(&self, property_id: i32, area_id: i32, values: RawPropValues) -> PropertyValue {
        PropertyValue::new(
            property_id,
            area_id,
            elapsed_nanos(),
            PropertyStatus::Available.into(),
            values,
        )
    }
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

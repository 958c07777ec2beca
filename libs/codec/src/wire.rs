//! Wire encodings of a property value
//!
//! The channel speaks one of two structurally different encodings of the
//! same logical value:
//!
//! - **current**: a struct-of-arrays where every container is always present
//! - **legacy**: nullable containers, with bytes carried as signed `i8`
//!
//! This module and `builder` are the only places either encoding is named.
//! Everything above the codec works on `PropertyValue`.

use serde::{Deserialize, Serialize};

/// Which encoding a channel speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireFormat {
    Current,
    Legacy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentRawValues {
    pub int32_values: Vec<i32>,
    pub float_values: Vec<f32>,
    pub int64_values: Vec<i64>,
    pub byte_values: Vec<u8>,
    pub string_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentPropValue {
    pub timestamp: i64,
    pub area_id: i32,
    pub prop: i32,
    pub status: i32,
    pub value: CurrentRawValues,
}

/// Legacy containers. `None` is the canonical encoding of an empty container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyRawValues {
    pub int32_values: Option<Vec<i32>>,
    pub float_values: Option<Vec<f32>>,
    pub int64_values: Option<Vec<i64>>,
    pub bytes: Option<Vec<i8>>,
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyPropValue {
    pub prop: i32,
    pub timestamp: i64,
    pub area_id: i32,
    pub status: i32,
    pub value: LegacyRawValues,
}

/// Either wire encoding, as exchanged with the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Current(CurrentPropValue),
    Legacy(LegacyPropValue),
}

impl WireValue {
    pub fn format(&self) -> WireFormat {
        match self {
            WireValue::Current(_) => WireFormat::Current,
            WireValue::Legacy(_) => WireFormat::Legacy,
        }
    }

    pub fn property_id(&self) -> i32 {
        match self {
            WireValue::Current(value) => value.prop,
            WireValue::Legacy(value) => value.prop,
        }
    }

    pub fn area_id(&self) -> i32 {
        match self {
            WireValue::Current(value) => value.area_id,
            WireValue::Legacy(value) => value.area_id,
        }
    }
}

impl From<CurrentPropValue> for WireValue {
    fn from(value: CurrentPropValue) -> Self {
        WireValue::Current(value)
    }
}

impl From<LegacyPropValue> for WireValue {
    fn from(value: LegacyPropValue) -> Self {
        WireValue::Legacy(value)
    }
}

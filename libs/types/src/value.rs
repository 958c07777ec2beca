//! Unified property value
//!
//! `PropertyValue` is the single in-memory shape for a property sample no
//! matter which wire encoding it arrived in. Absent containers are empty
//! vectors (or an empty string), so two values built from different wire
//! origins compare and hash identically.
//!
//! Floats are compared by bit pattern, which keeps `Eq` and `Hash`
//! consistent with each other.

use crate::ids::Hex;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Status codes reported by the channel
#[repr(i32)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum StatusCode {
    Ok = 0,
    TryAgain = 1,
    InvalidArg = 2,
    NotAvailable = 3,
    AccessDenied = 4,
    InternalError = 5,
}

impl StatusCode {
    /// Decode a raw status, folding unknown codes into `InternalError`
    pub fn from_raw(code: i32) -> Self {
        Self::try_from(code).unwrap_or(StatusCode::InternalError)
    }
}

/// Per-sample availability status
#[repr(i32)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum PropertyStatus {
    Available = 0,
    Unavailable = 1,
    Error = 2,
}

/// The five homogeneous containers carried by every property value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPropValues {
    pub int32s: Vec<i32>,
    pub floats: Vec<f32>,
    pub int64s: Vec<i64>,
    pub bytes: Vec<u8>,
    pub string: String,
}

impl RawPropValues {
    pub fn int32s(values: Vec<i32>) -> Self {
        Self { int32s: values, ..Default::default() }
    }

    pub fn floats(values: Vec<f32>) -> Self {
        Self { floats: values, ..Default::default() }
    }

    pub fn int64s(values: Vec<i64>) -> Self {
        Self { int64s: values, ..Default::default() }
    }

    pub fn bytes(values: Vec<u8>) -> Self {
        Self { bytes: values, ..Default::default() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self { string: value.into(), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.int32s.is_empty()
            && self.floats.is_empty()
            && self.int64s.is_empty()
            && self.bytes.is_empty()
            && self.string.is_empty()
    }
}

impl PartialEq for RawPropValues {
    fn eq(&self, other: &Self) -> bool {
        self.int32s == other.int32s
            && self.floats.len() == other.floats.len()
            && self
                .floats
                .iter()
                .zip(&other.floats)
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.int64s == other.int64s
            && self.bytes == other.bytes
            && self.string == other.string
    }
}

impl Eq for RawPropValues {}

impl Hash for RawPropValues {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.int32s.hash(state);
        self.floats.len().hash(state);
        for value in &self.floats {
            value.to_bits().hash(state);
        }
        self.int64s.hash(state);
        self.bytes.hash(state);
        self.string.hash(state);
    }
}

/// Immutable property sample
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyValue {
    property_id: i32,
    area_id: i32,
    timestamp: i64,
    status: i32,
    values: RawPropValues,
}

impl PropertyValue {
    pub fn new(
        property_id: i32,
        area_id: i32,
        timestamp: i64,
        status: i32,
        values: RawPropValues,
    ) -> Self {
        Self {
            property_id,
            area_id,
            timestamp,
            status,
            values,
        }
    }

    /// Request shape used for `get`: only the address is meaningful
    pub fn request(property_id: i32, area_id: i32) -> Self {
        Self::new(
            property_id,
            area_id,
            0,
            PropertyStatus::Available.into(),
            RawPropValues::default(),
        )
    }

    pub fn property_id(&self) -> i32 {
        self.property_id
    }

    pub fn area_id(&self) -> i32 {
        self.area_id
    }

    /// Sample time in nanoseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn property_status(&self) -> Option<PropertyStatus> {
        PropertyStatus::try_from(self.status).ok()
    }

    pub fn is_available(&self) -> bool {
        self.status == i32::from(PropertyStatus::Available)
    }

    pub fn int32s(&self) -> &[i32] {
        &self.values.int32s
    }

    pub fn floats(&self) -> &[f32] {
        &self.values.floats
    }

    pub fn int64s(&self) -> &[i64] {
        &self.values.int64s
    }

    pub fn bytes(&self) -> &[u8] {
        &self.values.bytes
    }

    pub fn string(&self) -> &str {
        &self.values.string
    }

    pub fn values(&self) -> &RawPropValues {
        &self.values
    }

    pub fn into_values(self) -> RawPropValues {
        self.values
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PropertyValue{{property: {}, area: {}, timestamp: {}, status: {}",
            Hex(self.property_id),
            Hex(self.area_id),
            self.timestamp,
            self.status
        )?;
        if !self.values.int32s.is_empty() {
            write!(f, ", int32s: {:?}", self.values.int32s)?;
        }
        if !self.values.floats.is_empty() {
            write!(f, ", floats: {:?}", self.values.floats)?;
        }
        if !self.values.int64s.is_empty() {
            write!(f, ", int64s: {:?}", self.values.int64s)?;
        }
        if !self.values.bytes.is_empty() {
            write!(f, ", bytes: {}", hex::encode(&self.values.bytes))?;
        }
        if !self.values.string.is_empty() {
            write!(f, ", string: {:?}", self.values.string)?;
        }
        write!(f, "}}")
    }
}

/// Asynchronous set failure reported by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyError {
    pub property_id: i32,
    pub area_id: i32,
    pub error_code: StatusCode,
}

impl PropertyError {
    pub fn new(property_id: i32, area_id: i32, error_code: StatusCode) -> Self {
        Self {
            property_id,
            area_id,
            error_code,
        }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "property {} area {} failed with {:?}",
            Hex(self.property_id),
            Hex(self.area_id),
            self.error_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_is_container_sensitive() {
        let a = PropertyValue::new(1, 0, 10, 0, RawPropValues::int32s(vec![1, 2]));
        let b = PropertyValue::new(1, 0, 10, 0, RawPropValues::int32s(vec![2, 1]));
        assert_ne!(a, b);

        let c = PropertyValue::new(1, 0, 10, 0, RawPropValues::int32s(vec![1, 2]));
        assert_eq!(a, c);
        assert_eq!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn test_float_equality_uses_bits() {
        let nan = PropertyValue::new(1, 0, 0, 0, RawPropValues::floats(vec![f32::NAN]));
        assert_eq!(nan, nan.clone());
        assert_eq!(hash_of(&nan), hash_of(&nan.clone()));

        let pos = PropertyValue::new(1, 0, 0, 0, RawPropValues::floats(vec![0.0]));
        let neg = PropertyValue::new(1, 0, 0, 0, RawPropValues::floats(vec![-0.0]));
        assert_ne!(pos, neg);
    }

    #[test]
    fn test_status_code_fallback() {
        assert_eq!(StatusCode::from_raw(2), StatusCode::InvalidArg);
        assert_eq!(StatusCode::from_raw(77), StatusCode::InternalError);
    }

    #[test]
    fn test_display_renders_hex_ids() {
        let value = PropertyValue::new(
            0x1140_0400,
            0,
            5,
            0,
            RawPropValues::bytes(vec![0xde, 0xad]),
        );
        let text = value.to_string();
        assert!(text.contains("0x11400400"));
        assert!(text.contains("dead"));
    }

    #[test]
    fn test_serde_json_shape() {
        let value = PropertyValue::new(7, 1, 2, 0, RawPropValues::string("abc"));
        let json = serde_json::to_string(&value).unwrap();
        let back: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}

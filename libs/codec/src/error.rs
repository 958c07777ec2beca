//! Codec-level errors for property value conversion
//!
//! Every variant names the property it concerns (hex formatted) so a failure
//! can be traced without the original request object.

use thiserror::Error;
use vhal_types::{Hex, PropertyType};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Property id carries no recognised value type bits
    #[error("Unknown value type for property {property_id}")]
    UnknownPropertyType { property_id: Hex },

    /// Payload does not carry the elements its declared type needs
    #[error("Malformed payload for property {property_id} ({expected:?}): {reason}")]
    MalformedPayload {
        property_id: Hex,
        expected: Option<PropertyType>,
        reason: String,
    },

    /// Mixed layout descriptor in the config array is unusable
    #[error(
        "Invalid mixed layout for property {property_id}: {reason} (config_array: {config_array:?})"
    )]
    InvalidMixedLayout {
        property_id: Hex,
        reason: String,
        config_array: Vec<i32>,
    },

    /// Typed value does not match the declared property type
    #[error("Type mismatch for property {property_id}: expected {expected:?}, got {got}")]
    TypeMismatch {
        property_id: Hex,
        expected: PropertyType,
        got: &'static str,
    },

    /// An enumerated field carried a value outside its domain
    #[error("Invalid {field} value {value} in property {property_id}")]
    InvalidEnumValue {
        property_id: Hex,
        field: &'static str,
        value: i32,
    },
}

impl CodecError {
    pub fn unknown_type(property_id: i32) -> Self {
        Self::UnknownPropertyType {
            property_id: Hex(property_id),
        }
    }

    pub fn malformed(
        property_id: i32,
        expected: Option<PropertyType>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedPayload {
            property_id: Hex(property_id),
            expected,
            reason: reason.into(),
        }
    }

    pub fn invalid_layout(
        property_id: i32,
        reason: impl Into<String>,
        config_array: &[i32],
    ) -> Self {
        Self::InvalidMixedLayout {
            property_id: Hex(property_id),
            reason: reason.into(),
            config_array: config_array.to_vec(),
        }
    }

    pub fn type_mismatch(property_id: i32, expected: PropertyType, got: &'static str) -> Self {
        Self::TypeMismatch {
            property_id: Hex(property_id),
            expected,
            got,
        }
    }

    pub fn invalid_enum(property_id: i32, field: &'static str, value: i32) -> Self {
        Self::InvalidEnumValue {
            property_id: Hex(property_id),
            field,
            value,
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

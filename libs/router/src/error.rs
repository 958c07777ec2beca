//! Router Error Types

use thiserror::Error;
use vhal_client::ClientError;
use vhal_codec::CodecError;
use vhal_types::Hex;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    /// The id was not reported by the channel, or not taken by any service
    #[error("Property {property_id} is not supported")]
    NotSupported { property_id: Hex },

    #[error("Property {property_id} is not owned by service '{service}'")]
    NotOwner { property_id: Hex, service: String },

    #[error("Property {property_id} declared by both '{first}' and '{second}'")]
    DuplicateOwner {
        property_id: Hex,
        first: String,
        second: String,
    },

    /// Payload failed validation before reaching the channel
    #[error("Illegal argument for property {property_id} area {area_id}: {reason}")]
    IllegalArgument {
        property_id: Hex,
        area_id: Hex,
        reason: String,
    },

    #[error("Invalid lifecycle transition: {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type RouterResult<T> = std::result::Result<T, RouterError>;

impl RouterError {
    pub fn not_supported(property_id: i32) -> Self {
        Self::NotSupported {
            property_id: Hex(property_id),
        }
    }

    pub fn not_owner(property_id: i32, service: impl Into<String>) -> Self {
        Self::NotOwner {
            property_id: Hex(property_id),
            service: service.into(),
        }
    }

    pub fn illegal_argument(property_id: i32, area_id: i32, reason: impl Into<String>) -> Self {
        Self::IllegalArgument {
            property_id: Hex(property_id),
            area_id: Hex(area_id),
            reason: reason.into(),
        }
    }

    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Self::InvalidState { operation, state }
    }
}

//! Client Error Types
//!
//! Typed outcomes of a get/set after retry handling. Every variant that
//! concerns a property renders its property and area id in hex.

use crate::channel::ChannelError;
use thiserror::Error;
use vhal_types::{Hex, StatusCode};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// Transient failures persisted past the retry budget
    #[error(
        "Service unavailable for property {property_id} area {area_id} \
         after {attempts} attempts: {last_error}"
    )]
    ServiceUnavailable {
        property_id: Hex,
        area_id: Hex,
        attempts: u32,
        last_error: ChannelError,
    },

    #[error("Illegal argument for property {property_id} area {area_id}")]
    IllegalArgument { property_id: Hex, area_id: Hex },

    #[error("Property {property_id} area {area_id} not available")]
    NotAvailable { property_id: Hex, area_id: Hex },

    #[error("Access denied for property {property_id} area {area_id}")]
    AccessDenied { property_id: Hex, area_id: Hex },

    #[error("Internal error for property {property_id} area {area_id}: {status:?}")]
    Internal {
        property_id: Hex,
        area_id: Hex,
        status: StatusCode,
    },

    /// Channel refused the event callback
    #[error("Callback registration failed: {0}")]
    Registration(ChannelError),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Map a non-transient status to its typed outcome
    pub fn from_status(status: StatusCode, property_id: i32, area_id: i32) -> Self {
        let (property_id, area_id) = (Hex(property_id), Hex(area_id));
        match status {
            StatusCode::InvalidArg => Self::IllegalArgument { property_id, area_id },
            StatusCode::NotAvailable => Self::NotAvailable { property_id, area_id },
            StatusCode::AccessDenied => Self::AccessDenied { property_id, area_id },
            status => Self::Internal {
                property_id,
                area_id,
                status,
            },
        }
    }

    pub fn service_unavailable(
        property_id: i32,
        area_id: i32,
        attempts: u32,
        last_error: ChannelError,
    ) -> Self {
        Self::ServiceUnavailable {
            property_id: Hex(property_id),
            area_id: Hex(area_id),
            attempts,
            last_error,
        }
    }

    pub fn not_available(property_id: i32, area_id: i32) -> Self {
        Self::NotAvailable {
            property_id: Hex(property_id),
            area_id: Hex(area_id),
        }
    }

    pub fn illegal_argument(property_id: i32, area_id: i32) -> Self {
        Self::IllegalArgument {
            property_id: Hex(property_id),
            area_id: Hex(area_id),
        }
    }

    /// Get error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::ServiceUnavailable { .. } => "service_unavailable",
            ClientError::IllegalArgument { .. } => "illegal_argument",
            ClientError::NotAvailable { .. } => "not_available",
            ClientError::AccessDenied { .. } => "access_denied",
            ClientError::Internal { .. } => "internal",
            ClientError::Registration(_) => "registration",
        }
    }
}

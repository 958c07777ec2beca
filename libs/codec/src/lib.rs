//! # Vehicle Property Codec
//!
//! ## Purpose
//!
//! The "rules" layer of the property stack:
//! - Wire encodings exchanged with the channel (current and legacy)
//! - `PropValueBuilder`: lossless conversion between either encoding and the
//!   unified `PropertyValue`, plus typed value construction
//! - Typed application values and compiled mixed layouts
//! - Payload validation and permission resolution
//! - User management request/response layouts
//! - OBD2 diagnostic frame decoding
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/client
//!     ↑           ↓           ↓
//! Pure data   Wire rules   Retrying
//! structures  Validation   channel calls
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Channel calls or retry policy (belongs in libs/client)
//! - Ownership, subscriptions or dispatch (belongs in libs/router)

pub mod builder;
pub mod diagnostic;
pub mod error;
pub mod schema;
pub mod typed;
pub mod user_hal;
pub mod validation;
pub mod wire;

pub use builder::{elapsed_nanos, PropValueBuilder};
pub use diagnostic::{DiagnosticEvent, DiagnosticEventBuilder, DiagnosticFrameType, FrameLayout};
pub use error::{CodecError, CodecResult};
pub use schema::{MixedLayout, PropertySchema, SchemaTable, MIXED_LAYOUT_LEN};
pub use typed::{
    from_typed_value, from_typed_value_with_schema, to_typed_value, to_typed_value_with_schema,
    CarPropertyValue, MixedField, TypedValue,
};
pub use user_hal::{UserHalRequest, UserHalResponse};
pub use validation::{PayloadValidator, PermissionEntry, PermissionTable, ValidationError};
pub use wire::{
    CurrentPropValue, CurrentRawValues, LegacyPropValue, LegacyRawValues, WireFormat, WireValue,
};

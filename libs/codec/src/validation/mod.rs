//! # Property Payload Validation
//!
//! Two concerns share this module:
//!
//! - [`PayloadValidator`]: shape, enum and range checks applied to a value
//!   before it is written to the channel
//! - [`PermissionTable`]: read/write permission resolution for system ids
//!   and customizable vendor ids
//!
//! The router owns one `PayloadValidator` (which owns the permission table)
//! and seeds it once at initialization.

pub mod permissions;
pub mod validator;

pub use permissions::{
    PermissionEntry, PermissionTable, PERMISSION_DEFAULT, PERMISSION_NOT_ACCESSIBLE,
};
pub use validator::{PayloadValidator, ValidationError};

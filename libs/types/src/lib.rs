//! # Vehicle Property Types
//!
//! Pure data definitions shared by every layer of the property stack:
//! the unified `PropertyValue`, static `PropertyConfig` descriptors, status
//! codes, and the bit layout of property ids.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/client → libs/router
//!     ↑            ↓             ↓             ↓
//! Pure data    Wire formats   Retrying     Ownership map,
//! structures   and payload    channel      dispatch and
//!              validation     calls        correlation
//! ```
//!
//! Nothing in this crate knows about either wire encoding; that lives in
//! `vhal-codec`.

pub mod config;
pub mod ids;
pub mod value;

pub use config::{AreaConfig, ChangeMode, PropertyAccess, PropertyConfig};
pub use ids::{
    is_system_property, is_vendor_property, property_ids, AreaType, Hex, PropertyGroup,
    PropertyType, GLOBAL_AREA_ID,
};
pub use value::{PropertyError, PropertyStatus, PropertyValue, RawPropValues, StatusCode};

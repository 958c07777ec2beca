//! Property identifiers
//!
//! A property id packs four fields into one `i32`:
//!
//! ```text
//! 0xG A TT IIII
//!   │ │ │  └── index within the group
//!   │ │ └───── value type (STRING, INT32, MIXED, ...)
//!   │ └─────── area type (GLOBAL, SEAT, WINDOW, ...)
//!   └───────── group (SYSTEM or VENDOR)
//! ```
//!
//! These fields are part of the channel contract and must not change.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROPERTY_GROUP_MASK: i32 = 0xf000_0000_u32 as i32;
pub const PROPERTY_AREA_TYPE_MASK: i32 = 0x0f00_0000;
pub const PROPERTY_TYPE_MASK: i32 = 0x00ff_0000;
pub const PROPERTY_INDEX_MASK: i32 = 0x0000_ffff;

/// Area id meaning "whole vehicle"
pub const GLOBAL_AREA_ID: i32 = 0;

/// Value shape declared by a property id
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
pub enum PropertyType {
    String = 0x0010_0000,
    Boolean = 0x0020_0000,
    Int32 = 0x0040_0000,
    Int32Vec = 0x0041_0000,
    Int64 = 0x0050_0000,
    Int64Vec = 0x0051_0000,
    Float = 0x0060_0000,
    FloatVec = 0x0061_0000,
    Bytes = 0x0070_0000,
    Mixed = 0x00e0_0000,
}

impl PropertyType {
    /// Decode the value type bits of `property_id`
    pub fn of(property_id: i32) -> Option<Self> {
        Self::try_from(property_id & PROPERTY_TYPE_MASK).ok()
    }

    /// True for types that carry exactly one element
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            PropertyType::Boolean | PropertyType::Int32 | PropertyType::Int64 | PropertyType::Float
        )
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            PropertyType::Int32Vec | PropertyType::Int64Vec | PropertyType::FloatVec
        )
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive)]
pub enum PropertyGroup {
    System = 0x1000_0000,
    Vendor = 0x2000_0000,
}

impl PropertyGroup {
    pub fn of(property_id: i32) -> Option<Self> {
        Self::try_from(property_id & PROPERTY_GROUP_MASK).ok()
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive)]
pub enum AreaType {
    Global = 0x0100_0000,
    Window = 0x0300_0000,
    Mirror = 0x0400_0000,
    Seat = 0x0500_0000,
    Door = 0x0600_0000,
    Wheel = 0x0700_0000,
}

impl AreaType {
    pub fn of(property_id: i32) -> Option<Self> {
        Self::try_from(property_id & PROPERTY_AREA_TYPE_MASK).ok()
    }
}

pub fn is_system_property(property_id: i32) -> bool {
    PropertyGroup::of(property_id) == Some(PropertyGroup::System)
}

pub fn is_vendor_property(property_id: i32) -> bool {
    PropertyGroup::of(property_id) == Some(PropertyGroup::Vendor)
}

/// Hex rendering used in every diagnostic that names a property or area
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Hex(pub i32);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Well-known system property ids
pub mod property_ids {
    pub const INVALID: i32 = 0;

    pub const INFO_VIN: i32 = 0x1110_0100;
    pub const INFO_MAKE: i32 = 0x1110_0101;
    pub const INFO_MODEL_YEAR: i32 = 0x1140_0103;
    pub const INFO_FUEL_CAPACITY: i32 = 0x1160_0104;
    pub const INFO_FUEL_TYPE: i32 = 0x1141_0105;
    pub const PERF_ODOMETER: i32 = 0x1160_0204;
    pub const PERF_VEHICLE_SPEED: i32 = 0x1160_0207;
    pub const FUEL_DOOR_OPEN: i32 = 0x1120_0308;

    pub const GEAR_SELECTION: i32 = 0x1140_0400;
    pub const CURRENT_GEAR: i32 = 0x1140_0401;
    pub const PARKING_BRAKE_ON: i32 = 0x1120_0402;
    pub const NIGHT_MODE: i32 = 0x1120_0407;
    pub const TURN_SIGNAL_STATE: i32 = 0x1140_0408;
    pub const IGNITION_STATE: i32 = 0x1140_0409;

    pub const HVAC_FAN_SPEED: i32 = 0x1540_0500;
    pub const HVAC_FAN_DIRECTION: i32 = 0x1540_0501;
    pub const HVAC_TEMPERATURE_SET: i32 = 0x1560_0503;
    pub const HVAC_TEMPERATURE_DISPLAY_UNITS: i32 = 0x1140_050e;
    pub const HVAC_POWER_ON: i32 = 0x1520_0510;

    pub const DISTANCE_DISPLAY_UNITS: i32 = 0x1140_0600;
    pub const EPOCH_TIME: i32 = 0x1150_0606;
    pub const ENV_OUTSIDE_TEMPERATURE: i32 = 0x1160_0703;

    pub const AP_POWER_STATE_REQ: i32 = 0x1141_0a00;
    pub const AP_POWER_STATE_REPORT: i32 = 0x1141_0a01;
    pub const AP_POWER_BOOTUP_REASON: i32 = 0x1140_0a02;
    pub const DISPLAY_BRIGHTNESS: i32 = 0x1140_0a03;
    pub const HW_KEY_INPUT: i32 = 0x1141_0a10;

    pub const OBD2_LIVE_FRAME: i32 = 0x11e0_0d00;
    pub const OBD2_FREEZE_FRAME: i32 = 0x11e0_0d01;
    pub const OBD2_FREEZE_FRAME_INFO: i32 = 0x1151_0d02;
    pub const OBD2_FREEZE_FRAME_CLEAR: i32 = 0x1151_0d03;

    pub const SUPPORT_CUSTOMIZE_VENDOR_PERMISSION: i32 = 0x1120_0f05;
    pub const INITIAL_USER_INFO: i32 = 0x11e0_0f07;
    pub const SWITCH_USER: i32 = 0x11e0_0f08;
    pub const CREATE_USER: i32 = 0x11e0_0f09;
    pub const REMOVE_USER: i32 = 0x11e0_0f0a;
    pub const USER_IDENTIFICATION_ASSOCIATION: i32 = 0x11e0_0f0b;

    pub const CLUSTER_SWITCH_UI: i32 = 0x1140_0f34;
    pub const CLUSTER_DISPLAY_STATE: i32 = 0x1141_0f35;
    pub const CLUSTER_REPORT_STATE: i32 = 0x11e0_0f36;
    pub const CLUSTER_REQUEST_DISPLAY: i32 = 0x1140_0f37;
    pub const CLUSTER_NAVIGATION_STATE: i32 = 0x1170_0f38;
}

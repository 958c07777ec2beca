//! # Property Permission Table
//!
//! Resolves the read and write permission of a property id. System
//! properties come from a compiled table and can never be remapped; vendor
//! properties default to the vendor extension permission and may be
//! customized exactly once through a flat `config_array` of
//! `(property_id, read_code, write_code)` triples.

use super::ValidationError;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use vhal_types::{is_vendor_property, property_ids::*, Hex};

pub const CAR_INFO: &str = "android.car.permission.CAR_INFO";
pub const CAR_IDENTIFICATION: &str = "android.car.permission.CAR_IDENTIFICATION";
pub const CAR_MILEAGE: &str = "android.car.permission.CAR_MILEAGE";
pub const CAR_SPEED: &str = "android.car.permission.CAR_SPEED";
pub const CAR_ENERGY_PORTS: &str = "android.car.permission.CAR_ENERGY_PORTS";
pub const CONTROL_CAR_ENERGY_PORTS: &str = "android.car.permission.CONTROL_CAR_ENERGY_PORTS";
pub const CAR_POWERTRAIN: &str = "android.car.permission.CAR_POWERTRAIN";
pub const CAR_EXTERIOR_ENVIRONMENT: &str = "android.car.permission.CAR_EXTERIOR_ENVIRONMENT";
pub const CAR_EXTERIOR_LIGHTS: &str = "android.car.permission.CAR_EXTERIOR_LIGHTS";
pub const CONTROL_CAR_CLIMATE: &str = "android.car.permission.CONTROL_CAR_CLIMATE";
pub const READ_CAR_DISPLAY_UNITS: &str = "android.car.permission.READ_CAR_DISPLAY_UNITS";
pub const CONTROL_CAR_DISPLAY_UNITS: &str = "android.car.permission.CONTROL_CAR_DISPLAY_UNITS";
pub const CAR_EPOCH_TIME: &str = "android.car.permission.CAR_EPOCH_TIME";
pub const CAR_POWER: &str = "android.car.permission.CAR_POWER";
pub const CAR_MONITOR_INPUT: &str = "android.car.permission.CAR_MONITOR_INPUT";
pub const CAR_DIAGNOSTICS: &str = "android.car.permission.CAR_DIAGNOSTICS";
pub const CLEAR_CAR_DIAGNOSTICS: &str = "android.car.permission.CLEAR_CAR_DIAGNOSTICS";
pub const MANAGE_USERS: &str = "android.permission.MANAGE_USERS";
pub const READ_CAR_VENDOR_PERMISSION_INFO: &str =
    "android.car.permission.READ_CAR_VENDOR_PERMISSION_INFO";
pub const CAR_INSTRUMENT_CLUSTER_CONTROL: &str =
    "android.car.permission.CAR_INSTRUMENT_CLUSTER_CONTROL";
pub const CAR_VENDOR_EXTENSION: &str = "android.car.permission.CAR_VENDOR_EXTENSION";

/// Vendor permission code meaning "no access through this layer"
pub const PERMISSION_NOT_ACCESSIBLE: i32 = 0xf000_0000_u32 as i32;
pub const PERMISSION_DEFAULT: i32 = 0x0000_0000;

/// Resolved permissions of one property; `None` means no access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionEntry {
    pub read: Option<&'static str>,
    pub write: Option<&'static str>,
}

impl PermissionEntry {
    const fn new(read: Option<&'static str>, write: Option<&'static str>) -> Self {
        Self { read, write }
    }
}

const fn read_only(read: &'static str) -> PermissionEntry {
    PermissionEntry::new(Some(read), None)
}

const fn read_write(read: &'static str, write: &'static str) -> PermissionEntry {
    PermissionEntry::new(Some(read), Some(write))
}

static SYSTEM_PERMISSIONS: Lazy<HashMap<i32, PermissionEntry>> = Lazy::new(|| {
    HashMap::from([
        (INFO_VIN, read_only(CAR_IDENTIFICATION)),
        (INFO_MAKE, read_only(CAR_INFO)),
        (INFO_MODEL_YEAR, read_only(CAR_INFO)),
        (INFO_FUEL_CAPACITY, read_only(CAR_INFO)),
        (INFO_FUEL_TYPE, read_only(CAR_INFO)),
        (PERF_ODOMETER, read_only(CAR_MILEAGE)),
        (PERF_VEHICLE_SPEED, read_only(CAR_SPEED)),
        (FUEL_DOOR_OPEN, read_write(CAR_ENERGY_PORTS, CONTROL_CAR_ENERGY_PORTS)),
        (GEAR_SELECTION, read_only(CAR_POWERTRAIN)),
        (CURRENT_GEAR, read_only(CAR_POWERTRAIN)),
        (PARKING_BRAKE_ON, read_only(CAR_POWERTRAIN)),
        (NIGHT_MODE, read_only(CAR_EXTERIOR_ENVIRONMENT)),
        (TURN_SIGNAL_STATE, read_only(CAR_EXTERIOR_LIGHTS)),
        (IGNITION_STATE, read_only(CAR_POWERTRAIN)),
        (HVAC_FAN_SPEED, read_write(CONTROL_CAR_CLIMATE, CONTROL_CAR_CLIMATE)),
        (HVAC_FAN_DIRECTION, read_write(CONTROL_CAR_CLIMATE, CONTROL_CAR_CLIMATE)),
        (HVAC_TEMPERATURE_SET, read_write(CONTROL_CAR_CLIMATE, CONTROL_CAR_CLIMATE)),
        (HVAC_TEMPERATURE_DISPLAY_UNITS, read_write(CONTROL_CAR_CLIMATE, CONTROL_CAR_CLIMATE)),
        (HVAC_POWER_ON, read_write(CONTROL_CAR_CLIMATE, CONTROL_CAR_CLIMATE)),
        (DISTANCE_DISPLAY_UNITS, read_write(READ_CAR_DISPLAY_UNITS, CONTROL_CAR_DISPLAY_UNITS)),
        (EPOCH_TIME, PermissionEntry::new(None, Some(CAR_EPOCH_TIME))),
        (ENV_OUTSIDE_TEMPERATURE, read_only(CAR_EXTERIOR_ENVIRONMENT)),
        (AP_POWER_STATE_REQ, read_only(CAR_POWER)),
        (AP_POWER_STATE_REPORT, read_write(CAR_POWER, CAR_POWER)),
        (AP_POWER_BOOTUP_REASON, read_only(CAR_POWER)),
        (DISPLAY_BRIGHTNESS, read_write(CAR_POWER, CAR_POWER)),
        (HW_KEY_INPUT, read_only(CAR_MONITOR_INPUT)),
        (OBD2_LIVE_FRAME, read_only(CAR_DIAGNOSTICS)),
        (OBD2_FREEZE_FRAME, read_only(CAR_DIAGNOSTICS)),
        (OBD2_FREEZE_FRAME_INFO, read_only(CAR_DIAGNOSTICS)),
        (OBD2_FREEZE_FRAME_CLEAR, PermissionEntry::new(None, Some(CLEAR_CAR_DIAGNOSTICS))),
        (SUPPORT_CUSTOMIZE_VENDOR_PERMISSION, read_only(READ_CAR_VENDOR_PERMISSION_INFO)),
        (INITIAL_USER_INFO, read_write(MANAGE_USERS, MANAGE_USERS)),
        (SWITCH_USER, read_write(MANAGE_USERS, MANAGE_USERS)),
        (CREATE_USER, read_write(MANAGE_USERS, MANAGE_USERS)),
        (REMOVE_USER, read_write(MANAGE_USERS, MANAGE_USERS)),
        (USER_IDENTIFICATION_ASSOCIATION, read_write(MANAGE_USERS, MANAGE_USERS)),
        (CLUSTER_SWITCH_UI, read_only(CAR_INSTRUMENT_CLUSTER_CONTROL)),
        (CLUSTER_DISPLAY_STATE, read_only(CAR_INSTRUMENT_CLUSTER_CONTROL)),
        (
            CLUSTER_REPORT_STATE,
            PermissionEntry::new(None, Some(CAR_INSTRUMENT_CLUSTER_CONTROL)),
        ),
        (
            CLUSTER_REQUEST_DISPLAY,
            PermissionEntry::new(None, Some(CAR_INSTRUMENT_CLUSTER_CONTROL)),
        ),
        (
            CLUSTER_NAVIGATION_STATE,
            PermissionEntry::new(None, Some(CAR_INSTRUMENT_CLUSTER_CONTROL)),
        ),
    ])
});

/// Map a vendor permission code to its permission string
fn vendor_permission(code: i32) -> Option<Option<&'static str>> {
    let permission = match code {
        PERMISSION_DEFAULT => CAR_VENDOR_EXTENSION,
        PERMISSION_NOT_ACCESSIBLE => return Some(None),
        0x01 => "android.car.permission.SET_CAR_VENDOR_CATEGORY_WINDOW",
        0x02 => "android.car.permission.GET_CAR_VENDOR_CATEGORY_WINDOW",
        0x03 => "android.car.permission.SET_CAR_VENDOR_CATEGORY_DOOR",
        0x04 => "android.car.permission.GET_CAR_VENDOR_CATEGORY_DOOR",
        0x05 => "android.car.permission.SET_CAR_VENDOR_CATEGORY_SEAT",
        0x06 => "android.car.permission.GET_CAR_VENDOR_CATEGORY_SEAT",
        0x07 => "android.car.permission.SET_CAR_VENDOR_CATEGORY_MIRROR",
        0x08 => "android.car.permission.GET_CAR_VENDOR_CATEGORY_MIRROR",
        0x09 => "android.car.permission.SET_CAR_VENDOR_CATEGORY_INFO",
        0x0a => "android.car.permission.GET_CAR_VENDOR_CATEGORY_INFO",
        0x0b => "android.car.permission.SET_CAR_VENDOR_CATEGORY_ENGINE",
        0x0c => "android.car.permission.GET_CAR_VENDOR_CATEGORY_ENGINE",
        0x0d => "android.car.permission.SET_CAR_VENDOR_CATEGORY_HVAC",
        0x0e => "android.car.permission.GET_CAR_VENDOR_CATEGORY_HVAC",
        0x0f => "android.car.permission.SET_CAR_VENDOR_CATEGORY_LIGHT",
        0x10 => "android.car.permission.GET_CAR_VENDOR_CATEGORY_LIGHT",
        _ => return None,
    };
    Some(Some(permission))
}

const DEFAULT_VENDOR_ENTRY: PermissionEntry =
    PermissionEntry::new(Some(CAR_VENDOR_EXTENSION), Some(CAR_VENDOR_EXTENSION));

#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    vendor_ids: HashSet<i32>,
    customized: HashMap<i32, PermissionEntry>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_system_property(property_id: i32) -> bool {
        SYSTEM_PERMISSIONS.contains_key(&property_id)
    }

    /// Track vendor ids reported by the channel; other ids are ignored
    pub fn register_vendor_properties(&mut self, property_ids: impl IntoIterator<Item = i32>) {
        for property_id in property_ids {
            if is_vendor_property(property_id) && !Self::is_system_property(property_id) {
                self.vendor_ids.insert(property_id);
            }
        }
    }

    pub fn entry(&self, property_id: i32) -> Option<PermissionEntry> {
        if let Some(entry) = SYSTEM_PERMISSIONS.get(&property_id) {
            return Some(*entry);
        }
        if let Some(entry) = self.customized.get(&property_id) {
            return Some(*entry);
        }
        self.vendor_ids
            .contains(&property_id)
            .then_some(DEFAULT_VENDOR_ENTRY)
    }

    pub fn read_permission(&self, property_id: i32) -> Option<&'static str> {
        self.entry(property_id).and_then(|entry| entry.read)
    }

    pub fn write_permission(&self, property_id: i32) -> Option<&'static str> {
        self.entry(property_id).and_then(|entry| entry.write)
    }

    pub fn is_supported(&self, property_id: i32) -> bool {
        Self::is_system_property(property_id) || self.vendor_ids.contains(&property_id)
    }

    /// Apply vendor permission triples. The whole array is validated before
    /// anything is applied, so a rejected call leaves the table unchanged.
    pub fn customize_vendor_permission(
        &mut self,
        config_array: &[i32],
    ) -> Result<(), ValidationError> {
        if config_array.len() % 3 != 0 {
            return Err(ValidationError::MalformedPermissionArray {
                len: config_array.len(),
            });
        }

        let mut staged = HashMap::new();
        for triple in config_array.chunks_exact(3) {
            let (property_id, read_code, write_code) = (triple[0], triple[1], triple[2]);
            if Self::is_system_property(property_id) {
                return Err(ValidationError::SystemPropertyRemap {
                    property_id: Hex(property_id),
                });
            }
            if !is_vendor_property(property_id) {
                return Err(ValidationError::NotVendorProperty {
                    property_id: Hex(property_id),
                });
            }
            if self.customized.contains_key(&property_id) || staged.contains_key(&property_id) {
                return Err(ValidationError::AlreadyCustomized {
                    property_id: Hex(property_id),
                });
            }
            let read = vendor_permission(read_code).ok_or(ValidationError::UnknownPermissionCode {
                property_id: Hex(property_id),
                code: read_code,
            })?;
            let write = vendor_permission(write_code).ok_or(ValidationError::UnknownPermissionCode {
                property_id: Hex(property_id),
                code: write_code,
            })?;
            staged.insert(property_id, PermissionEntry::new(read, write));
        }

        info!("Customizing permissions of {} vendor properties", staged.len());
        for (property_id, entry) in staged {
            debug!(property_id = %Hex(property_id), ?entry, "vendor permission customized");
            self.vendor_ids.insert(property_id);
            self.customized.insert(property_id, entry);
        }
        Ok(())
    }
}

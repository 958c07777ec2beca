//! Static per-property descriptors
//!
//! Configs are fetched once from the channel at router initialization and
//! never change afterwards.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

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
pub enum PropertyAccess {
    None = 0,
    Read = 1,
    Write = 2,
    ReadWrite = 3,
}

impl PropertyAccess {
    pub fn is_readable(self) -> bool {
        matches!(self, PropertyAccess::Read | PropertyAccess::ReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, PropertyAccess::Write | PropertyAccess::ReadWrite)
    }
}

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
pub enum ChangeMode {
    Static = 0,
    OnChange = 1,
    Continuous = 2,
}

/// Per-area value bounds. A zero `min == max` pair means "unbounded".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub area_id: i32,
    pub min_int32: i32,
    pub max_int32: i32,
    pub min_int64: i64,
    pub max_int64: i64,
    pub min_float: f32,
    pub max_float: f32,
}

impl AreaConfig {
    pub fn new(area_id: i32) -> Self {
        Self {
            area_id,
            ..Default::default()
        }
    }

    pub fn with_int32_range(mut self, min: i32, max: i32) -> Self {
        self.min_int32 = min;
        self.max_int32 = max;
        self
    }

    pub fn with_int64_range(mut self, min: i64, max: i64) -> Self {
        self.min_int64 = min;
        self.max_int64 = max;
        self
    }

    pub fn with_float_range(mut self, min: f32, max: f32) -> Self {
        self.min_float = min;
        self.max_float = max;
        self
    }

    pub fn int32_range(&self) -> Option<(i32, i32)> {
        (self.min_int32 != 0 || self.max_int32 != 0).then_some((self.min_int32, self.max_int32))
    }

    pub fn int64_range(&self) -> Option<(i64, i64)> {
        (self.min_int64 != 0 || self.max_int64 != 0).then_some((self.min_int64, self.max_int64))
    }

    pub fn float_range(&self) -> Option<(f32, f32)> {
        (self.min_float != 0.0 || self.max_float != 0.0).then_some((self.min_float, self.max_float))
    }
}

/// Static descriptor for one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub property_id: i32,
    pub access: PropertyAccess,
    pub change_mode: ChangeMode,
    pub area_configs: Vec<AreaConfig>,
    /// Property-specific parameters (mixed layout, custom sensor counts, ...)
    pub config_array: Vec<i32>,
    pub config_string: String,
    pub min_sample_rate: f32,
    pub max_sample_rate: f32,
}

impl PropertyConfig {
    pub fn new(property_id: i32, access: PropertyAccess, change_mode: ChangeMode) -> Self {
        Self {
            property_id,
            access,
            change_mode,
            area_configs: Vec::new(),
            config_array: Vec::new(),
            config_string: String::new(),
            min_sample_rate: 0.0,
            max_sample_rate: 0.0,
        }
    }

    pub fn with_config_array(mut self, config_array: Vec<i32>) -> Self {
        self.config_array = config_array;
        self
    }

    pub fn with_area(mut self, area: AreaConfig) -> Self {
        self.area_configs.push(area);
        self
    }

    pub fn with_sample_rates(mut self, min: f32, max: f32) -> Self {
        self.min_sample_rate = min;
        self.max_sample_rate = max;
        self
    }

    pub fn area_config(&self, area_id: i32) -> Option<&AreaConfig> {
        self.area_configs.iter().find(|area| area.area_id == area_id)
    }

    /// Clamp a requested sample rate into the declared range. An inverted
    /// or NaN range leaves the rate as requested.
    pub fn clamp_sample_rate(&self, rate: f32) -> f32 {
        if self.change_mode != ChangeMode::Continuous {
            return 0.0;
        }
        if !self.has_sample_rate_range() {
            return rate;
        }
        rate.max(self.min_sample_rate).min(self.max_sample_rate)
    }

    /// True when the declared range is usable for clamping
    pub fn has_sample_rate_range(&self) -> bool {
        self.max_sample_rate > 0.0 && self.min_sample_rate <= self.max_sample_rate
    }
}

//! Per-property value schema
//!
//! The meaning of `config_array` depends on the property. For mixed
//! properties its first nine elements describe which sub-fields a value
//! carries and in which container:
//!
//! ```text
//! [0] has_string   [1] has_bool
//! [2] has_int32    [3] int32 vector length
//! [4] has_int64    [5] int64 vector length
//! [6] has_float    [7] float vector length
//! [8] byte vector length
//! ```
//!
//! The descriptor is compiled once per property (`PropertySchema`) so call
//! sites never re-interpret raw integers. Diagnostic frames are mixed too,
//! but their `config_array` holds vendor sensor counts (`FrameLayout`).

use crate::diagnostic::{DiagnosticFrameType, FrameLayout};
use crate::error::{CodecError, CodecResult};
use std::collections::HashMap;
use tracing::debug;
use vhal_types::{PropertyConfig, PropertyType};

pub const MIXED_LAYOUT_LEN: usize = 9;

/// Compiled mixed layout descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MixedLayout {
    pub has_string: bool,
    pub has_bool: bool,
    pub has_int32: bool,
    pub int32_count: usize,
    pub has_int64: bool,
    pub int64_count: usize,
    pub has_float: bool,
    pub float_count: usize,
    pub byte_count: usize,
}

impl MixedLayout {
    pub fn from_config_array(property_id: i32, config_array: &[i32]) -> CodecResult<Self> {
        if config_array.len() < MIXED_LAYOUT_LEN {
            return Err(CodecError::invalid_layout(
                property_id,
                format!(
                    "descriptor needs {} elements, found {}",
                    MIXED_LAYOUT_LEN,
                    config_array.len()
                ),
                config_array,
            ));
        }

        let flag = |index: usize| -> CodecResult<bool> {
            match config_array[index] {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(CodecError::invalid_layout(
                    property_id,
                    format!("presence flag at [{}] must be 0 or 1, found {}", index, other),
                    config_array,
                )),
            }
        };
        let count = |index: usize| -> CodecResult<usize> {
            usize::try_from(config_array[index]).map_err(|_| {
                CodecError::invalid_layout(
                    property_id,
                    format!("count at [{}] is negative", index),
                    config_array,
                )
            })
        };

        Ok(Self {
            has_string: flag(0)?,
            has_bool: flag(1)?,
            has_int32: flag(2)?,
            int32_count: count(3)?,
            has_int64: flag(4)?,
            int64_count: count(5)?,
            has_float: flag(6)?,
            float_count: count(7)?,
            byte_count: count(8)?,
        })
    }

    /// Number of `int32s` elements a value must carry: bool, scalar, vector
    pub fn int32_len(&self) -> usize {
        usize::from(self.has_bool) + usize::from(self.has_int32) + self.int32_count
    }

    pub fn int64_len(&self) -> usize {
        usize::from(self.has_int64) + self.int64_count
    }

    pub fn float_len(&self) -> usize {
        usize::from(self.has_float) + self.float_count
    }

    pub fn byte_len(&self) -> usize {
        self.byte_count
    }

    /// Presence mask in fixed field order: string, bool, int32, int64, float, byte
    pub fn field_mask(&self) -> [bool; 6] {
        [
            self.has_string,
            self.has_bool,
            self.has_int32 || self.int32_count > 0,
            self.has_int64 || self.int64_count > 0,
            self.has_float || self.float_count > 0,
            self.byte_count > 0,
        ]
    }
}

/// Compiled view of a property's declared shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    pub property_id: i32,
    pub property_type: PropertyType,
    pub mixed: Option<MixedLayout>,
}

impl PropertySchema {
    pub fn compile(config: &PropertyConfig) -> CodecResult<Self> {
        let property_type = PropertyType::of(config.property_id)
            .ok_or_else(|| CodecError::unknown_type(config.property_id))?;
        let mixed = match property_type {
            PropertyType::Mixed if DiagnosticFrameType::of(config.property_id).is_some() => {
                FrameLayout::from_config(config)?;
                None
            }
            PropertyType::Mixed => Some(MixedLayout::from_config_array(
                config.property_id,
                &config.config_array,
            )?),
            _ => None,
        };
        Ok(Self {
            property_id: config.property_id,
            property_type,
            mixed,
        })
    }

    pub fn mixed_layout(&self) -> CodecResult<&MixedLayout> {
        self.mixed.as_ref().ok_or_else(|| {
            CodecError::invalid_layout(self.property_id, "property has no mixed layout", &[])
        })
    }
}

/// Schemas for every configured property, keyed by property id
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    schemas: HashMap<i32, PropertySchema>,
}

impl SchemaTable {
    /// Compile every config. Mixed properties whose descriptor is absent are
    /// skipped; a present but malformed descriptor fails the whole table.
    pub fn compile<'a>(
        configs: impl IntoIterator<Item = &'a PropertyConfig>,
    ) -> CodecResult<Self> {
        let mut schemas = HashMap::new();
        for config in configs {
            let is_mixed = PropertyType::of(config.property_id) == Some(PropertyType::Mixed)
                && DiagnosticFrameType::of(config.property_id).is_none();
            if is_mixed && config.config_array.is_empty() {
                debug!(
                    property_id = %format_args!("{:#x}", config.property_id),
                    "mixed property declares no layout, typed conversion disabled"
                );
                continue;
            }
            match PropertySchema::compile(config) {
                Ok(schema) => {
                    schemas.insert(config.property_id, schema);
                }
                Err(CodecError::UnknownPropertyType { .. }) => {
                    debug!(
                        property_id = %format_args!("{:#x}", config.property_id),
                        "property id carries no value type"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self { schemas })
    }

    pub fn get(&self, property_id: i32) -> Option<&PropertySchema> {
        self.schemas.get(&property_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhal_types::property_ids::*;
    use vhal_types::{ChangeMode, PropertyAccess};

    #[test]
    fn test_layout_lengths() {
        let layout =
            MixedLayout::from_config_array(SWITCH_USER, &[1, 1, 1, 2, 0, 0, 1, 3, 4]).unwrap();
        assert_eq!(layout.int32_len(), 4);
        assert_eq!(layout.int64_len(), 0);
        assert_eq!(layout.float_len(), 4);
        assert_eq!(layout.byte_len(), 4);
        assert_eq!(layout.field_mask(), [true, true, true, false, true, true]);
    }

    #[test]
    fn test_short_descriptor_rejected() {
        let err = MixedLayout::from_config_array(SWITCH_USER, &[1, 0, 1]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidMixedLayout { .. }));
        assert!(err.to_string().contains("0x11e00f08"));
    }

    #[test]
    fn test_bad_flag_and_negative_count_rejected() {
        assert!(MixedLayout::from_config_array(SWITCH_USER, &[2, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        let negative = [0, 0, 0, -1, 0, 0, 0, 0, 0];
        assert!(MixedLayout::from_config_array(SWITCH_USER, &negative).is_err());
    }

    #[test]
    fn test_table_compilation() {
        let configs = vec![
            PropertyConfig::new(GEAR_SELECTION, PropertyAccess::Read, ChangeMode::OnChange),
            PropertyConfig::new(SWITCH_USER, PropertyAccess::ReadWrite, ChangeMode::OnChange),
            PropertyConfig::new(CLUSTER_REPORT_STATE, PropertyAccess::Write, ChangeMode::OnChange)
                .with_config_array(vec![0, 0, 0, 11, 0, 0, 0, 0, 16]),
        ];
        let table = SchemaTable::compile(&configs).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(GEAR_SELECTION).unwrap().property_type, PropertyType::Int32);
        assert_eq!(table.get(CLUSTER_REPORT_STATE).unwrap().mixed.unwrap().int32_count, 11);
        assert!(table.get(SWITCH_USER).is_none());

        let broken = vec![PropertyConfig::new(
            CLUSTER_REPORT_STATE,
            PropertyAccess::Write,
            ChangeMode::OnChange,
        )
        .with_config_array(vec![0, 0, 0])];
        assert!(SchemaTable::compile(&broken).is_err());
    }

    #[test]
    fn test_diagnostic_frames_keep_sensor_counts() {
        let configs = vec![
            PropertyConfig::new(OBD2_LIVE_FRAME, PropertyAccess::Read, ChangeMode::OnChange)
                .with_config_array(vec![0, 0]),
            PropertyConfig::new(OBD2_FREEZE_FRAME, PropertyAccess::Read, ChangeMode::OnChange)
                .with_config_array(vec![8, 1]),
        ];
        let table = SchemaTable::compile(&configs).unwrap();
        let live = table.get(OBD2_LIVE_FRAME).unwrap();
        assert_eq!(live.property_type, PropertyType::Mixed);
        assert!(live.mixed.is_none());
        assert!(table.get(OBD2_FREEZE_FRAME).unwrap().mixed.is_none());

        let negative = vec![
            PropertyConfig::new(OBD2_FREEZE_FRAME, PropertyAccess::Read, ChangeMode::OnChange)
                .with_config_array(vec![-1, 0]),
        ];
        assert!(matches!(
            SchemaTable::compile(&negative),
            Err(CodecError::InvalidMixedLayout { .. })
        ));
    }
}

//! OBD2 diagnostic frames
//!
//! A live or freeze frame is a mixed value:
//!
//! ```text
//! int32s  = 32 system int sensors   + N vendor int sensors
//! floats  = 71 system float sensors + M vendor float sensors
//! bytes   = presence bitmask over ints then floats (bit i in byte i / 8)
//! string  = diagnostic trouble code, empty for live frames
//! ```
//!
//! `N` and `M` come from `config_array[0]` and `config_array[1]`.

use crate::builder::elapsed_nanos;
use crate::error::{CodecError, CodecResult};
use std::collections::BTreeMap;
use vhal_types::property_ids::{OBD2_FREEZE_FRAME, OBD2_FREEZE_FRAME_CLEAR, OBD2_LIVE_FRAME};
use vhal_types::{PropertyConfig, PropertyType, PropertyValue, RawPropValues, GLOBAL_AREA_ID};

pub const SYSTEM_INT_SENSOR_COUNT: usize = 32;
pub const SYSTEM_FLOAT_SENSOR_COUNT: usize = 71;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticFrameType {
    Live,
    Freeze,
}

impl DiagnosticFrameType {
    pub fn of(property_id: i32) -> Option<Self> {
        match property_id {
            OBD2_LIVE_FRAME => Some(Self::Live),
            OBD2_FREEZE_FRAME => Some(Self::Freeze),
            _ => None,
        }
    }

    pub fn property_id(self) -> i32 {
        match self {
            Self::Live => OBD2_LIVE_FRAME,
            Self::Freeze => OBD2_FREEZE_FRAME,
        }
    }
}

/// Sensor counts of one frame property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub vendor_int_count: usize,
    pub vendor_float_count: usize,
}

impl FrameLayout {
    pub fn from_config(config: &PropertyConfig) -> CodecResult<Self> {
        let count = |index: usize| -> CodecResult<usize> {
            let raw = config.config_array.get(index).copied().unwrap_or(0);
            usize::try_from(raw).map_err(|_| {
                CodecError::invalid_layout(
                    config.property_id,
                    format!("vendor sensor count at [{}] is negative", index),
                    &config.config_array,
                )
            })
        };
        Ok(Self {
            vendor_int_count: count(0)?,
            vendor_float_count: count(1)?,
        })
    }

    pub fn int_count(&self) -> usize {
        SYSTEM_INT_SENSOR_COUNT + self.vendor_int_count
    }

    pub fn float_count(&self) -> usize {
        SYSTEM_FLOAT_SENSOR_COUNT + self.vendor_float_count
    }

    pub fn mask_len(&self) -> usize {
        (self.int_count() + self.float_count()).div_ceil(8)
    }
}

/// Decoded frame holding only the sensors flagged present
#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    pub frame_type: DiagnosticFrameType,
    pub timestamp: i64,
    pub int_values: BTreeMap<usize, i32>,
    pub float_values: BTreeMap<usize, f32>,
    pub dtc: Option<String>,
}

impl PartialEq for DiagnosticEvent {
    fn eq(&self, other: &Self) -> bool {
        self.frame_type == other.frame_type
            && self.timestamp == other.timestamp
            && self.int_values == other.int_values
            && self.dtc == other.dtc
            && self.float_values.len() == other.float_values.len()
            && self
                .float_values
                .iter()
                .zip(other.float_values.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va.to_bits() == vb.to_bits())
    }
}

impl Eq for DiagnosticEvent {}

fn is_present(mask: &[u8], bit: usize) -> bool {
    mask.get(bit / 8).is_some_and(|byte| byte & (1 << (bit % 8)) != 0)
}

impl DiagnosticEvent {
    pub fn from_property_value(
        value: &PropertyValue,
        config: &PropertyConfig,
    ) -> CodecResult<Self> {
        let property_id = value.property_id();
        let frame_type = DiagnosticFrameType::of(property_id).ok_or_else(|| {
            CodecError::malformed(property_id, Some(PropertyType::Mixed), "not a diagnostic frame")
        })?;
        let layout = FrameLayout::from_config(config)?;

        let malformed =
            |reason: String| CodecError::malformed(property_id, Some(PropertyType::Mixed), reason);
        if value.int32s().len() != layout.int_count() {
            return Err(malformed(format!(
                "expected {} int sensors, found {}",
                layout.int_count(),
                value.int32s().len()
            )));
        }
        if value.floats().len() != layout.float_count() {
            return Err(malformed(format!(
                "expected {} float sensors, found {}",
                layout.float_count(),
                value.floats().len()
            )));
        }
        if value.bytes().len() < layout.mask_len() {
            return Err(malformed(format!(
                "presence mask needs {} bytes, found {}",
                layout.mask_len(),
                value.bytes().len()
            )));
        }

        let mask = value.bytes();
        let int_values = value
            .int32s()
            .iter()
            .enumerate()
            .filter(|(i, _)| is_present(mask, *i))
            .map(|(i, v)| (i, *v))
            .collect();
        let float_values = value
            .floats()
            .iter()
            .enumerate()
            .filter(|(i, _)| is_present(mask, layout.int_count() + i))
            .map(|(i, v)| (i, *v))
            .collect();
        let dtc = (!value.string().is_empty()).then(|| value.string().to_string());

        Ok(Self {
            frame_type,
            timestamp: value.timestamp(),
            int_values,
            float_values,
            dtc,
        })
    }
}

/// Builds a `DiagnosticEvent` and the frame value that encodes it
#[derive(Debug, Clone)]
pub struct DiagnosticEventBuilder {
    frame_type: DiagnosticFrameType,
    layout: FrameLayout,
    timestamp: i64,
    int_values: BTreeMap<usize, i32>,
    float_values: BTreeMap<usize, f32>,
    dtc: Option<String>,
}

impl DiagnosticEventBuilder {
    pub fn new(
        frame_type: DiagnosticFrameType,
        vendor_int_count: usize,
        vendor_float_count: usize,
    ) -> Self {
        Self {
            frame_type,
            layout: FrameLayout {
                vendor_int_count,
                vendor_float_count,
            },
            timestamp: 0,
            int_values: BTreeMap::new(),
            float_values: BTreeMap::new(),
            dtc: None,
        }
    }

    pub fn for_config(
        frame_type: DiagnosticFrameType,
        config: &PropertyConfig,
    ) -> CodecResult<Self> {
        let layout = FrameLayout::from_config(config)?;
        Ok(Self::new(frame_type, layout.vendor_int_count, layout.vendor_float_count))
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn int_value(mut self, index: usize, value: i32) -> Self {
        self.int_values.insert(index, value);
        self
    }

    pub fn float_value(mut self, index: usize, value: f32) -> Self {
        self.float_values.insert(index, value);
        self
    }

    pub fn dtc(mut self, dtc: impl Into<String>) -> Self {
        self.dtc = Some(dtc.into());
        self
    }

    pub fn build(&self) -> DiagnosticEvent {
        DiagnosticEvent {
            frame_type: self.frame_type,
            timestamp: self.timestamp,
            int_values: self.int_values.clone(),
            float_values: self.float_values.clone(),
            dtc: self.dtc.clone(),
        }
    }

    /// Encode as the mixed frame value the channel reports
    pub fn to_property_value(&self) -> CodecResult<PropertyValue> {
        let property_id = self.frame_type.property_id();
        let out_of_range = |kind: &str, index: usize| {
            CodecError::malformed(
                property_id,
                Some(PropertyType::Mixed),
                format!("{} sensor index {} outside frame", kind, index),
            )
        };

        let mut mask = vec![0u8; self.layout.mask_len()];
        let mut set_bit = |bit: usize| mask[bit / 8] |= 1 << (bit % 8);

        let mut int32s = vec![0; self.layout.int_count()];
        for (&index, &value) in &self.int_values {
            *int32s.get_mut(index).ok_or_else(|| out_of_range("int", index))? = value;
            set_bit(index);
        }
        let mut floats = vec![0.0; self.layout.float_count()];
        for (&index, &value) in &self.float_values {
            *floats.get_mut(index).ok_or_else(|| out_of_range("float", index))? = value;
            set_bit(self.layout.int_count() + index);
        }

        Ok(PropertyValue::new(
            property_id,
            GLOBAL_AREA_ID,
            self.timestamp,
            0,
            RawPropValues {
                int32s,
                floats,
                int64s: Vec::new(),
                bytes: mask,
                string: self.dtc.clone().unwrap_or_default(),
            },
        ))
    }
}

/// Request value asking for the freeze frame recorded at `timestamp`
pub fn freeze_frame_request(timestamp: i64) -> PropertyValue {
    PropertyValue::new(
        OBD2_FREEZE_FRAME,
        GLOBAL_AREA_ID,
        elapsed_nanos(),
        0,
        RawPropValues::int64s(vec![timestamp]),
    )
}

/// Clear the listed freeze frames; an empty list clears all of them
pub fn freeze_frame_clear_request(timestamps: Vec<i64>) -> PropertyValue {
    PropertyValue::new(
        OBD2_FREEZE_FRAME_CLEAR,
        GLOBAL_AREA_ID,
        elapsed_nanos(),
        0,
        RawPropValues::int64s(timestamps),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhal_types::{ChangeMode, PropertyAccess};

    fn frame_config(property_id: i32, vendor_ints: i32, vendor_floats: i32) -> PropertyConfig {
        PropertyConfig::new(property_id, PropertyAccess::Read, ChangeMode::OnChange)
            .with_config_array(vec![vendor_ints, vendor_floats])
    }

    #[test]
    fn test_mask_length() {
        let layout = FrameLayout {
            vendor_int_count: 8,
            vendor_float_count: 1,
        };
        assert_eq!(layout.int_count(), 40);
        assert_eq!(layout.float_count(), 72);
        assert_eq!(layout.mask_len(), 14);
    }

    #[test]
    fn test_only_present_sensors_kept() {
        let config = frame_config(OBD2_LIVE_FRAME, 0, 0);
        let mut values = RawPropValues::int32s((0..32).collect());
        values.floats = (0..71).map(|v| v as f32).collect();
        values.bytes = vec![0; 13];
        values.bytes[0] = 0b0000_0101;
        // float sensor 3 lives at bit 35
        values.bytes[4] = 0b0000_1000;
        let value = PropertyValue::new(OBD2_LIVE_FRAME, GLOBAL_AREA_ID, 99, 0, values);

        let event = DiagnosticEvent::from_property_value(&value, &config).unwrap();
        assert_eq!(event.frame_type, DiagnosticFrameType::Live);
        assert_eq!(event.int_values.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(event.float_values.get(&3), Some(&3.0));
        assert_eq!(event.float_values.len(), 1);
        assert_eq!(event.dtc, None);
    }

    #[test]
    fn test_wrong_sensor_count_rejected() {
        let config = frame_config(OBD2_LIVE_FRAME, 2, 0);
        let mut values = RawPropValues::int32s(vec![0; 32]);
        values.floats = vec![0.0; 71];
        values.bytes = vec![0; 13];
        let value = PropertyValue::new(OBD2_LIVE_FRAME, GLOBAL_AREA_ID, 0, 0, values);
        assert!(DiagnosticEvent::from_property_value(&value, &config).is_err());
    }

    #[test]
    fn test_builder_out_of_range_index() {
        let builder = DiagnosticEventBuilder::new(DiagnosticFrameType::Live, 0, 0).int_value(32, 1);
        assert!(builder.to_property_value().is_err());
    }

    #[test]
    fn test_freeze_frame_requests() {
        assert_eq!(freeze_frame_request(1234).int64s(), &[1234]);
        assert!(freeze_frame_clear_request(vec![]).int64s().is_empty());
    }
}

//! Typed application values
//!
//! Converts a `PropertyValue` into the value its declared type implies and
//! back again. Mixed values become an ordered field list whose shape follows
//! the property's `MixedLayout`.

use crate::error::{CodecError, CodecResult};
use crate::schema::{MixedLayout, PropertySchema};
use vhal_types::{PropertyConfig, PropertyType, PropertyValue, RawPropValues};

/// One sub-field of a mixed value
#[derive(Debug, Clone, PartialEq)]
pub enum MixedField {
    String(String),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Byte(u8),
}

impl MixedField {
    fn kind(&self) -> &'static str {
        match self {
            MixedField::String(_) => "string",
            MixedField::Bool(_) => "bool",
            MixedField::Int32(_) => "int32",
            MixedField::Int64(_) => "int64",
            MixedField::Float(_) => "float",
            MixedField::Byte(_) => "byte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int32(i32),
    Int32Vec(Vec<i32>),
    Float(f32),
    FloatVec(Vec<f32>),
    Int64(i64),
    Int64Vec(Vec<i64>),
    Bytes(Vec<u8>),
    String(String),
    Mixed(Vec<MixedField>),
}

impl TypedValue {
    fn kind(&self) -> &'static str {
        match self {
            TypedValue::Bool(_) => "bool",
            TypedValue::Int32(_) => "int32",
            TypedValue::Int32Vec(_) => "int32[]",
            TypedValue::Float(_) => "float",
            TypedValue::FloatVec(_) => "float[]",
            TypedValue::Int64(_) => "int64",
            TypedValue::Int64Vec(_) => "int64[]",
            TypedValue::Bytes(_) => "bytes",
            TypedValue::String(_) => "string",
            TypedValue::Mixed(_) => "mixed",
        }
    }
}

/// Application-level property value, addressed by manager property id
#[derive(Debug, Clone, PartialEq)]
pub struct CarPropertyValue {
    pub property_id: i32,
    pub area_id: i32,
    pub status: i32,
    pub timestamp: i64,
    pub value: TypedValue,
}

/// Convert using a config; compiles the schema on the spot
pub fn to_typed_value(
    value: &PropertyValue,
    mgr_property_id: i32,
    config: &PropertyConfig,
) -> CodecResult<CarPropertyValue> {
    to_typed_value_with_schema(value, mgr_property_id, &PropertySchema::compile(config)?)
}

pub fn to_typed_value_with_schema(
    value: &PropertyValue,
    mgr_property_id: i32,
    schema: &PropertySchema,
) -> CodecResult<CarPropertyValue> {
    let property_id = value.property_id();
    let expected = Some(schema.property_type);
    let single = |len: usize, container: &str| -> CodecResult<()> {
        if len == 0 {
            Err(CodecError::malformed(
                property_id,
                expected,
                format!("no element in {}", container),
            ))
        } else {
            Ok(())
        }
    };

    let typed = match schema.property_type {
        PropertyType::Boolean => {
            single(value.int32s().len(), "int32s")?;
            TypedValue::Bool(value.int32s()[0] != 0)
        }
        PropertyType::Int32 => {
            single(value.int32s().len(), "int32s")?;
            TypedValue::Int32(value.int32s()[0])
        }
        PropertyType::Int64 => {
            single(value.int64s().len(), "int64s")?;
            TypedValue::Int64(value.int64s()[0])
        }
        PropertyType::Float => {
            single(value.floats().len(), "floats")?;
            TypedValue::Float(value.floats()[0])
        }
        PropertyType::Int32Vec => TypedValue::Int32Vec(value.int32s().to_vec()),
        PropertyType::Int64Vec => TypedValue::Int64Vec(value.int64s().to_vec()),
        PropertyType::FloatVec => TypedValue::FloatVec(value.floats().to_vec()),
        PropertyType::Bytes => TypedValue::Bytes(value.bytes().to_vec()),
        PropertyType::String => TypedValue::String(value.string().to_owned()),
        PropertyType::Mixed => TypedValue::Mixed(unpack_mixed(value, schema.mixed_layout()?)?),
    };

    Ok(CarPropertyValue {
        property_id: mgr_property_id,
        area_id: value.area_id(),
        status: value.status(),
        timestamp: value.timestamp(),
        value: typed,
    })
}

/// Inverse of `to_typed_value`, addressed by the wire property id
pub fn from_typed_value(
    value: &CarPropertyValue,
    wire_property_id: i32,
    config: &PropertyConfig,
) -> CodecResult<PropertyValue> {
    from_typed_value_with_schema(value, wire_property_id, &PropertySchema::compile(config)?)
}

pub fn from_typed_value_with_schema(
    value: &CarPropertyValue,
    wire_property_id: i32,
    schema: &PropertySchema,
) -> CodecResult<PropertyValue> {
    let mismatch =
        || CodecError::type_mismatch(wire_property_id, schema.property_type, value.value.kind());

    let values = match (schema.property_type, &value.value) {
        (PropertyType::Boolean, TypedValue::Bool(b)) => RawPropValues::int32s(vec![i32::from(*b)]),
        (PropertyType::Int32, TypedValue::Int32(v)) => RawPropValues::int32s(vec![*v]),
        (PropertyType::Int64, TypedValue::Int64(v)) => RawPropValues::int64s(vec![*v]),
        (PropertyType::Float, TypedValue::Float(v)) => RawPropValues::floats(vec![*v]),
        (PropertyType::Int32Vec, TypedValue::Int32Vec(v)) => RawPropValues::int32s(v.clone()),
        (PropertyType::Int64Vec, TypedValue::Int64Vec(v)) => RawPropValues::int64s(v.clone()),
        (PropertyType::FloatVec, TypedValue::FloatVec(v)) => RawPropValues::floats(v.clone()),
        (PropertyType::Bytes, TypedValue::Bytes(v)) => RawPropValues::bytes(v.clone()),
        (PropertyType::String, TypedValue::String(v)) => RawPropValues::string(v.clone()),
        (PropertyType::Mixed, TypedValue::Mixed(fields)) => {
            pack_mixed(wire_property_id, fields, schema.mixed_layout()?)?
        }
        _ => return Err(mismatch()),
    };

    Ok(PropertyValue::new(
        wire_property_id,
        value.area_id,
        value.timestamp,
        value.status,
        values,
    ))
}

fn unpack_mixed(value: &PropertyValue, layout: &MixedLayout) -> CodecResult<Vec<MixedField>> {
    let property_id = value.property_id();
    let require = |have: usize, need: usize, container: &str| -> CodecResult<()> {
        if have < need {
            Err(CodecError::malformed(
                property_id,
                Some(PropertyType::Mixed),
                format!("{} carries {} elements, layout needs {}", container, have, need),
            ))
        } else {
            Ok(())
        }
    };
    require(value.int32s().len(), layout.int32_len(), "int32s")?;
    require(value.int64s().len(), layout.int64_len(), "int64s")?;
    require(value.floats().len(), layout.float_len(), "floats")?;
    require(value.bytes().len(), layout.byte_len(), "bytes")?;

    let mut fields = Vec::new();
    if layout.has_string {
        fields.push(MixedField::String(value.string().to_owned()));
    }

    let mut int32s = value.int32s().iter().copied();
    if layout.has_bool {
        fields.extend(int32s.next().map(|v| MixedField::Bool(v != 0)));
    }
    let int32_fields = usize::from(layout.has_int32) + layout.int32_count;
    fields.extend(int32s.take(int32_fields).map(MixedField::Int32));

    fields.extend(
        value
            .int64s()
            .iter()
            .take(layout.int64_len())
            .map(|&v| MixedField::Int64(v)),
    );
    fields.extend(
        value
            .floats()
            .iter()
            .take(layout.float_len())
            .map(|&v| MixedField::Float(v)),
    );
    fields.extend(
        value
            .bytes()
            .iter()
            .take(layout.byte_len())
            .map(|&v| MixedField::Byte(v)),
    );
    Ok(fields)
}

fn pack_mixed(
    property_id: i32,
    fields: &[MixedField],
    layout: &MixedLayout,
) -> CodecResult<RawPropValues> {
    let mut values = RawPropValues::default();
    let mut iter = fields.iter();
    let mut next = |want: &'static str| {
        iter.next().ok_or_else(|| {
            CodecError::malformed(
                property_id,
                Some(PropertyType::Mixed),
                format!("missing {} field", want),
            )
        })
    };
    let wrong = |want: &'static str, got: &MixedField| {
        CodecError::malformed(
            property_id,
            Some(PropertyType::Mixed),
            format!("expected {} field, found {}", want, got.kind()),
        )
    };

    if layout.has_string {
        match next("string")? {
            MixedField::String(s) => values.string = s.clone(),
            other => return Err(wrong("string", other)),
        }
    }
    if layout.has_bool {
        match next("bool")? {
            MixedField::Bool(b) => values.int32s.push(i32::from(*b)),
            other => return Err(wrong("bool", other)),
        }
    }
    for _ in 0..usize::from(layout.has_int32) + layout.int32_count {
        match next("int32")? {
            MixedField::Int32(v) => values.int32s.push(*v),
            other => return Err(wrong("int32", other)),
        }
    }
    for _ in 0..layout.int64_len() {
        match next("int64")? {
            MixedField::Int64(v) => values.int64s.push(*v),
            other => return Err(wrong("int64", other)),
        }
    }
    for _ in 0..layout.float_len() {
        match next("float")? {
            MixedField::Float(v) => values.floats.push(*v),
            other => return Err(wrong("float", other)),
        }
    }
    for _ in 0..layout.byte_len() {
        match next("byte")? {
            MixedField::Byte(v) => values.bytes.push(*v),
            other => return Err(wrong("byte", other)),
        }
    }

    if iter.next().is_some() {
        return Err(CodecError::malformed(
            property_id,
            Some(PropertyType::Mixed),
            format!("{} fields exceed the declared layout", fields.len()),
        ));
    }
    Ok(values)
}

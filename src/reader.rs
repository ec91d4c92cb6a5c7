//! Read half of the engine.

use std::str;

use uuid::Uuid;

use crate::buffer::ByteReader;
use crate::number::NumberTag;
use crate::schema::{FieldType, Value};
use crate::serializer::Serializer;
use crate::writer::MEMBER_IS_NULL;
use crate::{Result, WireError};

/// Outcome of a primitive read attempt.
///
/// `NotPrimitive` is not an error: it tells the caller that the bytes at the
/// cursor encode a full composite object and must be decoded through a
/// recursive schema-driven call on the remaining input.
#[derive(Debug)]
pub enum ReadOutcome {
    Value(Value),
    NotPrimitive,
}

/// Consumes encoded values from a bounds-checked cursor, handing composite
/// spans back to the owning [`Serializer`].
pub struct BinaryReader<'a> {
    cursor: ByteReader<'a>,
    serializer: &'a Serializer,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8], serializer: &'a Serializer) -> Self {
        Self {
            cursor: ByteReader::new(data),
            serializer,
        }
    }

    pub fn consumed(&self) -> usize {
        self.cursor.consumed()
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.cursor.remaining()
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.cursor.advance(n)
    }

    /// Reads the null flag and then one value of the declared type.
    ///
    /// For a composite declared type only the flag is consumed and
    /// [`ReadOutcome::NotPrimitive`] is returned.
    pub fn read(&mut self, declared: &FieldType) -> Result<ReadOutcome> {
        if self.read_bool()? == MEMBER_IS_NULL {
            return Ok(ReadOutcome::Value(Value::Null));
        }

        let value = match declared {
            FieldType::Bool => Value::Bool(self.read_bool()?),
            FieldType::Byte => Value::Byte(self.read_u8()?),
            FieldType::Short => Value::Short(self.read_i16()?),
            FieldType::UShort => Value::UShort(self.read_u16()?),
            FieldType::Char => Value::Char(self.read_char()?),
            FieldType::Int => Value::Int(self.read_number()?),
            FieldType::Float => Value::Float(self.read_float()?),
            FieldType::Str => Value::Str(self.read_string()?),
            FieldType::Enum => Value::Enum(self.read_number()?),
            FieldType::Guid => Value::Guid(self.read_guid()?),
            FieldType::List(element) => Value::List(self.read_list(element)?),
            FieldType::Map(key, value) => Value::Map(self.read_map(key, value)?),
            FieldType::Object(_) => return Ok(ReadOutcome::NotPrimitive),
        };
        Ok(ReadOutcome::Value(value))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::Decode(format!("invalid boolean byte: {other}"))),
        }
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.cursor.read_bytes(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.cursor.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.cursor.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.cursor.read_bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_char(&mut self) -> Result<char> {
        let code = u32::from(self.read_u16()?);
        char::from_u32(code)
            .ok_or_else(|| WireError::Decode(format!("invalid character code point: {code:#x}")))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.cursor.read_bytes(len)?;
        str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| WireError::Decode(format!("invalid UTF-8 in string: {e}")))
    }

    pub fn read_guid(&mut self) -> Result<Uuid> {
        let bytes = self.cursor.read_bytes(16)?;
        Uuid::from_slice(bytes).map_err(|e| WireError::Decode(e.to_string()))
    }

    /// Reads a width tag, then the matching integer payload extended to
    /// 32 bits.
    pub fn read_number(&mut self) -> Result<i32> {
        let tag = NumberTag::try_from(self.read_u8()?)?;
        self.read_integer(tag)
    }

    fn read_integer(&mut self, tag: NumberTag) -> Result<i32> {
        match tag {
            NumberTag::Byte => Ok(i32::from(self.read_u8()?)),
            NumberTag::SByte => Ok(i32::from(self.read_u8()? as i8)),
            NumberTag::Short => Ok(i32::from(self.read_i16()?)),
            NumberTag::UShort => Ok(i32::from(self.read_u16()?)),
            NumberTag::Int32 => self.read_i32(),
            other => Err(WireError::Decode(format!(
                "expected an integer tag, got {other:?}"
            ))),
        }
    }

    /// Reads a width tag, then a float payload: scaled forms divide back by
    /// 10 or 100, raw form reads 4 bytes, and integer tags widen to float.
    pub fn read_float(&mut self) -> Result<f32> {
        let tag = NumberTag::try_from(self.read_u8()?)?;
        match tag {
            NumberTag::Float => self.read_f32(),
            NumberTag::FloatAsByteTimes10 => Ok(f32::from(self.read_u8()?) / 10.0),
            NumberTag::FloatAsSByteTimes10 => Ok(f32::from(self.read_u8()? as i8) / 10.0),
            NumberTag::FloatAsShortTimes100 => Ok(f32::from(self.read_i16()?) / 100.0),
            integer => Ok(self.read_integer(integer)? as f32),
        }
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_number()?;
        usize::try_from(len).map_err(|_| WireError::Decode(format!("negative length: {len}")))
    }

    fn read_list(&mut self, element: &FieldType) -> Result<Vec<Value>> {
        let count = self.read_len()?;
        // The count comes from the wire; cap the preallocation.
        let mut items = Vec::with_capacity(count.min(4096));

        for _ in 0..count {
            let item = match self.read(element)? {
                ReadOutcome::Value(value) => value,
                ReadOutcome::NotPrimitive => {
                    let FieldType::Object(key) = element else {
                        return Err(WireError::Decode(format!(
                            "cannot read list element declared as {element:?}"
                        )));
                    };
                    let (value, used) = self
                        .serializer
                        .deserialize_object(*key, self.cursor.remaining())?;
                    self.cursor.advance(used)?;
                    value
                }
            };
            items.push(item);
        }
        Ok(items)
    }

    fn read_map(
        &mut self,
        key_type: &FieldType,
        value_type: &FieldType,
    ) -> Result<Vec<(Value, Value)>> {
        let keys = self.read_list(key_type)?;
        let values = self.read_list(value_type)?;
        if keys.len() != values.len() {
            return Err(WireError::Decode(format!(
                "map key/value lists have mismatched lengths: {} vs {}",
                keys.len(),
                values.len()
            )));
        }
        Ok(keys.into_iter().zip(values).collect())
    }
}

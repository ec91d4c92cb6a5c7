//! Write half of the engine.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::number::NumberTag;
use crate::schema::{FieldType, Value};
use crate::serializer::Serializer;
use crate::{Result, WireError};

/// Flag byte written for an absent value; its complement marks a value as
/// present. On the wire: present = 0x00, absent = 0x01.
pub(crate) const MEMBER_IS_NULL: bool = true;

/// Appends encoded values to a growable buffer, splicing in recursively
/// serialized composites through the owning [`Serializer`].
///
/// One writer exists per serialize call and owns its buffer exclusively.
pub struct BinaryWriter<'a> {
    buffer: BytesMut,
    serializer: &'a Serializer,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(serializer: &'a Serializer) -> Self {
        Self {
            buffer: BytesMut::new(),
            serializer,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }

    /// Writes the null flag and, for leaf kinds, the payload.
    ///
    /// Returns `Ok(false)` when the slot holds a composite that needs a
    /// schema-driven encode; in that case only the present flag has been
    /// written. A value whose kind does not match the declared type is an
    /// encode error.
    pub fn write(&mut self, value: &Value, declared: &FieldType) -> Result<bool> {
        if matches!(value, Value::Null) {
            self.write_bool(MEMBER_IS_NULL);
            return Ok(true);
        }
        self.write_bool(!MEMBER_IS_NULL);

        match (value, declared) {
            (Value::Bool(v), FieldType::Bool) => self.write_bool(*v),
            (Value::Byte(v), FieldType::Byte) => self.write_u8(*v),
            (Value::Short(v), FieldType::Short) => self.write_i16(*v),
            (Value::UShort(v), FieldType::UShort) => self.write_u16(*v),
            (Value::Char(v), FieldType::Char) => self.write_char(*v)?,
            (Value::Int(v), FieldType::Int) => self.write_number(*v),
            (Value::Float(v), FieldType::Float) => self.write_float(*v),
            (Value::Str(v), FieldType::Str) => self.write_string(v)?,
            (Value::Enum(v), FieldType::Enum) => self.write_number(*v),
            (Value::Guid(v), FieldType::Guid) => self.write_guid(v),
            (Value::List(items), FieldType::List(element)) => self.write_list(items, element)?,
            (Value::Map(pairs), FieldType::Map(key, value)) => {
                self.write_map(pairs, key, value)?
            }
            (Value::Object(_), FieldType::Object(_)) => return Ok(false),
            (value, declared) => {
                return Err(WireError::Encode(format!(
                    "cannot write {} value into a slot declared as {declared:?}",
                    value.kind()
                )))
            }
        }
        Ok(true)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(u8::from(value));
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.put_i16_le(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.put_f32_le(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    fn write_tag(&mut self, tag: NumberTag) {
        self.write_u8(tag as u8);
    }

    fn write_char(&mut self, value: char) -> Result<()> {
        let narrow = u16::try_from(u32::from(value)).map_err(|_| {
            WireError::Encode(format!(
                "char {value:?} does not fit the two-byte character encoding"
            ))
        })?;
        self.write_u16(narrow);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let len = i32::try_from(value.len()).map_err(|_| {
            WireError::Encode(format!("string of {} bytes exceeds the length range", value.len()))
        })?;
        self.write_number(len);
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    fn write_guid(&mut self, value: &Uuid) {
        self.write_bytes(value.as_bytes());
    }

    /// Encodes a 32-bit integer under the smallest tag whose range covers it.
    ///
    /// Unsigned byte is tried before signed byte so the common small
    /// non-negative case costs exactly two bytes.
    pub fn write_number(&mut self, value: i32) {
        if (0..=i32::from(u8::MAX)).contains(&value) {
            self.write_tag(NumberTag::Byte);
            self.write_u8(value as u8);
        } else if (i32::from(i8::MIN)..=i32::from(i8::MAX)).contains(&value) {
            self.write_tag(NumberTag::SByte);
            self.write_u8(value as i8 as u8);
        } else if (0..=i32::from(u16::MAX)).contains(&value) {
            self.write_tag(NumberTag::UShort);
            self.write_u16(value as u16);
        } else if (i32::from(i16::MIN)..=i32::from(i16::MAX)).contains(&value) {
            self.write_tag(NumberTag::Short);
            self.write_i16(value as i16);
        } else {
            self.write_tag(NumberTag::Int32);
            self.write_i32(value);
        }
    }

    /// Encodes a float in the smallest lossless form: integral values reuse
    /// the integer codec, "nice" decimals are stored as scaled 1- or 2-byte
    /// integers, and everything else is raw IEEE-754.
    pub fn write_float(&mut self, value: f32) {
        let truncated = value as i64;
        if truncated as f32 == value && i32::try_from(truncated).is_ok() {
            self.write_number(truncated as i32);
            return;
        }

        let by_10 = value * 10.0;
        if by_10 as i64 as f32 == by_10 {
            if (0.0..=255.0).contains(&by_10) {
                self.write_tag(NumberTag::FloatAsByteTimes10);
                self.write_u8(by_10 as u8);
                return;
            }
            if (-128.0..=127.0).contains(&by_10) {
                self.write_tag(NumberTag::FloatAsSByteTimes10);
                self.write_u8(by_10 as i8 as u8);
                return;
            }
        }

        let by_100 = value * 100.0;
        if by_100 as i64 as f32 == by_100 && (-32768.0..=32767.0).contains(&by_100) {
            self.write_tag(NumberTag::FloatAsShortTimes100);
            self.write_i16(by_100 as i16);
            return;
        }

        self.write_tag(NumberTag::Float);
        self.write_f32(value);
    }

    fn write_list(&mut self, items: &[Value], element: &FieldType) -> Result<()> {
        self.write_sequence(items.iter(), items.len(), element)
    }

    /// Two parallel lists: keys then values, index-paired.
    fn write_map(
        &mut self,
        pairs: &[(Value, Value)],
        key_type: &FieldType,
        value_type: &FieldType,
    ) -> Result<()> {
        self.write_sequence(pairs.iter().map(|(k, _)| k), pairs.len(), key_type)?;
        self.write_sequence(pairs.iter().map(|(_, v)| v), pairs.len(), value_type)
    }

    fn write_sequence<'v>(
        &mut self,
        items: impl Iterator<Item = &'v Value>,
        len: usize,
        element: &FieldType,
    ) -> Result<()> {
        let count = i32::try_from(len).map_err(|_| {
            WireError::Encode(format!("sequence of {len} elements exceeds the count range"))
        })?;
        self.write_number(count);

        for item in items {
            if !self.write(item, element)? {
                // Composite element: the element's runtime type decides the
                // type tag, falling back to the declared element type.
                let bytes = self.serializer.serialize_object(item, element)?;
                if bytes.is_empty() {
                    return Err(WireError::Encode(format!(
                        "recursive encode of {} element produced no bytes",
                        item.kind()
                    )));
                }
                self.write_bytes(&bytes);
            }
        }
        Ok(())
    }
}

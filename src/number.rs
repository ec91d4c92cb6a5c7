//! Width/shape tags for the variable-width numeric codec.

use crate::{Result, WireError};

/// Identifies how the bytes following the tag decode.
///
/// Exactly one tag precedes every encoded number or float. The discriminants
/// are stable and part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NumberTag {
    /// Unsigned 8-bit payload, 1 byte.
    Byte = 0,
    /// Signed 8-bit payload, 1 byte.
    SByte = 1,
    /// Signed 16-bit payload, 2 bytes little-endian.
    Short = 2,
    /// Unsigned 16-bit payload, 2 bytes little-endian.
    UShort = 3,
    /// Full 32-bit payload, 4 bytes little-endian.
    Int32 = 4,
    /// Raw IEEE-754 single, 4 bytes.
    Float = 5,
    /// Float stored as `(value * 10)` in an unsigned byte.
    FloatAsByteTimes10 = 6,
    /// Float stored as `(value * 10)` in a signed byte.
    FloatAsSByteTimes10 = 7,
    /// Float stored as `(value * 100)` in a signed 16-bit integer.
    FloatAsShortTimes100 = 8,
}

impl TryFrom<u8> for NumberTag {
    type Error = WireError;

    fn try_from(raw: u8) -> Result<Self> {
        Ok(match raw {
            0 => NumberTag::Byte,
            1 => NumberTag::SByte,
            2 => NumberTag::Short,
            3 => NumberTag::UShort,
            4 => NumberTag::Int32,
            5 => NumberTag::Float,
            6 => NumberTag::FloatAsByteTimes10,
            7 => NumberTag::FloatAsSByteTimes10,
            8 => NumberTag::FloatAsShortTimes100,
            other => return Err(WireError::Decode(format!("unknown number tag: {other}"))),
        })
    }
}

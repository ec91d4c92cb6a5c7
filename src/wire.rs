//! Typed convenience layer over the runtime value model.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use uuid::Uuid;

use crate::schema::{FieldType, Value};
use crate::{Result, WireError};

/// A Rust type with a fixed declared wire type and a lossless mapping to the
/// engine's runtime [`Value`] model.
///
/// Leaf kinds and standard collections are covered here; composite types get
/// an implementation from [`wire_object!`](crate::wire_object).
pub trait Wire: Sized {
    /// The statically declared type of this value on the wire.
    fn field_type() -> FieldType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, got: &Value) -> Result<T> {
    Err(WireError::Decode(format!(
        "expected {expected} value, got {}",
        got.kind()
    )))
}

macro_rules! leaf_wire {
    ($ty:ty, $field:ident, $variant:ident) => {
        impl Wire for $ty {
            fn field_type() -> FieldType {
                FieldType::$field
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => mismatch(stringify!($ty), &other),
                }
            }
        }
    };
}

leaf_wire!(bool, Bool, Bool);
leaf_wire!(u8, Byte, Byte);
leaf_wire!(i16, Short, Short);
leaf_wire!(u16, UShort, UShort);
leaf_wire!(char, Char, Char);
leaf_wire!(i32, Int, Int);
leaf_wire!(f32, Float, Float);
leaf_wire!(Uuid, Guid, Guid);

impl Wire for String {
    fn field_type() -> FieldType {
        FieldType::Str
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(v) => Ok(v),
            other => mismatch("string", &other),
        }
    }
}

/// Nullability is a wire-level flag on every slot, not a distinct type, so
/// an `Option<T>` declares the same field type as `T`.
impl<T: Wire> Wire for Option<T> {
    fn field_type() -> FieldType {
        T::field_type()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::list(T::field_type())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Wire::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => mismatch("list", &other),
        }
    }
}

impl<K: Wire + Eq + Hash, V: Wire> Wire for HashMap<K, V> {
    fn field_type() -> FieldType {
        FieldType::map(K::field_type(), V::field_type())
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => mismatch("map", &other),
        }
    }
}

impl<K: Wire + Ord, V: Wire> Wire for BTreeMap<K, V> {
    fn field_type() -> FieldType {
        FieldType::map(K::field_type(), V::field_type())
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => mismatch("map", &other),
        }
    }
}

/// Implements [`Wire`] for a `Schematic + Clone` composite type.
///
/// `from_value` expects the decoded object's runtime type to match exactly;
/// polymorphic payloads that may decode to a registered subtype should be
/// read through `Serializer::deserialize_value` and downcast explicitly.
#[macro_export]
macro_rules! wire_object {
    ($ty:ty) => {
        impl $crate::Wire for $ty {
            fn field_type() -> $crate::FieldType {
                $crate::FieldType::object::<$ty>()
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Object(Box::new(self.clone()))
            }

            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                match value {
                    $crate::Value::Object(obj) => $crate::Reflect::into_any(obj)
                        .downcast::<$ty>()
                        .map(|boxed| *boxed)
                        .map_err(|_| {
                            $crate::WireError::Decode(
                                concat!("decoded object is not a ", stringify!($ty)).to_string(),
                            )
                        }),
                    other => Err($crate::WireError::Decode(format!(
                        concat!("expected ", stringify!($ty), " object, got {}"),
                        other.kind()
                    ))),
                }
            }
        }
    };
}

//! Recursive read/write orchestration.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use bytes::Bytes;
use tracing::trace;

use crate::reader::{BinaryReader, ReadOutcome};
use crate::registry::{GenericTypesProvider, VoidGenericTypes, UNDEFINED_TYPE_ID};
use crate::schema::{FieldType, MemberDef, SchemaRegistry, TypeKey, Value};
use crate::wire::Wire;
use crate::writer::BinaryWriter;
use crate::{Result, WireError};

type MemberMap = Rc<BTreeMap<u32, MemberDef>>;

/// The serialization engine.
///
/// Holds the schema registry, the generic-type provider, and a per-type
/// cache of flattened member maps built lazily on first use. Each
/// serialize/deserialize call is a self-contained recursive descent over the
/// value tree; no state persists across calls beyond those caches.
///
/// The caches use single-threaded interior mutability; share a `Serializer`
/// across threads by building one per thread or by computing all schemas
/// before concurrent use begins.
pub struct Serializer {
    schemas: SchemaRegistry,
    generics: Box<dyn GenericTypesProvider>,
    member_cache: RefCell<HashMap<TypeId, MemberMap>>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SchemaRegistry::new())
    }
}

impl Serializer {
    /// Engine without polymorphic tagging: every type tag is the undefined
    /// sentinel and values decode as their statically declared types.
    pub fn new(schemas: SchemaRegistry) -> Self {
        Self::with_generic_types(schemas, VoidGenericTypes)
    }

    pub fn with_generic_types(
        schemas: SchemaRegistry,
        generics: impl GenericTypesProvider + 'static,
    ) -> Self {
        Self {
            schemas,
            generics: Box::new(generics),
            member_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn serialize<T: Wire>(&self, value: &T) -> Result<Bytes> {
        self.serialize_value(&value.to_value(), &T::field_type())
    }

    /// Serializes a runtime value under an explicitly declared type.
    pub fn serialize_value(&self, value: &Value, declared: &FieldType) -> Result<Bytes> {
        let mut writer = BinaryWriter::new(self);
        if !writer.write(value, declared)? {
            let object = self.serialize_object(value, declared)?;
            if object.is_empty() {
                return Err(WireError::Encode(format!(
                    "recursive encode of {} produced no bytes",
                    value.kind()
                )));
            }
            writer.write_bytes(&object);
        }
        Ok(writer.into_bytes())
    }

    pub fn deserialize<T: Wire>(&self, data: &[u8]) -> Result<T> {
        self.deserialize_with_consumed(data).map(|(value, _)| value)
    }

    /// Typed decode that also reports how many input bytes were consumed.
    pub fn deserialize_with_consumed<T: Wire>(&self, data: &[u8]) -> Result<(T, usize)> {
        let (value, consumed) = self.deserialize_value(&T::field_type(), data)?;
        Ok((T::from_value(value)?, consumed))
    }

    /// Decodes one value of the declared type, reporting how many bytes of
    /// `data` were consumed so nested callers can advance their own cursor.
    ///
    /// An absent value is `(Value::Null, 1)`: just the flag byte.
    pub fn deserialize_value(&self, declared: &FieldType, data: &[u8]) -> Result<(Value, usize)> {
        let mut reader = BinaryReader::new(data, self);
        match reader.read(declared)? {
            ReadOutcome::Value(value) => Ok((value, reader.consumed())),
            ReadOutcome::NotPrimitive => {
                let FieldType::Object(key) = declared else {
                    return Err(WireError::Decode(format!(
                        "cannot read a value declared as {declared:?}"
                    )));
                };
                let (value, used) = self.deserialize_object(*key, reader.remaining())?;
                reader.advance(used)?;
                Ok((value, reader.consumed()))
            }
        }
    }

    /// Encodes `[type tag][members...]` for a composite value whose null
    /// flag has already been written.
    ///
    /// The tag is the generic-registry id of the value's runtime type; when
    /// the runtime type is registered its schema is used, otherwise the tag
    /// is the undefined sentinel and the declared type's schema applies.
    pub(crate) fn serialize_object(&self, value: &Value, declared: &FieldType) -> Result<Bytes> {
        let Value::Object(instance) = value else {
            return Err(WireError::Encode(format!(
                "cannot encode {} value as a composite object",
                value.kind()
            )));
        };
        let FieldType::Object(declared_key) = declared else {
            return Err(WireError::Encode(format!(
                "object value in a slot declared as {declared:?}"
            )));
        };

        let runtime_key = instance.type_key();
        let tag = self.generics.type_id(runtime_key);
        let resolved = if tag == UNDEFINED_TYPE_ID {
            *declared_key
        } else {
            runtime_key
        };
        let members = self.members_of(resolved)?;

        let mut writer = BinaryWriter::new(self);
        writer.write_number(tag);

        for member in members.values() {
            let member_value = (member.get)(instance.as_ref())?;
            let bytes = self.serialize_value(&member_value, &member.value_type)?;
            if bytes.is_empty() {
                return Err(WireError::Encode(format!(
                    "member {} of {} encoded to no bytes",
                    member.name, resolved.name
                )));
            }
            writer.write_bytes(&bytes);
        }

        Ok(writer.into_bytes())
    }

    /// Decodes `[type tag][members...]`; the caller has already consumed the
    /// null flag. Returns the populated instance and the bytes consumed.
    pub(crate) fn deserialize_object(
        &self,
        declared: TypeKey,
        data: &[u8],
    ) -> Result<(Value, usize)> {
        let mut reader = BinaryReader::new(data, self);

        let tag = reader.read_number()?;
        let resolved = if tag == UNDEFINED_TYPE_ID {
            declared
        } else {
            self.generics.type_of(tag)?
        };

        let members = self.members_of(resolved)?;
        let factory = self.schemas.get(&resolved)?.factory.ok_or_else(|| {
            WireError::Schema(format!(
                "{} has no instance factory and cannot be deserialized",
                resolved.name
            ))
        })?;
        let mut instance = factory();

        for member in members.values() {
            let value = match reader.read(&member.value_type)? {
                ReadOutcome::Value(value) => value,
                ReadOutcome::NotPrimitive => {
                    let FieldType::Object(inner) = &member.value_type else {
                        return Err(WireError::Decode(format!(
                            "cannot read member {} of {}",
                            member.name, resolved.name
                        )));
                    };
                    let (value, used) = self.deserialize_object(*inner, reader.remaining())?;
                    reader.advance(used)?;
                    value
                }
            };
            (member.set)(instance.as_mut(), value)?;
        }

        Ok((Value::Object(instance), reader.consumed()))
    }

    /// Flattened member map for `key`, computed once and cached for the
    /// lifetime of the serializer.
    fn members_of(&self, key: TypeKey) -> Result<MemberMap> {
        if let Some(cached) = self.member_cache.borrow().get(&key.id) {
            return Ok(Rc::clone(cached));
        }

        let members = Rc::new(self.schemas.get(&key)?.flatten()?);
        trace!(
            type_name = key.name,
            members = members.len(),
            "computed flattened schema"
        );
        self.member_cache
            .borrow_mut()
            .insert(key.id, Rc::clone(&members));
        Ok(members)
    }
}

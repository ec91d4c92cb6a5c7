//! Runtime value model and registration-time schema descriptors.
//!
//! Instead of runtime introspection, every serializable composite type
//! supplies an explicit [`TypeSchema`]: its inheritance levels in
//! base-to-derived order, each holding members with stable local indices and
//! accessor functions. The engine flattens the levels into a map of global
//! member ids whose assignment never depends on which derived type triggered
//! the computation.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;
use uuid::Uuid;

use crate::{Result, WireError};

/// Runtime identity of a composite type: its `TypeId` plus a readable name
/// for diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe runtime handle for composite instances.
///
/// Implemented automatically for every `Schematic + Clone` type; the engine
/// uses it to learn the runtime type of a polymorphic value and to move
/// instances in and out of [`Value::Object`].
pub trait Reflect: Any {
    fn type_key(&self) -> TypeKey;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_reflect(&self) -> Box<dyn Reflect>;
}

impl<T: Schematic + Clone> Reflect for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_reflect(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Reflect> {
    fn clone(&self) -> Self {
        self.clone_reflect()
    }
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_key().name)
    }
}

/// A composite type that can describe its own serialization schema.
pub trait Schematic: Sized + 'static {
    fn schema() -> TypeSchema;
}

/// Borrows the concrete type back out of a reflected instance.
pub fn downcast_ref<T: 'static>(obj: &dyn Reflect) -> Result<&T> {
    obj.as_any().downcast_ref::<T>().ok_or_else(|| {
        WireError::Schema(format!(
            "accessor expected {}, got {}",
            std::any::type_name::<T>(),
            obj.type_key().name
        ))
    })
}

/// Mutable counterpart of [`downcast_ref`].
pub fn downcast_mut<T: 'static>(obj: &mut dyn Reflect) -> Result<&mut T> {
    let key = obj.type_key();
    obj.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        WireError::Schema(format!(
            "accessor expected {}, got {}",
            std::any::type_name::<T>(),
            key.name
        ))
    })
}

/// Runtime value as seen by the engine: the closed set of leaf kinds the
/// wire format encodes directly, plus [`Value::Object`] for anything that
/// needs a schema-driven recursive encode.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Char(char),
    Int(i32),
    Float(f32),
    Str(String),
    /// An enumerated value, carried as its underlying 32-bit integer.
    Enum(i32),
    /// A 128-bit unique identifier, 16 raw bytes on the wire.
    Guid(Uuid),
    List(Vec<Value>),
    /// Key/value pairs; only index-pairing is meaningful, not key order.
    Map(Vec<(Value, Value)>),
    /// A composite instance; the "not a leaf kind" case.
    Object(Box<dyn Reflect>),
}

impl Value {
    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::UShort(_) => "ushort",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Enum(_) => "enum",
            Value::Guid(_) => "guid",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UShort(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

/// Statically declared type of a value slot.
///
/// This is what the original attribute-driven reflection knew from field
/// signatures; here it is part of the member declaration.
#[derive(Debug, Clone)]
pub enum FieldType {
    Bool,
    Byte,
    Short,
    UShort,
    Char,
    Int,
    Float,
    Str,
    Enum,
    Guid,
    List(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    Object(TypeKey),
}

impl FieldType {
    pub fn object<T: Schematic>() -> Self {
        FieldType::Object(TypeKey::of::<T>())
    }

    pub fn list(element: FieldType) -> Self {
        FieldType::List(Box::new(element))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }
}

/// Reads one member's current value out of an instance.
pub type Getter = fn(&dyn Reflect) -> Result<Value>;
/// Writes one decoded member value into an instance.
pub type Setter = fn(&mut dyn Reflect, Value) -> Result<()>;

/// One serializable member as declared at a single level of a type's
/// inheritance chain. Immutable once the schema is built.
#[derive(Clone)]
pub struct MemberDef {
    /// The member's stable index local to its declaring level.
    pub local_index: u32,
    pub name: &'static str,
    pub value_type: FieldType,
    pub get: Getter,
    pub set: Setter,
}

impl MemberDef {
    pub fn new(
        local_index: u32,
        name: &'static str,
        value_type: FieldType,
        get: Getter,
        set: Setter,
    ) -> Self {
        Self {
            local_index,
            name,
            value_type,
            get,
            set,
        }
    }
}

impl fmt::Debug for MemberDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDef")
            .field("local_index", &self.local_index)
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// The members declared at one level of a type's inheritance chain.
#[derive(Debug, Clone)]
pub struct SchemaLevel {
    /// Name of the level that declares these members, for diagnostics.
    pub declared_in: &'static str,
    pub members: Vec<MemberDef>,
}

/// Registration-time schema descriptor for one composite type.
///
/// Levels must be listed from the most-base serializable ancestor down to
/// the type itself; member ids are assigned in that order, so a base level's
/// wire layout is identical no matter which derived type embeds it.
pub struct TypeSchema {
    pub key: TypeKey,
    pub levels: Vec<SchemaLevel>,
    /// Default-constructs an instance to populate during decode. Types
    /// without a factory can be encoded but not decoded.
    pub factory: Option<fn() -> Box<dyn Reflect>>,
}

impl TypeSchema {
    /// Descriptor for a type that can be default-constructed during decode.
    pub fn of<T: Schematic + Clone + Default>() -> Self {
        TypeSchema {
            key: TypeKey::of::<T>(),
            levels: Vec::new(),
            factory: Some(|| Box::new(T::default()) as Box<dyn Reflect>),
        }
    }

    /// Descriptor without an instance factory; decoding such a type is a
    /// schema error.
    pub fn new<T: Schematic>() -> Self {
        TypeSchema {
            key: TypeKey::of::<T>(),
            levels: Vec::new(),
            factory: None,
        }
    }

    /// Appends one inheritance level, base levels first.
    pub fn level(mut self, declared_in: &'static str, members: Vec<MemberDef>) -> Self {
        self.levels.push(SchemaLevel {
            declared_in,
            members,
        });
        self
    }

    /// Flattens the levels into a `global id -> member` map.
    ///
    /// Each member's global id is `level offset + local index`; after a
    /// level is finished the offset becomes one past the highest id assigned
    /// so far. Two members resolving to the same global id is a fatal
    /// configuration error, caught here at schema-build time.
    pub(crate) fn flatten(&self) -> Result<BTreeMap<u32, MemberDef>> {
        let mut members: BTreeMap<u32, MemberDef> = BTreeMap::new();
        let mut offset = 0u32;

        for level in &self.levels {
            for member in &level.members {
                let global_id = offset + member.local_index;
                if let Some(existing) = members.get(&global_id) {
                    return Err(WireError::Schema(format!(
                        "{} and {} have the same id {} in {}",
                        existing.name, member.name, global_id, self.key.name
                    )));
                }
                members.insert(global_id, member.clone());
            }
            if let Some((max, _)) = members.last_key_value() {
                offset = max + 1;
            }
        }

        Ok(members)
    }
}

/// Lookup table of registered type schemas, keyed by `TypeId`.
#[derive(Default)]
pub struct SchemaRegistry {
    types: HashMap<TypeId, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Schematic>(&mut self) -> &mut Self {
        let schema = T::schema();
        debug!(type_name = schema.key.name, "registered schema");
        self.types.insert(schema.key.id, schema);
        self
    }

    pub fn get(&self, key: &TypeKey) -> Result<&TypeSchema> {
        self.types.get(&key.id).ok_or_else(|| {
            WireError::Schema(format!("no schema registered for {}", key.name))
        })
    }
}

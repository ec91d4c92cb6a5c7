//! Generic-type registry: stable integer ids for polymorphic type tags.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::schema::TypeKey;
use crate::{Result, WireError};

/// Reserved id meaning "not registered; use the statically declared type".
pub const UNDEFINED_TYPE_ID: i32 = -1;

/// Bidirectional mapping between registered concrete types and their stable
/// integer ids.
///
/// The engine consults this wherever a slot's static type may be a supertype
/// of the actual value: a registered runtime type is tagged with its id so
/// the reader can reconstruct the concrete type.
pub trait GenericTypesProvider {
    /// Registered id of `key`, or [`UNDEFINED_TYPE_ID`] when unregistered.
    fn type_id(&self, key: TypeKey) -> i32;

    /// Type registered under `id`. Unknown ids are a registry error: the
    /// writer and reader disagree on the registered type set.
    fn type_of(&self, id: i32) -> Result<TypeKey>;
}

/// Default provider with nothing registered.
///
/// Degrades the engine to non-polymorphic mode: values are always decoded
/// using their statically declared type.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoidGenericTypes;

impl GenericTypesProvider for VoidGenericTypes {
    fn type_id(&self, _key: TypeKey) -> i32 {
        UNDEFINED_TYPE_ID
    }

    fn type_of(&self, id: i32) -> Result<TypeKey> {
        Err(WireError::Registry(format!(
            "no generic types provider has been given; cannot retrieve type associated with id {id}"
        )))
    }
}

/// Explicit id/type table, populated once at startup from an enumeration of
/// `(type, stable id)` pairs.
#[derive(Debug, Default)]
pub struct GenericTypeRegistry {
    by_id: HashMap<i32, TypeKey>,
    by_type: HashMap<TypeId, i32>,
}

impl GenericTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: TypeKey, id: i32) -> Result<()> {
        if id == UNDEFINED_TYPE_ID {
            return Err(WireError::Registry(format!(
                "{} cannot be registered under the reserved id {id}",
                key.name
            )));
        }
        if let Some(existing) = self.by_id.get(&id) {
            return Err(WireError::Registry(format!(
                "{} and {} have the same generic type id {id}",
                key.name, existing.name
            )));
        }
        if self.by_type.contains_key(&key.id) {
            return Err(WireError::Registry(format!(
                "{} is already registered",
                key.name
            )));
        }

        debug!(type_name = key.name, id, "registered generic type");
        self.by_id.insert(id, key);
        self.by_type.insert(key.id, id);
        Ok(())
    }

    /// Populates the registry from a registration source. Fails fast on the
    /// first duplicate id or type.
    pub fn register_all<I>(&mut self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = (TypeKey, i32)>,
    {
        for (key, id) in source {
            self.register(key, id)?;
        }
        Ok(())
    }
}

impl GenericTypesProvider for GenericTypeRegistry {
    fn type_id(&self, key: TypeKey) -> i32 {
        self.by_type
            .get(&key.id)
            .copied()
            .unwrap_or(UNDEFINED_TYPE_ID)
    }

    fn type_of(&self, id: i32) -> Result<TypeKey> {
        self.by_id.get(&id).copied().ok_or_else(|| {
            WireError::Registry(format!("no type associated with generic type id {id}"))
        })
    }
}

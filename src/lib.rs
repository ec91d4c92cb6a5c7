//! # wirepack
//!
//! A compact, schema-driven binary serializer with polymorphic round-trip
//! support.
//!
//! Values are described by explicit, registration-time schemas: every
//! serializable composite type declares an ordered list of members with
//! stable local indices, and the engine flattens those across the type's
//! base-to-derived levels into inheritance-stable global member ids. A
//! separate generic-type registry maps concrete types to small stable
//! integer ids, which the engine writes as type tags wherever a slot's
//! statically declared type could be a supertype of the actual value. A
//! list declared over a base type therefore faithfully round-trips a mix of
//! the base type and registered subtypes.
//!
//! The wire format is size-optimized:
//! - Every 32-bit integer is preceded by a one-byte width tag and stored in
//!   the smallest covering width (1, 2, or 4 bytes, little-endian).
//! - Floats with "nice" decimal values (prices, percentages) are stored as
//!   scaled 1- or 2-byte integers; integral floats reuse the integer codec;
//!   everything else falls back to raw IEEE-754.
//! - Every nullable slot is preceded by a one-byte null flag, so absent
//!   values cost a single byte.
//!
//! ## Example
//! ```rust
//! use wirepack::Serializer;
//!
//! let serializer = Serializer::default();
//! let bytes = serializer.serialize(&5i32).unwrap();
//! assert_eq!(bytes.as_ref(), [0x00, 0x00, 0x05]);
//! let value: i32 = serializer.deserialize(&bytes).unwrap();
//! assert_eq!(value, 5);
//! ```
//!
//! Composite types implement [`Schematic`] to describe their schema, derive
//! `Clone` (which gives them [`Reflect`] for free), and opt into the typed
//! API with [`wire_object!`]. Polymorphic decoding goes through
//! [`Serializer::deserialize_value`], which returns the concrete registered
//! type behind a `Box<dyn Reflect>`.

pub mod buffer;
pub mod number;
pub mod registry;
pub mod schema;

mod reader;
mod serializer;
mod wire;
mod writer;

pub use reader::{BinaryReader, ReadOutcome};
pub use registry::{
    GenericTypeRegistry, GenericTypesProvider, VoidGenericTypes, UNDEFINED_TYPE_ID,
};
pub use schema::{
    downcast_mut, downcast_ref, FieldType, MemberDef, Reflect, SchemaLevel, SchemaRegistry,
    Schematic, TypeKey, TypeSchema, Value,
};
pub use serializer::Serializer;
pub use wire::Wire;
pub use writer::BinaryWriter;

/// Errors raised while building schemas, populating the type registry, or
/// encoding/decoding values.
///
/// Every error is local to the failing call: cached schemas and registry
/// entries are never left in a corrupted state, and nothing is retried
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Invalid schema configuration: duplicate global member ids within a
    /// type, a missing schema registration, or a type without a factory
    /// where decoding requires one.
    #[error("Schema error: {0}")]
    Schema(String),
    /// Invalid generic-type registry configuration (duplicate registration
    /// id) or an unknown type id in the input, which indicates a protocol
    /// mismatch between writer and reader.
    #[error("Type registry error: {0}")]
    Registry(String),
    /// The value could not be encoded (kind mismatch with the declared
    /// type, or a recursive encode produced no bytes).
    #[error("Encode error: {0}")]
    Encode(String),
    /// The input bytes could not be decoded as the declared type.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The buffer did not contain enough data to complete the operation.
    #[error("Insufficient data in buffer")]
    InsufficientData,
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, WireError>;

//! Schema-driven composite objects: registration, member ordering, nesting,
//! and configuration errors.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;
use wirepack::{
    downcast_mut, downcast_ref, wire_object, FieldType, MemberDef, SchemaRegistry, Schematic,
    Serializer, TypeSchema, Wire, WireError,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct Profile {
    name: Option<String>,
    active: bool,
    score: i32,
    id: Uuid,
    levels: Vec<i32>,
    ratios: HashMap<String, f32>,
}

impl Schematic for Profile {
    fn schema() -> TypeSchema {
        TypeSchema::of::<Profile>().level(
            "Profile",
            vec![
                MemberDef::new(
                    0,
                    "name",
                    FieldType::Str,
                    |o| Ok(downcast_ref::<Profile>(o)?.name.to_value()),
                    |o, v| {
                        downcast_mut::<Profile>(o)?.name = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    1,
                    "active",
                    FieldType::Bool,
                    |o| Ok(downcast_ref::<Profile>(o)?.active.to_value()),
                    |o, v| {
                        downcast_mut::<Profile>(o)?.active = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    2,
                    "score",
                    FieldType::Int,
                    |o| Ok(downcast_ref::<Profile>(o)?.score.to_value()),
                    |o, v| {
                        downcast_mut::<Profile>(o)?.score = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    3,
                    "id",
                    FieldType::Guid,
                    |o| Ok(downcast_ref::<Profile>(o)?.id.to_value()),
                    |o, v| {
                        downcast_mut::<Profile>(o)?.id = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    4,
                    "levels",
                    FieldType::list(FieldType::Int),
                    |o| Ok(downcast_ref::<Profile>(o)?.levels.to_value()),
                    |o, v| {
                        downcast_mut::<Profile>(o)?.levels = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    5,
                    "ratios",
                    FieldType::map(FieldType::Str, FieldType::Float),
                    |o| Ok(downcast_ref::<Profile>(o)?.ratios.to_value()),
                    |o, v| {
                        downcast_mut::<Profile>(o)?.ratios = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
            ],
        )
    }
}

wire_object!(Profile);

#[derive(Clone, Debug, Default, PartialEq)]
struct Session {
    primary: Profile,
    secondary: Option<Profile>,
}

impl Schematic for Session {
    fn schema() -> TypeSchema {
        TypeSchema::of::<Session>().level(
            "Session",
            vec![
                MemberDef::new(
                    0,
                    "primary",
                    FieldType::object::<Profile>(),
                    |o| Ok(downcast_ref::<Session>(o)?.primary.to_value()),
                    |o, v| {
                        downcast_mut::<Session>(o)?.primary = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    1,
                    "secondary",
                    FieldType::object::<Profile>(),
                    |o| Ok(downcast_ref::<Session>(o)?.secondary.to_value()),
                    |o, v| {
                        downcast_mut::<Session>(o)?.secondary = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
            ],
        )
    }
}

wire_object!(Session);

#[derive(Clone, Debug, Default, PartialEq)]
struct Blank;

impl Schematic for Blank {
    fn schema() -> TypeSchema {
        TypeSchema::of::<Blank>().level("Blank", vec![])
    }
}

wire_object!(Blank);

#[derive(Clone, Debug, Default, PartialEq)]
struct Pair {
    x: i32,
    y: bool,
}

impl Schematic for Pair {
    fn schema() -> TypeSchema {
        TypeSchema::of::<Pair>().level(
            "Pair",
            vec![
                MemberDef::new(
                    0,
                    "x",
                    FieldType::Int,
                    |o| Ok(downcast_ref::<Pair>(o)?.x.to_value()),
                    |o, v| {
                        downcast_mut::<Pair>(o)?.x = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    1,
                    "y",
                    FieldType::Bool,
                    |o| Ok(downcast_ref::<Pair>(o)?.y.to_value()),
                    |o, v| {
                        downcast_mut::<Pair>(o)?.y = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
            ],
        )
    }
}

wire_object!(Pair);

/// Encodable but not decodable: no `Default`, so no instance factory.
#[derive(Clone, Debug, PartialEq)]
struct Opaque {
    token: i32,
}

impl Schematic for Opaque {
    fn schema() -> TypeSchema {
        TypeSchema::new::<Opaque>().level(
            "Opaque",
            vec![MemberDef::new(
                0,
                "token",
                FieldType::Int,
                |o| Ok(downcast_ref::<Opaque>(o)?.token.to_value()),
                |o, v| {
                    downcast_mut::<Opaque>(o)?.token = Wire::from_value(v)?;
                    Ok(())
                },
            )],
        )
    }
}

wire_object!(Opaque);

/// Misconfigured on purpose: both members claim local index 0.
#[derive(Clone, Debug, Default, PartialEq)]
struct Clashing {
    a: i32,
    b: i32,
}

impl Schematic for Clashing {
    fn schema() -> TypeSchema {
        TypeSchema::of::<Clashing>().level(
            "Clashing",
            vec![
                MemberDef::new(
                    0,
                    "a",
                    FieldType::Int,
                    |o| Ok(downcast_ref::<Clashing>(o)?.a.to_value()),
                    |o, v| {
                        downcast_mut::<Clashing>(o)?.a = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
                MemberDef::new(
                    0,
                    "b",
                    FieldType::Int,
                    |o| Ok(downcast_ref::<Clashing>(o)?.b.to_value()),
                    |o, v| {
                        downcast_mut::<Clashing>(o)?.b = Wire::from_value(v)?;
                        Ok(())
                    },
                ),
            ],
        )
    }
}

wire_object!(Clashing);

fn engine() -> Serializer {
    let mut schemas = SchemaRegistry::new();
    schemas
        .register::<Profile>()
        .register::<Session>()
        .register::<Blank>()
        .register::<Pair>()
        .register::<Opaque>()
        .register::<Clashing>();
    Serializer::new(schemas)
}

fn sample_profile() -> Profile {
    let mut ratios = HashMap::new();
    ratios.insert("win".to_owned(), 0.75);
    ratios.insert("loss".to_owned(), 0.25);
    Profile {
        name: Some("aria".to_owned()),
        active: true,
        score: 70000,
        id: Uuid::new_v4(),
        levels: vec![1, 2, -300],
        ratios,
    }
}

#[test]
fn object_roundtrip() {
    let serializer = engine();
    let profile = sample_profile();
    let bytes = serializer.serialize(&profile).unwrap();
    let decoded: Profile = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, profile);
}

#[test]
fn empty_object_is_a_flag_and_an_undefined_tag() {
    let serializer = engine();
    let bytes = serializer.serialize(&Blank).unwrap();
    assert_eq!(bytes.as_ref(), [0x00, 0x01, 0xFF]);
    let decoded: Blank = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, Blank);
}

#[test]
fn members_are_written_in_global_id_order() {
    let serializer = engine();
    let bytes = serializer.serialize(&Pair { x: 5, y: true }).unwrap();
    // Flag, undefined type tag, then x and y each with flag and payload.
    assert_eq!(
        bytes.as_ref(),
        [0x00, 0x01, 0xFF, 0x00, 0x00, 0x05, 0x00, 0x01]
    );
}

#[test]
fn null_members_cost_one_byte_each() {
    let serializer = engine();
    let profile = Profile {
        name: None,
        ..Profile::default()
    };
    let bytes = serializer.serialize(&profile).unwrap();
    // Flag + tag, then members: name is one flag byte.
    assert_eq!(bytes[3], 0x01);
    let decoded: Profile = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded.name, None);
}

#[test]
fn nested_objects_roundtrip() {
    let serializer = engine();
    let session = Session {
        primary: sample_profile(),
        secondary: Some(Profile::default()),
    };
    let bytes = serializer.serialize(&session).unwrap();
    let decoded: Session = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, session);
}

#[test]
fn null_nested_object_roundtrips() {
    let serializer = engine();
    let session = Session {
        primary: Profile::default(),
        secondary: None,
    };
    let bytes = serializer.serialize(&session).unwrap();
    let decoded: Session = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, session);

    roundtrip_is_fully_consumed(&serializer, &session);
}

fn roundtrip_is_fully_consumed<T: Wire>(serializer: &Serializer, value: &T) {
    let bytes = serializer.serialize(value).unwrap();
    let (_, consumed) = serializer.deserialize_with_consumed::<T>(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
}

#[test]
fn decode_consumes_every_byte() {
    let serializer = engine();
    roundtrip_is_fully_consumed(&serializer, &sample_profile());
    roundtrip_is_fully_consumed(&serializer, &Blank);
    roundtrip_is_fully_consumed(
        &serializer,
        &Session {
            primary: sample_profile(),
            secondary: Some(sample_profile()),
        },
    );
}

#[test]
fn reencoding_a_decoded_object_is_byte_identical() {
    let serializer = engine();
    let mut rng = StdRng::seed_from_u64(0xC0DEC);

    for _ in 0..50 {
        let profile = Profile {
            name: if rng.gen_bool(0.8) {
                Some(format!("user-{}", rng.gen_range(0..10000)))
            } else {
                None
            },
            active: rng.gen(),
            score: rng.gen(),
            id: Uuid::new_v4(),
            levels: (0..rng.gen_range(0..8)).map(|_| rng.gen()).collect(),
            ratios: HashMap::new(),
        };

        let bytes = serializer.serialize(&profile).unwrap();
        let decoded: Profile = serializer.deserialize(&bytes).unwrap();
        let again = serializer.serialize(&decoded).unwrap();
        assert_eq!(again, bytes);
    }
}

#[test]
fn missing_factory_is_a_schema_error() {
    let serializer = engine();
    let bytes = serializer.serialize(&Opaque { token: 9 }).unwrap();
    let err = serializer.deserialize::<Opaque>(&bytes).unwrap_err();
    assert!(matches!(err, WireError::Schema(msg) if msg.contains("factory")));
}

#[test]
fn duplicate_member_id_is_a_schema_error() {
    let serializer = engine();
    let err = serializer.serialize(&Clashing { a: 1, b: 2 }).unwrap_err();
    assert!(matches!(err, WireError::Schema(msg) if msg.contains("same id")));
}

#[test]
fn unregistered_type_is_a_schema_error() {
    let serializer = Serializer::default();
    let err = serializer.serialize(&Pair { x: 1, y: false }).unwrap_err();
    assert!(matches!(err, WireError::Schema(msg) if msg.contains("no schema registered")));
}

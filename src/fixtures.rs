//! Small graphs shared by unit tests.
use crate::graph::TypeGraph;
use crate::ident::Identifier;
use crate::ir::{
    EnumType, EnumValue, ObjectType, PrimitiveKind, Property, ResourceType, Type, TypeDefinition,
    TypeFlag, Validations,
};

pub fn id(name: &str) -> Identifier {
    Identifier::new("test/v1", name).unwrap()
}

pub fn def(name: &str, ty: Type) -> TypeDefinition {
    TypeDefinition::new(id(name), ty)
}

fn role_enum() -> EnumType {
    EnumType {
        base: PrimitiveKind::String,
        values: vec![
            EnumValue { identifier: "Admin".into(), value: "admin".into() },
            EnumValue { identifier: "User".into(), value: "user".into() },
        ],
    }
}

pub fn address() -> ObjectType {
    ObjectType::new()
        .with_property("street", Property::new(Type::string()).required())
        .with_property(
            "postcode",
            Property::new(Type::optional(Type::string())).with_validations(Validations {
                pattern: Some("^[0-9]{5}$".into()),
                ..Validations::default()
            }),
        )
}

/// `Person` refers to itself, to `Address`, and is the spec of `PersonResource`.
/// `Role` is a standalone enum nothing refers to.
pub fn person_graph() -> TypeGraph {
    let person = ObjectType::new()
        .with_property("name", Property::new(Type::string()).required())
        .with_property("address", Property::new(Type::optional(Type::reference(id("Address")))))
        .with_property("role", Property::new(Type::Enum(role_enum())))
        .with_property("friends", Property::new(Type::array(Type::reference(id("Person")))))
        .with_property(
            "password",
            Property::new(Type::optional(Type::flagged(TypeFlag::Secret, Type::string()))),
        );
    let resource = ResourceType::new(Type::reference(id("Person")), "Microsoft.Test/people", "2021-01-01")
        .with_status(Some(Type::flagged(TypeFlag::ReadOnly, Type::map(PrimitiveKind::String, Type::string()))));

    TypeGraph::from_definitions([
        def("Address", Type::Object(address())),
        def("Person", Type::Object(person)),
        def("PersonResource", Type::Resource(resource)),
        def("Role", Type::Enum(role_enum())),
    ])
    .unwrap()
}

/// `Node` ⇄ `Edge`, plus `Node` → `Node`.
pub fn cyclic_graph() -> TypeGraph {
    let node = ObjectType::new()
        .with_property("edges", Property::new(Type::array(Type::reference(id("Edge")))))
        .with_property("parent", Property::new(Type::optional(Type::reference(id("Node")))));
    let edge = ObjectType::new().with_property("target", Property::new(Type::reference(id("Node"))).required());
    TypeGraph::from_definitions([def("Node", Type::Object(node)), def("Edge", Type::Object(edge))]).unwrap()
}

/// Redundant wrappers that `flattenWrappers` collapses.
pub fn wrapper_graph() -> TypeGraph {
    let holder = ObjectType::new()
        .with_property("twice", Property::new(Type::optional(Type::optional(Type::int()))))
        .with_property(
            "secret",
            Property::new(Type::flagged(TypeFlag::Secret, Type::flagged(TypeFlag::Secret, Type::string()))),
        )
        .with_property(
            "mixed",
            Property::new(Type::flagged(TypeFlag::Secret, Type::flagged(TypeFlag::ReadOnly, Type::string()))),
        );
    TypeGraph::from_definitions([def("Holder", Type::Object(holder))]).unwrap()
}

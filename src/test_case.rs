//! Test cases attached to generated objects and resources.
//!
//! A JSON serialization test case describes a property-based round trip:
//! generate an arbitrary instance of the subject, encode it to JSON, decode
//! it again and assert the result is equal. Emission turns the description
//! into source; here we only decide names and how each property is generated.
use serde::{Deserialize, Serialize};

use crate::ident::{Identifier, IdentifierFactory, NamingError, Visibility};
use crate::ir::{ObjectType, PrimitiveKind, ResourceType, Type};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TestCase {
    JsonSerialization(JsonSerializationTestCase),
}

impl TestCase {
    pub fn name(&self) -> &str {
        match self {
            TestCase::JsonSerialization(tc) => &tc.test_name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSerializationTestCase {
    pub test_name: String,
    pub test_function: String,
    pub subject: Identifier,
    pub generator: String,
    /// Properties whose values can be generated without other generators.
    pub independent: Vec<PropertyGenerator>,
    /// Properties that need another type's generator. Kept apart so that
    /// recursive types can be generated with bounded depth.
    pub related: Vec<PropertyGenerator>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyGenerator {
    pub property: String,
    pub generator: Generator,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Generator {
    Primitive(PrimitiveKind),
    OneOf(Vec<String>),
    Optional(Box<Generator>),
    Slice(Box<Generator>),
    Map { key: PrimitiveKind, value: Box<Generator> },
    /// Generator of another type, by generator name.
    Named(String),
}

impl Generator {
    pub fn is_independent(&self) -> bool {
        match self {
            Generator::Primitive(_) | Generator::OneOf(_) => true,
            Generator::Optional(inner) | Generator::Slice(inner) => inner.is_independent(),
            Generator::Map { value, .. } => value.is_independent(),
            Generator::Named(_) => false,
        }
    }
}

impl JsonSerializationTestCase {
    pub fn for_object(
        subject: &Identifier,
        object: &ObjectType,
        factory: &IdentifierFactory,
    ) -> Result<Self, NamingError> {
        let properties = object.properties.iter().map(|(name, p)| (name.as_str(), &p.ty));
        Self::build(subject, properties, factory)
    }

    /// Resources round-trip through their spec and status.
    pub fn for_resource(
        subject: &Identifier,
        resource: &ResourceType,
        factory: &IdentifierFactory,
    ) -> Result<Self, NamingError> {
        let spec = std::iter::once(("spec", resource.spec.as_ref()));
        let status = resource.status.as_deref().map(|s| ("status", s));
        Self::build(subject, spec.chain(status), factory)
    }

    fn build<'a>(
        subject: &Identifier,
        properties: impl Iterator<Item = (&'a str, &'a Type)>,
        factory: &IdentifierFactory,
    ) -> Result<Self, NamingError> {
        let base = factory.create_identifier(subject.name(), Visibility::Exported)?;
        let test_name = format!("{base}_WhenSerializedToJson_DeserializesAsEqual");
        let test_function = format!("Test_{test_name}");
        let generator = format!("{base}Generator");

        let mut independent = Vec::new();
        let mut related = Vec::new();
        for (name, ty) in properties {
            let property = factory.create_identifier(name, Visibility::Exported)?;
            let property_gen = generator_for(ty, &base, &property, factory)?;
            let slot = PropertyGenerator { property, generator: property_gen };
            if slot.generator.is_independent() {
                independent.push(slot);
            } else {
                related.push(slot);
            }
        }

        Ok(Self { test_name, test_function, subject: subject.clone(), generator, independent, related })
    }
}

fn generator_for(
    ty: &Type,
    owner: &str,
    property: &str,
    factory: &IdentifierFactory,
) -> Result<Generator, NamingError> {
    Ok(match ty {
        Type::Primitive(kind) => Generator::Primitive(*kind),
        Type::Enum(e) => Generator::OneOf(e.values.iter().map(|v| v.value.clone()).collect()),
        Type::Optional(inner) => Generator::Optional(Box::new(generator_for(inner, owner, property, factory)?)),
        Type::Array(element) => Generator::Slice(Box::new(generator_for(element, owner, property, factory)?)),
        Type::Map(map) => Generator::Map {
            key: map.key,
            value: Box::new(generator_for(&map.value, owner, property, factory)?),
        },
        Type::Flagged(flagged) => generator_for(&flagged.inner, owner, property, factory)?,
        Type::Reference(target) => {
            let name = factory.create_identifier(target.name(), Visibility::Exported)?;
            Generator::Named(format!("{name}Generator"))
        }
        // Inline structure gets a generator named after where it sits.
        Type::Object(_) | Type::Resource(_) => Generator::Named(format!("{owner}{property}Generator")),
    })
}

// ------------------------------- Tests ------------------------------------ //

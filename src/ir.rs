//! Strongly-typed IR for generated resource definitions.
//!
//! The variant set of [`Type`] is closed: every pass over the IR either
//! matches all of it or delegates to the default recursion in
//! [`crate::visitor`]. Values are owned trees; cross-declaration links are
//! always [`Type::Reference`] by [`Identifier`], never shared pointers.
use std::collections::BTreeSet;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::ident::Identifier;
use crate::test_case::TestCase;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveKind {
    String,
    Int,
    Float,
    Bool,
    /// Arbitrary JSON.
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Type {
    Primitive(PrimitiveKind),
    Object(ObjectType),
    Resource(ResourceType),
    Enum(EnumType),
    Map(MapType),
    Array(Box<Type>),
    Optional(Box<Type>),
    Flagged(FlaggedType),
    Reference(Identifier),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    #[serde(default)]
    pub properties: IndexMap<String, Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Validations::is_empty")]
    pub validations: Validations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Constraints carried through to the emitted validation manifests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<OrderedFloat<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<OrderedFloat<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    /// Desired state.
    pub spec: Box<Type>,
    /// Observed state; some resources expose none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Box<Type>>,
    /// Vendor resource type, e.g. `Microsoft.Network/virtualNetworks`.
    pub arm_type: String,
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumType {
    pub base: PrimitiveKind,
    pub values: Vec<EnumValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub identifier: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapType {
    pub key: PrimitiveKind,
    pub value: Box<Type>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeFlag {
    Secret,
    ReadOnly,
    Storage,
    Arm,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedType {
    pub flag: TypeFlag,
    pub inner: Box<Type>,
}

/// A named type. Passes never mutate one; they build a replacement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: Identifier,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Type {
    pub fn string() -> Self {
        Type::Primitive(PrimitiveKind::String)
    }
    pub fn int() -> Self {
        Type::Primitive(PrimitiveKind::Int)
    }
    pub fn bool() -> Self {
        Type::Primitive(PrimitiveKind::Bool)
    }
    pub fn reference(id: Identifier) -> Self {
        Type::Reference(id)
    }
    pub fn optional(inner: Type) -> Self {
        Type::Optional(Box::new(inner))
    }
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }
    pub fn map(key: PrimitiveKind, value: Type) -> Self {
        Type::Map(MapType { key, value: Box::new(value) })
    }
    pub fn flagged(flag: TypeFlag, inner: Type) -> Self {
        Type::Flagged(FlaggedType { flag, inner: Box::new(inner) })
    }

    /// Variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Type::Primitive(_) => "primitive",
            Type::Object(_) => "object",
            Type::Resource(_) => "resource",
            Type::Enum(_) => "enum",
            Type::Map(_) => "map",
            Type::Array(_) => "array",
            Type::Optional(_) => "optional",
            Type::Flagged(_) => "flagged",
            Type::Reference(_) => "reference",
        }
    }

    /// Every identifier this type refers to, without following the references.
    pub fn references(&self) -> BTreeSet<Identifier> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<Identifier>) {
        match self {
            Type::Primitive(_) | Type::Enum(_) => {}
            Type::Reference(id) => {
                out.insert(id.clone());
            }
            Type::Object(obj) => {
                for prop in obj.properties.values() {
                    prop.ty.collect_references(out);
                }
            }
            Type::Resource(res) => {
                res.spec.collect_references(out);
                if let Some(status) = &res.status {
                    status.collect_references(out);
                }
            }
            Type::Map(map) => map.value.collect_references(out),
            Type::Array(element) => element.collect_references(out),
            Type::Optional(inner) => inner.collect_references(out),
            Type::Flagged(flagged) => flagged.inner.collect_references(out),
        }
    }
}

impl ObjectType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends (or replaces in place) a property.
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_properties(mut self, properties: IndexMap<String, Property>) -> Self {
        self.properties = properties;
        self
    }

    /// Test cases are keyed by name; adding one with an existing name replaces it.
    pub fn with_test_case(mut self, test_case: TestCase) -> Self {
        upsert_test_case(&mut self.test_cases, test_case);
        self
    }
}

/// Properties compare in declaration order; `IndexMap`'s own equality ignores order.
impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self.properties.iter().eq(other.properties.iter())
            && self.test_cases == other.test_cases
    }
}

impl Eq for ObjectType {}

impl Property {
    pub fn new(ty: Type) -> Self {
        Self { ty, required: false, validations: Validations::default(), description: None }
    }
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }
    pub fn with_validations(mut self, validations: Validations) -> Self {
        self.validations = validations;
        self
    }
}

impl Validations {
    pub fn is_empty(&self) -> bool {
        *self == Validations::default()
    }
}

impl ResourceType {
    pub fn new(spec: Type, arm_type: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            spec: Box::new(spec),
            status: None,
            arm_type: arm_type.into(),
            api_version: api_version.into(),
            test_cases: Vec::new(),
        }
    }
    pub fn with_spec(mut self, spec: Type) -> Self {
        self.spec = Box::new(spec);
        self
    }
    pub fn with_status(mut self, status: Option<Type>) -> Self {
        self.status = status.map(Box::new);
        self
    }
    pub fn with_test_case(mut self, test_case: TestCase) -> Self {
        upsert_test_case(&mut self.test_cases, test_case);
        self
    }
}

impl TypeDefinition {
    pub fn new(name: Identifier, ty: Type) -> Self {
        Self { name, ty, description: None }
    }
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn with_type(&self, ty: Type) -> Self {
        Self { name: self.name.clone(), ty, description: self.description.clone() }
    }
    pub fn with_name(&self, name: Identifier) -> Self {
        Self { name, ty: self.ty.clone(), description: self.description.clone() }
    }
}

fn upsert_test_case(test_cases: &mut Vec<TestCase>, test_case: TestCase) {
    match test_cases.iter_mut().find(|t| t.name() == test_case.name()) {
        Some(existing) => *existing = test_case,
        None => test_cases.push(test_case),
    }
}

// ------------------------------- Tests ------------------------------------ //

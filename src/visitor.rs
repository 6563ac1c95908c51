//! Recursive rewrite of [`Type`] trees with selective per-variant handlers.
//!
//! A [`TypeVisitor`] holds an optional handler for each variant. Variants
//! without a handler get the default behaviour from the matching `walk_*`
//! function: rebuild the same shape with every child visited. Handlers can
//! call the `walk_*` functions themselves to keep recursing.
//!
//! References are leaves. Visiting one never looks up or expands the target,
//! so traversal of cyclic graphs is bounded by the size of each definition.
//!
//! ```
//! use rmgen::ir::Type;
//! use rmgen::visitor::{TypeVisitor, walk_optional};
//!
//! // Collapse Optional(Optional(T)) to Optional(T).
//! let visitor = TypeVisitor::<()>::new().on_optional(|v, inner, ctx| match inner {
//!     Type::Optional(_) => v.visit(inner, ctx),
//!     _ => walk_optional(v, inner, ctx),
//! });
//! let ty = Type::optional(Type::optional(Type::string()));
//! assert_eq!(visitor.visit(&ty, &()).unwrap(), Type::optional(Type::string()));
//! ```
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::ident::Identifier;
use crate::ir::{EnumType, FlaggedType, MapType, ObjectType, PrimitiveKind, ResourceType, Type, TypeDefinition};

pub type Handler<T, C> = Arc<dyn Fn(&TypeVisitor<C>, &T, &C) -> Result<Type> + Send + Sync>;

// ————————————————————————————————————————————————————————————————————————————
// VISITOR
// ————————————————————————————————————————————————————————————————————————————

/// `C` is threaded unchanged to every visited node; drivers typically pass
/// the identifier of the definition being visited.
pub struct TypeVisitor<C> {
    primitive: Option<Handler<PrimitiveKind, C>>,
    object: Option<Handler<ObjectType, C>>,
    resource: Option<Handler<ResourceType, C>>,
    enum_: Option<Handler<EnumType, C>>,
    map: Option<Handler<MapType, C>>,
    /// Receives the element type.
    array: Option<Handler<Type, C>>,
    /// Receives the wrapped type.
    optional: Option<Handler<Type, C>>,
    flagged: Option<Handler<FlaggedType, C>>,
    reference: Option<Handler<Identifier, C>>,
}

impl<C> Default for TypeVisitor<C> {
    fn default() -> Self {
        Self {
            primitive: None,
            object: None,
            resource: None,
            enum_: None,
            map: None,
            array: None,
            optional: None,
            flagged: None,
            reference: None,
        }
    }
}

impl<C> Clone for TypeVisitor<C> {
    fn clone(&self) -> Self {
        Self {
            primitive: self.primitive.clone(),
            object: self.object.clone(),
            resource: self.resource.clone(),
            enum_: self.enum_.clone(),
            map: self.map.clone(),
            array: self.array.clone(),
            optional: self.optional.clone(),
            flagged: self.flagged.clone(),
            reference: self.reference.clone(),
        }
    }
}

macro_rules! handler_setter {
    ($(#[$doc:meta])* $method:ident, $field:ident, $payload:ty) => {
        $(#[$doc])*
        pub fn $method<F>(mut self, handler: F) -> Self
        where
            F: Fn(&TypeVisitor<C>, &$payload, &C) -> Result<Type> + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(handler));
            self
        }
    };
}

impl<C> TypeVisitor<C> {
    /// A visitor with no handlers: the identity rewrite.
    pub fn new() -> Self {
        Self::default()
    }

    handler_setter!(on_primitive, primitive, PrimitiveKind);
    handler_setter!(on_object, object, ObjectType);
    handler_setter!(on_resource, resource, ResourceType);
    handler_setter!(on_enum, enum_, EnumType);
    handler_setter!(on_map, map, MapType);
    handler_setter!(
        /// The handler receives the element type, not the array.
        on_array, array, Type
    );
    handler_setter!(
        /// The handler receives the wrapped type, not the optional.
        on_optional, optional, Type
    );
    handler_setter!(on_flagged, flagged, FlaggedType);
    handler_setter!(
        /// May return a reference to a different target; must not return the target's body.
        on_reference, reference, Identifier
    );

    pub fn visit(&self, ty: &Type, ctx: &C) -> Result<Type> {
        match ty {
            Type::Primitive(kind) => match &self.primitive {
                Some(h) => h(self, kind, ctx),
                None => walk_primitive(self, kind, ctx),
            },
            Type::Object(obj) => match &self.object {
                Some(h) => h(self, obj, ctx),
                None => walk_object(self, obj, ctx),
            },
            Type::Resource(res) => match &self.resource {
                Some(h) => h(self, res, ctx),
                None => walk_resource(self, res, ctx),
            },
            Type::Enum(e) => match &self.enum_ {
                Some(h) => h(self, e, ctx),
                None => walk_enum(self, e, ctx),
            },
            Type::Map(map) => match &self.map {
                Some(h) => h(self, map, ctx),
                None => walk_map(self, map, ctx),
            },
            Type::Array(element) => match &self.array {
                Some(h) => h(self, element, ctx),
                None => walk_array(self, element, ctx),
            },
            Type::Optional(inner) => match &self.optional {
                Some(h) => h(self, inner, ctx),
                None => walk_optional(self, inner, ctx),
            },
            Type::Flagged(flagged) => match &self.flagged {
                Some(h) => h(self, flagged, ctx),
                None => walk_flagged(self, flagged, ctx),
            },
            Type::Reference(id) => match &self.reference {
                Some(h) => h(self, id, ctx),
                None => walk_reference(self, id, ctx),
            },
        }
    }

    pub fn visit_definition(&self, def: &TypeDefinition, ctx: &C) -> Result<TypeDefinition> {
        Ok(def.with_type(self.visit(&def.ty, ctx)?))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEFAULT RECURSION
// ————————————————————————————————————————————————————————————————————————————

pub fn walk_primitive<C>(_: &TypeVisitor<C>, kind: &PrimitiveKind, _: &C) -> Result<Type> {
    Ok(Type::Primitive(*kind))
}

pub fn walk_enum<C>(_: &TypeVisitor<C>, e: &EnumType, _: &C) -> Result<Type> {
    Ok(Type::Enum(e.clone()))
}

pub fn walk_reference<C>(_: &TypeVisitor<C>, id: &Identifier, _: &C) -> Result<Type> {
    Ok(Type::Reference(id.clone()))
}

pub fn walk_object<C>(v: &TypeVisitor<C>, obj: &ObjectType, ctx: &C) -> Result<Type> {
    let mut properties = obj.properties.clone();
    for (name, prop) in properties.iter_mut() {
        prop.ty = v.visit(&prop.ty, ctx).with_context(|| format!("property {name:?}"))?;
    }
    Ok(Type::Object(obj.clone().with_properties(properties)))
}

pub fn walk_resource<C>(v: &TypeVisitor<C>, res: &ResourceType, ctx: &C) -> Result<Type> {
    let spec = v.visit(&res.spec, ctx).context("resource spec")?;
    let status = match &res.status {
        Some(status) => Some(v.visit(status, ctx).context("resource status")?),
        None => None,
    };
    Ok(Type::Resource(res.clone().with_spec(spec).with_status(status)))
}

pub fn walk_map<C>(v: &TypeVisitor<C>, map: &MapType, ctx: &C) -> Result<Type> {
    Ok(Type::map(map.key, v.visit(&map.value, ctx)?))
}

pub fn walk_array<C>(v: &TypeVisitor<C>, element: &Type, ctx: &C) -> Result<Type> {
    Ok(Type::array(v.visit(element, ctx)?))
}

pub fn walk_optional<C>(v: &TypeVisitor<C>, inner: &Type, ctx: &C) -> Result<Type> {
    Ok(Type::optional(v.visit(inner, ctx)?))
}

pub fn walk_flagged<C>(v: &TypeVisitor<C>, flagged: &FlaggedType, ctx: &C) -> Result<Type> {
    Ok(Type::flagged(flagged.flag, v.visit(&flagged.inner, ctx)?))
}

// ------------------------------- Tests ------------------------------------ //

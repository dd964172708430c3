//! Executable schema builder.
//!
//! [`build_executable_schema`] lowers a [`SchemaDocument`] into an
//! `async-graphql` dynamic schema, wiring every field to a resolver from the
//! [`ResolverMap`] (or the default property resolver). Every field runs
//! through [`WiredField`], which coerces arguments, applies scalar
//! decorations, enum internal values and scalar functions, emits lifecycle
//! events and records timings when tracing is on.

use crate::channel::{concrete_path, ChannelSource};
use crate::context::{AuxContext, RequestContext};
use crate::directives::{self, Decorations};
use crate::document::{FieldDef, InputValueDef, SchemaDocument, TypeDef, TypeKindTag, TypeRef};
use crate::error::{RouteqlError, RouteqlResult};
use crate::events::{FieldEvent, FieldPhase, Lifecycle};
use crate::executor::PhaseGuard;
use crate::resolver::{
    DefaultResolver, ResolverArgs, ResolverEntry, ResolverError, ResolverFuture, ResolverInfo,
    ResolverMap, ResolverResult, Resolver, ScalarFn, SharedResolver, TypeResolverFn,
};
use crate::scalars::{DecoratedScalar, ScalarFactories};
use crate::timing::{FieldTiming, FieldTimings};
use async_graphql::dynamic::{
    self, Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, ResolverContext, Scalar, Subscription, SubscriptionField,
    SubscriptionFieldFuture, Union,
};
use async_graphql::{Name, Value as ConstValue};
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Produces the auxiliary context passed to every wired resolver.
pub type PreResolveHook =
    Arc<dyn Fn(&Value, &ResolverArgs, &RequestContext) -> AuxContext + Send + Sync>;

/// Options for [`build_executable_schema`].
#[derive(Clone)]
pub struct BuildOptions {
    /// Hook composed in front of every resolver supplied through the map.
    pub pre_resolve: Option<PreResolveHook>,
    /// Directive name to scalar factory registry.
    pub scalars: ScalarFactories,
    /// Field lifecycle listeners.
    pub lifecycle: Arc<Lifecycle>,
    /// Realtime transport backing subscription fields.
    pub channels: Option<Arc<dyn ChannelSource>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            pre_resolve: None,
            scalars: ScalarFactories::builtin(),
            lifecycle: Arc::new(Lifecycle::new()),
            channels: None,
        }
    }
}

impl BuildOptions {
    /// Sets the pre-resolve hook.
    #[must_use]
    pub fn pre_resolve<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &RequestContext) -> AuxContext + Send + Sync + 'static,
    {
        self.pre_resolve = Some(Arc::new(hook));
        self
    }

    /// Sets the realtime transport.
    #[must_use]
    pub fn channels(mut self, channels: Arc<dyn ChannelSource>) -> Self {
        self.channels = Some(channels);
        self
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("pre_resolve", &self.pre_resolve.is_some())
            .field("scalars", &self.scalars)
            .field("lifecycle", &self.lifecycle)
            .field("channels", &self.channels.is_some())
            .finish()
    }
}

/// A schema whose fields carry live resolvers.
///
/// Cloning is cheap.
#[derive(Clone)]
pub struct ExecutableSchema {
    pub(crate) schema: dynamic::Schema,
    document: Arc<SchemaDocument>,
    resolvers: ResolverMap,
    decorations: Arc<Decorations>,
}

impl ExecutableSchema {
    /// Parses SDL and builds it with default options.
    pub fn from_sdl(sdl: &str, resolvers: ResolverMap) -> RouteqlResult<Self> {
        build_executable_schema(SchemaDocument::parse(sdl)?, resolvers, &BuildOptions::default())
    }

    /// The document this schema was built from.
    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    /// The resolver map this schema was built from.
    pub fn resolvers(&self) -> &ResolverMap {
        &self.resolvers
    }

    /// Scalar decorations applied while building.
    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    /// SDL of the built schema.
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }
}

impl fmt::Debug for ExecutableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableSchema")
            .field("query_type", &self.document.query_type)
            .field("types", &self.document.types.len())
            .field("resolvers", &self.resolvers.len())
            .field("decorations", &self.decorations.len())
            .finish()
    }
}

/// Builds an executable schema from a document and a resolver map.
///
/// Every resolver map entry is checked against the document. Entries naming a
/// missing type or field, or whose kind does not match the type, are
/// configuration errors. Bare top-level entries attach to the Query root if it
/// declares the field, else to the Mutation root; otherwise they are skipped.
pub fn build_executable_schema(
    document: SchemaDocument,
    resolvers: ResolverMap,
    options: &BuildOptions,
) -> RouteqlResult<ExecutableSchema> {
    document.validate_roots()?;
    let decorations = directives::resolve(&directives::collect(&document), &options.scalars)?;
    let attached = attach_resolvers(&document, &resolvers)?;

    let wiring = Arc::new(Wiring {
        document: document.clone(),
        decorations: decorations.clone(),
        scalars: attached.scalars,
        enums: attached.enums,
        type_resolvers: attached.type_resolvers,
        lifecycle: Arc::clone(&options.lifecycle),
    });
    let default_resolver: SharedResolver = Arc::new(DefaultResolver);

    let mut builder = dynamic::Schema::build(
        document.query_root()?,
        document.mutation_type.as_deref(),
        document.subscription_type.as_deref(),
    );

    for def in document.types.values() {
        builder = match def {
            TypeDef::Scalar(scalar) => {
                if crate::document::BUILTIN_SCALARS.contains(&scalar.name.as_str()) {
                    continue;
                }
                let mut ty = Scalar::new(&scalar.name);
                if let Some(description) = &scalar.description {
                    ty = ty.description(description);
                }
                builder.register(ty)
            }
            TypeDef::Object(object)
                if document.subscription_type.as_deref() == Some(object.name.as_str()) =>
            {
                let mut ty = Subscription::new(&object.name);
                for field in object.fields.values() {
                    let key = (object.name.clone(), field.name.clone());
                    let (resolver, pre_resolve) = match attached.fields.get(&key) {
                        Some(resolver) => (Arc::clone(resolver), options.pre_resolve.clone()),
                        None => (Arc::new(PayloadResolver) as SharedResolver, None),
                    };
                    let wired = Arc::new(WiredField {
                        parent_type: object.name.clone(),
                        def: field.clone(),
                        resolver,
                        pre_resolve,
                        wiring: Arc::clone(&wiring),
                        channels: options.channels.clone(),
                    });
                    ty = ty.field(subscription_field(field, wired));
                }
                builder.register(ty)
            }
            TypeDef::Object(object) => {
                let mut ty = Object::new(&object.name);
                if let Some(description) = &object.description {
                    ty = ty.description(description);
                }
                for interface in &object.implements {
                    ty = ty.implement(interface);
                }
                for field in object.fields.values() {
                    let key = (object.name.clone(), field.name.clone());
                    let inherited = object.implements.iter().find_map(|interface| {
                        attached.fields.get(&(interface.clone(), field.name.clone()))
                    });
                    let (resolver, pre_resolve) = match attached.fields.get(&key).or(inherited) {
                        Some(resolver) => (Arc::clone(resolver), options.pre_resolve.clone()),
                        None => (Arc::clone(&default_resolver), None),
                    };
                    let wired = Arc::new(WiredField {
                        parent_type: object.name.clone(),
                        def: field.clone(),
                        resolver,
                        pre_resolve,
                        wiring: Arc::clone(&wiring),
                        channels: None,
                    });
                    ty = ty.field(object_field(field, wired));
                }
                builder.register(ty)
            }
            TypeDef::Interface(interface) => {
                let mut ty = Interface::new(&interface.name);
                if let Some(description) = &interface.description {
                    ty = ty.description(description);
                }
                for parent in &interface.implements {
                    ty = ty.implement(parent);
                }
                for field in interface.fields.values() {
                    let mut iface_field =
                        InterfaceField::new(&field.name, dynamic_type(&field.ty));
                    for arg in field.arguments.values() {
                        iface_field = iface_field.argument(input_value(arg));
                    }
                    if let Some(description) = &field.description {
                        iface_field = iface_field.description(description);
                    }
                    ty = ty.field(iface_field);
                }
                builder.register(ty)
            }
            TypeDef::Union(union_type) => {
                let mut ty = Union::new(&union_type.name);
                if let Some(description) = &union_type.description {
                    ty = ty.description(description);
                }
                for member in &union_type.members {
                    ty = ty.possible_type(member);
                }
                builder.register(ty)
            }
            TypeDef::Enum(enum_type) => {
                let mut ty = Enum::new(&enum_type.name);
                if let Some(description) = &enum_type.description {
                    ty = ty.description(description);
                }
                for value in enum_type.values.values() {
                    let mut item = EnumItem::new(&value.name);
                    if let Some(description) = &value.description {
                        item = item.description(description);
                    }
                    if let Some(reason) = &value.deprecation_reason {
                        item = item.deprecation(Some(reason.as_str()));
                    }
                    ty = ty.item(item);
                }
                builder.register(ty)
            }
            TypeDef::InputObject(input) => {
                let mut ty = InputObject::new(&input.name);
                if let Some(description) = &input.description {
                    ty = ty.description(description);
                }
                for field in input.fields.values() {
                    ty = ty.field(input_value(field));
                }
                builder.register(ty)
            }
        };
    }

    let schema = builder
        .extension(PhaseGuard)
        .finish()
        .map_err(|e| RouteqlError::configuration(format!("Invalid schema: {e}")))?;

    tracing::debug!(
        types = document.types.len(),
        resolvers = resolvers.len(),
        decorations = decorations.len(),
        "built executable schema"
    );

    Ok(ExecutableSchema {
        schema,
        document: Arc::new(document),
        resolvers,
        decorations: Arc::new(decorations),
    })
}

fn object_field(def: &FieldDef, wired: Arc<WiredField>) -> Field {
    let mut field = Field::new(&def.name, dynamic_type(&def.ty), move |ctx| {
        let wired = Arc::clone(&wired);
        FieldFuture::new(async move { wired.resolve(ctx).await })
    });
    for arg in def.arguments.values() {
        field = field.argument(input_value(arg));
    }
    if let Some(description) = &def.description {
        field = field.description(description);
    }
    if let Some(reason) = &def.deprecation_reason {
        field = field.deprecation(Some(reason.as_str()));
    }
    field
}

fn subscription_field(def: &FieldDef, wired: Arc<WiredField>) -> SubscriptionField {
    let mut field = SubscriptionField::new(&def.name, dynamic_type(&def.ty), move |ctx| {
        let wired = Arc::clone(&wired);
        SubscriptionFieldFuture::new(async move { wired.subscribe(ctx).await })
    });
    for arg in def.arguments.values() {
        field = field.argument(input_value(arg));
    }
    if let Some(description) = &def.description {
        field = field.description(description);
    }
    field
}

fn input_value(def: &InputValueDef) -> InputValue {
    let mut value = InputValue::new(&def.name, dynamic_type(&def.ty));
    if let Some(default) = &def.default_value {
        value = value.default_value(default.clone());
    }
    if let Some(description) = &def.description {
        value = value.description(description);
    }
    value
}

fn dynamic_type(ty: &TypeRef) -> dynamic::TypeRef {
    match ty {
        TypeRef::Named(name) => dynamic::TypeRef::Named(name.clone().into()),
        TypeRef::NonNull(inner) => dynamic::TypeRef::NonNull(Box::new(dynamic_type(inner))),
        TypeRef::List(inner) => dynamic::TypeRef::List(Box::new(dynamic_type(inner))),
    }
}

/// Resolver map entries sorted by what they attach to.
#[derive(Default)]
struct Attached {
    fields: HashMap<(String, String), SharedResolver>,
    scalars: HashMap<String, ScalarHooks>,
    enums: HashMap<String, HashMap<String, Value>>,
    type_resolvers: HashMap<String, TypeResolverFn>,
}

#[derive(Default, Clone)]
struct ScalarHooks {
    serialize: Option<ScalarFn>,
    parse_value: Option<ScalarFn>,
}

fn attach_resolvers(document: &SchemaDocument, resolvers: &ResolverMap) -> RouteqlResult<Attached> {
    let mut attached = Attached::default();

    for (key, entry) in resolvers.iter() {
        let field_name = key.field_name.as_str();
        let Some(type_name) = key.type_name.as_deref() else {
            let root = document
                .query_type
                .as_deref()
                .into_iter()
                .chain(document.mutation_type.as_deref())
                .find(|root| document.field(root, field_name).is_some());
            match (root, entry) {
                (Some(root), ResolverEntry::Field(resolver)) => {
                    attached
                        .fields
                        .insert((root.to_string(), field_name.to_string()), Arc::clone(resolver));
                }
                (Some(root), other) => {
                    return Err(RouteqlError::configuration(format!(
                        "Resolver for \"{field_name}\" is a {} but {root}.{field_name} is a field",
                        other.kind()
                    )));
                }
                (None, _) => {
                    tracing::debug!(field = field_name, "no root type declares this field yet");
                }
            }
            continue;
        };

        let Some(def) = document.get_type(type_name) else {
            return Err(RouteqlError::configuration(format!(
                "\"{type_name}\" defined in resolvers, but not in schema"
            )));
        };

        match (def, entry) {
            (TypeDef::Object(object) | TypeDef::Interface(object), ResolverEntry::Field(resolver)) => {
                if !object.fields.contains_key(field_name) {
                    return Err(RouteqlError::configuration(format!(
                        "{type_name}.{field_name} defined in resolvers, but not in schema"
                    )));
                }
                attached
                    .fields
                    .insert((type_name.to_string(), field_name.to_string()), Arc::clone(resolver));
            }
            (TypeDef::Interface(_) | TypeDef::Union(_), ResolverEntry::TypeResolver(f))
                if field_name == "__resolveType" =>
            {
                attached
                    .type_resolvers
                    .insert(type_name.to_string(), Arc::clone(f));
            }
            (TypeDef::Scalar(_), ResolverEntry::Scalar(f)) => {
                let hooks = attached.scalars.entry(type_name.to_string()).or_default();
                match field_name {
                    "serialize" => hooks.serialize = Some(Arc::clone(f)),
                    // Literals reach resolvers already converted to values.
                    "parseValue" | "parseLiteral" => hooks.parse_value = Some(Arc::clone(f)),
                    other => {
                        return Err(RouteqlError::configuration(format!(
                            "Scalar {type_name} has no function \"{other}\"; expected serialize, parseValue or parseLiteral"
                        )));
                    }
                }
            }
            (TypeDef::Enum(enum_type), ResolverEntry::EnumValue(internal)) => {
                if !enum_type.values.contains_key(field_name) {
                    return Err(RouteqlError::configuration(format!(
                        "{type_name}.{field_name} was defined in resolvers, but enum is not in schema"
                    )));
                }
                attached
                    .enums
                    .entry(type_name.to_string())
                    .or_default()
                    .insert(field_name.to_string(), internal.clone());
            }
            (def, entry) => {
                return Err(RouteqlError::configuration(format!(
                    "Resolver {key} is a {} but \"{type_name}\" is {} type",
                    entry.kind(),
                    article(def.kind())
                )));
            }
        }
    }

    Ok(attached)
}

fn article(kind: TypeKindTag) -> String {
    match kind {
        TypeKindTag::Object
        | TypeKindTag::Interface
        | TypeKindTag::InputObject
        | TypeKindTag::Enum => format!("an {kind}"),
        _ => format!("a {kind}"),
    }
}

/// Schema-wide tables shared by every wired field.
struct Wiring {
    document: SchemaDocument,
    decorations: Decorations,
    scalars: HashMap<String, ScalarHooks>,
    enums: HashMap<String, HashMap<String, Value>>,
    type_resolvers: HashMap<String, TypeResolverFn>,
    lifecycle: Arc<Lifecycle>,
}

impl Wiring {
    fn coerce_input(
        &self,
        field: &str,
        value: Value,
        ty: &TypeRef,
        decoration: Option<&DecoratedScalar>,
    ) -> Result<Value, ResolverError> {
        match (ty, value) {
            (_, Value::Null) => Ok(Value::Null),
            (TypeRef::NonNull(inner), value) => self.coerce_input(field, value, inner, decoration),
            (TypeRef::List(inner), Value::Array(items)) => items
                .into_iter()
                .map(|item| self.coerce_input(field, item, inner, decoration))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (TypeRef::List(inner), value) => self.coerce_input(field, value, inner, decoration),
            (TypeRef::Named(name), value) => {
                let value = match self.document.kind_of(name) {
                    Some(TypeKindTag::Scalar) => {
                        match self.scalars.get(name).and_then(|h| h.parse_value.as_ref()) {
                            Some(parse) => parse(value)?,
                            None => value,
                        }
                    }
                    Some(TypeKindTag::Enum) => match (self.enums.get(name), value) {
                        (Some(mapping), Value::String(item)) => {
                            mapping.get(&item).cloned().unwrap_or(Value::String(item))
                        }
                        (_, value) => value,
                    },
                    Some(TypeKindTag::InputObject) => self.coerce_input_object(name, value)?,
                    _ => value,
                };
                match decoration {
                    Some(decoration) => Ok(decoration.parse_value(field, value)?),
                    None => Ok(value),
                }
            }
        }
    }

    fn coerce_input_object(&self, type_name: &str, value: Value) -> Result<Value, ResolverError> {
        let (Some(TypeDef::InputObject(def)), Value::Object(mut map)) =
            (self.document.get_type(type_name), value.clone())
        else {
            return Ok(value);
        };
        for (name, field) in &def.fields {
            if let Some(item) = map.remove(name) {
                let decoration = self.decorations.input_field(type_name, name);
                let item = self.coerce_input(name, item, &field.ty, decoration)?;
                map.insert(name.clone(), item);
            }
        }
        Ok(Value::Object(map))
    }

    fn serialize_output(
        &self,
        field: &str,
        value: Value,
        ty: &TypeRef,
        decoration: Option<&DecoratedScalar>,
    ) -> Result<Value, ResolverError> {
        match (ty, value) {
            (_, Value::Null) => Ok(Value::Null),
            (TypeRef::NonNull(inner), value) => {
                self.serialize_output(field, value, inner, decoration)
            }
            (TypeRef::List(inner), Value::Array(items)) => items
                .into_iter()
                .map(|item| self.serialize_output(field, item, inner, decoration))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (TypeRef::List(_), value) => Ok(value),
            (TypeRef::Named(name), value) => {
                let value = match self.document.kind_of(name) {
                    Some(TypeKindTag::Scalar) => {
                        match self.scalars.get(name).and_then(|h| h.serialize.as_ref()) {
                            Some(serialize) => serialize(value)?,
                            None => value,
                        }
                    }
                    Some(TypeKindTag::Enum) => self.enum_name(name, value)?,
                    _ => return Ok(value),
                };
                match decoration {
                    Some(decoration) => Ok(decoration.serialize(field, value)?),
                    None => Ok(value),
                }
            }
        }
    }

    fn enum_name(&self, enum_name: &str, value: Value) -> Result<Value, ResolverError> {
        let Some(mapping) = self.enums.get(enum_name) else {
            return Ok(value);
        };
        if let Some((name, _)) = mapping.iter().find(|(_, internal)| **internal == value) {
            return Ok(Value::String(name.clone()));
        }
        match &value {
            Value::String(name) if !mapping.contains_key(name) => Ok(value),
            _ => Err(ResolverError::Custom(format!(
                "Enum \"{enum_name}\" cannot represent value: {value}"
            ))),
        }
    }

    fn resolve_type(&self, abstract_type: &str, value: &Value) -> async_graphql::Result<String> {
        let resolved = match self.type_resolvers.get(abstract_type) {
            Some(resolve) => resolve(value),
            None => value
                .get("__typename")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        };
        resolved.ok_or_else(|| {
            async_graphql::Error::new(format!(
                "Abstract type \"{abstract_type}\" must resolve to an Object type at runtime"
            ))
        })
    }

    fn into_field_value(
        &self,
        value: Value,
        ty: &TypeRef,
    ) -> async_graphql::Result<Option<FieldValue<'static>>> {
        match ty {
            TypeRef::NonNull(inner) => self.into_field_value(value, inner),
            _ if value.is_null() => Ok(None),
            TypeRef::List(inner) => {
                let Value::Array(items) = value else {
                    return Err(async_graphql::Error::new(format!(
                        "Expected a list for {ty}, found {value}"
                    )));
                };
                let items = items
                    .into_iter()
                    .map(|item| {
                        Ok(self
                            .into_field_value(item, inner)?
                            .unwrap_or(FieldValue::NULL))
                    })
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(Some(FieldValue::list(items)))
            }
            TypeRef::Named(name) => match self.document.kind_of(name) {
                Some(TypeKindTag::Object) => Ok(Some(FieldValue::owned_any(value))),
                Some(kind) if kind.is_abstract() => {
                    let concrete = self.resolve_type(name, &value)?;
                    Ok(Some(FieldValue::owned_any(value).with_type(concrete)))
                }
                Some(TypeKindTag::Enum) => match value {
                    Value::String(item) => Ok(Some(FieldValue::value(ConstValue::Enum(
                        Name::new(item),
                    )))),
                    other => Err(async_graphql::Error::new(format!(
                        "Enum \"{name}\" cannot represent value: {other}"
                    ))),
                },
                _ => Ok(Some(FieldValue::value(ConstValue::from_json(value)?))),
            },
        }
    }
}

/// Resolver used by subscription fields without a map entry: the published
/// payload is the field value.
struct PayloadResolver;

impl Resolver for PayloadResolver {
    fn resolve<'a>(
        &'a self,
        _aux: &'a AuxContext,
        parent: &'a Value,
        _args: &'a ResolverArgs,
        _ctx: &'a RequestContext,
        _info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let payload = parent.clone();
        Box::pin(async move { Ok(payload) })
    }
}

/// One field of the executable schema together with everything needed to
/// resolve it.
struct WiredField {
    parent_type: String,
    def: FieldDef,
    resolver: SharedResolver,
    pre_resolve: Option<PreResolveHook>,
    wiring: Arc<Wiring>,
    channels: Option<Arc<dyn ChannelSource>>,
}

impl WiredField {
    async fn resolve<'a>(
        &self,
        rctx: ResolverContext<'a>,
    ) -> async_graphql::Result<Option<FieldValue<'a>>> {
        let fallback;
        let request = match rctx.ctx.data_opt::<RequestContext>() {
            Some(request) => request,
            None => {
                fallback = RequestContext::new();
                &fallback
            }
        };
        let parent = parent_json(rctx.parent_value);
        let args = self
            .arguments(&rctx)
            .map_err(ResolverError::into_graphql_error)?;
        let info = self.info(&rctx);

        let value = self
            .run(&parent, &args, request, &info)
            .await
            .map_err(ResolverError::into_graphql_error)?;
        self.wiring.into_field_value(value, &self.def.ty)
    }

    async fn subscribe<'a>(
        self: Arc<Self>,
        rctx: ResolverContext<'a>,
    ) -> async_graphql::Result<BoxStream<'a, async_graphql::Result<FieldValue<'a>>>> {
        let request = rctx
            .ctx
            .data_opt::<RequestContext>()
            .cloned()
            .unwrap_or_default();
        let args = self
            .arguments(&rctx)
            .map_err(ResolverError::into_graphql_error)?;
        let info = self.info(&rctx);

        let channels = self.channels.clone().ok_or_else(|| {
            async_graphql::Error::new("Subscriptions require a realtime transport")
        })?;
        let path = concrete_path(&self.def, |name| args.get(name))
            .map_err(|e| async_graphql::Error::new(e.message))?;
        let events = channels
            .subscribe(&path)
            .await
            .map_err(|e| async_graphql::Error::new(e.message))?;
        tracing::debug!(field = %self.def.name, %path, "subscription attached");

        Ok(events.then(move |payload| {
            let field = Arc::clone(&self);
            let request = request.clone();
            let args = args.clone();
            let info = info.clone();
            async move {
                let value = field
                    .run(&payload, &args, &request, &info)
                    .await
                    .map_err(ResolverError::into_graphql_error)?;
                let value: FieldValue<'a> = field
                    .wiring
                    .into_field_value(value, &field.def.ty)?
                    .unwrap_or(FieldValue::NULL);
                Ok(value)
            }
        })
        .boxed())
    }

    fn arguments(&self, rctx: &ResolverContext<'_>) -> Result<ResolverArgs, ResolverError> {
        let mut args = ResolverArgs::new();
        for (name, value) in rctx.args.iter() {
            let json = value
                .as_value()
                .clone()
                .into_json()
                .map_err(|e| ResolverError::ArgumentParseError(name.to_string(), e.to_string()))?;
            let json = match self.def.arguments.get(name.as_str()) {
                Some(arg) => {
                    let decoration =
                        self.wiring
                            .decorations
                            .argument(&self.parent_type, &self.def.name, &arg.name);
                    self.wiring.coerce_input(&arg.name, json, &arg.ty, decoration)?
                }
                None => json,
            };
            args.set(name.as_str(), json);
        }
        Ok(args)
    }

    fn info(&self, rctx: &ResolverContext<'_>) -> ResolverInfo {
        let path = rctx
            .ctx
            .path_node
            .as_ref()
            .map(|node| node.to_string_vec())
            .unwrap_or_default();
        ResolverInfo::new(&self.def.name, &self.parent_type)
            .with_return_type(self.def.ty.to_string())
            .with_path(path)
    }

    async fn run(
        &self,
        parent: &Value,
        args: &ResolverArgs,
        request: &RequestContext,
        info: &ResolverInfo,
    ) -> ResolverResult {
        let lifecycle = &self.wiring.lifecycle;
        lifecycle.emit(&FieldEvent {
            phase: FieldPhase::BeforeResolve,
            parent,
            args,
            context: request,
            info,
            result: None,
        });

        let aux = match &self.pre_resolve {
            Some(hook) => hook(parent, args, request),
            None => AuxContext::new(),
        };
        let timings = request.get::<Arc<FieldTimings>>();
        let started = Instant::now();
        let call = self.resolver.resolve(&aux, parent, args, request, info);
        let result = match timings {
            Some(_) => {
                let span = tracing::info_span!(
                    "graphql.field",
                    field = %info.field_name,
                    parent_type = %info.parent_type,
                    return_type = %info.return_type,
                    path = %info.path_string(),
                );
                call.instrument(span).await
            }
            None => call.await,
        };
        let result = result.and_then(|value| {
            let decoration = self.wiring.decorations.field(&self.parent_type, &self.def.name);
            self.wiring
                .serialize_output(&self.def.name, value, &self.def.ty, decoration)
        });

        if let Some(timings) = timings {
            timings.record(FieldTiming {
                path: info.path_string(),
                parent_type: info.parent_type.clone(),
                field_name: info.field_name.clone(),
                return_type: info.return_type.clone(),
                duration: started.elapsed(),
            });
        }

        lifecycle.emit(&FieldEvent {
            phase: FieldPhase::AfterResolve,
            parent,
            args,
            context: request,
            info,
            result: Some(&result),
        });
        result
    }
}

fn parent_json(parent: &FieldValue<'_>) -> Value {
    if let Ok(json) = parent.try_downcast_ref::<Value>() {
        return json.clone();
    }
    parent
        .as_value()
        .and_then(|value| value.clone().into_json().ok())
        .unwrap_or(Value::Null)
}

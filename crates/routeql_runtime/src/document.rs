//! Schema document model.
//!
//! SDL text is parsed with the `async-graphql` parser and lowered into a
//! [`SchemaDocument`], which keeps the directive annotations needed by the
//! scalar decoration pass and supports merging of partial documents.

use crate::error::{RouteqlError, RouteqlResult};
use crate::scalars::{DirectiveArg, DirectiveArgs};
use async_graphql::parser::types::{
    BaseType, ConstDirective, FieldDefinition, InputValueDefinition, ServiceDocument, Type,
    TypeKind, TypeSystemDefinition,
};
use async_graphql::parser::Positioned;
use async_graphql::Value as ConstValue;
use indexmap::IndexMap;
use std::fmt;

/// Scalars every schema has without declaring them.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A parsed type system with root operation types resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// `None` only for fragments that leave the query root to another
    /// document.
    pub query_type: Option<String>,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: IndexMap<String, TypeDef>,
}

/// A type definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Object(ObjectDef),
    Interface(ObjectDef),
    Union(UnionDef),
    Enum(EnumDef),
    InputObject(InputObjectDef),
}

/// Discriminant of [`TypeDef`], also covering built-in scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKindTag {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKindTag {
    /// Returns true for interfaces and unions.
    pub fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::Union)
    }
}

impl fmt::Display for TypeKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Object => "object",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::InputObject => "input object",
        };
        f.write_str(name)
    }
}

impl TypeDef {
    /// Name of the defined type.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(def) => &def.name,
            Self::Object(def) | Self::Interface(def) => &def.name,
            Self::Union(def) => &def.name,
            Self::Enum(def) => &def.name,
            Self::InputObject(def) => &def.name,
        }
    }

    /// Kind of the defined type.
    pub fn kind(&self) -> TypeKindTag {
        match self {
            Self::Scalar(_) => TypeKindTag::Scalar,
            Self::Object(_) => TypeKindTag::Object,
            Self::Interface(_) => TypeKindTag::Interface,
            Self::Union(_) => TypeKindTag::Union,
            Self::Enum(_) => TypeKindTag::Enum,
            Self::InputObject(_) => TypeKindTag::InputObject,
        }
    }

    /// Fields of an object or interface type.
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            Self::Object(def) | Self::Interface(def) => Some(&def.fields),
            _ => None,
        }
    }
}

/// Scalar type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

/// Object or interface type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub implements: Vec<String>,
}

/// Union type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionDef {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
}

/// Enum type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, EnumValueDef>,
}

/// Enum value definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

/// Input object type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValueDef>,
}

/// Field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, InputValueDef>,
    pub deprecation_reason: Option<String>,
    pub directives: Vec<DirectiveArgs>,
}

impl FieldDef {
    /// True if both definitions have the same return type and arguments.
    pub fn same_signature(&self, other: &FieldDef) -> bool {
        self.ty == other.ty
            && self.arguments.len() == other.arguments.len()
            && self.arguments.iter().all(|(name, arg)| {
                other
                    .arguments
                    .get(name)
                    .is_some_and(|theirs| theirs.ty == arg.ty)
            })
    }
}

/// Argument or input field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<ConstValue>,
    pub directives: Vec<DirectiveArgs>,
}

/// Type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// The innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::NonNull(inner) | Self::List(inner) => inner.named_type(),
        }
    }

    fn from_ast(ty: &Type) -> Self {
        let base = match &ty.base {
            BaseType::Named(name) => Self::named(name.as_str()),
            BaseType::List(inner) => Self::list(Self::from_ast(inner)),
        };
        if ty.nullable {
            base
        } else {
            Self::non_null(base)
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl SchemaDocument {
    /// Parses SDL text of a complete schema.
    pub fn parse(sdl: &str) -> RouteqlResult<Self> {
        let document = Self::parse_fragment(sdl)?;
        document.validate_roots()?;
        Ok(document)
    }

    /// Parses SDL text meant to be merged into another document.
    ///
    /// The query root may be missing and root types may be defined by the
    /// document this one is merged into. Roots are checked on the merge
    /// result instead.
    pub fn parse_fragment(sdl: &str) -> RouteqlResult<Self> {
        let document = async_graphql::parser::parse_schema(sdl)
            .map_err(|e| RouteqlError::schema(format!("Failed to parse schema: {e}")))?;
        Self::lower(&document)
    }

    /// Lowers a parsed service document of a complete schema.
    pub fn from_service_document(document: &ServiceDocument) -> RouteqlResult<Self> {
        let document = Self::lower(document)?;
        document.validate_roots()?;
        Ok(document)
    }

    fn lower(document: &ServiceDocument) -> RouteqlResult<Self> {
        let mut roots = (None, None, None);
        let mut types: IndexMap<String, TypeDef> = IndexMap::new();

        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    let schema = &schema.node;
                    let name = |n: &Option<Positioned<async_graphql::Name>>| {
                        n.as_ref().map(|n| n.node.to_string())
                    };
                    roots.0 = name(&schema.query).or(roots.0);
                    roots.1 = name(&schema.mutation).or(roots.1);
                    roots.2 = name(&schema.subscription).or(roots.2);
                }
                TypeSystemDefinition::Type(ty) => {
                    let extend = ty.node.extend;
                    let def = convert_type_definition(&ty.node)?;
                    let name = def.name().to_string();
                    match types.get(&name) {
                        Some(existing) if extend => {
                            let merged = merge_type(existing, &def)?;
                            types.insert(name, merged);
                        }
                        Some(_) => {
                            return Err(RouteqlError::schema(format!(
                                "Type \"{name}\" is defined more than once"
                            )));
                        }
                        None => {
                            types.insert(name, def);
                        }
                    }
                }
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        let root = |explicit: Option<String>, default: &str| {
            explicit.or_else(|| types.contains_key(default).then(|| default.to_string()))
        };
        let query_type = root(roots.0, "Query");
        let mutation_type = root(roots.1, "Mutation");
        let subscription_type = root(roots.2, "Subscription");

        Ok(Self {
            query_type,
            mutation_type,
            subscription_type,
            types,
        })
    }

    /// Name of the query root, required of every executable document.
    pub fn query_root(&self) -> RouteqlResult<&str> {
        self.query_type
            .as_deref()
            .ok_or_else(|| RouteqlError::schema("Query root type must be provided"))
    }

    /// Checks that a query root exists and that every root is a defined
    /// object type.
    pub fn validate_roots(&self) -> RouteqlResult<()> {
        self.query_root()?;
        self.check_roots()
    }

    fn check_roots(&self) -> RouteqlResult<()> {
        let roots = self
            .query_type
            .iter()
            .chain(self.mutation_type.as_ref())
            .chain(self.subscription_type.as_ref());
        for root in roots {
            match self.types.get(root) {
                Some(TypeDef::Object(_)) => {}
                Some(other) => {
                    return Err(RouteqlError::schema(format!(
                        "Root type \"{root}\" must be an object type, found {}",
                        other.kind()
                    )));
                }
                None => {
                    return Err(RouteqlError::schema(format!(
                        "Root type \"{root}\" is not defined"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Gets a type by name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Kind of a named type, including built-in scalars.
    pub fn kind_of(&self, name: &str) -> Option<TypeKindTag> {
        if BUILTIN_SCALARS.contains(&name) {
            return Some(TypeKindTag::Scalar);
        }
        self.types.get(name).map(TypeDef::kind)
    }

    /// Gets a field of an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        self.types
            .get(type_name)
            .and_then(TypeDef::fields)
            .and_then(|fields| fields.get(field_name))
    }

    /// Subscription root fields, in declaration order.
    pub fn subscription_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.subscription_type
            .as_deref()
            .and_then(|name| self.types.get(name))
            .and_then(TypeDef::fields)
            .into_iter()
            .flat_map(IndexMap::values)
    }

    /// Merges `other` into a copy of this document.
    ///
    /// Types and fields from both documents are kept. Redeclaring a type with
    /// a different kind, or a field with a different signature, is a merge
    /// conflict.
    pub fn merge(&self, other: &SchemaDocument) -> RouteqlResult<SchemaDocument> {
        let mut merged = self.clone();
        merged.mutation_type =
            merge_root("mutation", self.mutation_type.as_ref(), other.mutation_type.as_ref())?;
        merged.subscription_type = merge_root(
            "subscription",
            self.subscription_type.as_ref(),
            other.subscription_type.as_ref(),
        )?;
        merged.query_type =
            merge_root("query", self.query_type.as_ref(), other.query_type.as_ref())?;

        for (name, def) in &other.types {
            let next = match merged.types.get(name) {
                Some(existing) => merge_type(existing, def)?,
                None => def.clone(),
            };
            merged.types.insert(name.clone(), next);
        }
        merged.check_roots()?;
        Ok(merged)
    }
}

fn merge_root(
    operation: &str,
    current: Option<&String>,
    incoming: Option<&String>,
) -> RouteqlResult<Option<String>> {
    match (current, incoming) {
        (Some(a), Some(b)) if a != b => Err(RouteqlError::merge_conflict(format!(
            "{operation} root type \"{b}\" conflicts with \"{a}\""
        ))),
        (a, b) => Ok(a.or(b).cloned()),
    }
}

fn merge_type(existing: &TypeDef, incoming: &TypeDef) -> RouteqlResult<TypeDef> {
    let name = existing.name();
    match (existing, incoming) {
        (TypeDef::Object(a), TypeDef::Object(b)) => Ok(TypeDef::Object(merge_object(a, b)?)),
        (TypeDef::Interface(a), TypeDef::Interface(b)) => {
            Ok(TypeDef::Interface(merge_object(a, b)?))
        }
        (TypeDef::Union(a), TypeDef::Union(b)) => {
            let mut members = a.members.clone();
            for member in &b.members {
                if !members.contains(member) {
                    members.push(member.clone());
                }
            }
            Ok(TypeDef::Union(UnionDef {
                name: a.name.clone(),
                description: b.description.clone().or_else(|| a.description.clone()),
                members,
            }))
        }
        (TypeDef::Enum(a), TypeDef::Enum(b)) => {
            let mut values = a.values.clone();
            values.extend(b.values.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(TypeDef::Enum(EnumDef {
                name: a.name.clone(),
                description: b.description.clone().or_else(|| a.description.clone()),
                values,
            }))
        }
        (TypeDef::InputObject(a), TypeDef::InputObject(b)) => {
            let mut fields = a.fields.clone();
            for (field_name, field) in &b.fields {
                if let Some(current) = fields.get(field_name) {
                    if current.ty != field.ty {
                        return Err(RouteqlError::merge_conflict(format!(
                            "Input field \"{name}.{field_name}\" is declared as {} and {}",
                            current.ty, field.ty
                        )));
                    }
                }
                fields.insert(field_name.clone(), field.clone());
            }
            Ok(TypeDef::InputObject(InputObjectDef {
                name: a.name.clone(),
                description: b.description.clone().or_else(|| a.description.clone()),
                fields,
            }))
        }
        (TypeDef::Scalar(a), TypeDef::Scalar(b)) => Ok(TypeDef::Scalar(ScalarDef {
            name: a.name.clone(),
            description: b.description.clone().or_else(|| a.description.clone()),
        })),
        (a, b) => Err(RouteqlError::merge_conflict(format!(
            "Type \"{name}\" is declared as {} and {}",
            a.kind(),
            b.kind()
        ))),
    }
}

fn merge_object(existing: &ObjectDef, incoming: &ObjectDef) -> RouteqlResult<ObjectDef> {
    let mut merged = existing.clone();
    for (field_name, field) in &incoming.fields {
        if let Some(current) = merged.fields.get(field_name) {
            if !current.same_signature(field) {
                return Err(RouteqlError::merge_conflict(format!(
                    "Field \"{}.{field_name}\" is declared with incompatible signatures",
                    existing.name
                )));
            }
        }
        merged.fields.insert(field_name.clone(), field.clone());
    }
    for interface in &incoming.implements {
        if !merged.implements.contains(interface) {
            merged.implements.push(interface.clone());
        }
    }
    if incoming.description.is_some() {
        merged.description.clone_from(&incoming.description);
    }
    Ok(merged)
}

fn convert_type_definition(
    def: &async_graphql::parser::types::TypeDefinition,
) -> RouteqlResult<TypeDef> {
    let name = def.name.node.to_string();
    let description = def.description.as_ref().map(|d| d.node.clone());

    let converted = match &def.kind {
        TypeKind::Scalar => TypeDef::Scalar(ScalarDef { name, description }),
        TypeKind::Object(obj) => TypeDef::Object(ObjectDef {
            name,
            description,
            fields: convert_fields(&obj.fields),
            implements: obj.implements.iter().map(|i| i.node.to_string()).collect(),
        }),
        TypeKind::Interface(iface) => TypeDef::Interface(ObjectDef {
            name,
            description,
            fields: convert_fields(&iface.fields),
            implements: iface.implements.iter().map(|i| i.node.to_string()).collect(),
        }),
        TypeKind::Union(union_type) => TypeDef::Union(UnionDef {
            name,
            description,
            members: union_type.members.iter().map(|m| m.node.to_string()).collect(),
        }),
        TypeKind::Enum(enum_type) => TypeDef::Enum(EnumDef {
            name,
            description,
            values: enum_type
                .values
                .iter()
                .map(|v| {
                    let value = &v.node;
                    let def = EnumValueDef {
                        name: value.value.node.to_string(),
                        description: value.description.as_ref().map(|d| d.node.clone()),
                        deprecation_reason: deprecation(&value.directives),
                    };
                    (def.name.clone(), def)
                })
                .collect(),
        }),
        TypeKind::InputObject(input) => TypeDef::InputObject(InputObjectDef {
            name,
            description,
            fields: convert_input_values(&input.fields),
        }),
    };
    Ok(converted)
}

fn convert_fields(fields: &[Positioned<FieldDefinition>]) -> IndexMap<String, FieldDef> {
    fields
        .iter()
        .map(|f| {
            let field = &f.node;
            let def = FieldDef {
                name: field.name.node.to_string(),
                description: field.description.as_ref().map(|d| d.node.clone()),
                ty: TypeRef::from_ast(&field.ty.node),
                arguments: convert_input_values(&field.arguments),
                deprecation_reason: deprecation(&field.directives),
                directives: convert_directives(&field.directives),
            };
            (def.name.clone(), def)
        })
        .collect()
}

fn convert_input_values(
    values: &[Positioned<InputValueDefinition>],
) -> IndexMap<String, InputValueDef> {
    values
        .iter()
        .map(|v| {
            let value = &v.node;
            let def = InputValueDef {
                name: value.name.node.to_string(),
                description: value.description.as_ref().map(|d| d.node.clone()),
                ty: TypeRef::from_ast(&value.ty.node),
                default_value: value.default_value.as_ref().map(|d| d.node.clone()),
                directives: convert_directives(&value.directives),
            };
            (def.name.clone(), def)
        })
        .collect()
}

fn deprecation(directives: &[Positioned<ConstDirective>]) -> Option<String> {
    directives
        .iter()
        .find(|d| d.node.name.node.as_str() == "deprecated")
        .map(|d| match d.node.get_argument("reason").map(|r| &r.node) {
            Some(ConstValue::String(reason)) => reason.clone(),
            _ => "No longer supported".to_string(),
        })
}

fn convert_directives(directives: &[Positioned<ConstDirective>]) -> Vec<DirectiveArgs> {
    directives
        .iter()
        .filter(|d| d.node.name.node.as_str() != "deprecated")
        .map(|d| DirectiveArgs {
            directive: d.node.name.node.to_string(),
            args: d
                .node
                .arguments
                .iter()
                .map(|(name, value)| (name.node.to_string(), directive_arg(&value.node)))
                .collect(),
        })
        .collect()
}

/// Int literal to Int, Boolean literal to Bool, anything else to its raw
/// string form.
fn directive_arg(value: &ConstValue) -> DirectiveArg {
    match value {
        ConstValue::Number(n) if n.is_i64() => n
            .as_i64()
            .map_or_else(|| DirectiveArg::Raw(n.to_string()), DirectiveArg::Int),
        ConstValue::Boolean(b) => DirectiveArg::Bool(*b),
        ConstValue::String(s) => DirectiveArg::Raw(s.clone()),
        ConstValue::Enum(name) => DirectiveArg::Raw(name.to_string()),
        other => DirectiveArg::Raw(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = r#"
        type Person {
            firstname: String! @minLength(value: 2)
            lastname: String
        }

        enum Role { ADMIN USER @deprecated(reason: "use ADMIN") }

        type Query {
            person(firstname: String! @trim, role: Role = USER): Person
        }
    "#;

    #[test]
    fn test_parse_document() {
        let doc = SchemaDocument::parse(PEOPLE).unwrap();
        assert_eq!(doc.query_type.as_deref(), Some("Query"));
        assert!(doc.mutation_type.is_none());
        assert_eq!(doc.kind_of("Person"), Some(TypeKindTag::Object));
        assert_eq!(doc.kind_of("String"), Some(TypeKindTag::Scalar));

        let person = doc.field("Query", "person").unwrap();
        assert_eq!(person.ty.to_string(), "Person");
        let firstname = &person.arguments["firstname"];
        assert_eq!(firstname.ty.to_string(), "String!");
        assert_eq!(firstname.directives[0].directive, "trim");

        let field = doc.field("Person", "firstname").unwrap();
        assert_eq!(
            field.directives,
            vec![DirectiveArgs::new("minLength").with("value", DirectiveArg::Int(2))]
        );

        match doc.get_type("Role").unwrap() {
            TypeDef::Enum(role) => {
                assert_eq!(role.values["USER"].deprecation_reason.as_deref(), Some("use ADMIN"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_directive_argument_kinds() {
        assert_eq!(directive_arg(&ConstValue::Number(3.into())), DirectiveArg::Int(3));
        assert_eq!(directive_arg(&ConstValue::Boolean(true)), DirectiveArg::Bool(true));
        assert_eq!(
            directive_arg(&ConstValue::String("^[a-z]+$".into())),
            DirectiveArg::Raw("^[a-z]+$".into())
        );
        let float = serde_json::Number::from_f64(2.5).unwrap();
        assert_eq!(directive_arg(&ConstValue::Number(float)), DirectiveArg::Raw("2.5".into()));
    }

    #[test]
    fn test_schema_definition_roots() {
        let doc = SchemaDocument::parse(
            "schema { query: Root mutation: Writes } type Root { a: Int } type Writes { b: Int }",
        )
        .unwrap();
        assert_eq!(doc.query_type.as_deref(), Some("Root"));
        assert_eq!(doc.mutation_type.as_deref(), Some("Writes"));
    }

    #[test]
    fn test_missing_query_root() {
        let err = SchemaDocument::parse("type Person { name: String }").unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.message.contains("Query"));
    }

    #[test]
    fn test_parse_error() {
        let err = SchemaDocument::parse("type Query {").unwrap_err();
        assert!(err.message.starts_with("Failed to parse schema"));
    }

    #[test]
    fn test_extend_type_within_document() {
        let doc = SchemaDocument::parse("type Query { a: Int } extend type Query { b: Int }").unwrap();
        assert!(doc.field("Query", "a").is_some());
        assert!(doc.field("Query", "b").is_some());
    }

    #[test]
    fn test_merge_documents() {
        let a = SchemaDocument::parse("type Query { a: String }").unwrap();
        let b = SchemaDocument::parse("type Query { b: String } type Mutation { c: Int }").unwrap();
        let merged = a.merge(&b).unwrap();

        assert!(merged.field("Query", "a").is_some());
        assert!(merged.field("Query", "b").is_some());
        assert_eq!(merged.mutation_type.as_deref(), Some("Mutation"));
    }

    #[test]
    fn test_merge_root_less_fragments() {
        let base = SchemaDocument::parse("type Query { a: Int } type Person { n: String }").unwrap();
        let mutation = SchemaDocument::parse_fragment("type Mutation { createPerson: Person }").unwrap();
        assert!(mutation.query_type.is_none());

        let merged = base.merge(&mutation).unwrap();
        assert_eq!(merged.query_root().unwrap(), "Query");
        assert_eq!(merged.mutation_type.as_deref(), Some("Mutation"));
        assert!(merged.field("Mutation", "createPerson").is_some());

        let subscription =
            SchemaDocument::parse_fragment("type Subscription { personCreated: Person }").unwrap();
        let merged = merged.merge(&subscription).unwrap();
        assert_eq!(merged.subscription_fields().count(), 1);

        assert!(SchemaDocument::parse("type Mutation { x: Int }").is_err());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = SchemaDocument::parse(PEOPLE).unwrap();
        let merged = a.merge(&a).unwrap();
        assert_eq!(merged, a);
    }

    #[test]
    fn test_merge_conflicts() {
        let a = SchemaDocument::parse("type Query { a: String }").unwrap();
        let b = SchemaDocument::parse("type Query { a: Int }").unwrap();
        let err = a.merge(&b).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::MergeConflict);

        let c = SchemaDocument::parse("type Query { x: Int } scalar Person").unwrap();
        let d = SchemaDocument::parse("type Query { x: Int } type Person { n: Int }").unwrap();
        assert!(c.merge(&d).unwrap_err().message.contains("Person"));
    }
}

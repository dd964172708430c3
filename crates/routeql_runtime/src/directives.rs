//! Scalar directive decoration.
//!
//! Decoration is a pure transform in two steps: [`collect`] walks a
//! [`SchemaDocument`] and lists every directive occurrence on a field,
//! argument or input field; [`resolve`] turns the occurrences whose name
//! matches a registered factory into [`DecoratedScalar`]s keyed by target.
//! Directives without a factory are left alone.

use crate::document::{SchemaDocument, TypeDef};
use crate::error::RouteqlResult;
use crate::scalars::{DecoratedScalar, DirectiveArgs, ScalarFactories};
use std::collections::HashMap;
use std::fmt;

/// Where a directive was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecorationTarget {
    /// Output field of an object or interface.
    Field { type_name: String, field_name: String },
    /// Argument of an object or interface field.
    Argument {
        type_name: String,
        field_name: String,
        argument: String,
    },
    /// Field of an input object.
    InputField { type_name: String, field_name: String },
}

impl fmt::Display for DecorationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field {
                type_name,
                field_name,
            }
            | Self::InputField {
                type_name,
                field_name,
            } => write!(f, "{type_name}.{field_name}"),
            Self::Argument {
                type_name,
                field_name,
                argument,
            } => write!(f, "{type_name}.{field_name}({argument})"),
        }
    }
}

/// One directive occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationRequest {
    pub target: DecorationTarget,
    pub directive: DirectiveArgs,
}

/// Lists every directive occurrence in declaration order.
pub fn collect(document: &SchemaDocument) -> Vec<DecorationRequest> {
    let mut requests = Vec::new();
    for def in document.types.values() {
        match def {
            TypeDef::Object(object) | TypeDef::Interface(object) => {
                for field in object.fields.values() {
                    requests.extend(field.directives.iter().map(|directive| DecorationRequest {
                        target: DecorationTarget::Field {
                            type_name: object.name.clone(),
                            field_name: field.name.clone(),
                        },
                        directive: directive.clone(),
                    }));
                    for arg in field.arguments.values() {
                        requests.extend(arg.directives.iter().map(|directive| {
                            DecorationRequest {
                                target: DecorationTarget::Argument {
                                    type_name: object.name.clone(),
                                    field_name: field.name.clone(),
                                    argument: arg.name.clone(),
                                },
                                directive: directive.clone(),
                            }
                        }));
                    }
                }
            }
            TypeDef::InputObject(input) => {
                for field in input.fields.values() {
                    requests.extend(field.directives.iter().map(|directive| DecorationRequest {
                        target: DecorationTarget::InputField {
                            type_name: input.name.clone(),
                            field_name: field.name.clone(),
                        },
                        directive: directive.clone(),
                    }));
                }
            }
            TypeDef::Scalar(_) | TypeDef::Union(_) | TypeDef::Enum(_) => {}
        }
    }
    requests
}

/// Resolved decorations keyed by target.
#[derive(Debug, Clone, Default)]
pub struct Decorations {
    by_target: HashMap<DecorationTarget, DecoratedScalar>,
}

impl Decorations {
    /// Decoration of an output field.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&DecoratedScalar> {
        self.by_target.get(&DecorationTarget::Field {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
        })
    }

    /// Decoration of a field argument.
    pub fn argument(
        &self,
        type_name: &str,
        field_name: &str,
        argument: &str,
    ) -> Option<&DecoratedScalar> {
        self.by_target.get(&DecorationTarget::Argument {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
            argument: argument.to_string(),
        })
    }

    /// Decoration of an input object field.
    pub fn input_field(&self, type_name: &str, field_name: &str) -> Option<&DecoratedScalar> {
        self.by_target.get(&DecorationTarget::InputField {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
        })
    }

    /// Iterates decorated targets.
    pub fn iter(&self) -> impl Iterator<Item = (&DecorationTarget, &DecoratedScalar)> {
        self.by_target.iter()
    }

    /// Number of decorated targets.
    pub fn len(&self) -> usize {
        self.by_target.len()
    }

    /// Returns true if nothing is decorated.
    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}

/// Builds scalar behaviors for every request whose directive has a factory.
///
/// Several directives on the same target compose in declaration order.
/// Factory errors (bad directive arguments) are returned as configuration
/// errors.
pub fn resolve(
    requests: &[DecorationRequest],
    factories: &ScalarFactories,
) -> RouteqlResult<Decorations> {
    let mut decorations = Decorations::default();
    for request in requests {
        let Some(factory) = factories.get(&request.directive.directive) else {
            tracing::trace!(
                directive = %request.directive.directive,
                target = %request.target,
                "no scalar factory for directive"
            );
            continue;
        };
        let behavior = factory(&request.directive).map_err(|mut err| {
            err.message = format!("{} (on {})", err.message, request.target);
            err
        })?;
        decorations
            .by_target
            .entry(request.target.clone())
            .or_default()
            .push(behavior);
    }
    Ok(decorations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SDL: &str = r"
        input PersonInput {
            email: String! @trim @email
        }
        type Person {
            firstname: String @uppercase
        }
        type Query {
            person(firstname: String @minLength(value: 2) @cached(ttl: 5)): Person
        }
        type Mutation {
            createPerson(input: PersonInput!): Person
        }
    ";

    #[test]
    fn test_collect_lists_every_occurrence() {
        let doc = SchemaDocument::parse(SDL).unwrap();
        let requests = collect(&doc);
        let names: Vec<_> = requests
            .iter()
            .map(|r| format!("{}@{}", r.target, r.directive.directive))
            .collect();

        assert_eq!(
            names,
            vec![
                "PersonInput.email@trim",
                "PersonInput.email@email",
                "Person.firstname@uppercase",
                "Query.person(firstname)@minLength",
                "Query.person(firstname)@cached",
            ]
        );
    }

    #[test]
    fn test_resolve_ignores_unknown_directives() {
        let doc = SchemaDocument::parse(SDL).unwrap();
        let decorations = resolve(&collect(&doc), &ScalarFactories::builtin()).unwrap();

        assert_eq!(decorations.len(), 3);
        let argument = decorations.argument("Query", "person", "firstname").unwrap();
        assert_eq!(argument.names(), vec!["minLength"]);

        let email = decorations.input_field("PersonInput", "email").unwrap();
        assert_eq!(
            email.parse_value("email", json!(" a@b.io ")).unwrap(),
            json!("a@b.io")
        );
        assert!(decorations.field("Person", "firstname").is_some());
        assert!(decorations.field("Person", "lastname").is_none());
    }

    #[test]
    fn test_resolve_reports_target_on_bad_arguments() {
        let doc = SchemaDocument::parse(
            r#"type Query { name(v: String @maxLength(value: "ten")): String }"#,
        )
        .unwrap();
        let err = resolve(&collect(&doc), &ScalarFactories::builtin()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.message.contains("Query.name(v)"));
    }
}

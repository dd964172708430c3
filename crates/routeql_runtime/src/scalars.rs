//! Scalar behaviors requested through schema directives.
//!
//! Each built-in factory corresponds to one directive:
//!
//! - `@minLength`, `@maxLength` - String length constraints
//! - `@min`, `@max` - Numeric range constraints
//! - `@email`, `@url` - Format validators
//! - `@pattern` - Regex pattern matching
//! - `@trim`, `@lowercase`, `@uppercase`, `@sanitize` - Input transformations
//!
//! A field carrying several of these gets one [`DecoratedScalar`] that
//! applies them in declaration order.

use crate::error::{RouteqlError, RouteqlResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A validation error for a specific field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code.
    pub code: ValidationErrorCode,
    /// The constraint that was violated (for min/max etc).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(
        field: impl Into<String>,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
            constraint: None,
        }
    }

    /// Sets the constraint value.
    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    /// String is too short.
    MinLength,
    /// String is too long.
    MaxLength,
    /// Number is too small.
    Min,
    /// Number is too large.
    Max,
    /// Invalid email format.
    InvalidEmail,
    /// Invalid URL format.
    InvalidUrl,
    /// Pattern mismatch.
    PatternMismatch,
    /// Value has the wrong JSON type for the constraint.
    InvalidFormat,
    /// Custom validation failed.
    Custom,
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength => write!(f, "MIN_LENGTH"),
            Self::MaxLength => write!(f, "MAX_LENGTH"),
            Self::Min => write!(f, "MIN"),
            Self::Max => write!(f, "MAX"),
            Self::InvalidEmail => write!(f, "INVALID_EMAIL"),
            Self::InvalidUrl => write!(f, "INVALID_URL"),
            Self::PatternMismatch => write!(f, "PATTERN_MISMATCH"),
            Self::InvalidFormat => write!(f, "INVALID_FORMAT"),
            Self::Custom => write!(f, "CUSTOM"),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Collection of validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationErrors {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty error collection.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Creates errors from a single error.
    pub fn single(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Adds an error.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns errors for a specific field.
    pub fn for_field(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<_> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self::single(error)
    }
}

/// Runtime behavior attached to a field, argument or input field type.
///
/// `parse_value` runs on incoming argument values, `serialize` on resolved
/// output values. Both may transform the value.
pub trait ScalarBehavior: Send + Sync {
    /// Name of the directive this behavior came from.
    fn name(&self) -> &str;

    /// Validates and transforms an input value.
    fn parse_value(&self, field: &str, value: Value) -> ValidationResult<Value>;

    /// Validates and transforms an output value.
    fn serialize(&self, field: &str, value: Value) -> ValidationResult<Value> {
        self.parse_value(field, value)
    }
}

/// A constraint or transform from the built-in directive set.
#[derive(Debug, Clone)]
pub enum Constraint {
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Email,
    Url,
    Pattern(regex::Regex),
    Trim,
    Lowercase,
    Uppercase,
    Sanitize,
}

impl Constraint {
    fn directive(&self) -> &'static str {
        match self {
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Email => "email",
            Self::Url => "url",
            Self::Pattern(_) => "pattern",
            Self::Trim => "trim",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::Sanitize => "sanitize",
        }
    }

    fn apply(&self, field: &str, value: Value) -> ValidationResult<Value> {
        match (self, value) {
            (Self::Trim, Value::String(s)) => Ok(Value::String(transform::trim(&s))),
            (Self::Lowercase, Value::String(s)) => Ok(Value::String(transform::lowercase(&s))),
            (Self::Uppercase, Value::String(s)) => Ok(Value::String(transform::uppercase(&s))),
            (Self::Sanitize, Value::String(s)) => Ok(Value::String(transform::sanitize_html(&s))),
            (Self::Trim | Self::Lowercase | Self::Uppercase | Self::Sanitize, other) => Ok(other),
            (Self::Min(_) | Self::Max(_), Value::Number(n)) => {
                let number = n.as_f64().unwrap_or_default();
                self.check_number(field, number)?;
                Ok(Value::Number(n))
            }
            (Self::Min(_) | Self::Max(_), other) => Err(invalid_format(field, "a number", &other)),
            (_, Value::String(s)) => {
                self.check_string(field, &s)?;
                Ok(Value::String(s))
            }
            (_, other) => Err(invalid_format(field, "a string", &other)),
        }
    }

    fn check_string(&self, field: &str, value: &str) -> ValidationResult<()> {
        let length = value.chars().count();
        let error = match self {
            Self::MinLength(min) if length < *min => ValidationError::new(
                field,
                ValidationErrorCode::MinLength,
                format!("must be at least {min} characters"),
            )
            .with_constraint(min.to_string()),
            Self::MaxLength(max) if length > *max => ValidationError::new(
                field,
                ValidationErrorCode::MaxLength,
                format!("must be at most {max} characters"),
            )
            .with_constraint(max.to_string()),
            Self::Email if !is_valid_email(value) => ValidationError::new(
                field,
                ValidationErrorCode::InvalidEmail,
                "must be a valid email address",
            ),
            Self::Url if !is_valid_url(value) => {
                ValidationError::new(field, ValidationErrorCode::InvalidUrl, "must be a valid URL")
            }
            Self::Pattern(re) if !re.is_match(value) => ValidationError::new(
                field,
                ValidationErrorCode::PatternMismatch,
                "does not match the required pattern",
            )
            .with_constraint(re.as_str()),
            _ => return Ok(()),
        };
        Err(error.into())
    }

    fn check_number(&self, field: &str, value: f64) -> ValidationResult<()> {
        let error = match self {
            Self::Min(min) if value < *min => ValidationError::new(
                field,
                ValidationErrorCode::Min,
                format!("must be at least {min}"),
            )
            .with_constraint(min.to_string()),
            Self::Max(max) if value > *max => ValidationError::new(
                field,
                ValidationErrorCode::Max,
                format!("must be at most {max}"),
            )
            .with_constraint(max.to_string()),
            _ => return Ok(()),
        };
        Err(error.into())
    }
}

fn invalid_format(field: &str, expected: &str, found: &Value) -> ValidationErrors {
    ValidationError::new(
        field,
        ValidationErrorCode::InvalidFormat,
        format!("expected {expected}, found {found}"),
    )
    .into()
}

impl ScalarBehavior for Constraint {
    fn name(&self) -> &str {
        self.directive()
    }

    fn parse_value(&self, field: &str, value: Value) -> ValidationResult<Value> {
        if value.is_null() {
            return Ok(value);
        }
        self.apply(field, value)
    }
}

/// All scalar behaviors attached to a single target, applied in order.
#[derive(Clone, Default)]
pub struct DecoratedScalar {
    layers: Vec<Arc<dyn ScalarBehavior>>,
}

impl DecoratedScalar {
    /// Creates an empty decoration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a behavior.
    pub fn push(&mut self, behavior: Arc<dyn ScalarBehavior>) {
        self.layers.push(behavior);
    }

    /// Directive names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Returns true if no behavior is attached.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Runs every layer's `parse_value`. Stops at the first failing layer.
    pub fn parse_value(&self, field: &str, value: Value) -> ValidationResult<Value> {
        self.layers
            .iter()
            .try_fold(value, |value, layer| layer.parse_value(field, value))
    }

    /// Runs every layer's `serialize`. Stops at the first failing layer.
    pub fn serialize(&self, field: &str, value: Value) -> ValidationResult<Value> {
        self.layers
            .iter()
            .try_fold(value, |value, layer| layer.serialize(field, value))
    }
}

impl fmt::Debug for DecoratedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecoratedScalar").field(&self.names()).finish()
    }
}

/// A directive argument value.
///
/// Int and Boolean literals keep their kind; every other literal is kept as
/// its raw string form.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveArg {
    Int(i64),
    Bool(bool),
    Raw(String),
}

impl DirectiveArg {
    fn describe(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Raw(s) => format!("{s:?}"),
        }
    }
}

/// Arguments of one directive occurrence, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveArgs {
    pub directive: String,
    pub args: Vec<(String, DirectiveArg)>,
}

impl DirectiveArgs {
    /// Creates an empty argument list for a directive.
    pub fn new(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: DirectiveArg) -> Self {
        self.args.push((name.into(), value));
        self
    }

    /// Gets an argument by name, falling back to the first argument.
    pub fn get_or_first(&self, name: &str) -> Option<&DirectiveArg> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.args.first())
            .map(|(_, v)| v)
    }

    fn integer(&self, name: &str) -> RouteqlResult<i64> {
        match self.get_or_first(name) {
            Some(DirectiveArg::Int(i)) => Ok(*i),
            Some(other) => Err(self.bad_argument(name, "an Int", &other.describe())),
            None => Err(self.missing_argument(name)),
        }
    }

    fn length(&self, name: &str) -> RouteqlResult<usize> {
        let value = self.integer(name)?;
        usize::try_from(value).map_err(|_| self.bad_argument(name, "a non-negative Int", &value.to_string()))
    }

    fn number(&self, name: &str) -> RouteqlResult<f64> {
        match self.get_or_first(name) {
            #[allow(clippy::cast_precision_loss)]
            Some(DirectiveArg::Int(i)) => Ok(*i as f64),
            Some(DirectiveArg::Raw(raw)) => raw
                .parse::<f64>()
                .map_err(|_| self.bad_argument(name, "a number", raw)),
            Some(other) => Err(self.bad_argument(name, "a number", &other.describe())),
            None => Err(self.missing_argument(name)),
        }
    }

    fn string(&self, name: &str) -> RouteqlResult<&str> {
        match self.get_or_first(name) {
            Some(DirectiveArg::Raw(raw)) => Ok(raw),
            Some(other) => Err(self.bad_argument(name, "a String", &other.describe())),
            None => Err(self.missing_argument(name)),
        }
    }

    fn bad_argument(&self, name: &str, expected: &str, found: &str) -> RouteqlError {
        RouteqlError::configuration(format!(
            "Directive @{} expects argument \"{}\" to be {}, found {}",
            self.directive, name, expected, found
        ))
    }

    fn missing_argument(&self, name: &str) -> RouteqlError {
        RouteqlError::configuration(format!(
            "Directive @{} requires argument \"{}\"",
            self.directive, name
        ))
    }
}

/// Builds a scalar behavior from directive arguments.
pub type ScalarFactory =
    Arc<dyn Fn(&DirectiveArgs) -> RouteqlResult<Arc<dyn ScalarBehavior>> + Send + Sync>;

/// Directive name to scalar factory registry.
#[derive(Clone)]
pub struct ScalarFactories {
    factories: HashMap<String, ScalarFactory>,
}

impl ScalarFactories {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in factories.
    pub fn builtin() -> Self {
        let mut factories = Self::empty();
        factories.register_constraint("minLength", |args| {
            Ok(Constraint::MinLength(args.length("value")?))
        });
        factories.register_constraint("maxLength", |args| {
            Ok(Constraint::MaxLength(args.length("value")?))
        });
        factories.register_constraint("min", |args| Ok(Constraint::Min(args.number("value")?)));
        factories.register_constraint("max", |args| Ok(Constraint::Max(args.number("value")?)));
        factories.register_constraint("email", |_| Ok(Constraint::Email));
        factories.register_constraint("url", |_| Ok(Constraint::Url));
        factories.register_constraint("pattern", |args| {
            let source = args.string("regex")?;
            regex::Regex::new(source)
                .map(Constraint::Pattern)
                .map_err(|e| args.bad_argument("regex", "a valid regular expression", &e.to_string()))
        });
        factories.register_constraint("trim", |_| Ok(Constraint::Trim));
        factories.register_constraint("lowercase", |_| Ok(Constraint::Lowercase));
        factories.register_constraint("uppercase", |_| Ok(Constraint::Uppercase));
        factories.register_constraint("sanitize", |_| Ok(Constraint::Sanitize));
        factories
    }

    fn register_constraint<F>(&mut self, name: &str, build: F)
    where
        F: Fn(&DirectiveArgs) -> RouteqlResult<Constraint> + Send + Sync + 'static,
    {
        self.register(name, move |args| {
            build(args).map(|c| Arc::new(c) as Arc<dyn ScalarBehavior>)
        });
    }

    /// Registers a factory, replacing any factory with the same directive name.
    pub fn register<F>(&mut self, directive: impl Into<String>, factory: F)
    where
        F: Fn(&DirectiveArgs) -> RouteqlResult<Arc<dyn ScalarBehavior>> + Send + Sync + 'static,
    {
        self.factories.insert(directive.into(), Arc::new(factory));
    }

    /// Looks up a factory by directive name.
    pub fn get(&self, directive: &str) -> Option<&ScalarFactory> {
        self.factories.get(directive)
    }

    /// Returns true if a factory exists for the directive.
    pub fn contains(&self, directive: &str) -> bool {
        self.factories.contains_key(directive)
    }
}

impl Default for ScalarFactories {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ScalarFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_tuple("ScalarFactories").field(&names).finish()
    }
}

/// Input transformation helpers.
pub mod transform {
    /// Trims whitespace from a string.
    pub fn trim(s: &str) -> String {
        s.trim().to_string()
    }

    /// Converts string to lowercase.
    pub fn lowercase(s: &str) -> String {
        s.to_lowercase()
    }

    /// Converts string to uppercase.
    pub fn uppercase(s: &str) -> String {
        s.to_uppercase()
    }

    /// Escapes HTML-significant characters.
    pub fn sanitize_html(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#x27;")
    }
}

/// Simple email validation (basic check).
fn is_valid_email(email: &str) -> bool {
    let trimmed = email.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|part| !part.is_empty())
}

/// Simple URL validation.
fn is_valid_url(url: &str) -> bool {
    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(directive: &str, args: DirectiveArgs) -> Arc<dyn ScalarBehavior> {
        let factories = ScalarFactories::builtin();
        let factory = factories.get(directive).unwrap();
        factory(&args).unwrap()
    }

    #[test]
    fn test_min_length() {
        let scalar = build(
            "minLength",
            DirectiveArgs::new("minLength").with("value", DirectiveArg::Int(3)),
        );

        let errors = scalar.parse_value("name", json!("Al")).unwrap_err();
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].code, ValidationErrorCode::MinLength);
        assert_eq!(errors.errors[0].field, "name");
        assert_eq!(scalar.parse_value("name", json!("Alice")).unwrap(), json!("Alice"));
    }

    #[test]
    fn test_email_validation() {
        let scalar = build("email", DirectiveArgs::new("email"));
        assert!(scalar.parse_value("email", json!("test@example.com")).is_ok());
        assert!(scalar.parse_value("email", json!("not-an-email")).is_err());
        assert!(scalar.parse_value("email", json!("a@b@c.com")).is_err());
    }

    #[test]
    fn test_numeric_range_from_raw_float() {
        let scalar = build(
            "max",
            DirectiveArgs::new("max").with("value", DirectiveArg::Raw("99.5".into())),
        );
        assert!(scalar.parse_value("score", json!(99)).is_ok());
        let errors = scalar.parse_value("score", json!(100)).unwrap_err();
        assert_eq!(errors.errors[0].code, ValidationErrorCode::Max);

        let errors = scalar.parse_value("score", json!("100")).unwrap_err();
        assert_eq!(errors.errors[0].code, ValidationErrorCode::InvalidFormat);
    }

    #[test]
    fn test_null_passes_through() {
        let scalar = build("email", DirectiveArgs::new("email"));
        assert_eq!(scalar.parse_value("email", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_decorated_scalar_applies_in_order() {
        let mut decorated = DecoratedScalar::new();
        decorated.push(build("trim", DirectiveArgs::new("trim")));
        decorated.push(build("lowercase", DirectiveArgs::new("lowercase")));
        decorated.push(build("email", DirectiveArgs::new("email")));

        assert_eq!(decorated.names(), vec!["trim", "lowercase", "email"]);
        assert_eq!(
            decorated.parse_value("email", json!("  TEST@Example.COM  ")).unwrap(),
            json!("test@example.com")
        );
    }

    #[test]
    fn test_factory_argument_errors() {
        let factories = ScalarFactories::builtin();
        let min_length = factories.get("minLength").unwrap();
        let err = min_length(
            &DirectiveArgs::new("minLength").with("value", DirectiveArg::Raw("x".into())),
        )
        .err()
        .unwrap();
        assert!(err.is_configuration_error());
        assert!(err.message.contains("@minLength"));

        let pattern = factories.get("pattern").unwrap();
        assert!(pattern(
            &DirectiveArgs::new("pattern").with("regex", DirectiveArg::Raw("([a-z".into()))
        )
        .is_err());
    }

    #[test]
    fn test_custom_factory() {
        struct Even;
        impl ScalarBehavior for Even {
            fn name(&self) -> &str {
                "even"
            }
            fn parse_value(&self, field: &str, value: Value) -> ValidationResult<Value> {
                match value.as_i64() {
                    Some(n) if n % 2 == 0 => Ok(value),
                    _ => Err(ValidationError::new(field, ValidationErrorCode::Custom, "must be even").into()),
                }
            }
        }

        let mut factories = ScalarFactories::empty();
        factories.register("even", |_| Ok(Arc::new(Even) as Arc<dyn ScalarBehavior>));
        let even = factories.get("even").unwrap()(&DirectiveArgs::new("even")).unwrap();
        assert!(even.parse_value("n", json!(4)).is_ok());
        assert!(even.parse_value("n", json!(3)).is_err());
        assert!(!factories.contains("minLength"));
    }

    #[test]
    fn test_transform() {
        assert_eq!(transform::trim("  hello  "), "hello");
        assert_eq!(transform::uppercase("hello"), "HELLO");
        assert_eq!(
            transform::sanitize_html("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://a.io/path"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("https://"));
    }
}

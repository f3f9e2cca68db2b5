//! Declarative request schemas.
//!
//! A [`Schema`] lists the fields an endpoint accepts, their kinds, and the
//! constraints each must satisfy. Schemas are built once (usually in a
//! `LazyLock` static next to the request type) and never mutated afterwards.
//!
//! ```rust,ignore
//! static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
//!     Schema::new()
//!         .field(FieldSpec::string("email").required().email())
//!         .field(FieldSpec::integer("page").default_value(1).min(1))
//! });
//! ```

use serde_json::{Map, Value};

use super::FieldError;

/// Primitive kind a field is coerced into before its rules run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Whole number within the inclusive range the target type can hold
    Integer { min: i64, max: i64 },
    Boolean,
    StringList,
}

/// A single constraint on a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Minimum length in characters (applied per item for lists)
    MinLength(usize),
    /// Maximum length in characters (applied per item for lists)
    MaxLength(usize),
    Min(i64),
    Max(i64),
    /// Value (or every list item) must be one of these
    OneOf(&'static [&'static str]),
    Email,
    MustBeTrue,
    MaxItems(usize),
}

/// Declaration of one accepted field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
    rules: Vec<Rule>,
    message: Option<&'static str>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            rules: Vec::new(),
            message: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Whole number that fits a `u32`.
    pub fn integer(name: &'static str) -> Self {
        Self::integer_in(name, i64::from(u32::MIN), i64::from(u32::MAX))
    }

    /// Whole number in `min..=max`, the range of the field's target type.
    ///
    /// Values outside it are reported on the field instead of failing
    /// deserialization later. Use [`FieldSpec::min`] / [`FieldSpec::max`]
    /// for tighter business limits.
    pub fn integer_in(name: &'static str, min: i64, max: i64) -> Self {
        Self::new(name, FieldKind::Integer { min, max })
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn string_list(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringList)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when an optional field is omitted.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn min_length(self, len: usize) -> Self {
        self.rule(Rule::MinLength(len))
    }

    pub fn max_length(self, len: usize) -> Self {
        self.rule(Rule::MaxLength(len))
    }

    pub fn min(self, value: i64) -> Self {
        self.rule(Rule::Min(value))
    }

    pub fn max(self, value: i64) -> Self {
        self.rule(Rule::Max(value))
    }

    pub fn one_of(self, values: &'static [&'static str]) -> Self {
        self.rule(Rule::OneOf(values))
    }

    pub fn email(self) -> Self {
        self.rule(Rule::Email)
    }

    pub fn must_be_true(self) -> Self {
        self.rule(Rule::MustBeTrue)
    }

    pub fn max_items(self, count: usize) -> Self {
        self.rule(Rule::MaxItems(count))
    }

    /// Replace the message reported when one of this field's rules fails.
    ///
    /// "Required" and type errors keep their generic messages.
    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    fn check(&self, raw: Option<&Value>) -> Result<Option<Value>, String> {
        let Some(raw) = raw.filter(|v| !is_blank(v)) else {
            if self.required {
                return Err("This field is required".to_string());
            }
            return Ok(self.default.clone());
        };

        let value = coerce(self.kind, raw)?;

        for rule in &self.rules {
            if let Err(message) = apply_rule(rule, &value) {
                return Err(self.message.map(str::to_string).unwrap_or(message));
            }
        }

        Ok(Some(value))
    }
}

/// A constraint spanning two fields.
#[derive(Debug, Clone)]
pub enum Relation {
    /// `field` must hold the same value as `other`; reported on `field`.
    Equals {
        field: &'static str,
        other: &'static str,
        message: &'static str,
    },
}

impl Relation {
    pub fn equals(field: &'static str, other: &'static str, message: &'static str) -> Self {
        Relation::Equals {
            field,
            other,
            message,
        }
    }
}

/// An immutable set of field declarations and cross-field relations.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    relations: Vec<Relation>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Check `input` against the schema.
    ///
    /// Returns only the declared fields, coerced to their kinds and with
    /// defaults applied. Undeclared input keys are dropped. On failure every
    /// violating field is reported once, with the first rule it broke.
    pub fn check(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, Vec<FieldError>> {
        let mut output = Map::new();
        let mut errors: Vec<FieldError> = Vec::new();

        for field in &self.fields {
            match field.check(input.get(field.name)) {
                Ok(Some(value)) => {
                    output.insert(field.name.to_string(), value);
                }
                Ok(None) => {}
                Err(message) => errors.push(FieldError::new(field.name, message)),
            }
        }

        for relation in &self.relations {
            match relation {
                Relation::Equals {
                    field,
                    other,
                    message,
                } => {
                    let already_failed = errors
                        .iter()
                        .any(|e| e.path == *field || e.path == *other);
                    if !already_failed && output.get(*field) != output.get(*other) {
                        errors.push(FieldError::new(*field, *message));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(output)
        } else {
            Err(errors)
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(kind: FieldKind, raw: &Value) -> Result<Value, String> {
    match kind {
        FieldKind::String => match raw {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            _ => Err("Must be a string".to_string()),
        },
        FieldKind::Integer { min, max } => {
            let out_of_range = || format!("Must be a whole number between {min} and {max}");
            let parsed = match raw {
                Value::Number(n) if n.is_u64() || n.is_i64() => {
                    n.as_i64().ok_or_else(out_of_range)?
                }
                Value::String(s) => {
                    let s = s.trim();
                    match s.parse::<i64>() {
                        Ok(v) => v,
                        // All digits but too long for i64
                        Err(_) if is_integer_literal(s) => return Err(out_of_range()),
                        Err(_) => return Err("Must be a whole number".to_string()),
                    }
                }
                _ => return Err("Must be a whole number".to_string()),
            };
            if (min..=max).contains(&parsed) {
                Ok(Value::from(parsed))
            } else {
                Err(out_of_range())
            }
        }
        FieldKind::Boolean => match raw {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) => match s.trim() {
                "true" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err("Must be true or false".to_string()),
            },
            _ => Err("Must be true or false".to_string()),
        },
        FieldKind::StringList => {
            let items = match raw {
                Value::String(s) => vec![Value::String(s.trim().to_string())],
                Value::Array(values) => values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(Value::String(s.trim().to_string())),
                        _ => Err("Must be a list of strings".to_string()),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => return Err("Must be a list of strings".to_string()),
            };
            Ok(Value::Array(items))
        }
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn apply_rule(rule: &Rule, value: &Value) -> Result<(), String> {
    match (rule, value) {
        (Rule::MinLength(min), Value::String(s)) => check_min_length(s, *min),
        (Rule::MaxLength(max), Value::String(s)) => check_max_length(s, *max),
        (Rule::MinLength(min), Value::Array(items)) => {
            strings(items).try_for_each(|s| check_min_length(s, *min))
        }
        (Rule::MaxLength(max), Value::Array(items)) => {
            strings(items).try_for_each(|s| check_max_length(s, *max))
        }
        (Rule::Min(min), Value::Number(n)) => match n.as_i64() {
            Some(v) if v < *min => Err(format!("Must be at least {min}")),
            _ => Ok(()),
        },
        (Rule::Max(max), Value::Number(n)) => match n.as_i64() {
            Some(v) if v > *max => Err(format!("Must be at most {max}")),
            _ => Ok(()),
        },
        (Rule::OneOf(allowed), Value::String(s)) => check_one_of(s, allowed),
        (Rule::OneOf(allowed), Value::Array(items)) => {
            strings(items).try_for_each(|s| check_one_of(s, allowed))
        }
        (Rule::Email, Value::String(s)) => {
            if is_valid_email(s) {
                Ok(())
            } else {
                Err("Must be a valid email address".to_string())
            }
        }
        (Rule::MustBeTrue, Value::Bool(b)) => {
            if *b {
                Ok(())
            } else {
                Err("Must be accepted".to_string())
            }
        }
        (Rule::MaxItems(max), Value::Array(items)) => {
            if items.len() > *max {
                Err(format!("Must contain at most {max} items"))
            } else {
                Ok(())
            }
        }
        // Rules that do not apply to this kind are ignored
        _ => Ok(()),
    }
}

fn strings(items: &[Value]) -> impl Iterator<Item = &str> {
    items.iter().filter_map(Value::as_str)
}

fn check_min_length(s: &str, min: usize) -> Result<(), String> {
    if s.chars().count() < min {
        Err(format!("Must be at least {min} characters"))
    } else {
        Ok(())
    }
}

fn check_max_length(s: &str, max: usize) -> Result<(), String> {
    if s.chars().count() > max {
        Err(format!("Must be at most {max} characters"))
    } else {
        Ok(())
    }
}

fn check_one_of(s: &str, allowed: &[&str]) -> Result<(), String> {
    if allowed.contains(&s) {
        Ok(())
    } else {
        Err(format!("Must be one of: {}", allowed.join(", ")))
    }
}

/// Pragmatic email check: one `@`, non-empty local part, dotted domain,
/// no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

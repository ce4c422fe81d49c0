use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, TransformError};

const FROM_KEY: &str = "$from";
const SELECT_KEY: &str = "$select";
const EACH_KEY: &str = "$each";

/// Ordered, nested declaration of the fields that survive a projection.
///
/// A selector never invents data: every output field is either copied from
/// a source key or is itself a nested selector applied to one.
///
/// Declarative JSON form:
/// ```text
/// true                                   copy the same key
/// "sourceKey"                            copy, renamed from sourceKey
/// { ... }                                nested object
/// [ { ... } ]                            map over array elements
/// { "$from": "src", "$select": { ... } } renamed nested object
/// { "$from": "src", "$each": { ... } }   renamed array mapping
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    rules: Vec<FieldRule>,
}

/// One output field of a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// Key written to the projected document.
    pub output: String,
    /// Key read from the source document.
    pub source: String,
    /// How the source value is carried over.
    pub kind: FieldKind,
}

/// How a field's value is carried from source to output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Verbatim copy; an absent source key stays absent.
    Copy,
    /// Recursive projection of a nested object.
    Object(Selector),
    /// Element-wise projection of an array, preserving order and length.
    Each(Selector),
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a field under its own name.
    pub fn field(self, name: &str) -> Self {
        self.rule(FieldRule {
            output: name.to_string(),
            source: name.to_string(),
            kind: FieldKind::Copy,
        })
    }

    /// Copy several fields under their own names, in order.
    pub fn fields(self, names: &[&str]) -> Self {
        names.iter().fold(self, |selector, name| selector.field(name))
    }

    /// Copy `source` and write it as `output`.
    pub fn renamed(self, output: &str, source: &str) -> Self {
        self.rule(FieldRule {
            output: output.to_string(),
            source: source.to_string(),
            kind: FieldKind::Copy,
        })
    }

    /// Project a nested object field.
    pub fn object(self, name: &str, nested: Selector) -> Self {
        self.rule(FieldRule {
            output: name.to_string(),
            source: name.to_string(),
            kind: FieldKind::Object(nested),
        })
    }

    /// Project every element of an array field.
    pub fn each(self, name: &str, nested: Selector) -> Self {
        self.rule(FieldRule {
            output: name.to_string(),
            source: name.to_string(),
            kind: FieldKind::Each(nested),
        })
    }

    /// Append a rule. A later rule with the same output key replaces the
    /// earlier one in place.
    pub fn rule(mut self, rule: FieldRule) -> Self {
        match self.rules.iter_mut().find(|r| r.output == rule.output) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse the declarative JSON form.
    pub fn from_value(value: &Value) -> Result<Self> {
        parse_selector(value, "")
    }

    /// Render back to the declarative JSON form.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.rules.len());
        for rule in &self.rules {
            let renamed = rule.output != rule.source;
            let value = match (&rule.kind, renamed) {
                (FieldKind::Copy, false) => Value::Bool(true),
                (FieldKind::Copy, true) => Value::String(rule.source.clone()),
                (FieldKind::Object(nested), false) => nested.to_value(),
                (FieldKind::Each(nested), false) => Value::Array(vec![nested.to_value()]),
                (FieldKind::Object(nested), true) => directive(&rule.source, SELECT_KEY, nested),
                (FieldKind::Each(nested), true) => directive(&rule.source, EACH_KEY, nested),
            };
            map.insert(rule.output.clone(), value);
        }
        Value::Object(map)
    }
}

fn directive(source: &str, key: &str, nested: &Selector) -> Value {
    let mut map = Map::with_capacity(2);
    map.insert(FROM_KEY.to_string(), Value::String(source.to_string()));
    map.insert(key.to_string(), nested.to_value());
    Value::Object(map)
}

fn parse_selector(value: &Value, path: &str) -> Result<Selector> {
    let Value::Object(map) = value else {
        return Err(invalid(path, "selector must be a JSON object"));
    };

    let mut selector = Selector::new();
    for (output, decl) in map {
        if output.is_empty() || output.starts_with('$') {
            return Err(invalid(path, &format!("invalid output key {output:?}")));
        }
        let field_path = join(path, output);
        let rule = parse_rule(output, decl, &field_path)?;
        selector.rules.push(rule);
    }
    Ok(selector)
}

fn parse_rule(output: &str, decl: &Value, path: &str) -> Result<FieldRule> {
    let (source, kind) = match decl {
        Value::Bool(true) => (output.to_string(), FieldKind::Copy),
        Value::String(source) if !source.is_empty() => (source.clone(), FieldKind::Copy),
        Value::Array(items) => match items.as_slice() {
            [nested] => (
                output.to_string(),
                FieldKind::Each(parse_selector(nested, &format!("{path}[]"))?),
            ),
            _ => return Err(invalid(path, "array rule must hold exactly one selector")),
        },
        Value::Object(map) if map.contains_key(FROM_KEY) => parse_directive(map, path)?,
        Value::Object(_) => (
            output.to_string(),
            FieldKind::Object(parse_selector(decl, path)?),
        ),
        _ => {
            return Err(invalid(
                path,
                "rule must be true, a source key, an object or a one-element array",
            ))
        }
    };

    Ok(FieldRule {
        output: output.to_string(),
        source,
        kind,
    })
}

fn parse_directive(map: &Map<String, Value>, path: &str) -> Result<(String, FieldKind)> {
    let source = match map.get(FROM_KEY) {
        Some(Value::String(source)) if !source.is_empty() => source.clone(),
        _ => return Err(invalid(path, "$from must be a non-empty string")),
    };
    if map.len() != 2 {
        return Err(invalid(path, "$from needs exactly one of $select or $each"));
    }

    let kind = match (map.get(SELECT_KEY), map.get(EACH_KEY)) {
        (Some(nested), None) => FieldKind::Object(parse_selector(nested, path)?),
        (None, Some(nested)) => FieldKind::Each(parse_selector(nested, &format!("{path}[]"))?),
        _ => return Err(invalid(path, "$from needs exactly one of $select or $each")),
    };
    Ok((source, kind))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn invalid(path: &str, reason: &str) -> TransformError {
    TransformError::InvalidSelector {
        path: if path.is_empty() {
            "<root>".to_string()
        } else {
            path.to_string()
        },
        reason: reason.to_string(),
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Selector::from_value(&value).map_err(D::Error::custom)
    }
}

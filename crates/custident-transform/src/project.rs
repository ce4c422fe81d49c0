use serde_json::{Map, Value};

use crate::body::kind_name;
use crate::error::{Result, TransformError};
use crate::selector::{FieldKind, Selector};

/// Project `source` through `selector` into a freshly allocated document.
///
/// Output keys follow selector order. A copied field that is absent in the
/// source is omitted, never defaulted. Nested selectors require the source
/// value to be present and non-null, and array mappings require an array;
/// anything else is a [`TransformError::StructuralMismatch`].
pub fn project(source: &Value, selector: &Selector) -> Result<Value> {
    let mut trail = Trail::default();
    project_object(Some(source), selector, &mut trail).map(Value::Object)
}

fn project_object<'s>(
    source: Option<&Value>,
    selector: &'s Selector,
    trail: &mut Trail<'s>,
) -> Result<Map<String, Value>> {
    let source = match source {
        Some(value) if !value.is_null() => value,
        other => return Err(trail.mismatch("object", kind_name(other))),
    };

    let mut out = Map::with_capacity(selector.len());
    for rule in selector.rules() {
        // Keys read from a present non-object value read as absent.
        let child = source.as_object().and_then(|map| map.get(&rule.source));
        trail.push_key(&rule.source);
        match &rule.kind {
            FieldKind::Copy => {
                if let Some(value) = child {
                    out.insert(rule.output.clone(), value.clone());
                }
            }
            FieldKind::Object(nested) => {
                let projected = project_object(child, nested, trail)?;
                out.insert(rule.output.clone(), Value::Object(projected));
            }
            FieldKind::Each(nested) => {
                let projected = project_each(child, nested, trail)?;
                out.insert(rule.output.clone(), Value::Array(projected));
            }
        }
        trail.pop();
    }
    Ok(out)
}

fn project_each<'s>(
    source: Option<&Value>,
    selector: &'s Selector,
    trail: &mut Trail<'s>,
) -> Result<Vec<Value>> {
    let Some(Value::Array(items)) = source else {
        return Err(trail.mismatch("array", kind_name(source)));
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        trail.push_index(index);
        out.push(Value::Object(project_object(Some(item), selector, trail)?));
        trail.pop();
    }
    Ok(out)
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Current position in the source document, rendered only on error.
#[derive(Default)]
struct Trail<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Trail<'a> {
    fn push_key(&mut self, key: &'a str) {
        self.segments.push(Segment::Key(key));
    }

    fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    fn pop(&mut self) {
        self.segments.pop();
    }

    fn render(&self) -> String {
        if self.segments.is_empty() {
            return "<root>".to_string();
        }
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(key);
                }
                Segment::Index(index) => {
                    path.push('[');
                    path.push_str(&index.to_string());
                    path.push(']');
                }
            }
        }
        path
    }

    fn mismatch(&self, expected: &'static str, found: &'static str) -> TransformError {
        TransformError::StructuralMismatch {
            path: self.render(),
            expected,
            found,
        }
    }
}

use crate::{
    json_path::value_equals,
    pointer::parse_array_index,
    Error, JsonPointer, PatchKind, PatchOperation, ReferenceToken,
};
use serde_json::Value;

/// Applies one patch operation to a document
///
/// Implementations take the current snapshot by value and return the next one.
/// A pointer that does not resolve, or an operation that is invalid for the target node,
/// must be reported as [`Error::PatchApply`].
pub trait PatchExecutor {
    fn apply(&self, document: Value, operation: &PatchOperation) -> Result<Value, Error>;
}

/// [`PatchExecutor`] with JSON Patch (RFC 6902) semantics over [`serde_json::Value`]
///
/// `move` and `copy` read their `from` pointer from the operation value, which must be a JSON string.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPatchExecutor;

impl PatchExecutor for JsonPatchExecutor {
    fn apply(&self, mut document: Value, operation: &PatchOperation) -> Result<Value, Error> {
        apply_operation(&mut document, operation).map_err(|reason| {
            Error::PatchApply(format!(
                "`{}` at `{}`: {reason}",
                operation.kind, operation.path
            ))
        })?;
        Ok(document)
    }
}

fn apply_operation(document: &mut Value, operation: &PatchOperation) -> Result<(), String> {
    let path = &operation.path;
    if path.is_root() {
        return Err("the document root cannot be patched".to_owned());
    }

    match operation.kind {
        PatchKind::Add => add(document, path, required_value(operation)?.clone()),
        PatchKind::Remove => remove(document, path).map(|_| ()),
        PatchKind::Replace => replace(document, path, required_value(operation)?.clone()),
        PatchKind::Move => {
            let from = from_pointer(operation)?;
            if from == *path {
                return get(document, &from).map(|_| ());
            }
            if path.starts_with(&from) {
                return Err(format!("cannot move `{from}` into one of its own children"));
            }
            let value = remove(document, &from)?;
            add(document, path, value)
        }
        PatchKind::Copy => {
            let from = from_pointer(operation)?;
            let value = get(document, &from)?.clone();
            add(document, path, value)
        }
        PatchKind::Test => {
            let expected = required_value(operation)?;
            let actual = get(document, path)?;
            if value_equals(actual, expected) {
                Ok(())
            } else {
                Err(format!("test failed, found {actual}"))
            }
        }
    }
}

fn required_value(operation: &PatchOperation) -> Result<&Value, String> {
    operation
        .value
        .as_ref()
        .ok_or_else(|| "missing value".to_owned())
}

fn from_pointer(operation: &PatchOperation) -> Result<JsonPointer, String> {
    match required_value(operation)? {
        Value::String(from) => from.parse::<JsonPointer>().map_err(|e| e.to_string()),
        other => Err(format!(
            "value must be a string holding the `from` pointer, found {other}"
        )),
    }
}

#[inline]
fn array_index(token: &ReferenceToken) -> Option<usize> {
    match token {
        ReferenceToken::Index(index) => Some(*index),
        ReferenceToken::Key(key) => parse_array_index(key),
    }
}

fn get<'a>(document: &'a Value, pointer: &JsonPointer) -> Result<&'a Value, String> {
    let mut current = document;
    for token in pointer.tokens() {
        let next = match current {
            Value::Object(map) => map.get(token.as_key().as_ref()),
            Value::Array(array) => array_index(token).and_then(|i| array.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| format!("path `{pointer}` not found"))?;
    }
    Ok(current)
}

fn get_mut<'a>(document: &'a mut Value, pointer: &JsonPointer) -> Result<&'a mut Value, String> {
    let mut current = document;
    for token in pointer.tokens() {
        let next = match current {
            Value::Object(map) => map.get_mut(token.as_key().as_ref()),
            Value::Array(array) => array_index(token).and_then(move |i| array.get_mut(i)),
            _ => None,
        };
        current = next.ok_or_else(|| format!("path `{pointer}` not found"))?;
    }
    Ok(current)
}

/// Splits a non-root pointer into its parent container and its last token
fn parent_mut<'a, 'p>(
    document: &'a mut Value,
    pointer: &'p JsonPointer,
) -> Result<(&'a mut Value, &'p ReferenceToken), String> {
    let (Some(parent), Some(last)) = (pointer.parent(), pointer.last()) else {
        return Err("the document root cannot be patched".to_owned());
    };
    Ok((get_mut(document, &parent)?, last))
}

fn add(document: &mut Value, path: &JsonPointer, value: Value) -> Result<(), String> {
    let (parent, token) = parent_mut(document, path)?;
    match parent {
        Value::Object(map) => {
            map.insert(token.as_key().into_owned(), value);
            Ok(())
        }
        Value::Array(array) if token.as_key() == "-" => {
            array.push(value);
            Ok(())
        }
        Value::Array(array) => match array_index(token) {
            Some(index) if index <= array.len() => {
                array.insert(index, value);
                Ok(())
            }
            Some(index) => Err(format!(
                "index {index} is out of bounds for an array of length {}",
                array.len()
            )),
            None => Err(format!("`{}` is not an array index", token.as_key())),
        },
        other => Err(format!("cannot add a member to {}", kind_name(other))),
    }
}

fn remove(document: &mut Value, path: &JsonPointer) -> Result<Value, String> {
    let (parent, token) = parent_mut(document, path)?;
    let removed = match parent {
        Value::Object(map) => map.shift_remove(token.as_key().as_ref()),
        Value::Array(array) => match array_index(token) {
            Some(index) if index < array.len() => Some(array.remove(index)),
            _ => None,
        },
        _ => None,
    };
    removed.ok_or_else(|| format!("path `{path}` not found"))
}

fn replace(document: &mut Value, path: &JsonPointer, value: Value) -> Result<(), String> {
    let target = get_mut(document, path)?;
    *target = value;
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

use crate::{Error, JsonPointer};
use serde_json::{json, Value};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// JSON Patch (RFC 6902) operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl PatchKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Add => "add",
            PatchKind::Remove => "remove",
            PatchKind::Replace => "replace",
            PatchKind::Move => "move",
            PatchKind::Copy => "copy",
            PatchKind::Test => "test",
        }
    }
}

impl FromStr for PatchKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchKind::Add),
            "remove" => Ok(PatchKind::Remove),
            "replace" => Ok(PatchKind::Replace),
            "move" => Ok(PatchKind::Move),
            "copy" => Ok(PatchKind::Copy),
            "test" => Ok(PatchKind::Test),
            _ => Err(Error::UnknownOperation(s.to_owned())),
        }
    }
}

impl Display for PatchKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single edit instruction: one kind, one target, an optional value
///
/// For `move` and `copy` the value is expected to be a JSON string holding the `from` pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub kind: PatchKind,
    pub path: JsonPointer,
    pub value: Option<Value>,
}

impl PatchOperation {
    #[inline]
    pub fn new(kind: PatchKind, path: JsonPointer, value: Option<Value>) -> Self {
        Self { kind, path, value }
    }

    /// Renders the operation as an RFC 6902 operation object
    pub fn to_json(&self) -> Value {
        let op = self.kind.as_str();
        let path = self.path.to_string();
        match (self.kind, &self.value) {
            (PatchKind::Move | PatchKind::Copy, Some(Value::String(from))) => {
                json!({ "op": op, "from": from, "path": path })
            }
            (PatchKind::Remove, _) | (_, None) => json!({ "op": op, "path": path }),
            (_, Some(value)) => json!({ "op": op, "path": path, "value": value }),
        }
    }
}

/// Builds the operation to apply at one location
///
/// An empty (or blank) `raw_value` means "no value". Whether the operation kind needs a value
/// is left to the patch executor.
/// # Errors
/// [`Error::ValueDecode`] if `raw_value` is not blank and not a valid JSON text.
pub fn build(kind: PatchKind, path: JsonPointer, raw_value: &str) -> Result<PatchOperation, Error> {
    let value = if raw_value.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str::<Value>(raw_value).map_err(Error::ValueDecode)?)
    };

    Ok(PatchOperation::new(kind, path, value))
}

use crate::{
    patch,
    pointer::{self, JsonPointer, ReferenceToken},
    resolver::{parse_document, LocationResolver},
    Error, JsonPatchExecutor, JsonPathEvaluator, PatchExecutor, PatchKind, PatchOperation,
    PathEvaluator, ResolvedLocation,
};
use serde_json::Value;

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    rebase_locations: bool,
    pretty: bool,
}

impl Default for PatchOptions {
    #[inline]
    fn default() -> Self {
        Self {
            rebase_locations: true,
            pretty: false,
        }
    }
}

impl PatchOptions {
    /// Adjust later locations for array elements removed or inserted by earlier operations
    /// of the same request (default: `true`)
    #[inline]
    pub fn rebase_locations(mut self, rebase_locations: bool) -> Self {
        self.rebase_locations = rebase_locations;
        self
    }

    /// Pretty-print the output document (default: `false`)
    #[inline]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Everything needed to patch one document
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub document: String,
    pub path: String,
    pub kind: PatchKind,
    pub value: String,
}

impl PatchRequest {
    #[inline]
    pub fn new(
        document: impl Into<String>,
        path: impl Into<String>,
        kind: PatchKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            document: document.into(),
            path: path.into(),
            kind,
            value: value.into(),
        }
    }
}

/// Applies one patch operation to every location selected by a path expression
///
/// Locations are patched one after the other, in the order the [`PathEvaluator`] returns them,
/// each operation seeing the result of the previous one. The first error aborts the request;
/// the caller's document is never modified.
#[derive(Debug, Default, Clone)]
pub struct PatchEngine<E = JsonPathEvaluator, X = JsonPatchExecutor> {
    resolver: LocationResolver<E>,
    executor: X,
    options: PatchOptions,
}

impl PatchEngine {
    /// Engine with the default [`JsonPath`](crate::JsonPath) evaluator and JSON Patch executor
    #[inline]
    pub fn new(options: PatchOptions) -> Self {
        Self::with_collaborators(JsonPathEvaluator, JsonPatchExecutor, options)
    }
}

impl<E: PathEvaluator, X: PatchExecutor> PatchEngine<E, X> {
    #[inline]
    pub fn with_collaborators(evaluator: E, executor: X, options: PatchOptions) -> Self {
        Self {
            resolver: LocationResolver::new(evaluator),
            executor,
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Applies a request expressed as text
    /// # Return
    /// The serialized final document, or `request.document` verbatim when nothing matches.
    pub fn apply(&self, request: &PatchRequest) -> Result<String, Error> {
        let document = parse_document(&request.document)?;
        let locations = self.resolver.resolve_value(&document, &request.path)?;
        if locations.is_empty() {
            log::debug!("`{}` matched nothing", request.path);
            return Ok(request.document.clone());
        }

        let patched = self.patch_locations(document, &locations, request.kind, &request.value)?;
        let output = if self.options.pretty {
            serde_json::to_string_pretty(&patched)
        } else {
            serde_json::to_string(&patched)
        };
        output.map_err(|e| Error::PatchApply(format!("cannot serialize the patched document: {e}")))
    }

    /// Applies `kind` with `raw_value` to every location `expression` selects in `document`
    /// # Return
    /// A new document; `document` itself is left untouched, including on error.
    pub fn apply_value(
        &self,
        document: &Value,
        expression: &str,
        kind: PatchKind,
        raw_value: &str,
    ) -> Result<Value, Error> {
        let locations = self.resolver.resolve_value(document, expression)?;
        self.patch_locations(document.clone(), &locations, kind, raw_value)
    }

    fn patch_locations(
        &self,
        mut current: Value,
        locations: &[ResolvedLocation],
        kind: PatchKind,
        raw_value: &str,
    ) -> Result<Value, Error> {
        log::debug!("`{kind}`: {} location(s)", locations.len());
        let mut edits = EditHistory::default();

        for location in locations {
            let translated = pointer::translate(location.as_str())?;
            let path = if self.options.rebase_locations {
                let rebased = edits.rebase(translated.clone())?;
                if rebased != translated {
                    log::trace!("`{translated}` rebased to `{rebased}`");
                }
                rebased
            } else {
                translated
            };

            let operation = patch::build(kind, path, raw_value)?;
            log::trace!("`{location}` -> {}", operation.to_json());
            current = self.executor.apply(current, &operation)?;

            if self.options.rebase_locations {
                edits.record(&operation, &current);
            }
        }

        Ok(current)
    }

    /// Pointers of every location `expression` selects in `document`, without patching anything
    pub fn pointers(&self, document: &str, expression: &str) -> Result<Vec<JsonPointer>, Error> {
        self.resolver
            .resolve(document, expression)?
            .iter()
            .map(|location| pointer::translate(location.as_str()))
            .collect()
    }
}

/// Structural change made by an applied operation
#[derive(Debug, Clone, PartialEq)]
enum Edit {
    Removed(JsonPointer),
    Inserted(JsonPointer),
}

/// Structural changes already applied in the current request, oldest first
#[derive(Debug, Default)]
struct EditHistory(Vec<Edit>);

impl EditHistory {
    fn record(&mut self, operation: &PatchOperation, patched: &Value) {
        match operation.kind {
            PatchKind::Remove => self.0.push(Edit::Removed(operation.path.clone())),
            PatchKind::Add | PatchKind::Copy => self.record_insertion(&operation.path, patched),
            PatchKind::Move => {
                if let Some(Ok(from)) = operation
                    .value
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::parse::<JsonPointer>)
                {
                    if from == operation.path {
                        return;
                    }
                    self.0.push(Edit::Removed(from));
                }
                self.record_insertion(&operation.path, patched);
            }
            PatchKind::Replace | PatchKind::Test => (),
        }
    }

    /// Only insertions into arrays shift siblings
    fn record_insertion(&mut self, path: &JsonPointer, patched: &Value) {
        let inserted_in_array = path
            .parent()
            .and_then(|parent| patched.pointer(&parent.to_string()))
            .map_or(false, Value::is_array);
        if inserted_in_array && path.last().and_then(ReferenceToken::as_index).is_some() {
            self.0.push(Edit::Inserted(path.clone()));
        }
    }

    /// Maps a pointer computed on the input document onto the current snapshot
    fn rebase(&self, mut path: JsonPointer) -> Result<JsonPointer, Error> {
        for edit in &self.0 {
            match edit {
                Edit::Removed(removed) => {
                    if path.starts_with(removed) {
                        return Err(Error::PatchApply(format!(
                            "`{path}` was removed by an earlier operation"
                        )));
                    }
                    shift_sibling(&mut path, removed, |index, at| {
                        if index > at {
                            index - 1
                        } else {
                            index
                        }
                    });
                }
                Edit::Inserted(inserted) => {
                    shift_sibling(&mut path, inserted, |index, at| {
                        if index >= at {
                            index + 1
                        } else {
                            index
                        }
                    });
                }
            }
        }
        Ok(path)
    }
}

/// Applies `shift` to the token of `path` that is an array sibling of the last token of `edited`
fn shift_sibling<F>(path: &mut JsonPointer, edited: &JsonPointer, shift: F)
where
    F: Fn(usize, usize) -> usize,
{
    let (Some(parent), Some(at)) = (
        edited.parent(),
        edited.last().and_then(ReferenceToken::as_index),
    ) else {
        return;
    };

    let depth = parent.tokens().len();
    if path.tokens().len() <= depth || !path.starts_with(&parent) {
        return;
    }

    if let ReferenceToken::Index(index) = &mut path.tokens_mut()[depth] {
        *index = shift(*index, at);
    }
}

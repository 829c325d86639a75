use crate::{Error, JsonPath};
use serde_json::Value;
use std::fmt::{self, Display};

/// One concrete match of a path expression, in the notation of the [`PathEvaluator`] that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation(String);

impl ResolvedLocation {
    #[inline]
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResolvedLocation {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evaluates a path expression against a document
///
/// The returned order is the order in which patch operations are applied, so an evaluator
/// must return the same order every time for the same document and expression.
/// A syntax error must be reported as [`Error::Path`], never as an empty result.
pub trait PathEvaluator {
    fn evaluate(&self, document: &Value, expression: &str) -> Result<Vec<ResolvedLocation>, Error>;
}

/// [`PathEvaluator`] backed by [`JsonPath`]
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPathEvaluator;

impl PathEvaluator for JsonPathEvaluator {
    fn evaluate(&self, document: &Value, expression: &str) -> Result<Vec<ResolvedLocation>, Error> {
        let json_path = JsonPath::parse(expression)?;
        Ok(json_path
            .locate(document)
            .into_iter()
            .map(|location| ResolvedLocation(location.to_string()))
            .collect())
    }
}

/// Turns a document and a path expression into the ordered locations to patch
#[derive(Debug, Default, Clone)]
pub struct LocationResolver<E = JsonPathEvaluator> {
    evaluator: E,
}

impl<E: PathEvaluator> LocationResolver<E> {
    #[inline]
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    /// Parses `document` and resolves `expression` against it
    /// # Errors
    /// [`Error::Document`] if `document` is not JSON, [`Error::Path`] if `expression` does not parse.
    pub fn resolve(&self, document: &str, expression: &str) -> Result<Vec<ResolvedLocation>, Error> {
        let document = parse_document(document)?;
        self.resolve_value(&document, expression)
    }

    /// Resolves `expression` against an already parsed document
    pub fn resolve_value(
        &self,
        document: &Value,
        expression: &str,
    ) -> Result<Vec<ResolvedLocation>, Error> {
        let locations = self.evaluator.evaluate(document, expression)?;
        for location in &locations {
            log::trace!("`{expression}` matched `{location}`");
        }
        Ok(locations)
    }
}

#[inline]
pub(crate) fn parse_document(document: &str) -> Result<Value, Error> {
    serde_json::from_str(document).map_err(Error::Document)
}

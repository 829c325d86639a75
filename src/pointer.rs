//! JSON Pointers (RFC 6901) and their translation from resolved locations
use crate::{parsing, Error};
use std::{
    borrow::Cow,
    fmt::{self, Display},
    str::FromStr,
};

/// A single step of a [`JsonPointer`]
#[derive(Debug, Clone, Eq)]
pub enum ReferenceToken {
    /// Object member name
    Key(String),
    /// Array index
    Index(usize),
}

impl ReferenceToken {
    /// Unescaped textual form of the token, as used to look up an object member
    #[inline]
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            ReferenceToken::Key(key) => Cow::Borrowed(key),
            ReferenceToken::Index(index) => Cow::Owned(index.to_string()),
        }
    }

    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            ReferenceToken::Index(index) => Some(*index),
            ReferenceToken::Key(_) => None,
        }
    }
}

/// Tokens are compared by their textual form: `Key("0")` and `Index(0)` address the same node
impl PartialEq for ReferenceToken {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ReferenceToken::Index(i1), ReferenceToken::Index(i2)) => i1 == i2,
            _ => self.as_key() == other.as_key(),
        }
    }
}

impl From<&str> for ReferenceToken {
    #[inline]
    fn from(key: &str) -> Self {
        ReferenceToken::Key(key.to_owned())
    }
}

impl From<usize> for ReferenceToken {
    #[inline]
    fn from(index: usize) -> Self {
        ReferenceToken::Index(index)
    }
}

/// An ordered sequence of reference tokens addressing one node of a JSON document
///
/// The textual form prefixes each token with `/` and escapes `~` as `~0` and `/` as `~1`.
/// The empty pointer addresses the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPointer(Vec<ReferenceToken>);

impl JsonPointer {
    #[inline]
    pub fn new(tokens: Vec<ReferenceToken>) -> Self {
        Self(tokens)
    }

    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(ReferenceToken::Key(key.into()));
        self
    }

    #[inline]
    pub fn idx(mut self, index: usize) -> Self {
        self.0.push(ReferenceToken::Index(index));
        self
    }

    #[inline]
    pub fn tokens(&self) -> &[ReferenceToken] {
        &self.0
    }

    #[inline]
    pub(crate) fn tokens_mut(&mut self) -> &mut [ReferenceToken] {
        &mut self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&ReferenceToken> {
        self.0.last()
    }

    /// Pointer to the parent node; `None` for the root pointer
    #[inline]
    pub fn parent(&self) -> Option<JsonPointer> {
        self.0
            .split_last()
            .map(|(_, parent)| JsonPointer(parent.to_vec()))
    }

    /// `true` if `self` addresses `other` or one of its descendants
    #[inline]
    pub fn starts_with(&self, other: &JsonPointer) -> bool {
        self.0.len() >= other.0.len() && self.0[..other.0.len()] == other.0[..]
    }
}

impl Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "/{}", escape_token(&token.as_key()))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = Error;

    /// Parses the textual form of a pointer
    ///
    /// Canonical decimal tokens (`0`, `12`, but not `01`) become [`ReferenceToken::Index`],
    /// all other tokens become [`ReferenceToken::Key`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(JsonPointer::root());
        }

        let Some(rest) = s.strip_prefix('/') else {
            return Err(Error::InvalidLocation(format!(
                "JSON pointer `{s}` must start with `/`"
            )));
        };

        rest.split('/')
            .map(|token| {
                let token = unescape_token(token)?;
                Ok(match parse_array_index(&token) {
                    Some(index) => ReferenceToken::Index(index),
                    None => ReferenceToken::Key(token),
                })
            })
            .collect::<Result<Vec<_>, Error>>()
            .map(JsonPointer)
    }
}

/// Escapes a reference token: `~` becomes `~0`, then `/` becomes `~1`
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if !token.contains(['~', '/']) {
        return Cow::Borrowed(token);
    }
    Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
}

/// Reverses [`escape_token`]: `~1` becomes `/`, then `~0` becomes `~`
///
/// A `~` that is not followed by `0` or `1` is an error.
pub fn unescape_token(token: &str) -> Result<String, Error> {
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return Err(Error::InvalidLocation(format!(
                "invalid escape sequence in JSON pointer token `{token}`"
            )));
        }
    }
    Ok(token.replace("~1", "/").replace("~0", "~"))
}

/// Array index as written in a JSON pointer: no sign, no leading zero
pub(crate) fn parse_array_index(token: &str) -> Option<usize> {
    let canonical = token == "0"
        || (!token.is_empty()
            && !token.starts_with('0')
            && token.bytes().all(|b| b.is_ascii_digit()));
    if canonical {
        token.parse().ok()
    } else {
        None
    }
}

/// Translates a resolved location such as `$.v[1]['a.b']` into a [`JsonPointer`]
///
/// Accepted notation: an optional `$` root marker, then any sequence of `.name`, `[index]`,
/// `['quoted name']` or `["quoted name"]`. Without root marker the location may start with
/// a bare name (`a.b[0]`).
/// # Errors
/// [`Error::InvalidLocation`] if the text cannot be split into tokens, or if it addresses
/// only the document root, which cannot be patched as a child location.
pub fn translate(location: &str) -> Result<JsonPointer, Error> {
    LocationTokenizer::new(location).tokenize()
}

struct LocationTokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> LocationTokenizer<'a> {
    #[inline]
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn tokenize(mut self) -> Result<JsonPointer, Error> {
        let mut tokens = Vec::new();

        let rooted = self.peek() == Some('$');
        if rooted {
            self.advance();
        } else if !matches!(self.peek(), Some('.') | Some('[') | None) {
            tokens.push(self.member_name()?);
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.advance();
                    tokens.push(self.member_name()?);
                }
                '[' => {
                    self.advance();
                    tokens.push(self.bracket()?);
                }
                c => return Err(self.error(format!("unexpected character `{c}`"))),
            }
        }

        if tokens.is_empty() {
            return Err(Error::InvalidLocation(format!(
                "`{}` denotes only Root: the document root cannot be the target of a patch",
                self.input
            )));
        }

        Ok(JsonPointer(tokens))
    }

    fn member_name(&mut self) -> Result<ReferenceToken, Error> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !matches!(c, '.' | '[' | ']' | '\'' | '"')) {
            self.advance();
        }

        if start == self.pos {
            return Err(self.error("empty member name"));
        }

        Ok(ReferenceToken::Key(self.input[start..self.pos].to_owned()))
    }

    /// Content of `[...]`, opening bracket already consumed
    fn bracket(&mut self) -> Result<ReferenceToken, Error> {
        let token = match self.peek() {
            Some('\'') | Some('"') => {
                let (key, len) = parsing::parse_quoted(&self.input[self.pos..])
                    .map_err(|e| self.error(e))?;
                self.pos += len;
                ReferenceToken::Key(key)
            }
            Some('0'..='9') => {
                let start = self.pos;
                while matches!(self.peek(), Some('0'..='9')) {
                    self.advance();
                }
                let digits = &self.input[start..self.pos];
                match parse_array_index(digits) {
                    Some(index) => ReferenceToken::Index(index),
                    None if digits.starts_with('0') => {
                        return Err(self.error(format!("array index `{digits}` has a leading zero")))
                    }
                    None => {
                        return Err(self.error(format!("array index `{digits}` out of range")))
                    }
                }
            }
            Some('-') => return Err(self.error("negative array index")),
            Some(c) => return Err(self.error(format!("unresolved selector starting with `{c}`"))),
            None => return Err(self.error("unclosed `[`")),
        };

        match self.peek() {
            Some(']') => {
                self.advance();
                Ok(token)
            }
            Some(c) => Err(self.error(format!("expected `]`, found `{c}`"))),
            None => Err(self.error("unclosed `[`")),
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    #[inline]
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: impl Display) -> Error {
        Error::InvalidLocation(format!(
            "cannot translate `{}` at position {}: {message}",
            self.input, self.pos
        ))
    }
}

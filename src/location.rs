use std::fmt::{self, Display, Write};

/// One step of a [`Location`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationStep {
    /// Object member name
    Key(String),
    /// Array index
    Index(usize),
}

/// Concrete address of a node matched by a [`JsonPath`](crate::JsonPath) evaluation
///
/// A location is rendered with the root marker `$` followed by `.name` for identifier-like
/// member names, `['name']` for any other member name and `[n]` for array indices,
/// e.g. `$.store.book[0]['first name']`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location(Vec<LocationStep>);

impl Location {
    /// The location of the document root: `$`
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(LocationStep::Key(key.into()));
        self
    }

    #[inline]
    pub fn idx(mut self, index: usize) -> Self {
        self.0.push(LocationStep::Index(index));
        self
    }

    #[inline]
    pub(crate) fn child_key(&self, key: &str) -> Self {
        self.clone().key(key)
    }

    #[inline]
    pub(crate) fn child_idx(&self, index: usize) -> Self {
        self.clone().idx(index)
    }

    #[inline]
    pub fn steps(&self) -> &[LocationStep] {
        &self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('$')?;
        for step in &self.0 {
            match step {
                LocationStep::Key(key) if is_plain_name(key) => {
                    f.write_char('.')?;
                    f.write_str(key)?;
                }
                LocationStep::Key(key) => {
                    f.write_str("['")?;
                    write_quoted(f, key)?;
                    f.write_str("']")?;
                }
                LocationStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Names that can be written after a dot without ambiguity
fn is_plain_name(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    for c in key.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

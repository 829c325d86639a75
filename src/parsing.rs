use crate::{
    json_path::{
        AbsolutePath, BooleanExpr, Comparable, ComparisonExpr, ComparisonOperator, FilterPath,
        FilterSelector, Function, IndexSelector, KeySelector, RelativePath, Segment, Selector,
        SliceSelector,
    },
    Error, JsonPath,
};
use serde_json::Value;
use std::fmt::Display;

const ROOT_NODE_IDENTIFIER: char = '$';
const CURRENT_NODE_IDENTIFIER: char = '@';
const WILDCARD_IDENTIFIER: char = '*';
const FILTER_IDENTIFIER: char = '?';
const MAX_NESTING_DEPTH: usize = 128;

pub(crate) fn parse_json_path(expression: &str) -> Result<JsonPath, Error> {
    let mut parser = Parser::new(expression);
    parser.skip_whitespace();
    if parser.is_at_end() {
        return Err(parser.error("empty expression"));
    }

    let segments = parser.parse_root_segments()?;

    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected character `{c}`")));
    }

    Ok(JsonPath::new(segments))
}

/// Reads a quoted string (`'...'` or `"..."`, JSON-style escapes) at the start of `text`
/// # Return
/// The unescaped string and the number of bytes consumed, closing quote included.
pub(crate) fn parse_quoted(text: &str) -> Result<(String, usize), Error> {
    let mut parser = Parser::new(text);
    let value = parser.parse_string_literal()?;
    Ok((value, parser.pos))
}

/// Left-hand or right-hand side of a filter test before it is typed
enum Operand {
    Path(FilterPath),
    Literal(Value),
    Function(Function),
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Filters, parentheses, negations and function calls currently open
    depth: usize,
}

impl<'a> Parser<'a> {
    #[inline]
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_root_segments(&mut self) -> Result<Vec<Segment>, Error> {
        let mut segments = Vec::new();

        match self.peek() {
            Some(ROOT_NODE_IDENTIFIER) => self.advance(),
            Some(CURRENT_NODE_IDENTIFIER) => {
                return Err(self.error("`@` is only allowed inside a filter expression"));
            }
            // implicit root: `.a`, `..a`, `[0]`
            Some('.') | Some('[') => (),
            // implicit root: `a.b`, `*`
            Some(c) if is_name_char(c) || c == WILDCARD_IDENTIFIER => {
                segments.push(self.parse_dot_member()?);
            }
            Some(c) => return Err(self.error(format!("unexpected character `{c}`"))),
            None => return Err(self.error("unexpected end of expression")),
        }

        self.parse_segments(&mut segments)?;
        Ok(segments)
    }

    fn parse_segments(&mut self, segments: &mut Vec<Segment>) -> Result<(), Error> {
        loop {
            match self.peek() {
                Some('.') => {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        segments.push(Segment::Descendant(self.parse_descendant_selectors()?));
                    } else {
                        segments.push(self.parse_dot_member()?);
                    }
                }
                Some('[') => segments.push(Segment::Child(self.parse_bracket_selectors()?)),
                _ => return Ok(()),
            }
        }
    }

    /// `*`, `**` or `name` after a single dot
    fn parse_dot_member(&mut self) -> Result<Segment, Error> {
        match self.peek() {
            Some(WILDCARD_IDENTIFIER) => {
                self.advance();
                if self.peek() == Some(WILDCARD_IDENTIFIER) {
                    self.advance();
                    return Ok(Segment::Leaves);
                }
                Ok(Segment::Child(vec![Selector::Wildcard]))
            }
            Some(c) if is_name_char(c) => {
                let name = self.parse_name();
                Ok(Segment::Child(vec![Selector::Key(KeySelector::new(name))]))
            }
            _ => Err(self.error("expected member name or `*` after `.`")),
        }
    }

    /// `*`, `name` or `[selectors]` after `..`
    fn parse_descendant_selectors(&mut self) -> Result<Vec<Selector>, Error> {
        match self.peek() {
            Some(WILDCARD_IDENTIFIER) => {
                self.advance();
                Ok(vec![Selector::Wildcard])
            }
            Some('[') => self.parse_bracket_selectors(),
            Some(c) if is_name_char(c) => Ok(vec![Selector::Key(KeySelector::new(
                self.parse_name(),
            ))]),
            _ => Err(self.error("expected member name, `*` or `[` after `..`")),
        }
    }

    fn parse_bracket_selectors(&mut self) -> Result<Vec<Selector>, Error> {
        self.expect('[')?;
        let mut selectors = Vec::new();

        loop {
            self.skip_whitespace();
            selectors.push(self.parse_bracket_selector()?);
            self.skip_whitespace();

            match self.peek() {
                Some(',') => self.advance(),
                Some(']') => {
                    self.advance();
                    return Ok(selectors);
                }
                Some(c) => return Err(self.error(format!("expected `,` or `]`, found `{c}`"))),
                None => return Err(self.error("unclosed `[`")),
            }
        }
    }

    fn parse_bracket_selector(&mut self) -> Result<Selector, Error> {
        match self.peek() {
            Some('\'') | Some('"') => Ok(Selector::Key(KeySelector::new(
                self.parse_string_literal()?,
            ))),
            Some(WILDCARD_IDENTIFIER) => {
                self.advance();
                Ok(Selector::Wildcard)
            }
            Some(FILTER_IDENTIFIER) => {
                self.advance();
                self.skip_whitespace();
                let expr = self.nested(Self::parse_logical_or)?;
                Ok(Selector::Filter(FilterSelector::new(expr)))
            }
            Some(':') | Some('-') | Some('0'..='9') => self.parse_index_or_slice(),
            Some(c) => Err(self.error(format!("invalid selector starting with `{c}`"))),
            None => Err(self.error("unclosed `[`")),
        }
    }

    fn parse_index_or_slice(&mut self) -> Result<Selector, Error> {
        let start = self.parse_optional_integer()?;
        self.skip_whitespace();

        if self.peek() != Some(':') {
            return match start {
                Some(index) => Ok(Selector::Index(IndexSelector::new(index))),
                None => Err(self.error("expected array index")),
            };
        }

        self.advance();
        self.skip_whitespace();
        let end = self.parse_optional_integer()?;
        self.skip_whitespace();

        let step = if self.peek() == Some(':') {
            self.advance();
            self.skip_whitespace();
            self.parse_optional_integer()?.unwrap_or(1)
        } else {
            1
        };

        Ok(Selector::Slice(SliceSelector::new(start, end, step)))
    }

    fn parse_optional_integer(&mut self) -> Result<Option<isize>, Error> {
        if !matches!(self.peek(), Some('-') | Some('0'..='9')) {
            return Ok(None);
        }

        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        text.parse::<isize>()
            .map(Some)
            .map_err(|_| self.error(format!("invalid integer `{text}`")))
    }

    fn parse_logical_or(&mut self) -> Result<BooleanExpr, Error> {
        let mut left = self.parse_logical_and()?;
        loop {
            self.skip_whitespace();
            if !self.consume("||") {
                return Ok(left);
            }
            let right = self.parse_logical_and()?;
            left = BooleanExpr::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_logical_and(&mut self) -> Result<BooleanExpr, Error> {
        let mut left = self.parse_basic_expr()?;
        loop {
            self.skip_whitespace();
            if !self.consume("&&") {
                return Ok(left);
            }
            let right = self.parse_basic_expr()?;
            left = BooleanExpr::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_basic_expr(&mut self) -> Result<BooleanExpr, Error> {
        self.skip_whitespace();
        match self.peek() {
            Some('!') if !self.input[self.pos..].starts_with("!=") => {
                self.advance();
                let expr = self.nested(Self::parse_basic_expr)?;
                Ok(BooleanExpr::Not(Box::new(expr)))
            }
            Some('(') => {
                self.advance();
                let expr = self.nested(Self::parse_logical_or)?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(expr)
            }
            _ => self.parse_comparison_or_test(),
        }
    }

    fn parse_comparison_or_test(&mut self) -> Result<BooleanExpr, Error> {
        let left = self.parse_operand()?;
        self.skip_whitespace();

        if self.consume("=~") {
            self.skip_whitespace();
            let pattern = self.parse_regex_literal()?;
            let left = self.into_comparable(left)?;
            return Ok(BooleanExpr::Function(Function::search(left, &pattern)?));
        }

        let Some(operator) = self.parse_comparison_operator() else {
            return match left {
                Operand::Path(path) => Ok(BooleanExpr::Path(path)),
                Operand::Function(function @ Function::Regex(..)) => {
                    Ok(BooleanExpr::Function(function))
                }
                _ => Err(self.error("expected a comparison or an existence test")),
            };
        };

        let left = self.into_comparable(left)?;
        self.skip_whitespace();
        let right = self.parse_operand()?;
        let right = self.into_comparable(right)?;

        Ok(BooleanExpr::Comparison(ComparisonExpr::new(
            left, operator, right,
        )))
    }

    fn parse_comparison_operator(&mut self) -> Option<ComparisonOperator> {
        let operators = [
            ("==", ComparisonOperator::Eq),
            ("!=", ComparisonOperator::Neq),
            ("<=", ComparisonOperator::Lte),
            (">=", ComparisonOperator::Gte),
            ("<", ComparisonOperator::Lt),
            (">", ComparisonOperator::Gt),
        ];

        operators
            .into_iter()
            .find(|(token, _)| self.input[self.pos..].starts_with(token))
            .map(|(token, operator)| {
                self.pos += token.len();
                operator
            })
    }

    fn into_comparable(&self, operand: Operand) -> Result<Comparable, Error> {
        match operand {
            Operand::Literal(value) => Ok(Comparable::Value(value)),
            Operand::Path(path) => path
                .into_singular()
                .map(Comparable::SingularPath)
                .map_err(|_| self.error("only singular queries can be compared")),
            Operand::Function(function @ (Function::Length(_) | Function::Count(_))) => {
                Ok(Comparable::Function(function))
            }
            Operand::Function(_) => Err(self.error("`match` and `search` cannot be compared")),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, Error> {
        self.skip_whitespace();
        match self.peek() {
            Some(CURRENT_NODE_IDENTIFIER) => {
                self.advance();
                let mut segments = Vec::new();
                self.parse_segments(&mut segments)?;
                Ok(Operand::Path(FilterPath::Rel(RelativePath::new(segments))))
            }
            Some(ROOT_NODE_IDENTIFIER) => {
                self.advance();
                let mut segments = Vec::new();
                self.parse_segments(&mut segments)?;
                Ok(Operand::Path(FilterPath::Abs(AbsolutePath::new(segments))))
            }
            Some('\'') | Some('"') => Ok(Operand::Literal(Value::String(
                self.parse_string_literal()?,
            ))),
            Some('-') | Some('0'..='9') => Ok(Operand::Literal(self.parse_number_literal()?)),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.parse_name();
                match word.as_str() {
                    "true" => Ok(Operand::Literal(Value::Bool(true))),
                    "false" => Ok(Operand::Literal(Value::Bool(false))),
                    "null" => Ok(Operand::Literal(Value::Null)),
                    "length" | "count" | "match" | "search" => {
                        let function = self.nested(|parser| parser.parse_function(&word))?;
                        Ok(Operand::Function(function))
                    }
                    _ => {
                        self.pos = start;
                        Err(self.error(format!("unknown identifier `{word}`")))
                    }
                }
            }
            Some(c) => Err(self.error(format!("unexpected character `{c}` in filter"))),
            None => Err(self.error("unexpected end of filter")),
        }
    }

    fn parse_function(&mut self, name: &str) -> Result<Function, Error> {
        self.skip_whitespace();
        self.expect('(')?;
        let argument = self.parse_operand()?;
        self.skip_whitespace();

        let function = match name {
            "length" => Function::Length(Box::new(self.into_comparable(argument)?)),
            "count" => match argument {
                Operand::Path(path) => Function::Count(path),
                _ => return Err(self.error("`count` expects a query argument")),
            },
            _ => {
                self.expect(',')?;
                self.skip_whitespace();
                let pattern = self.parse_string_literal()?;
                self.skip_whitespace();
                let comparable = self.into_comparable(argument)?;
                if name == "match" {
                    Function::_match(comparable, &pattern)?
                } else {
                    Function::search(comparable, &pattern)?
                }
            }
        };

        self.expect(')')?;
        Ok(function)
    }

    fn parse_number_literal(&mut self) -> Result<Value, Error> {
        let start = self.pos;
        while matches!(self.peek(), Some('-' | '+' | '.' | 'e' | 'E' | '0'..='9')) {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Number(_)) => Ok(value),
            _ => Err(self.error(format!("invalid number `{text}`"))),
        }
    }

    /// `'pattern'`, `"pattern"` or `/pattern/`
    fn parse_regex_literal(&mut self) -> Result<String, Error> {
        if self.peek() != Some('/') {
            return self.parse_string_literal();
        }

        self.advance();
        let mut pattern = String::new();
        loop {
            match self.next() {
                Some('\\') if self.peek() == Some('/') => {
                    self.advance();
                    pattern.push('/');
                }
                Some('/') => return Ok(pattern),
                Some(c) => pattern.push(c),
                None => return Err(self.error("unclosed regex literal")),
            }
        }
    }

    fn parse_string_literal(&mut self) -> Result<String, Error> {
        let quote = match self.next() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err(self.error("expected string literal")),
        };

        let mut value = String::new();
        loop {
            match self.next() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => value.push(self.parse_escape()?),
                Some(c) => value.push(c),
                None => return Err(self.error("unclosed string literal")),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, Error> {
        match self.next() {
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => {
                let high = self.parse_hex4()?;
                if !(0xD800..0xDC00).contains(&high) {
                    return char::from_u32(high)
                        .ok_or_else(|| self.error("invalid unicode escape"));
                }
                if !self.consume("\\u") {
                    return Err(self.error("unpaired surrogate in unicode escape"));
                }
                let low = self.parse_hex4()?;
                if !(0xDC00..0xE000).contains(&low) {
                    return Err(self.error("invalid low surrogate in unicode escape"));
                }
                char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                    .ok_or_else(|| self.error("invalid unicode escape"))
            }
            Some(c @ ('\\' | '/' | '\'' | '"')) => Ok(c),
            Some(c) => Err(self.error(format!("invalid escape `\\{c}`"))),
            None => Err(self.error("unclosed string literal")),
        }
    }

    fn parse_hex4(&mut self) -> Result<u32, Error> {
        let end = self.pos + 4;
        let hex = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos = end;
        Ok(code)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.advance();
        }
        self.input[start..self.pos].to_owned()
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    #[inline]
    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    #[inline]
    fn advance(&mut self) {
        self.next();
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn consume(&mut self, token: &str) -> bool {
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected `{expected}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{expected}`, found end of expression"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn error(&self, message: impl Display) -> Error {
        Error::Path(format!(
            "{message} at position {} in `{}`",
            self.pos, self.input
        ))
    }
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

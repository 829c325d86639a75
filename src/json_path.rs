use crate::{parsing, Error, Location};
use regex::Regex;
use serde_json::{Number, Value};
use std::{borrow::Cow, cmp::Ordering, fmt, str::FromStr};

/// Represents a JSONPath expression
///
/// Once constructed, this structure can be used efficiently multiple times
/// to apply the JSONPath expression on different JSON documents.
#[derive(Debug, PartialEq)]
pub struct JsonPath(AbsolutePath);

impl JsonPath {
    #[inline]
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self(AbsolutePath::new(segments))
    }

    /// Parses a JSONPath expression from its textual form
    ///
    /// The root identifier `$` is optional: `a.b`, `.a.b` and `$.a.b` are the same expression.
    /// # Return
    /// A new `JsonPath` instance or [`Error::Path`] if the expression is not valid.
    #[inline]
    pub fn parse(expression: &str) -> Result<Self, Error> {
        parsing::parse_json_path(expression)
    }

    /// Applies the JSONPath expression to the input JSON document
    /// # Return
    /// The matched nodes, in document order.
    ///
    /// By convention, this process does not issue any error.
    /// If the JSONPath expression does not match the input value, an empty vector will be returned
    #[inline]
    pub fn evaluate<'a>(&self, value: &'a Value) -> Vec<&'a Value> {
        self.0
            .evaluate(value)
            .into_iter()
            .map(|node| node.value)
            .collect()
    }

    /// Applies the JSONPath expression to the input JSON document
    /// # Return
    /// The [`Location`] of every matched node, in the same order as [`evaluate`](JsonPath::evaluate).
    #[inline]
    pub fn locate(&self, value: &Value) -> Vec<Location> {
        self.0
            .evaluate(value)
            .into_iter()
            .map(|node| node.location)
            .collect()
    }
}

impl FromStr for JsonPath {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A matched value together with where it was found
#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    location: Location,
    value: &'a Value,
}

impl<'a> Node<'a> {
    #[inline]
    fn new(location: Location, value: &'a Value) -> Self {
        Self { location, value }
    }

    #[inline]
    fn root(value: &'a Value) -> Self {
        Self::new(Location::root(), value)
    }

    fn children(&self) -> Vec<Node<'a>> {
        match self.value {
            Value::Array(array) => array
                .iter()
                .enumerate()
                .map(|(i, v)| Node::new(self.location.child_idx(i), v))
                .collect(),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Node::new(self.location.child_key(k), v))
                .collect(),
            _ => vec![],
        }
    }

    /// Scalars and empty containers
    #[inline]
    fn is_leaf(&self) -> bool {
        match self.value {
            Value::Array(array) => array.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct AbsolutePath(Vec<Segment>);

impl AbsolutePath {
    #[inline]
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    fn evaluate<'a>(&self, root: &'a Value) -> Vec<Node<'a>> {
        evaluate_segments(&self.0, root, Node::root(root))
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct RelativePath(Vec<Segment>);

impl RelativePath {
    #[inline]
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    fn evaluate<'a>(&self, root: &'a Value, current: &'a Value) -> Vec<Node<'a>> {
        evaluate_segments(&self.0, root, Node::root(current))
    }
}

fn evaluate_segments<'a>(segments: &[Segment], root: &'a Value, start: Node<'a>) -> Vec<Node<'a>> {
    let mut current_nodes = vec![start];
    for segment in segments {
        if current_nodes.is_empty() {
            break;
        }
        current_nodes = segment.evaluate(root, current_nodes);
    }
    current_nodes
}

/// Path used inside a filter expression
#[derive(Debug, PartialEq)]
pub(crate) enum FilterPath {
    /// Absolute path (begining by '$')
    Abs(AbsolutePath),
    /// Relative path (begining by '@')
    Rel(RelativePath),
}

impl FilterPath {
    #[inline]
    fn evaluate<'a>(&self, root: &'a Value, current: &'a Value) -> Vec<Node<'a>> {
        match self {
            FilterPath::Abs(path) => path.evaluate(root),
            FilterPath::Rel(path) => path.evaluate(root, current),
        }
    }

    /// Converts the path into a singular path if it only contains single key or index selectors
    pub(crate) fn into_singular(self) -> Result<SingularPath, Self> {
        let (segments, is_absolute) = match self {
            FilterPath::Abs(AbsolutePath(segments)) => (segments, true),
            FilterPath::Rel(RelativePath(segments)) => (segments, false),
        };

        if !segments.iter().all(Segment::is_singular) {
            return Err(if is_absolute {
                FilterPath::Abs(AbsolutePath(segments))
            } else {
                FilterPath::Rel(RelativePath(segments))
            });
        }

        let singular_segments = segments
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Child(mut selectors) => match selectors.pop() {
                    Some(Selector::Key(key)) => Some(SingularSegment::Key(key)),
                    Some(Selector::Index(index)) => Some(SingularSegment::Index(index)),
                    _ => None,
                },
                Segment::Descendant(_) | Segment::Leaves => None,
            })
            .collect();

        Ok(if is_absolute {
            SingularPath::Abs(singular_segments)
        } else {
            SingularPath::Rel(singular_segments)
        })
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum Segment {
    Child(Vec<Selector>),
    Descendant(Vec<Selector>),
    /// `**`: every leaf below the current nodes
    Leaves,
}

impl Segment {
    fn evaluate<'a>(&self, root: &'a Value, current_nodes: Vec<Node<'a>>) -> Vec<Node<'a>> {
        match self {
            Segment::Child(selectors) => current_nodes
                .iter()
                .flat_map(|current| selectors.iter().flat_map(move |s| s.evaluate(root, current)))
                .collect(),

            Segment::Descendant(selectors) => {
                let mut descendants = Vec::new();
                for node in current_nodes {
                    Self::fetch_descendants(&mut descendants, node);
                }

                descendants
                    .iter()
                    .flat_map(|current| selectors.iter().flat_map(move |s| s.evaluate(root, current)))
                    .collect()
            }

            Segment::Leaves => {
                let mut descendants = Vec::new();
                for child in current_nodes.iter().flat_map(Node::children) {
                    Self::fetch_descendants(&mut descendants, child);
                }
                descendants.retain(Node::is_leaf);
                descendants
            }
        }
    }

    /// Pre-order walk: a node comes before all of its descendants
    fn fetch_descendants<'a>(descendants: &mut Vec<Node<'a>>, node: Node<'a>) {
        let children = node.children();
        descendants.push(node);
        for child in children {
            Self::fetch_descendants(descendants, child);
        }
    }

    #[inline]
    fn is_singular(&self) -> bool {
        matches!(self, Segment::Child(selectors)
            if matches!(&selectors[..], [Selector::Key(_)] | [Selector::Index(_)]))
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum Selector {
    /// 'name' or .name
    Key(KeySelector),
    /// "*"
    Wildcard,
    /// [idx]
    Index(IndexSelector),
    /// [start:end:step]
    Slice(SliceSelector),
    /// [?expr]
    Filter(FilterSelector),
}

impl Selector {
    fn evaluate<'a>(&self, root: &'a Value, current: &Node<'a>) -> Vec<Node<'a>> {
        match self {
            Selector::Key(selector) => selector.evaluate(current),
            Selector::Wildcard => current.children(),
            Selector::Index(selector) => selector.evaluate(current),
            Selector::Slice(selector) => selector.evaluate(current),
            Selector::Filter(filter) => filter.evaluate(root, current),
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct KeySelector(String);

impl KeySelector {
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[inline]
    fn evaluate<'a>(&self, node: &Node<'a>) -> Vec<Node<'a>> {
        let Self(key) = &self;
        self.evaluate_single(node.value)
            .map(|v| vec![Node::new(node.location.child_key(key), v)])
            .unwrap_or_default()
    }

    #[inline]
    fn evaluate_single<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let Self(key) = &self;
        value.as_object().and_then(|map| map.get(key))
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct IndexSelector(isize);

impl IndexSelector {
    #[inline]
    pub fn new(index: isize) -> Self {
        Self(index)
    }

    #[inline]
    fn evaluate<'a>(&self, node: &Node<'a>) -> Vec<Node<'a>> {
        self.resolve(node.value)
            .map(|(i, v)| vec![Node::new(node.location.child_idx(i), v)])
            .unwrap_or_default()
    }

    #[inline]
    fn evaluate_single<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.resolve(value).map(|(_, v)| v)
    }

    fn resolve<'a>(&self, value: &'a Value) -> Option<(usize, &'a Value)> {
        let Self(index) = &self;
        let array = value.as_array()?;
        let index = normalize_index(*index, array.len());
        if index < 0 {
            return None;
        }
        let index = index as usize;
        array.get(index).map(|v| (index, v))
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct SliceSelector(Option<isize>, Option<isize>, isize);

impl SliceSelector {
    #[inline]
    pub fn new(start: Option<isize>, end: Option<isize>, step: isize) -> Self {
        Self(start, end, step)
    }

    fn evaluate<'a>(&self, node: &Node<'a>) -> Vec<Node<'a>> {
        let Some(array) = node.value.as_array() else {
            return vec![];
        };

        self.indices(array.len())
            .into_iter()
            .map(|i| Node::new(node.location.child_idx(i), &array[i]))
            .collect()
    }

    /// cf. https://www.rfc-editor.org/rfc/rfc9535#name-array-slice-selector
    fn indices(&self, len: usize) -> Vec<usize> {
        let SliceSelector(start, end, step) = *self;
        let len = len as isize;
        let mut indices = Vec::new();

        if step > 0 {
            let start = normalize_index(start.unwrap_or(0), len as usize);
            let end = normalize_index(end.unwrap_or(len), len as usize);
            let lower = start.clamp(0, len);
            let upper = end.clamp(0, len);
            let mut i = lower;
            while i < upper {
                indices.push(i as usize);
                i += step;
            }
        } else if step < 0 {
            let start = normalize_index(start.unwrap_or(len - 1), len as usize);
            let end = normalize_index(end.unwrap_or(-len - 1), len as usize);
            let upper = start.clamp(-1, len - 1);
            let lower = end.clamp(-1, len - 1);
            let mut i = upper;
            while lower < i {
                indices.push(i as usize);
                i += step;
            }
        }

        indices
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct FilterSelector(BooleanExpr);

impl FilterSelector {
    #[inline]
    pub fn new(boolean_expr: BooleanExpr) -> Self {
        Self(boolean_expr)
    }

    #[inline]
    fn evaluate<'a>(&self, root: &'a Value, current: &Node<'a>) -> Vec<Node<'a>> {
        let Self(boolean_expr) = &self;
        current
            .children()
            .into_iter()
            .filter(|child| boolean_expr.evaluate(root, child.value))
            .collect()
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum BooleanExpr {
    Or(Box<BooleanExpr>, Box<BooleanExpr>),
    And(Box<BooleanExpr>, Box<BooleanExpr>),
    Not(Box<BooleanExpr>),
    Comparison(ComparisonExpr),
    /// path existence or non-existence
    Path(FilterPath),
    Function(Function),
}

impl BooleanExpr {
    #[inline]
    pub fn evaluate(&self, root: &Value, current: &Value) -> bool {
        match self {
            BooleanExpr::Or(l, r) => l.evaluate(root, current) || r.evaluate(root, current),
            BooleanExpr::And(l, r) => l.evaluate(root, current) && r.evaluate(root, current),
            BooleanExpr::Not(e) => !e.evaluate(root, current),
            BooleanExpr::Comparison(c) => c.evaluate(root, current),
            BooleanExpr::Path(p) => !p.evaluate(root, current).is_empty(),
            BooleanExpr::Function(f) => f.evaluate_as_boolean_expr(root, current),
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct ComparisonExpr(Comparable, ComparisonOperator, Comparable);

impl ComparisonExpr {
    #[inline]
    pub fn new(left: Comparable, operator: ComparisonOperator, right: Comparable) -> Self {
        Self(left, operator, right)
    }

    pub fn evaluate(&self, root: &Value, current: &Value) -> bool {
        let ComparisonExpr(left, op, right) = &self;
        match op {
            ComparisonOperator::Eq => left.equals(right, root, current),
            ComparisonOperator::Neq => !left.equals(right, root, current),
            ComparisonOperator::Gt => right.lesser_than(left, root, current),
            ComparisonOperator::Gte => {
                right.lesser_than(left, root, current) || left.equals(right, root, current)
            }
            ComparisonOperator::Lt => left.lesser_than(right, root, current),
            ComparisonOperator::Lte => {
                left.lesser_than(right, root, current) || left.equals(right, root, current)
            }
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum Comparable {
    Value(Value),
    SingularPath(SingularPath),
    Function(Function),
}

/// cf. https://www.rfc-editor.org/rfc/rfc9535#name-comparisons
impl Comparable {
    fn equals(&self, other: &Self, root: &Value, current: &Value) -> bool {
        let v1 = self.evaluate(root, current);
        let v2 = other.evaluate(root, current);

        match (&v1, &v2) {
            (None, None) => true,
            (Some(v1), Some(v2)) => value_equals(v1, v2),
            _ => false,
        }
    }

    fn lesser_than(&self, other: &Self, root: &Value, current: &Value) -> bool {
        let v1 = self.evaluate(root, current);
        let v2 = other.evaluate(root, current);

        let v1 = v1.as_ref().map(|v| v.as_ref());
        let v2 = v2.as_ref().map(|v| v.as_ref());

        match (v1, v2) {
            (Some(Value::Number(n1)), Some(Value::Number(n2))) => {
                number_cmp(n1, n2) == Some(Ordering::Less)
            }
            (Some(Value::String(t1)), Some(Value::String(t2))) => t1 < t2,
            _ => false,
        }
    }

    fn evaluate<'a>(&'a self, root: &'a Value, current: &'a Value) -> Option<Cow<'a, Value>> {
        match self {
            Comparable::Value(value) => Some(Cow::Borrowed(value)),
            Comparable::SingularPath(path) => path.evaluate(root, current).map(Cow::Borrowed),
            Comparable::Function(function) => function
                .evaluate_as_comparable(root, current)
                .map(Cow::Owned),
        }
    }
}

pub(crate) fn value_equals(v1: &Value, v2: &Value) -> bool {
    match (v1, v2) {
        (Value::Number(n1), Value::Number(n2)) => number_cmp(n1, n2) == Some(Ordering::Equal),
        (Value::Array(a1), Value::Array(a2)) => {
            a1.len() == a2.len() && a1.iter().zip(a2).all(|(v1, v2)| value_equals(v1, v2))
        }
        (Value::Object(m1), Value::Object(m2)) => {
            m1.len() == m2.len()
                && m1
                    .iter()
                    .all(|(key, v1)| m2.get(key).map_or(false, |v2| value_equals(v1, v2)))
        }
        _ => v1 == v2,
    }
}

/// Integers up to `i128` compare exactly, everything else compares as `f64`
fn number_cmp(n1: &Number, n2: &Number) -> Option<Ordering> {
    if n1 == n2 {
        return Some(Ordering::Equal);
    }
    if let (Some(i1), Some(i2)) = (n1.as_i64(), n2.as_i64()) {
        return Some(i1.cmp(&i2));
    }
    if let (Ok(i1), Ok(i2)) = (
        n1.to_string().parse::<i128>(),
        n2.to_string().parse::<i128>(),
    ) {
        return Some(i1.cmp(&i2));
    }
    n1.as_f64()?.partial_cmp(&n2.as_f64()?)
}

#[derive(Debug, PartialEq)]
pub(crate) enum ComparisonOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, PartialEq)]
pub(crate) enum SingularPath {
    /// Absolute singular path (beginning by '$')
    Abs(Vec<SingularSegment>),
    /// Relative singular path (beginning by '@')
    Rel(Vec<SingularSegment>),
}

impl SingularPath {
    #[inline]
    pub fn evaluate<'a>(&self, root: &'a Value, current: &'a Value) -> Option<&'a Value> {
        match self {
            SingularPath::Abs(segments) => Self::evaluate_impl(segments, root),
            SingularPath::Rel(segments) => Self::evaluate_impl(segments, current),
        }
    }

    fn evaluate_impl<'a>(segments: &[SingularSegment], value: &'a Value) -> Option<&'a Value> {
        let mut current_value = value;
        for segment in segments {
            current_value = segment.evaluate(current_value)?;
        }
        Some(current_value)
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum SingularSegment {
    Key(KeySelector),
    Index(IndexSelector),
}

impl SingularSegment {
    #[inline]
    fn evaluate<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match self {
            SingularSegment::Key(selector) => selector.evaluate_single(value),
            SingularSegment::Index(selector) => selector.evaluate_single(value),
        }
    }
}

pub(crate) enum Function {
    Length(Box<Comparable>),
    Count(FilterPath),
    Regex(Box<Comparable>, Regex),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(c) => f.debug_tuple("Length").field(c).finish(),
            Self::Count(p) => f.debug_tuple("Count").field(p).finish(),
            Self::Regex(c, r) => f.debug_tuple("Regex").field(c).field(&r.as_str()).finish(),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Length(l0), Self::Length(r0)) => l0 == r0,
            (Self::Count(l0), Self::Count(r0)) => l0 == r0,
            (Self::Regex(l0, l1), Self::Regex(r0, r1)) => l0 == r0 && l1.as_str() == r1.as_str(),
            _ => false,
        }
    }
}

impl Function {
    /// `match()`: the whole string must match
    #[inline]
    pub(crate) fn _match(comparable: Comparable, regex: &str) -> Result<Self, Error> {
        Self::search(comparable, &format!("^(?:{regex})$"))
    }

    /// `search()` and `=~`: any substring may match
    #[inline]
    pub(crate) fn search(comparable: Comparable, regex: &str) -> Result<Self, Error> {
        Ok(Function::Regex(Box::new(comparable), Regex::new(regex)?))
    }

    fn evaluate_as_boolean_expr(&self, root: &Value, current: &Value) -> bool {
        match self {
            Function::Regex(comparable, regex) => {
                let value = comparable.evaluate(root, current);
                match value.as_ref().map(|v| v.as_ref()) {
                    Some(Value::String(str)) => regex.is_match(str),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn evaluate_as_comparable(&self, root: &Value, current: &Value) -> Option<Value> {
        match self {
            Function::Length(comparable) => {
                let value = comparable.evaluate(root, current);
                match value.as_ref().map(|v| v.as_ref()) {
                    Some(Value::Array(a)) => Some(a.len().into()),
                    Some(Value::Object(m)) => Some(m.len().into()),
                    Some(Value::String(t)) => Some(t.chars().count().into()),
                    _ => None,
                }
            }
            Function::Count(path) => Some(path.evaluate(root, current).len().into()),
            _ => None,
        }
    }
}

#[inline]
fn normalize_index(i: isize, len: usize) -> isize {
    if i >= 0 {
        i
    } else {
        len as isize + i
    }
}

//! Dotted-path navigation that never fails
//!
//! `a.b.0.c` walks children by normalized name, with integer segments
//! indexing into repeated children (negative indices count from the end).
//! A final `#text` or `@name` segment reads text or an attribute from the
//! node reached. Any miss along the way yields the caller's default, or
//! [`NULL_NODE`] when there is none; for `#text`/`@name` paths the
//! fallback is a plain absent value instead.

use std::fmt;

use rust_decimal::Decimal;
use time::{Date, Time};
use tracing::trace;

use crate::codec::{self, DateTimeValue, FromText};
use crate::convert::{self, ConvertOptions};
use crate::error::{Error, Result};
use crate::node::{Container, ElementView, Lookup, Node};
use crate::value::{Value, ATTRIBUTE_PREFIX, TEXT_KEY};

/// Stand-in for a missing path: every conversion yields `None`
pub struct NullNode;

/// The shared missing-path marker
pub static NULL_NODE: NullNode = NullNode;

impl NullNode {
    pub fn is_truthy(&self) -> bool {
        false
    }

    pub fn to_str(&self) -> Option<String> {
        None
    }

    pub fn to_bool(&self) -> Option<bool> {
        None
    }

    pub fn to_int(&self) -> Option<i64> {
        None
    }

    pub fn to_float(&self) -> Option<f64> {
        None
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        None
    }

    pub fn to_time(&self) -> Option<Time> {
        None
    }

    pub fn to_date(&self) -> Option<Date> {
        None
    }

    pub fn to_datetime(&self) -> Option<DateTimeValue> {
        None
    }

    pub fn to_value(&self) -> Option<Value> {
        None
    }
}

impl fmt::Debug for NullNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NULL_NODE")
    }
}

/// Outcome of a path lookup
#[derive(Clone, Debug, PartialEq)]
pub enum Found {
    One(Node),
    Many(Vec<Node>),
    /// Attribute or text read by a `@name`/`#text` segment
    Value(Option<String>),
    /// Path not found and no default given
    Missing(&'static NullNode),
    /// Path not found; the caller's default
    Default(Value),
}

impl PartialEq for NullNode {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Found {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    /// Neither the sentinel nor an absent attribute/text
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Missing(_) | Self::Value(None))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::One(node) => node.is_truthy(),
            Self::Many(nodes) => !nodes.is_empty(),
            Self::Value(value) => value.as_deref().is_some_and(|v| !v.is_empty()),
            Self::Missing(null) => null.is_truthy(),
            Self::Default(value) => !value.is_falsy(),
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::One(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[Node]> {
        match self {
            Self::Many(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        self.as_node().and_then(Node::as_container)
    }

    /// Text read by a suffix segment, or a text default
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Value(value) => value.as_deref(),
            Self::Default(value) => value.as_text(),
            _ => None,
        }
    }

    /// Scalar text of the result: a leaf's text, a read value or a text default
    pub fn text(&self) -> Option<String> {
        match self {
            Self::One(Node::Leaf(leaf)) => leaf.get(),
            Self::One(Node::Container(_)) | Self::Many(_) | Self::Missing(_) => None,
            Self::Value(value) => value.clone(),
            Self::Default(value) => value.as_text().map(str::to_string),
        }
    }

    /// Parse the result as `T`; `Ok(None)` when there is nothing to parse
    pub fn parse<T: FromText>(&self) -> Result<Option<T>> {
        match self {
            Self::One(Node::Leaf(leaf)) => leaf.parse().map(Some),
            Self::One(Node::Container(_)) | Self::Many(_) => Err(Error::conversion(format!(
                "cannot convert {self:?} to a scalar"
            ))),
            Self::Value(None) | Self::Missing(_) | Self::Default(Value::Null) => Ok(None),
            Self::Value(Some(text)) | Self::Default(Value::Text(text)) => {
                T::from_text(text).map(Some)
            }
            Self::Default(other) => Err(Error::conversion(format!(
                "cannot convert default {other:?} to a scalar"
            ))),
        }
    }

    pub fn to_str(&self) -> Result<Option<String>> {
        self.parse()
    }

    pub fn to_bool(&self) -> Result<Option<bool>> {
        Ok(self.parse::<String>()?.map(|text| codec::to_bool(&text)))
    }

    pub fn to_int(&self) -> Result<Option<i64>> {
        self.parse()
    }

    pub fn to_float(&self) -> Result<Option<f64>> {
        self.parse()
    }

    pub fn to_decimal(&self) -> Result<Option<Decimal>> {
        self.parse()
    }

    pub fn to_time(&self) -> Result<Option<Time>> {
        self.parse()
    }

    pub fn to_date(&self) -> Result<Option<Date>> {
        self.parse()
    }

    pub fn to_datetime(&self) -> Result<Option<DateTimeValue>> {
        self.parse()
    }

    /// Structured value of the result, `None` for the sentinel or an absent value
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::One(node) => Some(node_value(node)),
            Self::Many(nodes) => Some(nodes.iter().map(node_value).collect()),
            Self::Value(value) => value.clone().map(Value::Text),
            Self::Missing(null) => null.to_value(),
            Self::Default(value) => Some(value.clone()),
        }
    }
}

fn node_value(node: &Node) -> Value {
    convert::to_value(node.element(), &ConvertOptions::default())
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Name(&'a str),
    Index(isize),
}

#[derive(Debug, PartialEq, Eq)]
enum Suffix<'a> {
    Text,
    Attribute(&'a str),
}

fn parse_path(path: &str) -> (Vec<Segment<'_>>, Option<Suffix<'_>>) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let suffix = match parts.last().copied() {
        Some(last) if last == TEXT_KEY => Some(Suffix::Text),
        Some(last) => last.strip_prefix(ATTRIBUTE_PREFIX).map(Suffix::Attribute),
        None => None,
    };
    if suffix.is_some() {
        parts.pop();
    }

    let segments = parts
        .into_iter()
        .map(|part| match part.parse::<isize>() {
            Ok(index) => Segment::Index(index),
            Err(_) => Segment::Name(part),
        })
        .collect();
    (segments, suffix)
}

enum Cursor {
    Node(Node),
    Many(Vec<Node>),
}

impl Cursor {
    fn step(self, segment: &Segment<'_>) -> Option<Self> {
        match (self, segment) {
            (Self::Many(mut nodes), Segment::Index(index)) => {
                let len = isize::try_from(nodes.len()).ok()?;
                let position = if *index < 0 { len + index } else { *index };
                let position = usize::try_from(position).ok()?;
                (position < nodes.len()).then(|| Self::Node(nodes.swap_remove(position)))
            }
            (Self::Node(Node::Container(container)), Segment::Name(name)) => {
                lookup_cursor(container.get(name))
            }
            (Self::Node(Node::Container(container)), Segment::Index(index)) => {
                lookup_cursor(container.get(&index.to_string()))
            }
            _ => None,
        }
    }

    fn into_found(self) -> Found {
        match self {
            Self::Node(node) => Found::One(node),
            Self::Many(nodes) => Found::Many(nodes),
        }
    }
}

fn lookup_cursor(lookup: Lookup) -> Option<Cursor> {
    match lookup {
        Lookup::NotFound => None,
        Lookup::One(node) => Some(Cursor::Node(node)),
        Lookup::Many(nodes) => Some(Cursor::Many(nodes)),
    }
}

/// Follow `path` from `container`
///
/// Without a default, a miss yields [`Found::Missing`] for node paths and
/// `Found::Value(None)` for `#text`/`@name` paths.
pub fn sget(container: &Container, path: &str, default: Option<Value>) -> Found {
    let (segments, suffix) = parse_path(path);

    let miss = |default: Option<Value>| {
        trace!("path {:?} not found", path);
        match (default, &suffix) {
            (Some(value), _) => Found::Default(value),
            (None, Some(_)) => Found::Value(None),
            (None, None) => Found::Missing(&NULL_NODE),
        }
    };

    let reached = segments
        .iter()
        .try_fold(Cursor::Node(Node::Container(container.clone())), |cursor, segment| {
            cursor.step(segment)
        });
    let Some(cursor) = reached else {
        return miss(default);
    };

    match (suffix, cursor) {
        (None, cursor) => cursor.into_found(),
        (Some(_), Cursor::Many(_)) => Found::Value(None),
        (Some(Suffix::Text), Cursor::Node(node)) => Found::Value(node.element().text()),
        (Some(Suffix::Attribute(name)), Cursor::Node(node)) => {
            Found::Value(node.element().attribute(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Result<Container> {
        Container::from_markup(
            "<root><tag attr1=\"attr text\">text value</tag><list><i>1</i><i>2</i><i>3</i></list></root>",
        )
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("a.-1.@x"),
            (
                vec![Segment::Name("a"), Segment::Index(-1)],
                Some(Suffix::Attribute("x"))
            )
        );
        assert_eq!(parse_path("a.#text").1, Some(Suffix::Text));
        assert_eq!(parse_path("a.b").1, None);
    }

    #[test]
    fn test_reads_leaf_attribute_and_text() -> Result<()> {
        let root = tree()?;
        let leaf = root.sget("tag");
        assert_eq!(leaf.text(), Some("text value".to_string()));
        assert_eq!(root.sget("tag.@attr1").as_text(), Some("attr text"));
        assert_eq!(root.sget("tag.#text").as_text(), Some("text value"));
        Ok(())
    }

    #[test]
    fn test_missing_paths() -> Result<()> {
        let root = tree()?;
        assert!(root.sget("a.b.c").is_missing());
        assert_eq!(root.sget_or("a.b.c", "dflt").as_text(), Some("dflt"));
        assert_eq!(root.sget("a.b.#text"), Found::Value(None));
        assert_eq!(root.sget("tag.child"), Found::Missing(&NULL_NODE));
        assert_eq!(root.sget("a").to_int()?, None);
        Ok(())
    }

    #[test]
    fn test_index_segments() -> Result<()> {
        let root = tree()?;
        assert_eq!(root.sget("list.i.0").to_int()?, Some(1));
        assert_eq!(root.sget("list.i.-1").to_int()?, Some(3));
        assert!(root.sget("list.i.3").is_missing());
        assert!(root.sget("list.i.-4").is_missing());
        assert_eq!(root.sget("list.i.#text"), Found::Value(None));
        assert!(root.sget("tag.0").is_missing());
        Ok(())
    }

    #[test]
    fn test_contains() -> Result<()> {
        let root = tree()?;
        assert!(root.contains("tag"));
        assert!(root.contains("tag.@attr1"));
        assert!(!root.contains("tag.@nope"));
        assert!(!root.contains("nope"));
        Ok(())
    }

    #[test]
    fn test_null_node_conversions() {
        assert!(!NULL_NODE.is_truthy());
        assert_eq!(NULL_NODE.to_int(), None);
        assert_eq!(NULL_NODE.to_value(), None);
        assert_eq!(format!("{:?}", NULL_NODE), "NULL_NODE");
        assert!(!Found::Missing(&NULL_NODE).is_truthy());
    }
}

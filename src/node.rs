//! Views over tree elements
//!
//! A [`Node`] wraps one element and is either a [`Leaf`] (no element
//! children) or a [`Container`]. Nodes are cheap handles created on demand;
//! the element tree itself is the only persistent state.

pub mod container;
pub mod leaf;

use std::fmt;

pub use container::{Container, Lookup, Source, RESERVED_NAMES};
pub use leaf::Leaf;

use crate::codec::Scalar;
use crate::error::{Error, Result};
use crate::markup::Element;
use crate::value::{ATTRIBUTE_PREFIX, TEXT_KEY};

/// Attribute name that addresses the element text
pub const TEXT_ATTRIBUTE: &str = "text";

/// True for `@name` and `#...` keys, which address attributes or text
pub fn is_key_attr_or_text(key: &str) -> bool {
    key.starts_with(ATTRIBUTE_PREFIX) || key.starts_with('#')
}

/// Access shared by every node kind
pub trait ElementView {
    /// The wrapped element
    fn element(&self) -> &Element;

    fn tag(&self) -> String {
        self.element().tag()
    }

    /// Attribute `key`, or the element text when `key` is `text`
    fn attribute(&self, key: &str) -> Option<String> {
        if key == TEXT_ATTRIBUTE {
            self.element().text()
        } else {
            self.element().attribute(key)
        }
    }

    fn attribute_or(&self, key: &str, default: &str) -> String {
        self.attribute(key).unwrap_or_else(|| default.to_string())
    }

    /// Set attribute `key` (the text when `key` is `text`) through the codec
    fn set_attribute(&self, key: &str, value: impl Into<Scalar>)
    where
        Self: Sized,
    {
        let text = value.into().to_text();
        if key == TEXT_ATTRIBUTE {
            self.element().set_text(Some(text));
        } else {
            self.element().set_attribute(key, text);
        }
    }

    /// Read `@name` or `#text`
    fn marked(&self, key: &str) -> Result<Option<String>> {
        let name = marker_name(key)?;
        Ok(self.attribute(name))
    }

    /// Write `@name` or `#text`
    fn set_marked(&self, key: &str, value: impl Into<Scalar>) -> Result<()>
    where
        Self: Sized,
    {
        let name = marker_name(key)?;
        self.set_attribute(name, value);
        Ok(())
    }
}

fn marker_name(key: &str) -> Result<&str> {
    if key == TEXT_KEY {
        return Ok(TEXT_ATTRIBUTE);
    }
    match key.strip_prefix(ATTRIBUTE_PREFIX) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(Error::argument(format!(
            "only @attribute and {TEXT_KEY} keys are allowed here, got {key:?}"
        ))),
    }
}

/// A leaf or a container
#[derive(Clone, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Container(Container),
}

impl Node {
    /// Classify `element` by whether it has element children
    pub fn from_element(element: Element) -> Self {
        if element.has_element_children() {
            Self::Container(Container::from_element(element))
        } else {
            Self::Leaf(Leaf::new(element))
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container(_))
    }

    /// The leaf, if this is one
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Container(_) => None,
        }
    }

    /// The container, if this is one
    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Container(container) => Some(container),
            Self::Leaf(_) => None,
        }
    }

    /// Empty containers and leaves with empty text are false-like
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.is_truthy(),
            Self::Container(container) => container.is_truthy(),
        }
    }

    /// Read `@name` or `#text`
    pub fn item(&self, key: &str) -> Result<Option<String>> {
        self.marked(key)
    }

    /// Write `@name` or `#text`
    pub fn set_item(&self, key: &str, value: impl Into<Scalar>) -> Result<()> {
        self.set_marked(key, value)
    }
}

impl ElementView for Node {
    fn element(&self) -> &Element {
        match self {
            Self::Leaf(leaf) => leaf.element(),
            Self::Container(container) => container.element(),
        }
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<Container> for Node {
    fn from(container: Container) -> Self {
        Self::Container(container)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => fmt::Debug::fmt(leaf, f),
            Self::Container(container) => fmt::Debug::fmt(container, f),
        }
    }
}

/// `<tag a="v"> (n)`, or `<tag a="v"/> (0)` without element children
pub(crate) fn describe(element: &Element, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{}", element.tag())?;
    for (name, value) in element.attributes() {
        write!(f, " {name}=\"{value}\"")?;
    }
    let count = element.element_count();
    let close = if count == 0 { "/" } else { "" };
    write!(f, "{close}> ({count})")
}

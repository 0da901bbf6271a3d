//! Leaf nodes: elements without element children

use std::fmt;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use time::{Date, Time};

use crate::codec::{self, DateTimeValue, FromText, Scalar};
use crate::error::Result;
use crate::markup::Element;
use crate::node::ElementView;

/// A node holding text
#[derive(Clone)]
pub struct Leaf {
    element: Element,
}

impl Leaf {
    /// Wrap an element
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    /// Text, if non-empty
    pub fn get(&self) -> Option<String> {
        self.element.text().filter(|text| !text.is_empty())
    }

    /// Text, or `default` when it is empty or missing
    pub fn get_or(&self, default: &str) -> String {
        self.get().unwrap_or_else(|| default.to_string())
    }

    /// Replace the text with a codec-formatted value
    pub fn set(&self, value: impl Into<Scalar>) {
        self.element.set_text(Some(value.into().to_text()));
    }

    /// Length of the text in characters
    pub fn text_len(&self) -> usize {
        self.element.text().map_or(0, |text| text.chars().count())
    }

    /// False for empty text
    pub fn is_truthy(&self) -> bool {
        self.get().is_some()
    }

    /// Parse the text as `T`; a missing text parses as an empty string
    pub fn parse<T: FromText>(&self) -> Result<T> {
        T::from_text(&self.element.text().unwrap_or_default())
    }

    /// Raw text, empty when missing
    pub fn to_str(&self) -> String {
        self.element.text().unwrap_or_default()
    }

    /// Text read with the boolean mnemonics
    pub fn to_bool(&self) -> bool {
        codec::to_bool(&self.to_str())
    }

    pub fn to_int(&self) -> Result<i64> {
        self.parse()
    }

    pub fn to_float(&self) -> Result<f64> {
        self.parse()
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        self.parse()
    }

    pub fn to_time(&self) -> Result<Time> {
        self.parse()
    }

    pub fn to_date(&self) -> Result<Date> {
        self.parse()
    }

    pub fn to_datetime(&self) -> Result<DateTimeValue> {
        self.parse()
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

impl ElementView for Leaf {
    fn element(&self) -> &Element {
        &self.element
    }
}

/// Same tag, parent, text, attributes and position among the parent's children
impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        let same_parent = match (self.element.parent(), other.element.parent()) {
            (Some(a), Some(b)) => a.ptr_eq(&b),
            (None, None) => true,
            _ => false,
        };
        same_parent
            && self.element.tag() == other.element.tag()
            && self.element.text() == other.element.text()
            && self.element.attributes() == other.element.attributes()
            && self.element.index_in_parent() == other.element.index_in_parent()
    }
}

impl Eq for Leaf {}

impl Hash for Leaf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.element.parent() {
            Some(parent) => std::ptr::hash(parent.as_ptr(), state),
            None => std::ptr::hash(std::ptr::null::<()>(), state),
        }
        self.element.index_in_parent().hash(state);
        self.element.tag().hash(state);
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::ErrorKind;

    fn siblings() -> (Element, Leaf, Leaf) {
        let root = Element::new("root");
        let first = root.append_new("dup");
        first.set_text(Some("same".to_string()));
        let second = root.append_new("dup");
        second.set_text(Some("same".to_string()));
        (root, Leaf::new(first), Leaf::new(second))
    }

    #[test]
    fn test_equality_is_position_sensitive() {
        let (root, first, second) = siblings();
        assert_ne!(first, second);

        let again = root.children().first().cloned().map(Leaf::new);
        assert_eq!(again.as_ref(), Some(&first));
    }

    #[test]
    fn test_hash_matches_equality() {
        let (root, first, second) = siblings();
        let mut set = HashSet::new();
        set.insert(first.clone());
        set.insert(second);
        set.insert(Leaf::new(root.element_children().remove(0)));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&first));
    }

    #[test]
    fn test_typed_conversions() -> Result<()> {
        let element = Element::new("n");
        let leaf = Leaf::new(element);

        leaf.set(42);
        assert_eq!(leaf.to_int()?, 42);
        assert_eq!(leaf.to_float()?, 42.0);
        assert_eq!(leaf.to_decimal()?, Decimal::from(42));

        leaf.set("YES");
        assert!(leaf.to_bool());
        assert_eq!(
            leaf.to_int().map_err(|e| e.kind().clone()),
            Err(ErrorKind::Conversion)
        );
        Ok(())
    }

    #[test]
    fn test_empty_leaf() {
        let leaf = Leaf::new(Element::new("n"));
        assert!(!leaf.is_truthy());
        assert_eq!(leaf.get(), None);
        assert_eq!(leaf.get_or("fallback"), "fallback");
        assert_eq!(leaf.text_len(), 0);
        assert_eq!(
            leaf.to_date().map_err(|e| e.kind().clone()),
            Err(ErrorKind::EmptyValue)
        );
    }

    #[test]
    fn test_display_concatenates() {
        let leaf = Leaf::new(Element::new("n"));
        leaf.set("abc");
        assert_eq!(format!("{leaf}def"), "abcdef");
        assert_eq!(leaf.text_len(), 3);
    }
}

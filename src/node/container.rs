//! Containers: nodes that hold children, with the mutation API

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::alias::AliasTable;
use crate::codec::Scalar;
use crate::convert::{self, ConvertOptions};
use crate::error::{Error, ErrorKind, Result};
use crate::markup::{self, canonical_string, select, Element, WriteOptions};
use crate::node::{describe, is_key_attr_or_text, ElementView, Node};
use crate::path::{self, Found};
use crate::value::{Map, Value};

/// Names of container operations; children with these tags are never
/// removed by [`Container::delete`] or [`Container::remove`]
pub const RESERVED_NAMES: &[&str] = &[
    "aliases",
    "children",
    "contains",
    "create",
    "deep_copy",
    "delete",
    "get",
    "has_children",
    "item",
    "iter_children",
    "lookup_exact",
    "remove",
    "set",
    "set_item",
    "sget",
    "sget_or",
    "tag",
    "to_markup",
    "to_value",
    "update",
    "xpath",
    "xpath_regex",
];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Input accepted when building a container
#[derive(Clone, Debug)]
pub enum Source {
    Element(Element),
    Markup(String),
    Value(Value),
}

impl From<Element> for Source {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for Source {
    fn from(markup: &str) -> Self {
        Self::Markup(markup.to_string())
    }
}

impl From<String> for Source {
    fn from(markup: String) -> Self {
        Self::Markup(markup)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Map> for Source {
    fn from(map: Map) -> Self {
        Self::Value(Value::Map(map))
    }
}

/// Result of a name lookup
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    NotFound,
    One(Node),
    Many(Vec<Node>),
}

impl Lookup {
    fn from_elements(elements: Vec<Element>) -> Self {
        let mut nodes: Vec<Node> = elements.into_iter().map(Node::from_element).collect();
        match nodes.len() {
            0 => Self::NotFound,
            1 => nodes.pop().map_or(Self::NotFound, Self::One),
            _ => Self::Many(nodes),
        }
    }

    /// True unless nothing matched
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// Number of matched nodes
    pub fn len(&self) -> usize {
        match self {
            Self::NotFound => 0,
            Self::One(_) => 1,
            Self::Many(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single match, if there is exactly one
    pub fn one(&self) -> Option<&Node> {
        match self {
            Self::One(node) => Some(node),
            _ => None,
        }
    }

    /// The first match in document order
    pub fn first(&self) -> Option<&Node> {
        match self {
            Self::NotFound => None,
            Self::One(node) => Some(node),
            Self::Many(nodes) => nodes.first(),
        }
    }

    /// All matches in document order
    pub fn into_vec(self) -> Vec<Node> {
        match self {
            Self::NotFound => Vec::new(),
            Self::One(node) => vec![node],
            Self::Many(nodes) => nodes,
        }
    }
}

/// A node that may have children
pub struct Container {
    element: Element,
    aliases: Mutex<Option<AliasTable>>,
}

impl Container {
    /// Build a container from an element, markup text or a map
    #[instrument(level = "debug", skip_all)]
    pub fn new(source: impl Into<Source>) -> Result<Self> {
        match source.into() {
            Source::Element(element) => Ok(Self::from_element(element)),
            Source::Markup(markup) => Self::from_markup(&markup),
            Source::Value(value) => Self::from_value(&value),
        }
    }

    /// Wrap an existing element; the tree is shared, not copied
    pub fn from_element(element: Element) -> Self {
        Self {
            element,
            aliases: Mutex::new(None),
        }
    }

    /// Parse markup text into a new tree
    pub fn from_markup(markup: &str) -> Result<Self> {
        let element = markup::parse(markup)?;
        debug!("parsed markup rooted at <{}>", element.tag());
        Ok(Self::from_element(element))
    }

    /// Build from a map; a single key names the root, otherwise the root is `root`
    pub fn from_value(value: &Value) -> Result<Self> {
        convert::value_to_element(value).map(Self::from_element)
    }

    /// Number of element children
    pub fn len(&self) -> usize {
        self.element.element_count()
    }

    /// True when there are no element children
    pub fn is_empty(&self) -> bool {
        !self.has_children()
    }

    /// True when at least one element child exists; comments do not count
    pub fn has_children(&self) -> bool {
        self.element.has_element_children()
    }

    /// A container without children is false-like
    pub fn is_truthy(&self) -> bool {
        self.has_children()
    }

    fn with_aliases<R>(&self, f: impl FnOnce(&AliasTable) -> R) -> R {
        let mut cache = self.aliases.lock();
        let table = match cache.take() {
            Some(table) if table.is_current(&self.element) => table,
            _ => AliasTable::build(&self.element),
        };
        let result = f(&table);
        *cache = Some(table);
        result
    }

    /// Normalized names of the children
    pub fn aliases(&self) -> Vec<String> {
        self.with_aliases(|table| table.names().map(str::to_string).collect())
    }

    fn resolve(&self, name: &str) -> Option<String> {
        self.with_aliases(|table| table.resolve(name).map(str::to_string))
    }

    /// Children addressed by normalized name
    pub fn get(&self, name: &str) -> Lookup {
        match self.resolve(name) {
            Some(tag) => self.lookup_exact(&tag),
            None => Lookup::NotFound,
        }
    }

    /// Children with exactly this tag
    pub fn lookup_exact(&self, tag: &str) -> Lookup {
        Lookup::from_elements(self.element.children_by_tag(tag))
    }

    /// Dictionary-style access
    ///
    /// `@name` and `#text` read the attribute or text. Any other key is an
    /// exact tag: a single leaf yields its text, a single container yields
    /// itself, and several children yield all of them.
    pub fn item(&self, key: &str) -> Result<Found> {
        if is_key_attr_or_text(key) {
            return self.marked(key).map(Found::Value);
        }
        Ok(match self.lookup_exact(key) {
            Lookup::NotFound => Found::Many(Vec::new()),
            Lookup::One(Node::Leaf(leaf)) => Found::Value(leaf.get()),
            Lookup::One(node) => Found::One(node),
            Lookup::Many(nodes) => Found::Many(nodes),
        })
    }

    /// `@name`/`#text` write the attribute or text; any other key is [`Container::set`]
    pub fn set_item(&self, key: &str, value: impl Into<Value>) -> Result<Node> {
        let value = value.into();
        if !is_key_attr_or_text(key) {
            return self.set(key, value);
        }
        let text = value
            .as_text()
            .ok_or_else(|| Error::argument(format!("{key} takes text, got {value:?}")))?;
        self.set_marked(key, Scalar::from(text))?;
        Ok(Node::Container(self.clone()))
    }

    /// Children, optionally filtered by tag
    ///
    /// With `exact` the key is a literal tag; otherwise it is a normalized
    /// name and an unknown name is an error.
    pub fn children(&self, key: Option<&str>, exact: bool) -> Result<Vec<Node>> {
        let elements = match key {
            None => self.element.element_children(),
            Some(tag) if exact => self.element.children_by_tag(tag),
            Some(name) => {
                let tag = self
                    .resolve(name)
                    .ok_or_else(|| Error::argument(format!("no child named {name}")))?;
                self.element.children_by_tag(&tag)
            }
        };
        Ok(elements.into_iter().map(Node::from_element).collect())
    }

    /// Iterator over [`Container::children`]
    pub fn iter_children(
        &self,
        key: Option<&str>,
        exact: bool,
    ) -> Result<impl Iterator<Item = Node>> {
        self.children(key, exact).map(Vec::into_iter)
    }

    /// Overwrite the text of children found by name, or append a child
    /// with the exact key when none exist
    #[instrument(level = "debug", skip_all)]
    pub fn update<K, V>(&self, fields: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Scalar>,
    {
        for (key, value) in fields {
            let key = key.as_ref();
            if key.is_empty() {
                return Err(Error::argument("cannot update a field without a name"));
            }
            let text = value.into().to_text();
            let tag = self.resolve(key).unwrap_or_else(|| key.to_string());

            let elements = self.element.children_by_tag(&tag);
            if elements.is_empty() {
                debug!("update appends <{}>", key);
                self.element.append_new(key).set_text(Some(text));
            } else {
                for element in elements {
                    element.set_text(Some(text.clone()));
                }
            }
        }
        Ok(())
    }

    /// Like [`Container::set`], but fails if a child with exactly this tag exists
    #[instrument(level = "debug", skip(self, value))]
    pub fn create(&self, tag: &str, value: impl Into<Value>) -> Result<Node> {
        if self.element.first_child_by_tag(tag).is_some() {
            return Err(Error::new(ErrorKind::DuplicateChild {
                tag: tag.to_string(),
            }));
        }
        self.set(tag, value)
    }

    /// Assign a value to the first child tagged exactly `name`, creating it if needed
    ///
    /// The child is always replaced by a freshly built element:
    ///
    /// - a map is materialized into it;
    /// - a list supplies its children (each item is materialized into a
    ///   scratch element whose children are moved over);
    /// - text becomes its text, null leaves it empty.
    #[instrument(level = "debug", skip(self, value))]
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<Node> {
        if name.is_empty() || is_key_attr_or_text(name) {
            return Err(Error::argument(format!("{name:?} is not a valid tag")));
        }

        let fresh = Element::new(name);
        match value.into() {
            Value::Null => {}
            Value::Text(text) => fresh.set_text(Some(text).filter(|t| !t.is_empty())),
            Value::List(items) => convert::materialize_children(&items, &fresh)?,
            map @ Value::Map(_) => convert::materialize(&map, &fresh)?,
        }

        match self.element.first_child_by_tag(name) {
            Some(existing) => {
                fresh.set_tail(existing.tail());
                self.element.replace_child(&existing, &fresh);
            }
            None => self.element.append(&fresh),
        }
        Ok(Node::from_element(fresh))
    }

    /// Remove all children found by name; returns how many were removed
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, name: &str) -> usize {
        let tag = self.resolve(name).unwrap_or_else(|| name.to_string());
        self.remove(&tag)
    }

    /// Remove all children tagged exactly `tag`; returns how many were removed
    pub fn remove(&self, tag: &str) -> usize {
        if is_reserved(tag) {
            warn!("refusing to remove children named after operation {}", tag);
            return 0;
        }
        self.element.remove_children_by_tag(tag)
    }

    /// True when `path` leads to a node or a present attribute/text
    pub fn contains(&self, path: &str) -> bool {
        self.sget(path).is_present()
    }

    /// Follow a dotted path; misses yield [`crate::NULL_NODE`]
    pub fn sget(&self, path: &str) -> Found {
        path::sget(self, path, None)
    }

    /// Follow a dotted path; misses yield `default`
    pub fn sget_or(&self, path: &str, default: impl Into<Value>) -> Found {
        path::sget(self, path, Some(default.into()))
    }

    /// Evaluate a location path relative to this container
    pub fn xpath(&self, expr: &str) -> Result<Lookup> {
        select(&self.element, expr, false).map(Lookup::from_elements)
    }

    /// Like [`Container::xpath`], with `re:test()` predicates enabled
    pub fn xpath_regex(&self, expr: &str) -> Result<Lookup> {
        select(&self.element, expr, true).map(Lookup::from_elements)
    }

    /// Value of this container's content (its own tag is not included)
    pub fn to_value(&self) -> Value {
        self.to_value_with(&ConvertOptions::default())
    }

    /// Like [`Container::to_value`], with explicit conversion options
    pub fn to_value_with(&self, options: &ConvertOptions) -> Value {
        convert::to_value(&self.element, options)
    }

    /// Compact markup with comments and ASCII character references
    pub fn to_markup(&self) -> String {
        self.to_markup_with(&WriteOptions::default())
    }

    /// Markup rendered with explicit write options
    pub fn to_markup_with(&self, options: &WriteOptions) -> String {
        markup::serialize(&self.element, options)
    }

    /// Copy the whole subtree into a new detached tree
    pub fn deep_copy(&self) -> Self {
        Self::from_element(self.element.deep_copy())
    }
}

impl ElementView for Container {
    fn element(&self) -> &Element {
        &self.element
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Self::from_element(self.element.clone())
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.element.ptr_eq(&other.element)
            || canonical_string(&self.element) == canonical_string(&other.element)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(&self.element, f)
    }
}

impl std::str::FromStr for Container {
    type Err = Error;

    fn from_str(markup: &str) -> Result<Self> {
        Self::from_markup(markup)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Container;

    impl Serialize for Container {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_markup())
        }
    }

    impl<'de> Deserialize<'de> for Container {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let markup = String::deserialize(deserializer)?;
            Self::from_markup(&markup).map_err(D::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARS: &str = "<root><Car-Model>T</Car-Model><wheels>4</wheels><wheels>5</wheels></root>";

    #[test]
    fn test_alias_lookup() -> Result<()> {
        let root = Container::from_markup(CARS)?;
        assert!(matches!(root.get("car_model"), Lookup::One(Node::Leaf(_))));
        assert_eq!(root.get("wheels").len(), 2);
        assert_eq!(root.get("Car-Model"), Lookup::NotFound);
        assert!(root.lookup_exact("Car-Model").is_found());
        assert_eq!(root.aliases(), vec!["car_model", "wheels"]);
        Ok(())
    }

    #[test]
    fn test_alias_cache_follows_mutations() -> Result<()> {
        let root = Container::from_markup(CARS)?;
        assert!(!root.get("new_tag").is_found());
        root.set("New-Tag", "x")?;
        assert!(root.get("new_tag").is_found());
        root.delete("new_tag");
        assert!(!root.get("new_tag").is_found());
        Ok(())
    }

    #[test]
    fn test_item_access() -> Result<()> {
        let root = Container::from_markup("<r a=\"1\"><x>t</x><y><z/></y></r>")?;
        assert_eq!(root.item("@a")?.as_text(), Some("1"));
        assert_eq!(root.item("x")?.as_text(), Some("t"));
        assert!(matches!(root.item("y")?, Found::One(Node::Container(_))));
        assert!(matches!(root.item("missing")?, Found::Many(ref nodes) if nodes.is_empty()));
        Ok(())
    }

    #[test]
    fn test_create_rejects_duplicates() -> Result<()> {
        let root = Container::from_markup(CARS)?;
        let err = root.create("wheels", "6").err().map(|e| e.kind().clone());
        assert_eq!(
            err,
            Some(ErrorKind::DuplicateChild {
                tag: "wheels".to_string()
            })
        );

        root.create("car_model", "distinct")?;
        assert_eq!(root.lookup_exact("Car-Model").len(), 1);
        assert_eq!(root.lookup_exact("car_model").len(), 1);
        Ok(())
    }

    #[test]
    fn test_update_by_alias_and_exact() -> Result<()> {
        let root = Container::from_markup(CARS)?;
        root.update([("car_model", Scalar::from("S")), ("wheels", Scalar::from(3))])?;
        assert_eq!(
            root.to_markup(),
            "<root><Car-Model>S</Car-Model><wheels>3</wheels><wheels>3</wheels></root>"
        );

        root.update([("doors", true)])?;
        assert_eq!(root.item("doors")?.as_text(), Some("YES"));
        Ok(())
    }

    #[test]
    fn test_set_map_replaces_element() -> Result<()> {
        let root = Container::from_markup("<root><head old=\"1\"><x/></head><tail/></root>")?;
        let value = Map::new()
            .with("a", "A")
            .with("b", Map::new().with("#text", "B").with("@attr", "val"));
        root.set("head", value)?;
        assert_eq!(
            root.to_markup(),
            "<root><head><a>A</a><b attr=\"val\">B</b></head><tail/></root>"
        );
        Ok(())
    }

    #[test]
    fn test_set_sequence_and_literal() -> Result<()> {
        let root = Container::from_markup("<root/>")?;
        let items: Vec<Value> = ["A", "B", "C"]
            .into_iter()
            .map(|text| Map::new().with("a", text).into())
            .collect();
        root.set("head", items)?;
        assert_eq!(
            root.to_markup(),
            "<root><head><a>A</a><a>B</a><a>C</a></head></root>"
        );

        root.set("head", 7)?;
        assert_eq!(root.to_markup(), "<root><head>7</head></root>");

        root.set("head", Value::Null)?;
        assert_eq!(root.to_markup(), "<root><head/></root>");
        Ok(())
    }

    #[test]
    fn test_delete_skips_reserved_names() -> Result<()> {
        let root = Container::from_markup("<root><update/><set/><x/><x/></root>")?;
        assert_eq!(root.delete("update"), 0);
        assert_eq!(root.remove("set"), 0);
        assert_eq!(root.delete("x"), 2);
        assert_eq!(root.len(), 2);
        Ok(())
    }

    #[test]
    fn test_children_filters() -> Result<()> {
        let root = Container::from_markup(CARS)?;
        assert_eq!(root.children(None, false)?.len(), 3);
        assert_eq!(root.children(Some("wheels"), false)?.len(), 2);
        assert_eq!(root.children(Some("Car-Model"), true)?.len(), 1);
        assert!(root.children(Some("Car-Model"), false).is_err());
        assert_eq!(root.iter_children(Some("car_model"), false)?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_equality_and_copy() -> Result<()> {
        let root = Container::from_markup(CARS)?;
        let copy = root.deep_copy();
        assert_eq!(root, copy);
        copy.delete("wheels");
        assert_ne!(root, copy);
        Ok(())
    }

    #[test]
    fn test_construction_sources() -> Result<()> {
        let from_value = Container::new(
            Map::new().with("a", Map::new().with("#text", "list_elem_1").with("@attr1", "val1")),
        )?;
        assert_eq!(from_value.to_markup(), "<a attr1=\"val1\">list_elem_1</a>");

        let err = Container::new(Value::from("nope")).err().map(|e| e.kind().clone());
        assert_eq!(err, Some(ErrorKind::Construction));
        assert!(Container::new("<broken").is_err());
        Ok(())
    }
}

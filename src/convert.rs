//! Element <-> value conversion
//!
//! Forward conversion groups children by tag (a group of one collapses to
//! the bare value), maps attributes to `@name` keys and comments to
//! `#comments`. Reverse conversion ("materialization") rebuilds elements
//! from a value, attaching them to an existing target element.
//!
//! Lists are the delicate part of the reverse direction. For `{"t": [..]}`
//! one empty `t` child is created up front and becomes the current target:
//!
//! - a null item at index 0 reuses it, a later null item appends a fresh
//!   empty `t` without moving the current target;
//! - any other item at index 0 fills it; later items get a new `t` which
//!   becomes the current target, unless the item is a non-empty map of
//!   falsy values, which is merged into the current target instead.
//!
//! So `[null, null, {"#text": "t"}]` yields exactly three `t` elements.

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::error::{Error, ErrorKind, Result};
use crate::markup::Element;
use crate::value::{Map, Value, ATTRIBUTE_PREFIX, COMMENTS_KEY, TEXT_KEY};

/// Tag given to the root when a value has to be wrapped
pub const DEFAULT_ROOT_TAG: &str = "root";

/// Options for element -> value conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Strip surrounding whitespace from text
    pub trim: bool,
    /// Keep comment children under `#comments`
    pub with_comments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            trim: true,
            with_comments: true,
        }
    }
}

impl ConvertOptions {
    /// Strip surrounding whitespace from text
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Keep comment children under `#comments`
    pub fn with_comments(mut self, with_comments: bool) -> Self {
        self.with_comments = with_comments;
        self
    }
}

/// Convert `element` (without its own tag) into a value
pub fn to_value(element: &Element, options: &ConvertOptions) -> Value {
    let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
    let mut comments = Vec::new();

    for child in element.children() {
        if child.is_comment() {
            if options.with_comments {
                comments.push(Value::Text(child.text().unwrap_or_default()));
            }
            continue;
        }
        groups
            .entry(child.tag())
            .or_default()
            .push(to_value(&child, options));
    }

    let attributes = element.attributes();
    let text = element
        .text()
        .map(|text| {
            if options.trim {
                text.trim().to_string()
            } else {
                text
            }
        })
        .filter(|text| !text.is_empty());

    if attributes.is_empty() && groups.is_empty() && comments.is_empty() {
        return text.map_or(Value::Null, Value::Text);
    }

    let mut map = Map::with_capacity(attributes.len() + groups.len() + 2);
    for (name, value) in attributes {
        map.insert(format!("{ATTRIBUTE_PREFIX}{name}"), value);
    }
    if let Some(text) = text {
        map.insert(TEXT_KEY, text);
    }
    for (tag, mut values) in groups {
        let value = match values.len() {
            1 => values.pop().unwrap_or_default(),
            _ => Value::List(values),
        };
        map.insert(tag, value);
    }
    match comments.len() {
        0 => {}
        1 => {
            map.insert(COMMENTS_KEY, comments.pop().unwrap_or_default());
        }
        _ => {
            map.insert(COMMENTS_KEY, Value::List(comments));
        }
    }
    Value::Map(map)
}

/// Materialize `value` into `target`
///
/// Null and empty values leave `target` untouched. Text becomes the
/// element text, and a map adds attributes, text, comments and children.
pub fn materialize(value: &Value, target: &Element) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Text(text) if text.is_empty() => Ok(()),
        Value::Text(text) => {
            target.set_text(Some(text.clone()));
            Ok(())
        }
        Value::List(items) if items.is_empty() => Ok(()),
        Value::List(_) => Err(Error::argument(format!(
            "a list cannot be the content of <{}>; wrap it in a map",
            target.tag()
        ))),
        Value::Map(map) => map
            .iter()
            .try_for_each(|(key, value)| materialize_entry(key, value, target)),
    }
}

fn materialize_entry(key: &str, value: &Value, target: &Element) -> Result<()> {
    if key == TEXT_KEY {
        let text = value
            .as_text()
            .ok_or_else(|| Error::argument(format!("{TEXT_KEY} must be text, got {value:?}")))?;
        target.set_text(Some(text.to_string()));
        return Ok(());
    }

    if key == COMMENTS_KEY {
        return materialize_comments(value, target);
    }

    if key.starts_with('#') {
        return Err(Error::argument(format!("unsupported reserved key {key}")));
    }

    if let Some(name) = key.strip_prefix(ATTRIBUTE_PREFIX) {
        if name.is_empty() {
            return Err(Error::argument("attribute key without a name"));
        }
        let text = value
            .as_text()
            .ok_or_else(|| Error::argument(format!("attribute {key} must be text, got {value:?}")))?;
        target.set_attribute(name, text);
        return Ok(());
    }

    if key.is_empty() {
        return Err(Error::argument("empty tag name"));
    }

    match value {
        Value::List(items) => materialize_repeated(key, items, target),
        other => materialize(other, &target.append_new(key)),
    }
}

fn materialize_comments(value: &Value, target: &Element) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Text(text) => append_comment(text, target),
        Value::List(items) => items
            .iter()
            .try_for_each(|item| materialize_comments_item(item, target)),
        Value::Map(_) => Err(Error::argument(format!(
            "{COMMENTS_KEY} must be text or a list of text"
        ))),
    }
}

fn materialize_comments_item(item: &Value, target: &Element) -> Result<()> {
    let text = item
        .as_text()
        .ok_or_else(|| Error::argument(format!("comment must be text, got {item:?}")))?;
    append_comment(text, target)
}

/// Comment text may not contain `--` or end with `-`
fn append_comment(text: &str, target: &Element) -> Result<()> {
    if text.contains("--") || text.ends_with('-') {
        return Err(Error::argument(format!(
            "comment text cannot contain '--' or end with '-': {text:?}"
        )));
    }
    target.append(&Element::comment(text));
    Ok(())
}

/// A non-empty map whose entries are all falsy materializes like an empty element
fn is_placeholder_map(value: &Value) -> bool {
    value
        .as_map()
        .is_some_and(|map| !map.is_empty() && map.values().all(Value::is_falsy))
}

fn materialize_repeated(tag: &str, items: &[Value], parent: &Element) -> Result<()> {
    trace!("materializing {} repeated <{}> children", items.len(), tag);
    let mut current = parent.append_new(tag);

    for (index, item) in items.iter().enumerate() {
        if item.is_null() {
            if index > 0 {
                parent.append_new(tag);
            }
            continue;
        }
        if index > 0 && !is_placeholder_map(item) {
            current = parent.append_new(tag);
        }
        materialize(item, &current)?;
    }
    Ok(())
}

/// Materialize each item into a scratch element and move the resulting
/// children into `target`, so a sequence supplies the target's children
/// rather than repetitions of its own tag
pub fn materialize_children(items: &[Value], target: &Element) -> Result<()> {
    for item in items {
        let scratch = Element::new("temp");
        materialize(item, &scratch)?;
        for child in scratch.children() {
            target.append(&child);
        }
    }
    Ok(())
}

/// Build a new tree from a map
///
/// A single-key map names the root; any other map becomes the content of
/// a root tagged `root`. Reserved keys never name the root.
#[instrument(level = "debug", skip_all)]
pub fn value_to_element(value: &Value) -> Result<Element> {
    let Value::Map(map) = value else {
        return Err(Error::with_message(
            ErrorKind::Construction,
            format!("a tree can only be built from a map, got {value:?}"),
        ));
    };

    let root = match map.iter().next() {
        Some((tag, body)) if map.len() == 1 && !tag.starts_with(['#', ATTRIBUTE_PREFIX]) => {
            let root = Element::new(tag.clone());
            materialize(body, &root)?;
            root
        }
        _ => {
            let root = Element::new(DEFAULT_ROOT_TAG);
            materialize(value, &root)?;
            root
        }
    };
    debug!("built tree rooted at <{}>", root.tag());
    Ok(root)
}

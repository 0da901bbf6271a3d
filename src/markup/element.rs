//! Shared element handle
//!
//! An [`Element`] is a cheap, clonable handle to one node of a markup tree.
//! Clones point at the same node; use [`Element::deep_copy`] to duplicate a
//! subtree. Parents are held weakly, so a tree lives as long as some handle
//! to its root (or to any node below it that keeps the root reachable) does.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Ordered attribute map
pub type Attributes = IndexMap<String, String>;

/// Node kind stored in a tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Comment,
}

#[derive(Debug)]
struct ElementData {
    kind: NodeKind,
    tag: String,
    attributes: Attributes,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<Element>,
    parent: Weak<RwLock<ElementData>>,
    revision: u64,
}

impl ElementData {
    fn new(kind: NodeKind, tag: String) -> Self {
        Self {
            kind,
            tag,
            attributes: Attributes::new(),
            text: None,
            tail: None,
            children: Vec::new(),
            parent: Weak::new(),
            revision: 0,
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Handle to a markup element or comment
#[derive(Clone)]
pub struct Element(Arc<RwLock<ElementData>>);

impl Element {
    /// Create a detached element
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(ElementData::new(
            NodeKind::Element,
            tag.into(),
        ))))
    }

    /// Create a detached comment node holding `text`
    pub fn comment(text: impl Into<String>) -> Self {
        let mut data = ElementData::new(NodeKind::Comment, String::new());
        data.text = Some(text.into());
        Self(Arc::new(RwLock::new(data)))
    }

    /// Element or comment
    pub fn kind(&self) -> NodeKind {
        self.0.read().kind
    }

    pub fn is_comment(&self) -> bool {
        self.kind() == NodeKind::Comment
    }

    /// Tag name; empty for comments
    pub fn tag(&self) -> String {
        self.0.read().tag.clone()
    }

    /// Rename the element
    pub fn set_tag(&self, tag: impl Into<String>) {
        self.0.write().tag = tag.into();
    }

    /// Value of attribute `name`
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.read().attributes.get(name).cloned()
    }

    /// Copy of the attributes in document order
    pub fn attributes(&self) -> Attributes {
        self.0.read().attributes.clone()
    }

    pub fn has_attributes(&self) -> bool {
        !self.0.read().attributes.is_empty()
    }

    /// Insert or overwrite an attribute, keeping its position
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0.write().attributes.insert(name.into(), value.into());
    }

    /// Text before the first child (comment body for comments)
    pub fn text(&self) -> Option<String> {
        self.0.read().text.clone()
    }

    /// Replace the text
    pub fn set_text(&self, text: Option<String>) {
        self.0.write().text = text;
    }

    /// Text following this element's closing tag, inside its parent
    pub fn tail(&self) -> Option<String> {
        self.0.read().tail.clone()
    }

    pub fn set_tail(&self, tail: Option<String>) {
        self.0.write().tail = tail;
    }

    /// All children, comments included, in document order
    pub fn children(&self) -> Vec<Self> {
        self.0.read().children.clone()
    }

    /// Element children only
    pub fn element_children(&self) -> Vec<Self> {
        self.0
            .read()
            .children
            .iter()
            .filter(|child| !child.is_comment())
            .cloned()
            .collect()
    }

    /// Element children tagged exactly `tag`
    pub fn children_by_tag(&self, tag: &str) -> Vec<Self> {
        self.0
            .read()
            .children
            .iter()
            .filter(|child| !child.is_comment() && child.0.read().tag == tag)
            .cloned()
            .collect()
    }

    /// First element child tagged exactly `tag`
    pub fn first_child_by_tag(&self, tag: &str) -> Option<Self> {
        self.0
            .read()
            .children
            .iter()
            .find(|child| !child.is_comment() && child.0.read().tag == tag)
            .cloned()
    }

    /// Number of element children (comments excluded)
    pub fn element_count(&self) -> usize {
        self.0
            .read()
            .children
            .iter()
            .filter(|child| !child.is_comment())
            .count()
    }

    pub fn has_element_children(&self) -> bool {
        self.0.read().children.iter().any(|child| !child.is_comment())
    }

    /// Append `child`, detaching it from its previous parent first
    pub fn append(&self, child: &Self) {
        if self.ptr_eq(child) {
            return;
        }
        if let Some(previous) = child.parent() {
            previous.remove_child(child);
        }
        child.0.write().parent = Arc::downgrade(&self.0);
        let mut data = self.0.write();
        data.children.push(child.clone());
        data.touch();
    }

    /// Create an element tagged `tag` as the last child and return it
    pub fn append_new(&self, tag: impl Into<String>) -> Self {
        let child = Self::new(tag);
        self.append(&child);
        child
    }

    /// Swap `old` for `new` at the same position; returns false if `old` is not a child
    pub fn replace_child(&self, old: &Self, new: &Self) -> bool {
        if let Some(previous) = new.parent() {
            previous.remove_child(new);
        }
        let replaced = {
            let mut data = self.0.write();
            match data.children.iter().position(|child| child.ptr_eq(old)) {
                Some(index) => {
                    if let Some(slot) = data.children.get_mut(index) {
                        *slot = new.clone();
                    }
                    data.touch();
                    true
                }
                None => false,
            }
        };
        if replaced {
            old.0.write().parent = Weak::new();
            new.0.write().parent = Arc::downgrade(&self.0);
        }
        replaced
    }

    /// Detach `child`; returns false if it is not a child
    pub fn remove_child(&self, child: &Self) -> bool {
        let removed = {
            let mut data = self.0.write();
            match data.children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    data.children.remove(index);
                    data.touch();
                    true
                }
                None => false,
            }
        };
        if removed {
            child.0.write().parent = Weak::new();
        }
        removed
    }

    /// Remove every element child tagged `tag`, returning how many went
    pub fn remove_children_by_tag(&self, tag: &str) -> usize {
        let doomed = self.children_by_tag(tag);
        doomed
            .iter()
            .filter(|child| self.remove_child(child))
            .count()
    }

    /// Drop attributes, text and children; the tail is kept
    pub fn clear(&self) {
        let children = {
            let mut data = self.0.write();
            data.attributes.clear();
            data.text = None;
            data.touch();
            std::mem::take(&mut data.children)
        };
        for child in children {
            child.0.write().parent = Weak::new();
        }
    }

    /// Parent element, if attached and still alive
    pub fn parent(&self) -> Option<Self> {
        self.0.read().parent.upgrade().map(Self)
    }

    /// Position among all of the parent's children
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let data = parent.0.read();
        data.children.iter().position(|child| child.ptr_eq(self))
    }

    /// True if both handles point at the same node
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the underlying node, stable for the node's lifetime
    pub(crate) fn as_ptr(&self) -> *const () {
        Arc::as_ptr(&self.0).cast::<()>()
    }

    /// Counter bumped by every structural change to this node's children
    pub fn revision(&self) -> u64 {
        self.0.read().revision
    }

    /// Duplicate this subtree; the copy is detached and keeps no tail
    pub fn deep_copy(&self) -> Self {
        let data = self.0.read();
        let copy = Self(Arc::new(RwLock::new(ElementData {
            kind: data.kind,
            tag: data.tag.clone(),
            attributes: data.attributes.clone(),
            text: data.text.clone(),
            tail: None,
            children: Vec::new(),
            parent: Weak::new(),
            revision: 0,
        })));
        for child in &data.children {
            let child_copy = child.deep_copy();
            child_copy.set_tail(child.tail());
            copy.append(&child_copy);
        }
        copy
    }

    /// Topmost ancestor (or self)
    pub fn root(&self) -> Self {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Concatenated text of this node and all element descendants, tails included
    pub fn string_value(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    if let Some(text) = element.text() {
        out.push_str(&text);
    }
    for child in element.element_children() {
        collect_text(&child, out);
        if let Some(tail) = child.tail() {
            out.push_str(&tail);
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.read();
        match data.kind {
            NodeKind::Comment => write!(f, "Comment({:?})", data.text),
            NodeKind::Element => f
                .debug_struct("Element")
                .field("tag", &data.tag)
                .field("attributes", &data.attributes)
                .field("text", &data.text)
                .field("children", &data.children.len())
                .finish(),
        }
    }
}

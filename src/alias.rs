//! Normalized child names
//!
//! Tags such as `Car-Model` are awkward to address by name, so each
//! container keeps a table from the normalized form (`car_model`) to the
//! original tag. The table records the revision of the element it was
//! built from and is only valid while that revision is current.

use indexmap::IndexMap;

use crate::markup::Element;

/// Lowercase `tag` and turn hyphens into underscores
pub fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().replace('-', "_")
}

/// Normalized tag -> original tag for one element's direct children
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    revision: u64,
    names: IndexMap<String, String>,
}

impl AliasTable {
    /// Index `element`'s direct element children
    pub fn build(element: &Element) -> Self {
        let revision = element.revision();
        let mut names = IndexMap::new();
        for child in element.element_children() {
            let tag = child.tag();
            names.insert(normalize_tag(&tag), tag);
        }
        Self { revision, names }
    }

    /// True while `element` has not been structurally changed since the build
    pub fn is_current(&self, element: &Element) -> bool {
        self.revision == element.revision()
    }

    /// Original tag for a normalized name
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    /// Normalized names in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("Car-Model"), "car_model");
        assert_eq!(normalize_tag("plain"), "plain");
        assert_eq!(normalize_tag("A-B-C"), "a_b_c");
    }

    #[test]
    fn test_build_skips_comments_and_dedups() {
        let root = Element::new("root");
        root.append_new("Car-Model");
        root.append(&Element::comment("ignored"));
        root.append_new("Car-Model");
        root.append_new("wheels");

        let table = AliasTable::build(&root);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("car_model"), Some("Car-Model"));
        assert_eq!(table.resolve("Car-Model"), None);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["car_model", "wheels"]);
    }

    #[test]
    fn test_table_goes_stale_after_mutation() {
        let root = Element::new("root");
        let child = root.append_new("a");
        let table = AliasTable::build(&root);
        assert!(table.is_current(&root));

        root.remove_child(&child);
        assert!(!table.is_current(&root));
    }
}

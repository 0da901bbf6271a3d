//! Property-based tests for element <-> value conversion
//!
//! These tests use proptest to verify:
//! 1. Roundtrip: tree -> value -> tree reproduces the markup when same-tag
//!    siblings are adjacent
//! 2. Idempotence: a second roundtrip changes nothing
//! 3. Null placeholders in a list each materialize as one element
//! 4. Children stay reachable through their normalized names

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use proptest::prelude::*;
use xmlmap::{from_value, normalize_tag, parse, Container, Map, Value};

/// A generated element: empty or text leaves, and containers that always
/// carry at least one attribute so they never convert to an all-empty map
#[derive(Debug, Clone)]
enum Tree {
    Leaf {
        tag: String,
        text: Option<String>,
    },
    Node {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Tree>,
    },
}

impl Tree {
    fn tag(&self) -> &str {
        match self {
            Self::Leaf { tag, .. } | Self::Node { tag, .. } => tag,
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Self::Leaf { tag, text: None } => {
                out.push_str(&format!("<{tag}/>"));
            }
            Self::Leaf {
                tag,
                text: Some(text),
            } => {
                out.push_str(&format!("<{tag}>{text}</{tag}>"));
            }
            Self::Node {
                tag,
                attributes,
                children,
            } => {
                out.push_str(&format!("<{tag}"));
                for (key, value) in attributes {
                    out.push_str(&format!(" {key}=\"{value}\""));
                }
                out.push('>');
                for child in children {
                    child.render(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    fn markup(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

fn arb_tag() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string)
}

fn arb_tree(adjacent_tags: bool) -> impl Strategy<Value = Tree> {
    let leaf = (arb_tag(), prop::option::of("[a-z0-9]{1,8}"))
        .prop_map(|(tag, text)| Tree::Leaf { tag, text });

    leaf.prop_recursive(4, 48, 5, move |inner| {
        (
            arb_tag(),
            prop::collection::btree_map("[a-z]{1,3}", "[a-z0-9]{1,5}", 1..3),
            prop::collection::vec(inner, 1..5),
        )
            .prop_map(move |(tag, attributes, mut children)| {
                if adjacent_tags {
                    children.sort_by(|x, y| x.tag().cmp(y.tag()));
                }
                Tree::Node {
                    tag,
                    attributes: attributes.into_iter().collect(),
                    children,
                }
            })
    })
}

fn rebuild(container: &Container) -> Container {
    let tag = xmlmap::ElementView::tag(container);
    from_value(&Map::new().with(tag, container.to_value()).into()).unwrap()
}

proptest! {
    #[test]
    fn roundtrip_reproduces_markup(tree in arb_tree(true)) {
        let markup = tree.markup();
        let original = parse(&markup).unwrap();
        let rebuilt = rebuild(&original);
        prop_assert_eq!(rebuilt.to_markup(), original.to_markup());
    }

    #[test]
    fn second_roundtrip_is_stable(tree in arb_tree(false)) {
        let original = parse(&tree.markup()).unwrap();
        let once = rebuild(&original);
        let twice = rebuild(&once);
        prop_assert_eq!(once.to_markup(), twice.to_markup());
        prop_assert_eq!(once.to_value(), original.to_value());
    }

    #[test]
    fn null_placeholders_each_become_one_element(nulls in 1usize..8, with_text in any::<bool>()) {
        let mut items = vec![Value::Null; nulls];
        if with_text {
            items.push(Map::new().with("#text", "t").into());
        }
        let expected = items.len();

        let root = from_value(&Map::new().with("root", Map::new().with("node1", items)).into()).unwrap();
        prop_assert_eq!(root.lookup_exact("node1").len(), expected);

        let value = root.to_value();
        let group = match value.get("node1") {
            Some(Value::List(items)) => items.len(),
            Some(_) => 1,
            None => 0,
        };
        prop_assert_eq!(group, expected);
        if with_text {
            prop_assert_eq!(root.sget("node1.-1").text(), Some("t".to_string()));
        }
    }

    #[test]
    fn repeated_tags_group_in_document_order(texts in prop::collection::vec("[a-z]{1,6}", 1..8)) {
        let markup: String = texts.iter().map(|t| format!("<x>{t}</x>")).collect();
        let root = parse(&format!("<r>{markup}</r>")).unwrap();
        let value = root.to_value();

        let expected = match texts.len() {
            1 => Value::from(texts[0].as_str()),
            _ => texts.iter().map(|t| Value::from(t.as_str())).collect(),
        };
        prop_assert_eq!(value.get("x"), Some(&expected));
    }

    #[test]
    fn normalized_names_resolve(tag in "[A-Z][a-zA-Z]{0,5}(-[a-zA-Z]{1,4}){0,2}") {
        let root = parse(&format!("<root><{tag}>v</{tag}></root>")).unwrap();
        let found = root.get(&normalize_tag(&tag));
        prop_assert!(found.is_found());
        prop_assert!(root.lookup_exact(&tag).is_found());
    }
}

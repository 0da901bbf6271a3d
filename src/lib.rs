//! xmlmap: markup trees as navigable, mutable mappings
//!
//! This crate provides functionality to:
//! - Parse markup into a tree and address children by normalized name
//! - Convert a subtree to a structured [`Value`] and back
//! - Navigate dotted paths without failing on missing nodes
//! - Update, create, replace and delete children in place
//!
//! # Examples
//! ```
//! use xmlmap::{Container, Value};
//!
//! # fn main() -> xmlmap::Result<()> {
//! let root = Container::from_markup(r#"<root><tag attr1="attr text">text value</tag></root>"#)?;
//! assert_eq!(root.sget("tag.@attr1").as_text(), Some("attr text"));
//! assert_eq!(root.sget("tag").text().as_deref(), Some("text value"));
//! assert!(root.sget("reply.fake_node").is_missing());
//!
//! root.set("count", 3)?;
//! assert_eq!(
//!     root.to_markup(),
//!     r#"<root><tag attr1="attr text">text value</tag><count>3</count></root>"#
//! );
//! assert_eq!(root.to_value().get("count"), Some(&Value::from("3")));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use tracing::{debug, instrument};

pub mod alias;
pub mod codec;
pub mod convert;
pub mod error;
pub mod markup;
pub mod node;
pub mod path;
pub mod value;

// Re-exports
pub use alias::{normalize_tag, AliasTable};
pub use codec::{DateTimeValue, FromText, Scalar};
pub use convert::{to_value, value_to_element, ConvertOptions};
pub use error::{Error, ErrorKind, Pos, Result, Span};
pub use markup::{Element, NodeKind, ParserConfig, WriteOptions};
pub use node::{Container, ElementView, Leaf, Lookup, Node, Source};
pub use path::{Found, NullNode, NULL_NODE};
pub use value::{Map, Value};

/// Parse markup text into a container
#[instrument(level = "debug", skip_all, fields(len = markup.len()))]
pub fn parse(markup: &str) -> Result<Container> {
    let container = Container::from_markup(markup)?;
    debug!("parsed {} top-level children", container.len());
    Ok(container)
}

/// Parse markup text with explicit parser limits
#[instrument(level = "debug", skip_all, fields(len = markup.len()))]
pub fn parse_with_config(markup: &str, config: ParserConfig) -> Result<Container> {
    markup::parse_with_config(markup, config).map(Container::from_element)
}

/// Build a container from a structured value
pub fn from_value(value: &Value) -> Result<Container> {
    Container::from_value(value)
}

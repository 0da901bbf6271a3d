//! Markup engine: element tree, parser, serializer and path queries

pub mod element;
pub mod parser;
pub mod query;
pub mod reader;
pub mod writer;

pub use element::{Attributes, Element, NodeKind};
pub use parser::{Parser, ParserConfig};
pub use query::select;
pub use writer::{canonical_string, serialize, WriteOptions};

use crate::error::Result;

/// Parse markup text into an element tree
pub fn parse(text: &str) -> Result<Element> {
    Parser::new(text.as_bytes()).parse()
}

/// Parse markup text with explicit parser limits
pub fn parse_with_config(text: &str, config: ParserConfig) -> Result<Element> {
    Parser::with_config(text.as_bytes(), config).parse()
}

//! Markup parser building an [`Element`] tree

use tracing::trace;

use crate::error::{Error, ErrorKind, Result};
use crate::markup::element::{Attributes, Element};
use crate::markup::reader::Cursor;

/// Limits applied while parsing
#[derive(Clone, Copy, Debug)]
pub struct ParserConfig {
    /// Maximum element nesting depth
    pub max_depth: usize,
    /// Maximum input size in bytes
    pub max_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Markup parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: ParserConfig,
}

impl<'a> Parser<'a> {
    /// Parser with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, ParserConfig::default())
    }

    /// Parser with explicit limits
    pub const fn with_config(input: &'a [u8], config: ParserConfig) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
        }
    }

    /// Parse a document and return its root element
    pub fn parse(&mut self) -> Result<Element> {
        if self.cursor.remaining().len() > self.config.max_size {
            return Err(Error::new(ErrorKind::LimitExceeded {
                limit: "max size",
                max: self.config.max_size,
            }));
        }

        self.cursor.eat(b"\xEF\xBB\xBF");
        self.skip_misc()?;
        if self.cursor.is_eof() {
            return Err(self.error_here("no root element"));
        }

        let root = self.parse_element(1)?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(self.error_here("content after root element"));
        }
        Ok(root)
    }

    /// Skip prolog/epilog items: whitespace, declarations, PIs, comments, doctype
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat(b"<?") {
                self.skip_until(b"?>")?;
            } else if self.cursor.eat(b"<!--") {
                self.skip_until(b"-->")?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self, depth: usize) -> Result<Element> {
        if depth > self.config.max_depth {
            return Err(Error::new(ErrorKind::LimitExceeded {
                limit: "max depth",
                max: self.config.max_depth,
            }));
        }

        self.expect_byte(b'<')?;
        let name = self.parse_name()?;
        let element = Element::new(name.as_str());
        for (key, value) in self.parse_attributes()? {
            element.set_attribute(key, value);
        }

        if self.cursor.eat(b"/>") {
            return Ok(element);
        }
        self.expect_byte(b'>')?;

        // Text goes to the element until the first child, then to the last child's tail.
        let mut pending = String::new();
        let mut last_child: Option<Element> = None;

        loop {
            if self.cursor.is_eof() {
                return Err(self.error_here("unterminated element"));
            }

            if self.cursor.eat(b"</") {
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(self.error_here("mismatched closing tag"));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.eat(b"<!--") {
                let start = self.cursor.pos();
                self.skip_until(b"-->")?;
                let raw = self.cursor.slice_from(start);
                let body = raw.get(..raw.len().saturating_sub(3)).unwrap_or_default();
                flush_text(&element, last_child.as_ref(), &mut pending);
                let comment = Element::comment(bytes_to_string(body)?);
                element.append(&comment);
                last_child = Some(comment);
                continue;
            }

            if self.cursor.eat(b"<![CDATA[") {
                let start = self.cursor.pos();
                self.skip_until(b"]]>")?;
                let raw = self.cursor.slice_from(start);
                let body = raw.get(..raw.len().saturating_sub(3)).unwrap_or_default();
                pending.push_str(&bytes_to_string(body)?);
                continue;
            }

            if self.cursor.eat(b"<?") {
                self.skip_until(b"?>")?;
                continue;
            }

            if self.cursor.current() == Some(b'<') {
                flush_text(&element, last_child.as_ref(), &mut pending);
                let child = self.parse_element(depth + 1)?;
                element.append(&child);
                last_child = Some(child);
                continue;
            }

            pending.push_str(&self.parse_text()?);
        }

        flush_text(&element, last_child.as_ref(), &mut pending);
        trace!(tag = %name, children = element.children().len(), "parsed element");
        Ok(element)
    }

    fn parse_attributes(&mut self) -> Result<Attributes> {
        let mut attrs = Attributes::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') | Some(b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input")),
            }

            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(self.error_here("duplicate attribute"));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = bytes_to_string(raw)?;
                return decode_entities(&text);
            }
            self.cursor.advance();
        }

        Err(self.error_here("unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        decode_entities(&bytes_to_string(raw)?)
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(first) if is_name_start(first) => self.cursor.advance(),
            _ => return Err(self.error_here("expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        bytes_to_string(self.cursor.slice_from(start))
    }

    fn skip_doctype(&mut self) -> Result<()> {
        // Internal subsets may contain '>' inside brackets.
        let mut depth = 0usize;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_here("unterminated doctype"))
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        while !self.cursor.is_eof() {
            if self.cursor.eat(pattern) {
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.current() == Some(expected) {
            self.cursor.advance();
            Ok(())
        } else {
            Err(self.error_here("unexpected token"))
        }
    }

    fn error_here(&self, message: &str) -> Error {
        Error::syntax(self.cursor.position(), message)
    }
}

fn flush_text(element: &Element, last_child: Option<&Element>, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    match last_child {
        Some(child) => {
            let tail = child.tail().unwrap_or_default() + &text;
            child.set_tail(Some(tail));
        }
        None => {
            let full = element.text().unwrap_or_default() + &text;
            element.set_text(Some(full));
        }
    }
}

fn bytes_to_string(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::with_message(ErrorKind::Syntax, "invalid utf-8"))
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_entities(input: &str) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '&' {
            result.push(ch);
            continue;
        }

        let mut entity = String::new();
        for next in chars.by_ref() {
            if next == ';' {
                break;
            }
            entity.push(next);
        }

        let decoded = match entity.as_str() {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(&entity),
        };

        match decoded {
            Some(ch) => result.push(ch),
            None => {
                return Err(Error::with_message(
                    ErrorKind::Syntax,
                    format!("invalid entity: &{entity};"),
                ))
            }
        }
    }

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}

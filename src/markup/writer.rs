//! Markup serializer

use crate::markup::element::Element;

/// Serialization options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent nested elements by two spaces, one element per line
    pub pretty: bool,
    /// Emit an XML declaration naming this encoding
    pub encoding: Option<String>,
    /// Keep comments; when false the output is canonical (no comments,
    /// expanded empty elements, sorted attributes, no declaration)
    pub with_comments: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            encoding: None,
            with_comments: true,
        }
    }
}

impl WriteOptions {
    /// Indent nested elements
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Emit a declaration naming `encoding`
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Keep comments; `false` selects canonical output
    pub fn with_comments(mut self, with_comments: bool) -> Self {
        self.with_comments = with_comments;
        self
    }
}

#[derive(Clone, Copy)]
struct Style {
    canonical: bool,
    ascii_only: bool,
}

/// Serialize `element` and its subtree; the element's own tail is not written
pub fn serialize(element: &Element, options: &WriteOptions) -> String {
    let canonical = !options.with_comments;
    let style = Style {
        canonical,
        ascii_only: !canonical && !is_unicode_encoding(options.encoding.as_deref()),
    };

    let mut output = String::new();
    if let Some(encoding) = options.encoding.as_deref() {
        if !canonical && !encoding.eq_ignore_ascii_case("unicode") {
            output.push_str("<?xml version='1.0' encoding='");
            output.push_str(encoding);
            output.push_str("'?>\n");
        }
    }

    if options.pretty && !canonical {
        write_pretty(element, 0, style, &mut output);
        output.push('\n');
    } else {
        write_compact(element, style, &mut output);
    }
    output
}

/// Compact serialization used as the structural equality key
pub fn canonical_string(element: &Element) -> String {
    let mut output = String::new();
    write_compact(
        element,
        Style {
            canonical: false,
            ascii_only: false,
        },
        &mut output,
    );
    output
}

fn is_unicode_encoding(encoding: Option<&str>) -> bool {
    encoding.is_some_and(|e| {
        matches!(
            e.to_ascii_lowercase().as_str(),
            "unicode" | "utf-8" | "utf8" | "utf-16" | "utf16"
        )
    })
}

fn write_compact(element: &Element, style: Style, output: &mut String) {
    if element.is_comment() {
        if !style.canonical {
            write_comment(element, output);
        }
        return;
    }

    write_open_tag(element, style, output);
    let text = element.text();
    let children = element.children();

    if !style.canonical && text.as_deref().is_none_or(str::is_empty) && children.is_empty() {
        output.push_str("/>");
        return;
    }

    output.push('>');
    if let Some(text) = text {
        push_escaped(&text, false, style, output);
    }
    for child in &children {
        write_compact(child, style, output);
        if let Some(tail) = child.tail() {
            push_escaped(&tail, false, style, output);
        }
    }
    write_close_tag(element, output);
}

fn write_pretty(element: &Element, depth: usize, style: Style, output: &mut String) {
    let indent = "  ".repeat(depth);
    output.push_str(&indent);

    if element.is_comment() {
        write_comment(element, output);
        return;
    }

    let children = element.children();
    let text = element.text();
    let mixed = text.as_deref().is_some_and(|t| !t.trim().is_empty())
        || children
            .iter()
            .any(|child| child.tail().is_some_and(|t| !t.trim().is_empty()));

    if children.is_empty() || mixed {
        // Leaves and mixed content keep their text as-is.
        write_compact(element, style, output);
        return;
    }

    write_open_tag(element, style, output);
    output.push_str(">\n");
    for child in &children {
        write_pretty(child, depth + 1, style, output);
        output.push('\n');
    }
    output.push_str(&indent);
    write_close_tag(element, output);
}

fn write_open_tag(element: &Element, style: Style, output: &mut String) {
    output.push('<');
    output.push_str(&element.tag());

    let mut attributes: Vec<(String, String)> = element.attributes().into_iter().collect();
    if style.canonical {
        attributes.sort_by(|a, b| a.0.cmp(&b.0));
    }
    for (key, value) in attributes {
        output.push(' ');
        output.push_str(&key);
        output.push_str("=\"");
        push_escaped(&value, true, style, output);
        output.push('"');
    }
}

fn write_close_tag(element: &Element, output: &mut String) {
    output.push_str("</");
    output.push_str(&element.tag());
    output.push('>');
}

fn write_comment(element: &Element, output: &mut String) {
    output.push_str("<!--");
    output.push_str(&element.text().unwrap_or_default());
    output.push_str("-->");
}

fn push_escaped(input: &str, attribute: bool, style: Style, output: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            c if style.ascii_only && !c.is_ascii() => {
                output.push_str("&#");
                output.push_str(&u32::from(c).to_string());
                output.push(';');
            }
            c => output.push(c),
        }
    }
}

//! Minimal location-path queries over an element tree
//!
//! Supported: `a/b`, `/root/a`, `//a`, `a//b`, `*`, `.`, `..`, positional
//! predicates `[n]` (1-based) and, with the regex extension enabled,
//! `[re:test(., 'pattern'[, 'flags'])]` where flag `i` makes the match
//! case-insensitive. The string value of `.` is the concatenated text of the
//! element and its descendants.

use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::markup::element::Element;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfNode,
    Parent,
}

#[derive(Debug)]
enum Test {
    Any,
    Name(String),
}

#[derive(Debug)]
enum Predicate {
    Position(usize),
    Matches(regex::Regex),
}

#[derive(Debug)]
struct Step {
    axis: Axis,
    test: Test,
    predicates: Vec<Predicate>,
}

/// Evaluate `expr` with `context` as the context node
pub fn select(context: &Element, expr: &str, regexp: bool) -> Result<Vec<Element>> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(Error::argument("empty path query"));
    }

    let (start, rest, leading) = if let Some(rest) = expr.strip_prefix("//") {
        (context.root(), rest, Axis::DescendantOrSelf)
    } else if let Some(rest) = expr.strip_prefix('/') {
        (context.root(), rest, Axis::SelfNode)
    } else {
        (context.clone(), expr, Axis::Child)
    };

    let steps = parse_steps(rest, leading, regexp)?;
    let mut current = vec![start];
    for step in &steps {
        let mut next: Vec<Element> = Vec::new();
        for node in &current {
            for found in apply(step, node) {
                if !next.iter().any(|seen| seen.ptr_eq(&found)) {
                    next.push(found);
                }
            }
        }
        current = next;
    }
    Ok(current)
}

fn parse_steps(path: &str, leading: Axis, regexp: bool) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut axis = leading;
    for raw in split_steps(path)? {
        if raw.is_empty() {
            // An empty segment comes from `//` in the middle of a path.
            axis = Axis::Descendant;
            continue;
        }
        steps.push(parse_step(&raw, axis, regexp)?);
        axis = Axis::Child;
    }
    if axis == Axis::Descendant || steps.is_empty() {
        return Err(Error::argument(format!("incomplete path query: {path}")));
    }
    Ok(steps)
}

/// Split on `/` outside of predicates and quotes
fn split_steps(path: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in path.chars() {
        match (ch, quote) {
            (c, Some(q)) if c == q => quote = None,
            (_, Some(_)) => {}
            ('\'' | '"', None) => quote = Some(ch),
            ('[', None) => depth += 1,
            (']', None) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::argument("unbalanced ']' in path query"))?;
            }
            ('/', None) if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if depth != 0 || quote.is_some() {
        return Err(Error::argument("unterminated predicate in path query"));
    }
    parts.push(current);
    Ok(parts)
}

fn parse_step(raw: &str, axis: Axis, regexp: bool) -> Result<Step> {
    let (head, mut rest) = match raw.find('[') {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };
    let head = head.trim();

    let (axis, test) = match head {
        "." => (Axis::SelfNode, Test::Any),
        ".." => (Axis::Parent, Test::Any),
        "*" => (axis, Test::Any),
        name if is_valid_name(name) => (axis, Test::Name(name.to_string())),
        other => return Err(Error::argument(format!("unsupported step: {other}"))),
    };

    let mut predicates = Vec::new();
    while let Some(body_start) = rest.strip_prefix('[') {
        let end = closing_bracket(body_start)
            .ok_or_else(|| Error::argument("unterminated predicate in path query"))?;
        let (body, after) = body_start.split_at(end);
        predicates.push(parse_predicate(body.trim(), regexp)?);
        rest = after.get(1..).unwrap_or_default().trim_start();
    }
    if !rest.is_empty() {
        return Err(Error::argument(format!("unexpected text in step: {rest}")));
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn closing_bracket(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (idx, ch) in body.char_indices() {
        match (ch, quote) {
            (c, Some(q)) if c == q => quote = None,
            (_, Some(_)) => {}
            ('\'' | '"', None) => quote = Some(ch),
            ('[', None) => depth += 1,
            (']', None) if depth == 0 => return Some(idx),
            (']', None) => depth -= 1,
            _ => {}
        }
    }
    None
}

fn parse_predicate(body: &str, regexp: bool) -> Result<Predicate> {
    if let Ok(position) = body.parse::<usize>() {
        if position == 0 {
            return Err(Error::argument("positions in path queries start at 1"));
        }
        return Ok(Predicate::Position(position));
    }

    if let Some(args) = body
        .strip_prefix("re:test(")
        .and_then(|inner| inner.strip_suffix(')'))
    {
        if !regexp {
            return Err(Error::argument(
                "re:test() needs the regular expression extension",
            ));
        }
        let args = quoted_arguments(args)?;
        let (pattern, flags) = match args.as_slice() {
            [pattern] => (pattern.as_str(), ""),
            [pattern, flags] => (pattern.as_str(), flags.as_str()),
            _ => return Err(Error::argument("re:test() takes a pattern and optional flags")),
        };
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| Error::argument(format!("invalid pattern: {e}")))?;
        return Ok(Predicate::Matches(regex));
    }

    Err(Error::argument(format!("unsupported predicate: [{body}]")))
}

/// Parse `., 'a', 'b'` into `["a", "b"]`
fn quoted_arguments(args: &str) -> Result<Vec<String>> {
    let mut parts = args.splitn(2, ',');
    if parts.next().map(str::trim) != Some(".") {
        return Err(Error::argument("re:test() must test the context node '.'"));
    }

    let mut values = Vec::new();
    let mut rest = parts.next().unwrap_or_default().trim();
    while !rest.is_empty() {
        let mut chars = rest.chars();
        let quote = match chars.next() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(Error::argument("re:test() arguments must be quoted")),
        };
        let body = chars.as_str();
        let end = body
            .find(quote)
            .ok_or_else(|| Error::argument("unterminated string in re:test()"))?;
        let (value, after) = body.split_at(end);
        values.push(value.to_string());
        rest = after.get(1..).unwrap_or_default().trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
    Ok(values)
}

fn apply(step: &Step, node: &Element) -> Vec<Element> {
    let candidates = match step.axis {
        Axis::Child => node.element_children(),
        Axis::Descendant => {
            let mut out = Vec::new();
            collect_descendants(node, &mut out);
            out
        }
        Axis::DescendantOrSelf => {
            let mut out = vec![node.clone()];
            collect_descendants(node, &mut out);
            out
        }
        Axis::SelfNode => vec![node.clone()],
        Axis::Parent => node.parent().into_iter().collect(),
    };

    let mut matched: Vec<Element> = candidates
        .into_iter()
        .filter(|candidate| match &step.test {
            Test::Any => true,
            Test::Name(name) => candidate.tag() == *name,
        })
        .collect();

    for predicate in &step.predicates {
        matched = match predicate {
            Predicate::Position(position) => matched
                .into_iter()
                .nth(position.saturating_sub(1))
                .into_iter()
                .collect(),
            Predicate::Matches(regex) => matched
                .into_iter()
                .filter(|candidate| regex.is_match(&candidate.string_value()))
                .collect(),
        };
    }
    matched
}

fn collect_descendants(node: &Element, out: &mut Vec<Element>) {
    for child in node.element_children() {
        out.push(child.clone());
        collect_descendants(&child, out);
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

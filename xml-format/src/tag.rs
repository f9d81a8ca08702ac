//! Start-tag anatomy
//!
//!     The renderer needs to move attributes between lines without touching their values, so a
//!     start tag record is split into three parts:
//!
//!         <name  a="1"
//!                b='two' />
//!         ^^^^^  ^^^^^^^^ ^^
//!         head   attrs    tail
//!
//!     Whitespace between attributes is insignificant and is dropped, as is whitespace around
//!     `=`. Quoted values are kept byte for byte, including any line breaks inside them.

use std::fmt;

use crate::scanner::is_xml_whitespace;

/// Element name of a start or end tag record (`<a x="1">`, `</a>`, `<a/>`).
pub fn element_name(tag: &str) -> Option<&str> {
    let inner = tag.strip_prefix("</").or_else(|| tag.strip_prefix('<'))?;
    let end = inner
        .find(|c: char| is_xml_whitespace(c) || c == '/' || c == '>')
        .unwrap_or(inner.len());
    (end > 0).then(|| &inner[..end])
}

/// The tag closes itself: the last non-whitespace byte before `>` is `/`.
///
/// Covers `<a/>`, `<a />` and the sloppier `<a x="1"/ >`.
pub fn is_self_closing(tag: &str) -> bool {
    tag.strip_suffix('>')
        .map(|body| body.trim_end_matches(is_xml_whitespace).ends_with('/'))
        .unwrap_or(false)
}

/// A single attribute, normalized to `name="value"` on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    /// Raw value including its quotes, if any value was given.
    pub value: Option<&'a str>,
    /// The source had a line break between the previous token and this attribute.
    pub line_break_before: bool,
}

impl fmt::Display for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParts<'a> {
    /// `<` plus the element name.
    pub head: &'a str,
    pub attributes: Vec<Attribute<'a>>,
    /// `>` or `/>`.
    pub tail: &'a str,
    /// The source put whitespace before a `/>` tail.
    pub spaced_tail: bool,
}

impl TagParts<'_> {
    /// The closing bracket as it should be appended after the last token.
    pub fn rendered_tail(&self) -> &'static str {
        match (self.tail, self.spaced_tail) {
            ("/>", true) => " />",
            ("/>", false) => "/>",
            _ => ">",
        }
    }

    /// Whole tag on one line with single spaces between tokens.
    pub fn single_line(&self) -> String {
        let mut out = String::from(self.head);
        for attribute in &self.attributes {
            out.push(' ');
            out.push_str(&attribute.to_string());
        }
        out.push_str(self.rendered_tail());
        out
    }
}

/// Split a start tag record into head, attributes and tail.
///
/// Returns `None` for anything that is not a well-delimited start tag; the renderer then
/// emits the record unchanged.
pub fn parse_tag(tag: &str) -> Option<TagParts<'_>> {
    if !tag.starts_with('<') || tag.starts_with("</") || !tag.ends_with('>') {
        return None;
    }
    let name = element_name(tag)?;
    let head = &tag[..1 + name.len()];
    let inner = &tag[..tag.len() - 1];
    let (body, tail) = match inner.trim_end_matches(is_xml_whitespace).strip_suffix('/') {
        Some(body) => (body, "/>"),
        None => (inner, ">"),
    };
    let body = body.get(head.len()..)?;
    let spaced_tail = tail == "/>" && body.ends_with(is_xml_whitespace);

    let mut attributes = Vec::new();
    let mut rest = body;
    loop {
        let trimmed = rest.trim_start_matches(is_xml_whitespace);
        let line_break_before = rest[..rest.len() - trimmed.len()].contains('\n');
        rest = trimmed;
        if rest.is_empty() {
            break;
        }

        let name_len = rest
            .find(|c: char| is_xml_whitespace(c) || c == '=')
            .unwrap_or(rest.len());
        let name = &rest[..name_len];
        rest = &rest[name_len..];

        let after_name = rest.trim_start_matches(is_xml_whitespace);
        let value = match after_name.strip_prefix('=') {
            Some(after_eq) => {
                let value_start = after_eq.trim_start_matches(is_xml_whitespace);
                let value_len = value_length(value_start);
                rest = &value_start[value_len..];
                Some(&value_start[..value_len]).filter(|value| !value.is_empty())
            }
            None => None,
        };

        if name.is_empty() && value.is_none() {
            // A stray `=` with nothing usable after it.
            return None;
        }
        attributes.push(Attribute {
            name,
            value,
            line_break_before,
        });
    }

    Some(TagParts {
        head,
        attributes,
        tail,
        spaced_tail,
    })
}

fn value_length(text: &str) -> usize {
    match text.chars().next() {
        Some(quote @ ('"' | '\'')) => text[1..]
            .find(quote)
            .map(|idx| idx + 2)
            .unwrap_or(text.len()),
        _ => text.find(is_xml_whitespace).unwrap_or(text.len()),
    }
}

//! Scanner
//!
//!     Splits raw XML text into structural line records. Every record becomes exactly one line
//!     of output (tags with wrapped attributes are the exception, see `render`), so the record
//!     sequence is the skeleton of the formatted document.
//!
//!     The scanner walks characters, not physical lines: `<a><b/></a>` on one source line yields
//!     three records, and a start tag whose attributes span several source lines is reassembled
//!     into a single record. Classification precedence, first match wins:
//!
//!         1. Whitespace-only physical lines between units       -> Blank
//!         2. `<?...?>`, `<!DOCTYPE ...>` / `<!--...-->`          -> Declaration / CommentOpen
//!         3. `<![CDATA[...]]>`                                   -> CdataOpen
//!         4. A tag ending in `/>`                                -> SelfClosingTag
//!         5. `</...>`                                            -> ClosingTag
//!         6. `<name...>`                                         -> OpeningTag
//!         7. Anything else, one record per physical line         -> Text
//!
//!     Verbatim units (comments, declarations, CDATA, unformatted regions) that span several
//!     physical lines are emitted as an opener record followed by `VerbatimInner` records and a
//!     closing `VerbatimClose` record. The scanner never interprets their content; carrying the
//!     verbatim state from line to line is the depth tracker's job.
//!
//!     Nothing here fails. Unterminated comments and CDATA sections run to the end of input,
//!     unterminated tags degrade to text.

use std::ops::Range;

use crate::tag::{element_name, is_self_closing};

/// Structural classification of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Blank,
    /// Processing instruction or `<!DOCTYPE>`/other `<!` declaration.
    Declaration,
    CommentOpen,
    CdataOpen,
    /// Start of a region bounded by the unformatted content delimiter.
    Unformatted,
    /// A physical line strictly inside a verbatim span.
    VerbatimInner,
    /// The physical line that ends a verbatim span.
    VerbatimClose,
    SelfClosingTag,
    /// `<a>text</a>` or `<a></a>` on a single physical line.
    InlineElement,
    ClosingTag,
    OpeningTag,
    Text,
}

/// One structural record produced by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub kind: LineKind,
    /// Trimmed content for structural records, raw bytes for verbatim ones.
    pub text: &'a str,
    /// Byte range of `text` in the scanned source.
    pub span: Range<usize>,
    /// True when this record opens a verbatim span that continues on the next record.
    pub opens_verbatim: bool,
}

impl<'a> Line<'a> {
    fn new(kind: LineKind, text: &'a str, span: Range<usize>) -> Self {
        Self {
            kind,
            text,
            span,
            opens_verbatim: false,
        }
    }
}

/// XML whitespace: space, tab, carriage return and line feed.
pub(crate) fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub(crate) fn trim_xml(text: &str) -> &str {
    text.trim_matches(is_xml_whitespace)
}

/// Tokenize `text` into structural records.
pub fn scan<'a>(text: &'a str, unformatted_delimiter: Option<&str>) -> Vec<Line<'a>> {
    let mut scanner = Scanner {
        source: text,
        delimiter: unformatted_delimiter.filter(|delimiter| !delimiter.is_empty()),
        pos: 0,
        lines: Vec::new(),
    };
    scanner.run();
    merge_inline_elements(text, scanner.lines)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    Comment,
    Cdata,
    Instruction,
    Doctype,
    EndTag,
    StartTag,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn markup_at(rest: &str) -> Option<Markup> {
    let after = rest.strip_prefix('<')?;
    if after.starts_with("!--") {
        Some(Markup::Comment)
    } else if after.starts_with("![CDATA[") {
        Some(Markup::Cdata)
    } else if after.starts_with('?') {
        Some(Markup::Instruction)
    } else if after.starts_with('!') {
        Some(Markup::Doctype)
    } else if let Some(name) = after.strip_prefix('/') {
        name.chars().next().filter(|c| is_name_start(*c))?;
        Some(Markup::EndTag)
    } else {
        after.chars().next().filter(|c| is_name_start(*c))?;
        Some(Markup::StartTag)
    }
}

/// Offset just past the `>` closing a tag, ignoring `>` inside quoted attribute values.
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (idx, byte) in rest.bytes().enumerate().skip(1) {
        match quote {
            Some(open) if byte == open => quote = None,
            Some(_) => {}
            None => match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'>' => return Some(idx + 1),
                _ => {}
            },
        }
    }
    // An unbalanced quote would swallow the rest of the document; settle for the first `>`.
    rest.find('>').map(|idx| idx + 1)
}

/// Offset just past a `<!...>` declaration, honoring quotes and a bracketed internal subset.
fn declaration_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut brackets = 0usize;
    for (idx, byte) in rest.bytes().enumerate().skip(2) {
        match quote {
            Some(open) if byte == open => quote = None,
            Some(_) => {}
            None => match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'>' if brackets == 0 => return Some(idx + 1),
                _ => {}
            },
        }
    }
    None
}

struct Scanner<'a, 'd> {
    source: &'a str,
    delimiter: Option<&'d str>,
    pos: usize,
    lines: Vec<Line<'a>>,
}

impl<'a> Scanner<'a, '_> {
    fn run(&mut self) {
        let source = self.source;
        while self.pos < source.len() {
            let rest = &source[self.pos..];
            if let Some(delimiter) = self.delimiter {
                if rest.starts_with(delimiter) {
                    let end = self.find_after(delimiter.len(), delimiter);
                    self.verbatim(LineKind::Unformatted, end);
                    continue;
                }
            }
            match markup_at(rest) {
                Some(Markup::Comment) => {
                    let end = self.find_after("<!--".len(), "-->");
                    self.verbatim(LineKind::CommentOpen, end);
                }
                Some(Markup::Cdata) => {
                    let end = self.find_after("<![CDATA[".len(), "]]>");
                    self.verbatim(LineKind::CdataOpen, end);
                }
                Some(Markup::Instruction) => {
                    let end = self.find_after("<?".len(), "?>");
                    self.verbatim(LineKind::Declaration, end);
                }
                Some(Markup::Doctype) => {
                    let end = declaration_end(rest)
                        .map(|len| self.pos + len)
                        .unwrap_or(self.source.len());
                    self.verbatim(LineKind::Declaration, end);
                }
                Some(Markup::EndTag) | Some(Markup::StartTag) => self.tag(),
                None => {
                    let end = self.text_end();
                    self.text(end);
                }
            }
        }
    }

    /// End offset of the first `terminator` found `skip` bytes past the cursor, or end of input.
    fn find_after(&self, skip: usize, terminator: &str) -> usize {
        let from = (self.pos + skip).min(self.source.len());
        self.source[from..]
            .find(terminator)
            .map(|idx| from + idx + terminator.len())
            .unwrap_or(self.source.len())
    }

    fn tag(&mut self) {
        let source = self.source;
        let rest = &source[self.pos..];
        let Some(len) = tag_end(rest) else {
            self.text(self.source.len());
            return;
        };
        let end = self.pos + len;
        let text = &source[self.pos..end];
        let kind = if text.starts_with("</") {
            LineKind::ClosingTag
        } else if is_self_closing(text) {
            LineKind::SelfClosingTag
        } else {
            LineKind::OpeningTag
        };
        self.lines.push(Line::new(kind, text, self.pos..end));
        self.pos = end;
    }

    /// Offset of the next markup start or delimiter after the cursor.
    fn text_end(&self) -> usize {
        let rest = &self.source[self.pos..];
        for (idx, c) in rest.char_indices().skip(1) {
            let candidate = &rest[idx..];
            if c == '<' && markup_at(candidate).is_some() {
                return self.pos + idx;
            }
            if self
                .delimiter
                .is_some_and(|delimiter| candidate.starts_with(delimiter))
            {
                return self.pos + idx;
            }
        }
        self.source.len()
    }

    /// Emit Text and Blank records for `source[pos..end]`.
    ///
    /// The first segment is the tail of the previous unit's line and the last segment is the
    /// head of the next unit's line, so only segments in between can be whole blank lines. At
    /// the start of input there is no previous line and the first segment counts too.
    fn text(&mut self, end: usize) {
        let source = self.source;
        let start = self.pos;
        let raw = &source[start..end];
        let last = raw.matches('\n').count();
        let mut offset = start;
        for (idx, segment) in raw.split('\n').enumerate() {
            let segment_start = offset;
            offset += segment.len() + 1;
            let trimmed = trim_xml(segment);
            if trimmed.is_empty() {
                if idx < last && (idx > 0 || start == 0) {
                    self.lines.push(Line::new(
                        LineKind::Blank,
                        "",
                        segment_start..segment_start,
                    ));
                }
                continue;
            }
            let lead = segment.len() - segment.trim_start_matches(is_xml_whitespace).len();
            let text_start = segment_start + lead;
            self.lines.push(Line::new(
                LineKind::Text,
                trimmed,
                text_start..text_start + trimmed.len(),
            ));
        }
        self.pos = end;
    }

    /// Emit a verbatim unit `source[pos..end]`, one record per physical line.
    fn verbatim(&mut self, kind: LineKind, end: usize) {
        let source = self.source;
        let start = self.pos;
        let unit = &source[start..end];
        let last = unit.matches('\n').count();
        let mut offset = start;
        for (idx, segment) in unit.split('\n').enumerate() {
            let segment_start = offset;
            offset += segment.len() + 1;
            let text = segment.strip_suffix('\r').unwrap_or(segment);
            let line_kind = if idx == 0 {
                kind
            } else if idx == last {
                LineKind::VerbatimClose
            } else {
                LineKind::VerbatimInner
            };
            let mut line = Line::new(line_kind, text, segment_start..segment_start + text.len());
            line.opens_verbatim = idx == 0 && last > 0;
            self.lines.push(line);
        }
        self.pos = end;
    }
}

fn merge_inline_elements<'a>(source: &'a str, lines: Vec<Line<'a>>) -> Vec<Line<'a>> {
    let mut merged = Vec::with_capacity(lines.len());
    let mut idx = 0;
    while idx < lines.len() {
        match inline_element(source, &lines[idx..]) {
            Some((line, consumed)) => {
                merged.push(line);
                idx += consumed;
            }
            None => {
                merged.push(lines[idx].clone());
                idx += 1;
            }
        }
    }
    merged
}

/// Recognize `Opening [Text] Closing` of the same element on one physical line.
fn inline_element<'a>(source: &'a str, window: &[Line<'a>]) -> Option<(Line<'a>, usize)> {
    let open = window.first().filter(|line| line.kind == LineKind::OpeningTag)?;
    let close_idx = match window.get(1)?.kind {
        LineKind::ClosingTag => 1,
        LineKind::Text if window.get(2)?.kind == LineKind::ClosingTag => 2,
        _ => return None,
    };
    let close = &window[close_idx];
    if element_name(open.text)? != element_name(close.text)? {
        return None;
    }
    let span = open.span.start..close.span.end;
    let text = &source[span.clone()];
    if text.contains('\n') {
        return None;
    }
    Some((Line::new(LineKind::InlineElement, text, span), close_idx + 1))
}

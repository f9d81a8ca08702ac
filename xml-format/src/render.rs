//! Line rendering
//!
//!     Turns records plus their depth into output text. Structural records are re-indented with
//!     `indent_unit × depth` and their trimmed content; verbatim continuation records are copied
//!     as they are. Blank records follow the `preserve_new_lines` / `max_preserve_new_lines`
//!     policy.
//!
//!     Start tags with attributes go through the attribute layout selected by `wrap_attributes`.
//!     Two continuation indents exist: the wrap indent (depth indent plus
//!     `wrap_attributes_indent_size` spaces, or one indent unit) and the aligned indent (depth
//!     indent plus enough spaces to line up with the first attribute).

use crate::options::{FormatSettings, IndentOptions, WrapAttributes};
use crate::scanner::{Line, LineKind};
use crate::tag::{element_name, parse_tag, TagParts};

/// Accumulates the formatted document one record at a time.
pub struct LineRenderer<'s> {
    settings: &'s FormatSettings,
    indent_unit: String,
    line_ending: &'static str,
    output: String,
    blank_run: usize,
}

impl<'s> LineRenderer<'s> {
    pub fn new(
        options: &IndentOptions,
        settings: &'s FormatSettings,
        line_ending: &'static str,
    ) -> Self {
        Self {
            settings,
            indent_unit: options.indent_unit(),
            line_ending,
            output: String::new(),
            blank_run: 0,
        }
    }

    /// Render one record. `verbatim` is the tracker's state *before* it consumed the record.
    pub fn render(&mut self, line: &Line<'_>, depth: usize, verbatim: bool) {
        if line.kind != LineKind::Blank {
            self.blank_run = 0;
        }
        if verbatim {
            self.output.push_str(line.text);
            self.output.push_str(self.line_ending);
            return;
        }

        match line.kind {
            LineKind::Blank => self.blank(),
            LineKind::OpeningTag | LineKind::SelfClosingTag => self.start_tag(line.text, depth),
            LineKind::ClosingTag => match element_name(line.text) {
                Some(name) => self.write_line(depth, &format!("</{name}>")),
                None => self.write_line(depth, line.text),
            },
            _ => self.write_line(depth, line.text),
        }
    }

    /// The rendered text, untrimmed.
    pub fn finish(self) -> String {
        self.output
    }

    fn indent(&self, depth: usize) -> String {
        self.indent_unit.repeat(depth)
    }

    fn write_line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.output.push_str(&self.indent_unit);
        }
        self.output.push_str(text);
        self.output.push_str(self.line_ending);
    }

    fn blank(&mut self) {
        if !self.settings.preserve_new_lines {
            return;
        }
        self.blank_run += 1;
        if let Some(max) = self.settings.max_preserve_new_lines {
            if self.blank_run > max {
                return;
            }
        }
        self.output.push_str(self.line_ending);
    }

    fn start_tag(&mut self, text: &str, depth: usize) {
        let Some(parts) = parse_tag(text) else {
            self.write_line(depth, text);
            return;
        };
        let base = self.indent(depth);
        for line in self.layout(&base, &parts) {
            self.output.push_str(&line);
            self.output.push_str(self.line_ending);
        }
    }

    fn layout(&self, base: &str, parts: &TagParts<'_>) -> Vec<String> {
        let mode = self.settings.wrap_attributes;
        let count = parts.attributes.len();
        if count == 0 {
            return vec![format!("{base}{}", parts.single_line())];
        }

        let continuation = if mode.is_aligned() {
            format!("{base}{}", " ".repeat(parts.head.chars().count() + 1))
        } else {
            match self.settings.wrap_attributes_indent_size {
                Some(size) => format!("{base}{}", " ".repeat(size)),
                None => format!("{base}{}", self.indent_unit),
            }
        };

        match mode {
            WrapAttributes::Force | WrapAttributes::ForceAligned if count > 1 => {
                one_per_line(base, parts, &continuation)
            }
            WrapAttributes::ForceExpandMultiline if count > 1 => {
                expanded(base, parts, &continuation)
            }
            WrapAttributes::Preserve | WrapAttributes::PreserveAligned => {
                preserved(base, parts, &continuation)
            }
            _ => self.fill(base, parts, &continuation),
        }
    }

    /// One line unless `wrap_line_length` is exceeded, then greedy fill.
    fn fill(&self, base: &str, parts: &TagParts<'_>, continuation: &str) -> Vec<String> {
        let single = format!("{base}{}", parts.single_line());
        let limit = match self.settings.wrap_line_length {
            Some(limit) if width(&single) > limit => limit,
            _ => return vec![single],
        };

        let tail = parts.rendered_tail();
        let last = parts.attributes.len() - 1;
        let mut lines = Vec::new();
        let mut current = format!("{base}{}", parts.head);
        for (idx, attribute) in parts.attributes.iter().enumerate() {
            let piece = attribute.to_string();
            let tail_width = if idx == last { width(tail) } else { 0 };
            // The first attribute always stays on the tag line.
            if idx > 0 && width(&current) + 1 + width(&piece) + tail_width > limit {
                lines.push(std::mem::replace(&mut current, format!("{continuation}{piece}")));
            } else {
                current.push(' ');
                current.push_str(&piece);
            }
        }
        current.push_str(tail);
        lines.push(current);
        lines
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

fn one_per_line(base: &str, parts: &TagParts<'_>, continuation: &str) -> Vec<String> {
    let mut lines: Vec<String> = parts
        .attributes
        .iter()
        .enumerate()
        .map(|(idx, attribute)| {
            if idx == 0 {
                format!("{base}{} {attribute}", parts.head)
            } else {
                format!("{continuation}{attribute}")
            }
        })
        .collect();
    if let Some(last) = lines.last_mut() {
        last.push_str(parts.rendered_tail());
    }
    lines
}

fn expanded(base: &str, parts: &TagParts<'_>, continuation: &str) -> Vec<String> {
    let mut lines = vec![format!("{base}{}", parts.head)];
    lines.extend(
        parts
            .attributes
            .iter()
            .map(|attribute| format!("{continuation}{attribute}")),
    );
    lines.push(format!("{base}{}", parts.tail));
    lines
}

fn preserved(base: &str, parts: &TagParts<'_>, continuation: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = format!("{base}{}", parts.head);
    for attribute in &parts.attributes {
        if attribute.line_break_before {
            lines.push(std::mem::replace(&mut current, continuation.to_string()));
        } else {
            current.push(' ');
        }
        current.push_str(&attribute.to_string());
    }
    current.push_str(parts.rendered_tail());
    lines.push(current);
    lines
}

//! Whole-document pipeline and edit construction
//!
//!     The pipeline is scan -> track depth -> render -> trim. The edit builder then compares the
//!     result with the original span: identical text yields no edit, anything else yields exactly
//!     one edit replacing the whole span. No attempt is made to compute a minimal diff; editors
//!     apply a single replacement atomically and keep the cursor stable enough.

use std::ops::Range;

use tracing::{debug, trace};

use crate::depth::DepthTracker;
use crate::options::{FormatSettings, IndentOptions};
use crate::render::LineRenderer;
use crate::scanner::{is_xml_whitespace, scan};

/// Replacement of `start..end` (byte offsets into the original text) by `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl Edit {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Apply this edit to the text it was computed against.
    pub fn apply(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len() + self.new_text.len());
        result.push_str(&text[..self.start]);
        result.push_str(&self.new_text);
        result.push_str(&text[self.end..]);
        result
    }
}

/// `\r\n` when the text already uses it anywhere, `\n` otherwise.
pub(crate) fn line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Run the full pipeline and return the formatted text.
///
/// Trailing whitespace is always trimmed; one line ending is appended afterwards when
/// `options.insert_final_newline` is set. The settings gate is not consulted here.
pub fn format_text(text: &str, options: &IndentOptions, settings: &FormatSettings) -> String {
    format_with_ending(text, options, settings, line_ending(text))
}

/// [`format_text`] with the line ending chosen by the caller.
pub(crate) fn format_with_ending(
    text: &str,
    options: &IndentOptions,
    settings: &FormatSettings,
    line_ending: &'static str,
) -> String {
    let lines = scan(text, settings.unformatted_delimiter());
    let mut tracker = DepthTracker::new();
    let mut renderer = LineRenderer::new(options, settings, line_ending);
    for line in &lines {
        let verbatim = tracker.in_verbatim();
        let depth = tracker.advance(line);
        renderer.render(line, depth, verbatim);
    }

    let state = tracker.state();
    debug!(
        records = lines.len(),
        final_depth = state.depth,
        unterminated_verbatim = state.in_verbatim,
        "rendered xml"
    );

    let rendered = renderer.finish();
    let mut formatted = rendered.trim_end_matches(is_xml_whitespace).to_string();
    if options.insert_final_newline && !formatted.is_empty() {
        formatted.push_str(line_ending);
    }
    formatted
}

/// Produce formatting edits for the entire document: empty when already formatted.
pub fn format_whole(text: &str, options: &IndentOptions, settings: &FormatSettings) -> Vec<Edit> {
    if !settings.enabled {
        debug!("formatting disabled by settings");
        return Vec::new();
    }
    let formatted = format_text(text, options, settings);
    build_edits(text, 0..text.len(), formatted)
}

/// Zero or one edit replacing `text[span]` with `formatted`.
pub(crate) fn build_edits(text: &str, span: Range<usize>, formatted: String) -> Vec<Edit> {
    if text.get(span.clone()) == Some(formatted.as_str()) {
        trace!(start = span.start, end = span.end, "span already formatted");
        return Vec::new();
    }
    trace!(start = span.start, end = span.end, len = formatted.len(), "replacing span");
    vec![Edit {
        start: span.start,
        end: span.end,
        new_text: formatted,
    }]
}

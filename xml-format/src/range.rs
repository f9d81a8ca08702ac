//! Range formatting
//!
//!     A sub-range is formatted as if it were a complete document: the selected text goes through
//!     the same pipeline with a fresh engine state starting at depth 0. Tags enclosing the range
//!     are not consulted, so a range deep inside a document is re-indented relative to the
//!     range itself, not to its ancestors.
//!
//!     The pipeline trims trailing whitespace, which on its own would swallow the line break
//!     separating a range from the text after it. The range's own trailing whitespace is put
//!     back after the formatted text.
//!
//!     Line breaks inserted into the range follow the whole document's line ending, so a
//!     selection without any `\r\n` of its own still gets `\r\n` in a CRLF document.

use std::ops::Range;

use tracing::debug;

use crate::edit::{build_edits, format_with_ending, line_ending, Edit};
use crate::error::FormatError;
use crate::options::{FormatSettings, IndentOptions};
use crate::scanner::is_xml_whitespace;

/// Produce formatting edits limited to the byte range `range` of `text`.
pub fn format_range(
    text: &str,
    range: Range<usize>,
    options: &IndentOptions,
    settings: &FormatSettings,
) -> Result<Vec<Edit>, FormatError> {
    if !settings.enabled {
        debug!("range formatting disabled by settings");
        return Ok(Vec::new());
    }
    validate(text, &range)?;

    let selection = &text[range.clone()];
    let trailing = &selection[selection.trim_end_matches(is_xml_whitespace).len()..];
    let mut formatted = format_with_ending(
        selection,
        &options.with_final_newline(false),
        settings,
        line_ending(text),
    );
    formatted.push_str(trailing);

    debug!(start = range.start, end = range.end, "formatted range");
    Ok(build_edits(text, range, formatted))
}

fn validate(text: &str, range: &Range<usize>) -> Result<(), FormatError> {
    if range.start > range.end {
        return Err(FormatError::RangeInverted {
            start: range.start,
            end: range.end,
        });
    }
    if range.end > text.len() {
        return Err(FormatError::RangeOutOfBounds {
            range: range.clone(),
            len: text.len(),
        });
    }
    for offset in [range.start, range.end] {
        if !text.is_char_boundary(offset) {
            return Err(FormatError::NotCharBoundary(offset));
        }
    }
    Ok(())
}

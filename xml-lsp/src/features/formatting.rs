//! Formatting requests
//!
//!     Thin adapters between LSP types and the `xml-format` engine. The engine returns at most
//!     one byte-offset edit; here it becomes a `TextEdit` with UTF-16 positions.

use lsp_types::{FormattingOptions, Range, TextEdit};
use xml_format::{Edit, FormatError, FormatSettings, IndentOptions};

use crate::location::LineIndex;

/// Engine indentation from the editor's per-request options.
pub fn indent_options(options: &FormattingOptions) -> IndentOptions {
    let indent = if options.insert_spaces {
        IndentOptions::spaces(options.tab_size as usize)
    } else {
        IndentOptions::tabs()
    };
    indent.with_final_newline(options.insert_final_newline.unwrap_or(false))
}

/// Produce formatting edits for the entire document.
pub fn format_document(
    text: &str,
    options: &FormattingOptions,
    settings: &FormatSettings,
) -> Vec<TextEdit> {
    let edits = xml_format::format_whole(text, &indent_options(options), settings);
    to_text_edits(text, edits)
}

/// Produce formatting edits limited to the provided LSP range.
pub fn format_range(
    text: &str,
    range: Range,
    options: &FormattingOptions,
    settings: &FormatSettings,
) -> Result<Vec<TextEdit>, FormatError> {
    let index = LineIndex::new(text);
    let start = index.offset(text, range.start);
    let end = index.offset(text, range.end);
    let edits = xml_format::format_range(text, start..end, &indent_options(options), settings)?;
    Ok(to_text_edits(text, edits))
}

fn to_text_edits(text: &str, edits: Vec<Edit>) -> Vec<TextEdit> {
    if edits.is_empty() {
        return Vec::new();
    }
    let index = LineIndex::new(text);
    edits
        .into_iter()
        .map(|edit| TextEdit {
            range: Range {
                start: index.position(text, edit.start),
                end: index.position(text, edit.end),
            },
            new_text: edit.new_text,
        })
        .collect()
}

/// Apply LSP edits to `text`, last edit first. Used by tests to check edits end to end.
#[cfg(test)]
pub(crate) fn apply_text_edits(text: &str, edits: &[TextEdit]) -> String {
    let index = LineIndex::new(text);
    let mut spans: Vec<_> = edits
        .iter()
        .map(|edit| {
            (
                index.offset(text, edit.range.start),
                index.offset(text, edit.range.end),
                edit.new_text.as_str(),
            )
        })
        .collect();
    spans.sort_by_key(|(start, _, _)| *start);
    let mut result = text.to_string();
    for (start, end, new_text) in spans.into_iter().rev() {
        result.replace_range(start..end, new_text);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;

    const FIXTURE: &str = "<root>\n<keep/>\n    <list><item/></list>\n</root>\n";

    fn options(tab_size: u32, insert_spaces: bool) -> FormattingOptions {
        FormattingOptions {
            tab_size,
            insert_spaces,
            ..FormattingOptions::default()
        }
    }

    #[test]
    fn editor_options_drive_indentation() {
        assert_eq!(indent_options(&options(4, true)).indent_unit(), "    ");
        assert_eq!(indent_options(&options(4, false)).indent_unit(), "\t");

        let with_newline = FormattingOptions {
            insert_final_newline: Some(true),
            ..options(2, true)
        };
        assert!(indent_options(&with_newline).insert_final_newline);
        assert!(!indent_options(&options(2, true)).insert_final_newline);
    }

    #[test]
    fn zero_tab_size_falls_back_to_one_space() {
        assert_eq!(indent_options(&options(0, true)).indent_unit(), " ");
        let edits = format_document("<a><b/></a>", &options(0, true), &FormatSettings::default());
        assert_eq!(apply_text_edits("<a><b/></a>", &edits), "<a>\n <b/>\n</a>");
    }

    #[test]
    fn formats_entire_document() {
        let edits = format_document(FIXTURE, &options(2, true), &FormatSettings::default());
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].range.start, Position::new(0, 0));
        assert_eq!(edits[0].range.end, Position::new(4, 0));
        assert_eq!(
            apply_text_edits(FIXTURE, &edits),
            "<root>\n  <keep/>\n  <list>\n    <item/>\n  </list>\n</root>"
        );
    }

    #[test]
    fn range_formatting_touches_only_the_selection() {
        let range = Range {
            start: Position::new(2, 0),
            end: Position::new(3, 0),
        };
        let edits =
            format_range(FIXTURE, range, &options(2, true), &FormatSettings::default()).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].range, range);
        assert_eq!(
            apply_text_edits(FIXTURE, &edits),
            "<root>\n<keep/>\n<list>\n  <item/>\n</list>\n</root>\n"
        );
    }

    #[test]
    fn no_edits_when_already_formatted() {
        let source = "<a>\n  <b/>\n</a>";
        assert!(format_document(source, &options(2, true), &FormatSettings::default()).is_empty());
    }

    #[test]
    fn edit_positions_use_utf16_columns() {
        let source = "<p>𝄞</p><q/>";
        let edits = format_document(source, &options(2, true), &FormatSettings::default());
        assert_eq!(edits[0].range.end, Position::new(0, 13));
    }
}

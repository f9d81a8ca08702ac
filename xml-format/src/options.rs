//! Formatting inputs
//!
//!     Two groups of knobs reach the engine. [`IndentOptions`] come from the editor with every
//!     request (tab size, spaces vs tabs) and are never persisted. [`FormatSettings`] are the
//!     user's `xml.format` settings, resolved by the caller before the engine runs and read-only
//!     for the duration of a run.
//!
//!     Settings travel over the wire as camelCase JSON. Missing keys fall back to the defaults
//!     listed on each field, so a partial settings object from a client is always usable.

use serde::{Deserialize, Serialize};

/// Per-request indentation options supplied by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentOptions {
    /// Number of spaces in one indent unit. Ignored when `use_spaces` is false.
    pub unit_width: usize,
    pub use_spaces: bool,
    /// Append a single line ending after the trimmed output.
    pub insert_final_newline: bool,
}

impl IndentOptions {
    /// `unit_width` spaces per level. A width of zero is raised to one.
    pub fn spaces(unit_width: usize) -> Self {
        Self {
            unit_width: unit_width.max(1),
            use_spaces: true,
            insert_final_newline: false,
        }
    }

    pub fn tabs() -> Self {
        Self {
            unit_width: 1,
            use_spaces: false,
            insert_final_newline: false,
        }
    }

    pub fn with_final_newline(mut self, insert: bool) -> Self {
        self.insert_final_newline = insert;
        self
    }

    /// The literal string prepended once per nesting level.
    pub fn indent_unit(&self) -> String {
        if self.use_spaces {
            " ".repeat(self.unit_width)
        } else {
            "\t".to_string()
        }
    }
}

impl Default for IndentOptions {
    fn default() -> Self {
        Self::spaces(2)
    }
}

/// How attributes of a start tag are distributed over lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapAttributes {
    /// One line, wrapped only past `wrap_line_length`.
    #[default]
    Auto,
    /// Every attribute after the first on its own line.
    Force,
    /// As `Force`, continuation lines aligned with the first attribute.
    ForceAligned,
    /// Tag name, each attribute and the closing bracket on their own lines.
    ForceExpandMultiline,
    /// As `Auto`, continuation lines aligned with the first attribute.
    AlignedMultiple,
    /// Keep the line grouping found in the source.
    Preserve,
    /// As `Preserve`, continuation lines aligned with the first attribute.
    PreserveAligned,
}

impl WrapAttributes {
    pub fn is_aligned(self) -> bool {
        matches!(
            self,
            WrapAttributes::ForceAligned
                | WrapAttributes::AlignedMultiple
                | WrapAttributes::PreserveAligned
        )
    }
}

/// Resolved `xml.format` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatSettings {
    /// Master switch. When false no edits are ever produced.
    #[serde(rename = "enable")]
    pub enabled: bool,
    /// Keep blank lines between elements.
    pub preserve_new_lines: bool,
    /// Cap on consecutive preserved blank lines; `None` keeps every one.
    pub max_preserve_new_lines: Option<usize>,
    /// Column limit used when wrapping start-tag attributes. Text content is never wrapped.
    pub wrap_line_length: Option<usize>,
    /// Accepted for settings compatibility; nesting is always indented.
    pub indent_inner_xml: bool,
    pub wrap_attributes: WrapAttributes,
    /// Continuation indent for wrapped attributes, in spaces. Defaults to one indent unit.
    pub wrap_attributes_indent_size: Option<usize>,
    /// Text between two occurrences of this marker is passed through untouched.
    pub unformatted_content_delimiter: Option<String>,
}

impl FormatSettings {
    pub(crate) fn unformatted_delimiter(&self) -> Option<&str> {
        self.unformatted_content_delimiter
            .as_deref()
            .filter(|delimiter| !delimiter.is_empty())
    }
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            preserve_new_lines: true,
            max_preserve_new_lines: None,
            wrap_line_length: None,
            indent_inner_xml: false,
            wrap_attributes: WrapAttributes::Auto,
            wrap_attributes_indent_size: None,
            unformatted_content_delimiter: None,
        }
    }
}

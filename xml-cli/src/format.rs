//! Formatting of CLI inputs
//!
//!     Each input (a file or stdin) is read whole, formatted with the engine and then printed,
//!     diffed or written back depending on the mode. `--lines` restricts formatting to a
//!     1-based inclusive line span, which is converted to a byte range and handed to the range
//!     adapter.

use std::fs;
use std::io::{self, Read, Write};
use std::ops::Range;
use std::path::PathBuf;

use similar::TextDiff;
use thiserror::Error;
use tracing::{debug, info};
use xml_format::{format_range, format_whole, Edit, FormatError, FormatSettings, IndentOptions};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid --lines value `{0}`: expected START:END with 1 <= START <= END")]
    Lines(String),
    #[error("{path}: line range {start}:{end} is past the end of the input")]
    LinesPastEnd {
        path: String,
        start: usize,
        end: usize,
    },
    #[error("{path}: {source}")]
    Format {
        path: String,
        #[source]
        source: FormatError,
    },
}

/// What to do with the formatted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Print,
    Check,
    Write,
}

/// 1-based inclusive line span from `--lines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn parse(value: &str) -> Result<Self, CliError> {
        let invalid = || CliError::Lines(value.to_string());
        let (start, end) = value.split_once(':').ok_or_else(invalid)?;
        let start: usize = start.trim().parse().map_err(|_| invalid())?;
        let end: usize = end.trim().parse().map_err(|_| invalid())?;
        if start == 0 || end < start {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }

    /// Byte range covering the span's lines in `text`, including the last line's line ending.
    fn byte_range(self, text: &str) -> Option<Range<usize>> {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        let start = *line_starts.get(self.start - 1)?;
        if start == text.len() && self.start > 1 {
            return None;
        }
        let end = line_starts.get(self.end).copied().unwrap_or(text.len());
        Some(start..end)
    }
}

/// One thing to format: a path or stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Input::Stdin
        } else {
            Input::File(PathBuf::from(arg))
        }
    }

    pub fn name(&self) -> String {
        match self {
            Input::Stdin => "<stdin>".to_string(),
            Input::File(path) => path.display().to_string(),
        }
    }

    fn read(&self) -> Result<String, CliError> {
        let io_error = |source| CliError::Io {
            path: self.name(),
            source,
        };
        match self {
            Input::Stdin => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text).map_err(io_error)?;
                Ok(text)
            }
            Input::File(path) => fs::read_to_string(path).map_err(io_error),
        }
    }
}

pub struct Formatter {
    pub indent: IndentOptions,
    pub settings: FormatSettings,
    pub lines: Option<LineSpan>,
    pub mode: Mode,
}

impl Formatter {
    /// Format `text` and return the full resulting document.
    pub fn format(&self, name: &str, text: &str) -> Result<String, CliError> {
        let edits: Vec<Edit> = match self.lines {
            None => format_whole(text, &self.indent, &self.settings),
            Some(span) => {
                let range = span
                    .byte_range(text)
                    .ok_or_else(|| CliError::LinesPastEnd {
                        path: name.to_string(),
                        start: span.start,
                        end: span.end,
                    })?;
                // A partial range never gets the document's final newline.
                let indent = self.indent.with_final_newline(false);
                format_range(text, range, &indent, &self.settings).map_err(|source| {
                    CliError::Format {
                        path: name.to_string(),
                        source,
                    }
                })?
            }
        };
        debug!(input = name, edits = edits.len(), "formatted input");
        Ok(match edits.first() {
            Some(edit) => edit.apply(text),
            None => text.to_string(),
        })
    }

    /// Process one input. Returns true when the input was not already formatted.
    pub fn run(&self, input: &Input, out: &mut impl Write) -> Result<bool, CliError> {
        let name = input.name();
        let source = input.read()?;
        let formatted = self.format(&name, &source)?;
        let changed = formatted != source;
        let io_error = |source| CliError::Io {
            path: name.clone(),
            source,
        };

        match (self.mode, input) {
            (Mode::Check, _) => {
                if changed {
                    let diff = TextDiff::from_lines(&source, &formatted);
                    let new_name = format!("{name} (formatted)");
                    write!(
                        out,
                        "{}",
                        diff.unified_diff()
                            .context_radius(3)
                            .header(&name, &new_name)
                    )
                    .map_err(io_error)?;
                }
            }
            (Mode::Write, Input::File(path)) => {
                if changed {
                    fs::write(path, &formatted).map_err(io_error)?;
                    info!(path = %name, "reformatted");
                }
            }
            (Mode::Print, _) | (Mode::Write, Input::Stdin) => {
                out.write_all(formatted.as_bytes()).map_err(io_error)?;
            }
        }
        Ok(changed)
    }
}

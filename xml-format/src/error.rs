use std::ops::Range;

use thiserror::Error;

/// Errors raised by the range entry point when the caller's coordinates are unusable.
///
/// Malformed XML is never an error: the engine always produces output for any text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("range {}..{} exceeds document length {len}", range.start, range.end)]
    RangeOutOfBounds { range: Range<usize>, len: usize },

    #[error("range start {start} is after range end {end}")]
    RangeInverted { start: usize, end: usize },

    #[error("offset {0} does not fall on a character boundary")]
    NotCharBoundary(usize),
}

//! XML formatting engine
//!
//!     Re-indents and re-lines XML text according to its element nesting and returns at most one
//!     replacement edit. Comments, processing instructions, DOCTYPE declarations, CDATA sections
//!     and unformatted regions are copied through untouched apart from the indentation of their
//!     first line.
//!
//!     This is a pure lib: no I/O, no global state. Every call builds its own engine state, so
//!     concurrent calls need no coordination. The request transport (LSP, CLI) lives in the
//!     sibling crates.
//!
//! Pipeline
//!
//!     raw text
//!       -> scanner   structural records (tags, text lines, blank lines, verbatim lines)
//!       -> depth     nesting depth and verbatim state per record
//!       -> render    indent prefix, blank-line policy, attribute layout
//!       -> edit      trim, compare with the original, 0 or 1 edit
//!
//!     Range formatting (see `range`) wraps the same pipeline around a sub-span of the document.
//!
//! Robustness
//!
//!     The engine never refuses input. Unbalanced closing tags clamp the depth at zero,
//!     unterminated comments and CDATA sections run to the end of the text, and anything the
//!     scanner cannot classify is rendered as text at the current depth. The only error is an
//!     unusable range passed to [`format_range`].

pub mod depth;
pub mod edit;
pub mod error;
pub mod options;
pub mod range;
pub mod render;
pub mod scanner;
pub mod tag;

pub use depth::{DepthTracker, EngineState};
pub use edit::{format_text, format_whole, Edit};
pub use error::FormatError;
pub use options::{FormatSettings, IndentOptions, WrapAttributes};
pub use range::format_range;
pub use scanner::{scan, Line, LineKind};

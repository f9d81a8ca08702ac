//! Language Server Protocol (LSP) implementation for XML formatting
//!
//!     This crate exposes the `xml-format` engine to any LSP-compatible editor. It answers two
//!     requests, `textDocument/formatting` and `textDocument/rangeFormatting`, and keeps just
//!     enough state to do so: the open documents' text and the resolved formatting settings per
//!     document.
//!
//! Architecture
//!
//!     LSP Layer (tower-lsp):
//!         - JSON-RPC transport, capability negotiation, request routing
//!
//!     Server Layer (`server`):
//!         - Implements the LanguageServer trait
//!         - Document store (full sync) and settings resolution
//!         - Never fails a request: problems are logged and answered with an empty edit list
//!
//!     Feature Layer (`features`):
//!         - Converts LSP positions and formatting options to engine inputs and engine edits
//!           back to `TextEdit`s
//!         - Stateless, with dense unit tests
//!
//! Settings
//!
//!     Formatting settings live under the `xml.format` section. When the client supports
//!     `workspace/configuration` the server pulls that section for each document on first use,
//!     merges it key by key over its base settings (built-in defaults or `--config FILE`) and
//!     caches the result (see `settings`). The cache entry is dropped when the document closes
//!     and the whole cache is dropped on `workspace/didChangeConfiguration`.
//!
//! Usage
//!
//!     $ xml-lsp [--config FILE]
//!     Starts the language server on stdin/stdout. Logs go to stderr; set `XML_LSP_LOG` to a
//!     tracing filter (e.g. `debug`) to change the level.

pub mod features;
pub mod location;
pub mod server;
pub mod settings;

pub use server::XmlLanguageServer;

//! Depth tracking
//!
//!     A two-variable state machine walked once per record, in order. It answers one question
//!     for the renderer: at which nesting depth does this record go?
//!
//!     Opening tags render at the current depth and push the following records one level
//!     deeper. Closing tags pop first and render at the popped depth, so they line up with their
//!     opening tag. Everything else leaves the depth alone. While a verbatim span is open the
//!     depth is frozen until the record that closes the span has been rendered.
//!
//!     Unbalanced input never fails: extra closing tags clamp at depth 0.

use crate::scanner::{Line, LineKind};

/// Per-run engine state. Fresh for every formatting call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineState {
    pub depth: usize,
    pub in_verbatim: bool,
}

#[derive(Debug, Default)]
pub struct DepthTracker {
    state: EngineState,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn in_verbatim(&self) -> bool {
        self.state.in_verbatim
    }

    /// Consume `line` and return the depth it renders at.
    pub fn advance(&mut self, line: &Line<'_>) -> usize {
        let state = &mut self.state;
        if state.in_verbatim {
            if line.kind == LineKind::VerbatimClose {
                state.in_verbatim = false;
            }
            return state.depth;
        }

        match line.kind {
            LineKind::ClosingTag => {
                state.depth = state.depth.saturating_sub(1);
                state.depth
            }
            LineKind::OpeningTag => {
                let depth = state.depth;
                state.depth += 1;
                depth
            }
            LineKind::Declaration
            | LineKind::CommentOpen
            | LineKind::CdataOpen
            | LineKind::Unformatted => {
                state.in_verbatim = line.opens_verbatim;
                state.depth
            }
            LineKind::Blank
            | LineKind::SelfClosingTag
            | LineKind::InlineElement
            | LineKind::Text
            | LineKind::VerbatimInner
            | LineKind::VerbatimClose => state.depth,
        }
    }
}

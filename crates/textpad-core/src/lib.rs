#![warn(missing_docs)]
//! Textpad Core - the editing and search engine of a desktop text editor
//!
//! # Overview
//!
//! `textpad-core` holds the text state behind the editor window and the edits applied to it.
//! It draws nothing and owns no window, menu or settings file: the host feeds it input events
//! and resolved settings, and renders the text, cursor and highlight spans it reports.
//!
//! # Core Features
//!
//! - **Text buffers**: rope-backed text with cursor, selection, modified flag, retained encoding
//!   and line ending, and bounded undo/redo
//! - **Multiple cursors**: secondary cursors, cursors above/below, column selection, and edits
//!   applied at every cursor in one step
//! - **Auto-pairing**: brackets and quotes close themselves, wrap selections and type through
//! - **Indentation-aware editing**: carried-forward indentation, bracket newline expansion,
//!   indent-level backspace
//! - **Match highlighting**: partner of the bracket or quote next to the cursor
//! - **Find/replace**: literal or regex, case and whole-word options, one buffer or every open
//!   buffer, with per-file counts
//!
//! # Data Flow
//!
//! ```text
//! keystroke ──► AutoPairEngine ──► TextBuffer ──► MatchHighlighter ──► repaint
//!                                      ▲
//! find/replace request ──► search ─────┘ (via DocumentSet)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use textpad_core::{AutoPairEngine, EditorConfig, InputEvent, MatchHighlighter, TextBuffer};
//!
//! let engine = AutoPairEngine::new(&EditorConfig::default());
//! let mut buffer = TextBuffer::new("");
//! let mut highlighter = MatchHighlighter::new();
//!
//! for event in [InputEvent::Char('{'), InputEvent::Newline] {
//!     engine.dispatch(&mut buffer, &event).unwrap();
//! }
//! assert_eq!(buffer.text(), "{\n    \n}");
//!
//! // The cursor sits on the indented line; no delimiter is adjacent.
//! assert!(highlighter.refresh(&buffer).is_empty());
//! ```
//!
//! ## Find and replace across open buffers
//!
//! ```rust
//! use textpad_core::search::{self, Replacement, SearchQuery};
//! use textpad_core::{DocumentSet, TextBuffer};
//!
//! let mut docs = DocumentSet::new();
//! docs.open(TextBuffer::new("let a = 1;")).unwrap();
//! docs.open(TextBuffer::new("let b = a;")).unwrap();
//!
//! let query = SearchQuery::literal("a").whole_word(true);
//! let result = search::replace_all(&query, &Replacement::new("x"), &mut docs).unwrap();
//! assert_eq!(result.replacements_made, 2);
//! assert_eq!(result.files_affected, 2);
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - editable text, cursors, selection and undo/redo
//! - [`column_selection`] - rectangular selection and its conversion to cursors
//! - [`auto_pair`] - structural edits on typed input
//! - [`highlight`] - bracket/quote partner highlighting
//! - [`search`] - find, find next/previous, replace one/all
//! - [`documents`] - the set of open buffers
//! - [`io`] - load/save collaborator with encoding detection
//! - [`config`] - resolved editing settings
//!
//! # Logging
//!
//! The crate logs through the [`log`] facade and installs no logger.

pub mod auto_pair;
pub mod buffer;
pub mod column_selection;
pub mod config;
pub mod documents;
pub mod highlight;
mod history;
pub mod io;
pub mod line_ending;
pub mod pairs;
pub mod search;

pub use auto_pair::{AutoPairEngine, InputEvent, InputOutcome, apply_default};
pub use buffer::{
    DeleteDirection, EditError, Position, Selection, SelectionDirection, TextBuffer,
};
pub use column_selection::{ColumnRange, ColumnSelection};
pub use config::EditorConfig;
pub use documents::{BufferId, DocumentError, DocumentSet};
pub use highlight::{MatchHighlighter, find_pair_spans};
pub use io::{DocumentIo, FileIoError, FsDocumentIo, LoadedText};
pub use line_ending::LineEnding;
pub use pairs::{PAIRS, Pair};
pub use search::{
    BufferMatches, DocumentMatches, MatchSpan, ReplaceResult, Replacement, SearchError,
    SearchQuery, SearchScope, SearchSummary,
};

//! Line ending helpers.
//!
//! `textpad-core` keeps buffer text LF-only (`'\n'`). Files that use CRLF (`"\r\n"`) or lone CR
//! are normalized on load, and the detected line ending is re-applied when the buffer is saved.

use serde::{Deserialize, Serialize};

/// The newline sequence used when writing a buffer back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// Detect the line ending of freshly loaded text.
    ///
    /// Any CRLF in the input selects [`LineEnding::Crlf`]; everything else is [`LineEnding::Lf`].
    pub fn detect_in_text(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    /// The literal newline sequence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }

    /// Convert LF-normalized buffer text to this line ending.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_string(),
            Self::Crlf => text.replace('\n', self.as_str()),
        }
    }
}

/// Normalize CRLF and lone CR to LF.
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_crlf_and_round_trips() {
        let raw = "a\r\nb\r\n";
        let ending = LineEnding::detect_in_text(raw);
        assert_eq!(ending, LineEnding::Crlf);

        let normalized = normalize_line_endings(raw);
        assert_eq!(normalized, "a\nb\n");
        assert_eq!(ending.apply_to_text(&normalized), raw);
    }

    #[test]
    fn lone_cr_becomes_lf() {
        assert_eq!(normalize_line_endings("a\rb"), "a\nb");
        assert_eq!(LineEnding::detect_in_text("a\rb"), LineEnding::Lf);
    }
}

//! Bracket and quote pair table shared by auto-pairing and match highlighting, plus the word
//! character class used by whole-word search and word selection.

/// An opening delimiter and its closing counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    /// Opening delimiter.
    pub open: char,
    /// Closing delimiter.
    pub close: char,
}

impl Pair {
    /// `true` for quotes, where opener and closer are the same character.
    pub fn is_symmetric(&self) -> bool {
        self.open == self.close
    }
}

/// The pairs the editor knows about.
pub const PAIRS: &[Pair] = &[
    Pair {
        open: '(',
        close: ')',
    },
    Pair {
        open: '[',
        close: ']',
    },
    Pair {
        open: '{',
        close: '}',
    },
    Pair {
        open: '"',
        close: '"',
    },
    Pair {
        open: '\'',
        close: '\'',
    },
];

/// Pair whose opener is `ch`.
pub fn pair_for_open(ch: char) -> Option<Pair> {
    PAIRS.iter().copied().find(|pair| pair.open == ch)
}

/// Pair whose closer is `ch`.
pub fn pair_for_close(ch: char) -> Option<Pair> {
    PAIRS.iter().copied().find(|pair| pair.close == ch)
}

/// `true` if `ch` is `(`, `[` or `{`.
pub fn is_open_bracket(ch: char) -> bool {
    pair_for_open(ch).is_some_and(|pair| !pair.is_symmetric())
}

/// `true` if `ch` is `)`, `]` or `}`.
pub fn is_close_bracket(ch: char) -> bool {
    pair_for_close(ch).is_some_and(|pair| !pair.is_symmetric())
}

/// `true` if `ch` is a quote from the pair table.
pub fn is_quote(ch: char) -> bool {
    pair_for_open(ch).is_some_and(|pair| pair.is_symmetric())
}

/// `true` for characters that make up words: alphanumerics and `_`.
pub fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

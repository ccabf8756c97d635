//! File I/O collaborator.
//!
//! [`crate::TextBuffer`] never touches the file system directly. It consumes the two operations
//! of [`DocumentIo`]: `load` (bytes -> text + detected encoding) and `save` (text + retained
//! encoding -> bytes). [`FsDocumentIo`] is the file-system implementation; tests and hosts with
//! virtual file systems can supply their own.

use crate::line_ending::{LineEnding, normalize_line_endings};
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Text decoded from a file, ready to populate a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedText {
    /// LF-normalized content.
    pub text: String,
    /// Encoding the bytes were decoded with.
    pub encoding: &'static Encoding,
    /// Line ending found in the file.
    pub line_ending: LineEnding,
}

/// Errors from the file I/O collaborator.
#[derive(Debug, Error)]
pub enum FileIoError {
    /// Reading the file failed.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Writing the file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The buffer has no path to save to.
    #[error("buffer has no file path")]
    Untitled,
    /// The content contains characters the retained encoding cannot represent.
    #[error("text cannot be represented in {encoding}")]
    Unencodable {
        /// Name of the target encoding.
        encoding: &'static str,
    },
}

/// Load/save operations consumed by [`crate::TextBuffer`].
pub trait DocumentIo {
    /// Read `path` and decode it, detecting its encoding.
    fn load(&self, path: &Path) -> Result<LoadedText, FileIoError>;

    /// Encode `text` with `encoding` and `line_ending` and write it to `path`.
    fn save(
        &self,
        path: &Path,
        text: &str,
        encoding: &'static Encoding,
        line_ending: LineEnding,
    ) -> Result<(), FileIoError>;
}

/// [`DocumentIo`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentIo;

impl DocumentIo for FsDocumentIo {
    fn load(&self, path: &Path) -> Result<LoadedText, FileIoError> {
        let bytes = std::fs::read(path).map_err(|source| FileIoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = decode_bytes(&bytes);
        log::debug!(
            "loaded {} ({}, {:?}, {} bytes)",
            path.display(),
            loaded.encoding.name(),
            loaded.line_ending,
            bytes.len()
        );
        Ok(loaded)
    }

    fn save(
        &self,
        path: &Path,
        text: &str,
        encoding: &'static Encoding,
        line_ending: LineEnding,
    ) -> Result<(), FileIoError> {
        let bytes = encode_text(text, encoding, line_ending)?;
        std::fs::write(path, &bytes).map_err(|source| FileIoError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "saved {} ({}, {:?}, {} bytes)",
            path.display(),
            encoding.name(),
            line_ending,
            bytes.len()
        );
        Ok(())
    }
}

/// Detect the encoding of `bytes`, returning it with the length of any byte-order mark.
///
/// Order: byte-order mark, then strict UTF-8, then a statistical guess.
pub fn detect_encoding(bytes: &[u8]) -> (&'static Encoding, usize) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return (encoding, bom_len);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return (UTF_8, 0);
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    (detector.guess(None, true), 0)
}

/// Decode raw file bytes into LF-normalized text.
pub fn decode_bytes(bytes: &[u8]) -> LoadedText {
    let (encoding, bom_len) = detect_encoding(bytes);
    let (decoded, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        log::warn!(
            "malformed sequences replaced while decoding as {}",
            encoding.name()
        );
    }

    let line_ending = LineEnding::detect_in_text(&decoded);
    LoadedText {
        text: normalize_line_endings(&decoded),
        encoding,
        line_ending,
    }
}

/// Encode LF-normalized text for writing.
pub fn encode_text(
    text: &str,
    encoding: &'static Encoding,
    line_ending: LineEnding,
) -> Result<Vec<u8>, FileIoError> {
    let text = line_ending.apply_to_text(text);

    // encoding_rs never encodes to UTF-16; its encoder falls back to UTF-8 for those labels.
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let little_endian = encoding == UTF_16LE;
        let mut out = Vec::with_capacity(2 + text.len() * 2);
        let bom: u16 = 0xFEFF;
        for unit in std::iter::once(bom).chain(text.encode_utf16()) {
            if little_endian {
                out.extend_from_slice(&unit.to_le_bytes());
            } else {
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
        return Ok(out);
    }

    let (encoded, _, had_unmappable) = encoding.encode(&text);
    if had_unmappable {
        return Err(FileIoError::Unencodable {
            encoding: encoding.name(),
        });
    }
    Ok(match encoded {
        Cow::Borrowed(bytes) => bytes.to_vec(),
        Cow::Owned(bytes) => bytes,
    })
}

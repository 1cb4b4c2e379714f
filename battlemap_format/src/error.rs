// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

/// Errors raised while reading the token format.
///
/// Line numbers are 1-based and refer to the input text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// A token of the wrong kind was found.
    #[error("line {line}: expected {expected}, found `{found}`")]
    UnexpectedToken {
        /// Line of the offending token.
        line: usize,
        /// What the reader was looking for.
        expected: &'static str,
        /// The token text that was found.
        found: String,
    },
    /// A number token could not be parsed.
    #[error("line {line}: invalid number `{token}`")]
    InvalidNumber {
        /// Line of the offending token.
        line: usize,
        /// The token text.
        token: String,
    },
    /// A string literal is malformed.
    #[error("line {line}: invalid string literal")]
    InvalidString {
        /// Line of the offending token.
        line: usize,
    },
    /// A shape object carries a kind tag this version does not know.
    #[error("line {line}: unknown shape kind `{kind}`")]
    UnknownShapeKind {
        /// Line of the kind tag.
        line: usize,
        /// The tag that was found.
        kind: String,
    },
    /// A well-formed value is outside its allowed range.
    #[error("line {line}: {reason}")]
    InvalidValue {
        /// Line of the offending value.
        line: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

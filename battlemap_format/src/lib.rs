// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Battlemap Format: the token-based text format maps are saved in.
//!
//! The format writes one token per line:
//! - `{` and `}` delimit objects, `[` and `]` delimit arrays,
//! - numbers use Rust's shortest round-trip formatting (`inf` included),
//! - `true` / `false`,
//! - double-quoted strings with `\"`, `\\`, `\n`, `\r`, `\t` and `\u{..}`
//!   escapes.
//!
//! Objects are positional: a type writes its fields in a fixed order and
//! reads them back in the same order. Newer writers may append fields; older
//! readers skip them in [`TokenReader::expect_object_end`].
//!
//! Loading is best-effort. [`TokenReader::read_array`] reads each element
//! through [`TokenReader::read_or_recover`], so one corrupt shape or token is
//! logged and skipped without failing the rest of the map.
//!
//! ## Example
//!
//! ```rust
//! use battlemap_format::{Persist, TokenReader, TokenWriter, FormatError};
//!
//! #[derive(Debug, PartialEq)]
//! struct Marker {
//!     label: String,
//!     radius: f64,
//! }
//!
//! impl Persist for Marker {
//!     fn serialize(&self, w: &mut TokenWriter) {
//!         w.begin_object();
//!         w.write_str(&self.label);
//!         w.write_f64(self.radius);
//!         w.end_object();
//!     }
//!
//!     fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
//!         r.expect_object_begin()?;
//!         let label = r.read_string()?;
//!         let radius = r.read_f64()?;
//!         r.expect_object_end()?;
//!         Ok(Self { label, radius })
//!     }
//! }
//!
//! let text = battlemap_format::to_string(&Marker { label: "camp".into(), radius: 2.5 });
//! // A newer version appended a field; this reader skips it.
//! let newer = text.replacen("}", "true\n}", 1);
//! let back: Marker = battlemap_format::from_str(&newer).unwrap();
//! assert_eq!(back, Marker { label: "camp".into(), radius: 2.5 });
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod error;
mod impls;
mod reader;
mod writer;

use alloc::string::String;

pub use error::FormatError;
pub use reader::{Token, TokenReader};
pub use writer::TokenWriter;

/// Types that can be written to and read back from the token format.
pub trait Persist: Sized {
    /// Writes `self` as a balanced sequence of tokens.
    fn serialize(&self, w: &mut TokenWriter);

    /// Reads a value written by [`Persist::serialize`].
    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError>;
}

/// Serializes `value` into a fresh string.
#[must_use]
pub fn to_string<T: Persist>(value: &T) -> String {
    let mut w = TokenWriter::new();
    value.serialize(&mut w);
    w.finish()
}

/// Deserializes a `T` from `text`.
///
/// Tokens left over after the value are ignored with a warning.
pub fn from_str<T: Persist>(text: &str) -> Result<T, FormatError> {
    let mut r = TokenReader::new(text);
    let value = T::deserialize(&mut r)?;
    if !r.is_at_end() {
        log::warn!("line {}: ignoring trailing tokens", r.line());
    }
    Ok(value)
}

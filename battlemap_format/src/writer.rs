// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use core::fmt::Write as _;

/// Writes the line-per-token format.
///
/// Every call emits exactly one token followed by a newline. The writer does
/// not check nesting; [`Persist`](crate::Persist) impls are expected to
/// balance their own delimiters.
#[derive(Clone, Debug, Default)]
pub struct TokenWriter {
    out: String,
}

impl TokenWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `{`.
    pub fn begin_object(&mut self) {
        self.raw("{");
    }

    /// Emits `}`.
    pub fn end_object(&mut self) {
        self.raw("}");
    }

    /// Emits `[`.
    pub fn begin_array(&mut self) {
        self.raw("[");
    }

    /// Emits `]`.
    pub fn end_array(&mut self) {
        self.raw("]");
    }

    /// Emits a floating-point number; infinities are written as `inf`/`-inf`.
    pub fn write_f64(&mut self, value: f64) {
        let _ = writeln!(self.out, "{value}");
    }

    /// Emits an unsigned integer.
    pub fn write_u64(&mut self, value: u64) {
        let _ = writeln!(self.out, "{value}");
    }

    /// Emits `true` or `false`.
    pub fn write_bool(&mut self, value: bool) {
        self.raw(if value { "true" } else { "false" });
    }

    /// Emits a double-quoted string, escaping quotes, backslashes and
    /// control characters so that the token stays on one line.
    pub fn write_str(&mut self, value: &str) {
        self.out.push('"');
        for ch in value.chars() {
            match ch {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(self.out, "\\u{{{:x}}}", u32::from(c));
                }
                c => self.out.push(c),
            }
        }
        self.out.push_str("\"\n");
    }

    /// Text written so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consumes the writer and returns the text.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn raw(&mut self, token: &str) {
        self.out.push_str(token);
        self.out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::TokenWriter;

    #[test]
    fn one_token_per_line() {
        let mut w = TokenWriter::new();
        w.begin_object();
        w.write_f64(1.5);
        w.write_f64(f64::INFINITY);
        w.write_u64(42);
        w.write_bool(false);
        w.write_str("say \"hi\"\nnow");
        w.end_object();
        assert_eq!(
            w.finish(),
            "{\n1.5\ninf\n42\nfalse\n\"say \\\"hi\\\"\\nnow\"\n}\n"
        );
    }

    #[test]
    fn control_characters_are_escaped() {
        let mut w = TokenWriter::new();
        w.write_str("a\u{7}b");
        assert_eq!(w.as_str(), "\"a\\u{7}b\"\n");
    }
}

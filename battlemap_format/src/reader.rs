// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::FormatError;

/// Classified token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// `true` or `false`.
    Bool(bool),
    /// A double-quoted string, still escaped and including the quotes.
    String(&'a str),
    /// Anything else; parsed on demand.
    Number(&'a str),
}

impl<'a> Token<'a> {
    fn classify(raw: &'a str) -> Self {
        match raw {
            "{" => Self::BeginObject,
            "}" => Self::EndObject,
            "[" => Self::BeginArray,
            "]" => Self::EndArray,
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            s if s.starts_with('"') => Self::String(s),
            s => Self::Number(s),
        }
    }
}

/// Reads the line-per-token format.
///
/// Blank lines are ignored and surrounding whitespace is trimmed. The reader
/// tracks container depth so that a failed item can be skipped up to its
/// closing delimiter with [`TokenReader::read_or_recover`].
#[derive(Clone, Debug)]
pub struct TokenReader<'a> {
    tokens: Vec<(usize, &'a str)>,
    pos: usize,
    depth: usize,
}

impl<'a> TokenReader<'a> {
    /// Tokenizes `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let tokens = input
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let line = line.trim();
                (!line.is_empty()).then_some((i + 1, line))
            })
            .collect();
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Line of the next token, or of the last token at end of input.
    #[must_use]
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |(line, _)| *line)
    }

    /// Number of currently open objects and arrays.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` once every token has been consumed.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The next token, without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|(_, raw)| Token::classify(raw))
    }

    /// Builds an [`FormatError::UnexpectedToken`] for the next token.
    #[must_use]
    pub fn unexpected(&self, expected: &'static str) -> FormatError {
        match self.tokens.get(self.pos) {
            Some((line, raw)) => FormatError::UnexpectedToken {
                line: *line,
                expected,
                found: raw.to_string(),
            },
            None => FormatError::UnexpectedEnd,
        }
    }

    /// Builds an [`FormatError::InvalidValue`] at the current line.
    #[must_use]
    pub fn invalid(&self, reason: &'static str) -> FormatError {
        FormatError::InvalidValue {
            line: self.line(),
            reason,
        }
    }

    fn advance(&mut self) -> Result<Token<'a>, FormatError> {
        let (_, raw) = self.tokens.get(self.pos).ok_or(FormatError::UnexpectedEnd)?;
        let token = Token::classify(raw);
        self.pos += 1;
        match token {
            Token::BeginObject | Token::BeginArray => self.depth += 1,
            Token::EndObject | Token::EndArray => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        Ok(token)
    }

    fn expect(&mut self, want: Token<'static>, expected: &'static str) -> Result<(), FormatError> {
        if self.peek() == Some(want) {
            self.advance().map(drop)
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consumes `{`.
    pub fn expect_object_begin(&mut self) -> Result<(), FormatError> {
        self.expect(Token::BeginObject, "`{`")
    }

    /// Consumes `}`, first skipping any fields this version does not know.
    ///
    /// Skipped fields are logged; a stray `]` is an error.
    pub fn expect_object_end(&mut self) -> Result<(), FormatError> {
        let mut skipped = 0_usize;
        loop {
            match self.peek() {
                None => return Err(FormatError::UnexpectedEnd),
                Some(Token::EndObject) => break,
                Some(Token::EndArray) => return Err(self.unexpected("`}`")),
                Some(_) => {
                    if skipped == 0 {
                        log::warn!("line {}: skipping unknown trailing fields", self.line());
                    }
                    self.skip_value()?;
                    skipped += 1;
                }
            }
        }
        self.advance().map(drop)
    }

    /// Consumes `[`.
    pub fn expect_array_begin(&mut self) -> Result<(), FormatError> {
        self.expect(Token::BeginArray, "`[`")
    }

    /// Consumes `]`.
    pub fn expect_array_end(&mut self) -> Result<(), FormatError> {
        self.expect(Token::EndArray, "`]`")
    }

    /// Returns `true` if the next token is `]`; errors at end of input.
    pub fn at_array_end(&self) -> Result<bool, FormatError> {
        match self.peek() {
            None => Err(FormatError::UnexpectedEnd),
            Some(token) => Ok(token == Token::EndArray),
        }
    }

    /// Reads a number.
    pub fn read_f64(&mut self) -> Result<f64, FormatError> {
        let Some(Token::Number(raw)) = self.peek() else {
            return Err(self.unexpected("a number"));
        };
        let value = raw.parse::<f64>().map_err(|_| FormatError::InvalidNumber {
            line: self.line(),
            token: raw.to_string(),
        })?;
        self.advance()?;
        Ok(value)
    }

    /// Reads a finite number.
    pub fn read_finite_f64(&mut self) -> Result<f64, FormatError> {
        let line = self.line();
        let value = self.read_f64()?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormatError::InvalidValue {
                line,
                reason: "number must be finite",
            })
        }
    }

    /// Reads an unsigned integer.
    pub fn read_u64(&mut self) -> Result<u64, FormatError> {
        let Some(Token::Number(raw)) = self.peek() else {
            return Err(self.unexpected("an integer"));
        };
        let value = raw.parse::<u64>().map_err(|_| FormatError::InvalidNumber {
            line: self.line(),
            token: raw.to_string(),
        })?;
        self.advance()?;
        Ok(value)
    }

    /// Reads `true` or `false`.
    pub fn read_bool(&mut self) -> Result<bool, FormatError> {
        let Some(Token::Bool(value)) = self.peek() else {
            return Err(self.unexpected("`true` or `false`"));
        };
        self.advance()?;
        Ok(value)
    }

    /// Reads and unescapes a string.
    pub fn read_string(&mut self) -> Result<String, FormatError> {
        let Some(Token::String(raw)) = self.peek() else {
            return Err(self.unexpected("a string"));
        };
        let value = unescape(raw).ok_or(FormatError::InvalidString { line: self.line() })?;
        self.advance()?;
        Ok(value)
    }

    /// Consumes one complete value, including nested containers.
    ///
    /// A closing delimiter is not a value and is reported as an error.
    pub fn skip_value(&mut self) -> Result<(), FormatError> {
        match self.peek() {
            None => Err(FormatError::UnexpectedEnd),
            Some(Token::EndObject | Token::EndArray) => Err(self.unexpected("a value")),
            Some(Token::BeginObject | Token::BeginArray) => {
                let depth = self.depth;
                self.advance()?;
                while self.depth > depth {
                    self.advance()?;
                }
                Ok(())
            }
            Some(_) => self.advance().map(drop),
        }
    }

    /// Runs `read`; on failure logs the error, skips to the end of the item
    /// that was being read, and returns `None`.
    ///
    /// After recovery the reader sits at the same depth as before the call,
    /// so the enclosing array or object can continue.
    pub fn read_or_recover<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, FormatError>,
    ) -> Option<T> {
        let depth = self.depth;
        let start = self.pos;
        match read(self) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("skipping unreadable item: {err}");
                while self.depth > depth {
                    if self.advance().is_err() {
                        return None;
                    }
                }
                if self.pos == start && self.depth == depth {
                    // Nothing consumed: drop the offending value itself.
                    let _ = self.skip_value();
                }
                None
            }
        }
    }

    /// Reads `[ item* ]`, recovering from items that fail individually.
    pub fn read_array<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, FormatError>,
    ) -> Result<Vec<T>, FormatError> {
        self.expect_array_begin()?;
        let mut items = Vec::new();
        while !self.at_array_end()? {
            let before = self.pos;
            if let Some(item) = self.read_or_recover(&mut read) {
                items.push(item);
            }
            if self.pos == before {
                return Err(self.unexpected("an array item"));
            }
        }
        self.expect_array_end()?;
        Ok(items)
    }
}

fn unescape(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return None,
            '\\' => match chars.next()? {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'u' => {
                    if chars.next()? != '{' {
                        return None;
                    }
                    let mut code = 0_u32;
                    loop {
                        let c = chars.next()?;
                        if c == '}' {
                            break;
                        }
                        code = code.checked_mul(16)?.checked_add(c.to_digit(16)?)?;
                    }
                    out.push(char::from_u32(code)?);
                }
                _ => return None,
            },
            c => out.push(c),
        }
    }
    Some(out)
}

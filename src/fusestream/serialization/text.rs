//! Order-preserving text encoding for key and value tokens.
//!
//! Keys and values are escaped into separator-safe strings before hitting the
//! wire. Key escaping additionally guarantees that escaped keys compare
//! (code-point-wise) exactly like their originals, which lets an external
//! sort-based shuffle operate directly on escaped key bytes. Value escaping
//! only guarantees an unambiguous round trip.
//!
//! The key technique substitutes a problematic character `c` with
//! `c - 1` followed by `char::MAX`: `c - 1` sorts immediately below any
//! unescaped `c - 1`, and the `char::MAX` suffix sorts above any single
//! character, so relative order is preserved against all strings that do not
//! themselves contain `c - 1` immediately followed by the marker. That
//! residual collision is a documented, accepted limitation of the encoding,
//! not a bug. When `separator - 1` would itself be the newline (or vice
//! versa), a three-character `c - 2` form with a doubled marker is used so
//! the substitution never re-introduces an unescaped delimiter.

use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use std::io::{BufRead, Write};

/// Default key/value separator on the wire
pub const DEFAULT_SEPARATOR: char = '\t';

/// Highest representable character, used as the escape marker suffix
const MARKER: char = char::MAX;

/// Role of a token on the wire, deciding which escape scheme applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    /// Key token: order-preserving escaping
    Key,
    /// Value token: round-trip-only escaping
    Value,
    /// No escaping applied; caller handles the raw text
    Raw,
}

/// What ended a decoded token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Separator,
    Newline,
    Eof,
}

/// Escapes and unescapes key/value strings against one configured separator.
#[derive(Debug, Clone)]
pub struct TextEscaper {
    separator: char,
    // Key escaping: the doubled MARKER is the codec's own escape marker.
    key_escape: String,
    key_escape_sub: String,
    key_separator_sub: String,
    key_newline_sub: String,
    // Value escaping: escape char + one marker letter per substituted char.
    value_escape: char,
    value_escape_sub: String,
    value_separator_sub: String,
    value_newline_sub: String,
}

fn below(c: char, n: u32) -> Option<char> {
    (c as u32).checked_sub(n).and_then(char::from_u32)
}

impl TextEscaper {
    pub fn new(separator: char) -> PipelineResult<Self> {
        if separator == '\n' {
            return Err(PipelineError::invalid_configuration(
                "separator must not be the newline character",
            ));
        }
        if (separator as u32) < 2 || separator >= below(MARKER, 1).unwrap_or(MARKER) {
            return Err(PipelineError::invalid_configuration(format!(
                "separator {:?} must lie strictly between U+0001 and the escape marker",
                separator
            )));
        }

        let sep_below_1 = below(separator, 1).ok_or_else(|| {
            PipelineError::invalid_configuration(format!(
                "separator {:?} has no representable preceding code point",
                separator
            ))
        })?;
        let key_separator_sub = if sep_below_1 != '\n' {
            format!("{}{}", sep_below_1, MARKER)
        } else {
            let sep_below_2 = below(separator, 2).ok_or_else(|| {
                PipelineError::invalid_configuration(format!(
                    "separator {:?} cannot use the three-character escape form",
                    separator
                ))
            })?;
            format!("{}{}{}", sep_below_2, MARKER, MARKER)
        };

        // below('\n', 1) is '\t' and below('\n', 2) is U+0008; both always exist.
        let key_newline_sub = if below('\n', 1) != Some(separator) {
            format!("{}{}", '\t', MARKER)
        } else {
            format!("{}{}{}", '\u{8}', MARKER, MARKER)
        };

        let value_escape = if separator != '#' { '#' } else { '?' };
        let value_escape_sub = format!(
            "{}{}",
            value_escape,
            if separator != 'E' { 'E' } else { 'e' }
        );
        let value_separator_sub = format!(
            "{}{}",
            value_escape,
            if separator != 'S' { 'S' } else { 's' }
        );
        let value_newline_sub = format!(
            "{}{}",
            value_escape,
            if separator != 'N' { 'N' } else { 'n' }
        );

        Ok(TextEscaper {
            separator,
            key_escape: format!("{}{}", MARKER, MARKER),
            key_escape_sub: format!("{}{}", below(MARKER, 1).unwrap_or(MARKER), MARKER),
            key_separator_sub,
            key_newline_sub,
            value_escape,
            value_escape_sub,
            value_separator_sub,
            value_newline_sub,
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Escape a key string, preserving code-point order relative to every
    /// other escaped key.
    pub fn escape_key(&self, key: &str) -> String {
        key.replace(&self.key_escape, &self.key_escape_sub)
            .replace(self.separator, &self.key_separator_sub)
            .replace('\n', &self.key_newline_sub)
    }

    /// Reverse [`escape_key`](Self::escape_key). Substitutions are undone in
    /// the opposite order they were applied.
    pub fn unescape_key(&self, escaped: &str) -> String {
        escaped
            .replace(&self.key_newline_sub, "\n")
            .replace(&self.key_separator_sub, &self.separator.to_string())
            .replace(&self.key_escape_sub, &self.key_escape)
    }

    /// Escape a value string; unambiguous round trip, no order guarantee.
    pub fn escape_value(&self, value: &str) -> String {
        value
            .replace(self.value_escape, &self.value_escape_sub)
            .replace(self.separator, &self.value_separator_sub)
            .replace('\n', &self.value_newline_sub)
    }

    /// Reverse [`escape_value`](Self::escape_value).
    pub fn unescape_value(&self, escaped: &str) -> String {
        escaped
            .replace(&self.value_newline_sub, "\n")
            .replace(&self.value_separator_sub, &self.separator.to_string())
            .replace(&self.value_escape_sub, &self.value_escape.to_string())
    }

    fn unescape(&self, raw: &str, role: TokenRole) -> String {
        match role {
            TokenRole::Key => self.unescape_key(raw),
            TokenRole::Value => self.unescape_value(raw),
            TokenRole::Raw => raw.to_string(),
        }
    }

    fn escape(&self, raw: &str, role: TokenRole) -> String {
        match role {
            TokenRole::Key => self.escape_key(raw),
            TokenRole::Value => self.escape_value(raw),
            TokenRole::Raw => raw.to_string(),
        }
    }
}

impl Default for TextEscaper {
    fn default() -> Self {
        // The default separator is always a legal configuration.
        TextEscaper::new(DEFAULT_SEPARATOR).expect("default separator must validate")
    }
}

/// Writes escaped tokens to an output stream.
pub struct TextEncoder<W: Write> {
    writer: W,
    escaper: TextEscaper,
}

impl<W: Write> TextEncoder<W> {
    pub fn new(writer: W, escaper: TextEscaper) -> Self {
        TextEncoder { writer, escaper }
    }

    pub fn escaper(&self) -> &TextEscaper {
        &self.escaper
    }

    /// Write one token, escaped for its role. No terminator is emitted.
    pub fn write_token(&mut self, token: &str, role: TokenRole) -> PipelineResult<()> {
        let safe = self.escaper.escape(token, role);
        self.writer.write_all(safe.as_bytes())?;
        Ok(())
    }

    /// Write the raw separator between two tokens of one record.
    pub fn write_separator(&mut self) -> PipelineResult<()> {
        let mut buf = [0u8; 4];
        let sep = self.escaper.separator().encode_utf8(&mut buf);
        self.writer.write_all(sep.as_bytes())?;
        Ok(())
    }

    /// Terminate the current record with a raw newline.
    pub fn end_record(&mut self) -> PipelineResult<()> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> PipelineResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads separator/newline-delimited tokens from an input stream.
///
/// Raw separator and newline bytes never appear inside escaped output, so
/// encountering them unescaped is an unambiguous terminator.
pub struct TextDecoder<R: BufRead> {
    reader: R,
    escaper: TextEscaper,
    line: String,
    pos: usize,
}

impl<R: BufRead> TextDecoder<R> {
    pub fn new(reader: R, escaper: TextEscaper) -> Self {
        TextDecoder {
            reader,
            escaper,
            line: String::new(),
            pos: 0,
        }
    }

    pub fn escaper(&self) -> &TextEscaper {
        &self.escaper
    }

    /// Read the next token, unescaped for its role, together with what
    /// terminated it. Returns `None` only on a clean end of input.
    pub fn read_token(
        &mut self,
        role: TokenRole,
    ) -> PipelineResult<Option<(String, Terminator)>> {
        if self.pos >= self.line.len() {
            self.line.clear();
            self.pos = 0;
            let read = self.reader.read_line(&mut self.line)?;
            if read == 0 {
                return Ok(None);
            }
        }

        let rest = &self.line[self.pos..];
        let separator = self.escaper.separator();
        let mut terminator = Terminator::Eof;
        let mut token_end = rest.len();
        let mut consumed = rest.len();
        for (i, ch) in rest.char_indices() {
            if ch == separator {
                terminator = Terminator::Separator;
                token_end = i;
                consumed = i + ch.len_utf8();
                break;
            }
            if ch == '\n' {
                terminator = Terminator::Newline;
                token_end = i;
                consumed = i + 1;
                break;
            }
        }

        let token = self.escaper.unescape(&rest[..token_end], role);
        self.pos += consumed;
        Ok(Some((token, terminator)))
    }
}

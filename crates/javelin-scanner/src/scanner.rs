//! The scanner proper.
//!
//! Produces `Tok`s over a `Preprocessed` source. All spans are reported in
//! original (pre unicode-escape) byte offsets. Scanner errors are fatal to
//! the compilation unit; they carry the offending span and a
//! `DiagnosticKind` the parser turns into a diagnostic.

use crate::token::{KEYWORDS, Tok, TokenKind, TokenValue};
use crate::unicode::Preprocessed;
use javelin_common::{DiagnosticKind, Span};

#[derive(Clone, Debug, PartialEq)]
pub struct ScanError {
    pub span: Span,
    pub kind: DiagnosticKind,
}

impl ScanError {
    fn new(span: Span, kind: DiagnosticKind) -> Self {
        ScanError { span, kind }
    }
}

pub struct Scanner<'src> {
    pre: &'src Preprocessed,
    text: &'src str,
    pos: usize,
    /// Javadoc text captured from the most recent `/** ... */` comment,
    /// consumed by `take_javadoc`.
    pending_javadoc: Option<String>,
}

impl<'src> Scanner<'src> {
    pub fn new(pre: &'src Preprocessed) -> Self {
        Scanner {
            pre,
            text: pre.text(),
            pos: 0,
            pending_javadoc: None,
        }
    }

    /// The javadoc comment preceding the current position, if any. Consumed
    /// on retrieval.
    pub fn take_javadoc(&mut self) -> Option<String> {
        self.pending_javadoc.take()
    }

    /// Scan the next token.
    pub fn next(&mut self) -> Result<Tok, ScanError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(ch) = self.peek_char() else {
            return Ok(Tok::new(TokenKind::Eof, self.span(start, self.pos)));
        };
        if is_ident_start(ch) {
            return Ok(self.scan_ident(start));
        }
        if ch.is_ascii_digit() {
            return self.scan_number(start);
        }
        if ch == '.' && self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit()) {
            return self.scan_decimal(start);
        }
        match ch {
            '\'' => self.scan_char_literal(start),
            '"' => self.scan_string_or_text_block(start),
            _ => self.scan_operator(start),
        }
    }

    // ---------------------------------------------------------------------
    // Low-level cursor
    // ---------------------------------------------------------------------

    fn peek_byte(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn peek_byte_at(&self, ahead: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + ahead).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// A span in original offsets covering `[start, end)` rewritten offsets.
    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(
            self.pre.original_offset(start as u32),
            self.pre.original_offset(end as u32),
        )
    }

    fn span_here(&self, start: usize) -> Span {
        self.span(start, self.pos)
    }

    // ---------------------------------------------------------------------
    // Trivia
    // ---------------------------------------------------------------------

    fn skip_trivia(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek_byte() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0c) => {
                    self.pos += 1;
                }
                Some(b'/') => match self.peek_byte_at(1) {
                    Some(b'/') => {
                        self.pos += 2;
                        while let Some(b) = self.peek_byte() {
                            if b == b'\n' {
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                    Some(b'*') => self.skip_block_comment()?,
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 2;
        // `/**` (but not `/**/`) opens a javadoc comment.
        let is_javadoc = self.peek_byte() == Some(b'*') && self.peek_byte_at(1) != Some(b'/');
        if is_javadoc {
            self.pos += 1;
        }
        let body_start = self.pos;
        loop {
            match self.peek_byte() {
                None => {
                    return Err(ScanError::new(
                        self.span(start, self.pos),
                        DiagnosticKind::UnclosedComment,
                    ));
                }
                Some(b'*') if self.peek_byte_at(1) == Some(b'/') => {
                    if is_javadoc {
                        self.pending_javadoc = Some(self.text[body_start..self.pos].to_string());
                    }
                    self.pos += 2;
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Identifiers and keywords
    // ---------------------------------------------------------------------

    fn scan_ident(&mut self, start: usize) -> Tok {
        while let Some(ch) = self.peek_char() {
            if is_ident_part(ch) {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.text[start..self.pos];
        let span = self.span_here(start);
        match KEYWORDS.get(text) {
            Some(&kind) => Tok::new(kind, span),
            None => Tok {
                kind: TokenKind::Ident,
                span,
                value: TokenValue::Ident(text.to_string()),
            },
        }
    }

    // ---------------------------------------------------------------------
    // Numbers
    // ---------------------------------------------------------------------

    fn scan_number(&mut self, start: usize) -> Result<Tok, ScanError> {
        if self.peek_byte() == Some(b'0') {
            match self.peek_byte_at(1) {
                Some(b'x' | b'X') => {
                    self.pos += 2;
                    return self.scan_hex(start);
                }
                Some(b'b' | b'B') => {
                    self.pos += 2;
                    let digits = self.take_digits(2, start, false)?;
                    return self.finish_integer(start, &digits, 2);
                }
                Some(b'0'..=b'9' | b'_') => {
                    // Leading zero followed by a digit or separator: octal.
                    // A literal like `0.5` falls through to decimal below.
                    self.pos += 1;
                    let digits = self.take_digits(8, start, true)?;
                    return self.finish_integer(start, &digits, 8);
                }
                _ => {}
            }
        }
        self.scan_decimal(start)
    }

    fn invalid_literal(&self, start: usize) -> ScanError {
        let span = self.span_here(start);
        let text = self.text[start..self.pos].to_string();
        ScanError::new(span, DiagnosticKind::InvalidLiteral(text))
    }

    /// Digits (and `_` separators) of the given radix, as a cleaned string.
    /// Separators must sit between digits; `seen_digit` is true when a digit
    /// (the octal leading zero) immediately precedes the cursor.
    fn take_digits(
        &mut self,
        radix: u32,
        start: usize,
        seen_digit: bool,
    ) -> Result<String, ScanError> {
        let mut digits = String::new();
        let mut last_was_sep = false;
        let mut any_digit = seen_digit;
        while let Some(b) = self.peek_byte() {
            let ch = b as char;
            if ch == '_' {
                if !any_digit {
                    return Err(self.invalid_literal(start));
                }
                last_was_sep = true;
                self.pos += 1;
                continue;
            }
            if ch.to_digit(radix).is_some() {
                digits.push(ch);
                last_was_sep = false;
                any_digit = true;
                self.pos += 1;
                continue;
            }
            break;
        }
        if digits.is_empty() || last_was_sep {
            return Err(self.invalid_literal(start));
        }
        Ok(digits)
    }

    fn scan_hex(&mut self, start: usize) -> Result<Tok, ScanError> {
        let digits = self.take_digits_allowing_empty(16);
        // A hex literal containing `.` or a binary exponent is a hex float.
        if self.peek_byte() == Some(b'.') || matches!(self.peek_byte(), Some(b'p' | b'P')) {
            return self.scan_hex_float(start, digits);
        }
        if digits.is_empty() {
            return Err(self.invalid_literal(start));
        }
        self.finish_integer(start, &digits, 16)
    }

    /// Like `take_digits` but tolerates no digits (for hex floats like
    /// `0x.8p1`); separator validity is still enforced.
    fn take_digits_allowing_empty(&mut self, radix: u32) -> String {
        let mut digits = String::new();
        while let Some(b) = self.peek_byte() {
            let ch = b as char;
            if ch == '_' && !digits.is_empty() {
                self.pos += 1;
                continue;
            }
            if ch.to_digit(radix).is_some() {
                digits.push(ch);
                self.pos += 1;
                continue;
            }
            break;
        }
        digits
    }

    /// Parse collected integer digits, applying the `l`/`L` suffix and the
    /// narrowing rules: decimal literals must fit the signed range, while
    /// hex/binary/octal literals may use all value bits.
    fn finish_integer(&mut self, start: usize, digits: &str, radix: u32) -> Result<Tok, ScanError> {
        let is_long = matches!(self.peek_byte(), Some(b'l' | b'L'));
        if is_long {
            self.pos += 1;
        }
        if is_long {
            let value = u128::from_str_radix(digits, radix).map_err(|_| self.invalid_literal(start))?;
            let limit = if radix == 10 {
                i64::MAX as u128
            } else {
                u64::MAX as u128
            };
            if value > limit {
                return Err(self.invalid_literal(start));
            }
            Ok(Tok {
                kind: TokenKind::LongLiteral,
                span: self.span_here(start),
                value: TokenValue::Long(value as u64 as i64),
            })
        } else {
            let value = u64::from_str_radix(digits, radix).map_err(|_| self.invalid_literal(start))?;
            let limit = if radix == 10 {
                i32::MAX as u64
            } else {
                u32::MAX as u64
            };
            if value > limit {
                return Err(self.invalid_literal(start));
            }
            Ok(Tok {
                kind: TokenKind::IntLiteral,
                span: self.span_here(start),
                value: TokenValue::Int(value as u32 as i32),
            })
        }
    }

    fn scan_decimal(&mut self, start: usize) -> Result<Tok, ScanError> {
        let int_digits = self.take_digits_allowing_empty(10);
        let mut is_float = false;
        let mut text = int_digits.clone();
        if self.peek_byte() == Some(b'.')
            && self
                .peek_byte_at(1)
                .is_some_and(|b| b.is_ascii_digit() || !int_digits.is_empty())
        {
            // Only a float if a fraction or exponent follows; `1.foo` never
            // reaches the scanner as a single token anyway because `.` after
            // digits always starts a fraction in Java.
            is_float = true;
            self.pos += 1;
            text.push('.');
            text.push_str(&self.take_digits_allowing_empty(10));
        }
        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            text.push('e');
            if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                text.push(self.bump().unwrap_or('+'));
            }
            let exp = self.take_digits_allowing_empty(10);
            if exp.is_empty() {
                return Err(self.invalid_literal(start));
            }
            text.push_str(&exp);
        }
        match self.peek_byte() {
            Some(b'f' | b'F') => {
                self.pos += 1;
                let value: f32 = text.parse().map_err(|_| self.invalid_literal(start))?;
                return Ok(Tok {
                    kind: TokenKind::FloatLiteral,
                    span: self.span_here(start),
                    value: TokenValue::Float(value),
                });
            }
            Some(b'd' | b'D') => {
                self.pos += 1;
                is_float = true;
            }
            _ => {}
        }
        if is_float {
            let value: f64 = text.parse().map_err(|_| self.invalid_literal(start))?;
            return Ok(Tok {
                kind: TokenKind::DoubleLiteral,
                span: self.span_here(start),
                value: TokenValue::Double(value),
            });
        }
        if text.is_empty() {
            return Err(self.invalid_literal(start));
        }
        self.finish_integer(start, &text, 10)
    }

    fn scan_hex_float(&mut self, start: usize, int_digits: String) -> Result<Tok, ScanError> {
        let mut frac_digits = String::new();
        if self.eat(b'.') {
            frac_digits = self.take_digits_allowing_empty(16);
        }
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(self.invalid_literal(start));
        }
        // The binary exponent is mandatory for hex floats.
        if !matches!(self.peek_byte(), Some(b'p' | b'P')) {
            return Err(self.invalid_literal(start));
        }
        self.pos += 1;
        let negative_exp = match self.peek_byte() {
            Some(b'+') => {
                self.pos += 1;
                false
            }
            Some(b'-') => {
                self.pos += 1;
                true
            }
            _ => false,
        };
        let exp_digits = self.take_digits_allowing_empty(10);
        if exp_digits.is_empty() {
            return Err(self.invalid_literal(start));
        }
        let mut mantissa: f64 = 0.0;
        for ch in int_digits.chars() {
            mantissa = mantissa * 16.0 + ch.to_digit(16).unwrap_or(0) as f64;
        }
        let mut scale = 1.0 / 16.0;
        for ch in frac_digits.chars() {
            mantissa += ch.to_digit(16).unwrap_or(0) as f64 * scale;
            scale /= 16.0;
        }
        let exp: i32 = exp_digits.parse().map_err(|_| self.invalid_literal(start))?;
        let exp = if negative_exp { -exp } else { exp };
        let value = mantissa * 2f64.powi(exp);
        match self.peek_byte() {
            Some(b'f' | b'F') => {
                self.pos += 1;
                Ok(Tok {
                    kind: TokenKind::FloatLiteral,
                    span: self.span_here(start),
                    value: TokenValue::Float(value as f32),
                })
            }
            Some(b'd' | b'D') => {
                self.pos += 1;
                Ok(Tok {
                    kind: TokenKind::DoubleLiteral,
                    span: self.span_here(start),
                    value: TokenValue::Double(value),
                })
            }
            _ => Ok(Tok {
                kind: TokenKind::DoubleLiteral,
                span: self.span_here(start),
                value: TokenValue::Double(value),
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Character and string literals
    // ---------------------------------------------------------------------

    fn scan_char_literal(&mut self, start: usize) -> Result<Tok, ScanError> {
        self.pos += 1;
        let unit = match self.peek_byte() {
            None => {
                return Err(ScanError::new(
                    self.span_here(start),
                    DiagnosticKind::UnterminatedCharacterLiteral,
                ));
            }
            Some(b'\'') => {
                self.pos += 1;
                return Err(ScanError::new(
                    self.span_here(start),
                    DiagnosticKind::EmptyCharacterLiteral,
                ));
            }
            Some(b'\n') => {
                return Err(ScanError::new(
                    self.span_here(start),
                    DiagnosticKind::UnterminatedCharacterLiteral,
                ));
            }
            Some(b'\\') => self.scan_escape(start)?,
            Some(_) => {
                let ch = self.bump().unwrap_or('\u{FFFD}');
                if ch as u32 > 0xFFFF {
                    return Err(self.invalid_literal(start));
                }
                ch as u32 as u16
            }
        };
        if !self.eat(b'\'') {
            return Err(ScanError::new(
                self.span_here(start),
                DiagnosticKind::UnterminatedCharacterLiteral,
            ));
        }
        Ok(Tok {
            kind: TokenKind::CharLiteral,
            span: self.span_here(start),
            value: TokenValue::Char(unit),
        })
    }

    /// One escape sequence after a `\`; returns the UTF-16 unit it denotes.
    fn scan_escape(&mut self, start: usize) -> Result<u16, ScanError> {
        self.pos += 1;
        let Some(ch) = self.bump() else {
            return Err(ScanError::new(
                self.span_here(start),
                DiagnosticKind::UnexpectedEof,
            ));
        };
        Ok(match ch {
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0a,
            'f' => 0x0c,
            'r' => 0x0d,
            's' => 0x20,
            '"' => b'"' as u16,
            '\'' => b'\'' as u16,
            '\\' => b'\\' as u16,
            '0'..='7' => {
                // Octal escape: up to 3 digits, 3 only if the first is 0-3.
                let mut value = ch.to_digit(8).unwrap_or(0);
                let max_digits = if ch <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek_byte() {
                        Some(b @ b'0'..=b'7') => {
                            value = value * 8 + (b - b'0') as u32;
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                value as u16
            }
            _ => {
                return Err(self.invalid_literal(start));
            }
        })
    }

    fn scan_string_or_text_block(&mut self, start: usize) -> Result<Tok, ScanError> {
        if self.peek_byte_at(1) == Some(b'"') && self.peek_byte_at(2) == Some(b'"') {
            return self.scan_text_block(start);
        }
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek_byte() {
                None => {
                    return Err(ScanError::new(
                        self.span_here(start),
                        DiagnosticKind::UnterminatedString,
                    ));
                }
                Some(b'\n') => {
                    return Err(ScanError::new(
                        self.span_here(start),
                        DiagnosticKind::UnterminatedString,
                    ));
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let unit = self.scan_escape(start)?;
                    push_utf16_unit(&mut value, unit);
                }
                Some(_) => {
                    value.push(self.bump().unwrap_or('\u{FFFD}'));
                }
            }
        }
        Ok(Tok {
            kind: TokenKind::StringLiteral,
            span: self.span_here(start),
            value: TokenValue::Str(value),
        })
    }

    fn scan_text_block(&mut self, start: usize) -> Result<Tok, ScanError> {
        self.pos += 3;
        // Opening delimiter: optional horizontal whitespace, then a line
        // terminator.
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
        if !self.eat(b'\n') {
            return Err(ScanError::new(
                self.span_here(start),
                DiagnosticKind::InvalidLiteral("text block must start with a line terminator".into()),
            ));
        }
        let content_start = self.pos;
        loop {
            match self.peek_byte() {
                None => {
                    return Err(ScanError::new(
                        self.span_here(start),
                        DiagnosticKind::UnterminatedString,
                    ));
                }
                Some(b'\\') => {
                    // Escapes (including \") are inert while locating the
                    // closing delimiter; they are processed after stripping.
                    self.pos += 1;
                    if self.peek_byte().is_some() {
                        self.bump();
                    }
                }
                Some(b'"')
                    if self.peek_byte_at(1) == Some(b'"') && self.peek_byte_at(2) == Some(b'"') =>
                {
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let raw = &self.text[content_start..self.pos];
        self.pos += 3;
        let value = strip_text_block(raw)
            .and_then(|stripped| process_text_block_escapes(&stripped))
            .ok_or_else(|| self.invalid_literal(start))?;
        Ok(Tok {
            kind: TokenKind::StringLiteral,
            span: self.span_here(start),
            value: TokenValue::Str(value),
        })
    }

    // ---------------------------------------------------------------------
    // Operators and punctuation
    // ---------------------------------------------------------------------

    fn scan_operator(&mut self, start: usize) -> Result<Tok, ScanError> {
        let b = self.peek_byte().unwrap_or(0);
        self.pos += 1;
        let kind = match b {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semi,
            b',' => TokenKind::Comma,
            b'@' => TokenKind::At,
            b'~' => TokenKind::Tilde,
            b'?' => TokenKind::Question,
            b'.' => {
                if self.peek_byte() == Some(b'.') && self.peek_byte_at(1) == Some(b'.') {
                    self.pos += 2;
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }
            b':' => {
                if self.eat(b':') {
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.eat(b'=') {
                    TokenKind::Le
                } else if self.eat(b'<') {
                    if self.eat(b'=') {
                        TokenKind::ShlEq
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.eat(b'=') {
                    TokenKind::Ge
                } else if self.peek_byte() == Some(b'>') {
                    self.pos += 1;
                    if self.peek_byte() == Some(b'>') {
                        self.pos += 1;
                        if self.eat(b'=') {
                            TokenKind::UshrEq
                        } else {
                            TokenKind::Ushr
                        }
                    } else if self.eat(b'=') {
                        TokenKind::ShrEq
                    } else {
                        TokenKind::Shr
                    }
                } else {
                    TokenKind::Gt
                }
            }
            b'&' => {
                if self.eat(b'&') {
                    TokenKind::AndAnd
                } else if self.eat(b'=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    TokenKind::OrOr
                } else if self.eat(b'=') {
                    TokenKind::BarEq
                } else {
                    TokenKind::Bar
                }
            }
            b'+' => {
                if self.eat(b'+') {
                    TokenKind::Inc
                } else if self.eat(b'=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.eat(b'-') {
                    TokenKind::Dec
                } else if self.eat(b'=') {
                    TokenKind::MinusEq
                } else if self.eat(b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.eat(b'=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.eat(b'=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            b'^' => {
                if self.eat(b'=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            b'%' => {
                if self.eat(b'=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            _ => {
                return Err(ScanError::new(
                    self.span_here(start),
                    DiagnosticKind::UnexpectedInput,
                ));
            }
        };
        Ok(Tok::new(kind, self.span_here(start)))
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

fn is_ident_part(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric()
}

fn push_utf16_unit(out: &mut String, unit: u16) {
    match char::from_u32(unit as u32) {
        Some(ch) => out.push(ch),
        None => out.push('\u{FFFD}'),
    }
}

/// Incidental-whitespace stripping for text blocks.
///
/// The common leading whitespace of all non-blank content lines and of the
/// closing-delimiter line is removed, then trailing whitespace is removed
/// from every line. The closing delimiter's own line participates in the
/// indent computation even when blank.
fn strip_text_block(raw: &str) -> Option<String> {
    // `raw` runs from just after the opening line terminator to just before
    // the closing `"""`. The final segment (after the last newline) is the
    // closing line's indentation, or trailing content if the closer shares a
    // line with content.
    let mut lines: Vec<&str> = raw.split('\n').collect();
    let closing_segment = lines.pop().unwrap_or("");
    let closer_has_content = !closing_segment.chars().all(is_horizontal_ws);

    let mut min_indent = usize::MAX;
    for line in &lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.chars().all(is_horizontal_ws) {
            continue;
        }
        min_indent = min_indent.min(indent_of(line));
    }
    if closer_has_content {
        min_indent = min_indent.min(indent_of(closing_segment));
    } else {
        min_indent = min_indent.min(closing_segment.len());
    }
    if min_indent == usize::MAX {
        min_indent = 0;
    }

    let mut out = String::new();
    for line in &lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let stripped = strip_line(line, min_indent);
        out.push_str(stripped);
        out.push('\n');
    }
    if closer_has_content {
        out.push_str(strip_line(closing_segment, min_indent));
    }
    Some(out)
}

fn is_horizontal_ws(ch: char) -> bool {
    ch == ' ' || ch == '\t' || ch == '\r'
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|&c| is_horizontal_ws(c)).count()
}

/// Remove up to `indent` leading whitespace characters and all trailing
/// whitespace.
fn strip_line(line: &str, indent: usize) -> &str {
    let start = line
        .char_indices()
        .take_while(|&(i, c)| is_horizontal_ws(c) && i < indent)
        .count();
    let line = &line[start.min(line.len())..];
    line.trim_end_matches(is_horizontal_ws)
}

/// Escape processing for text blocks, run after stripping. `\s` keeps a
/// space alive through trailing-whitespace removal; a `\` at end of line
/// joins it with the next.
fn process_text_block_escapes(stripped: &str) -> Option<String> {
    let mut out = String::with_capacity(stripped.len());
    let mut chars = stripped.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'b' => out.push('\u{8}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{c}'),
            'r' => out.push('\r'),
            's' => out.push(' '),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            '\n' => {} // line continuation
            first @ '0'..='7' => {
                let mut value = first.to_digit(8)?;
                let max_digits = if first <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            value = value * 8 + d.to_digit(8)?;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(value)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

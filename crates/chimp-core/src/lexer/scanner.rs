// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes Chimp source code.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the source text being scanned.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,

            // Operators, possibly followed by '='
            '+' => self.scan_with_equal(TokenKind::Plus, TokenKind::PlusEqual),
            '-' => self.scan_with_equal(TokenKind::Minus, TokenKind::MinusEqual),
            '*' => self.scan_with_equal(TokenKind::Star, TokenKind::StarEqual),
            '/' => self.scan_with_equal(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.scan_with_equal(TokenKind::Percent, TokenKind::PercentEqual),
            '<' => self.scan_with_equal(TokenKind::LessThan, TokenKind::LessThanEqual),
            '>' => self.scan_with_equal(TokenKind::GreaterThan, TokenKind::GreaterThanEqual),
            '=' => self.scan_with_equal(TokenKind::Equal, TokenKind::EqualEqual),
            '!' => self.scan_with_equal(TokenKind::Bang, TokenKind::NotEqual),
            '&' => self.scan_doubled('&', TokenKind::AmpersandAmpersand),
            '|' => self.scan_doubled('|', TokenKind::PipePipe),

            '"' => self.scan_string(),
            '0'..='9' => self.scan_integer(ch),
            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid,
        };

        Token::new(kind, Span::new(start, self.current_pos))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\n' | '\r') => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some((_, ch)) = self.advance() {
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn scan_with_equal(&mut self, single: TokenKind, with_equal: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with_equal
        } else {
            single
        }
    }

    fn scan_doubled(&mut self, ch: char, doubled: TokenKind) -> TokenKind {
        if self.peek() == Some(ch) {
            self.advance();
            doubled
        } else {
            TokenKind::Invalid
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return TokenKind::Invalid,
                Some((_, '"')) => break,
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, escaped)) => value.push(escaped),
                    None => return TokenKind::Invalid,
                },
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_integer(&mut self, first: char) -> TokenKind {
        let mut value = String::from(first);

        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            value.push(ch);
            self.advance();
        }

        match value.parse::<i64>() {
            Ok(n) => TokenKind::Integer(n),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let start = self.current_pos - first.len_utf8();

        while let Some(ch) = self.peek() {
            if !is_id_continue(ch) {
                break;
            }
            self.advance();
        }

        let ident = &self.source[start..self.current_pos];
        TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

//! Pull-based lexer: one token at a time, no buffering.

use crate::token::{Token, TokenKind, keyword};
use gen_core::GenError;

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: i32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, GenError> {
        self.skip_whitespace_and_comments();

        let start_line = self.line;
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", start_line));
        };

        if c.is_ascii_digit() {
            return Ok(self.number(start_line));
        }
        if c == '"' {
            return self.string(start_line);
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.identifier(start_line));
        }

        self.advance();
        use TokenKind::*;
        let kind = match c {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '\\' => Backslash,
            '(' => LeftParen,
            ')' => RightParen,
            '{' => LeftBrace,
            '}' => RightBrace,
            '[' => LeftBracket,
            ']' => RightBracket,
            ',' => Comma,
            '.' => Dot,
            ';' => Semicolon,
            '=' => {
                if self.match_char('=') {
                    EqualEqual
                } else {
                    Equal
                }
            }
            '!' => {
                if self.match_char('=') {
                    BangEqual
                } else {
                    Bang
                }
            }
            '<' => {
                if self.match_char('=') {
                    LessEqual
                } else {
                    Less
                }
            }
            '>' => {
                if self.match_char('=') {
                    GreaterEqual
                } else {
                    Greater
                }
            }
            '|' => Pipe,
            other => {
                return Err(GenError::compile(
                    start_line,
                    format!("unexpected character '{}'", other),
                ));
            }
        };
        Ok(Token::new(kind, c.to_string(), start_line))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c == '\n' => {
                    self.line += 1;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn number(&mut self, line: i32) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let lexeme: String = self.source[start..self.pos].iter().collect();
        Token::new(TokenKind::Number, lexeme, line)
    }

    fn string(&mut self, line: i32) -> Result<Token, GenError> {
        self.advance(); // opening quote
        let start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(GenError::compile(
                        self.line,
                        "unterminated string literal",
                    ));
                }
                Some('"') => break,
                Some('\n') => {
                    self.line += 1;
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let lexeme: String = self.source[start..self.pos].iter().collect();
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::String, lexeme, line))
    }

    fn identifier(&mut self, line: i32) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let lexeme: String = self.source[start..self.pos].iter().collect();
        let kind = keyword(&lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, lexeme, line)
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }
}

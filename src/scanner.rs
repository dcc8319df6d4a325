use std::io::{self, Read};
use std::iter::{Copied, MapWhile};
use std::slice;

use crate::token::Token;

/// Location of a token in the source, for diagnostics
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Position {
    /// Byte offset from the start of the source
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column, counted in bytes
    pub column: usize,
}

impl Position {
    fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Byte iterator over a reader; ends at EOF or at the first read error.
pub type ReaderBytes<R> = MapWhile<io::Bytes<R>, fn(io::Result<u8>) -> Option<u8>>;

/// Turns a byte source into a forward-only stream of command tokens.
///
/// The scanner owns its cursor; once a byte has been consumed there is no
/// way back. After the source runs out every call to [`Scanner::next_token`]
/// returns [`Token::EndOfInput`].
pub struct Scanner<I> {
    bytes: I,
    cursor: Position,
    token_position: Position,
    exhausted: bool,
}

impl<'a> Scanner<Copied<slice::Iter<'a, u8>>> {
    /// Scans an in-memory source
    pub fn new(code: &'a [u8]) -> Self {
        Self::from_bytes(code.iter().copied())
    }
}

impl<R: Read> Scanner<ReaderBytes<R>> {
    /// Scans a byte stream, e.g. an open file. A read error is treated as
    /// the end of the source.
    pub fn from_reader(reader: R) -> Self {
        Self::from_bytes(reader.bytes().map_while(Result::ok as fn(io::Result<u8>) -> Option<u8>))
    }
}

impl<I: Iterator<Item = u8>> Scanner<I> {
    pub fn from_bytes(bytes: I) -> Self {
        Scanner {
            bytes,
            cursor: Position::start(),
            token_position: Position::start(),
            exhausted: false,
        }
    }

    /// Returns the next command token, skipping comment bytes
    pub fn next_token(&mut self) -> Token {
        while !self.exhausted {
            let position = self.cursor;
            let byte = match self.bytes.next() {
                Some(byte) => byte,
                None => {
                    self.exhausted = true;
                    break;
                }
            };
            self.advance(byte);

            if let Some(token) = Token::from_byte(byte) {
                self.token_position = position;
                return token;
            }
        }

        self.token_position = self.cursor;
        Token::EndOfInput
    }

    /// Position of the token most recently returned by [`Scanner::next_token`]
    pub fn position(&self) -> Position {
        self.token_position
    }

    fn advance(&mut self, byte: u8) {
        self.cursor.offset += 1;
        if byte == b'\n' {
            self.cursor.line += 1;
            self.cursor.column = 1;
        } else {
            self.cursor.column += 1;
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for Scanner<I> {
    type Item = Token;

    /// Like [`Scanner::next_token`], but ends the iteration at end of input
    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::EndOfInput => None,
            token => Some(token),
        }
    }
}

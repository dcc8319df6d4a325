use std::fmt;

/// A command read from source code. Every other byte is a comment.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Source is exhausted; repeated forever once reached
    EndOfInput,
    /// `>`
    MoveRight,
    /// `<`
    MoveLeft,
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[`
    LoopBegin,
    /// `]`
    LoopEnd,
}

impl Token {
    /// Maps a source byte to its command, or `None` for comment bytes
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'>' => Some(Token::MoveRight),
            b'<' => Some(Token::MoveLeft),
            b'+' => Some(Token::Increment),
            b'-' => Some(Token::Decrement),
            b'.' => Some(Token::Output),
            b',' => Some(Token::Input),
            b'[' => Some(Token::LoopBegin),
            b']' => Some(Token::LoopEnd),
            _ => None,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Token::EndOfInput => write!(f, "EndOfInput"),
            Token::MoveRight => write!(f, "MoveRight('>')"),
            Token::MoveLeft => write!(f, "MoveLeft('<')"),
            Token::Increment => write!(f, "Increment('+')"),
            Token::Decrement => write!(f, "Decrement('-')"),
            Token::Output => write!(f, "Output('.')"),
            Token::Input => write!(f, "Input(',')"),
            Token::LoopBegin => write!(f, "LoopBegin('[')"),
            Token::LoopEnd => write!(f, "LoopEnd(']')"),
        }
    }
}

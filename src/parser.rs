use std::error::Error;
use std::fmt;

use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::ir::{Node, Program};
use crate::options::DEFAULT_MAX_LOOP_DEPTH;
use crate::scanner::{Position, Scanner};
use crate::token::Token;
use crate::token::Token::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParseErrorKind {
    UnclosedLoop,
    ExtraCloseLoop,
    LoopTooDeep { max_depth: usize },
}
use ParseErrorKind::*;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: Position,
}

impl ParseError {
    fn new(kind: ParseErrorKind, position: Position) -> Self {
        Self { kind, position }
    }

    fn message(&self) -> String {
        match self.kind {
            UnclosedLoop => "cannot use '[' without a matching closing ']'".to_string(),
            ExtraCloseLoop => "cannot use ']' without a matching opening '['".to_string(),
            LoopTooDeep { max_depth } => {
                format!("loops cannot be nested more than {} deep", max_depth)
            }
        }
    }

    /// Formats the error along with the offending source line, and a caret
    /// under the command that caused it
    pub fn render(&self, code: &[u8]) -> String {
        let (line, offset) = find_line(code, self.position.offset);
        let width = UnicodeWidthStr::width(&*String::from_utf8_lossy(&line[..offset]));

        format!(
            "{}\n{}\n{}^",
            self,
            String::from_utf8_lossy(line),
            " ".repeat(width)
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}",
            self.position.line,
            self.position.column,
            self.message()
        )
    }
}

impl Error for ParseError {}

/// Every error found while parsing a program, in source order
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseErrors(pub Vec<ParseError>);

impl ParseErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn render(&self, code: &[u8]) -> String {
        self.iter()
            .map(|err| err.render(code))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, err) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl Error for ParseErrors {}

/// Parses a string of brainfuck code to brainiac's intermediate
/// representation, without applying any optimization
pub fn parse(code: &[u8]) -> Result<Program, ParseErrors> {
    parse_scanner(Scanner::new(code), DEFAULT_MAX_LOOP_DEPTH)
}

/// Parses the tokens of `scanner`. Loops may nest at most `max_depth` deep.
///
/// Parsing does not stop at the first error; all errors found are returned
/// together, and no tree is produced if there are any.
pub fn parse_scanner<I>(scanner: Scanner<I>, max_depth: usize) -> Result<Program, ParseErrors>
where
    I: Iterator<Item = u8>,
{
    let mut parser = Parser::new(scanner, max_depth);
    let nodes = parser.parse_program();

    if parser.errors.is_empty() {
        debug!(nodes = nodes.len(), "parsed program");
        Ok(Program::new(nodes))
    } else {
        parser.errors.sort_by_key(|err| err.position.offset);
        debug!(errors = parser.errors.len(), "parsing failed");
        Err(ParseErrors(parser.errors))
    }
}

struct Parser<I> {
    scanner: Scanner<I>,
    next: Token,
    next_position: Position,
    max_depth: usize,
    errors: Vec<ParseError>,
}

impl<I: Iterator<Item = u8>> Parser<I> {
    fn new(mut scanner: Scanner<I>, max_depth: usize) -> Self {
        let next = scanner.next_token();
        let next_position = scanner.position();
        Parser {
            scanner,
            next,
            next_position,
            max_depth,
            errors: Vec::new(),
        }
    }

    fn advance(&mut self) -> (Token, Position) {
        let current = (self.next, self.next_position);
        self.next = self.scanner.next_token();
        self.next_position = self.scanner.position();
        current
    }

    fn matches(&self, token: Token) -> bool {
        self.next == token
    }

    fn accept(&mut self, token: Token) -> bool {
        if self.matches(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, kind: ParseErrorKind, position: Position) {
        self.errors.push(ParseError::new(kind, position));
    }

    fn parse_program(&mut self) -> Vec<Node> {
        let mut nodes = Vec::new();
        while !self.matches(EndOfInput) {
            if let Some(node) = self.parse_command(0) {
                nodes.push(node);
            }
        }
        nodes
    }

    /// Parses one command inside a loop nested `depth` deep. Returns `None`
    /// if the command had an error.
    fn parse_command(&mut self, depth: usize) -> Option<Node> {
        let (token, position) = self.advance();
        match token {
            MoveRight => Some(Node::Move(self.parse_run(MoveLeft, MoveRight, 1))),
            MoveLeft => Some(Node::Move(self.parse_run(MoveLeft, MoveRight, -1))),
            Increment => Some(Node::Add(self.parse_run(Decrement, Increment, 1))),
            Decrement => Some(Node::Add(self.parse_run(Decrement, Increment, -1))),
            Output => Some(Node::Output),
            Input => Some(Node::Input),
            LoopBegin => self.parse_loop(position, depth + 1),
            LoopEnd => {
                self.error(ExtraCloseLoop, position);
                None
            }
            EndOfInput => None,
        }
    }

    /// Folds a run of `neg`/`pos` tokens into a count. Counts wrap at 32
    /// bits, which keeps them exact modulo the cell and tape sizes.
    fn parse_run(&mut self, neg: Token, pos: Token, mut count: i32) -> i32 {
        loop {
            if self.accept(pos) {
                count = count.wrapping_add(1);
            } else if self.accept(neg) {
                count = count.wrapping_sub(1);
            } else {
                return count;
            }
        }
    }

    fn parse_loop(&mut self, start: Position, depth: usize) -> Option<Node> {
        if depth > self.max_depth {
            self.error(
                LoopTooDeep {
                    max_depth: self.max_depth,
                },
                start,
            );
            self.skip_loop(start);
            return None;
        }

        let mut body = Vec::new();
        let mut failed = false;
        while !self.matches(LoopEnd) && !self.matches(EndOfInput) {
            match self.parse_command(depth) {
                Some(node) => body.push(node),
                None => failed = true,
            }
        }

        if !self.accept(LoopEnd) {
            self.error(UnclosedLoop, start);
            return None;
        }

        if failed {
            None
        } else {
            Some(Node::Loop(body))
        }
    }

    /// Consumes the rest of a loop whose `[` was already read, keeping
    /// track of brackets so errors after it are still found.
    fn skip_loop(&mut self, start: Position) {
        let mut level = 1;
        loop {
            match self.advance().0 {
                LoopBegin => level += 1,
                LoopEnd => {
                    level -= 1;
                    if level == 0 {
                        return;
                    }
                }
                EndOfInput => {
                    self.error(UnclosedLoop, start);
                    return;
                }
                _ => (),
            }
        }
    }
}

/// Returns the line containing byte `i`, and the offset of `i` in it
fn find_line(code: &[u8], i: usize) -> (&[u8], usize) {
    let i = i.min(code.len());
    let offset = code[0..i].iter().rev().take_while(|x| **x != b'\n').count();
    let end = i + code[i..].iter().take_while(|x| **x != b'\n').count();
    (&code[(i - offset)..end], offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Node::{Add, Loop, Move};
    use pretty_assertions::assert_eq;

    fn kinds(result: Result<Program, ParseErrors>) -> Vec<ParseErrorKind> {
        result.unwrap_err().iter().map(|err| err.kind).collect()
    }

    #[test]
    fn folds_runs() {
        let program = parse(b">>><++-+.,").unwrap();
        assert_eq!(program.nodes, vec![Move(2), Add(2), Node::Output, Node::Input]);
    }

    #[test]
    fn runs_separated_by_comments_still_fold() {
        let program = parse(b"+ + comment +\n-").unwrap();
        assert_eq!(program.nodes, vec![Add(2)]);
    }

    #[test]
    fn keeps_zero_runs() {
        let program = parse(b"><+-").unwrap();
        assert_eq!(program.nodes, vec![Move(0), Add(0)]);
    }

    #[test]
    fn different_axes_do_not_fold() {
        let program = parse(b"+>-<").unwrap();
        assert_eq!(program.nodes, vec![Add(1), Move(1), Add(-1), Move(-1)]);
    }

    #[test]
    fn nested_loops() {
        let program = parse(b"+[>[-]<-]").unwrap();
        assert_eq!(
            program.nodes,
            vec![
                Add(1),
                Loop(vec![Move(1), Loop(vec![Add(-1)]), Move(-1), Add(-1)]),
            ]
        );
    }

    #[test]
    fn parses_owned_scanners() {
        let source: &[u8] = b"+[>.<-]";
        let from_reader = parse_scanner(Scanner::from_reader(source), 4).unwrap();
        let from_bytes = parse_scanner(Scanner::from_bytes(source.iter().copied()), 4).unwrap();
        assert_eq!(
            from_reader.nodes,
            vec![
                Add(1),
                Loop(vec![Move(1), Node::Output, Move(-1), Add(-1)]),
            ]
        );
        assert_eq!(from_reader, from_bytes);
    }

    #[test]
    fn empty_program() {
        assert_eq!(parse(b"just a comment").unwrap().nodes, Vec::<Node>::new());
    }

    #[test]
    fn extra_close() {
        assert_eq!(kinds(parse(b"+]")), vec![ExtraCloseLoop]);
    }

    #[test]
    fn unclosed() {
        assert_eq!(kinds(parse(b"[[]")), vec![UnclosedLoop]);
    }

    #[test]
    fn reports_every_error() {
        let errors = parse(b"]\n[+\n]]").unwrap_err();
        let found: Vec<(ParseErrorKind, usize, usize)> = errors
            .iter()
            .map(|err| (err.kind, err.position.line, err.position.column))
            .collect();
        assert_eq!(found, vec![(ExtraCloseLoop, 1, 1), (ExtraCloseLoop, 3, 2)]);
    }

    #[test]
    fn unclosed_loops_reported_at_their_start() {
        let errors = parse(b"+[[").unwrap_err();
        let columns: Vec<usize> = errors.iter().map(|err| err.position.column).collect();
        assert_eq!(columns, vec![2, 3]);
        assert!(errors.iter().all(|err| err.kind == UnclosedLoop));
    }

    #[test]
    fn loop_depth_limit() {
        let ok = "[".repeat(4) + &"]".repeat(4);
        assert!(parse_scanner(Scanner::new(ok.as_bytes()), 4).is_ok());

        let deep = "[".repeat(5) + &"]".repeat(5) + "]";
        let errors = parse_scanner(Scanner::new(deep.as_bytes()), 4).unwrap_err();
        let found: Vec<ParseErrorKind> = errors.iter().map(|err| err.kind).collect();
        assert_eq!(
            found,
            vec![LoopTooDeep { max_depth: 4 }, ExtraCloseLoop]
        );
        assert_eq!(errors.0[0].position.column, 5);
    }

    #[test]
    fn default_depth_is_64() {
        let ok = "[".repeat(64) + &"]".repeat(64);
        assert!(parse(ok.as_bytes()).is_ok());
        let deep = "[".repeat(65) + &"]".repeat(65);
        assert_eq!(
            kinds(parse(deep.as_bytes())),
            vec![LoopTooDeep { max_depth: 64 }]
        );
    }

    #[test]
    fn display() {
        let errors = parse(b"+\n ]").unwrap_err();
        assert_eq!(
            errors.to_string(),
            "[2:2] cannot use ']' without a matching opening '['"
        );
    }

    #[test]
    fn render_points_at_command() {
        let code = "+\nüü] x".as_bytes();
        let errors = parse(code).unwrap_err();
        assert_eq!(
            errors.render(code),
            "[2:5] cannot use ']' without a matching opening '['\nüü] x\n  ^"
        );
    }
}

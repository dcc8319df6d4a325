use std::fmt;

/// A node in brainiac's intermediate representation.
#[derive(Clone, PartialEq, Eq)]
pub enum Node {
    /// `Loop(body)` Runs *body* while the current cell is not zero
    Loop(Vec<Node>),
    /// `Move(count)` Moves the data pointer by *count* cells
    Move(i32),
    /// `Add(count)` Adds *count* to the current cell
    Add(i32),
    /// `Output` Writes the current cell
    Output,
    /// `Input` Reads one byte into the current cell
    Input,
    /// `Set(value)` Sets the current cell to *value*
    Set(u8),
}

impl Node {
    /// Whether the node is a loop that always leaves the current cell at
    /// zero: a body of `Set(0)`, or of an odd `Add` that must eventually
    /// wrap to zero.
    pub fn is_zeroing_loop(&self) -> bool {
        match self {
            Node::Loop(body) => match body.as_slice() {
                [Node::Set(0)] => true,
                [Node::Add(count)] => count & 1 != 0,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Node::Output => write!(f, "Output"),
            Node::Input => write!(f, "Input"),
            Node::Move(count) => write!(f, "Move(count={})", count),
            Node::Add(count) => write!(f, "Add(count={})", count),
            Node::Set(value) => write!(f, "Set(value={})", value),
            Node::Loop(ref body) => {
                if f.alternate() {
                    write!(f, "Loop(body={:#?})", body)
                } else {
                    write!(f, "Loop(body={:?})", body)
                }
            }
        }
    }
}

/// Root of the intermediate representation
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub nodes: Vec<Node>,
}

impl Program {
    pub fn new(nodes: Vec<Node>) -> Self {
        Program { nodes }
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.nodes, f)
    }
}

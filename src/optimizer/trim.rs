use super::Pass;
use crate::ir::{Node, Program};

/// Simplifies the ends of the program.
///
/// Until the first cell is touched the whole tape is zero, so leading loops
/// never run and a leading `Add` is really a `Set`. Pointer and cell changes
/// after the last output, input or loop can't be observed.
pub struct TrimEnds;

impl Pass for TrimEnds {
    fn name(&self) -> &'static str {
        "trim-ends"
    }

    fn run(&self, program: &mut Program) -> bool {
        let head = trim_head(&mut program.nodes);
        let tail = trim_tail(&mut program.nodes);
        head || tail
    }
}

fn trim_head(nodes: &mut Vec<Node>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < nodes.len() {
        match nodes[i] {
            // Moving doesn't touch any cell
            Node::Move(_) => i += 1,
            Node::Loop(_) => {
                nodes.remove(i);
                changed = true;
            }
            Node::Add(count) => {
                nodes[i] = Node::Set(count as u8);
                return true;
            }
            _ => break,
        }
    }
    changed
}

fn trim_tail(nodes: &mut Vec<Node>) -> bool {
    let mut changed = false;
    while matches!(
        nodes.last(),
        Some(Node::Move(_)) | Some(Node::Add(_)) | Some(Node::Set(_))
    ) {
        nodes.pop();
        changed = true;
    }
    changed
}

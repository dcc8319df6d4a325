use super::{each_sequence, Pass};
use crate::ir::{Node, Program};

/// Folds pairs of neighbouring nodes into one.
pub struct MergeAdjacent;

impl Pass for MergeAdjacent {
    fn name(&self) -> &'static str {
        "merge-adjacent"
    }

    fn run(&self, program: &mut Program) -> bool {
        each_sequence(&mut program.nodes, &mut merge)
    }
}

enum Merge {
    /// Replace both nodes with this one
    Into(Node),
    /// The first node is overwritten by the second; drop it
    DropFirst,
}

fn merge_pair(first: &Node, second: &Node) -> Option<Merge> {
    use Node::*;

    match (first, second) {
        (Move(a), Move(b)) => Some(Merge::Into(Move(a.wrapping_add(*b)))),
        (Add(a), Add(b)) => Some(Merge::Into(Add(a.wrapping_add(*b)))),
        (Set(value), Add(count)) => Some(Merge::Into(Set(value.wrapping_add(*count as u8)))),
        (Add(_), Set(_)) | (Set(_), Set(_)) => Some(Merge::DropFirst),
        (Add(_), next) if next.is_zeroing_loop() => Some(Merge::DropFirst),
        // The loop runs to zero if the value isn't zero already
        (Set(_), next) if next.is_zeroing_loop() => Some(Merge::Into(Set(0))),
        _ => None,
    }
}

fn merge(nodes: &mut Vec<Node>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < nodes.len() {
        match merge_pair(&nodes[i], &nodes[i + 1]) {
            Some(Merge::Into(node)) => {
                nodes[i] = node;
                nodes.remove(i + 1);
                changed = true;
            }
            Some(Merge::DropFirst) => {
                nodes.remove(i);
                changed = true;
            }
            None => i += 1,
        }
    }
    changed
}

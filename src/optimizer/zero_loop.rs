use super::{each_sequence, Pass};
use crate::ir::{Node, Program};

/// Replaces loops that only clear the current cell, like `[-]`, with
/// `Set(0)`.
pub struct ZeroLoops;

impl Pass for ZeroLoops {
    fn name(&self) -> &'static str {
        "zero-loops"
    }

    fn run(&self, program: &mut Program) -> bool {
        each_sequence(&mut program.nodes, &mut |nodes: &mut Vec<Node>| {
            let mut changed = false;
            for node in nodes.iter_mut() {
                if node.is_zeroing_loop() {
                    *node = Node::Set(0);
                    changed = true;
                }
            }
            changed
        })
    }
}

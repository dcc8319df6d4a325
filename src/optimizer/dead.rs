use super::{each_sequence, Pass};
use crate::ir::{Node, Program};

/// Removes nodes with no observable effect: runs that wrap around to
/// nothing, and loops entered while the current cell is known to be zero.
pub struct DeadNodes;

impl Pass for DeadNodes {
    fn name(&self) -> &'static str {
        "dead-nodes"
    }

    fn run(&self, program: &mut Program) -> bool {
        each_sequence(&mut program.nodes, &mut remove_dead)
    }
}

fn remove_dead(nodes: &mut Vec<Node>) -> bool {
    let before = nodes.len();
    // The current cell is zero right after a loop exits, or after `Set(0)`
    let mut zeroed = false;

    nodes.retain(|node| {
        let keep = match *node {
            Node::Move(count) => count as u16 != 0,
            Node::Add(count) => count as u8 != 0,
            Node::Loop(_) => !zeroed,
            _ => true,
        };
        if keep {
            zeroed = matches!(node, Node::Loop(_) | Node::Set(0));
        }
        keep
    });

    nodes.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Node::*;
    use pretty_assertions::assert_eq;

    fn run(nodes: Vec<Node>) -> (bool, Vec<Node>) {
        let mut program = Program::new(nodes);
        let changed = DeadNodes.run(&mut program);
        (changed, program.nodes)
    }

    #[test]
    fn wrapped_runs() {
        assert_eq!(
            run(vec![Move(65536), Add(-256), Move(-131072), Add(512), Output]),
            (true, vec![Output])
        );
        assert_eq!(
            run(vec![Move(65535), Add(255), Output]),
            (false, vec![Move(65535), Add(255), Output])
        );
    }

    #[test]
    fn loops_after_zero() {
        assert_eq!(
            run(vec![Input, Loop(vec![Output]), Loop(vec![Input]), Set(0), Loop(vec![Input])]),
            (true, vec![Input, Loop(vec![Output]), Set(0)])
        );
    }

    #[test]
    fn loop_after_dead_run_is_still_dead() {
        assert_eq!(
            run(vec![Input, Loop(vec![Output]), Add(256), Loop(vec![Input])]),
            (true, vec![Input, Loop(vec![Output])])
        );
    }

    #[test]
    fn recurses_into_loops() {
        assert_eq!(
            run(vec![Input, Loop(vec![Add(0), Output])]),
            (true, vec![Input, Loop(vec![Output])])
        );
    }

    #[test]
    fn first_node_of_loop_body_is_not_zeroed() {
        let nodes = vec![Input, Loop(vec![Loop(vec![Output])])];
        assert_eq!(run(nodes.clone()), (false, nodes));
    }
}

//! Peephole optimizer. Passes rewrite the tree in place and are rerun until
//! none of them changes anything.

use tracing::{debug, trace, warn};

use crate::ir::{Node, Program};

mod dead;
mod merge;
mod trim;
mod zero_loop;

pub use dead::DeadNodes;
pub use merge::MergeAdjacent;
pub use trim::TrimEnds;
pub use zero_loop::ZeroLoops;

/// A rewrite of the tree that reports whether it changed anything
pub trait Pass: Sync {
    fn name(&self) -> &'static str;
    fn run(&self, program: &mut Program) -> bool;
}

/// The passes run by [`optimize`], in order
pub static PASSES: [&dyn Pass; 4] = [&DeadNodes, &TrimEnds, &MergeAdjacent, &ZeroLoops];

/// How an optimizer run ended
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Convergence {
    /// No pass made a change on the last of `iterations` iterations
    Converged { iterations: u32 },
    /// Passes were still making changes when the iteration limit was
    /// reached. The tree is still correct, only possibly less optimized.
    IterationLimit,
}

/// Optimizes `program` in place using [`PASSES`]
pub fn optimize(program: &mut Program, max_iterations: u32) -> Convergence {
    run_passes(program, &PASSES, max_iterations)
}

/// Runs `passes` over `program` until a fixpoint, or until
/// `max_iterations` iterations have run
pub fn run_passes(
    program: &mut Program,
    passes: &[&dyn Pass],
    max_iterations: u32,
) -> Convergence {
    for iteration in 1..=max_iterations {
        let mut changed = false;
        for pass in passes {
            if pass.run(program) {
                trace!(pass = pass.name(), iteration, "pass changed program");
                changed = true;
            }
        }

        if !changed {
            debug!(iterations = iteration, "optimizer converged");
            return Convergence::Converged {
                iterations: iteration,
            };
        }
    }

    warn!(
        max_iterations,
        "possible infinite loop in optimizer; using program as optimized so far"
    );
    Convergence::IterationLimit
}

/// Applies `rewrite` to every sequence of sibling nodes, innermost loops
/// first. Returns whether any call reported a change.
fn each_sequence<F>(nodes: &mut Vec<Node>, rewrite: &mut F) -> bool
where
    F: FnMut(&mut Vec<Node>) -> bool,
{
    let mut changed = false;
    for node in nodes.iter_mut() {
        if let Node::Loop(body) = node {
            changed |= each_sequence(body, rewrite);
        }
    }
    rewrite(nodes) || changed
}

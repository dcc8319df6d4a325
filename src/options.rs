/// Loops nested deeper than this are rejected by the parser
pub const DEFAULT_MAX_LOOP_DEPTH: usize = 64;

/// Optimizer runs stopping short of a fixpoint after this many iterations
/// indicate passes undoing each other
pub const DEFAULT_MAX_OPTIMIZER_ITERATIONS: u32 = 256;

/// Settings for one compilation
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CompileOptions {
    /// Run the optimizer between parsing and code generation
    pub optimize: bool,
    pub max_loop_depth: usize,
    pub max_optimizer_iterations: u32,
}

impl CompileOptions {
    /// Options for an optimization level as given on the command line;
    /// level 0 disables the optimizer
    pub fn with_level(level: u32) -> Self {
        CompileOptions {
            optimize: level > 0,
            ..Self::default()
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            optimize: true,
            max_loop_depth: DEFAULT_MAX_LOOP_DEPTH,
            max_optimizer_iterations: DEFAULT_MAX_OPTIMIZER_ITERATIONS,
        }
    }
}

// loop hint keys, attached to the latch terminator as `!loop {...}`
pub const LOOP_VECTORIZE_ENABLE: &str = "llvm.loop.vectorize.enable";
pub const LOOP_VECTORIZE_WIDTH: &str = "llvm.loop.vectorize.width";
pub const LOOP_IS_VECTORIZED: &str = "llvm.loop.isvectorized";
pub const LOOP_PARALLEL_ACCESSES: &str = "llvm.loop.parallel_accesses";
pub const LOOP_MIN_DEP_DIST: &str = "rv.loop.mindepdist";
// every hint under this prefix is dropped once a loop has been vectorized
pub const LOOP_VECTORIZE_PREFIX: &str = "llvm.loop.vectorize.";

// dependence distance of a loop without loop-carried dependences
pub const PARALLEL_DISTANCE: u32 = u32::MAX;

pub const DEFAULT_MAX_VECTOR_BITS: u32 = 256;
pub const MAX_VECTOR_WIDTH: u32 = 64;

// probability of staying inside a loop on a loop-exiting branch
pub const LOOP_TAKEN_PROB: f64 = 31.0 / 32.0;

pub const MAX_SIMULATE_STEPS: usize = 10_000_000;

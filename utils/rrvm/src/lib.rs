pub mod basicblock;
pub mod branch_prob;
pub mod cfg;
pub mod dominator;
pub mod func;
pub mod impls;
pub mod program;
pub mod rrvm_loop;
pub mod verify;

pub use basicblock::{BasicBlock, LlvmNode};
pub use cfg::CFG;

pub type LlvmCFG = CFG;

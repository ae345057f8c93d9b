pub mod loops;

use rrvm::program::LlvmProgram;
use utils::errors::Result;

pub use loops::vectorizer::{config::VectorizerConfig, LoopVectorizer};

pub trait RrvmOptimizer {
	fn new() -> Self;
	fn apply(self, program: &mut LlvmProgram) -> Result<bool>;
}

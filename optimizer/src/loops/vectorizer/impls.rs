use rrvm::program::LlvmProgram;
use utils::{errors::Result, warning};

use super::{config::VectorizerConfig, LoopVectorizer};
use crate::RrvmOptimizer;

impl RrvmOptimizer for LoopVectorizer {
	fn new() -> Self {
		let config = VectorizerConfig::from_env().unwrap_or_else(|err| {
			warning(format!("{}, using the default configuration", err));
			VectorizerConfig::default()
		});
		LoopVectorizer::with_config(config)
	}

	fn apply(mut self, program: &mut LlvmProgram) -> Result<bool> {
		self.run_program(program)
	}
}

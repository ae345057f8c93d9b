use llvm::{parser, LlvmTempManager};
use utils::Result;

use crate::func::LlvmFunc;

pub struct LlvmProgram {
	pub funcs: Vec<LlvmFunc>,
	pub temp_mgr: LlvmTempManager,
}

impl LlvmProgram {
	pub fn new() -> Self {
		Self {
			funcs: Vec::new(),
			temp_mgr: LlvmTempManager::new(),
		}
	}
	pub fn parse(src: &str) -> Result<Self> {
		let mut temp_mgr = LlvmTempManager::new();
		let funcs = parser::parse(src, &mut temp_mgr)?
			.into_iter()
			.map(LlvmFunc::from_decl)
			.collect::<Result<Vec<_>>>()?;
		Ok(Self { funcs, temp_mgr })
	}
	pub fn get_func(&self, name: &str) -> Option<&LlvmFunc> {
		self.funcs.iter().find(|f| f.name == name)
	}
}

impl Default for LlvmProgram {
	fn default() -> Self {
		Self::new()
	}
}

use llvm::{parser::FuncDecl, LlvmTemp, VarType};
use utils::{from_label, Result, RvError::LlvmSyntaxError};

use crate::{basicblock::BasicBlock, cfg::CFG, LlvmNode};

pub struct LlvmFunc {
	pub total: i32, // 用于创建新基本块，total+1为下一个基本块的编号
	pub cfg: CFG,
	pub name: String,
	pub ret_type: VarType,
	pub params: Vec<LlvmTemp>,
}

impl LlvmFunc {
	pub fn new_basicblock(&mut self) -> LlvmNode {
		self.total += 1;
		BasicBlock::new_node(self.total)
	}
	pub fn len(&self) -> usize {
		self.cfg.blocks.iter().map(|v| v.borrow().instr_cnt()).sum()
	}
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
	pub fn from_decl(decl: FuncDecl) -> Result<Self> {
		let mut total = 0;
		let mut blocks = Vec::new();
		for block in decl.blocks {
			let id = from_label(&block.label).ok_or_else(|| {
				LlvmSyntaxError(format!(
					"block `{}` in @{}: labels are `entry` or `B<n>`",
					block.label, decl.name
				))
			})?;
			total = total.max(id);
			let node = BasicBlock::new_node(id);
			{
				let mut bb = node.borrow_mut();
				bb.phi_instrs = block.phi_instrs;
				bb.instrs = block.instrs;
				bb.jump_instr = block.jump_instr;
				bb.loop_md = block.loop_md;
			}
			blocks.push(node);
		}
		if blocks.is_empty() {
			return Err(LlvmSyntaxError(format!("@{} has no blocks", decl.name)));
		}
		let mut cfg = CFG::new(blocks);
		cfg.resolve_links().map_err(|label| {
			LlvmSyntaxError(format!("@{}: unknown block `{}`", decl.name, label))
		})?;
		Ok(Self {
			total,
			cfg,
			name: decl.name,
			ret_type: decl.ret_type,
			params: decl.params,
		})
	}
}

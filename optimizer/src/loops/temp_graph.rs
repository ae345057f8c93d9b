// 循指令中 temp 的 use-def 链构造图：每个变量记录定义它的指令和所有 use

use std::collections::HashMap;

use llvm::{LlvmInstr, LlvmTemp, Value};
use rrvm::LlvmNode;

pub struct UseSite {
	pub block: i32,
	pub instr: LlvmInstr,
}

impl UseSite {
	pub fn target(&self) -> Option<LlvmTemp> {
		self.instr.get_write()
	}
}

#[derive(Default)]
pub struct TempGraph {
	pub temp_to_instr: HashMap<LlvmTemp, LlvmInstr>,
	pub temp_to_block: HashMap<LlvmTemp, i32>,
	pub users: HashMap<LlvmTemp, Vec<UseSite>>,
}

impl TempGraph {
	/// Def-use graph restricted to `blocks`.
	pub fn new(blocks: &[LlvmNode]) -> Self {
		let mut graph = Self::default();
		for bb in blocks.iter() {
			let bb = bb.borrow();
			let phis = bb.phi_instrs.iter().map(|phi| Box::new(phi.clone()) as LlvmInstr);
			let instrs = bb.instrs.iter().chain(bb.jump_instr.iter()).cloned();
			for instr in phis.chain(instrs) {
				for read in instr.get_read() {
					graph.users.entry(read).or_default().push(UseSite {
						block: bb.id,
						instr: instr.clone(),
					});
				}
				if let Some(target) = instr.get_write() {
					graph.temp_to_block.insert(target.clone(), bb.id);
					graph.temp_to_instr.insert(target, instr);
				}
			}
		}
		graph
	}

	pub fn is_defined(&self, temp: &LlvmTemp) -> bool {
		self.temp_to_instr.contains_key(temp)
	}
	pub fn is_phi(&self, temp: &LlvmTemp) -> bool {
		self.temp_to_instr.get(temp).is_some_and(|instr| instr.is_phi())
	}
	pub fn get_instr(&self, temp: &LlvmTemp) -> Option<&LlvmInstr> {
		self.temp_to_instr.get(temp)
	}
	// 只保留图内定义的操作数
	pub fn get_use_temps(&self, temp: &LlvmTemp) -> Vec<LlvmTemp> {
		match self.temp_to_instr.get(temp) {
			Some(instr) => {
				instr.get_read().into_iter().filter(|t| self.is_defined(t)).collect()
			}
			None => Vec::new(),
		}
	}
	pub fn get_use_values(&self, temp: &LlvmTemp) -> Vec<Value> {
		self
			.temp_to_instr
			.get(temp)
			.map(|instr| instr.get_read_values())
			.unwrap_or_default()
	}
	pub fn get_users(&self, temp: &LlvmTemp) -> &[UseSite] {
		self.users.get(temp).map(|v| v.as_slice()).unwrap_or_default()
	}
}

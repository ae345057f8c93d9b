use std::collections::HashMap;

use llvm::{LlvmInstrTrait, LlvmTemp, LlvmTempManager};
use rrvm::{basicblock::BasicBlock, rrvm_loop::utils::defined_in, LlvmNode};
use utils::{to_label, Label};

/// Copies of a set of blocks with fresh ids and temps. Labels and temps
/// defined inside the set are renamed, everything else is read as is.
pub struct LoopCloner {
	pub label_map: HashMap<Label, Label>,
	pub temp_map: HashMap<LlvmTemp, LlvmTemp>,
	pub block_map: HashMap<i32, LlvmNode>,
}

impl LoopCloner {
	pub fn new(
		blocks: &[LlvmNode],
		next_id: &mut i32,
		temp_mgr: &mut LlvmTempManager,
	) -> Self {
		let mut label_map = HashMap::new();
		let mut block_map = HashMap::new();
		for bb in blocks.iter() {
			*next_id += 1;
			label_map.insert(bb.borrow().label(), to_label(*next_id));
			block_map.insert(bb.borrow().id, BasicBlock::new_node(*next_id));
		}
		let mut defs: Vec<_> = defined_in(blocks).into_iter().collect();
		// 保证新变量编号稳定
		defs.sort();
		let temp_map = defs
			.into_iter()
			.map(|t| {
				let new = temp_mgr.new_temp(t.var_type, false);
				(t, new)
			})
			.collect();
		Self {
			label_map,
			temp_map,
			block_map,
		}
	}

	/// Redirect edges leaving the set (or phi incomings from outside it).
	pub fn map_outside(&mut self, old: Label, new: Label) {
		self.label_map.insert(old, new);
	}

	pub fn get(&self, id: i32) -> Option<LlvmNode> {
		self.block_map.get(&id).cloned()
	}

	/// Fill the copies. Call after every outside label is mapped.
	pub fn fill(&self, blocks: &[LlvmNode]) -> Vec<LlvmNode> {
		let mut copies = Vec::new();
		for bb in blocks.iter() {
			let bb = bb.borrow();
			let Some(node) = self.block_map.get(&bb.id) else {
				continue;
			};
			{
				let mut copy = node.borrow_mut();
				copy.phi_instrs = bb
					.phi_instrs
					.iter()
					.map(|phi| {
						let mut phi = phi.clone();
						phi.map_all_temp(&self.temp_map);
						phi.map_label(&self.label_map);
						phi
					})
					.collect();
				copy.instrs = bb
					.instrs
					.iter()
					.map(|instr| {
						let mut instr = instr.clone();
						instr.map_all_temp(&self.temp_map);
						instr
					})
					.collect();
				copy.jump_instr = bb.jump_instr.clone().map(|mut jump| {
					jump.map_all_temp(&self.temp_map);
					jump.map_label(&self.label_map);
					jump
				});
				copy.loop_md = bb.loop_md.clone();
			}
			copies.push(node.clone());
		}
		copies
	}

	pub fn temp(&self, temp: &LlvmTemp) -> LlvmTemp {
		self.temp_map.get(temp).cloned().unwrap_or_else(|| temp.clone())
	}
}

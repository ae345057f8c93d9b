use std::collections::{HashMap, HashSet};

use llvm::LlvmTemp;

use crate::{LlvmCFG, LlvmNode};

use super::{Loop, LoopPtr};

fn dedup(blocks: Vec<LlvmNode>) -> Vec<LlvmNode> {
	let mut seen = HashSet::new();
	blocks.into_iter().filter(|bb| seen.insert(bb.borrow().id)).collect()
}

impl Loop {
	/// Blocks of the loop, sub-loops included, in CFG order.
	pub fn blocks(
		&self,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Vec<LlvmNode> {
		cfg
			.blocks
			.iter()
			.filter(|bb| self.contains(bb.borrow().id, loop_map))
			.cloned()
			.collect()
	}
	pub fn latches(&self, loop_map: &HashMap<i32, LoopPtr>) -> Vec<LlvmNode> {
		let header = self.header.borrow();
		dedup(
			header
				.prev
				.iter()
				.filter(|bb| self.contains(bb.borrow().id, loop_map))
				.cloned()
				.collect(),
		)
	}
	pub fn single_latch(
		&self,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Option<LlvmNode> {
		let latches = self.latches(loop_map);
		match latches.len() {
			1 => latches.into_iter().next(),
			_ => None,
		}
	}
	pub fn outside_preds(
		&self,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Vec<LlvmNode> {
		let header = self.header.borrow();
		dedup(
			header
				.prev
				.iter()
				.filter(|bb| !self.contains(bb.borrow().id, loop_map))
				.cloned()
				.collect(),
		)
	}
	/// The single block entering the loop whose only successor is the header.
	pub fn preheader(&self, loop_map: &HashMap<i32, LoopPtr>) -> Option<LlvmNode> {
		let preds = self.outside_preds(loop_map);
		match preds.as_slice() {
			[pred] if pred.borrow().succ.len() == 1 => Some(pred.clone()),
			_ => None,
		}
	}
	pub fn exiting_blocks(
		&self,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Vec<LlvmNode> {
		self
			.blocks(cfg, loop_map)
			.into_iter()
			.filter(|bb| {
				bb.borrow()
					.succ
					.iter()
					.any(|succ| !self.contains(succ.borrow().id, loop_map))
			})
			.collect()
	}
	pub fn single_exiting_block(
		&self,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Option<LlvmNode> {
		let exiting = self.exiting_blocks(cfg, loop_map);
		match exiting.len() {
			1 => exiting.into_iter().next(),
			_ => None,
		}
	}
	pub fn exit_blocks(
		&self,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Vec<LlvmNode> {
		let exits = self
			.exiting_blocks(cfg, loop_map)
			.iter()
			.flat_map(|bb| bb.borrow().succ.clone())
			.filter(|succ| !self.contains(succ.borrow().id, loop_map))
			.collect();
		dedup(exits)
	}
	pub fn instr_cnt(
		&self,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> usize {
		self.blocks(cfg, loop_map).iter().map(|bb| bb.borrow().instr_cnt()).sum()
	}
}

/// Temps written inside `blocks`.
pub fn defined_in(blocks: &[LlvmNode]) -> HashSet<LlvmTemp> {
	let mut defs = HashSet::new();
	for bb in blocks.iter() {
		let bb = bb.borrow();
		defs.extend(bb.phi_instrs.iter().map(|phi| phi.target.clone()));
		defs.extend(bb.instrs.iter().flat_map(|instr| instr.get_write()));
	}
	defs
}

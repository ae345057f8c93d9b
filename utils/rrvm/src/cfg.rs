use std::collections::HashMap;

use utils::Label;

pub use crate::basicblock::{BasicBlock, LlvmNode};

pub struct CFG {
	pub blocks: Vec<LlvmNode>,
}

impl CFG {
	pub fn new(blocks: Vec<LlvmNode>) -> Self {
		Self { blocks }
	}
	pub fn get_entry(&self) -> LlvmNode {
		self.blocks[0].clone()
	}
	pub fn get_block(&self, id: i32) -> Option<LlvmNode> {
		self.blocks.iter().find(|bb| bb.borrow().id == id).cloned()
	}
	pub fn find_label(&self, label: &Label) -> Option<LlvmNode> {
		self.blocks.iter().find(|bb| bb.borrow().label() == *label).cloned()
	}
	pub fn position(&self, id: i32) -> Option<usize> {
		self.blocks.iter().position(|bb| bb.borrow().id == id)
	}
	pub fn size(&self) -> usize {
		self.blocks.len()
	}
	/// Rebuild `prev`/`succ` from the terminators.
	pub fn resolve_links(&mut self) -> Result<(), Label> {
		let by_label: HashMap<Label, LlvmNode> = self
			.blocks
			.iter()
			.map(|bb| (bb.borrow().label(), bb.clone()))
			.collect();
		self.blocks.iter().for_each(|bb| bb.borrow_mut().clear());
		for bb in self.blocks.iter() {
			let targets = bb.borrow().succ_labels();
			for target in targets {
				let succ = by_label.get(&target).ok_or(target)?;
				link_node(bb, succ);
			}
		}
		Ok(())
	}
}

pub fn link_node(from: &LlvmNode, to: &LlvmNode) {
	from.borrow_mut().succ.push(to.clone());
	to.borrow_mut().prev.push(from.clone());
}

pub fn unlink_node(from: &LlvmNode, to: &LlvmNode) {
	let to_id = to.borrow().id;
	let from_id = from.borrow().id;
	from.borrow_mut().succ.retain(|v| v.borrow().id != to_id);
	to.borrow_mut().prev.retain(|v| v.borrow().id != from_id);
}

/// Retarget the edge `from -> old` to `from -> new`, terminator included.
/// Phis are left alone.
pub fn replace_succ(from: &LlvmNode, old: &LlvmNode, new: &LlvmNode) {
	let map = HashMap::from([(old.borrow().label(), new.borrow().label())]);
	unlink_node(from, old);
	from.borrow_mut().map_jump_label(&map);
	link_node(from, new);
}

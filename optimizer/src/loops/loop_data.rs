use std::collections::HashMap;

use rrvm::{
	branch_prob::BranchProb, dominator::DomTree, func::LlvmFunc,
	rrvm_loop::LoopPtr,
};

// 所有分析都在第一次使用时计算，改动 cfg 之后必须 invalidate
#[derive(Default)]
pub struct LoopData {
	dom_tree: Option<DomTree>,
	pdom_tree: Option<DomTree>,
	// 循环树的根，以及每个 basicblock 属于哪个循环
	loops: Option<(LoopPtr, HashMap<i32, LoopPtr>)>,
	branch_prob: Option<BranchProb>,
}

impl LoopData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn invalidate(&mut self) {
		log::trace!("invalidate loop analyses");
		*self = Self::default();
	}

	pub fn pdom_tree(&mut self, func: &LlvmFunc) -> &DomTree {
		self.pdom_tree.get_or_insert_with(|| DomTree::new(&func.cfg, true))
	}

	fn loops(&mut self, func: &LlvmFunc) -> &(LoopPtr, HashMap<i32, LoopPtr>) {
		let dom_tree = self
			.dom_tree
			.get_or_insert_with(|| DomTree::new(&func.cfg, false));
		self.loops.get_or_insert_with(|| func.cfg.loop_analysis(dom_tree))
	}

	pub fn root_loop(&mut self, func: &LlvmFunc) -> LoopPtr {
		self.loops(func).0.clone()
	}

	pub fn loop_map(&mut self, func: &LlvmFunc) -> &HashMap<i32, LoopPtr> {
		&self.loops(func).1
	}

	/// The loop whose header is block `header_id`.
	pub fn find_loop(
		&mut self,
		func: &LlvmFunc,
		header_id: i32,
	) -> Option<LoopPtr> {
		self
			.loop_map(func)
			.get(&header_id)
			.filter(|l| l.borrow().header_id() == header_id)
			.cloned()
	}

	/// Frequency of each block of `loop_` per execution of its header.
	pub fn block_frequency(
		&mut self,
		func: &LlvmFunc,
		loop_: &LoopPtr,
	) -> HashMap<i32, f64> {
		let dom_tree = self
			.dom_tree
			.get_or_insert_with(|| DomTree::new(&func.cfg, false));
		let (_, loop_map) =
			self.loops.get_or_insert_with(|| func.cfg.loop_analysis(dom_tree));
		self
			.branch_prob
			.get_or_insert_with(|| BranchProb::new(&func.cfg, loop_map))
			.block_frequency(loop_, &func.cfg, loop_map)
	}
}

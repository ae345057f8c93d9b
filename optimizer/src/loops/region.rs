use std::collections::HashMap;

use rrvm::{func::LlvmFunc, rrvm_loop::LoopPtr, LlvmNode};

use super::loop_data::LoopData;

/// The blocks handed to the cost model and the engine: one loop, its
/// sub-loops included.
pub struct LoopRegion {
	pub header: LlvmNode,
	pub blocks: Vec<LlvmNode>,
	// executions of each block per execution of the header
	pub frequency: HashMap<i32, f64>,
}

impl LoopRegion {
	pub fn new(
		loop_: &LoopPtr,
		func: &LlvmFunc,
		loopdata: &mut LoopData,
	) -> Self {
		let blocks = loop_.borrow().blocks(&func.cfg, loopdata.loop_map(func));
		let frequency = loopdata.block_frequency(func, loop_);
		Self {
			header: loop_.borrow().header.clone(),
			blocks,
			frequency,
		}
	}

	pub fn header_id(&self) -> i32 {
		self.header.borrow().id
	}

	pub fn contains(&self, id: i32) -> bool {
		self.blocks.iter().any(|bb| bb.borrow().id == id)
	}

	pub fn frequency_of(&self, id: i32) -> f64 {
		self.frequency.get(&id).copied().unwrap_or(0.0)
	}
}

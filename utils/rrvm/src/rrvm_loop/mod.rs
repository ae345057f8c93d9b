use std::{
	cell::RefCell,
	collections::HashMap,
	fmt::Display,
	rc::{Rc, Weak},
};

use ::utils::Label;

use crate::LlvmNode;

pub mod loop_analysis;
pub mod loop_info;
pub mod utils;

pub type LoopPtr = Rc<RefCell<Loop>>;

// Instances of this class are used to represent loops that are detected in
// the flow graph. The root loop (id 0) stands for the whole function.
pub struct Loop {
	pub id: u32,
	pub outer: Option<Weak<RefCell<Loop>>>,
	pub header: LlvmNode,
	pub level: i32,
	pub subloops: Vec<LoopPtr>,
}

impl Loop {
	pub fn new(id: u32, header: LlvmNode) -> Self {
		Self {
			id,
			outer: None,
			header,
			level: -1,
			subloops: Vec::new(),
		}
	}
	pub fn outer(&self) -> Option<LoopPtr> {
		self.outer.as_ref().and_then(|v| v.upgrade())
	}
	pub fn is_root(&self) -> bool {
		self.outer.is_none()
	}
	pub fn no_inner(&self) -> bool {
		self.subloops.is_empty()
	}
	pub fn name(&self) -> Label {
		self.header.borrow().label()
	}
	pub fn header_id(&self) -> i32 {
		self.header.borrow().id
	}
	/// Whether block `bb_id` belongs to this loop or one nested in it.
	pub fn contains(&self, bb_id: i32, loop_map: &HashMap<i32, LoopPtr>) -> bool {
		if self.is_root() {
			return true;
		}
		let mut cur = loop_map.get(&bb_id).cloned();
		while let Some(l) = cur {
			if l.borrow().id == self.id {
				return true;
			}
			cur = l.borrow().outer();
		}
		false
	}
}

impl Display for Loop {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let outer = match self.outer() {
			Some(outer) => outer.borrow().header.borrow().label().to_string(),
			None => "None".to_string(),
		};
		write!(
			f,
			"loop {} outer: {}, header: {}, level: {}, subloops: {}",
			self.id,
			outer,
			self.name(),
			self.level,
			self.subloops.len()
		)
	}
}

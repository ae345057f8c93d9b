mod naive;

use std::collections::HashMap;

pub use naive::*;

use crate::{LlvmCFG, LlvmNode};

/// Dominator tree, or post-dominator tree when `reverse` is set.
pub struct DomTree {
	pub reverse: bool,
	// 每个块支配的块（包括自己）
	pub dominates: HashMap<i32, Vec<LlvmNode>>,
	// 直接支配者
	pub dominator: HashMap<i32, LlvmNode>,
	pub dom_direct: HashMap<i32, Vec<LlvmNode>>,
}

impl DomTree {
	pub fn new(cfg: &LlvmCFG, reverse: bool) -> Self {
		let mut dominates = HashMap::new();
		let mut dom_direct = HashMap::new();
		let mut dominator = HashMap::new();
		compute_dominator(
			cfg,
			reverse,
			&mut dominates,
			&mut dom_direct,
			&mut dominator,
		);
		Self {
			reverse,
			dominates,
			dominator,
			dom_direct,
		}
	}
	/// Whether `a` (post-)dominates `b`. Every block dominates itself.
	pub fn dominates(&self, a: i32, b: i32) -> bool {
		self
			.dominates
			.get(&a)
			.is_some_and(|v| v.iter().any(|bb| bb.borrow().id == b))
	}
	pub fn idom(&self, id: i32) -> Option<LlvmNode> {
		self.dominator.get(&id).cloned()
	}
	pub fn get_children(&self, id: i32) -> Vec<LlvmNode> {
		self.dom_direct.get(&id).cloned().unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::DomTree;
	use crate::program::LlvmProgram;

	// entry -> B1 -> {B2, B3}; B2 -> B4; B3 -> B4; B4 -> B1 | B5
	const DIAMOND_LOOP: &str = r#"
define void @f(i32 %a) {
entry:
  br label %B1
B1:
  br i32 %a, label %B2, label %B3
B2:
  br label %B4
B3:
  br label %B4
B4:
  br i32 %a, label %B1, label %B5
B5:
  ret void
}
"#;

	#[test]
	fn dominators() {
		let program = LlvmProgram::parse(DIAMOND_LOOP).unwrap();
		let dom = DomTree::new(&program.funcs[0].cfg, false);
		assert!(dom.dominates(0, 5));
		assert!(dom.dominates(1, 4));
		assert!(!dom.dominates(2, 4));
		assert!(dom.dominates(4, 4));
		assert_eq!(dom.idom(4).unwrap().borrow().id, 1);
		assert_eq!(dom.idom(5).unwrap().borrow().id, 4);
		assert!(dom.idom(0).is_none());
		let mut children: Vec<_> =
			dom.get_children(1).iter().map(|bb| bb.borrow().id).collect();
		children.sort();
		assert_eq!(children, vec![2, 3, 4]);
	}

	#[test]
	fn post_dominators() {
		let program = LlvmProgram::parse(DIAMOND_LOOP).unwrap();
		let pdom = DomTree::new(&program.funcs[0].cfg, true);
		assert!(pdom.dominates(4, 1));
		assert!(pdom.dominates(4, 2));
		assert!(!pdom.dominates(2, 1));
		assert!(pdom.dominates(5, 0));
		assert_eq!(pdom.idom(1).unwrap().borrow().id, 4);
	}
}

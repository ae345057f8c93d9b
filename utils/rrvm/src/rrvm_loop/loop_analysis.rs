use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{dominator::DomTree, LlvmCFG, LlvmNode};

use super::{Loop, LoopPtr};

impl LlvmCFG {
	/// Natural loop forest. Returns the root loop and, for every block inside
	/// some loop, its innermost loop.
	pub fn loop_analysis(
		&self,
		dom_tree: &DomTree,
	) -> (LoopPtr, HashMap<i32, LoopPtr>) {
		let mut loop_map = HashMap::new();
		let mut loops = Vec::new();
		loop_dfs(self.get_entry(), dom_tree, &mut loop_map, &mut loops);

		let root = Rc::new(RefCell::new(Loop::new(0, self.get_entry())));
		root.borrow_mut().level = 0;
		// 按 header 在 cfg 中的位置排序，保证子循环顺序稳定
		loops.sort_by_key(|l: &LoopPtr| self.position(l.borrow().header_id()));
		for l in loops.iter() {
			let outer = l.borrow().outer().unwrap_or_else(|| root.clone());
			if l.borrow().outer.is_none() {
				l.borrow_mut().outer = Some(Rc::downgrade(&root));
			}
			outer.borrow_mut().subloops.push(l.clone());
		}
		calc_loop_level(&root);
		(root, loop_map)
	}
}

fn calc_loop_level(loop_: &LoopPtr) {
	let level = loop_.borrow().level;
	for sub in loop_.borrow().subloops.iter() {
		sub.borrow_mut().level = level + 1;
		calc_loop_level(sub);
	}
}

fn outermost(loop_: LoopPtr) -> LoopPtr {
	let mut inner = loop_;
	loop {
		let outer = inner.borrow().outer();
		match outer {
			Some(outer) => inner = outer,
			None => return inner,
		}
	}
}

// dfs on dom tree, inner loops are found before the loops around them
fn loop_dfs(
	cur_bb: LlvmNode,
	dom_tree: &DomTree,
	loop_map: &mut HashMap<i32, LoopPtr>,
	loops: &mut Vec<LoopPtr>,
) {
	let cur_id = cur_bb.borrow().id;
	for next in dom_tree.get_children(cur_id) {
		loop_dfs(next, dom_tree, loop_map, loops);
	}
	// 看看自己的前驱有没有被自己支配的，有的话就有循环存在，与自己前驱之间的边就是 backedge
	let mut bbs: Vec<LlvmNode> = cur_bb
		.borrow()
		.prev
		.iter()
		.filter(|prev| dom_tree.dominates(cur_id, prev.borrow().id))
		.cloned()
		.collect();
	if bbs.is_empty() {
		return;
	}
	let new_loop = Rc::new(RefCell::new(Loop::new(
		loops.len() as u32 + 1,
		cur_bb.clone(),
	)));
	loop_map.insert(cur_id, new_loop.clone());
	loops.push(new_loop.clone());
	while let Some(bb) = bbs.pop() {
		let bb_id = bb.borrow().id;
		match loop_map.get(&bb_id).cloned() {
			None => {
				loop_map.insert(bb_id, new_loop.clone());
				bbs.extend(bb.borrow().prev.iter().cloned());
			}
			Some(inner_loop) => {
				let inner_loop = outermost(inner_loop);
				if Rc::ptr_eq(&inner_loop, &new_loop) {
					continue;
				}
				inner_loop.borrow_mut().outer = Some(Rc::downgrade(&new_loop));
				let header_prev = inner_loop.borrow().header.borrow().prev.clone();
				bbs.extend(header_prev);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::{dominator::DomTree, program::LlvmProgram};

	const NEST: &str = r#"
define void @f(i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B4]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B5
B2:
  %j = phi i32 [0, %B1], [%j.next, %B3]
  %d = icmp slt i32 %j, %n
  br i32 %d, label %B3, label %B4
B3:
  %j.next = add i32 %j, 1
  br label %B2
B4:
  %i.next = add i32 %i, 1
  br label %B1
B5:
  ret void
}
"#;

	#[test]
	fn nested_loops() {
		let program = LlvmProgram::parse(NEST).unwrap();
		let cfg = &program.funcs[0].cfg;
		let dom = DomTree::new(cfg, false);
		let (root, loop_map) = cfg.loop_analysis(&dom);
		assert_eq!(root.borrow().subloops.len(), 1);
		let outer = root.borrow().subloops[0].clone();
		assert_eq!(outer.borrow().header_id(), 1);
		assert_eq!(outer.borrow().level, 1);
		assert_eq!(outer.borrow().subloops.len(), 1);
		let inner = outer.borrow().subloops[0].clone();
		assert_eq!(inner.borrow().header_id(), 2);
		assert_eq!(inner.borrow().level, 2);
		assert!(inner.borrow().no_inner());
		assert_eq!(loop_map[&3].borrow().id, inner.borrow().id);
		assert_eq!(loop_map[&4].borrow().id, outer.borrow().id);
		assert!(outer.borrow().contains(3, &loop_map));
		assert!(!inner.borrow().contains(4, &loop_map));
		assert!(!outer.borrow().contains(5, &loop_map));
		assert!(loop_map.get(&0).is_none());
	}
}

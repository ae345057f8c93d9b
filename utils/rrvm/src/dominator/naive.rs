// naive algorithm computing dominator tree with complexity O(n*m)
// Ref: https://blog.csdn.net/Dong_HFUT/article/details/121375025?spm=1001.2014.3001.5501

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{LlvmCFG, LlvmNode};

fn roots(cfg: &LlvmCFG, reverse: bool) -> Vec<LlvmNode> {
	if reverse {
		cfg
			.blocks
			.iter()
			.filter(|bb| bb.borrow().succ.is_empty())
			.cloned()
			.collect()
	} else {
		vec![cfg.get_entry()]
	}
}

fn reachable_without(
	roots: &[LlvmNode],
	reverse: bool,
	removed: Option<i32>,
) -> HashSet<i32> {
	let mut reachable = HashSet::new();
	let mut worklist: VecDeque<_> = roots
		.iter()
		.filter(|bb| Some(bb.borrow().id) != removed)
		.cloned()
		.collect();
	while let Some(bb) = worklist.pop_front() {
		if !reachable.insert(bb.borrow().id) {
			continue;
		}
		let bb = bb.borrow();
		let next = if reverse { &bb.prev } else { &bb.succ };
		for v in next.iter() {
			if Some(v.borrow().id) != removed {
				worklist.push_back(v.clone());
			}
		}
	}
	reachable
}

pub fn compute_dominator(
	cfg: &LlvmCFG,
	reverse: bool,
	dominates: &mut HashMap<i32, Vec<LlvmNode>>,
	dominates_directly: &mut HashMap<i32, Vec<LlvmNode>>,
	dominator: &mut HashMap<i32, LlvmNode>,
) {
	let roots = roots(cfg, reverse);
	let all = reachable_without(&roots, reverse, None);
	for bb in cfg.blocks.iter() {
		let id = bb.borrow().id;
		if !all.contains(&id) {
			continue;
		}
		// 尝试将这个 bb 从图中移除，移除后无法访问的节点是被它支配的节点
		let reachable = reachable_without(&roots, reverse, Some(id));
		let entry = dominates.entry(id).or_default();
		for bb_inner in cfg.blocks.iter() {
			let inner_id = bb_inner.borrow().id;
			if all.contains(&inner_id) && !reachable.contains(&inner_id) {
				entry.push(bb_inner.clone());
			}
		}
	}
	// 直接支配者是严格支配者中支配块数最少的那个
	for bb in cfg.blocks.iter() {
		let id = bb.borrow().id;
		let idom = cfg
			.blocks
			.iter()
			.filter(|d| {
				let d_id = d.borrow().id;
				d_id != id
					&& dominates
						.get(&d_id)
						.is_some_and(|v| v.iter().any(|x| x.borrow().id == id))
			})
			.min_by_key(|d| dominates[&d.borrow().id].len());
		if let Some(idom) = idom {
			dominator.insert(id, idom.clone());
			dominates_directly.entry(idom.borrow().id).or_default().push(bb.clone());
		}
	}
}

// Static branch probabilities and loop-relative block frequencies.

use std::collections::{HashMap, VecDeque};

use utils::LOOP_TAKEN_PROB;

use crate::{rrvm_loop::LoopPtr, LlvmCFG, LlvmNode};

pub struct BranchProb {
	probs: HashMap<(i32, i32), f64>,
}

fn innermost_contains(
	bb: i32,
	target: i32,
	loop_map: &HashMap<i32, LoopPtr>,
) -> bool {
	match loop_map.get(&bb) {
		Some(l) => l.borrow().contains(target, loop_map),
		None => true,
	}
}

impl BranchProb {
	/// A branch that leaves the innermost loop of its block is taken with
	/// probability `1 - LOOP_TAKEN_PROB`; every other two-way branch is even.
	pub fn new(cfg: &LlvmCFG, loop_map: &HashMap<i32, LoopPtr>) -> Self {
		let mut probs = HashMap::new();
		for bb in cfg.blocks.iter() {
			let bb = bb.borrow();
			let succ: Vec<i32> = bb.succ.iter().map(|v| v.borrow().id).collect();
			match succ.as_slice() {
				[] => {}
				[only] => {
					probs.insert((bb.id, *only), 1.0);
				}
				[a, b] if a == b => {
					probs.insert((bb.id, *a), 1.0);
				}
				[a, b] => {
					let stay_a = innermost_contains(bb.id, *a, loop_map);
					let stay_b = innermost_contains(bb.id, *b, loop_map);
					let p = match (stay_a, stay_b) {
						(true, false) => LOOP_TAKEN_PROB,
						(false, true) => 1.0 - LOOP_TAKEN_PROB,
						_ => 0.5,
					};
					probs.insert((bb.id, *a), p);
					probs.insert((bb.id, *b), 1.0 - p);
				}
				_ => {
					let p = 1.0 / succ.len() as f64;
					for s in succ.iter() {
						probs.insert((bb.id, *s), p);
					}
				}
			}
		}
		Self { probs }
	}

	pub fn get(&self, from: i32, to: i32) -> f64 {
		self.probs.get(&(from, to)).copied().unwrap_or(0.0)
	}

	/// Frequency of every block of `loop_` per execution of its header.
	/// Headers of nested loops are scaled by the expected trip count implied
	/// by `LOOP_TAKEN_PROB`.
	pub fn block_frequency(
		&self,
		loop_: &LoopPtr,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> HashMap<i32, f64> {
		let blocks = loop_.borrow().blocks(cfg, loop_map);
		let header = loop_.borrow().header_id();
		let inside = |id: i32| loop_.borrow().contains(id, loop_map);
		let forward_succ = |bb: &LlvmNode| -> Vec<i32> {
			let bb = bb.borrow();
			bb.succ
				.iter()
				.map(|v| v.borrow().id)
				.filter(|s| inside(*s) && !is_backedge(bb.id, *s, loop_map))
				.collect()
		};

		let mut indeg: HashMap<i32, usize> =
			blocks.iter().map(|bb| (bb.borrow().id, 0)).collect();
		for bb in blocks.iter() {
			for s in forward_succ(bb) {
				*indeg.entry(s).or_default() += 1;
			}
		}

		let mut freq: HashMap<i32, f64> =
			blocks.iter().map(|bb| (bb.borrow().id, 0.0)).collect();
		freq.insert(header, 1.0);
		let mut queue = VecDeque::from([header]);
		let trip_scale = 1.0 / (1.0 - LOOP_TAKEN_PROB);
		while let Some(id) = queue.pop_front() {
			let Some(bb) = cfg.get_block(id) else {
				continue;
			};
			if id != header && is_loop_header(id, loop_map) {
				if let Some(f) = freq.get_mut(&id) {
					*f *= trip_scale;
				}
			}
			let cur = freq.get(&id).copied().unwrap_or(0.0);
			for s in forward_succ(&bb) {
				*freq.entry(s).or_default() += cur * self.get(id, s);
				if let Some(d) = indeg.get_mut(&s) {
					*d -= 1;
					if *d == 0 {
						queue.push_back(s);
					}
				}
			}
		}
		freq
	}
}

fn is_loop_header(id: i32, loop_map: &HashMap<i32, LoopPtr>) -> bool {
	loop_map.get(&id).is_some_and(|l| l.borrow().header_id() == id)
}

// 到某个循环 header 且来自该循环内部的边
fn is_backedge(from: i32, to: i32, loop_map: &HashMap<i32, LoopPtr>) -> bool {
	match loop_map.get(&to) {
		Some(l) => {
			let l = l.borrow();
			l.header_id() == to && l.contains(from, loop_map)
		}
		None => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{dominator::DomTree, program::LlvmProgram};

	const NEST: &str = r#"
define void @f(i32 %n, i32 %a) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B5]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B6
B2:
  br i32 %a, label %B3, label %B5
B3:
  %j = phi i32 [0, %B2], [%j.next, %B3]
  %j.next = add i32 %j, 1
  %d = icmp slt i32 %j.next, %n
  br i32 %d, label %B3, label %B5
B5:
  %i.next = add i32 %i, 1
  br label %B1
B6:
  ret void
}
"#;

	#[test]
	fn probabilities_and_frequencies() {
		let program = LlvmProgram::parse(NEST).unwrap();
		let cfg = &program.funcs[0].cfg;
		let dom = DomTree::new(cfg, false);
		let (root, loop_map) = cfg.loop_analysis(&dom);
		let prob = BranchProb::new(cfg, &loop_map);
		assert_eq!(prob.get(1, 2), LOOP_TAKEN_PROB);
		assert_eq!(prob.get(2, 3), 0.5);
		assert_eq!(prob.get(3, 3), LOOP_TAKEN_PROB);
		assert_eq!(prob.get(0, 1), 1.0);
		assert_eq!(prob.get(0, 6), 0.0);

		let outer = root.borrow().subloops[0].clone();
		let freq = prob.block_frequency(&outer, cfg, &loop_map);
		let eps = 1e-9;
		assert!((freq[&1] - 1.0).abs() < eps);
		assert!((freq[&2] - LOOP_TAKEN_PROB).abs() < eps);
		// the inner header runs about 32 times per entry
		assert!((freq[&3] - LOOP_TAKEN_PROB * 0.5 * 32.0).abs() < 1e-6);
		assert!(freq[&5] > freq[&2] * 0.99);
		assert!(!freq.contains_key(&6));
	}
}

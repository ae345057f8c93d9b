// 识别形如 i = phi [c, pre], [i + step, latch]; icmp op i, end 的标准循环，
// 计算循环体执行次数

use std::{collections::HashMap, fmt::Display};

use llvm::{ArithOp, CompKind, CompOp, LlvmInstrVariant, LlvmTemp, Value};
use utils::math::ceil_div;

use crate::{LlvmCFG, LlvmNode};

use super::{utils::defined_in, LoopPtr};

pub struct LoopInfo {
	pub header: LlvmNode,
	pub latch: LlvmNode,
	pub exiting: LlvmNode,
	pub exit: LlvmNode,
	pub indvar: LlvmTemp,
	pub indvar_next: LlvmTemp,
	pub begin: Value,
	pub step: i32,
	pub end: Value,
	// the exit compare
	pub cond: LlvmTemp,
	// normalized so that the loop keeps running while `tested OP end`
	pub comp_op: CompOp,
	// the compare reads `indvar_next` rather than `indvar`
	pub cmp_on_next: bool,
}

impl LoopInfo {
	pub fn new(
		loop_: &LoopPtr,
		cfg: &LlvmCFG,
		loop_map: &HashMap<i32, LoopPtr>,
	) -> Option<Self> {
		let loop_ = loop_.borrow();
		let header = loop_.header.clone();
		let latch = loop_.single_latch(loop_map)?;
		let preheader = match loop_.outside_preds(loop_map).as_slice() {
			[pred] => pred.clone(),
			_ => return None,
		};
		let exiting = loop_.single_exiting_block(cfg, loop_map)?;
		let blocks = loop_.blocks(cfg, loop_map);
		let loop_defs = defined_in(&blocks);

		let (cond, target_true, target_false) = {
			let exiting = exiting.borrow();
			match exiting.jump_instr.as_ref()?.get_variant() {
				LlvmInstrVariant::JumpCondInstr(jump) => (
					jump.cond.unwrap_temp()?,
					jump.target_true.clone(),
					jump.target_false.clone(),
				),
				_ => return None,
			}
		};
		let exit = exiting
			.borrow()
			.succ
			.iter()
			.find(|succ| !loop_.contains(succ.borrow().id, loop_map))
			.cloned()?;
		let continue_on_true = exit.borrow().label() == target_false;
		if !continue_on_true && exit.borrow().label() != target_true {
			return None;
		}

		let (mut comp_op, lhs, rhs) = {
			let exiting = exiting.borrow();
			let comp = exiting.instrs.iter().find_map(|instr| {
				match instr.get_variant() {
					LlvmInstrVariant::CompInstr(comp) if comp.target == cond => {
						Some(comp.clone())
					}
					_ => None,
				}
			})?;
			if comp.kind != CompKind::Icmp {
				return None;
			}
			(comp.op, comp.lhs, comp.rhs)
		};
		if !continue_on_true {
			comp_op = comp_op.inverse();
		}

		let preheader_label = preheader.borrow().label();
		let latch_label = latch.borrow().label();
		let exiting_is_latch = exiting.borrow().id == latch.borrow().id;
		let header_ref = header.borrow();
		for phi in header_ref.phi_instrs.iter() {
			if phi.source.len() != 2 {
				continue;
			}
			let Some(begin) = phi.get_incoming(&preheader_label) else {
				continue;
			};
			let Some(Value::Temp(next)) = phi.get_incoming(&latch_label) else {
				continue;
			};
			let Some(step) = find_step(&blocks, next, &phi.target) else {
				continue;
			};
			let (tested, end, swapped) = if is_iv(&lhs, &phi.target, next) {
				(&lhs, &rhs, false)
			} else if is_iv(&rhs, &phi.target, next) {
				(&rhs, &lhs, true)
			} else {
				continue;
			};
			let invariant = match end {
				Value::Temp(t) => !loop_defs.contains(t),
				_ => true,
			};
			let cmp_on_next = tested.is_temp(next);
			// header 退出时，比较只能用 phi 本身
			if !invariant || (cmp_on_next && !exiting_is_latch) {
				continue;
			}
			return Some(Self {
				header: header.clone(),
				latch: latch.clone(),
				exiting: exiting.clone(),
				exit,
				indvar: phi.target.clone(),
				indvar_next: next.clone(),
				begin: begin.clone(),
				step,
				end: end.clone(),
				cond,
				comp_op: if swapped { comp_op.swap() } else { comp_op },
				cmp_on_next,
			});
		}
		None
	}

	pub fn exits_in_header(&self) -> bool {
		self.exiting.borrow().id == self.header.borrow().id
			&& self.exiting.borrow().id != self.latch.borrow().id
	}

	/// How many times the loop body runs, when `begin`, `end` and `step` are
	/// constants and the loop terminates.
	pub fn trip_count(&self) -> Option<i64> {
		let begin = self.begin.as_int()? as i64;
		let end = self.end.as_int()? as i64;
		let step = self.step as i64;
		if self.exits_in_header() {
			run_length(begin, end, step, self.comp_op)
		} else if self.cmp_on_next {
			Some(1 + run_length(begin + step, end, step, self.comp_op)?)
		} else {
			Some(1 + run_length(begin, end, step, self.comp_op)?)
		}
	}

	pub fn backedge_taken_count(&self) -> Option<i64> {
		let trip = self.trip_count()?;
		if self.exits_in_header() {
			Some(trip)
		} else {
			Some(trip - 1)
		}
	}
}

fn is_iv(value: &Value, indvar: &LlvmTemp, next: &LlvmTemp) -> bool {
	value.is_temp(indvar) || value.is_temp(next)
}

// next = add indvar, c | add c, indvar | sub indvar, c
fn find_step(
	blocks: &[LlvmNode],
	next: &LlvmTemp,
	indvar: &LlvmTemp,
) -> Option<i32> {
	for bb in blocks.iter() {
		for instr in bb.borrow().instrs.iter() {
			let LlvmInstrVariant::ArithInstr(arith) = instr.get_variant() else {
				continue;
			};
			if arith.target != *next {
				continue;
			}
			let step = match (arith.op, &arith.lhs, &arith.rhs) {
				(ArithOp::Add, v, Value::Int(c)) if v.is_temp(indvar) => Some(*c),
				(ArithOp::Add, Value::Int(c), v) if v.is_temp(indvar) => Some(*c),
				(ArithOp::Sub, v, Value::Int(c)) if v.is_temp(indvar) => {
					c.checked_neg()
				}
				_ => None,
			};
			return step.filter(|s| *s != 0);
		}
	}
	None
}

/// Number of leading k >= 0 with `begin + k * step OP end`. None if the
/// sequence never stops or the compare is not monotone in k.
pub fn run_length(begin: i64, end: i64, step: i64, op: CompOp) -> Option<i64> {
	let n = match op {
		CompOp::Slt if step > 0 => ceil_div(end - begin, step),
		CompOp::Sle if step > 0 => (end - begin).div_euclid(step) + 1,
		CompOp::Sgt if step < 0 => ceil_div(begin - end, -step),
		CompOp::Sge if step < 0 => (begin - end).div_euclid(-step) + 1,
		CompOp::Ne => {
			let dist = end - begin;
			if dist % step != 0 || dist / step < 0 {
				return None;
			}
			dist / step
		}
		// 条件一开始就不成立时循环体不执行；否则不会停止
		CompOp::Slt | CompOp::Sle => {
			if begin < end || (op == CompOp::Sle && begin == end) {
				return None;
			}
			0
		}
		CompOp::Sgt | CompOp::Sge => {
			if begin > end || (op == CompOp::Sge && begin == end) {
				return None;
			}
			0
		}
		_ => return None,
	};
	Some(n.max(0))
}

impl Display for LoopInfo {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"indvar: {} = {}, +{} while {} {} {} ({}), exiting {}",
			self.indvar,
			self.begin,
			self.step,
			if self.cmp_on_next { &self.indvar_next } else { &self.indvar },
			self.comp_op,
			self.end,
			self.cond,
			self.exiting.borrow().label()
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{dominator::DomTree, program::LlvmProgram};

	fn info_of(src: &str) -> Option<(Option<i64>, Option<i64>)> {
		let program = LlvmProgram::parse(src).unwrap();
		let cfg = &program.funcs[0].cfg;
		let dom = DomTree::new(cfg, false);
		let (root, loop_map) = cfg.loop_analysis(&dom);
		let loop_ = root.borrow().subloops[0].clone();
		let info = LoopInfo::new(&loop_, cfg, &loop_map)?;
		Some((info.trip_count(), info.backedge_taken_count()))
	}

	fn top_tested(begin: &str, op: &str, end: &str, step: &str) -> String {
		format!(
			r#"
define void @f(i32 %n) {{
entry:
  br label %B1
B1:
  %i = phi i32 [{begin}, %entry], [%i.next, %B2]
  %c = icmp {op} i32 %i, {end}
  br i32 %c, label %B2, label %B3
B2:
  %i.next = add i32 %i, {step}
  br label %B1
B3:
  ret void
}}
"#
		)
	}

	#[test]
	fn header_exiting_counts() {
		assert_eq!(info_of(&top_tested("0", "slt", "10", "1")), Some((Some(10), Some(10))));
		assert_eq!(info_of(&top_tested("0", "sle", "10", "3")), Some((Some(4), Some(4))));
		assert_eq!(info_of(&top_tested("10", "sgt", "0", "-2")), Some((Some(5), Some(5))));
		assert_eq!(info_of(&top_tested("5", "slt", "3", "1")), Some((Some(0), Some(0))));
		assert_eq!(info_of(&top_tested("0", "ne", "12", "4")), Some((Some(3), Some(3))));
		assert_eq!(info_of(&top_tested("0", "slt", "%n", "1")), Some((None, None)));
	}

	#[test]
	fn latch_exiting_counts() {
		let src = r#"
define void @f() {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B1]
  %i.next = add i32 %i, 1
  %c = icmp slt i32 %i.next, 8
  br i32 %c, label %B1, label %B2
B2:
  ret void
}
"#;
		assert_eq!(info_of(src), Some((Some(8), Some(7))));
	}

	#[test]
	fn non_canonical() {
		// the bound changes inside the loop
		let src = r#"
define void @f(i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %m = phi i32 [%n, %entry], [%m.next, %B2]
  %c = icmp slt i32 %i, %m
  br i32 %c, label %B2, label %B3
B2:
  %i.next = add i32 %i, 1
  %m.next = sub i32 %m, 1
  br label %B1
B3:
  ret void
}
"#;
		assert!(info_of(src).is_none());
	}

	#[test]
	fn run_lengths() {
		assert_eq!(run_length(0, 7, 2, CompOp::Slt), Some(4));
		assert_eq!(run_length(0, 0, 1, CompOp::Sle), Some(1));
		assert_eq!(run_length(3, 1, 1, CompOp::Sle), Some(0));
		assert_eq!(run_length(0, 10, -1, CompOp::Slt), None);
		assert_eq!(run_length(0, 5, 2, CompOp::Ne), None);
	}
}

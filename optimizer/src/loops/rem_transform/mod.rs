// 把循环拆成向量主循环 + 标量余数循环：
//   PH -> VPH -> VH ... VL (每次迭代 W 个 lane) -> RPH -> H ... L (原循环)
// 主循环的条件是 i < end - (W-1)*step，余数循环从主循环退出时的 phi 值开始。
// 先在 RemainderPlan 中构造好所有新块，commit 时一次性接入 cfg。

mod clone;

use std::{collections::HashMap, fmt::Display};

use llvm::{
	ArithInstr, ArithOp, CompInstr, CompKind, CompOp, JumpCondInstr, JumpInstr,
	LlvmInstr, LlvmInstrVariant, LlvmTemp, LlvmTempManager,
	PhiInstr, SelectInstr, Value, VarType,
};
use rrvm::{
	basicblock::BasicBlock,
	func::LlvmFunc,
	rrvm_loop::{loop_info::run_length, loop_info::LoopInfo, LoopPtr},
	LlvmNode,
};
use utils::{to_label, Label, Result, RvError};

use super::{loop_data::LoopData, reduction::ReductionAnalysis};

pub use clone::LoopCloner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedShape {
	ExitNotInHeader,
	MultipleLatches,
	LatchNotJump,
	NoPreheader,
	LatchNotPostDominating,
	NonCanonicalInduction,
	UnsupportedCompare,
	BoundOverflow,
}

impl Display for UnsupportedShape {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let msg = match self {
			Self::ExitNotInHeader => "the loop does not exit from its header",
			Self::MultipleLatches => "the loop has more than one latch",
			Self::LatchNotJump => "the latch does not end in a plain jump",
			Self::NoPreheader => "the header has more than one outside predecessor",
			Self::LatchNotPostDominating => {
				"the latch does not post-dominate the loop body"
			}
			Self::NonCanonicalInduction => "no canonical induction variable",
			Self::UnsupportedCompare => "the exit compare is not monotone",
			Self::BoundOverflow => "the vector bound overflows",
		};
		write!(f, "{}", msg)
	}
}

/// The loop handed to the engine once a plan is committed.
pub struct PreparedLoop {
	pub header: i32,
	pub latch: i32,
	// values whose per-lane copies must agree, e.g. the exit condition
	pub uniform_overrides: Vec<LlvmTemp>,
	// original temp -> temp of the vector loop
	pub temp_map: HashMap<LlvmTemp, LlvmTemp>,
}

struct StrideUpdate {
	phi: LlvmTemp,
	next: LlvmTemp,
	step: i32,
}

enum PlanKind {
	// 循环次数是 W 的倍数，原地把步长乘 W
	InPlace {
		latch: LlvmNode,
		updates: Vec<StrideUpdate>,
		cond: LlvmTemp,
	},
	Split {
		preheader: LlvmNode,
		// VPH, copies of the loop, RPH
		blocks: Vec<LlvmNode>,
		vector_header: LlvmNode,
		vector_latch: LlvmNode,
		// header phi of the remainder loop -> value leaving the vector loop
		remainder_init: Vec<(LlvmTemp, Value)>,
		rph_label: Label,
		new_total: i32,
		cloner: LoopCloner,
		overrides: Vec<LlvmTemp>,
	},
}

pub struct RemainderPlan {
	pub width: u32,
	header: LlvmNode,
	kind: PlanKind,
}

pub struct RemainderTransform<'a> {
	pub func: &'a LlvmFunc,
	pub loopdata: &'a mut LoopData,
	pub temp_mgr: &'a mut LlvmTempManager,
}

/// Iterations run by the vector loop and by the remainder for a loop
/// `for (i = begin; i OP end; i += step)` vectorized `width` wide.
pub fn split_counts(
	begin: i64,
	end: i64,
	step: i64,
	op: CompOp,
	width: i64,
) -> Option<(i64, i64)> {
	let vend = end - (width - 1) * step;
	let main = run_length(begin, vend, step * width, op)?;
	let rem = run_length(begin + main * width * step, end, step, op)?;
	Some((main, rem))
}

// 运行时的上界：i OP end - offset 改写成严格比较 i op' end - shift，
// end - shift 越界时取 saturate，主循环一次也不执行
struct RuntimeBound {
	op: CompOp,
	shift: i32,
	saturate: i32,
}

fn runtime_bound(op: CompOp, offset: i32) -> Option<RuntimeBound> {
	let (op, shift, saturate) = match op {
		CompOp::Slt => (CompOp::Slt, offset, i32::MIN),
		CompOp::Sle => (CompOp::Slt, offset.checked_sub(1)?, i32::MIN),
		CompOp::Sgt => (CompOp::Sgt, offset, i32::MAX),
		CompOp::Sge => (CompOp::Sgt, offset.checked_add(1)?, i32::MAX),
		_ => return None,
	};
	Some(RuntimeBound {
		op,
		shift,
		saturate,
	})
}

impl<'a> RemainderTransform<'a> {
	// vend = end < saturate + shift ? saturate : end - shift (降序时方向相反)
	fn emit_bound(
		&mut self,
		end: &Value,
		bound: &RuntimeBound,
		out: &mut Vec<LlvmInstr>,
	) -> Value {
		let overflow = self.temp_mgr.new_temp(VarType::I32, false);
		let diff = self.temp_mgr.new_temp(VarType::I32, false);
		let vend = self.temp_mgr.new_temp(VarType::I32, false);
		out.push(Box::new(CompInstr {
			kind: CompKind::Icmp,
			target: overflow.clone(),
			op: bound.op,
			var_type: VarType::I32,
			lhs: end.clone(),
			rhs: Value::Int(bound.saturate.wrapping_add(bound.shift)),
		}));
		out.push(Box::new(ArithInstr {
			target: diff.clone(),
			op: ArithOp::Sub,
			var_type: VarType::I32,
			lhs: end.clone(),
			rhs: Value::Int(bound.shift),
		}));
		out.push(Box::new(SelectInstr {
			target: vend.clone(),
			var_type: VarType::I32,
			cond: Value::Temp(overflow),
			lhs: Value::Int(bound.saturate),
			rhs: Value::Temp(diff),
		}));
		Value::Temp(vend)
	}

	pub fn new(
		func: &'a LlvmFunc,
		loopdata: &'a mut LoopData,
		temp_mgr: &'a mut LlvmTempManager,
	) -> Self {
		Self {
			func,
			loopdata,
			temp_mgr,
		}
	}

	/// Stage the vector loop for `loop_` without touching the function.
	pub fn plan(
		&mut self,
		loop_: &LoopPtr,
		width: u32,
		trip_align: u32,
		reda: &ReductionAnalysis,
	) -> std::result::Result<RemainderPlan, UnsupportedShape> {
		let func = self.func;
		let loop_map = self.loopdata.loop_map(func).clone();
		let (header, latch, preheader, body_entry) = {
			let l = loop_.borrow();
			let header = l.header.clone();
			let header_id = header.borrow().id;
			match l.exiting_blocks(&func.cfg, &loop_map).as_slice() {
				[bb] if bb.borrow().id == header_id => {}
				_ => return Err(UnsupportedShape::ExitNotInHeader),
			}
			let latch =
				l.single_latch(&loop_map).ok_or(UnsupportedShape::MultipleLatches)?;
			let is_jump = latch.borrow().jump_instr.as_ref().is_some_and(|j| {
				matches!(j.get_variant(), LlvmInstrVariant::JumpInstr(_))
			});
			if !is_jump || latch.borrow().id == header_id {
				return Err(UnsupportedShape::LatchNotJump);
			}
			let preheader = match l.outside_preds(&loop_map).as_slice() {
				[pred] => pred.clone(),
				_ => return Err(UnsupportedShape::NoPreheader),
			};
			let body_entry = header
				.borrow()
				.succ
				.iter()
				.find(|succ| l.contains(succ.borrow().id, &loop_map))
				.map(|succ| succ.borrow().id)
				.ok_or(UnsupportedShape::ExitNotInHeader)?;
			(header, latch, preheader, body_entry)
		};
		let latch_id = latch.borrow().id;
		if !self.loopdata.pdom_tree(func).dominates(latch_id, body_entry) {
			return Err(UnsupportedShape::LatchNotPostDominating);
		}
		let info = LoopInfo::new(loop_, &func.cfg, &loop_map)
			.ok_or(UnsupportedShape::NonCanonicalInduction)?;
		let monotone = match info.comp_op {
			CompOp::Slt | CompOp::Sle => info.step > 0,
			CompOp::Sgt | CompOp::Sge => info.step < 0,
			_ => false,
		};
		if !monotone {
			return Err(UnsupportedShape::UnsupportedCompare);
		}
		if reda.get_stride(&info.indvar).is_none() {
			return Err(UnsupportedShape::NonCanonicalInduction);
		}
		log::trace!("{}: {}", loop_.borrow().name(), info);

		let lanes =
			i32::try_from(width).map_err(|_| UnsupportedShape::BoundOverflow)?;
		let phis: Vec<PhiInstr> = header.borrow().phi_instrs.clone();
		let mut updates = Vec::new();
		for phi in phis.iter() {
			if let Some(pattern) = reda.get_stride(&phi.target) {
				let step = pattern
					.stride
					.checked_mul(lanes)
					.ok_or(UnsupportedShape::BoundOverflow)?;
				updates.push(StrideUpdate {
					phi: phi.target.clone(),
					next: self.temp_mgr.new_temp(VarType::I32, false),
					step,
				});
			}
		}

		if trip_align > 1 && trip_align % width == 0 {
			log::debug!(
				"{}: trip count is a multiple of {}, no remainder",
				loop_.borrow().name(),
				width
			);
			return Ok(RemainderPlan {
				width,
				header,
				kind: PlanKind::InPlace {
					latch,
					updates,
					cond: info.cond,
				},
			});
		}

		// vend = end - (W-1) * step
		let offset = info
			.step
			.checked_mul(lanes - 1)
			.ok_or(UnsupportedShape::BoundOverflow)?;
		let mut vph_instrs: Vec<LlvmInstr> = Vec::new();
		let (vop, vend) = match &info.end {
			Value::Int(end) => (
				info.comp_op,
				Value::Int(
					end.checked_sub(offset).ok_or(UnsupportedShape::BoundOverflow)?,
				),
			),
			end => {
				let bound = runtime_bound(info.comp_op, offset)
					.ok_or(UnsupportedShape::BoundOverflow)?;
				let vend = self.emit_bound(end, &bound, &mut vph_instrs);
				(bound.op, vend)
			}
		};
		if let (Some(begin), Some(end)) = (info.begin.as_int(), info.end.as_int()) {
			if let Some((main, rem)) = split_counts(
				begin as i64,
				end as i64,
				info.step as i64,
				info.comp_op,
				width as i64,
			) {
				log::debug!("vector iterations: {}, remainder: {}", main, rem);
			}
		}

		let blocks = loop_.borrow().blocks(&func.cfg, &loop_map);
		let mut next_id = func.total;
		next_id += 1;
		let vph = BasicBlock::new_node(next_id);
		let mut cloner = LoopCloner::new(&blocks, &mut next_id, self.temp_mgr);
		next_id += 1;
		let rph = BasicBlock::new_node(next_id);
		let rph_label = rph.borrow().label();
		cloner.map_outside(preheader.borrow().label(), vph.borrow().label());
		cloner.map_outside(info.exit.borrow().label(), rph_label.clone());
		let copies = cloner.fill(&blocks);

		let header_id = header.borrow().id;
		let (Some(vector_header), Some(vector_latch), Some(vector_body)) = (
			cloner.get(header_id),
			cloner.get(latch_id),
			cloner.get(body_entry),
		) else {
			return Err(UnsupportedShape::NonCanonicalInduction);
		};

		// 向量循环的退出条件
		let vcond = self.temp_mgr.new_temp(VarType::I32, false);
		{
			let mut vh = vector_header.borrow_mut();
			vh.instrs.push(Box::new(CompInstr {
				kind: CompKind::Icmp,
				target: vcond.clone(),
				op: vop,
				var_type: VarType::I32,
				lhs: Value::Temp(cloner.temp(&info.indvar)),
				rhs: vend.clone(),
			}));
			vh.jump_instr = Some(Box::new(JumpCondInstr {
				var_type: VarType::I32,
				cond: Value::Temp(vcond.clone()),
				target_true: vector_body.borrow().label(),
				target_false: rph_label.clone(),
			}));
		}
		{
			let latch_label = vector_latch.borrow().label();
			let mut vl = vector_latch.borrow_mut();
			let mut vh = vector_header.borrow_mut();
			for update in updates.iter() {
				let phi = cloner.temp(&update.phi);
				vl.instrs.push(Box::new(ArithInstr {
					target: update.next.clone(),
					op: ArithOp::Add,
					var_type: VarType::I32,
					lhs: Value::Temp(phi.clone()),
					rhs: Value::Int(update.step),
				}));
				if let Some(p) = vh.phi_instrs.iter_mut().find(|p| p.target == phi) {
					p.set_incoming(&latch_label, Value::Temp(update.next.clone()));
				}
			}
		}
		{
			let mut bb = vph.borrow_mut();
			bb.instrs = vph_instrs;
			bb.jump_instr = Some(Box::new(JumpInstr {
				target: vector_header.borrow().label(),
			}));
		}
		rph.borrow_mut().jump_instr = Some(Box::new(JumpInstr {
			target: header.borrow().label(),
		}));

		let remainder_init = phis
			.iter()
			.map(|phi| {
				(phi.target.clone(), Value::Temp(cloner.temp(&phi.target)))
			})
			.collect();
		let mut overrides = vec![vcond];
		overrides.extend(vend.unwrap_temp());
		let mut new_blocks = vec![vph];
		new_blocks.extend(copies);
		new_blocks.push(rph);
		Ok(RemainderPlan {
			width,
			header,
			kind: PlanKind::Split {
				preheader,
				blocks: new_blocks,
				vector_header,
				vector_latch,
				remainder_init,
				rph_label,
				new_total: next_id,
				cloner,
				overrides,
			},
		})
	}
}

impl RemainderPlan {
	pub fn is_split(&self) -> bool {
		matches!(self.kind, PlanKind::Split { .. })
	}

	/// Header phis of the loop that will be vectorized.
	pub fn header_phis(&self) -> Vec<PhiInstr> {
		match &self.kind {
			PlanKind::InPlace { .. } => self.header.borrow().phi_instrs.clone(),
			PlanKind::Split { vector_header, .. } => {
				vector_header.borrow().phi_instrs.clone()
			}
		}
	}

	/// Renaming from the original loop to the vector loop, empty when the
	/// loop is prepared in place.
	pub fn temp_map(&self) -> HashMap<LlvmTemp, LlvmTemp> {
		match &self.kind {
			PlanKind::InPlace { .. } => HashMap::new(),
			PlanKind::Split { cloner, .. } => cloner.temp_map.clone(),
		}
	}

	pub fn commit(self, func: &mut LlvmFunc) -> Result<PreparedLoop> {
		let header_id = self.header.borrow().id;
		match self.kind {
			PlanKind::InPlace {
				latch,
				updates,
				cond,
			} => {
				let latch_label = latch.borrow().label();
				let mut header = self.header.borrow_mut();
				let mut latch_bb = latch.borrow_mut();
				for update in updates {
					latch_bb.instrs.push(Box::new(ArithInstr {
						target: update.next.clone(),
						op: ArithOp::Add,
						var_type: VarType::I32,
						lhs: Value::Temp(update.phi.clone()),
						rhs: Value::Int(update.step),
					}));
					if let Some(phi) =
						header.phi_instrs.iter_mut().find(|p| p.target == update.phi)
					{
						phi.set_incoming(&latch_label, Value::Temp(update.next));
					}
				}
				Ok(PreparedLoop {
					header: header_id,
					latch: latch_bb.id,
					uniform_overrides: vec![cond],
					temp_map: HashMap::new(),
				})
			}
			PlanKind::Split {
				preheader,
				blocks,
				vector_header,
				vector_latch,
				remainder_init,
				rph_label,
				new_total,
				cloner,
				overrides,
			} => {
				let header_label = self.header.borrow().label();
				let preheader_label = preheader.borrow().label();
				let vph_label = blocks
					.first()
					.map(|bb| bb.borrow().label())
					.unwrap_or_else(|| to_label(header_id));
				preheader.borrow_mut().map_jump_label(&HashMap::from([(
					header_label,
					vph_label,
				)]));
				{
					let mut header = self.header.borrow_mut();
					for phi in header.phi_instrs.iter_mut() {
						let init = remainder_init
							.iter()
							.find(|(t, _)| *t == phi.target)
							.map(|(_, v)| v.clone());
						phi.source.retain(|(_, l)| *l != preheader_label);
						if let Some(init) = init {
							phi.source.push((init, rph_label.clone()));
						}
					}
				}
				let pos = func.cfg.position(header_id).ok_or_else(|| {
					RvError::VerifyError {
						func: func.name.clone(),
						reason: format!("{} is not in the function", to_label(header_id)),
					}
				})?;
				func.cfg.blocks.splice(pos..pos, blocks);
				func.total = func.total.max(new_total);
				func.cfg.resolve_links().map_err(|label| RvError::VerifyError {
					func: func.name.clone(),
					reason: format!("jump to unknown block {}", label),
				})?;
				let prepared = PreparedLoop {
					header: vector_header.borrow().id,
					latch: vector_latch.borrow().id,
					uniform_overrides: overrides,
					temp_map: cloner.temp_map,
				};
				log::trace!(
					"vector loop {} .. {}",
					to_label(prepared.header),
					to_label(prepared.latch)
				);
				Ok(prepared)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rrvm::program::LlvmProgram;

	fn sum_loop(n: &str) -> String {
		format!(
			r#"
define i32 @sum(i32* %a, i32 %n) {{
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [0, %entry], [%s.next, %B2]
  %c = icmp slt i32 %i, {n}
  br i32 %c, label %B2, label %B3
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %s.next = add i32 %s, %x
  %i.next = add i32 %i, 1
  br label %B1
B3:
  ret i32 %s
}}
"#
		)
	}

	fn plan_first(
		program: &mut LlvmProgram,
		width: u32,
		trip_align: u32,
	) -> std::result::Result<RemainderPlan, UnsupportedShape> {
		let func = &program.funcs[0];
		let mut loopdata = LoopData::new();
		let loop_ = loopdata.root_loop(func).borrow().subloops[0].clone();
		let mut reda = ReductionAnalysis::new();
		reda.analyze(&loop_, func, loopdata.loop_map(func));
		RemainderTransform::new(func, &mut loopdata, &mut program.temp_mgr)
			.plan(&loop_, width, trip_align, &reda)
	}

	#[test]
	fn split_with_runtime_bound() {
		let mut program = LlvmProgram::parse(&sum_loop("%n")).unwrap();
		let plan = plan_first(&mut program, 4, 1).unwrap();
		assert!(plan.is_split());
		// staging leaves the function alone
		assert_eq!(program.funcs[0].cfg.size(), 4);
		assert_eq!(plan.header_phis().len(), 2);
		let map = plan.temp_map();
		let func = &mut program.funcs[0];
		let prepared = plan.commit(func).unwrap();
		func.verify().unwrap();
		// entry, VPH, VH, VB, RPH, B1, B2, B3
		assert_eq!(func.cfg.size(), 8);
		assert_eq!(func.total, 7);
		assert_eq!(prepared.header, 5);
		assert_eq!(prepared.latch, 6);
		assert_eq!(prepared.uniform_overrides.len(), 2);

		let vph = func.cfg.get_block(4).unwrap();
		let bound: Vec<String> =
			vph.borrow().instrs.iter().map(|i| i.to_string()).collect();
		assert_eq!(bound.len(), 3);
		assert!(bound[0].ends_with("= icmp slt i32 %n, -2147483645"));
		assert!(bound[1].ends_with("= sub i32 %n, 3"));
		let vend = &prepared.uniform_overrides[1];
		assert!(bound[2].starts_with(&format!("{} = select i32 ", vend)));
		assert!(bound[2].contains("i32 -2147483648, i32 "));
		let entry = func.cfg.get_entry();
		assert_eq!(entry.borrow().succ[0].borrow().id, 4);
		// the remainder starts where the vector loop stopped
		let header = func.cfg.get_block(1).unwrap();
		let header = header.borrow();
		let i = &header.phi_instrs[0];
		let i_vec = map[&i.target].clone();
		assert_eq!(
			i.source,
			vec![
				(Value::Temp(LlvmTemp::new("i.next", VarType::I32, false)), Label::new("B2")),
				(Value::Temp(i_vec.clone()), Label::new("B7")),
			]
		);
		// the vector induction advances by a whole vector per iteration
		let vh = func.cfg.get_block(5).unwrap();
		let step = vh.borrow().phi_instrs[0].get_incoming(&Label::new("B6")).cloned();
		let vl = func.cfg.get_block(6).unwrap();
		assert_eq!(
			vl.borrow().instrs.last().unwrap().to_string(),
			format!("{} = add i32 {}, 4", step.unwrap(), i_vec)
		);
	}

	#[test]
	fn inclusive_runtime_bound_becomes_strict() {
		let inclusive = sum_loop("%n").replace("slt", "sle");
		let mut program = LlvmProgram::parse(&inclusive).unwrap();
		let plan = plan_first(&mut program, 4, 1).unwrap();
		let func = &mut program.funcs[0];
		let prepared = plan.commit(func).unwrap();
		func.verify().unwrap();
		let vph = func.cfg.get_block(4).unwrap();
		let vph = vph.borrow();
		assert!(vph.instrs[0].to_string().ends_with("slt i32 %n, -2147483646"));
		assert!(vph.instrs[1].to_string().ends_with("= sub i32 %n, 2"));
		let vh = func.cfg.get_block(prepared.header).unwrap();
		let exit = vh.borrow().instrs.last().unwrap().to_string();
		assert!(exit.contains("= icmp slt i32 "));
		assert!(exit.ends_with(&prepared.uniform_overrides[1].to_string()));
	}

	#[test]
	fn constant_bound_is_folded() {
		let mut program = LlvmProgram::parse(&sum_loop("10")).unwrap();
		let plan = plan_first(&mut program, 4, 10).unwrap();
		let func = &mut program.funcs[0];
		let prepared = plan.commit(func).unwrap();
		func.verify().unwrap();
		assert_eq!(prepared.uniform_overrides.len(), 1);
		let vh = func.cfg.get_block(prepared.header).unwrap();
		let vh = vh.borrow();
		assert!(vh.instrs.last().unwrap().to_string().ends_with(", 7"));
	}

	#[test]
	fn aligned_trip_count_stays_in_place() {
		let mut program = LlvmProgram::parse(&sum_loop("16")).unwrap();
		let plan = plan_first(&mut program, 4, 16).unwrap();
		assert!(!plan.is_split());
		assert!(plan.temp_map().is_empty());
		let func = &mut program.funcs[0];
		let prepared = plan.commit(func).unwrap();
		func.verify().unwrap();
		assert_eq!(func.cfg.size(), 4);
		assert_eq!((prepared.header, prepared.latch), (1, 2));
		assert_eq!(prepared.uniform_overrides[0].name, "c");
		let latch = func.cfg.get_block(2).unwrap();
		let step = latch.borrow().instrs.last().unwrap().to_string();
		assert!(step.ends_with("= add i32 %i, 4"));
	}

	#[test]
	fn unsupported_shapes() {
		let do_while = r#"
define void @f(i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %i.next = add i32 %i, 1
  br label %B2
B2:
  %c = icmp slt i32 %i.next, %n
  br i32 %c, label %B1, label %B3
B3:
  ret void
}
"#;
		let mut program = LlvmProgram::parse(do_while).unwrap();
		assert_eq!(
			plan_first(&mut program, 4, 1).err(),
			Some(UnsupportedShape::ExitNotInHeader)
		);

		let not_equal = sum_loop("%n").replace("slt", "ne");
		let mut program = LlvmProgram::parse(&not_equal).unwrap();
		assert_eq!(
			plan_first(&mut program, 4, 1).err(),
			Some(UnsupportedShape::UnsupportedCompare)
		);

		let wrapping = sum_loop("-2147483647");
		let mut program = LlvmProgram::parse(&wrapping).unwrap();
		assert_eq!(
			plan_first(&mut program, 4, 1).err(),
			Some(UnsupportedShape::BoundOverflow)
		);

		let mut program = LlvmProgram::parse(&sum_loop("%n")).unwrap();
		assert_eq!(
			plan_first(&mut program, 0x8000_0000, 1).err(),
			Some(UnsupportedShape::BoundOverflow)
		);
	}

	proptest! {
		#[test]
		fn split_covers_every_iteration(
			begin in -500i64..500,
			len in 0i64..400,
			step in 1i64..5,
			width in 1i64..17,
			inclusive in any::<bool>(),
			down in any::<bool>(),
		) {
			let (op, step, end) = match (down, inclusive) {
				(false, false) => (CompOp::Slt, step, begin + len),
				(false, true) => (CompOp::Sle, step, begin + len),
				(true, false) => (CompOp::Sgt, -step, begin - len),
				(true, true) => (CompOp::Sge, -step, begin - len),
			};
			let trips = run_length(begin, end, step, op).unwrap();
			let (main, rem) = split_counts(begin, end, step, op, width).unwrap();
			prop_assert_eq!(main, trips / width);
			prop_assert_eq!(rem, trips % width);
		}
	}
}

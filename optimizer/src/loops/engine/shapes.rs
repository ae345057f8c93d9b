use llvm::{ArithOp, LlvmInstr, LlvmInstrVariant, LlvmTemp, Value};
use rrvm::LlvmNode;

use super::VectorizationInfo;
use crate::loops::shape::VectorShape::{self, *};

/// Propagate shapes over the region until nothing changes. Returns the
/// blocks whose conditional branch is not uniform.
pub fn compute_shapes(vecinfo: &mut VectorizationInfo) -> Vec<i32> {
	let pinned = vecinfo.pinned.clone();
	vecinfo.shapes.retain(|t, _| pinned.contains(t));
	let blocks = vecinfo.region.blocks.clone();
	let mut divergent = false;
	loop {
		while propagate(vecinfo, &blocks, divergent) {}
		let mut changed = settle_undef(vecinfo, &blocks);
		let branches = varying_branches(vecinfo, &blocks);
		if !branches.is_empty() && !divergent {
			// 分支不一致时，汇合点的 phi 在各 lane 上取不同的值
			divergent = true;
			changed = true;
		}
		if !changed {
			for (temp, shape) in vecinfo.shapes.iter() {
				log::trace!("{}: {}", temp, shape);
			}
			return branches;
		}
	}
}

fn update(
	vecinfo: &mut VectorizationInfo,
	temp: &LlvmTemp,
	shape: VectorShape,
) -> bool {
	if vecinfo.is_pinned(temp) {
		return false;
	}
	let old = vecinfo.shapes.get(temp).copied().unwrap_or_default();
	let new = old.join(shape);
	if new != old {
		vecinfo.shapes.insert(temp.clone(), new);
		true
	} else {
		false
	}
}

fn propagate(
	vecinfo: &mut VectorizationInfo,
	blocks: &[LlvmNode],
	divergent: bool,
) -> bool {
	let header = vecinfo.region.header_id();
	let mut changed = false;
	for bb in blocks.iter() {
		let bb = bb.borrow();
		let merge = divergent && bb.id != header && bb.prev.len() > 1;
		for phi in bb.phi_instrs.iter() {
			let shape = if merge {
				Varying
			} else {
				phi
					.source
					.iter()
					.fold(Undef, |acc, (v, _)| acc.join(vecinfo.get_shape(v)))
			};
			changed |= update(vecinfo, &phi.target, shape);
		}
		for instr in bb.instrs.iter() {
			if let Some(target) = instr.get_write() {
				let shape = transfer(vecinfo, instr);
				changed |= update(vecinfo, &target, shape);
			}
		}
	}
	changed
}

// 没有任何已知输入的值（例如只由自身构成的环）当作 varying
fn settle_undef(vecinfo: &mut VectorizationInfo, blocks: &[LlvmNode]) -> bool {
	let mut changed = false;
	for bb in blocks.iter() {
		let bb = bb.borrow();
		let targets = bb
			.phi_instrs
			.iter()
			.map(|phi| phi.target.clone())
			.chain(bb.instrs.iter().flat_map(|instr| instr.get_write()));
		for target in targets {
			if !vecinfo.temp_shape(&target).is_defined() {
				changed |= update(vecinfo, &target, Varying);
			}
		}
	}
	changed
}

fn varying_branches(
	vecinfo: &VectorizationInfo,
	blocks: &[LlvmNode],
) -> Vec<i32> {
	blocks
		.iter()
		.filter(|bb| {
			let bb = bb.borrow();
			match bb.jump_instr.as_ref().map(|j| j.get_variant()) {
				Some(LlvmInstrVariant::JumpCondInstr(jump)) => {
					let shape = vecinfo.get_shape(&jump.cond);
					shape.is_defined() && !shape.is_uniform()
				}
				_ => false,
			}
		})
		.map(|bb| bb.borrow().id)
		.collect()
}

fn both_strides(a: VectorShape, b: VectorShape) -> Option<(i32, i32)> {
	Some((a.stride()?, b.stride()?))
}

fn all_uniform(shapes: &[VectorShape]) -> VectorShape {
	if shapes.iter().any(|s| !s.is_defined()) {
		Undef
	} else if shapes.iter().all(|s| s.is_uniform()) {
		Uniform
	} else {
		Varying
	}
}

fn arith(
	op: ArithOp,
	lhs: &Value,
	rhs: &Value,
	vecinfo: &VectorizationInfo,
) -> VectorShape {
	let (l, r) = (vecinfo.get_shape(lhs), vecinfo.get_shape(rhs));
	if !l.is_defined() || !r.is_defined() {
		return Undef;
	}
	let stride = match (op, both_strides(l, r)) {
		(ArithOp::Add, Some((a, b))) => a.checked_add(b),
		(ArithOp::Sub, Some((a, b))) => a.checked_sub(b),
		(ArithOp::Mul, Some((a, 0))) => rhs.as_int().and_then(|c| a.checked_mul(c)),
		(ArithOp::Mul, Some((0, b))) => lhs.as_int().and_then(|c| b.checked_mul(c)),
		(ArithOp::Shl, Some((a, 0))) => match rhs.as_int() {
			Some(c) if (0..31).contains(&c) => a.checked_mul(1 << c),
			_ => None,
		},
		_ => return all_uniform(&[l, r]),
	};
	match stride {
		Some(s) => VectorShape::strided(s),
		// 两个 uniform 的积仍是 uniform
		None if l.is_uniform() && r.is_uniform() => Uniform,
		None => Varying,
	}
}

pub fn transfer(vecinfo: &VectorizationInfo, instr: &LlvmInstr) -> VectorShape {
	let shape = |v: &Value| vecinfo.get_shape(v);
	match instr.get_variant() {
		LlvmInstrVariant::ArithInstr(a) => arith(a.op, &a.lhs, &a.rhs, vecinfo),
		LlvmInstrVariant::GEPInstr(gep) => {
			let (addr, offset) = (shape(&gep.addr), shape(&gep.offset));
			if !addr.is_defined() || !offset.is_defined() {
				return Undef;
			}
			match both_strides(addr, offset).and_then(|(a, b)| a.checked_add(b)) {
				Some(s) => VectorShape::strided(s),
				None => Varying,
			}
		}
		LlvmInstrVariant::LoadInstr(load) => match shape(&load.addr) {
			Undef => Undef,
			Uniform => Uniform,
			_ => Varying,
		},
		LlvmInstrVariant::CompInstr(comp) => {
			all_uniform(&[shape(&comp.lhs), shape(&comp.rhs)])
		}
		LlvmInstrVariant::SelectInstr(select) => all_uniform(&[
			shape(&select.cond),
			shape(&select.lhs),
			shape(&select.rhs),
		]),
		LlvmInstrVariant::ReduceInstr(_) => Uniform,
		_ => Varying,
	}
}

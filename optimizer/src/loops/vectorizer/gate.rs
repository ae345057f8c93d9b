use std::{collections::HashMap, fmt::Display};

use llvm::LlvmInstrVariant;
use rrvm::{func::LlvmFunc, rrvm_loop::LoopPtr};
use utils::{MAX_VECTOR_WIDTH, PARALLEL_DISTANCE};

use super::annotations::{
	dep_dist_to_string, get_loop_annotation, is_annotated_parallel, LoopMD,
};
use crate::loops::rem_transform::UnsupportedShape;

/// Why a loop was left alone. None of these stop the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
	NotTriggered,
	AlreadyVectorized,
	DependenceDistance(u32),
	NoSingleExit,
	WidthOne,
	WidthTooLarge(u32),
	NotBeneficial,
	Shape(UnsupportedShape),
	UnrecognizedPhi(String),
	UnsupportedReduction(String),
	ConflictingReduction(String),
	NonAffineRecurrence(String),
}

impl Display for SkipReason {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::NotTriggered => write!(f, "not explicitly triggered"),
			Self::AlreadyVectorized => write!(f, "already vectorized"),
			Self::DependenceDistance(d) => write!(
				f,
				"Min dependence distance was {}",
				dep_dist_to_string(*d)
			),
			Self::NoSingleExit => {
				write!(f, "no single exiting block with a conditional branch")
			}
			Self::WidthOne => write!(f, "vector width 1 requested"),
			Self::WidthTooLarge(width) => write!(
				f,
				"vector width {} is above the limit of {}",
				width, MAX_VECTOR_WIDTH
			),
			Self::NotBeneficial => write!(f, "vectorization not beneficial"),
			Self::Shape(shape) => {
				write!(f, "Can not prepare vectorization of the loop: {}", shape)
			}
			Self::UnrecognizedPhi(phi) => {
				write!(f, "unrecognized phi use in vector loop: {}", phi)
			}
			Self::UnsupportedReduction(red) => {
				write!(f, "unsupported reduction: {}", red)
			}
			Self::ConflictingReduction(red) => {
				write!(f, "can not vectorize this non-trivial SCC: {}", red)
			}
			Self::NonAffineRecurrence(red) => {
				write!(f, "can not vectorize this non-affine recurrence: {}", red)
			}
		}
	}
}

/// Annotation of a loop that passed the gate, with the parallel marker
/// folded in.
pub struct GateResult {
	pub annot: LoopMD,
	pub dep_dist: u32,
}

fn has_conditional_exit(
	loop_: &LoopPtr,
	func: &LlvmFunc,
	loop_map: &HashMap<i32, LoopPtr>,
) -> bool {
	let Some(exiting) = loop_.borrow().single_exiting_block(&func.cfg, loop_map)
	else {
		return false;
	};
	let exiting = exiting.borrow();
	match exiting.jump_instr.as_ref().map(|j| j.get_variant()) {
		Some(LlvmInstrVariant::JumpCondInstr(br)) => {
			br.target_true != br.target_false
		}
		_ => false,
	}
}

/// Decide whether `loop_` should be vectorized at all. Reads annotations
/// and the loop structure only.
pub fn check_loop(
	loop_: &LoopPtr,
	func: &LlvmFunc,
	loop_map: &HashMap<i32, LoopPtr>,
) -> Result<GateResult, SkipReason> {
	let mut annot = get_loop_annotation(loop_, loop_map);
	if is_annotated_parallel(loop_, loop_map) {
		annot.min_dep_dist = Some(PARALLEL_DISTANCE);
		annot.vectorize_enable = Some(true);
	}
	log::debug!("{}: {}", loop_.borrow().name(), annot);
	// 向量化后的循环去掉了 enable 标注，先看 isvectorized
	if annot.already_vectorized == Some(true) {
		return Err(SkipReason::AlreadyVectorized);
	}
	if annot.vectorize_enable != Some(true) {
		return Err(SkipReason::NotTriggered);
	}
	let dep_dist = annot.dep_dist();
	if dep_dist <= 1 {
		return Err(SkipReason::DependenceDistance(dep_dist));
	}
	if !has_conditional_exit(loop_, func, loop_map) {
		return Err(SkipReason::NoSingleExit);
	}
	Ok(GateResult { annot, dep_dist })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loops::loop_data::LoopData;
	use rrvm::program::LlvmProgram;

	fn gate(hints: &str) -> Result<GateResult, SkipReason> {
		let src = format!(
			r#"
define void @f(i32 %n) {{
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %i.next = add i32 %i, 1
  br label %B1{hints}
B3:
  ret void
}}
"#
		);
		let program = LlvmProgram::parse(&src).unwrap();
		let func = &program.funcs[0];
		let mut loopdata = LoopData::new();
		let loop_ = loopdata.root_loop(func).borrow().subloops[0].clone();
		check_loop(&loop_, func, loopdata.loop_map(func))
	}

	#[test]
	fn trigger_and_distance() {
		assert_eq!(gate("").err(), Some(SkipReason::NotTriggered));
		assert_eq!(
			gate(", !loop {llvm.loop.vectorize.enable = 0}").err(),
			Some(SkipReason::NotTriggered)
		);
		let ok = gate(", !loop {llvm.loop.vectorize.enable = 1}").unwrap();
		assert_eq!(ok.dep_dist, PARALLEL_DISTANCE);
		let ok = gate(
			", !loop {llvm.loop.vectorize.enable = 1, rv.loop.mindepdist = 4}",
		)
		.unwrap();
		assert_eq!(ok.dep_dist, 4);
		for dist in [0, 1] {
			let hints = format!(
				", !loop {{llvm.loop.vectorize.enable = 1, rv.loop.mindepdist = {}}}",
				dist
			);
			assert_eq!(
				gate(&hints).err(),
				Some(SkipReason::DependenceDistance(dist))
			);
		}
		assert_eq!(
			gate(", !loop {llvm.loop.vectorize.enable = 1, llvm.loop.isvectorized = 1}")
				.err(),
			Some(SkipReason::AlreadyVectorized)
		);
		assert_eq!(
			gate(", !loop {llvm.loop.isvectorized = 1}").err(),
			Some(SkipReason::AlreadyVectorized)
		);
	}

	#[test]
	fn parallel_marker_overrides_weaker_hints() {
		let ok = gate(
			", !loop {rv.loop.mindepdist = 1, llvm.loop.parallel_accesses}",
		)
		.unwrap();
		assert_eq!(ok.dep_dist, PARALLEL_DISTANCE);
		assert_eq!(ok.annot.vectorize_enable, Some(true));
		assert_eq!(
			SkipReason::DependenceDistance(PARALLEL_DISTANCE).to_string(),
			"Min dependence distance was unbounded"
		);
	}
}

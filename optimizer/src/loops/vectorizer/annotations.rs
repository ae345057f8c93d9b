// 循环上的向量化标注，保存在 latch 跳转指令的 !loop {...} 上

use std::{collections::HashMap, fmt::Display};

use llvm::LoopMetadata;
use rrvm::rrvm_loop::LoopPtr;
use utils::{
	LOOP_IS_VECTORIZED, LOOP_MIN_DEP_DIST, LOOP_PARALLEL_ACCESSES,
	LOOP_VECTORIZE_ENABLE, LOOP_VECTORIZE_PREFIX, LOOP_VECTORIZE_WIDTH,
	PARALLEL_DISTANCE,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopMD {
	pub vectorize_enable: Option<bool>,
	pub already_vectorized: Option<bool>,
	pub explicit_vector_width: Option<u32>,
	pub min_dep_dist: Option<u32>,
}

pub fn dep_dist_to_string(dist: u32) -> String {
	if dist == PARALLEL_DISTANCE {
		"unbounded".to_string()
	} else {
		dist.to_string()
	}
}

fn get_bool(md: &LoopMetadata, key: &str) -> Option<bool> {
	md.get_int(key).map(|v| v != 0)
}

fn get_u32(md: &LoopMetadata, key: &str) -> Option<u32> {
	md.get_int(key).and_then(|v| u32::try_from(v).ok())
}

impl LoopMD {
	pub fn from_metadata(md: &LoopMetadata) -> Self {
		Self {
			vectorize_enable: get_bool(md, LOOP_VECTORIZE_ENABLE),
			already_vectorized: get_bool(md, LOOP_IS_VECTORIZED),
			explicit_vector_width: get_u32(md, LOOP_VECTORIZE_WIDTH),
			min_dep_dist: get_u32(md, LOOP_MIN_DEP_DIST),
		}
	}

	/// Store every field that is set, leaving other hints alone.
	pub fn write_to(&self, md: &mut LoopMetadata) {
		let fields = [
			(LOOP_VECTORIZE_ENABLE, self.vectorize_enable.map(i64::from)),
			(LOOP_IS_VECTORIZED, self.already_vectorized.map(i64::from)),
			(LOOP_VECTORIZE_WIDTH, self.explicit_vector_width.map(i64::from)),
			(LOOP_MIN_DEP_DIST, self.min_dep_dist.map(i64::from)),
		];
		for (key, value) in fields {
			if value.is_some() {
				md.set(key, value);
			}
		}
	}

	pub fn dep_dist(&self) -> u32 {
		self.min_dep_dist.unwrap_or(PARALLEL_DISTANCE)
	}
}

impl Display for LoopMD {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let show = |v: Option<bool>| match v {
			Some(v) => v.to_string(),
			None => "n/a".to_string(),
		};
		write!(
			f,
			"loopMD {{vectorize: {}, vectorized: {}, width: {}, depDist: {}}}",
			show(self.vectorize_enable),
			show(self.already_vectorized),
			self
				.explicit_vector_width
				.map_or("n/a".to_string(), |w| w.to_string()),
			self.min_dep_dist.map_or("n/a".to_string(), dep_dist_to_string),
		)
	}
}

// 所有 latch 上的标注合在一起，后出现的覆盖先出现的
pub fn loop_metadata(
	loop_: &LoopPtr,
	loop_map: &HashMap<i32, LoopPtr>,
) -> LoopMetadata {
	let mut merged = LoopMetadata::new();
	for latch in loop_.borrow().latches(loop_map) {
		if let Some(md) = latch.borrow().loop_md.as_ref() {
			for (key, value) in md.hints.iter() {
				merged.set(key, *value);
			}
		}
	}
	merged
}

pub fn get_loop_annotation(
	loop_: &LoopPtr,
	loop_map: &HashMap<i32, LoopPtr>,
) -> LoopMD {
	LoopMD::from_metadata(&loop_metadata(loop_, loop_map))
}

pub fn is_annotated_parallel(
	loop_: &LoopPtr,
	loop_map: &HashMap<i32, LoopPtr>,
) -> bool {
	loop_metadata(loop_, loop_map).has(LOOP_PARALLEL_ACCESSES)
}

/// Merge `annot` into the hints of every latch of `loop_`.
pub fn set_loop_annotation(
	loop_: &LoopPtr,
	loop_map: &HashMap<i32, LoopPtr>,
	annot: &LoopMD,
) {
	for latch in loop_.borrow().latches(loop_map) {
		let mut latch = latch.borrow_mut();
		annot.write_to(latch.loop_md.get_or_insert_with(LoopMetadata::new));
	}
}

/// Drop the vectorize hints and the parallel marker.
pub fn clear_vectorize_annotations(
	loop_: &LoopPtr,
	loop_map: &HashMap<i32, LoopPtr>,
) {
	for latch in loop_.borrow().latches(loop_map) {
		let mut latch = latch.borrow_mut();
		if let Some(md) = latch.loop_md.as_mut() {
			md.remove_prefix(LOOP_VECTORIZE_PREFIX);
			md.remove(LOOP_PARALLEL_ACCESSES);
			md.remove(LOOP_MIN_DEP_DIST);
		}
		if latch.loop_md.as_ref().is_some_and(|md| md.is_empty()) {
			latch.loop_md = None;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loops::loop_data::LoopData;
	use rrvm::program::LlvmProgram;

	const SRC: &str = r#"
define void @f(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %i.next = add i32 %i, 1
  br label %B1, !loop {llvm.loop.vectorize.enable = 1, rv.loop.mindepdist = 4, llvm.loop.parallel_accesses}
B3:
  ret void
}
"#;

	#[test]
	fn write_then_read() {
		let annot = LoopMD {
			vectorize_enable: Some(false),
			already_vectorized: Some(true),
			explicit_vector_width: Some(8),
			min_dep_dist: Some(PARALLEL_DISTANCE),
		};
		let mut md = LoopMetadata::new();
		annot.write_to(&mut md);
		assert_eq!(LoopMD::from_metadata(&md), annot);
		assert_eq!(LoopMD::from_metadata(&md).dep_dist(), PARALLEL_DISTANCE);
		assert_eq!(LoopMD::default().dep_dist(), PARALLEL_DISTANCE);
	}

	#[test]
	fn latch_hints() {
		let program = LlvmProgram::parse(SRC).unwrap();
		let func = &program.funcs[0];
		let mut loopdata = LoopData::new();
		let loop_ = loopdata.root_loop(func).borrow().subloops[0].clone();
		let loop_map = loopdata.loop_map(func).clone();
		let annot = get_loop_annotation(&loop_, &loop_map);
		assert_eq!(annot.vectorize_enable, Some(true));
		assert_eq!(annot.min_dep_dist, Some(4));
		assert_eq!(annot.already_vectorized, None);
		assert!(is_annotated_parallel(&loop_, &loop_map));

		set_loop_annotation(
			&loop_,
			&loop_map,
			&LoopMD {
				already_vectorized: Some(true),
				..LoopMD::default()
			},
		);
		let annot = get_loop_annotation(&loop_, &loop_map);
		assert_eq!(annot.already_vectorized, Some(true));
		assert_eq!(annot.vectorize_enable, Some(true));

		clear_vectorize_annotations(&loop_, &loop_map);
		let md = loop_metadata(&loop_, &loop_map);
		assert_eq!(md.to_string(), "!loop {llvm.loop.isvectorized = 1}");
		assert!(!is_annotated_parallel(&loop_, &loop_map));
	}
}

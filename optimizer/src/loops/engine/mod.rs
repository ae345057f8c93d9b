// 向量化引擎：形状分析 -> 控制流线性化 -> 指令加宽
// 循环的 header phi 形状由调用者事先固定，这里只负责传播与改写

mod linearize;
mod shapes;
mod widen;

use std::collections::{HashMap, HashSet};

use llvm::{LlvmTemp, LlvmTempManager, Value};
use rrvm::{func::LlvmFunc, rrvm_loop::utils::defined_in};

use super::{region::LoopRegion, shape::VectorShape};

/// Everything the engine knows about the loop being vectorized.
pub struct VectorizationInfo {
	pub width: u32,
	pub region: LoopRegion,
	pub shapes: HashMap<LlvmTemp, VectorShape>,
	// shapes decided by the caller, never recomputed
	pub pinned: HashSet<LlvmTemp>,
	region_defs: HashSet<LlvmTemp>,
}

impl VectorizationInfo {
	pub fn new(width: u32, region: LoopRegion) -> Self {
		let region_defs = defined_in(&region.blocks);
		Self {
			width,
			region,
			shapes: HashMap::new(),
			pinned: HashSet::new(),
			region_defs,
		}
	}

	pub fn pin(&mut self, temp: LlvmTemp, shape: VectorShape) {
		self.shapes.insert(temp.clone(), shape);
		self.pinned.insert(temp);
	}

	pub fn is_pinned(&self, temp: &LlvmTemp) -> bool {
		self.pinned.contains(temp)
	}

	/// Constants and values defined outside the region are uniform.
	pub fn get_shape(&self, value: &Value) -> VectorShape {
		match value {
			Value::Temp(t) if self.region_defs.contains(t) => {
				self.shapes.get(t).copied().unwrap_or_default()
			}
			_ => VectorShape::Uniform,
		}
	}

	pub fn temp_shape(&self, temp: &LlvmTemp) -> VectorShape {
		self.get_shape(&Value::Temp(temp.clone()))
	}

	fn refresh_defs(&mut self) {
		self.region_defs = defined_in(&self.region.blocks);
	}
}

pub type EngineResult<T> = Result<T, String>;

/// Called in order: `analyze`, `linearize`, `vectorize`.
pub trait VectorizerEngine {
	fn analyze(
		&mut self,
		func: &LlvmFunc,
		vecinfo: &mut VectorizationInfo,
	) -> EngineResult<()>;
	fn linearize(
		&mut self,
		func: &mut LlvmFunc,
		vecinfo: &mut VectorizationInfo,
		temp_mgr: &mut LlvmTempManager,
	) -> EngineResult<()>;
	/// Returns, for every block of the region, the block now holding its
	/// vector code.
	fn vectorize(
		&mut self,
		func: &mut LlvmFunc,
		vecinfo: &mut VectorizationInfo,
		temp_mgr: &mut LlvmTempManager,
	) -> EngineResult<HashMap<i32, i32>>;
}

#[derive(Default)]
pub struct BasicEngine {
	// blocks ending in a branch whose lanes may disagree
	varying_branches: Vec<i32>,
}

impl BasicEngine {
	pub fn new() -> Self {
		Self::default()
	}
}

impl VectorizerEngine for BasicEngine {
	fn analyze(
		&mut self,
		_func: &LlvmFunc,
		vecinfo: &mut VectorizationInfo,
	) -> EngineResult<()> {
		vecinfo.refresh_defs();
		self.varying_branches = shapes::compute_shapes(vecinfo);
		Ok(())
	}

	fn linearize(
		&mut self,
		func: &mut LlvmFunc,
		vecinfo: &mut VectorizationInfo,
		temp_mgr: &mut LlvmTempManager,
	) -> EngineResult<()> {
		if self.varying_branches.is_empty() {
			return Ok(());
		}
		log::debug!(
			"{}: linearize varying branches in {:?}",
			vecinfo.region.header.borrow().label(),
			self.varying_branches
		);
		linearize::linearize(func, vecinfo, temp_mgr)?;
		vecinfo.refresh_defs();
		self.varying_branches = shapes::compute_shapes(vecinfo);
		Ok(())
	}

	fn vectorize(
		&mut self,
		func: &mut LlvmFunc,
		vecinfo: &mut VectorizationInfo,
		temp_mgr: &mut LlvmTempManager,
	) -> EngineResult<HashMap<i32, i32>> {
		if !self.varying_branches.is_empty() {
			return Err("varying branches left after linearization".to_string());
		}
		widen::widen(func, vecinfo, temp_mgr)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loops::{loop_data::LoopData, reduction::RedKind};
	use llvm::VarType;
	use rrvm::program::LlvmProgram;

	fn temp(name: &str) -> LlvmTemp {
		LlvmTemp::new(name, VarType::I32, false)
	}

	fn vecinfo_of(program: &LlvmProgram, width: u32) -> VectorizationInfo {
		let func = &program.funcs[0];
		let mut loopdata = LoopData::new();
		let loop_ = loopdata.root_loop(func).borrow().subloops[0].clone();
		let region = LoopRegion::new(&loop_, func, &mut loopdata);
		let mut vecinfo = VectorizationInfo::new(width, region);
		vecinfo.pin(temp("i"), VectorShape::Strided(1));
		vecinfo.pin(temp("c"), VectorShape::Uniform);
		vecinfo
	}

	fn run(
		program: &mut LlvmProgram,
		vecinfo: &mut VectorizationInfo,
	) -> EngineResult<HashMap<i32, i32>> {
		let mut engine = BasicEngine::new();
		let func = &mut program.funcs[0];
		engine.analyze(func, vecinfo)?;
		engine.linearize(func, vecinfo, &mut program.temp_mgr)?;
		engine.vectorize(func, vecinfo, &mut program.temp_mgr)
	}

	const SCALE: &str = r#"
define void @scale(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %y = mul i32 %x, 3
  %k = mul i32 %i, 4
  %u = add i32 %n, 1
  %w = add i32 %k, %u
  store i32 %y, i32* %addr
  %i.next = add i32 %i, 1
  br label %B1
B3:
  ret void
}
"#;

	#[test]
	fn shapes_follow_the_induction() {
		let program = LlvmProgram::parse(SCALE).unwrap();
		let mut vecinfo = vecinfo_of(&program, 4);
		let branches = shapes::compute_shapes(&mut vecinfo);
		assert!(branches.is_empty());
		let shape = |name: &str| vecinfo.temp_shape(&temp(name));
		assert_eq!(
			vecinfo.get_shape(&Value::Temp(LlvmTemp::new(
				"addr",
				VarType::I32Ptr,
				false
			))),
			VectorShape::Strided(1)
		);
		assert_eq!(shape("x"), VectorShape::Varying);
		assert_eq!(shape("y"), VectorShape::Varying);
		assert_eq!(shape("k"), VectorShape::Strided(4));
		assert_eq!(shape("u"), VectorShape::Uniform);
		assert_eq!(shape("w"), VectorShape::Strided(4));
		assert_eq!(shape("i.next"), VectorShape::Strided(1));
		// 参数在区域之外
		assert_eq!(shape("n"), VectorShape::Uniform);
	}

	#[test]
	fn widen_uses_ladders_for_strided_operands() {
		let mut program = LlvmProgram::parse(SCALE).unwrap();
		let mut vecinfo = vecinfo_of(&program, 4);
		let block_map = run(&mut program, &mut vecinfo).unwrap();
		assert_eq!(block_map.len(), 2);
		let func = &program.funcs[0];
		func.verify().unwrap();
		let body = func.cfg.get_block(2).unwrap();
		let instrs: Vec<String> =
			body.borrow().instrs.iter().map(|i| i.to_string()).collect();
		assert!(instrs[1].contains("= ladder i32* %addr, 1 x 4"));
		assert!(instrs[2].starts_with("vec<4> %x = load"));
		assert!(instrs[3].starts_with("vec<4> %y = mul"));
		// strided and uniform values stay scalar
		assert!(instrs[4].starts_with("%k = mul"));
		assert!(instrs.last().unwrap().starts_with("%i.next = add"));
		assert!(instrs.iter().any(|s| s.starts_with("vec<4> store i32 %y")));
	}

	#[test]
	fn conditional_body_is_linearized() {
		let src = r#"
define void @clamp(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B4]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B5
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %neg = icmp slt i32 %x, 0
  br i32 %neg, label %B3, label %B4
B3:
  store i32 0, i32* %addr
  br label %B4
B4:
  %i.next = add i32 %i, 1
  br label %B1
B5:
  ret void
}
"#;
		let mut program = LlvmProgram::parse(src).unwrap();
		let mut vecinfo = vecinfo_of(&program, 4);
		run(&mut program, &mut vecinfo).unwrap();
		let func = &program.funcs[0];
		func.verify().unwrap();
		let b2 = func.cfg.get_block(2).unwrap();
		let jump = b2.borrow().jump_instr.as_ref().unwrap().to_string();
		assert_eq!(jump, "br label %B3");
		let b3 = func.cfg.get_block(3).unwrap();
		let store = b3.borrow().instrs.last().unwrap().to_string();
		assert!(store.starts_with("vec<4, %"), "{}", store);
		assert!(store.contains("store i32 0"));
		let b4 = func.cfg.get_block(4).unwrap();
		assert_eq!(b4.borrow().prev.len(), 1);
		let order: Vec<i32> =
			vecinfo.region.blocks.iter().map(|bb| bb.borrow().id).collect();
		assert_eq!(order, vec![1, 2, 3, 4]);
	}

	const SUM: &str = r#"
define i32 @sum(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [7, %entry], [%s.next, %B2]
  %h = mul i32 %i, %i
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %s.next = add i32 %s, %x
  %i.next = add i32 %i, 1
  br label %B1
B3:
  ret i32 %s
}
"#;

	#[test]
	fn reductions_are_split_across_lanes() {
		let mut program = LlvmProgram::parse(SUM).unwrap();
		let mut vecinfo = vecinfo_of(&program, 4);
		vecinfo.pin(temp("s"), VectorShape::Private(RedKind::Add));
		run(&mut program, &mut vecinfo).unwrap();
		let func = &program.funcs[0];
		func.verify().unwrap();
		let entry = func.cfg.get_entry();
		let seed = entry.borrow().instrs.last().unwrap().to_string();
		assert!(seed.ends_with("= buildvec i32 [7, 0, 0, 0]"), "{}", seed);
		let exit = func.cfg.get_block(4).unwrap();
		let reduce = exit.borrow().instrs[0].to_string();
		assert!(reduce.ends_with("= reduce add i32 %s x 4"), "{}", reduce);
		let jump = exit.borrow().jump_instr.as_ref().unwrap().to_string();
		assert_eq!(jump, "br label %B3");
		let ret = func.cfg.get_block(3).unwrap();
		let ret = ret.borrow().jump_instr.as_ref().unwrap().to_string();
		assert!(!ret.contains("%s"));
		// the split block sits right after the loop
		assert_eq!(func.cfg.position(4), Some(3));
	}

	#[test]
	fn varying_live_out_is_rejected() {
		let src = SUM.replace("ret i32 %s", "ret i32 %h");
		let mut program = LlvmProgram::parse(&src).unwrap();
		let mut vecinfo = vecinfo_of(&program, 4);
		vecinfo.pin(temp("s"), VectorShape::Private(RedKind::Add));
		let err = run(&mut program, &mut vecinfo).unwrap_err();
		assert!(err.contains("%h"), "{}", err);
	}
}

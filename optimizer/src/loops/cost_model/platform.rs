use std::collections::HashSet;

use llvm::{ArithOp, LlvmInstr, LlvmInstrVariant};
use utils::DEFAULT_MAX_VECTOR_BITS;

/// What the target offers to vectorized code.
pub struct PlatformInfo {
	pub max_vector_bits: u32,
	// callees with a lane-wise vector version
	pub vector_funcs: HashSet<String>,
}

impl Default for PlatformInfo {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_VECTOR_BITS)
	}
}

impl PlatformInfo {
	pub fn new(max_vector_bits: u32) -> Self {
		Self {
			max_vector_bits,
			vector_funcs: HashSet::new(),
		}
	}

	pub fn with_vector_funcs<I, S>(mut self, funcs: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.vector_funcs.extend(funcs.into_iter().map(Into::into));
		self
	}

	pub fn has_vector_version(&self, func: &str) -> bool {
		self.vector_funcs.contains(func)
	}
}

pub fn scalar_cost(instr: &LlvmInstr) -> u32 {
	match instr.get_variant() {
		LlvmInstrVariant::ArithInstr(arith) => match arith.op {
			ArithOp::Div | ArithOp::Rem | ArithOp::Fdiv => 20,
			ArithOp::Mul => 3,
			ArithOp::Fadd | ArithOp::Fsub | ArithOp::Fmul => 4,
			_ => 1,
		},
		LlvmInstrVariant::CompInstr(_)
		| LlvmInstrVariant::SelectInstr(_)
		| LlvmInstrVariant::GEPInstr(_) => 1,
		LlvmInstrVariant::LoadInstr(_) | LlvmInstrVariant::StoreInstr(_) => 4,
		LlvmInstrVariant::CallInstr(_) => 10,
		_ => 0,
	}
}

/// Cost of one `width`-lane copy of `instr`, where `lane_bits` is the width
/// of its widest lane.
pub fn vector_cost(
	instr: &LlvmInstr,
	width: u32,
	lane_bits: u32,
	platform: &PlatformInfo,
) -> u32 {
	let scalar = scalar_cost(instr);
	match instr.get_variant() {
		// 逐 lane 调用，参数和返回值都要拆开再拼回
		LlvmInstrVariant::CallInstr(call)
			if !platform.has_vector_version(&call.func.name) =>
		{
			let shuffles =
				call.params.len() as u32 + instr.get_write().is_some() as u32;
			(scalar + shuffles) * width
		}
		_ => {
			let bits = width as u64 * lane_bits.max(1) as u64;
			let regs = bits.div_ceil(platform.max_vector_bits.max(1) as u64);
			scalar * regs.max(1) as u32
		}
	}
}

// 按基本块频率加权，比较标量执行 w 次和向量执行一次的代价

mod platform;

use llvm::VarType;
use utils::{math::floor_pow2, MAX_VECTOR_WIDTH};

use super::region::LoopRegion;

pub use platform::{scalar_cost, vector_cost, PlatformInfo};

pub trait CostModel {
	/// Refine `initial_width` for `region`. 1 means vectorizing does not pay.
	fn pick_width_for_region(&self, region: &LoopRegion, initial_width: u32)
		-> u32;
}

pub struct TargetCostModel {
	pub platform: PlatformInfo,
}

impl TargetCostModel {
	pub fn new(platform: PlatformInfo) -> Self {
		Self { platform }
	}

	// 指针不占向量 lane
	fn widest_lane_bits(region: &LoopRegion) -> u32 {
		let mut bits = 0;
		for bb in region.blocks.iter() {
			let bb = bb.borrow();
			let types = bb
				.phi_instrs
				.iter()
				.map(|phi| phi.var_type)
				.chain(bb.instrs.iter().flat_map(|i| i.get_write().map(|t| t.var_type)));
			for var_type in types.filter(|t| !t.is_ptr() && *t != VarType::Void) {
				bits = bits.max(var_type.bits());
			}
		}
		if bits == 0 {
			32
		} else {
			bits
		}
	}

	fn width_cap(&self, region: &LoopRegion, initial_width: u32) -> u32 {
		let lanes = self.platform.max_vector_bits / Self::widest_lane_bits(region);
		floor_pow2(initial_width.min(lanes).min(MAX_VECTOR_WIDTH))
	}

	/// Scalar and vector cost of one vector iteration at `width`.
	pub fn region_cost(&self, region: &LoopRegion, width: u32) -> (f64, f64) {
		let lane_bits = Self::widest_lane_bits(region);
		let mut scalar = 0.0;
		let mut vector = 0.0;
		for bb in region.blocks.iter() {
			let bb = bb.borrow();
			let freq = region.frequency_of(bb.id);
			for instr in bb.instrs.iter() {
				scalar += freq * (scalar_cost(instr) * width) as f64;
				vector +=
					freq * vector_cost(instr, width, lane_bits, &self.platform) as f64;
			}
		}
		(scalar, vector)
	}
}

impl CostModel for TargetCostModel {
	fn pick_width_for_region(
		&self,
		region: &LoopRegion,
		initial_width: u32,
	) -> u32 {
		let cap = self.width_cap(region, initial_width);
		let mut best = (1, 1.0);
		let mut width = 2;
		while width <= cap {
			let (scalar, vector) = self.region_cost(region, width);
			let speedup = if vector > 0.0 { scalar / vector } else { 0.0 };
			log::trace!(
				"{}: width {} scalar {:.1} vector {:.1}",
				region.header.borrow().label(),
				width,
				scalar,
				vector
			);
			// 相同收益时取更宽的
			if speedup >= best.1 && speedup > 1.0 {
				best = (width, speedup);
			}
			width *= 2;
		}
		best.0
	}
}

// TODO: cost strided and gathered memory accesses apart from contiguous ones
// once the engine reports the shape of each address.

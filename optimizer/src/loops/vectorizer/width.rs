use std::collections::HashMap;

use rrvm::{
	func::LlvmFunc,
	rrvm_loop::{loop_info::LoopInfo, LoopPtr},
};
use utils::MAX_VECTOR_WIDTH;

use super::{
	annotations::{dep_dist_to_string, LoopMD},
	config::{VectorizerConfig, ENV_FORCE_WIDTH},
	gate::SkipReason,
	report::Reporter,
};
use crate::loops::{cost_model::CostModel, region::LoopRegion};

/// Width for a loop that passed the gate. An annotated width wins over the
/// forced one; only when neither is given is the cost model asked, starting
/// from the dependence distance.
pub fn select_width<F>(
	annot: &LoopMD,
	dep_dist: u32,
	config: &VectorizerConfig,
	cost_model: &dyn CostModel,
	region: F,
	reporter: &mut Reporter,
) -> Result<u32, SkipReason>
where
	F: FnOnce() -> LoopRegion,
{
	let fixed = match (annot.explicit_vector_width, config.force_width) {
		(Some(width), Some(forced)) => {
			reporter.report(format!(
				"configuration conflict: loop width {} overrides {}={}",
				width, ENV_FORCE_WIDTH, forced
			));
			Some(width)
		}
		(Some(width), None) => Some(width),
		(None, Some(forced)) => {
			reporter.diag(format!(
				"with user-provided vector width ({}={})",
				ENV_FORCE_WIDTH, forced
			));
			Some(forced)
		}
		(None, None) => None,
	};
	if let Some(width) = fixed {
		return match width {
			0 | 1 => Err(SkipReason::WidthOne),
			width if width > MAX_VECTOR_WIDTH => {
				Err(SkipReason::WidthTooLarge(width))
			}
			width => Ok(width),
		};
	}

	let refined = cost_model.pick_width_for_region(&region(), dep_dist);
	if refined <= 1 {
		return Err(SkipReason::NotBeneficial);
	}
	if refined != dep_dist {
		reporter.diag(format!(
			"costModel: refined vector width to {} from {}",
			refined,
			dep_dist_to_string(dep_dist)
		));
	}
	Ok(refined)
}

/// Largest known divisor of the trip count: the trip count itself when it
/// is a constant above 1 that fits in i32, otherwise 1.
pub fn trip_alignment(
	loop_: &LoopPtr,
	func: &LlvmFunc,
	loop_map: &HashMap<i32, LoopPtr>,
) -> u32 {
	LoopInfo::new(loop_, &func.cfg, loop_map)
		.and_then(|info| info.trip_count())
		.filter(|trip| *trip > 1 && *trip <= i32::MAX as i64)
		.map_or(1, |trip| trip as u32)
}

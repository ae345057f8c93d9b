use llvm::{LlvmTemp, PhiInstr};

use super::gate::SkipReason;
use crate::loops::{
	reduction::{RedKind, ReductionAnalysis},
	shape::VectorShape,
};

/// Shape of every header phi of the loop about to be vectorized: strided
/// for inductions, private for reductions that can be split across lanes.
pub fn classify_header_phis(
	phis: &[PhiInstr],
	reda: &ReductionAnalysis,
) -> Result<Vec<(LlvmTemp, VectorShape)>, SkipReason> {
	let mut shapes = Vec::new();
	for phi in phis.iter() {
		if let Some(pattern) = reda.get_stride(&phi.target) {
			shapes.push((phi.target.clone(), pattern.get_shape()));
			continue;
		}
		let Some(red) = reda.get_reduction(&phi.target) else {
			return Err(SkipReason::UnrecognizedPhi(phi.target.to_string()));
		};
		if red.foreign_user.is_some() {
			return Err(SkipReason::UnsupportedReduction(red.to_string()));
		}
		match red.kind {
			RedKind::Top => {
				return Err(SkipReason::ConflictingReduction(red.to_string()))
			}
			RedKind::Bot => {
				return Err(SkipReason::NonAffineRecurrence(red.to_string()))
			}
			kind if kind.identity(red.var_type).is_none() => {
				return Err(SkipReason::UnsupportedReduction(red.to_string()))
			}
			_ => {}
		}
		log::debug!("header phi {} has shape {}", phi.target, red.get_shape());
		shapes.push((phi.target.clone(), red.get_shape()));
	}
	Ok(shapes)
}

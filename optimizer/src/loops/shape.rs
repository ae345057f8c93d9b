use std::fmt::Display;

use super::reduction::RedKind;

/// How the per-lane values of a scalar relate once the loop runs `width`
/// iterations side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VectorShape {
	#[default]
	Undef,
	Uniform,
	// lane k holds base + k * stride
	Strided(i32),
	Varying,
	// per-lane partial accumulator of a reduction, combined at loop exit
	Private(RedKind),
}

impl VectorShape {
	pub fn strided(stride: i32) -> Self {
		match stride {
			0 => VectorShape::Uniform,
			_ => VectorShape::Strided(stride),
		}
	}

	pub fn join(self, other: Self) -> Self {
		use VectorShape::*;
		match (self, other) {
			(Undef, x) | (x, Undef) => x,
			(a, b) if a == b => a,
			_ => Varying,
		}
	}

	pub fn is_defined(&self) -> bool {
		*self != VectorShape::Undef
	}
	pub fn is_uniform(&self) -> bool {
		*self == VectorShape::Uniform
	}
	/// Needs one register lane per iteration.
	pub fn is_vector(&self) -> bool {
		matches!(self, VectorShape::Varying | VectorShape::Private(_))
	}
	/// Stride between neighbouring lanes, 0 for uniform values.
	pub fn stride(&self) -> Option<i32> {
		match self {
			VectorShape::Uniform => Some(0),
			VectorShape::Strided(s) => Some(*s),
			_ => None,
		}
	}
}

impl Display for VectorShape {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			VectorShape::Undef => write!(f, "undef"),
			VectorShape::Uniform => write!(f, "uniform"),
			VectorShape::Strided(s) => write!(f, "strided({})", s),
			VectorShape::Varying => write!(f, "varying"),
			VectorShape::Private(kind) => write!(f, "private({})", kind),
		}
	}
}

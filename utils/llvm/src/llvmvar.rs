use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarType {
	I32,
	F32,
	I32Ptr,
	F32Ptr,
	Void,
}

impl Display for VarType {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let type_str = match self {
			Self::I32 => "i32",
			Self::I32Ptr => "i32*",
			Self::F32 => "f32",
			Self::F32Ptr => "f32*",
			Self::Void => "void",
		};
		write!(f, "{}", type_str)
	}
}

impl VarType {
	pub fn is_ptr(&self) -> bool {
		matches!(self, Self::I32Ptr | Self::F32Ptr)
	}
	pub fn is_float(&self) -> bool {
		matches!(self, Self::F32)
	}
	pub fn deref_type(&self) -> VarType {
		match self {
			Self::I32Ptr => Self::I32,
			Self::F32Ptr => Self::F32,
			_ => Self::Void,
		}
	}
	pub fn to_ptr(&self) -> VarType {
		match self {
			Self::I32 => Self::I32Ptr,
			Self::F32 => Self::F32Ptr,
			_ => Self::Void,
		}
	}
	/// Width of one lane holding a value of this type.
	pub fn bits(&self) -> u32 {
		match self {
			Self::I32 | Self::F32 => 32,
			Self::I32Ptr | Self::F32Ptr => 64,
			Self::Void => 0,
		}
	}
}

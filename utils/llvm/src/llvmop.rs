use std::fmt::Display;

use loopvec_derive::LowerDisplay;

use crate::{llvmvar::VarType, temp::Temp};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Int(i32),
	Float(f32),
	Temp(Temp),
}

pub trait LlvmOp: Display {
	fn oprand_type(&self) -> VarType;
}

#[derive(LowerDisplay, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithOp {
	Add,
	Sub,
	#[style("sdiv")]
	Div,
	Mul,
	// modulo
	#[style("srem")]
	Rem,
	// Float add
	Fadd,
	// Float sub
	Fsub,
	// Float div
	Fdiv,
	// Float mul
	Fmul,
	// shift left
	Shl,
	// logical shift right
	Lshr,
	// arithmetic shift right
	Ashr,
	And,
	Or,
	Xor,
}

#[derive(LowerDisplay, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompOp {
	Eq,
	Ne,
	// signed greater than
	Sgt,
	// signed greater or equal
	Sge,
	// signed less than
	Slt,
	// signed less or equal
	Sle,
	// ordered and equal
	Oeq,
	// ordered and not equal
	One,
	// ordered and greater than
	Ogt,
	// ordered and greater or equal
	Oge,
	// ordered and less than
	Olt,
	// ordered and less or equal
	Ole,
}

#[derive(LowerDisplay, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompKind {
	Icmp,
	Fcmp,
}

impl Value {
	pub fn get_type(&self) -> VarType {
		match self {
			Self::Int(_) => VarType::I32,
			Self::Float(_) => VarType::F32,
			Self::Temp(v) => v.var_type,
		}
	}
	pub fn unwrap_temp(&self) -> Option<Temp> {
		match self {
			Self::Temp(v) => Some(v.clone()),
			_ => None,
		}
	}
	pub fn is_const(&self) -> bool {
		!matches!(self, Self::Temp(_))
	}
	pub fn as_int(&self) -> Option<i32> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}
	pub fn is_temp(&self, temp: &Temp) -> bool {
		matches!(self, Self::Temp(t) if t == temp)
	}
}

impl From<Temp> for Value {
	fn from(temp: Temp) -> Self {
		Self::Temp(temp)
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Int(v) => write!(f, "{}", v),
			Self::Float(v) => write!(f, "{:?}", v),
			Self::Temp(v) => write!(f, "{}", v),
		}
	}
}

impl ArithOp {
	pub fn is_commutative(&self) -> bool {
		matches!(
			self,
			Self::Add
				| Self::Mul | Self::Fadd
				| Self::Fmul | Self::And
				| Self::Or | Self::Xor
		)
	}
}

impl CompOp {
	/// Predicate holding for `rhs OP' lhs` whenever `lhs OP rhs` holds.
	pub fn swap(&self) -> Self {
		match self {
			Self::Sgt => Self::Slt,
			Self::Sge => Self::Sle,
			Self::Slt => Self::Sgt,
			Self::Sle => Self::Sge,
			Self::Ogt => Self::Olt,
			Self::Oge => Self::Ole,
			Self::Olt => Self::Ogt,
			Self::Ole => Self::Oge,
			_ => *self,
		}
	}
	/// Integer negation of the predicate.
	pub fn inverse(&self) -> Self {
		match self {
			Self::Eq => Self::Ne,
			Self::Ne => Self::Eq,
			Self::Sgt => Self::Sle,
			Self::Sge => Self::Slt,
			Self::Slt => Self::Sge,
			Self::Sle => Self::Sgt,
			Self::Oeq => Self::One,
			Self::One => Self::Oeq,
			Self::Ogt => Self::Ole,
			Self::Oge => Self::Olt,
			Self::Olt => Self::Oge,
			Self::Ole => Self::Ogt,
		}
	}
}

impl LlvmOp for ArithOp {
	fn oprand_type(&self) -> VarType {
		match self {
			Self::Fadd | Self::Fsub | Self::Fdiv | Self::Fmul => VarType::F32,
			_ => VarType::I32,
		}
	}
}

impl LlvmOp for CompOp {
	fn oprand_type(&self) -> VarType {
		match self {
			Self::Eq
			| Self::Ne
			| Self::Sgt
			| Self::Sge
			| Self::Slt
			| Self::Sle => VarType::I32,
			_ => VarType::F32,
		}
	}
}

impl LlvmOp for CompKind {
	fn oprand_type(&self) -> VarType {
		match self {
			Self::Icmp => VarType::I32,
			Self::Fcmp => VarType::F32,
		}
	}
}

use llvm::{ArithOp, CompOp};

use crate::{Result, SimulateError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StackValue {
	Int(i32),
	Float(f32),
	// index into the simulated memory
	Ptr(usize),
}

impl Default for StackValue {
	fn default() -> Self {
		StackValue::Int(0)
	}
}

impl From<i32> for StackValue {
	fn from(value: i32) -> Self {
		StackValue::Int(value)
	}
}

impl From<f32> for StackValue {
	fn from(value: f32) -> Self {
		StackValue::Float(value)
	}
}

fn mismatch(expected: &'static str, found: StackValue) -> SimulateError {
	SimulateError::TypeMismatch { expected, found }
}

impl StackValue {
	pub fn as_i32(&self) -> Result<i32> {
		match self {
			StackValue::Int(v) => Ok(*v),
			v => Err(mismatch("i32", *v)),
		}
	}

	pub fn as_f32(&self) -> Result<f32> {
		match self {
			StackValue::Float(v) => Ok(*v),
			v => Err(mismatch("f32", *v)),
		}
	}

	pub fn as_ptr(&self) -> Result<usize> {
		match self {
			StackValue::Ptr(v) => Ok(*v),
			v => Err(mismatch("pointer", *v)),
		}
	}

	pub fn is_true(&self) -> bool {
		match self {
			StackValue::Int(v) => *v != 0,
			StackValue::Float(v) => *v != 0.0,
			StackValue::Ptr(_) => true,
		}
	}

	/// `self + delta` for integers and pointers, in elements.
	pub fn offset(&self, delta: i64) -> Result<StackValue> {
		match self {
			StackValue::Int(v) => Ok(StackValue::Int(v.wrapping_add(delta as i32))),
			StackValue::Ptr(p) => {
				let target = *p as i64 + delta;
				usize::try_from(target)
					.map(StackValue::Ptr)
					.map_err(|_| SimulateError::OutOfBounds(target))
			}
			v => Err(mismatch("i32 or pointer", *v)),
		}
	}
}

fn int(
	lhs: StackValue,
	rhs: StackValue,
	f: impl Fn(i32, i32) -> i32,
) -> Result<StackValue> {
	Ok(StackValue::Int(f(lhs.as_i32()?, rhs.as_i32()?)))
}

fn float(
	lhs: StackValue,
	rhs: StackValue,
	f: impl Fn(f32, f32) -> f32,
) -> Result<StackValue> {
	Ok(StackValue::Float(f(lhs.as_f32()?, rhs.as_f32()?)))
}

pub fn arith(op: ArithOp, lhs: StackValue, rhs: StackValue) -> Result<StackValue> {
	match op {
		ArithOp::Div | ArithOp::Rem if rhs == StackValue::Int(0) => {
			Err(SimulateError::DivisionByZero)
		}
		ArithOp::Add => int(lhs, rhs, i32::wrapping_add),
		ArithOp::Sub => int(lhs, rhs, i32::wrapping_sub),
		ArithOp::Mul => int(lhs, rhs, i32::wrapping_mul),
		ArithOp::Div => int(lhs, rhs, i32::wrapping_div),
		ArithOp::Rem => int(lhs, rhs, i32::wrapping_rem),
		ArithOp::Shl => int(lhs, rhs, |a, b| a.wrapping_shl(b as u32)),
		ArithOp::Lshr => {
			int(lhs, rhs, |a, b| (a as u32).wrapping_shr(b as u32) as i32)
		}
		ArithOp::Ashr => int(lhs, rhs, |a, b| a.wrapping_shr(b as u32)),
		ArithOp::And => int(lhs, rhs, |a, b| a & b),
		ArithOp::Or => int(lhs, rhs, |a, b| a | b),
		ArithOp::Xor => int(lhs, rhs, |a, b| a ^ b),
		ArithOp::Fadd => float(lhs, rhs, |a, b| a + b),
		ArithOp::Fsub => float(lhs, rhs, |a, b| a - b),
		ArithOp::Fmul => float(lhs, rhs, |a, b| a * b),
		ArithOp::Fdiv => float(lhs, rhs, |a, b| a / b),
	}
}

pub fn compare(
	op: CompOp,
	lhs: StackValue,
	rhs: StackValue,
) -> Result<StackValue> {
	let result = match op {
		CompOp::Eq => lhs.as_i32()? == rhs.as_i32()?,
		CompOp::Ne => lhs.as_i32()? != rhs.as_i32()?,
		CompOp::Sgt => lhs.as_i32()? > rhs.as_i32()?,
		CompOp::Sge => lhs.as_i32()? >= rhs.as_i32()?,
		CompOp::Slt => lhs.as_i32()? < rhs.as_i32()?,
		CompOp::Sle => lhs.as_i32()? <= rhs.as_i32()?,
		CompOp::Oeq => lhs.as_f32()? == rhs.as_f32()?,
		CompOp::One => lhs.as_f32()? != rhs.as_f32()?,
		CompOp::Ogt => lhs.as_f32()? > rhs.as_f32()?,
		CompOp::Oge => lhs.as_f32()? >= rhs.as_f32()?,
		CompOp::Olt => lhs.as_f32()? < rhs.as_f32()?,
		CompOp::Ole => lhs.as_f32()? <= rhs.as_f32()?,
	};
	Ok(StackValue::Int(result as i32))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integer_ops_wrap() {
		let max = StackValue::Int(i32::MAX);
		assert_eq!(
			arith(ArithOp::Add, max, 1.into()),
			Ok(StackValue::Int(i32::MIN))
		);
		assert_eq!(
			arith(ArithOp::Lshr, StackValue::Int(-1), 28.into()),
			Ok(StackValue::Int(15))
		);
		assert_eq!(
			arith(ArithOp::Rem, 7.into(), 0.into()),
			Err(SimulateError::DivisionByZero)
		);
		assert!(arith(ArithOp::Fadd, 1.into(), 2.into()).is_err());
	}

	#[test]
	fn pointers_move_by_elements() {
		assert_eq!(StackValue::Ptr(4).offset(-2), Ok(StackValue::Ptr(2)));
		assert_eq!(
			StackValue::Ptr(1).offset(-2),
			Err(SimulateError::OutOfBounds(-1))
		);
		assert_eq!(
			compare(CompOp::Slt, 1.into(), 2.into()),
			Ok(StackValue::Int(1))
		);
	}
}

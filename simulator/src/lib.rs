// 按 lane 解释执行 IR，用来比较向量化前后的程序行为

mod inout;
pub mod simulator;
pub mod value;

use thiserror::Error;

pub use simulator::LaneSimulator;
pub use value::StackValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulateError {
	#[error("no function named @{0}")]
	UnknownFunction(String),
	#[error("jump to unknown block {0}")]
	UnknownBlock(String),
	#[error("{0} is read before it is written")]
	UndefinedTemp(String),
	#[error("expected {expected}, found {found:?}")]
	TypeMismatch {
		expected: &'static str,
		found: StackValue,
	},
	#[error("memory access out of bounds at {0}")]
	OutOfBounds(i64),
	#[error("division by zero")]
	DivisionByZero,
	#[error("lanes disagree on a value that must be uniform")]
	DivergentValue,
	#[error("step limit of {0} exceeded")]
	StepLimit(usize),
	#[error("can not simulate `{0}`")]
	Unsupported(String),
}

pub type Result<T, E = SimulateError> = std::result::Result<T, E>;

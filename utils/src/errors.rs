use thiserror::Error;

#[derive(Error, Debug)]
pub enum RvError {
	#[error("syntax error: {0}")]
	LlvmSyntaxError(String),
	#[error("system error: {0}")]
	SystemError(String),
	#[error("invalid configuration: {0}")]
	ConfigError(String),
	#[error("malformed IR in function {func}: {reason}")]
	VerifyError { func: String, reason: String },
	#[error("vectorization of loop {loop_name} in {func} failed: {reason}")]
	EngineFailure {
		func: String,
		loop_name: String,
		reason: String,
	},
}

pub type Result<T, E = RvError> = std::result::Result<T, E>;

pub fn map_sys_err(e: std::io::Error) -> RvError {
	RvError::SystemError(e.to_string())
}

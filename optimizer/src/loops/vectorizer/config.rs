use std::fmt::Display;

use utils::{Result, RvError, DEFAULT_MAX_VECTOR_BITS, MAX_VECTOR_WIDTH};

pub const ENV_FORCE_WIDTH: &str = "RV_FORCE_WIDTH";
pub const ENV_DISABLE: &str = "RV_DISABLE";
pub const ENV_DIAG: &str = "LV_DIAG";
pub const ENV_PRINT_FUNCTION: &str = "RV_PRINT_FUNCTION";

/// Settings of one vectorizer run. Nothing here changes while the run is in
/// progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorizerConfig {
	// fixes the width of every loop and skips the cost model
	pub force_width: Option<u32>,
	pub disabled: bool,
	pub diagnostics: bool,
	pub print_function: bool,
	pub max_vector_bits: u32,
	// stop once the loop is prepared, leave the body scalar
	pub emit_prepared: bool,
}

impl Default for VectorizerConfig {
	fn default() -> Self {
		Self {
			force_width: None,
			disabled: false,
			diagnostics: false,
			print_function: false,
			max_vector_bits: DEFAULT_MAX_VECTOR_BITS,
			emit_prepared: false,
		}
	}
}

fn is_set(value: Option<String>) -> bool {
	value.is_some_and(|v| !matches!(v.trim(), "" | "0" | "false"))
}

pub fn parse_width(text: &str) -> Result<u32> {
	match text.trim().parse::<u32>() {
		Ok(width) if (1..=MAX_VECTOR_WIDTH).contains(&width) => Ok(width),
		_ => Err(RvError::ConfigError(format!(
			"vector width must be an integer in 1..={}, got `{}`",
			MAX_VECTOR_WIDTH, text
		))),
	}
}

impl VectorizerConfig {
	pub fn from_env() -> Result<Self> {
		Self::from_vars(|key| std::env::var(key).ok())
	}

	/// Build a configuration from any key/value source shaped like the
	/// process environment.
	pub fn from_vars<F>(get: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let force_width =
			get(ENV_FORCE_WIDTH).map(|v| parse_width(&v)).transpose()?;
		Ok(Self {
			force_width,
			disabled: is_set(get(ENV_DISABLE)),
			diagnostics: is_set(get(ENV_DIAG)),
			print_function: is_set(get(ENV_PRINT_FUNCTION)),
			..Self::default()
		})
	}
}

impl Display for VectorizerConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "max vector bits = {}", self.max_vector_bits)?;
		if let Some(width) = self.force_width {
			write!(f, ", forced width = {}", width)?;
		}
		if self.emit_prepared {
			write!(f, ", prepare only")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn config(vars: &[(&str, &str)]) -> Result<VectorizerConfig> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		VectorizerConfig::from_vars(|key| vars.get(key).cloned())
	}

	#[test]
	fn reads_environment() {
		assert_eq!(config(&[]).unwrap(), VectorizerConfig::default());
		let cfg = config(&[
			(ENV_FORCE_WIDTH, "4"),
			(ENV_DIAG, "1"),
			(ENV_DISABLE, "0"),
		])
		.unwrap();
		assert_eq!(cfg.force_width, Some(4));
		assert!(cfg.diagnostics);
		assert!(!cfg.disabled);
		assert_eq!(cfg.max_vector_bits, DEFAULT_MAX_VECTOR_BITS);
	}

	#[test]
	fn rejects_bad_width() {
		for width in ["0", "-4", "wide", "65"] {
			let err = config(&[(ENV_FORCE_WIDTH, width)]).unwrap_err();
			assert!(matches!(err, RvError::ConfigError(_)), "{}", width);
		}
	}
}

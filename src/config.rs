use optimizer::{loops::vectorizer::config::parse_width, VectorizerConfig};
use utils::{errors::Result, math::is_pow2, RvError};

use crate::cli::Args;

/// Environment first, command line flags on top.
pub fn load(args: &Args) -> Result<VectorizerConfig> {
	let env = VectorizerConfig::from_env()?;
	merge(env, args)
}

fn merge(mut config: VectorizerConfig, args: &Args) -> Result<VectorizerConfig> {
	if let Some(width) = args.force_width {
		config.force_width = Some(parse_width(&width.to_string())?);
	}
	if let Some(bits) = args.max_vector_bits {
		if bits < 32 || !is_pow2(bits) {
			return Err(RvError::ConfigError(format!(
				"max vector bits must be a power of two of at least 32, got {}",
				bits
			)));
		}
		config.max_vector_bits = bits;
	}
	config.disabled |= args.disable;
	config.diagnostics |= args.diag;
	config.print_function |= args.print_function;
	config.emit_prepared |= args.emit_prepared;
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	fn args(flags: &[&str]) -> Args {
		let mut argv = vec!["loopvec"];
		argv.extend(flags);
		Args::parse_from(argv)
	}

	#[test]
	fn flags_override_environment() {
		let env = VectorizerConfig {
			force_width: Some(8),
			..VectorizerConfig::default()
		};
		let config = merge(env, &args(&["--force-width", "4", "--diag"])).unwrap();
		assert_eq!(config.force_width, Some(4));
		assert!(config.diagnostics);
		assert!(!config.disabled);

		let env = VectorizerConfig {
			force_width: Some(8),
			..VectorizerConfig::default()
		};
		let config = merge(env, &args(&["in.ll"])).unwrap();
		assert_eq!(config.force_width, Some(8));
	}

	#[test]
	fn rejects_bad_values() {
		let config = VectorizerConfig::default();
		assert!(merge(config.clone(), &args(&["--force-width", "0"])).is_err());
		assert!(merge(config, &args(&["--max-vector-bits", "48"])).is_err());
	}
}

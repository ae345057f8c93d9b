use std::fmt::Display;

use console::style;

pub const REPORT_PREFIX: &str = "loopVecPass";

/// User-facing diagnostics of a run. Lines go to stderr only when
/// diagnostics are enabled, otherwise they are left to the logger.
#[derive(Default)]
pub struct Reporter {
	enabled: bool,
	lines: Vec<String>,
}

impl Reporter {
	pub fn new(enabled: bool) -> Self {
		Self {
			enabled,
			lines: Vec::new(),
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Diagnostic line, dropped when diagnostics are off.
	pub fn diag(&mut self, msg: impl Display) {
		if self.enabled {
			self.emit(format!("{}: {}", REPORT_PREFIX, msg));
		}
	}

	/// Decision worth keeping in the log even without diagnostics.
	pub fn report(&mut self, msg: impl Display) {
		let line = format!("{}: {}", REPORT_PREFIX, msg);
		if self.enabled {
			self.emit(line);
		} else {
			log::info!("{}", line);
		}
	}

	fn emit(&mut self, line: String) {
		eprintln!("{}", style(&line).dim());
		self.lines.push(line);
	}

	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	pub fn contains(&self, pattern: &str) -> bool {
		self.lines.iter().any(|line| line.contains(pattern))
	}
}

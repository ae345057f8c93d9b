use std::fmt::Display;

/// Named hints carried by a loop's latch terminator, printed as
/// `!loop {llvm.loop.vectorize.enable = 1, llvm.loop.parallel_accesses}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopMetadata {
	pub hints: Vec<(String, Option<i64>)>,
}

impl LoopMetadata {
	pub fn new() -> Self {
		Self::default()
	}
	pub fn has(&self, key: &str) -> bool {
		self.hints.iter().any(|(k, _)| k == key)
	}
	pub fn get_int(&self, key: &str) -> Option<i64> {
		self.hints.iter().find(|(k, _)| k == key).and_then(|(_, v)| *v)
	}
	pub fn set(&mut self, key: &str, value: Option<i64>) {
		match self.hints.iter_mut().find(|(k, _)| k == key) {
			Some((_, v)) => *v = value,
			None => self.hints.push((key.to_string(), value)),
		}
	}
	pub fn remove(&mut self, key: &str) {
		self.hints.retain(|(k, _)| k != key);
	}
	pub fn remove_prefix(&mut self, prefix: &str) {
		self.hints.retain(|(k, _)| !k.starts_with(prefix));
	}
	pub fn is_empty(&self) -> bool {
		self.hints.is_empty()
	}
}

impl Display for LoopMetadata {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let hints = self
			.hints
			.iter()
			.map(|(k, v)| match v {
				Some(v) => format!("{} = {}", k, v),
				None => k.clone(),
			})
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "!loop {{{}}}", hints)
	}
}

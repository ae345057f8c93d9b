use console::style;
use log::{Level, LevelFilter, Log, Metadata, Record};

pub const ENV_LOG: &str = "LOOPVEC_LOG";

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}
		let level = match record.level() {
			Level::Error => style("error").red().bold(),
			Level::Warn => style("warn").yellow().bold(),
			Level::Info => style("info").green(),
			Level::Debug => style("debug").blue(),
			Level::Trace => style("trace").dim(),
		};
		eprintln!("[{} {}] {}", level, record.target(), record.args());
	}

	fn flush(&self) {}
}

fn level_from(value: Option<String>) -> LevelFilter {
	value
		.and_then(|v| v.parse().ok())
		.unwrap_or(LevelFilter::Warn)
}

pub fn init() {
	let level = level_from(std::env::var(ENV_LOG).ok());
	// 重复初始化时保留已有的 logger
	if log::set_logger(&LOGGER).is_ok() {
		log::set_max_level(level);
	}
}

mod cli;
mod config;
mod logging;

use std::{
	fs::{self, File},
	io::{self, Read, Write},
};

use anyhow::Result;
use clap::Parser;
use cli::Args;
use log::trace;
use optimizer::LoopVectorizer;
use rrvm::program::LlvmProgram;
use utils::{fatal_error, map_sys_err};

fn read_input(file_name: &str) -> Result<String> {
	if file_name == "-" {
		let mut code = String::new();
		io::stdin().read_to_string(&mut code).map_err(map_sys_err)?;
		return Ok(code);
	}
	Ok(fs::read_to_string(file_name).map_err(map_sys_err)?)
}

fn main() -> Result<()> {
	logging::init();
	trace!("start");
	let args = Args::parse();

	let config = config::load(&args).unwrap_or_else(|err| fatal_error(err));
	let file_name = args
		.input
		.clone()
		.unwrap_or_else(|| fatal_error("no input files"));
	let code = read_input(&file_name)?;
	let mut program = LlvmProgram::parse(&code)?;

	let mut vectorizer = LoopVectorizer::with_config(config);
	let changed = vectorizer
		.run_program(&mut program)
		.unwrap_or_else(|err| fatal_error(err));
	trace!("changed: {}", changed);

	let mut writer: Box<dyn Write> = if let Some(o) = args.output {
		Box::new(File::create(o).map_err(map_sys_err)?)
	} else {
		Box::new(io::stdout())
	};
	write!(writer, "{}", program)?;
	Ok(())
}

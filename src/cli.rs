pub use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Outer-loop vectorizer for textual SSA IR")]
pub struct Args {
	/// Input file, `-` for stdin
	#[arg(value_parser)]
	pub input: Option<String>,

	#[arg(short)]
	pub output: Option<String>,

	/// Vector width for every triggered loop, bypassing the cost model
	#[arg(long)]
	pub force_width: Option<u32>,

	#[arg(long)]
	pub disable: bool,

	/// Print vectorizer diagnostics to stderr
	#[arg(long)]
	pub diag: bool,

	/// Dump each function before it is vectorized
	#[arg(long)]
	pub print_function: bool,

	#[arg(long)]
	pub max_vector_bits: Option<u32>,

	/// Stop after preparing the loop shape, leaving the body scalar
	#[arg(long)]
	pub emit_prepared: bool,
}

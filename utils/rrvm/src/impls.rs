use std::fmt::Display;

use crate::{
	basicblock::BasicBlock, cfg::CFG, func::LlvmFunc, program::LlvmProgram,
};

fn instr_format<T: Display>(v: T) -> String {
	format!("  {}", v)
}

#[cfg(not(feature = "debug"))]
impl Display for BasicBlock {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let jump = self.jump_instr.iter().map(|v| match &self.loop_md {
			Some(md) => format!("  {}, {}", v, md),
			None => instr_format(v),
		});
		let instrs = self
			.phi_instrs
			.iter()
			.map(instr_format)
			.chain(self.instrs.iter().map(instr_format))
			.chain(jump)
			.collect::<Vec<_>>()
			.join("\n");
		write!(f, "{}:\n{}", self.label(), instrs)
	}
}

#[cfg(feature = "debug")]
impl Display for BasicBlock {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let prev: Vec<_> = self.prev.iter().map(|v| v.borrow().id).collect();
		let succ: Vec<_> = self.succ.iter().map(|v| v.borrow().id).collect();
		let jump = self.jump_instr.iter().map(|v| match &self.loop_md {
			Some(md) => format!("  {}, {}", v, md),
			None => instr_format(v),
		});
		let instrs = self
			.phi_instrs
			.iter()
			.map(instr_format)
			.chain(self.instrs.iter().map(instr_format))
			.chain(jump)
			.collect::<Vec<_>>()
			.join("\n");
		write!(
			f,
			"{}: ; prev: {:?} succ: {:?}\n{}",
			self.label(),
			prev,
			succ,
			instrs
		)
	}
}

impl Display for CFG {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{}",
			self
				.blocks
				.iter()
				.map(|v| v.borrow().to_string())
				.collect::<Vec<_>>()
				.join("\n")
		)
	}
}

impl Display for LlvmFunc {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let params = self
			.params
			.iter()
			.map(|v| format!("{} {}", v.var_type, v))
			.collect::<Vec<_>>()
			.join(", ");
		let head = format!("define {} @{}({})", self.ret_type, self.name, params);
		write!(f, "{} {{\n{}\n}}", head, self.cfg)
	}
}

impl Display for LlvmProgram {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let funcs =
			self.funcs.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n\n");
		writeln!(f, "{}", funcs)
	}
}

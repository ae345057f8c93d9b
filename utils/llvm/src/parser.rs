use pest::{
	iterators::{Pair, Pairs},
	Parser,
};
use pest_derive::Parser;
use utils::{Label, Result, RvError::LlvmSyntaxError};

use crate::{
	llvminstr::*, llvmop::*, llvmvar::VarType, metadata::LoopMetadata,
	temp::Temp, LlvmInstr, LlvmTempManager,
};

#[derive(Parser)]
#[grammar = "llvmir.pest"]
struct IrParser;

pub struct FuncDecl {
	pub name: String,
	pub ret_type: VarType,
	pub params: Vec<Temp>,
	pub blocks: Vec<BlockDecl>,
}

pub struct BlockDecl {
	pub label: Label,
	pub phi_instrs: Vec<PhiInstr>,
	pub instrs: Vec<LlvmInstr>,
	pub jump_instr: Option<LlvmInstr>,
	pub loop_md: Option<LoopMetadata>,
}

pub fn parse(
	src: &str,
	temp_mgr: &mut LlvmTempManager,
) -> Result<Vec<FuncDecl>> {
	let program = IrParser::parse(Rule::Program, src)
		.map_err(|e| LlvmSyntaxError(e.to_string()))?
		.next()
		.ok_or_else(|| LlvmSyntaxError("empty program".to_string()))?;
	program
		.into_inner()
		.filter(|pair| pair.as_rule() == Rule::Func)
		.map(|pair| parse_func(pair, temp_mgr))
		.collect()
}

fn error_at(pair: &Pair<Rule>, msg: impl std::fmt::Display) -> utils::RvError {
	let (line, col) = pair.as_span().start_pos().line_col();
	LlvmSyntaxError(format!("{}:{}: {}", line, col, msg))
}

fn next<'a>(pairs: &mut Pairs<'a, Rule>) -> Result<Pair<'a, Rule>> {
	pairs
		.next()
		.ok_or_else(|| LlvmSyntaxError("truncated instruction".to_string()))
}

fn parse_func(
	pair: Pair<Rule>,
	temp_mgr: &mut LlvmTempManager,
) -> Result<FuncDecl> {
	let mut inner = pair.into_inner();
	let ret_type = parse_type(next(&mut inner)?)?;
	let name = next(&mut inner)?.as_str()[1..].to_string();
	let mut params = Vec::new();
	let mut blocks = Vec::new();
	for item in inner {
		match item.as_rule() {
			Rule::Param => {
				let mut param = item.into_inner();
				let var_type = parse_type(next(&mut param)?)?;
				params.push(parse_local(next(&mut param)?, var_type, temp_mgr));
			}
			Rule::Block => blocks.push(parse_block(item, temp_mgr)?),
			_ => return Err(error_at(&item, "unexpected item in function")),
		}
	}
	Ok(FuncDecl {
		name,
		ret_type,
		params,
		blocks,
	})
}

fn parse_block(
	pair: Pair<Rule>,
	temp_mgr: &mut LlvmTempManager,
) -> Result<BlockDecl> {
	let mut inner = pair.into_inner();
	let label = next(&mut inner)?.as_str().trim_end_matches(':').to_string();
	let mut block = BlockDecl {
		label: Label::new(label),
		phi_instrs: Vec::new(),
		instrs: Vec::new(),
		jump_instr: None,
		loop_md: None,
	};
	for instr in inner {
		if block.jump_instr.is_some() {
			return Err(error_at(&instr, "instruction after terminator"));
		}
		match instr.as_rule() {
			Rule::Phi => block.phi_instrs.push(parse_phi(instr, temp_mgr)?),
			Rule::Br | Rule::CondBr | Rule::Ret => {
				let (jump, loop_md) = parse_terminator(instr, temp_mgr)?;
				block.jump_instr = Some(jump);
				block.loop_md = loop_md;
			}
			_ => block.instrs.push(parse_instr(instr, temp_mgr)?),
		}
	}
	Ok(block)
}

fn parse_type(pair: Pair<Rule>) -> Result<VarType> {
	match pair.as_str() {
		"i32" => Ok(VarType::I32),
		"f32" => Ok(VarType::F32),
		"i32*" => Ok(VarType::I32Ptr),
		"f32*" => Ok(VarType::F32Ptr),
		"void" => Ok(VarType::Void),
		other => Err(error_at(&pair, format!("unknown type `{}`", other))),
	}
}

fn parse_local(
	pair: Pair<Rule>,
	var_type: VarType,
	temp_mgr: &mut LlvmTempManager,
) -> Temp {
	let name = &pair.as_str()[1..];
	temp_mgr.reserve(name);
	Temp::new(name, var_type, false)
}

fn parse_label(pair: Pair<Rule>) -> Label {
	Label::new(&pair.as_str()[1..])
}

fn parse_value(
	pair: Pair<Rule>,
	var_type: VarType,
	temp_mgr: &mut LlvmTempManager,
) -> Result<Value> {
	let value = next(&mut pair.into_inner())?;
	match value.as_rule() {
		Rule::Float => value
			.as_str()
			.parse::<f32>()
			.map(Value::Float)
			.map_err(|e| error_at(&value, e)),
		Rule::Int if var_type == VarType::F32 => value
			.as_str()
			.parse::<f32>()
			.map(Value::Float)
			.map_err(|e| error_at(&value, e)),
		Rule::Int => value
			.as_str()
			.parse::<i32>()
			.map(Value::Int)
			.map_err(|e| error_at(&value, e)),
		_ => Ok(Value::Temp(parse_local(value, var_type, temp_mgr))),
	}
}

fn parse_arith_op(pair: &Pair<Rule>) -> Result<ArithOp> {
	Ok(match pair.as_str() {
		"add" => ArithOp::Add,
		"sub" => ArithOp::Sub,
		"mul" => ArithOp::Mul,
		"sdiv" => ArithOp::Div,
		"srem" => ArithOp::Rem,
		"fadd" => ArithOp::Fadd,
		"fsub" => ArithOp::Fsub,
		"fmul" => ArithOp::Fmul,
		"fdiv" => ArithOp::Fdiv,
		"shl" => ArithOp::Shl,
		"lshr" => ArithOp::Lshr,
		"ashr" => ArithOp::Ashr,
		"and" => ArithOp::And,
		"or" => ArithOp::Or,
		"xor" => ArithOp::Xor,
		other => return Err(error_at(pair, format!("unknown op `{}`", other))),
	})
}

fn parse_comp(inner: &mut Pairs<Rule>) -> Result<(CompKind, CompOp)> {
	let kind = match next(inner)?.as_str() {
		"icmp" => CompKind::Icmp,
		_ => CompKind::Fcmp,
	};
	let pair = next(inner)?;
	let op = match pair.as_str() {
		"eq" => CompOp::Eq,
		"ne" => CompOp::Ne,
		"sgt" => CompOp::Sgt,
		"sge" => CompOp::Sge,
		"slt" => CompOp::Slt,
		"sle" => CompOp::Sle,
		"oeq" => CompOp::Oeq,
		"one" => CompOp::One,
		"ogt" => CompOp::Ogt,
		"oge" => CompOp::Oge,
		"olt" => CompOp::Olt,
		"ole" => CompOp::Ole,
		other => {
			return Err(error_at(&pair, format!("unknown predicate `{}`", other)))
		}
	};
	Ok((kind, op))
}

fn parse_phi(
	pair: Pair<Rule>,
	temp_mgr: &mut LlvmTempManager,
) -> Result<PhiInstr> {
	let mut inner = pair.into_inner();
	let target = next(&mut inner)?;
	let var_type = parse_type(next(&mut inner)?)?;
	let target = parse_local(target, var_type, temp_mgr);
	let mut source = Vec::new();
	for src in inner {
		let mut src = src.into_inner();
		let value = parse_value(next(&mut src)?, var_type, temp_mgr)?;
		source.push((value, parse_label(next(&mut src)?)));
	}
	Ok(PhiInstr::new(target, source))
}

fn parse_instr(
	pair: Pair<Rule>,
	temp_mgr: &mut LlvmTempManager,
) -> Result<LlvmInstr> {
	let rule = pair.as_rule();
	let mut inner = pair.clone().into_inner();
	let instr: LlvmInstr = match rule {
		Rule::Arith => {
			let target = next(&mut inner)?;
			let op = parse_arith_op(&next(&mut inner)?)?;
			let var_type = parse_type(next(&mut inner)?)?;
			Box::new(ArithInstr {
				target: parse_local(target, var_type, temp_mgr),
				op,
				var_type,
				lhs: parse_value(next(&mut inner)?, var_type, temp_mgr)?,
				rhs: parse_value(next(&mut inner)?, var_type, temp_mgr)?,
			})
		}
		Rule::Comp => {
			let target = parse_local(next(&mut inner)?, VarType::I32, temp_mgr);
			let (kind, op) = parse_comp(&mut inner)?;
			let var_type = parse_type(next(&mut inner)?)?;
			Box::new(CompInstr {
				kind,
				target,
				op,
				var_type,
				lhs: parse_value(next(&mut inner)?, var_type, temp_mgr)?,
				rhs: parse_value(next(&mut inner)?, var_type, temp_mgr)?,
			})
		}
		Rule::Select => {
			let target = next(&mut inner)?;
			let cond_type = parse_type(next(&mut inner)?)?;
			let cond = parse_value(next(&mut inner)?, cond_type, temp_mgr)?;
			let var_type = parse_type(next(&mut inner)?)?;
			let lhs = parse_value(next(&mut inner)?, var_type, temp_mgr)?;
			next(&mut inner)?;
			let rhs = parse_value(next(&mut inner)?, var_type, temp_mgr)?;
			Box::new(SelectInstr {
				target: parse_local(target, var_type, temp_mgr),
				var_type,
				cond,
				lhs,
				rhs,
			})
		}
		Rule::Load => {
			let target = next(&mut inner)?;
			let var_type = parse_type(next(&mut inner)?)?;
			let addr_type = parse_type(next(&mut inner)?)?;
			Box::new(LoadInstr {
				target: parse_local(target, var_type, temp_mgr),
				var_type,
				addr: parse_value(next(&mut inner)?, addr_type, temp_mgr)?,
			})
		}
		Rule::Gep => {
			let target = next(&mut inner)?;
			next(&mut inner)?;
			let var_type = parse_type(next(&mut inner)?)?;
			let addr = parse_value(next(&mut inner)?, var_type, temp_mgr)?;
			let offset_type = parse_type(next(&mut inner)?)?;
			Box::new(GEPInstr {
				target: parse_local(target, var_type, temp_mgr),
				var_type,
				addr,
				offset: parse_value(next(&mut inner)?, offset_type, temp_mgr)?,
			})
		}
		Rule::Call => {
			let mut first = next(&mut inner)?;
			let target = if first.as_rule() == Rule::Local {
				let target = first;
				first = next(&mut inner)?;
				Some(target)
			} else {
				None
			};
			let var_type = parse_type(first)?;
			let func = Label::new(&next(&mut inner)?.as_str()[1..]);
			let mut params = Vec::new();
			for arg in inner {
				let mut arg = arg.into_inner();
				let arg_type = parse_type(next(&mut arg)?)?;
				let value = parse_value(next(&mut arg)?, arg_type, temp_mgr)?;
				params.push((arg_type, value));
			}
			let target = match target {
				Some(target) => parse_local(target, var_type, temp_mgr),
				None => temp_mgr.new_temp(var_type, false),
			};
			Box::new(CallInstr {
				target,
				var_type,
				func,
				params,
			})
		}
		Rule::Store => {
			let value_type = parse_type(next(&mut inner)?)?;
			let value = parse_value(next(&mut inner)?, value_type, temp_mgr)?;
			let addr_type = parse_type(next(&mut inner)?)?;
			Box::new(StoreInstr {
				value,
				addr: parse_value(next(&mut inner)?, addr_type, temp_mgr)?,
			})
		}
		_ => return Err(error_at(&pair, "unexpected instruction")),
	};
	if !instr.type_valid() {
		return Err(error_at(&pair, format!("ill-typed instruction `{}`", instr)));
	}
	Ok(instr)
}

fn parse_terminator(
	pair: Pair<Rule>,
	temp_mgr: &mut LlvmTempManager,
) -> Result<(LlvmInstr, Option<LoopMetadata>)> {
	let rule = pair.as_rule();
	let mut inner = pair.into_inner();
	let instr: LlvmInstr = match rule {
		Rule::Br => Box::new(JumpInstr {
			target: parse_label(next(&mut inner)?),
		}),
		Rule::CondBr => {
			let var_type = parse_type(next(&mut inner)?)?;
			let cond = parse_value(next(&mut inner)?, var_type, temp_mgr)?;
			Box::new(JumpCondInstr {
				var_type,
				cond,
				target_true: parse_label(next(&mut inner)?),
				target_false: parse_label(next(&mut inner)?),
			})
		}
		_ => match inner.next() {
			Some(var_type) => {
				let var_type = parse_type(var_type)?;
				let value = parse_value(next(&mut inner)?, var_type, temp_mgr)?;
				Box::new(RetInstr::new(Some(value)))
			}
			None => Box::new(RetInstr::new(None)),
		},
	};
	let loop_md = inner.next().map(parse_loop_md).transpose()?;
	Ok((instr, loop_md))
}

fn parse_loop_md(pair: Pair<Rule>) -> Result<LoopMetadata> {
	let mut loop_md = LoopMetadata::new();
	for hint in pair.into_inner() {
		let mut hint = hint.into_inner();
		let key = next(&mut hint)?.as_str().to_string();
		let value = match hint.next() {
			Some(v) => {
				Some(v.as_str().parse::<i64>().map_err(|e| error_at(&v, e))?)
			}
			None => None,
		};
		loop_md.set(&key, value);
	}
	Ok(loop_md)
}

#[cfg(test)]
mod tests {
	use super::*;

	const SRC: &str = r#"
; sum of an array
define i32 @sum(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [0, %entry], [%s.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %p = getelementptr i32, i32* %a, i32 %i
  %v = load i32, i32* %p
  %s.next = add i32 %s, %v
  %i.next = add i32 %i, 1
  br label %B1, !loop {llvm.loop.vectorize.enable = 1, llvm.loop.parallel_accesses}
B3:
  call void @putint(i32 %s)
  ret i32 %s
}
"#;

	#[test]
	fn parse_sum() {
		let mut mgr = LlvmTempManager::new();
		let funcs = parse(SRC, &mut mgr).unwrap();
		assert_eq!(funcs.len(), 1);
		let func = &funcs[0];
		assert_eq!(func.name, "sum");
		assert_eq!(func.params.len(), 2);
		assert_eq!(func.params[0].var_type, VarType::I32Ptr);
		assert_eq!(func.blocks.len(), 4);
		let header = &func.blocks[1];
		assert_eq!(header.label.name, "B1");
		assert_eq!(header.phi_instrs.len(), 2);
		assert_eq!(
			header.phi_instrs[0].to_string(),
			"%i = phi i32 [0, %entry], [%i.next, %B2]"
		);
		assert!(header.jump_instr.as_ref().unwrap().is_jump_cond());
		let latch = &func.blocks[2];
		assert_eq!(latch.instrs.len(), 4);
		assert_eq!(latch.instrs[0].to_string(), "%p = getelementptr i32, i32* %a, i32 %i");
		let md = latch.loop_md.as_ref().unwrap();
		assert_eq!(md.get_int("llvm.loop.vectorize.enable"), Some(1));
		assert!(md.has("llvm.loop.parallel_accesses"));
		let exit = &func.blocks[3];
		assert!(exit.instrs[0].is_call());
		assert_eq!(exit.instrs[0].get_write(), None);
		assert_eq!(exit.jump_instr.as_ref().unwrap().to_string(), "ret i32 %s");
	}

	#[test]
	fn numeric_temps_are_reserved() {
		let src = "define void @f() {\nentry:\n  %7 = add i32 1, 2\n  ret void\n}";
		let mut mgr = LlvmTempManager::new();
		parse(src, &mut mgr).unwrap();
		assert_eq!(mgr.new_temp(VarType::I32, false).name, "8");
	}

	#[test]
	fn reject_bad_input() {
		let mut mgr = LlvmTempManager::new();
		assert!(parse("define i32 @f() {\nentry:\n  %x = \n}", &mut mgr).is_err());
		let ill_typed =
			"define void @f() {\nentry:\n  %x = add f32 1.5, 2.0\n  ret void\n}";
		assert!(parse(ill_typed, &mut mgr).is_err());
	}
}

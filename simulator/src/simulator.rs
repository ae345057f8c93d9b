use std::collections::HashMap;

use llvm::{LlvmInstr, LlvmInstrTrait, LlvmInstrVariant, LlvmTemp, Value};
use rrvm::program::LlvmProgram;
use utils::{Label, MAX_SIMULATE_STEPS};

use crate::{
	inout::is_builtin,
	value::{arith, compare},
	Result, SimulateError, StackValue,
};

// 一个 temp 的所有 lane，长度为 1 时表示对所有 lane 相同
type Lanes = Vec<StackValue>;

#[derive(Default)]
struct Frame {
	temps: HashMap<LlvmTemp, Lanes>,
}

impl Frame {
	fn get(&self, value: &Value) -> Result<Lanes> {
		match value {
			Value::Int(v) => Ok(vec![StackValue::Int(*v)]),
			Value::Float(v) => Ok(vec![StackValue::Float(*v)]),
			Value::Temp(t) => self
				.temps
				.get(t)
				.cloned()
				.ok_or_else(|| SimulateError::UndefinedTemp(t.to_string())),
		}
	}

	fn lane(&self, value: &Value, lane: usize) -> Result<StackValue> {
		let Value::Temp(t) = value else {
			return self.get(value).and_then(uniform);
		};
		let lanes = self
			.temps
			.get(t)
			.ok_or_else(|| SimulateError::UndefinedTemp(t.to_string()))?;
		match lanes.as_slice() {
			[single] => Ok(*single),
			lanes => lanes.get(lane).copied().ok_or_else(|| {
				SimulateError::Unsupported(format!("lane {} of {}", lane, t))
			}),
		}
	}

	fn width_of(&self, temp: &LlvmTemp) -> usize {
		self.temps.get(temp).map_or(1, |lanes| lanes.len())
	}
}

fn uniform(lanes: Lanes) -> Result<StackValue> {
	let first = lanes.first().copied().ok_or(SimulateError::DivergentValue)?;
	if lanes.iter().all(|v| *v == first) {
		Ok(first)
	} else {
		Err(SimulateError::DivergentValue)
	}
}

/// Interpreter for programs that mix scalar and vector instructions. A
/// vector value is one scalar per lane; a scalar read by a vector
/// instruction is seen by every lane.
pub struct LaneSimulator<'a> {
	program: &'a LlvmProgram,
	pub memory: Vec<StackValue>,
	pub output: Vec<String>,
	pub steps: usize,
}

impl<'a> LaneSimulator<'a> {
	pub fn new(program: &'a LlvmProgram) -> Self {
		Self {
			program,
			memory: Vec::new(),
			output: Vec::new(),
			steps: 0,
		}
	}

	/// Copy `values` into fresh memory and return a pointer to the first.
	pub fn alloc_array(&mut self, values: &[StackValue]) -> StackValue {
		let base = self.memory.len();
		self.memory.extend_from_slice(values);
		StackValue::Ptr(base)
	}

	pub fn read_array(&self, ptr: StackValue, len: usize) -> Result<Vec<StackValue>> {
		let base = ptr.as_ptr()?;
		self
			.memory
			.get(base..base + len)
			.map(|values| values.to_vec())
			.ok_or(SimulateError::OutOfBounds((base + len) as i64))
	}

	fn load(&self, addr: StackValue) -> Result<StackValue> {
		let addr = addr.as_ptr()?;
		self
			.memory
			.get(addr)
			.copied()
			.ok_or(SimulateError::OutOfBounds(addr as i64))
	}

	fn store(&mut self, addr: StackValue, value: StackValue) -> Result<()> {
		let addr = addr.as_ptr()?;
		let slot = self
			.memory
			.get_mut(addr)
			.ok_or(SimulateError::OutOfBounds(addr as i64))?;
		*slot = value;
		Ok(())
	}

	fn tick(&mut self) -> Result<()> {
		self.steps += 1;
		if self.steps > MAX_SIMULATE_STEPS {
			return Err(SimulateError::StepLimit(MAX_SIMULATE_STEPS));
		}
		Ok(())
	}

	/// Run `name` with scalar `args` and return its scalar result.
	pub fn run(
		&mut self,
		name: &str,
		args: &[StackValue],
	) -> Result<Option<StackValue>> {
		let program = self.program;
		let func = program
			.get_func(name)
			.ok_or_else(|| SimulateError::UnknownFunction(name.to_string()))?;
		let mut frame = Frame::default();
		for (param, arg) in func.params.iter().zip(args.iter()) {
			frame.temps.insert(param.clone(), vec![*arg]);
		}
		let mut prev: Option<Label> = None;
		let mut bb = func.cfg.get_entry();
		loop {
			let next = {
				let block = bb.borrow();
				// phi 并行赋值
				if let Some(prev) = prev.as_ref() {
					let mut values = Vec::new();
					for phi in block.phi_instrs.iter() {
						let value = phi.get_incoming(prev).ok_or_else(|| {
							SimulateError::Unsupported(format!("{} from {}", phi, prev))
						})?;
						values.push((phi.target.clone(), frame.get(value)?));
					}
					frame.temps.extend(values);
				}
				for instr in block.instrs.iter() {
					self.tick()?;
					log::trace!("{}", instr);
					self.exec(instr, &mut frame)?;
				}
				self.tick()?;
				let Some(jump) = block.jump_instr.as_ref() else {
					return Err(SimulateError::Unsupported(format!(
						"{} has no terminator",
						block.label()
					)));
				};
				match jump.get_variant() {
					LlvmInstrVariant::JumpInstr(jump) => jump.target.clone(),
					LlvmInstrVariant::JumpCondInstr(br) => {
						if uniform(frame.get(&br.cond)?)?.is_true() {
							br.target_true.clone()
						} else {
							br.target_false.clone()
						}
					}
					LlvmInstrVariant::RetInstr(ret) => {
						return match ret.value.as_ref() {
							Some(value) => Ok(Some(uniform(frame.get(value)?)?)),
							None => Ok(None),
						};
					}
					_ => return Err(SimulateError::Unsupported(jump.to_string())),
				}
			};
			prev = Some(bb.borrow().label());
			bb = func
				.cfg
				.find_label(&next)
				.ok_or_else(|| SimulateError::UnknownBlock(next.to_string()))?;
		}
	}

	fn call(&mut self, name: &str, args: &[StackValue]) -> Result<Option<StackValue>> {
		if is_builtin(name) {
			self.call_builtin(name, args)
		} else {
			self.run(name, args)
		}
	}

	fn exec(&mut self, instr: &LlvmInstr, frame: &mut Frame) -> Result<()> {
		let (target, lanes) = match instr.get_variant() {
			LlvmInstrVariant::VecInstr(vec) => {
				let mask = vec.mask.as_ref().map(|m| frame.get(m)).transpose()?;
				let mut lanes = Vec::with_capacity(vec.width as usize);
				for lane in 0..vec.width as usize {
					let active = match mask.as_ref() {
						Some(mask) => {
							mask.get(lane).or(mask.first()).is_some_and(|m| m.is_true())
						}
						None => true,
					};
					let value = if active {
						self.exec_lane(&vec.inner, frame, lane)?
					} else {
						None
					};
					lanes.push(value.unwrap_or_default());
				}
				(vec.inner.get_write(), lanes)
			}
			LlvmInstrVariant::LadderInstr(ladder) => {
				let base = uniform(frame.get(&ladder.base)?)?;
				let lanes = (0..ladder.width as i64)
					.map(|lane| base.offset(lane * ladder.stride as i64))
					.collect::<Result<Lanes>>()?;
				(Some(ladder.target.clone()), lanes)
			}
			LlvmInstrVariant::BuildVecInstr(build) => {
				let lanes = build
					.lanes
					.iter()
					.map(|v| frame.get(v).and_then(uniform))
					.collect::<Result<Lanes>>()?;
				(Some(build.target.clone()), lanes)
			}
			LlvmInstrVariant::ReduceInstr(reduce) => {
				let mut acc = frame.lane(&reduce.vector, 0)?;
				for lane in 1..reduce.width as usize {
					acc = arith(reduce.op, acc, frame.lane(&reduce.vector, lane)?)?;
				}
				(Some(reduce.target.clone()), vec![acc])
			}
			_ => {
				// 普通指令按读到的最宽的值逐 lane 执行
				let width = instr
					.get_read()
					.iter()
					.map(|t| frame.width_of(t))
					.max()
					.unwrap_or(1);
				let mut lanes = Vec::with_capacity(width);
				for lane in 0..width {
					lanes.push(self.exec_lane(instr, frame, lane)?.unwrap_or_default());
				}
				(instr.get_write(), lanes)
			}
		};
		if let Some(target) = target {
			frame.temps.insert(target, lanes);
		}
		Ok(())
	}

	fn exec_lane(
		&mut self,
		instr: &LlvmInstr,
		frame: &Frame,
		lane: usize,
	) -> Result<Option<StackValue>> {
		let get = |v: &Value| frame.lane(v, lane);
		let value = match instr.get_variant() {
			LlvmInstrVariant::ArithInstr(a) => {
				arith(a.op, get(&a.lhs)?, get(&a.rhs)?)?
			}
			LlvmInstrVariant::CompInstr(c) => {
				compare(c.op, get(&c.lhs)?, get(&c.rhs)?)?
			}
			LlvmInstrVariant::SelectInstr(s) => {
				if get(&s.cond)?.is_true() {
					get(&s.lhs)?
				} else {
					get(&s.rhs)?
				}
			}
			LlvmInstrVariant::LoadInstr(load) => self.load(get(&load.addr)?)?,
			LlvmInstrVariant::StoreInstr(store) => {
				self.store(get(&store.addr)?, get(&store.value)?)?;
				return Ok(None);
			}
			LlvmInstrVariant::GEPInstr(gep) => {
				let offset = get(&gep.offset)?.as_i32()?;
				get(&gep.addr)?.offset(offset as i64)?
			}
			LlvmInstrVariant::CallInstr(call) => {
				let args = call
					.params
					.iter()
					.map(|(_, v)| get(v))
					.collect::<Result<Vec<_>>>()?;
				return self.call(&call.func.name, &args);
			}
			_ => return Err(SimulateError::Unsupported(instr.to_string())),
		};
		Ok(Some(value))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use llvm::{
		ArithOp, BuildVecInstr, LadderInstr, ReduceInstr, RetInstr, StoreInstr,
		VarType, VecInstr,
	};

	const SUM: &str = r#"
define i32 @sum(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [0, %entry], [%s.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %s.next = add i32 %s, %x
  %i.next = add i32 %i, 1
  call void @putint(i32 %x)
  br label %B1
B3:
  ret i32 %s
}
"#;

	fn ints(values: &[i32]) -> Vec<StackValue> {
		values.iter().map(|v| StackValue::Int(*v)).collect()
	}

	#[test]
	fn scalar_loop() {
		let program = LlvmProgram::parse(SUM).unwrap();
		let mut sim = LaneSimulator::new(&program);
		let a = sim.alloc_array(&ints(&[3, 4, 5]));
		let result = sim.run("sum", &[a, StackValue::Int(3)]).unwrap();
		assert_eq!(result, Some(StackValue::Int(12)));
		assert_eq!(sim.output, ["3", "4", "5"]);
		assert!(sim.run("missing", &[]).is_err());
	}

	#[test]
	fn masked_lanes_have_no_effect() {
		let src = "define i32 @f(i32* %a) {\nentry:\n  ret i32 0\n}\n";
		let program = LlvmProgram::parse(src).unwrap();
		let temp = |name: &str, var_type| LlvmTemp::new(name, var_type, false);
		let (a, p, m, v, r) = (
			temp("a", VarType::I32Ptr),
			temp("p", VarType::I32Ptr),
			temp("m", VarType::I32),
			temp("v", VarType::I32),
			temp("r", VarType::I32),
		);
		{
			let entry = program.funcs[0].cfg.get_entry();
			let mut entry = entry.borrow_mut();
			entry.instrs.push(Box::new(LadderInstr {
				target: p.clone(),
				var_type: VarType::I32Ptr,
				base: Value::Temp(a),
				stride: 1,
				width: 4,
			}));
			// lane 0 is inactive
			entry.instrs.push(Box::new(LadderInstr {
				target: m.clone(),
				var_type: VarType::I32,
				base: Value::Int(0),
				stride: 1,
				width: 4,
			}));
			let store = StoreInstr {
				value: Value::Int(7),
				addr: Value::Temp(p),
			};
			entry.instrs.push(Box::new(VecInstr::new(
				4,
				Some(Value::Temp(m)),
				Box::new(store),
			)));
			entry.instrs.push(Box::new(BuildVecInstr {
				target: v.clone(),
				var_type: VarType::I32,
				lanes: vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
			}));
			entry.instrs.push(Box::new(ReduceInstr {
				target: r.clone(),
				op: ArithOp::Add,
				var_type: VarType::I32,
				vector: Value::Temp(v),
				width: 4,
			}));
			entry.jump_instr = Some(Box::new(RetInstr {
				value: Some(Value::Temp(r)),
			}));
		}
		let mut sim = LaneSimulator::new(&program);
		let a = sim.alloc_array(&ints(&[1, 1, 1, 1]));
		assert_eq!(sim.run("f", &[a]).unwrap(), Some(StackValue::Int(10)));
		assert_eq!(sim.memory, ints(&[1, 7, 7, 7]));
	}
}

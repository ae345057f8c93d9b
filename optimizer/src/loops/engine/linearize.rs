// if-conversion：把循环体排成一条直线，每个块带一个 lane mask，
// phi 变成 select，有副作用的指令只在 mask 为真的 lane 上执行

use std::collections::{HashMap, HashSet, VecDeque};

use llvm::{
	ArithInstr, ArithOp, CompInstr, CompKind, CompOp, JumpInstr, LlvmInstr,
	LlvmInstrVariant, LlvmTemp, LlvmTempManager, SelectInstr, Value, VarType,
	VecInstr,
};
use rrvm::{dominator::DomTree, func::LlvmFunc, LlvmNode};
use utils::from_label;

use super::{EngineResult, VectorizationInfo};

// None: every lane that reaches the loop body is active
type Mask = Option<Value>;

struct MaskBuilder<'a> {
	temp_mgr: &'a mut LlvmTempManager,
}

impl<'a> MaskBuilder<'a> {
	fn new_i32(&mut self) -> LlvmTemp {
		self.temp_mgr.new_temp(VarType::I32, false)
	}

	fn test(
		&mut self,
		cond: &Value,
		op: CompOp,
		out: &mut Vec<LlvmInstr>,
	) -> Value {
		let target = self.new_i32();
		out.push(Box::new(CompInstr {
			kind: CompKind::Icmp,
			target: target.clone(),
			op,
			var_type: VarType::I32,
			lhs: cond.clone(),
			rhs: Value::Int(0),
		}));
		Value::Temp(target)
	}

	fn combine(
		&mut self,
		op: ArithOp,
		lhs: Value,
		rhs: Value,
		out: &mut Vec<LlvmInstr>,
	) -> Value {
		let target = self.new_i32();
		out.push(Box::new(ArithInstr {
			target: target.clone(),
			op,
			var_type: VarType::I32,
			lhs,
			rhs,
		}));
		Value::Temp(target)
	}

	fn and(
		&mut self,
		mask: &Mask,
		cond: Value,
		out: &mut Vec<LlvmInstr>,
	) -> Mask {
		match mask {
			Some(m) => Some(self.combine(ArithOp::And, m.clone(), cond, out)),
			None => Some(cond),
		}
	}

	fn or(&mut self, masks: Vec<Mask>, out: &mut Vec<LlvmInstr>) -> Mask {
		let mut acc: Option<Value> = None;
		for mask in masks {
			let m = mask?;
			acc = Some(match acc {
				Some(a) => self.combine(ArithOp::Or, a, m, out),
				None => m,
			});
		}
		acc
	}
}

// 只含循环体（不含 header）的拓扑序，出现环说明有内层循环
fn topo_order(body: &[LlvmNode]) -> EngineResult<Vec<LlvmNode>> {
	let ids: HashSet<i32> = body.iter().map(|bb| bb.borrow().id).collect();
	let mut indeg: HashMap<i32, usize> = HashMap::new();
	for bb in body.iter() {
		let bb = bb.borrow();
		let preds = bb.prev.iter().filter(|p| ids.contains(&p.borrow().id));
		indeg.insert(bb.id, preds.count());
	}
	let mut queue: VecDeque<LlvmNode> = body
		.iter()
		.filter(|bb| indeg.get(&bb.borrow().id) == Some(&0))
		.cloned()
		.collect();
	let mut order = Vec::new();
	while let Some(bb) = queue.pop_front() {
		for succ in bb.borrow().succ.iter() {
			let id = succ.borrow().id;
			if let Some(d) = indeg.get_mut(&id) {
				*d -= 1;
				if *d == 0 {
					queue.push_back(succ.clone());
				}
			}
		}
		order.push(bb);
	}
	if order.len() != body.len() {
		return Err("divergent control flow inside a nested loop".to_string());
	}
	Ok(order)
}

fn needs_mask(instr: &LlvmInstr) -> bool {
	match instr.get_variant() {
		LlvmInstrVariant::ArithInstr(arith) => {
			matches!(arith.op, ArithOp::Div | ArithOp::Rem)
		}
		LlvmInstrVariant::VecInstr(_) => false,
		_ => instr.is_store() || instr.is_call() || instr.is_load(),
	}
}

pub fn linearize(
	func: &mut LlvmFunc,
	vecinfo: &mut VectorizationInfo,
	temp_mgr: &mut LlvmTempManager,
) -> EngineResult<()> {
	let header = vecinfo.region.header.clone();
	let header_id = header.borrow().id;
	let body: Vec<LlvmNode> = vecinfo
		.region
		.blocks
		.iter()
		.filter(|bb| bb.borrow().id != header_id)
		.cloned()
		.collect();
	let entry = header
		.borrow()
		.succ
		.iter()
		.map(|bb| bb.borrow().id)
		.find(|id| vecinfo.region.contains(*id))
		.ok_or("the loop has no body")?;
	let order = topo_order(&body)?;
	let latch = order.last().cloned().ok_or("the loop has no body")?;
	if !latch.borrow().succ.iter().any(|s| s.borrow().id == header_id) {
		return Err(format!("{} is not the latch", latch.borrow().label()));
	}
	let pdom = DomTree::new(&func.cfg, true);
	let width = vecinfo.width;
	let mut builder = MaskBuilder { temp_mgr };
	let mut edge_masks: HashMap<(i32, i32), Mask> = HashMap::new();

	for (pos, bb) in order.iter().enumerate() {
		let id = bb.borrow().id;
		let mut head: Vec<LlvmInstr> = Vec::new();

		let preds: Vec<i32> = bb
			.borrow()
			.prev
			.iter()
			.map(|p| p.borrow().id)
			.filter(|p| *p != header_id)
			.collect();
		let in_masks: Vec<Mask> = preds
			.iter()
			.map(|p| edge_masks.get(&(*p, id)).cloned().flatten())
			.collect();
		let mask = if id == entry || pdom.dominates(id, entry) {
			None
		} else {
			builder.or(in_masks, &mut head)
		};

		// phi -> select
		let phis = std::mem::take(&mut bb.borrow_mut().phi_instrs);
		for phi in phis {
			let mut incoming = phi.source.iter().map(|(value, label)| {
				let pred = from_label(label).unwrap_or(-1);
				(value.clone(), edge_masks.get(&(pred, id)).cloned().flatten())
			});
			let Some((mut acc, _)) = incoming.next() else {
				continue;
			};
			let mut selects: Vec<(Value, Value)> = Vec::new();
			for (value, edge) in incoming {
				match edge {
					Some(m) => selects.push((m, value)),
					None => {
						acc = value;
						selects.clear();
					}
				}
			}
			let last = selects.len();
			if last == 0 {
				selects.push((Value::Int(1), acc.clone()));
			}
			for (i, (cond, value)) in selects.into_iter().enumerate() {
				let target = if i + 1 >= last {
					phi.target.clone()
				} else {
					builder.temp_mgr.new_temp(phi.var_type, false)
				};
				head.push(Box::new(SelectInstr {
					target: target.clone(),
					var_type: phi.var_type,
					cond,
					lhs: value,
					rhs: acc,
				}));
				acc = Value::Temp(target);
			}
		}

		// 有副作用的指令加上 mask
		let mut instrs = std::mem::take(&mut bb.borrow_mut().instrs);
		if let Some(m) = mask.as_ref() {
			instrs = instrs
				.into_iter()
				.map(|instr| -> LlvmInstr {
					if needs_mask(&instr) {
						Box::new(VecInstr::new(width, Some(m.clone()), instr))
					} else {
						instr
					}
				})
				.collect();
		}
		head.extend(instrs);

		// 出边的 mask，跳转改为直接到下一个块
		let jump = bb.borrow_mut().jump_instr.take();
		if let Some(jump) = jump.as_ref() {
			match jump.get_variant() {
				LlvmInstrVariant::JumpCondInstr(br)
					if br.target_true != br.target_false =>
				{
					let t = builder.test(&br.cond, CompOp::Ne, &mut head);
					let f = builder.test(&br.cond, CompOp::Eq, &mut head);
					let t_mask = builder.and(&mask, t, &mut head);
					let f_mask = builder.and(&mask, f, &mut head);
					for (label, m) in [(&br.target_true, t_mask), (&br.target_false, f_mask)] {
						if let Some(succ) = from_label(label) {
							edge_masks.insert((id, succ), m);
						}
					}
				}
				_ => {
					for succ in jump.get_succ() {
						if let Some(succ) = from_label(&succ) {
							edge_masks.insert((id, succ), mask.clone());
						}
					}
				}
			}
		}
		let mut bb_mut = bb.borrow_mut();
		bb_mut.instrs = head;
		bb_mut.jump_instr = match order.get(pos + 1) {
			Some(next) => Some(Box::new(JumpInstr {
				target: next.borrow().label(),
			})),
			None => jump,
		};
	}

	func
		.cfg
		.resolve_links()
		.map_err(|label| format!("unknown block {}", label))?;
	let mut blocks = vec![header];
	blocks.extend(order);
	vecinfo.region.blocks = blocks;
	Ok(())
}

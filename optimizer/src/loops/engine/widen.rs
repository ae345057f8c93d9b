use std::collections::{HashMap, HashSet};

use llvm::{
	BuildVecInstr, JumpInstr, LadderInstr, LlvmInstr, LlvmInstrTrait, LlvmTemp,
	LlvmTempManager, ReduceInstr, Value, VecInstr,
};
use rrvm::{func::LlvmFunc, LlvmNode};

use super::{EngineResult, VectorizationInfo};
use crate::loops::{reduction::RedKind, shape::VectorShape};

fn is_vector_instr(vecinfo: &VectorizationInfo, instr: &LlvmInstr) -> bool {
	if instr.is_vector() || instr.is_call() {
		return true;
	}
	match instr.get_write() {
		Some(target) => vecinfo.temp_shape(&target).is_vector(),
		// store 的值或地址各 lane 不同时逐 lane 执行
		None if instr.is_store() => instr
			.get_read_values()
			.iter()
			.any(|v| !vecinfo.get_shape(v).is_uniform()),
		None => false,
	}
}

fn ladder(
	temp: &LlvmTemp,
	stride: i32,
	width: u32,
	temp_mgr: &mut LlvmTempManager,
) -> (LlvmTemp, LlvmInstr) {
	let target = temp_mgr.new_temp(temp.var_type, false);
	let instr = Box::new(LadderInstr {
		target: target.clone(),
		var_type: temp.var_type,
		base: Value::Temp(temp.clone()),
		stride,
		width,
	});
	(target, instr)
}

fn widen_block(
	bb: &LlvmNode,
	vecinfo: &VectorizationInfo,
	temp_mgr: &mut LlvmTempManager,
) {
	let width = vecinfo.width;
	// 每个块内同一个 strided 值只展开一次
	let mut ladders: HashMap<LlvmTemp, LlvmTemp> = HashMap::new();
	let instrs = std::mem::take(&mut bb.borrow_mut().instrs);
	let mut out: Vec<LlvmInstr> = Vec::new();
	for instr in instrs {
		if !is_vector_instr(vecinfo, &instr) {
			out.push(instr);
			continue;
		}
		let mut instr: LlvmInstr = if instr.is_vector() {
			instr
		} else {
			Box::new(VecInstr::new(width, None, instr))
		};
		let mut map = HashMap::new();
		for temp in instr.get_read() {
			let VectorShape::Strided(stride) = vecinfo.temp_shape(&temp) else {
				continue;
			};
			let lanes = match ladders.get(&temp) {
				Some(lanes) => lanes.clone(),
				None => {
					let (lanes, def) = ladder(&temp, stride, width, temp_mgr);
					out.push(def);
					ladders.insert(temp.clone(), lanes.clone());
					lanes
				}
			};
			map.insert(temp, Value::Temp(lanes));
		}
		instr.map_temp(&map);
		out.push(instr);
	}
	bb.borrow_mut().instrs = out;
}

// 非 header 的 varying phi 中 strided 的输入在前驱块末尾展开
fn widen_phis(
	func: &LlvmFunc,
	vecinfo: &VectorizationInfo,
	temp_mgr: &mut LlvmTempManager,
) {
	let header_id = vecinfo.region.header_id();
	for bb in vecinfo.region.blocks.iter() {
		if bb.borrow().id == header_id {
			continue;
		}
		let mut bb = bb.borrow_mut();
		for phi in bb.phi_instrs.iter_mut() {
			if !vecinfo.temp_shape(&phi.target).is_vector() {
				continue;
			}
			for (value, label) in phi.source.iter_mut() {
				let Value::Temp(temp) = value else {
					continue;
				};
				let VectorShape::Strided(stride) = vecinfo.temp_shape(temp) else {
					continue;
				};
				let Some(pred) = func.cfg.find_label(label) else {
					continue;
				};
				let (lanes, def) = ladder(temp, stride, vecinfo.width, temp_mgr);
				pred.borrow_mut().instrs.push(def);
				*value = Value::Temp(lanes);
			}
		}
	}
}

pub fn widen(
	func: &mut LlvmFunc,
	vecinfo: &mut VectorizationInfo,
	temp_mgr: &mut LlvmTempManager,
) -> EngineResult<HashMap<i32, i32>> {
	let width = vecinfo.width;
	let header = vecinfo.region.header.clone();
	let header_id = header.borrow().id;
	let region_ids: HashSet<i32> =
		vecinfo.region.blocks.iter().map(|bb| bb.borrow().id).collect();
	let outside: Vec<LlvmNode> = func
		.cfg
		.blocks
		.iter()
		.filter(|bb| !region_ids.contains(&bb.borrow().id))
		.cloned()
		.collect();

	let privates: Vec<(LlvmTemp, RedKind)> = header
		.borrow()
		.phi_instrs
		.iter()
		.filter_map(|phi| match vecinfo.temp_shape(&phi.target) {
			VectorShape::Private(kind) => Some((phi.target.clone(), kind)),
			_ => None,
		})
		.collect();

	// 只有规约结果可以带出循环
	for bb in outside.iter() {
		let bb = bb.borrow();
		let reads = bb
			.phi_instrs
			.iter()
			.flat_map(|phi| phi.get_read())
			.chain(bb.instrs.iter().flat_map(|instr| instr.get_read()))
			.chain(bb.jump_instr.iter().flat_map(|jump| jump.get_read()));
		for temp in reads {
			let shape = vecinfo.temp_shape(&temp);
			if shape == VectorShape::Varying {
				return Err(format!("varying value {} escapes the loop", temp));
			}
		}
	}

	for bb in vecinfo.region.blocks.iter() {
		widen_block(bb, vecinfo, temp_mgr);
	}
	widen_phis(func, vecinfo, temp_mgr);

	if !privates.is_empty() {
		let preheader = header
			.borrow()
			.prev
			.iter()
			.find(|bb| !region_ids.contains(&bb.borrow().id))
			.cloned()
			.ok_or("the loop has no preheader")?;
		let exit = header
			.borrow()
			.succ
			.iter()
			.find(|bb| !region_ids.contains(&bb.borrow().id))
			.cloned()
			.ok_or("the loop does not exit from its header")?;
		let preheader_label = preheader.borrow().label();
		let header_label = header.borrow().label();
		let exit_label = exit.borrow().label();

		// 每个 lane 的部分和从单位元开始，lane 0 带上初值
		let mut reduced = HashMap::new();
		let split = func.new_basicblock();
		let split_label = split.borrow().label();
		for (phi_target, kind) in privates.iter() {
			let var_type = phi_target.var_type;
			let (Some(identity), Some(op)) =
				(kind.identity(var_type), kind.arith_op(var_type))
			else {
				return Err(format!("no {} reduction over {}", kind, var_type));
			};
			let mut header_mut = header.borrow_mut();
			let Some(phi) = header_mut
				.phi_instrs
				.iter_mut()
				.find(|p| p.target == *phi_target)
			else {
				continue;
			};
			let init = phi
				.get_incoming(&preheader_label)
				.cloned()
				.unwrap_or_else(|| identity.clone());
			let seed = temp_mgr.new_temp(var_type, false);
			let mut lanes = vec![init];
			lanes.resize(width as usize, identity);
			preheader.borrow_mut().instrs.push(Box::new(BuildVecInstr {
				target: seed.clone(),
				var_type,
				lanes,
			}));
			phi.set_incoming(&preheader_label, Value::Temp(seed));

			let result = temp_mgr.new_temp(var_type, false);
			split.borrow_mut().instrs.push(Box::new(ReduceInstr {
				target: result.clone(),
				op,
				var_type,
				vector: Value::Temp(phi_target.clone()),
				width,
			}));
			reduced.insert(phi_target.clone(), Value::Temp(result));
		}
		split.borrow_mut().jump_instr = Some(Box::new(JumpInstr {
			target: exit_label.clone(),
		}));
		header
			.borrow_mut()
			.map_jump_label(&HashMap::from([(exit_label, split_label.clone())]));
		exit.borrow_mut().replace_prev_label(&header_label, &split_label);

		for bb in outside.iter() {
			let mut bb = bb.borrow_mut();
			for phi in bb.phi_instrs.iter_mut() {
				phi.map_temp(&reduced);
			}
			for instr in bb.instrs.iter_mut() {
				instr.map_temp(&reduced);
			}
			if let Some(jump) = bb.jump_instr.as_mut() {
				jump.map_temp(&reduced);
			}
		}

		let pos = vecinfo
			.region
			.blocks
			.iter()
			.filter_map(|bb| func.cfg.position(bb.borrow().id))
			.max()
			.map_or(func.cfg.blocks.len(), |p| p + 1);
		func.cfg.blocks.insert(pos, split);
		func
			.cfg
			.resolve_links()
			.map_err(|l| format!("unknown block {}", l))?;
		log::trace!("{}: reduce in {}", header_label, split_label);
	}

	// 改写就地进行，每个块仍是它自己
	let mut block_map: HashMap<i32, i32> =
		region_ids.into_iter().map(|id| (id, id)).collect();
	block_map.insert(header_id, header_id);
	Ok(block_map)
}

use std::collections::{HashMap, HashSet};

use llvm::LlvmTemp;

use crate::{dominator::DomTree, func::LlvmFunc};

// where a temp is defined: block id and position, phis come before every
// instruction and parameters before every block
#[derive(Clone, Copy)]
struct DefSite {
	block: i32,
	pos: i64,
}

impl LlvmFunc {
	/// Structural and SSA checks. Returns the first problem found.
	pub fn verify(&self) -> Result<(), String> {
		let mut labels = HashSet::new();
		for bb in self.cfg.blocks.iter() {
			let bb = bb.borrow();
			if !labels.insert(bb.id) {
				return Err(format!("duplicate block {}", bb.label()));
			}
			let Some(jump) = bb.jump_instr.as_ref() else {
				return Err(format!("block {} has no terminator", bb.label()));
			};
			let succ: Vec<_> = bb.succ.iter().map(|v| v.borrow().label()).collect();
			let targets = jump.get_succ();
			if succ != targets {
				return Err(format!(
					"block {} branches to {:?} but links to {:?}",
					bb.label(),
					targets,
					succ
				));
			}
			for s in bb.succ.iter() {
				if !s.borrow().prev.iter().any(|p| p.borrow().id == bb.id) {
					return Err(format!(
						"{} is missing predecessor {}",
						s.borrow().label(),
						bb.label()
					));
				}
			}
			for p in bb.prev.iter() {
				if !p.borrow().succ.iter().any(|s| s.borrow().id == bb.id) {
					return Err(format!(
						"{} is missing successor {}",
						p.borrow().label(),
						bb.label()
					));
				}
			}
			let preds: HashSet<_> = bb.prev.iter().map(|v| v.borrow().label()).collect();
			for phi in bb.phi_instrs.iter() {
				let incoming: HashSet<_> =
					phi.source.iter().map(|(_, l)| l.clone()).collect();
				if incoming != preds || incoming.len() != phi.source.len() {
					return Err(format!(
						"phi {} in {} does not match the predecessors",
						phi.target,
						bb.label()
					));
				}
			}
		}

		let defs = self.def_sites()?;
		let dom = DomTree::new(&self.cfg, false);
		let reachable: HashSet<i32> = dom
			.dominates
			.get(&self.cfg.get_entry().borrow().id)
			.map(|v| v.iter().map(|bb| bb.borrow().id).collect())
			.unwrap_or_default();
		let available = |temp: &LlvmTemp, block: i32, pos: i64| -> bool {
			if temp.is_global {
				return true;
			}
			match defs.get(temp) {
				Some(site) if site.block == block => site.pos < pos,
				Some(site) => site.block < 0 || dom.dominates(site.block, block),
				None => false,
			}
		};

		for bb in self.cfg.blocks.iter() {
			let bb = bb.borrow();
			if !reachable.contains(&bb.id) {
				continue;
			}
			for phi in bb.phi_instrs.iter() {
				for (value, label) in phi.source.iter() {
					let Some(temp) = value.unwrap_temp() else {
						continue;
					};
					let Some(pred) = bb.prev.iter().find(|p| p.borrow().label() == *label)
					else {
						continue;
					};
					let pred_id = pred.borrow().id;
					if reachable.contains(&pred_id) && !available(&temp, pred_id, i64::MAX)
					{
						return Err(format!(
							"{} used by phi {} is not available from {}",
							temp, phi.target, label
						));
					}
				}
			}
			let instrs = bb.instrs.iter().chain(bb.jump_instr.iter());
			for (pos, instr) in instrs.enumerate() {
				if !instr.type_valid() {
					return Err(format!("ill-typed instruction `{}`", instr));
				}
				for temp in instr.get_read() {
					if !available(&temp, bb.id, pos as i64) {
						return Err(format!(
							"{} used by `{}` is not dominated by its definition",
							temp, instr
						));
					}
				}
			}
		}
		Ok(())
	}

	fn def_sites(&self) -> Result<HashMap<LlvmTemp, DefSite>, String> {
		let mut defs = HashMap::new();
		let mut define = |temp: LlvmTemp, site: DefSite| {
			if defs.insert(temp.clone(), site).is_some() {
				return Err(format!("{} is defined more than once", temp));
			}
			Ok(())
		};
		for param in self.params.iter() {
			define(param.clone(), DefSite { block: -1, pos: 0 })?;
		}
		for bb in self.cfg.blocks.iter() {
			let bb = bb.borrow();
			for phi in bb.phi_instrs.iter() {
				define(phi.target.clone(), DefSite { block: bb.id, pos: -1 })?;
			}
			for (pos, instr) in bb.instrs.iter().enumerate() {
				if let Some(temp) = instr.get_write() {
					define(temp, DefSite { block: bb.id, pos: pos as i64 })?;
				}
			}
		}
		Ok(defs)
	}
}

#[cfg(test)]
mod tests {
	use crate::program::LlvmProgram;

	#[test]
	fn accepts_well_formed() {
		let src = r#"
define i32 @f(i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B1]
  %i.next = add i32 %i, 1
  %c = icmp slt i32 %i.next, %n
  br i32 %c, label %B1, label %B2
B2:
  ret i32 %i.next
}
"#;
		let program = LlvmProgram::parse(src).unwrap();
		assert_eq!(program.funcs[0].verify(), Ok(()));
	}

	#[test]
	fn rejects_use_before_def() {
		let src = r#"
define i32 @f(i32 %n, i32 %a) {
entry:
  br i32 %a, label %B1, label %B2
B1:
  %x = add i32 %n, 1
  br label %B2
B2:
  ret i32 %x
}
"#;
		let program = LlvmProgram::parse(src).unwrap();
		let err = program.funcs[0].verify().unwrap_err();
		assert!(err.contains("%x"), "{}", err);
	}

	#[test]
	fn rejects_bad_phi() {
		let src = r#"
define i32 @f(i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry]
  %i.next = add i32 %i, 1
  %c = icmp slt i32 %i.next, %n
  br i32 %c, label %B1, label %B2
B2:
  ret i32 %i
}
"#;
		let program = LlvmProgram::parse(src).unwrap();
		assert!(program.funcs[0].verify().is_err());
	}
}

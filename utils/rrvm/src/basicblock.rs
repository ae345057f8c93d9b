use std::{cell::RefCell, collections::HashMap, rc::Rc};

use llvm::{JumpInstr, LlvmInstr, LoopMetadata, PhiInstr};
use utils::Label;

pub type LlvmNode = Rc<RefCell<BasicBlock>>;

#[derive(Clone)]
pub struct BasicBlock {
	pub id: i32,
	pub prev: Vec<LlvmNode>,
	pub succ: Vec<LlvmNode>,
	pub phi_instrs: Vec<PhiInstr>,
	pub instrs: Vec<LlvmInstr>,
	pub jump_instr: Option<LlvmInstr>,
	// hints of the loop whose backedge this block's terminator is
	pub loop_md: Option<LoopMetadata>,
}

impl BasicBlock {
	pub fn new(id: i32) -> BasicBlock {
		BasicBlock {
			id,
			prev: Vec::new(),
			succ: Vec::new(),
			phi_instrs: Vec::new(),
			instrs: Vec::new(),
			jump_instr: None,
			loop_md: None,
		}
	}
	pub fn new_node(id: i32) -> LlvmNode {
		Rc::new(RefCell::new(Self::new(id)))
	}
	pub fn label(&self) -> Label {
		utils::to_label(self.id)
	}
	pub fn clear(&mut self) {
		self.prev.clear();
		self.succ.clear();
	}
	pub fn push(&mut self, instr: LlvmInstr) {
		self.instrs.push(instr);
	}
	pub fn push_phi(&mut self, instr: PhiInstr) {
		self.phi_instrs.push(instr);
	}
	pub fn set_jump(&mut self, instr: Option<LlvmInstr>) {
		self.jump_instr = instr;
	}
	/// Unconditional jump to the only successor.
	pub fn gen_jump(&mut self) {
		if let Some(succ) = self.succ.first() {
			let target = succ.borrow().label();
			self.jump_instr = Some(Box::new(JumpInstr { target }));
		}
	}
	pub fn succ_labels(&self) -> Vec<Label> {
		self.jump_instr.iter().flat_map(|v| v.get_succ()).collect()
	}
	pub fn map_jump_label(&mut self, map: &HashMap<Label, Label>) {
		if let Some(jump) = self.jump_instr.as_mut() {
			jump.map_label(map);
		}
	}
	/// Rename the incoming label `old` of every phi to `new`.
	pub fn replace_prev_label(&mut self, old: &Label, new: &Label) {
		let map = HashMap::from([(old.clone(), new.clone())]);
		for phi in self.phi_instrs.iter_mut() {
			llvm::LlvmInstrTrait::map_label(phi, &map);
		}
	}
	pub fn instr_cnt(&self) -> usize {
		self.phi_instrs.len() + self.instrs.len()
	}
}

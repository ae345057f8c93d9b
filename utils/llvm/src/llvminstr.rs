use std::{collections::HashMap, fmt::Display};

use utils::Label;

use crate::{
	llvmop::*, llvmvar::VarType, temp::Temp, LlvmInstr, LlvmInstrVariant,
};

pub trait CloneLlvmInstr {
	fn clone_box(&self) -> LlvmInstr;
}

impl<T> CloneLlvmInstr for T
where
	T: 'static + LlvmInstrTrait + Clone,
{
	fn clone_box(&self) -> LlvmInstr {
		Box::new(self.clone())
	}
}

impl Clone for LlvmInstr {
	fn clone(&self) -> Self {
		self.clone_box()
	}
}

impl std::fmt::Debug for dyn LlvmInstrTrait {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self)
	}
}

pub trait LlvmInstrTrait: Display + CloneLlvmInstr {
	fn get_variant(&self) -> LlvmInstrVariant;
	fn get_read(&self) -> Vec<Temp> {
		self.get_read_values().iter().flat_map(|v| v.unwrap_temp()).collect()
	}
	fn get_read_values(&self) -> Vec<Value> {
		Vec::new()
	}
	fn get_write(&self) -> Option<Temp> {
		None
	}
	fn type_valid(&self) -> bool {
		true
	}
	// 只替换读到的 temp
	fn map_temp(&mut self, _map: &HashMap<Temp, Value>) {}
	// 读写的 temp 都替换
	fn map_all_temp(&mut self, _map: &HashMap<Temp, Temp>) {}
	fn map_label(&mut self, _map: &HashMap<Label, Label>) {}
	fn get_succ(&self) -> Vec<Label> {
		Vec::new()
	}
	fn is_phi(&self) -> bool {
		false
	}
	fn is_ret(&self) -> bool {
		false
	}
	fn is_call(&self) -> bool {
		false
	}
	fn is_load(&self) -> bool {
		false
	}
	fn is_store(&self) -> bool {
		false
	}
	fn is_jump_cond(&self) -> bool {
		false
	}
	fn is_vector(&self) -> bool {
		false
	}
	fn has_side_effect(&self) -> bool {
		self.is_store() || self.is_call()
	}
}

#[derive(Clone, Debug)]
pub struct ArithInstr {
	pub target: Temp,
	pub op: ArithOp,
	pub var_type: VarType,
	pub lhs: Value,
	pub rhs: Value,
}

#[derive(Clone, Debug)]
pub struct CompInstr {
	pub kind: CompKind,
	pub target: Temp,
	pub op: CompOp,
	pub var_type: VarType,
	pub lhs: Value,
	pub rhs: Value,
}

#[derive(Clone, Debug)]
pub struct SelectInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub cond: Value,
	pub lhs: Value,
	pub rhs: Value,
}

#[derive(Clone, Debug)]
pub struct JumpInstr {
	pub target: Label,
}

#[derive(Clone, Debug)]
pub struct JumpCondInstr {
	pub var_type: VarType,
	pub cond: Value,
	pub target_true: Label,
	pub target_false: Label,
}

#[derive(Clone, Debug)]
pub struct PhiInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub source: Vec<(Value, Label)>,
}

#[derive(Clone, Debug)]
pub struct RetInstr {
	pub value: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct StoreInstr {
	pub value: Value,
	pub addr: Value,
}

#[derive(Clone, Debug)]
pub struct LoadInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub addr: Value,
}

#[derive(Clone, Debug)]
pub struct GEPInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub addr: Value,
	pub offset: Value,
}

#[derive(Clone, Debug)]
pub struct CallInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub func: Label,
	pub params: Vec<(VarType, Value)>,
}

impl PhiInstr {
	pub fn new(target: Temp, source: Vec<(Value, Label)>) -> Self {
		Self {
			var_type: target.var_type,
			target,
			source,
		}
	}
	pub fn get_incoming(&self, label: &Label) -> Option<&Value> {
		self.source.iter().find(|(_, l)| l == label).map(|(v, _)| v)
	}
	pub fn set_incoming(&mut self, label: &Label, value: Value) {
		for (v, l) in self.source.iter_mut() {
			if l == label {
				*v = value;
				return;
			}
		}
		self.source.push((value, label.clone()));
	}
	pub fn set_target(&mut self, target: Temp) {
		self.target = target;
	}
}

impl RetInstr {
	pub fn new(value: Option<Value>) -> Self {
		Self { value }
	}
}

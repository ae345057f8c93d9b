use std::{collections::HashMap, fmt::Display};

use utils::Label;

use crate::{
	llvminstr::*,
	llvmop::{LlvmOp, Value},
	llvmvar::VarType,
	temp::Temp,
	utils_llvm::*,
	LlvmInstrVariant,
};

impl Display for ArithInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = {} {} {}, {}",
			self.target, self.op, self.var_type, self.lhs, self.rhs
		)
	}
}

impl LlvmInstrTrait for ArithInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::ArithInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.lhs.clone(), self.rhs.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		all_equal(&[
			&self.var_type,
			&self.op.oprand_type(),
			&self.lhs.get_type(),
			&self.rhs.get_type(),
		])
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.lhs, map);
		map_value(&mut self.rhs, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.lhs, map);
		rename_value(&mut self.rhs, map);
		rename_temp(&mut self.target, map);
	}
}

impl Display for CompInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = {} {} {} {}, {}",
			self.target, self.kind, self.op, self.var_type, self.lhs, self.rhs
		)
	}
}

impl LlvmInstrTrait for CompInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::CompInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.lhs.clone(), self.rhs.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.target.var_type == VarType::I32
			&& all_equal(&[
				&self.var_type,
				&self.kind.oprand_type(),
				&self.op.oprand_type(),
				&self.lhs.get_type(),
				&self.rhs.get_type(),
			])
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.lhs, map);
		map_value(&mut self.rhs, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.lhs, map);
		rename_value(&mut self.rhs, map);
		rename_temp(&mut self.target, map);
	}
}

impl Display for SelectInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = select i32 {}, {} {}, {} {}",
			self.target,
			self.cond,
			self.var_type,
			self.lhs,
			self.var_type,
			self.rhs
		)
	}
}

impl LlvmInstrTrait for SelectInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::SelectInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.cond.clone(), self.lhs.clone(), self.rhs.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.cond.get_type() == VarType::I32
			&& all_equal(&[
				&self.var_type,
				&self.lhs.get_type(),
				&self.rhs.get_type(),
			])
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.cond, map);
		map_value(&mut self.lhs, map);
		map_value(&mut self.rhs, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.cond, map);
		rename_value(&mut self.lhs, map);
		rename_value(&mut self.rhs, map);
		rename_temp(&mut self.target, map);
	}
}

impl Display for JumpInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "br label %{}", self.target)
	}
}

impl LlvmInstrTrait for JumpInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::JumpInstr(self)
	}
	fn map_label(&mut self, map: &HashMap<Label, Label>) {
		rename_label(&mut self.target, map);
	}
	fn get_succ(&self) -> Vec<Label> {
		vec![self.target.clone()]
	}
}

impl Display for JumpCondInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"br {} {}, label %{}, label %{}",
			self.var_type, self.cond, self.target_true, self.target_false
		)
	}
}

impl LlvmInstrTrait for JumpCondInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::JumpCondInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.cond.clone()]
	}
	fn type_valid(&self) -> bool {
		self.var_type == self.cond.get_type()
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.cond, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.cond, map);
	}
	fn map_label(&mut self, map: &HashMap<Label, Label>) {
		rename_label(&mut self.target_true, map);
		rename_label(&mut self.target_false, map);
	}
	fn get_succ(&self) -> Vec<Label> {
		vec![self.target_true.clone(), self.target_false.clone()]
	}
	fn is_jump_cond(&self) -> bool {
		true
	}
}

impl Display for PhiInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let source = self
			.source
			.iter()
			.map(|(value, label)| format!("[{}, %{}]", value, label))
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "{} = phi {} {}", self.target, self.var_type, source)
	}
}

impl LlvmInstrTrait for PhiInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::PhiInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		self.source.iter().map(|(v, _)| v.clone()).collect()
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.source.iter().all(|(v, _)| v.get_type() == self.var_type)
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		self.source.iter_mut().for_each(|(v, _)| map_value(v, map));
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		self.source.iter_mut().for_each(|(v, _)| rename_value(v, map));
		rename_temp(&mut self.target, map);
	}
	fn map_label(&mut self, map: &HashMap<Label, Label>) {
		self.source.iter_mut().for_each(|(_, l)| rename_label(l, map));
	}
	fn is_phi(&self) -> bool {
		true
	}
}

impl Display for RetInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match &self.value {
			Some(value) => write!(f, "ret {} {}", value.get_type(), value),
			None => write!(f, "ret void"),
		}
	}
}

impl LlvmInstrTrait for RetInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::RetInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		self.value.iter().cloned().collect()
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		if let Some(v) = self.value.as_mut() {
			map_value(v, map);
		}
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		if let Some(v) = self.value.as_mut() {
			rename_value(v, map);
		}
	}
	fn is_ret(&self) -> bool {
		true
	}
}

impl Display for StoreInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"store {} {}, {} {}",
			self.value.get_type(),
			self.value,
			self.addr.get_type(),
			self.addr
		)
	}
}

impl LlvmInstrTrait for StoreInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::StoreInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.value.clone(), self.addr.clone()]
	}
	fn type_valid(&self) -> bool {
		self.addr.get_type() == self.value.get_type().to_ptr()
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.value, map);
		map_value(&mut self.addr, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.value, map);
		rename_value(&mut self.addr, map);
	}
	fn is_store(&self) -> bool {
		true
	}
}

impl Display for LoadInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = load {}, {} {}",
			self.target,
			self.var_type,
			self.addr.get_type(),
			self.addr
		)
	}
}

impl LlvmInstrTrait for LoadInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::LoadInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.addr.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.addr.get_type() == self.var_type.to_ptr()
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.addr, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.addr, map);
		rename_temp(&mut self.target, map);
	}
	fn is_load(&self) -> bool {
		true
	}
}

impl Display for GEPInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = getelementptr {}, {} {}, {} {}",
			self.target,
			self.var_type.deref_type(),
			self.addr.get_type(),
			self.addr,
			self.offset.get_type(),
			self.offset
		)
	}
}

impl LlvmInstrTrait for GEPInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::GEPInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.addr.clone(), self.offset.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.var_type.is_ptr()
			&& self.addr.get_type() == self.var_type
			&& self.offset.get_type() == VarType::I32
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.addr, map);
		map_value(&mut self.offset, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.addr, map);
		rename_value(&mut self.offset, map);
		rename_temp(&mut self.target, map);
	}
}

impl Display for CallInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let params = self
			.params
			.iter()
			.map(|(var_type, value)| format!("{} {}", var_type, value))
			.collect::<Vec<_>>()
			.join(", ");
		if self.var_type == VarType::Void {
			write!(f, "call void @{}({})", self.func, params)
		} else {
			write!(
				f,
				"{} = call {} @{}({})",
				self.target, self.var_type, self.func, params
			)
		}
	}
}

impl LlvmInstrTrait for CallInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::CallInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		self.params.iter().map(|(_, v)| v.clone()).collect()
	}
	fn get_write(&self) -> Option<Temp> {
		(self.var_type != VarType::Void).then(|| self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.params.iter().all(|(t, v)| *t == v.get_type())
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		self.params.iter_mut().for_each(|(_, v)| map_value(v, map));
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		self.params.iter_mut().for_each(|(_, v)| rename_value(v, map));
		rename_temp(&mut self.target, map);
	}
	fn is_call(&self) -> bool {
		true
	}
}

// Instructions produced by widening. A temp written by one of them holds one
// value per lane; every other temp holds a single value shared by all lanes.

use std::{collections::HashMap, fmt::Display};

use utils::Label;

use crate::{
	llvminstr::LlvmInstrTrait, llvmop::*, llvmvar::VarType, temp::Temp,
	utils_llvm::*, LlvmInstr, LlvmInstrVariant,
};

/// Runs `inner` once per lane. Lanes whose `mask` lane is zero are skipped
/// and leave their result lane at zero.
#[derive(Clone, Debug)]
pub struct VecInstr {
	pub width: u32,
	pub mask: Option<Value>,
	pub inner: LlvmInstr,
}

/// `base + lane * stride` for every lane; for pointers the stride counts
/// elements.
#[derive(Clone, Debug)]
pub struct LadderInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub base: Value,
	pub stride: i32,
	pub width: u32,
}

#[derive(Clone, Debug)]
pub struct BuildVecInstr {
	pub target: Temp,
	pub var_type: VarType,
	pub lanes: Vec<Value>,
}

/// Horizontal reduction of all lanes of `vector` with `op`.
#[derive(Clone, Debug)]
pub struct ReduceInstr {
	pub target: Temp,
	pub op: ArithOp,
	pub var_type: VarType,
	pub vector: Value,
	pub width: u32,
}

impl VecInstr {
	pub fn new(width: u32, mask: Option<Value>, inner: LlvmInstr) -> Self {
		Self { width, mask, inner }
	}
}

impl Display for VecInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match &self.mask {
			Some(mask) => write!(f, "vec<{}, {}> {}", self.width, mask, self.inner),
			None => write!(f, "vec<{}> {}", self.width, self.inner),
		}
	}
}

impl LlvmInstrTrait for VecInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::VecInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		let mut values = self.inner.get_read_values();
		values.extend(self.mask.iter().cloned());
		values
	}
	fn get_write(&self) -> Option<Temp> {
		self.inner.get_write()
	}
	fn type_valid(&self) -> bool {
		self.inner.type_valid()
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		self.inner.map_temp(map);
		if let Some(mask) = self.mask.as_mut() {
			map_value(mask, map);
		}
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		self.inner.map_all_temp(map);
		if let Some(mask) = self.mask.as_mut() {
			rename_value(mask, map);
		}
	}
	fn map_label(&mut self, map: &HashMap<Label, Label>) {
		self.inner.map_label(map);
	}
	fn is_load(&self) -> bool {
		self.inner.is_load()
	}
	fn is_store(&self) -> bool {
		self.inner.is_store()
	}
	fn is_call(&self) -> bool {
		self.inner.is_call()
	}
	fn is_vector(&self) -> bool {
		true
	}
}

impl Display for LadderInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = ladder {} {}, {} x {}",
			self.target, self.var_type, self.base, self.stride, self.width
		)
	}
}

impl LlvmInstrTrait for LadderInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::LadderInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.base.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.base.get_type() == self.var_type
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.base, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.base, map);
		rename_temp(&mut self.target, map);
	}
	fn is_vector(&self) -> bool {
		true
	}
}

impl Display for BuildVecInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let lanes = self
			.lanes
			.iter()
			.map(|v| v.to_string())
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "{} = buildvec {} [{}]", self.target, self.var_type, lanes)
	}
}

impl LlvmInstrTrait for BuildVecInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::BuildVecInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		self.lanes.clone()
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.lanes.iter().all(|v| v.get_type() == self.var_type)
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		self.lanes.iter_mut().for_each(|v| map_value(v, map));
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		self.lanes.iter_mut().for_each(|v| rename_value(v, map));
		rename_temp(&mut self.target, map);
	}
	fn is_vector(&self) -> bool {
		true
	}
}

impl Display for ReduceInstr {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{} = reduce {} {} {} x {}",
			self.target, self.op, self.var_type, self.vector, self.width
		)
	}
}

impl LlvmInstrTrait for ReduceInstr {
	fn get_variant(&self) -> LlvmInstrVariant {
		LlvmInstrVariant::ReduceInstr(self)
	}
	fn get_read_values(&self) -> Vec<Value> {
		vec![self.vector.clone()]
	}
	fn get_write(&self) -> Option<Temp> {
		Some(self.target.clone())
	}
	fn type_valid(&self) -> bool {
		self.vector.get_type() == self.var_type
			&& self.op.oprand_type() == self.var_type
	}
	fn map_temp(&mut self, map: &HashMap<Temp, Value>) {
		map_value(&mut self.vector, map);
	}
	fn map_all_temp(&mut self, map: &HashMap<Temp, Temp>) {
		rename_value(&mut self.vector, map);
		rename_temp(&mut self.target, map);
	}
}

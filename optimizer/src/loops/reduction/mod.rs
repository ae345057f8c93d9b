// 识别循环 header 中 phi 所在的 use-def 环：
// 只由 +c / -c 组成的环是步长固定的归纳变量，其余的按结合运算归类为规约

mod tarjan;

use std::{
	collections::{HashMap, HashSet},
	fmt::Display,
};

use llvm::{ArithOp, LlvmInstrVariant, LlvmTemp, Value, VarType};
use loopvec_derive::LowerDisplay;
use rrvm::{func::LlvmFunc, rrvm_loop::LoopPtr};

use super::{shape::VectorShape, temp_graph::TempGraph};

pub use tarjan::TarjanVar;

#[derive(LowerDisplay, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RedKind {
	// not an associative recurrence
	Bot,
	Add,
	Mul,
	And,
	Or,
	Xor,
	// several different operators feed the same phi
	Top,
}

impl RedKind {
	pub fn from_op(op: ArithOp) -> Self {
		match op {
			ArithOp::Add | ArithOp::Fadd => RedKind::Add,
			ArithOp::Mul | ArithOp::Fmul => RedKind::Mul,
			ArithOp::And => RedKind::And,
			ArithOp::Or => RedKind::Or,
			ArithOp::Xor => RedKind::Xor,
			_ => RedKind::Bot,
		}
	}

	pub fn join(self, other: Self) -> Self {
		match (self, other) {
			(RedKind::Bot, _) | (_, RedKind::Bot) => RedKind::Bot,
			(a, b) if a == b => a,
			_ => RedKind::Top,
		}
	}

	pub fn is_supported(&self) -> bool {
		!matches!(self, RedKind::Bot | RedKind::Top)
	}

	/// The operator combining two partial results of type `var_type`.
	pub fn arith_op(&self, var_type: VarType) -> Option<ArithOp> {
		let float = var_type == VarType::F32;
		match (self, float) {
			(RedKind::Add, false) => Some(ArithOp::Add),
			(RedKind::Add, true) => Some(ArithOp::Fadd),
			(RedKind::Mul, false) => Some(ArithOp::Mul),
			(RedKind::Mul, true) => Some(ArithOp::Fmul),
			(RedKind::And, false) => Some(ArithOp::And),
			(RedKind::Or, false) => Some(ArithOp::Or),
			(RedKind::Xor, false) => Some(ArithOp::Xor),
			_ => None,
		}
	}

	pub fn identity(&self, var_type: VarType) -> Option<Value> {
		match (self, var_type) {
			(RedKind::Add, VarType::I32) => Some(Value::Int(0)),
			(RedKind::Add, VarType::F32) => Some(Value::Float(0.0)),
			(RedKind::Mul, VarType::I32) => Some(Value::Int(1)),
			(RedKind::Mul, VarType::F32) => Some(Value::Float(1.0)),
			(RedKind::And, VarType::I32) => Some(Value::Int(-1)),
			(RedKind::Or, VarType::I32) | (RedKind::Xor, VarType::I32) => {
				Some(Value::Int(0))
			}
			_ => None,
		}
	}
}

pub struct Reduction {
	pub phi: LlvmTemp,
	// the phi and every instruction of its recurrence
	pub elements: HashSet<LlvmTemp>,
	pub kind: RedKind,
	pub var_type: VarType,
	// an instruction inside the loop that reads an element but is not one
	pub foreign_user: Option<String>,
}

pub struct StridePattern {
	pub phi: LlvmTemp,
	pub elements: HashSet<LlvmTemp>,
	pub stride: i32,
}

impl Reduction {
	pub fn get_shape(&self) -> VectorShape {
		VectorShape::Private(self.kind)
	}
}

impl StridePattern {
	pub fn get_shape(&self) -> VectorShape {
		VectorShape::strided(self.stride)
	}
}

fn sorted_names(elements: &HashSet<LlvmTemp>) -> String {
	let mut names: Vec<_> = elements.iter().collect();
	names.sort();
	names.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

impl Display for Reduction {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"Reduction {{ phi: {}, kind: {}, elements: [{}] }}",
			self.phi,
			self.kind,
			sorted_names(&self.elements)
		)
	}
}

impl Display for StridePattern {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"StridePattern {{ phi: {}, stride: {}, elements: [{}] }}",
			self.phi,
			self.stride,
			sorted_names(&self.elements)
		)
	}
}

#[derive(Default)]
pub struct ReductionAnalysis {
	reductions: HashMap<LlvmTemp, Reduction>,
	strides: HashMap<LlvmTemp, StridePattern>,
}

impl ReductionAnalysis {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn analyze(
		&mut self,
		loop_: &LoopPtr,
		func: &LlvmFunc,
		loop_map: &HashMap<i32, LoopPtr>,
	) {
		let blocks = loop_.borrow().blocks(&func.cfg, loop_map);
		let graph = TempGraph::new(&blocks);
		let header = loop_.borrow().header.clone();
		let phis: Vec<_> = header
			.borrow()
			.phi_instrs
			.iter()
			.map(|phi| (phi.target.clone(), phi.var_type))
			.collect();

		let header_phis: HashSet<LlvmTemp> =
			phis.iter().map(|(phi, _)| phi.clone()).collect();

		let mut tarjan = TarjanVar::new();
		for (phi, var_type) in phis {
			tarjan.run(&graph, &phi);
			let Some(scc) = tarjan.scc(&phi) else {
				continue;
			};
			let elements: HashSet<LlvmTemp> = scc.iter().cloned().collect();
			// phi 不在环上
			if elements.len() == 1 && !graph.get_use_temps(&phi).contains(&phi) {
				log::trace!("{} has no recurrence", phi);
				continue;
			}
			if let Some(stride) = match_stride(&graph, &phi, &elements, var_type) {
				let pattern = StridePattern {
					phi: phi.clone(),
					elements,
					stride,
				};
				log::trace!("{}", pattern);
				self.strides.insert(phi, pattern);
				continue;
			}
			// 两个 header phi 互相依赖，不是单个累加器
			let coupled = elements.iter().any(|e| *e != phi && header_phis.contains(e));
			let kind = if coupled {
				RedKind::Bot
			} else {
				match_reduction(&graph, &phi, &elements)
			};
			let foreign_user = elements.iter().find_map(|e| {
				graph
					.get_users(e)
					.iter()
					.find(|site| !site.target().is_some_and(|t| elements.contains(&t)))
					.map(|site| site.instr.to_string())
			});
			let reduction = Reduction {
				phi: phi.clone(),
				elements,
				kind,
				var_type,
				foreign_user,
			};
			log::trace!("{}", reduction);
			self.reductions.insert(phi, reduction);
		}
	}

	pub fn get_reduction(&self, phi: &LlvmTemp) -> Option<&Reduction> {
		self.reductions.get(phi)
	}

	pub fn get_stride(&self, phi: &LlvmTemp) -> Option<&StridePattern> {
		self.strides.get(phi)
	}

	/// Follow the recurrences into a copy of the loop whose temps were
	/// renamed through `map`.
	pub fn update_for_clones(&mut self, map: &HashMap<LlvmTemp, LlvmTemp>) {
		let rename = |t: &LlvmTemp| map.get(t).cloned().unwrap_or_else(|| t.clone());
		self.reductions = self
			.reductions
			.drain()
			.map(|(_, mut red)| {
				red.phi = rename(&red.phi);
				red.elements = red.elements.iter().map(rename).collect();
				(red.phi.clone(), red)
			})
			.collect();
		self.strides = self
			.strides
			.drain()
			.map(|(_, mut pat)| {
				pat.phi = rename(&pat.phi);
				pat.elements = pat.elements.iter().map(rename).collect();
				(pat.phi.clone(), pat)
			})
			.collect();
	}
}

// 环上除 phi 以外只有 add/sub 常数
fn match_stride(
	graph: &TempGraph,
	phi: &LlvmTemp,
	elements: &HashSet<LlvmTemp>,
	var_type: VarType,
) -> Option<i32> {
	if var_type != VarType::I32 {
		return None;
	}
	let mut stride: i32 = 0;
	for temp in elements.iter().filter(|t| *t != phi) {
		let LlvmInstrVariant::ArithInstr(arith) = graph.get_instr(temp)?.get_variant()
		else {
			return None;
		};
		let in_scc = |v: &Value| v.unwrap_temp().is_some_and(|t| elements.contains(&t));
		let step = match (arith.op, &arith.lhs, &arith.rhs) {
			(ArithOp::Add, l, Value::Int(c)) if in_scc(l) => *c,
			(ArithOp::Add, Value::Int(c), r) if in_scc(r) => *c,
			(ArithOp::Sub, l, Value::Int(c)) if in_scc(l) => c.checked_neg()?,
			_ => return None,
		};
		stride = stride.checked_add(step)?;
	}
	Some(stride)
}

fn match_reduction(
	graph: &TempGraph,
	phi: &LlvmTemp,
	elements: &HashSet<LlvmTemp>,
) -> RedKind {
	let in_scc = |v: &Value| v.unwrap_temp().is_some_and(|t| elements.contains(&t));
	let mut kind: Option<RedKind> = None;
	for temp in elements.iter().filter(|t| *t != phi) {
		let Some(instr) = graph.get_instr(temp) else {
			return RedKind::Bot;
		};
		let element_kind = match instr.get_variant() {
			// 只是传递值
			LlvmInstrVariant::PhiInstr(_) => None,
			LlvmInstrVariant::SelectInstr(select) if !in_scc(&select.cond) => None,
			LlvmInstrVariant::ArithInstr(arith) => {
				match (arith.op, in_scc(&arith.lhs), in_scc(&arith.rhs)) {
					(_, true, true) => Some(RedKind::Bot),
					(ArithOp::Sub | ArithOp::Fsub, true, false) => Some(RedKind::Add),
					(ArithOp::Sub | ArithOp::Fsub, false, true) => Some(RedKind::Bot),
					(op, _, _) => Some(RedKind::from_op(op)),
				}
			}
			_ => Some(RedKind::Bot),
		};
		if let Some(element_kind) = element_kind {
			kind = Some(match kind {
				Some(kind) => kind.join(element_kind),
				None => element_kind,
			});
		}
	}
	kind.unwrap_or(RedKind::Bot)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rrvm::{dominator::DomTree, program::LlvmProgram};

	fn analyze(src: &str) -> (LlvmProgram, ReductionAnalysis) {
		let program = LlvmProgram::parse(src).unwrap();
		let func = &program.funcs[0];
		let dom = DomTree::new(&func.cfg, false);
		let (root, loop_map) = func.cfg.loop_analysis(&dom);
		let loop_ = root.borrow().subloops[0].clone();
		let mut reda = ReductionAnalysis::new();
		reda.analyze(&loop_, func, &loop_map);
		(program, reda)
	}

	fn temp(name: &str, var_type: VarType) -> LlvmTemp {
		LlvmTemp::new(name, var_type, false)
	}

	const KINDS: &str = r#"
define i32 @f(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [0, %entry], [%s.next, %B2]
  %p = phi i32 [1, %entry], [%p.next, %B2]
  %m = phi i32 [0, %entry], [%m.next, %B2]
  %q = phi i32 [0, %entry], [%q.next, %B2]
  %d = phi i32 [100, %entry], [%d.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %i.1 = add i32 %i, 3
  %i.next = sub i32 %i.1, 1
  %s.1 = add i32 %s, %x
  %s.next = sub i32 %s.1, %x
  %p.next = mul i32 %x, %p
  %m.1 = add i32 %m, %x
  %m.next = mul i32 %m.1, 2
  %q.next = mul i32 %q, %q
  %d.next = sub i32 %x, %d
  br label %B1
B3:
  ret i32 %s
}
"#;

	#[test]
	fn classify_recurrences() {
		let (_, reda) = analyze(KINDS);
		let i = reda.get_stride(&temp("i", VarType::I32)).unwrap();
		assert_eq!(i.stride, 2);
		assert_eq!(i.elements.len(), 3);
		assert!(reda.get_reduction(&temp("i", VarType::I32)).is_none());

		let kind = |name: &str| reda.get_reduction(&temp(name, VarType::I32)).unwrap().kind;
		assert_eq!(kind("s"), RedKind::Add);
		assert_eq!(kind("p"), RedKind::Mul);
		assert_eq!(kind("m"), RedKind::Top);
		assert_eq!(kind("q"), RedKind::Bot);
		assert_eq!(kind("d"), RedKind::Bot);
		let s = reda.get_reduction(&temp("s", VarType::I32)).unwrap();
		assert!(s.foreign_user.is_none());
		assert_eq!(s.get_shape(), VectorShape::Private(RedKind::Add));
	}

	#[test]
	fn foreign_users_and_plain_phis() {
		let src = r#"
define void @f(i32* %a, i32 %n, i32 %k) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi f32 [0.0, %entry], [%s.next, %B2]
  %u = phi i32 [%k, %entry], [%k, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %s.next = fadd f32 %s, 1.5
  %addr = getelementptr i32, i32* %a, i32 %i
  %t = add i32 %i, 1
  store i32 %t, i32* %addr
  %i.next = add i32 %i, 1
  br label %B1
B3:
  ret void
}
"#;
		let (_, reda) = analyze(src);
		let s = reda.get_reduction(&temp("s", VarType::F32)).unwrap();
		assert_eq!(s.kind, RedKind::Add);
		assert!(s.foreign_user.is_none());
		// the induction is used outside its own chain, which is fine for strides
		assert_eq!(reda.get_stride(&temp("i", VarType::I32)).unwrap().stride, 1);
		assert!(reda.get_reduction(&temp("u", VarType::I32)).is_none());
		assert!(reda.get_stride(&temp("u", VarType::I32)).is_none());
	}

	#[test]
	fn escaping_partial_sum() {
		let src = r#"
define void @f(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [0, %entry], [%s.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %s.next = add i32 %s, %i
  %addr = getelementptr i32, i32* %a, i32 %i
  store i32 %s.next, i32* %addr
  %i.next = add i32 %i, 1
  br label %B1
B3:
  ret void
}
"#;
		let (_, mut reda) = analyze(src);
		let s = reda.get_reduction(&temp("s", VarType::I32)).unwrap();
		assert_eq!(
			s.foreign_user.as_deref(),
			Some("store i32 %s.next, i32* %addr")
		);

		let map = HashMap::from([
			(temp("s", VarType::I32), temp("20", VarType::I32)),
			(temp("s.next", VarType::I32), temp("21", VarType::I32)),
		]);
		reda.update_for_clones(&map);
		let s = reda.get_reduction(&temp("20", VarType::I32)).unwrap();
		assert!(s.elements.contains(&temp("21", VarType::I32)));
		assert!(reda.get_reduction(&temp("s", VarType::I32)).is_none());
		assert!(reda.get_stride(&temp("i", VarType::I32)).is_some());
	}

	#[test]
	fn kind_lattice() {
		assert_eq!(RedKind::Add.join(RedKind::Add), RedKind::Add);
		assert_eq!(RedKind::Add.join(RedKind::Mul), RedKind::Top);
		assert_eq!(RedKind::Top.join(RedKind::Bot), RedKind::Bot);
		assert_eq!(RedKind::And.identity(VarType::I32), Some(Value::Int(-1)));
		assert_eq!(RedKind::Add.arith_op(VarType::F32), Some(ArithOp::Fadd));
		assert_eq!(RedKind::Xor.arith_op(VarType::F32), None);
		assert_eq!(RedKind::Top.to_string(), "top");
	}

	#[test]
	fn coupled_phis_are_not_reductions() {
		let src = r#"
define i32 @fib(i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %a = phi i32 [0, %entry], [%b, %B2]
  %b = phi i32 [1, %entry], [%b.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %b.next = add i32 %a, %b
  %i.next = add i32 %i, 1
  br label %B1
B3:
  ret i32 %a
}
"#;
		let (_, reda) = analyze(src);
		for name in ["a", "b"] {
			let red = reda.get_reduction(&temp(name, VarType::I32)).unwrap();
			assert_eq!(red.kind, RedKind::Bot, "{}", name);
		}
	}
}

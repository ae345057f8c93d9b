use std::collections::{HashMap, HashSet};

use llvm::LlvmTemp;

use crate::loops::temp_graph::TempGraph;

pub struct TarjanVar {
	// dfs 过程中，访问到的次序
	pub dfsnum: HashMap<LlvmTemp, i32>,
	pub next_dfsnum: i32,
	pub visited: HashSet<LlvmTemp>,
	// Tarjan 算法计算强连通分量时，需要用到的值
	pub low: HashMap<LlvmTemp, i32>,
	pub stack: Vec<LlvmTemp>,
	pub in_stack: HashSet<LlvmTemp>,
	// 每个变量所在的 scc
	pub scc_of: HashMap<LlvmTemp, usize>,
	pub sccs: Vec<Vec<LlvmTemp>>,
}

impl TarjanVar {
	pub fn new() -> Self {
		Self {
			dfsnum: HashMap::new(),
			next_dfsnum: 0,
			visited: HashSet::new(),
			low: HashMap::new(),
			stack: Vec::new(),
			in_stack: HashSet::new(),
			scc_of: HashMap::new(),
			sccs: Vec::new(),
		}
	}

	/// Strongly connected components of the operand graph reachable from
	/// `start`. Edges go from a temp to the temps its definition reads.
	pub fn run(&mut self, graph: &TempGraph, start: &LlvmTemp) {
		if !self.visited.contains(start) {
			self.tarjan(graph, start.clone());
		}
	}

	pub fn scc(&self, temp: &LlvmTemp) -> Option<&Vec<LlvmTemp>> {
		self.scc_of.get(temp).map(|id| &self.sccs[*id])
	}

	fn tarjan(&mut self, graph: &TempGraph, temp: LlvmTemp) {
		self.visited.insert(temp.clone());
		self.dfsnum.insert(temp.clone(), self.next_dfsnum);
		self.low.insert(temp.clone(), self.next_dfsnum);
		self.next_dfsnum += 1;
		self.stack.push(temp.clone());
		self.in_stack.insert(temp.clone());

		for operand in graph.get_use_temps(&temp) {
			if !self.visited.contains(&operand) {
				self.tarjan(graph, operand.clone());
				let low = self.low[&temp].min(self.low[&operand]);
				self.low.insert(temp.clone(), low);
			} else if self.in_stack.contains(&operand) {
				let low = self.low[&temp].min(self.dfsnum[&operand]);
				self.low.insert(temp.clone(), low);
			}
		}

		if self.dfsnum[&temp] == self.low[&temp] {
			let mut scc = Vec::new();
			while let Some(top) = self.stack.pop() {
				self.in_stack.remove(&top);
				self.scc_of.insert(top.clone(), self.sccs.len());
				let done = top == temp;
				scc.push(top);
				if done {
					break;
				}
			}
			self.sccs.push(scc);
		}
	}
}

// 外层循环向量化：
// gate -> 选择宽度 -> 余数变换 -> 分类 header phi -> 引擎 -> verify
// 对每个顶层循环尝试，失败则依次尝试它的子循环，成功后不再进入其子循环

pub mod annotations;
mod classify;
pub mod config;
pub mod gate;
mod impls;
pub mod report;
mod width;

use llvm::LlvmTempManager;
use rrvm::{func::LlvmFunc, program::LlvmProgram, rrvm_loop::LoopPtr};
use utils::{Label, Result, RvError};

use self::{
	annotations::{
		clear_vectorize_annotations, dep_dist_to_string, set_loop_annotation,
		LoopMD,
	},
	config::VectorizerConfig,
	report::Reporter,
};
use super::{
	cost_model::{CostModel, PlatformInfo, TargetCostModel},
	engine::{BasicEngine, VectorizationInfo, VectorizerEngine},
	loop_data::LoopData,
	reduction::ReductionAnalysis,
	region::LoopRegion,
	rem_transform::RemainderTransform,
	shape::VectorShape,
};

pub use gate::SkipReason;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopOutcome {
	Vectorized { width: u32 },
	// shape prepared, body left scalar
	Prepared { width: u32 },
	Skipped(SkipReason),
}

impl LoopOutcome {
	pub fn is_changed(&self) -> bool {
		!matches!(self, LoopOutcome::Skipped(_))
	}
}

/// State shared by every function of one run.
pub struct RunContext {
	pub config: VectorizerConfig,
	pub reporter: Reporter,
	banner_printed: bool,
	// (function, loop header, outcome) in the order the loops were visited
	pub outcomes: Vec<(String, Label, LoopOutcome)>,
}

impl RunContext {
	pub fn new(config: VectorizerConfig) -> Self {
		Self {
			reporter: Reporter::new(config.diagnostics),
			config,
			banner_printed: false,
			outcomes: Vec::new(),
		}
	}
}

pub struct LoopVectorizer {
	pub ctx: RunContext,
	cost_model: Box<dyn CostModel>,
	engine: Box<dyn VectorizerEngine>,
}

impl LoopVectorizer {
	pub fn with_config(config: VectorizerConfig) -> Self {
		let platform = PlatformInfo::new(config.max_vector_bits);
		Self::with_parts(
			config,
			Box::new(TargetCostModel::new(platform)),
			Box::new(BasicEngine::new()),
		)
	}

	pub fn with_parts(
		config: VectorizerConfig,
		cost_model: Box<dyn CostModel>,
		engine: Box<dyn VectorizerEngine>,
	) -> Self {
		Self {
			ctx: RunContext::new(config),
			cost_model,
			engine,
		}
	}

	pub fn reporter(&self) -> &Reporter {
		&self.ctx.reporter
	}

	pub fn outcomes(&self) -> &[(String, Label, LoopOutcome)] {
		&self.ctx.outcomes
	}

	pub fn run_program(&mut self, program: &mut LlvmProgram) -> Result<bool> {
		if self.ctx.config.disabled {
			log::debug!("loop vectorizer disabled");
			return Ok(false);
		}
		let mut changed = false;
		for func in program.funcs.iter_mut() {
			changed |= self.run(func, &mut program.temp_mgr)?;
		}
		Ok(changed)
	}

	/// Vectorize the loops of `func`. Returns whether any loop changed.
	pub fn run(
		&mut self,
		func: &mut LlvmFunc,
		temp_mgr: &mut LlvmTempManager,
	) -> Result<bool> {
		if self.ctx.config.disabled {
			return Ok(false);
		}
		self.ctx.reporter.diag(format!("run on {}", func.name));
		if self.ctx.config.print_function {
			self.ctx.reporter.report(format!("-- loop vectorizer --\n{}", func));
		}
		let mut vectorizer = FuncVectorizer {
			func,
			temp_mgr,
			loopdata: LoopData::new(),
			ctx: &mut self.ctx,
			cost_model: self.cost_model.as_ref(),
			engine: self.engine.as_mut(),
		};
		let root = vectorizer.loopdata.root_loop(vectorizer.func);
		let headers = subloop_headers(&root);
		let mut changed = false;
		for header in headers {
			changed |= vectorizer.vectorize_loop_or_subloops(header)?;
		}
		Ok(changed)
	}
}

fn subloop_headers(loop_: &LoopPtr) -> Vec<i32> {
	loop_
		.borrow()
		.subloops
		.iter()
		.map(|l| l.borrow().header_id())
		.collect()
}

// 循环用 header 的编号标识，cfg 改变后旧的 LoopPtr 不再可用
struct FuncVectorizer<'a> {
	func: &'a mut LlvmFunc,
	temp_mgr: &'a mut LlvmTempManager,
	loopdata: LoopData,
	ctx: &'a mut RunContext,
	cost_model: &'a dyn CostModel,
	engine: &'a mut dyn VectorizerEngine,
}

impl<'a> FuncVectorizer<'a> {
	fn vectorize_loop_or_subloops(&mut self, header_id: i32) -> Result<bool> {
		let Some(loop_) = self.loopdata.find_loop(self.func, header_id) else {
			return Ok(false);
		};
		let subloops = subloop_headers(&loop_);
		let outcome = self.vectorize_loop(&loop_)?;
		let changed = outcome.is_changed();
		self.ctx.outcomes.push((
			self.func.name.clone(),
			utils::to_label(header_id),
			outcome,
		));
		if changed {
			return Ok(true);
		}
		let mut changed = false;
		for header in subloops {
			changed |= self.vectorize_loop_or_subloops(header)?;
		}
		Ok(changed)
	}

	fn skip(&mut self, loop_: &LoopPtr, reason: SkipReason) -> LoopOutcome {
		self
			.ctx
			.reporter
			.diag(format!("skip {}: {}", loop_.borrow().name(), reason));
		LoopOutcome::Skipped(reason)
	}

	fn vectorize_loop(&mut self, loop_: &LoopPtr) -> Result<LoopOutcome> {
		let func = &*self.func;
		let name = loop_.borrow().name();
		let header_id = loop_.borrow().header_id();
		let loop_map = self.loopdata.loop_map(func).clone();

		let gate = match gate::check_loop(loop_, func, &loop_map) {
			Ok(gate) => gate,
			Err(reason) => return Ok(self.skip(loop_, reason)),
		};
		self.ctx.reporter.diag(&gate.annot);
		let trip_align = width::trip_alignment(loop_, func, &loop_map);

		let loopdata = &mut self.loopdata;
		let width = width::select_width(
			&gate.annot,
			gate.dep_dist,
			&self.ctx.config,
			self.cost_model,
			|| LoopRegion::new(loop_, func, loopdata),
			&mut self.ctx.reporter,
		);
		let width = match width {
			Ok(width) => width,
			Err(reason) => return Ok(self.skip(loop_, reason)),
		};
		self.ctx.reporter.report(format!(
			"Vectorize {} in {} with VW: {} , Dependence Distance: {} and TripAlignment: {}",
			name,
			func.name,
			width,
			dep_dist_to_string(gate.dep_dist),
			trip_align
		));

		let mut reda = ReductionAnalysis::new();
		reda.analyze(loop_, func, &loop_map);
		let plan = RemainderTransform::new(func, &mut self.loopdata, self.temp_mgr)
			.plan(loop_, width, trip_align, &reda);
		let plan = match plan {
			Ok(plan) => plan,
			Err(shape) => return Ok(self.skip(loop_, SkipReason::Shape(shape))),
		};
		if plan.is_split() {
			reda.update_for_clones(&plan.temp_map());
		}
		let shapes =
			match classify::classify_header_phis(&plan.header_phis(), &reda) {
				Ok(shapes) => shapes,
				Err(reason) => return Ok(self.skip(loop_, reason)),
			};

		// 从这里开始修改 cfg，之后的失败都是致命错误
		let prepared = plan.commit(self.func)?;
		self.loopdata.invalidate();
		let (original, vector_loop) = self.refind(header_id, prepared.header)?;
		let loop_map = self.loopdata.loop_map(self.func).clone();
		set_loop_annotation(
			&original,
			&loop_map,
			&LoopMD {
				already_vectorized: Some(true),
				..LoopMD::default()
			},
		);
		clear_vectorize_annotations(&vector_loop, &loop_map);
		set_loop_annotation(
			&vector_loop,
			&loop_map,
			&LoopMD {
				already_vectorized: Some(true),
				..LoopMD::default()
			},
		);

		if !self.ctx.banner_printed {
			let banner = format!("config: {}", self.ctx.config);
			self.ctx.reporter.report(banner);
			self.ctx.banner_printed = true;
		}
		if self.ctx.config.emit_prepared {
			return Ok(LoopOutcome::Prepared { width });
		}

		let region = LoopRegion::new(&vector_loop, self.func, &mut self.loopdata);
		let mut vecinfo = VectorizationInfo::new(width, region);
		for (phi, shape) in shapes {
			vecinfo.pin(phi, shape);
		}
		for temp in prepared.uniform_overrides {
			vecinfo.pin(temp, VectorShape::Uniform);
		}
		self.lower(&name, &mut vecinfo)?;
		self
			.func
			.verify()
			.map_err(|reason| RvError::VerifyError {
				func: self.func.name.clone(),
				reason,
			})?;
		self.loopdata.invalidate();
		log::info!(
			"vectorized {} in {} with width {}",
			name,
			self.func.name,
			width
		);
		Ok(LoopOutcome::Vectorized { width })
	}

	fn refind(
		&mut self,
		original: i32,
		prepared: i32,
	) -> Result<(LoopPtr, LoopPtr)> {
		let lost = |id: i32| RvError::VerifyError {
			func: self.func.name.clone(),
			reason: format!("loop {} disappeared", utils::to_label(id)),
		};
		let original_loop = self.loopdata.find_loop(self.func, original);
		let prepared_loop = self.loopdata.find_loop(self.func, prepared);
		Ok((
			original_loop.ok_or_else(|| lost(original))?,
			prepared_loop.ok_or_else(|| lost(prepared))?,
		))
	}

	fn lower(
		&mut self,
		loop_name: &Label,
		vecinfo: &mut VectorizationInfo,
	) -> Result<()> {
		let func_name = self.func.name.clone();
		let failure = |reason: String| RvError::EngineFailure {
			func: func_name.clone(),
			loop_name: loop_name.to_string(),
			reason,
		};
		self.engine.analyze(self.func, vecinfo).map_err(failure)?;
		self
			.engine
			.linearize(self.func, vecinfo, self.temp_mgr)
			.map_err(failure)?;
		let block_map = self
			.engine
			.vectorize(self.func, vecinfo, self.temp_mgr)
			.map_err(failure)?;
		log::trace!("{}: vector blocks {:?}", loop_name, block_map);
		Ok(())
	}
}

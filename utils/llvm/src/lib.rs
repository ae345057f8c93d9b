pub mod llvminstr;
pub mod llvmop;
pub mod llvmvar;
pub mod metadata;
pub mod parser;
pub mod temp;
pub mod vecinstr;

mod impls;
mod utils_llvm;

pub use llvminstr::*;
pub use llvmop::*;
pub use llvmvar::*;
pub use metadata::LoopMetadata;
pub use vecinstr::*;

pub type LlvmTemp = temp::Temp;
pub type LlvmTempManager = temp::TempManager;
pub type LlvmInstr = Box<dyn LlvmInstrTrait>;

pub enum LlvmInstrVariant<'a> {
	ArithInstr(&'a ArithInstr),
	CompInstr(&'a CompInstr),
	SelectInstr(&'a SelectInstr),
	JumpInstr(&'a JumpInstr),
	JumpCondInstr(&'a JumpCondInstr),
	PhiInstr(&'a PhiInstr),
	RetInstr(&'a RetInstr),
	StoreInstr(&'a StoreInstr),
	LoadInstr(&'a LoadInstr),
	GEPInstr(&'a GEPInstr),
	CallInstr(&'a CallInstr),
	VecInstr(&'a VecInstr),
	LadderInstr(&'a LadderInstr),
	BuildVecInstr(&'a BuildVecInstr),
	ReduceInstr(&'a ReduceInstr),
}

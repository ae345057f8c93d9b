// 向量化前后在 simulator 中执行结果一致

use llvm::LlvmInstrTrait;
use optimizer::{LoopVectorizer, VectorizerConfig};
use proptest::prelude::*;
use rrvm::program::LlvmProgram;
use simulator::{LaneSimulator, StackValue};

const SUM: &str = r#"
define i32 @sum(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [5, %entry], [%s.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %s.next = add i32 %s, %x
  %i.next = add i32 %i, 1
  br label %B1, !loop {llvm.loop.vectorize.enable = 1}
B3:
  ret i32 %s
}
"#;

const EVEN_SLOTS: &str = r#"
define void @even(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %k = mul i32 %i, 2
  %addr = getelementptr i32, i32* %a, i32 %k
  %v = mul i32 %i, 3
  store i32 %v, i32* %addr
  %i.next = add i32 %i, 1
  br label %B1, !loop {llvm.loop.parallel_accesses}
B3:
  ret void
}
"#;

const CLAMP: &str = r#"
define void @clamp(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B5]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B6
B2:
  %addr = getelementptr i32, i32* %a, i32 %i
  %x = load i32, i32* %addr
  %big = icmp sgt i32 %x, 5
  br i32 %big, label %B3, label %B4
B3:
  store i32 0, i32* %addr
  br label %B5
B4:
  %y = add i32 %x, 1
  store i32 %y, i32* %addr
  br label %B5
B5:
  %i.next = add i32 %i, 1
  br label %B1, !loop {llvm.loop.vectorize.enable = 1}
B6:
  ret void
}
"#;

const GRID: &str = r#"
define void @grid(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B5]
  %c = icmp slt i32 %i, %n
  br i32 %c, label %B2, label %B6
B2:
  %row = mul i32 %i, %n
  br label %B3
B3:
  %j = phi i32 [0, %B2], [%j.next, %B4]
  %d = icmp slt i32 %j, %n
  br i32 %d, label %B4, label %B5
B4:
  %k = add i32 %row, %j
  %addr = getelementptr i32, i32* %a, i32 %k
  %v = add i32 %i, %j
  store i32 %v, i32* %addr
  %j.next = add i32 %j, 1
  br label %B3, !loop {llvm.loop.vectorize.enable = 1}
B5:
  %i.next = add i32 %i, 1
  br label %B1, !loop {llvm.loop.vectorize.enable = 1, rv.loop.mindepdist = 1}
B6:
  ret void
}
"#;

const COUNT_DOWN: &str = r#"
define i32 @down(i32* %a, i32 %n) {
entry:
  br label %B1
B1:
  %i = phi i32 [0, %entry], [%i.next, %B2]
  %s = phi i32 [0, %entry], [%s.next, %B2]
  %c = icmp sgt i32 %i, %n
  br i32 %c, label %B2, label %B3
B2:
  %s.next = add i32 %s, %i
  %i.next = add i32 %i, -1
  br label %B1, !loop {llvm.loop.vectorize.enable = 1}
B3:
  ret i32 %s
}
"#;

fn ints(values: &[i32]) -> Vec<StackValue> {
	values.iter().map(|v| StackValue::Int(*v)).collect()
}

fn vectorize(program: &mut LlvmProgram, width: u32) -> bool {
	let config = VectorizerConfig {
		force_width: Some(width),
		..VectorizerConfig::default()
	};
	let mut vectorizer = LoopVectorizer::with_config(config);
	vectorizer.run_program(program).unwrap()
}

fn has_vector_code(program: &LlvmProgram) -> bool {
	program.funcs.iter().any(|func| {
		func
			.cfg
			.blocks
			.iter()
			.any(|bb| bb.borrow().instrs.iter().any(|instr| instr.is_vector()))
	})
}

// (return value, memory after the call)
fn simulate(
	program: &LlvmProgram,
	func: &str,
	data: &[i32],
	n: i32,
) -> (Option<StackValue>, Vec<StackValue>) {
	let mut sim = LaneSimulator::new(program);
	let a = sim.alloc_array(&ints(data));
	let ret = sim.run(func, &[a, StackValue::Int(n)]).unwrap();
	(ret, sim.memory)
}

fn check(src: &str, func: &str, width: u32, data: &[i32], n: i32) {
	let original = LlvmProgram::parse(src).unwrap();
	let mut vectorized = LlvmProgram::parse(src).unwrap();
	assert!(vectorize(&mut vectorized, width));
	assert!(has_vector_code(&vectorized));
	assert_eq!(
		simulate(&vectorized, func, data, n),
		simulate(&original, func, data, n),
		"@{} with width {} and n = {}",
		func,
		width,
		n
	);
}

#[test]
fn sum_matches_for_every_remainder() {
	let data: Vec<i32> = (1..=19).map(|v| v * 7 % 11 - 3).collect();
	for width in [2, 4, 8] {
		for n in 0..data.len() as i32 {
			check(SUM, "sum", width, &data, n);
		}
	}
}

#[test]
fn bounds_near_the_integer_limits() {
	let data: Vec<i32> = (0..8).collect();
	for width in [2, 4, 8] {
		for n in [i32::MIN, i32::MIN + 1, i32::MIN + 6, -1] {
			check(SUM, "sum", width, &data, n);
		}
		for n in [i32::MAX, i32::MAX - 1, i32::MAX - 6, 0, -1, -13] {
			check(COUNT_DOWN, "down", width, &data, n);
		}
	}
	let inclusive = SUM.replace("icmp slt", "icmp sle");
	for n in [i32::MIN, i32::MIN + 2, -1, 0, 5] {
		check(&inclusive, "sum", 4, &data, n);
	}
}

#[test]
fn strided_store_fills_even_slots() {
	let data = vec![-1; 24];
	for n in [0, 1, 5, 8, 12] {
		check(EVEN_SLOTS, "even", 4, &data, n);
	}
	let mut program = LlvmProgram::parse(EVEN_SLOTS).unwrap();
	vectorize(&mut program, 4);
	let (_, memory) = simulate(&program, "even", &data, 5);
	assert_eq!(
		memory[..10],
		ints(&[0, -1, 3, -1, 6, -1, 9, -1, 12, -1])[..]
	);
}

#[test]
fn conditional_body_keeps_inactive_lanes() {
	let data = [9, 1, 6, 5, 0, 12, 7, 3, 8, 2, 4];
	for n in [3, 4, 8, 11] {
		check(CLAMP, "clamp", 4, &data, n);
	}
}

#[test]
fn constant_trip_counts() {
	let data: Vec<i32> = (0..16).collect();
	for bound in ["16", "10", "3"] {
		let src = SUM.replace("icmp slt i32 %i, %n", &format!("icmp slt i32 %i, {}", bound));
		check(&src, "sum", 4, &data, 0);
	}
}

#[test]
fn inner_loop_of_a_nest() {
	let data = vec![0; 36];
	for n in [1, 3, 6] {
		check(GRID, "grid", 4, &data, n);
	}
}

#[test]
fn rerun_changes_nothing() {
	let data: Vec<i32> = (0..13).collect();
	let mut program = LlvmProgram::parse(SUM).unwrap();
	assert!(vectorize(&mut program, 4));
	let once = program.funcs[0].to_string();
	assert!(!vectorize(&mut program, 4));
	assert_eq!(program.funcs[0].to_string(), once);
	let original = LlvmProgram::parse(SUM).unwrap();
	assert_eq!(
		simulate(&program, "sum", &data, 13),
		simulate(&original, "sum", &data, 13)
	);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(48))]

	#[test]
	fn sum_agrees_on_random_input(
		data in proptest::collection::vec(-1000..1000i32, 0..40),
		width in prop::sample::select(vec![2u32, 4, 8]),
	) {
		let n = data.len() as i32;
		let original = LlvmProgram::parse(SUM).unwrap();
		let mut vectorized = LlvmProgram::parse(SUM).unwrap();
		prop_assert!(vectorize(&mut vectorized, width));
		prop_assert_eq!(
			simulate(&vectorized, "sum", &data, n),
			simulate(&original, "sum", &data, n)
		);
	}
}

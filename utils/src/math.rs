pub fn is_pow2(x: u32) -> bool {
	x != 0 && x & (x - 1) == 0
}

/// Largest power of two not greater than `x`, 0 for 0.
pub fn floor_pow2(x: u32) -> u32 {
	match x {
		0 => 0,
		_ => 1 << (31 - x.leading_zeros()),
	}
}

pub fn ceil_div(a: i64, b: i64) -> i64 {
	let q = a / b;
	if (a % b != 0) && ((a < 0) == (b < 0)) {
		q + 1
	} else {
		q
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pow2() {
		assert!(is_pow2(1));
		assert!(is_pow2(64));
		assert!(!is_pow2(0));
		assert!(!is_pow2(12));
		assert_eq!(floor_pow2(12), 8);
		assert_eq!(floor_pow2(1), 1);
		assert_eq!(floor_pow2(u32::MAX), 1 << 31);
	}

	#[test]
	fn division() {
		assert_eq!(ceil_div(7, 2), 4);
		assert_eq!(ceil_div(8, 2), 4);
		assert_eq!(ceil_div(-7, 2), -3);
		assert_eq!(ceil_div(-7, -2), 4);
		assert_eq!(ceil_div(0, 3), 0);
	}
}

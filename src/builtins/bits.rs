//! Bitwise built-ins (§4.9): `and`, `or`, `xor`, `lshift`, `rshift`,
//! `compl`. gawk operates on the integer value of a double, truncated
//! toward zero, widened to a 64-bit unsigned word.

fn to_u64(n: f64) -> u64 {
    n.trunc() as i64 as u64
}

pub fn and(vals: &[f64]) -> f64 {
    vals.iter().copied().map(to_u64).fold(u64::MAX, |a, b| a & b) as f64
}

pub fn or(vals: &[f64]) -> f64 {
    vals.iter().copied().map(to_u64).fold(0u64, |a, b| a | b) as f64
}

pub fn xor(vals: &[f64]) -> f64 {
    vals.iter().copied().map(to_u64).fold(0u64, |a, b| a ^ b) as f64
}

pub fn lshift(a: f64, b: f64) -> f64 {
    (to_u64(a).wrapping_shl(to_u64(b) as u32)) as f64
}

pub fn rshift(a: f64, b: f64) -> f64 {
    (to_u64(a).wrapping_shr(to_u64(b) as u32)) as f64
}

pub fn compl(a: f64) -> f64 {
    (!to_u64(a)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_bitwise_ops() {
        assert_eq!(and(&[12.0, 10.0]), 8.0);
        assert_eq!(or(&[12.0, 3.0]), 15.0);
        assert_eq!(xor(&[5.0, 3.0]), 6.0);
        assert_eq!(lshift(1.0, 4.0), 16.0);
        assert_eq!(rshift(16.0, 4.0), 1.0);
    }
}

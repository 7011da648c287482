/// Integer square root, exact for every `u64`.
/// Seeded from `f64` and corrected with checked arithmetic.
#[inline]
pub fn isqrt(n: u64) -> u64 {
    if n == 0 { return 0; }
    let mut x = (n as f64).sqrt() as u64;
    while x > 0 && x.checked_mul(x).map_or(true, |sq| sq > n) { x -= 1; }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) { x += 1; }
    x
}

/// Upper bound on π(n) for pre-allocation. Overestimates by ~15%.
#[inline]
pub fn prime_count_upper(n: u64) -> usize {
    if n < 10 { return 4; }
    let nf = n as f64;
    (nf / nf.ln() * 1.15) as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt_safety() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(30), 5);
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
        // (2^26)^2 = 2^52, edge of the f64 mantissa
        assert_eq!(isqrt(1 << 52), 1 << 26);
    }

    #[test]
    fn test_prime_count_upper_covers() {
        assert!(prime_count_upper(100) >= 25);
        assert!(prime_count_upper(10_000) >= 1_229);
        assert!(prime_count_upper(1_000_000) >= 78_498);
    }
}

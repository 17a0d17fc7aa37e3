//! Math built-ins (§4.9), plus the gawk PRNG pair `rand`/`srand`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn fmod(a: f64, b: f64) -> f64 {
    a % b
}

/// Stateful PRNG backing `rand()`/`srand()`. `srand()` with no argument
/// reseeds from the current time and returns the *previous* seed, per
/// POSIX.
pub struct Prng {
    rng: StdRng,
    last_seed: f64,
}

impl Prng {
    pub fn new() -> Self {
        Prng {
            rng: StdRng::seed_from_u64(0),
            last_seed: 0.0,
        }
    }

    pub fn rand(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Reseed with an explicit value, returning the previous seed.
    pub fn srand(&mut self, seed: f64) -> f64 {
        let prev = self.last_seed;
        self.last_seed = seed;
        self.rng = StdRng::seed_from_u64(seed.trunc() as i64 as u64);
        prev
    }

    /// Reseed from wall-clock time, returning the previous seed.
    pub fn srand_from_time(&mut self, now_secs: f64) -> f64 {
        self.srand(now_secs)
    }
}

impl Default for Prng {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_is_in_unit_range() {
        let mut p = Prng::new();
        for _ in 0..100 {
            let r = p.rand();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn srand_returns_previous_seed() {
        let mut p = Prng::new();
        let prev = p.srand(42.0);
        assert_eq!(prev, 0.0);
        let prev2 = p.srand(7.0);
        assert_eq!(prev2, 42.0);
    }

    #[test]
    fn same_seed_reproduces_sequence() {
        let mut a = Prng::new();
        a.srand(123.0);
        let mut b = Prng::new();
        b.srand(123.0);
        for _ in 0..5 {
            assert_eq!(a.rand(), b.rand());
        }
    }
}

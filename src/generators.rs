//! Test-string generators for the driver's `--generator` option.

use crate::compressor::FromConfig;
use crate::meta::config::Config;
use crate::meta::decl::TypeDesc;
use crate::meta::meta_builder::{Algorithm, Meta};

/// Root algorithm type of the generator registry.
pub fn generator_type() -> TypeDesc {
    TypeDesc::new("generator")
}

/// Produces a test input string.
pub trait Generator {
    fn generate(&self) -> Vec<u8>;
}

// ─────────────────────────────────────────────────────────────────────────────
// random
// ─────────────────────────────────────────────────────────────────────────────

/// Xorshift-driven printable noise.
pub struct RandomGenerator {
    length: usize,
    seed: u64,
}

impl Algorithm for RandomGenerator {
    fn meta() -> Meta {
        let mut m = Meta::new(generator_type(), "random", "pseudo-random printable characters");
        m.param("length", "number of characters").primitive();
        m.param("seed", "seed of the generator").primitive_default(0);
        m
    }
}

impl FromConfig for RandomGenerator {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(RandomGenerator {
            length: cfg.param("length").as_uint()? as usize,
            seed: cfg.param("seed").as_uint()?,
        })
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> Vec<u8> {
        let mut x = self.seed.wrapping_mul(0x9e3779b97f4a7c15) | 1;
        (0..self.length)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                (x % 94) as u8 + b'!'
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// fib
// ─────────────────────────────────────────────────────────────────────────────

/// The n-th Fibonacci word over `{a, b}`.
pub struct FibonacciGenerator {
    n: usize,
}

impl Algorithm for FibonacciGenerator {
    fn meta() -> Meta {
        let mut m = Meta::new(generator_type(), "fib", "Fibonacci words");
        m.param("n", "index of the Fibonacci word").primitive();
        m
    }
}

impl FromConfig for FibonacciGenerator {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(FibonacciGenerator { n: cfg.param("n").as_uint()? as usize })
    }
}

impl Generator for FibonacciGenerator {
    fn generate(&self) -> Vec<u8> {
        if self.n == 0 {
            return Vec::new();
        }
        let mut prev = b"a".to_vec();
        let mut cur = b"ab".to_vec();
        if self.n == 1 {
            return prev;
        }
        for _ in 2..self.n {
            let next = [cur.as_slice(), prev.as_slice()].concat();
            prev = cur;
            cur = next;
        }
        cur
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// thue_morse
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix of the Thue-Morse sequence over `{a, b}`.
pub struct ThueMorseGenerator {
    length: usize,
}

impl Algorithm for ThueMorseGenerator {
    fn meta() -> Meta {
        let mut m = Meta::new(generator_type(), "thue_morse", "Thue-Morse sequence prefix");
        m.param("length", "number of characters").primitive();
        m
    }
}

impl FromConfig for ThueMorseGenerator {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(ThueMorseGenerator { length: cfg.param("length").as_uint()? as usize })
    }
}

impl Generator for ThueMorseGenerator {
    fn generate(&self) -> Vec<u8> {
        (0..self.length)
            .map(|i| if (i as u64).count_ones() % 2 == 0 { b'a' } else { b'b' })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// run_rich
// ─────────────────────────────────────────────────────────────────────────────

/// Long runs of repeated characters; stresses factor length coding.
pub struct RunRichGenerator {
    length: usize,
}

impl Algorithm for RunRichGenerator {
    fn meta() -> Meta {
        let mut m = Meta::new(generator_type(), "run_rich", "runs of repeated characters");
        m.param("length", "number of characters").primitive();
        m
    }
}

impl FromConfig for RunRichGenerator {
    fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(RunRichGenerator { length: cfg.param("length").as_uint()? as usize })
    }
}

impl Generator for RunRichGenerator {
    fn generate(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length);
        let mut run = 1usize;
        let mut c = b'a';
        while out.len() < self.length {
            for _ in 0..run.min(self.length - out.len()) {
                out.push(c);
            }
            c = if c == b'z' { b'a' } else { c + 1 };
            run += 1;
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn build<G: Algorithm + FromConfig>(spec: &str) -> G {
        let meta = G::meta();
        let mut lib = meta.known().clone();
        lib.insert(meta.decl()).unwrap();
        let cfg =
            Config::resolve(meta.decl(), &crate::meta::parser::parse(spec).unwrap(), &lib).unwrap();
        G::from_config(&cfg).unwrap()
    }

    #[test]
    fn fib_words() {
        assert_eq!(build::<FibonacciGenerator>("fib(n=1)").generate(), b"a");
        assert_eq!(build::<FibonacciGenerator>("fib(n=2)").generate(), b"ab");
        assert_eq!(build::<FibonacciGenerator>("fib(n=3)").generate(), b"aba");
        assert_eq!(build::<FibonacciGenerator>("fib(n=4)").generate(), b"abaab");
        assert_eq!(build::<FibonacciGenerator>("fib(n=5)").generate(), b"abaababa");
    }

    #[test]
    fn thue_morse_prefix() {
        assert_eq!(build::<ThueMorseGenerator>("thue_morse(length=8)").generate(), b"abbabaab");
    }

    #[test]
    fn random_is_deterministic_per_seed() {
        let a = build::<RandomGenerator>("random(length=64, seed=7)").generate();
        let b = build::<RandomGenerator>("random(length=64, seed=7)").generate();
        let c = build::<RandomGenerator>("random(length=64, seed=8)").generate();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|&b| (b'!'..=b'~').contains(&b)));
    }

    #[test]
    fn run_rich_covers_requested_length() {
        let s = build::<RunRichGenerator>("run_rich(length=100)").generate();
        assert_eq!(s.len(), 100);
        assert!(s.starts_with(b"abbccc"));
    }
}

//! Sieve benchmark harness
//! Compares: full engine pass vs `primal` crate vs `primes` crate
//!
//! Usage: cargo run --release --bin sieve-bench

use std::fmt;
use std::time::{Duration, Instant};

use sieve::math::prime_count_upper;
use sieve::{SieveEngine, WORD_BITS};

// ─── Implementations under test ────────────────────────────────────────────

fn engine_sieve(n: u64) -> Vec<u64> {
    let mut primes = Vec::with_capacity(prime_count_upper(n));
    let outcome = SieveEngine::new(n).and_then(|engine| engine.sieve_primes(|p| primes.push(p)));
    if let Err(err) = outcome {
        panic!("engine pass failed at n={}: {}", n, err);
    }
    primes
}

fn primes_crate_sieve(n: u64) -> Vec<u64> {
    use primes::{PrimeSet, Sieve};
    let mut sieve = Sieve::new();
    sieve.iter().take_while(|&p| p <= n).collect()
}

fn primal_crate_sieve(n: u64) -> Vec<u64> {
    primal::Primes::all()
        .take_while(|&p| p <= n as usize)
        .map(|p| p as u64)
        .collect()
}

fn primal_crate_sieve_direct(n: u64) -> Vec<u64> {
    let sieve = primal::Sieve::new(n as usize);
    sieve.primes_from(0)
        .take_while(|&p| p <= n as usize)
        .map(|p| p as u64)
        .collect()
}

// ─── Benchmarking machinery ────────────────────────────────────────────────

struct BenchResult {
    name: &'static str,
    prime_count: usize,
    times: Vec<Duration>,
}

impl BenchResult {
    fn median(&self) -> Duration {
        let mut sorted = self.times.clone();
        sorted.sort();
        sorted[sorted.len() / 2]
    }

    fn min(&self) -> Duration {
        self.times.iter().copied().min().unwrap_or_default()
    }

    fn mean(&self) -> Duration {
        let total: Duration = self.times.iter().sum();
        total / self.times.len() as u32
    }
}

impl fmt::Display for BenchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<24} │ {:>10} │ {:>10} │ {:>10}",
            self.name,
            format_duration(self.min()),
            format_duration(self.median()),
            format_duration(self.mean()),
        )
    }
}

fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos < 1_000 {
        format!("{} ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.1} µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
    }
}

fn format_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn bench<F>(name: &'static str, n: u64, iterations: usize, f: F) -> BenchResult
where
    F: Fn(u64) -> Vec<u64>,
{
    // Warmup
    let _ = f(n);

    let mut times = Vec::with_capacity(iterations);
    let mut prime_count = 0;
    for _ in 0..iterations {
        let start = Instant::now();
        let result = f(n);
        times.push(start.elapsed());
        prime_count = result.len();
        std::hint::black_box(&result);
    }

    BenchResult { name, prime_count, times }
}

fn main() {
    println!("🦀 Sieve Engine Benchmark 🦀");
    println!();

    let test_sizes: [u64; 5] = [10_000, 100_000, 1_000_000, 10_000_000, 50_000_000];
    let iterations = 10;

    for n in test_sizes {
        println!("┌─ n = {} ({} iterations)", format_with_commas(n), iterations);
        println!("{:<24} │ {:>10} │ {:>10} │ {:>10}",
            "Implementation", "Min", "Median", "Mean");
        println!("{}", "─".repeat(65));

        let mut results = vec![
            bench("engine (bit-packed)", n, iterations, engine_sieve),
            bench("primal (iterator)", n, iterations, primal_crate_sieve),
            bench("primal (Sieve::new)", n, iterations, primal_crate_sieve_direct),
        ];
        // primes crate is painfully slow past a million
        if n <= 1_000_000 {
            results.push(bench("primes crate (iter)", n, iterations, primes_crate_sieve));
        }

        let per_prime = results[0].median() / results[0].prime_count.max(1) as u32;
        println!("engine: {} per prime, {} storage words",
            format_duration(per_prime), format_with_commas(n / WORD_BITS + 1));

        for r in &results {
            println!("{}", r);
        }

        let expected = results[0].prime_count;
        for r in &results[1..] {
            assert_eq!(expected, r.prime_count,
                "MISMATCH at n={}: engine={} vs {}={}", n, expected, r.name, r.prime_count);
        }

        println!("│  π({}) = {}   │  All implementations agree ✓",
            format_with_commas(n), format_with_commas(expected as u64));
        println!("└──────────────────────────────────────────────────────────────────────────────");
        println!();
    }

    println!("✓ Benchmark complete!");
}

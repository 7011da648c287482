use std::str::FromStr;

// ─── Defaults ──────────────────────────────────────────────────────────────

/// Sieve size used when the caller does not ask for one.
pub const DEFAULT_SIEVE_SIZE: u64 = 100_000_000;

/// Capacity of the progress channel between a background pass and its owner.
/// A full channel stalls the pass until the owner catches up.
pub const DEFAULT_PROGRESS_BUFFER: usize = 4096;

/// The CLI logs one progress line per this many primes.
pub const DEFAULT_REPORT_EVERY: u64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SieveConfig {
    pub sieve_size: u64,
    pub progress_buffer: usize,
    pub report_every: u64,
}

impl Default for SieveConfig {
    fn default() -> Self {
        Self {
            sieve_size: DEFAULT_SIEVE_SIZE,
            progress_buffer: DEFAULT_PROGRESS_BUFFER,
            report_every: DEFAULT_REPORT_EVERY,
        }
    }
}

impl SieveConfig {
    /// Reads `SIEVE_SIZE`, `SIEVE_PROGRESS_BUFFER` and `SIEVE_REPORT_EVERY`.
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            sieve_size: parse_or(lookup("SIEVE_SIZE"), defaults.sieve_size),
            progress_buffer: parse_or(lookup("SIEVE_PROGRESS_BUFFER"), defaults.progress_buffer)
                .max(1),
            report_every: parse_or(lookup("SIEVE_REPORT_EVERY"), defaults.report_every).max(1),
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(SieveConfig::from_lookup(|_| None), SieveConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = SieveConfig::from_lookup(lookup_from(&[
            ("SIEVE_SIZE", "1000"),
            ("SIEVE_PROGRESS_BUFFER", " 16 "),
            ("SIEVE_REPORT_EVERY", "10"),
        ]));
        assert_eq!(config.sieve_size, 1000);
        assert_eq!(config.progress_buffer, 16);
        assert_eq!(config.report_every, 10);
    }

    #[test]
    fn test_garbage_falls_back() {
        let config = SieveConfig::from_lookup(lookup_from(&[
            ("SIEVE_SIZE", "-5"),
            ("SIEVE_PROGRESS_BUFFER", "0"),
            ("SIEVE_REPORT_EVERY", "lots"),
        ]));
        assert_eq!(config.sieve_size, DEFAULT_SIEVE_SIZE);
        assert_eq!(config.progress_buffer, 1);
        assert_eq!(config.report_every, DEFAULT_REPORT_EVERY);
    }
}

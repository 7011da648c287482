//! Bit-packed composite flags, one bit per integer.
//!
//! Bit `n % 64` of word `n / 64` is set once `n` is known to be composite.
//! A zero bit means "not proven composite yet". The storage is sized once and
//! never grows; every access outside it is reported as
//! [`SieveError::OutOfRange`].
//!
//! Persistence is a plain text format: the latest prime and the sieve size on
//! the first two lines, then `index value` lines holding raw words. Loading is
//! sparse (missing indices stay zero), saving is dense.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::{Result, SieveError};
use crate::math::prime_count_upper;

/// Bits per storage word.
pub const WORD_BITS: u64 = u64::BITS as u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStorage {
    words: Vec<u64>,
}

impl BitStorage {
    /// Allocates zeroed storage covering every integer in `[0, sieve_size]`.
    pub fn new(sieve_size: u64) -> Result<Self> {
        let (index, _) = Self::position(sieve_size);
        let word_count = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .ok_or(SieveError::Allocation { size: sieve_size })?;

        let mut words = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| SieveError::Allocation { size: sieve_size })?;
        words.resize(word_count, 0);

        Ok(Self { words })
    }

    /// Word index and bit offset of `n`.
    #[inline]
    pub const fn position(n: u64) -> (u64, u32) {
        (n / WORD_BITS, (n % WORD_BITS) as u32)
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Number of words.
    pub fn size(&self) -> usize {
        self.words.len()
    }

    /// Number of integers the storage can track, `size() * 64`.
    pub fn bit_len(&self) -> u64 {
        self.words.len() as u64 * WORD_BITS
    }

    /// Read-only view of the packed words.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn word(&self, index: u64) -> Result<u64> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.words.get(i).copied())
            .ok_or(SieveError::OutOfRange {
                number: index.saturating_mul(WORD_BITS),
                index,
                word_count: self.words.len(),
            })
    }

    #[inline]
    pub fn is_marked_composite(&self, n: u64) -> Result<bool> {
        let (slot, bit) = self.slot_and_bit(n)?;
        Ok(self.words[slot] & bit != 0)
    }

    #[inline]
    pub fn mark_composite(&mut self, n: u64) -> Result<()> {
        let (slot, bit) = self.slot_and_bit(n)?;
        self.words[slot] |= bit;
        Ok(())
    }

    #[inline]
    fn slot_and_bit(&self, n: u64) -> Result<(usize, u64)> {
        let (index, offset) = Self::position(n);
        match usize::try_from(index) {
            Ok(slot) if slot < self.words.len() => Ok((slot, 1u64 << offset)),
            _ => Err(SieveError::OutOfRange {
                number: n,
                index,
                word_count: self.words.len(),
            }),
        }
    }

    /// First integer above `n` (and at least 2) that is not marked composite.
    /// Only reads the storage.
    pub fn find_next_prime(&self, n: u64) -> Result<u64> {
        let mut candidate = n.saturating_add(1).max(2);
        while self.is_marked_composite(candidate)? {
            candidate += 1;
        }
        Ok(candidate)
    }

    /// Unmarked integers in `[2, bound)`, ascending. Stops at the end of the
    /// storage if `bound` lies beyond it.
    pub fn primes_below(&self, bound: u64) -> impl Iterator<Item = u64> + '_ {
        let limit = bound.min(self.bit_len());
        self.words
            .iter()
            .enumerate()
            .take_while(move |(i, _)| (*i as u64) * WORD_BITS < limit)
            .flat_map(|(i, &word)| {
                let base = i as u64 * WORD_BITS;
                // Clear bits are candidates; walk them as set bits of the complement.
                let mut w = !word;
                std::iter::from_fn(move || {
                    if w == 0 {
                        return None;
                    }
                    let tz = u64::from(w.trailing_zeros());
                    w &= w - 1;
                    Some(base + tz)
                })
            })
            .skip_while(|&n| n < 2)
            .take_while(move |&n| n < limit)
    }

    /// [`primes_below`](Self::primes_below) collected without reallocating.
    pub fn collect_primes(&self, bound: u64) -> Vec<u64> {
        let mut primes = Vec::with_capacity(prime_count_upper(bound));
        primes.extend(self.primes_below(bound));
        primes
    }

    /// Writes every unmarked integer in `[2, bound)`, one per line.
    /// Returns the number of lines written.
    pub fn export_primes<W: Write>(&self, mut writer: W, bound: u64) -> Result<usize> {
        if bound > self.bit_len() {
            let last = bound - 1;
            return Err(SieveError::OutOfRange {
                number: last,
                index: Self::position(last).0,
                word_count: self.words.len(),
            });
        }

        let mut written = 0;
        for prime in self.primes_below(bound) {
            writeln!(writer, "{prime}")?;
            written += 1;
        }
        writer.flush()?;

        debug!(bound, written, "exported primes");
        Ok(written)
    }

    /// Dense dump: header, then one `index value` line per word.
    ///
    /// Words are written as signed decimals, which is how files produced by
    /// earlier versions of the tool store them.
    pub fn save<W: Write>(&self, mut writer: W, latest_prime: u64, sieve_size: u64) -> Result<()> {
        writeln!(writer, "{latest_prime}")?;
        writeln!(writer, "{sieve_size}")?;
        for (index, &word) in self.words.iter().enumerate() {
            writeln!(writer, "{index} {}", word as i64)?;
        }
        writer.flush()?;

        debug!(words = self.words.len(), latest_prime, sieve_size, "saved bit storage");
        Ok(())
    }

    /// Restores storage from the text format and returns
    /// `(latest_prime, sieve_size)` from its header.
    ///
    /// The storage is rebuilt zeroed for the header's sieve size and the body
    /// overwrites whole words, so indices missing from the file read as zero.
    /// On error `self` is unchanged.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<(u64, u64)> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()));

        let (latest_line, latest_prime) = parse_header(lines.next(), "latest prime")?;
        let (_, sieve_size) = parse_header(lines.next(), "sieve size")?;
        if latest_prime > sieve_size {
            return Err(SieveError::Format {
                line: latest_line,
                message: format!("latest prime {latest_prime} exceeds sieve size {sieve_size}"),
            });
        }

        let mut staged = BitStorage::new(sieve_size)?;
        let mut restored = 0usize;
        for (line_no, line) in lines {
            let line = line?;
            let (index, value) = parse_word_line(line_no, &line)?;
            let word_count = staged.words.len();
            let slot = usize::try_from(index)
                .ok()
                .filter(|&slot| slot < word_count)
                .ok_or(SieveError::OutOfRange {
                    number: index.saturating_mul(WORD_BITS),
                    index,
                    word_count,
                })?;
            staged.words[slot] = value;
            restored += 1;
        }

        *self = staged;
        debug!(restored, words = self.words.len(), latest_prime, sieve_size, "loaded bit storage");
        Ok((latest_prime, sieve_size))
    }
}

// ─── Text format parsing ──────────────────────────────────────────────────

fn parse_header(
    line: Option<(usize, std::io::Result<String>)>,
    field: &str,
) -> Result<(usize, u64)> {
    let (line_no, line) = line.ok_or_else(|| SieveError::Format {
        line: 0,
        message: format!("missing {field}"),
    })?;
    let line = line?;
    let value = line.trim().parse().map_err(|_| SieveError::Format {
        line: line_no,
        message: format!("expected {field}, found {:?}", line.trim()),
    })?;
    Ok((line_no, value))
}

fn parse_word_line(line_no: usize, line: &str) -> Result<(u64, u64)> {
    let format_error = |message: String| SieveError::Format { line: line_no, message };

    let mut fields = line.split_whitespace();
    let (Some(index), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(format_error(format!("expected `index value`, found {:?}", line.trim())));
    };

    let index = index
        .parse::<u64>()
        .map_err(|_| format_error(format!("bad word index {index:?}")))?;
    let value = parse_word(value).ok_or_else(|| format_error(format!("bad word value {value:?}")))?;
    Ok((index, value))
}

/// Accepts unsigned words and signed (two's complement) ones alike.
fn parse_word(raw: &str) -> Option<u64> {
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<i64>().ok().map(|v| v as u64))
}

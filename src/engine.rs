//! The sieving pass and its control surface.
//!
//! A [`SieveEngine`] owns one [`BitStorage`] and runs at most one pass over it
//! at a time. The pass can be driven on any thread through a shared reference;
//! other threads observe it through lock-free accessors and stop it with
//! [`SieveEngine::interrupt_sieving`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::{debug, info};

use crate::config::SieveConfig;
use crate::error::{Result, SieveError};
use crate::math::isqrt;
use crate::storage::BitStorage;

/// Latest prime reported before any pass has found one.
pub const NO_PRIME_YET: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SieveState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    /// Still running, a stop has been requested.
    Cancelling = 4,
}

impl SieveState {
    fn is_active(raw: u8) -> bool {
        raw == Self::Running as u8 || raw == Self::Cancelling as u8
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            4 => Self::Cancelling,
            _ => Self::Idle,
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SieveOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug)]
pub struct SieveEngine {
    storage: Mutex<BitStorage>,
    latest_prime: AtomicU64,
    sieve_size: AtomicU64,
    // The stop request lives in the state itself (`Cancelling`) so it cannot
    // be lost between claiming and finishing a pass.
    state: AtomicU8,
}

impl SieveEngine {
    pub fn new(sieve_size: u64) -> Result<Self> {
        let storage = BitStorage::new(sieve_size)?;
        info!(sieve_size, words = storage.size(), "sieve engine created");
        Ok(Self {
            storage: Mutex::new(storage),
            latest_prime: AtomicU64::new(NO_PRIME_YET),
            sieve_size: AtomicU64::new(sieve_size),
            state: AtomicU8::new(SieveState::Idle as u8),
        })
    }

    /// Engine sized from the configuration, `DEFAULT_SIEVE_SIZE` unless
    /// overridden.
    pub fn from_config(config: &SieveConfig) -> Result<Self> {
        Self::new(config.sieve_size)
    }

    pub fn latest_prime(&self) -> u64 {
        self.latest_prime.load(Ordering::Acquire)
    }

    pub fn sieve_size(&self) -> u64 {
        self.sieve_size.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SieveState {
        SieveState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True while a pass holds the engine, including one asked to stop.
    pub fn is_running(&self) -> bool {
        SieveState::is_active(self.state.load(Ordering::Acquire))
    }

    /// Runs a pass on the calling thread, invoking `on_prime_found` for every
    /// prime in ascending order.
    ///
    /// A fresh engine starts at 2. After a cancelled pass or a load the pass
    /// resumes after [`latest_prime`](Self::latest_prime), since the marks made
    /// so far are kept.
    pub fn sieve_primes<F>(&self, on_prime_found: F) -> Result<SieveOutcome>
    where
        F: FnMut(u64),
    {
        self.claim()?;
        self.run_claimed(on_prime_found)
    }

    /// Asks the running pass to stop at its next candidate. Does nothing when
    /// no pass is running.
    pub fn interrupt_sieving(&self) {
        let requested = self.state.compare_exchange(
            SieveState::Running as u8,
            SieveState::Cancelling as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if requested.is_ok() {
            debug!("sieve interruption requested");
        }
    }

    fn cancel_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) == SieveState::Cancelling as u8
    }

    /// Moves the engine to `Running`, or fails with `Busy` if a pass already
    /// holds it.
    pub(crate) fn claim(&self) -> Result<()> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (!SieveState::is_active(raw)).then_some(SieveState::Running as u8)
            })
            .map_err(|_| SieveError::Busy)?;
        Ok(())
    }

    /// Gives back a claim whose pass never started.
    pub(crate) fn abandon_claim(&self) {
        self.state.store(SieveState::Cancelled as u8, Ordering::Release);
    }

    pub(crate) fn run_claimed<F>(&self, mut on_prime_found: F) -> Result<SieveOutcome>
    where
        F: FnMut(u64),
    {
        let mut pass = PassGuard {
            engine: self,
            outcome: SieveState::Cancelled,
        };
        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);

        // Read under the lock: a load that finished just before may have changed them.
        let size = self.sieve_size();
        let root = isqrt(size);
        // A loaded header is checked against the size, but never trust it to add.
        let Some(mut candidate) = self.latest_prime().max(1).checked_add(1) else {
            pass.outcome = SieveState::Completed;
            return Ok(SieveOutcome::Completed);
        };
        info!(size, start = candidate, "sieving started");

        while candidate <= size {
            if self.cancel_requested() {
                info!(latest_prime = self.latest_prime(), stopped_at = candidate, "sieving cancelled");
                return Ok(SieveOutcome::Cancelled);
            }

            if !storage.is_marked_composite(candidate)? {
                // Strike before publishing: a resumed pass trusts every prime
                // up to `latest_prime` to have its multiples marked.
                // Past the root every unmarked candidate is prime; nothing left to strike.
                if candidate <= root {
                    // root <= isqrt(size) always fits in usize when the storage does
                    let step = candidate as usize;
                    for multiple in (candidate * candidate..=size).step_by(step) {
                        storage.mark_composite(multiple)?;
                    }
                }
                self.latest_prime.store(candidate, Ordering::Release);
                on_prime_found(candidate);
            }
            candidate += 1;
        }

        pass.outcome = SieveState::Completed;
        info!(latest_prime = self.latest_prime(), "sieving completed");
        Ok(SieveOutcome::Completed)
    }

    /// Replaces the storage with a fresh one for `sieve_size`. On failure the
    /// engine keeps its current storage.
    pub fn resize(&self, sieve_size: u64) -> Result<()> {
        let mut storage = self.idle_storage()?;
        *storage = BitStorage::new(sieve_size)?;
        self.latest_prime.store(NO_PRIME_YET, Ordering::Release);
        self.sieve_size.store(sieve_size, Ordering::Release);
        self.settle_idle();

        info!(sieve_size, words = storage.size(), "sieve resized");
        Ok(())
    }

    /// Restores storage, latest prime and sieve size from a state file.
    pub fn data_load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut storage = self.idle_storage()?;
        let reader = BufReader::new(File::open(path)?);
        let (latest_prime, sieve_size) = storage.load(reader)?;
        self.latest_prime.store(latest_prime, Ordering::Release);
        self.sieve_size.store(sieve_size, Ordering::Release);
        self.settle_idle();

        info!(path = %path.display(), latest_prime, sieve_size, "sieve data loaded");
        Ok(())
    }

    pub fn data_save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let storage = self.idle_storage()?;
        let writer = BufWriter::new(File::create(path)?);
        storage.save(writer, self.latest_prime(), self.sieve_size())?;

        info!(path = %path.display(), words = storage.size(), "sieve data saved");
        Ok(())
    }

    /// Writes every prime below the latest prime, one per line.
    pub fn export_primes(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let storage = self.idle_storage()?;
        let writer = BufWriter::new(File::create(path)?);
        let written = storage.export_primes(writer, self.latest_prime())?;

        info!(path = %path.display(), written, "primes exported");
        Ok(written)
    }

    pub fn find_next_prime(&self, n: u64) -> Result<u64> {
        self.idle_storage()?.find_next_prime(n)
    }

    /// Borrows the storage while no pass runs.
    pub fn with_storage<R>(&self, f: impl FnOnce(&BitStorage) -> R) -> Result<R> {
        let storage = self.idle_storage()?;
        Ok(f(&*storage))
    }

    fn idle_storage(&self) -> Result<MutexGuard<'_, BitStorage>> {
        let storage = match self.storage.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(SieveError::Busy),
        };
        // A claimed pass that has not reached the lock yet still counts.
        if self.is_running() {
            return Err(SieveError::Busy);
        }
        Ok(storage)
    }

    /// Back to `Idle` unless a pass was claimed meanwhile; that pass is waiting
    /// on the storage lock and will pick up the new values.
    fn settle_idle(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (!SieveState::is_active(raw)).then_some(SieveState::Idle as u8)
            });
    }
}

/// Leaves `Running`/`Cancelling` however the pass ends, including errors and
/// panics in the callback.
struct PassGuard<'a> {
    engine: &'a SieveEngine,
    outcome: SieveState,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.engine.state.store(self.outcome as u8, Ordering::Release);
    }
}

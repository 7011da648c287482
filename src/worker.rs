//! Background passes.
//!
//! [`SieveWorker`] runs one pass of a shared [`SieveEngine`] on its own thread
//! and forwards every prime through a bounded channel. When the channel is
//! full the pass waits for the owner, so progress is never dropped. The
//! thread is always joined: by [`stop`](SieveWorker::stop),
//! [`wait`](SieveWorker::wait) or on drop.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::engine::{SieveEngine, SieveOutcome};
use crate::error::Result;

#[derive(Debug)]
pub struct SieveWorker {
    engine: Arc<SieveEngine>,
    progress: Receiver<u64>,
    handle: Option<JoinHandle<Result<SieveOutcome>>>,
}

impl SieveWorker {
    /// Starts a pass in the background.
    ///
    /// The engine is claimed before the thread exists, so a `Busy` engine is
    /// reported here and a `stop` right after `spawn` cannot be missed.
    pub fn spawn(engine: Arc<SieveEngine>, progress_buffer: usize) -> Result<Self> {
        engine.claim()?;

        let (sender, progress) = mpsc::sync_channel(progress_buffer.max(1));
        let pass_engine = Arc::clone(&engine);
        let spawned = thread::Builder::new()
            .name("sieve-pass".to_string())
            .spawn(move || {
                pass_engine.run_claimed(|prime| {
                    // Receiver gone means nobody is listening; keep sieving.
                    let _ = sender.send(prime);
                })
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                engine.abandon_claim();
                return Err(err.into());
            }
        };

        debug!(sieve_size = engine.sieve_size(), progress_buffer, "sieve worker spawned");
        Ok(Self {
            engine,
            progress,
            handle: Some(handle),
        })
    }

    /// Primes reported by the pass, in ascending order. The channel
    /// disconnects once the pass ends.
    pub fn progress(&self) -> &Receiver<u64> {
        &self.progress
    }

    /// Interrupts the pass and waits for it to end.
    pub fn stop(mut self) -> Result<SieveOutcome> {
        self.engine.interrupt_sieving();
        self.join()
    }

    /// Waits for the pass to end on its own. Progress not yet received is
    /// discarded.
    pub fn wait(mut self) -> Result<SieveOutcome> {
        self.join()
    }

    fn join(&mut self) -> Result<SieveOutcome> {
        let Some(handle) = self.handle.take() else {
            return Ok(SieveOutcome::Cancelled);
        };

        // Unblocks a pass stuck on a full channel; ends when the sender drops.
        let discarded = self.progress.iter().count();
        let outcome = match handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        debug!(discarded, ?outcome, "sieve worker joined");
        outcome
    }
}

impl Drop for SieveWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.engine.interrupt_sieving();
            if let Err(err) = self.join() {
                warn!(%err, "sieve pass failed");
            }
        }
    }
}

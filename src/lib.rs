//! Bit-packed Sieve of Eratosthenes with cancellable, progress-reporting
//! passes and a plain-text state file.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sieve::{SieveEngine, SieveWorker};
//!
//! let engine = Arc::new(SieveEngine::new(10_000_000)?);
//! let worker = SieveWorker::spawn(Arc::clone(&engine), 1024)?;
//! for prime in worker.progress().iter().take(100) {
//!     println!("{prime}");
//! }
//! worker.stop()?;
//! engine.data_save("sieve.dat")?;
//! # Ok::<(), sieve::SieveError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod storage;
pub mod worker;

pub use config::{SieveConfig, DEFAULT_SIEVE_SIZE};
pub use engine::{SieveEngine, SieveOutcome, SieveState, NO_PRIME_YET};
pub use error::{Result, SieveError};
pub use storage::{BitStorage, WORD_BITS};
pub use worker::SieveWorker;

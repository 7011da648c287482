/// Errors raised by the bit storage and the sieve engine.
///
/// Cancelling a pass is not an error; it ends with
/// [`SieveOutcome::Cancelled`](crate::engine::SieveOutcome::Cancelled).
#[derive(Debug, thiserror::Error)]
pub enum SieveError {
    #[error("cannot allocate bit storage for sieve size {size}")]
    Allocation { size: u64 },

    #[error("number {number} maps to word {index}, storage has {word_count} words")]
    OutOfRange {
        number: u64,
        index: u64,
        word_count: usize,
    },

    #[error("malformed sieve data on line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("a sieving pass is running")]
    Busy,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SieveError>;

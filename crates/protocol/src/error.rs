//! The four error kinds that can surface out of the fleet. None of these
//! ever cross a process boundary on the wire — they're for the reception
//! REPL and the fleet-internal logs only.

/// An order line failed to parse against the fixed order-line grammar.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not parse order {line:?}: {reason}")]
pub struct ParseError {
    /// The offending input line.
    pub line: String,
    /// Human-readable reason, suitable for echoing back to the user.
    pub reason: String,
}

impl ParseError {
    /// Build a `ParseError` for `line`, with `reason` describing the mismatch.
    pub fn new(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { line: line.into(), reason: reason.into() }
    }
}

/// A framed-channel send/receive failed in a way the caller needs to react to.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IpcError {
    /// `pipe()`, `fork()` or an `fcntl` call returned an OS error.
    #[error("ipc syscall failed: {0}")]
    Syscall(String),
    /// A frame could not be decoded into the expected record type.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// The channel has already been closed on this side.
    #[error("channel closed")]
    Closed,
}

/// Something went wrong inside a kitchen (worker) process.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    /// Stock was insufficient to cook a job; the job is dropped, not retried.
    #[error("kitchen {worker_id}: out of stock for job (missing {ingredient})")]
    OutOfStock {
        /// The kitchen that couldn't cook the job.
        worker_id: u64,
        /// Name of the ingredient that ran out.
        ingredient: String,
    },
    /// The bounded job queue was full when a `PIZZA:` frame arrived.
    #[error("kitchen {worker_id}: job queue full (capacity {capacity})")]
    QueueFull {
        /// The kitchen whose queue is full.
        worker_id: u64,
        /// The queue's capacity (`2 * total_cooks`).
        capacity: u32,
    },
}

/// Something went wrong in the dispatcher (`KitchenManager`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulerError {
    /// `fork()` failed; no `WorkerRecord` was inserted.
    #[error("failed to spawn kitchen: {0}")]
    SpawnFailed(String),
    /// The framed send to the selected worker failed.
    #[error("failed to send job to kitchen {worker_id}: {reason}")]
    SendFailed {
        /// The worker the job was addressed to.
        worker_id: u64,
        /// Why the send failed.
        reason: String,
    },
}

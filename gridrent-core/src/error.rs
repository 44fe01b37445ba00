//! Error taxonomy for the leasing SDK.

use thiserror::Error;

use crate::types::ResourceKind;

/// Errors surfaced by broker and session operations.
///
/// All failures propagate to the immediate caller; the one documented
/// exception is `PaymentSettler::get_balance`, which substitutes 0 for
/// lookup failures instead of returning an error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An identity proof could not be generated or did not verify.
    #[error("identity verification failed: {reason}")]
    IdentityVerificationFailed {
        /// Why the 403 handshake failed.
        reason: String,
    },

    /// Requested capacity exceeds the marketplace snapshot.
    #[error("insufficient {resource} cores: requested {requested}, available {available}")]
    InsufficientCores {
        /// The requested core kind.
        resource: ResourceKind,
        /// How many cores were requested.
        requested: u32,
        /// How many cores the marketplace reports available.
        available: u32,
    },

    /// The settlement collaborator could not complete.
    #[error("payment settlement failed for session {session_id}: {reason}")]
    PaymentFailed {
        /// The session whose settlement failed.
        session_id: String,
        /// The settler's failure description.
        reason: String,
    },

    /// An operation was attempted outside the Active state.
    #[error("session {session_id} is not active")]
    SessionNotActive {
        /// The session in the wrong state.
        session_id: String,
    },

    /// A task ran past the configured execution deadline.
    #[error("task timed out after {timeout_ms}ms in session {session_id}")]
    TaskTimeout {
        /// The session running the task.
        session_id: String,
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },

    /// Acquire options failed validation.
    #[error("invalid acquire options: {reason}")]
    InvalidOptions {
        /// Why the options were rejected.
        reason: String,
    },

    /// The broker does not track a session with this id.
    #[error("unknown session: {session_id}")]
    UnknownSession {
        /// The id that was not found.
        session_id: String,
    },

    /// One or more releases failed while closing the broker. Every session
    /// still had its release attempted before this was reported.
    #[error("{} of {attempted} session release(s) failed during close", failures.len())]
    CloseAggregate {
        /// How many sessions were released.
        attempted: usize,
        /// Per-session failure descriptions, as "session_id: reason".
        failures: Vec<String>,
    },
}

//! # murmur-server
//!
//! The shared-database side of Murmur: accounts, the two PIR databases
//! (messages and acks), and the async-invitation board.
//!
//! [`Server`] validates every request's fixed-size fields before any
//! cryptographic work and maps failures onto [`ServerError`].

pub mod accounts;
pub mod admission;
pub mod invitations;
pub mod server;

pub use accounts::{AccountManager, InMemoryAccountManager, SqliteAccountManager};
pub use admission::AdmissionPolicy;
pub use invitations::AsyncInvitationStore;
pub use server::Server;

use murmur_pir::PirError;

/// Request failures, in the shape an RPC layer reports them.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PirError> for ServerError {
    fn from(e: PirError) -> Self {
        match e {
            PirError::MalformedQuery(_)
            | PirError::EmptyQuery
            | PirError::IndexOutOfRange { .. } => Self::InvalidArgument(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(format!("account database: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Check that a fixed-size field has exactly the expected length.
pub(crate) fn expect_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(ServerError::InvalidArgument(format!(
            "{what} must be {expected} bytes, got {actual}"
        )));
    }
    Ok(())
}

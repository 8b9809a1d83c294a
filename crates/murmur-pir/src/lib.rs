//! # murmur-pir
//!
//! Private information retrieval over the shared message databases.
//!
//! The server holds `db_rows` rows of `MESSAGE_SIZE` bytes and answers queries
//! without learning which row was asked for. Two engines implement the same
//! traits:
//!
//! - [`FastPir`] / [`FastPirClient`]: batched BFV homomorphic encryption over
//!   `Z_Q[X]/(X^4096 + 1)`; one query selects one row and the answer is a
//!   single ciphertext.
//! - [`NonPrivatePir`] / [`NonPrivatePirClient`]: plaintext index, for fast
//!   protocol tests only.
//!
//! ## Modules
//!
//! - [`params`]: fixed scheme parameters
//! - [`modulus`], [`ntt`], [`encoder`], [`sampling`]: ring arithmetic
//! - [`bfv`]: encryption, plaintext products, Galois key switching
//! - [`layout`]: row bytes to slot values
//! - [`wire`]: query and answer byte layouts

pub mod bfv;
pub mod client;
pub mod encoder;
pub mod layout;
pub mod modulus;
pub mod nonprivate;
pub mod ntt;
pub mod params;
pub mod sampling;
pub mod server;
pub mod wire;

use murmur_types::{PirIndex, PirValue};
use serde::{Deserialize, Serialize};

pub use client::FastPirClient;
pub use nonprivate::{NonPrivatePir, NonPrivatePirClient};
pub use server::FastPir;

/// Error types for PIR operations.
#[derive(Debug, thiserror::Error)]
pub enum PirError {
    #[error("index {index} out of range for {rows} rows")]
    IndexOutOfRange { index: PirIndex, rows: usize },

    #[error("database is empty")]
    EmptyDatabase,

    #[error("query selects no blocks")]
    EmptyQuery,

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("malformed answer: {0}")]
    MalformedAnswer(String),

    /// Decode was called for an index with no outstanding query.
    #[error("no query key for index {0}")]
    NoKeyForIndex(PirIndex),

    #[error("parameter error: {0}")]
    Parameters(String),
}

pub type Result<T> = std::result::Result<T, PirError>;

/// Server half of a PIR engine.
pub trait Pir: Send + Sync {
    /// Overwrite one existing row.
    fn set_value(&mut self, index: PirIndex, value: &PirValue) -> Result<()>;

    /// Append a zero row and return its index.
    fn allocate(&mut self) -> Result<PirIndex>;

    /// Grow so that `max` is a valid index. Never shrinks.
    fn allocate_to_max(&mut self, max: PirIndex) -> Result<()>;

    /// Answer a serialized query.
    fn get_value_privately(&self, query: &[u8]) -> Result<Vec<u8>>;

    fn db_rows(&self) -> usize;
}

/// Client half of a PIR engine.
pub trait PirClient: Send + Sync {
    /// Build a query for `index` shaped for a database of `db_rows` rows.
    fn query(&mut self, index: PirIndex, db_rows: usize) -> Result<Vec<u8>>;

    /// Decode an answer to the most recent query for `index`.
    fn decode(&self, answer: &[u8], index: PirIndex) -> Result<PirValue>;
}

/// Which engine to compose a server or client from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PirScheme {
    #[default]
    Homomorphic,
    NonPrivate,
}

impl PirScheme {
    pub fn new_server(self) -> Result<Box<dyn Pir>> {
        Ok(match self {
            Self::Homomorphic => Box::new(FastPir::new()?),
            Self::NonPrivate => Box::new(NonPrivatePir::new()),
        })
    }

    pub fn new_client(self) -> Result<Box<dyn PirClient>> {
        Ok(match self {
            Self::Homomorphic => Box::new(FastPirClient::new()?),
            Self::NonPrivate => Box::new(NonPrivatePirClient::new()),
        })
    }
}

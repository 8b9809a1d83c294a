//! # murmur-crypto
//!
//! The crypto envelope of the Murmur protocol. Everything that leaves a client
//! is encrypted here into one of three fixed sizes: a full PIR row, an ack
//! slot, or an async invitation.
//!
//! ## Modules
//!
//! - [`blake3`]: domain-separated key derivation
//! - [`x25519`]: X25519 key agreement (RFC 7748)
//! - [`aead`]: XChaCha20-Poly1305 with an appended nonce
//! - [`padding`]: ISO/IEC 7816-4 padding to fixed lengths
//! - [`cbor`]: CBOR helpers for chunk and invitation payloads
//! - [`session`]: per-friend read/write key derivation
//! - [`envelope`]: chunk, ack and ack-row encryption
//! - [`invitation`]: async invitation encryption
//! - [`public_id`]: the shareable public identifier codec

pub mod aead;
pub mod blake3;
pub mod cbor;
pub mod envelope;
pub mod invitation;
pub mod padding;
pub mod public_id;
pub mod session;
pub mod x25519;

pub use public_id::PublicId;
pub use session::{derive_read_write_keys, SessionKeys, SymmetricKey};

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    AeadEncryption,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// A fixed-size buffer had the wrong length.
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Padding marker missing or data too long to pad.
    #[error("padding error: {0}")]
    Padding(String),

    /// No ack slot authenticated under the given key.
    #[error("no ack slot decrypts under this key")]
    NoAckForKey,

    /// An invitation's embedded identity does not match the key that
    /// authenticated it.
    #[error("invitation public key mismatch")]
    InvitationKeyMismatch,

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

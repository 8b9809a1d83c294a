//! # murmur-types
//!
//! Shared domain types used across the Murmur workspace: fixed wire sizes,
//! PIR row types, the chunk model carried inside a row, and the request and
//! response structures exchanged with the PIR server.

pub mod chunk;
pub mod wire;

/// Index of one row in the shared PIR databases. One per registered account.
pub type PirIndex = u32;

/// Local identifier of a friend row in the client store.
pub type FriendUid = i64;

/// Every value written to or read from the shared databases.
pub type PirValue = [u8; MESSAGE_SIZE];

/// Size of one PIR row in bytes.
pub const MESSAGE_SIZE: usize = 1024;

/// Poly1305 tag length.
pub const AEAD_TAG_SIZE: usize = 16;

/// XChaCha20 nonce length.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Symmetric key length for every AEAD key in the protocol.
pub const AEAD_KEY_SIZE: usize = 32;

/// Plaintext length of one acknowledgement (a little-endian `u32`).
pub const ACKING_BYTES: usize = 4;

/// Ciphertext length of one acknowledgement slot.
pub const ENCRYPTED_ACKING_BYTES: usize = ACKING_BYTES + AEAD_TAG_SIZE + AEAD_NONCE_SIZE;

/// Number of ack slots in an ack row, and so the friend limit.
pub const MAX_FRIENDS: usize = MESSAGE_SIZE / ENCRYPTED_ACKING_BYTES;

/// Upper bound on the CBOR framing around chunk content.
pub const CHUNK_ENCODING_OVERHEAD: usize = 40;

/// Padded plaintext length of a chunk before encryption.
pub const CHUNK_PLAINTEXT_SIZE: usize = MESSAGE_SIZE - AEAD_TAG_SIZE - AEAD_NONCE_SIZE;

/// Content bytes that always fit in one chunk. Longer content is truncated.
pub const GUARANTEED_SINGLE_MESSAGE_SIZE: usize =
    CHUNK_PLAINTEXT_SIZE - 1 - CHUNK_ENCODING_OVERHEAD;

/// Padded plaintext length of an async invitation.
pub const ASYNC_INVITATION_SIZE: usize = 400;

/// Ciphertext length of an async invitation as stored by the server.
pub const ASYNC_INVITATION_CIPHERTEXT_SIZE: usize =
    ASYNC_INVITATION_SIZE + AEAD_TAG_SIZE + AEAD_NONCE_SIZE;

/// Longest free-text message accepted in an invitation.
pub const INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE: usize = 200;

/// Length of an X25519 public key.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// PIR queries issued per round.
pub const RECEIVE_FRIENDS_PER_ROUND: usize = 2;

/// Invitations fetched per round by the client-side crawler.
pub const ASYNC_INVITATION_BATCH_SIZE: u32 = 1000;

/// Largest `end - start` window the server answers in one request.
pub const MAX_ASYNC_INVITATION_BATCH_SIZE: u32 = 2000;

/// Client-side upper bound on the database size. Queries are always shaped
/// for this many rows so the query size never tracks the real database.
pub const CLIENT_DB_ROWS: usize = 360_000;

/// Index queried on behalf of the dummy address.
pub const DUMMY_INDEX: PirIndex = 1_000_000;

/// Length of a server-issued authentication token.
pub const AUTHENTICATION_TOKEN_SIZE: usize = 32;

const _: () = assert!(MAX_FRIENDS * ENCRYPTED_ACKING_BYTES <= MESSAGE_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_sizes() {
        assert_eq!(ENCRYPTED_ACKING_BYTES, 44);
        assert_eq!(MAX_FRIENDS, 23);
        assert_eq!(CHUNK_PLAINTEXT_SIZE, 984);
        assert_eq!(GUARANTEED_SINGLE_MESSAGE_SIZE, 943);
        assert_eq!(ASYNC_INVITATION_CIPHERTEXT_SIZE, 440);
    }
}

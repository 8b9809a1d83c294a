//! Request and response structures for the five server operations.
//!
//! Fixed-size fields travel as `Vec<u8>` and are length-checked by the server
//! before anything else touches them.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::PirIndex;

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde_as(as = "serde_with::Bytes")]
    pub invitation_public_key: Vec<u8>,
    /// Admission key checked by the server's admission policy.
    pub beta_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub authentication_token: String,
    pub allocation: PirIndex,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub index: PirIndex,
    pub authentication_token: String,
    /// Encrypted chunk, exactly `MESSAGE_SIZE` bytes.
    #[serde_as(as = "serde_with::Bytes")]
    pub message: Vec<u8>,
    /// Ack row, exactly `MESSAGE_SIZE` bytes.
    #[serde_as(as = "serde_with::Bytes")]
    pub acks: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub db_rows: u64,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiveMessageRequest {
    #[serde_as(as = "serde_with::Bytes")]
    pub pir_query: Vec<u8>,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiveMessageResponse {
    #[serde_as(as = "serde_with::Bytes")]
    pub pir_answer: Vec<u8>,
    #[serde_as(as = "serde_with::Bytes")]
    pub pir_answer_acks: Vec<u8>,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddAsyncInvitationRequest {
    pub index: PirIndex,
    pub authentication_token: String,
    /// Exactly `ASYNC_INVITATION_CIPHERTEXT_SIZE` bytes.
    #[serde_as(as = "serde_with::Bytes")]
    pub invitation: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GetAsyncInvitationsRequest {
    pub start_index: PirIndex,
    /// Exclusive.
    pub end_index: PirIndex,
}

/// Parallel vectors covering `start_index..end_index`. Indices with nothing
/// stored hold zero-filled placeholders of the same sizes.
#[serde_as]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetAsyncInvitationsResponse {
    #[serde_as(as = "Vec<serde_with::Bytes>")]
    pub invitations: Vec<Vec<u8>>,
    #[serde_as(as = "Vec<serde_with::Bytes>")]
    pub invitation_public_keys: Vec<Vec<u8>>,
}

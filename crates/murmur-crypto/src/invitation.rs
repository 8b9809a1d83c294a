//! Async invitation encryption.
//!
//! An invitation lets someone become a friend knowing only the other side's
//! public id. It is posted to the server under the inviter's index and found
//! by the invitee's crawler, which tries to decrypt every posted invitation.
//!
//! ## Algorithm
//!
//! ```text
//! Encrypt(inviter_sk, inviter_public_id, invitee_pk, message):
//!   1. dh = X25519(inviter_sk, invitee_pk)
//!   2. key = BLAKE3::derive_key("Murmur v1 async-invitation-key",
//!            dh || inviter_pk || invitee_pk)
//!   3. payload = ISO7816-4(CBOR{public_id, message}, ASYNC_INVITATION_SIZE)
//!   4. return XChaCha20-Poly1305(key, payload) || nonce
//! ```
//!
//! The invitee must check that the public id inside the payload carries the
//! same invitation key that the ciphertext authenticated under. Otherwise a
//! holder of any key could claim someone else's identity.

use murmur_types::{
    ASYNC_INVITATION_CIPHERTEXT_SIZE, ASYNC_INVITATION_SIZE,
    INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::blake3::{self, contexts};
use crate::public_id::PublicId;
use crate::session::SymmetricKey;
use crate::x25519::{X25519PublicKey, X25519StaticSecret};
use crate::{aead, cbor, padding, CryptoError, Result};

#[derive(Serialize, Deserialize)]
struct InvitationPayload {
    #[serde(rename = "p")]
    public_id: String,
    #[serde(rename = "m")]
    message: String,
}

/// A successfully decrypted and verified invitation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedInvitation {
    pub public_id: PublicId,
    pub message: String,
}

fn invitation_key(
    my_sk: &X25519StaticSecret,
    inviter_pk: &X25519PublicKey,
    invitee_pk: &X25519PublicKey,
    their_pk: &X25519PublicKey,
) -> Result<SymmetricKey> {
    let shared = my_sk.diffie_hellman(their_pk)?;
    let mut key_material = Vec::with_capacity(32 * 3);
    key_material.extend_from_slice(shared.as_bytes());
    key_material.extend_from_slice(inviter_pk.as_bytes());
    key_material.extend_from_slice(invitee_pk.as_bytes());
    let key = blake3::derive_key(contexts::ASYNC_INVITATION_KEY, &key_material);
    key_material.zeroize();
    Ok(key)
}

/// Encrypt an invitation from us (`my_public_id`) to `invitee_pk`.
pub fn encrypt_async_invitation(
    my_invitation_sk: &X25519StaticSecret,
    my_public_id: &PublicId,
    invitee_pk: &X25519PublicKey,
    message: &str,
) -> Result<Vec<u8>> {
    if message.len() > INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "invitation message is {} bytes, limit is {INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE}",
            message.len()
        )));
    }
    let my_pk = my_invitation_sk.public_key();

    // Step 1-2: Key
    let key = invitation_key(my_invitation_sk, &my_pk, invitee_pk, invitee_pk)?;

    // Step 3: Payload
    let payload = cbor::to_vec(&InvitationPayload {
        public_id: my_public_id.to_string(),
        message: message.to_owned(),
    })?;
    let padded = padding::pad(&payload, ASYNC_INVITATION_SIZE)?;

    // Step 4: Seal
    let sealed = aead::seal(&key, &padded)?;
    if sealed.len() != ASYNC_INVITATION_CIPHERTEXT_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "async invitation",
            expected: ASYNC_INVITATION_CIPHERTEXT_SIZE,
            actual: sealed.len(),
        });
    }
    Ok(sealed)
}

/// Try to decrypt an invitation posted by the holder of `inviter_pk`.
///
/// Fails for every invitation not addressed to us, which is the common case
/// while crawling.
pub fn decrypt_async_invitation(
    my_invitation_sk: &X25519StaticSecret,
    inviter_pk: &X25519PublicKey,
    ciphertext: &[u8],
) -> Result<DecryptedInvitation> {
    if ciphertext.len() != ASYNC_INVITATION_CIPHERTEXT_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "async invitation",
            expected: ASYNC_INVITATION_CIPHERTEXT_SIZE,
            actual: ciphertext.len(),
        });
    }
    let my_pk = my_invitation_sk.public_key();
    let key = invitation_key(my_invitation_sk, inviter_pk, &my_pk, inviter_pk)?;

    let padded = aead::open(&key, ciphertext)?;
    let payload: InvitationPayload = cbor::from_slice(padding::unpad(&padded)?)?;
    let public_id: PublicId = payload.public_id.parse()?;

    if public_id.invitation_public_key != *inviter_pk {
        return Err(CryptoError::InvitationKeyMismatch);
    }

    Ok(DecryptedInvitation {
        public_id,
        message: payload.message,
    })
}

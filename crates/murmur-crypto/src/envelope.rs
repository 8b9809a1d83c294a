//! Fixed-size encryption of chunks and acknowledgements.
//!
//! ## Chunk envelope
//!
//! ```text
//! encrypt_send(chunk, write_key):
//!   1. truncate content to GUARANTEED_SINGLE_MESSAGE_SIZE
//!   2. body = CBOR(chunk)
//!   3. padded = ISO7816-4(body, MESSAGE_SIZE - TAG - NONCE)
//!   4. return XChaCha20-Poly1305(write_key, padded) || nonce     (MESSAGE_SIZE bytes)
//! ```
//!
//! ## Ack row
//!
//! One PIR row split into `MAX_FRIENDS` slots of `ENCRYPTED_ACKING_BYTES`.
//! Each friend owns the slot at its `ack_index`. Every other slot holds an
//! encryption of zero under a throwaway key, so the row always looks full.

use murmur_types::chunk::Chunk;
use murmur_types::{
    PirValue, ACKING_BYTES, CHUNK_PLAINTEXT_SIZE, ENCRYPTED_ACKING_BYTES,
    GUARANTEED_SINGLE_MESSAGE_SIZE, MAX_FRIENDS, MESSAGE_SIZE,
};

use crate::session::SymmetricKey;
use crate::{aead, cbor, padding, CryptoError, Result};

/// One friend's entry in the outgoing ack row.
#[derive(Clone, Debug)]
pub struct AckSlot {
    pub ack_index: usize,
    /// Highest sequence number received from this friend.
    pub value: u32,
    pub write_key: SymmetricKey,
}

/// Encrypt one chunk into exactly one PIR row.
///
/// Content beyond [`GUARANTEED_SINGLE_MESSAGE_SIZE`] is truncated.
pub fn encrypt_send(chunk: &Chunk, write_key: &SymmetricKey) -> Result<PirValue> {
    let mut body = chunk.clone();
    body.content.truncate(GUARANTEED_SINGLE_MESSAGE_SIZE);

    let serialized = cbor::to_vec(&body)?;
    let padded = padding::pad(&serialized, CHUNK_PLAINTEXT_SIZE)?;
    let sealed = aead::seal(write_key, &padded)?;

    sealed
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidLength {
            what: "encrypted chunk",
            expected: MESSAGE_SIZE,
            actual: sealed.len(),
        })
}

/// Decrypt one PIR row into a chunk.
pub fn decrypt_receive(ciphertext: &[u8], read_key: &SymmetricKey) -> Result<Chunk> {
    if ciphertext.len() != MESSAGE_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "encrypted chunk",
            expected: MESSAGE_SIZE,
            actual: ciphertext.len(),
        });
    }
    let padded = aead::open(read_key, ciphertext)?;
    let body = padding::unpad(&padded)?;
    cbor::from_slice(body)
}

/// Encrypt an acknowledgement counter into one ack slot.
pub fn encrypt_ack(ack: u32, write_key: &SymmetricKey) -> Result<[u8; ENCRYPTED_ACKING_BYTES]> {
    let sealed = aead::seal(write_key, &ack.to_le_bytes())?;
    sealed
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidLength {
            what: "encrypted ack",
            expected: ENCRYPTED_ACKING_BYTES,
            actual: sealed.len(),
        })
}

pub fn decrypt_ack(ciphertext: &[u8], read_key: &SymmetricKey) -> Result<u32> {
    if ciphertext.len() != ENCRYPTED_ACKING_BYTES {
        return Err(CryptoError::InvalidLength {
            what: "encrypted ack",
            expected: ENCRYPTED_ACKING_BYTES,
            actual: ciphertext.len(),
        });
    }
    let plain = aead::open(read_key, ciphertext)?;
    let bytes: [u8; ACKING_BYTES] =
        plain
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidLength {
                what: "ack plaintext",
                expected: ACKING_BYTES,
                actual: plain.len(),
            })?;
    Ok(u32::from_le_bytes(bytes))
}

/// Build a full ack row. Slots not named in `slots` get an encrypted zero
/// under `dummy_key`.
pub fn encrypt_ack_row(slots: &[AckSlot], dummy_key: &SymmetricKey) -> Result<PirValue> {
    let mut assigned = [false; MAX_FRIENDS];
    for slot in slots {
        if slot.ack_index >= MAX_FRIENDS {
            return Err(CryptoError::InvalidInput(format!(
                "ack index {} out of range",
                slot.ack_index
            )));
        }
        if std::mem::replace(&mut assigned[slot.ack_index], true) {
            return Err(CryptoError::InvalidInput(format!(
                "ack index {} assigned twice",
                slot.ack_index
            )));
        }
    }

    let mut row = [0u8; MESSAGE_SIZE];
    for (i, is_assigned) in assigned.iter().enumerate() {
        if !is_assigned {
            let dummy = encrypt_ack(0, dummy_key)?;
            row[i * ENCRYPTED_ACKING_BYTES..(i + 1) * ENCRYPTED_ACKING_BYTES]
                .copy_from_slice(&dummy);
        }
    }
    for slot in slots {
        let enc = encrypt_ack(slot.value, &slot.write_key)?;
        let start = slot.ack_index * ENCRYPTED_ACKING_BYTES;
        row[start..start + ENCRYPTED_ACKING_BYTES].copy_from_slice(&enc);
    }
    Ok(row)
}

/// Find the slot addressed to us in a friend's ack row.
///
/// The reader does not know which slot the friend assigned it, so every slot
/// is tried and the first one that authenticates wins.
pub fn decrypt_ack_row(row: &[u8], read_key: &SymmetricKey) -> Result<u32> {
    if row.len() != MESSAGE_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "ack row",
            expected: MESSAGE_SIZE,
            actual: row.len(),
        });
    }
    row.chunks_exact(ENCRYPTED_ACKING_BYTES)
        .take(MAX_FRIENDS)
        .find_map(|slot| decrypt_ack(slot, read_key).ok())
        .ok_or(CryptoError::NoAckForKey)
}

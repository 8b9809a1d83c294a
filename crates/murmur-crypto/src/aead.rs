//! XChaCha20-Poly1305 AEAD encryption.
//!
//! Every ciphertext in the protocol uses the [`seal`]/[`open`] framing:
//! `ciphertext || tag || nonce` with a fresh random 24-byte nonce, so callers
//! never manage nonces.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use murmur_types::{AEAD_KEY_SIZE, AEAD_NONCE_SIZE, AEAD_TAG_SIZE};
use rand::{rngs::OsRng, RngCore};

use crate::{CryptoError, Result};

pub const NONCE_SIZE: usize = AEAD_NONCE_SIZE;
pub const KEY_SIZE: usize = AEAD_KEY_SIZE;
pub const TAG_SIZE: usize = AEAD_TAG_SIZE;

/// Encrypt with an explicit nonce. Returns ciphertext with the tag appended.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadEncryption)
}

/// Decrypt ciphertext-with-tag under an explicit nonce.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Encrypt under a fresh random nonce and append the nonce.
///
/// Output length is always `plaintext.len() + TAG_SIZE + NONCE_SIZE`.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    let mut out = encrypt(key, &nonce, plaintext, &[])?;
    out.extend_from_slice(&nonce);
    Ok(out)
}

/// Reverse of [`seal`].
pub fn open(key: &[u8; KEY_SIZE], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < TAG_SIZE + NONCE_SIZE {
        return Err(CryptoError::InvalidLength {
            what: "sealed box",
            expected: TAG_SIZE + NONCE_SIZE,
            actual: sealed.len(),
        });
    }
    let (body, nonce_bytes) = sealed.split_at(sealed.len() - NONCE_SIZE);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);
    decrypt(key, &nonce, body, &[])
}

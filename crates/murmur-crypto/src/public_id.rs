//! The public identifier a user shares out of band to be added as a friend.
//!
//! Encoded as URL-safe unpadded base64 of
//! `index_le(4) || kx_public_key(32) || invitation_public_key(32)`.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use murmur_types::PirIndex;

use crate::x25519::X25519PublicKey;
use crate::{CryptoError, Result};

const ENCODED_LEN: usize = 4 + 32 + 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicId {
    /// PIR index the owner writes to.
    pub index: PirIndex,
    /// Key-exchange key for session key derivation.
    pub kx_public_key: X25519PublicKey,
    /// Key used for async invitations.
    pub invitation_public_key: X25519PublicKey,
}

impl PublicId {
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[..4].copy_from_slice(&self.index.to_le_bytes());
        out[4..36].copy_from_slice(self.kx_public_key.as_bytes());
        out[36..].copy_from_slice(self.invitation_public_key.as_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != ENCODED_LEN {
            return Err(CryptoError::InvalidLength {
                what: "public id",
                expected: ENCODED_LEN,
                actual: data.len(),
            });
        }
        let mut index = [0u8; 4];
        index.copy_from_slice(&data[..4]);
        Ok(Self {
            index: PirIndex::from_le_bytes(index),
            kx_public_key: X25519PublicKey::from_slice(&data[4..36])?,
            invitation_public_key: X25519PublicKey::from_slice(&data[36..])?,
        })
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.to_bytes()))
    }
}

impl FromStr for PublicId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| CryptoError::InvalidInput(format!("public id is not base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PublicId {
        PublicId {
            index: 123_456,
            kx_public_key: X25519PublicKey::from_bytes([1u8; 32]),
            invitation_public_key: X25519PublicKey::from_bytes([2u8; 32]),
        }
    }

    #[test]
    fn test_string_roundtrip() {
        let id = sample();
        let encoded = id.to_string();
        assert!(!encoded.contains('='));
        assert_eq!(encoded.parse::<PublicId>().expect("parse"), id);
    }

    #[test]
    fn test_rejects_truncated() {
        let encoded = sample().to_string();
        assert!(encoded[..encoded.len() - 4].parse::<PublicId>().is_err());
    }

    #[test]
    fn test_rejects_non_base64() {
        assert!("not a valid id!".parse::<PublicId>().is_err());
    }
}

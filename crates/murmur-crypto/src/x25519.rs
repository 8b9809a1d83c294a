//! X25519 key agreement (RFC 7748).
//!
//! Each account holds two long-term X25519 keypairs: one for deriving
//! per-friend session keys, one for async invitations.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{CryptoError, Result};

/// An X25519 static secret key.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct X25519StaticSecret {
    inner: StaticSecret,
}

/// An X25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey {
    bytes: [u8; 32],
}

/// An X25519 shared secret.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl X25519StaticSecret {
    /// Generate a new random static secret.
    pub fn random() -> Self {
        Self {
            inner: StaticSecret::random_from_rng(OsRng),
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            inner: StaticSecret::from(bytes),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Compute the corresponding public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey {
            bytes: PublicKey::from(&self.inner).to_bytes(),
        }
    }

    /// Perform Diffie-Hellman key agreement.
    ///
    /// Rejects low-order peer keys, which would yield an all-zero secret.
    pub fn diffie_hellman(&self, their_public: &X25519PublicKey) -> Result<SharedSecret> {
        let shared = self.inner.diffie_hellman(&PublicKey::from(their_public.bytes));
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidInput(
                "non-contributory X25519 public key".into(),
            ));
        }
        Ok(SharedSecret {
            bytes: *shared.as_bytes(),
        })
    }
}

impl X25519PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Generate a fresh keypair.
pub fn generate_keypair() -> (X25519StaticSecret, X25519PublicKey) {
    let secret = X25519StaticSecret::random();
    let public = secret.public_key();
    (secret, public)
}

/// Long-term key-exchange keypair, used for friend session keys.
pub fn generate_kx_keypair() -> (X25519StaticSecret, X25519PublicKey) {
    generate_keypair()
}

/// Keypair for async invitations. Its public half is posted to the server.
pub fn generate_invitation_keypair() -> (X25519StaticSecret, X25519PublicKey) {
    generate_keypair()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diffie_hellman_agreement() {
        let (alice_secret, alice_public) = generate_keypair();
        let (bob_secret, bob_public) = generate_keypair();

        let alice_shared = alice_secret.diffie_hellman(&bob_public).expect("dh");
        let bob_shared = bob_secret.diffie_hellman(&alice_public).expect("dh");

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let secret = X25519StaticSecret::random();
        let zero = X25519PublicKey::from_bytes([0u8; 32]);
        assert!(secret.diffie_hellman(&zero).is_err());
    }

    #[test]
    fn test_from_slice_length_checked() {
        assert!(X25519PublicKey::from_slice(&[1u8; 31]).is_err());
        assert!(X25519PublicKey::from_slice(&[1u8; 32]).is_ok());
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let secret = X25519StaticSecret::random();
        let restored = X25519StaticSecret::from_bytes(secret.to_bytes());
        assert_eq!(secret.public_key(), restored.public_key());
    }

    #[test]
    fn test_rfc7748_section6_1() {
        let alice_private =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .expect("valid hex");
        let alice_public =
            hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
                .expect("valid hex");

        let mut secret_bytes = [0u8; 32];
        secret_bytes.copy_from_slice(&alice_private);
        let derived = X25519StaticSecret::from_bytes(secret_bytes).public_key();
        assert_eq!(derived.as_bytes().as_slice(), alice_public.as_slice());
    }
}

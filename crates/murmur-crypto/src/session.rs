//! Per-friend session key derivation.
//!
//! Both sides of a friendship derive the same two directional keys from one
//! static-static Diffie-Hellman. The side with the lexicographically smaller
//! key-exchange public key plays "client", which fixes which directional key
//! each side reads with and which it writes with, with no extra round trip.
//!
//! ```text
//! derive(my_pk, my_sk, friend_pk):
//!   1. dh = X25519(my_sk, friend_pk)
//!   2. (client_pk, server_pk) = my_pk < friend_pk ? (my_pk, friend_pk) : (friend_pk, my_pk)
//!   3. c2s = BLAKE3::derive_key("Murmur v1 session-client-to-server", dh || client_pk || server_pk)
//!   4. s2c = BLAKE3::derive_key("Murmur v1 session-server-to-client", dh || client_pk || server_pk)
//!   5. client: (read, write) = (s2c, c2s); server: (read, write) = (c2s, s2c)
//! ```

use zeroize::Zeroize;

use crate::blake3::{self, contexts};
use crate::x25519::{X25519PublicKey, X25519StaticSecret};
use crate::{CryptoError, Result};

/// A 32-byte XChaCha20-Poly1305 key.
pub type SymmetricKey = [u8; murmur_types::AEAD_KEY_SIZE];

/// The directional keys for one friend.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SessionKeys {
    /// Decrypts what the friend writes.
    pub read_key: SymmetricKey,
    /// Encrypts what we write to the friend.
    pub write_key: SymmetricKey,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

/// Derive the (read, write) pair for talking to `friend_pk`.
///
/// The friend computes the same pair swapped.
pub fn derive_read_write_keys(
    my_pk: &X25519PublicKey,
    my_sk: &X25519StaticSecret,
    friend_pk: &X25519PublicKey,
) -> Result<SessionKeys> {
    if my_pk == friend_pk {
        return Err(CryptoError::InvalidInput(
            "cannot derive session keys with our own public key".into(),
        ));
    }

    // Step 1: Shared secret
    let shared = my_sk.diffie_hellman(friend_pk)?;

    // Step 2: Role by key order
    let i_am_client = my_pk < friend_pk;
    let (client_pk, server_pk) = if i_am_client {
        (my_pk, friend_pk)
    } else {
        (friend_pk, my_pk)
    };

    // Step 3-4: Directional keys
    let mut key_material = Vec::with_capacity(32 * 3);
    key_material.extend_from_slice(shared.as_bytes());
    key_material.extend_from_slice(client_pk.as_bytes());
    key_material.extend_from_slice(server_pk.as_bytes());
    let client_to_server = blake3::derive_key(contexts::SESSION_CLIENT_TO_SERVER, &key_material);
    let server_to_client = blake3::derive_key(contexts::SESSION_SERVER_TO_CLIENT, &key_material);
    key_material.zeroize();

    // Step 5: Assign by role
    Ok(if i_am_client {
        SessionKeys {
            read_key: server_to_client,
            write_key: client_to_server,
        }
    } else {
        SessionKeys {
            read_key: client_to_server,
            write_key: server_to_client,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x25519::generate_keypair;

    #[test]
    fn test_keys_are_swapped_between_sides() {
        let (a_sk, a_pk) = generate_keypair();
        let (b_sk, b_pk) = generate_keypair();

        let a = derive_read_write_keys(&a_pk, &a_sk, &b_pk).expect("derive");
        let b = derive_read_write_keys(&b_pk, &b_sk, &a_pk).expect("derive");

        assert_eq!(a.read_key, b.write_key);
        assert_eq!(a.write_key, b.read_key);
        assert_ne!(a.read_key, a.write_key);
    }

    #[test]
    fn test_third_party_derives_different_keys() {
        let (a_sk, a_pk) = generate_keypair();
        let (_, b_pk) = generate_keypair();
        let (c_sk, c_pk) = generate_keypair();

        let ab = derive_read_write_keys(&a_pk, &a_sk, &b_pk).expect("derive");
        let cb = derive_read_write_keys(&c_pk, &c_sk, &b_pk).expect("derive");
        assert_ne!(ab.write_key, cb.write_key);
    }

    #[test]
    fn test_self_derivation_rejected() {
        let (sk, pk) = generate_keypair();
        assert!(derive_read_write_keys(&pk, &sk, &pk).is_err());
    }
}

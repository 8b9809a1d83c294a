//! The async-invitation board: one invitation slot per registered index.

use std::collections::HashMap;

use murmur_types::{PirIndex, ASYNC_INVITATION_CIPHERTEXT_SIZE, PUBLIC_KEY_SIZE};

#[derive(Default)]
pub struct AsyncInvitationStore {
    public_keys: HashMap<PirIndex, Vec<u8>>,
    invitations: HashMap<PirIndex, Vec<u8>>,
}

impl AsyncInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, index: PirIndex, public_key: Vec<u8>) {
        if self.public_keys.insert(index, public_key).is_some() {
            tracing::warn!(index, "invitation public key re-registered");
        }
    }

    /// Replace the invitation posted from `index`.
    pub fn set_invitation(&mut self, index: PirIndex, invitation: Vec<u8>) {
        if !self.public_keys.contains_key(&index) {
            tracing::warn!(index, "invitation posted from an index with no public key");
        }
        self.invitations.insert(index, invitation);
    }

    /// Invitations and public keys for `start..end`, zero-filled where empty.
    pub fn range(&self, start: PirIndex, end: PirIndex) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
        (start..end)
            .map(|i| {
                let invitation = self
                    .invitations
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| vec![0u8; ASYNC_INVITATION_CIPHERTEXT_SIZE]);
                let key = self
                    .public_keys
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| vec![0u8; PUBLIC_KEY_SIZE]);
                (invitation, key)
            })
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_fills_placeholders() {
        let mut store = AsyncInvitationStore::new();
        store.register(1, vec![7u8; PUBLIC_KEY_SIZE]);
        store.set_invitation(1, vec![9u8; ASYNC_INVITATION_CIPHERTEXT_SIZE]);

        let (invitations, keys) = store.range(0, 3);
        assert_eq!(invitations.len(), 3);
        assert_eq!(keys.len(), 3);
        assert!(invitations[0].iter().all(|&b| b == 0));
        assert_eq!(invitations[1][0], 9);
        assert_eq!(keys[1][0], 7);
        assert!(invitations
            .iter()
            .all(|inv| inv.len() == ASYNC_INVITATION_CIPHERTEXT_SIZE));
        assert!(keys.iter().all(|k| k.len() == PUBLIC_KEY_SIZE));
    }

    #[test]
    fn test_empty_range() {
        let store = AsyncInvitationStore::new();
        let (invitations, keys) = store.range(5, 5);
        assert!(invitations.is_empty() && keys.is_empty());
    }
}

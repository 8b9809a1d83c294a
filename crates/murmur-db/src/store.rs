//! The store interface seen by the daemon.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction};

use murmur_types::FriendUid;

use crate::queries::invitations::IncomingOutcome;
use crate::queries::{friends, inbox, invitations, messages, outbox, registration};
use crate::{
    Address, DbError, Friend, IncomingChunk, IncomingInvitation, NewFriend,
    NewOutgoingInvitation, OutgoingAck, OutgoingChunk, OutgoingInvitation, ReceiveChunkStatus,
    ReceivedMessage, Registration, Result, SentMessage,
};

/// Client-side persistent state. Every method is atomic.
pub trait Store: Send + Sync {
    // Registration
    fn has_registered(&self) -> Result<bool>;
    fn register(&self, registration: &Registration) -> Result<()>;
    fn registration(&self) -> Result<Registration>;

    // Friends
    fn friend(&self, unique_name: &str) -> Result<Friend>;
    fn friends(&self) -> Result<Vec<Friend>>;
    fn delete_friend(&self, unique_name: &str) -> Result<()>;
    fn friend_address(&self, uid: FriendUid) -> Result<Address>;
    fn random_enabled_friend_address_excluding(
        &self,
        excluding: &[FriendUid],
    ) -> Result<Option<Address>>;

    // Invitations
    fn add_outgoing_async_invitation(&self, invitation: &NewOutgoingInvitation) -> Result<Friend>;
    fn remove_outgoing_async_invitation(&self, public_id: &str) -> Result<()>;
    fn outgoing_async_invitations(&self) -> Result<Vec<OutgoingInvitation>>;
    fn add_incoming_async_invitation(
        &self,
        public_id: &str,
        message: &str,
    ) -> Result<IncomingOutcome>;
    fn incoming_invitations(&self) -> Result<Vec<IncomingInvitation>>;
    fn accept_incoming_invitation(&self, friend: &NewFriend) -> Result<Friend>;
    fn deny_incoming_invitation(&self, public_id: &str) -> Result<()>;
    fn receive_invitation_system_message(
        &self,
        from_friend: FriendUid,
        sequence_number: u32,
        public_id: &str,
    ) -> Result<bool>;

    // Outbox
    fn queue_message_to_send(
        &self,
        to_unique_names: &[String],
        message: &str,
        chunk_size: usize,
    ) -> Result<i64>;
    fn chunk_to_send(&self, priority: &[FriendUid]) -> Result<Option<OutgoingChunk>>;
    fn acks_to_send(&self) -> Result<Vec<OutgoingAck>>;
    fn receive_ack(&self, uid: FriendUid, ack: u32) -> Result<bool>;

    // Inbox
    fn receive_chunk(&self, chunk: &IncomingChunk, num_chunks: u32) -> Result<ReceiveChunkStatus>;
    fn received_messages(&self, only_unseen: bool) -> Result<Vec<ReceivedMessage>>;
    fn sent_messages(&self) -> Result<Vec<SentMessage>>;
    fn mark_message_seen(&self, uid: i64) -> Result<()>;
    fn has_unseen_messages(&self) -> Result<bool>;
}

/// [`Store`] over one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(crate::open(path)?))
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self::from_connection(crate::open_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `f` in a transaction, committing only if it succeeds.
    fn transact<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

impl Store for SqliteStore {
    fn has_registered(&self) -> Result<bool> {
        self.transact(|tx| registration::has_registered(tx))
    }

    fn register(&self, reg: &Registration) -> Result<()> {
        self.transact(|tx| registration::insert(tx, reg))
    }

    fn registration(&self) -> Result<Registration> {
        self.transact(|tx| registration::get(tx))
    }

    fn friend(&self, unique_name: &str) -> Result<Friend> {
        self.transact(|tx| friends::get(tx, unique_name))
    }

    fn friends(&self) -> Result<Vec<Friend>> {
        self.transact(|tx| friends::list(tx))
    }

    fn delete_friend(&self, unique_name: &str) -> Result<()> {
        self.transact(|tx| friends::delete(tx, unique_name))
    }

    fn friend_address(&self, uid: FriendUid) -> Result<Address> {
        self.transact(|tx| friends::address(tx, uid))
    }

    fn random_enabled_friend_address_excluding(
        &self,
        excluding: &[FriendUid],
    ) -> Result<Option<Address>> {
        self.transact(|tx| friends::random_address_excluding(tx, excluding))
    }

    fn add_outgoing_async_invitation(&self, invitation: &NewOutgoingInvitation) -> Result<Friend> {
        self.transact(|tx| invitations::add_outgoing(tx, invitation))
    }

    fn remove_outgoing_async_invitation(&self, public_id: &str) -> Result<()> {
        self.transact(|tx| invitations::remove_outgoing(tx, public_id))
    }

    fn outgoing_async_invitations(&self) -> Result<Vec<OutgoingInvitation>> {
        self.transact(|tx| invitations::outgoing(tx))
    }

    fn add_incoming_async_invitation(
        &self,
        public_id: &str,
        message: &str,
    ) -> Result<IncomingOutcome> {
        self.transact(|tx| invitations::add_incoming(tx, public_id, message))
    }

    fn incoming_invitations(&self) -> Result<Vec<IncomingInvitation>> {
        self.transact(|tx| invitations::incoming(tx))
    }

    fn accept_incoming_invitation(&self, friend: &NewFriend) -> Result<Friend> {
        self.transact(|tx| invitations::accept_incoming(tx, friend))
    }

    fn deny_incoming_invitation(&self, public_id: &str) -> Result<()> {
        self.transact(|tx| invitations::deny_incoming(tx, public_id))
    }

    fn receive_invitation_system_message(
        &self,
        from_friend: FriendUid,
        sequence_number: u32,
        public_id: &str,
    ) -> Result<bool> {
        self.transact(|tx| {
            inbox::receive_invitation_system_message(tx, from_friend, sequence_number, public_id)
        })
    }

    fn queue_message_to_send(
        &self,
        to_unique_names: &[String],
        message: &str,
        chunk_size: usize,
    ) -> Result<i64> {
        self.transact(|tx| outbox::queue_message(tx, to_unique_names, message, chunk_size))
    }

    fn chunk_to_send(&self, priority: &[FriendUid]) -> Result<Option<OutgoingChunk>> {
        self.transact(|tx| outbox::chunk_to_send(tx, priority))
    }

    fn acks_to_send(&self) -> Result<Vec<OutgoingAck>> {
        self.transact(|tx| outbox::acks_to_send(tx))
    }

    fn receive_ack(&self, uid: FriendUid, ack: u32) -> Result<bool> {
        self.transact(|tx| outbox::receive_ack(tx, uid, ack))
    }

    fn receive_chunk(&self, chunk: &IncomingChunk, num_chunks: u32) -> Result<ReceiveChunkStatus> {
        self.transact(|tx| inbox::receive_chunk(tx, chunk, num_chunks))
    }

    fn received_messages(&self, only_unseen: bool) -> Result<Vec<ReceivedMessage>> {
        self.transact(|tx| messages::received(tx, only_unseen))
    }

    fn sent_messages(&self) -> Result<Vec<SentMessage>> {
        self.transact(|tx| messages::sent(tx))
    }

    fn mark_message_seen(&self, uid: i64) -> Result<()> {
        self.transact(|tx| messages::mark_seen(tx, uid))
    }

    fn has_unseen_messages(&self) -> Result<bool> {
        self.transact(|tx| messages::has_unseen(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::friends::tests::new_friend;
    use crate::queries::registration::tests::sample;

    #[test]
    fn test_failed_operation_rolls_back() {
        let store = SqliteStore::open_memory().expect("open");
        store.register(&sample()).expect("register");
        store
            .accept_incoming_invitation(&new_friend("bob", 1))
            .expect_err("no invitation to accept");

        store
            .add_incoming_async_invitation("bob-public-id", "hi")
            .expect("incoming");
        store
            .accept_incoming_invitation(&new_friend("bob", 1))
            .expect("accept");
        // A second friend with the same key fails in friends::create after the
        // invitation row was deleted; the delete must not stick.
        store
            .add_incoming_async_invitation("other-id", "hello")
            .expect("incoming");
        let mut clash = new_friend("carol", 1);
        clash.public_id = "other-id".into();
        assert!(store.accept_incoming_invitation(&clash).is_err());
        assert_eq!(store.incoming_invitations().expect("list").len(), 1);
    }

    #[test]
    fn test_store_is_object_safe() {
        let store: Box<dyn Store> = Box::new(SqliteStore::open_memory().expect("open"));
        assert!(!store.has_registered().expect("query"));
        store.register(&sample()).expect("register");
        assert_eq!(store.registration().expect("get").name, "alice");
        assert!(store.friends().expect("friends").is_empty());
    }
}

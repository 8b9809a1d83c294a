//! The round protocol.
//!
//! Every round retrieves from exactly `RECEIVE_FRIENDS_PER_ROUND` addresses
//! and sends exactly one chunk, one ack row and one async invitation, padding
//! with dummies whenever there is nothing real to do. The server therefore
//! sees the same traffic shape from every client in every round.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use murmur_crypto::envelope::{self, AckSlot};
use murmur_crypto::invitation;
use murmur_crypto::x25519::{generate_keypair, X25519PublicKey, X25519StaticSecret};
use murmur_crypto::{derive_read_write_keys, CryptoError, PublicId};
use murmur_db::queries::invitations::IncomingOutcome;
use murmur_db::{
    Address, DbError, IncomingChunk, Key, OutgoingChunk, ReceiveChunkStatus, Registration, Store,
};
use murmur_pir::{PirClient, PirError, PirScheme};
use murmur_types::chunk::{Chunk, SystemMessage};
use murmur_types::wire::{
    AddAsyncInvitationRequest, GetAsyncInvitationsRequest, ReceiveMessageRequest,
    ReceiveMessageResponse, SendMessageRequest,
};
use murmur_types::{
    FriendUid, PirIndex, ASYNC_INVITATION_CIPHERTEXT_SIZE, DUMMY_INDEX, RECEIVE_FRIENDS_PER_ROUND,
};

use crate::connection::{RpcError, ServerConnection};
use crate::context::DaemonContext;

/// Uid of the synthetic dummy friend.
pub const DUMMY_FRIEND_UID: FriendUid = -1;

#[derive(Debug, thiserror::Error)]
pub enum TransmitterError {
    #[error("storage: {0}")]
    Db(#[from] DbError),

    #[error("rpc: {0}")]
    Rpc(#[from] RpcError),

    #[error("pir: {0}")]
    Pir(#[from] PirError),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// A fixed-size guarantee broke. Continuing would leak traffic shape.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl TransmitterError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

pub type Result<T> = std::result::Result<T, TransmitterError>;

/// Encryption failures that mean a wrong-sized ciphertext are fatal.
fn sized(e: CryptoError) -> TransmitterError {
    match e {
        CryptoError::InvalidLength { .. } => TransmitterError::Invariant(e.to_string()),
        other => TransmitterError::Crypto(other),
    }
}

#[derive(Clone, Debug)]
pub struct TransmitterSettings {
    pub scheme: PirScheme,
    pub client_db_rows: usize,
    pub async_invitation_batch_size: u32,
}

/// State rebuilt only when the registration changes.
struct RegistrationCache {
    key: (PirIndex, Key),
    pir_client: Box<dyn PirClient>,
    dummy_address: Address,
    /// A made-up friend record, sealed afresh every round we have no
    /// real invitation to post.
    dummy_invitation_id: PublicId,
    dummy_invitee: X25519PublicKey,
}

impl RegistrationCache {
    fn new(reg: &Registration, scheme: PirScheme) -> Result<Self> {
        let my_pk = X25519PublicKey::from_bytes(reg.kx_public_key);
        let my_sk = X25519StaticSecret::from_bytes(reg.kx_private_key);
        let (_, throwaway_pk) = generate_keypair();
        let keys = derive_read_write_keys(&my_pk, &my_sk, &throwaway_pk)?;
        let dummy_address = Address {
            uid: DUMMY_FRIEND_UID,
            read_index: DUMMY_INDEX,
            read_key: keys.read_key,
            write_key: keys.write_key,
            ack_index: 0,
        };

        let (_, dummy_kx_pk) = generate_keypair();
        let (_, dummy_invitee) = generate_keypair();
        let dummy_invitation_id = PublicId {
            index: reg.allocation,
            kx_public_key: dummy_kx_pk,
            invitation_public_key: X25519PublicKey::from_bytes(reg.invitation_public_key),
        };

        Ok(Self {
            key: (reg.allocation, reg.kx_public_key),
            pir_client: scheme.new_client()?,
            dummy_address,
            dummy_invitation_id,
            dummy_invitee,
        })
    }
}

/// What one retrieved reply changed.
#[derive(Default)]
struct ReplyOutcome {
    new_ack: bool,
    new_chunk: bool,
}

pub struct Transmitter<C> {
    store: Arc<dyn Store>,
    new_messages: Arc<Notify>,
    conn: C,
    settings: TransmitterSettings,
    cache: Option<RegistrationCache>,
    just_sent_friend: Option<FriendUid>,
    previous_success_receive_friend: Option<FriendUid>,
    just_acked_friend: Option<FriendUid>,
    next_async_invitation_retrieve_index: PirIndex,
}

impl<C: ServerConnection> Transmitter<C> {
    pub fn new(ctx: &DaemonContext, conn: C, settings: TransmitterSettings) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            new_messages: Arc::clone(&ctx.new_messages),
            conn,
            settings,
            cache: None,
            just_sent_friend: None,
            previous_success_receive_friend: None,
            just_acked_friend: None,
            next_async_invitation_retrieve_index: 0,
        }
    }

    /// One full round: retrieve, then send.
    pub async fn round(&mut self) -> Result<()> {
        self.retrieve().await?;
        self.send().await
    }

    /// Load the registration, or `None` if we have not registered yet.
    fn setup_registration_caching(&mut self) -> Result<Option<Registration>> {
        if !self.store.has_registered()? {
            debug!("not registered; skipping");
            return Ok(None);
        }
        let reg = self.store.registration()?;
        let stale = self
            .cache
            .as_ref()
            .map_or(true, |c| c.key != (reg.allocation, reg.kx_public_key));
        if stale {
            self.cache = Some(RegistrationCache::new(&reg, self.settings.scheme)?);
            info!(allocation = reg.allocation, "registration cache rebuilt");
        }
        Ok(Some(reg))
    }

    fn cache(&self) -> Result<&RegistrationCache> {
        self.cache
            .as_ref()
            .ok_or_else(|| TransmitterError::Invariant("registration cache missing".into()))
    }

    // ========================================================================
    // Retrieve
    // ========================================================================

    pub async fn retrieve(&mut self) -> Result<()> {
        let Some(reg) = self.setup_registration_caching()? else {
            return Ok(());
        };

        let targets = self.receive_targets()?;
        let uids: Vec<FriendUid> = targets.iter().map(|a| a.uid).collect();
        debug!(?uids, "retrieving");

        // Build every query before the first await so nothing borrowed from
        // the cache is held across it.
        let db_rows = self.settings.client_db_rows;
        let queries = {
            let cache = self
                .cache
                .as_mut()
                .ok_or_else(|| TransmitterError::Invariant("registration cache missing".into()))?;
            targets
                .iter()
                .map(|t| cache.pir_client.query(t.read_index, db_rows))
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut replies = Vec::with_capacity(queries.len());
        for pir_query in queries {
            replies.push(
                self.conn
                    .receive_message(ReceiveMessageRequest { pir_query })
                    .await?,
            );
        }

        self.previous_success_receive_friend = None;
        for (target, reply) in targets.iter().zip(&replies) {
            if target.uid == DUMMY_FRIEND_UID {
                continue;
            }
            let outcome = self.process_reply(target, reply)?;
            if outcome.new_ack {
                self.just_acked_friend = Some(target.uid);
            }
            if outcome.new_chunk {
                self.previous_success_receive_friend = Some(target.uid);
            }
        }

        self.retrieve_async_invitations(&reg).await
    }

    /// Priority: just sent to, last real chunk, random friends, then dummies.
    fn receive_targets(&self) -> Result<Vec<Address>> {
        let mut targets: Vec<Address> = Vec::with_capacity(RECEIVE_FRIENDS_PER_ROUND);
        for uid in [self.just_sent_friend, self.previous_success_receive_friend]
            .into_iter()
            .flatten()
        {
            if targets.len() == RECEIVE_FRIENDS_PER_ROUND || targets.iter().any(|a| a.uid == uid)
            {
                continue;
            }
            match self.store.friend_address(uid) {
                Ok(address) => targets.push(address),
                // Deleted since last round.
                Err(DbError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        while targets.len() < RECEIVE_FRIENDS_PER_ROUND {
            let excluding: Vec<FriendUid> = targets.iter().map(|a| a.uid).collect();
            match self
                .store
                .random_enabled_friend_address_excluding(&excluding)?
            {
                Some(address) => targets.push(address),
                None => break,
            }
        }

        let dummy = self.cache()?.dummy_address.clone();
        targets.resize(RECEIVE_FRIENDS_PER_ROUND, dummy);
        Ok(targets)
    }

    fn process_reply(
        &self,
        friend: &Address,
        reply: &ReceiveMessageResponse,
    ) -> Result<ReplyOutcome> {
        let mut outcome = ReplyOutcome::default();
        let client = &self.cache()?.pir_client;

        // Acks first, so a chunk in the same reply sees the updated outbox.
        match client.decode(&reply.pir_answer_acks, friend.read_index) {
            Ok(row) => match envelope::decrypt_ack_row(&row, &friend.read_key) {
                Ok(ack) => {
                    if self.store.receive_ack(friend.uid, ack)? {
                        info!(friend_uid = friend.uid, ack, "received new ack");
                        outcome.new_ack = true;
                    }
                }
                Err(_) => debug!(friend_uid = friend.uid, "no ack addressed to us"),
            },
            Err(e) => warn!(friend_uid = friend.uid, error = %e, "could not decode ack answer"),
        }

        let row = match client.decode(&reply.pir_answer, friend.read_index) {
            Ok(row) => row,
            Err(e) => {
                warn!(friend_uid = friend.uid, error = %e, "could not decode message answer");
                return Ok(outcome);
            }
        };
        let chunk = match envelope::decrypt_receive(&row, &friend.read_key) {
            Ok(chunk) => chunk,
            Err(_) => {
                debug!(friend_uid = friend.uid, "row not addressed to us");
                return Ok(outcome);
            }
        };
        if chunk.is_dummy() {
            debug!(friend_uid = friend.uid, "received cover chunk");
            return Ok(outcome);
        }

        match chunk.system {
            Some(SystemMessage::OutgoingInvitation) => {
                self.receive_system_chunk(friend.uid, &chunk)?;
            }
            None => {
                let status = self.store.receive_chunk(
                    &IncomingChunk {
                        from_friend: friend.uid,
                        sequence_number: chunk.sequence_number,
                        chunks_start_sequence_number: chunk.message_start(),
                        content: chunk.content.clone(),
                    },
                    chunk.message_chunk_count(),
                )?;
                info!(
                    friend_uid = friend.uid,
                    sequence_number = chunk.sequence_number,
                    ?status,
                    "received chunk"
                );
                match status {
                    ReceiveChunkStatus::OldChunk => {}
                    ReceiveChunkStatus::NewChunk => outcome.new_chunk = true,
                    ReceiveChunkStatus::NewChunkAndNewMessage => {
                        outcome.new_chunk = true;
                        self.new_messages.notify_waiters();
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn receive_system_chunk(&self, uid: FriendUid, chunk: &Chunk) -> Result<()> {
        let public_id = match std::str::from_utf8(&chunk.content)
            .ok()
            .and_then(|s| s.parse::<PublicId>().ok())
        {
            Some(id) => id.to_string(),
            None => {
                warn!(friend_uid = uid, "invitation echo with a malformed public id");
                return Ok(());
            }
        };
        if self
            .store
            .receive_invitation_system_message(uid, chunk.sequence_number, &public_id)?
        {
            info!(friend_uid = uid, "received invitation echo");
        }
        Ok(())
    }

    /// Next window of the invitation board, wrapping at `client_db_rows`.
    pub fn update_async_invitation_retrieve_index(&mut self) -> (PirIndex, PirIndex) {
        let limit = PirIndex::try_from(self.settings.client_db_rows).unwrap_or(PirIndex::MAX);
        let start = self.next_async_invitation_retrieve_index.min(limit);
        let end = start
            .saturating_add(self.settings.async_invitation_batch_size)
            .min(limit);
        self.next_async_invitation_retrieve_index = if end >= limit { 0 } else { end };
        (start, end)
    }

    pub fn reset_async_scanner(&mut self, index: PirIndex) {
        self.next_async_invitation_retrieve_index = index;
    }

    async fn retrieve_async_invitations(&mut self, reg: &Registration) -> Result<()> {
        let (start_index, end_index) = self.update_async_invitation_retrieve_index();
        let response = match self
            .conn
            .get_async_invitations(GetAsyncInvitationsRequest {
                start_index,
                end_index,
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.next_async_invitation_retrieve_index = start_index;
                return Err(e.into());
            }
        };
        if response.invitations.len() != response.invitation_public_keys.len() {
            warn!(
                invitations = response.invitations.len(),
                keys = response.invitation_public_keys.len(),
                "malformed invitation batch"
            );
            return Ok(());
        }

        let my_sk = X25519StaticSecret::from_bytes(reg.invitation_private_key);
        for (ciphertext, key) in response
            .invitations
            .iter()
            .zip(&response.invitation_public_keys)
        {
            let Ok(inviter_pk) = X25519PublicKey::from_slice(key) else {
                continue;
            };
            let Ok(found) = invitation::decrypt_async_invitation(&my_sk, &inviter_pk, ciphertext)
            else {
                continue;
            };
            let public_id = found.public_id.to_string();
            if public_id == reg.public_id {
                continue;
            }
            info!(index = found.public_id.index, "found async invitation");
            if let IncomingOutcome::Completed(uid) = self
                .store
                .add_incoming_async_invitation(&public_id, &found.message)?
            {
                info!(friend_uid = uid, "crossed invitations completed a friend");
                self.new_messages.notify_waiters();
            }
        }
        Ok(())
    }

    // ========================================================================
    // Send
    // ========================================================================

    pub async fn send(&mut self) -> Result<()> {
        let Some(reg) = self.setup_registration_caching()? else {
            return Ok(());
        };
        let dummy = self.cache()?.dummy_address.clone();

        let priority: Vec<FriendUid> = self.just_acked_friend.into_iter().collect();
        let (chunk, write_key) = match self.store.chunk_to_send(&priority)? {
            Some(out) => {
                self.just_sent_friend = Some(out.to_friend);
                debug!(
                    friend_uid = out.to_friend,
                    sequence_number = out.sequence_number,
                    "sending chunk"
                );
                (wire_chunk(&out), out.write_key)
            }
            None => {
                self.just_sent_friend = None;
                (Chunk::dummy(), dummy.write_key)
            }
        };
        let message = envelope::encrypt_send(&chunk, &write_key).map_err(sized)?;

        let slots: Vec<AckSlot> = self
            .store
            .acks_to_send()?
            .into_iter()
            .map(|a| AckSlot {
                ack_index: a.ack_index,
                value: a.received_seqnum,
                write_key: a.write_key,
            })
            .collect();
        let acks = envelope::encrypt_ack_row(&slots, &dummy.write_key).map_err(sized)?;

        let response = self
            .conn
            .send_message(SendMessageRequest {
                index: reg.allocation,
                authentication_token: reg.authentication_token.clone(),
                message: message.to_vec(),
                acks: acks.to_vec(),
            })
            .await?;
        debug!(db_rows = response.db_rows, "sent");

        self.transmit_async_invitation(&reg).await
    }

    /// Post our pending invitation, re-encrypted, or a dummy.
    async fn transmit_async_invitation(&mut self, reg: &Registration) -> Result<()> {
        let pending = self.store.outgoing_async_invitations()?;
        let my_sk = X25519StaticSecret::from_bytes(reg.invitation_private_key);
        let invitation = match pending.first() {
            Some(outgoing) => {
                let my_id: PublicId = reg.public_id.parse()?;
                let invitee = X25519PublicKey::from_bytes(outgoing.invitation_public_key);
                invitation::encrypt_async_invitation(&my_sk, &my_id, &invitee, &outgoing.message)
            }
            None => {
                let cache = self.cache()?;
                invitation::encrypt_async_invitation(
                    &my_sk,
                    &cache.dummy_invitation_id,
                    &cache.dummy_invitee,
                    "hello",
                )
            }
        }
        .map_err(sized)?;
        if invitation.len() != ASYNC_INVITATION_CIPHERTEXT_SIZE {
            return Err(TransmitterError::Invariant(format!(
                "async invitation is {} bytes",
                invitation.len()
            )));
        }

        self.conn
            .add_async_invitation(AddAsyncInvitationRequest {
                index: reg.allocation,
                authentication_token: reg.authentication_token.clone(),
                invitation,
            })
            .await?;
        Ok(())
    }
}

/// The chunk as it goes on the wire.
fn wire_chunk(out: &OutgoingChunk) -> Chunk {
    if out.system {
        return Chunk {
            sequence_number: out.sequence_number,
            system: Some(SystemMessage::OutgoingInvitation),
            content: out.content.clone(),
            ..Chunk::default()
        };
    }
    let multi = out.num_chunks > 1;
    Chunk {
        sequence_number: out.sequence_number,
        chunks_start_sequence_number: multi.then_some(out.chunks_start_sequence_number),
        num_chunks: multi.then_some(out.num_chunks),
        system: None,
        content: out.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use murmur_db::SqliteStore;
    use murmur_server::{AdmissionPolicy, InMemoryAccountManager, Server};

    use crate::commands;
    use crate::connection::LocalConnection;

    fn node(
        server: &Arc<Server>,
        client_db_rows: usize,
        batch: u32,
    ) -> (DaemonContext, Transmitter<LocalConnection>) {
        let ctx = DaemonContext::new(Arc::new(SqliteStore::open_memory().expect("store")));
        let conn = LocalConnection::new(Arc::clone(server), Duration::from_secs(5));
        let settings = TransmitterSettings {
            scheme: PirScheme::NonPrivate,
            client_db_rows,
            async_invitation_batch_size: batch,
        };
        let transmitter = Transmitter::new(&ctx, conn, settings);
        (ctx, transmitter)
    }

    fn server() -> Arc<Server> {
        Arc::new(
            Server::new(
                PirScheme::NonPrivate,
                Box::new(InMemoryAccountManager::new()),
                AdmissionPolicy::Open,
            )
            .expect("server"),
        )
    }

    fn outgoing(seq: u32, start: u32, n: u32, system: bool) -> OutgoingChunk {
        OutgoingChunk {
            to_friend: 1,
            sequence_number: seq,
            chunks_start_sequence_number: start,
            num_chunks: n,
            content: b"abc".to_vec(),
            system,
            write_key: [0u8; 32],
        }
    }

    #[test]
    fn test_single_chunk_omits_multi_fields() {
        let chunk = wire_chunk(&outgoing(4, 4, 1, false));
        assert_eq!(chunk.sequence_number, 4);
        assert_eq!(chunk.num_chunks, None);
        assert_eq!(chunk.chunks_start_sequence_number, None);
        assert_eq!(chunk.message_start(), 4);
    }

    #[test]
    fn test_multi_chunk_fields() {
        let chunk = wire_chunk(&outgoing(6, 5, 3, false));
        assert_eq!(chunk.num_chunks, Some(3));
        assert_eq!(chunk.message_start(), 5);
        assert_eq!(chunk.message_chunk_count(), 3);
    }

    #[test]
    fn test_system_chunk() {
        let chunk = wire_chunk(&outgoing(1, 1, 1, true));
        assert_eq!(chunk.system, Some(SystemMessage::OutgoingInvitation));
        assert_eq!(chunk.content, b"abc");
    }

    #[test]
    fn test_only_invariant_errors_are_fatal() {
        assert!(TransmitterError::Invariant("x".into()).is_fatal());
        assert!(!TransmitterError::Db(DbError::NotFound("y".into())).is_fatal());
        let wrong_size = sized(CryptoError::InvalidLength {
            what: "row",
            expected: 1,
            actual: 2,
        });
        assert!(wrong_size.is_fatal());
        assert!(!sized(CryptoError::AeadEncryption).is_fatal());
    }

    #[test]
    fn test_invitation_window_wraps() {
        let (_ctx, mut t) = node(&server(), 25, 10);
        assert_eq!(t.update_async_invitation_retrieve_index(), (0, 10));
        assert_eq!(t.update_async_invitation_retrieve_index(), (10, 20));
        assert_eq!(t.update_async_invitation_retrieve_index(), (20, 25));
        assert_eq!(t.update_async_invitation_retrieve_index(), (0, 10));

        t.reset_async_scanner(24);
        assert_eq!(t.update_async_invitation_retrieve_index(), (24, 25));
        assert_eq!(t.update_async_invitation_retrieve_index(), (0, 10));

        // Past the end clamps to an empty window, then restarts.
        t.reset_async_scanner(100);
        assert_eq!(t.update_async_invitation_retrieve_index(), (25, 25));
        assert_eq!(t.update_async_invitation_retrieve_index(), (0, 10));
    }

    #[tokio::test]
    async fn test_round_before_registration_is_noop() {
        let server = server();
        let (_ctx, mut t) = node(&server, 16, 8);
        t.round().await.expect("round");
        assert_eq!(server.db_rows().expect("rows"), 0);
    }

    #[tokio::test]
    async fn test_idle_round_sends_cover_traffic() {
        let server = server();
        let (ctx, mut t) = node(&server, 16, 8);
        let conn = LocalConnection::new(Arc::clone(&server), Duration::from_secs(5));
        commands::register(&ctx, &conn, "alice", "")
            .await
            .expect("register");

        t.round().await.expect("round");
        t.round().await.expect("round");
        assert_eq!(t.just_sent_friend, None);
        assert_eq!(t.previous_success_receive_friend, None);
        assert!(ctx.store.received_messages(false).expect("messages").is_empty());

        // Our own cover invitation is on the board, shaped like a real one.
        let (invitations, keys) = server
            .get_async_invitations(GetAsyncInvitationsRequest {
                start_index: 0,
                end_index: 1,
            })
            .map(|r| (r.invitations, r.invitation_public_keys))
            .expect("board");
        assert_eq!(invitations[0].len(), ASYNC_INVITATION_CIPHERTEXT_SIZE);
        assert_ne!(invitations[0], vec![0u8; ASYNC_INVITATION_CIPHERTEXT_SIZE]);
        assert_eq!(keys[0].len(), 32);
    }

    #[tokio::test]
    async fn test_cache_survives_rounds() {
        let server = server();
        let (ctx, mut t) = node(&server, 16, 8);
        let conn = LocalConnection::new(Arc::clone(&server), Duration::from_secs(5));
        commands::register(&ctx, &conn, "alice", "")
            .await
            .expect("register");

        t.round().await.expect("round");
        let first_id = t.cache.as_ref().expect("cache").dummy_invitation_id;
        let first_post = own_posted_invitation(&server);
        t.round().await.expect("round");
        let second_id = t.cache.as_ref().expect("cache").dummy_invitation_id;
        let second_post = own_posted_invitation(&server);

        // Same dummy record, freshly sealed each round.
        assert_eq!(first_id, second_id);
        assert_eq!(second_post.len(), ASYNC_INVITATION_CIPHERTEXT_SIZE);
        assert_ne!(first_post, second_post);
    }

    fn own_posted_invitation(server: &Server) -> Vec<u8> {
        server
            .get_async_invitations(GetAsyncInvitationsRequest {
                start_index: 0,
                end_index: 1,
            })
            .map(|mut r| r.invitations.remove(0))
            .expect("board")
    }

    #[tokio::test]
    async fn test_idle_and_inviting_rounds_post_fresh_bytes() {
        let server = server();
        let (alice_ctx, mut alice) = node(&server, 16, 8);
        let (bob_ctx, _) = node(&server, 16, 8);
        let conn = LocalConnection::new(Arc::clone(&server), Duration::from_secs(5));
        commands::register(&alice_ctx, &conn, "alice", "")
            .await
            .expect("register");
        let bob_id = commands::register(&bob_ctx, &conn, "bob", "")
            .await
            .expect("register");

        let mut idle = Vec::new();
        for _ in 0..2 {
            alice.round().await.expect("round");
            idle.push(own_posted_invitation(&server));
        }
        assert_ne!(idle[0], idle[1]);

        commands::add_async_friend(&alice_ctx, "bob", &bob_id, "hi").expect("invite");
        let mut inviting = Vec::new();
        for _ in 0..2 {
            alice.round().await.expect("round");
            inviting.push(own_posted_invitation(&server));
        }
        assert_ne!(inviting[0], inviting[1]);
        assert!(inviting
            .iter()
            .chain(&idle)
            .all(|post| post.len() == ASYNC_INVITATION_CIPHERTEXT_SIZE));
    }
}

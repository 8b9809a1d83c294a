//! Row types returned by the store.

use murmur_types::{FriendUid, PirIndex, AEAD_KEY_SIZE};

/// A 32-byte AEAD key as stored in the database.
pub type Key = [u8; AEAD_KEY_SIZE];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvitationProgress {
    /// We sent an async invitation; they have not accepted yet.
    OutgoingAsync,
    Complete,
}

impl InvitationProgress {
    pub(crate) fn to_sql(self) -> i64 {
        match self {
            Self::OutgoingAsync => 0,
            Self::Complete => 1,
        }
    }

    pub(crate) fn from_sql(v: i64) -> Self {
        if v == 0 {
            Self::OutgoingAsync
        } else {
            Self::Complete
        }
    }
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub name: String,
    pub invitation_public_key: Key,
    pub invitation_private_key: Key,
    pub kx_public_key: Key,
    pub kx_private_key: Key,
    pub allocation: PirIndex,
    pub authentication_token: String,
    pub public_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Friend {
    pub uid: FriendUid,
    pub unique_name: String,
    pub public_id: String,
    pub progress: InvitationProgress,
    pub deleted: bool,
}

/// Where and how to talk to one friend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub uid: FriendUid,
    pub read_index: PirIndex,
    pub read_key: Key,
    pub write_key: Key,
    pub ack_index: usize,
}

/// Everything needed to create a friend with derived session keys.
#[derive(Clone, Debug)]
pub struct NewFriend {
    pub unique_name: String,
    pub public_id: String,
    pub kx_public_key: Key,
    pub read_index: PirIndex,
    pub read_key: Key,
    pub write_key: Key,
}

#[derive(Clone, Debug)]
pub struct NewOutgoingInvitation {
    pub friend: NewFriend,
    pub invitation_public_key: Key,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingInvitation {
    pub friend_uid: FriendUid,
    pub unique_name: String,
    pub public_id: String,
    pub invitation_public_key: Key,
    pub message: String,
    pub sent_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingInvitation {
    pub public_id: String,
    pub message: String,
    pub received_at: i64,
}

/// The next chunk the transmitter should send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingChunk {
    pub to_friend: FriendUid,
    pub sequence_number: u32,
    pub chunks_start_sequence_number: u32,
    pub num_chunks: u32,
    pub content: Vec<u8>,
    /// Carries the `OutgoingInvitation` control message.
    pub system: bool,
    pub write_key: Key,
}

/// One friend's entry in the ack row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingAck {
    pub to_friend: FriendUid,
    pub ack_index: usize,
    pub received_seqnum: u32,
    pub write_key: Key,
}

#[derive(Clone, Debug)]
pub struct IncomingChunk {
    pub from_friend: FriendUid,
    pub sequence_number: u32,
    pub chunks_start_sequence_number: u32,
    pub content: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveChunkStatus {
    /// Already received; nothing changed.
    OldChunk,
    NewChunk,
    /// This chunk completed a message, now readable.
    NewChunkAndNewMessage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub uid: i64,
    pub from_unique_name: String,
    pub content: String,
    pub other_recipients: Vec<String>,
    pub received_at: i64,
    pub seen: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub uid: i64,
    pub to: Vec<String>,
    pub content: String,
    pub sent_at: i64,
    pub delivered: bool,
}

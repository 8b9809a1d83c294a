//! The chunk model carried inside one PIR row.
//!
//! Field names are shortened on the wire so the CBOR framing of a full chunk
//! stays within [`CHUNK_ENCODING_OVERHEAD`](crate::CHUNK_ENCODING_OVERHEAD).

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Protocol-control payloads. A chunk with `system` set is not user content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMessage {
    /// Sent by the inviter once an async invitation is queued. Its content is
    /// the sender's encoded public id. Receiving it promotes the sender to a
    /// complete friend on the invitee's side.
    #[serde(rename = "i")]
    OutgoingInvitation,
}

/// One fixed-capacity fragment of a possibly larger message.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0 marks cover traffic.
    #[serde(rename = "s")]
    pub sequence_number: u32,
    /// Sequence number of the first chunk of a multi-chunk message.
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub chunks_start_sequence_number: Option<u32>,
    /// Total chunks of a multi-chunk message.
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub num_chunks: Option<u32>,
    #[serde(rename = "y", default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemMessage>,
    #[serde(rename = "c")]
    #[serde_as(as = "serde_with::Bytes")]
    pub content: Vec<u8>,
}

impl Chunk {
    /// A cover chunk. Sequence number 0 is dropped by every receiver.
    pub fn dummy() -> Self {
        Self {
            sequence_number: 0,
            content: b"fake chunk".to_vec(),
            ..Self::default()
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.sequence_number == 0
    }

    /// Number of chunks in the message this chunk belongs to (at least 1).
    pub fn message_chunk_count(&self) -> u32 {
        self.num_chunks.unwrap_or(1).max(1)
    }

    /// Sequence number used as the reassembly key.
    pub fn message_start(&self) -> u32 {
        match self.num_chunks {
            Some(n) if n > 1 => self
                .chunks_start_sequence_number
                .unwrap_or(self.sequence_number),
            _ => self.sequence_number,
        }
    }
}

/// The user-visible body of a message, serialized before chunking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Unique names of the other recipients of a group message.
    #[serde(rename = "r", default)]
    pub other_recipients: Vec<String>,
    #[serde(rename = "t")]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CHUNK_ENCODING_OVERHEAD, GUARANTEED_SINGLE_MESSAGE_SIZE};

    fn encoded_len(chunk: &Chunk) -> usize {
        let mut buf = Vec::new();
        ciborium::into_writer(chunk, &mut buf).expect("encode");
        buf.len()
    }

    #[test]
    fn test_full_chunk_overhead_within_bound() {
        let chunk = Chunk {
            sequence_number: u32::MAX,
            chunks_start_sequence_number: Some(u32::MAX),
            num_chunks: Some(u32::MAX),
            system: Some(SystemMessage::OutgoingInvitation),
            content: vec![0xAB; GUARANTEED_SINGLE_MESSAGE_SIZE],
        };
        let overhead = encoded_len(&chunk) - GUARANTEED_SINGLE_MESSAGE_SIZE;
        assert!(overhead <= CHUNK_ENCODING_OVERHEAD, "overhead {overhead}");
    }

    #[test]
    fn test_single_chunk_start_is_own_sequence() {
        let chunk = Chunk {
            sequence_number: 7,
            chunks_start_sequence_number: Some(3),
            num_chunks: None,
            ..Chunk::default()
        };
        assert_eq!(chunk.message_chunk_count(), 1);
        assert_eq!(chunk.message_start(), 7);
    }

    #[test]
    fn test_multi_chunk_start() {
        let chunk = Chunk {
            sequence_number: 5,
            chunks_start_sequence_number: Some(4),
            num_chunks: Some(3),
            ..Chunk::default()
        };
        assert_eq!(chunk.message_chunk_count(), 3);
        assert_eq!(chunk.message_start(), 4);
    }

    #[test]
    fn test_dummy_chunk() {
        assert!(Chunk::dummy().is_dummy());
        assert!(Chunk::dummy().system.is_none());
    }
}

//! Incoming chunks: sequence gating and message reassembly.

use rusqlite::{Connection, OptionalExtension};

use murmur_types::chunk::MessageBody;
use murmur_types::FriendUid;

use crate::queries::{friends, messages};
use crate::{DbError, IncomingChunk, InvitationProgress, ReceiveChunkStatus, Result};

/// Check a sequence number against the received-through counter.
///
/// Returns `false` for anything already covered. The counter only moves on
/// the exact successor, so it never skips a chunk that has not arrived.
pub fn accept_sequence(conn: &Connection, from_friend: FriendUid, seq: u32) -> Result<bool> {
    let received: Option<u32> = conn
        .query_row(
            "SELECT received_seqnum FROM transmission WHERE friend_uid = ?1",
            [from_friend],
            |row| row.get(0),
        )
        .optional()?;
    let Some(received) = received else {
        return Err(DbError::NotFound("transmission".into()));
    };
    if seq <= received {
        return Ok(false);
    }
    if Some(seq) == received.checked_add(1) {
        conn.execute(
            "UPDATE transmission SET received_seqnum = ?1 WHERE friend_uid = ?2",
            rusqlite::params![seq, from_friend],
        )?;
    }
    Ok(true)
}

pub fn receive_chunk(
    conn: &Connection,
    chunk: &IncomingChunk,
    num_chunks: u32,
) -> Result<ReceiveChunkStatus> {
    if !accept_sequence(conn, chunk.from_friend, chunk.sequence_number)? {
        return Ok(ReceiveChunkStatus::OldChunk);
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO incoming_chunk (from_friend, sequence_number,
             chunks_start_sequence_number, num_chunks, content)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            chunk.from_friend,
            chunk.sequence_number,
            chunk.chunks_start_sequence_number,
            num_chunks,
            chunk.content,
        ],
    )?;
    if inserted == 0 {
        return Ok(ReceiveChunkStatus::OldChunk);
    }

    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM incoming_chunk
         WHERE from_friend = ?1 AND chunks_start_sequence_number = ?2",
        rusqlite::params![chunk.from_friend, chunk.chunks_start_sequence_number],
        |row| row.get(0),
    )?;
    if count < num_chunks {
        return Ok(ReceiveChunkStatus::NewChunk);
    }

    let mut stmt = conn.prepare(
        "SELECT content FROM incoming_chunk
         WHERE from_friend = ?1 AND chunks_start_sequence_number = ?2
         ORDER BY sequence_number",
    )?;
    let assembled = stmt
        .query_map(
            rusqlite::params![chunk.from_friend, chunk.chunks_start_sequence_number],
            |row| row.get::<_, Vec<u8>>(0),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .concat();
    conn.execute(
        "DELETE FROM incoming_chunk WHERE from_friend = ?1 AND chunks_start_sequence_number = ?2",
        rusqlite::params![chunk.from_friend, chunk.chunks_start_sequence_number],
    )?;

    let body: MessageBody = match ciborium::from_reader(assembled.as_slice()) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                friend_uid = chunk.from_friend,
                start = chunk.chunks_start_sequence_number,
                error = %e,
                "dropping message that failed to parse"
            );
            return Ok(ReceiveChunkStatus::NewChunk);
        }
    };
    let uid = messages::insert_received(conn, chunk.from_friend, &body.text, &body.other_recipients)?;
    tracing::info!(friend_uid = chunk.from_friend, message_uid = uid, "message received");
    Ok(ReceiveChunkStatus::NewChunkAndNewMessage)
}

/// Handle the inviter's control chunk. Returns whether it was new.
///
/// If we hold the sender as an outgoing async friend with the same public
/// id, both sides invited each other and the friendship is complete.
pub fn receive_invitation_system_message(
    conn: &Connection,
    from_friend: FriendUid,
    seq: u32,
    public_id: &str,
) -> Result<bool> {
    if !accept_sequence(conn, from_friend, seq)? {
        return Ok(false);
    }
    let friend = friends::get_by_uid(conn, from_friend)?;
    if friend.progress == InvitationProgress::OutgoingAsync {
        if friend.public_id == public_id {
            friends::complete(conn, from_friend)?;
        } else {
            tracing::warn!(friend_uid = from_friend, "invitation echo with unexpected public id");
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::friends::tests::new_friend;

    fn setup() -> (Connection, FriendUid) {
        let conn = crate::open_memory().expect("open");
        let uid = friends::create(&conn, &new_friend("bob", 1), InvitationProgress::Complete)
            .expect("bob");
        (conn, uid)
    }

    fn encoded(text: &str) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::into_writer(
            &MessageBody {
                other_recipients: Vec::new(),
                text: text.into(),
            },
            &mut out,
        )
        .expect("encode");
        out
    }

    fn piece(from: FriendUid, seq: u32, start: u32, content: &[u8]) -> IncomingChunk {
        IncomingChunk {
            from_friend: from,
            sequence_number: seq,
            chunks_start_sequence_number: start,
            content: content.to_vec(),
        }
    }

    #[test]
    fn test_single_chunk_message() {
        let (conn, bob) = setup();
        let status = receive_chunk(&conn, &piece(bob, 1, 1, &encoded("hello")), 1).expect("recv");
        assert_eq!(status, ReceiveChunkStatus::NewChunkAndNewMessage);

        let received = messages::received(&conn, false).expect("list");
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content, "hello");

        let again = receive_chunk(&conn, &piece(bob, 1, 1, &encoded("hello")), 1).expect("recv");
        assert_eq!(again, ReceiveChunkStatus::OldChunk);
        assert_eq!(messages::received(&conn, false).expect("list").len(), 1);
    }

    #[test]
    fn test_multi_chunk_reassembly() {
        let (conn, bob) = setup();
        let bytes = encoded(&"z".repeat(60));
        let parts: Vec<&[u8]> = bytes.chunks(25).collect();
        let n = parts.len() as u32;
        assert!(n >= 3);

        for (i, part) in parts.iter().enumerate() {
            let seq = i as u32 + 1;
            let status = receive_chunk(&conn, &piece(bob, seq, 1, part), n).expect("recv");
            if seq < n {
                assert_eq!(status, ReceiveChunkStatus::NewChunk);
                assert!(messages::received(&conn, false).expect("list").is_empty());
            } else {
                assert_eq!(status, ReceiveChunkStatus::NewChunkAndNewMessage);
            }
        }
        let received = messages::received(&conn, false).expect("list");
        assert_eq!(received[0].content, "z".repeat(60));
    }

    #[test]
    fn test_counter_advances_only_on_successor() {
        let (conn, bob) = setup();
        assert!(accept_sequence(&conn, bob, 2).expect("gap"));
        assert!(accept_sequence(&conn, bob, 1).expect("first"));
        assert!(!accept_sequence(&conn, bob, 1).expect("repeat"));
        // 2 arrived before the counter reached it, so it is still open.
        assert!(accept_sequence(&conn, bob, 2).expect("second"));
        assert!(!accept_sequence(&conn, bob, 2).expect("now old"));
    }

    #[test]
    fn test_unparseable_message_dropped() {
        let (conn, bob) = setup();
        let status = receive_chunk(&conn, &piece(bob, 1, 1, &[0xff, 0x00, 0x13]), 1).expect("recv");
        assert_eq!(status, ReceiveChunkStatus::NewChunk);
        assert!(messages::received(&conn, false).expect("list").is_empty());
    }

    #[test]
    fn test_system_message_completes_mutual_invitation() {
        let conn = crate::open_memory().expect("open");
        let bob = friends::create(&conn, &new_friend("bob", 1), InvitationProgress::OutgoingAsync)
            .expect("bob");
        assert!(receive_invitation_system_message(&conn, bob, 1, "bob-public-id").expect("sys"));
        assert_eq!(
            friends::get_by_uid(&conn, bob).expect("bob").progress,
            InvitationProgress::Complete
        );
        assert!(!receive_invitation_system_message(&conn, bob, 1, "bob-public-id").expect("old"));
    }
}

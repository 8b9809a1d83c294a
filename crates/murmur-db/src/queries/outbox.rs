//! Outgoing chunks and acknowledgements.

use rand::seq::SliceRandom;
use rusqlite::{Connection, OptionalExtension};

use murmur_types::chunk::MessageBody;
use murmur_types::FriendUid;

use crate::queries::{friends, messages};
use crate::{key_column, DbError, InvitationProgress, OutgoingAck, OutgoingChunk, Result};

/// Sequence number for the next chunk to a friend: one past the highest
/// pending chunk, or one past the acked-through counter when none are pending.
pub fn next_sequence_number(conn: &Connection, to_friend: FriendUid) -> Result<u32> {
    let pending: Option<u32> = conn.query_row(
        "SELECT MAX(sequence_number) FROM outgoing_chunk WHERE to_friend = ?1",
        [to_friend],
        |row| row.get(0),
    )?;
    let last = match pending {
        Some(seq) => seq,
        None => conn.query_row(
            "SELECT sent_acked_seqnum FROM transmission WHERE friend_uid = ?1",
            [to_friend],
            |row| row.get(0),
        )?,
    };
    last.checked_add(1)
        .ok_or_else(|| DbError::Constraint("sequence numbers exhausted".into()))
}

/// Queue a single control chunk. Returns its sequence number.
pub fn queue_system_chunk(conn: &Connection, to_friend: FriendUid, content: &[u8]) -> Result<u32> {
    let seq = next_sequence_number(conn, to_friend)?;
    conn.execute(
        "INSERT INTO outgoing_chunk (to_friend, sequence_number, chunks_start_sequence_number,
             num_chunks, message_uid, content, system)
         VALUES (?1, ?2, ?2, 1, NULL, ?3, 1)",
        rusqlite::params![to_friend, seq, content],
    )?;
    Ok(seq)
}

/// Split a message into chunks for every recipient and record it as sent.
///
/// Each recipient gets its own body listing the others, so group members
/// can see who else received it.
pub fn queue_message(
    conn: &Connection,
    to_unique_names: &[String],
    message: &str,
    chunk_size: usize,
) -> Result<i64> {
    if to_unique_names.is_empty() {
        return Err(DbError::Constraint("message has no recipients".into()));
    }
    if chunk_size == 0 {
        return Err(DbError::Constraint("chunk size must be positive".into()));
    }

    let mut plan = Vec::with_capacity(to_unique_names.len());
    for name in to_unique_names {
        let friend = friends::get(conn, name)?;
        let body = MessageBody {
            other_recipients: to_unique_names
                .iter()
                .filter(|other| *other != name)
                .cloned()
                .collect(),
            text: message.to_string(),
        };
        let mut encoded = Vec::new();
        ciborium::into_writer(&body, &mut encoded)
            .map_err(|e| DbError::Serialization(e.to_string()))?;
        let pieces: Vec<Vec<u8>> = encoded.chunks(chunk_size).map(<[u8]>::to_vec).collect();
        plan.push((friend.uid, pieces));
    }

    let recipients: Vec<(FriendUid, u32)> = plan
        .iter()
        .map(|(uid, pieces)| (*uid, pieces.len() as u32))
        .collect();
    let message_uid = messages::insert_sent(conn, message, &recipients)?;

    for (uid, pieces) in plan {
        let start = next_sequence_number(conn, uid)?;
        let num_chunks = pieces.len() as u32;
        for (i, piece) in pieces.iter().enumerate() {
            conn.execute(
                "INSERT INTO outgoing_chunk (to_friend, sequence_number,
                     chunks_start_sequence_number, num_chunks, message_uid, content, system)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                rusqlite::params![uid, start + i as u32, start, num_chunks, message_uid, piece],
            )?;
        }
        tracing::debug!(friend_uid = uid, start, num_chunks, "queued message chunks");
    }
    Ok(message_uid)
}

/// The lowest pending chunk of one friend, chosen by priority then at random.
pub fn chunk_to_send(conn: &Connection, priority: &[FriendUid]) -> Result<Option<OutgoingChunk>> {
    let mut stmt = conn.prepare(
        "SELECT c.to_friend, MIN(c.sequence_number)
         FROM outgoing_chunk c JOIN friend f ON f.uid = c.to_friend
         WHERE f.deleted = 0
         GROUP BY c.to_friend",
    )?;
    let heads = stmt
        .query_map([], |row| Ok((row.get::<_, FriendUid>(0)?, row.get::<_, u32>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let chosen = priority
        .iter()
        .find_map(|uid| heads.iter().find(|(to, _)| to == uid))
        .or_else(|| heads.choose(&mut rand::thread_rng()));
    let Some(&(to_friend, sequence_number)) = chosen else {
        return Ok(None);
    };

    let chunk = conn.query_row(
        "SELECT c.to_friend, c.sequence_number, c.chunks_start_sequence_number, c.num_chunks,
                c.content, c.system, t.write_key
         FROM outgoing_chunk c JOIN transmission t ON t.friend_uid = c.to_friend
         WHERE c.to_friend = ?1 AND c.sequence_number = ?2",
        rusqlite::params![to_friend, sequence_number],
        |row| {
            Ok(OutgoingChunk {
                to_friend: row.get(0)?,
                sequence_number: row.get(1)?,
                chunks_start_sequence_number: row.get(2)?,
                num_chunks: row.get(3)?,
                content: row.get(4)?,
                system: row.get(5)?,
                write_key: key_column(row, 6)?,
            })
        },
    )?;
    Ok(Some(chunk))
}

/// One ack per live friend: how far we have received from them.
pub fn acks_to_send(conn: &Connection) -> Result<Vec<OutgoingAck>> {
    let mut stmt = conn.prepare(
        "SELECT t.friend_uid, t.ack_index, t.received_seqnum, t.write_key
         FROM transmission t JOIN friend f ON f.uid = t.friend_uid
         WHERE f.deleted = 0
         ORDER BY t.ack_index",
    )?;
    let acks = stmt
        .query_map([], |row| {
            Ok(OutgoingAck {
                to_friend: row.get(0)?,
                ack_index: row.get::<_, i64>(1)? as usize,
                received_seqnum: row.get(2)?,
                write_key: key_column(row, 3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(acks)
}

/// Apply an acknowledgement from a friend. Returns whether it was newer.
pub fn receive_ack(conn: &Connection, uid: FriendUid, ack: u32) -> Result<bool> {
    let old: Option<u32> = conn
        .query_row(
            "SELECT sent_acked_seqnum FROM transmission WHERE friend_uid = ?1",
            [uid],
            |row| row.get(0),
        )
        .optional()?;
    let Some(old) = old else {
        return Err(DbError::NotFound("transmission".into()));
    };
    if ack <= old {
        if ack < old {
            tracing::warn!(friend_uid = uid, ack, old, "ack older than acked-through counter");
        }
        return Ok(false);
    }

    conn.execute(
        "UPDATE transmission SET sent_acked_seqnum = ?1 WHERE friend_uid = ?2",
        rusqlite::params![ack, uid],
    )?;

    let invitation_acked: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM outgoing_chunk
                       WHERE to_friend = ?1 AND sequence_number <= ?2 AND system = 1)",
        rusqlite::params![uid, ack],
        |row| row.get(0),
    )?;
    if invitation_acked
        && friends::get_by_uid(conn, uid)?.progress == InvitationProgress::OutgoingAsync
    {
        friends::complete(conn, uid)?;
    }

    conn.execute(
        "DELETE FROM outgoing_chunk WHERE to_friend = ?1 AND sequence_number <= ?2",
        rusqlite::params![uid, ack],
    )?;
    let delivered = messages::update_delivered(conn, uid)?;
    tracing::debug!(friend_uid = uid, ack, delivered, "ack applied");
    Ok(true)
}

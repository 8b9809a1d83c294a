//! Delivered and sent message history.

use rusqlite::Connection;

use murmur_types::FriendUid;

use crate::{now, DbError, ReceivedMessage, Result, SentMessage};

/// Record a fully assembled incoming message. Returns its uid.
pub fn insert_received(
    conn: &Connection,
    from_friend: FriendUid,
    content: &str,
    other_recipients: &[String],
) -> Result<i64> {
    let recipients = serde_json::to_string(other_recipients)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO received_message (from_friend, content, other_recipients, received_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![from_friend, content, recipients, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn received(conn: &Connection, only_unseen: bool) -> Result<Vec<ReceivedMessage>> {
    let mut stmt = conn.prepare(
        "SELECT m.uid, f.unique_name, m.content, m.other_recipients, m.received_at, m.seen
         FROM received_message m JOIN friend f ON f.uid = m.from_friend
         WHERE (?1 = 0 OR m.seen = 0)
         ORDER BY m.received_at, m.uid",
    )?;
    let rows = stmt
        .query_map([only_unseen], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(uid, from, content, recipients, received_at, seen)| {
            let other_recipients = serde_json::from_str(&recipients)
                .map_err(|e| DbError::Serialization(e.to_string()))?;
            Ok(ReceivedMessage {
                uid,
                from_unique_name: from,
                content,
                other_recipients,
                received_at,
                seen,
            })
        })
        .collect()
}

/// Create a sent message with one delivery row per recipient.
pub fn insert_sent(
    conn: &Connection,
    content: &str,
    recipients: &[(FriendUid, u32)],
) -> Result<i64> {
    conn.execute(
        "INSERT INTO sent_message (content, sent_at) VALUES (?1, ?2)",
        rusqlite::params![content, now()],
    )?;
    let uid = conn.last_insert_rowid();
    for (friend, num_chunks) in recipients {
        conn.execute(
            "INSERT INTO sent_message_friend (sent_message_uid, to_friend, num_chunks)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![uid, friend, num_chunks],
        )?;
    }
    Ok(uid)
}

/// Mark per-recipient rows with nothing left in the outbox as delivered,
/// then whole messages whose recipients all have been.
pub fn update_delivered(conn: &Connection, to_friend: FriendUid) -> Result<usize> {
    let at = now();
    let newly = conn.execute(
        "UPDATE sent_message_friend SET delivered = 1, delivered_at = ?1
         WHERE to_friend = ?2 AND delivered = 0
           AND NOT EXISTS (
               SELECT 1 FROM outgoing_chunk c
               WHERE c.to_friend = sent_message_friend.to_friend
                 AND c.message_uid = sent_message_friend.sent_message_uid)",
        rusqlite::params![at, to_friend],
    )?;
    if newly > 0 {
        conn.execute(
            "UPDATE sent_message SET delivered = 1, delivered_at = ?1
             WHERE delivered = 0
               AND NOT EXISTS (
                   SELECT 1 FROM sent_message_friend r
                   WHERE r.sent_message_uid = sent_message.uid AND r.delivered = 0)",
            [at],
        )?;
    }
    Ok(newly)
}

pub fn sent(conn: &Connection) -> Result<Vec<SentMessage>> {
    let mut stmt = conn.prepare(
        "SELECT uid, content, sent_at, delivered FROM sent_message ORDER BY sent_at, uid",
    )?;
    let mut messages = stmt
        .query_map([], |row| {
            Ok(SentMessage {
                uid: row.get(0)?,
                to: Vec::new(),
                content: row.get(1)?,
                sent_at: row.get(2)?,
                delivered: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut to_stmt = conn.prepare(
        "SELECT f.unique_name FROM sent_message_friend r
         JOIN friend f ON f.uid = r.to_friend
         WHERE r.sent_message_uid = ?1 ORDER BY f.unique_name",
    )?;
    for message in &mut messages {
        message.to = to_stmt
            .query_map([message.uid], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
    }
    Ok(messages)
}

pub fn mark_seen(conn: &Connection, uid: i64) -> Result<()> {
    let changed = conn.execute("UPDATE received_message SET seen = 1 WHERE uid = ?1", [uid])?;
    if changed == 0 {
        return Err(DbError::NotFound("received message".into()));
    }
    Ok(())
}

pub fn has_unseen(conn: &Connection) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM received_message WHERE seen = 0)",
        [],
        |row| row.get(0),
    )?)
}

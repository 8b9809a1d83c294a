//! Async invitations in both directions.

use rusqlite::{Connection, OptionalExtension};

use murmur_types::FriendUid;

use crate::queries::{friends, messages, outbox, registration};
use crate::{
    key_column, not_found, now, DbError, Friend, IncomingInvitation, InvitationProgress,
    NewFriend, NewOutgoingInvitation, OutgoingInvitation, Result,
};

/// What became of an incoming invitation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncomingOutcome {
    /// Stored (or refreshed) as pending.
    Pending,
    /// Matched our own outgoing invitation; the friend is now complete.
    Completed(FriendUid),
    /// Already a complete friend.
    Ignored,
}

/// Create an outgoing-async friend and queue the control chunk that carries
/// our public id.
pub fn add_outgoing(conn: &Connection, invitation: &NewOutgoingInvitation) -> Result<Friend> {
    let public_id = &invitation.friend.public_id;
    let incoming: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM incoming_invitation WHERE public_id = ?1)",
        [public_id],
        |row| row.get(0),
    )?;
    if incoming {
        return Err(DbError::Constraint(
            "they already invited you; accept their invitation instead".into(),
        ));
    }
    let pending: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outgoing_async_invitation",
        [],
        |row| row.get(0),
    )?;
    if pending > 0 {
        return Err(DbError::Constraint(
            "only one outgoing async invitation may be pending".into(),
        ));
    }

    let uid = friends::create(conn, &invitation.friend, InvitationProgress::OutgoingAsync)?;
    conn.execute(
        "INSERT INTO outgoing_async_invitation (friend_uid, public_id, invitation_public_key,
             message, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            uid,
            public_id,
            invitation.invitation_public_key.as_slice(),
            invitation.message,
            now(),
        ],
    )?;

    let my_public_id = registration::public_id(conn)?;
    outbox::queue_system_chunk(conn, uid, my_public_id.as_bytes())?;
    tracing::info!(friend_uid = uid, "outgoing async invitation added");
    friends::get_by_uid(conn, uid)
}

/// Cancel an outgoing invitation; the pending friend is marked deleted.
pub fn remove_outgoing(conn: &Connection, public_id: &str) -> Result<()> {
    let name: String = conn
        .query_row(
            "SELECT f.unique_name FROM outgoing_async_invitation o
             JOIN friend f ON f.uid = o.friend_uid
             WHERE o.public_id = ?1",
            [public_id],
            |row| row.get(0),
        )
        .map_err(not_found("outgoing invitation"))?;
    friends::delete(conn, &name)
}

pub fn outgoing(conn: &Connection) -> Result<Vec<OutgoingInvitation>> {
    let mut stmt = conn.prepare(
        "SELECT o.friend_uid, f.unique_name, o.public_id, o.invitation_public_key, o.message,
                o.sent_at
         FROM outgoing_async_invitation o JOIN friend f ON f.uid = o.friend_uid
         WHERE f.deleted = 0
         ORDER BY o.sent_at",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(OutgoingInvitation {
                friend_uid: row.get(0)?,
                unique_name: row.get(1)?,
                public_id: row.get(2)?,
                invitation_public_key: key_column(row, 3)?,
                message: row.get(4)?,
                sent_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Record an invitation found on the server.
pub fn add_incoming(conn: &Connection, public_id: &str, message: &str) -> Result<IncomingOutcome> {
    if let Some(friend) = friends::find_by_public_id(conn, public_id)? {
        if friend.progress == InvitationProgress::Complete {
            return Ok(IncomingOutcome::Ignored);
        }
    }

    let matching: Option<FriendUid> = conn
        .query_row(
            "SELECT o.friend_uid FROM outgoing_async_invitation o
             JOIN friend f ON f.uid = o.friend_uid
             WHERE o.public_id = ?1 AND f.deleted = 0",
            [public_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(uid) = matching {
        friends::complete(conn, uid)?;
        messages::insert_received(conn, uid, message, &[])?;
        return Ok(IncomingOutcome::Completed(uid));
    }

    conn.execute(
        "INSERT INTO incoming_invitation (public_id, message, received_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(public_id) DO UPDATE SET message = excluded.message",
        rusqlite::params![public_id, message, now()],
    )?;
    Ok(IncomingOutcome::Pending)
}

pub fn incoming(conn: &Connection) -> Result<Vec<IncomingInvitation>> {
    let mut stmt = conn.prepare(
        "SELECT public_id, message, received_at FROM incoming_invitation ORDER BY received_at",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(IncomingInvitation {
                public_id: row.get(0)?,
                message: row.get(1)?,
                received_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Turn a pending incoming invitation into a complete friend.
pub fn accept_incoming(conn: &Connection, friend: &NewFriend) -> Result<Friend> {
    let removed = conn.execute(
        "DELETE FROM incoming_invitation WHERE public_id = ?1",
        [&friend.public_id],
    )?;
    if removed == 0 {
        return Err(DbError::NotFound("incoming invitation".into()));
    }
    let uid = friends::create(conn, friend, InvitationProgress::Complete)?;
    friends::get_by_uid(conn, uid)
}

pub fn deny_incoming(conn: &Connection, public_id: &str) -> Result<()> {
    let removed = conn.execute(
        "DELETE FROM incoming_invitation WHERE public_id = ?1",
        [public_id],
    )?;
    if removed == 0 {
        return Err(DbError::NotFound("incoming invitation".into()));
    }
    Ok(())
}

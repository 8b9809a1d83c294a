//! Friend records and their transmission state.

use rand::seq::SliceRandom;
use rusqlite::{Connection, OptionalExtension};

use murmur_types::{FriendUid, MAX_FRIENDS};

use crate::{
    key_column, not_found, now, Address, DbError, Friend, InvitationProgress, NewFriend, Result,
};

fn friend_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Friend> {
    Ok(Friend {
        uid: row.get(0)?,
        unique_name: row.get(1)?,
        public_id: row.get(2)?,
        progress: InvitationProgress::from_sql(row.get(3)?),
        deleted: row.get(4)?,
    })
}

fn address_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Address> {
    Ok(Address {
        uid: row.get(0)?,
        read_index: row.get(1)?,
        read_key: key_column(row, 2)?,
        write_key: key_column(row, 3)?,
        ack_index: row.get::<_, i64>(4)? as usize,
    })
}

/// Get a live (non-deleted) friend by unique name.
pub fn get(conn: &Connection, unique_name: &str) -> Result<Friend> {
    conn.query_row(
        "SELECT uid, unique_name, public_id, progress, deleted
         FROM friend WHERE unique_name = ?1 AND deleted = 0",
        [unique_name],
        friend_from_row,
    )
    .map_err(not_found("friend"))
}

pub fn get_by_uid(conn: &Connection, uid: FriendUid) -> Result<Friend> {
    conn.query_row(
        "SELECT uid, unique_name, public_id, progress, deleted FROM friend WHERE uid = ?1",
        [uid],
        friend_from_row,
    )
    .map_err(not_found("friend"))
}

/// Find a live friend by public id.
pub fn find_by_public_id(conn: &Connection, public_id: &str) -> Result<Option<Friend>> {
    Ok(conn
        .query_row(
            "SELECT uid, unique_name, public_id, progress, deleted
             FROM friend WHERE public_id = ?1 AND deleted = 0",
            [public_id],
            friend_from_row,
        )
        .optional()?)
}

/// List all live friends, ordered by name.
pub fn list(conn: &Connection) -> Result<Vec<Friend>> {
    let mut stmt = conn.prepare(
        "SELECT uid, unique_name, public_id, progress, deleted
         FROM friend WHERE deleted = 0 ORDER BY unique_name",
    )?;
    let rows = stmt
        .query_map([], friend_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Check that a new friend fits: free name, free ack slot, unknown key.
pub fn can_add(conn: &Connection, unique_name: &str, kx_public_key: &[u8; 32]) -> Result<()> {
    let name_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friend WHERE unique_name = ?1 AND deleted = 0)",
        [unique_name],
        |row| row.get(0),
    )?;
    if name_taken {
        return Err(DbError::Constraint(format!(
            "a friend named {unique_name} already exists"
        )));
    }

    let live: i64 = conn.query_row("SELECT COUNT(*) FROM friend WHERE deleted = 0", [], |row| {
        row.get(0)
    })?;
    if live as usize >= MAX_FRIENDS {
        return Err(DbError::Constraint(format!(
            "friend limit of {MAX_FRIENDS} reached"
        )));
    }

    let key_known: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM friend WHERE kx_public_key = ?1 AND deleted = 0)",
        [kx_public_key.as_slice()],
        |row| row.get(0),
    )?;
    if key_known {
        return Err(DbError::Constraint(
            "already friends with this public key".into(),
        ));
    }
    Ok(())
}

/// Insert a friend and its transmission record. Returns the new uid.
pub fn create(
    conn: &Connection,
    friend: &NewFriend,
    progress: InvitationProgress,
) -> Result<FriendUid> {
    can_add(conn, &friend.unique_name, &friend.kx_public_key)?;

    let completed_at = (progress == InvitationProgress::Complete).then(now);
    conn.execute(
        "INSERT INTO friend (unique_name, public_id, kx_public_key, progress, created_at,
             completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            friend.unique_name,
            friend.public_id,
            friend.kx_public_key.as_slice(),
            progress.to_sql(),
            now(),
            completed_at,
        ],
    )?;
    let uid = conn.last_insert_rowid();

    let ack_index = free_ack_index(conn)?;
    conn.execute(
        "INSERT INTO transmission (friend_uid, read_index, read_key, write_key, ack_index)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            uid,
            friend.read_index,
            friend.read_key.as_slice(),
            friend.write_key.as_slice(),
            ack_index as i64,
        ],
    )?;
    Ok(uid)
}

/// Pick a random ack slot not held by a live friend.
fn free_ack_index(conn: &Connection) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT t.ack_index FROM transmission t
         JOIN friend f ON f.uid = t.friend_uid
         WHERE f.deleted = 0",
    )?;
    let used = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let free: Vec<usize> = (0..MAX_FRIENDS)
        .filter(|i| !used.contains(&(*i as i64)))
        .collect();
    free.choose(&mut rand::thread_rng())
        .copied()
        .ok_or_else(|| DbError::Constraint("no free ack slot".into()))
}

/// Promote an outgoing-async friend to complete and drop its invitation.
pub fn complete(conn: &Connection, uid: FriendUid) -> Result<()> {
    conn.execute(
        "UPDATE friend SET progress = ?1, completed_at = ?2 WHERE uid = ?3",
        rusqlite::params![InvitationProgress::Complete.to_sql(), now(), uid],
    )?;
    conn.execute(
        "DELETE FROM outgoing_async_invitation WHERE friend_uid = ?1",
        [uid],
    )?;
    tracing::info!(friend_uid = uid, "friend is now complete");
    Ok(())
}

/// Mark a friend deleted and drop everything still queued for them.
pub fn delete(conn: &Connection, unique_name: &str) -> Result<()> {
    let friend = get(conn, unique_name)?;
    conn.execute("UPDATE friend SET deleted = 1 WHERE uid = ?1", [friend.uid])?;
    conn.execute("DELETE FROM outgoing_chunk WHERE to_friend = ?1", [friend.uid])?;
    conn.execute("DELETE FROM incoming_chunk WHERE from_friend = ?1", [friend.uid])?;
    conn.execute(
        "DELETE FROM outgoing_async_invitation WHERE friend_uid = ?1",
        [friend.uid],
    )?;
    Ok(())
}

/// Address of a live friend.
pub fn address(conn: &Connection, uid: FriendUid) -> Result<Address> {
    conn.query_row(
        "SELECT t.friend_uid, t.read_index, t.read_key, t.write_key, t.ack_index
         FROM transmission t JOIN friend f ON f.uid = t.friend_uid
         WHERE t.friend_uid = ?1 AND f.deleted = 0",
        [uid],
        address_from_row,
    )
    .map_err(not_found("address"))
}

/// A random live friend's address, skipping the given uids.
pub fn random_address_excluding(
    conn: &Connection,
    excluding: &[FriendUid],
) -> Result<Option<Address>> {
    let mut stmt = conn.prepare(
        "SELECT t.friend_uid, t.read_index, t.read_key, t.write_key, t.ack_index
         FROM transmission t JOIN friend f ON f.uid = t.friend_uid
         WHERE f.deleted = 0",
    )?;
    let candidates = stmt
        .query_map([], address_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|a| !excluding.contains(&a.uid))
        .collect::<Vec<_>>();
    Ok(candidates.choose(&mut rand::thread_rng()).cloned())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn new_friend(name: &str, key_byte: u8) -> NewFriend {
        NewFriend {
            unique_name: name.into(),
            public_id: format!("{name}-public-id"),
            kx_public_key: [key_byte; 32],
            read_index: key_byte as u32,
            read_key: [key_byte.wrapping_add(1); 32],
            write_key: [key_byte.wrapping_add(2); 32],
        }
    }

    #[test]
    fn test_create_and_get() {
        let conn = crate::open_memory().expect("open");
        let uid = create(&conn, &new_friend("bob", 10), InvitationProgress::Complete)
            .expect("create");

        let friend = get(&conn, "bob").expect("get");
        assert_eq!(friend.uid, uid);
        assert_eq!(friend.progress, InvitationProgress::Complete);
        assert!(!friend.deleted);

        let addr = address(&conn, uid).expect("address");
        assert_eq!(addr.read_index, 10);
        assert_eq!(addr.read_key, [11u8; 32]);
        assert!(addr.ack_index < MAX_FRIENDS);
    }

    #[test]
    fn test_duplicate_name_and_key_rejected() {
        let conn = crate::open_memory().expect("open");
        create(&conn, &new_friend("bob", 10), InvitationProgress::Complete).expect("create");

        let same_name = create(&conn, &new_friend("bob", 11), InvitationProgress::Complete);
        assert!(matches!(same_name, Err(DbError::Constraint(_))));

        let mut same_key = new_friend("carol", 10);
        same_key.public_id = "other".into();
        let same_key = create(&conn, &same_key, InvitationProgress::Complete);
        assert!(matches!(same_key, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_ack_indices_distinct_and_limit_enforced() {
        let conn = crate::open_memory().expect("open");
        let mut slots = Vec::new();
        for i in 0..MAX_FRIENDS {
            let uid = create(
                &conn,
                &new_friend(&format!("friend{i}"), i as u8 + 1),
                InvitationProgress::Complete,
            )
            .expect("create");
            slots.push(address(&conn, uid).expect("address").ack_index);
        }
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), MAX_FRIENDS);

        let over = create(&conn, &new_friend("one-too-many", 200), InvitationProgress::Complete);
        assert!(matches!(over, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_delete_frees_name() {
        let conn = crate::open_memory().expect("open");
        create(&conn, &new_friend("bob", 10), InvitationProgress::Complete).expect("create");
        delete(&conn, "bob").expect("delete");

        assert!(matches!(get(&conn, "bob"), Err(DbError::NotFound(_))));
        assert!(list(&conn).expect("list").is_empty());
        create(&conn, &new_friend("bob", 12), InvitationProgress::Complete)
            .expect("name reusable after delete");
    }

    #[test]
    fn test_random_address_excluding() {
        let conn = crate::open_memory().expect("open");
        assert!(random_address_excluding(&conn, &[]).expect("query").is_none());

        let a = create(&conn, &new_friend("a", 1), InvitationProgress::Complete).expect("a");
        let b = create(&conn, &new_friend("b", 2), InvitationProgress::OutgoingAsync)
            .expect("b");
        let picked = random_address_excluding(&conn, &[a]).expect("query").expect("some");
        assert_eq!(picked.uid, b);
        assert!(random_address_excluding(&conn, &[a, b]).expect("query").is_none());
    }

    #[test]
    fn test_complete_promotes() {
        let conn = crate::open_memory().expect("open");
        let uid = create(&conn, &new_friend("bob", 10), InvitationProgress::OutgoingAsync)
            .expect("create");
        complete(&conn, uid).expect("complete");
        assert_eq!(
            get_by_uid(&conn, uid).expect("get").progress,
            InvitationProgress::Complete
        );
    }
}

//! The local account's registration.

use rusqlite::{Connection, OptionalExtension};

use crate::{key_column, not_found, now, Registration, Result};

pub fn has_registered(conn: &Connection) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM registration WHERE id = 1", [], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Store the registration. Fails if one already exists.
pub fn insert(conn: &Connection, reg: &Registration) -> Result<()> {
    conn.execute(
        "INSERT INTO registration (id, name, invitation_public_key, invitation_private_key,
             kx_public_key, kx_private_key, allocation, authentication_token, public_id,
             registered_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            reg.name,
            reg.invitation_public_key.as_slice(),
            reg.invitation_private_key.as_slice(),
            reg.kx_public_key.as_slice(),
            reg.kx_private_key.as_slice(),
            reg.allocation,
            reg.authentication_token,
            reg.public_id,
            now(),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection) -> Result<Registration> {
    conn.query_row(
        "SELECT name, invitation_public_key, invitation_private_key, kx_public_key,
                kx_private_key, allocation, authentication_token, public_id
         FROM registration WHERE id = 1",
        [],
        |row| {
            Ok(Registration {
                name: row.get(0)?,
                invitation_public_key: key_column(row, 1)?,
                invitation_private_key: key_column(row, 2)?,
                kx_public_key: key_column(row, 3)?,
                kx_private_key: key_column(row, 4)?,
                allocation: row.get(5)?,
                authentication_token: row.get(6)?,
                public_id: row.get(7)?,
            })
        },
    )
    .map_err(not_found("registration"))
}

/// Public id of the local account.
pub fn public_id(conn: &Connection) -> Result<String> {
    conn.query_row("SELECT public_id FROM registration WHERE id = 1", [], |row| {
        row.get(0)
    })
    .map_err(not_found("registration"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::DbError;

    pub(crate) fn sample() -> Registration {
        Registration {
            name: "alice".into(),
            invitation_public_key: [1u8; 32],
            invitation_private_key: [2u8; 32],
            kx_public_key: [3u8; 32],
            kx_private_key: [4u8; 32],
            allocation: 7,
            authentication_token: "token".into(),
            public_id: "alice-public-id".into(),
        }
    }

    #[test]
    fn test_register_and_get() {
        let conn = crate::open_memory().expect("open");
        assert!(!has_registered(&conn).expect("query"));
        assert!(matches!(get(&conn), Err(DbError::NotFound(_))));

        insert(&conn, &sample()).expect("insert");
        assert!(has_registered(&conn).expect("query"));
        let reg = get(&conn).expect("get");
        assert_eq!(reg.allocation, 7);
        assert_eq!(reg.kx_private_key, [4u8; 32]);
        assert_eq!(public_id(&conn).expect("id"), "alice-public-id");
    }

    #[test]
    fn test_double_registration_rejected() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample()).expect("insert");
        assert!(insert(&conn, &sample()).is_err());
    }
}

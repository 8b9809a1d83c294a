//! Account managers: which token may write which index.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};

use murmur_types::{PirIndex, AUTHENTICATION_TOKEN_SIZE};

use crate::{Result, ServerError};

/// Issues authentication tokens and checks index ownership.
pub trait AccountManager: Send + Sync {
    /// Create an account owning `allocation`. Returns its token.
    fn generate_account(&self, public_key: &[u8], allocation: PirIndex) -> Result<String>;

    fn valid_index_access(&self, token: &str, index: PirIndex) -> Result<bool>;

    /// Highest allocated index, if any account exists.
    fn max_allocation(&self) -> Result<Option<PirIndex>>;

    /// `(index, invitation public key)` of every account.
    fn registered_keys(&self) -> Result<Vec<(PirIndex, Vec<u8>)>>;
}

fn new_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(AUTHENTICATION_TOKEN_SIZE)
        .map(char::from)
        .collect()
}

fn poisoned<T>(_: T) -> ServerError {
    ServerError::Internal("account lock poisoned".into())
}

#[derive(Default)]
pub struct InMemoryAccountManager {
    accounts: Mutex<HashMap<String, (PirIndex, Vec<u8>)>>,
}

impl InMemoryAccountManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountManager for InMemoryAccountManager {
    fn generate_account(&self, public_key: &[u8], allocation: PirIndex) -> Result<String> {
        let token = new_token();
        self.accounts
            .lock()
            .map_err(poisoned)?
            .insert(token.clone(), (allocation, public_key.to_vec()));
        Ok(token)
    }

    fn valid_index_access(&self, token: &str, index: PirIndex) -> Result<bool> {
        let accounts = self.accounts.lock().map_err(poisoned)?;
        Ok(accounts.get(token).is_some_and(|(i, _)| *i == index))
    }

    fn max_allocation(&self) -> Result<Option<PirIndex>> {
        let accounts = self.accounts.lock().map_err(poisoned)?;
        Ok(accounts.values().map(|(i, _)| *i).max())
    }

    fn registered_keys(&self) -> Result<Vec<(PirIndex, Vec<u8>)>> {
        let accounts = self.accounts.lock().map_err(poisoned)?;
        Ok(accounts.values().cloned().collect())
    }
}

/// Accounts persisted in SQLite so a restarted server keeps its users.
pub struct SqliteAccountManager {
    conn: Mutex<Connection>,
}

const ACCOUNTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    authentication_token TEXT PRIMARY KEY,
    public_key BLOB NOT NULL,
    pir_index INTEGER NOT NULL UNIQUE
);";

impl SqliteAccountManager {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(ACCOUNTS_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl AccountManager for SqliteAccountManager {
    fn generate_account(&self, public_key: &[u8], allocation: PirIndex) -> Result<String> {
        let token = new_token();
        self.conn.lock().map_err(poisoned)?.execute(
            "INSERT INTO accounts (authentication_token, public_key, pir_index)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![token, public_key, allocation],
        )?;
        Ok(token)
    }

    fn valid_index_access(&self, token: &str, index: PirIndex) -> Result<bool> {
        let owned: Option<PirIndex> = self
            .conn
            .lock()
            .map_err(poisoned)?
            .query_row(
                "SELECT pir_index FROM accounts WHERE authentication_token = ?1",
                [token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owned == Some(index))
    }

    fn max_allocation(&self) -> Result<Option<PirIndex>> {
        let max = self.conn.lock().map_err(poisoned)?.query_row(
            "SELECT MAX(pir_index) FROM accounts",
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn registered_keys(&self) -> Result<Vec<(PirIndex, Vec<u8>)>> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let mut stmt = conn.prepare("SELECT pir_index, public_key FROM accounts")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(manager: &dyn AccountManager) {
        assert_eq!(manager.max_allocation().expect("max"), None);

        let token = manager.generate_account(&[1u8; 32], 0).expect("account");
        assert_eq!(token.len(), AUTHENTICATION_TOKEN_SIZE);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        let other = manager.generate_account(&[2u8; 32], 1).expect("account");
        assert_ne!(token, other);

        assert!(manager.valid_index_access(&token, 0).expect("check"));
        assert!(!manager.valid_index_access(&token, 1).expect("check"));
        assert!(!manager.valid_index_access("bogus", 0).expect("check"));
        assert_eq!(manager.max_allocation().expect("max"), Some(1));

        let mut keys = manager.registered_keys().expect("keys");
        keys.sort();
        assert_eq!(keys, vec![(0, vec![1u8; 32]), (1, vec![2u8; 32])]);
    }

    #[test]
    fn test_in_memory_manager() {
        exercise(&InMemoryAccountManager::new());
    }

    #[test]
    fn test_sqlite_manager() {
        exercise(&SqliteAccountManager::open_memory().expect("open"));
    }

    #[test]
    fn test_sqlite_manager_persists() {
        let dir = std::env::temp_dir().join(format!("murmur-accounts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("accounts.db");
        let token = {
            let manager = SqliteAccountManager::open(&path).expect("open");
            manager.generate_account(&[3u8; 32], 4).expect("account")
        };
        let manager = SqliteAccountManager::open(&path).expect("reopen");
        assert!(manager.valid_index_access(&token, 4).expect("check"));
        assert_eq!(manager.max_allocation().expect("max"), Some(4));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Configuration file management.
//!
//! Loaded from `$MURMUR_DATA_DIR/config.toml`, falling back to defaults for
//! anything missing.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use murmur_pir::PirScheme;
use murmur_server::AdmissionPolicy;
use murmur_types::{ASYNC_INVITATION_BATCH_SIZE, CLIENT_DB_ROWS};

use crate::transmitter::TransmitterSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rounds: RoundsConfig,
    #[serde(default)]
    pub pir: PirConfig,
    /// The in-process server of the single-host binary.
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Round timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundsConfig {
    #[serde(default = "default_round_interval_ms")]
    pub round_interval_ms: u64,
    /// Pause after a failed round.
    #[serde(default = "default_round_backoff_ms")]
    pub round_backoff_ms: u64,
    /// Deadline for every server call.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PirConfig {
    #[serde(default)]
    pub scheme: PirScheme,
    /// Database size every query is shaped for. Fixed on the client so that
    /// queries never reveal what the client believes the size to be.
    #[serde(default = "default_client_db_rows")]
    pub client_db_rows: usize,
    /// Invitation board entries fetched per round.
    #[serde(default = "default_async_invitation_batch_size")]
    pub async_invitation_batch_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Accepted admission keys. Ignored when `open_registration` is set.
    #[serde(default)]
    pub admission_keys: Vec<String>,
    #[serde(default)]
    pub open_registration: bool,
    /// Account database path. Empty = in memory.
    #[serde(default)]
    pub accounts_db: String,
}

fn default_round_interval_ms() -> u64 {
    1000
}

fn default_round_backoff_ms() -> u64 {
    5000
}

fn default_rpc_timeout_secs() -> u64 {
    60
}

fn default_client_db_rows() -> usize {
    CLIENT_DB_ROWS
}

fn default_async_invitation_batch_size() -> u32 {
    ASYNC_INVITATION_BATCH_SIZE
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            round_interval_ms: default_round_interval_ms(),
            round_backoff_ms: default_round_backoff_ms(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

impl Default for PirConfig {
    fn default() -> Self {
        Self {
            scheme: PirScheme::default(),
            client_db_rows: default_client_db_rows(),
            async_invitation_batch_size: default_async_invitation_batch_size(),
        }
    }
}

impl RoundsConfig {
    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    pub fn round_backoff(&self) -> Duration {
        Duration::from_millis(self.round_backoff_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

impl PirConfig {
    pub fn transmitter_settings(&self) -> TransmitterSettings {
        TransmitterSettings {
            scheme: self.scheme,
            client_db_rows: self.client_db_rows,
            async_invitation_batch_size: self.async_invitation_batch_size,
        }
    }
}

impl ServerConfig {
    pub fn admission_policy(&self) -> AdmissionPolicy {
        if self.open_registration {
            AdmissionPolicy::Open
        } else {
            AdmissionPolicy::with_keys(self.admission_keys.iter().cloned())
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("MURMUR_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".murmur"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/murmur"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.rounds.round_interval(), Duration::from_secs(1));
        assert_eq!(config.rounds.round_backoff(), Duration::from_secs(5));
        assert_eq!(config.rounds.rpc_timeout(), Duration::from_secs(60));
        assert_eq!(config.pir.scheme, PirScheme::Homomorphic);
        assert_eq!(config.pir.client_db_rows, CLIENT_DB_ROWS);
        assert_eq!(config.pir.async_invitation_batch_size, 1000);
        assert!(!config.server.open_registration);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [pir]
            scheme = "nonprivate"

            [rounds]
            round_interval_ms = 250
            "#,
        )
        .expect("parse");
        assert_eq!(config.pir.scheme, PirScheme::NonPrivate);
        assert_eq!(config.pir.client_db_rows, CLIENT_DB_ROWS);
        assert_eq!(config.rounds.round_interval_ms, 250);
        assert_eq!(config.rounds.round_backoff_ms, 5000);
    }

    #[test]
    fn test_admission_policy() {
        let mut server = ServerConfig {
            admission_keys: vec!["k1".into()],
            ..ServerConfig::default()
        };
        assert!(server.admission_policy().admits("k1"));
        assert!(!server.admission_policy().admits("k2"));
        server.open_registration = true;
        assert!(server.admission_policy().admits("k2"));
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }
}

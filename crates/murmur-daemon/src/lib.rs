//! # murmur-daemon
//!
//! The client daemon: a round loop that keeps constant-shape traffic flowing
//! to the server, and the commands a user drives it with.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration under the data directory
//! - [`context`]: shared store handle and notification channels
//! - [`connection`]: the server seam and its in-process implementation
//! - [`transmitter`]: one round of retrieve and send
//! - [`rounds`]: the background loop driving the transmitter
//! - [`commands`]: registration, invitations and messaging

pub mod commands;
pub mod config;
pub mod connection;
pub mod context;
pub mod rounds;
pub mod transmitter;

pub use config::DaemonConfig;
pub use connection::{LocalConnection, RpcError, ServerConnection};
pub use context::DaemonContext;
pub use transmitter::{Transmitter, TransmitterError, TransmitterSettings};

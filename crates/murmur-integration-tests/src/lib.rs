//! Integration test fixtures for the Murmur protocol.
//!
//! A [`Node`] is one client: its own store, its own transmitter, and a
//! connection to a server shared with the other nodes. Tests drive rounds by
//! hand instead of through the timed loop.
//!
//! Run the slow homomorphic scenarios too:
//! ```sh
//! cargo test -p murmur-integration-tests -- --include-ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use murmur_daemon::{commands, DaemonContext, LocalConnection, Transmitter, TransmitterSettings};
use murmur_db::{InvitationProgress, SqliteStore};
use murmur_pir::PirScheme;
use murmur_server::{AdmissionPolicy, InMemoryAccountManager, Server};

/// Rows every test query is shaped for. Small, so one crawl covers the board.
pub const TEST_DB_ROWS: usize = 16;

pub fn server(scheme: PirScheme) -> anyhow::Result<Arc<Server>> {
    let server = Server::new(
        scheme,
        Box::new(InMemoryAccountManager::new()),
        AdmissionPolicy::Open,
    )?;
    Ok(Arc::new(server))
}

pub struct Node {
    pub name: String,
    pub ctx: DaemonContext,
    pub conn: LocalConnection,
    pub transmitter: Transmitter<LocalConnection>,
    pub public_id: String,
}

impl Node {
    /// A registered client on `server`.
    pub async fn register(
        server: &Arc<Server>,
        scheme: PirScheme,
        name: &str,
    ) -> anyhow::Result<Self> {
        let ctx = DaemonContext::new(Arc::new(SqliteStore::open_memory()?));
        let conn = LocalConnection::new(Arc::clone(server), Duration::from_secs(120));
        let public_id = commands::register(&ctx, &conn, name, "").await?;
        let transmitter = Transmitter::new(
            &ctx,
            conn.clone(),
            TransmitterSettings {
                scheme,
                client_db_rows: TEST_DB_ROWS,
                async_invitation_batch_size: TEST_DB_ROWS as u32,
            },
        );
        Ok(Self {
            name: name.to_owned(),
            ctx,
            conn,
            transmitter,
            public_id,
        })
    }

    pub async fn round(&mut self) -> anyhow::Result<()> {
        self.transmitter
            .round()
            .await
            .with_context(|| format!("{} round failed", self.name))
    }

    pub fn progress_of(&self, friend: &str) -> anyhow::Result<InvitationProgress> {
        Ok(self.ctx.store.friend(friend)?.progress)
    }
}

/// One round for each node, in order.
pub async fn round_all(nodes: &mut [&mut Node]) -> anyhow::Result<()> {
    for node in nodes.iter_mut() {
        node.round().await?;
    }
    Ok(())
}

/// Run rounds until `done` holds, giving up after `max_rounds`.
pub async fn rounds_until<F>(
    nodes: &mut [&mut Node],
    max_rounds: usize,
    mut done: F,
) -> anyhow::Result<usize>
where
    F: FnMut(&[&mut Node]) -> anyhow::Result<bool>,
{
    for round in 1..=max_rounds {
        round_all(nodes).await?;
        if done(nodes)? {
            return Ok(round);
        }
    }
    bail!("condition not reached after {max_rounds} rounds")
}

/// Make `a` and `b` complete friends through the async invitation flow.
/// They know each other as `b.name` and `a.name`.
pub async fn befriend(a: &mut Node, b: &mut Node) -> anyhow::Result<()> {
    commands::add_async_friend(&a.ctx, &b.name, &b.public_id, "let's talk")?;

    let a_id = a.public_id.clone();
    rounds_until(&mut [&mut *a, &mut *b], 10, |nodes| {
        let incoming = nodes[1].ctx.store.incoming_invitations()?;
        Ok(incoming.iter().any(|i| i.public_id == a_id))
    })
    .await?;

    commands::accept_invitation(&b.ctx, &a.public_id, &a.name)?;

    let b_name = b.name.clone();
    rounds_until(&mut [&mut *a, &mut *b], 20, |nodes| {
        Ok(nodes[0].progress_of(&b_name)? == InvitationProgress::Complete)
    })
    .await?;
    Ok(())
}

//! The background round loop.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, info, warn};

use crate::connection::ServerConnection;
use crate::transmitter::{Transmitter, TransmitterError};

/// Run rounds until shutdown.
///
/// Recoverable errors are logged and followed by `backoff`; the next round
/// starts from fresh state. A fatal error stops the loop, since sending
/// anything further could break the fixed traffic shape.
///
/// Shutdown is only observed between rounds. A round always runs to
/// completion so a server reply is never dropped before it is stored.
pub async fn run<C: ServerConnection>(
    mut transmitter: Transmitter<C>,
    interval: Duration,
    backoff: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), TransmitterError> {
    info!(?interval, "round loop started");
    let mut round: u64 = 0;
    loop {
        if shutdown_requested(&mut shutdown_rx) {
            break;
        }
        round += 1;
        let pause = match transmitter.round().await {
            Ok(()) => interval,
            Err(e) if e.is_fatal() => {
                error!(round, error = %e, "fatal round error; stopping");
                return Err(e);
            }
            Err(e) => {
                warn!(round, error = %e, "round failed");
                backoff
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = shutdown_rx.recv() => break,
        }
    }
    info!(rounds = round, "round loop stopped");
    Ok(())
}

/// A shutdown sent while a round was in flight, or a closed channel.
fn shutdown_requested(shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
}

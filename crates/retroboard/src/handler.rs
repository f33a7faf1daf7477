//! Per-connection handler.
//!
//! Each accepted connection runs in its own task:
//!   1. register with the engine under a `PlayerId` derived from the
//!      connection id, handing it a fresh outbound channel
//!   2. loop: decode inbound frames into `ClientMessage`s for the engine,
//!      and wrap outbound `ServerMessage`s in numbered envelopes
//!   3. on exit, tell the engine the connection is gone

use std::sync::Arc;

use retroboard_protocol::{ClientMessage, Codec, Envelope, PlayerId};
use retroboard_room::EngineHandle;
use retroboard_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::RetroboardError;

/// Reports the connection as gone when the handler exits, including on
/// error or panic. `Drop` is synchronous, so the notification is spawned.
struct DisconnectGuard {
    player_id: PlayerId,
    engine: EngineHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if engine.disconnect(player_id).await.is_err() {
                tracing::debug!(%player_id, "engine gone before disconnect");
            }
        });
    }
}

/// Handles one connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RetroboardError> {
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    let (outbound_tx, mut outbound) = mpsc::unbounded_channel();

    state.engine.connect(player_id, outbound_tx).await?;
    let _guard = DisconnectGuard {
        player_id,
        engine: state.engine.clone(),
    };
    tracing::info!(%conn_id, %player_id, peer = %conn.peer_addr(), "connection opened");

    let clock = state.engine.clock();
    let mut seq: u64 = 1;

    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => match state.codec.decode::<ClientMessage>(&data) {
                    Ok(msg) => state.engine.send_message(player_id, msg).await?,
                    Err(e) => tracing::debug!(%conn_id, error = %e, "undecodable frame dropped"),
                },
                Ok(None) => {
                    tracing::info!(%conn_id, %player_id, "connection closed");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv failed");
                    break;
                }
            },
            Some(message) = outbound.recv() => {
                let envelope = Envelope {
                    seq: next_seq(&mut seq),
                    timestamp: clock.now_ms(),
                    message,
                };
                let bytes = state.codec.encode(&envelope)?;
                conn.send(&bytes).await?;
            }
        }
    }

    Ok(())
}

/// Returns the current sequence number and advances it.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

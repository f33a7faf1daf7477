//! The engine actor: one Tokio task that owns every room.
//!
//! Connection handlers never touch rooms. They send commands through an
//! [`EngineHandle`], and the engine task applies them one at a time,
//! interleaved with fired room timers, in a single `select!` loop. That
//! loop is the only place room state is ever mutated.

use retroboard_protocol::{ClientMessage, PlayerId};
use retroboard_timer::{Clock, Fired};
use tokio::sync::{mpsc, oneshot};

use crate::room::RoomTimer;
use crate::{Outbound, RoomConfig, RoomError, RoomManager};

/// Default command channel size for the engine.
const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Commands sent to the engine through its channel.
pub(crate) enum EngineCommand {
    /// A connection opened.
    Connect { player: PlayerId, outbound: Outbound },

    /// A connection closed.
    Disconnect { player: PlayerId },

    /// A decoded message from a connection.
    Message { player: PlayerId, msg: ClientMessage },

    /// Number of live rooms.
    RoomCount { reply: oneshot::Sender<usize> },

    /// Stop the engine. Every room is dropped with its timers.
    Shutdown,
}

/// Handle to the running engine.
///
/// Cheap to clone. Every connection handler holds one.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
    clock: Clock,
}

impl EngineHandle {
    /// The engine's clock, for stamping outbound envelopes.
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Registers a connection. The engine greets it on `outbound`.
    pub async fn connect(&self, player: PlayerId, outbound: Outbound) -> Result<(), RoomError> {
        self.send(EngineCommand::Connect { player, outbound }).await
    }

    pub async fn disconnect(&self, player: PlayerId) -> Result<(), RoomError> {
        self.send(EngineCommand::Disconnect { player }).await
    }

    /// Forwards a client message (fire-and-forget).
    pub async fn send_message(&self, player: PlayerId, msg: ClientMessage) -> Result<(), RoomError> {
        self.send(EngineCommand::Message { player, msg }).await
    }

    pub async fn room_count(&self) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineCommand::RoomCount { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(EngineCommand::Shutdown).await
    }

    async fn send(&self, cmd: EngineCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| RoomError::Unavailable)
    }
}

/// The engine task state.
struct Engine {
    manager: RoomManager,
    commands: mpsc::Receiver<EngineCommand>,
    timers: mpsc::UnboundedReceiver<Fired<RoomTimer>>,
}

impl Engine {
    /// Runs until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!("room engine started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(EngineCommand::Connect { player, outbound }) => {
                        self.manager.connect(player, outbound);
                    }
                    Some(EngineCommand::Disconnect { player }) => {
                        self.manager.disconnect(player);
                    }
                    Some(EngineCommand::Message { player, msg }) => {
                        self.manager.handle(player, msg);
                    }
                    Some(EngineCommand::RoomCount { reply }) => {
                        let _ = reply.send(self.manager.room_count());
                    }
                    Some(EngineCommand::Shutdown) | None => break,
                },
                Some(fired) = self.timers.recv() => {
                    self.manager.on_timer(fired);
                }
            }
        }

        tracing::info!(rooms = self.manager.room_count(), "room engine stopped");
    }
}

/// Spawns the engine task and returns a handle to it.
pub fn spawn_engine(config: RoomConfig) -> EngineHandle {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let clock = Clock::new();

    let engine = Engine {
        manager: RoomManager::new(config, clock, timer_tx),
        commands: rx,
        timers: timer_rx,
    };
    tokio::spawn(engine.run());

    EngineHandle { sender: tx, clock }
}

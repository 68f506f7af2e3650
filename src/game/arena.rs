//! Arena state and authoritative tick loop

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::util::time::{tick_delta, tick_duration, unix_millis};
use crate::ws::protocol::ServerMsg;

use super::session::{ConnectionId, SessionRegistry};
use super::snapshot::SnapshotBuilder;
use super::world::World;

/// Capacity of the queue from connection handlers into the loop
const COMMAND_QUEUE_SIZE: usize = 1024;

/// Intent sent from a connection handler into the arena loop
#[derive(Debug)]
pub enum ArenaCommand {
    Join {
        connection_id: ConnectionId,
        username: String,
        outbound: mpsc::Sender<ServerMsg>,
    },
    Input {
        connection_id: ConnectionId,
        direction: Option<f32>,
    },
    Leave {
        connection_id: ConnectionId,
    },
}

/// Counters published by the loop for the health endpoint
#[derive(Debug, Default)]
pub struct ArenaStats {
    pub tick: AtomicU64,
    pub players: AtomicUsize,
    pub dropped_snapshots: AtomicU64,
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub command_tx: mpsc::Sender<ArenaCommand>,
    pub stats: Arc<ArenaStats>,
}

impl ArenaHandle {
    pub fn player_count(&self) -> usize {
        self.stats.players.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.stats.tick.load(Ordering::Relaxed)
    }

    pub fn dropped_snapshots(&self) -> u64 {
        self.stats.dropped_snapshots.load(Ordering::Relaxed)
    }
}

/// The authoritative arena. Owns the world; nothing else mutates it.
pub struct Arena {
    world: World,
    sessions: SessionRegistry,
    command_rx: mpsc::Receiver<ArenaCommand>,
    snapshot_builder: SnapshotBuilder,
    stats: Arc<ArenaStats>,
}

impl Arena {
    /// Create a new arena
    pub fn new(seed: u64) -> (Self, ArenaHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let stats = Arc::new(ArenaStats::default());

        let handle = ArenaHandle {
            command_tx,
            stats: stats.clone(),
        };

        let arena = Self {
            world: World::new(seed),
            sessions: SessionRegistry::new(),
            command_rx,
            snapshot_builder: SnapshotBuilder::default(),
            stats,
        };

        (arena, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(tick_ms = tick_duration().as_millis() as u64, "Arena started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Drain command queue
            if !self.process_commands() {
                info!("All arena handles dropped, stopping");
                break;
            }

            self.run_tick();
        }
    }

    /// Apply every pending command. Returns false once no sender is left.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_command(&mut self, command: ArenaCommand) {
        match command {
            ArenaCommand::Join {
                connection_id,
                username,
                outbound,
            } => {
                let result =
                    self.sessions
                        .add_player(&mut self.world, connection_id, &username, outbound.clone());
                if let Err(e) = result {
                    let _ = outbound.try_send(ServerMsg::Error {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
            ArenaCommand::Input {
                connection_id,
                direction,
            } => {
                self.sessions.set_input(&mut self.world, connection_id, direction);
            }
            ArenaCommand::Leave { connection_id } => {
                self.sessions.remove_player(&mut self.world, connection_id);
            }
        }
        self.publish_stats();
    }

    /// Run a single simulation tick and broadcast the result
    fn run_tick(&mut self) {
        let report = self.world.step(tick_delta());

        for hit in &report.hits {
            debug!(
                shooter_id = %hit.shooter_id,
                target_id = %hit.target_id,
                "Bullet hit"
            );
        }

        // Game over goes out before anyone sees the post-death snapshot
        for dead in report.deaths {
            let Some(session) = self.sessions.end_for_player(dead.id) else {
                continue;
            };

            info!(
                connection_id = %session.connection_id,
                player_id = %dead.id,
                score = dead.score as u64,
                "Player died"
            );

            if let Err(TrySendError::Full(msg)) = session.outbound.try_send(ServerMsg::GameOver) {
                // Must not be lost to backpressure, but must not stall the tick either
                let outbound = session.outbound.clone();
                tokio::spawn(async move {
                    let _ = outbound.send(msg).await;
                });
            }
        }

        self.broadcast();
        self.publish_stats();
    }

    /// Push a fresh snapshot to every connected player
    fn broadcast(&self) {
        let t = unix_millis();
        let leaderboard = SnapshotBuilder::leaderboard(&self.world);

        for session in self.sessions.iter() {
            let Some(snapshot) =
                self.snapshot_builder
                    .build(&self.world, session.player_id, t, &leaderboard)
            else {
                warn!(player_id = %session.player_id, "Session without player");
                continue;
            };

            match session.outbound.try_send(ServerMsg::GameUpdate(snapshot)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // Latest state wins, the next tick supersedes this one
                    self.stats.dropped_snapshots.fetch_add(1, Ordering::Relaxed);
                    debug!(connection_id = %session.connection_id, "Outbound full, snapshot dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection_id = %session.connection_id, "Outbound closed");
                }
            }
        }
    }

    fn publish_stats(&self) {
        debug_assert_eq!(
            self.sessions.len(),
            self.world.player_count(),
            "every player is controlled by exactly one session"
        );

        self.stats.tick.store(self.world.tick(), Ordering::Relaxed);
        self.stats
            .players
            .store(self.world.player_count(), Ordering::Relaxed);
    }
}

//! Connection session registry: ties a connection to the player it controls

use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::world::World;
use crate::ws::protocol::{is_valid_direction, normalize_username, PlayerId, ServerMsg};

/// Opaque id assigned to each WebSocket connection
pub type ConnectionId = Uuid;

/// A connection that currently controls a player
#[derive(Debug)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub player_id: PlayerId,
    /// Outbound queue drained by the connection's writer task
    pub outbound: mpsc::Sender<ServerMsg>,
}

/// Why a join was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("username is empty")]
    EmptyUsername,

    #[error("connection already controls a player")]
    AlreadyPlaying,
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::EmptyUsername => "empty_username",
            JoinError::AlreadyPlaying => "already_playing",
        }
    }
}

/// Maps connections to players. Only the arena loop touches it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    /// Reverse lookup used when the simulation reports a death
    by_player: HashMap<PlayerId, ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Session> {
        self.sessions.get(connection_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Spawn a player for this connection and start routing snapshots to `outbound`
    pub fn add_player(
        &mut self,
        world: &mut World,
        connection_id: ConnectionId,
        username: &str,
        outbound: mpsc::Sender<ServerMsg>,
    ) -> Result<PlayerId, JoinError> {
        if self.sessions.contains_key(&connection_id) {
            warn!(connection_id = %connection_id, "Join ignored, already playing");
            return Err(JoinError::AlreadyPlaying);
        }

        let Some(username) = normalize_username(username) else {
            warn!(connection_id = %connection_id, "Join ignored, empty username");
            return Err(JoinError::EmptyUsername);
        };

        let player_id = world.spawn_player(username.clone());
        self.sessions.insert(
            connection_id,
            Session {
                connection_id,
                player_id,
                outbound,
            },
        );
        self.by_player.insert(player_id, connection_id);

        info!(
            connection_id = %connection_id,
            player_id = %player_id,
            username = %username,
            "Player joined arena"
        );
        Ok(player_id)
    }

    /// Remove the connection's player from the world and drop its outbound route
    pub fn remove_player(&mut self, world: &mut World, connection_id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection_id)?;
        self.by_player.remove(&session.player_id);
        world.remove_player(session.player_id);

        info!(
            connection_id = %connection_id,
            player_id = %session.player_id,
            "Player left arena"
        );
        Some(session)
    }

    /// Store the latest steering input. Invalid directions are ignored.
    pub fn set_input(&self, world: &mut World, connection_id: ConnectionId, direction: Option<f32>) {
        let Some(session) = self.sessions.get(&connection_id) else {
            return;
        };

        if let Some(d) = direction {
            if !is_valid_direction(d) {
                warn!(connection_id = %connection_id, direction = d, "Ignoring invalid direction");
                return;
            }
        }

        world.set_input(session.player_id, direction);
    }

    /// Detach the session of a player the simulation already removed
    pub fn end_for_player(&mut self, player_id: PlayerId) -> Option<Session> {
        let connection_id = self.by_player.remove(&player_id)?;
        self.sessions.remove(&connection_id)
    }
}

//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::MAX_USERNAME_LEN;

/// Server-assigned player identifier, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bullet identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulletId(pub u64);

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the arena with a display name
    JoinGame { username: String },

    /// Steering input. `None` stops the ship; it keeps facing its last direction.
    Input {
        /// Direction in radians, 0 = up
        direction: Option<f32>,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    /// Per-player world snapshot, sent once per tick
    GameUpdate(Snapshot),

    /// This connection's player died
    GameOver,

    /// Error message
    Error { code: String, message: String },
}

/// Point-in-time projection of the world for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Server wall-clock time in milliseconds
    pub t: u64,
    /// Server tick that produced this snapshot
    pub tick: u64,
    pub me: SelfView,
    pub others: Vec<PlayerView>,
    pub bullets: Vec<BulletView>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Full state of the receiving player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfView {
    pub id: PlayerId,
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub direction: f32,
    pub hp: u32,
    pub score: f64,
}

/// Reduced state of another visible player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub direction: f32,
    pub hp: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletView {
    pub id: BulletId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: u64,
}

/// Trim a requested display name and cap its length.
/// Returns `None` when nothing usable is left.
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_USERNAME_LEN).collect())
}

/// Accept a steering direction only if it is a finite angle within one turn either way
pub fn is_valid_direction(direction: f32) -> bool {
    direction.is_finite() && direction.abs() <= std::f32::consts::TAU
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let join: ClientMsg =
            serde_json::from_str(r#"{"type":"join_game","username":"ace"}"#).unwrap();
        assert_eq!(join, ClientMsg::JoinGame { username: "ace".into() });

        let stop: ClientMsg = serde_json::from_str(r#"{"type":"input","direction":null}"#).unwrap();
        assert_eq!(stop, ClientMsg::Input { direction: None });
    }

    #[test]
    fn game_update_flattens_snapshot_fields() {
        let msg = ServerMsg::GameUpdate(Snapshot {
            t: 42,
            tick: 7,
            me: SelfView {
                id: PlayerId(1),
                username: "ace".into(),
                x: 1.0,
                y: 2.0,
                direction: 0.5,
                hp: 100,
                score: 0.0,
            },
            others: vec![],
            bullets: vec![BulletView { id: BulletId(3), x: 4.0, y: 5.0 }],
            leaderboard: vec![],
        });

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "game_update");
        assert_eq!(json["tick"], 7);
        assert_eq!(json["me"]["id"], 1);
        assert_eq!(json["bullets"][0]["id"], 3);
    }

    #[test]
    fn game_over_is_a_bare_tag() {
        let json = serde_json::to_string(&ServerMsg::GameOver).unwrap();
        assert_eq!(json, r#"{"type":"game_over"}"#);
    }

    #[test]
    fn usernames_are_trimmed_and_capped() {
        assert_eq!(normalize_username("  ace  ").as_deref(), Some("ace"));
        assert_eq!(normalize_username("   "), None);
        let long = "x".repeat(MAX_USERNAME_LEN + 10);
        assert_eq!(normalize_username(&long).unwrap().len(), MAX_USERNAME_LEN);
    }

    #[test]
    fn directions_outside_one_turn_are_rejected() {
        assert!(is_valid_direction(0.0));
        assert!(is_valid_direction(-3.0));
        assert!(!is_valid_direction(f32::NAN));
        assert!(!is_valid_direction(f32::INFINITY));
        assert!(!is_valid_direction(10.0));
    }
}

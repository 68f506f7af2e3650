//! Per-player snapshot building

use crate::game::constants::{LEADERBOARD_SIZE, VISIBILITY_RADIUS};
use crate::game::physics::PhysicsSystem;
use crate::game::world::{Player, World};
use crate::ws::protocol::{BulletView, LeaderboardEntry, PlayerId, PlayerView, SelfView, Snapshot};

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Visibility cutoff around the receiving player
    visibility_radius: f32,
}

impl SnapshotBuilder {
    pub fn new(visibility_radius: f32) -> Self {
        Self { visibility_radius }
    }

    /// Top players by score, shared by every snapshot of a tick
    pub fn leaderboard(world: &World) -> Vec<LeaderboardEntry> {
        let mut ranked: Vec<&Player> = world.players().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        ranked
            .into_iter()
            .take(LEADERBOARD_SIZE)
            .map(|p| LeaderboardEntry {
                username: p.username.clone(),
                score: p.score.max(0.0).floor() as u64,
            })
            .collect()
    }

    /// Build the snapshot one player receives. `None` if the player is not in the world.
    pub fn build(
        &self,
        world: &World,
        player_id: PlayerId,
        t: u64,
        leaderboard: &[LeaderboardEntry],
    ) -> Option<Snapshot> {
        let me = world.player(player_id)?;
        let visible = |x: f32, y: f32| {
            PhysicsSystem::distance(me.x, me.y, x, y) <= self.visibility_radius
        };

        let others = world
            .players()
            .filter(|p| p.id != player_id && visible(p.x, p.y))
            .map(|p| PlayerView {
                id: p.id,
                x: p.x,
                y: p.y,
                direction: p.direction,
                hp: p.hp,
            })
            .collect();

        let bullets = world
            .bullets()
            .iter()
            .filter(|b| visible(b.x, b.y))
            .map(|b| BulletView {
                id: b.id,
                x: b.x,
                y: b.y,
            })
            .collect();

        Some(Snapshot {
            t,
            tick: world.tick(),
            me: SelfView {
                id: me.id,
                username: me.username.clone(),
                x: me.x,
                y: me.y,
                direction: me.direction,
                hp: me.hp,
                score: me.score,
            },
            others,
            bullets,
            leaderboard: leaderboard.to_vec(),
        })
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(VISIBILITY_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::MAP_SIZE;

    fn place(world: &mut World, name: &str, x: f32, y: f32) -> PlayerId {
        let id = world.spawn_player(name.to_string());
        let p = world.player_mut(id).unwrap();
        p.x = x;
        p.y = y;
        id
    }

    #[test]
    fn snapshot_excludes_self_from_others_and_filters_by_distance() {
        let mut world = World::new(1);
        let me = place(&mut world, "me", 100.0, 100.0);
        let near = place(&mut world, "near", 400.0, 100.0);
        let _far = place(&mut world, "far", MAP_SIZE, MAP_SIZE);

        let snapshot = SnapshotBuilder::default().build(&world, me, 10, &[]).unwrap();
        assert_eq!(snapshot.me.id, me);
        assert_eq!(snapshot.me.username, "me");
        let ids: Vec<PlayerId> = snapshot.others.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![near]);
        assert_eq!(snapshot.t, 10);
    }

    #[test]
    fn missing_player_yields_no_snapshot() {
        let world = World::new(1);
        assert!(SnapshotBuilder::default().build(&world, PlayerId(5), 0, &[]).is_none());
    }

    #[test]
    fn leaderboard_is_sorted_and_capped() {
        let mut world = World::new(1);
        for i in 0..(LEADERBOARD_SIZE + 2) {
            let id = world.spawn_player(format!("p{i}"));
            world.player_mut(id).unwrap().score = i as f64 * 10.5;
        }

        let board = SnapshotBuilder::leaderboard(&world);
        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert_eq!(board[0].username, format!("p{}", LEADERBOARD_SIZE + 1));
        assert!(board.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(board[0].score, ((LEADERBOARD_SIZE + 1) as f64 * 10.5).floor() as u64);
    }
}

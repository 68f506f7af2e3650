//! Authoritative world state and the per-tick simulation step

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

use crate::game::combat::{Bullet, CombatSystem, HitResult};
use crate::game::constants::{MAP_SIZE, PLAYER_MAX_HP, SCORE_BULLET_HIT, SCORE_PER_SECOND};
use crate::game::physics::PhysicsSystem;
use crate::ws::protocol::{BulletId, PlayerId};

/// Player state (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub x: f32,
    pub y: f32,
    /// Facing, in radians. Bullets leave along this heading.
    pub direction: f32,
    pub hp: u32,
    /// Latest steering input; `None` holds position
    pub input: Option<f32>,
    pub fire_cooldown: f32,
    pub score: f64,
}

impl Player {
    pub fn new(id: PlayerId, username: String, x: f32, y: f32, direction: f32) -> Self {
        Self {
            id,
            username,
            x,
            y,
            direction,
            hp: PLAYER_MAX_HP,
            input: None,
            fire_cooldown: 0.0,
            score: 0.0,
        }
    }
}

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub hits: Vec<HitResult>,
    /// Players removed because their hit-points reached zero
    pub deaths: Vec<Player>,
}

/// The single mutable game world, owned by the arena loop
pub struct World {
    tick: u64,
    /// Ordered by id so iteration, and therefore hit tie-breaks, are reproducible
    players: BTreeMap<PlayerId, Player>,
    bullets: Vec<Bullet>,
    next_player_id: u64,
    next_bullet_id: u64,
    rng: ChaCha8Rng,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            players: BTreeMap::new(),
            bullets: Vec::new(),
            next_player_id: 1,
            next_bullet_id: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    /// Generate a spawn point in the middle half of the map, facing a random way
    fn generate_spawn_position(&mut self) -> (f32, f32, f32) {
        let x = MAP_SIZE * self.rng.gen_range(0.25..=0.75);
        let y = MAP_SIZE * self.rng.gen_range(0.25..=0.75);
        let direction = self.rng.gen_range(0.0..std::f32::consts::TAU);
        (x, y, direction)
    }

    /// Insert a fresh player with full hit-points
    pub fn spawn_player(&mut self, username: String) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        let (x, y, direction) = self.generate_spawn_position();
        self.players.insert(id, Player::new(id, username, x, y, direction));
        id
    }

    /// Remove a player. Its bullets stay in flight and can still hit others.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Overwrite a player's steering input. A direction also turns the ship to face it.
    pub fn set_input(&mut self, id: PlayerId, input: Option<f32>) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        player.input = input;
        if let Some(direction) = input {
            player.direction = direction;
        }
        true
    }

    fn next_bullet_id(&mut self) -> BulletId {
        let id = BulletId(self.next_bullet_id);
        self.next_bullet_id += 1;
        id
    }

    /// Run one simulation step of `dt` seconds
    pub fn step(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        self.tick += 1;

        // Movement and weapons
        let mut shots: Vec<(PlayerId, f32, f32, f32)> = Vec::new();
        for player in self.players.values_mut() {
            let (x, y) = PhysicsSystem::move_ship(player.x, player.y, player.input, dt);
            player.x = x;
            player.y = y;
            player.score += SCORE_PER_SECOND * dt as f64;

            player.fire_cooldown = CombatSystem::update_cooldown(player.fire_cooldown, dt);
            if CombatSystem::can_fire(player.fire_cooldown) {
                shots.push((player.id, player.x, player.y, player.direction));
                player.fire_cooldown = CombatSystem::fire_cooldown();
            }
        }

        // Bullet advance; bullets fired this tick start moving next tick
        let mut spent: Vec<bool> = self.bullets.iter_mut().map(|b| !b.advance(dt)).collect();
        for (owner_id, x, y, direction) in shots {
            let id = self.next_bullet_id();
            self.bullets.push(Bullet::new(id, owner_id, x, y, direction));
            spent.push(false);
        }

        // Collisions: a bullet damages at most one player, the first in id order
        for (idx, bullet) in self.bullets.iter().enumerate() {
            if spent[idx] {
                continue;
            }

            for player in self.players.values_mut() {
                if player.id == bullet.owner_id || player.hp == 0 {
                    continue;
                }

                if bullet.hits(player.x, player.y) {
                    let (hp, _) = CombatSystem::apply_hit(player.hp);
                    player.hp = hp;
                    spent[idx] = true;
                    report.hits.push(HitResult {
                        bullet_id: bullet.id,
                        shooter_id: bullet.owner_id,
                        target_id: player.id,
                    });
                    break;
                }
            }
        }

        for hit in &report.hits {
            if let Some(shooter) = self.players.get_mut(&hit.shooter_id) {
                shooter.score += SCORE_BULLET_HIT;
            }
        }

        // Deaths
        let dead: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.hp == 0)
            .map(|p| p.id)
            .collect();
        for id in dead {
            if let Some(player) = self.players.remove(&id) {
                debug!(player_id = %id, tick = self.tick, "Player destroyed");
                report.deaths.push(player);
            }
        }

        // Cleanup
        let mut spent = spent.into_iter();
        self.bullets.retain(|_| !spent.next().unwrap_or(false));

        self.check_invariants();
        report
    }

    /// Invariants are programmer errors: fatal in debug builds, clamped otherwise
    fn check_invariants(&mut self) {
        for player in self.players.values_mut() {
            debug_assert!(
                PhysicsSystem::in_bounds(player.x, player.y),
                "player {} out of bounds at ({}, {})",
                player.id,
                player.x,
                player.y
            );
            debug_assert!(player.hp > 0 && player.hp <= PLAYER_MAX_HP);

            let (x, y) = PhysicsSystem::clamp_to_map(player.x, player.y);
            player.x = x;
            player.y = y;
            player.hp = player.hp.min(PLAYER_MAX_HP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{BULLET_DAMAGE, PLAYER_RADIUS};
    use crate::util::time::tick_delta;
    use std::f32::consts::PI;

    const NEVER: f32 = f32::MAX;

    fn place(world: &mut World, name: &str, x: f32, y: f32, direction: f32) -> PlayerId {
        let id = world.spawn_player(name.to_string());
        let player = world.player_mut(id).unwrap();
        player.x = x;
        player.y = y;
        player.direction = direction;
        id
    }

    fn run(world: &mut World, ticks: usize) -> Vec<TickReport> {
        (0..ticks).map(|_| world.step(tick_delta())).collect()
    }

    #[test]
    fn spawned_player_has_full_hp_inside_middle_of_map() {
        let mut world = World::new(7);
        for i in 0..50 {
            let id = world.spawn_player(format!("p{i}"));
            let p = world.player(id).unwrap();
            assert_eq!(p.hp, PLAYER_MAX_HP);
            assert!(p.x >= MAP_SIZE * 0.25 && p.x <= MAP_SIZE * 0.75);
            assert!(p.y >= MAP_SIZE * 0.25 && p.y <= MAP_SIZE * 0.75);
        }
        assert_eq!(world.player_count(), 50);
    }

    #[test]
    fn player_ids_are_unique() {
        let mut world = World::new(1);
        let a = world.spawn_player("a".into());
        let b = world.spawn_player("a".into());
        assert_ne!(a, b);
    }

    #[test]
    fn idle_player_does_not_move() {
        let mut world = World::new(1);
        let id = place(&mut world, "p", 1200.0, 1400.0, 1.0);
        run(&mut world, 120);

        let p = world.player(id).unwrap();
        assert_eq!((p.x, p.y), (1200.0, 1400.0));
        assert_eq!(p.hp, PLAYER_MAX_HP);
    }

    #[test]
    fn positions_stay_on_the_map() {
        let mut world = World::new(3);
        let ids: Vec<PlayerId> = (0..8).map(|i| world.spawn_player(format!("p{i}"))).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        for tick in 0..600 {
            if tick % 30 == 0 {
                for id in &ids {
                    let direction = rng.gen_range(-PI..PI);
                    world.set_input(*id, Some(direction));
                }
            }
            world.step(tick_delta());
            for p in world.players() {
                assert!(PhysicsSystem::in_bounds(p.x, p.y));
                assert!(p.hp <= PLAYER_MAX_HP);
            }
        }
    }

    #[test]
    fn bullet_hits_target_exactly_once_and_is_removed() {
        let mut world = World::new(1);
        let shooter = place(&mut world, "shooter", 1500.0, 1500.0, 0.0);
        let target = place(&mut world, "target", 1500.0, 1300.0, PI);
        world.player_mut(target).unwrap().fire_cooldown = NEVER;

        world.step(tick_delta());
        assert_eq!(world.bullets().len(), 1);
        world.player_mut(shooter).unwrap().fire_cooldown = NEVER;

        let reports = run(&mut world, 40);
        let hits: Vec<&HitResult> = reports.iter().flat_map(|r| r.hits.iter()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].shooter_id, shooter);
        assert_eq!(hits[0].target_id, target);

        assert_eq!(world.player(target).unwrap().hp, PLAYER_MAX_HP - BULLET_DAMAGE);
        assert!(world.bullets().is_empty());
        assert!(world.player(shooter).unwrap().score >= SCORE_BULLET_HIT);
    }

    #[test]
    fn bullets_never_damage_their_owner() {
        let mut world = World::new(1);
        let id = place(&mut world, "solo", 1500.0, 1500.0, 0.3);
        for _ in 0..300 {
            world.step(tick_delta());
            assert_eq!(world.player(id).unwrap().hp, PLAYER_MAX_HP);
        }
        assert!(!world.bullets().is_empty());
    }

    #[test]
    fn orphaned_bullets_still_hit_others() {
        let mut world = World::new(1);
        let shooter = place(&mut world, "shooter", 1500.0, 1500.0, 0.0);
        let target = place(&mut world, "target", 1500.0, 1300.0, PI);
        world.player_mut(target).unwrap().fire_cooldown = NEVER;

        world.step(tick_delta());
        assert!(world.remove_player(shooter).is_some());

        run(&mut world, 40);
        assert_eq!(world.player(target).unwrap().hp, PLAYER_MAX_HP - BULLET_DAMAGE);
    }

    #[test]
    fn player_at_zero_hp_is_removed_in_the_same_tick() {
        let mut world = World::new(1);
        let shooter = place(&mut world, "shooter", 1500.0, 1500.0, 0.0);
        let target = place(&mut world, "target", 1500.0, 1300.0, PI);
        world.player_mut(target).unwrap().fire_cooldown = NEVER;
        world.player_mut(target).unwrap().hp = BULLET_DAMAGE;

        world.step(tick_delta());
        world.player_mut(shooter).unwrap().fire_cooldown = NEVER;

        let reports = run(&mut world, 40);
        let deaths: Vec<PlayerId> = reports
            .iter()
            .flat_map(|r| r.deaths.iter().map(|p| p.id))
            .collect();
        assert_eq!(deaths, vec![target]);
        assert!(world.player(target).is_none());
        assert!(world.player(shooter).is_some());
    }

    #[test]
    fn tie_break_hits_lowest_player_id() {
        let mut world = World::new(1);
        let shooter = place(&mut world, "shooter", 100.0, 100.0, 0.0);
        world.player_mut(shooter).unwrap().fire_cooldown = NEVER;
        let first = place(&mut world, "first", 1500.0, 1500.0, 0.0);
        let second = place(&mut world, "second", 1500.0 + PLAYER_RADIUS, 1500.0, 0.0);
        for id in [first, second] {
            world.player_mut(id).unwrap().fire_cooldown = NEVER;
        }

        // Drop a bullet between both ships, within reach of each
        let id = world.next_bullet_id();
        let mut bullet = Bullet::new(id, shooter, 1500.0 + PLAYER_RADIUS / 2.0, 1500.0, 0.0);
        bullet.vel_x = 0.0;
        bullet.vel_y = 0.0;
        world.bullets.push(bullet);

        let report = world.step(tick_delta());
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].target_id, first);
        assert_eq!(world.player(first).unwrap().hp, PLAYER_MAX_HP - BULLET_DAMAGE);
        assert_eq!(world.player(second).unwrap().hp, PLAYER_MAX_HP);
    }

    #[test]
    fn input_turns_and_moves_the_ship() {
        let mut world = World::new(1);
        let id = place(&mut world, "p", 1500.0, 1500.0, 0.0);
        assert!(world.set_input(id, Some(PI / 2.0)));
        world.step(tick_delta());

        let p = world.player(id).unwrap();
        assert_eq!(p.direction, PI / 2.0);
        assert!(p.x > 1500.0);
        let before = (p.x, p.y);

        assert!(world.set_input(id, None));
        world.step(tick_delta());
        let p = world.player(id).unwrap();
        assert_eq!((p.x, p.y), before);
        assert_eq!(p.direction, PI / 2.0);
        assert!(!world.set_input(PlayerId(999), None));
    }
}

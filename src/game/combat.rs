//! Combat system - weapons, bullets, damage, hit detection

use crate::game::constants::{
    BULLET_DAMAGE, BULLET_MAX_LIFETIME, BULLET_RADIUS, BULLET_SPEED, PLAYER_FIRE_COOLDOWN,
    PLAYER_MAX_HP, PLAYER_RADIUS,
};
use crate::game::physics::PhysicsSystem;
use crate::ws::protocol::{BulletId, PlayerId};

/// Bullet in flight
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: BulletId,
    /// The player that fired it. May no longer exist in the world.
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Seconds since the bullet was fired
    pub age: f32,
}

impl Bullet {
    /// Create a bullet at the shooter's position heading along `direction`
    pub fn new(id: BulletId, owner_id: PlayerId, x: f32, y: f32, direction: f32) -> Self {
        let (hx, hy) = PhysicsSystem::heading(direction);
        Self {
            id,
            owner_id,
            x,
            y,
            vel_x: hx * BULLET_SPEED,
            vel_y: hy * BULLET_SPEED,
            age: 0.0,
        }
    }

    /// Advance one step. Returns false once the bullet left the map or outlived its lifetime.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.age += dt;
        PhysicsSystem::in_bounds(self.x, self.y) && self.age <= BULLET_MAX_LIFETIME
    }

    /// Check collision with a ship centred at the given point
    pub fn hits(&self, target_x: f32, target_y: f32) -> bool {
        PhysicsSystem::circles_touch(self.x, self.y, BULLET_RADIUS, target_x, target_y, PLAYER_RADIUS)
    }
}

/// Combat system for managing weapons and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire (cooldown check)
    pub fn can_fire(fire_cooldown: f32) -> bool {
        fire_cooldown <= 0.0
    }

    /// Update weapon cooldown
    pub fn update_cooldown(cooldown: f32, dt: f32) -> f32 {
        (cooldown - dt).max(0.0)
    }

    /// Get cooldown to set after firing
    pub fn fire_cooldown() -> f32 {
        PLAYER_FIRE_COOLDOWN
    }

    /// Apply one bullet's damage, returns (new_hp, is_dead)
    pub fn apply_hit(current_hp: u32) -> (u32, bool) {
        debug_assert!(current_hp <= PLAYER_MAX_HP, "hp above max: {current_hp}");
        let new_hp = current_hp.min(PLAYER_MAX_HP).saturating_sub(BULLET_DAMAGE);
        (new_hp, new_hp == 0)
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub bullet_id: BulletId,
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
}

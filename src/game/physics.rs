//! Ship and bullet motion, and the map boundary

use crate::game::constants::{MAP_SIZE, PLAYER_SPEED};

/// Physics system for integrating positions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Unit vector for a heading; 0 rad points up (towards y = 0)
    pub fn heading(direction: f32) -> (f32, f32) {
        (direction.sin(), -direction.cos())
    }

    /// Move a ship one step along its input direction and clamp it to the map.
    /// `None` input leaves the ship where it is.
    pub fn move_ship(x: f32, y: f32, input: Option<f32>, dt: f32) -> (f32, f32) {
        let Some(direction) = input else {
            return (x, y);
        };

        let (hx, hy) = Self::heading(direction);
        let new_x = x + hx * PLAYER_SPEED * dt;
        let new_y = y + hy * PLAYER_SPEED * dt;

        Self::clamp_to_map(new_x, new_y)
    }

    /// Hard clamp onto `[0, MAP_SIZE]` on both axes
    pub fn clamp_to_map(x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, MAP_SIZE), y.clamp(0.0, MAP_SIZE))
    }

    pub fn in_bounds(x: f32, y: f32) -> bool {
        (0.0..=MAP_SIZE).contains(&x) && (0.0..=MAP_SIZE).contains(&y)
    }

    pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Circle overlap test, inclusive at touching distance
    pub fn circles_touch(x1: f32, y1: f32, radius1: f32, x2: f32, y2: f32, radius2: f32) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined_radius = radius1 + radius2;
        dx * dx + dy * dy <= combined_radius * combined_radius
    }
}

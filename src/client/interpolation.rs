//! Snapshot buffer and render-time interpolation
//!
//! Snapshots arrive at the server tick rate with variable latency. The client
//! renders a fixed delay behind the newest data, so there is almost always a
//! pair of snapshots bracketing the render time:
//!
//! ```text
//!   server time ──────────────────────────────────────────────▶
//!        S(n-1)           S(n)             S(n+1)
//!          │                │  ▲              │
//!          │                │  render time    │ newest
//!          │                └──┴──────────────┘
//!          │                  lerp(S(n), S(n+1))
//! ```
//!
//! Server time is mapped onto the local clock once, from the first snapshot
//! received. Ordering uses the tick embedded in each snapshot, never arrival
//! order.

use std::collections::{HashMap, VecDeque};
use std::f32::consts::{PI, TAU};
use std::time::{Duration, Instant};

use crate::game::constants::RENDER_DELAY_MS;
use crate::ws::protocol::{BulletView, LeaderboardEntry, PlayerView, SelfView, Snapshot};

/// Upper bound on buffered snapshots while no frame consumes them
const MAX_BUFFERED: usize = 120;

/// A snapshot with the local instant it arrived
#[derive(Debug, Clone)]
pub struct BufferedSnapshot {
    pub snapshot: Snapshot,
    pub received_at: Instant,
}

/// Mapping between server milliseconds and the local clock
#[derive(Debug, Clone, Copy)]
struct ClockSync {
    first_server_t: u64,
    first_received: Instant,
}

/// World state to draw this frame
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedState {
    pub me: SelfView,
    pub others: Vec<PlayerView>,
    pub bullets: Vec<BulletView>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl InterpolatedState {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            me: snapshot.me.clone(),
            others: snapshot.others.clone(),
            bullets: snapshot.bullets.clone(),
            leaderboard: snapshot.leaderboard.clone(),
        }
    }
}

/// Rolling snapshot buffer that yields a smoothed state per frame
#[derive(Debug)]
pub struct Reconciler {
    buffer: VecDeque<BufferedSnapshot>,
    clock: Option<ClockSync>,
    render_delay: Duration,
}

impl Reconciler {
    pub fn new(render_delay: Duration) -> Self {
        Self {
            buffer: VecDeque::new(),
            clock: None,
            render_delay,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Forget everything, e.g. before joining again
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.clock = None;
    }

    /// Buffer a snapshot, keeping the buffer ordered by tick
    pub fn push(&mut self, snapshot: Snapshot, received_at: Instant) {
        if self.clock.is_none() {
            self.clock = Some(ClockSync {
                first_server_t: snapshot.t,
                first_received: received_at,
            });
        }

        let tick = snapshot.tick;
        match self
            .buffer
            .binary_search_by_key(&tick, |b| b.snapshot.tick)
        {
            Ok(_) => return,
            Err(idx) => self.buffer.insert(
                idx,
                BufferedSnapshot {
                    snapshot,
                    received_at,
                },
            ),
        }

        while self.buffer.len() > MAX_BUFFERED {
            self.buffer.pop_front();
        }
    }

    /// Server time, in milliseconds, that should be on screen at `now`
    pub fn render_time(&self, now: Instant) -> Option<f64> {
        let clock = self.clock?;
        let elapsed = now.saturating_duration_since(clock.first_received);
        Some(
            clock.first_server_t as f64 + elapsed.as_secs_f64() * 1000.0
                - self.render_delay.as_secs_f64() * 1000.0,
        )
    }

    /// Produce the state for the frame drawn at `now`.
    ///
    /// Snapshots older than the one bracketing the render time are discarded.
    pub fn current_state(&mut self, now: Instant) -> Option<InterpolatedState> {
        let render_time = self.render_time(now)?;
        let latest = self.buffer.back()?;

        // Newest snapshot at or before render time
        let base = self
            .buffer
            .iter()
            .rposition(|b| (b.snapshot.t as f64) <= render_time);

        let base = match base {
            Some(idx) if idx + 1 < self.buffer.len() => idx,
            // Nothing old enough, or already past the newest: show the newest as is
            _ => return Some(InterpolatedState::from_snapshot(&latest.snapshot)),
        };

        self.buffer.drain(..base);

        let from = &self.buffer[0].snapshot;
        let to = &self.buffer[1].snapshot;
        let span = to.t.saturating_sub(from.t) as f64;
        let ratio = if span > 0.0 {
            ((render_time - from.t as f64) / span).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };

        Some(interpolate_snapshots(from, to, ratio))
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Duration::from_millis(RENDER_DELAY_MS))
    }
}

fn lerp(a: f32, b: f32, ratio: f32) -> f32 {
    a + (b - a) * ratio
}

/// Interpolate an angle along the shorter arc
pub fn interpolate_direction(from: f32, to: f32, ratio: f32) -> f32 {
    let delta = (to - from + PI).rem_euclid(TAU) - PI;
    from + delta * ratio
}

fn interpolate_snapshots(from: &Snapshot, to: &Snapshot, ratio: f32) -> InterpolatedState {
    let me = if from.me.id == to.me.id {
        SelfView {
            x: lerp(from.me.x, to.me.x, ratio),
            y: lerp(from.me.y, to.me.y, ratio),
            direction: interpolate_direction(from.me.direction, to.me.direction, ratio),
            ..from.me.clone()
        }
    } else {
        to.me.clone()
    };

    // Entities only in the newer snapshot are not visible yet
    let next_players: HashMap<_, _> = to.others.iter().map(|p| (p.id, p)).collect();
    let others = from
        .others
        .iter()
        .map(|p| match next_players.get(&p.id) {
            Some(next) => PlayerView {
                x: lerp(p.x, next.x, ratio),
                y: lerp(p.y, next.y, ratio),
                direction: interpolate_direction(p.direction, next.direction, ratio),
                ..p.clone()
            },
            None => p.clone(),
        })
        .collect();

    let next_bullets: HashMap<_, _> = to.bullets.iter().map(|b| (b.id, b)).collect();
    let bullets = from
        .bullets
        .iter()
        .map(|b| match next_bullets.get(&b.id) {
            Some(next) => BulletView {
                id: b.id,
                x: lerp(b.x, next.x, ratio),
                y: lerp(b.y, next.y, ratio),
            },
            None => b.clone(),
        })
        .collect();

    InterpolatedState {
        me,
        others,
        bullets,
        leaderboard: from.leaderboard.clone(),
    }
}

//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max non-INPUT messages per second on one connection. INPUT is exempt,
/// since a dropped final direction would never be re-sent.
pub const INBOUND_RATE_LIMIT: u32 = 120;

/// Max join attempts per second on one connection
pub const JOIN_RATE_LIMIT: u32 = 2;

/// Per-connection limits, checked by the socket reader before anything reaches the arena
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    inbound: Arc<Limiter>,
    joins: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new() -> Self {
        Self {
            inbound: create_limiter(INBOUND_RATE_LIMIT),
            joins: create_limiter(JOIN_RATE_LIMIT),
        }
    }

    /// Joins and unparseable traffic
    pub fn check(&self) -> bool {
        self.inbound.check().is_ok()
    }

    /// A join on top of the general budget; each join spawns a player
    pub fn check_join(&self) -> bool {
        self.joins.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

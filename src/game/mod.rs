//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod constants;
pub mod physics;
pub mod session;
pub mod snapshot;
pub mod world;

pub use arena::{Arena, ArenaCommand, ArenaHandle, ArenaStats};
pub use session::{ConnectionId, SessionRegistry};
pub use world::{Player, World};

//! HTTP surface: health, WebSocket upgrade, static client assets

pub mod routes;

pub use routes::build_router;

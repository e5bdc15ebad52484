//! HTTP surface: health check and websocket upgrade

pub mod routes;

pub use routes::build_router;

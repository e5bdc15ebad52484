//! WebSocket transport: upgrade handler, wire protocol and outbound routing

pub mod handler;
pub mod outbox;
pub mod protocol;

pub use outbox::Outbox;

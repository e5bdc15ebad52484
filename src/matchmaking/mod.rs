//! Private-code matchmaking

pub mod groups;

pub use groups::{GroupError, GroupRegistry, Seat};

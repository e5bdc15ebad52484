//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::snapshot::WorldSnapshot;

/// Ship control actions sent by the controller seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    /// Thrust forward
    Up,
    /// Thrust backward
    Down,
    /// Rotate counter-clockwise
    Left,
    /// Rotate clockwise
    Right,
    /// Shoot a bullet
    Fire,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request a seat in the group identified by `code`
    Join {
        code: String,
        display_name: String,
    },

    /// Toggle the ready flag of the caller's seat
    Ready,

    /// Exchange controller and viewer seats
    SwapRole,

    /// Vacate the seat (also synthesized when the socket closes)
    Leave,

    /// Ship control input
    Input { action: InputAction },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { identity: Uuid, server_time: u64 },

    /// Seat filled, waiting for the partner (or for the next round)
    WaitingForPlayer,

    /// Join rejected, both seats taken
    GroupFull,

    /// Seat or ready state of the caller's group changed
    GroupUpdate(GroupView),

    /// Staging countdown started
    GameStaging { countdown_seconds: u32 },

    /// The caller's group was admitted into the round
    GameBegin {
        ship_id: u32,
        is_viewer: bool,
        winning_score: u32,
    },

    /// Round finished
    GameWon {
        winner_names: Vec<String>,
        is_self: bool,
    },

    /// Scores changed
    ScoreboardUpdate {
        entries: Vec<ScoreEntry>,
        own_name: String,
    },

    /// Authoritative world state
    WorldUpdate { snapshot: WorldSnapshot },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Public view of a group, pushed to both seats on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub code: String,
    pub controller_name: Option<String>,
    pub viewer_name: Option<String>,
    pub controller_ready: bool,
    pub viewer_ready: bool,
    pub occupied: bool,
}

/// One scoreboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"join","code":"ABCD","display_name":"ann"}"#)
                .unwrap();
        assert!(matches!(msg, ClientMsg::Join { ref code, .. } if code == "ABCD"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"swap_role"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::SwapRole));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"input","action":"fire"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Input {
                action: InputAction::Fire
            }
        ));
    }

    #[test]
    fn group_update_flattens_view() {
        let msg = ServerMsg::GroupUpdate(GroupView {
            code: "ABCD".into(),
            controller_name: Some("ann".into()),
            viewer_name: None,
            controller_ready: true,
            viewer_ready: false,
            occupied: false,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "group_update");
        assert_eq!(json["controller_name"], "ann");
        assert_eq!(json["viewer_name"], serde_json::Value::Null);
    }
}

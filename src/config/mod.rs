//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::maze::{Bias, MazeConfig};
use crate::game::GameSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma separated; `*` allows any
    pub client_origin: String,
    /// Round rules and maze generation
    pub game: GameSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let defaults = GameSettings::default();
        let maze_defaults = MazeConfig::default();

        let maze = MazeConfig {
            width: parse_or(&lookup, "MAZE_WIDTH", maze_defaults.width)?,
            height: parse_or(&lookup, "MAZE_HEIGHT", maze_defaults.height)?,
            bias: lookup("MAZE_BIAS")
                .filter(|v| !v.trim().is_empty())
                .map(|v| {
                    v.trim()
                        .parse::<Bias>()
                        .map_err(|_| ConfigError::Invalid("MAZE_BIAS"))
                })
                .transpose()?,
            remove_walls: parse_or(&lookup, "MAZE_REMOVE_WALLS", maze_defaults.remove_walls)?,
            breakable_count: parse_or(&lookup, "MAZE_BREAKABLE", maze_defaults.breakable_count)?,
            max_canvas_dimension: parse_or(
                &lookup,
                "MAZE_MAX_DIMENSION",
                maze_defaults.max_canvas_dimension,
            )?,
            ..maze_defaults
        };

        let game = GameSettings {
            staging_seconds: parse_or(&lookup, "STAGING_SECONDS", defaults.staging_seconds)?,
            winning_score: parse_or(&lookup, "WINNING_SCORE", defaults.winning_score)?,
            seed: lookup("GAME_SEED")
                .map(|v| v.trim().parse().map_err(|_| ConfigError::Invalid("GAME_SEED")))
                .transpose()?,
            maze,
            ..defaults
        };
        if game.winning_score == 0 {
            return Err(ConfigError::Invalid("WINNING_SCORE"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            game,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.game.staging_seconds, 5);
        assert_eq!(config.game.winning_score, 5);
        assert_eq!(config.game.seed, None);
        assert_eq!((config.game.maze.width, config.game.maze.height), (6, 4));
        assert_eq!(config.game.maze.breakable_count, 7);
        assert_eq!(config.game.maze.bias, None);
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn game_values_are_parsed() {
        let config = load(&[
            ("STAGING_SECONDS", "3"),
            ("WINNING_SCORE", "2"),
            ("GAME_SEED", "42"),
            ("MAZE_WIDTH", "8"),
            ("MAZE_BIAS", "Vertical"),
        ])
        .unwrap();
        assert_eq!(config.game.staging_seconds, 3);
        assert_eq!(config.game.winning_score, 2);
        assert_eq!(config.game.seed, Some(42));
        assert_eq!(config.game.maze.width, 8);
        assert_eq!(config.game.maze.bias, Some(Bias::Vertical));
    }

    #[test]
    fn invalid_values_fail() {
        assert!(matches!(
            load(&[("MAZE_WIDTH", "wide")]),
            Err(ConfigError::Invalid("MAZE_WIDTH"))
        ));
        assert!(matches!(
            load(&[("MAZE_BIAS", "diagonal")]),
            Err(ConfigError::Invalid("MAZE_BIAS"))
        ));
        assert!(matches!(
            load(&[("WINNING_SCORE", "0")]),
            Err(ConfigError::Invalid("WINNING_SCORE"))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}

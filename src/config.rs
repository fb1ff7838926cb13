use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// What happens when a player's move ends on a SPECIAL node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SpecialLanding {
    /// Teleport to the jail node and skip one turn
    #[default]
    Jail,
    /// Pause the turn until the player plays a special card
    DrawCard,
}

/// How the turn passes on after a challenge score is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TurnHandover {
    #[default]
    Auto,
    /// The scoring player has to confirm before the next player is up
    Confirm,
}

/// Rule switches consumed by the game engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameRules {
    pub special_landing: SpecialLanding,
    pub turn_handover: TurnHandover,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub board_path: Option<String>,
    /// `None` allows any origin
    pub cors_allowed_origins: Option<Vec<String>>,
    pub rules: GameRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            board_path: None,
            cors_allowed_origins: None,
            rules: GameRules::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_var(
            "BIND_ADDR",
            non_blank("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;

        let cors_allowed_origins = match non_blank("CORS_ALLOWED_ORIGINS") {
            None => None,
            Some(raw) if raw.trim() == "*" => None,
            Some(raw) => Some(
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
            ),
        };

        let special_landing = match non_blank("SPECIAL_LANDING") {
            Some(value) => parse_var("SPECIAL_LANDING", value)?,
            None => SpecialLanding::default(),
        };
        let turn_handover = match non_blank("TURN_HANDOVER") {
            Some(value) => parse_var("TURN_HANDOVER", value)?,
            None => TurnHandover::default(),
        };

        Ok(Self {
            bind_addr,
            database_url: non_blank("DATABASE_URL"),
            board_path: non_blank("BOARD_PATH"),
            cors_allowed_origins,
            rules: GameRules {
                special_landing,
                turn_handover,
            },
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

//! Configuration - environment variable parsing
//!
//! Every setting has a default; `SIGHTLINE_*` variables override them.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::core::rng::seed_from_clock;
use crate::game::state::WorldConfig;
use crate::game::tick::TickConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Number of player slots.
    pub player_slots: usize,
    /// World width in units.
    pub world_width: f32,
    /// World height in units.
    pub world_height: f32,
    /// Seed for arena layout and spawns.
    pub arena_seed: u64,
    /// Bytes requested per socket read.
    pub read_chunk_size: usize,
    /// Longest unterminated line a connection may buffer.
    pub max_line_bytes: usize,
    /// Outbound messages queued per connection before updates are dropped.
    pub outbound_queue: usize,
    /// Start running as soon as the server is up.
    pub auto_start: bool,
    /// Only report opponents in line of sight.
    pub fog_of_war: bool,
    /// How long shutdown waits for connections to flush.
    pub shutdown_grace: Duration,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], crate::DEFAULT_PORT)),
            tick_interval: Duration::from_millis(crate::TICK_INTERVAL_MS),
            player_slots: 3,
            world_width: 1600.0,
            world_height: 1200.0,
            arena_seed: seed_from_clock(),
            read_chunk_size: 1024,
            max_line_bytes: 4096,
            outbound_queue: 64,
            auto_start: false,
            fog_of_war: false,
            shutdown_grace: Duration::from_millis(2000),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: parse_var("SIGHTLINE_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            tick_interval: parse_var("SIGHTLINE_TICK_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            player_slots: parse_var("SIGHTLINE_PLAYER_SLOTS")?.unwrap_or(defaults.player_slots),
            world_width: parse_var("SIGHTLINE_WORLD_WIDTH")?.unwrap_or(defaults.world_width),
            world_height: parse_var("SIGHTLINE_WORLD_HEIGHT")?.unwrap_or(defaults.world_height),
            arena_seed: parse_var("SIGHTLINE_ARENA_SEED")?.unwrap_or(defaults.arena_seed),
            read_chunk_size: parse_var("SIGHTLINE_READ_CHUNK")?.unwrap_or(defaults.read_chunk_size),
            max_line_bytes: parse_var("SIGHTLINE_MAX_LINE")?.unwrap_or(defaults.max_line_bytes),
            outbound_queue: parse_var("SIGHTLINE_OUTBOUND_QUEUE")?.unwrap_or(defaults.outbound_queue),
            auto_start: parse_var("SIGHTLINE_AUTO_START")?.unwrap_or(defaults.auto_start),
            fog_of_war: parse_var("SIGHTLINE_FOG_OF_WAR")?.unwrap_or(defaults.fog_of_war),
            shutdown_grace: parse_var("SIGHTLINE_SHUTDOWN_GRACE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_grace),
            log_level: env::var("SIGHTLINE_LOG").unwrap_or(defaults.log_level),
        }
        .validated()?)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::OutOfRange("SIGHTLINE_TICK_MS"));
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::OutOfRange("SIGHTLINE_READ_CHUNK"));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::OutOfRange("SIGHTLINE_OUTBOUND_QUEUE"));
        }
        if !(self.world_width > 0.0 && self.world_height > 0.0) {
            return Err(ConfigError::OutOfRange("SIGHTLINE_WORLD_WIDTH/HEIGHT"));
        }
        Ok(self)
    }

    /// World parameters derived from this config.
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            player_slots: self.player_slots,
            arena_seed: self.arena_seed,
            ..Default::default()
        }
    }

    /// Tick parameters derived from this config.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            dt: self.tick_interval.as_secs_f32(),
            fog_of_war: self.fog_of_war,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            name,
            value: "<non-unicode>".to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Value could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// Value parsed but is unusable.
    #[error("Value out of range: {0}")]
    OutOfRange(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 1337);
        assert_eq!(config.tick_interval, Duration::from_millis(20));
        assert_eq!(config.player_slots, 3);
        assert_eq!(config.read_chunk_size, 1024);
        assert!(!config.auto_start);
    }

    #[test]
    fn test_derived_configs() {
        let config = ServerConfig {
            arena_seed: 5,
            fog_of_war: true,
            ..Default::default()
        };

        let world = config.world_config();
        assert_eq!(world.player_slots, 3);
        assert_eq!(world.arena_seed, 5);
        assert!(world.obstacles.is_none());

        let tick = config.tick_config();
        assert!((tick.dt - 0.02).abs() < 1e-6);
        assert!(tick.fog_of_war);
    }

    #[test]
    fn test_validation() {
        let config = ServerConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validated(), Err(ConfigError::OutOfRange(_))));

        let config = ServerConfig {
            outbound_queue: 0,
            ..Default::default()
        };
        assert!(config.validated().is_err());
        assert!(ServerConfig::default().validated().is_ok());
    }

    #[test]
    fn test_parse_var() {
        // Only touches a variable no other test reads
        env::set_var("SIGHTLINE_TEST_ONLY_NUMBER", "42");
        assert_eq!(parse_var::<u32>("SIGHTLINE_TEST_ONLY_NUMBER").unwrap(), Some(42));

        env::set_var("SIGHTLINE_TEST_ONLY_NUMBER", "forty");
        assert!(matches!(
            parse_var::<u32>("SIGHTLINE_TEST_ONLY_NUMBER"),
            Err(ConfigError::Invalid { .. })
        ));

        env::remove_var("SIGHTLINE_TEST_ONLY_NUMBER");
        assert_eq!(parse_var::<u32>("SIGHTLINE_TEST_ONLY_NUMBER").unwrap(), None);
    }
}

//! Game tunables.
//!
//! Values are layered: [`GameConfig::default`], then `SIGNAL_RUNNER_*`
//! environment variables, then command line flags, then [`GameConfig::validate`].

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const ENV_SCORES: &str = "SIGNAL_RUNNER_SCORES";
pub const ENV_LOG: &str = "SIGNAL_RUNNER_LOG";
pub const ENV_SEED: &str = "SIGNAL_RUNNER_SEED";
pub const ENV_POSES: &str = "SIGNAL_RUNNER_POSES";
pub const ENV_POLICY: &str = "SIGNAL_RUNNER_POLICY";
pub const ENV_MUTE: &str = "SIGNAL_RUNNER_MUTE";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Parse { key: &'static str, value: String },
    #[error("{key} {reason}")]
    OutOfRange {
        key: &'static str,
        reason: &'static str,
    },
}

/// Which planner decides the next road tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoadPolicy {
    /// Queue of planned tiles: a straight run, then one mission.
    #[default]
    Lookahead,
    /// One decision per tile with a forced straight run after each mission.
    Cooldown,
}

impl FromStr for RoadPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lookahead" | "queue" => Ok(RoadPolicy::Lookahead),
            "cooldown" | "runner" => Ok(RoadPolicy::Cooldown),
            _ => Err(ConfigError::Parse {
                key: "policy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoadConfig {
    pub policy: RoadPolicy,
    /// Side length of one square road tile, in world units.
    pub tile_size: f32,
    /// Tiles are materialized while the road's frontier is closer than this.
    pub visibility: f32,
    /// Materialized tiles kept before the oldest is evicted.
    pub retention: usize,
    /// Planned descriptors the lookahead queue is refilled to.
    pub lookahead: usize,
    pub min_straight: u32,
    pub max_straight: u32,
    /// Per-decision mission probability of the cooldown planner.
    pub mission_chance: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            policy: RoadPolicy::default(),
            tile_size: 400.0,
            visibility: 2000.0,
            retention: 20,
            lookahead: 20,
            min_straight: 3,
            max_straight: 6,
            mission_chance: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GradingConfig {
    pub reaction_ticks: u32,
    pub sampling_ticks: u32,
    pub success_threshold: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            reaction_ticks: 30,
            sampling_ticks: 60,
            success_threshold: 0.4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub speed: f32,
    pub turn_trigger: f32,
    pub stop_trigger: f32,
    pub result_ticks: u32,
    pub game_over_ticks: u32,
    pub success_points: u32,
    pub mistake_limit: u32,
    pub backdrop_tile: f32,
    pub road: RoadConfig,
    pub grading: GradingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speed: 8.0,
            turn_trigger: 24.0,
            stop_trigger: 150.0,
            result_ticks: 30,
            game_over_ticks: 90,
            success_points: 70,
            mistake_limit: 3,
            backdrop_tile: 200.0,
            road: RoadConfig::default(),
            grading: GradingConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub tick_rate_hz: u32,
    pub session: SessionConfig,
    pub seed: Option<u64>,
    pub scores_path: PathBuf,
    pub log_path: PathBuf,
    /// Recorded pose frames to classify instead of keyboard input.
    pub poses_path: Option<PathBuf>,
    pub keyboard_hold_ticks: u32,
    pub mute: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30,
            session: SessionConfig::default(),
            seed: None,
            scores_path: PathBuf::from("users.json"),
            log_path: PathBuf::from("signal-runner.log"),
            poses_path: None,
            keyboard_hold_ticks: 18,
            mute: false,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overrides fields from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_SCORES) {
            self.scores_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_LOG) {
            self.log_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_POSES) {
            self.poses_path = Some(PathBuf::from(path));
        }
        if let Some(seed) = lookup(ENV_SEED) {
            self.seed = Some(parse_value("seed", &seed)?);
        }
        if let Some(policy) = lookup(ENV_POLICY) {
            self.session.road.policy = policy.parse()?;
        }
        if let Some(mute) = lookup(ENV_MUTE) {
            self.mute = matches!(mute.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.session;
        let road = &s.road;
        let checks: [(bool, &'static str, &'static str); 11] = [
            (
                (1..=240).contains(&self.tick_rate_hz),
                "tick_rate_hz",
                "must be within 1..=240",
            ),
            (s.speed > 0.0, "speed", "must be positive"),
            (road.tile_size > 0.0, "tile_size", "must be positive"),
            (
                road.visibility >= road.tile_size,
                "visibility",
                "must be at least one tile",
            ),
            (road.retention >= 2, "retention", "must keep at least two tiles"),
            (
                road.min_straight >= 1 && road.min_straight <= road.max_straight,
                "min_straight",
                "must be within 1..=max_straight",
            ),
            (
                (0.0..=1.0).contains(&road.mission_chance),
                "mission_chance",
                "must be a probability",
            ),
            (
                s.grading.sampling_ticks > 0,
                "sampling_ticks",
                "must be positive",
            ),
            (
                s.grading.success_threshold > 0.0 && s.grading.success_threshold <= 1.0,
                "success_threshold",
                "must be within (0, 1]",
            ),
            (s.mistake_limit >= 1, "mistake_limit", "must be at least 1"),
            (
                s.turn_trigger >= s.speed / 2.0,
                "turn_trigger",
                "must cover half a tick of travel",
            ),
        ];
        for (ok, key, reason) in checks {
            if !ok {
                return Err(ConfigError::OutOfRange { key, reason });
            }
        }
        Ok(())
    }
}

pub fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Parse {
        key,
        value: value.to_string(),
    })
}

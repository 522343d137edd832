//! Configuration loading and typed config structures for the Starhold engine.
//!
//! The canonical configuration lives in `starhold-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure and provides a loader that reads the file. Every
//! section and field has a default, so a missing or empty file yields a
//! playable configuration.
//!
//! Cross-field constraints (interval ordering, multiplier ranges) are
//! checked by [`EngineConfig::validate`], which the binary calls once at
//! startup.

use std::path::Path;

use serde::Deserialize;
use starhold_galaxy::MapLayout;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A cross-field constraint does not hold.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of the violated constraint.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `starhold-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Tick loop pacing and periodic task intervals.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Combat resolution parameters.
    #[serde(default)]
    pub combat: CombatSettings,

    /// Supply route parameters.
    #[serde(default)]
    pub supply: SupplySettings,

    /// Colonization probe parameters.
    #[serde(default)]
    pub probes: ProbeSettings,

    /// Autonomous player policy parameters.
    #[serde(default)]
    pub ai: AiSettings,

    /// Map generation parameters.
    #[serde(default)]
    pub map: MapSettings,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.simulation.broadcast_every_n_ticks == 0 {
            return invalid("simulation.broadcast_every_n_ticks must be at least 1");
        }
        if self.simulation.growth_interval_ticks == 0 {
            return invalid("simulation.growth_interval_ticks must be at least 1");
        }
        if self.simulation.reconcile_interval_ticks == 0 {
            return invalid("simulation.reconcile_interval_ticks must be at least 1");
        }
        if self.combat.attack_multiplier_min > self.combat.attack_multiplier_max {
            return invalid("combat.attack_multiplier_min must not exceed the max");
        }
        if self.combat.defense_multiplier_min > self.combat.defense_multiplier_max {
            return invalid("combat.defense_multiplier_min must not exceed the max");
        }
        if !rate_in_unit_range(self.combat.attacker_survival_rate) {
            return invalid("combat.attacker_survival_rate must be in (0, 1]");
        }
        if !rate_in_unit_range(self.combat.defender_survival_rate) {
            return invalid("combat.defender_survival_rate must be in (0, 1]");
        }
        if self.combat.garrison_floor == 0 {
            return invalid("combat.garrison_floor must be at least 1");
        }
        if self.supply.transfer_interval_ticks == 0 {
            return invalid("supply.transfer_interval_ticks must be at least 1");
        }
        if self.supply.revalidate_interval_ticks == 0 {
            return invalid("supply.revalidate_interval_ticks must be at least 1");
        }
        if self.probes.cost == 0 {
            return invalid("probes.cost must be at least 1");
        }
        if self.probes.speed <= 0.0 {
            return invalid("probes.speed must be positive");
        }
        if self.ai.decision_interval_ticks == 0 {
            return invalid("ai.decision_interval_ticks must be at least 1");
        }
        if !rate_in_unit_range(self.ai.expansion_share_target) {
            return invalid("ai.expansion_share_target must be in (0, 1]");
        }
        if self.map.territory_count == 0 {
            return invalid("map.territory_count must be at least 1");
        }
        if self.map.lane_degree == 0 {
            return invalid("map.lane_degree must be at least 1");
        }
        Ok(())
    }

    /// Bridge the `map` and `probes` sections into a builder layout.
    #[must_use]
    pub fn map_layout(&self) -> MapLayout {
        MapLayout {
            territory_count: self.map.territory_count,
            lane_degree: self.map.lane_degree,
            width: self.map.width,
            height: self.map.height,
            base_army: self.map.base_army,
            neutral_army: self.map.neutral_army,
            colonizable_fraction: self.probes.colonizable_fraction,
            capitals: self.map.capital_mechanic != CapitalMechanic::Off,
        }
    }
}

/// Whether a rate lies in the half-open unit interval (0, 1].
fn rate_in_unit_range(rate: f64) -> bool {
    rate > 0.0 && rate <= 1.0
}

/// HTTP/WebSocket server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Tick loop pacing and periodic task intervals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSettings {
    /// Real-time milliseconds per tick (0 = run flat out; tests).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Maximum ticks before the match ends on points (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Delta broadcast cadence in ticks.
    #[serde(default = "default_broadcast_every_n_ticks")]
    pub broadcast_every_n_ticks: u64,

    /// Army growth cadence in ticks.
    #[serde(default = "default_growth_interval_ticks")]
    pub growth_interval_ticks: u64,

    /// Armies added to each owned territory per growth interval.
    #[serde(default = "default_growth_amount")]
    pub growth_amount: u32,

    /// Extra armies a capital gains per growth interval.
    #[serde(default = "default_capital_growth_bonus")]
    pub capital_growth_bonus: u32,

    /// Defensive reconciliation cadence in ticks.
    #[serde(default = "default_reconcile_interval_ticks")]
    pub reconcile_interval_ticks: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            broadcast_every_n_ticks: default_broadcast_every_n_ticks(),
            growth_interval_ticks: default_growth_interval_ticks(),
            growth_amount: default_growth_amount(),
            capital_growth_bonus: default_capital_growth_bonus(),
            reconcile_interval_ticks: default_reconcile_interval_ticks(),
        }
    }
}

/// Combat resolution parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombatSettings {
    /// Lower bound of the attacker's random power multiplier.
    #[serde(default = "default_attack_multiplier_min")]
    pub attack_multiplier_min: f64,

    /// Upper bound of the attacker's random power multiplier.
    #[serde(default = "default_attack_multiplier_max")]
    pub attack_multiplier_max: f64,

    /// Lower bound of the defender's random power multiplier.
    #[serde(default = "default_defense_multiplier_min")]
    pub defense_multiplier_min: f64,

    /// Upper bound of the defender's random power multiplier.
    #[serde(default = "default_defense_multiplier_max")]
    pub defense_multiplier_max: f64,

    /// Fraction of committed armies that survive an attacker victory.
    #[serde(default = "default_survival_rate")]
    pub attacker_survival_rate: f64,

    /// Fraction of defenders that survive a defender victory.
    #[serde(default = "default_survival_rate")]
    pub defender_survival_rate: f64,

    /// Armies that must always remain on an attacking territory.
    #[serde(default = "default_garrison_floor")]
    pub garrison_floor: u32,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            attack_multiplier_min: default_attack_multiplier_min(),
            attack_multiplier_max: default_attack_multiplier_max(),
            defense_multiplier_min: default_defense_multiplier_min(),
            defense_multiplier_max: default_defense_multiplier_max(),
            attacker_survival_rate: default_survival_rate(),
            defender_survival_rate: default_survival_rate(),
            garrison_floor: default_garrison_floor(),
        }
    }
}

/// Supply route parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupplySettings {
    /// Ticks between drain passes over active routes.
    #[serde(default = "default_transfer_interval_ticks")]
    pub transfer_interval_ticks: u64,

    /// Ticks between full path revalidation passes.
    #[serde(default = "default_revalidate_interval_ticks")]
    pub revalidate_interval_ticks: u64,

    /// Armies a route origin always keeps when draining.
    #[serde(default = "default_min_garrison")]
    pub min_garrison: u32,

    /// Ticks a shipment takes to cross one warp lane.
    #[serde(default = "default_hop_delay_ticks")]
    pub hop_delay_ticks: u64,

    /// Maximum active routes per player (0 = unlimited).
    #[serde(default = "default_max_routes_per_player")]
    pub max_routes_per_player: u32,
}

impl Default for SupplySettings {
    fn default() -> Self {
        Self {
            transfer_interval_ticks: default_transfer_interval_ticks(),
            revalidate_interval_ticks: default_revalidate_interval_ticks(),
            min_garrison: default_min_garrison(),
            hop_delay_ticks: default_hop_delay_ticks(),
            max_routes_per_player: default_max_routes_per_player(),
        }
    }
}

/// Colonization probe parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeSettings {
    /// Armies consumed by a launch; also the new colony's garrison.
    #[serde(default = "default_probe_cost")]
    pub cost: u32,

    /// Probe travel speed in map distance units per tick.
    #[serde(default = "default_probe_speed")]
    pub speed: f64,

    /// Minimum flight duration regardless of distance.
    #[serde(default = "default_min_duration_ticks")]
    pub min_duration_ticks: u64,

    /// Fraction of neutral territories generated colonizable.
    #[serde(default = "default_colonizable_fraction")]
    pub colonizable_fraction: f64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            cost: default_probe_cost(),
            speed: default_probe_speed(),
            min_duration_ticks: default_min_duration_ticks(),
            colonizable_fraction: default_colonizable_fraction(),
        }
    }
}

/// Autonomous player policy parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiSettings {
    /// Autonomous players added to each room at start.
    #[serde(default = "default_autonomous_players")]
    pub autonomous_players: u32,

    /// Base ticks between policy evaluations per autonomous player.
    #[serde(default = "default_decision_interval_ticks")]
    pub decision_interval_ticks: u64,

    /// Random extra ticks added per evaluation to spread bot activity.
    #[serde(default = "default_decision_jitter_ticks")]
    pub decision_jitter_ticks: u64,

    /// Army advantage required before the policy attacks a neighbor.
    #[serde(default = "default_aggression_multiplier")]
    pub aggression_multiplier: f64,

    /// Territory share below which the policy prefers expansion.
    #[serde(default = "default_expansion_share_target")]
    pub expansion_share_target: f64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            autonomous_players: default_autonomous_players(),
            decision_interval_ticks: default_decision_interval_ticks(),
            decision_jitter_ticks: default_decision_jitter_ticks(),
            aggression_multiplier: default_aggression_multiplier(),
            expansion_share_target: default_expansion_share_target(),
        }
    }
}

/// What capturing a player's sole capital does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalMechanic {
    /// No capitals are assigned.
    Off,
    /// Losing the capital eliminates the player; holdings turn neutral.
    Eliminate,
    /// Losing the capital hands all holdings to the captor.
    Cascade,
}

/// Map generation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapSettings {
    /// Number of territories to generate.
    #[serde(default = "default_territory_count")]
    pub territory_count: u32,

    /// Warp lanes linked from each territory to its nearest neighbors.
    #[serde(default = "default_lane_degree")]
    pub lane_degree: u32,

    /// Map plane width in map units.
    #[serde(default = "default_map_width")]
    pub width: f64,

    /// Map plane height in map units.
    #[serde(default = "default_map_height")]
    pub height: f64,

    /// Garrison placed on each starting territory.
    #[serde(default = "default_base_army")]
    pub base_army: u32,

    /// Garrison placed on each neutral territory.
    #[serde(default = "default_neutral_army")]
    pub neutral_army: u32,

    /// Capital capture behavior.
    #[serde(default = "default_capital_mechanic")]
    pub capital_mechanic: CapitalMechanic,

    /// Map and combat RNG seed (0 = seed from entropy).
    #[serde(default)]
    pub seed: u64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            territory_count: default_territory_count(),
            lane_degree: default_lane_degree(),
            width: default_map_width(),
            height: default_map_height(),
            base_army: default_base_army(),
            neutral_army: default_neutral_army(),
            capital_mechanic: default_capital_mechanic(),
            seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_broadcast_every_n_ticks() -> u64 {
    1
}

const fn default_growth_interval_ticks() -> u64 {
    10
}

const fn default_growth_amount() -> u32 {
    1
}

const fn default_capital_growth_bonus() -> u32 {
    1
}

const fn default_reconcile_interval_ticks() -> u64 {
    50
}

const fn default_attack_multiplier_min() -> f64 {
    0.8
}

const fn default_attack_multiplier_max() -> f64 {
    1.2
}

const fn default_defense_multiplier_min() -> f64 {
    0.9
}

const fn default_defense_multiplier_max() -> f64 {
    1.1
}

const fn default_survival_rate() -> f64 {
    0.7
}

const fn default_garrison_floor() -> u32 {
    1
}

const fn default_transfer_interval_ticks() -> u64 {
    20
}

const fn default_revalidate_interval_ticks() -> u64 {
    10
}

const fn default_min_garrison() -> u32 {
    5
}

const fn default_hop_delay_ticks() -> u64 {
    2
}

const fn default_max_routes_per_player() -> u32 {
    8
}

const fn default_probe_cost() -> u32 {
    10
}

const fn default_probe_speed() -> f64 {
    40.0
}

const fn default_min_duration_ticks() -> u64 {
    4
}

const fn default_colonizable_fraction() -> f64 {
    0.35
}

const fn default_autonomous_players() -> u32 {
    3
}

const fn default_decision_interval_ticks() -> u64 {
    8
}

const fn default_decision_jitter_ticks() -> u64 {
    4
}

const fn default_aggression_multiplier() -> f64 {
    1.5
}

const fn default_expansion_share_target() -> f64 {
    0.4
}

const fn default_territory_count() -> u32 {
    24
}

const fn default_lane_degree() -> u32 {
    3
}

const fn default_map_width() -> f64 {
    1600.0
}

const fn default_map_height() -> f64 {
    900.0
}

const fn default_base_army() -> u32 {
    10
}

const fn default_neutral_army() -> u32 {
    2
}

const fn default_capital_mechanic() -> CapitalMechanic {
    CapitalMechanic::Eliminate
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.tick_interval_ms, 500);
        assert_eq!(config.combat.garrison_floor, 1);
        assert_eq!(config.supply.min_garrison, 5);
        assert_eq!(config.probes.cost, 10);
        assert_eq!(config.map.capital_mechanic, CapitalMechanic::Eliminate);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9090

simulation:
  tick_interval_ms: 250
  max_ticks: 5000
  broadcast_every_n_ticks: 2
  growth_interval_ticks: 5
  growth_amount: 2
  capital_growth_bonus: 3
  reconcile_interval_ticks: 100

combat:
  attack_multiplier_min: 0.7
  attack_multiplier_max: 1.3
  defense_multiplier_min: 0.85
  defense_multiplier_max: 1.15
  attacker_survival_rate: 0.6
  defender_survival_rate: 0.8
  garrison_floor: 2

supply:
  transfer_interval_ticks: 30
  revalidate_interval_ticks: 15
  min_garrison: 8
  hop_delay_ticks: 3
  max_routes_per_player: 4

probes:
  cost: 12
  speed: 60.0
  min_duration_ticks: 6
  colonizable_fraction: 0.5

ai:
  autonomous_players: 5
  decision_interval_ticks: 10
  decision_jitter_ticks: 2
  aggression_multiplier: 2.0
  expansion_share_target: 0.3

map:
  territory_count: 40
  lane_degree: 4
  width: 2000.0
  height: 1200.0
  base_army: 15
  neutral_army: 3
  capital_mechanic: cascade
  seed: 99
"#;

        let config = EngineConfig::parse(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.simulation.max_ticks, 5000);
        assert_eq!(config.combat.garrison_floor, 2);
        assert_eq!(config.supply.max_routes_per_player, 4);
        assert_eq!(config.probes.cost, 12);
        assert_eq!(config.ai.autonomous_players, 5);
        assert_eq!(config.map.capital_mechanic, CapitalMechanic::Cascade);
        assert_eq!(config.map.seed, 99);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "map:\n  seed: 7\n";
        let config = EngineConfig::parse(yaml).unwrap();

        // Seed is overridden
        assert_eq!(config.map.seed, 7);
        // Everything else uses defaults
        assert_eq!(config.simulation.broadcast_every_n_ticks, 1);
        assert_eq!(config.supply.transfer_interval_ticks, 20);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(EngineConfig::parse("").is_ok());
    }

    #[test]
    fn validate_rejects_inverted_multipliers() {
        let mut config = EngineConfig::default();
        config.combat.attack_multiplier_min = 1.5;
        config.combat.attack_multiplier_max = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_garrison_floor() {
        let mut config = EngineConfig::default();
        config.combat.garrison_floor = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_broadcast_cadence() {
        let mut config = EngineConfig::default();
        config.simulation.broadcast_every_n_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn map_layout_tracks_capital_mechanic() {
        let mut config = EngineConfig::default();
        assert!(config.map_layout().capitals);
        config.map.capital_mechanic = CapitalMechanic::Off;
        assert!(!config.map_layout().capitals);
        assert_eq!(config.map_layout().territory_count, config.map.territory_count);
        let fraction_drift =
            (config.map_layout().colonizable_fraction - config.probes.colonizable_fraction).abs();
        assert!(fraction_drift < f64::EPSILON);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("starhold-config.yaml");
        if path.exists() {
            let config = EngineConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every tunable constant of the turn pipeline.
///
/// All sections default, so an empty YAML document yields the stock tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub cycle: CycleConfig,
    pub research: ResearchConfig,
    pub fields: FieldConfig,
    pub graph: GraphConfig,
    pub routing: RoutingConfig,
    pub fuel: FuelConfig,
    pub clusters: ClusterConfig,
    pub units: UnitConfig,
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("day length {day} exceeds cycle length {cycle}")]
    DayLongerThanCycle { day: u32, cycle: u32 },
    #[error("edge weights must satisfy own_city <= baseline < enemy_unit < blocking")]
    WeightOrdering,
    #[error("cluster max_share must be within [0, 1], got {0}")]
    ShareOutOfRange(f64),
}

impl Tuning {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tuning file {}", path.display()))?;
        let tuning: Tuning = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tuning
            .validate()
            .with_context(|| format!("Invalid tuning in {}", path.display()))?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.cycle.cycle_length == 0 {
            return Err(TuningError::NotPositive {
                field: "cycle.cycle_length",
                value: 0.0,
            });
        }
        if self.cycle.day_length > self.cycle.cycle_length {
            return Err(TuningError::DayLongerThanCycle {
                day: self.cycle.day_length,
                cycle: self.cycle.cycle_length,
            });
        }
        let weights = &self.graph.weights;
        if !(weights.own_city <= weights.baseline
            && weights.baseline < weights.enemy_unit
            && weights.enemy_unit < weights.blocking)
        {
            return Err(TuningError::WeightOrdering);
        }
        for (field, value) in [
            ("graph.weights.own_city", weights.own_city),
            ("fuel.distance_floor", self.fuel.distance_floor),
            ("fuel.deadline_ms", self.fuel.deadline_ms as f64),
            ("clusters.deadline_ms", self.clusters.deadline_ms as f64),
        ] {
            if value <= 0.0 {
                return Err(TuningError::NotPositive { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.clusters.max_share) {
            return Err(TuningError::ShareOutOfRange(self.clusters.max_share));
        }
        Ok(())
    }
}

fn default_cycle_length() -> u32 {
    40
}

fn default_day_length() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u32,
    #[serde(default = "default_day_length")]
    pub day_length: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_length: default_cycle_length(),
            day_length: default_day_length(),
        }
    }
}

fn default_coal_points() -> u32 {
    50
}

fn default_uranium_points() -> u32 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_coal_points")]
    pub coal_points: u32,
    #[serde(default = "default_uranium_points")]
    pub uranium_points: u32,
    /// City tiles stop researching once the player holds this many points.
    #[serde(default = "default_uranium_points")]
    pub research_cap: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            coal_points: default_coal_points(),
            uranium_points: default_uranium_points(),
            research_cap: default_uranium_points(),
        }
    }
}

/// Point masses placed before convolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub wood_adjacency: f64,
    pub coal_adjacency: f64,
    pub uranium_adjacency: f64,
    /// Added to a non-zero wood adjacency on resource-free cells.
    pub wood_open_bonus: f64,
    pub city_adjacency: f64,
    pub settle_city: f64,
    pub settle_wood: f64,
    pub settle_coal: f64,
    pub settle_uranium: f64,
    pub spread_own_city: f64,
    pub spread_enemy_city: f64,
    pub spread_enemy_unit: f64,
    pub spread_wood: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            wood_adjacency: 2.0,
            coal_adjacency: 12.0,
            uranium_adjacency: 12.0,
            wood_open_bonus: 3.0,
            city_adjacency: 1.0,
            settle_city: 4.0,
            settle_wood: 1.5,
            settle_coal: 2.0,
            settle_uranium: 2.0,
            spread_own_city: -40.0,
            spread_enemy_city: -10.0,
            spread_enemy_unit: -6.0,
            spread_wood: 2.0,
        }
    }
}

/// Edge weight constants; only their ordering is load-bearing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub baseline: f64,
    pub own_city: f64,
    pub enemy_unit: f64,
    pub blocking: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            baseline: 2.0,
            own_city: 1.0,
            enemy_unit: 6.0,
            blocking: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub weights: WeightTable,
    pub settle_density: f64,
    pub settle_city_adjacency: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            settle_density: 2000.0,
            settle_city_adjacency: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Paths at or above this cost are treated as unreachable.
    pub max_path_length: f64,
    /// Cargo, in wood/4 + coal + uranium units, that justifies a night trip.
    pub near_capacity_cargo: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_path_length: 500.0,
            near_capacity_cargo: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelConfig {
    pub min_turn: u32,
    pub supply_threshold: f64,
    pub priority_threshold: f64,
    pub priority_discount: f64,
    pub max_supplies: usize,
    pub max_demands: usize,
    pub horizon_base: f64,
    pub horizon_per_tile: f64,
    pub horizon_cap: f64,
    pub min_demand: f64,
    pub value_per_tile: f64,
    pub min_value: f64,
    pub value_divisor: f64,
    pub distance_weight: f64,
    pub distance_floor: f64,
    pub deadline_ms: u64,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            min_turn: 20,
            supply_threshold: 20.0,
            priority_threshold: 30.0,
            priority_discount: 0.1,
            max_supplies: 40,
            max_demands: 20,
            horizon_base: 10.0,
            horizon_per_tile: 0.2,
            horizon_cap: 15.0,
            min_demand: 100.0,
            value_per_tile: 0.5,
            min_value: 4.0,
            value_divisor: 10.0,
            distance_weight: 4.0,
            distance_floor: 1.0,
            deadline_ms: 450,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub bonus: f64,
    pub max_share: f64,
    /// Own-city density above which wood is considered already worked.
    pub city_exclusion: f64,
    pub deadline_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            bonus: 20.0,
            max_share: 0.5,
            city_exclusion: 3.0,
            deadline_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    pub build_space_margin: u32,
    pub build_wood_amount: u32,
    pub early_settle_turn: u32,
    pub early_settle_multiplier: f64,
    pub special_coal_points: u32,
    pub special_uranium_points: u32,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            build_space_margin: 20,
            build_wood_amount: 60,
            early_settle_turn: 60,
            early_settle_multiplier: 4.0,
            special_coal_points: 25,
            special_uranium_points: 185,
        }
    }
}

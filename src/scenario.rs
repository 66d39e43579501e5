use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    spatial::{Dims, Pos},
    world::{Cargo, City, CityTile, Deposit, Player, ResourceKind, TurnSnapshot, Unit, UnitKind},
};

fn default_seed() -> u64 {
    42
}

fn default_capacity() -> u32 {
    100
}

fn default_light_upkeep() -> f64 {
    23.0
}

fn default_unit_kind() -> UnitKind {
    UnitKind::Worker
}

/// One turn of the game as written in a YAML fixture
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub turn: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub resources: Vec<ScenarioResource>,
    #[serde(default)]
    pub player: ScenarioPlayer,
    #[serde(default)]
    pub opponent: ScenarioPlayer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioResource {
    pub x: i32,
    pub y: i32,
    pub kind: ResourceKind,
    pub amount: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioPlayer {
    #[serde(default)]
    pub research_points: u32,
    #[serde(default)]
    pub cities: Vec<ScenarioCity>,
    #[serde(default)]
    pub units: Vec<ScenarioUnit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioCity {
    pub id: String,
    #[serde(default)]
    pub fuel: f64,
    #[serde(default = "default_light_upkeep")]
    pub light_upkeep: f64,
    pub tiles: Vec<ScenarioTile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTile {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub cooldown: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioUnit {
    pub id: String,
    #[serde(default = "default_unit_kind")]
    pub kind: UnitKind,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub cargo: Cargo,
    #[serde(default)]
    pub cooldown: f64,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("map must be at least 1x1, got {width}x{height}")]
    EmptyMap { width: u32, height: u32 },
    #[error("{entity} at {pos} lies outside the map")]
    OutOfBounds { entity: String, pos: Pos },
    #[error("more than one resource at {0}")]
    DuplicateResource(Pos),
    #[error("more than one city tile at {0}")]
    DuplicateCityTile(Pos),
    #[error("unit id {0} is used twice")]
    DuplicateUnit(String),
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }

    /// Loads and validates a fixture in one go.
    pub fn load_snapshot(&self, file: impl AsRef<Path>) -> Result<(Scenario, TurnSnapshot)> {
        let file = file.as_ref();
        let scenario = self.load(file)?;
        let snapshot = scenario
            .build_snapshot()
            .with_context(|| format!("Invalid scenario {}", file.display()))?;
        Ok((scenario, snapshot))
    }
}

impl Scenario {
    pub fn build_snapshot(&self) -> Result<TurnSnapshot, ScenarioError> {
        if self.width == 0 || self.height == 0 {
            return Err(ScenarioError::EmptyMap {
                width: self.width,
                height: self.height,
            });
        }
        let dims = Dims::new(self.width, self.height);
        let mut snapshot = TurnSnapshot::new(self.turn, dims);

        for resource in &self.resources {
            let pos = Pos::new(resource.x, resource.y);
            let cell = snapshot
                .deposits
                .get_mut(pos)
                .ok_or_else(|| out_of_bounds("resource", pos))?;
            if cell.is_some() {
                return Err(ScenarioError::DuplicateResource(pos));
            }
            *cell = Some(Deposit {
                kind: resource.kind,
                amount: resource.amount,
            });
        }

        let mut unit_ids = HashSet::new();
        let mut city_tiles = HashSet::new();
        snapshot.player = self.player.build(dims, &mut unit_ids, &mut city_tiles)?;
        snapshot.opponent = self.opponent.build(dims, &mut unit_ids, &mut city_tiles)?;
        Ok(snapshot)
    }
}

impl ScenarioPlayer {
    fn build(
        &self,
        dims: Dims,
        unit_ids: &mut HashSet<String>,
        city_tiles: &mut HashSet<Pos>,
    ) -> Result<Player, ScenarioError> {
        let mut cities = Vec::with_capacity(self.cities.len());
        for city in &self.cities {
            let mut tiles = Vec::with_capacity(city.tiles.len());
            for tile in &city.tiles {
                let pos = Pos::new(tile.x, tile.y);
                if !dims.contains(pos) {
                    return Err(out_of_bounds(&format!("city tile of {}", city.id), pos));
                }
                if !city_tiles.insert(pos) {
                    return Err(ScenarioError::DuplicateCityTile(pos));
                }
                tiles.push(CityTile {
                    city_id: city.id.clone(),
                    pos,
                    cooldown: tile.cooldown,
                });
            }
            cities.push(City {
                id: city.id.clone(),
                fuel: city.fuel,
                light_upkeep: city.light_upkeep,
                tiles,
            });
        }

        let mut units = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let pos = Pos::new(unit.x, unit.y);
            if !dims.contains(pos) {
                return Err(out_of_bounds(&format!("unit {}", unit.id), pos));
            }
            if !unit_ids.insert(unit.id.clone()) {
                return Err(ScenarioError::DuplicateUnit(unit.id.clone()));
            }
            units.push(Unit {
                id: unit.id.clone(),
                kind: unit.kind,
                pos,
                cargo: unit.cargo,
                cooldown: unit.cooldown,
                capacity: unit.capacity,
            });
        }

        Ok(Player {
            research_points: self.research_points,
            cities,
            units,
        })
    }
}

fn out_of_bounds(entity: &str, pos: Pos) -> ScenarioError {
    ScenarioError::OutOfBounds {
        entity: entity.to_string(),
        pos,
    }
}

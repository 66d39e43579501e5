use serde::{Deserialize, Serialize};

use crate::config::{CycleConfig, ResearchConfig};
use crate::spatial::{Dims, Grid, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Wood,
    Coal,
    Uranium,
}

impl ResourceKind {
    /// Fuel produced by one unit of this resource
    pub fn fuel_rate(self) -> f64 {
        match self {
            ResourceKind::Wood => 1.0,
            ResourceKind::Coal => 10.0,
            ResourceKind::Uranium => 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub kind: ResourceKind,
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    #[serde(default)]
    pub wood: u32,
    #[serde(default)]
    pub coal: u32,
    #[serde(default)]
    pub uranium: u32,
}

impl Cargo {
    pub fn total(&self) -> u32 {
        self.wood + self.coal + self.uranium
    }

    /// Cargo expressed in fuel units
    pub fn fuel_equivalent(&self) -> f64 {
        self.wood as f64 * ResourceKind::Wood.fuel_rate() + self.special_fuel()
    }

    /// Fuel carried as coal or uranium
    pub fn special_fuel(&self) -> f64 {
        self.coal as f64 * ResourceKind::Coal.fuel_rate()
            + self.uranium as f64 * ResourceKind::Uranium.fuel_rate()
    }

    /// Rough number of turns of work represented by the cargo.
    pub fn haul_turns(&self) -> f64 {
        self.wood as f64 / 4.0 + self.coal as f64 + self.uranium as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Worker,
    Cart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub kind: UnitKind,
    pub pos: Pos,
    pub cargo: Cargo,
    pub cooldown: f64,
    pub capacity: u32,
}

impl Unit {
    pub fn is_worker(&self) -> bool {
        self.kind == UnitKind::Worker
    }

    pub fn can_act(&self) -> bool {
        self.cooldown < 1.0
    }

    pub fn cargo_space_left(&self) -> u32 {
        self.capacity.saturating_sub(self.cargo.total())
    }

    /// Trailing integer of ids like `u_12`; zero when there is none.
    pub fn serial(&self) -> u32 {
        let prefix = self.id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        self.id[prefix..].parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityTile {
    pub city_id: String,
    pub pos: Pos,
    pub cooldown: f64,
}

impl CityTile {
    pub fn can_act(&self) -> bool {
        self.cooldown < 1.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub fuel: f64,
    pub light_upkeep: f64,
    pub tiles: Vec<CityTile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Player {
    pub research_points: u32,
    pub cities: Vec<City>,
    pub units: Vec<Unit>,
}

impl Player {
    pub fn research(&self, config: &ResearchConfig) -> Research {
        Research {
            points: self.research_points,
            coal: self.research_points >= config.coal_points,
            uranium: self.research_points >= config.uranium_points,
        }
    }

    pub fn city_tiles(&self) -> impl Iterator<Item = &CityTile> + '_ {
        self.cities.iter().flat_map(|city| city.tiles.iter())
    }

    pub fn city_tile_count(&self) -> usize {
        self.cities.iter().map(|city| city.tiles.len()).sum()
    }
}

/// Research unlock flags for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Research {
    pub points: u32,
    pub coal: bool,
    pub uranium: bool,
}

impl Research {
    pub fn unlocked(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Wood => true,
            ResourceKind::Coal => self.coal,
            ResourceKind::Uranium => self.uranium,
        }
    }
}

/// Who stands on a cell this turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Occupancy {
    pub own_city: Option<String>,
    pub enemy_city: bool,
    pub own_unit: bool,
    pub enemy_unit: bool,
}

/// The immutable world as seen at the start of a turn
#[derive(Debug, Clone)]
pub struct TurnSnapshot {
    pub turn: u32,
    pub dims: Dims,
    pub deposits: Grid<Option<Deposit>>,
    pub player: Player,
    pub opponent: Player,
}

impl TurnSnapshot {
    pub fn new(turn: u32, dims: Dims) -> Self {
        Self {
            turn,
            dims,
            deposits: Grid::filled(dims, None),
            player: Player::default(),
            opponent: Player::default(),
        }
    }

    pub fn deposit(&self, pos: Pos) -> Option<Deposit> {
        self.deposits.get(pos).copied().flatten()
    }

    pub fn occupancy(&self) -> Grid<Occupancy> {
        let mut grid = Grid::filled(self.dims, Occupancy::default());
        for tile in self.player.city_tiles() {
            if let Some(cell) = grid.get_mut(tile.pos) {
                cell.own_city = Some(tile.city_id.clone());
            }
        }
        for tile in self.opponent.city_tiles() {
            if let Some(cell) = grid.get_mut(tile.pos) {
                cell.enemy_city = true;
            }
        }
        for unit in &self.player.units {
            if let Some(cell) = grid.get_mut(unit.pos) {
                cell.own_unit = true;
            }
        }
        for unit in &self.opponent.units {
            if let Some(cell) = grid.get_mut(unit.pos) {
                cell.enemy_unit = true;
            }
        }
        grid
    }
}

/// Day/night clock derived from the turn counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayClock {
    pub turn: u32,
    pub turns_until_night: u32,
    pub cycle_index: u32,
}

impl DayClock {
    pub fn new(turn: u32, config: &CycleConfig) -> Self {
        let phase = turn % config.cycle_length;
        Self {
            turn,
            turns_until_night: config.day_length.saturating_sub(phase),
            cycle_index: turn / config.cycle_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cargo_fuel_equivalent_weights_special_resources() {
        let cargo = Cargo {
            wood: 20,
            coal: 2,
            uranium: 1,
        };
        assert_eq!(cargo.total(), 23);
        assert_eq!(cargo.fuel_equivalent(), 20.0 + 20.0 + 40.0);
        assert_eq!(cargo.special_fuel(), 60.0);
        assert_eq!(cargo.haul_turns(), 5.0 + 2.0 + 1.0);
    }

    #[test]
    fn unit_serial_parses_trailing_digits() {
        let unit = Unit {
            id: "u_12".into(),
            kind: UnitKind::Worker,
            pos: Pos::new(0, 0),
            cargo: Cargo::default(),
            cooldown: 0.0,
            capacity: 100,
        };
        assert_eq!(unit.serial(), 12);
        assert_eq!(unit.cargo_space_left(), 100);
        assert!(unit.can_act());
    }

    #[test]
    fn day_clock_counts_down_to_night() {
        let config = CycleConfig::default();
        assert_eq!(DayClock::new(0, &config).turns_until_night, 30);
        assert_eq!(DayClock::new(25, &config).turns_until_night, 5);
        assert_eq!(DayClock::new(35, &config).turns_until_night, 0);
        let clock = DayClock::new(85, &config);
        assert_eq!(clock.turns_until_night, 25);
        assert_eq!(clock.cycle_index, 2);
    }

    #[test]
    fn research_thresholds_unlock_in_order() {
        let config = ResearchConfig::default();
        let player = Player {
            research_points: 60,
            ..Player::default()
        };
        let research = player.research(&config);
        assert!(research.coal);
        assert!(!research.uranium);
        assert!(research.unlocked(ResourceKind::Wood));
        assert!(!research.unlocked(ResourceKind::Uranium));
    }
}

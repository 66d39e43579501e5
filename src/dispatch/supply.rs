use serde::Serialize;

use crate::config::FuelConfig;
use crate::spatial::Pos;
use crate::world::Player;

/// A unit carrying enough fuel to be worth routing to a city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyNode {
    pub unit_id: String,
    pub pos: Pos,
    pub supply: f64,
    /// Distance multiplier; units hauling coal or uranium travel "cheaper".
    pub discount: f64,
}

/// A city that will not survive its horizon on current fuel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandNode {
    pub city_id: String,
    pub tiles: Vec<Pos>,
    pub demand: f64,
    pub value: f64,
    pub survival_turns: f64,
}

/// Largest fuel carriers first, capped at `max_supplies`.
pub fn supply_nodes(player: &Player, config: &FuelConfig) -> Vec<SupplyNode> {
    let mut nodes: Vec<SupplyNode> = player
        .units
        .iter()
        .filter_map(|unit| {
            let supply = unit.cargo.fuel_equivalent();
            if supply < config.supply_threshold {
                return None;
            }
            let discount = if unit.cargo.special_fuel() > config.priority_threshold {
                config.priority_discount
            } else {
                1.0
            };
            Some(SupplyNode {
                unit_id: unit.id.clone(),
                pos: unit.pos,
                supply,
                discount,
            })
        })
        .collect();
    nodes.sort_by(|a, b| b.supply.total_cmp(&a.supply));
    nodes.truncate(config.max_supplies);
    nodes
}

/// Most valuable starving cities first, capped at `max_demands`.
pub fn demand_nodes(player: &Player, config: &FuelConfig) -> Vec<DemandNode> {
    let mut nodes: Vec<DemandNode> = player
        .cities
        .iter()
        .filter(|city| city.light_upkeep > 0.0)
        .filter_map(|city| {
            let tiles = city.tiles.len() as f64;
            let horizon = (config.horizon_base + tiles * config.horizon_per_tile).min(config.horizon_cap);
            let needed = city.light_upkeep * horizon;
            if city.fuel >= needed {
                return None;
            }
            Some(DemandNode {
                city_id: city.id.clone(),
                tiles: city.tiles.iter().map(|tile| tile.pos).collect(),
                demand: (needed - city.fuel).max(config.min_demand),
                value: (tiles * config.value_per_tile).max(config.min_value),
                survival_turns: (city.fuel / city.light_upkeep).floor(),
            })
        })
        .collect();
    nodes.sort_by(|a, b| b.value.total_cmp(&a.value));
    nodes.truncate(config.max_demands);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Cargo, City, CityTile, Unit, UnitKind};

    fn unit(id: &str, cargo: Cargo) -> Unit {
        Unit {
            id: id.into(),
            kind: UnitKind::Worker,
            pos: Pos::new(0, 0),
            cargo,
            cooldown: 0.0,
            capacity: 100,
        }
    }

    fn city(id: &str, tiles: i32, fuel: f64, upkeep: f64) -> City {
        City {
            id: id.into(),
            fuel,
            light_upkeep: upkeep,
            tiles: (0..tiles)
                .map(|x| CityTile {
                    city_id: id.into(),
                    pos: Pos::new(x, 0),
                    cooldown: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn supply_requires_threshold_and_sorts_descending() {
        let player = Player {
            units: vec![
                unit("u_1", Cargo { wood: 19, ..Cargo::default() }),
                unit("u_2", Cargo { wood: 25, ..Cargo::default() }),
                unit("u_3", Cargo { coal: 4, ..Cargo::default() }),
            ],
            ..Player::default()
        };
        let nodes = supply_nodes(&player, &FuelConfig::default());
        let ids: Vec<_> = nodes.iter().map(|n| n.unit_id.as_str()).collect();
        assert_eq!(ids, ["u_3", "u_2"]);
        assert_eq!(nodes[0].supply, 40.0);
        assert_eq!(nodes[0].discount, 0.1);
        assert_eq!(nodes[1].discount, 1.0);
    }

    #[test]
    fn supply_list_is_capped() {
        let player = Player {
            units: (0..50)
                .map(|i| unit(&format!("u_{i}"), Cargo { wood: 20 + i, ..Cargo::default() }))
                .collect(),
            ..Player::default()
        };
        let nodes = supply_nodes(&player, &FuelConfig::default());
        assert_eq!(nodes.len(), 40);
        assert_eq!(nodes[0].unit_id, "u_49");
    }

    #[test]
    fn demand_uses_horizon_and_floor() {
        let player = Player {
            cities: vec![
                city("c1", 5, 50.0, 10.0),
                city("c2", 10, 0.0, 100.0),
                city("c3", 1, 1000.0, 20.0),
            ],
            ..Player::default()
        };
        let nodes = demand_nodes(&player, &FuelConfig::default());
        assert_eq!(nodes.len(), 2);
        // c2: horizon 12, value 5
        assert_eq!(nodes[0].city_id, "c2");
        assert_eq!(nodes[0].demand, 1200.0);
        assert_eq!(nodes[0].value, 5.0);
        assert_eq!(nodes[0].survival_turns, 0.0);
        // c1: horizon 11, short by 60, raised to the minimum
        assert_eq!(nodes[1].city_id, "c1");
        assert_eq!(nodes[1].demand, 100.0);
        assert_eq!(nodes[1].value, 4.0);
        assert_eq!(nodes[1].survival_turns, 5.0);
        assert_eq!(nodes[1].tiles.len(), 5);
    }
}

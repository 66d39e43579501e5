//! Influence fields: point masses convolved with fixed kernels.
//!
//! Every field has the same shape as the map. Convolution is zero-padded
//! ("same" output), so a cell whose kernel footprint covers no source stays
//! exactly zero.

use crate::config::FieldConfig;
use crate::spatial::{Grid, Pos};
use crate::world::{Research, ResourceKind, TurnSnapshot};

/// Square convolution kernel of odd side `2 * radius + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    radius: i32,
    weights: Vec<f64>,
}

impl Kernel {
    fn from_fn(radius: i32, weight: impl Fn(i32, i32) -> f64) -> Self {
        let mut weights = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                weights.push(weight(dx, dy));
            }
        }
        Self { radius, weights }
    }

    /// The four orthogonal neighbours, centre excluded.
    pub fn ring() -> Self {
        Self::from_fn(1, |dx, dy| if dx.abs() + dy.abs() == 1 { 1.0 } else { 0.0 })
    }

    /// The four orthogonal neighbours plus the centre.
    pub fn cross() -> Self {
        Self::from_fn(1, |dx, dy| if dx.abs() + dy.abs() <= 1 { 1.0 } else { 0.0 })
    }

    /// 5x5 block without its corners and centre.
    pub fn settlement() -> Self {
        Self::from_fn(2, |dx, dy| {
            let corner = dx.abs() == 2 && dy.abs() == 2;
            if corner || (dx == 0 && dy == 0) {
                0.0
            } else {
                1.0
            }
        })
    }

    /// Manhattan ball of the given radius, centre included.
    pub fn diamond(radius: i32) -> Self {
        Self::from_fn(radius, |dx, dy| {
            if dx.abs() + dy.abs() <= radius {
                1.0
            } else {
                0.0
            }
        })
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn weight(&self, dx: i32, dy: i32) -> f64 {
        if dx.abs() > self.radius || dy.abs() > self.radius {
            return 0.0;
        }
        let side = 2 * self.radius + 1;
        self.weights[((dy + self.radius) * side + dx + self.radius) as usize]
    }
}

/// Zero-padded 2D convolution with output the size of the input.
pub fn convolve_same(mass: &Grid<f64>, kernel: &Kernel) -> Grid<f64> {
    let dims = mass.dims();
    let mut out = Grid::zeros(dims);
    let sources: Vec<(Pos, f64)> = mass
        .iter()
        .filter(|(_, value)| **value != 0.0)
        .map(|(pos, value)| (pos, *value))
        .collect();
    let r = kernel.radius();
    for (source, value) in sources {
        for dy in -r..=r {
            for dx in -r..=r {
                let weight = kernel.weight(dx, dy);
                if weight == 0.0 {
                    continue;
                }
                // out[p] = sum_k kernel[k] * mass[p - k]
                out.add(Pos::new(source.x + dx, source.y + dy), weight * value);
            }
        }
    }
    out
}

/// Named scalar fields for one turn; never mutated after construction.
#[derive(Debug, Clone)]
pub struct InfluenceFields {
    pub wood_adjacency: Grid<f64>,
    pub coal_adjacency: Grid<f64>,
    pub uranium_adjacency: Grid<f64>,
    pub special_adjacency: Grid<f64>,
    pub city_adjacency: Grid<f64>,
    pub settle_value: Grid<f64>,
    pub resource_density: Grid<f64>,
    pub wood_spread: Grid<f64>,
}

/// Mass layers collected in one pass over the snapshot
struct MassLayers {
    wood: Grid<f64>,
    coal: Grid<f64>,
    uranium: Grid<f64>,
    city: Grid<f64>,
    settle_city: Grid<f64>,
    settle_resource: Grid<f64>,
    density: Grid<f64>,
    spread: Grid<f64>,
}

impl MassLayers {
    fn collect(snapshot: &TurnSnapshot, research: Research, config: &FieldConfig) -> Self {
        let dims = snapshot.dims;
        let mut layers = Self {
            wood: Grid::zeros(dims),
            coal: Grid::zeros(dims),
            uranium: Grid::zeros(dims),
            city: Grid::zeros(dims),
            settle_city: Grid::zeros(dims),
            settle_resource: Grid::zeros(dims),
            density: Grid::zeros(dims),
            spread: Grid::zeros(dims),
        };

        for tile in snapshot.player.city_tiles() {
            layers.city.set(tile.pos, config.city_adjacency);
            layers.settle_city.set(tile.pos, config.settle_city);
            layers.spread.add(tile.pos, config.spread_own_city);
        }
        for tile in snapshot.opponent.city_tiles() {
            layers.spread.add(tile.pos, config.spread_enemy_city);
        }
        for unit in &snapshot.opponent.units {
            layers.spread.add(unit.pos, config.spread_enemy_unit);
        }

        for (pos, deposit) in snapshot.deposits.iter() {
            let Some(deposit) = deposit else { continue };
            if !research.unlocked(deposit.kind) {
                continue;
            }
            let (adjacency, adjacency_mass, settle_mass) = match deposit.kind {
                ResourceKind::Wood => (&mut layers.wood, config.wood_adjacency, config.settle_wood),
                ResourceKind::Coal => (&mut layers.coal, config.coal_adjacency, config.settle_coal),
                ResourceKind::Uranium => (
                    &mut layers.uranium,
                    config.uranium_adjacency,
                    config.settle_uranium,
                ),
            };
            adjacency.set(pos, adjacency_mass);
            layers.settle_resource.set(pos, settle_mass);
            layers
                .density
                .set(pos, deposit.amount as f64 * deposit.kind.fuel_rate());
            if deposit.kind == ResourceKind::Wood {
                layers.spread.add(pos, config.spread_wood);
            }
        }
        layers
    }
}

impl InfluenceFields {
    pub fn build(snapshot: &TurnSnapshot, research: Research, config: &FieldConfig) -> Self {
        let layers = MassLayers::collect(snapshot, research, config);
        let ring = Kernel::ring();
        let cross = Kernel::cross();
        let large = Kernel::diamond(5);

        let mut wood_adjacency = convolve_same(&layers.wood, &cross);
        open_ground_bonus(&mut wood_adjacency, snapshot, config.wood_open_bonus);
        let coal_adjacency = convolve_same(&layers.coal, &cross);
        let uranium_adjacency = convolve_same(&layers.uranium, &cross);
        let special_adjacency = uranium_adjacency.plus(&coal_adjacency);
        let settle_value = convolve_same(&layers.settle_city, &ring)
            .plus(&convolve_same(&layers.settle_resource, &Kernel::settlement()));

        Self {
            wood_adjacency,
            coal_adjacency,
            uranium_adjacency,
            special_adjacency,
            city_adjacency: convolve_same(&layers.city, &ring),
            settle_value,
            resource_density: convolve_same(&layers.density, &large),
            wood_spread: convolve_same(&layers.spread, &large),
        }
    }
}

/// Cells next to wood but free of resources are easier to work from.
fn open_ground_bonus(field: &mut Grid<f64>, snapshot: &TurnSnapshot, bonus: f64) {
    for pos in snapshot.dims.positions() {
        if snapshot.deposit(pos).is_some() {
            continue;
        }
        if let Some(value) = field.get_mut(pos) {
            if *value != 0.0 {
                *value += bonus;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Dims;
    use crate::world::{City, CityTile, Deposit};

    fn snapshot_with(deposits: &[(i32, i32, ResourceKind, u32)]) -> TurnSnapshot {
        let mut snapshot = TurnSnapshot::new(30, Dims::new(12, 12));
        for &(x, y, kind, amount) in deposits {
            if let Some(cell) = snapshot.deposits.get_mut(Pos::new(x, y)) {
                *cell = Some(Deposit { kind, amount });
            }
        }
        snapshot
    }

    fn all_research() -> Research {
        Research {
            points: 200,
            coal: true,
            uranium: true,
        }
    }

    #[test]
    fn kernels_have_expected_support() {
        let count = |k: &Kernel| {
            let r = k.radius();
            (-r..=r)
                .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| k.weight(dx, dy) != 0.0)
                .count()
        };
        assert_eq!(count(&Kernel::ring()), 4);
        assert_eq!(count(&Kernel::cross()), 5);
        assert_eq!(count(&Kernel::settlement()), 20);
        assert_eq!(count(&Kernel::diamond(5)), 61);
    }

    #[test]
    fn convolution_clips_at_borders() {
        let dims = Dims::new(3, 3);
        let mut mass = Grid::zeros(dims);
        mass.set(Pos::new(0, 0), 1.0);
        let out = convolve_same(&mass, &Kernel::cross());
        assert_eq!(out.at(Pos::new(0, 0)), 1.0);
        assert_eq!(out.at(Pos::new(1, 0)), 1.0);
        assert_eq!(out.at(Pos::new(0, 1)), 1.0);
        assert_eq!(out.at(Pos::new(1, 1)), 0.0);
        assert_eq!(out.values().iter().sum::<f64>(), 3.0);
    }

    #[test]
    fn fields_are_zero_outside_kernel_footprint() {
        let snapshot = snapshot_with(&[(2, 2, ResourceKind::Wood, 400)]);
        let fields = InfluenceFields::build(&snapshot, all_research(), &FieldConfig::default());
        for pos in snapshot.dims.positions() {
            let manhattan = pos.distance_to(Pos::new(2, 2));
            if manhattan > 1 {
                assert_eq!(fields.wood_adjacency.at(pos), 0.0, "wood at {pos}");
            }
            if manhattan > 5 {
                assert_eq!(fields.resource_density.at(pos), 0.0, "density at {pos}");
                assert_eq!(fields.wood_spread.at(pos), 0.0, "spread at {pos}");
            }
            if manhattan > 4 {
                assert_eq!(fields.settle_value.at(pos), 0.0, "settle at {pos}");
            }
        }
        assert_eq!(fields.coal_adjacency.values().iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn open_ground_next_to_wood_gets_bonus() {
        let snapshot = snapshot_with(&[(2, 2, ResourceKind::Wood, 400)]);
        let fields = InfluenceFields::build(&snapshot, all_research(), &FieldConfig::default());
        assert_eq!(fields.wood_adjacency.at(Pos::new(2, 2)), 2.0);
        assert_eq!(fields.wood_adjacency.at(Pos::new(3, 2)), 5.0);
        assert_eq!(fields.resource_density.at(Pos::new(7, 2)), 400.0);
    }

    #[test]
    fn unresearched_deposits_are_invisible() {
        let snapshot = snapshot_with(&[
            (2, 2, ResourceKind::Coal, 300),
            (8, 8, ResourceKind::Uranium, 300),
        ]);
        let fields = InfluenceFields::build(&snapshot, Research::default(), &FieldConfig::default());
        assert!(fields.coal_adjacency.values().iter().all(|v| *v == 0.0));
        assert!(fields.uranium_adjacency.values().iter().all(|v| *v == 0.0));
        assert!(fields.resource_density.values().iter().all(|v| *v == 0.0));

        let fields = InfluenceFields::build(&snapshot, all_research(), &FieldConfig::default());
        assert_eq!(fields.coal_adjacency.at(Pos::new(2, 3)), 12.0);
        assert_eq!(fields.special_adjacency.at(Pos::new(8, 7)), 12.0);
        assert_eq!(fields.resource_density.at(Pos::new(2, 2)), 3000.0);
    }

    #[test]
    fn own_cities_raise_settle_value_and_push_spread_down() {
        let mut snapshot = snapshot_with(&[]);
        snapshot.player.cities.push(City {
            id: "c1".into(),
            fuel: 100.0,
            light_upkeep: 20.0,
            tiles: vec![CityTile {
                city_id: "c1".into(),
                pos: Pos::new(5, 5),
                cooldown: 0.0,
            }],
        });
        let fields = InfluenceFields::build(&snapshot, all_research(), &FieldConfig::default());
        assert_eq!(fields.city_adjacency.at(Pos::new(5, 6)), 1.0);
        assert_eq!(fields.city_adjacency.at(Pos::new(5, 5)), 0.0);
        assert_eq!(fields.settle_value.at(Pos::new(4, 5)), 4.0);
        assert_eq!(fields.wood_spread.at(Pos::new(5, 9)), -40.0);
    }
}

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::ClusterConfig;
use crate::fields::{convolve_same, Kernel};
use crate::spatial::{Grid, Pos};
use crate::world::{ResourceKind, TurnSnapshot};

/// A group of 4-connected wood cells away from our cities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCluster {
    pub id: String,
    pub cells: Vec<Pos>,
    pub amount: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceClusters {
    clusters: Vec<ResourceCluster>,
}

impl ResourceClusters {
    /// Labels untouched wood patches in row-major order of their first cell.
    pub fn detect(snapshot: &TurnSnapshot, config: &ClusterConfig) -> Self {
        let dims = snapshot.dims;
        let mut cities = Grid::zeros(dims);
        for tile in snapshot.player.city_tiles() {
            cities.set(tile.pos, config.city_exclusion);
        }
        let city_reach = convolve_same(&cities, &Kernel::diamond(5));

        let mut open_wood = Grid::filled(dims, false);
        for (pos, deposit) in snapshot.deposits.iter() {
            let is_wood = matches!(deposit, Some(d) if d.kind == ResourceKind::Wood);
            if is_wood && city_reach.at(pos) < config.city_exclusion {
                if let Some(cell) = open_wood.get_mut(pos) {
                    *cell = true;
                }
            }
        }

        let mut seen = Grid::filled(dims, false);
        let mut clusters = Vec::new();
        for start in dims.positions() {
            if !open_wood.get(start).copied().unwrap_or(false)
                || seen.get(start).copied().unwrap_or(true)
            {
                continue;
            }
            let mut cells = Vec::new();
            let mut queue = VecDeque::from([start]);
            if let Some(flag) = seen.get_mut(start) {
                *flag = true;
            }
            while let Some(pos) = queue.pop_front() {
                cells.push(pos);
                for next in dims.neighbors(pos) {
                    let open = open_wood.get(next).copied().unwrap_or(false);
                    if let Some(flag) = seen.get_mut(next) {
                        if open && !*flag {
                            *flag = true;
                            queue.push_back(next);
                        }
                    }
                }
            }
            cells.sort();
            let amount = cells
                .iter()
                .filter_map(|&pos| snapshot.deposit(pos))
                .map(|deposit| deposit.amount)
                .sum();
            clusters.push(ResourceCluster {
                id: format!("cluster-{}", clusters.len()),
                cells,
                amount,
            });
        }
        Self { clusters }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceCluster> + '_ {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Dims;
    use crate::world::{City, CityTile, Deposit};

    fn wood_snapshot(cells: &[(i32, i32)]) -> TurnSnapshot {
        let mut snapshot = TurnSnapshot::new(10, Dims::new(16, 16));
        for &(x, y) in cells {
            if let Some(cell) = snapshot.deposits.get_mut(Pos::new(x, y)) {
                *cell = Some(Deposit {
                    kind: ResourceKind::Wood,
                    amount: 100,
                });
            }
        }
        snapshot
    }

    #[test]
    fn connected_wood_forms_one_cluster() {
        let snapshot = wood_snapshot(&[(1, 1), (2, 1), (2, 2), (10, 10), (11, 10)]);
        let clusters = ResourceClusters::detect(&snapshot, &ClusterConfig::default());
        assert_eq!(clusters.len(), 2);
        let first = clusters.iter().next().unwrap();
        assert_eq!(first.id, "cluster-0");
        assert_eq!(first.cells, vec![Pos::new(1, 1), Pos::new(2, 1), Pos::new(2, 2)]);
        assert_eq!(first.amount, 300);
    }

    #[test]
    fn diagonal_cells_are_separate_clusters() {
        let snapshot = wood_snapshot(&[(1, 1), (2, 2)]);
        let clusters = ResourceClusters::detect(&snapshot, &ClusterConfig::default());
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn wood_near_own_city_is_excluded() {
        let mut snapshot = wood_snapshot(&[(1, 1), (12, 12)]);
        snapshot.player.cities.push(City {
            id: "c1".into(),
            fuel: 0.0,
            light_upkeep: 10.0,
            tiles: vec![CityTile {
                city_id: "c1".into(),
                pos: Pos::new(3, 2),
                cooldown: 0.0,
            }],
        });
        let clusters = ResourceClusters::detect(&snapshot, &ClusterConfig::default());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters.iter().next().unwrap().cells, vec![Pos::new(12, 12)]);
    }
}

//! Per-turn assignment of workers to fuel deliveries and resource clusters.

pub mod cluster;
pub mod fuel;
pub mod solver;
pub mod supply;

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;

use crate::clusters::ResourceClusters;
use crate::config::Tuning;
use crate::nav::NavGraph;
use crate::world::{DayClock, TurnSnapshot};

pub use cluster::{ClusterOrder, ClusterPlan};
pub use fuel::{FuelOrder, FuelPlan};
pub use solver::{Assignment, AssignmentModel, SolveStatus};
pub use supply::{DemandNode, SupplyNode};

/// Both advisory plans for one turn
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOrders {
    pub fuel: FuelPlan,
    pub clusters: ClusterPlan,
}

impl DispatchOrders {
    pub fn none() -> Self {
        Self {
            fuel: FuelPlan::skipped(0, 0),
            clusters: ClusterPlan::skipped(0),
        }
    }

    pub fn fuel_order(&self, unit_id: &str) -> Option<&FuelOrder> {
        self.fuel.orders.iter().find(|order| order.unit_id == unit_id)
    }

    pub fn cluster_order(&self, unit_id: &str) -> Option<&ClusterOrder> {
        self.clusters
            .orders
            .iter()
            .find(|order| order.unit_id == unit_id)
    }
}

pub struct Dispatcher<'a> {
    tuning: &'a Tuning,
}

impl<'a> Dispatcher<'a> {
    pub fn new(tuning: &'a Tuning) -> Self {
        Self { tuning }
    }

    pub fn plan(
        &self,
        snapshot: &TurnSnapshot,
        clock: &DayClock,
        graph: &NavGraph,
        clusters: &ResourceClusters,
    ) -> DispatchOrders {
        let started = Instant::now();
        let config = &self.tuning.fuel;
        let supplies = supply::supply_nodes(&snapshot.player, config);
        let demands = supply::demand_nodes(&snapshot.player, config);
        let fuel = if snapshot.turn < config.min_turn || demands.is_empty() {
            FuelPlan::skipped(supplies.len(), demands.len())
        } else {
            let distances = fuel::distance_matrix(
                graph,
                &supplies,
                &demands,
                clock,
                &self.tuning.graph.weights,
                config,
            );
            fuel::find_optimal_fuel_distribution(snapshot.turn, &supplies, &demands, &distances, config)
        };

        let haulers: HashSet<&str> = supplies.iter().map(|s| s.unit_id.as_str()).collect();
        let pool = cluster::candidates(
            &snapshot.player,
            &haulers,
            clusters,
            graph,
            self.tuning.routing.max_path_length,
        );
        let clusters = cluster::find_cluster_assignment(&pool, clusters, &self.tuning.clusters);

        tracing::info!(
            turn = snapshot.turn,
            supplies = supplies.len(),
            demands = demands.len(),
            fuel_orders = fuel.orders.len(),
            fuel_status = ?fuel.status,
            cluster_orders = clusters.orders.len(),
            cluster_status = ?clusters.status,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "dispatch planned"
        );
        DispatchOrders { fuel, clusters }
    }
}

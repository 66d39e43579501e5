use std::time::Duration;

use serde::Serialize;

use super::solver::{Assignment, AssignmentModel, SolveStatus};
use super::supply::{DemandNode, SupplyNode};
use crate::config::{FuelConfig, WeightTable};
use crate::nav::{Channel, NavGraph};
use crate::spatial::Pos;
use crate::world::DayClock;

/// Advisory order: carry fuel from a unit to a city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelOrder {
    pub unit_id: String,
    pub from: Pos,
    pub city_id: String,
    pub quantity: u32,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FuelPlan {
    pub orders: Vec<FuelOrder>,
    pub status: SolveStatus,
    pub objective: f64,
    pub supplies: usize,
    pub demands: usize,
}

impl FuelPlan {
    pub fn skipped(supplies: usize, demands: usize) -> Self {
        Self {
            orders: Vec::new(),
            status: SolveStatus::Skipped,
            objective: 0.0,
            supplies,
            demands,
        }
    }
}

/// Turn-adjusted travel cost from each supply to each demand city, `None`
/// when the city cannot be reached before it runs dry.
pub fn distance_matrix(
    graph: &NavGraph,
    supplies: &[SupplyNode],
    demands: &[DemandNode],
    clock: &DayClock,
    weights: &WeightTable,
    config: &FuelConfig,
) -> Vec<Vec<Option<f64>>> {
    let safe = clock.turns_until_night as f64;
    let entry = weights.own_city().avoidant;
    supplies
        .iter()
        .map(|supply| {
            let Some(paths) = graph.shortest_paths(supply.pos, Channel::Avoidant) else {
                return vec![None; demands.len()];
            };
            demands
                .iter()
                .map(|demand| {
                    let travel = demand
                        .tiles
                        .iter()
                        .filter_map(|&tile| {
                            let raw = paths.distance(tile)?;
                            Some(if tile == supply.pos { 0.0 } else { (raw - entry).max(0.0) })
                        })
                        .min_by(f64::total_cmp)?;
                    let turns = if travel <= safe {
                        travel
                    } else if 2.0 * (travel - safe) > demand.survival_turns {
                        return None;
                    } else {
                        safe + 2.0 * (travel - safe)
                    };
                    Some((turns * supply.discount).max(config.distance_floor))
                })
                .collect()
        })
        .collect()
}

/// Routes carried fuel to starving cities.
///
/// Maximises `sum(quantity * value) / divisor - k * sum(distance * used)`
/// with each worker serving at most one city, never shipping more than it
/// carries and no city receiving more than it needs. Returns no orders,
/// without solving, before `min_turn` or when no city needs fuel.
pub fn find_optimal_fuel_distribution(
    turn: u32,
    supplies: &[SupplyNode],
    demands: &[DemandNode],
    distances: &[Vec<Option<f64>>],
    config: &FuelConfig,
) -> FuelPlan {
    if turn < config.min_turn || demands.is_empty() || supplies.is_empty() {
        return FuelPlan::skipped(supplies.len(), demands.len());
    }

    let mut model = AssignmentModel::new(
        supplies.iter().map(|s| s.supply.floor()).collect(),
        demands.iter().map(|d| d.value / config.value_divisor).collect(),
        demands.iter().map(|d| d.demand.floor()).collect(),
    );
    for (col, demand) in demands.iter().enumerate() {
        model.limit_rows(col, demand.demand.floor() as usize);
    }
    for (row, line) in distances.iter().enumerate() {
        for (col, distance) in line.iter().enumerate() {
            if let Some(distance) = distance {
                model.set_cost(row, col, config.distance_weight * distance);
            }
        }
    }

    let assignment = model.solve(Duration::from_millis(config.deadline_ms));
    log_outcome(turn, &assignment);
    let quantities = allocate(&model, &assignment.pairs);
    let orders = assignment
        .pairs
        .iter()
        .zip(quantities)
        .map(|(&(row, col), quantity)| FuelOrder {
            unit_id: supplies[row].unit_id.clone(),
            from: supplies[row].pos,
            city_id: demands[col].city_id.clone(),
            quantity,
            distance: distances[row][col].unwrap_or_default(),
        })
        .collect();

    FuelPlan {
        orders,
        status: assignment.status,
        objective: assignment.objective,
        supplies: supplies.len(),
        demands: demands.len(),
    }
}

fn log_outcome(turn: u32, assignment: &Assignment) {
    let elapsed_ms = assignment.elapsed.as_secs_f64() * 1000.0;
    if assignment.status == SolveStatus::Incumbent {
        tracing::warn!(turn, nodes = assignment.nodes, elapsed_ms, "fuel search hit its deadline");
    } else {
        tracing::debug!(
            turn,
            nodes = assignment.nodes,
            elapsed_ms,
            objective = assignment.objective,
            "fuel search finished"
        );
    }
}

/// Integer quantities for the chosen pairs: every used pair ships at least
/// one unit, the rest of each city's demand is filled in pair order.
fn allocate(model: &AssignmentModel, pairs: &[(usize, usize)]) -> Vec<u32> {
    let mut remaining: Vec<f64> = (0..model.cols()).map(|col| model.capacity(col)).collect();
    let mut quantities: Vec<f64> = pairs
        .iter()
        .map(|&(_, col)| {
            remaining[col] -= 1.0;
            1.0
        })
        .collect();
    for (quantity, &(row, col)) in quantities.iter_mut().zip(pairs) {
        let extra = (model.row_weight(row) - 1.0).min(remaining[col]).max(0.0);
        *quantity += extra;
        remaining[col] -= extra;
    }
    quantities.into_iter().map(|q| q as u32).collect()
}

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;

use super::solver::{AssignmentModel, SolveStatus};
use crate::clusters::ResourceClusters;
use crate::config::ClusterConfig;
use crate::nav::{Channel, NavGraph};
use crate::spatial::Pos;
use crate::world::Player;

/// Advisory order: send a worker to an untouched resource cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterOrder {
    pub unit_id: String,
    pub from: Pos,
    pub cluster_id: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterPlan {
    pub orders: Vec<ClusterOrder>,
    pub status: SolveStatus,
    pub objective: f64,
    pub eligible: usize,
}

impl ClusterPlan {
    pub fn skipped(eligible: usize) -> Self {
        Self {
            orders: Vec::new(),
            status: SolveStatus::Skipped,
            objective: 0.0,
            eligible,
        }
    }
}

/// A worker free to take a cluster order and its distance to each cluster.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub unit_id: String,
    pub pos: Pos,
    pub distances: Vec<Option<f64>>,
}

/// Workers that can act, are not hauling fuel, and reach some cluster in
/// under `max_path_length`.
pub fn candidates(
    player: &Player,
    haulers: &HashSet<&str>,
    clusters: &ResourceClusters,
    graph: &NavGraph,
    max_path_length: f64,
) -> Vec<Candidate> {
    player
        .units
        .iter()
        .filter(|unit| unit.is_worker() && unit.can_act())
        .filter(|unit| !haulers.contains(unit.id.as_str()))
        .filter_map(|unit| {
            let paths = graph.shortest_paths(unit.pos, Channel::General)?;
            let distances: Vec<Option<f64>> = clusters
                .iter()
                .map(|cluster| {
                    cluster
                        .cells
                        .iter()
                        .filter_map(|&cell| paths.distance(cell))
                        .filter(|&d| d < max_path_length)
                        .min_by(f64::total_cmp)
                })
                .collect();
            distances.iter().any(Option::is_some).then(|| Candidate {
                unit_id: unit.id.clone(),
                pos: unit.pos,
                distances,
            })
        })
        .collect()
}

/// Pairs workers with clusters, one each, trading a fixed bonus per covered
/// cluster against travel distance. At most `max_share` of the candidates
/// are assigned.
pub fn find_cluster_assignment(
    candidates: &[Candidate],
    clusters: &ResourceClusters,
    config: &ClusterConfig,
) -> ClusterPlan {
    if clusters.is_empty() || candidates.is_empty() {
        return ClusterPlan::skipped(candidates.len());
    }
    let ids: Vec<&str> = clusters.iter().map(|cluster| cluster.id.as_str()).collect();
    let mut model = AssignmentModel::new(
        vec![1.0; candidates.len()],
        vec![config.bonus; ids.len()],
        vec![1.0; ids.len()],
    );
    for col in 0..ids.len() {
        model.limit_rows(col, 1);
    }
    for (row, candidate) in candidates.iter().enumerate() {
        for (col, distance) in candidate.distances.iter().enumerate() {
            if let Some(distance) = distance {
                model.set_cost(row, col, *distance);
            }
        }
    }
    model.limit_assigned((config.max_share * candidates.len() as f64).floor() as usize);

    let assignment = model.solve(Duration::from_millis(config.deadline_ms));
    tracing::debug!(
        candidates = candidates.len(),
        clusters = ids.len(),
        nodes = assignment.nodes,
        status = ?assignment.status,
        "cluster search finished"
    );
    let orders = assignment
        .pairs
        .iter()
        .map(|&(row, col)| ClusterOrder {
            unit_id: candidates[row].unit_id.clone(),
            from: candidates[row].pos,
            cluster_id: ids[col].to_string(),
            distance: candidates[row].distances[col].unwrap_or_default(),
        })
        .collect();
    ClusterPlan {
        orders,
        status: assignment.status,
        objective: assignment.objective,
        eligible: candidates.len(),
    }
}

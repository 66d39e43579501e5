//! Shortest-path and nearest-category queries over a [`NavGraph`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::Rng;
use serde::Serialize;

use super::{Category, Channel, NavGraph};
use crate::spatial::{Dims, Grid, Pos};

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    cost: f64,
    idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // min-heap on cost, lower index first on ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Single-source shortest path tree
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    dims: Dims,
    source: usize,
    dist: Vec<f64>,
    prev: Vec<Option<usize>>,
}

impl ShortestPaths {
    /// Cost of the cheapest path to `target`, `None` when unreachable
    pub fn distance(&self, target: Pos) -> Option<f64> {
        let index = self.dims.index(target)?;
        let dist = self.dist[index];
        dist.is_finite().then_some(dist)
    }

    /// First cell after the source on the cheapest path to `target`.
    /// The source itself when `target` is the source.
    pub fn first_step(&self, target: Pos) -> Option<Pos> {
        let mut current = self.dims.index(target)?;
        if !self.dist[current].is_finite() {
            return None;
        }
        while let Some(parent) = self.prev[current] {
            if parent == self.source {
                break;
            }
            current = parent;
        }
        self.dims.pos(current)
    }

    /// Full path from the source to `target`, both ends included
    pub fn path(&self, target: Pos) -> Option<Vec<Pos>> {
        let mut current = self.dims.index(target)?;
        if !self.dist[current].is_finite() {
            return None;
        }
        let mut path = vec![current];
        while let Some(parent) = self.prev[current] {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path.into_iter().map(|index| self.dims.pos(index)).collect()
    }
}

/// Safety budget of the unit issuing a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActorBudget {
    /// Turns before the unit can move again
    pub recovery_delay: f64,
    /// Turns left before the unsafe period
    pub safe_turns: f64,
    /// Cargo large enough to justify finishing after the window closes
    pub near_capacity: bool,
}

#[derive(Debug, Clone)]
pub struct NearestQuery<'a> {
    pub category: &'a Category,
    pub source: Pos,
    pub channel: Channel,
    pub adjustment: Option<&'a Grid<f64>>,
    pub multiplier: f64,
    pub budget: Option<ActorBudget>,
}

impl<'a> NearestQuery<'a> {
    pub fn new(category: &'a Category, source: Pos, channel: Channel) -> Self {
        Self {
            category,
            source,
            channel,
            adjustment: None,
            multiplier: 1.0,
            budget: None,
        }
    }

    pub fn adjusted_by(mut self, field: &'a Grid<f64>) -> Self {
        self.adjustment = Some(field);
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn within(mut self, budget: ActorBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Adjusted cost of a candidate at raw distance `distance`; `None` when
    /// it cannot be reached inside the budget.
    fn cost(&self, target: Pos, distance: f64) -> Option<f64> {
        let bonus = self.adjustment.map_or(0.0, |field| field.at(target));
        let Some(budget) = self.budget else {
            return Some(distance * self.multiplier - bonus);
        };
        if distance + budget.recovery_delay < budget.safe_turns {
            Some(distance * self.multiplier - bonus + budget.recovery_delay)
        } else if budget.near_capacity && *self.category != Category::Settle {
            let overrun = distance - budget.safe_turns;
            Some((distance + overrun) * self.multiplier - bonus + budget.recovery_delay)
        } else {
            None
        }
    }
}

/// Result of a nearest-category query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearestHit {
    pub target: Pos,
    pub step: Pos,
    pub distance: f64,
    pub cost: f64,
}

impl NavGraph {
    /// Dijkstra over the chosen weight channel.
    pub fn shortest_paths(&self, source: Pos, channel: Channel) -> Option<ShortestPaths> {
        let source = self.index(source)?;
        let count = self.dims().cell_count();
        let mut dist = vec![f64::INFINITY; count];
        let mut prev = vec![None; count];
        let mut heap = BinaryHeap::new();
        dist[source] = 0.0;
        heap.push(HeapEntry {
            cost: 0.0,
            idx: source,
        });

        while let Some(HeapEntry { cost, idx }) = heap.pop() {
            if cost > dist[idx] {
                continue;
            }
            for edge in self.out_edges(idx) {
                let next = cost + edge.weights.on(channel);
                if next < dist[edge.to] {
                    dist[edge.to] = next;
                    prev[edge.to] = Some(idx);
                    heap.push(HeapEntry {
                        cost: next,
                        idx: edge.to,
                    });
                }
            }
        }

        Some(ShortestPaths {
            dims: self.dims(),
            source,
            dist,
            prev,
        })
    }

    /// First step toward `target` if it is reachable for less than
    /// `max_length`, otherwise a random in-bounds neighbour.
    pub fn step_toward<R: Rng + ?Sized>(
        &self,
        source: Pos,
        target: Pos,
        channel: Channel,
        max_length: f64,
        rng: &mut R,
    ) -> Pos {
        let step = self.shortest_paths(source, channel).and_then(|paths| {
            let length = paths.distance(target)?;
            if length < max_length {
                paths.first_step(target)
            } else {
                None
            }
        });
        match step {
            Some(step) => step,
            None => {
                tracing::debug!(%source, %target, ?channel, "no path under limit, stepping randomly");
                random_neighbor(self.dims(), source, rng)
            }
        }
    }

    /// Cheapest node tagged with the query's category, after budget
    /// adjustment. `None` when no tagged node is reachable in budget.
    pub fn nearest(&self, query: &NearestQuery<'_>) -> Option<NearestHit> {
        let paths = self.shortest_paths(query.source, query.channel)?;
        let mut best: Option<NearestHit> = None;
        for node in self.nodes().iter().filter(|node| node.has(query.category)) {
            let Some(distance) = paths.distance(node.pos) else {
                continue;
            };
            let Some(cost) = query.cost(node.pos, distance) else {
                continue;
            };
            if best.map_or(true, |hit| cost < hit.cost) {
                let Some(step) = paths.first_step(node.pos) else {
                    continue;
                };
                best = Some(NearestHit {
                    target: node.pos,
                    step,
                    distance,
                    cost,
                });
            }
        }
        best
    }
}

/// Uniform choice among the in-bounds 4-neighbours of `source`.
pub fn random_neighbor<R: Rng + ?Sized>(dims: Dims, source: Pos, rng: &mut R) -> Pos {
    let neighbors = dims.neighbors(source);
    if neighbors.is_empty() {
        return source;
    }
    neighbors[rng.gen_range(0..neighbors.len())]
}

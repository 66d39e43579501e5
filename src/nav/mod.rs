//! Per-turn navigation graph over grid cells.
//!
//! One node per cell, a directed edge to each in-bounds 4-neighbour. Every
//! edge carries a general and a collision-avoidant weight, both decided by the
//! destination cell only. After the build, weights change solely through
//! [`NavGraph::reserve`] and [`NavGraph::release`], each of which rewrites the
//! incoming edges of a single cell.

pub mod query;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::clusters::ResourceClusters;
use crate::config::{GraphConfig, WeightTable};
use crate::fields::InfluenceFields;
use crate::spatial::{Dims, Pos};
use crate::world::{Occupancy, Research, TurnSnapshot};

pub use query::{ActorBudget, NearestHit, NearestQuery, ShortestPaths};

/// Node label; a node carries any number of these.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    OpponentCity,
    FriendlyCity,
    City(String),
    Wood,
    Coal,
    Uranium,
    Resource,
    CoalResearched,
    UraniumResearched,
    Special,
    Cluster(String),
    Settle,
    Empty,
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::OpponentCity => f.write_str("opponent_city"),
            Category::FriendlyCity => f.write_str("friendly_city"),
            Category::City(id) => write!(f, "city:{id}"),
            Category::Wood => f.write_str("wood"),
            Category::Coal => f.write_str("coal"),
            Category::Uranium => f.write_str("uranium"),
            Category::Resource => f.write_str("resource"),
            Category::CoalResearched => f.write_str("coal_researched"),
            Category::UraniumResearched => f.write_str("uranium_researched"),
            Category::Special => f.write_str("special"),
            Category::Cluster(id) => f.write_str(id),
            Category::Settle => f.write_str("settle"),
            Category::Empty => f.write_str("empty"),
            Category::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    General,
    Avoidant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeWeights {
    pub general: f64,
    pub avoidant: f64,
}

impl EdgeWeights {
    pub fn uniform(weight: f64) -> Self {
        Self {
            general: weight,
            avoidant: weight,
        }
    }

    pub fn on(&self, channel: Channel) -> f64 {
        match channel {
            Channel::General => self.general,
            Channel::Avoidant => self.avoidant,
        }
    }
}

/// Weight rules by destination
impl WeightTable {
    pub fn blocked(&self) -> EdgeWeights {
        EdgeWeights::uniform(self.blocking)
    }

    pub fn own_city(&self) -> EdgeWeights {
        EdgeWeights {
            general: self.own_city,
            avoidant: self.blocking,
        }
    }

    /// Static weight for a destination, ignoring own units standing on it.
    pub fn terrain(&self, occupancy: &Occupancy) -> EdgeWeights {
        if occupancy.enemy_city {
            self.blocked()
        } else if occupancy.own_city.is_some() {
            self.own_city()
        } else if occupancy.enemy_unit {
            EdgeWeights::uniform(self.enemy_unit)
        } else {
            EdgeWeights::uniform(self.baseline)
        }
    }

    /// Build-time weight: units off city tiles block their cell.
    pub fn initial(&self, occupancy: &Occupancy) -> EdgeWeights {
        let on_open_ground = occupancy.own_city.is_none() && !occupancy.enemy_city;
        if occupancy.own_unit && on_open_ground {
            self.blocked()
        } else {
            self.terrain(occupancy)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavNode {
    pub pos: Pos,
    pub tags: BTreeSet<Category>,
    /// Weights restored on incoming edges when the cell is released.
    pub baseline: EdgeWeights,
}

impl NavNode {
    pub fn has(&self, category: &Category) -> bool {
        self.tags.contains(category)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NavEdge {
    pub from: usize,
    pub to: usize,
    pub weights: EdgeWeights,
}

#[derive(Debug, Clone)]
pub struct NavGraph {
    dims: Dims,
    nodes: Vec<NavNode>,
    edges: Vec<NavEdge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    table: WeightTable,
}

impl NavGraph {
    /// Grid-shaped graph with the same weight everywhere and no tags.
    pub fn uniform(dims: Dims, weight: f64) -> Self {
        let table = WeightTable {
            baseline: weight,
            ..WeightTable::default()
        };
        let nodes = dims
            .positions()
            .map(|pos| NavNode {
                pos,
                tags: BTreeSet::new(),
                baseline: EdgeWeights::uniform(weight),
            })
            .collect();
        Self::connect(dims, nodes, table)
    }

    fn connect(dims: Dims, nodes: Vec<NavNode>, table: WeightTable) -> Self {
        let count = dims.cell_count();
        let mut graph = Self {
            dims,
            nodes,
            edges: Vec::with_capacity(count * 4),
            outgoing: vec![Vec::new(); count],
            incoming: vec![Vec::new(); count],
            table,
        };
        for from in 0..count {
            let Some(pos) = dims.pos(from) else { continue };
            for neighbor in dims.neighbors(pos) {
                let Some(to) = dims.index(neighbor) else { continue };
                let edge = graph.edges.len();
                graph.edges.push(NavEdge {
                    from,
                    to,
                    weights: graph.nodes[to].baseline,
                });
                graph.outgoing[from].push(edge);
                graph.incoming[to].push(edge);
            }
        }
        graph
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn node(&self, pos: Pos) -> Option<&NavNode> {
        self.dims.index(pos).map(|index| &self.nodes[index])
    }

    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    pub fn tag(&mut self, pos: Pos, category: Category) {
        if let Some(index) = self.dims.index(pos) {
            self.nodes[index].tags.insert(category);
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Weights of the edge `from -> to`, if the two cells are adjacent
    pub fn edge_weights(&self, from: Pos, to: Pos) -> Option<EdgeWeights> {
        let from = self.dims.index(from)?;
        let to = self.dims.index(to)?;
        self.outgoing[from]
            .iter()
            .map(|&edge| &self.edges[edge])
            .find(|edge| edge.to == to)
            .map(|edge| edge.weights)
    }

    /// Weights of every edge entering `pos`
    pub fn incoming_weights(&self, pos: Pos) -> Vec<EdgeWeights> {
        self.dims
            .index(pos)
            .map(|to| {
                self.incoming[to]
                    .iter()
                    .map(|&edge| self.edges[edge].weights)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Marks `pos` as about to be occupied: every incoming edge blocks.
    pub fn reserve(&mut self, pos: Pos) {
        let blocked = self.table.blocked();
        self.set_incoming(pos, blocked);
    }

    /// Frees `pos` again, restoring its static weights. A vacated own city
    /// tile stays expensive on the avoidant channel.
    pub fn release(&mut self, pos: Pos, was_city_origin: bool) {
        let Some(index) = self.dims.index(pos) else {
            return;
        };
        let weights = if was_city_origin {
            self.table.own_city()
        } else {
            self.nodes[index].baseline
        };
        self.set_incoming(pos, weights);
    }

    fn set_incoming(&mut self, pos: Pos, weights: EdgeWeights) {
        let Some(to) = self.dims.index(pos) else {
            return;
        };
        for &edge in &self.incoming[to] {
            self.edges[edge].weights = weights;
        }
    }

    pub(crate) fn index(&self, pos: Pos) -> Option<usize> {
        self.dims.index(pos)
    }

    pub(crate) fn out_edges(&self, node: usize) -> impl Iterator<Item = &NavEdge> + '_ {
        self.outgoing[node].iter().map(move |&edge| &self.edges[edge])
    }
}

/// Turns a snapshot plus its fields into a tagged, weighted [`NavGraph`].
pub struct GraphBuilder<'a> {
    config: &'a GraphConfig,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a GraphConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        snapshot: &TurnSnapshot,
        fields: &InfluenceFields,
        research: Research,
        clusters: &ResourceClusters,
    ) -> NavGraph {
        let table = self.config.weights;
        let occupancy = snapshot.occupancy();
        let nodes = snapshot
            .dims
            .positions()
            .map(|pos| {
                let cell = occupancy.get(pos).cloned().unwrap_or_default();
                NavNode {
                    pos,
                    tags: self.categorize(pos, &cell, snapshot, fields, research),
                    baseline: table.terrain(&cell),
                }
            })
            .collect();

        let mut graph = NavGraph::connect(snapshot.dims, nodes, table);
        for (pos, cell) in occupancy.iter() {
            let initial = table.initial(cell);
            if initial != table.terrain(cell) {
                graph.set_incoming(pos, initial);
            }
        }
        for cluster in clusters.iter() {
            for &pos in &cluster.cells {
                graph.tag(pos, Category::Cluster(cluster.id.clone()));
            }
        }
        graph
    }

    fn categorize(
        &self,
        pos: Pos,
        cell: &Occupancy,
        snapshot: &TurnSnapshot,
        fields: &InfluenceFields,
        research: Research,
    ) -> BTreeSet<Category> {
        let mut tags = BTreeSet::new();
        if cell.enemy_city {
            tags.insert(Category::OpponentCity);
            return tags;
        }
        if let Some(city_id) = &cell.own_city {
            tags.insert(Category::FriendlyCity);
            tags.insert(Category::City(city_id.clone()));
            return tags;
        }

        if fields.wood_adjacency.at(pos) > 0.0 {
            tags.extend([
                Category::Wood,
                Category::Resource,
                Category::CoalResearched,
                Category::UraniumResearched,
            ]);
        }
        if research.coal && fields.coal_adjacency.at(pos) > 0.0 {
            tags.extend([
                Category::Coal,
                Category::Resource,
                Category::CoalResearched,
                Category::UraniumResearched,
                Category::Special,
            ]);
        }
        if research.uranium && fields.uranium_adjacency.at(pos) > 0.0 {
            tags.extend([
                Category::Uranium,
                Category::Resource,
                Category::UraniumResearched,
                Category::Special,
            ]);
        }

        if snapshot.deposit(pos).is_none() {
            let dense = fields.resource_density.at(pos) > self.config.settle_density;
            let near_city = fields.city_adjacency.at(pos) >= self.config.settle_city_adjacency;
            tags.insert(if dense || near_city {
                Category::Settle
            } else {
                Category::Empty
            });
        }

        if tags.is_empty() {
            tags.insert(Category::Unknown);
        }
        tags
    }
}

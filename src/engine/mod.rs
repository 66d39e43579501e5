use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    actions::Action,
    clusters::ResourceClusters,
    config::{Tuning, TuningError},
    diagnostics::DiagnosticsWriter,
    dispatch::{DispatchOrders, Dispatcher},
    fields::InfluenceFields,
    nav::{GraphBuilder, NavGraph},
    rng::{RngManager, SystemRng},
    world::{DayClock, Research, TurnSnapshot},
};

pub struct EngineSettings {
    pub label: String,
    pub seed: u64,
    pub diagnostics_interval: u32,
    pub diagnostics_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    tuning: Tuning,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            tuning: Tuning::default(),
            systems: Vec::new(),
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Fails when the tuning would make the turn pipeline misbehave.
    pub fn build(self) -> Result<Engine, TuningError> {
        self.tuning.validate()?;
        Ok(Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            diagnostics: DiagnosticsWriter::new(
                &self.settings.diagnostics_dir,
                self.settings.diagnostics_interval,
            ),
            tuning: self.tuning,
            settings: self.settings,
        })
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    diagnostics: DiagnosticsWriter,
    tuning: Tuning,
    settings: EngineSettings,
}

impl Engine {
    /// Builds the turn's spatial model and plans, then lets every system
    /// issue actions against the shared graph in registration order.
    pub fn run_turn(&mut self, snapshot: &TurnSnapshot) -> Result<TurnReport> {
        self.rng.begin_turn(snapshot.turn);
        let mut timings = Vec::new();
        let tuning = &self.tuning;

        let research = snapshot.player.research(&tuning.research);
        let clock = DayClock::new(snapshot.turn, &tuning.cycle);
        let fields = timed(&mut timings, "fields", || {
            InfluenceFields::build(snapshot, research, &tuning.fields)
        });
        let clusters = timed(&mut timings, "clusters", || {
            ResourceClusters::detect(snapshot, &tuning.clusters)
        });
        let graph = timed(&mut timings, "graph", || {
            GraphBuilder::new(&tuning.graph).build(snapshot, &fields, research, &clusters)
        });
        let orders = timed(&mut timings, "dispatch", || {
            Dispatcher::new(tuning).plan(snapshot, &clock, &graph, &clusters)
        });

        let ctx = TurnContext {
            label: &self.settings.label,
            snapshot,
            tuning,
            clock,
            research,
            fields: &fields,
            clusters: &clusters,
            orders: &orders,
        };
        let mut plan = TurnPlan {
            graph,
            actions: Vec::new(),
        };
        for system in &mut self.systems {
            let started = Instant::now();
            let mut rng_stream = self.rng.stream(system.name());
            system
                .run(&ctx, &mut plan, &mut rng_stream)
                .with_context(|| format!("system '{}' failed on turn {}", system.name(), snapshot.turn))?;
            timings.push(StageTiming::since(system.name(), started));
        }

        let report = TurnReport {
            label: self.settings.label.clone(),
            turn: snapshot.turn,
            turns_until_night: clock.turns_until_night,
            research_points: research.points,
            actions: plan.actions,
            orders,
            timings,
        };
        tracing::info!(
            turn = report.turn,
            actions = report.actions.len(),
            fuel_orders = report.orders.fuel.orders.len(),
            cluster_orders = report.orders.clusters.orders.len(),
            elapsed_ms = report.elapsed_ms(),
            "turn complete"
        );
        if let Err(e) = self.diagnostics.maybe_write(&report) {
            tracing::warn!(turn = report.turn, error = %e, "diagnostics write failed");
        }
        Ok(report)
    }
}

fn timed<T>(timings: &mut Vec<StageTiming>, name: &str, stage: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let out = stage();
    timings.push(StageTiming::since(name, started));
    out
}

/// Read-only view of the turn shared by every system
pub struct TurnContext<'a> {
    pub label: &'a str,
    pub snapshot: &'a TurnSnapshot,
    pub tuning: &'a Tuning,
    pub clock: DayClock,
    pub research: Research,
    pub fields: &'a InfluenceFields,
    pub clusters: &'a ResourceClusters,
    pub orders: &'a DispatchOrders,
}

/// Mutable state systems write into: the live graph and issued actions.
pub struct TurnPlan {
    pub graph: NavGraph,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub name: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    fn since(name: &str, started: Instant) -> Self {
        Self {
            name: name.to_string(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub label: String,
    pub turn: u32,
    pub turns_until_night: u32,
    pub research_points: u32,
    pub actions: Vec<Action>,
    pub orders: DispatchOrders,
    pub timings: Vec<StageTiming>,
}

impl TurnReport {
    pub fn elapsed_ms(&self) -> f64 {
        self.timings.iter().map(|t| t.elapsed_ms).sum()
    }

    /// Action tokens in game syntax
    pub fn tokens(&self) -> Vec<String> {
        self.actions.iter().map(ToString::to_string).collect()
    }
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &TurnContext<'_>,
        plan: &mut TurnPlan,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

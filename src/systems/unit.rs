use anyhow::Result;

use crate::{
    actions::Action,
    engine::{System, TurnContext, TurnPlan},
    nav::{query::random_neighbor, ActorBudget, Category, Channel, NearestHit, NearestQuery},
    rng::SystemRng,
    spatial::{Grid, Pos},
    world::{ResourceKind, Unit},
};

/// Walks every idle worker through the decision tree, committing each step
/// to the shared graph before the next worker plans.
pub struct UnitSystem;

impl UnitSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for UnitSystem {
    fn name(&self) -> &str {
        "units"
    }

    fn run(
        &mut self,
        ctx: &TurnContext<'_>,
        plan: &mut TurnPlan,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for unit in &ctx.snapshot.player.units {
            if !unit.is_worker() || !unit.can_act() {
                continue;
            }
            let mut worker = Worker {
                ctx,
                plan: &mut *plan,
                rng: &mut *rng,
                unit,
            };
            if let Some(action) = worker.decide() {
                plan.actions.push(action);
            }
        }
        Ok(())
    }
}

/// Where a query should send the unit
enum Route {
    Step(Pos),
    Build,
    Stay,
    Lost,
}

struct Worker<'a, 'c, 'r> {
    ctx: &'a TurnContext<'c>,
    plan: &'a mut TurnPlan,
    rng: &'a mut SystemRng<'r>,
    unit: &'a Unit,
}

impl Worker<'_, '_, '_> {
    fn decide(&mut self) -> Option<Action> {
        let ctx = self.ctx;
        let unit = self.unit;
        let settings = &ctx.tuning.units;
        let space = unit.cargo_space_left();

        let route = if let Some(order) = ctx.orders.fuel_order(&unit.id) {
            let city = Category::City(order.city_id.clone());
            self.follow(NearestQuery::new(&city, unit.pos, Channel::Avoidant))
        } else if let Some(order) = ctx.orders.cluster_order(&unit.id) {
            let cluster = Category::Cluster(order.cluster_id.clone());
            self.route(NearestQuery::new(&cluster, unit.pos, Channel::General))
        } else if space == 0 || (space <= settings.build_space_margin && self.on_rich_wood()) {
            self.settle()
        } else if unit.serial() % 3 == 0 && ctx.research.points > settings.special_coal_points {
            let (category, field) = if ctx.research.points > settings.special_uranium_points {
                (Category::Special, &ctx.fields.special_adjacency)
            } else {
                (Category::Coal, &ctx.fields.coal_adjacency)
            };
            self.gather(&category, field, Channel::General)
        } else if unit.serial() % 2 == 0 && (2..6).contains(&ctx.clock.cycle_index) {
            let spread = &ctx.fields.wood_spread;
            if space == unit.capacity {
                self.gather(&Category::Wood, spread, Channel::General)
            } else if space > settings.build_space_margin {
                self.gather(&Category::Wood, spread, Channel::Avoidant)
            } else {
                self.closest_resource(Channel::Avoidant)
            }
        } else {
            self.closest_resource(Channel::General)
        };

        match route {
            Route::Step(step) => Some(self.step(step)),
            Route::Build => Some(Action::BuildCity {
                unit: unit.id.clone(),
            }),
            Route::Stay => None,
            Route::Lost => {
                let step = random_neighbor(self.plan.graph.dims(), unit.pos, &mut *self.rng);
                tracing::debug!(unit = %unit.id, pos = %unit.pos, %step, "no target, moving randomly");
                Some(self.step(step))
            }
        }
    }

    fn budget(&self) -> ActorBudget {
        let routing = &self.ctx.tuning.routing;
        ActorBudget {
            recovery_delay: self.unit.cooldown,
            safe_turns: f64::from(self.ctx.clock.turns_until_night),
            near_capacity: self.unit.cargo.haul_turns() >= routing.near_capacity_cargo,
        }
    }

    fn on_rich_wood(&self) -> bool {
        let min_amount = self.ctx.tuning.units.build_wood_amount;
        self.ctx
            .snapshot
            .deposit(self.unit.pos)
            .is_some_and(|d| d.kind == ResourceKind::Wood && d.amount >= min_amount)
    }

    fn within_reach(&self, hit: &NearestHit) -> bool {
        hit.distance < self.ctx.tuning.routing.max_path_length
    }

    /// Entering an own city costs a blocking weight on the avoidant channel,
    /// so deliveries skip the path length limit.
    fn follow(&self, query: NearestQuery<'_>) -> Route {
        match self.plan.graph.nearest(&query) {
            Some(hit) => Route::Step(hit.step),
            None => Route::Lost,
        }
    }

    fn route(&self, query: NearestQuery<'_>) -> Route {
        match self.plan.graph.nearest(&query) {
            Some(hit) if self.within_reach(&hit) => Route::Step(hit.step),
            _ => Route::Lost,
        }
    }

    fn gather(&self, category: &Category, field: &Grid<f64>, channel: Channel) -> Route {
        let query = NearestQuery::new(category, self.unit.pos, channel)
            .adjusted_by(field)
            .within(self.budget());
        self.route(query)
    }

    /// Most advanced resource the player can mine, weighted by adjacency.
    fn closest_resource(&self, channel: Channel) -> Route {
        let research = self.ctx.research;
        let fields = self.ctx.fields;
        let (category, field) = if research.uranium {
            (Category::UraniumResearched, &fields.uranium_adjacency)
        } else if research.coal {
            (Category::CoalResearched, &fields.coal_adjacency)
        } else {
            (Category::Wood, &fields.wood_adjacency)
        };
        self.gather(&category, field, channel)
    }

    /// Heads for the best settle spot, building once standing on it.
    fn settle(&self) -> Route {
        let ctx = self.ctx;
        let settings = &ctx.tuning.units;
        let multiplier = if ctx.snapshot.turn < settings.early_settle_turn {
            settings.early_settle_multiplier
        } else {
            1.0
        };
        let settle = Category::Settle;
        let query = NearestQuery::new(&settle, self.unit.pos, Channel::Avoidant)
            .adjusted_by(&ctx.fields.settle_value)
            .multiplier(multiplier)
            .within(self.budget());
        match self.plan.graph.nearest(&query) {
            Some(hit) if self.within_reach(&hit) && hit.step == self.unit.pos => {
                if ctx.clock.turns_until_night > 1 {
                    Route::Build
                } else {
                    Route::Stay
                }
            }
            Some(hit) if self.within_reach(&hit) => Route::Step(hit.step),
            _ => Route::Lost,
        }
    }

    /// Moves one cell and records the move on the graph.
    fn step(&mut self, step: Pos) -> Action {
        let unit = self.unit;
        if step != unit.pos {
            let from_city = self
                .ctx
                .snapshot
                .player
                .city_tiles()
                .any(|tile| tile.pos == unit.pos);
            self.plan.graph.reserve(step);
            self.plan.graph.release(unit.pos, from_city);
        }
        Action::Move {
            unit: unit.id.clone(),
            direction: unit.pos.direction_to(step),
        }
    }
}

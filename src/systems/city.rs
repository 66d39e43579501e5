use anyhow::Result;

use crate::{
    actions::Action,
    engine::{System, TurnContext, TurnPlan},
    rng::SystemRng,
};

/// City tiles build workers until there is one per tile, then research.
pub struct CitySystem;

impl CitySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CitySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CitySystem {
    fn name(&self) -> &str {
        "cities"
    }

    fn run(
        &mut self,
        ctx: &TurnContext<'_>,
        plan: &mut TurnPlan,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let player = &ctx.snapshot.player;
        let tiles = player.city_tile_count();
        let research_cap = ctx.tuning.research.research_cap;
        let mut workers = player.units.len();
        let mut research = player.research_points;
        for tile in player.city_tiles().filter(|tile| tile.can_act()) {
            if workers < tiles {
                plan.actions.push(Action::BuildWorker { tile: tile.pos });
                workers += 1;
            } else if research < research_cap {
                plan.actions.push(Action::Research { tile: tile.pos });
                research += 1;
            }
        }
        Ok(())
    }
}

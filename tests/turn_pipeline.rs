use std::path::Path;

use nightfall::{
    actions::Action,
    config::{Tuning, TuningError},
    dispatch::SolveStatus,
    engine::{EngineBuilder, EngineSettings, TurnReport},
    scenario::ScenarioLoader,
    spatial::Direction,
    systems::{CitySystem, UnitSystem},
    world::TurnSnapshot,
};
use tempfile::tempdir;

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn load(file: &str) -> (u64, TurnSnapshot) {
    let (scenario, snapshot) = scenario_loader()
        .load_snapshot(file)
        .expect("scenario should load");
    (scenario.seed, snapshot)
}

fn build_engine(seed: u64, tuning: Tuning, diagnostics: &Path, interval: u32) -> EngineBuilder {
    let settings = EngineSettings {
        label: "pipeline".into(),
        seed,
        diagnostics_interval: interval,
        diagnostics_dir: diagnostics.to_path_buf(),
    };
    EngineBuilder::new(settings)
        .with_tuning(tuning)
        .with_system(CitySystem::new())
        .with_system(UnitSystem::new())
}

fn run(file: &str, tuning: Tuning) -> TurnReport {
    let (seed, snapshot) = load(file);
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(seed, tuning, temp.path(), 0)
        .build()
        .expect("valid tuning");
    engine.run_turn(&snapshot).expect("turn runs")
}

#[test]
fn late_game_routes_haulers_to_the_starving_city() {
    let report = run("scenarios/late_game.yaml", Tuning::default());
    let fuel = &report.orders.fuel;
    assert_eq!(fuel.status, SolveStatus::Optimal);
    assert_eq!(fuel.supplies, 2);
    assert_eq!(fuel.demands, 1);

    let mut haulers: Vec<_> = fuel.orders.iter().map(|o| o.unit_id.as_str()).collect();
    haulers.sort();
    assert_eq!(haulers, ["u_1", "u_2"]);
    assert!(fuel.orders.iter().all(|o| o.city_id == "c1"));
    assert_eq!(
        fuel.orders.iter().find(|o| o.unit_id == "u_1").map(|o| o.quantity),
        Some(90)
    );
    assert_eq!(
        fuel.orders.iter().find(|o| o.unit_id == "u_2").map(|o| o.quantity),
        Some(50)
    );

    // u_1 sits three cells below the city
    assert!(report.actions.contains(&Action::Move {
        unit: "u_1".into(),
        direction: Direction::North,
    }));
}

#[test]
fn late_game_sends_one_idle_worker_to_the_wood_patch() {
    let report = run("scenarios/late_game.yaml", Tuning::default());
    let clusters = &report.orders.clusters;
    assert_eq!(clusters.eligible, 3);
    assert_eq!(clusters.orders.len(), 1);
    assert_eq!(clusters.orders[0].unit_id, "u_5");
    assert_eq!(clusters.orders[0].cluster_id, "cluster-0");
}

#[test]
fn every_idle_unit_and_city_tile_acts_once() {
    let report = run("scenarios/late_game.yaml", Tuning::default());
    for id in ["u_1", "u_2", "u_3", "u_4", "u_5"] {
        let count = report.actions.iter().filter(|a| a.unit() == Some(id)).count();
        assert_eq!(count, 1, "unit {id}");
    }
    // five workers already cover the two tiles, so both research
    let research = report
        .actions
        .iter()
        .filter(|a| matches!(a, Action::Research { .. }))
        .count();
    assert_eq!(research, 2);
}

#[test]
fn early_game_skips_fuel_distribution() {
    let report = run("scenarios/four_by_four.yaml", Tuning::default());
    assert_eq!(report.orders.fuel.status, SolveStatus::Skipped);
    assert!(report.orders.fuel.orders.is_empty());
    assert_eq!(report.turns_until_night, 25);
}

#[test]
fn tuning_file_changes_the_plan() {
    let tuning = Tuning::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/tuning_override.yaml"))
        .expect("tuning loads");
    assert_eq!(tuning.fuel.min_turn, 50);
    let report = run("scenarios/late_game.yaml", tuning);
    assert_eq!(report.orders.fuel.status, SolveStatus::Skipped);
    assert!(report.orders.clusters.orders.is_empty());
}

#[test]
fn same_seed_replays_identically() {
    let first = run("scenarios/late_game.yaml", Tuning::default());
    let second = run("scenarios/late_game.yaml", Tuning::default());
    assert_eq!(first.tokens(), second.tokens());
    assert_eq!(first.actions, second.actions);
}

#[test]
fn diagnostics_are_written_on_interval() {
    let (seed, snapshot) = load("scenarios/late_game.yaml");
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(seed, Tuning::default(), temp.path(), 5)
        .build()
        .expect("valid tuning");
    let report = engine.run_turn(&snapshot).expect("turn runs");

    let path = temp.path().join("pipeline").join("turn_000045.json");
    assert!(path.exists(), "missing {}", path.display());
    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(body["turn"], 45);
    assert_eq!(
        body["actions"].as_array().map(Vec::len),
        Some(report.actions.len())
    );
    assert_eq!(body["orders"]["fuel"]["status"], "optimal");
}

#[test]
fn report_records_stage_timings() {
    let report = run("scenarios/four_by_four.yaml", Tuning::default());
    let names: Vec<_> = report.timings.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["fields", "clusters", "graph", "dispatch", "cities", "units"]
    );
    assert!(report.elapsed_ms() >= 0.0);
}

#[test]
fn unwritable_diagnostics_still_return_the_turn() {
    let (seed, snapshot) = load("scenarios/late_game.yaml");
    let temp = tempdir().expect("tempdir");
    let not_a_dir = temp.path().join("not_a_dir");
    std::fs::write(&not_a_dir, "occupied").expect("write file");

    let mut engine = build_engine(seed, Tuning::default(), &not_a_dir, 1)
        .build()
        .expect("valid tuning");
    let report = engine.run_turn(&snapshot).expect("turn survives a failed write");
    assert!(!report.actions.is_empty());
    assert_eq!(report.orders.fuel.status, SolveStatus::Optimal);
    assert!(!not_a_dir.join("pipeline").exists());
}

#[test]
fn invalid_tuning_is_rejected_before_the_first_turn() {
    let temp = tempdir().expect("tempdir");
    let mut tuning = Tuning::default();
    tuning.cycle.cycle_length = 0;
    let built = build_engine(7, tuning, temp.path(), 0).build();
    assert!(matches!(
        built.err(),
        Some(TuningError::NotPositive {
            field: "cycle.cycle_length",
            ..
        })
    ));
}

use clap::Parser;
use maze_chase::constants::{CELL_SIZE, FRAME_MS};
use maze_chase::engine::Session;
use maze_chase::maze::MazeGrid;
use maze_chase::rng::Rng;
use maze_chase::types::{
    AdversaryMode, CollectibleView, Direction, RuntimeEvent, SessionConfig, SessionOutcome,
    Snapshot,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run a single custom scenario instead of the default batch.
    #[arg(long)]
    single: bool,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
    #[serde(rename = "ticksRun")]
    ticks_run: u64,
    outcome: SessionOutcome,
    score: i32,
    lives: i32,
    #[serde(rename = "collectiblesConsumed")]
    collectibles_consumed: usize,
    captures: i32,
    deaths: i32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({ "maxTicks": scenario.max_ticks }),
        );

        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.ticks_run),
            json!({
                "outcome": scenario_run.result.outcome,
                "score": scenario_run.result.score,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        now_ms(),
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let maze = MazeGrid::reference(CELL_SIZE);
    let mut session = Session::new(maze, SessionConfig::default(), scenario.seed);
    session.start();

    // The pilot gets its own generator so steering noise never perturbs the
    // engine's stream.
    let mut pilot_rng = Rng::new(scenario.seed.wrapping_mul(31).wrapping_add(7));

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut victory_events = 0usize;
    let mut ticks_run = 0u64;
    let mut last = session.build_snapshot(false);

    for tick in 0..scenario.max_ticks {
        if tick % 5 == 0 {
            if let Some(dir) = choose_direction(&session, &last, &mut pilot_rng) {
                session.request_direction(dir);
            }
        }

        session.step(FRAME_MS);
        let snapshot = session.build_snapshot(true);
        ticks_run = snapshot.tick;

        for message in collect_tick_anomalies(&session, &last, &snapshot) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        victory_events += snapshot
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::Victory))
            .count();

        last = snapshot;
        if session.is_over() {
            break;
        }
    }

    if victory_events > 1 {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            ticks_run,
            format!("victory bonus awarded {victory_events} times"),
        );
    }

    let summary = session.build_summary();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            max_ticks: scenario.max_ticks,
            ticks_run,
            outcome: summary.outcome,
            score: summary.score,
            lives: summary.lives,
            collectibles_consumed: summary.collectibles_consumed,
            captures: summary.adversaries_captured,
            deaths: summary.deaths,
            anomalies,
        },
        anomaly_records,
    }
}

/// Greedy pilot: flee nearby adversaries, otherwise head for the closest
/// remaining collectible.
fn choose_direction(session: &Session, last: &Snapshot, rng: &mut Rng) -> Option<Direction> {
    let maze = session.maze();
    let agent = session.agent();
    if !agent.alive() {
        return None;
    }

    let (col, row) = maze.cell_at(agent.pos());
    let candidates: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|dir| {
            let (dx, dy) = dir.delta();
            !maze.is_wall(col + dx, row + dy)
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let danger_radius = 4.0 * maze.cell_size();
    let threats: Vec<(f32, f32)> = last
        .adversaries
        .iter()
        .filter(|adversary| adversary.mode != AdversaryMode::Evade && !adversary.captured)
        .map(|adversary| (adversary.x, adversary.y))
        .collect();
    let nearest_threat = threats
        .iter()
        .map(|&(x, y)| distance(agent.pos().x, agent.pos().y, x, y))
        .fold(f32::INFINITY, f32::min);

    let collectibles = session.collectible_views();
    let mut best: Option<Direction> = None;
    let mut best_score = f32::NEG_INFINITY;
    for dir in candidates {
        let (dx, dy) = dir.delta();
        let next = maze.cell_center(col + dx, row + dy);
        let score = if nearest_threat < danger_radius {
            threats
                .iter()
                .map(|&(x, y)| distance(next.x, next.y, x, y))
                .fold(f32::INFINITY, f32::min)
        } else {
            -nearest_collectible_distance(&collectibles, next.x, next.y)
        };
        // Noise breaks ties between equally ranked candidates.
        let score = score + rng.next_f32();
        if score > best_score {
            best_score = score;
            best = Some(dir);
        }
    }
    best
}

fn nearest_collectible_distance(collectibles: &[CollectibleView], x: f32, y: f32) -> f32 {
    collectibles
        .iter()
        .filter(|collectible| !collectible.consumed)
        .map(|collectible| distance(x, y, collectible.x, collectible.y))
        .fold(f32::INFINITY, f32::min)
}

fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

/// The invariants of the engine, re-checked against live runs.
fn collect_tick_anomalies(session: &Session, last: &Snapshot, snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    let maze = session.maze();

    if snapshot.score < last.score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            last.score, snapshot.score
        ));
    }
    if snapshot.lives > last.lives {
        anomalies.push(format!(
            "lives increased: {} -> {}",
            last.lives, snapshot.lives
        ));
    }
    if last.lives - snapshot.lives > 1 {
        anomalies.push(format!(
            "multiple lives lost in one tick: {} -> {}",
            last.lives, snapshot.lives
        ));
    }
    if snapshot.lives < 0 {
        anomalies.push(format!("negative lives: {}", snapshot.lives));
    }
    if snapshot.collectibles_remaining > last.collectibles_remaining {
        anomalies.push(format!(
            "collectible consumption reverted: {} -> {}",
            last.collectibles_remaining, snapshot.collectibles_remaining
        ));
    }

    let in_bounds = |x: f32, y: f32| {
        (0.0..=maze.width_px()).contains(&x) && (0.0..=maze.height_px()).contains(&y)
    };
    if !in_bounds(snapshot.agent.x, snapshot.agent.y) {
        anomalies.push(format!(
            "agent out of bounds: ({}, {})",
            snapshot.agent.x, snapshot.agent.y
        ));
    }
    for adversary in &snapshot.adversaries {
        if !in_bounds(adversary.x, adversary.y) {
            anomalies.push(format!(
                "adversary {} out of bounds: ({}, {})",
                adversary.id, adversary.x, adversary.y
            ));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));

    if cli.single || cli.ticks.is_some() {
        return vec![Scenario {
            name: "custom".to_string(),
            seed,
            max_ticks: cli.ticks.unwrap_or(10_800).clamp(60, 1_000_000),
        }];
    }

    vec![
        Scenario {
            name: "quick-run".to_string(),
            seed,
            max_ticks: 3_600,
        },
        Scenario {
            name: "endurance-run".to_string(),
            seed: normalize_seed(seed as u64 + 1),
            max_ticks: 21_600,
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count: scenarios.len(),
        anomaly_count,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn outcome_key(outcome: SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Victory => "victory",
        SessionOutcome::Defeat => "defeat",
        SessionOutcome::Incomplete => "incomplete",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}

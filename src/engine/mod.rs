use crate::constants::{ADVERSARY_SPAWN_CELLS, AGENT_SPAWN_CELL, HOME_CELL};
use crate::maze::{build_collectibles, Collectible, MazeGrid};
use crate::rng::Rng;
use crate::types::{
    AdversaryMode, AdversaryView, AgentView, CollectibleView, Direction, RuntimeEvent,
    SessionConfig, SessionOutcome, SessionState, SessionSummary, Snapshot, StrategyKind, Vec2,
};

mod adversary;
mod agent;
mod collision;
mod scheduler;
mod strategy;

pub use scheduler::ModeScheduler;

/// The player-controlled piece. Motion lives in `agent.rs`.
#[derive(Clone, Debug)]
pub struct Agent {
    pos: Vec2,
    dir: Direction,
    speed: f32,
    radius: f32,
    alive: bool,
    death_elapsed_ms: f64,
}

impl Agent {
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn dir(&self) -> Direction {
        self.dir
    }

    pub fn alive(&self) -> bool {
        self.alive
    }
}

/// One autonomously steered opponent. Motion and the mode machine live in
/// `adversary.rs`, target math in `strategy.rs`.
#[derive(Clone, Debug)]
pub struct Adversary {
    id: usize,
    strategy: StrategyKind,
    pos: Vec2,
    spawn: Vec2,
    dir: Direction,
    speed: f32,
    radius: f32,
    mode: AdversaryMode,
    mode_before_evade: AdversaryMode,
    evade_left_ms: f64,
    captured: bool,
    patrol_target: Vec2,
    home_target: Vec2,
}

impl Adversary {
    pub fn mode(&self) -> AdversaryMode {
        self.mode
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }
}

/// One play session: the exclusive owner of every piece of mutable game
/// state. The driver calls `step` at a fixed cadence and reads snapshots
/// between ticks; nothing here touches the wall clock.
#[derive(Clone, Debug)]
pub struct Session {
    pub config: SessionConfig,
    maze: MazeGrid,
    rng: Rng,
    state: SessionState,
    agent: Agent,
    adversaries: Vec<Adversary>,
    collectibles: Vec<Collectible>,
    requested_dir: Option<Direction>,
    scheduler: ModeScheduler,
    score: i32,
    lives: i32,
    elapsed_ms: f64,
    tick_counter: u64,
    captures: i32,
    deaths: i32,
    events: Vec<RuntimeEvent>,
}

impl Session {
    pub fn new(maze: MazeGrid, config: SessionConfig, seed: u32) -> Self {
        let collectibles = build_collectibles(&maze, config.standard_radius, config.bonus_radius);
        let agent = Agent {
            pos: maze.cell_center(AGENT_SPAWN_CELL.0, AGENT_SPAWN_CELL.1),
            dir: Direction::Right,
            speed: config.agent_speed,
            radius: config.agent_radius,
            alive: true,
            death_elapsed_ms: 0.0,
        };
        let adversaries = build_adversaries(&maze, &config);
        let scheduler = ModeScheduler::new(config.patrol_duration_ms, config.pursue_duration_ms);
        Self {
            config,
            maze,
            rng: Rng::new(seed),
            state: SessionState::Idle,
            agent,
            adversaries,
            collectibles,
            requested_dir: None,
            scheduler,
            score: 0,
            lives: config.starting_lives,
            elapsed_ms: 0.0,
            tick_counter: 0,
            captures: 0,
            deaths: 0,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn maze(&self) -> &MazeGrid {
        &self.maze
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, SessionState::GameOver | SessionState::Victory)
    }

    /// Starts a fresh game from Idle, GameOver or Victory. Ignored in every
    /// other state; use `toggle_pause` to resume a paused game.
    pub fn start(&mut self) {
        if !matches!(
            self.state,
            SessionState::Idle | SessionState::GameOver | SessionState::Victory
        ) {
            return;
        }
        self.reset_session();
        self.set_state(SessionState::Playing);
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            SessionState::Playing => self.set_state(SessionState::Paused),
            SessionState::Paused => self.set_state(SessionState::Playing),
            _ => {}
        }
    }

    /// Queues the single directional intent. Consumed at most once by the
    /// agent; ignored outside active play and while the agent is dead.
    pub fn request_direction(&mut self, dir: Direction) {
        if self.state == SessionState::Playing && self.agent.alive {
            self.requested_dir = Some(dir);
        }
    }

    /// Advances one tick. Inert unless Playing.
    pub fn step(&mut self, dt_ms: f64) {
        if self.state != SessionState::Playing {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms += dt_ms;

        self.update_agent(dt_ms);
        if self.state != SessionState::Playing {
            return;
        }
        self.update_modes(dt_ms);
        self.update_adversaries(dt_ms);
        self.resolve_collisions();
        self.check_exhaustion();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            state: self.state,
            score: self.score,
            lives: self.lives,
            agent: AgentView {
                x: self.agent.pos.x,
                y: self.agent.pos.y,
                dir: self.agent.dir,
                alive: self.agent.alive,
                death_elapsed_ms: self.agent.death_elapsed_ms,
            },
            adversaries: self
                .adversaries
                .iter()
                .map(|adversary| AdversaryView {
                    id: adversary.id,
                    strategy: adversary.strategy,
                    x: adversary.pos.x,
                    y: adversary.pos.y,
                    dir: adversary.dir,
                    mode: adversary.mode,
                    captured: adversary.captured,
                })
                .collect(),
            collectibles_remaining: self.collectibles.iter().filter(|c| !c.consumed).count(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn collectible_views(&self) -> Vec<CollectibleView> {
        self.collectibles.iter().map(Collectible::view).collect()
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            outcome: match self.state {
                SessionState::Victory => SessionOutcome::Victory,
                SessionState::GameOver => SessionOutcome::Defeat,
                _ => SessionOutcome::Incomplete,
            },
            score: self.score,
            lives: self.lives,
            duration_ms: self.elapsed_ms,
            collectibles_consumed: self.collectibles.iter().filter(|c| c.consumed).count(),
            adversaries_captured: self.captures,
            deaths: self.deaths,
        }
    }

    fn update_agent(&mut self, dt_ms: f64) {
        if self.agent.alive {
            self.agent.advance(&self.maze, &mut self.requested_dir);
            return;
        }

        // Death pause: the agent is frozen and only this timer moves. It is
        // driven by the tick so pausing suspends it too.
        self.agent.death_elapsed_ms += dt_ms;
        if self.agent.death_elapsed_ms < self.config.death_pause_ms {
            return;
        }
        if self.lives > 0 {
            self.reset_positions();
        } else {
            self.events.push(RuntimeEvent::GameOver);
            self.set_state(SessionState::GameOver);
        }
    }

    fn update_modes(&mut self, dt_ms: f64) {
        self.scheduler.advance(dt_ms);
        let scheduled = self.scheduler.scheduled_mode();
        for adversary in &mut self.adversaries {
            adversary.apply_scheduled_mode(scheduled);
        }
    }

    fn update_adversaries(&mut self, dt_ms: f64) {
        // Positions are sampled before anyone moves so the Flank strategy
        // reads a consistent picture of its partner.
        let positions: Vec<Vec2> = self.adversaries.iter().map(|a| a.pos).collect();
        for adversary in &mut self.adversaries {
            adversary.advance(
                &self.maze,
                &self.config,
                &self.agent,
                &positions,
                &mut self.rng,
                dt_ms,
            );
        }
    }

    fn reset_session(&mut self) {
        self.score = 0;
        self.lives = self.config.starting_lives;
        self.captures = 0;
        self.deaths = 0;
        self.elapsed_ms = 0.0;
        self.tick_counter = 0;
        self.scheduler.reset();
        for collectible in &mut self.collectibles {
            collectible.consumed = false;
        }
        self.reset_positions();
        self.events.push(RuntimeEvent::ScoreChanged { score: self.score });
        self.events.push(RuntimeEvent::LivesChanged { lives: self.lives });
    }

    fn reset_positions(&mut self) {
        self.agent.pos = self
            .maze
            .cell_center(AGENT_SPAWN_CELL.0, AGENT_SPAWN_CELL.1);
        self.agent.dir = Direction::Right;
        self.agent.alive = true;
        self.agent.death_elapsed_ms = 0.0;
        self.requested_dir = None;
        for adversary in &mut self.adversaries {
            adversary.pos = adversary.spawn;
            adversary.dir = Direction::Right;
            adversary.mode = AdversaryMode::Patrol;
            adversary.mode_before_evade = AdversaryMode::Patrol;
            adversary.evade_left_ms = 0.0;
            adversary.captured = false;
            adversary.speed = self.config.adversary_speed;
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            self.state = next;
            self.events
                .push(RuntimeEvent::SessionStateChanged { state: next });
        }
    }

    fn add_score(&mut self, amount: i32) {
        self.score += amount;
        self.events
            .push(RuntimeEvent::ScoreChanged { score: self.score });
    }
}

fn build_adversaries(maze: &MazeGrid, config: &SessionConfig) -> Vec<Adversary> {
    let cols = maze.cols();
    let rows = maze.rows();
    let home = maze.cell_corner(HOME_CELL.0, HOME_CELL.1);
    // Four distinct patrol corners, one per roster slot.
    let corners = [
        maze.cell_corner(cols - 3, 2),
        maze.cell_corner(2, 2),
        maze.cell_corner(cols - 3, rows - 3),
        maze.cell_corner(2, rows - 3),
    ];
    let strategies = [
        StrategyKind::Direct,
        StrategyKind::Ambush,
        StrategyKind::Flank,
        StrategyKind::Shy,
    ];

    ADVERSARY_SPAWN_CELLS
        .iter()
        .enumerate()
        .map(|(idx, &(col, row))| Adversary {
            id: idx,
            strategy: strategies[idx % strategies.len()],
            pos: maze.cell_center(col, row),
            spawn: maze.cell_center(col, row),
            dir: Direction::Right,
            speed: config.adversary_speed,
            radius: config.adversary_radius,
            mode: AdversaryMode::Patrol,
            mode_before_evade: AdversaryMode::Patrol,
            evade_left_ms: 0.0,
            captured: false,
            patrol_target: corners[idx % corners.len()],
            home_target: home,
        })
        .collect()
}

use super::{Adversary, Agent};
use crate::constants::EVADE_WANDER_CHANCE;
use crate::maze::MazeGrid;
use crate::rng::Rng;
use crate::types::{AdversaryMode, Direction, SessionConfig, Vec2};

impl Adversary {
    /// One tick of adversary motion. Two resolution levels: sub-cell
    /// interpolation along the committed heading, and a direction decision
    /// at each cell center.
    pub(super) fn advance(
        &mut self,
        maze: &MazeGrid,
        config: &SessionConfig,
        agent: &Agent,
        positions: &[Vec2],
        rng: &mut Rng,
        dt_ms: f64,
    ) {
        if self.mode == AdversaryMode::Evade {
            self.evade_left_ms -= dt_ms;
            if self.evade_left_ms <= 0.0 {
                self.evade_left_ms = 0.0;
                self.mode = self.mode_before_evade;
                self.speed = config.adversary_speed;
            }
        }

        self.ensure_valid_position(maze);

        if !self.at_cell_center(maze) {
            self.translate();
            self.ensure_valid_position(maze);
            return;
        }

        // Decision point: snap exactly, pick the candidate whose resulting
        // cell center lands closest to the target, move immediately.
        let (col, row) = maze.cell_at(self.pos);
        self.pos = maze.cell_center(col, row);

        let target = self.resolve_target(maze, config, agent, positions, rng);
        let mut best: Option<Direction> = None;
        let mut best_distance = f32::INFINITY;
        for dir in self.allowed_directions(maze, col, row) {
            let (dx, dy) = dir.delta();
            let candidate = Vec2::new(
                self.pos.x + dx as f32 * maze.cell_size(),
                self.pos.y + dy as f32 * maze.cell_size(),
            );
            let distance = candidate.distance_to(target);
            // Evade movement is deliberately indecisive: any candidate may
            // win outright regardless of its distance rank.
            let wander = self.mode == AdversaryMode::Evade && rng.chance(EVADE_WANDER_CHANCE);
            if wander || distance < best_distance {
                best_distance = distance;
                best = Some(dir);
            }
        }
        if let Some(dir) = best {
            self.dir = dir;
        }
        self.translate();
        self.ensure_valid_position(maze);
    }

    /// Where this adversary is heading, by mode. Every target is clamped
    /// into the interior play area before use.
    fn resolve_target(
        &mut self,
        maze: &MazeGrid,
        config: &SessionConfig,
        agent: &Agent,
        positions: &[Vec2],
        rng: &mut Rng,
    ) -> Vec2 {
        let cell = maze.cell_size();
        let raw = match self.mode {
            AdversaryMode::Evade => {
                let candidates = maze.evade_candidates();
                if candidates.is_empty() {
                    self.home_target
                } else {
                    let (col, row) = candidates[rng.pick_index(candidates.len())];
                    maze.cell_corner(col, row)
                }
            }
            AdversaryMode::Patrol => self.patrol_target,
            AdversaryMode::Returning => {
                if (self.pos.x - self.home_target.x).abs() < cell
                    && (self.pos.y - self.home_target.y).abs() < cell
                {
                    self.captured = false;
                    self.mode = self.mode_before_evade;
                    self.speed = config.adversary_speed;
                }
                self.home_target
            }
            AdversaryMode::Pursue => self
                .strategy
                .target(agent, positions, self.pos, maze)
                .unwrap_or(self.home_target),
        };

        Vec2::new(
            raw.x.clamp(cell, (maze.cols() - 2) as f32 * cell),
            raw.y.clamp(cell, (maze.rows() - 2) as f32 * cell),
        )
    }

    /// Non-wall neighbor directions minus the reverse of the current
    /// heading. Reversal is allowed again if it is the only way out; a cell
    /// with no open neighbor at all keeps the current heading.
    fn allowed_directions(&self, maze: &MazeGrid, col: i32, row: i32) -> Vec<Direction> {
        let open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|dir| {
                let (dx, dy) = dir.delta();
                !maze.is_wall(col + dx, row + dy)
            })
            .collect();
        if open.is_empty() {
            return vec![self.dir];
        }
        let reverse = self.dir.reversed();
        let forward: Vec<Direction> = open.iter().copied().filter(|dir| *dir != reverse).collect();
        if forward.is_empty() {
            open
        } else {
            forward
        }
    }

    fn translate(&mut self) {
        let (dx, dy) = self.dir.delta();
        self.pos.x += dx as f32 * self.speed;
        self.pos.y += dy as f32 * self.speed;
    }

    fn at_cell_center(&self, maze: &MazeGrid) -> bool {
        let (col, row) = maze.cell_at(self.pos);
        let center = maze.cell_center(col, row);
        (self.pos.x - center.x).abs() < self.speed && (self.pos.y - center.y).abs() < self.speed
    }

    /// Tunnel wrap at the raw position thresholds plus a half-cell clamp as
    /// a safety net against accumulated float error.
    fn ensure_valid_position(&mut self, maze: &MazeGrid) {
        let cell = maze.cell_size();
        let max_x = (maze.cols() - 1) as f32 * cell;
        let max_y = (maze.rows() - 1) as f32 * cell;

        if self.pos.x < 0.0 {
            self.pos.x = max_x - cell / 2.0;
        } else if self.pos.x > max_x {
            self.pos.x = cell / 2.0;
        }
        if self.pos.y < 0.0 {
            self.pos.y = max_y - cell / 2.0;
        } else if self.pos.y > max_y {
            self.pos.y = cell / 2.0;
        }

        self.pos.x = self.pos.x.clamp(cell / 2.0, max_x - cell / 2.0);
        self.pos.y = self.pos.y.clamp(cell / 2.0, max_y - cell / 2.0);
    }

    /// Bonus-collectible startle. Remembers the interrupted mode once, so a
    /// second frighten while already evading only refreshes the countdown.
    /// A captured adversary finishes returning first.
    pub(super) fn frighten(&mut self, config: &SessionConfig) {
        if self.captured {
            return;
        }
        if self.mode != AdversaryMode::Evade {
            self.mode_before_evade = self.mode;
        }
        self.mode = AdversaryMode::Evade;
        self.evade_left_ms = config.evade_duration_ms;
        self.speed = config.evade_speed;
    }

    pub(super) fn capture(&mut self, config: &SessionConfig) {
        self.captured = true;
        self.mode = AdversaryMode::Returning;
        self.evade_left_ms = 0.0;
        self.speed = config.adversary_speed;
    }

    /// Patrol/Pursue toggle under scheduler control. Only an actual change
    /// applies, and it reverses the heading as a startle side effect.
    /// Evading and returning adversaries are left alone.
    pub(super) fn apply_scheduled_mode(&mut self, scheduled: AdversaryMode) {
        if matches!(self.mode, AdversaryMode::Evade | AdversaryMode::Returning) {
            return;
        }
        if self.mode != scheduled {
            self.mode = scheduled;
            self.dir = self.dir.reversed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CELL_SIZE;
    use crate::types::StrategyKind;

    fn make_config() -> SessionConfig {
        SessionConfig::default()
    }

    fn make_adversary(maze: &MazeGrid, pos: Vec2, dir: Direction) -> Adversary {
        Adversary {
            id: 0,
            strategy: StrategyKind::Direct,
            pos,
            spawn: pos,
            dir,
            speed: 2.0,
            radius: 10.0,
            mode: AdversaryMode::Patrol,
            mode_before_evade: AdversaryMode::Patrol,
            evade_left_ms: 0.0,
            captured: false,
            patrol_target: maze.cell_corner(maze.cols() - 3, 2),
            home_target: maze.cell_corner(14, 14),
        }
    }

    fn make_agent(maze: &MazeGrid) -> Agent {
        Agent {
            pos: maze.cell_center(14, 23),
            dir: Direction::Right,
            speed: 3.0,
            radius: 10.0,
            alive: true,
            death_elapsed_ms: 0.0,
        }
    }

    #[test]
    fn decision_points_never_reverse_with_open_alternatives() {
        let maze = MazeGrid::reference(CELL_SIZE);
        // Cell (1,1) opens right and down only.
        let adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        let allowed = adversary.allowed_directions(&maze, 1, 1);
        assert!(allowed.contains(&Direction::Right));
        assert!(allowed.contains(&Direction::Down));
        assert!(!allowed.contains(&Direction::Left));
    }

    #[test]
    fn dead_end_permits_reversal_as_fallback() {
        let maze = MazeGrid::from_rows(&["1111", "1001", "1111"], 10.0);
        // At (2,1) the only open neighbor is behind us.
        let adversary = make_adversary(&maze, maze.cell_center(2, 1), Direction::Right);
        let allowed = adversary.allowed_directions(&maze, 2, 1);
        assert_eq!(allowed, vec![Direction::Left]);
    }

    #[test]
    fn fully_walled_cell_keeps_current_heading() {
        let maze = MazeGrid::from_rows(&["111", "101", "111"], 10.0);
        let adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Up);
        let allowed = adversary.allowed_directions(&maze, 1, 1);
        assert_eq!(allowed, vec![Direction::Up]);
    }

    #[test]
    fn frighten_remembers_interrupted_mode_and_drops_speed() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        adversary.mode = AdversaryMode::Pursue;

        adversary.frighten(&config);

        assert_eq!(adversary.mode, AdversaryMode::Evade);
        assert_eq!(adversary.mode_before_evade, AdversaryMode::Pursue);
        assert_eq!(adversary.evade_left_ms, config.evade_duration_ms);
        assert_eq!(adversary.speed, config.evade_speed);
    }

    #[test]
    fn repeated_frighten_refreshes_countdown_without_clobbering_memory() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        adversary.mode = AdversaryMode::Pursue;
        adversary.frighten(&config);
        adversary.evade_left_ms = 100.0;

        adversary.frighten(&config);

        assert_eq!(adversary.evade_left_ms, config.evade_duration_ms);
        assert_eq!(adversary.mode_before_evade, AdversaryMode::Pursue);
    }

    #[test]
    fn captured_adversary_ignores_frighten() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        adversary.mode = AdversaryMode::Evade;
        adversary.capture(&config);

        adversary.frighten(&config);

        assert_eq!(adversary.mode, AdversaryMode::Returning);
        assert!(adversary.captured);
    }

    #[test]
    fn evade_expires_back_to_remembered_mode() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut rng = Rng::new(5);
        let agent = make_agent(&maze);
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        adversary.mode = AdversaryMode::Pursue;
        adversary.frighten(&config);

        let positions = [adversary.pos];
        adversary.advance(
            &maze,
            &config,
            &agent,
            &positions,
            &mut rng,
            config.evade_duration_ms + 1.0,
        );

        assert_eq!(adversary.mode, AdversaryMode::Pursue);
        assert_eq!(adversary.speed, config.adversary_speed);
        assert_eq!(adversary.evade_left_ms, 0.0);
    }

    #[test]
    fn returning_resolves_at_home_back_to_pre_evade_mode() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut rng = Rng::new(9);
        let agent = make_agent(&maze);
        let mut adversary = make_adversary(&maze, maze.cell_center(14, 14), Direction::Right);
        adversary.mode = AdversaryMode::Pursue;
        adversary.frighten(&config);
        adversary.capture(&config);
        // Home target is the (14,14) cell origin; the cell center is within
        // one cell-size of it on both axes.
        let positions = [adversary.pos];
        adversary.advance(&maze, &config, &agent, &positions, &mut rng, 16.0);

        assert!(!adversary.captured);
        assert_eq!(adversary.mode, AdversaryMode::Pursue);
        assert_eq!(adversary.speed, config.adversary_speed);
    }

    #[test]
    fn targets_are_clamped_into_the_interior() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut rng = Rng::new(11);
        // Agent parked near the right edge, so an Ambush lead lands outside.
        let mut agent = make_agent(&maze);
        agent.pos = maze.cell_center(26, 1);
        agent.dir = Direction::Right;
        let mut adversary = make_adversary(&maze, maze.cell_center(6, 1), Direction::Right);
        adversary.strategy = StrategyKind::Ambush;
        adversary.mode = AdversaryMode::Pursue;

        let positions = [adversary.pos];
        let target = adversary.resolve_target(&maze, &config, &agent, &positions, &mut rng);
        assert!(target.x <= (maze.cols() - 2) as f32 * CELL_SIZE);
        assert!(target.x >= CELL_SIZE);
        assert!(target.y >= CELL_SIZE);
        assert!(target.y <= (maze.rows() - 2) as f32 * CELL_SIZE);
    }

    #[test]
    fn evade_targets_come_from_the_inset_candidate_pool() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let agent = make_agent(&maze);
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        adversary.frighten(&config);

        let positions = [adversary.pos];
        for seed in 0..50 {
            let mut rng = Rng::new(seed);
            adversary.evade_left_ms = config.evade_duration_ms;
            let target = adversary.resolve_target(&maze, &config, &agent, &positions, &mut rng);
            let (col, row) = maze.cell_at(target);
            assert!(!maze.is_wall(col, row));
            assert!((2..=maze.cols() - 3).contains(&col));
            assert!((2..=maze.rows() - 3).contains(&row));
        }
    }

    #[test]
    fn scheduled_mode_change_reverses_heading_once() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);

        adversary.apply_scheduled_mode(AdversaryMode::Pursue);
        assert_eq!(adversary.mode, AdversaryMode::Pursue);
        assert_eq!(adversary.dir, Direction::Left);

        // Re-applying the same mode is a no-op.
        adversary.apply_scheduled_mode(AdversaryMode::Pursue);
        assert_eq!(adversary.dir, Direction::Left);
    }

    #[test]
    fn scheduled_mode_skips_evading_and_returning() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut adversary = make_adversary(&maze, maze.cell_center(1, 1), Direction::Right);
        adversary.frighten(&config);
        adversary.apply_scheduled_mode(AdversaryMode::Pursue);
        assert_eq!(adversary.mode, AdversaryMode::Evade);

        adversary.capture(&config);
        adversary.apply_scheduled_mode(AdversaryMode::Pursue);
        assert_eq!(adversary.mode, AdversaryMode::Returning);
        assert_eq!(adversary.dir, Direction::Right);
    }

    #[test]
    fn long_runs_stay_inside_the_playable_band() {
        let maze = MazeGrid::reference(CELL_SIZE);
        let config = make_config();
        let mut rng = Rng::new(77);
        let agent = make_agent(&maze);
        let mut adversary = make_adversary(&maze, maze.cell_center(14, 11), Direction::Right);
        adversary.mode = AdversaryMode::Pursue;

        let cell = maze.cell_size();
        for _ in 0..10_000 {
            let positions = [adversary.pos];
            adversary.advance(&maze, &config, &agent, &positions, &mut rng, 1000.0 / 60.0);
            assert!(adversary.pos.x >= cell / 2.0);
            assert!(adversary.pos.x <= (maze.cols() - 1) as f32 * cell - cell / 2.0);
            assert!(adversary.pos.y >= cell / 2.0);
            assert!(adversary.pos.y <= (maze.rows() - 1) as f32 * cell - cell / 2.0);
        }
    }
}

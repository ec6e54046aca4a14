use serde::Serialize;

use crate::constants::{
    ADVERSARY_RADIUS, ADVERSARY_SPEED, AGENT_RADIUS, AGENT_SPEED, BONUS_RADIUS, BONUS_VALUE,
    CAPTURE_VALUE, CELL_SIZE, DEATH_PAUSE_MS, EVADE_DURATION_MS, EVADE_SPEED, FRAME_MS,
    PATROL_DURATION_MS, PURSUE_DURATION_MS, STANDARD_RADIUS, STANDARD_VALUE, STARTING_LIVES,
    TICK_RATE, VICTORY_VALUE,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];
}

/// Continuous position in maze pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Open,
    Wall,
    Collectible,
    BonusCollectible,
    HomeArea,
}

impl CellKind {
    /// Maps the externally supplied integer codes. Unknown codes degrade to
    /// walls rather than failing.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Open,
            1 => Self::Wall,
            2 => Self::Collectible,
            3 => Self::BonusCollectible,
            4 => Self::HomeArea,
            _ => Self::Wall,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectibleTier {
    Standard,
    Bonus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdversaryMode {
    Patrol,
    Pursue,
    Evade,
    Returning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    Ambush,
    Flank,
    Shy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Playing,
    Paused,
    GameOver,
    Victory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Victory,
    Defeat,
    Incomplete,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SessionConfig {
    #[serde(rename = "cellSize")]
    pub cell_size: f32,
    #[serde(rename = "agentSpeed")]
    pub agent_speed: f32,
    #[serde(rename = "agentRadius")]
    pub agent_radius: f32,
    #[serde(rename = "adversarySpeed")]
    pub adversary_speed: f32,
    #[serde(rename = "adversaryRadius")]
    pub adversary_radius: f32,
    #[serde(rename = "evadeSpeed")]
    pub evade_speed: f32,
    #[serde(rename = "evadeDurationMs")]
    pub evade_duration_ms: f64,
    #[serde(rename = "patrolDurationMs")]
    pub patrol_duration_ms: f64,
    #[serde(rename = "pursueDurationMs")]
    pub pursue_duration_ms: f64,
    #[serde(rename = "frameMs")]
    pub frame_ms: f64,
    #[serde(rename = "deathPauseMs")]
    pub death_pause_ms: f64,
    #[serde(rename = "standardRadius")]
    pub standard_radius: f32,
    #[serde(rename = "bonusRadius")]
    pub bonus_radius: f32,
    #[serde(rename = "standardValue")]
    pub standard_value: i32,
    #[serde(rename = "bonusValue")]
    pub bonus_value: i32,
    #[serde(rename = "captureValue")]
    pub capture_value: i32,
    #[serde(rename = "victoryValue")]
    pub victory_value: i32,
    #[serde(rename = "startingLives")]
    pub starting_lives: i32,
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE,
            agent_speed: AGENT_SPEED,
            agent_radius: AGENT_RADIUS,
            adversary_speed: ADVERSARY_SPEED,
            adversary_radius: ADVERSARY_RADIUS,
            evade_speed: EVADE_SPEED,
            evade_duration_ms: EVADE_DURATION_MS,
            patrol_duration_ms: PATROL_DURATION_MS,
            pursue_duration_ms: PURSUE_DURATION_MS,
            frame_ms: FRAME_MS,
            death_pause_ms: DEATH_PAUSE_MS,
            standard_radius: STANDARD_RADIUS,
            bonus_radius: BONUS_RADIUS,
            standard_value: STANDARD_VALUE,
            bonus_value: BONUS_VALUE,
            capture_value: CAPTURE_VALUE,
            victory_value: VICTORY_VALUE,
            starting_lives: STARTING_LIVES,
            tick_rate: TICK_RATE,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub alive: bool,
    #[serde(rename = "deathElapsedMs")]
    pub death_elapsed_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AdversaryView {
    pub id: usize,
    pub strategy: StrategyKind,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub mode: AdversaryMode,
    pub captured: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CollectibleView {
    pub x: f32,
    pub y: f32,
    pub tier: CollectibleTier,
    pub consumed: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    CollectibleConsumed {
        tier: CollectibleTier,
        x: f32,
        y: f32,
    },
    AdversaryCaptured {
        id: usize,
    },
    AgentDied {
        #[serde(rename = "livesLeft")]
        lives_left: i32,
    },
    GameOver,
    Victory,
    ScoreChanged {
        score: i32,
    },
    LivesChanged {
        lives: i32,
    },
    SessionStateChanged {
        state: SessionState,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub state: SessionState,
    pub score: i32,
    pub lives: i32,
    pub agent: AgentView,
    pub adversaries: Vec<AdversaryView>,
    #[serde(rename = "collectiblesRemaining")]
    pub collectibles_remaining: usize,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub score: i32,
    pub lives: i32,
    #[serde(rename = "durationMs")]
    pub duration_ms: f64,
    #[serde(rename = "collectiblesConsumed")]
    pub collectibles_consumed: usize,
    #[serde(rename = "adversariesCaptured")]
    pub adversaries_captured: i32,
    pub deaths: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_move_accepts_cardinal_directions_only() {
        assert_eq!(Direction::parse_move("up"), Some(Direction::Up));
        assert_eq!(Direction::parse_move("right"), Some(Direction::Right));
        assert_eq!(Direction::parse_move("none"), None);
        assert_eq!(Direction::parse_move("UP"), None);
    }

    #[test]
    fn reversed_is_an_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.reversed().reversed(), dir);
            assert_ne!(dir.reversed(), dir);
        }
    }

    #[test]
    fn unknown_cell_codes_degrade_to_wall() {
        assert_eq!(CellKind::from_code(0), CellKind::Open);
        assert_eq!(CellKind::from_code(4), CellKind::HomeArea);
        assert_eq!(CellKind::from_code(9), CellKind::Wall);
        assert_eq!(CellKind::from_code(255), CellKind::Wall);
    }
}

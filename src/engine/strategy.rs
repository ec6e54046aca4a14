use super::Agent;
use crate::constants::{AMBUSH_LEAD_CELLS, FLANK_LEAD_CELLS, SHY_DISTANCE_CELLS};
use crate::maze::MazeGrid;
use crate::types::{StrategyKind, Vec2};

impl StrategyKind {
    /// Pursue-mode target for one adversary. Pure: reads the agent, the
    /// pre-move positions of every adversary and the adversary's own
    /// position. `None` marks a strategy that cannot produce a target this
    /// tick; the caller substitutes the home fallback.
    pub(super) fn target(
        self,
        agent: &Agent,
        positions: &[Vec2],
        own: Vec2,
        maze: &MazeGrid,
    ) -> Option<Vec2> {
        let cell = maze.cell_size();
        match self {
            Self::Direct => Some(agent.pos()),
            Self::Ambush => Some(lead_point(agent, AMBUSH_LEAD_CELLS * cell)),
            Self::Flank => {
                // Pincer: project a short lead, then reflect it through the
                // first adversary of the roster.
                let partner = positions.first().copied()?;
                let lead = lead_point(agent, FLANK_LEAD_CELLS * cell);
                Some(Vec2::new(
                    lead.x * 2.0 - partner.x,
                    lead.y * 2.0 - partner.y,
                ))
            }
            Self::Shy => {
                if own.distance_to(agent.pos()) > SHY_DISTANCE_CELLS * cell {
                    Some(agent.pos())
                } else {
                    // Too close for comfort: retreat to the far corner.
                    Some(maze.cell_corner(2, maze.rows() - 3))
                }
            }
        }
    }
}

fn lead_point(agent: &Agent, distance: f32) -> Vec2 {
    let (dx, dy) = agent.dir().delta();
    Vec2::new(
        agent.pos().x + dx as f32 * distance,
        agent.pos().y + dy as f32 * distance,
    )
}

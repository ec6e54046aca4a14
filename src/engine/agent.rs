use super::Agent;
use crate::maze::MazeGrid;
use crate::types::{Direction, Vec2};

impl Agent {
    /// One tick of player motion: first try the queued turn, then always
    /// push along the current heading. Illegal moves are absorbed silently,
    /// never rejected upward.
    pub(super) fn advance(&mut self, maze: &MazeGrid, requested: &mut Option<Direction>) {
        let cell = maze.cell_size();
        let (col, row) = maze.cell_at(self.pos);
        let center = maze.cell_center(col, row);

        // A turn is taken only into an open cell and only near the cell
        // center; it snaps the position exactly so corners stay clean. An
        // unusable request stays queued for a later tick.
        if let Some(wanted) = *requested {
            let (dx, dy) = wanted.delta();
            let open = !maze.is_wall(col + dx, row + dy);
            let near_center = (self.pos.x - center.x).abs() < self.speed * 2.0
                && (self.pos.y - center.y).abs() < self.speed * 2.0;
            if open && near_center {
                self.pos = center;
                self.dir = wanted;
                *requested = None;
            }
        }

        let (dx, dy) = self.dir.delta();
        let next = Vec2::new(
            self.pos.x + dx as f32 * self.speed,
            self.pos.y + dy as f32 * self.speed,
        );
        let (next_col, next_row) = maze.cell_at(next);

        if next_col < 0 {
            // Tunnel wrap, horizontal and vertical handled independently.
            self.pos.x = (maze.cols() - 1) as f32 * cell + cell / 2.0;
        } else if next_col >= maze.cols() {
            self.pos.x = cell / 2.0;
        } else if next_row < 0 {
            self.pos.y = (maze.rows() - 1) as f32 * cell + cell / 2.0;
        } else if next_row >= maze.rows() {
            self.pos.y = cell / 2.0;
        } else if !maze.is_wall(next_col, next_row) {
            self.pos = next;
        } else {
            // Stop flush against the wall, not at the cell center. The
            // clamp threshold is the agent radius; the wrap above keys off
            // the cell index. Keep the two thresholds separate.
            match self.dir {
                Direction::Right => self.pos.x = col as f32 * cell + cell - self.radius,
                Direction::Left => self.pos.x = col as f32 * cell + self.radius,
                Direction::Down => self.pos.y = row as f32 * cell + cell - self.radius,
                Direction::Up => self.pos.y = row as f32 * cell + self.radius,
            }
        }
    }
}

use crate::constants::EVADE_TARGET_INSET;
use crate::types::{CellKind, CollectibleTier, CollectibleView, Vec2};

/// Bundled 28x31 layout. Codes: 0 open, 1 wall, 2 standard collectible,
/// 3 bonus collectible, 4 home-area marker.
const REFERENCE_LAYOUT: [&str; 31] = [
    "1111111111111111111111111111",
    "1222222222222112222222222221",
    "1211112111112112111112111121",
    "1311112111112112111112111131",
    "1211112111112112111112111121",
    "1222222222222222222222222221",
    "1211112112111111112112111121",
    "1211112112111111112112111121",
    "1222222112222112222112222221",
    "1111112111110110111112111111",
    "0000012111110110111112100000",
    "0000012110000000000112100000",
    "0000012110111441110112100000",
    "1111112110100000010112111111",
    "0000002000100000010002000000",
    "1111112110100000010112111111",
    "0000012110111111110112100000",
    "0000012110000000000112100000",
    "0000012110111111110112100000",
    "1111112110111111110112111111",
    "1222222222222112222222222221",
    "1211112111112112111112111121",
    "1211112111112112111112111121",
    "1322112222222002222222112231",
    "1112112112111111112112112111",
    "1112112112111111112112112111",
    "1222222112222112222112222221",
    "1211111111112112111111111121",
    "1211111111112112111111111121",
    "1222222222222222222222222221",
    "1111111111111111111111111111",
];

/// Static traversability lookup over a rectangular cell grid. Immutable
/// after construction; every out-of-bounds read answers `Wall`.
#[derive(Clone, Debug)]
pub struct MazeGrid {
    cols: i32,
    rows: i32,
    cell_size: f32,
    cells: Vec<CellKind>,
    evade_candidates: Vec<(i32, i32)>,
}

impl MazeGrid {
    /// Builds a grid from one string per maze row, one digit code per cell.
    /// Unknown characters and cells past a short row are treated as walls.
    pub fn from_rows(layout: &[&str], cell_size: f32) -> Self {
        let rows = layout.len() as i32;
        let cols = layout.iter().map(|row| row.len()).max().unwrap_or(0) as i32;
        let mut cells = vec![CellKind::Wall; (rows * cols) as usize];
        for (row, line) in layout.iter().enumerate() {
            for (col, ch) in line.bytes().enumerate() {
                let kind = if ch.is_ascii_digit() {
                    CellKind::from_code(ch - b'0')
                } else {
                    CellKind::Wall
                };
                cells[row * cols as usize + col] = kind;
            }
        }

        let mut grid = Self {
            cols,
            rows,
            cell_size,
            cells,
            evade_candidates: Vec::new(),
        };
        grid.evade_candidates = grid.collect_evade_candidates();
        grid
    }

    pub fn reference(cell_size: f32) -> Self {
        Self::from_rows(&REFERENCE_LAYOUT, cell_size)
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width_px(&self) -> f32 {
        self.cols as f32 * self.cell_size
    }

    pub fn height_px(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }

    pub fn cell_kind(&self, col: i32, row: i32) -> CellKind {
        if col < 0 || row < 0 || col >= self.cols || row >= self.rows {
            return CellKind::Wall;
        }
        self.cells[(row * self.cols + col) as usize]
    }

    pub fn is_wall(&self, col: i32, row: i32) -> bool {
        self.cell_kind(col, row) == CellKind::Wall
    }

    /// Cell containing a continuous position, by floor division. Positions
    /// past an edge yield out-of-range indices on purpose; callers use that
    /// to detect tunnel crossings.
    pub fn cell_at(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn cell_center(&self, col: i32, row: i32) -> Vec2 {
        Vec2::new(
            col as f32 * self.cell_size + self.cell_size / 2.0,
            row as f32 * self.cell_size + self.cell_size / 2.0,
        )
    }

    /// Cell origin. Steering targets are expressed at origins, not centers.
    pub fn cell_corner(&self, col: i32, row: i32) -> Vec2 {
        Vec2::new(col as f32 * self.cell_size, row as f32 * self.cell_size)
    }

    /// Non-wall cells at least `EVADE_TARGET_INSET` cells from every border;
    /// the pool evading adversaries draw random targets from.
    pub fn evade_candidates(&self) -> &[(i32, i32)] {
        &self.evade_candidates
    }

    /// Row strings for presentation-layer init payloads.
    pub fn tile_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| match self.cell_kind(col, row) {
                        CellKind::Open => '0',
                        CellKind::Wall => '1',
                        CellKind::Collectible => '2',
                        CellKind::BonusCollectible => '3',
                        CellKind::HomeArea => '4',
                    })
                    .collect()
            })
            .collect()
    }

    fn collect_evade_candidates(&self) -> Vec<(i32, i32)> {
        let inset = EVADE_TARGET_INSET;
        let mut out = Vec::new();
        for row in inset..(self.rows - inset) {
            for col in inset..(self.cols - inset) {
                if !self.is_wall(col, row) {
                    out.push((col, row));
                }
            }
        }
        out
    }
}

/// A placed item. Flagged consumed for the session's lifetime, never removed.
#[derive(Clone, Debug)]
pub struct Collectible {
    pub pos: Vec2,
    pub radius: f32,
    pub tier: CollectibleTier,
    pub consumed: bool,
}

impl Collectible {
    pub fn view(&self) -> CollectibleView {
        CollectibleView {
            x: self.pos.x,
            y: self.pos.y,
            tier: self.tier,
            consumed: self.consumed,
        }
    }
}

/// Scans the grid for collectible cells, standard tier first so per-tick
/// consumption checks run in that order.
pub fn build_collectibles(
    maze: &MazeGrid,
    standard_radius: f32,
    bonus_radius: f32,
) -> Vec<Collectible> {
    let mut out = Vec::new();
    for (tier, kind, radius) in [
        (CollectibleTier::Standard, CellKind::Collectible, standard_radius),
        (CollectibleTier::Bonus, CellKind::BonusCollectible, bonus_radius),
    ] {
        for row in 0..maze.rows() {
            for col in 0..maze.cols() {
                if maze.cell_kind(col, row) == kind {
                    out.push(Collectible {
                        pos: maze.cell_center(col, row),
                        radius,
                        tier,
                        consumed: false,
                    });
                }
            }
        }
    }
    out
}

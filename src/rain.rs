// Copyright (c) 2026 rezky_nightky

use rand::{
    distr::{Distribution, Uniform},
    rngs::StdRng,
    seq::index,
    SeedableRng,
};
use tracing::{debug, trace};

use crate::{
    cell::{random_ascii_other, Cell, Role, TAIL_MAX, TAIL_MIN},
    matrix::{Layer, Matrix, MatrixError},
};

/// One rendered position: the glyph to print and the ramp index to color it
/// with. `shade` is `None` for blank cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stroke {
    pub ch: char,
    pub shade: Option<u8>,
}

impl Stroke {
    fn from_cell(cell: Cell) -> Self {
        let (ascii, role, tail) = cell.decode();
        match role {
            Role::None => Self {
                ch: ' ',
                shade: None,
            },
            Role::Drop => Self {
                ch: char::from(ascii),
                shade: Some(0),
            },
            Role::Tail => Self {
                ch: char::from(ascii),
                shade: Some(tail),
            },
        }
    }
}

/// Fold state while shifting one column: the declared tail of the most
/// recently seen drop and how many of its tail cells were passed since.
#[derive(Clone, Copy, Debug, Default)]
struct TailTrack {
    size: u8,
    seen: u8,
}

impl TailTrack {
    fn observe(self, cell: Cell) -> Self {
        match cell.role() {
            Role::Drop => Self {
                size: cell.tail(),
                seen: 0,
            },
            Role::Tail if self.size > 0 => Self {
                seen: self.seen.saturating_add(1),
                ..self
            },
            _ => self,
        }
    }
}

pub struct Rain {
    matrix: Matrix,
    ramp_len: u8,
    mt: StdRng,
    rand_tail: Uniform<u8>,
    rand_row: Uniform<u16>,
    rand_col: Uniform<u16>,
}

impl Rain {
    /// `ramp_len` is the number of colors in the ramp, drop color included.
    pub fn new(
        rows: u16,
        cols: u16,
        drop_ratio: f32,
        ramp_len: usize,
        seed: u64,
    ) -> Result<Self, MatrixError> {
        let mut mt = StdRng::seed_from_u64(seed);
        let mut matrix = Matrix::new(rows, cols, drop_ratio)?;
        matrix.fill_random(&mut mt);
        debug!(rows, cols, drop_ratio, seed, "matrix created");
        Ok(Self {
            matrix,
            ramp_len: ramp_len.clamp(2, u8::MAX as usize) as u8,
            mt,
            rand_tail: Uniform::new_inclusive(TAIL_MIN, TAIL_MAX).expect("valid range"),
            rand_row: Uniform::new_inclusive(0, rows.saturating_sub(1)).expect("valid range"),
            rand_col: Uniform::new_inclusive(0, cols.saturating_sub(1)).expect("valid range"),
        })
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Throws away all cell state and rebuilds at the new size, then seeds a
    /// full screen of drops.
    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<(), MatrixError> {
        self.matrix = Matrix::new(rows, cols, self.matrix.drop_ratio())?;
        self.rand_row = Uniform::new_inclusive(0, rows.saturating_sub(1)).expect("valid range");
        self.rand_col = Uniform::new_inclusive(0, cols.saturating_sub(1)).expect("valid range");
        self.fill_random();
        let placed = self.seed_drops();
        debug!(rows, cols, placed, "matrix rebuilt");
        Ok(())
    }

    pub fn fill_random(&mut self) {
        self.matrix.fill_random(&mut self.mt);
    }

    /// Ramp index for the `tnext`-th tail cell of a tail `tsize` long:
    /// `ceil((ramp_len - 1) * tnext / tsize)`.
    fn tail_shade(&self, tsize: u8, tnext: u8) -> u8 {
        if tsize == 0 {
            return self.ramp_len - 1;
        }
        let span = (self.ramp_len - 1) as u32;
        let v = (span * tnext as u32).div_ceil(tsize as u32);
        v.min(span) as u8
    }

    fn put_tail(&mut self, row: usize, col: usize, tsize: u8, tnext: u8) {
        let shade = self.tail_shade(tsize, tnext);
        let cur = self.matrix.get(row, col);
        self.matrix.set(row, col, cur.with_role(Role::Tail, shade));
    }

    /// Writes a drop at `(row, col)` with its tail stretching upward. Tail
    /// cells above row 0 are cut off, rows below the bottom edge are skipped,
    /// and a tail never overwrites another drop. Returns whether the drop
    /// itself landed inside the grid.
    pub fn add_drop(&mut self, row: usize, col: usize, tsize: u8) -> bool {
        if col >= self.matrix.cols() as usize {
            return false;
        }
        let rows = self.matrix.rows() as usize;
        let mut placed = false;
        for i in 0..=tsize {
            let Some(r) = row.checked_sub(i as usize) else {
                break;
            };
            if r >= rows {
                continue;
            }
            let cur = self.matrix.get(r, col);
            if i == 0 {
                self.matrix.set(r, col, cur.with_role(Role::Drop, tsize));
                placed = true;
            } else if !cur.is_drop() {
                self.put_tail(r, col, tsize, i);
            }
        }
        placed
    }

    fn random_tail(&mut self) -> u8 {
        self.rand_tail.sample(&mut self.mt)
    }

    /// Scatters `floor(rows * cols * drop_ratio)` drops over the grid. Heads
    /// only land on cells that are not already drops.
    pub fn seed_drops(&mut self) -> usize {
        if self.matrix.is_empty() {
            return 0;
        }
        let num = self.matrix.desired_drops();
        let mut placed = 0;
        while placed < num && self.matrix.drop_count() < self.matrix.len() {
            let row = self.rand_row.sample(&mut self.mt) as usize;
            let col = self.rand_col.sample(&mut self.mt) as usize;
            if self.matrix.get(row, col).is_drop() {
                continue;
            }
            let tsize = self.random_tail();
            if self.add_drop(row, col, tsize) {
                placed += 1;
            }
        }
        debug!(num, placed, drops = self.matrix.drop_count(), "seeded drops");
        placed
    }

    /// Shifts one column down by a row. Returns whether a drop sat on the
    /// bottom row before the shift, which is the drop leaving the grid.
    fn advance_column(&mut self, col: usize) -> bool {
        let rows = self.matrix.rows() as usize;
        let cols = self.matrix.cols() as usize;
        if rows == 0 {
            return false;
        }
        let dropped = self.matrix.get(rows - 1, col).is_drop();
        let top = self.matrix.get(0, col).role();

        let mut track = TailTrack::default();
        for row in (0..rows).rev() {
            let i = row * cols + col;
            let cell = self.matrix.get_at(i);
            if cell.role() == Role::None {
                continue;
            }
            if row + 1 < rows {
                let below = self.matrix.get_at(i + cols);
                self.matrix
                    .set_at(i + cols, below.with_role(cell.role(), cell.tail()));
            }
            self.matrix.set_at(i, cell.cleared());
            track = track.observe(cell);
        }

        if top != Role::None && track.seen < track.size {
            self.put_tail(0, col, track.size, track.seen + 1);
        }
        dropped
    }

    /// Moves every column down one row. Returns how many drops fell off the
    /// bottom; `drop_count` has already been reduced by that amount.
    pub fn advance_one_step(&mut self) -> usize {
        let mut exited = 0;
        for col in 0..self.matrix.cols() as usize {
            if self.advance_column(col) {
                exited += 1;
            }
        }
        debug_assert_eq!(self.matrix.drop_count(), self.matrix.count_role(Role::Drop));
        trace!(exited, drops = self.matrix.drop_count(), "advanced");
        exited
    }

    /// Tops the population up toward the target ratio with new drops on row 0.
    /// Always adds at least one, so the grid slightly over-seeds and relies on
    /// drops leaving at the bottom to settle.
    pub fn replenish_drops(&mut self) -> usize {
        if self.matrix.is_empty() {
            return 0;
        }
        let missing = self
            .matrix
            .desired_drops()
            .saturating_sub(self.matrix.drop_count());
        let to_add = missing / self.matrix.rows() as usize + 1;
        for _ in 0..to_add {
            let col = self.rand_col.sample(&mut self.mt) as usize;
            let tsize = self.random_tail();
            self.add_drop(0, col, tsize);
        }
        to_add
    }

    /// One simulation frame: replenish at the top, then fall.
    pub fn update(&mut self) -> usize {
        self.replenish_drops();
        self.advance_one_step()
    }

    /// Swaps the character of `fraction * rows * cols` distinct random cells.
    /// Roles and tails are untouched.
    pub fn apply_noise(&mut self, fraction: f32) -> usize {
        let len = self.matrix.len();
        let num = ((len as f32 * fraction) as usize).min(len);
        if num == 0 {
            return 0;
        }
        for i in index::sample(&mut self.mt, len, num) {
            let cell = self.matrix.get_at(i);
            let ascii = random_ascii_other(&mut self.mt, cell.ascii());
            self.matrix.set_at(i, cell.with_ascii(ascii));
        }
        num
    }

    /// Row-major projection of the grid. Restartable and side effect free.
    pub fn render(&self) -> impl Iterator<Item = Stroke> + '_ {
        self.matrix.cells().iter().map(|&c| Stroke::from_cell(c))
    }

    pub fn dump(&self, layer: Layer) -> String {
        self.matrix.dump(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAMP: usize = 6;

    fn rain(rows: u16, cols: u16, ratio: f32, seed: u64) -> Rain {
        Rain::new(rows, cols, ratio, RAMP, seed).unwrap()
    }

    fn column(r: &Rain, col: usize) -> Vec<Cell> {
        (0..r.matrix().rows() as usize)
            .map(|row| r.matrix().get(row, col))
            .collect()
    }

    #[test]
    fn seeding_a_ten_by_ten_grid_places_five_drops() {
        let mut r = rain(10, 10, 0.05, 42);
        assert_eq!(r.seed_drops(), 5);
        assert_eq!(r.matrix().drop_count(), 5);
        assert_eq!(r.matrix().count_role(Role::Drop), 5);
    }

    #[test]
    fn drop_count_matches_a_full_scan_after_every_operation() {
        for seed in 0..8 {
            let mut r = rain(24, 40, 0.08, seed);
            r.seed_drops();
            assert_eq!(r.matrix().drop_count(), r.matrix().count_role(Role::Drop));
            for _ in 0..120 {
                r.apply_noise(0.05);
                r.update();
                assert_eq!(r.matrix().drop_count(), r.matrix().count_role(Role::Drop));
            }
        }
    }

    #[test]
    fn none_cells_never_carry_a_tail() {
        let mut r = rain(16, 16, 0.1, 5);
        r.seed_drops();
        for _ in 0..60 {
            r.update();
            for c in r.matrix().cells() {
                if c.role() == Role::None {
                    assert_eq!(c.tail(), 0);
                }
            }
        }
    }

    #[test]
    fn bottom_drop_exits_and_column_shifts() {
        let mut r = rain(10, 1, 0.05, 1);
        assert!(r.add_drop(9, 0, 3));
        assert_eq!(r.matrix().drop_count(), 1);
        let before = column(&r, 0);

        assert_eq!(r.advance_one_step(), 1);
        assert_eq!(r.matrix().drop_count(), 0);

        let after = column(&r, 0);
        for row in 1..10 {
            assert_eq!(after[row].role(), before[row - 1].role());
            assert_eq!(after[row].tail(), before[row - 1].tail());
            assert_eq!(after[row].ascii(), before[row].ascii());
        }
        // row 0 was empty before the shift, and a new tail cell is only
        // injected when row 0 held a cell
        assert_eq!(after[0].role(), Role::None);
        assert_eq!(after[9].decode().1, Role::Tail);
        assert_eq!(after[9].tail(), 2);
        assert_eq!(after[8].tail(), 4);
        assert_eq!(after[7].tail(), 5);
    }

    #[test]
    fn partially_emerged_tail_grows_at_the_top() {
        let mut r = rain(10, 1, 0.05, 1);
        r.add_drop(9, 0, 12);
        assert_eq!(r.advance_one_step(), 1);
        assert_eq!(r.matrix().drop_count(), 0);
        let col = column(&r, 0);
        assert_eq!(col[0].role(), Role::Tail);
        assert_eq!(col[0].tail(), 5);
        assert_eq!(col[1].tail(), 4);
    }

    #[test]
    fn tail_emerges_to_its_declared_length_then_stops() {
        let mut r = rain(20, 1, 0.05, 9);
        r.add_drop(0, 0, 10);
        for step in 1..=14 {
            r.advance_one_step();
            let col = column(&r, 0);
            assert_eq!(col[step].role(), Role::Drop);
            let tails = col.iter().filter(|c| c.role() == Role::Tail).count();
            assert_eq!(tails, step.min(10));
        }
    }

    #[test]
    fn a_drop_only_appears_where_one_was_a_row_above() {
        let mut r = rain(30, 20, 0.1, 17);
        r.seed_drops();
        for _ in 0..10 {
            let before = r.matrix().clone();
            r.advance_one_step();
            for row in 0..30 {
                for col in 0..20 {
                    if r.matrix().get(row, col).is_drop() {
                        assert!(row > 0);
                        assert!(before.get(row - 1, col).is_drop());
                    }
                }
            }
        }
    }

    #[test]
    fn tail_shades_never_decrease_away_from_the_drop() {
        let mut r = rain(40, 2, 0.05, 4);
        r.add_drop(10, 0, 25);
        r.add_drop(0, 1, 33);
        for _ in 0..20 {
            r.advance_one_step();
        }
        for col in 0..2 {
            let cells = column(&r, col);
            let head = cells.iter().position(|c| c.is_drop()).unwrap();
            let mut last = 0;
            for c in cells[..head].iter().rev() {
                if c.role() != Role::Tail {
                    break;
                }
                assert!(c.tail() >= last);
                assert!(c.tail() < RAMP as u8);
                last = c.tail();
            }
        }
    }

    #[test]
    fn long_tail_is_cut_at_row_zero() {
        let mut r = rain(10, 3, 0.05, 2);
        r.add_drop(5, 1, 20);
        let col = column(&r, 1);
        assert_eq!(col[5].role(), Role::Drop);
        assert_eq!(col[5].tail(), 20);
        for c in &col[..5] {
            assert_eq!(c.role(), Role::Tail);
        }
        for c in &col[6..] {
            assert_eq!(c.role(), Role::None);
        }
        assert_eq!(r.matrix().count_role(Role::None), 30 - 6);
    }

    #[test]
    fn drop_below_the_bottom_still_draws_its_visible_tail() {
        let mut r = rain(10, 1, 0.05, 2);
        assert!(!r.add_drop(12, 0, 8));
        assert_eq!(r.matrix().drop_count(), 0);
        let col = column(&r, 0);
        for c in &col[4..] {
            assert_eq!(c.role(), Role::Tail);
        }
        for c in &col[..4] {
            assert_eq!(c.role(), Role::None);
        }
    }

    #[test]
    fn tails_do_not_erase_other_drops() {
        let mut r = rain(10, 1, 0.05, 2);
        r.add_drop(3, 0, 8);
        r.add_drop(7, 0, 8);
        assert_eq!(r.matrix().drop_count(), 2);
        assert!(r.matrix().get(3, 0).is_drop());
    }

    #[test]
    fn tail_shade_rounds_up() {
        let r = rain(4, 4, 0.05, 0);
        assert_eq!(r.tail_shade(8, 1), 1);
        assert_eq!(r.tail_shade(8, 4), 3);
        assert_eq!(r.tail_shade(8, 8), 5);
        assert_eq!(r.tail_shade(63, 1), 1);
    }

    #[test]
    fn replenish_adds_missing_over_rows_plus_one() {
        let mut r = rain(10, 10, 0.05, 8);
        assert_eq!(r.replenish_drops(), 1);
        assert_eq!(r.matrix().drop_count(), 1);

        let mut r = rain(2, 50, 0.1, 8);
        assert_eq!(r.replenish_drops(), 6);
        let n = r.matrix().drop_count();
        assert!((1..=6).contains(&n));
        for col in 0..50 {
            assert_ne!(r.matrix().get(1, col).role(), Role::Drop);
        }
    }

    #[test]
    fn replenish_still_adds_one_when_over_target() {
        let mut r = rain(10, 10, 0.01, 8);
        for col in 0..5 {
            r.add_drop(5, col, 8);
        }
        assert_eq!(r.replenish_drops(), 1);
    }

    #[test]
    fn zero_noise_changes_nothing() {
        let mut r = rain(12, 12, 0.05, 21);
        r.seed_drops();
        let before = r.matrix().clone();
        assert_eq!(r.apply_noise(0.0), 0);
        assert_eq!(before.cells(), r.matrix().cells());
    }

    #[test]
    fn full_noise_changes_every_character_but_no_roles() {
        let mut r = rain(12, 12, 0.05, 21);
        r.seed_drops();
        let before = r.matrix().clone();
        assert_eq!(r.apply_noise(1.0), 144);
        for (a, b) in before.cells().iter().zip(r.matrix().cells()) {
            assert_ne!(a.ascii(), b.ascii());
            assert_eq!(a.role(), b.role());
            assert_eq!(a.tail(), b.tail());
        }
        assert_eq!(before.drop_count(), r.matrix().drop_count());
    }

    #[test]
    fn one_and_three_percent_of_a_hundred_cells_are_not_rounded_away() {
        for (ratio, want) in [(0.01, 1), (0.03, 3)] {
            let mut r = rain(10, 10, ratio, 9);
            assert_eq!(r.seed_drops(), want);
            assert_eq!(r.matrix().drop_count(), want);
            assert_eq!(r.apply_noise(ratio), want);
        }
    }

    #[test]
    fn noise_count_is_exact_for_whole_percentages() {
        let ratios = [0.01, 0.02, 0.03, 0.04, 0.05, 0.06, 0.07, 0.08, 0.09, 0.10];
        for (rows, cols) in [(10, 10), (20, 10), (50, 100), (100, 100)] {
            let mut r = rain(rows, cols, 0.05, 21);
            let len = rows as usize * cols as usize;
            for (k, fraction) in (1..).zip(ratios) {
                assert_eq!(
                    r.apply_noise(fraction),
                    len * k / 100,
                    "{rows}x{cols} at {fraction}"
                );
            }
        }
    }

    #[test]
    fn render_projects_roles_to_shades() {
        let mut r = rain(10, 2, 0.05, 13);
        r.add_drop(4, 0, 8);
        let strokes: Vec<Stroke> = r.render().collect();
        assert_eq!(strokes.len(), 20);
        assert_eq!(strokes, r.render().collect::<Vec<_>>());

        let head = r.matrix().get(4, 0);
        assert_eq!(strokes[4 * 2].ch, char::from(head.ascii()));
        assert_eq!(strokes[4 * 2].shade, Some(0));
        assert_eq!(strokes[3 * 2].shade, Some(r.matrix().get(3, 0).tail()));
        assert_eq!(
            strokes[4 * 2 + 1],
            Stroke {
                ch: ' ',
                shade: None
            }
        );
    }

    #[test]
    fn empty_grid_is_inert() {
        let mut r = rain(0, 0, 0.1, 1);
        assert_eq!(r.seed_drops(), 0);
        assert_eq!(r.replenish_drops(), 0);
        assert_eq!(r.update(), 0);
        assert_eq!(r.apply_noise(1.0), 0);
        assert_eq!(r.render().count(), 0);
        assert_eq!(r.matrix().drop_count(), 0);
    }

    #[test]
    fn resize_rebuilds_and_seeds() {
        let mut r = rain(10, 10, 0.05, 30);
        r.update();
        r.resize(20, 30).unwrap();
        assert_eq!(r.matrix().rows(), 20);
        assert_eq!(r.matrix().cols(), 30);
        assert_eq!(r.matrix().drop_count(), 30);
        assert_eq!(r.matrix().count_role(Role::Drop), 30);
    }

    #[test]
    fn same_seed_same_rain() {
        let mut a = rain(15, 25, 0.05, 1234);
        let mut b = rain(15, 25, 0.05, 1234);
        for _ in 0..50 {
            a.apply_noise(0.02);
            a.update();
            b.apply_noise(0.02);
            b.update();
        }
        assert_eq!(a.dump(Layer::Ascii), b.dump(Layer::Ascii));
        assert_eq!(a.dump(Layer::Tail), b.dump(Layer::Tail));
    }
}

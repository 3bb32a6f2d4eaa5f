// Copyright (c) 2026 rezky_nightky

use rand::Rng;
use thiserror::Error;

use crate::cell::{random_ascii, Cell, Role};

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("out of memory allocating a {rows}x{cols} matrix")]
    OutOfMemory { rows: u16, cols: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Ascii,
    Role,
    Tail,
}

/// Row-major grid of packed cells.
///
/// `drop_count` is kept in step with the cells by [`Matrix::set`]: every write
/// that turns a cell into a drop, or a drop into something else, adjusts it.
#[derive(Clone, Debug)]
pub struct Matrix {
    cells: Vec<Cell>,
    rows: u16,
    cols: u16,
    drop_count: usize,
    drop_ratio: f32,
}

impl Matrix {
    pub fn new(rows: u16, cols: u16, drop_ratio: f32) -> Result<Self, MatrixError> {
        let len = rows as usize * cols as usize;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| MatrixError::OutOfMemory { rows, cols })?;
        cells.resize(len, Cell::default());
        Ok(Self {
            cells,
            rows,
            cols,
            drop_count: 0,
            drop_ratio,
        })
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn drop_count(&self) -> usize {
        self.drop_count
    }

    pub fn drop_ratio(&self) -> f32 {
        self.drop_ratio
    }

    /// `floor(rows * cols * drop_ratio)`.
    pub fn desired_drops(&self) -> usize {
        (self.cells.len() as f32 * self.drop_ratio) as usize
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.rows as usize || col >= self.cols as usize {
            return None;
        }
        Some(row * self.cols as usize + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.index(row, col)
            .map(|i| self.cells[i])
            .unwrap_or_default()
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if let Some(i) = self.index(row, col) {
            self.replace(i, cell);
        }
    }

    pub(crate) fn get_at(&self, i: usize) -> Cell {
        self.cells.get(i).copied().unwrap_or_default()
    }

    pub(crate) fn set_at(&mut self, i: usize, cell: Cell) {
        if i < self.cells.len() {
            self.replace(i, cell);
        }
    }

    fn replace(&mut self, i: usize, cell: Cell) {
        let was_drop = self.cells[i].is_drop();
        match (was_drop, cell.is_drop()) {
            (false, true) => self.drop_count += 1,
            (true, false) => self.drop_count -= 1,
            _ => {}
        }
        self.cells[i] = cell;
    }

    /// Background static: every cell becomes `None` with a fresh character.
    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for c in &mut self.cells {
            *c = Cell::new(random_ascii(rng), Role::None, 0);
        }
        self.drop_count = 0;
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.cells.iter().filter(|c| c.role() == role).count()
    }

    /// One text line per row showing the requested field of every cell.
    pub fn dump(&self, layer: Layer) -> String {
        let cols = self.cols as usize;
        let mut out = String::with_capacity(self.cells.len() * 2 + self.rows as usize);
        if cols == 0 {
            return out;
        }
        for row in self.cells.chunks(cols) {
            for c in row {
                match layer {
                    Layer::Ascii => out.push(char::from(c.ascii())),
                    Layer::Role => out.push(char::from(b'0' + c.role() as u8)),
                    Layer::Tail => {
                        let t = c.tail();
                        out.push(if t < 10 {
                            char::from(b'0' + t)
                        } else {
                            char::from(b'a' + (t - 10).min(25))
                        });
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

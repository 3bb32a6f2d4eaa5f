// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::palette::Palette;
use crate::rain::Stroke;

/// What ends up in one terminal cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
}

impl Glyph {
    pub fn blank(bg: Option<Color>) -> Self {
        Self {
            ch: ' ',
            fg: None,
            bg,
            bold: false,
        }
    }

    pub fn from_stroke(stroke: Stroke, palette: &Palette) -> Self {
        match stroke.shade {
            None => Self::blank(palette.bg),
            Some(shade) => Self {
                ch: stroke.ch,
                fg: palette.fg(shade),
                bg: palette.bg,
                bold: true,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    cells: Vec<Glyph>,
    dirty_all: bool,
    dirty_map: Vec<bool>,
    dirty: Vec<usize>,
}

impl Frame {
    pub fn new(width: u16, height: u16, bg: Option<Color>) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Glyph::blank(bg); len],
            dirty_all: true,
            dirty_map: vec![false; len],
            dirty: Vec::new(),
        }
    }

    pub fn is_dirty_all(&self) -> bool {
        self.dirty_all
    }

    pub fn dirty_indices(&self) -> &[usize] {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        if self.dirty_all {
            self.dirty_all = false;
            self.dirty_map.fill(false);
        } else {
            for &i in &self.dirty {
                self.dirty_map[i] = false;
            }
        }
        self.dirty.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn glyph(&self, i: usize) -> Glyph {
        self.cells[i]
    }

    #[cfg(test)]
    pub fn get(&self, x: u16, y: u16) -> Option<Glyph> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    fn set_index(&mut self, i: usize, glyph: Glyph) {
        if self.cells[i] == glyph {
            return;
        }
        self.cells[i] = glyph;
        if !self.dirty_all && !self.dirty_map[i] {
            self.dirty_map[i] = true;
            self.dirty.push(i);
        }
    }

    /// Copies a row-major stroke stream into the frame. Extra strokes past
    /// the frame's end are ignored.
    pub fn paint<I>(&mut self, strokes: I, palette: &Palette)
    where
        I: IntoIterator<Item = Stroke>,
    {
        let len = self.cells.len();
        for (i, stroke) in strokes.into_iter().take(len).enumerate() {
            self.set_index(i, Glyph::from_stroke(stroke, palette));
        }
    }
}

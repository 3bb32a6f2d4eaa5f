// Copyright (c) 2026 rezky_nightky

use std::io::{stdout, Result, Stdout, Write};

use crossterm::{
    cursor, event,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, ExecutableCommand, QueueableCommand,
};

use crate::frame::{Frame, Glyph};

/// Pen state of the real terminal, so attributes are only re-sent on change.
#[derive(Default)]
struct Pen {
    fg: Option<Color>,
    bg: Option<Color>,
    bold: bool,
    pos: Option<(u16, u16)>,
}

pub struct Terminal {
    stdout: Stdout,
    size: Option<(u16, u16)>,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        let init_res: Result<()> = (|| {
            out.execute(terminal::EnterAlternateScreen)?;
            out.execute(cursor::Hide)?;
            let _ = out.execute(terminal::DisableLineWrap);
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(ResetColor)?;
            out.execute(terminal::Clear(terminal::ClearType::All))?;
            out.flush()?;
            Ok(())
        })();
        if let Err(e) = init_res {
            restore_terminal_best_effort();
            return Err(e);
        }
        Ok(Self {
            stdout: out,
            size: None,
        })
    }

    pub fn size(&self) -> Result<(u16, u16)> {
        terminal::size()
    }

    pub fn poll_event(timeout: std::time::Duration) -> Result<bool> {
        event::poll(timeout)
    }

    pub fn read_event() -> Result<event::Event> {
        event::read()
    }

    fn put(&mut self, pen: &mut Pen, x: u16, y: u16, glyph: Glyph) -> Result<()> {
        if pen.pos != Some((x, y)) {
            self.stdout.queue(cursor::MoveTo(x, y))?;
        }
        if glyph.fg != pen.fg {
            self.stdout
                .queue(SetForegroundColor(glyph.fg.unwrap_or(Color::Reset)))?;
            pen.fg = glyph.fg;
        }
        if glyph.bg != pen.bg {
            self.stdout
                .queue(SetBackgroundColor(glyph.bg.unwrap_or(Color::Reset)))?;
            pen.bg = glyph.bg;
        }
        if glyph.bold != pen.bold {
            self.stdout.queue(SetAttribute(if glyph.bold {
                Attribute::Bold
            } else {
                Attribute::NormalIntensity
            }))?;
            pen.bold = glyph.bold;
        }
        self.stdout.queue(Print(glyph.ch))?;
        pen.pos = Some((x + 1, y));
        Ok(())
    }

    /// Writes the frame to the screen. A size change, a fully dirty frame or a
    /// large dirty set repaints everything; otherwise only dirty cells move.
    pub fn draw(&mut self, frame: &mut Frame) -> Result<()> {
        let mut pen = Pen::default();
        let width = frame.width as usize;
        let size_changed = self.size != Some((frame.width, frame.height));
        if size_changed {
            self.stdout
                .queue(terminal::Clear(terminal::ClearType::All))?;
            self.size = Some((frame.width, frame.height));
        }

        let dirty_is_large = frame.len() > 0 && frame.dirty_indices().len() >= frame.len() / 3;
        if size_changed || frame.is_dirty_all() || dirty_is_large {
            for i in 0..frame.len() {
                let (x, y) = ((i % width) as u16, (i / width) as u16);
                self.put(&mut pen, x, y, frame.glyph(i))?;
            }
        } else {
            let mut dirty = frame.dirty_indices().to_vec();
            dirty.sort_unstable();
            for i in dirty {
                let (x, y) = ((i % width) as u16, (i / width) as u16);
                self.put(&mut pen, x, y, frame.glyph(i))?;
            }
        }

        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.flush()?;
        frame.clear_dirty();
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        restore_terminal_best_effort();
    }
}

pub fn restore_terminal_best_effort() {
    let mut out = stdout();
    let _ = out.execute(SetAttribute(Attribute::Reset));
    let _ = out.execute(ResetColor);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::EnableLineWrap);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}

// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

/// 8-bit ANSI codes. Index 0 is the drop, the rest fade from the cell right
/// behind the drop to the oldest tail cell.
pub const RAIN_RAMP: [u8; 6] = [231, 48, 41, 35, 29, 238];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Mono,
    Color256,
}

pub fn detect_color_mode() -> ColorMode {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorMode::Mono;
    }
    let term = std::env::var("TERM").unwrap_or_default();
    if term.eq_ignore_ascii_case("dumb") {
        return ColorMode::Mono;
    }
    ColorMode::Color256
}

#[derive(Clone, Debug)]
pub struct Palette {
    pub colors: Vec<Color>,
    pub bg: Option<Color>,
    pub mode: ColorMode,
}

impl Palette {
    pub fn new(ramp: &[u8], bg: Option<u8>, mode: ColorMode) -> Self {
        let mut colors: Vec<Color> = ramp.iter().map(|&v| Color::AnsiValue(v)).collect();
        while colors.len() < 2 {
            colors.push(Color::AnsiValue(RAIN_RAMP[colors.len()]));
        }
        Self {
            colors,
            bg: bg.map(Color::AnsiValue),
            mode,
        }
    }

    pub fn rain(bg: Option<u8>, mode: ColorMode) -> Self {
        Self::new(&RAIN_RAMP, bg, mode)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Foreground for a ramp index. Indices past the end use the faintest
    /// color; mono mode never colors.
    pub fn fg(&self, shade: u8) -> Option<Color> {
        if self.mode == ColorMode::Mono {
            return None;
        }
        let last = self.colors.len() - 1;
        self.colors.get((shade as usize).min(last)).copied()
    }
}

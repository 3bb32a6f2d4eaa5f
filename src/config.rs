// Copyright (c) 2026 rezky_nightky

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::warn;

use crate::matrix::Layer;

pub const DROPS_MIN: f32 = 0.01;
pub const DROPS_MAX: f32 = 0.10;
pub const DROPS_DEF: f32 = 0.01;

pub const ERROR_MIN: f32 = 0.01;
pub const ERROR_MAX: f32 = 0.10;
pub const ERROR_DEF: f32 = 0.02;

pub const SPEED_MIN: f32 = 0.01;
pub const SPEED_MAX: f32 = 1.00;
pub const SPEED_DEF: f32 = 0.10;

const FRAME_BASE_NS: f64 = 100_000_000.0;
const FRAME_SPAN_NS: f64 = 90_000_000.0;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpLayer {
    #[value(name = "ascii")]
    Ascii,
    #[value(name = "state")]
    State,
    #[value(name = "tail")]
    Tail,
}

impl From<DumpLayer> for Layer {
    fn from(v: DumpLayer) -> Self {
        match v {
            DumpLayer::Ascii => Layer::Ascii,
            DumpLayer::State => Layer::Role,
            DumpLayer::Tail => Layer::Tail,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "charrain", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        short = 'b',
        long = "bg",
        help_heading = "APPEARANCE",
        help = "Background color, 8-bit code (min 0 max 255)"
    )]
    pub bg: Option<u8>,

    #[arg(
        short = 'd',
        long = "drops",
        default_value_t = DROPS_DEF,
        help_heading = "RAIN",
        help = "Drops ratio (min 0.01 max 0.10)"
    )]
    pub drops: f32,

    #[arg(
        short = 'e',
        long = "error",
        default_value_t = ERROR_DEF,
        help_heading = "RAIN",
        help = "Error (glitch) ratio (min 0.01 max 0.10)"
    )]
    pub error: f32,

    #[arg(
        short = 's',
        long = "speed",
        default_value_t = SPEED_DEF,
        help_heading = "RAIN",
        help = "Speed factor (min 0.01 max 1.00)"
    )]
    pub speed: f32,

    #[arg(
        short = 'r',
        long = "seed",
        help_heading = "RAIN",
        help = "Seed for the random number generator (random if omitted)"
    )]
    pub seed: Option<u64>,

    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (<=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        long = "log-file",
        help_heading = "GENERAL",
        help = "Append logs to this file (filter with CHARRAIN_LOG)"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "dump",
        value_enum,
        help_heading = "DEBUG",
        help = "Print one cell layer instead of animating, then exit"
    )]
    pub dump: Option<DumpLayer>,

    #[arg(
        long = "steps",
        default_value_t = 0,
        help_heading = "DEBUG",
        help = "Frames to simulate before --dump prints"
    )]
    pub steps: u32,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'V',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

/// Values the frame loop runs with, after capping.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub drops: f32,
    pub error: f32,
    pub speed: f32,
    pub bg: Option<u8>,
    pub duration: Option<Duration>,
}

fn cap(name: &str, v: f32, min: f32, max: f32, def: f32) -> f32 {
    if !v.is_finite() {
        warn!(option = name, value = %v, default = def, "not a finite number, using default");
        return def;
    }
    let capped = v.clamp(min, max);
    if capped != v {
        warn!(option = name, value = v, capped, "value out of range");
    }
    capped
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            drops: cap("--drops", args.drops, DROPS_MIN, DROPS_MAX, DROPS_DEF),
            error: cap("--error", args.error, ERROR_MIN, ERROR_MAX, ERROR_DEF),
            speed: cap("--speed", args.speed, SPEED_MIN, SPEED_MAX, SPEED_DEF),
            bg: args.bg,
            duration: args
                .duration
                .filter(|s| s.is_finite() && *s > 0.0)
                .map(Duration::from_secs_f64),
        }
    }

    /// Pause between frames: 100ms at speed 0, 10ms at speed 1.
    pub fn frame_delay(&self) -> Duration {
        let ns = FRAME_BASE_NS - FRAME_SPAN_NS * self.speed as f64;
        Duration::from_nanos(ns.max(0.0) as u64)
    }
}

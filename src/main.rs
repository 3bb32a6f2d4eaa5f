// Copyright (c) 2026 rezky_nightky

mod cell;
mod config;
mod frame;
mod matrix;
mod palette;
mod rain;
mod runtime;
mod terminal;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use rand::Rng;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{Args, Settings};
use crate::frame::Frame;
use crate::palette::{detect_color_mode, Palette};
use crate::rain::Rain;
use crate::runtime::Control;
use crate::terminal::{restore_terminal_best_effort, Terminal};

const FALLBACK_SIZE: (u16, u16) = (80, 24);

fn init_logging(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter =
        EnvFilter::try_from_env("CHARRAIN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the log subscriber")?;
    Ok(())
}

/// Drains pending terminal events into the control flags.
fn pump_events(control: &Control) -> std::io::Result<()> {
    while Terminal::poll_event(Duration::from_millis(0))? {
        match Terminal::read_event()? {
            Event::Resize(_, _) => control.request_resize(),
            Event::Key(k) if k.kind == KeyEventKind::Press => match (k.code, k.modifiers) {
                (KeyCode::Esc, _) | (KeyCode::Char('q'), _) => control.request_stop(),
                (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                    control.request_stop()
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok(())
}

fn run_dump(args: &Args, settings: &Settings, seed: u64) -> anyhow::Result<()> {
    let Some(layer) = args.dump else {
        return Ok(());
    };
    let (cols, rows) = crossterm::terminal::size().unwrap_or(FALLBACK_SIZE);
    let palette = Palette::rain(settings.bg, detect_color_mode());
    let mut rain = Rain::new(rows, cols, settings.drops, palette.len(), seed)?;
    rain.seed_drops();
    for _ in 0..args.steps {
        rain.apply_noise(settings.error);
        rain.update();
    }
    print!("{}", rain.dump(layer.into()));
    Ok(())
}

fn run(settings: &Settings, seed: u64) -> anyhow::Result<()> {
    let control = Control::new();
    if let Err(e) = control.install() {
        error!("failed to install signal handlers: {}", e);
    }

    let palette = Palette::rain(settings.bg, detect_color_mode());
    let mut term = Terminal::new().context("failed to set up the terminal")?;
    let (cols, rows) = term.size().context("failed to determine terminal size")?;
    info!(cols, rows, seed, "starting");

    let mut rain = Rain::new(rows, cols, settings.drops, palette.len(), seed)?;
    let mut frame = Frame::new(cols, rows, palette.bg);

    let delay = settings.frame_delay();
    let end_time = settings.duration.map(|d| Instant::now() + d);
    let mut next_frame = Instant::now();

    while !control.should_stop() {
        if end_time.is_some_and(|end| Instant::now() >= end) {
            break;
        }

        if control.take_resize() {
            let (cols, rows) = term.size().context("failed to determine terminal size")?;
            rain.resize(rows, cols)?;
            frame = Frame::new(cols, rows, palette.bg);
            info!(cols, rows, "resized");
        }

        frame.paint(rain.render(), &palette);
        term.draw(&mut frame).context("failed to draw frame")?;
        rain.apply_noise(settings.error);
        rain.update();

        next_frame += delay;
        loop {
            pump_events(&control)?;
            let now = Instant::now();
            if control.should_stop() || now >= next_frame {
                break;
            }
            let _ = Terminal::poll_event(next_frame - now)?;
        }
        let now = Instant::now();
        if now > next_frame {
            next_frame = now;
        }
    }

    info!(drops = rain.matrix().drop_count(), "stopping");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    let args = Args::parse();

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {} ({})", env!("CHARRAIN_BUILD"), env!("CHARRAIN_GIT_SHA"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let settings = Settings::from_args(&args);
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    info!(?settings, seed, "configured");

    if args.dump.is_some() {
        return run_dump(&args, &settings, seed);
    }

    run(&settings, seed)
}

// Copyright (c) 2026 rezky_nightky

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Requests from the outside world, checked by the frame loop once per frame.
/// Signal handlers and the input pump only ever set these flags.
#[derive(Clone, Debug, Default)]
pub struct Control {
    stop: Arc<AtomicBool>,
    resize: Arc<AtomicBool>,
}

impl Control {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes termination signals to `stop` and window size changes to
    /// `resize`.
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGWINCH};
        use signal_hook::flag;

        for sig in [SIGINT, SIGQUIT, SIGTERM, SIGHUP] {
            flag::register(sig, Arc::clone(&self.stop))?;
        }
        flag::register(SIGWINCH, Arc::clone(&self.resize))?;
        Ok(())
    }

    #[cfg(windows)]
    pub fn install(&self) -> std::io::Result<()> {
        let stop = Arc::clone(&self.stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .map_err(std::io::Error::other)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn request_resize(&self) {
        self.resize.store(true, Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Consumes a pending resize request.
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::SeqCst)
    }
}

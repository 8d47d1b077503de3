//! Display service thread.
//!
//! Periodically renders a [`StateBoard`] through `tracing` until told to
//! stop. The stop signal is a plain flag flipped by the orchestrator once
//! every worker has been joined.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::info;

use super::StateBoard;
use crate::error::{Error, Result};

/// Handle to a running display thread.
pub struct Display {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl Display {
    /// Start rendering `board` every `interval`.
    pub fn spawn(board: Arc<StateBoard>, interval: Duration) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("mailroom-display".to_string())
            .spawn(move || {
                let mut frames = 0u64;
                while flag.load(Ordering::Acquire) {
                    info!(target: "mailroom::display", "{}", board.render());
                    frames += 1;
                    std::thread::sleep(interval);
                }
                // Final frame so the last state is always shown.
                info!(target: "mailroom::display", "{}", board.render());
                frames + 1
            })?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Flip the stop flag and join the thread. Returns the number of frames
    /// rendered.
    pub fn stop(mut self) -> Result<u64> {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Other("display thread panicked".to_string())),
            None => Ok(0),
        }
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

//! Coalescing timer for persist-and-notify.
//!
//! Every `touch` pushes the deadline out by the quiet period. When the
//! deadline passes with no further touches, the action runs once on the
//! timer thread.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

enum Signal {
    Touch,
    Cancel,
}

pub struct Debouncer {
    tx: Sender<Signal>,
}

impl Debouncer {
    /// Spawn the timer thread.
    pub fn new<F>(quiet: Duration, action: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = unbounded();
        thread::Builder::new()
            .name("penguin-debounce".to_string())
            .spawn(move || run(rx, quiet, action))?;
        Ok(Self { tx })
    }

    /// Restart the quiet period.
    pub fn touch(&self) {
        let _ = self.tx.send(Signal::Touch);
    }

    /// Drop any pending fire and stop the timer thread. Later touches are ignored.
    pub fn cancel(&self) {
        let _ = self.tx.send(Signal::Cancel);
    }
}

fn run<F: Fn()>(rx: Receiver<Signal>, quiet: Duration, action: F) {
    let mut deadline: Option<Instant> = None;

    loop {
        let signal = match deadline {
            Some(at) => match rx.recv_deadline(at) {
                Ok(signal) => Some(signal),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(signal) => Some(signal),
                Err(_) => break,
            },
        };

        match signal {
            Some(Signal::Touch) => deadline = Some(Instant::now() + quiet),
            Some(Signal::Cancel) => break,
            None => {
                deadline = None;
                action();
            }
        }
    }

    debug!(pending = deadline.is_some(), "Debounce timer stopped");
}

//! Wall-clock driver for the encounter timers.
//!
//! A spawned task forwards one [`Tick`] per second over a channel; the
//! receiving side applies ticks to the encounter inside its own event
//! loop. A fixed-schedule interval keeps long sessions from accumulating
//! drift, and because the engine ignores ticks while its clock flag is
//! off, a tick already in flight when the user stops the clock never
//! counts.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// One elapsed second of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Handle to the spawned 1 Hz tick task.
#[derive(Debug)]
pub struct Clock {
    handle: JoinHandle<()>,
}

impl Clock {
    /// Spawn the driver. Ticks arrive on the returned receiver until the
    /// clock is stopped or the receiver is dropped.
    pub fn spawn() -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(1));
            // The first interval tick completes immediately; skip it so
            // the first message lands a full second after spawn.
            timer.tick().await;
            loop {
                timer.tick().await;
                if tx.send(Tick).await.is_err() {
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    /// Stop the driver. No further ticks are produced after this returns.
    pub fn stop(self) {
        self.handle.abort();
    }
}

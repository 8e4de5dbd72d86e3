//! Periodic driver: a Tokio task that advances the scheduler on a timer.

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use roomtick_room::Room;

use crate::{RoomScheduler, RoomtickError};

/// Handle to a running driver task.
///
/// Dropping the handle stops the driver after its current advance.
pub struct DriverHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Stops the driver and waits for the task to exit.
    ///
    /// An advance already in progress runs to completion first. Returns
    /// [`RoomtickError::DriverFailed`] if the task panicked, e.g. because a
    /// room panicked in `step`.
    pub async fn stop(self) -> Result<(), RoomtickError> {
        let _ = self.stop.send(());
        self.task
            .await
            .map_err(|e| RoomtickError::DriverFailed(e.to_string()))
    }

    /// `true` once the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) fn spawn_driver<R: Room>(scheduler: RoomScheduler<R>) -> DriverHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let period = scheduler.fixed_step();

    let task = tokio::spawn(async move {
        let mut interval = time::interval(period);
        // A late tick is pushed back rather than fired in a burst; the
        // accumulator already accounts for the lost time.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            period_ms = period.as_secs_f64() * 1000.0,
            "room driver started"
        );

        loop {
            tokio::select! {
                // Fires on an explicit stop and when the handle is dropped.
                _ = &mut stop_rx => break,
                _ = interval.tick() => {
                    scheduler.advance().await;
                }
            }
        }

        tracing::info!("room driver stopped");
    });

    DriverHandle {
        stop: stop_tx,
        task,
    }
}

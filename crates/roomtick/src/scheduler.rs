//! `RoomScheduler`: the shared handle tying the registry to the stepper.
//!
//! Registry and stepper live behind one `tokio::sync::Mutex`. An advance
//! holds the lock for its whole pass, so a room created or destroyed by a
//! connection handler is either stepped for every step of that pass or for
//! none of them, and two advances can never interleave on the accumulator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use roomtick_room::{JoinOutcome, Room, RoomId, RoomRegistry};
use roomtick_tick::{FixedStepper, StepConfig, StepMetrics, StepPlan, StepPolicy};
use tokio::sync::Mutex;

use crate::driver::{spawn_driver, DriverHandle};
use crate::RoomtickError;

/// State guarded by the scheduler lock.
struct SchedulerState<R: Room> {
    registry: RoomRegistry<R>,
    stepper: FixedStepper,
}

/// What one [`RoomScheduler::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// The steps that were owed and run.
    pub plan: StepPlan,
    /// Rooms stepped by every step of the pass. Counted once, under the
    /// same lock as the steps.
    pub rooms_stepped: usize,
    /// Total `Room::step` calls issued (`plan.steps * rooms_stepped`).
    pub room_steps: u64,
}

/// Builder for a [`RoomScheduler`].
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = RoomScheduler::builder()
///     .update_rate(30)
///     .policy(StepPolicy::Capped { max_steps: 5 })
///     .build::<MyRoom>(config)?;
/// ```
pub struct RoomSchedulerBuilder {
    step_config: StepConfig,
}

impl RoomSchedulerBuilder {
    /// Creates a builder with [`StepConfig::default`].
    pub fn new() -> Self {
        Self {
            step_config: StepConfig::default(),
        }
    }

    /// Sets the number of simulation steps per second.
    ///
    /// Unless a policy is set, the catch-up cap follows the rate (one
    /// second of steps).
    pub fn update_rate(mut self, hz: u32) -> Self {
        self.step_config.update_rate_hz = hz;
        self
    }

    /// Sets the catch-up policy.
    pub fn policy(mut self, policy: StepPolicy) -> Self {
        self.step_config.policy = Some(policy);
        self
    }

    /// Replaces the whole stepper configuration.
    pub fn step_config(mut self, config: StepConfig) -> Self {
        self.step_config = config;
        self
    }

    /// Validates the configuration and builds the scheduler. The clock
    /// starts now.
    pub fn build<R: Room>(self, room_config: R::Config) -> Result<RoomScheduler<R>, RoomtickError> {
        RoomScheduler::new(self.step_config, room_config)
    }
}

impl Default for RoomSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the room registry and the global fixed-step clock.
///
/// Cheap to clone; every clone drives the same rooms and clock. Hand one
/// clone to the periodic driver (see [`start`](Self::start)) and others to
/// whatever handles joins and room teardown.
pub struct RoomScheduler<R: Room> {
    state: Arc<Mutex<SchedulerState<R>>>,
    fixed_step: Duration,
}

impl<R: Room> Clone for RoomScheduler<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            fixed_step: self.fixed_step,
        }
    }
}

impl<R: Room> RoomScheduler<R> {
    /// Creates a new builder.
    pub fn builder() -> RoomSchedulerBuilder {
        RoomSchedulerBuilder::new()
    }

    /// Creates a scheduler with an empty registry. The clock starts now.
    pub fn new(step_config: StepConfig, room_config: R::Config) -> Result<Self, RoomtickError> {
        let stepper = FixedStepper::new(step_config)?;
        let fixed_step = stepper.fixed_step();
        Ok(Self {
            state: Arc::new(Mutex::new(SchedulerState {
                registry: RoomRegistry::new(room_config),
                stepper,
            })),
            fixed_step,
        })
    }

    /// Joins `player` to room `id`, creating the room on first use.
    ///
    /// See [`RoomRegistry::ensure_room`].
    pub async fn ensure_room(&self, id: &RoomId, player: &mut R::Player) -> JoinOutcome {
        let mut state = self.state.lock().await;
        state.registry.ensure_room(id, player)
    }

    /// Runs `f` on room `id`. `None` if there is no such room.
    pub async fn with_room<T>(&self, id: &RoomId, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        let mut state = self.state.lock().await;
        state.registry.get_room_mut(id).map(f)
    }

    /// Removes room `id`. Returns `false` if there was no such room.
    ///
    /// Once this returns, no advance will step the room again.
    pub async fn destroy_room(&self, id: &RoomId) -> bool {
        let removed = {
            let mut state = self.state.lock().await;
            state.registry.destroy_room(id)
        };
        // Dropped outside the lock.
        removed.is_some()
    }

    pub async fn contains_room(&self, id: &RoomId) -> bool {
        self.state.lock().await.registry.contains(id)
    }

    /// Identifiers of all live rooms, in creation order.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.state.lock().await.registry.ids().cloned().collect()
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Samples the clock and runs every owed step on every live room.
    ///
    /// Each step calls `Room::step(fixed_step, real_dt)` on all rooms before
    /// the next step starts; `real_dt` is the wall time since the previous
    /// advance and is the same for every step of this call.
    pub async fn advance(&self) -> StepReport {
        let mut guard = self.state.lock().await;
        let SchedulerState { registry, stepper } = &mut *guard;

        let plan = stepper.advance();
        let rooms_stepped = registry.len();
        let started = Instant::now();
        for _ in 0..plan.steps {
            registry.step_all(plan.fixed_dt, plan.real_dt);
        }
        stepper.record_pass(started.elapsed());

        StepReport {
            plan,
            rooms_stepped,
            room_steps: plan.steps * rooms_stepped as u64,
        }
    }

    /// Stops producing steps until [`resume`](Self::resume). Rooms stay
    /// registered.
    pub async fn pause(&self) {
        self.state.lock().await.stepper.pause();
    }

    /// Resumes stepping without catching up on the paused time.
    pub async fn resume(&self) {
        self.state.lock().await.stepper.resume();
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.stepper.is_paused()
    }

    /// Time carried over to the next advance.
    pub async fn accumulator(&self) -> Duration {
        self.state.lock().await.stepper.accumulator()
    }

    /// Snapshot of stepper metrics.
    pub async fn metrics(&self) -> StepMetrics {
        self.state.lock().await.stepper.metrics().clone()
    }

    /// The constant simulated time per step.
    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    /// Spawns the periodic driver on the current Tokio runtime.
    ///
    /// The driver calls [`advance`](Self::advance) roughly every
    /// [`fixed_step`](Self::fixed_step) and never starts an advance before
    /// the previous one has finished.
    pub fn start(&self) -> DriverHandle {
        spawn_driver(self.clone())
    }
}

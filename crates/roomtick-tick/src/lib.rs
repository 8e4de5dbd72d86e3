//! Fixed-timestep stepper for Roomtick.
//!
//! Converts irregular wall-clock ticks into a deterministic sequence of
//! equal-sized simulation steps. Time not yet consumed by a whole step is
//! carried over in an accumulator, so the number of steps issued over any
//! run of advances depends only on the total elapsed time.
//!
//! The stepper only plans; it never calls rooms itself. The caller runs the
//! returned [`StepPlan`] and reports how long that took via
//! [`FixedStepper::record_pass`]:
//!
//! ```ignore
//! let plan = stepper.advance();
//! let started = std::time::Instant::now();
//! for _ in 0..plan.steps {
//!     registry.step_all(plan.fixed_dt, plan.real_dt);
//! }
//! stepper.record_pass(started.elapsed());
//! ```

mod error;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub use error::TickError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How far an advance is allowed to catch up after a long gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Issue every owed step, however many. Under sustained overload the
    /// number of steps per advance grows without limit.
    Unbounded,
    /// Issue at most `max_steps` per advance and drop the remaining
    /// whole-step debt. The sub-step remainder is kept.
    Capped {
        /// Hard cap on steps issued by a single advance.
        max_steps: u32,
    },
}

/// Full configuration for the stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Simulation steps per second. Must be at least 1.
    pub update_rate_hz: u32,
    /// Catch-up behaviour when more than one step is owed. `None` caps
    /// catch-up at one second of steps at the (clamped) update rate.
    pub policy: Option<StepPolicy>,
    /// Fraction of the fixed step (0.0–1.0) an advance pass may take before
    /// a warning is logged.
    pub budget_warn_threshold: f64,
    /// Enable pass-time metrics. Step counters are always kept.
    pub metrics_enabled: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self::with_rate(Self::DEFAULT_UPDATE_RATE_HZ)
    }
}

impl StepConfig {
    /// Rate used by [`StepConfig::default`].
    pub const DEFAULT_UPDATE_RATE_HZ: u32 = 20;

    /// Maximum supported update rate.
    pub const MAX_UPDATE_RATE_HZ: u32 = 1_000;

    /// Config for a specific rate. The catch-up cap defaults to one second
    /// worth of steps.
    pub fn with_rate(update_rate_hz: u32) -> Self {
        Self {
            update_rate_hz,
            policy: None,
            budget_warn_threshold: 0.80,
            metrics_enabled: true,
        }
    }

    /// Checks and normalizes the config.
    ///
    /// - `update_rate_hz` of 0 is rejected, values above
    ///   [`Self::MAX_UPDATE_RATE_HZ`] are clamped.
    /// - `budget_warn_threshold` is clamped to `0.0..=1.0`.
    /// - `Capped { max_steps: 0 }` is rejected.
    /// - An unset `policy` becomes `Capped` at the clamped rate.
    pub fn validated(mut self) -> Result<Self, TickError> {
        if self.update_rate_hz == 0 {
            return Err(TickError::ZeroRate);
        }
        if self.update_rate_hz > Self::MAX_UPDATE_RATE_HZ {
            warn!(
                rate = self.update_rate_hz,
                max = Self::MAX_UPDATE_RATE_HZ,
                "update_rate_hz exceeds maximum, clamping"
            );
            self.update_rate_hz = Self::MAX_UPDATE_RATE_HZ;
        }
        let policy = self.catch_up_policy();
        if let StepPolicy::Capped { max_steps: 0 } = policy {
            return Err(TickError::ZeroCatchUp);
        }
        self.policy = Some(policy);
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        Ok(self)
    }

    /// The policy in effect: the explicit one, or a cap of `update_rate_hz`
    /// steps when none is set.
    pub fn catch_up_policy(&self) -> StepPolicy {
        self.policy.unwrap_or(StepPolicy::Capped {
            max_steps: self.update_rate_hz.max(1),
        })
    }

    /// Duration of one simulation step (`1s / rate`), or `None` when the
    /// rate is zero.
    pub fn fixed_step(&self) -> Option<Duration> {
        if self.update_rate_hz == 0 {
            None
        } else {
            Some(Duration::from_nanos(
                1_000_000_000 / u64::from(self.update_rate_hz),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Step plan (returned to caller each advance)
// ---------------------------------------------------------------------------

/// The steps owed by one advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    /// Advance number (starts at 1).
    pub tick: u64,
    /// How many fixed steps to run, in order, on every room.
    pub steps: u64,
    /// Simulated time per step. Always the configured fixed step.
    pub fixed_dt: Duration,
    /// Wall time since the previous advance. Identical for every step of
    /// this plan.
    pub real_dt: Duration,
    /// Whole steps discarded by a capped policy (0 in normal operation).
    pub dropped_steps: u64,
}

impl StepPlan {
    /// `true` if no step is owed.
    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the stepper.
///
/// Pass timings refer to the duration reported through
/// [`FixedStepper::record_pass`].
#[derive(Debug, Clone, Default)]
pub struct StepMetrics {
    /// Total advances performed.
    pub total_advances: u64,
    /// Total steps planned.
    pub total_steps: u64,
    /// Total whole steps dropped by a capped policy.
    pub total_dropped: u64,
    /// Largest number of steps planned by a single advance.
    pub max_steps_per_advance: u64,
    /// Exponential moving average of pass time (α = 0.1).
    pub avg_pass_time: Duration,
    /// Longest pass observed.
    pub max_pass_time: Duration,
    /// Last pass time as a fraction of the fixed step. >1.0 means the pass
    /// took longer than the simulated time it produced per step.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Stepper
// ---------------------------------------------------------------------------

/// Accumulator-based fixed-timestep stepper.
///
/// Not designed for concurrent use: one owner calls [`advance`](Self::advance).
#[derive(Debug)]
pub struct FixedStepper {
    config: StepConfig,
    fixed_step: Duration,
    last_sample: Instant,
    accumulator: Duration,
    tick_count: u64,
    paused: bool,
    metrics: StepMetrics,
}

impl FixedStepper {
    /// Creates a stepper whose clock starts now.
    pub fn new(config: StepConfig) -> Result<Self, TickError> {
        Self::starting_at(config, Instant::now())
    }

    /// Creates a stepper whose clock starts at `start`.
    pub fn starting_at(config: StepConfig, start: Instant) -> Result<Self, TickError> {
        let config = config.validated()?;
        let fixed_step = config.fixed_step().ok_or(TickError::ZeroRate)?;

        debug!(
            rate_hz = config.update_rate_hz,
            step_ms = fixed_step.as_secs_f64() * 1000.0,
            policy = ?config.catch_up_policy(),
            "fixed stepper created"
        );

        Ok(Self {
            config,
            fixed_step,
            last_sample: start,
            accumulator: Duration::ZERO,
            tick_count: 0,
            paused: false,
            metrics: StepMetrics::default(),
        })
    }

    /// Samples the clock and plans the steps owed since the last advance.
    pub fn advance(&mut self) -> StepPlan {
        self.advance_to(Instant::now())
    }

    /// Plans the steps owed up to `now`.
    ///
    /// A `now` earlier than the previous sample counts as zero elapsed.
    pub fn advance_to(&mut self, now: Instant) -> StepPlan {
        let elapsed = now.saturating_duration_since(self.last_sample);
        self.last_sample = self.last_sample.max(now);
        self.tick_count += 1;

        if self.paused {
            trace!(tick = self.tick_count, "stepper paused, discarding elapsed time");
            self.metrics.total_advances += 1;
            return self.plan(0, elapsed, 0);
        }

        self.accumulator += elapsed;

        let owed = u64::try_from(self.accumulator.as_nanos() / self.fixed_step.as_nanos())
            .unwrap_or(u64::MAX);
        self.accumulator = self.accumulator.saturating_sub(self.step_span(owed));

        let (steps, dropped) = match self.config.catch_up_policy() {
            StepPolicy::Unbounded => (owed, 0),
            StepPolicy::Capped { max_steps } => {
                let cap = u64::from(max_steps);
                if owed > cap {
                    warn!(
                        tick = self.tick_count,
                        owed,
                        running = cap,
                        dropping = owed - cap,
                        "advance fell behind, catch-up capped at {max_steps}"
                    );
                    (cap, owed - cap)
                } else {
                    (owed, 0)
                }
            }
        };

        self.metrics.total_advances += 1;
        self.metrics.total_steps += steps;
        self.metrics.total_dropped += dropped;
        self.metrics.max_steps_per_advance = self.metrics.max_steps_per_advance.max(steps);

        trace!(
            tick = self.tick_count,
            steps,
            real_ms = elapsed.as_secs_f64() * 1000.0,
            "advance planned"
        );

        self.plan(steps, elapsed, dropped)
    }

    fn plan(&self, steps: u64, real_dt: Duration, dropped_steps: u64) -> StepPlan {
        StepPlan {
            tick: self.tick_count,
            steps,
            fixed_dt: self.fixed_step,
            real_dt,
            dropped_steps,
        }
    }

    /// `steps * fixed_step`, computed in nanoseconds.
    fn step_span(&self, steps: u64) -> Duration {
        let nanos = u128::from(steps) * self.fixed_step.as_nanos();
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Records how long running the last plan took.
    ///
    /// Feeds budget warnings and pass-time metrics. Optional.
    pub fn record_pass(&mut self, elapsed: Duration) {
        let utilization = elapsed.as_secs_f64() / self.fixed_step.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= 1.0 {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                step_ms = self.fixed_step.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "CRITICAL: advance pass exceeded the fixed step"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                step_ms = self.fixed_step.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "advance pass approaching the fixed step"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_pass_time {
                self.metrics.max_pass_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_pass_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_pass_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Stops producing steps. Elapsed time is discarded until
    /// [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "fixed stepper paused");
        }
    }

    /// Resumes stepping from `now`, with an empty accumulator.
    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Resumes stepping from `now`, with an empty accumulator.
    pub fn resume_at(&mut self, now: Instant) {
        if self.paused {
            self.paused = false;
            self.last_sample = now;
            self.accumulator = Duration::ZERO;
            debug!(tick = self.tick_count, "fixed stepper resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The constant simulated time per step.
    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    /// Time carried over to the next advance. Below [`fixed_step`](Self::fixed_step)
    /// after every advance.
    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Number of advances so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn update_rate_hz(&self) -> u32 {
        self.config.update_rate_hz
    }

    pub fn policy(&self) -> StepPolicy {
        self.config.catch_up_policy()
    }

    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    pub fn metrics(&self) -> &StepMetrics {
        &self.metrics
    }
}

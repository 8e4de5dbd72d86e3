//! Integration tests for the fixed-timestep stepper.
//!
//! Most tests drive the stepper with explicit instants so step accounting
//! can be checked exactly. The async tests use `tokio::time::pause()` via
//! `start_paused` to exercise the sampling path deterministically.

use std::time::Duration;

use roomtick_tick::{FixedStepper, StepConfig, StepPolicy, TickError};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// 10 Hz (100 ms step), unbounded catch-up, starting at `start`.
fn stepper_10hz(start: Instant) -> FixedStepper {
    FixedStepper::starting_at(
        StepConfig {
            policy: Some(StepPolicy::Unbounded),
            ..StepConfig::with_rate(10)
        },
        start,
    )
    .unwrap()
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_initial_state() {
    let s = stepper_10hz(Instant::now());
    assert_eq!(s.fixed_step(), ms(100));
    assert_eq!(s.accumulator(), Duration::ZERO);
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.update_rate_hz(), 10);
    assert!(!s.is_paused());
    assert_eq!(s.metrics().total_steps, 0);
}

#[test]
fn test_zero_rate_is_rejected() {
    let err = FixedStepper::new(StepConfig::with_rate(0)).unwrap_err();
    assert_eq!(err, TickError::ZeroRate);
}

// =========================================================================
// Accumulator
// =========================================================================

#[test]
fn test_single_advance_runs_whole_steps_and_keeps_remainder() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    let plan = s.advance_to(t0 + ms(350));
    assert_eq!(plan.tick, 1);
    assert_eq!(plan.steps, 3);
    assert_eq!(plan.fixed_dt, ms(100));
    assert_eq!(plan.real_dt, ms(350));
    assert_eq!(plan.dropped_steps, 0);
    assert_eq!(s.accumulator(), ms(50));
}

#[test]
fn test_short_advance_runs_no_step_but_keeps_debt() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    let plan = s.advance_to(t0 + ms(40));
    assert!(plan.is_empty());
    assert_eq!(s.accumulator(), ms(40));

    // 40 + 70 = 110ms owed → one step, 10ms carried.
    let plan = s.advance_to(t0 + ms(110));
    assert_eq!(plan.steps, 1);
    assert_eq!(plan.real_dt, ms(70));
    assert_eq!(s.accumulator(), ms(10));
}

#[test]
fn test_step_count_depends_only_on_total_elapsed() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    let gaps = [13, 95, 210, 7, 64, 333, 1, 99, 180];
    let mut now = t0;
    let mut steps = 0;
    for gap in gaps {
        now += ms(gap);
        let plan = s.advance_to(now);
        assert_eq!(plan.fixed_dt, ms(100));
        assert!(s.accumulator() < s.fixed_step());
        steps += plan.steps;
    }

    let total: u64 = gaps.iter().sum();
    assert_eq!(steps, total / 100);
    assert_eq!(s.accumulator(), ms(total % 100));
    assert_eq!(s.metrics().total_steps, steps);
    assert_eq!(s.metrics().total_advances, gaps.len() as u64);
}

#[test]
fn test_exact_multiple_drains_to_zero() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    let plan = s.advance_to(t0 + Duration::from_secs(1));
    assert_eq!(plan.steps, 10);
    assert_eq!(s.accumulator(), Duration::ZERO);
}

#[test]
fn test_clock_going_backwards_counts_as_zero() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0 + ms(500));

    let plan = s.advance_to(t0);
    assert_eq!(plan.steps, 0);
    assert_eq!(plan.real_dt, Duration::ZERO);

    // The earlier sample must not rewind the clock.
    let plan = s.advance_to(t0 + ms(600));
    assert_eq!(plan.steps, 1);
}

// =========================================================================
// Catch-up policy
// =========================================================================

#[test]
fn test_unbounded_policy_never_drops() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    let plan = s.advance_to(t0 + Duration::from_secs(60));
    assert_eq!(plan.steps, 600);
    assert_eq!(plan.dropped_steps, 0);
    assert_eq!(s.metrics().max_steps_per_advance, 600);
}

#[test]
fn test_capped_policy_drops_excess_and_keeps_remainder() {
    let t0 = Instant::now();
    let mut s = FixedStepper::starting_at(
        StepConfig {
            policy: Some(StepPolicy::Capped { max_steps: 4 }),
            ..StepConfig::with_rate(10)
        },
        t0,
    )
    .unwrap();

    let plan = s.advance_to(t0 + ms(1_030));
    assert_eq!(plan.steps, 4);
    assert_eq!(plan.dropped_steps, 6);
    assert_eq!(s.accumulator(), ms(30));
    assert_eq!(s.metrics().total_dropped, 6);

    // Next advance starts from the kept remainder only.
    let plan = s.advance_to(t0 + ms(1_100));
    assert_eq!(plan.steps, 1);
    assert_eq!(plan.dropped_steps, 0);
}

#[test]
fn test_default_cap_allows_one_second_of_catch_up() {
    let t0 = Instant::now();
    let mut s = FixedStepper::starting_at(StepConfig::with_rate(10), t0).unwrap();

    assert_eq!(s.advance_to(t0 + Duration::from_secs(1)).steps, 10);
    let plan = s.advance_to(t0 + Duration::from_secs(3));
    assert_eq!(plan.steps, 10);
    assert_eq!(plan.dropped_steps, 10);
}

// =========================================================================
// Pause / Resume
// =========================================================================

#[test]
fn test_pause_discards_elapsed_time() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    s.advance_to(t0 + ms(150));
    s.pause();
    assert!(s.is_paused());

    let plan = s.advance_to(t0 + ms(2_000));
    assert!(plan.is_empty());
    assert_eq!(plan.real_dt, ms(1_850));
}

#[test]
fn test_resume_does_not_burst() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    s.advance_to(t0 + ms(150));
    s.pause();
    s.resume_at(t0 + ms(5_000));
    assert!(!s.is_paused());
    assert_eq!(s.accumulator(), Duration::ZERO);

    let plan = s.advance_to(t0 + ms(5_100));
    assert_eq!(plan.steps, 1);
    assert_eq!(plan.real_dt, ms(100));
}

#[test]
fn test_pause_resume_idempotent() {
    let t0 = Instant::now();
    let mut s = stepper_10hz(t0);

    s.pause();
    s.pause();
    assert!(s.is_paused());

    s.resume_at(t0);
    s.resume_at(t0 + ms(10));
    assert!(!s.is_paused());
}

// =========================================================================
// Pass metrics
// =========================================================================

#[test]
fn test_record_pass_tracks_utilization_and_max() {
    let mut s = stepper_10hz(Instant::now());

    s.record_pass(ms(20));
    assert!((s.metrics().budget_utilization - 0.2).abs() < 1e-9);
    s.record_pass(ms(150));
    assert!(s.metrics().budget_utilization > 1.0);
    s.record_pass(ms(5));

    assert_eq!(s.metrics().max_pass_time, ms(150));
    assert!(s.metrics().avg_pass_time > Duration::ZERO);
}

#[test]
fn test_metrics_disabled_skips_pass_times() {
    let mut s = FixedStepper::new(StepConfig {
        metrics_enabled: false,
        ..StepConfig::with_rate(10)
    })
    .unwrap();

    s.record_pass(ms(30));
    assert_eq!(s.metrics().avg_pass_time, Duration::ZERO);
    assert_eq!(s.metrics().max_pass_time, Duration::ZERO);
}

// =========================================================================
// Clock sampling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_advance_samples_tokio_clock() {
    let mut s = FixedStepper::new(StepConfig {
        policy: Some(StepPolicy::Unbounded),
        ..StepConfig::with_rate(20)
    })
    .unwrap();

    tokio::time::advance(ms(120)).await;
    let plan = s.advance();
    assert_eq!(plan.steps, 2);
    assert_eq!(plan.fixed_dt, ms(50));
    assert_eq!(plan.real_dt, ms(120));
    assert_eq!(s.accumulator(), ms(20));
}

// =========================================================================
// Config (de)serialization
// =========================================================================

#[test]
fn test_config_from_json_fills_defaults() {
    let cfg: StepConfig =
        serde_json::from_str(r#"{ "update_rate_hz": 30, "policy": "unbounded" }"#).unwrap();
    assert_eq!(cfg.update_rate_hz, 30);
    assert_eq!(cfg.policy, Some(StepPolicy::Unbounded));
    assert!(cfg.metrics_enabled);

    let cfg: StepConfig =
        serde_json::from_str(r#"{ "policy": { "capped": { "max_steps": 3 } } }"#).unwrap();
    assert_eq!(cfg.update_rate_hz, StepConfig::DEFAULT_UPDATE_RATE_HZ);
    assert_eq!(cfg.policy, Some(StepPolicy::Capped { max_steps: 3 }));
}

#[test]
fn test_rate_only_json_caps_at_that_rate() {
    let cfg: StepConfig = serde_json::from_str(r#"{ "update_rate_hz": 60 }"#).unwrap();
    assert_eq!(cfg.policy, None);

    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.policy, Some(StepPolicy::Capped { max_steps: 60 }));
}

#[test]
fn test_rate_only_json_allows_one_second_of_catch_up() {
    let cfg: StepConfig = serde_json::from_str(r#"{ "update_rate_hz": 60 }"#).unwrap();
    let t0 = Instant::now();
    let mut s = FixedStepper::starting_at(cfg, t0).unwrap();

    // 60 Hz: ~16.67 ms per step, so 0.5 s owes 30 steps and none are dropped.
    let plan = s.advance_to(t0 + ms(500));
    assert_eq!(plan.steps, 30);
    assert_eq!(plan.dropped_steps, 0);
    assert_eq!(s.policy(), StepPolicy::Capped { max_steps: 60 });
}

#[test]
fn test_clamped_rate_caps_at_max_rate() {
    let s = FixedStepper::new(StepConfig::with_rate(5_000)).unwrap();
    assert_eq!(s.update_rate_hz(), StepConfig::MAX_UPDATE_RATE_HZ);
    assert_eq!(
        s.policy(),
        StepPolicy::Capped {
            max_steps: StepConfig::MAX_UPDATE_RATE_HZ
        }
    );
}

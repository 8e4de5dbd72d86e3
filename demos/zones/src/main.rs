//! Zones demo: a handful of rooms full of bouncing motes, stepped by the
//! global fixed-step driver while simulated players wander in.
//!
//! ```text
//! RUST_LOG=debug cargo run -p zones -- [config.json]
//! ```
//!
//! The optional JSON config may override any of:
//! `{ "step": { "update_rate_hz": 30 }, "zones": ["a", "b"], "players": 6, "run_secs": 4 }`

use std::time::Duration;

use rand::Rng;
use roomtick::prelude::*;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Zone room
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
struct Mote {
    pos: f64,
    vel: f64,
}

#[derive(Clone, Copy, Debug)]
struct ZoneSettings {
    width: f64,
    max_speed: f64,
}

struct Zone {
    tag: RoomTag,
    settings: ZoneSettings,
    motes: Vec<Mote>,
    sim_time: Duration,
    steps: u64,
    worst_real_dt: Duration,
}

struct Wanderer {
    name: String,
    room: Option<RoomTag>,
}

impl Occupant for Wanderer {
    fn current_room(&self) -> Option<&RoomTag> {
        self.room.as_ref()
    }
}

impl Room for Zone {
    type Config = ZoneSettings;
    type Player = Wanderer;

    fn open(seed: RoomSeed, settings: &ZoneSettings) -> Self {
        Self {
            tag: seed.tag,
            settings: *settings,
            motes: Vec::new(),
            sim_time: Duration::ZERO,
            steps: 0,
            worst_real_dt: Duration::ZERO,
        }
    }

    fn tag(&self) -> &RoomTag {
        &self.tag
    }

    fn on_player_join(&mut self, player: &mut Wanderer) {
        let mut rng = rand::rng();
        let ZoneSettings { width, max_speed } = self.settings;
        self.motes.push(Mote {
            pos: rng.random_range(0.0..width),
            vel: rng.random_range(-max_speed..max_speed),
        });
        player.room = Some(self.tag.clone());
        tracing::info!(zone = %self.tag, player = %player.name, "player entered zone");
    }

    fn step(&mut self, fixed_dt: Duration, real_dt: Duration) {
        let dt = fixed_dt.as_secs_f64();
        let width = self.settings.width;
        for mote in &mut self.motes {
            mote.pos += mote.vel * dt;
            if mote.pos < 0.0 || mote.pos > width {
                mote.vel = -mote.vel;
                mote.pos = mote.pos.clamp(0.0, width);
            }
        }
        self.sim_time += fixed_dt;
        self.steps += 1;
        self.worst_real_dt = self.worst_real_dt.max(real_dt);
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    step: StepConfig,
    zones: Vec<String>,
    players: usize,
    run_secs: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            step: StepConfig::default(),
            zones: vec!["meadow".into(), "caverns".into(), "summit".into()],
            players: 8,
            run_secs: 3,
        }
    }
}

fn load_config() -> Result<DemoConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(DemoConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

async fn wander_in(scheduler: RoomScheduler<Zone>, zones: Vec<RoomId>, index: usize) {
    let (delay_ms, zone) = {
        let mut rng = rand::rng();
        (
            rng.random_range(0..500),
            zones[rng.random_range(0..zones.len())].clone(),
        )
    };
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let mut player = Wanderer {
        name: format!("wanderer-{index}"),
        room: None,
    };
    scheduler.ensure_room(&zone, &mut player).await;
    // Asking again for the room we are in does nothing.
    let again = scheduler.ensure_room(&zone, &mut player).await;
    debug_assert_eq!(again, JoinOutcome::AlreadyPresent);
}

async fn run(
    scheduler: &RoomScheduler<Zone>,
    zones: &[RoomId],
    config: &DemoConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wanderers = Vec::with_capacity(config.players);
    for index in 0..config.players {
        wanderers.push(tokio::spawn(wander_in(
            scheduler.clone(),
            zones.to_vec(),
            index,
        )));
    }
    for wanderer in wanderers {
        wanderer.await?;
    }

    let half = Duration::from_secs(config.run_secs) / 2;
    tokio::time::sleep(half).await;

    if let Some(first) = zones.first() {
        if let Some(steps) = scheduler.with_room(first, |zone| zone.steps).await {
            tracing::info!(zone = %first, steps, "closing zone early");
        }
        scheduler.destroy_room(first).await;
    }

    tokio::time::sleep(half).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let zones = config
        .zones
        .iter()
        .map(RoomId::new)
        .collect::<Result<Vec<_>, _>>()?;
    if zones.is_empty() {
        return Err("at least one zone is required".into());
    }

    let scheduler = RoomScheduler::<Zone>::builder()
        .step_config(config.step.clone())
        .build::<Zone>(ZoneSettings {
            width: 100.0,
            max_speed: 12.0,
        })?;
    let driver = scheduler.start();

    tokio::select! {
        result = run(&scheduler, &zones, &config) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    driver.stop().await?;

    for id in scheduler.room_ids().await {
        let summary = scheduler
            .with_room(&id, |zone| {
                (zone.steps, zone.sim_time, zone.worst_real_dt, zone.motes.len())
            })
            .await;
        if let Some((steps, sim_time, worst_real_dt, motes)) = summary {
            tracing::info!(
                zone = %id,
                steps,
                sim_secs = sim_time.as_secs_f64(),
                worst_real_ms = worst_real_dt.as_secs_f64() * 1000.0,
                motes,
                "zone summary"
            );
        }
    }

    let metrics = scheduler.metrics().await;
    tracing::info!(
        advances = metrics.total_advances,
        steps = metrics.total_steps,
        dropped = metrics.total_dropped,
        max_pass_ms = metrics.max_pass_time.as_secs_f64() * 1000.0,
        "scheduler metrics"
    );

    Ok(())
}

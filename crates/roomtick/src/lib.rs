//! # Roomtick
//!
//! Room lifecycle registry and fixed-timestep scheduler for simulation
//! servers.
//!
//! A [`RoomScheduler`] owns every live room and one global clock. A
//! periodic driver calls [`RoomScheduler::advance`], which converts the wall
//! time since the previous call into zero or more equal-sized steps and
//! runs each step on every room. Connection handlers create, join and
//! destroy rooms concurrently through the same handle.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roomtick::prelude::*;
//!
//! let scheduler = RoomScheduler::builder()
//!     .update_rate(20)
//!     .build::<MyRoom>(my_room_config)?;
//! let driver = scheduler.start();
//!
//! scheduler.ensure_room(&RoomId::new("forest")?, &mut player).await;
//! // ...
//! driver.stop().await?;
//! ```

mod driver;
mod error;
mod scheduler;

pub use driver::DriverHandle;
pub use error::RoomtickError;
pub use scheduler::{RoomScheduler, RoomSchedulerBuilder, StepReport};

pub use roomtick_room::{
    JoinOutcome, Occupant, Room, RoomError, RoomId, RoomRegistry, RoomSeed, RoomTag,
};
pub use roomtick_tick::{
    FixedStepper, StepConfig, StepMetrics, StepPlan, StepPolicy, TickError,
};

pub mod prelude {
    pub use crate::{
        DriverHandle, JoinOutcome, Occupant, Room, RoomId, RoomScheduler, RoomSeed, RoomTag,
        RoomtickError, StepConfig, StepPolicy, StepReport,
    };
}

//! Weekly scheduling: cadence evaluation and the engines that drive it.

pub mod cadence;
pub mod engine;

pub use cadence::{CadenceParseError, WeeklyCadence};
pub use engine::{
    build_engine, BackupJob, EngineState, ScheduleEngine, SchedulerKind, WEEKLY_JOB_ID,
};

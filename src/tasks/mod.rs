//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Scheduled warm-up: re-fetches the directory's largest cities at a fixed interval

mod warmup;

pub use warmup::spawn_warmup_task;

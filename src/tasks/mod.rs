//! Background Tasks Module
//!
//! Timer-driven maintenance for a shared cache instance: periodic
//! auto-persistence and expiration sweeping.

mod persist;
mod sweep;

pub use persist::spawn_auto_persist_task;
pub use sweep::spawn_sweep_task;

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! workshop: exclusive-occupancy coordination for a fixed set of workplaces
//!
//! This crate provides:
//! - A `Workshop` coordinator arbitrating exclusive access among concurrent users
//! - Direct workplace exchange, with closed wait-for cycles resolved by rotation
//! - FIFO fairness among waiters and generation-batched admission against starvation

pub mod error;
pub mod id;
pub mod workplace;

mod gate;
mod station;
mod workshop;

// Re-exports
pub use error::WorkshopError;
pub use id::{IdGen, SequentialIdGen, UserId, UuidIdGen, WorkplaceId};
pub use station::Seat;
pub use workplace::Workplace;
pub use workshop::Workshop;

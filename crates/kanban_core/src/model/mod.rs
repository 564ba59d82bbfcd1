//! Domain model for boards, their ordered columns and ordered tasks.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the storage-free sequence algorithm behind every reorder.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Positions inside one scope are dense: `0..N-1`, no gaps, no duplicates.

pub mod board;
pub mod sequence;
pub mod task;
pub mod validation;

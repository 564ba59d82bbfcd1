//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into owner-scoped use-case APIs.
//! - Keep request handlers decoupled from storage details.

pub mod board_service;
pub mod task_service;

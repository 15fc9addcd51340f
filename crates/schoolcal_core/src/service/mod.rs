//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI/transport layers decoupled from storage details.
//!
//! # Invariants
//! - Every event write goes through validation and the shared duplicate
//!   policy in `conflict`.

pub mod conflict;
pub mod event_store;
pub mod sync_engine;
pub mod unit_registry;

//! Domain model for the two-tier school calendar.
//!
//! # Responsibility
//! - Define units (schools) and events with their scope.
//! - Own date parsing and midnight normalization for events.
//!
//! # Invariants
//! - Every unit and event is identified by a stable UUID.
//! - An event's date carries no time-of-day.
//! - An event's scope is either global or one unit; never a magic string.

pub mod event;
pub mod unit;

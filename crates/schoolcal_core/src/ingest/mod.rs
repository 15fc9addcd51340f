//! Spreadsheet ingestion.
//!
//! # Responsibility
//! - Turn uploaded rows into events through the shared duplicate policy.
//!
//! # Invariants
//! - Per batch: `Start -> row(i) -> row(i+1) ... -> Completed`, or stop at
//!   the first invalid row with everything before it kept.

pub mod pipeline;
pub mod row;

pub mod diff;
pub mod engine;
pub mod models;
pub mod run_slot;

pub use engine::ReconciliationEngine;

//! Per-player area-of-interest tracking: the five category sets and the scan
//! loop that keeps them converged with the world.

mod state;
mod tracker;

pub use state::{CategorySet, PlayerInterestState};
pub use tracker::{InterestTracker, TrackerDeps};

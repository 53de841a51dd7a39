pub mod aggregator;
pub mod cache;
pub mod minima;
pub mod models;
pub mod physics;
pub mod planner;
pub mod simulator;
pub mod smoothing;

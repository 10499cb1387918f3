//! WorkNest scheduling client: service clients, the schedule/profile
//! aggregation pipeline, and the refresh loop that keeps a dashboard
//! snapshot current.

pub mod actions;
pub mod audit;
pub mod client;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod refresh;
pub mod week;

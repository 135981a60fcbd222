pub mod config;
pub mod error;
pub mod finnhub;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod server;
pub mod snapshot;

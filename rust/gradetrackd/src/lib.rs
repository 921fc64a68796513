pub mod bridge;
pub mod calc;
pub mod config;
pub mod local;
pub mod model;
pub mod outline;
pub mod store;
pub mod telemetry;

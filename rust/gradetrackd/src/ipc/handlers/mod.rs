pub mod core;
pub mod data;
pub mod grade;
pub mod outline;

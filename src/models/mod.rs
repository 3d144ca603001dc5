pub mod compliance;
pub mod config;
pub mod metric;
pub mod report;
pub mod snapshot;
pub mod workspace;

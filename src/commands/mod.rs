pub mod db;
pub mod ingest;
pub mod report;
pub mod settings;
pub mod workspace;

pub mod bugs;
pub mod compliance;
pub mod normalizer;
pub mod okr;
pub mod scope;
pub mod trend;

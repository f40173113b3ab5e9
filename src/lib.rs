// Modules
pub mod config;
pub mod coverage;
pub mod data;
pub mod errors;
pub mod plots;
pub mod rolling;
pub mod splits;

// Individual classes, and functions
pub use coverage::{calibration_probability, interval_hit_rates, randomized_inclusion};
pub use data::{AllometryData, BoundMatrix};
pub use errors::CoverageError;
pub use splits::{AssembledPredictions, SplitRecord};

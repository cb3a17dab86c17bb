pub mod alerts;
pub mod analyze;
pub mod batch;
pub mod daemon;

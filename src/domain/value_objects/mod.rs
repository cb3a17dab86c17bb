pub mod alert_status;
pub mod alert_type;
pub mod priority;
pub mod thresholds;

pub use alert_status::AlertStatus;
pub use alert_type::AlertType;
pub use priority::Priority;
pub use thresholds::{ThresholdOverrides, ThresholdSet};

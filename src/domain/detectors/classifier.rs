use crate::domain::value_objects::alert_type::AlertType;
use crate::domain::value_objects::priority::Priority;

/// Map a detector's deviation onto a priority.
///
/// `magnitude` is an absolute deviation in percent, except for burn rate
/// where it is the raw actual/expected spend ratio.
#[must_use]
pub fn classify(kind: AlertType, magnitude: f64) -> Priority {
    match kind {
        AlertType::BurnRate => {
            if magnitude >= 1.5 {
                Priority::Critical
            } else if magnitude >= 1.3 {
                Priority::High
            } else {
                Priority::Medium
            }
        }
        k if k.is_high_stakes() => {
            if magnitude >= 60.0 {
                Priority::Critical
            } else if magnitude >= 40.0 {
                Priority::High
            } else {
                Priority::Medium
            }
        }
        _ => {
            if magnitude >= 50.0 {
                Priority::Critical
            } else if magnitude >= 30.0 {
                Priority::High
            } else if magnitude >= 20.0 {
                Priority::Medium
            } else {
                Priority::Low
            }
        }
    }
}

use std::collections::BTreeMap;

pub const READING_NOT_INCREASING: &str = "Current reading must be greater than the previous reading";

/// Outcome of checking a candidate reading against the meter's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(&'static str),
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Pure validation of a meter reading.
///
/// Rules:
/// - the first reading of a meter is always accepted.
/// - otherwise the candidate must be strictly greater than the prior value;
///   an unchanged register is rejected.
pub fn validate_reading(candidate: f64, prior: Option<f64>) -> Verdict {
    match prior {
        None => Verdict::Accept,
        Some(prior) if candidate > prior => Verdict::Accept,
        Some(_) => Verdict::Reject(READING_NOT_INCREASING),
    }
}

/// Per-field messages for a malformed request body, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Shape checks on a submitted register value, independent of history.
pub fn check_register_value(field: &str, value: f64, errors: &mut FieldErrors) {
    if !value.is_finite() {
        push_error(errors, field, "must be a finite number");
    } else if value < 0.0 {
        push_error(errors, field, "must be non-negative");
    }
}

/// Ids coming from clients must reference an existing row, so they are positive.
pub fn check_id(field: &str, value: i32, errors: &mut FieldErrors) {
    if value <= 0 {
        push_error(errors, field, "must be a positive id");
    }
}

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors.entry(field.to_string()).or_default().push(message.to_string());
}

//! Admission check for new cuts against a subject's already-persisted cuts.

use serde::Serialize;

use crate::error::EngineError;
use crate::models::{sanitize, Cut, FULL_WEIGHT};

/// Absorbs float noise such as `33.3 + 33.3 + 33.4`.
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Weight bookkeeping after a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightAllowance {
    pub current_total: f64,
    pub admitted: f64,
    pub remaining: f64,
}

pub fn allocated_weight(existing: &[Cut]) -> f64 {
    existing.iter().map(|cut| sanitize(cut.weight_percent)).sum()
}

pub fn remaining_weight(existing: &[Cut]) -> f64 {
    (FULL_WEIGHT - allocated_weight(existing)).max(0.0)
}

pub fn can_admit(existing: &[Cut], new_weight_percent: f64) -> bool {
    admit(existing, new_weight_percent).is_ok()
}

/// Accepts the new weight when the resulting total stays at or below 100%.
///
/// Subjects that already exceed 100% are left as they are; they simply refuse
/// every further cut.
pub fn admit(existing: &[Cut], new_weight_percent: f64) -> Result<WeightAllowance, EngineError> {
    if !new_weight_percent.is_finite()
        || new_weight_percent <= 0.0
        || new_weight_percent > FULL_WEIGHT
    {
        return Err(EngineError::InvalidWeight(new_weight_percent));
    }

    let current_total = allocated_weight(existing);
    if current_total + new_weight_percent > FULL_WEIGHT + WEIGHT_TOLERANCE {
        return Err(EngineError::WeightOverflow {
            current_total,
            requested: new_weight_percent,
            remaining: (FULL_WEIGHT - current_total).max(0.0),
        });
    }

    Ok(WeightAllowance {
        current_total,
        admitted: new_weight_percent,
        remaining: (FULL_WEIGHT - current_total - new_weight_percent).max(0.0),
    })
}

/// Caller-side validation for grades typed by a user; the engine itself clamps.
pub fn validate_grade(grade: f64) -> Result<f64, EngineError> {
    if grade.is_finite() && (0.0..=5.0).contains(&grade) {
        Ok(grade)
    } else {
        Err(EngineError::InvalidGrade(grade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cuts(weights: &[f64]) -> Vec<Cut> {
        weights
            .iter()
            .enumerate()
            .map(|(index, weight)| Cut::new(format!("Cut {}", index + 1), *weight, None))
            .collect()
    }

    #[test]
    fn rejects_weight_that_overflows() {
        let existing = cuts(&[40.0, 30.0]);
        assert!(!can_admit(&existing, 40.0));

        match admit(&existing, 40.0) {
            Err(EngineError::WeightOverflow {
                current_total,
                requested,
                remaining,
            }) => {
                assert_eq!(current_total, 70.0);
                assert_eq!(requested, 40.0);
                assert_eq!(remaining, 30.0);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn boundary_of_exactly_one_hundred_is_accepted() {
        let existing = cuts(&[40.0, 30.0]);
        let allowance = admit(&existing, 30.0).expect("70 + 30 fits");
        assert_eq!(allowance.current_total, 70.0);
        assert_eq!(allowance.remaining, 0.0);
        assert!(can_admit(&existing, 30.0));
    }

    #[test]
    fn grades_do_not_affect_admission() {
        let mut existing = cuts(&[50.0]);
        existing[0].grade = Some(4.5);
        assert!(can_admit(&existing, 50.0));
        assert!(!can_admit(&existing, 50.5));
    }

    #[test]
    fn thirds_do_not_trip_on_float_noise() {
        let existing = cuts(&[33.3, 33.3]);
        assert!(can_admit(&existing, 33.4));
    }

    #[test]
    fn already_overflowing_subjects_refuse_further_cuts() {
        let existing = cuts(&[80.0, 40.0]);
        match admit(&existing, 1.0) {
            Err(EngineError::WeightOverflow { remaining, .. }) => assert_eq!(remaining, 0.0),
            other => panic!("expected overflow, got {other:?}"),
        }
        assert_eq!(remaining_weight(&existing), 0.0);
    }

    #[test]
    fn non_positive_or_nan_weights_are_invalid() {
        assert_eq!(admit(&[], 0.0), Err(EngineError::InvalidWeight(0.0)));
        assert_eq!(admit(&[], -5.0), Err(EngineError::InvalidWeight(-5.0)));
        assert!(!can_admit(&[], f64::NAN));
    }

    #[test]
    fn validate_grade_flags_out_of_range_values() {
        assert_eq!(validate_grade(4.2), Ok(4.2));
        assert_eq!(validate_grade(5.5), Err(EngineError::InvalidGrade(5.5)));
        assert!(validate_grade(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn admission_matches_weight_sum(
            weights in prop::collection::vec(1u32..60, 0..5),
            requested in 1u32..=100,
        ) {
            let existing: Vec<Cut> = weights
                .iter()
                .map(|weight| Cut::new("cut", f64::from(*weight), None))
                .collect();
            let total: u32 = weights.iter().sum();
            prop_assert_eq!(can_admit(&existing, f64::from(requested)), total + requested <= 100);
        }
    }
}

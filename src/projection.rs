use serde::Serialize;

use crate::grade::{coverage, current_grade};
use crate::models::{clamp_grade, Subject, FULL_WEIGHT, MAX_GRADE};

/// Extrapolation of a subject over the weight that has not been graded yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub current_grade: f64,
    pub covered_weight: f64,
    pub remaining_weight: f64,
    /// Share of full marks earned per percent of graded weight.
    pub rate_per_covered_percent: f64,
    pub projected_final: f64,
    pub min_required_on_remainder: f64,
}

impl Projection {
    pub fn performance_score(&self) -> f64 {
        self.rate_per_covered_percent * MAX_GRADE
    }

    pub fn progress(&self) -> f64 {
        self.covered_weight / FULL_WEIGHT
    }

    pub fn is_decided(&self) -> bool {
        self.remaining_weight <= 0.0
    }
}

/// Assumes the remaining weight keeps the per-percent rate already shown. With
/// nothing graded the projection is 0, the worst case rather than an average.
pub fn project(subject: &Subject, passing_grade: f64) -> Projection {
    let totals = coverage(subject.grading.cuts());
    let current = current_grade(subject);
    let covered_weight = totals.covered_weight.min(FULL_WEIGHT);
    let remaining_weight = totals.remaining_weight();

    let rate_per_covered_percent = if covered_weight > 0.0 {
        totals.points / covered_weight
    } else {
        0.0
    };

    let projected_final = if covered_weight <= 0.0 {
        0.0
    } else if remaining_weight <= 0.0 {
        current
    } else {
        clamp_grade(current + remaining_weight * rate_per_covered_percent)
    };

    let min_required_on_remainder = if remaining_weight > 0.0 {
        (passing_grade - current).max(0.0) / remaining_weight * MAX_GRADE
    } else {
        0.0
    };

    Projection {
        current_grade: current,
        covered_weight,
        remaining_weight,
        rate_per_covered_percent,
        projected_final,
        min_required_on_remainder,
    }
}

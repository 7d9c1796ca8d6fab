use serde::Serialize;

use crate::models::{
    clamp_grade, round_to, sanitize, Cut, Grading, Subject, SubjectStatus, FULL_WEIGHT, MAX_GRADE,
};

/// Accumulated totals over the cuts that already carry a grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Coverage {
    pub covered_weight: f64,
    /// `sum(grade / 5 * weight)`
    pub points: f64,
}

impl Coverage {
    pub fn remaining_weight(&self) -> f64 {
        if self.is_complete() {
            0.0
        } else {
            FULL_WEIGHT - self.covered_weight
        }
    }

    pub fn is_complete(&self) -> bool {
        self.covered_weight >= FULL_WEIGHT - 1e-9
    }
}

pub fn coverage(cuts: &[Cut]) -> Coverage {
    cuts.iter()
        .filter(|cut| cut.is_graded())
        .fold(Coverage::default(), |mut acc, cut| {
            let grade = cut.effective_grade();
            let weight = cut.effective_weight();
            acc.points += (grade / MAX_GRADE) * weight;
            acc.covered_weight += weight;
            acc
        })
}

/// Normalized current grade on the 0-5 scale, rounded to one decimal.
pub fn current_grade(subject: &Subject) -> f64 {
    grading_grade(&subject.grading)
}

pub fn grading_grade(grading: &Grading) -> f64 {
    match grading {
        Grading::Components(cuts) => {
            let totals = coverage(cuts);
            if totals.covered_weight > 0.0 {
                round_to(totals.points / totals.covered_weight * MAX_GRADE, 1)
            } else {
                0.0
            }
        }
        Grading::Direct(value) => round_to(normalize_direct_grade(*value), 1),
        Grading::Ungraded => 0.0,
    }
}

/// Values above 5 are read as percentages and mapped onto the 0-5 scale.
pub fn normalize_direct_grade(value: f64) -> f64 {
    let value = sanitize(value);
    if value > MAX_GRADE {
        clamp_grade(value / FULL_WEIGHT * MAX_GRADE)
    } else {
        value
    }
}

/// `sum(grade * weight) / 100` over every cut, graded or not.
///
/// Agrees with [`current_grade`] only once the graded cuts cover 100% of the
/// weight. Kept for screens that still display it.
#[deprecated(note = "inconsistent with current_grade below full coverage; use current_grade")]
pub fn weighted_sum_grade(cuts: &[Cut]) -> f64 {
    let total: f64 = cuts
        .iter()
        .map(|cut| cut.effective_grade() * cut.effective_weight())
        .sum();
    round_to(total / FULL_WEIGHT, 1)
}

pub fn subject_status(subject: &Subject, passing_grade: f64) -> SubjectStatus {
    let grade = current_grade(subject);
    match &subject.grading {
        Grading::Components(cuts) => {
            let totals = coverage(cuts);
            if totals.covered_weight <= 0.0 {
                SubjectStatus::Pending
            } else if !totals.is_complete() {
                SubjectStatus::InProgress
            } else {
                pass_or_fail(grade, passing_grade)
            }
        }
        Grading::Direct(_) if grade > 0.0 => pass_or_fail(grade, passing_grade),
        Grading::Direct(_) | Grading::Ungraded => SubjectStatus::Pending,
    }
}

fn pass_or_fail(grade: f64, passing_grade: f64) -> SubjectStatus {
    if grade >= passing_grade {
        SubjectStatus::Passed
    } else {
        SubjectStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn subject_with(cuts: Vec<Cut>) -> Subject {
        Subject::new("Calculus", 4, Grading::Components(cuts))
    }

    #[test]
    fn full_coverage_matches_weighted_average() {
        let subject = subject_with(vec![
            Cut::new("Midterm", 50.0, Some(4.0)),
            Cut::new("Final", 50.0, Some(3.0)),
        ]);
        assert_eq!(current_grade(&subject), 3.5);
    }

    #[test]
    fn partial_coverage_normalizes_by_covered_weight() {
        let subject = subject_with(vec![
            Cut::new("Quiz", 20.0, Some(5.0)),
            Cut::new("Midterm", 30.0, Some(2.5)),
            Cut::new("Final", 50.0, None),
        ]);
        // (1.0 * 20 + 0.5 * 30) / 50 * 5 = 3.5
        assert_eq!(current_grade(&subject), 3.5);
    }

    #[test]
    fn no_graded_cuts_yields_zero() {
        let subject = subject_with(vec![
            Cut::new("Midterm", 40.0, None),
            Cut::new("Final", 60.0, Some(0.0)),
        ]);
        assert_eq!(current_grade(&subject), 0.0);
        assert_eq!(subject_status(&subject, 3.0), SubjectStatus::Pending);
    }

    #[test]
    fn direct_grade_on_percentage_scale_is_converted() {
        let percent = Subject::new("Ethics", 2, Grading::Direct(80.0));
        assert_eq!(current_grade(&percent), 4.0);

        let scaled = Subject::new("Ethics", 2, Grading::Direct(4.2));
        assert_eq!(current_grade(&scaled), 4.2);
    }

    #[test]
    fn malformed_direct_grades_clamp() {
        assert_eq!(current_grade(&Subject::new("X", 1, Grading::Direct(-3.0))), 0.0);
        assert_eq!(current_grade(&Subject::new("X", 1, Grading::Direct(f64::NAN))), 0.0);
        assert_eq!(current_grade(&Subject::new("X", 1, Grading::Direct(180.0))), 5.0);
        assert_eq!(current_grade(&Subject::new("X", 1, Grading::Ungraded)), 0.0);
    }

    #[test]
    #[allow(deprecated)]
    fn legacy_sum_only_agrees_at_full_coverage() {
        let partial = vec![Cut::new("Midterm", 50.0, Some(4.0)), Cut::new("Final", 50.0, None)];
        assert_eq!(weighted_sum_grade(&partial), 2.0);
        assert_eq!(current_grade(&subject_with(partial)), 4.0);

        let full = vec![Cut::new("Midterm", 50.0, Some(4.0)), Cut::new("Final", 50.0, Some(3.0))];
        assert_eq!(weighted_sum_grade(&full), current_grade(&subject_with(full)));
    }

    #[test]
    fn status_follows_coverage_and_passing_grade() {
        let in_progress = subject_with(vec![
            Cut::new("Midterm", 40.0, Some(4.0)),
            Cut::new("Final", 60.0, None),
        ]);
        assert_eq!(subject_status(&in_progress, 3.0), SubjectStatus::InProgress);

        let passed = subject_with(vec![Cut::new("Single", 100.0, Some(3.0))]);
        assert_eq!(subject_status(&passed, 3.0), SubjectStatus::Passed);

        let failed = Subject::new("Ethics", 2, Grading::Direct(55.0));
        assert_eq!(subject_status(&failed, 3.0), SubjectStatus::Failed);
    }

    proptest! {
        #[test]
        fn raising_a_grade_never_lowers_current_grade(
            grades in prop::collection::vec(0.1f64..5.0, 1..5),
            index in 0usize..5,
            bump in 0.0f64..2.0,
        ) {
            let weight = 100.0 / grades.len() as f64;
            let cuts: Vec<Cut> = grades.iter().map(|g| Cut::new("cut", weight, Some(*g))).collect();
            let before = current_grade(&subject_with(cuts.clone()));

            let mut raised = cuts;
            let target = index % raised.len();
            raised[target].grade = raised[target].grade.map(|g| (g + bump).min(5.0));
            let after = current_grade(&subject_with(raised));

            prop_assert!(after >= before);
        }

        #[test]
        fn current_grade_is_idempotent_and_bounded(
            grades in prop::collection::vec(prop::option::of(-1.0f64..7.0), 0..6),
            weights in prop::collection::vec(-10.0f64..60.0, 6),
        ) {
            let cuts: Vec<Cut> = grades
                .iter()
                .zip(weights.iter())
                .map(|(g, w)| Cut::new("cut", *w, *g))
                .collect();
            let subject = subject_with(cuts);
            let first = current_grade(&subject);
            prop_assert_eq!(first, current_grade(&subject));
            prop_assert!((0.0..=5.0).contains(&first));
        }
    }
}

//! Credit-weighted roll-ups. Values keep full precision; round only when reporting.

use serde::Serialize;

use crate::grade::{current_grade, normalize_direct_grade};
use crate::models::{round_to, Subject, Term};

/// Running numerator and denominator of a credit-weighted mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CreditTally {
    pub weighted_points: f64,
    pub credits: u64,
}

impl CreditTally {
    /// Ungraded subjects and zero-credit subjects are skipped rather than counted as zero.
    pub fn add(&mut self, grade: f64, credits: u32) {
        if grade > 0.0 && credits > 0 {
            self.weighted_points += grade * f64::from(credits);
            self.credits += u64::from(credits);
        }
    }

    pub fn mean(&self) -> f64 {
        if self.credits == 0 {
            0.0
        } else {
            self.weighted_points / self.credits as f64
        }
    }
}

pub fn term_gpa(subjects: &[Subject]) -> f64 {
    term_tally(subjects).mean()
}

pub fn term_tally(subjects: &[Subject]) -> CreditTally {
    subjects.iter().fold(CreditTally::default(), |mut tally, subject| {
        tally.add(current_grade(subject), subject.credits);
        tally
    })
}

/// Weighted over every qualifying subject in every term, not a mean of term GPAs.
pub fn cumulative_gpa(terms: &[Term]) -> f64 {
    cumulative_tally(terms).mean()
}

pub fn cumulative_tally(terms: &[Term]) -> CreditTally {
    terms
        .iter()
        .flat_map(|term| term.subjects.iter())
        .fold(CreditTally::default(), |mut tally, subject| {
            tally.add(settled_grade(subject), subject.credits);
            tally
        })
}

/// Recorded final grade when present, otherwise the current grade.
pub fn settled_grade(subject: &Subject) -> f64 {
    match subject.final_grade {
        Some(value) if normalize_direct_grade(value) > 0.0 => normalize_direct_grade(value),
        _ => current_grade(subject),
    }
}

pub fn report_gpa(value: f64) -> f64 {
    round_to(value, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cut, Grading};
    use chrono::NaiveDate;

    fn direct(name: &str, credits: u32, grade: f64) -> Subject {
        Subject::new(name, credits, Grading::Direct(grade))
    }

    fn term(name: &str, subjects: Vec<Subject>) -> Term {
        let mut term = Term::new(
            name,
            NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date"),
            false,
        );
        term.subjects = subjects;
        term
    }

    #[test]
    fn huge_credit_counts_do_not_overflow() {
        let subjects = vec![direct("Thesis", u32::MAX, 4.0), direct("Residency", u32::MAX, 2.0)];
        let tally = term_tally(&subjects);
        assert_eq!(tally.credits, 2 * u64::from(u32::MAX));
        assert_eq!(tally.mean(), 3.0);
    }

    #[test]
    fn term_gpa_weights_by_credits() {
        let subjects = vec![direct("Algebra", 4, 4.0), direct("Ethics", 2, 3.0)];
        let gpa = term_gpa(&subjects);
        assert!((gpa - 22.0 / 6.0).abs() < 1e-12);
        assert_eq!(report_gpa(gpa), 3.67);
    }

    #[test]
    fn ungraded_subjects_are_excluded_not_zeroed() {
        let subjects = vec![
            direct("Algebra", 4, 4.0),
            Subject::new("Physics", 3, Grading::Components(vec![Cut::new("Lab", 40.0, None)])),
            Subject::new("Seminar", 1, Grading::Ungraded),
        ];
        assert_eq!(term_gpa(&subjects), 4.0);
        assert_eq!(term_tally(&subjects).credits, 4);
    }

    #[test]
    fn empty_or_ungraded_sets_return_zero() {
        assert_eq!(term_gpa(&[]), 0.0);
        assert_eq!(term_gpa(&[Subject::new("Seminar", 2, Grading::Ungraded)]), 0.0);
        assert_eq!(cumulative_gpa(&[]), 0.0);
    }

    #[test]
    fn zero_credit_subjects_carry_no_weight() {
        let subjects = vec![direct("Algebra", 3, 4.0), direct("Workshop", 0, 1.0)];
        assert_eq!(term_gpa(&subjects), 4.0);
    }

    #[test]
    fn cumulative_gpa_spans_terms_and_prefers_final_grades() {
        let first = term(
            "2025-2",
            vec![direct("Algebra", 4, 3.0).with_final_grade(4.0), direct("Ethics", 2, 3.0)],
        );
        let second = term("2026-1", vec![direct("Calculus", 3, 5.0)]);

        let gpa = cumulative_gpa(&[first, second]);
        // (4 * 4.0 + 2 * 3.0 + 3 * 5.0) / 9
        assert!((gpa - 37.0 / 9.0).abs() < 1e-12);
        assert_eq!(report_gpa(gpa), 4.11);
    }

    #[test]
    fn final_grades_on_percentage_scale_are_normalized() {
        let subject = direct("Algebra", 4, 2.0).with_final_grade(90.0);
        assert_eq!(settled_grade(&subject), 4.5);
    }
}

use std::path::PathBuf;

use groupscholar_academic_risk::gpa::{cumulative_gpa, report_gpa, term_gpa};
use groupscholar_academic_risk::import::{load_terms, ImportError};
use groupscholar_academic_risk::models::{Cut, Grading, Subject, SubjectStatus, Term};
use groupscholar_academic_risk::report::{build_report, standing};
use groupscholar_academic_risk::{
    can_admit, classify, current_grade, project, EngineConfig, RiskLevel, StudySignals,
};

fn sample_csv() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/grades.csv")
}

fn avery_terms() -> Vec<Term> {
    load_terms(&sample_csv(), Some("avery.lee@groupscholar.com")).expect("sample csv loads")
}

#[test]
fn csv_terms_roll_up_into_standing() {
    let terms = avery_terms();
    assert_eq!(terms.len(), 2);

    let summary = standing(&terms, &EngineConfig::default());
    assert_eq!(summary.active_term.as_deref(), Some("2026-1"));
    assert_eq!(summary.subjects.len(), 3);
    // (4 * 1.5 + 3 * 4.3 + 2 * 4.2) / 9
    assert_eq!(summary.term_gpa, 3.03);

    let calculus = &summary.subjects[0];
    assert_eq!(calculus.name, "Calculus");
    assert_eq!(calculus.risk.level, RiskLevel::High);

    let chemistry = summary
        .subjects
        .iter()
        .find(|outlook| outlook.name == "Chemistry")
        .expect("chemistry present");
    assert_eq!(chemistry.current_grade, 4.3);
    assert_eq!(chemistry.status, SubjectStatus::InProgress);
    assert_eq!(chemistry.risk.level, RiskLevel::Low);
}

#[test]
fn csv_with_several_students_needs_an_email() {
    let err = load_terms(&sample_csv(), None).expect_err("two students in the sample");
    assert!(matches!(err, ImportError::MultipleStudents(ref emails) if emails.len() == 2));

    let kiara = load_terms(&sample_csv(), Some("kiara.patel@groupscholar.com")).expect("loads");
    assert_eq!(kiara.len(), 1);
    assert_eq!(kiara[0].subjects.len(), 1);
    assert_eq!(kiara[0].subjects[0].name, "Biology");
}

#[test]
fn cumulative_gpa_uses_final_grades_from_closed_terms() {
    let terms = avery_terms();
    let active = Term::select_active(&terms).expect("active term");
    assert!((term_gpa(&active.subjects) - 27.3 / 9.0).abs() < 1e-9);

    // adds Algebra (final 4.4, 3 credits) and Writing Seminar (76% -> 3.8, 2 credits)
    assert!((cumulative_gpa(&terms) - 48.1 / 16.0).abs() < 1e-9);
}

#[test]
fn report_renders_from_csv_input() {
    let terms = avery_terms();
    let report = build_report(
        Some("avery.lee@groupscholar.com"),
        &terms,
        &EngineConfig::default(),
    );

    assert!(report.contains("- Term GPA: 3.03"));
    assert!(report.contains("### Calculus"));
    assert!(!report.contains("### Chemistry"));
}

#[test]
fn admission_boundary_is_inclusive() {
    let existing = vec![Cut::new("Lab", 40.0, Some(4.0)), Cut::new("Midterm", 30.0, None)];
    assert!(!can_admit(&existing, 40.0));
    assert!(can_admit(&existing, 30.0));
}

#[test]
fn weak_first_cut_scenario_is_high_risk() {
    let subject = Subject::new(
        "Calculus",
        4,
        Grading::Components(vec![Cut::new("Midterm", 30.0, Some(1.5))]),
    );

    assert_eq!(current_grade(&subject), 1.5);
    let projection = project(&subject, 3.0);
    assert_eq!(projection.covered_weight, 30.0);
    assert_eq!(projection.remaining_weight, 70.0);
    assert!((projection.min_required_on_remainder - 1.5 / 70.0 * 5.0).abs() < 1e-9);
    assert_eq!(classify(&subject, &StudySignals::default(), 3.0).level, RiskLevel::High);
}

#[test]
fn term_gpa_example_rounds_for_reporting() {
    let subjects = vec![
        Subject::new("Algebra", 4, Grading::Direct(4.0)),
        Subject::new("Ethics", 2, Grading::Direct(3.0)),
    ];
    assert_eq!(report_gpa(term_gpa(&subjects)), 3.67);
}

#[test]
fn engine_calls_are_repeatable() {
    let terms = avery_terms();
    let config = EngineConfig::default();
    assert_eq!(standing(&terms, &config), standing(&terms, &config));
}

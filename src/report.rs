use std::fmt::Write;

use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::gpa::{cumulative_gpa, report_gpa, term_gpa};
use crate::grade::{current_grade, subject_status};
use crate::models::{round_to, Subject, SubjectStatus, Term};
use crate::projection::{project, Projection};
use crate::risk::{assess_subject, quick_classify, QuickRisk, RiskAssessment, RiskLevel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectOutlook {
    pub subject_id: Uuid,
    pub name: String,
    pub credits: u32,
    pub current_grade: f64,
    pub status: SubjectStatus,
    pub projection: Projection,
    pub risk: RiskAssessment,
    pub quick_risk: QuickRisk,
}

pub fn subject_outlook(subject: &Subject, config: &EngineConfig) -> SubjectOutlook {
    let grade = current_grade(subject);
    SubjectOutlook {
        subject_id: subject.id,
        name: subject.name.clone(),
        credits: subject.credits,
        current_grade: grade,
        status: subject_status(subject, config.passing_grade),
        projection: project(subject, config.passing_grade),
        risk: assess_subject(subject, config.passing_grade),
        quick_risk: quick_classify(grade),
    }
}

/// Outlooks for a term, riskiest first.
pub fn term_outlook(term: &Term, config: &EngineConfig) -> Vec<SubjectOutlook> {
    let mut outlooks: Vec<SubjectOutlook> = term
        .subjects
        .iter()
        .map(|subject| subject_outlook(subject, config))
        .collect();
    outlooks.sort_by(|a, b| {
        b.risk
            .score
            .cmp(&a.risk.score)
            .then_with(|| a.name.cmp(&b.name))
    });
    outlooks
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingSummary {
    pub active_term: Option<String>,
    pub term_gpa: f64,
    pub cumulative_gpa: f64,
    pub subjects: Vec<SubjectOutlook>,
}

pub fn standing(terms: &[Term], config: &EngineConfig) -> StandingSummary {
    let active = Term::select_active(terms);
    StandingSummary {
        active_term: active.map(|term| term.name.clone()),
        term_gpa: report_gpa(active.map(|term| term_gpa(&term.subjects)).unwrap_or(0.0)),
        cumulative_gpa: report_gpa(cumulative_gpa(terms)),
        subjects: active
            .map(|term| term_outlook(term, config))
            .unwrap_or_default(),
    }
}

pub fn build_report(student: Option<&str>, terms: &[Term], config: &EngineConfig) -> String {
    let summary = standing(terms, config);
    let mut output = String::new();
    let student_label = student.unwrap_or("all students");

    let _ = writeln!(output, "# Academic Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} (passing grade {:.1})",
        student_label, config.passing_grade
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Standing");

    match &summary.active_term {
        Some(name) => {
            let _ = writeln!(output, "- Active term: {name}");
            let _ = writeln!(output, "- Term GPA: {:.2}", summary.term_gpa);
        }
        None => {
            let _ = writeln!(output, "- No active term.");
        }
    }
    let _ = writeln!(
        output,
        "- Cumulative GPA: {:.2} across {} term(s)",
        summary.cumulative_gpa,
        terms.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if summary.subjects.is_empty() {
        let _ = writeln!(output, "No subjects recorded for the active term.");
    } else {
        for outlook in &summary.subjects {
            let _ = writeln!(
                output,
                "- {} ({} credits): grade {:.1}, {}, {}",
                outlook.name,
                outlook.credits,
                outlook.current_grade,
                outlook.status.label(),
                projection_line(&outlook.projection)
            );
            let _ = writeln!(
                output,
                "  risk {} (score {})",
                outlook.risk.level.label(),
                outlook.risk.score
            );
        }
    }

    let flagged: Vec<&SubjectOutlook> = summary
        .subjects
        .iter()
        .filter(|outlook| outlook.risk.level == RiskLevel::High)
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## High Risk Factors");

    if flagged.is_empty() {
        let _ = writeln!(output, "No high risk subjects.");
    } else {
        for outlook in flagged {
            let _ = writeln!(output, "### {}", outlook.name);
            for factor in &outlook.risk.factors {
                let _ = writeln!(output, "- +{} {}", factor.points, factor.note);
            }
        }
    }

    output
}

fn projection_line(projection: &Projection) -> String {
    if projection.covered_weight <= 0.0 {
        return "no graded cuts".to_string();
    }
    if projection.is_decided() {
        return "all cuts graded".to_string();
    }

    format!(
        "projected {:.2}, needs {:.2} on remaining {:.0}%",
        round_to(projection.projected_final, 2),
        round_to(projection.min_required_on_remainder, 2),
        projection.remaining_weight
    )
}

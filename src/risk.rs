use serde::Serialize;

use crate::grade::current_grade;
use crate::models::{clamp_fraction, StudySignals, Subject};
use crate::projection::{project, Projection};

const DEFAULT_ATTENDANCE: f64 = 0.9;
const DEFAULT_STUDY_HOURS: f64 = 15.0;
const DEFAULT_COMPLETION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    CurrentPerformance,
    ProjectedFinal,
    RequiredOnRemainder,
    EvaluationProgress,
    CurrentGrade,
    Attendance,
    StudyTime,
    AssignmentCompletion,
}

/// One contribution to the additive score, kept for audit trails in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub kind: RiskFactorKind,
    pub points: u32,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

/// Auxiliary signals after defaults and clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSignals {
    pub attendance_rate: f64,
    pub study_hours_per_week: f64,
    pub assignment_completion: f64,
}

impl ResolvedSignals {
    pub fn from_signals(signals: &StudySignals) -> Self {
        Self {
            attendance_rate: signals
                .attendance_rate
                .filter(|value| value.is_finite())
                .map(clamp_fraction)
                .unwrap_or(DEFAULT_ATTENDANCE),
            study_hours_per_week: signals
                .study_hours_per_week
                .filter(|value| value.is_finite())
                .map(|value| value.max(0.0))
                .unwrap_or(DEFAULT_STUDY_HOURS),
            assignment_completion: signals
                .assignment_completion
                .filter(|value| value.is_finite())
                .map(clamp_fraction)
                .unwrap_or(DEFAULT_COMPLETION),
        }
    }
}

pub fn assess_subject(subject: &Subject, passing_grade: f64) -> RiskAssessment {
    classify(subject, &subject.signals, passing_grade)
}

pub fn classify(subject: &Subject, signals: &StudySignals, passing_grade: f64) -> RiskAssessment {
    let projection = project(subject, passing_grade);
    let mut factors = Vec::new();

    if projection.covered_weight > 0.0 {
        graded_factors(&projection, &mut factors);
    } else {
        let grade = current_grade(subject);
        push_factor(
            &mut factors,
            RiskFactorKind::CurrentGrade,
            current_grade_points(grade),
            format!("current grade {grade:.1} with no graded cuts"),
        );
    }

    let resolved = ResolvedSignals::from_signals(signals);
    push_factor(
        &mut factors,
        RiskFactorKind::Attendance,
        attendance_points(resolved.attendance_rate),
        format!("attendance {:.0}%", resolved.attendance_rate * 100.0),
    );
    push_factor(
        &mut factors,
        RiskFactorKind::StudyTime,
        study_time_points(resolved.study_hours_per_week),
        format!("{:.1} study hours per week", resolved.study_hours_per_week),
    );
    push_factor(
        &mut factors,
        RiskFactorKind::AssignmentCompletion,
        completion_points(resolved.assignment_completion),
        format!(
            "{:.0}% of assignments completed",
            resolved.assignment_completion * 100.0
        ),
    );

    let score = factors.iter().map(|factor| factor.points).sum();

    RiskAssessment {
        score,
        level: level_for_score(score),
        factors,
    }
}

fn graded_factors(projection: &Projection, factors: &mut Vec<RiskFactor>) {
    let performance = projection.performance_score();
    push_factor(
        factors,
        RiskFactorKind::CurrentPerformance,
        performance_points(performance),
        format!("performing at {performance:.2} on graded work"),
    );
    push_factor(
        factors,
        RiskFactorKind::ProjectedFinal,
        projected_final_points(projection.projected_final),
        format!("projected final {:.2}", projection.projected_final),
    );
    push_factor(
        factors,
        RiskFactorKind::RequiredOnRemainder,
        required_points(projection.min_required_on_remainder),
        format!(
            "needs {:.2} on the remaining {:.0}%",
            projection.min_required_on_remainder, projection.remaining_weight
        ),
    );
    push_factor(
        factors,
        RiskFactorKind::EvaluationProgress,
        progress_points(projection.progress()),
        format!("{:.0}% of the weight evaluated", projection.covered_weight),
    );
}

fn push_factor(factors: &mut Vec<RiskFactor>, kind: RiskFactorKind, points: u32, note: String) {
    if points > 0 {
        factors.push(RiskFactor { kind, points, note });
    }
}

pub fn performance_points(score: f64) -> u32 {
    match score {
        s if s < 1.0 => 80,
        s if s < 2.0 => 60,
        s if s < 3.0 => 40,
        s if s < 4.0 => 20,
        _ => 0,
    }
}

pub fn projected_final_points(projected: f64) -> u32 {
    match projected {
        p if p < 2.0 => 50,
        p if p < 2.5 => 35,
        p if p < 3.0 => 20,
        p if p < 3.5 => 10,
        _ => 0,
    }
}

pub fn required_points(required: f64) -> u32 {
    match required {
        r if r > 4.5 => 40,
        r if r > 4.0 => 30,
        r if r > 3.5 => 20,
        r if r > 3.0 => 10,
        r if r > 0.0 => 5,
        _ => 0,
    }
}

pub fn progress_points(progress: f64) -> u32 {
    match progress {
        p if p < 0.3 => 15,
        p if p < 0.5 => 10,
        p if p < 0.7 => 5,
        _ => 0,
    }
}

pub fn current_grade_points(grade: f64) -> u32 {
    match grade {
        g if g < 2.0 => 70,
        g if g < 2.5 => 50,
        g if g < 3.0 => 30,
        g if g < 3.5 => 10,
        _ => 0,
    }
}

pub fn attendance_points(rate: f64) -> u32 {
    match rate {
        r if r < 0.6 => 15,
        r if r < 0.7 => 10,
        r if r < 0.8 => 5,
        _ => 0,
    }
}

pub fn study_time_points(hours: f64) -> u32 {
    match hours {
        h if h < 2.0 => 10,
        h if h < 4.0 => 7,
        h if h < 6.0 => 4,
        _ => 0,
    }
}

pub fn completion_points(fraction: f64) -> u32 {
    match fraction {
        c if c < 0.4 => 10,
        c if c < 0.6 => 6,
        c if c < 0.8 => 3,
        _ => 0,
    }
}

/// 80+ and 60+ both report `high`; 10+ and below 10 both report `low`.
pub fn level_for_score(score: u32) -> RiskLevel {
    match score {
        80.. => RiskLevel::High,
        60..=79 => RiskLevel::High,
        30..=59 => RiskLevel::Medium,
        10..=29 => RiskLevel::Low,
        _ => RiskLevel::Low,
    }
}

/// Grade-threshold classifier used by older display screens.
///
/// Kept apart from [`classify`]: it reads only the current grade and can
/// disagree with the multi-factor label for the same subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickRisk {
    Critical,
    High,
    Moderate,
    Low,
}

impl QuickRisk {
    pub const fn label(self) -> &'static str {
        match self {
            QuickRisk::Critical => "critical",
            QuickRisk::High => "high",
            QuickRisk::Moderate => "moderate",
            QuickRisk::Low => "low",
        }
    }
}

pub fn quick_classify(grade: f64) -> QuickRisk {
    match grade {
        g if g < 1.0 => QuickRisk::Critical,
        g if g < 2.0 => QuickRisk::High,
        g if g < 3.0 => QuickRisk::Moderate,
        _ => QuickRisk::Low,
    }
}

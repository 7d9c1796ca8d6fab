use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_GRADE: f64 = 5.0;

pub const FULL_WEIGHT: f64 = 100.0;

/// One weighted, independently graded slice of a subject ("cut").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub id: Uuid,
    pub name: String,
    pub weight_percent: f64,
    /// `None` or zero means the cut has not been evaluated yet.
    pub grade: Option<f64>,
}

impl Cut {
    pub fn new(name: impl Into<String>, weight_percent: f64, grade: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            weight_percent,
            grade,
        }
    }

    /// Weight clamped to [0, 100]; NaN and negatives count as zero.
    pub fn effective_weight(&self) -> f64 {
        sanitize(self.weight_percent).min(FULL_WEIGHT)
    }

    /// Grade clamped to [0, 5]; a missing grade is zero.
    pub fn effective_grade(&self) -> f64 {
        clamp_grade(self.grade.unwrap_or(0.0))
    }

    pub fn is_graded(&self) -> bool {
        self.effective_grade() > 0.0 && self.effective_weight() > 0.0
    }
}

/// How a subject's grade is supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Grading {
    Components(Vec<Cut>),
    /// A single grade on either the 0-5 or the 0-100 scale.
    Direct(f64),
    Ungraded,
}

impl Grading {
    /// Cuts take priority; the direct grade is used only when there are none.
    pub fn resolve(cuts: Vec<Cut>, direct_grade: Option<f64>) -> Self {
        if !cuts.is_empty() {
            return Grading::Components(cuts);
        }

        match direct_grade {
            Some(value) => Grading::Direct(value),
            None => Grading::Ungraded,
        }
    }

    pub fn cuts(&self) -> &[Cut] {
        match self {
            Grading::Components(cuts) => cuts,
            Grading::Direct(_) | Grading::Ungraded => &[],
        }
    }
}

/// Optional inputs to the risk classifier. Rates are fractions in 0-1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StudySignals {
    pub attendance_rate: Option<f64>,
    pub study_hours_per_week: Option<f64>,
    pub assignment_completion: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub credits: u32,
    pub grading: Grading,
    /// Recorded once the term closes; preferred by cumulative GPA.
    pub final_grade: Option<f64>,
    pub signals: StudySignals,
}

impl Subject {
    pub fn new(name: impl Into<String>, credits: u32, grading: Grading) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            credits,
            grading,
            final_grade: None,
            signals: StudySignals::default(),
        }
    }

    pub fn with_signals(mut self, signals: StudySignals) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_final_grade(mut self, final_grade: f64) -> Self {
        self.final_grade = Some(final_grade);
        self
    }
}

/// Derived label; never authoritative input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    Pending,
    InProgress,
    Passed,
    Failed,
}

impl SubjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubjectStatus::Pending => "pending",
            SubjectStatus::InProgress => "in progress",
            SubjectStatus::Passed => "passed",
            SubjectStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: Uuid,
    pub name: String,
    pub starts_on: NaiveDate,
    pub is_active: bool,
    pub subjects: Vec<Subject>,
}

impl Term {
    pub fn new(name: impl Into<String>, starts_on: NaiveDate, is_active: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            starts_on,
            is_active,
            subjects: Vec::new(),
        }
    }

    /// Picks a single active term even when several are flagged active:
    /// latest start date wins, then name, then id.
    pub fn select_active(terms: &[Term]) -> Option<&Term> {
        terms
            .iter()
            .filter(|term| term.is_active)
            .max_by(|a, b| {
                a.starts_on
                    .cmp(&b.starts_on)
                    .then_with(|| b.name.cmp(&a.name))
                    .then_with(|| b.id.cmp(&a.id))
            })
    }
}

pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub(crate) fn clamp_grade(value: f64) -> f64 {
    sanitize(value).min(MAX_GRADE)
}

pub(crate) fn clamp_fraction(value: f64) -> f64 {
    sanitize(value).min(1.0)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

//! Grade aggregation and academic risk engine.
//!
//! Turns weighted evaluation cuts into a normalized 0-5 grade, projects the
//! final grade, scores failure risk, and rolls grades up into credit-weighted
//! GPAs. Every function here is pure: callers own persistence and re-run the
//! computations after each mutation.

pub mod config;
pub mod cuts;
pub mod error;
pub mod gpa;
pub mod grade;
pub mod import;
pub mod models;
pub mod projection;
pub mod report;
pub mod risk;

pub use config::{AppConfig, ConfigError, EngineConfig, DEFAULT_PASSING_GRADE};
pub use cuts::{admit, can_admit, validate_grade, WeightAllowance};
pub use error::EngineError;
pub use gpa::{cumulative_gpa, report_gpa, term_gpa};
pub use grade::{current_grade, subject_status, Coverage};
pub use models::{Cut, Grading, StudySignals, Subject, SubjectStatus, Term};
pub use projection::{project, Projection};
pub use risk::{assess_subject, classify, quick_classify, QuickRisk, RiskAssessment, RiskLevel};

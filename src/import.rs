//! CSV input: one row per cut, or one row per subject that has no cuts.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Cut, Grading, StudySignals, Subject, Term};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRow {
    pub student_email: String,
    pub term: String,
    pub term_starts_on: NaiveDate,
    pub term_active: bool,
    pub subject: String,
    pub credits: u32,
    pub direct_grade: Option<f64>,
    pub final_grade: Option<f64>,
    pub attendance_rate: Option<f64>,
    pub study_hours_per_week: Option<f64>,
    pub assignment_completion: Option<f64>,
    pub cut: Option<String>,
    pub cut_weight: Option<f64>,
    pub cut_grade: Option<f64>,
}

impl GradeRow {
    pub fn signals(&self) -> StudySignals {
        StudySignals {
            attendance_rate: self.attendance_rate,
            study_hours_per_week: self.study_hours_per_week,
            assignment_completion: self.assignment_completion,
        }
    }

    pub fn cut(&self) -> Option<Cut> {
        let weight = self.cut_weight?;
        let name = self.cut.clone().unwrap_or_else(|| "Cut".to_string());
        Some(Cut::new(name, weight, self.cut_grade))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to read grade rows: {0}")]
    Csv(#[from] csv::Error),
    #[error("rows for {} students found; pass a student email to pick one", .0.len())]
    MultipleStudents(Vec<String>),
    #[error("{student_email} {term}: conflicting {field} values")]
    ConflictingTerm {
        student_email: String,
        term: String,
        field: &'static str,
    },
    #[error("{student_email} {term} {subject}: conflicting {field} values")]
    ConflictingSubject {
        student_email: String,
        term: String,
        subject: String,
        field: &'static str,
    },
}

/// Terms of one student, as grouped from CSV rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentTerms {
    pub student_email: String,
    pub terms: Vec<Term>,
}

pub fn read_rows<R: Read>(reader: R) -> Result<Vec<GradeRow>, ImportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<GradeRow>() {
        rows.push(result?);
    }
    Ok(rows)
}

pub fn load_terms(path: &Path, student_email: Option<&str>) -> Result<Vec<Term>, ImportError> {
    let reader = csv::Reader::from_path(path)?;
    let rows = reader
        .into_deserialize::<GradeRow>()
        .collect::<Result<Vec<_>, _>>()?;
    terms_from_rows(&rows, student_email)
}

/// Terms for one student. Without an email the rows must all belong to the
/// same student.
pub fn terms_from_rows(
    rows: &[GradeRow],
    student_email: Option<&str>,
) -> Result<Vec<Term>, ImportError> {
    let selected: Vec<GradeRow> = rows
        .iter()
        .filter(|row| {
            student_email
                .map(|email| row.student_email.eq_ignore_ascii_case(email))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    let mut students = students_from_rows(&selected)?;
    if students.len() > 1 {
        return Err(ImportError::MultipleStudents(
            students.into_iter().map(|student| student.student_email).collect(),
        ));
    }
    Ok(students.pop().map(|student| student.terms).unwrap_or_default())
}

/// Groups rows by student, term and subject, keeping first-seen order.
///
/// Rows repeating a subject must agree on credits, signals and grades; a
/// blank cell takes the value from another row. Weights are taken as stored.
pub fn students_from_rows(rows: &[GradeRow]) -> Result<Vec<StudentTerms>, ImportError> {
    let mut students: Vec<PendingStudent> = Vec::new();

    for row in rows {
        let email = row.student_email.to_ascii_lowercase();
        let student = match students.iter().position(|student| student.email == email) {
            Some(index) => &mut students[index],
            None => {
                students.push(PendingStudent {
                    email,
                    terms: Vec::new(),
                });
                let last = students.len() - 1;
                &mut students[last]
            }
        };

        let term = match student.terms.iter().position(|term| term.term.name == row.term) {
            Some(index) => {
                let term = &mut student.terms[index];
                if term.term.starts_on != row.term_starts_on {
                    return Err(term_conflict(row, "term_starts_on"));
                }
                if term.term.is_active != row.term_active {
                    return Err(term_conflict(row, "term_active"));
                }
                term
            }
            None => {
                student.terms.push(PendingTerm {
                    term: Term::new(row.term.clone(), row.term_starts_on, row.term_active),
                    subjects: Vec::new(),
                });
                let last = student.terms.len() - 1;
                &mut student.terms[last]
            }
        };

        match term
            .subjects
            .iter()
            .position(|subject| subject.name == row.subject)
        {
            Some(index) => term.subjects[index].absorb(row)?,
            None => term.subjects.push(PendingSubject::from_row(row)),
        }
    }

    Ok(students
        .into_iter()
        .map(|student| StudentTerms {
            student_email: student.email,
            terms: student
                .terms
                .into_iter()
                .map(|pending| {
                    let mut term = pending.term;
                    term.subjects = pending
                        .subjects
                        .into_iter()
                        .map(PendingSubject::into_subject)
                        .collect();
                    term
                })
                .collect(),
        })
        .collect())
}

struct PendingStudent {
    email: String,
    terms: Vec<PendingTerm>,
}

struct PendingTerm {
    term: Term,
    subjects: Vec<PendingSubject>,
}

struct PendingSubject {
    name: String,
    credits: u32,
    cuts: Vec<Cut>,
    direct_grade: Option<f64>,
    final_grade: Option<f64>,
    signals: StudySignals,
}

impl PendingSubject {
    fn from_row(row: &GradeRow) -> Self {
        Self {
            name: row.subject.clone(),
            credits: row.credits,
            cuts: row.cut().into_iter().collect(),
            direct_grade: row.direct_grade,
            final_grade: row.final_grade,
            signals: row.signals(),
        }
    }

    fn absorb(&mut self, row: &GradeRow) -> Result<(), ImportError> {
        if self.credits != row.credits {
            return Err(subject_conflict(row, "credits"));
        }
        let signals = row.signals();
        merge(&mut self.direct_grade, row.direct_grade, row, "direct_grade")?;
        merge(&mut self.final_grade, row.final_grade, row, "final_grade")?;
        merge(
            &mut self.signals.attendance_rate,
            signals.attendance_rate,
            row,
            "attendance_rate",
        )?;
        merge(
            &mut self.signals.study_hours_per_week,
            signals.study_hours_per_week,
            row,
            "study_hours_per_week",
        )?;
        merge(
            &mut self.signals.assignment_completion,
            signals.assignment_completion,
            row,
            "assignment_completion",
        )?;

        if let Some(cut) = row.cut() {
            self.cuts.push(cut);
        }
        Ok(())
    }

    fn into_subject(self) -> Subject {
        let mut subject =
            Subject::new(self.name, self.credits, Grading::resolve(self.cuts, self.direct_grade))
                .with_signals(self.signals);
        subject.final_grade = self.final_grade;
        subject
    }
}

fn merge(
    slot: &mut Option<f64>,
    value: Option<f64>,
    row: &GradeRow,
    field: &'static str,
) -> Result<(), ImportError> {
    match (*slot, value) {
        (Some(current), Some(next)) if current != next => Err(subject_conflict(row, field)),
        (None, next) => {
            *slot = next;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn term_conflict(row: &GradeRow, field: &'static str) -> ImportError {
    ImportError::ConflictingTerm {
        student_email: row.student_email.clone(),
        term: row.term.clone(),
        field,
    }
}

fn subject_conflict(row: &GradeRow, field: &'static str) -> ImportError {
    ImportError::ConflictingSubject {
        student_email: row.student_email.clone(),
        term: row.term.clone(),
        subject: row.subject.clone(),
        field,
    }
}

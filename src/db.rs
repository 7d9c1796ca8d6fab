use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use groupscholar_academic_risk::cuts::{self, WeightAllowance};
use groupscholar_academic_risk::import::{read_rows, students_from_rows, GradeRow};
use groupscholar_academic_risk::models::{Cut, Grading, StudySignals, Subject, Term};
use groupscholar_academic_risk::EngineError;

/// Outcome of trying to persist a new cut.
#[derive(Debug)]
pub enum CutAdmission {
    Admitted {
        cut_id: Uuid,
        allowance: WeightAllowance,
    },
    Rejected(EngineError),
    Duplicate,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub rows: usize,
    pub inserted: usize,
    pub rejected: usize,
    pub duplicates: usize,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@groupscholar.com",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@groupscholar.com",
        ),
    ];

    for (id, name, email) in students {
        upsert_student(pool, id, name, email).await?;
    }

    let subjects = vec![
        (
            "avery.lee@groupscholar.com",
            "2025-2",
            NaiveDate::from_ymd_opt(2025, 8, 4).context("invalid date")?,
            false,
            "Algebra",
            3,
            Some(4.4),
        ),
        (
            "avery.lee@groupscholar.com",
            "2026-1",
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
            true,
            "Calculus",
            4,
            None,
        ),
        (
            "kiara.patel@groupscholar.com",
            "2026-1",
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
            true,
            "Biology",
            3,
            None,
        ),
    ];

    for (email, term, starts_on, is_active, subject, credits, direct_grade) in subjects {
        let row = GradeRow {
            student_email: email.to_string(),
            term: term.to_string(),
            term_starts_on: starts_on,
            term_active: is_active,
            subject: subject.to_string(),
            credits,
            direct_grade,
            final_grade: None,
            attendance_rate: None,
            study_hours_per_week: None,
            assignment_completion: None,
            cut: None,
            cut_weight: None,
            cut_grade: None,
        };
        upsert_subject(pool, &row).await?;
    }

    let cuts = vec![
        ("seed-001", "avery.lee@groupscholar.com", "2026-1", "Calculus", "Midterm", 30.0, Some(1.5)),
        ("seed-002", "avery.lee@groupscholar.com", "2026-1", "Calculus", "Final", 70.0, None),
        ("seed-003", "kiara.patel@groupscholar.com", "2026-1", "Biology", "Lab", 40.0, Some(4.2)),
        ("seed-004", "kiara.patel@groupscholar.com", "2026-1", "Biology", "Exam", 60.0, Some(3.6)),
    ];

    for (source_key, email, term, subject, name, weight, grade) in cuts {
        let subject_id = find_subject(pool, email, term, subject)
            .await?
            .with_context(|| format!("seed subject {subject} missing for {email}"))?;
        add_cut(pool, subject_id, name, weight, grade, Some(source_key)).await?;
    }

    Ok(())
}

/// Persists a cut only if the subject's committed weights leave room for it.
///
/// The subject row is locked so concurrent admissions for the same subject
/// see each other's weights.
pub async fn add_cut(
    pool: &PgPool,
    subject_id: Uuid,
    name: &str,
    weight_percent: f64,
    grade: Option<f64>,
    source_key: Option<&str>,
) -> anyhow::Result<CutAdmission> {
    let mut tx = pool.begin().await?;

    if let Some(key) = source_key {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM academic_risk.cuts WHERE source_key = $1) AS present",
        )
        .bind(key)
        .fetch_one(&mut *tx)
        .await?
        .get("present");

        if exists {
            return Ok(CutAdmission::Duplicate);
        }
    }

    sqlx::query("SELECT id FROM academic_risk.subjects WHERE id = $1 FOR UPDATE")
        .bind(subject_id)
        .fetch_optional(&mut *tx)
        .await?
        .with_context(|| format!("subject {subject_id} not found"))?;

    let existing = cuts_for_subject(&mut tx, subject_id).await?;
    let allowance = match cuts::admit(&existing, weight_percent) {
        Ok(allowance) => allowance,
        Err(err) => {
            tracing::warn!(%subject_id, name, weight_percent, error = %err, "cut rejected");
            return Ok(CutAdmission::Rejected(err));
        }
    };

    let cut_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO academic_risk.cuts (id, subject_id, name, weight_percent, grade, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(cut_id)
    .bind(subject_id)
    .bind(name)
    .bind(weight_percent)
    .bind(grade)
    .bind(source_key)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!(%subject_id, %cut_id, remaining = allowance.remaining, "cut admitted");

    Ok(CutAdmission::Admitted { cut_id, allowance })
}

async fn cuts_for_subject(
    tx: &mut Transaction<'_, Postgres>,
    subject_id: Uuid,
) -> anyhow::Result<Vec<Cut>> {
    let rows = sqlx::query(
        "SELECT id, name, weight_percent, grade FROM academic_risk.cuts WHERE subject_id = $1",
    )
    .bind(subject_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Cut {
            id: row.get("id"),
            name: row.get("name"),
            weight_percent: row.get("weight_percent"),
            grade: row.get("grade"),
        })
        .collect())
}

pub async fn find_subject(
    pool: &PgPool,
    email: &str,
    term: &str,
    subject: &str,
) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query(
        r#"
        SELECT su.id
        FROM academic_risk.subjects su
        JOIN academic_risk.terms t ON t.id = su.term_id
        JOIN academic_risk.students st ON st.id = t.student_id
        WHERE st.email = $1 AND t.name = $2 AND su.name = $3
        "#,
    )
    .bind(email)
    .bind(term)
    .bind(subject)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row.get("id")))
}

/// Loads every term for a student with subjects and cuts attached.
pub async fn fetch_terms(pool: &PgPool, email: &str) -> anyhow::Result<Vec<Term>> {
    let term_rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.starts_on, t.is_active
        FROM academic_risk.terms t
        JOIN academic_risk.students st ON st.id = t.student_id
        WHERE st.email = $1
        ORDER BY t.starts_on, t.name
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    let subject_rows = sqlx::query(
        r#"
        SELECT su.id, su.term_id, su.name, su.credits, su.direct_grade, su.final_grade,
               su.attendance_rate, su.study_hours_per_week, su.assignment_completion
        FROM academic_risk.subjects su
        JOIN academic_risk.terms t ON t.id = su.term_id
        JOIN academic_risk.students st ON st.id = t.student_id
        WHERE st.email = $1
        ORDER BY su.name
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    let cut_rows = sqlx::query(
        r#"
        SELECT c.id, c.subject_id, c.name, c.weight_percent, c.grade
        FROM academic_risk.cuts c
        JOIN academic_risk.subjects su ON su.id = c.subject_id
        JOIN academic_risk.terms t ON t.id = su.term_id
        JOIN academic_risk.students st ON st.id = t.student_id
        WHERE st.email = $1
        ORDER BY c.name
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    let mut cuts_by_subject: HashMap<Uuid, Vec<Cut>> = HashMap::new();
    for row in cut_rows {
        cuts_by_subject
            .entry(row.get("subject_id"))
            .or_default()
            .push(Cut {
                id: row.get("id"),
                name: row.get("name"),
                weight_percent: row.get("weight_percent"),
                grade: row.get("grade"),
            });
    }

    let mut subjects_by_term: HashMap<Uuid, Vec<Subject>> = HashMap::new();
    for row in subject_rows {
        let id: Uuid = row.get("id");
        let credits: i32 = row.get("credits");
        let cuts = cuts_by_subject.remove(&id).unwrap_or_default();
        subjects_by_term
            .entry(row.get("term_id"))
            .or_default()
            .push(Subject {
                id,
                name: row.get("name"),
                credits: u32::try_from(credits).unwrap_or(0),
                grading: Grading::resolve(cuts, row.get("direct_grade")),
                final_grade: row.get("final_grade"),
                signals: StudySignals {
                    attendance_rate: row.get("attendance_rate"),
                    study_hours_per_week: row.get("study_hours_per_week"),
                    assignment_completion: row.get("assignment_completion"),
                },
            });
    }

    let terms = term_rows
        .into_iter()
        .map(|row| {
            let id: Uuid = row.get("id");
            Term {
                id,
                name: row.get("name"),
                starts_on: row.get("starts_on"),
                is_active: row.get("is_active"),
                subjects: subjects_by_term.remove(&id).unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();

    if terms.iter().filter(|term| term.is_active).count() > 1 {
        tracing::warn!(email, "more than one active term; using the most recent");
    }

    Ok(terms)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("unable to open {}", csv_path.display()))?;
    let rows = read_rows(file)?;
    // conflicting subject rows are rejected before anything is written
    students_from_rows(&rows)?;
    let mut summary = ImportSummary {
        rows: rows.len(),
        ..ImportSummary::default()
    };

    for row in rows {
        let subject_id = upsert_subject(pool, &row).await?;
        let Some(cut) = row.cut() else {
            continue;
        };

        let source_key = format!(
            "import:{}:{}:{}:{}",
            row.student_email.to_ascii_lowercase(),
            row.term,
            row.subject,
            cut.name
        );

        match add_cut(
            pool,
            subject_id,
            &cut.name,
            cut.weight_percent,
            cut.grade,
            Some(&source_key),
        )
        .await?
        {
            CutAdmission::Admitted { .. } => summary.inserted += 1,
            CutAdmission::Rejected(_) => summary.rejected += 1,
            CutAdmission::Duplicate => summary.duplicates += 1,
        }
    }

    tracing::info!(
        rows = summary.rows,
        inserted = summary.inserted,
        rejected = summary.rejected,
        duplicates = summary.duplicates,
        "csv import finished"
    );

    Ok(summary)
}

async fn upsert_student(pool: &PgPool, id: Uuid, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO academic_risk.students (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

/// Creates the student, term and subject a row refers to when missing.
async fn upsert_subject(pool: &PgPool, row: &GradeRow) -> anyhow::Result<Uuid> {
    let email = row.student_email.to_ascii_lowercase();
    let student_id = upsert_student(pool, Uuid::new_v4(), &email, &email).await?;

    let term_id: Uuid = sqlx::query(
        r#"
        INSERT INTO academic_risk.terms (id, student_id, name, starts_on, is_active)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_id, name) DO UPDATE
        SET starts_on = EXCLUDED.starts_on, is_active = EXCLUDED.is_active
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(&row.term)
    .bind(row.term_starts_on)
    .bind(row.term_active)
    .fetch_one(pool)
    .await?
    .get("id");

    let credits = i32::try_from(row.credits).context("credits out of range")?;
    let subject_id: Uuid = sqlx::query(
        r#"
        INSERT INTO academic_risk.subjects
        (id, term_id, name, credits, direct_grade, final_grade,
         attendance_rate, study_hours_per_week, assignment_completion)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (term_id, name) DO UPDATE
        SET credits = EXCLUDED.credits,
            direct_grade = COALESCE(EXCLUDED.direct_grade, academic_risk.subjects.direct_grade),
            final_grade = COALESCE(EXCLUDED.final_grade, academic_risk.subjects.final_grade),
            attendance_rate = COALESCE(EXCLUDED.attendance_rate, academic_risk.subjects.attendance_rate),
            study_hours_per_week = COALESCE(EXCLUDED.study_hours_per_week, academic_risk.subjects.study_hours_per_week),
            assignment_completion = COALESCE(EXCLUDED.assignment_completion, academic_risk.subjects.assignment_completion)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(term_id)
    .bind(&row.subject)
    .bind(credits)
    .bind(row.direct_grade)
    .bind(row.final_grade)
    .bind(row.attendance_rate)
    .bind(row.study_hours_per_week)
    .bind(row.assignment_completion)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(subject_id)
}

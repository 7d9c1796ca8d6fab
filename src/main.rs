use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use groupscholar_academic_risk::models::Term;
use groupscholar_academic_risk::report::{self, standing};
use groupscholar_academic_risk::{cuts, import, AppConfig, EngineConfig, EngineError, RiskLevel};

mod db;
mod telemetry;

#[derive(Parser)]
#[command(name = "academic-risk")]
#[command(about = "Grade aggregation and academic risk engine for Group Scholar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import terms, subjects and cuts from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Add a cut to a subject if its weight still fits
    AddCut {
        #[arg(long)]
        email: String,
        #[arg(long)]
        term: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        grade: Option<f64>,
    },
    /// Score subject risk for the active term
    #[command(group(
        ArgGroup::new("source")
            .args(["email", "csv"])
            .required(true)
            .multiple(true)
    ))]
    Score {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show term and cumulative GPA
    #[command(group(
        ArgGroup::new("source")
            .args(["email", "csv"])
            .required(true)
            .multiple(true)
    ))]
    Gpa {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("source")
            .args(["email", "csv"])
            .required(true)
            .multiple(true)
    ))]
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Where terms come from: Postgres by student email, or a CSV file.
#[derive(Args)]
struct SourceArgs {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    passing_grade: Option<f64>,
}

impl SourceArgs {
    fn engine_config(&self, config: &AppConfig) -> anyhow::Result<EngineConfig> {
        match self.passing_grade {
            Some(value) => Ok(EngineConfig::new(value)?),
            None => Ok(config.engine),
        }
    }

    async fn load_terms(&self, config: &AppConfig) -> anyhow::Result<Vec<Term>> {
        if let Some(path) = &self.csv {
            return import::load_terms(path, self.email.as_deref())
                .with_context(|| format!("failed to load {}", path.display()));
        }

        let email = self
            .email
            .as_deref()
            .context("either --email or --csv is required")?;
        let pool = connect(config).await?;
        db::fetch_terms(&pool, email).await
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let summary = db::import_csv(&pool, &csv).await?;
            println!(
                "Imported {} rows from {}: {} cuts inserted, {} rejected, {} already present.",
                summary.rows,
                csv.display(),
                summary.inserted,
                summary.rejected,
                summary.duplicates
            );
        }
        Commands::AddCut {
            email,
            term,
            subject,
            name,
            weight,
            grade,
        } => {
            let grade = grade.map(cuts::validate_grade).transpose()?;
            let pool = connect(&config).await?;
            let subject_id = db::find_subject(&pool, &email, &term, &subject)
                .await?
                .with_context(|| format!("no subject {subject} in term {term} for {email}"))?;

            match db::add_cut(&pool, subject_id, &name, weight, grade, None).await? {
                db::CutAdmission::Admitted { cut_id, allowance } => {
                    println!(
                        "Added {name} ({weight:.1}%) to {subject} as {cut_id}; {:.1}% of the weight remains unallocated.",
                        allowance.remaining
                    );
                }
                db::CutAdmission::Rejected(EngineError::WeightOverflow {
                    current_total,
                    remaining,
                    ..
                }) => {
                    anyhow::bail!(
                        "{subject} already allocates {current_total:.1}%; only {remaining:.1}% remains, so a {weight:.1}% cut does not fit"
                    );
                }
                db::CutAdmission::Rejected(err) => return Err(err.into()),
                db::CutAdmission::Duplicate => println!("Cut already recorded."),
            }
        }
        Commands::Score {
            source,
            limit,
            json,
        } => {
            let engine = source.engine_config(&config)?;
            let terms = source.load_terms(&config).await?;
            let summary = standing(&terms, &engine);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            let Some(active) = &summary.active_term else {
                println!("No active term found.");
                return Ok(());
            };

            println!("Subjects in {active} by risk score:");
            for outlook in summary.subjects.iter().take(limit) {
                let marker = if outlook.risk.level == RiskLevel::High {
                    "!"
                } else {
                    "-"
                };
                println!(
                    "{marker} {} grade {:.1} ({}) projected {:.2} risk {} score {}",
                    outlook.name,
                    outlook.current_grade,
                    outlook.status.label(),
                    outlook.projection.projected_final,
                    outlook.risk.level.label(),
                    outlook.risk.score
                );
            }
        }
        Commands::Gpa { source } => {
            let engine = source.engine_config(&config)?;
            let terms = source.load_terms(&config).await?;
            let summary = standing(&terms, &engine);

            match &summary.active_term {
                Some(active) => println!("Term GPA ({active}): {:.2}", summary.term_gpa),
                None => println!("Term GPA: no active term"),
            }
            println!(
                "Cumulative GPA: {:.2} across {} term(s)",
                summary.cumulative_gpa,
                terms.len()
            );
        }
        Commands::Report { source, out } => {
            let engine = source.engine_config(&config)?;
            let terms = source.load_terms(&config).await?;
            let report = report::build_report(source.email.as_deref(), &terms, &engine);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

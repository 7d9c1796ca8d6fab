use std::env;

use crate::error::EngineError;

pub const DEFAULT_PASSING_GRADE: f64 = 3.0;

/// Institution policy applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub passing_grade: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            passing_grade: DEFAULT_PASSING_GRADE,
        }
    }
}

impl EngineConfig {
    pub fn new(passing_grade: f64) -> Result<Self, EngineError> {
        if passing_grade.is_finite() && passing_grade > 0.0 && passing_grade <= 5.0 {
            Ok(Self { passing_grade })
        } else {
            Err(EngineError::InvalidPassingGrade(passing_grade))
        }
    }
}

/// Process-level settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub engine: EngineConfig,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let engine = match env::var("PASSING_GRADE") {
            Ok(raw) => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::PassingGrade(raw.clone()))?;
                EngineConfig::new(value).map_err(|_| ConfigError::PassingGrade(raw))?
            }
            Err(_) => EngineConfig::default(),
        };

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            engine,
            log_level,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PASSING_GRADE must be a number in (0, 5], got '{0}'")]
    PassingGrade(String),
}

//! Engine and server configuration, plus built-in ranking schemas

use crate::error::RankError;
use crate::types::{FieldSpec, RankingSchema, ScorerKind};
use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Limits applied to every run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Embedding calls in flight at once, across all candidates of a run
    pub max_concurrent_embeddings: usize,
    /// Candidates being scored at once
    pub candidate_concurrency: usize,
    /// Per-call timeout; a timed-out call scores the field's fallback
    pub embed_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_embeddings: 8,
            candidate_concurrency: 16,
            embed_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Read `TALENTRANK_*` overrides; unparsable values keep the default
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_embeddings: env_or(
                "TALENTRANK_MAX_CONCURRENT_EMBEDDINGS",
                defaults.max_concurrent_embeddings,
            )
            .max(1),
            candidate_concurrency: env_or(
                "TALENTRANK_CANDIDATE_CONCURRENCY",
                defaults.candidate_concurrency,
            )
            .max(1),
            embed_timeout: Duration::from_millis(env_or(
                "TALENTRANK_EMBED_TIMEOUT_MS",
                defaults.embed_timeout.as_millis() as u64,
            )),
        }
    }
}

/// Process-level settings for the HTTP server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub schema_path: Option<String>,
    pub embedding_service_url: String,
    /// Vector length of the hash embedder
    pub embed_dimension: usize,
    /// Expected length from the embedding service; 0 accepts what it returns
    pub http_embed_dimension: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            schema_path: None,
            embedding_service_url: "http://127.0.0.1:8083".to_string(),
            embed_dimension: 256,
            http_embed_dimension: 0,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("TALENTRANK_PORT", defaults.port),
            schema_path: std::env::var("TALENTRANK_SCHEMA_PATH").ok(),
            embedding_service_url: std::env::var("EMBEDDING_SERVICE_URL")
                .unwrap_or(defaults.embedding_service_url),
            embed_dimension: env_or("TALENTRANK_EMBED_DIMENSION", defaults.embed_dimension),
            http_embed_dimension: env_or(
                "TALENTRANK_HTTP_EMBED_DIMENSION",
                defaults.http_embed_dimension,
            ),
        }
    }

    /// The configured schema file, or the built-in recruiter schema
    pub fn load_schema(&self) -> Result<RankingSchema> {
        match &self.schema_path {
            Some(path) => RankingSchema::from_path(path),
            None => Ok(RankingSchema::recruiter_default()),
        }
    }
}

impl RankingSchema {
    /// Strict decode (unknown keys and unknown scorer kinds are rejected), then validate
    pub fn from_json_str(json: &str) -> Result<Self, RankError> {
        let schema: RankingSchema = serde_json::from_str(json)
            .map_err(|e| RankError::InvalidSchema(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ranking schema {}", path.display()))?;
        let schema = Self::from_json_str(&json)
            .with_context(|| format!("Invalid ranking schema in {}", path.display()))?;
        Ok(schema)
    }

    /// Mixed scorers, one per field's natural comparison
    pub fn recruiter_default() -> Self {
        Self::new(vec![
            FieldSpec::new("skills", "skills", "skills", ScorerKind::Semantic, 0.3),
            FieldSpec::new("job_title", "job_title", "job_title", ScorerKind::Semantic, 0.2),
            FieldSpec::new(
                "experience",
                "experience_level",
                "experience_level",
                ScorerKind::Ordinal,
                0.2,
            ),
            FieldSpec::new("location", "location", "location", ScorerKind::Exact, 0.1),
            FieldSpec::new(
                "certifications",
                "certifications",
                "certifications",
                ScorerKind::SetOverlap,
                0.05,
            ),
            FieldSpec::new("education", "education", "education", ScorerKind::Semantic, 0.05),
            FieldSpec::new(
                "past_job_titles",
                "job_title",
                "past_job_titles",
                ScorerKind::Semantic,
                0.1,
            ),
        ])
    }

    /// The whole job description compared semantically against every candidate field
    pub fn description_similarity() -> Self {
        let fields = [
            ("skills", 0.3),
            ("job_title", 0.2),
            ("experience", 0.2),
            ("location", 0.1),
            ("certifications", 0.05),
            ("education", 0.05),
            ("past_job_titles", 0.1),
        ]
        .into_iter()
        .map(|(field, weight)| {
            FieldSpec::new(field, "description", field, ScorerKind::Semantic, weight)
        })
        .collect();

        Self::new(fields)
    }
}

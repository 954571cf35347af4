//! Core RankingEngine: scores a candidate batch against one job requirement

use crate::aggregate::{aggregate, rank_entries, round_score};
use crate::cancel::CancelSignal;
use crate::config::EngineConfig;
use crate::embedding::SharedEmbeddingProvider;
use crate::error::{EmbedError, RankError};
use crate::normalize::{list_token_set, normalize, token_set};
use crate::records::{dedupe_candidates, parse_candidates};
use crate::scoring::{
    exact_score, ordinal_score, semantic_score, set_overlap_score, LevelPosition, FALLBACK_SCORE,
};
use crate::types::*;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Main ranking engine (thread-safe via Arc). Holds no state between runs.
pub struct RankingEngine {
    provider: SharedEmbeddingProvider,
    config: EngineConfig,
}

pub type SharedRankingEngine = Arc<RankingEngine>;

/// Per-run choices made by the caller
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub provider_policy: ProviderPolicy,
    pub cancel: Option<CancelSignal>,
}

impl RunOptions {
    pub fn new(provider_policy: ProviderPolicy) -> Self {
        Self {
            provider_policy,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

/// Requirement side of a semantic field, resolved once per run
enum SemanticRequirement {
    Embedded(Vec<f32>),
    Empty,
    Degraded,
    Failed(String),
}

/// A schema field with its requirement value already prepared
enum PreparedField<'s> {
    Semantic {
        spec: &'s FieldSpec,
        requirement: SemanticRequirement,
    },
    Exact {
        spec: &'s FieldSpec,
        requirement: String,
    },
    Ordinal {
        spec: &'s FieldSpec,
        scale: &'s OrdinalScale,
        requirement: String,
    },
    SetOverlap {
        spec: &'s FieldSpec,
        requirement: BTreeSet<String>,
    },
}

/// Read-only state shared by every candidate of one run
struct RunContext<'s> {
    fields: Vec<PreparedField<'s>>,
    weights: Vec<(&'s str, f64)>,
    limiter: Semaphore,
    cancel: Option<CancelSignal>,
}

struct FieldOutcome {
    name: String,
    score: f64,
    fault: Option<FieldFault>,
}

enum CandidateOutcome {
    Scored(CandidateRecord, ScoreBreakdown),
    NotScored,
}

fn field_text(value: Option<FieldValue<'_>>) -> String {
    value.map(|v| v.text().into_owned()).unwrap_or_default()
}

fn field_tokens(value: Option<FieldValue<'_>>) -> BTreeSet<String> {
    match value {
        Some(FieldValue::Text(text)) => token_set(text),
        Some(FieldValue::List(items)) => list_token_set(items),
        None => BTreeSet::new(),
    }
}

fn fault(spec: &FieldSpec, kind: FaultKind, detail: impl Into<String>) -> Option<FieldFault> {
    Some(FieldFault {
        field: spec.name.clone(),
        kind,
        detail: detail.into(),
    })
}

impl RankingEngine {
    /// Create a new engine around an injected embedding provider
    pub fn new(provider: SharedEmbeddingProvider, config: EngineConfig) -> SharedRankingEngine {
        Arc::new(Self { provider, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Rank already-decoded candidate records
    pub async fn rank(
        &self,
        requirement: &JobRequirement,
        candidates: Vec<CandidateRecord>,
        schema: &RankingSchema,
        options: RunOptions,
    ) -> Result<RankedResult, RankError> {
        let received = candidates.len();
        let records = candidates.into_iter().enumerate().collect();
        self.run(requirement, records, Vec::new(), received, schema, options)
            .await
    }

    /// Rank raw candidate rows; rows that cannot be decoded are skipped and reported
    pub async fn rank_raw(
        &self,
        requirement: &JobRequirement,
        rows: Vec<Value>,
        schema: &RankingSchema,
        options: RunOptions,
    ) -> Result<RankedResult, RankError> {
        let received = rows.len();
        let (records, skipped) = parse_candidates(rows);
        self.run(requirement, records, skipped, received, schema, options)
            .await
    }

    async fn run(
        &self,
        requirement: &JobRequirement,
        records: Vec<(usize, CandidateRecord)>,
        mut skipped: Vec<SkippedCandidate>,
        received: usize,
        schema: &RankingSchema,
        options: RunOptions,
    ) -> Result<RankedResult, RankError> {
        let start = Instant::now();

        // Schema faults are fatal before any scoring
        schema.validate()?;

        info!(
            "Ranking {} candidates over {} fields (provider={}, policy={:?})",
            received,
            schema.fields.len(),
            self.provider.name(),
            options.provider_policy
        );

        let (candidates, duplicates) = dedupe_candidates(records);
        skipped.extend(duplicates);
        skipped.sort_by_key(|s| s.index);
        for s in &skipped {
            warn!(index = s.index, id = ?s.id, reason = ?s.reason, "candidate skipped");
        }

        let degenerate_weights = schema.total_weight() <= 0.0;
        if degenerate_weights {
            warn!("all field weights are zero; every total score will be 0.0");
        }

        let semantic_degraded = self
            .check_provider(schema, options.provider_policy)
            .await?;

        let limiter = Semaphore::new(self.config.max_concurrent_embeddings.max(1));
        let fields = self
            .prepare_fields(requirement, schema, semantic_degraded, &limiter)
            .await;

        let ctx = RunContext {
            fields,
            weights: schema.weights(),
            limiter,
            cancel: options.cancel,
        };

        // Candidates are independent; completion order does not matter
        let outcomes: Vec<CandidateOutcome> = stream::iter(candidates)
            .map(|candidate| self.score_candidate(&ctx, candidate))
            .buffer_unordered(self.config.candidate_concurrency.max(1))
            .collect()
            .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut not_scored = 0;
        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Scored(candidate, breakdown) => scored.push((candidate, breakdown)),
                CandidateOutcome::NotScored => not_scored += 1,
            }
        }

        let mut field_faults: BTreeMap<String, usize> = BTreeMap::new();
        for (_, breakdown) in &scored {
            for f in &breakdown.faults {
                *field_faults.entry(f.field.clone()).or_insert(0) += 1;
            }
        }

        // A cancel that lands after the last candidate started still counts as observed
        let cancelled = not_scored > 0 || ctx.cancel.as_ref().is_some_and(|c| c.is_cancelled());
        let entries = rank_entries(scored);

        let summary = RunSummary {
            candidates_received: received,
            candidates_scored: entries.len(),
            candidates_not_scored: not_scored,
            skipped,
            field_faults,
            semantic_degraded,
            degenerate_weights,
            cancelled,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Ranking complete: {} scored, {} skipped, {} not scored, {} field faults in {}ms",
            summary.candidates_scored,
            summary.skipped.len(),
            summary.candidates_not_scored,
            summary.total_field_faults(),
            summary.elapsed_ms
        );

        Ok(RankedResult { entries, summary })
    }

    /// Probe the provider once per run. Returns whether semantic fields are degraded.
    async fn check_provider(
        &self,
        schema: &RankingSchema,
        policy: ProviderPolicy,
    ) -> Result<bool, RankError> {
        if !schema.has_semantic_fields() {
            return Ok(false);
        }

        let probe = match tokio::time::timeout(self.config.embed_timeout, self.provider.health_check()).await {
            Ok(result) => result,
            Err(_) => Err(EmbedError::Timeout(self.config.embed_timeout)),
        };

        match (probe, policy) {
            (Ok(()), _) => Ok(false),
            (Err(e), ProviderPolicy::Abort) => {
                warn!(provider = self.provider.name(), error = %e, "embedding provider unavailable; aborting run");
                Err(RankError::ProviderUnavailable(e))
            }
            (Err(e), ProviderPolicy::Degrade) => {
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "embedding provider unavailable; semantic fields score 0.0 for this run"
                );
                Ok(true)
            }
        }
    }

    /// One embedding call under the run's concurrency limit and the per-call timeout
    async fn embed_bounded(&self, limiter: &Semaphore, text: &str) -> Result<Vec<f32>, EmbedError> {
        let _permit = limiter
            .acquire()
            .await
            .map_err(|_| EmbedError::Unavailable("embedding limiter closed".into()))?;

        let vector = tokio::time::timeout(self.config.embed_timeout, self.provider.embed(text))
            .await
            .map_err(|_| EmbedError::Timeout(self.config.embed_timeout))??;

        let expected = self.provider.dimension();
        if expected != 0 && vector.len() != expected {
            return Err(EmbedError::Dimension {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    async fn prepare_fields<'s>(
        &self,
        requirement: &JobRequirement,
        schema: &'s RankingSchema,
        semantic_degraded: bool,
        limiter: &Semaphore,
    ) -> Vec<PreparedField<'s>> {
        let mut pending = Vec::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            pending.push(self.prepare_field(requirement, schema, spec, semantic_degraded, limiter));
        }
        futures::future::join_all(pending).await
    }

    async fn prepare_field<'s>(
        &self,
        requirement: &JobRequirement,
        schema: &'s RankingSchema,
        spec: &'s FieldSpec,
        semantic_degraded: bool,
        limiter: &Semaphore,
    ) -> PreparedField<'s> {
        let value = requirement.field(&spec.requirement_field);
        match spec.scorer {
            ScorerKind::Semantic => {
                let text = normalize(&field_text(value));
                let requirement = if semantic_degraded {
                    SemanticRequirement::Degraded
                } else if text.trim().is_empty() {
                    SemanticRequirement::Empty
                } else {
                    match self.embed_bounded(limiter, &text).await {
                        Ok(vector) => SemanticRequirement::Embedded(vector),
                        Err(e) => {
                            warn!(field = %spec.name, error = %e, "requirement embedding failed; field scores fallback");
                            SemanticRequirement::Failed(e.to_string())
                        }
                    }
                };
                PreparedField::Semantic { spec, requirement }
            }
            ScorerKind::Exact => PreparedField::Exact {
                spec,
                requirement: field_text(value),
            },
            ScorerKind::Ordinal => {
                let scale = schema.scale_for(spec);
                let requirement = field_text(value);
                if scale.locate(&requirement) == LevelPosition::Unrecognized {
                    warn!(field = %spec.name, level = %requirement, "requirement level not on scale; using midpoint");
                }
                PreparedField::Ordinal {
                    spec,
                    scale,
                    requirement,
                }
            }
            ScorerKind::SetOverlap => PreparedField::SetOverlap {
                spec,
                requirement: field_tokens(value),
            },
        }
    }

    async fn score_candidate(&self, ctx: &RunContext<'_>, candidate: CandidateRecord) -> CandidateOutcome {
        if ctx.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            debug!(candidate_id = %candidate.id, "run cancelled; candidate not scored");
            return CandidateOutcome::NotScored;
        }

        let outcomes = futures::future::join_all(
            ctx.fields
                .iter()
                .map(|field| self.score_field(&ctx.limiter, field, &candidate)),
        )
        .await;

        let mut raw = BTreeMap::new();
        let mut faults = Vec::new();
        for outcome in outcomes {
            if let Some(f) = outcome.fault {
                warn!(
                    candidate_id = %candidate.id,
                    field = %f.field,
                    kind = ?f.kind,
                    detail = %f.detail,
                    "field fault recovered with fallback score"
                );
                faults.push(f);
            }
            raw.insert(outcome.name, outcome.score);
        }

        let total = round_score(aggregate(&raw, &ctx.weights));
        let fields = raw
            .into_iter()
            .map(|(name, score)| (name, round_score(score)))
            .collect();

        debug!(candidate_id = %candidate.id, total, "candidate scored");

        CandidateOutcome::Scored(
            candidate,
            ScoreBreakdown {
                fields,
                total,
                faults,
            },
        )
    }

    async fn score_field(
        &self,
        limiter: &Semaphore,
        field: &PreparedField<'_>,
        candidate: &CandidateRecord,
    ) -> FieldOutcome {
        let (spec, score, fault) = match field {
            PreparedField::Semantic { spec, requirement } => {
                let (score, fault) = match requirement {
                    SemanticRequirement::Degraded | SemanticRequirement::Empty => (FALLBACK_SCORE, None),
                    SemanticRequirement::Failed(detail) => (
                        FALLBACK_SCORE,
                        fault(spec, FaultKind::RequirementEmbeddingFailed, detail.clone()),
                    ),
                    SemanticRequirement::Embedded(req_vector) => {
                        let text = normalize(&field_text(candidate.field(&spec.candidate_field)));
                        if text.trim().is_empty() {
                            (FALLBACK_SCORE, None)
                        } else {
                            match self.embed_bounded(limiter, &text).await {
                                Ok(vector) => (semantic_score(req_vector, &vector), None),
                                Err(e @ EmbedError::Timeout(_)) => (
                                    FALLBACK_SCORE,
                                    fault(spec, FaultKind::EmbeddingTimeout, e.to_string()),
                                ),
                                Err(e) => (
                                    FALLBACK_SCORE,
                                    fault(spec, FaultKind::EmbeddingFailed, e.to_string()),
                                ),
                            }
                        }
                    }
                };
                (*spec, score, fault)
            }
            PreparedField::Exact { spec, requirement } => {
                let value = field_text(candidate.field(&spec.candidate_field));
                (*spec, exact_score(requirement, &value), None)
            }
            PreparedField::Ordinal {
                spec,
                scale,
                requirement,
            } => {
                let value = field_text(candidate.field(&spec.candidate_field));
                let level_fault = if scale.locate(&value) == LevelPosition::Unrecognized {
                    fault(
                        spec,
                        FaultKind::UnrecognizedLevel,
                        format!("'{}' is not a level of the scale", value),
                    )
                } else {
                    None
                };
                (*spec, ordinal_score(scale, requirement, &value), level_fault)
            }
            PreparedField::SetOverlap { spec, requirement } => {
                let tokens = field_tokens(candidate.field(&spec.candidate_field));
                (*spec, set_overlap_score(requirement, &tokens), None)
            }
        };

        FieldOutcome {
            name: spec.name.clone(),
            score,
            fault,
        }
    }
}

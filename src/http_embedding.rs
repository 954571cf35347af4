//! HTTP-based embedding provider that calls a remote model service

use crate::embedding::EmbeddingProvider;
use crate::error::EmbedError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request to the embedding service
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

/// Response from the embedding service
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
    #[serde(default)]
    model: Option<String>,
}

/// Embedding provider backed by `POST {service_url}/embed`
pub struct HttpEmbeddingProvider {
    service_url: String,
    dimension: usize,
    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    /// Create a new provider; `dimension` 0 accepts whatever the service returns
    pub fn new(service_url: impl Into<String>, dimension: usize) -> Self {
        Self {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            dimension,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.service_url, path)
    }
}

fn transport_error(e: reqwest::Error) -> EmbedError {
    if e.is_timeout() {
        EmbedError::Transport(format!("request timed out: {}", e))
    } else if e.is_connect() {
        EmbedError::Unavailable(e.to_string())
    } else {
        EmbedError::Transport(e.to_string())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<(), EmbedError> {
        let response = self
            .client
            .get(self.url("health"))
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbedError::Unavailable(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .client
            .post(self.url("embed"))
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Transport(format!(
                "embedding service error ({}): {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Transport(format!("failed to parse embedding response: {}", e)))?;

        tracing::debug!(
            model = parsed.model.as_deref().unwrap_or("unknown"),
            dim = parsed.embedding.len(),
            "embedding received"
        );

        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CandidateRecord, EngineConfig, FaultKind, FieldSpec, JobRequirement, ProviderPolicy,
        RankingEngine, RankingSchema, RunOptions, ScorerKind, ServerConfig,
    };
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn serve_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Model service returning the same `dim`-length vector for any text
    fn model_stub(dim: usize) -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(
                "/embed",
                post(move || async move {
                    Json(serde_json::json!({
                        "embedding": vec![0.5f32; dim],
                        "model": "all-MiniLM-L6-v2"
                    }))
                }),
            )
    }

    fn status_stub(status: StatusCode, body: &'static str) -> Router {
        Router::new().route("/embed", post(move || async move { (status, body) }))
    }

    async fn rank_matching_skills(provider: HttpEmbeddingProvider) -> crate::RankedResult {
        let engine = RankingEngine::new(Arc::new(provider), EngineConfig::default());
        let schema = RankingSchema::new(vec![FieldSpec::new(
            "skills",
            "skills",
            "skills",
            ScorerKind::Semantic,
            1.0,
        )]);
        let requirement = JobRequirement {
            skills: "event planning".to_string(),
            ..Default::default()
        };
        let mut candidate = CandidateRecord::new("a");
        candidate.skills = "event planning".to_string();

        engine
            .rank(
                &requirement,
                vec![candidate],
                &schema,
                RunOptions::new(ProviderPolicy::Abort),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_default_server_config_accepts_service_dimension() {
        let url = serve_stub(model_stub(384)).await;
        let provider = HttpEmbeddingProvider::new(url, ServerConfig::default().http_embed_dimension);

        let result = rank_matching_skills(provider).await;

        let breakdown = &result.entries[0].breakdown;
        assert!(breakdown.faults.is_empty(), "{:?}", breakdown.faults);
        assert_eq!(breakdown.fields["skills"], 1.0);
        assert!(!result.summary.semantic_degraded);
    }

    #[tokio::test]
    async fn test_explicit_dimension_mismatch_is_a_field_fault() {
        let url = serve_stub(model_stub(384)).await;
        let provider = HttpEmbeddingProvider::new(url, 256);

        let result = rank_matching_skills(provider).await;

        let breakdown = &result.entries[0].breakdown;
        assert_eq!(breakdown.fields["skills"], 0.0);
        assert_eq!(breakdown.faults[0].kind, FaultKind::RequirementEmbeddingFailed);
        assert!(breakdown.faults[0].detail.contains("expected 256, got 384"));
    }

    #[tokio::test]
    async fn test_client_error_is_rejected() {
        let url = serve_stub(status_stub(StatusCode::BAD_REQUEST, "text too long")).await;
        let provider = HttpEmbeddingProvider::new(url, 0);

        match provider.embed("event planning").await {
            Err(EmbedError::Rejected(detail)) => assert!(detail.contains("text too long")),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let url = serve_stub(status_stub(StatusCode::SERVICE_UNAVAILABLE, "model loading")).await;
        let provider = HttpEmbeddingProvider::new(url, 0);

        match provider.embed("event planning").await {
            Err(EmbedError::Transport(detail)) => assert!(detail.contains("503")),
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsable_body_is_transport() {
        let url = serve_stub(status_stub(StatusCode::OK, "not json")).await;
        let provider = HttpEmbeddingProvider::new(url, 0);

        match provider.embed("event planning").await {
            Err(EmbedError::Transport(detail)) => {
                assert!(detail.contains("failed to parse embedding response"))
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let provider = HttpEmbeddingProvider::new("http://localhost:8083/", 384);
        assert_eq!(provider.url("embed"), "http://localhost:8083/embed");
        assert_eq!(provider.dimension(), 384);
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(EmbedRequest { text: "event planning" }).unwrap();
        assert_eq!(body, serde_json::json!({ "text": "event planning" }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let provider = HttpEmbeddingProvider::new("http://127.0.0.1:9", 8);
        assert!(matches!(
            provider.health_check().await,
            Err(EmbedError::Unavailable(_))
        ));
    }
}

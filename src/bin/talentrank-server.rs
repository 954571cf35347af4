//! talentrank HTTP server binary

use anyhow::Context;
use std::sync::Arc;
use talentrank::server::{run_server, AppState};
use talentrank::{
    EngineConfig, HashEmbeddingProvider, HttpEmbeddingProvider, RankingEngine, ServerConfig,
    SharedEmbeddingProvider,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .init();

    println!("talentrank Candidate Ranking Engine");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let server_config = ServerConfig::from_env();
    let engine_config = EngineConfig::from_env();

    // Check for --use-real flag
    let use_real = std::env::args().any(|arg| arg == "--use-real");

    let provider: SharedEmbeddingProvider = if use_real {
        println!("✓ Mode: REAL embedding service");
        println!("✓ Embedding service: {}", server_config.embedding_service_url);

        let provider = HttpEmbeddingProvider::new(
            server_config.embedding_service_url.clone(),
            server_config.http_embed_dimension,
        );

        // Not fatal: each run still probes and applies its own provider policy
        let client = reqwest::Client::new();
        match client
            .get(format!("{}/health", server_config.embedding_service_url))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                println!("✓ Embedding service is healthy");
            }
            Ok(resp) => {
                eprintln!("⚠️  Embedding service returned status: {}", resp.status());
            }
            Err(e) => {
                eprintln!("⚠️  Failed to connect to embedding service: {}", e);
            }
        }

        Arc::new(provider)
    } else {
        println!("✓ Mode: deterministic hash embeddings");
        println!("   (use --use-real to call an embedding service)");
        Arc::new(HashEmbeddingProvider::new(server_config.embed_dimension))
    };

    let schema = server_config
        .load_schema()
        .context("Failed to load default ranking schema")?;
    println!(
        "✓ Default schema: {} fields{}",
        schema.fields.len(),
        server_config
            .schema_path
            .as_deref()
            .map(|p| format!(" from {}", p))
            .unwrap_or_default()
    );

    let engine = RankingEngine::new(provider, engine_config);
    println!("✓ Ranking engine initialized");
    println!("✓ Starting HTTP server on port {}...", server_config.port);
    println!();

    run_server(AppState::new(engine, schema), server_config.port).await?;

    Ok(())
}

//! Embedding provider capability injected into the ranking engine

use crate::error::EmbedError;
use async_trait::async_trait;
use siphasher::sip::SipHasher13;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Maps normalized text to a fixed-dimension vector.
///
/// The engine never caches results; a provider that wants caching owns it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Expected vector length; 0 disables the engine's dimension check
    fn dimension(&self) -> usize;

    /// Probed once per run before any semantic field is scored
    async fn health_check(&self) -> Result<(), EmbedError> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

pub type SharedEmbeddingProvider = Arc<dyn EmbeddingProvider>;

/// Fixed seeds; changing them changes every vector
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

/// Deterministic feature-hashing embedder.
///
/// Each whitespace token is hashed into one signed bucket and the vector is
/// L2-normalized. No model, no network; identical text always yields the
/// identical vector.
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_token(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let h = self.hash_token(token);
            let idx = (h % self.dimension as u64) as usize;
            // Top bit picks the sign so collisions partly cancel
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::Rejected("empty text".into()));
        }
        Ok(self.vectorize(text))
    }
}

/// Scriptable provider for tests: fixed vectors, injected failures, delays.
///
/// Text without a scripted vector falls back to the hash embedder.
pub struct MockEmbeddingProvider {
    fallback: HashEmbeddingProvider,
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    unavailable: bool,
    delay: Option<Duration>,
    slow: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            fallback: HashEmbeddingProvider::new(dimension),
            vectors: HashMap::new(),
            failing: HashSet::new(),
            unavailable: false,
            delay: None,
            slow: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `vector` whenever `text` is embedded
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Fail every call for exactly this text
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.failing.insert(text.into());
        self
    }

    /// Fail the health probe and every call
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Delay every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only calls for this text
    pub fn slow_on(mut self, text: impl Into<String>, delay: Duration) -> Self {
        self.slow.insert(text.into(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn dimension(&self) -> usize {
        self.fallback.dimension
    }

    async fn health_check(&self) -> Result<(), EmbedError> {
        if self.unavailable {
            return Err(EmbedError::Unavailable("mock provider is down".into()));
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.slow.get(text).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(EmbedError::Unavailable("mock provider is down".into()));
        }
        if self.failing.contains(text) {
            return Err(EmbedError::Rejected(format!("injected failure for '{}'", text)));
        }
        if let Some(v) = self.vectors.get(text) {
            return Ok(v.clone());
        }
        self.fallback.embed(text).await
    }
}

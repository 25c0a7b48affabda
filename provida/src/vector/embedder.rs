//! Embedders turn text into fixed-size vectors for `InMemoryVectorStore`.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Produces one vector of [`Embedder::dimension`] floats per input text, in order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CollaboratorError>;

    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words embedder: each lowercased alphanumeric token is
/// hashed (FNV-1a) into a bucket, and the vector is L2-normalized.
///
/// Identical texts embed identically, so a re-ingested document scores 1.0.
/// Used offline and in tests; carries no semantics beyond shared tokens.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = token.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        (hash % self.dimension as u64) as usize
    }

    fn text_to_vec(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[self.bucket(&token.to_lowercase())] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
        Ok(texts.iter().map(|t| self.text_to_vec(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

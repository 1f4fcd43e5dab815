//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] for BERT-style sentence encoders exported to
//! ONNX. Handles tokenization, inference, pooling, and L2 normalization.
//! bge-* models are pooled on the `[CLS]` token; everything else uses
//! attention-masked mean pooling.

use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// Maximum sequence length fed to the encoder. Excerpts are chunked well below it.
const MAX_SEQ_LEN: usize = 512;

/// How token embeddings collapse into one sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    /// First token (`[CLS]`).
    Cls,
    /// Attention-masked average over all tokens.
    Mean,
}

impl Pooling {
    pub fn for_model(model: &str) -> Self {
        if model.to_ascii_lowercase().contains("bge") {
            Self::Cls
        } else {
            Self::Mean
        }
    }
}

/// Local ONNX-based embedding provider.
pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    pooling: Pooling,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `lifelog-recall model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `lifelog-recall model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        let pooling = Pooling::for_model(&config.model);
        tracing::info!(model = %model_path.display(), ?pooling, "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            pooling,
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text])?
            .into_iter()
            .next()
            .context("encoder returned no vector for the query")
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch = BatchInputs::encode(&self.tokenizer, texts)?;
        let shape = vec![batch.rows as i64, batch.seq_len as i64];
        // Single-segment input: token_type_ids are all zero.
        let inputs = ort::inputs! {
            "input_ids" => Tensor::from_array((shape.clone(), batch.ids.clone().into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape.clone(), batch.mask.clone().into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, vec![0i64; batch.ids.len()].into_boxed_slice()))?,
        };

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(inputs)?;

        // Exports name the hidden-state output differently.
        let hidden = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .unwrap_or_else(|| &outputs[0]);
        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to read encoder hidden states")?;

        let dims: &[i64] = &shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch.rows && dims[2] == EMBEDDING_DIM as i64,
            "unexpected hidden state shape {dims:?}, expected [{}, seq, {EMBEDDING_DIM}]",
            batch.rows
        );
        anyhow::ensure!(dims[1] > 0 && batch.seq_len > 0, "encoder produced an empty sequence");
        let row_len = dims[1] as usize * EMBEDDING_DIM;

        Ok(data
            .chunks_exact(row_len)
            .zip(batch.mask.chunks_exact(batch.seq_len))
            .map(|(tokens, mask)| {
                let pooled = match self.pooling {
                    Pooling::Cls => tokens[..EMBEDDING_DIM].to_vec(),
                    Pooling::Mean => mean_pool(tokens, mask, EMBEDDING_DIM),
                };
                l2_normalize(&pooled)
            })
            .collect())
    }
}

/// Padded token ids and attention mask for one batch, flattened row-major.
struct BatchInputs {
    ids: Vec<i64>,
    mask: Vec<i64>,
    rows: usize,
    seq_len: usize,
}

impl BatchInputs {
    fn encode(tokenizer: &Tokenizer, texts: &[&str]) -> Result<Self> {
        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());

        let ids = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().map(|&id| i64::from(id)))
            .collect();
        let mask = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().iter().map(|&m| i64::from(m)))
            .collect();

        Ok(Self {
            ids,
            mask,
            rows: encodings.len(),
            seq_len,
        })
    }
}

/// Attention-masked mean over `[seq, hidden]` token embeddings.
fn mean_pool(tokens: &[f32], mask: &[i64], hidden_dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_dim];
    let mut count = 0.0f32;

    for (s, &m) in mask.iter().enumerate().take(tokens.len() / hidden_dim) {
        if m > 0 {
            let row = &tokens[s * hidden_dim..(s + 1) * hidden_dim];
            for (acc, x) in sum.iter_mut().zip(row) {
                *acc += x;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for x in &mut sum {
            *x /= count;
        }
    }
    sum
}

/// L2-normalize a vector. Returns a zero vector if the input norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

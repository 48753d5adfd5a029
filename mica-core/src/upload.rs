//! Upload seams: the batch uploader contract and the retrying chunked
//! transport underneath it.
//!
//! Retries happen here and only here. The orchestrator never retries a
//! failed batch; the chunk layer retries each chunk with capped exponential
//! backoff and gives up after a fixed attempt count.

use crate::assets::ResolvedAssetFile;
use crate::config::VpsConfig;
use crate::models::PublishableNote;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload to '{vps}' failed: {message}")]
    Batch { vps: String, message: String },

    #[error("Chunk {chunk_index} of upload {upload_id} failed after {attempts} attempts: {message}")]
    ChunkExhausted {
        upload_id: String,
        chunk_index: usize,
        attempts: u32,
        message: String,
    },
}

/// Everything destined for one VPS target in a single run.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub vps: VpsConfig,
    pub notes: Vec<PublishableNote>,
    pub assets: Vec<ResolvedAssetFile>,
}

/// Batch-level destination contract: `Ok(true)` on success, `Ok(false)` on
/// rejection. There is no partial acknowledgement.
#[async_trait]
pub trait NoteUploader: Send + Sync {
    async fn upload(&self, batch: &UploadBatch) -> Result<bool, UploadError>;
}

#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Wire-level chunk delivery, implemented by the host transport.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    async fn send_chunk(
        &self,
        upload_id: &str,
        index: usize,
        total: usize,
        bytes: &[u8],
    ) -> Result<(), TransportError>;
}

/// Capped exponential backoff: fixed attempt count, fixed delay ceiling.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

/// Splits a payload into chunks and delivers them sequentially, retrying
/// each chunk per the policy.
pub struct ChunkedUpload<T> {
    transport: T,
    chunk_size: usize,
    policy: RetryPolicy,
}

impl<T: ChunkTransport> ChunkedUpload<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_size: 512 * 1024,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Send a payload under a fresh upload id. Returns the upload id once
    /// every chunk is acknowledged.
    pub async fn send(&self, payload: &[u8]) -> Result<String, UploadError> {
        let upload_id = Uuid::new_v4().to_string();

        if payload.is_empty() {
            self.send_with_retry(&upload_id, 0, 1, &[]).await?;
            return Ok(upload_id);
        }

        let chunks: Vec<&[u8]> = payload.chunks(self.chunk_size).collect();
        let total = chunks.len();
        for (index, chunk) in chunks.iter().enumerate() {
            self.send_with_retry(&upload_id, index, total, chunk).await?;
        }
        Ok(upload_id)
    }

    async fn send_with_retry(
        &self,
        upload_id: &str,
        index: usize,
        total: usize,
        bytes: &[u8],
    ) -> Result<(), UploadError> {
        let mut attempt = 0u32;
        loop {
            match self.transport.send_chunk(upload_id, index, total, bytes).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts {
                        return Err(UploadError::ChunkExhausted {
                            upload_id: upload_id.to_string(),
                            chunk_index: index,
                            attempts: attempt,
                            message: err.to_string(),
                        });
                    }
                    let delay = self.policy.delay_for(attempt - 1);
                    tracing::debug!(
                        upload_id,
                        chunk = index,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "chunk send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

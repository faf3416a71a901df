//! LlmClient trait definition

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::{CompletionRequest, LlmError, StreamDelta};

/// Incremental fragments of one model response
pub type DeltaStream = BoxStream<'static, Result<StreamDelta, LlmError>>;

/// Streaming chat-completion capability
///
/// Each call is independent: the caller sends the full history every time.
/// An `Err` from `stream` means the response could not be established; an
/// `Err` item inside the stream means it broke off after it started.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a request and receive its response as a stream of deltas
    async fn stream(&self, request: CompletionRequest) -> Result<DeltaStream, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock LLM client that replays one scripted response per call
    pub struct MockLlmClient {
        rounds: Vec<Vec<Result<StreamDelta, String>>>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(rounds: Vec<Vec<StreamDelta>>) -> Self {
            debug!(round_count = %rounds.len(), "MockLlmClient::new: called");
            Self::with_results(rounds.into_iter().map(|r| r.into_iter().map(Ok).collect()).collect())
        }

        /// Rounds whose items may include mid-stream errors
        pub fn with_results(rounds: Vec<Vec<Result<StreamDelta, String>>>) -> Self {
            Self {
                rounds,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests received so far
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn stream(&self, request: CompletionRequest) -> Result<DeltaStream, LlmError> {
            debug!("MockLlmClient::stream: called");
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let round = self
                .rounds
                .get(idx)
                .cloned()
                .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string()))?;
            let items: Vec<Result<StreamDelta, LlmError>> =
                round.into_iter().map(|r| r.map_err(LlmError::Stream)).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }
}

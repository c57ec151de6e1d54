//! Scripted backend for tests.
//!
//! Plays back a fixed sequence of completion results and records every
//! request it receives, so tests can assert on prompt contents and call
//! order without a live backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{
    BackendError, BackendResult, CompletionRequest, CompletionResponse, LanguageModel,
};

/// A [`LanguageModel`] that replays scripted responses in order.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<BackendResult<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    /// Backend that will serve the given results, first to last.
    #[must_use]
    pub fn new(script: Vec<BackendResult<CompletionResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of scripted results not yet consumed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> BackendResult<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(BackendError::EmptyCompletion))
    }
}

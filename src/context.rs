//! Request-scoped data passed explicitly through every call boundary.

use crate::error::StoreError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Correlation id, requested language and cancellation for one request.
///
/// An empty `language` means the caller did not specify one.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub language: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            language: language.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Use `token` as this request's cancellation signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Give up on store calls once `timeout` has passed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn has_language(&self) -> bool {
        !self.language.is_empty()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive a store operation until it completes, the request is cancelled,
    /// or the deadline passes, whichever happens first.
    pub async fn guard<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        match self.deadline {
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return Err(StoreError::TimedOut);
                }
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
                    res = tokio::time::timeout_at(deadline, op) => {
                        res.unwrap_or_else(|_| Err(StoreError::TimedOut))
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
                    res = op => res,
                }
            }
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context(id=[{}], language={})", self.request_id, self.language)
    }
}

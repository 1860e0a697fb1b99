//! Cancellation context passed to every store call.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// A cancellation token with an optional deadline.
///
/// Clones are the same context and share cancellation. Derived contexts
/// ([`Context::child`], [`Context::with_timeout`], [`Context::with_deadline`])
/// are canceled with their parent, but canceling a derived context leaves
/// the parent and its other children live. A derived deadline is the
/// earlier of the parent's and the requested one.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use kvfs_core::Context;
///
/// let parent = Context::background();
/// let child = parent.with_timeout(Duration::from_secs(60));
///
/// child.cancel();
/// assert!(child.is_canceled());
/// assert!(!parent.is_canceled());
///
/// let child = parent.child();
/// parent.cancel();
/// assert!(child.is_canceled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never canceled unless [`cancel`](Self::cancel) is called.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that can be canceled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a context that also expires at `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this context, its clones and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`StoreError::Canceled`] if the context is done.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_canceled() {
            Err(StoreError::Canceled)
        } else {
            Ok(())
        }
    }
}

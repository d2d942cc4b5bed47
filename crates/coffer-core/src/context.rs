//! Unit-of-work contexts: request-scoped values, cancellation, deadlines,
//! and cancellation-detached derivation for cleanup paths.
//!
//! A [`Context`] is an immutable handle passed down a call tree. Deriving a
//! child context adds a value, attaches a cancellable scope, or — the case
//! this module exists for — *detaches* from the ancestor's cancellation
//! signal while keeping its values visible ([`Context::detached`]). Teardown
//! logic that must run to completion (releasing resources, finalizing
//! bookkeeping) runs under a detached context so it is not aborted merely
//! because the operation that scheduled it was cancelled.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

// ==============================================================================
// Value Chain
// ==============================================================================

/// One frame of the value-lookup chain. Frames are immutable and shared by
/// reference; deriving a context never copies ancestor frames.
struct ValueNode {
    parent: Option<Arc<ValueNode>>,
    type_id: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

// ==============================================================================
// Context
// ==============================================================================

/// A unit-of-work handle carrying a value chain, a cancellation token, and
/// an optional deadline.
///
/// Contexts are cheap to clone (`Arc` bumps) and immutable after
/// construction; all derivation operations return a new handle.
#[derive(Clone)]
pub struct Context {
    values: Option<Arc<ValueNode>>,
    token: CancellationToken,
    deadline: Option<Instant>,
}

/// Cancels the scope it was returned with. Cancellation is idempotent and
/// propagates to every context derived below that scope, but never upward.
#[derive(Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Context {
    /// The root context: no values, no deadline, never cancelled.
    pub fn background() -> Self {
        Self {
            values: None,
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    // --------------------------------------------------------------------------
    // Values
    // --------------------------------------------------------------------------

    /// Derive a context that resolves lookups of type `T` to `value`.
    /// Lookups for other types delegate up the chain unchanged.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        Self {
            values: Some(Arc::new(ValueNode {
                parent: self.values.clone(),
                type_id: TypeId::of::<T>(),
                value: Arc::new(value),
            })),
            token: self.token.clone(),
            deadline: self.deadline,
        }
    }

    /// Look up the value of type `T`, walking the chain from this context
    /// toward the root. The nearest frame wins.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let mut node = self.values.as_ref();
        while let Some(frame) = node {
            if frame.type_id == TypeId::of::<T>() {
                return Arc::clone(&frame.value).downcast::<T>().ok();
            }
            node = frame.parent.as_ref();
        }
        None
    }

    // --------------------------------------------------------------------------
    // Cancellation and deadlines
    // --------------------------------------------------------------------------

    /// Derive a cancellable scope. The returned context is cancelled when
    /// the handle fires or when any ancestor scope is cancelled.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self.token.child_token();
        let ctx = Self {
            values: self.values.clone(),
            token: token.clone(),
            deadline: self.deadline,
        };
        (ctx, CancelHandle { token })
    }

    /// Derive a cancellable scope that also expires at `deadline`. The
    /// effective deadline never extends past an ancestor's.
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancelHandle) {
        let deadline = match self.deadline {
            Some(inherited) if inherited <= deadline => inherited,
            _ => deadline,
        };
        let token = self.token.child_token();
        let ctx = Self {
            values: self.values.clone(),
            token: token.clone(),
            deadline: Some(deadline),
        };
        (ctx, CancelHandle { token })
    }

    /// [`Context::with_deadline`] relative to now.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelHandle) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// True once this context's scope has been cancelled or its deadline
    /// has passed. Non-blocking.
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        matches!(self.deadline, Some(deadline) if deadline <= Instant::now())
    }

    /// The effective deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when this context is cancelled or its deadline expires.
    /// Pends forever on a context with neither.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline.into()) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    // --------------------------------------------------------------------------
    // Detachment
    // --------------------------------------------------------------------------

    /// Derive a cleanup context: value lookups answer exactly as on `self`,
    /// while cancellation and deadline queries always report "active, no
    /// deadline" — regardless of `self` being cancelled before, during, or
    /// after this call.
    ///
    /// Scopes derived *from* the detached context via
    /// [`Context::with_cancel`] or [`Context::with_deadline`] are ordinary
    /// cancellable scopes; detachment shields only against the signals
    /// above it.
    pub fn detached(&self) -> Self {
        Self {
            values: self.values.clone(),
            token: CancellationToken::new(),
            deadline: None,
        }
    }
}

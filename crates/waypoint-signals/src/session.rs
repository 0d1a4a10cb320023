//! Join Session - exactly-once completion over independently resolving slots.
//!
//! A session completes when every pending slot has resolved or when its
//! deadline expires, whichever comes first. All completion paths go through
//! one mutex and flip one `closed` flag, so the continuation runs at most
//! once and every resolution that loses the race is a no-op.
//!
//! Completion also aborts every task attached with [`JoinSession::attach`].
//! Source tasks own their event subscriptions, so aborting them releases
//! the subscriptions on every exit path.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::signals::{DeviceSignals, Slot};

type Continuation = Box<dyn FnOnce(DeviceSignals) + Send>;
type FallbackSource = Box<dyn Fn() -> String + Send + Sync>;

/// Lifecycle of a join session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting on at least one slot.
    Open,
    /// Continuation fired.
    Completed,
    /// Closed without firing the continuation.
    Cancelled,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

struct Inner {
    state: SessionState,
    signals: DeviceSignals,
    pending: BTreeSet<Slot>,
    continuation: Option<Continuation>,
    attached: Vec<AbortHandle>,
}

/// Coordination state for one collection run.
pub struct JoinSession {
    inner: Mutex<Inner>,
    closed: AtomicBool,
    push_fallback: FallbackSource,
    started_at: Instant,
    deadline: Duration,
}

impl JoinSession {
    /// Open a session waiting on both the push-token and attribution slots.
    ///
    /// `push_fallback` is what the push slot resolves to when permission is
    /// denied or the deadline wins.
    pub fn open<F>(
        bundle_id: impl Into<String>,
        deadline: Duration,
        push_fallback: impl Into<String>,
        continuation: F,
    ) -> Arc<Self>
    where
        F: FnOnce(DeviceSignals) + Send + 'static,
    {
        let push_fallback = push_fallback.into();
        Self::open_with_fallback(bundle_id, deadline, move || push_fallback.clone(), continuation)
    }

    /// Like [`open`](Self::open), but the fallback is computed each time it
    /// is applied, so it reflects state that changed while the session ran.
    pub fn open_with_fallback<P, F>(
        bundle_id: impl Into<String>,
        deadline: Duration,
        push_fallback: P,
        continuation: F,
    ) -> Arc<Self>
    where
        P: Fn() -> String + Send + Sync + 'static,
        F: FnOnce(DeviceSignals) + Send + 'static,
    {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state: SessionState::Open,
                signals: DeviceSignals::new(bundle_id),
                pending: BTreeSet::from([Slot::PushToken, Slot::Attribution]),
                continuation: Some(Box::new(continuation)),
                attached: Vec::new(),
            }),
            closed: AtomicBool::new(false),
            push_fallback: Box::new(push_fallback),
            started_at: Instant::now(),
            deadline,
        })
    }

    /// Resolve a slot. `None` resolves it without recording a value.
    ///
    /// Returns `false` when the session is already closed or the slot was
    /// already resolved; nothing is recorded in that case.
    pub fn resolve(&self, slot: Slot, value: Option<String>) -> bool {
        let fired = {
            let mut inner = self.lock();
            if inner.state != SessionState::Open {
                trace!(%slot, error = %Error::SessionClosed, "late resolution ignored");
                return false;
            }
            if !inner.pending.remove(&slot) {
                trace!(%slot, "slot already resolved");
                return false;
            }

            inner.signals.record(slot, value);
            debug!(%slot, remaining = inner.pending.len(), "slot resolved");

            if !inner.pending.is_empty() {
                return true;
            }
            self.close(&mut inner, SessionState::Completed)
        };

        Self::fire(fired);
        true
    }

    /// Resolve the push slot with the fallback token.
    pub fn resolve_push_fallback(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.resolve(Slot::PushToken, Some((self.push_fallback)()))
    }

    /// Deadline path: complete with whatever has resolved so far.
    ///
    /// An unresolved push slot gets the fallback token; an unresolved
    /// attribution slot stays absent.
    pub fn expire(&self) -> bool {
        let fired = {
            let mut inner = self.lock();
            if inner.state != SessionState::Open {
                return false;
            }

            if inner.pending.remove(&Slot::PushToken) {
                inner
                    .signals
                    .record(Slot::PushToken, Some((self.push_fallback)()));
            }
            warn!(
                pending = ?inner.pending,
                error = %Error::SourceTimeout(self.deadline),
                "deadline elapsed before all sources resolved"
            );
            inner.pending.clear();

            self.close(&mut inner, SessionState::Completed)
        };

        Self::fire(fired);
        true
    }

    /// Close the session without running the continuation.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Open {
            return false;
        }
        debug!("join session cancelled");
        // Dropping the continuation unblocks anyone waiting on it.
        drop(self.close(&mut inner, SessionState::Cancelled));
        true
    }

    /// Tie a task's lifetime to the session. Aborted immediately if already closed.
    pub fn attach(&self, handle: AbortHandle) {
        let mut inner = self.lock();
        if inner.state == SessionState::Open {
            inner.attached.push(handle);
        } else {
            handle.abort();
        }
    }

    /// Whether the session has completed or been cancelled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Slots still waiting to resolve.
    #[must_use]
    pub fn pending(&self) -> Vec<Slot> {
        self.lock().pending.iter().copied().collect()
    }

    /// The instant at which the deadline fires.
    #[must_use]
    pub fn deadline_at(&self) -> Instant {
        self.started_at + self.deadline
    }

    /// Time left until the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_sub(self.started_at.elapsed())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transition out of `Open`. Must be called with the lock held and the
    /// session open. Returns the continuation and frozen signals to fire
    /// once the lock is released.
    fn close(
        &self,
        inner: &mut Inner,
        state: SessionState,
    ) -> Option<(Continuation, DeviceSignals)> {
        inner.state = state;
        self.closed.store(true, Ordering::Release);

        for handle in inner.attached.drain(..) {
            handle.abort();
        }

        let continuation = inner.continuation.take()?;
        let signals = std::mem::take(&mut inner.signals);
        debug!(
            %state,
            elapsed = ?self.started_at.elapsed(),
            has_push = signals.push_token.is_some(),
            has_attribution = signals.attribution_token.is_some(),
            "join session closed"
        );
        Some((continuation, signals))
    }

    fn fire(fired: Option<(Continuation, DeviceSignals)>) {
        if let Some((continuation, signals)) = fired {
            continuation(signals);
        }
    }
}

impl std::fmt::Debug for JoinSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinSession")
            .field("closed", &self.is_closed())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

//! Observable operation state with the epoch guard
//!
//! ## Epoch guard
//!
//! Every invocation increments the epoch and captures it; a completing
//! invocation commits its outcome only while the captured epoch still
//! equals the current one. A superseded completion is silently discarded,
//! so at most the latest call's result is ever observable. This is the
//! machine's sole ordering contract — it promises nothing across distinct
//! state instances.
//!
//! ## Locking
//!
//! Transitions (begin / commit / reset) serialize on one mutex so an
//! epoch check and its commit are atomic with respect to a concurrent
//! re-invocation. The observable fields are [`Signal`]s; subscribers fire
//! after each field write.

use lode_core::Signal;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::status::TaskStatus;

/// Observable state of one operation-site
///
/// Created once per site and reused across invocations: transitions
/// overwrite the fields in place, they never reallocate the state.
pub struct TaskState<T, E> {
    status: Signal<TaskStatus>,
    result: Signal<Option<T>>,
    error: Signal<Option<E>>,
    epoch: AtomicU64,
    transition: Mutex<()>,
}

impl<T, E> TaskState<T, E> {
    /// Fresh state in `Pending` with epoch 0
    pub fn new() -> Self {
        Self {
            status: Signal::new(TaskStatus::Pending),
            result: Signal::new(None),
            error: Signal::new(None),
            epoch: AtomicU64::new(0),
            transition: Mutex::new(()),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Start an invocation: bump the epoch, clear the outcome, go `Loading`
    ///
    /// Returns the captured epoch the invocation must present when
    /// committing. Never blocks on anything but the transition mutex.
    pub fn begin(&self) -> u64 {
        let _guard = self.transition.lock();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.result.set(None);
        self.error.set(None);
        self.status.set(TaskStatus::Loading);
        epoch
    }

    /// Commit a successful outcome if `epoch` is still current
    ///
    /// Returns false (and changes nothing) when a newer invocation has
    /// superseded this one.
    pub fn try_resolve(&self, epoch: u64, value: T) -> bool {
        let _guard = self.transition.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(
                target: "lode::task",
                captured = epoch,
                current = self.epoch.load(Ordering::SeqCst),
                "discarding superseded resolution"
            );
            return false;
        }
        self.result.set(Some(value));
        self.error.set(None);
        self.status.set(TaskStatus::Resolved);
        true
    }

    /// Commit a failed outcome if `epoch` is still current
    pub fn try_reject(&self, epoch: u64, error: E) -> bool {
        let _guard = self.transition.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(
                target: "lode::task",
                captured = epoch,
                current = self.epoch.load(Ordering::SeqCst),
                "discarding superseded rejection"
            );
            return false;
        }
        self.error.set(Some(error));
        self.result.set(None);
        self.status.set(TaskStatus::Rejected);
        true
    }

    /// Resolve immediately, superseding any in-flight invocation
    ///
    /// The synchronous no-network path (e.g. an identity-cache hit).
    pub fn force_resolve(&self, value: T) {
        let _guard = self.transition.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.result.set(Some(value));
        self.error.set(None);
        self.status.set(TaskStatus::Resolved);
    }

    /// Back to `Pending`, clearing result and error
    ///
    /// The epoch is not rewound; an in-flight invocation from before the
    /// reset stays superseded.
    pub fn reset(&self) {
        let _guard = self.transition.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.result.set(None);
        self.error.set(None);
        self.status.set(TaskStatus::Pending);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    /// The status signal, for subscription
    pub fn status_signal(&self) -> &Signal<TaskStatus> {
        &self.status
    }

    /// The result signal, for subscription
    pub fn result_signal(&self) -> &Signal<Option<T>> {
        &self.result
    }

    /// The error signal, for subscription
    pub fn error_signal(&self) -> &Signal<Option<E>> {
        &self.error
    }

    /// Current epoch (number of invocations so far)
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// True before the first invocation
    pub fn is_pending(&self) -> bool {
        self.status().is_pending()
    }

    /// True while an invocation is in flight
    pub fn is_loading(&self) -> bool {
        self.status().is_loading()
    }

    /// True when the latest invocation succeeded
    pub fn is_resolved(&self) -> bool {
        self.status().is_resolved()
    }

    /// True when the latest invocation failed
    pub fn is_rejected(&self) -> bool {
        self.status().is_rejected()
    }

    /// Resolved or rejected
    pub fn is_done(&self) -> bool {
        self.status().is_done()
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Branch on the current status without exposing it
    ///
    /// Invokes the handler registered for the current status (the `done`
    /// catch-all wins over the terminal arms when present) and returns its
    /// value, or `None` when no handler matches. Pure projection: the state
    /// is not touched.
    pub fn match_on<R>(&self, matcher: Matcher<'_, T, E, R>) -> Option<R> {
        let status = self.status();
        if status.is_done() {
            if let Some(done) = matcher.done {
                return Some(self.result.with(|r| {
                    self.error.with(|e| done(r.as_ref(), e.as_ref()))
                }));
            }
        }
        match status {
            TaskStatus::Pending => matcher.pending.map(|f| f()),
            TaskStatus::Loading => matcher.loading.map(|f| f()),
            TaskStatus::Resolved => matcher
                .resolved
                .map(|f| self.result.with(|r| f(r.as_ref()))),
            TaskStatus::Rejected => matcher
                .rejected
                .map(|f| self.error.with(|e| f(e.as_ref()))),
        }
    }
}

impl<T: Clone, E> TaskState<T, E> {
    /// Clone out the current result
    pub fn result(&self) -> Option<T> {
        self.result.get()
    }
}

impl<T, E: Clone> TaskState<T, E> {
    /// Clone out the current error
    pub fn error(&self) -> Option<E> {
        self.error.get()
    }
}

impl<T, E> Default for TaskState<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for TaskState<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskState")
            .field("status", &self.status())
            .field("epoch", &self.epoch())
            .finish()
    }
}

// =============================================================================
// Matcher
// =============================================================================

type Arm0<'a, R> = Box<dyn FnOnce() -> R + 'a>;
type Arm1<'a, V, R> = Box<dyn for<'v> FnOnce(Option<&'v V>) -> R + 'a>;
type Arm2<'a, T, E, R> = Box<dyn for<'v> FnOnce(Option<&'v T>, Option<&'v E>) -> R + 'a>;

/// Handler set for [`TaskState::match_on`]
///
/// Each arm is optional; `done` is a catch-all for resolved-or-rejected,
/// consulted before the terminal arms.
pub struct Matcher<'a, T, E, R> {
    pending: Option<Arm0<'a, R>>,
    loading: Option<Arm0<'a, R>>,
    resolved: Option<Arm1<'a, T, R>>,
    rejected: Option<Arm1<'a, E, R>>,
    done: Option<Arm2<'a, T, E, R>>,
}

impl<'a, T, E, R> Matcher<'a, T, E, R> {
    /// Empty matcher: every status projects to `None`
    pub fn new() -> Self {
        Self {
            pending: None,
            loading: None,
            resolved: None,
            rejected: None,
            done: None,
        }
    }

    /// Handle `Pending`
    pub fn pending(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.pending = Some(Box::new(f));
        self
    }

    /// Handle `Loading`
    pub fn loading(mut self, f: impl FnOnce() -> R + 'a) -> Self {
        self.loading = Some(Box::new(f));
        self
    }

    /// Handle `Resolved`, receiving the result
    pub fn resolved(mut self, f: impl for<'v> FnOnce(Option<&'v T>) -> R + 'a) -> Self {
        self.resolved = Some(Box::new(f));
        self
    }

    /// Handle `Rejected`, receiving the error
    pub fn rejected(mut self, f: impl for<'v> FnOnce(Option<&'v E>) -> R + 'a) -> Self {
        self.rejected = Some(Box::new(f));
        self
    }

    /// Catch-all for resolved-or-rejected, receiving both fields
    pub fn done(mut self, f: impl for<'v> FnOnce(Option<&'v T>, Option<&'v E>) -> R + 'a) -> Self {
        self.done = Some(Box::new(f));
        self
    }
}

impl<'a, T, E, R> Default for Matcher<'a, T, E, R> {
    fn default() -> Self {
        Self::new()
    }
}

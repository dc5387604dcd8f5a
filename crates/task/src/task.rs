//! Task: one re-invocable operation-site
//!
//! A [`Task`] is built eagerly, once, for each operation a service exposes
//! (keyed by operation name in the service), and reused across invocations.
//! `invoke` hands the wrapped future to the tokio runtime and returns
//! synchronously with the in-progress handle; the future's outcome settles
//! the shared [`TaskState`] through the epoch guard.
//!
//! Failures of the wrapped future are captured as `Rejected` data and never
//! escape the spawned task — no unhandled rejection can leak out of
//! `invoke`. The compiler enforces what the original runtime check for a
//! "malformed wrapped function" used to: `invoke` only accepts a future
//! resolving to `Result<T, E>`.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::state::TaskState;

/// One observable operation-site
pub struct Task<T, E> {
    state: Arc<TaskState<T, E>>,
}

impl<T, E> Task<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Fresh task in `Pending`
    pub fn new() -> Self {
        Self {
            state: Arc::new(TaskState::new()),
        }
    }

    /// The shared observable state
    pub fn state(&self) -> Arc<TaskState<T, E>> {
        self.state.clone()
    }

    /// Start an invocation
    ///
    /// Transitions to `Loading`, spawns `future` on the ambient tokio
    /// runtime and returns immediately with the in-progress handle. When
    /// the future completes, its outcome commits only if no newer
    /// invocation has superseded it in the meantime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime (a wiring defect, reported
    /// loudly rather than swallowed).
    pub fn invoke<F>(&self, future: F) -> TaskHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let state = self.state.clone();
        let epoch = state.begin();
        let completion = tokio::spawn(async move {
            match future.await {
                Ok(value) => {
                    state.try_resolve(epoch, value);
                }
                Err(error) => {
                    state.try_reject(epoch, error);
                }
            }
        });
        TaskHandle {
            state: self.state.clone(),
            completion: Some(completion),
        }
    }

    /// Resolve synchronously without any asynchronous work
    ///
    /// The no-network path: supersedes any in-flight invocation and
    /// commits `value` immediately. The returned handle is already done.
    pub fn resolve_now(&self, value: T) -> TaskHandle<T, E> {
        self.state.force_resolve(value);
        TaskHandle {
            state: self.state.clone(),
            completion: None,
        }
    }
}

impl<T, E> Default for Task<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("state", &self.state).finish()
    }
}

/// Handle to one invocation: the observable state plus its settlement
pub struct TaskHandle<T, E> {
    state: Arc<TaskState<T, E>>,
    completion: Option<JoinHandle<()>>,
}

impl<T, E> TaskHandle<T, E> {
    /// The operation's observable state
    pub fn state(&self) -> &Arc<TaskState<T, E>> {
        &self.state
    }

    /// Wait until this invocation has settled, returning the state
    ///
    /// Immediately ready for a synchronously resolved handle. A superseded
    /// invocation still settles (its outcome was discarded); awaiting it
    /// observes whatever the latest invocation committed.
    pub async fn done(self) -> Arc<TaskState<T, E>> {
        if let Some(completion) = self.completion {
            // the spawned commit never panics; a JoinError would mean the
            // runtime shut down underneath us
            let _ = completion.await;
        }
        self.state
    }
}

impl<T, E> std::fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("state", &self.state)
            .field("in_flight", &self.completion.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TaskStatus;
    use std::time::Duration;
    use tokio::time::sleep;

    type TestTask = Task<i64, String>;

    #[tokio::test]
    async fn test_invoke_resolves() {
        let task = TestTask::new();
        let handle = task.invoke(async { Ok(42) });
        assert!(handle.state().is_loading());

        let state = handle.done().await;
        assert_eq!(state.status(), TaskStatus::Resolved);
        assert_eq!(state.result(), Some(42));
    }

    #[tokio::test]
    async fn test_invoke_rejects() {
        let task = TestTask::new();
        let state = task
            .invoke(async { Err("backend down".to_string()) })
            .done()
            .await;
        assert_eq!(state.status(), TaskStatus::Rejected);
        assert_eq!(state.error(), Some("backend down".to_string()));
        assert_eq!(state.result(), None);
    }

    #[tokio::test]
    async fn test_invoke_returns_before_completion() {
        let task = TestTask::new();
        let handle = task.invoke(async {
            sleep(Duration::from_millis(50)).await;
            Ok(1)
        });
        // invoke is synchronous: the future has not completed yet
        assert!(handle.state().is_loading());
        handle.done().await;
        assert!(task.state().is_resolved());
    }

    #[tokio::test]
    async fn test_slow_first_call_loses_to_fast_second() {
        let task = TestTask::new();

        let slow = task.invoke(async {
            sleep(Duration::from_millis(80)).await;
            Ok(1)
        });
        let fast = task.invoke(async {
            sleep(Duration::from_millis(10)).await;
            Ok(2)
        });

        // wait for both to settle, slow one last
        fast.done().await;
        let state = slow.done().await;

        assert_eq!(state.status(), TaskStatus::Resolved);
        assert_eq!(state.result(), Some(2));
    }

    #[tokio::test]
    async fn test_slow_stale_rejection_does_not_clobber() {
        let task = TestTask::new();

        let slow = task.invoke(async {
            sleep(Duration::from_millis(80)).await;
            Err("stale failure".to_string())
        });
        let fast = task.invoke(async { Ok(7) });

        fast.done().await;
        let state = slow.done().await;

        assert_eq!(state.status(), TaskStatus::Resolved);
        assert_eq!(state.result(), Some(7));
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn test_reinvocation_is_unlimited() {
        let task = TestTask::new();
        for i in 0..3 {
            let state = task.invoke(async move { Ok(i) }).done().await;
            assert_eq!(state.result(), Some(i));
        }
        assert_eq!(task.state().epoch(), 3);
    }

    #[tokio::test]
    async fn test_resolve_now_is_immediate() {
        let task = TestTask::new();
        let handle = task.resolve_now(5);
        assert!(handle.state().is_resolved());
        let state = handle.done().await;
        assert_eq!(state.result(), Some(5));
    }

    #[tokio::test]
    async fn test_resolve_now_supersedes_in_flight() {
        let task = TestTask::new();
        let slow = task.invoke(async {
            sleep(Duration::from_millis(50)).await;
            Ok(1)
        });
        task.resolve_now(10);

        let state = slow.done().await;
        assert_eq!(state.result(), Some(10));
    }

    #[tokio::test]
    async fn test_error_never_escapes_invoke() {
        // a rejected future must surface only as state, not as a panic or
        // an unhandled error anywhere
        let task = TestTask::new();
        let state = task
            .invoke(async { Err("contained".to_string()) })
            .done()
            .await;
        assert!(state.is_rejected());
    }
}

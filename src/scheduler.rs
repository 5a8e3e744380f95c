//! Single-shot delayed callbacks on the tokio runtime

use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a scheduled callback. Cancelling is idempotent and a no-op once
/// the callback has run.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Run `f` after `delay`. Must be called from within a tokio runtime.
pub fn schedule<F>(delay: Duration, f: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        f();
    });
    TimerHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (count, f) = counter();
        let handle = schedule(Duration::from_secs(2), f);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_firing() {
        let (count, f) = counter();
        let handle = schedule(Duration::from_secs(2), f);
        handle.cancel();
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_firing_is_noop() {
        let (count, f) = counter();
        let handle = schedule(Duration::from_millis(10), f);

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::FlowError;

/// A spawned timer/poll task tied to its owner: dropping it cancels the token.
pub(crate) struct ScopedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScopedTask {
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(f(token.clone()));
        Self { token, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Single-flight guard for one user action.
#[derive(Default)]
pub(crate) struct BusyFlag(AtomicBool);

pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl BusyFlag {
    pub fn acquire(&self) -> Result<BusyGuard<'_>, FlowError> {
        if self.0.swap(true, Ordering::AcqRel) {
            return Err(FlowError::Busy);
        }
        Ok(BusyGuard(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-item variant of [`BusyFlag`], e.g. one delete in flight per row.
pub(crate) struct BusySet<K>(Mutex<HashSet<K>>);

pub(crate) struct BusyKey<'a, K: Eq + Hash> {
    set: &'a Mutex<HashSet<K>>,
    key: Option<K>,
}

impl<K> Default for BusySet<K> {
    fn default() -> Self {
        Self(Mutex::new(HashSet::new()))
    }
}

impl<K: Eq + Hash + Clone> BusySet<K> {
    pub fn acquire(&self, key: K) -> Result<BusyKey<'_, K>, FlowError> {
        let mut set = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key.clone()) {
            return Err(FlowError::Busy);
        }
        Ok(BusyKey {
            set: &self.0,
            key: Some(key),
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).contains(key)
    }
}

impl<K: Eq + Hash> Drop for BusyKey<'_, K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.set
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn busy_flag_is_single_flight() {
        let flag = BusyFlag::default();
        let guard = flag.acquire().unwrap();
        assert!(flag.is_busy());
        assert_eq!(flag.acquire().err(), Some(FlowError::Busy));
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.acquire().is_ok());
    }

    #[test]
    fn busy_set_tracks_keys_independently() {
        let set = BusySet::default();
        let first = set.acquire(1).unwrap();
        assert!(set.acquire(2).is_ok());
        assert_eq!(set.acquire(1).err(), Some(FlowError::Busy));
        drop(first);
        assert!(!set.contains(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_task_cancels_it() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = ScopedTask::spawn(move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        let _ = tx.send(());
                    }
                }
            }
        });
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(task.is_running());
        drop(task);
        tokio::time::sleep(Duration::from_secs(10)).await;

        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert_eq!(ticks, 2);
    }
}

//! Per-key debounce timers
//!
//! Scheduling a task for a key disarms that key's previous timer if it has not
//! fired yet, so only the latest task within the quiet window runs. A task
//! whose timer already fired is never interrupted; tasks of one key run one at
//! a time, in the order their timers fired.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct DebounceRegistry<K> {
    delay: Duration,
    /// dropping a sender disarms its timer, sending fires it early
    timers: Mutex<HashMap<K, oneshot::Sender<()>>>,
    turns: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
    tasks: Mutex<Vec<(K, JoinHandle<()>)>>,
}

impl<K> DebounceRegistry<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self { delay, timers: Mutex::new(HashMap::new()), turns: Mutex::new(HashMap::new()), tasks: Mutex::new(Vec::new()) }
    }

    pub fn delay(&self) -> Duration { self.delay }

    /// Arms `key`'s timer to run `task` after the quiet window. Must be called
    /// from inside a tokio runtime.
    pub fn schedule<F>(&self, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (fire_now, fired) = oneshot::channel::<()>();
        let delay = self.delay;
        let turn = self.turns.lock().entry(key.clone()).or_default().clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                signal = fired => if signal.is_err() { return },
            }
            let _turn = turn.lock().await;
            task.await;
        });
        self.timers.lock().insert(key.clone(), fire_now);
        let mut tasks = self.tasks.lock();
        tasks.retain(|(_, t)| !t.is_finished());
        tasks.push((key, handle));
    }

    /// Disarms `key`'s timer. Returns whether a timer was still waiting.
    pub fn cancel(&self, key: &K) -> bool {
        self.timers.lock().remove(key).is_some_and(|tx| !tx.is_closed())
    }

    pub fn cancel_all(&self) { self.timers.lock().clear(); }

    /// Fires `key`'s waiting timer at once and waits for every task of that
    /// key, including one already running, to finish.
    pub async fn flush(&self, key: &K) {
        if let Some(fire_now) = self.timers.lock().remove(key) {
            let _ = fire_now.send(());
        }
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock();
            let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *tasks).into_iter().partition(|(k, _)| k == key);
            *tasks = rest;
            mine.into_iter().map(|(_, h)| h).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Whether `key` has a timer that has not fired yet.
    pub fn is_armed(&self, key: &K) -> bool {
        self.timers.lock().get(key).is_some_and(|tx| !tx.is_closed())
    }

    pub fn armed_count(&self) -> usize { self.timers.lock().values().filter(|tx| !tx.is_closed()).count() }

    /// Waits until every scheduled task has either run to completion or been disarmed.
    pub async fn settle(&self) {
        loop {
            let pending: Vec<(K, JoinHandle<()>)> = std::mem::take(&mut *self.tasks.lock());
            if pending.is_empty() { break; }
            for (_, handle) in pending {
                let _ = handle.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_task_runs() {
        let registry = DebounceRegistry::new(Duration::from_millis(500));
        let ran = Arc::new(Mutex::new(Vec::new()));
        for value in 1..=4 {
            let ran = ran.clone();
            registry.schedule("pen", async move { ran.lock().push(value) });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(registry.is_armed(&"pen"));
        registry.settle().await;
        assert_eq!(*ran.lock(), vec![4]);
        assert!(!registry.is_armed(&"pen"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let registry = DebounceRegistry::new(Duration::from_millis(500));
        let ran = Arc::new(Mutex::new(Vec::new()));
        for key in ["pen", "pencil"] {
            let ran = ran.clone();
            registry.schedule(key, async move { ran.lock().push(key) });
        }
        assert_eq!(registry.armed_count(), 2);
        registry.settle().await;
        let mut ran = ran.lock().clone();
        ran.sort();
        assert_eq!(ran, vec!["pen", "pencil"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms() {
        let registry = DebounceRegistry::new(Duration::from_millis(500));
        let ran = Arc::new(Mutex::new(0));
        let counter = ran.clone();
        registry.schedule(1, async move { *counter.lock() += 1 });
        assert!(registry.cancel(&1));
        assert!(!registry.cancel(&1));
        registry.settle().await;
        assert_eq!(*ran.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_task_finishes_before_next_of_same_key() {
        let registry = DebounceRegistry::new(Duration::from_millis(500));
        let log = Arc::new(Mutex::new(Vec::new()));
        for value in [1, 2] {
            let log = log.clone();
            registry.schedule("pen", async move {
                log.lock().push(format!("start {value}"));
                tokio::time::sleep(Duration::from_millis(1000)).await;
                log.lock().push(format!("end {value}"));
            });
            // the first timer has fired and its task is mid-flight
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
        registry.settle().await;
        assert_eq!(*log.lock(), vec!["start 1", "end 1", "start 2", "end 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_runs_waiting_task_now() {
        let registry = DebounceRegistry::new(Duration::from_millis(500));
        let ran = Arc::new(Mutex::new(Vec::new()));
        for key in ["pen", "pencil"] {
            let ran = ran.clone();
            registry.schedule(key, async move { ran.lock().push(key) });
        }
        let started = tokio::time::Instant::now();
        registry.flush(&"pen").await;
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(*ran.lock(), vec!["pen"]);
        assert!(!registry.is_armed(&"pen"));
        assert!(registry.is_armed(&"pencil"));
        registry.settle().await;
        assert_eq!(ran.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_apart_both_run() {
        let registry = DebounceRegistry::new(Duration::from_millis(500));
        let ran = Arc::new(Mutex::new(Vec::new()));
        for value in [1, 2] {
            let ran = ran.clone();
            registry.schedule("pen", async move { ran.lock().push(value) });
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
        registry.settle().await;
        assert_eq!(*ran.lock(), vec![1, 2]);
    }
}

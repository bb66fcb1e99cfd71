// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fan-out/fan-in over tokio's blocking pool.
//
// Each dispatched unit owns one slot. `join` awaits every handle in dispatch
// order, so results line up with inputs no matter which unit finished first.
// A unit that panics leaves its slot empty; the join itself never fails.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Joins N blocking units of work before a single completion.
pub struct TaskBarrier<T> {
    label: &'static str,
    limit: Option<Arc<Semaphore>>,
    slots: Vec<JoinHandle<Option<T>>>,
}

impl<T: Send + 'static> TaskBarrier<T> {
    /// Unbounded barrier; every unit is handed to the pool immediately.
    pub fn new(label: &'static str) -> Self {
        Self::with_limit(label, None)
    }

    /// At most `max_parallel` units run at once when a limit is given.
    pub fn with_limit(label: &'static str, max_parallel: Option<usize>) -> Self {
        Self {
            label,
            limit: max_parallel.map(|max| Arc::new(Semaphore::new(max.max(1)))),
            slots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run `work` on the blocking pool. Must be called within a tokio runtime.
    pub fn dispatch_blocking<F>(&mut self, work: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let unit = self.slots.len();
        let label = self.label;
        let limit = self.limit.clone();

        let handle = tokio::spawn(async move {
            let _permit = match limit {
                Some(semaphore) => Some(semaphore.acquire_owned().await.ok()?),
                None => None,
            };
            match tokio::task::spawn_blocking(work).await {
                Ok(value) => Some(value),
                Err(err) => {
                    error!(barrier = label, unit, error = %err, "Unit did not complete");
                    None
                }
            }
        });
        self.slots.push(handle);
    }

    /// Await every unit in dispatch order.
    pub async fn join(self) -> Vec<Option<T>> {
        let total = self.slots.len();
        let mut results = Vec::with_capacity(total);
        for (unit, handle) in self.slots.into_iter().enumerate() {
            let result = match handle.await {
                Ok(value) => value,
                Err(err) => {
                    error!(barrier = self.label, unit, error = %err, "Unit task failed");
                    None
                }
            };
            results.push(result);
        }
        debug!(
            barrier = self.label,
            total,
            completed = results.iter().filter(|slot| slot.is_some()).count(),
            "Barrier joined"
        );
        results
    }

    /// Join on a spawned task, then hand the results to `completion` exactly once.
    pub fn on_complete<C>(self, completion: C) -> JoinHandle<()>
    where
        C: FnOnce(Vec<Option<T>>) + Send + 'static,
    {
        tokio::spawn(async move {
            let results = self.join().await;
            completion(results);
        })
    }
}

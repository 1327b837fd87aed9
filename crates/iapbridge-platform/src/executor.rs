// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Main-thread executors.
//
// `QueuedExecutor` is the cross-thread hand-off: any thread may post, and the
// host drains the paired `MainThreadQueue` from its UI loop. `InlineExecutor`
// runs the task on the posting thread and is only correct when the channel
// behind it already marshals (or in tests).

use tokio::sync::mpsc;
use tracing::debug;

use iapbridge_core::error::{BridgeError, Result};

use crate::traits::{MainThreadExecutor, MainThreadTask};

/// Runs every task immediately on the calling thread.
pub struct InlineExecutor;

impl MainThreadExecutor for InlineExecutor {
    fn post(&self, task: MainThreadTask) -> Result<()> {
        task();
        Ok(())
    }
}

/// Posting half of a main-thread hand-off.
#[derive(Clone)]
pub struct QueuedExecutor {
    tx: mpsc::UnboundedSender<MainThreadTask>,
}

/// Draining half of a main-thread hand-off. Owned by the main thread.
pub struct MainThreadQueue {
    rx: mpsc::UnboundedReceiver<MainThreadTask>,
}

/// Create a connected executor/queue pair.
pub fn main_thread_channel() -> (QueuedExecutor, MainThreadQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueuedExecutor { tx }, MainThreadQueue { rx })
}

impl MainThreadExecutor for QueuedExecutor {
    fn post(&self, task: MainThreadTask) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|_| BridgeError::Delivery("main thread queue is closed".into()))
    }
}

impl MainThreadQueue {
    /// Run every task queued so far on the calling thread.
    ///
    /// Returns the number of tasks run. Never blocks.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            debug!(tasks = ran, "main thread queue drained");
        }
        ran
    }

    /// Wait for the next task and run it.
    ///
    /// Returns `false` once every executor has been dropped and the queue is
    /// empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn queued_tasks_wait_for_drain() {
        let (executor, mut queue) = main_thread_channel();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let c = Arc::clone(&counter);
            executor
                .post(Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }))
                .expect("post");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(queue.run_pending(), 0);
    }

    #[test]
    fn tasks_run_on_the_draining_thread() {
        let (executor, mut queue) = main_thread_channel();
        let seen = Arc::new(std::sync::Mutex::new(None));

        let s = Arc::clone(&seen);
        std::thread::spawn(move || {
            executor
                .post(Box::new(move || {
                    *s.lock().expect("lock") = Some(std::thread::current().id());
                }))
                .expect("post");
        })
        .join()
        .expect("poster thread");

        queue.run_pending();
        assert_eq!(*seen.lock().expect("lock"), Some(std::thread::current().id()));
    }

    #[test]
    fn posting_after_queue_dropped_fails() {
        let (executor, queue) = main_thread_channel();
        drop(queue);
        let err = executor.post(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, BridgeError::Delivery(_)));
    }

    #[test]
    fn inline_executor_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        InlineExecutor
            .post(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("post");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_next_stops_when_executors_are_gone() {
        let (executor, mut queue) = main_thread_channel();
        executor.post(Box::new(|| {})).expect("post");
        drop(executor);

        assert!(queue.run_next().await);
        assert!(!queue.run_next().await);
    }
}

//! Fixed-size cook pool: a shared FIFO of boxed tasks guarded by a `Mutex`
//! and woken with a `Condvar`, sized once at kitchen startup.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

/// A fixed number of cook threads pulling from one shared FIFO.
///
/// There is no task stealing and no priority: the pool is exactly as wide as
/// `total_cooks`, matching the invariant that `active_cooks` never exceeds
/// it — a job simply waits in the FIFO until a cook is free.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `size` cook threads, all blocked on the shared queue until the
    /// first task is enqueued.
    pub fn new(size: u32, name_prefix: &str) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let workers = (0..size)
            .map(|idx| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("{name_prefix}-{idx}"))
                    .spawn(move || cook_loop(shared))
                    .expect("failed to spawn cook thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Append `task` to the FIFO and wake exactly one idle cook.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock().expect("cook queue poisoned");
        queue.push_back(Box::new(task));
        self.shared.condvar.notify_one();
    }

    /// Number of tasks still waiting to be picked up by a cook.
    pub fn pending_count(&self) -> usize {
        self.shared.queue.lock().expect("cook queue poisoned").len()
    }

    /// Signal every cook to exit once its current task (if any) finishes,
    /// and join them all. Safe to call more than once.
    pub fn stop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.condvar.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn cook_loop(shared: Arc<Shared>) {
    loop {
        let mut queue = shared
            .condvar
            .wait_while(shared.queue.lock().expect("cook queue poisoned"), |q| {
                q.is_empty() && !shared.shutdown.load(Ordering::Acquire)
            })
            .expect("cook queue poisoned");

        let task = match queue.pop_front() {
            Some(task) => task,
            None => return, // empty and shutting down
        };
        drop(queue);
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn runs_every_enqueued_task() {
        let pool = ThreadPool::new(2, "test-cook");
        let (tx, rx) = mpsc::channel();
        for i in 0..8 {
            let tx = tx.clone();
            pool.enqueue(move || tx.send(i).unwrap());
        }
        drop(tx);

        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn stop_joins_idle_workers_promptly() {
        let mut pool = ThreadPool::new(4, "idle-cook");
        pool.stop();
        assert!(pool.workers.is_empty());
    }

    #[test]
    fn pending_count_drains_as_tasks_complete() {
        let pool = ThreadPool::new(1, "count-cook");
        let (tx, rx) = mpsc::channel::<()>();
        pool.enqueue(move || {
            thread::sleep(Duration::from_millis(30));
            let _ = tx.send(());
        });
        pool.enqueue(|| {});
        // Give the first task time to be picked up, leaving the second queued.
        thread::sleep(Duration::from_millis(5));
        assert!(pool.pending_count() <= 1);
        rx.recv().unwrap();
    }
}

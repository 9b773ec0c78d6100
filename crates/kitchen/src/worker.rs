//! The kitchen's single-threaded event loop: non-blocking receive, bounded
//! admission onto the cook pool, and idle retirement.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use plazza_ipc::Channel;
use plazza_protocol::{IpcError, Message, PizzaJob, WorkerError, WorkerStatus};

use crate::pool::ThreadPool;
use crate::stock::Stock;

/// Everything a kitchen needs at construction time, fixed by the command
/// line for the whole fleet and carried down through the fork.
#[derive(Debug, Clone, Copy)]
pub struct KitchenConfig {
    /// Monotonic id assigned by the dispatcher at fork time.
    pub worker_id: u64,
    /// Size of this kitchen's cook pool.
    pub total_cooks: u32,
    /// How often the ingredient stock is replenished.
    pub restock_period: Duration,
    /// How long the kitchen must sit idle before `should_retire()` trips.
    pub idle_timeout: Duration,
}

struct Shared {
    worker_id: u64,
    total_cooks: u32,
    max_capacity: u32,
    stock: Stock,
    pool: ThreadPool,
    queue: Mutex<VecDeque<PizzaJob>>,
    active_cooks: AtomicU32,
    last_activity: Mutex<Instant>,
    channel: Mutex<Channel>,
}

impl Shared {
    fn touch(&self) {
        *self.last_activity.lock().expect("last-activity mutex poisoned") = Instant::now();
    }

    /// Build a `WorkerStatus` with the queue lock held for the whole
    /// construction, so `active_cooks` and the stock snapshot are read
    /// against the same queue state that produced `queued_jobs` rather than
    /// whatever `dispatch_waiting`/`cook_one` have moved on to by the time a
    /// later field is read.
    fn status(&self) -> WorkerStatus {
        let queue = self.queue.lock().expect("queue mutex poisoned");
        WorkerStatus {
            worker_id: self.worker_id,
            active_cooks: self.active_cooks.load(Ordering::Acquire),
            total_cooks: self.total_cooks,
            queued_jobs: queue.len() as u32,
            max_capacity: self.max_capacity,
            ingredient_counts: self.stock.snapshot(),
        }
    }

    /// Admit `job` onto the FIFO if there's room, then hand as many waiting
    /// jobs as there are free cooks off to the pool.
    ///
    /// A job is only ever popped from the FIFO here, at the moment it is
    /// handed to a cook — not when the cook finishes — so `queued_jobs` in
    /// `status()` always means "accepted but not yet being cooked".
    fn accept(self: &Arc<Self>, job: PizzaJob) {
        {
            let mut queue = self.queue.lock().expect("queue mutex poisoned");
            let active = self.active_cooks.load(Ordering::Acquire);
            if queue.len() as u32 + active >= self.max_capacity {
                let err =
                    WorkerError::QueueFull { worker_id: self.worker_id, capacity: self.max_capacity };
                tracing::warn!(%err, "refusing pizza job");
                return;
            }
            queue.push_back(job);
        }
        self.touch();
        self.dispatch_waiting();
    }

    fn dispatch_waiting(self: &Arc<Self>) {
        loop {
            let job = {
                let mut queue = self.queue.lock().expect("queue mutex poisoned");
                if self.active_cooks.load(Ordering::Acquire) >= self.total_cooks {
                    return;
                }
                let job = match queue.pop_front() {
                    Some(job) => job,
                    None => return,
                };
                // Bumped while still holding the queue lock so a `status()`
                // snapshot taken concurrently never observes the job gone
                // from the queue but not yet counted as an active cook.
                self.active_cooks.fetch_add(1, Ordering::AcqRel);
                job
            };

            let shared = Arc::clone(self);
            self.pool.enqueue(move || cook_one(shared, job));
        }
    }
}

/// Run one cook: check and consume stock, sleep the cook time, report
/// completion, then free the cook slot and look for the next waiting job.
fn cook_one(shared: Arc<Shared>, job: PizzaJob) {
    match shared.stock.try_consume(job.pizza_type.ingredients()) {
        Ok(()) => {
            thread::sleep(Duration::from_millis(job.cook_time_ms));
            let frame = Message::Completed(job.into_cooked()).encode();
            let mut channel = shared.channel.lock().expect("channel mutex poisoned");
            if let Err(err) = channel.send(&frame) {
                tracing::warn!(worker_id = shared.worker_id, %err, "failed to send completion");
            }
        }
        Err(ingredient) => {
            let err = WorkerError::OutOfStock {
                worker_id: shared.worker_id,
                ingredient: format!("{ingredient:?}"),
            };
            tracing::warn!(%err, "dropping job, no completion will be sent");
        }
    }

    shared.active_cooks.fetch_sub(1, Ordering::AcqRel);
    shared.touch();
    shared.dispatch_waiting();
}

/// One forked worker process: ingredient stock, cook pool, restock ticker
/// and the IPC event loop that drives them.
pub struct Kitchen {
    shared: Arc<Shared>,
    idle_timeout: Duration,
    restock_stop: Arc<AtomicBool>,
    restock_handle: Option<JoinHandle<()>>,
}

impl Kitchen {
    /// Build a kitchen bound to `channel`, starting its restock ticker
    /// immediately.
    pub fn new(config: KitchenConfig, channel: Channel) -> Self {
        let shared = Arc::new(Shared {
            worker_id: config.worker_id,
            total_cooks: config.total_cooks,
            max_capacity: config.total_cooks * 2,
            stock: Stock::new(),
            pool: ThreadPool::new(config.total_cooks, &format!("cook-{}", config.worker_id)),
            queue: Mutex::new(VecDeque::new()),
            active_cooks: AtomicU32::new(0),
            last_activity: Mutex::new(Instant::now()),
            channel: Mutex::new(channel),
        });

        let restock_stop = Arc::new(AtomicBool::new(false));
        let restock_handle = {
            let shared = Arc::clone(&shared);
            let restock_stop = Arc::clone(&restock_stop);
            let period = config.restock_period;
            thread::Builder::new()
                .name(format!("restock-{}", config.worker_id))
                .spawn(move || restock_loop(shared, restock_stop, period))
                .expect("failed to spawn restock thread")
        };

        Self { shared, idle_timeout: config.idle_timeout, restock_stop, restock_handle: Some(restock_handle) }
    }

    /// Drive the event loop until the channel closes or the kitchen has
    /// been idle long enough to retire. Consumes the kitchen: there is
    /// nothing useful left to do with it once this returns.
    pub fn run(mut self) {
        loop {
            let message = {
                let mut channel = self.shared.channel.lock().expect("channel mutex poisoned");
                channel.receive()
            };

            let mut handled = false;
            match message {
                Ok(bytes) if !bytes.is_empty() => {
                    handled = true;
                    self.dispatch_message(&bytes);
                }
                Ok(_) => {}
                Err(IpcError::Closed) => {
                    tracing::info!(worker_id = self.shared.worker_id, "channel closed, kitchen exiting");
                    break;
                }
                Err(err) => {
                    tracing::warn!(worker_id = self.shared.worker_id, %err, "receive failed");
                }
            }

            if !handled && self.should_retire() {
                tracing::info!(worker_id = self.shared.worker_id, "idle timeout reached, retiring");
                break;
            }

            thread::sleep(if handled { Duration::from_millis(10) } else { Duration::from_millis(100) });
        }

        self.restock_stop.store(true, Ordering::Release);
        if let Some(handle) = self.restock_handle.take() {
            let _ = handle.join();
        }
        self.shared.channel.lock().expect("channel mutex poisoned").close();
    }

    fn dispatch_message(&self, bytes: &[u8]) {
        match Message::decode(bytes) {
            Ok(Message::Pizza(job)) => self.shared.accept(job),
            Ok(Message::StatusRequest) => self.send_status(),
            Ok(other) => {
                tracing::debug!(worker_id = self.shared.worker_id, ?other, "ignoring message kind");
            }
            Err(err) => {
                tracing::warn!(worker_id = self.shared.worker_id, %err, "could not decode frame");
            }
        }
    }

    fn send_status(&self) {
        let status = self.shared.status();
        let frame = Message::Status(status).encode();
        let mut channel = self.shared.channel.lock().expect("channel mutex poisoned");
        if let Err(err) = channel.send(&frame) {
            tracing::warn!(worker_id = self.shared.worker_id, %err, "failed to send status");
        }
    }

    /// `active_cooks == 0 ∧ queue empty ∧ idle longer than `idle_timeout``.
    fn should_retire(&self) -> bool {
        let idle = self.shared.active_cooks.load(Ordering::Acquire) == 0
            && self.shared.queue.lock().expect("queue mutex poisoned").is_empty();
        if !idle {
            return false;
        }
        let elapsed = self.shared.last_activity.lock().expect("last-activity mutex poisoned").elapsed();
        elapsed > self.idle_timeout
    }
}

fn restock_loop(shared: Arc<Shared>, stop: Arc<AtomicBool>, period: Duration) {
    while !stop.load(Ordering::Acquire) {
        thread::sleep(period);
        if stop.load(Ordering::Acquire) {
            return;
        }
        shared.stock.restock_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plazza_ipc::create_channel_pair;
    use plazza_protocol::{PizzaSize, PizzaType};

    fn config(worker_id: u64, total_cooks: u32) -> KitchenConfig {
        KitchenConfig {
            worker_id,
            total_cooks,
            restock_period: Duration::from_secs(3600),
            idle_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn retires_after_idle_timeout_with_no_traffic() {
        let pair = create_channel_pair().unwrap();
        let kitchen = Kitchen::new(config(1, 2), pair.child);
        let start = Instant::now();
        kitchen.run();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn cooks_a_pizza_and_reports_completion() {
        let pair = create_channel_pair().unwrap();
        let kitchen = Kitchen::new(config(2, 1), pair.child);
        let handle = thread::spawn(move || kitchen.run());

        let mut parent = pair.parent;
        let job = PizzaJob::new(PizzaType::Margarita, PizzaSize::S, 0.01);
        parent.send(&Message::Pizza(job).encode()).unwrap();

        let mut completion = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while completion.is_empty() && Instant::now() < deadline {
            completion = parent.receive().unwrap();
            if completion.is_empty() {
                thread::sleep(Duration::from_millis(10));
            }
        }

        match Message::decode(&completion).unwrap() {
            Message::Completed(done) => {
                assert_eq!(done.pizza_type, PizzaType::Margarita);
                assert!(done.cooked);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        parent.close();
        handle.join().unwrap();
    }

    #[test]
    fn status_request_reports_zero_load_when_idle() {
        let pair = create_channel_pair().unwrap();
        let kitchen = Kitchen::new(config(3, 2), pair.child);
        let handle = thread::spawn(move || kitchen.run());

        let mut parent = pair.parent;
        parent.send(&Message::StatusRequest.encode()).unwrap();

        let mut reply = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(1);
        while reply.is_empty() && Instant::now() < deadline {
            reply = parent.receive().unwrap();
            if reply.is_empty() {
                thread::sleep(Duration::from_millis(10));
            }
        }

        match Message::decode(&reply).unwrap() {
            Message::Status(status) => {
                assert_eq!(status.worker_id, 3);
                assert_eq!(status.active_cooks, 0);
                assert_eq!(status.total_cooks, 2);
                assert_eq!(status.max_capacity, 4);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        parent.close();
        handle.join().unwrap();
    }
}

//! `KitchenManager`: the worker registry, the fork protocol, the
//! load-balancing selection rule, and idle retirement.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};

use plazza_ipc::{create_channel_pair, Channel};
use plazza_kitchen::{Kitchen, KitchenConfig};
use plazza_protocol::{Message, PizzaJob, SchedulerError, WorkerStatus};

/// Fleet-wide settings fixed at startup and handed to every forked kitchen.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Size of each kitchen's cook pool.
    pub cooks_per_kitchen: u32,
    /// How often a kitchen replenishes its ingredient stock.
    pub restock_period: Duration,
    /// How long a kitchen sits idle before it retires itself.
    pub idle_timeout: Duration,
    /// How long a worker must have `in_flight_count == 0` before `sweep_idle`
    /// retires it from the dispatcher side.
    pub retire_timeout: Duration,
    /// Mirror forked kitchens' logs to stderr in addition to their log file.
    pub verbose: bool,
}

impl FleetConfig {
    /// `2 * cooks_per_kitchen`: the admission ceiling used by the selection rule.
    pub fn max_capacity(&self) -> u32 {
        self.cooks_per_kitchen * 2
    }
}

enum WorkerState {
    Alive,
    Retiring,
}

struct WorkerRecord {
    worker_id: u64,
    pid: Pid,
    channel: Channel,
    in_flight_count: u32,
    last_activity: Instant,
    state: WorkerState,
}

/// Owns the live worker registry and is the sole place `fork()` is called
/// from. Every public method takes the registry lock once at entry.
pub struct KitchenManager {
    config: FleetConfig,
    registry: Mutex<Vec<WorkerRecord>>,
    next_worker_id: AtomicU64,
}

impl KitchenManager {
    /// An empty fleet, ready to fork its first kitchen on the first order.
    pub fn new(config: FleetConfig) -> Self {
        Self { config, registry: Mutex::new(Vec::new()), next_worker_id: AtomicU64::new(1) }
    }

    /// Hand `job` to exactly one kitchen, forking a new one if every live
    /// kitchen is at capacity.
    pub fn distribute(&self, job: PizzaJob) -> Result<(), SchedulerError> {
        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        self.reap_dead(&mut registry);
        self.drain_completions(&mut registry);

        let mut idx = match self.select(&registry) {
            Some(idx) => idx,
            None => self.fork_worker(&mut registry)?,
        };

        if registry[idx].in_flight_count >= self.config.max_capacity() {
            idx = self.fork_worker(&mut registry)?;
        }

        let frame = Message::Pizza(job).encode();
        let record = &mut registry[idx];
        match record.channel.send(&frame) {
            Ok(()) => {
                record.in_flight_count += 1;
                record.last_activity = Instant::now();
                Ok(())
            }
            Err(err) => Err(SchedulerError::SendFailed {
                worker_id: record.worker_id,
                reason: err.to_string(),
            }),
        }
    }

    /// Reap dead children and retire kitchens that have been idle past
    /// `retire_timeout`.
    pub fn sweep_idle(&self) {
        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        self.reap_dead(&mut registry);
        self.drain_completions(&mut registry);

        let retiring: Vec<u64> = registry
            .iter()
            .filter(|r| {
                matches!(r.state, WorkerState::Alive)
                    && r.in_flight_count == 0
                    && r.last_activity.elapsed() > self.config.retire_timeout
            })
            .map(|r| r.worker_id)
            .collect();

        for worker_id in retiring {
            if let Some(pos) = registry.iter().position(|r| r.worker_id == worker_id) {
                registry[pos].state = WorkerState::Retiring;
                let mut record = registry.remove(pos);
                retire_record(&mut record);
            }
        }
    }

    /// Poll every live kitchen for a status snapshot, falling back to a
    /// synthetic one for any that doesn't answer in time.
    pub fn display_status(&self) -> Vec<WorkerStatus> {
        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        self.reap_dead(&mut registry);
        self.drain_completions(&mut registry);

        registry.iter_mut().map(|record| self.poll_status(record)).collect()
    }

    /// `SIGTERM` every live kitchen, wait for exit (falling back to
    /// `SIGKILL`), and empty the registry.
    pub fn shutdown(&self) {
        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        for mut record in registry.drain(..) {
            retire_record(&mut record);
        }
    }

    /// Number of kitchens currently tracked as alive.
    pub fn worker_count(&self) -> usize {
        self.registry.lock().expect("registry mutex poisoned").len()
    }

    fn select(&self, registry: &[WorkerRecord]) -> Option<usize> {
        let max_capacity = self.config.max_capacity();
        let mut best: Option<usize> = None;
        for (idx, record) in registry.iter().enumerate() {
            if !matches!(record.state, WorkerState::Alive) || record.in_flight_count >= max_capacity {
                continue;
            }
            if record.in_flight_count == 0 {
                return Some(idx);
            }
            best = match best {
                Some(current) if registry[current].in_flight_count <= record.in_flight_count => Some(current),
                _ => Some(idx),
            };
        }
        best
    }

    fn reap_dead(&self, registry: &mut Vec<WorkerRecord>) {
        registry.retain_mut(|record| match waitpid(record.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(_) => {
                tracing::info!(worker_id = record.worker_id, "kitchen process exited, reaping");
                false
            }
            Err(_) => false,
        });
    }

    fn drain_completions(&self, registry: &mut [WorkerRecord]) {
        for record in registry.iter_mut() {
            loop {
                match record.channel.receive() {
                    Ok(bytes) if !bytes.is_empty() => match Message::decode(&bytes) {
                        Ok(Message::Completed(_)) => {
                            record.in_flight_count = record.in_flight_count.saturating_sub(1);
                            record.last_activity = Instant::now();
                        }
                        Ok(other) => {
                            tracing::debug!(worker_id = record.worker_id, ?other, "ignoring message while draining");
                        }
                        Err(err) => {
                            tracing::warn!(worker_id = record.worker_id, %err, "could not decode frame from kitchen");
                        }
                    },
                    Ok(_) => break,
                    Err(err) => {
                        tracing::warn!(worker_id = record.worker_id, %err, "receive failed while draining");
                        break;
                    }
                }
            }
        }
    }

    fn fork_worker(&self, registry: &mut Vec<WorkerRecord>) -> Result<usize, SchedulerError> {
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let pair = create_channel_pair().map_err(|err| SchedulerError::SpawnFailed(err.to_string()))?;

        // SAFETY: the child branch never returns to the caller — it runs the
        // kitchen event loop and calls `process::exit` directly — and the
        // parent branch only ever touches its own half of `pair`.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                drop(pair.parent);
                run_kitchen_child(worker_id, &self.config, pair.child);
            }
            Ok(ForkResult::Parent { child }) => {
                drop(pair.child);
                // Give the child a moment to install its event loop before
                // the first send lands on its read end.
                thread::sleep(Duration::from_millis(100));
                registry.push(WorkerRecord {
                    worker_id,
                    pid: child,
                    channel: pair.parent,
                    in_flight_count: 0,
                    last_activity: Instant::now(),
                    state: WorkerState::Alive,
                });
                Ok(())
            }
            Err(err) => Err(SchedulerError::SpawnFailed(format!("fork(): {err}"))),
        }?;

        Ok(registry.len() - 1)
    }

    fn poll_status(&self, record: &mut WorkerRecord) -> WorkerStatus {
        if let Err(err) = record.channel.send(&Message::StatusRequest.encode()) {
            tracing::warn!(worker_id = record.worker_id, %err, "failed to request status");
            return WorkerStatus::synthetic_fallback(record.worker_id, self.config.cooks_per_kitchen);
        }

        for _ in 0..50 {
            match record.channel.receive() {
                Ok(bytes) if !bytes.is_empty() => match Message::decode(&bytes) {
                    Ok(Message::Status(status)) => return status,
                    Ok(Message::Completed(_)) => {
                        record.in_flight_count = record.in_flight_count.saturating_sub(1);
                        record.last_activity = Instant::now();
                    }
                    Ok(other) => {
                        tracing::debug!(worker_id = record.worker_id, ?other, "ignoring message while polling status");
                    }
                    Err(err) => {
                        tracing::warn!(worker_id = record.worker_id, %err, "could not decode frame");
                    }
                },
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(worker_id = record.worker_id, %err, "receive failed while polling status");
                    break;
                }
            }
            thread::sleep(Duration::from_millis(10));
        }

        WorkerStatus::synthetic_fallback(record.worker_id, self.config.cooks_per_kitchen)
    }
}

/// Runs only in the forked child; never returns.
fn run_kitchen_child(worker_id: u64, config: &FleetConfig, channel: Channel) -> ! {
    let log_path = PathBuf::from(format!("kitchen_{worker_id}.log"));
    if let Err(err) = plazza_protocol::logging::init(&log_path, config.verbose) {
        eprintln!("kitchen {worker_id}: failed to initialize logging: {err}");
    }

    let kitchen_config = KitchenConfig {
        worker_id,
        total_cooks: config.cooks_per_kitchen,
        restock_period: config.restock_period,
        idle_timeout: config.idle_timeout,
    };
    Kitchen::new(kitchen_config, channel).run();
    process::exit(0);
}

fn retire_record(record: &mut WorkerRecord) {
    if let Err(err) = kill(record.pid, Signal::SIGTERM) {
        tracing::warn!(worker_id = record.worker_id, %err, "failed to send SIGTERM");
    }

    let mut exited = false;
    for _ in 0..10 {
        match waitpid(record.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => thread::sleep(Duration::from_millis(100)),
            Ok(_) | Err(_) => {
                exited = true;
                break;
            }
        }
    }

    if !exited {
        tracing::warn!(worker_id = record.worker_id, "kitchen still alive after SIGTERM, sending SIGKILL");
        let _ = kill(record.pid, Signal::SIGKILL);
        let _ = waitpid(record.pid, None);
    }

    record.channel.close();
    tracing::info!(worker_id = record.worker_id, "kitchen retired");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FleetConfig {
        FleetConfig {
            cooks_per_kitchen: 2,
            restock_period: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10),
            retire_timeout: Duration::from_secs(10),
            verbose: false,
        }
    }

    #[test]
    fn select_prefers_an_untouched_worker() {
        let manager = KitchenManager::new(config());
        let registry = vec![
            WorkerRecord {
                worker_id: 1,
                pid: Pid::this(),
                channel: create_channel_pair().unwrap().parent,
                in_flight_count: 3,
                last_activity: Instant::now(),
                state: WorkerState::Alive,
            },
            WorkerRecord {
                worker_id: 2,
                pid: Pid::this(),
                channel: create_channel_pair().unwrap().parent,
                in_flight_count: 0,
                last_activity: Instant::now(),
                state: WorkerState::Alive,
            },
        ];
        assert_eq!(manager.select(&registry), Some(1));
    }

    #[test]
    fn select_skips_workers_at_capacity() {
        let manager = KitchenManager::new(config());
        let registry = vec![WorkerRecord {
            worker_id: 1,
            pid: Pid::this(),
            channel: create_channel_pair().unwrap().parent,
            in_flight_count: 4,
            last_activity: Instant::now(),
            state: WorkerState::Alive,
        }];
        assert_eq!(manager.select(&registry), None);
    }

    #[test]
    fn select_ignores_retiring_workers() {
        let manager = KitchenManager::new(config());
        let registry = vec![WorkerRecord {
            worker_id: 1,
            pid: Pid::this(),
            channel: create_channel_pair().unwrap().parent,
            in_flight_count: 0,
            last_activity: Instant::now(),
            state: WorkerState::Retiring,
        }];
        assert_eq!(manager.select(&registry), None);
    }

    #[test]
    fn new_fleet_starts_with_no_workers() {
        let manager = KitchenManager::new(config());
        assert_eq!(manager.worker_count(), 0);
    }
}

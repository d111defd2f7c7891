// ── Polling scheduler ──
//
// Timer-driven round robin over the scheduled resource types. One fetch
// is launched per tick and never more than one worker per type is in
// flight. Fetch results travel to the store through the apply channel.

pub(crate) mod apply;
pub(crate) mod worker;

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::PollSchedule;
use crate::model::ResourceType;

/// What a single [`TaskManager::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Workers found finished and joined.
    pub reaped: Vec<ResourceType>,
    /// A new round started: pending was refilled with every type.
    pub refilled: bool,
    /// Type whose fetch was launched.
    pub launched: Option<ResourceType>,
    /// Types dropped from this round because they were polled too recently.
    pub skipped: Vec<ResourceType>,
}

/// Pending queue and in-flight workers. Owned by the scheduler task only.
pub struct TaskManager {
    resources: Vec<ResourceType>,
    min_intervals: HashMap<ResourceType, Duration>,
    pending: VecDeque<ResourceType>,
    in_flight: HashMap<ResourceType, JoinHandle<()>>,
    last_launch: HashMap<ResourceType, Instant>,
    rounds: u64,
}

impl TaskManager {
    pub fn new(schedule: &PollSchedule) -> Self {
        let mut resources: Vec<ResourceType> = Vec::with_capacity(schedule.resources.len());
        for kind in &schedule.resources {
            if !resources.contains(kind) {
                resources.push(*kind);
            }
        }

        Self {
            resources,
            min_intervals: schedule.min_intervals.clone(),
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            last_launch: HashMap::new(),
            rounds: 0,
        }
    }

    /// Advance the scheduler by one tick.
    ///
    /// Finished workers are joined first. A new round starts only once
    /// the previous one is fully drained: nothing pending, nothing in
    /// flight. Then the first launchable pending type is handed to
    /// `launch`, which must spawn its worker.
    pub async fn tick<F>(&mut self, mut launch: F) -> TickReport
    where
        F: FnMut(ResourceType) -> JoinHandle<()>,
    {
        let mut report = TickReport {
            reaped: self.reap().await,
            ..TickReport::default()
        };

        if self.pending.is_empty() && self.in_flight.is_empty() && !self.resources.is_empty() {
            self.pending.extend(self.resources.iter().copied());
            self.rounds += 1;
            report.refilled = true;
            debug!(round = self.rounds, "pending refilled");
        }

        let now = Instant::now();
        // Each pending entry is examined at most once per tick.
        for _ in 0..self.pending.len() {
            let Some(kind) = self.pending.pop_front() else {
                break;
            };

            if self.in_flight.contains_key(&kind) {
                self.pending.push_back(kind);
                continue;
            }

            if self.polled_recently(kind, now) {
                debug!(%kind, "polled too recently, skipped this round");
                report.skipped.push(kind);
                continue;
            }

            debug!(%kind, "launching fetch");
            self.in_flight.insert(kind, launch(kind));
            self.last_launch.insert(kind, now);
            report.launched = Some(kind);
            break;
        }

        report
    }

    fn polled_recently(&self, kind: ResourceType, now: Instant) -> bool {
        match (self.min_intervals.get(&kind), self.last_launch.get(&kind)) {
            (Some(min), Some(last)) => now.saturating_duration_since(*last) < *min,
            _ => false,
        }
    }

    async fn reap(&mut self) -> Vec<ResourceType> {
        let finished: Vec<ResourceType> = self
            .in_flight
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(kind, _)| *kind)
            .collect();

        for kind in &finished {
            if let Some(handle) = self.in_flight.remove(kind) {
                if let Err(e) = handle.await {
                    warn!(%kind, error = %e, "fetch worker panicked");
                }
            }
        }
        finished
    }

    /// Join every in-flight worker, waiting at most `grace` for each,
    /// and abort the stragglers. Workers must already have been told to
    /// stop through their cancellation token. Returns how many were
    /// aborted.
    pub async fn shutdown(&mut self, grace: Duration) -> usize {
        self.pending.clear();
        let mut aborted = 0;
        for (kind, mut handle) in self.in_flight.drain() {
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!(%kind, "fetch worker did not stop in time, aborting");
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    pub fn is_in_flight(&self, kind: ResourceType) -> bool {
        self.in_flight.contains_key(&kind)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of rounds started so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    use super::*;

    fn schedule(resources: Vec<ResourceType>) -> PollSchedule {
        PollSchedule {
            resources,
            ..PollSchedule::default()
        }
    }

    /// Spawns a worker that finishes immediately, recording the launch.
    fn quick(log: &Arc<Mutex<Vec<ResourceType>>>) -> impl FnMut(ResourceType) -> JoinHandle<()> {
        let log = Arc::clone(log);
        move |kind| {
            log.lock().unwrap().push(kind);
            tokio::spawn(async {})
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn one_launch_per_tick_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tm = TaskManager::new(&schedule(vec![
            ResourceType::Host,
            ResourceType::Service,
            ResourceType::Host,
        ]));

        for _ in 0..2 {
            tm.tick(quick(&log)).await;
            settle().await;
        }

        assert_eq!(
            *log.lock().unwrap(),
            vec![ResourceType::Host, ResourceType::Service]
        );
    }

    #[tokio::test]
    async fn never_two_workers_for_the_same_type() {
        let launches = Arc::new(Mutex::new(Vec::new()));
        let mut tm = TaskManager::new(&schedule(vec![ResourceType::Host]));

        for _ in 0..5 {
            let launches = Arc::clone(&launches);
            tm.tick(move |kind| {
                launches.lock().unwrap().push(kind);
                tokio::spawn(std::future::pending::<()>())
            })
            .await;
            settle().await;
        }

        assert_eq!(launches.lock().unwrap().len(), 1);
        assert!(tm.is_in_flight(ResourceType::Host));
        assert_eq!(tm.rounds(), 1);
        tm.shutdown(Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn refill_waits_for_stragglers() {
        let mut tm = TaskManager::new(&schedule(vec![ResourceType::Host, ResourceType::Service]));

        // Host hangs, Service finishes.
        let report = tm
            .tick(|_| tokio::spawn(std::future::pending::<()>()))
            .await;
        assert_eq!(report.launched, Some(ResourceType::Host));
        settle().await;

        let report = tm.tick(|_| tokio::spawn(async {})).await;
        assert_eq!(report.launched, Some(ResourceType::Service));
        settle().await;

        let report = tm.tick(|_| tokio::spawn(async {})).await;
        assert_eq!(report.reaped, vec![ResourceType::Service]);
        assert!(!report.refilled);
        assert_eq!(report.launched, None);

        tm.shutdown(Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn refills_exactly_once_after_drain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tm = TaskManager::new(&schedule(vec![ResourceType::Host, ResourceType::Service]));

        let mut refills = Vec::new();
        for _ in 0..4 {
            refills.push(tm.tick(quick(&log)).await.refilled);
            settle().await;
        }

        assert_eq!(refills, vec![true, false, true, false]);
        assert_eq!(tm.rounds(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ResourceType::Host,
                ResourceType::Service,
                ResourceType::Host,
                ResourceType::Service,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn min_interval_skips_type_for_the_round() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sched = schedule(vec![ResourceType::Daemon, ResourceType::Host]);
        sched
            .min_intervals
            .insert(ResourceType::Daemon, Duration::from_secs(60));
        let mut tm = TaskManager::new(&sched);

        tm.tick(quick(&log)).await;
        settle().await;
        tm.tick(quick(&log)).await;
        settle().await;

        // Second round: Daemon was launched 20ms ago.
        let report = tm.tick(quick(&log)).await;
        assert!(report.refilled);
        assert_eq!(report.skipped, vec![ResourceType::Daemon]);
        assert_eq!(report.launched, Some(ResourceType::Host));

        // Once the interval has elapsed it is polled again.
        settle().await;
        tokio::time::advance(Duration::from_secs(61)).await;
        let report = tm.tick(quick(&log)).await;
        assert!(report.refilled);
        assert_eq!(report.launched, Some(ResourceType::Daemon));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_workers_past_grace() {
        let mut tm = TaskManager::new(&schedule(vec![ResourceType::Host]));
        tm.tick(|_| tokio::spawn(std::future::pending::<()>()))
            .await;

        let aborted = tm.shutdown(Duration::from_secs(2)).await;
        assert_eq!(aborted, 1);
        assert_eq!(tm.in_flight_count(), 0);
    }
}

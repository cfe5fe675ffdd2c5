//! Repetition / looping control
//!
//! ```text
//! Idle -> WaitingForTarget -> Evaluating -> Reporting -> Sleeping -> Evaluating ...
//!                                                    \-> Terminated
//! ```
//!
//! Passes never overlap: a summary is reported before the next pass starts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::config::TrimConfig;
use super::error::TrimError;
use super::pass::TrimPass;
use super::policy::{NamePattern, PolicyError, TrimPolicy};
use crate::platform::{Platform, ProcessFilter};
use crate::report::ReportSink;

/// Poll period while waiting for a target process to appear.
pub const DEFAULT_WAIT_POLL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    WaitingForTarget,
    /// Predicate chain and executor running over the process table
    Evaluating,
    Reporting,
    Sleeping,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// One-shot run finished its pass
    Completed,
    /// Every explicitly targeted pid has exited
    TargetsExited,
    /// Shutdown signal received
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub passes: usize,
    pub failed_passes: usize,
    pub stop: StopReason,
}

/// When passes run.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Interval between passes, `None` for a single pass
    pub repeat: Option<Duration>,
    /// Wait for one of these processes before the first pass
    pub wait_for: Vec<NamePattern>,
    pub wait_poll: Duration,
}

impl Schedule {
    pub fn once() -> Self {
        Self { repeat: None, wait_for: Vec::new(), wait_poll: DEFAULT_WAIT_POLL }
    }

    pub fn from_config(config: &TrimConfig) -> Result<Self, PolicyError> {
        let wait_for = config
            .wait_for
            .iter()
            .map(|p| NamePattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        let repeat = config.repeat.then(|| Duration::from_secs(config.interval_secs));
        let wait_poll = repeat.unwrap_or(DEFAULT_WAIT_POLL).min(DEFAULT_WAIT_POLL);
        Ok(Self { repeat, wait_for, wait_poll })
    }
}

pub struct Scheduler<'a, P: Platform> {
    platform: &'a P,
    pass: TrimPass<'a, P>,
    schedule: Schedule,
    state: RunState,
}

impl<'a, P: Platform> Scheduler<'a, P> {
    pub fn new(platform: &'a P, policy: &'a TrimPolicy, schedule: Schedule) -> Self {
        Self {
            platform,
            pass: TrimPass::new(platform, policy),
            schedule,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn enter(&mut self, state: RunState) {
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Drive passes until the schedule is exhausted, the targets are gone or
    /// `shutdown` resolves. A one-shot pass that aborts is an error; in a
    /// loop the failure is logged and the next pass runs as usual.
    pub async fn run<S, F>(&mut self, sink: &mut S, shutdown: F) -> Result<RunReport, TrimError>
    where
        S: ReportSink + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut report = RunReport { passes: 0, failed_passes: 0, stop: StopReason::Completed };

        if !self.schedule.wait_for.is_empty() {
            self.enter(RunState::WaitingForTarget);
            info!("Waiting for target process to start");
            while !self.target_started() {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => return Ok(self.terminate(report, StopReason::Interrupted)),
                    _ = tokio::time::sleep(self.schedule.wait_poll) => {}
                }
            }
        }

        loop {
            self.enter(RunState::Evaluating);
            match self.pass.run() {
                Ok(summary) => {
                    self.enter(RunState::Reporting);
                    sink.emit(&summary)?;
                    report.passes += 1;
                }
                Err(err) if self.schedule.repeat.is_none() => {
                    self.enter(RunState::Terminated);
                    return Err(err.into());
                }
                Err(err) => {
                    error!("Pass failed: {}", err);
                    report.failed_passes += 1;
                }
            }

            let Some(interval) = self.schedule.repeat else {
                return Ok(self.terminate(report, StopReason::Completed));
            };
            if self.targets_exited() {
                info!("All target processes have exited");
                return Ok(self.terminate(report, StopReason::TargetsExited));
            }

            self.enter(RunState::Sleeping);
            tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(self.terminate(report, StopReason::Interrupted)),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn terminate(&mut self, report: RunReport, stop: StopReason) -> RunReport {
        self.enter(RunState::Terminated);
        RunReport { stop, ..report }
    }

    fn target_started(&self) -> bool {
        match self.platform.list_processes(&ProcessFilter::default()) {
            Ok(processes) => processes
                .iter()
                .any(|p| self.schedule.wait_for.iter().any(|pattern| pattern.matches_process(&p.name))),
            Err(err) => {
                warn!("Cannot list processes while waiting: {}", err);
                false
            }
        }
    }

    fn targets_exited(&self) -> bool {
        let pids = &self.pass.policy().pids;
        if pids.is_empty() {
            return false;
        }
        match self.platform.list_processes(&ProcessFilter::pids(pids)) {
            Ok(alive) => alive.is_empty(),
            Err(err) => {
                warn!("Cannot check target processes: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::summary::TrimSummary;
    use crate::platform::mock::{MockPlatform, MockProcess};
    use crate::platform::PlatformError;

    const MB: u64 = 1024 * 1024;

    #[derive(Default)]
    struct CollectingSink {
        summaries: Vec<TrimSummary>,
    }

    impl ReportSink for CollectingSink {
        fn emit(&mut self, summary: &TrimSummary) -> std::io::Result<()> {
            self.summaries.push(summary.clone());
            Ok(())
        }
    }

    fn looping(interval: Duration) -> Schedule {
        Schedule { repeat: Some(interval), ..Schedule::once() }
    }

    #[tokio::test]
    async fn test_single_pass() {
        let platform = MockPlatform::new().with_process(MockProcess::new(1, "a.exe", 80 * MB));
        let policy = TrimPolicy::from_config(&TrimConfig::default()).unwrap();
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, Schedule::once());
        let report = scheduler.run(&mut sink, std::future::pending()).await.unwrap();

        assert_eq!(report, RunReport { passes: 1, failed_passes: 0, stop: StopReason::Completed });
        assert_eq!(scheduler.state(), RunState::Terminated);
        assert_eq!(sink.summaries.len(), 1);
        assert_eq!(sink.summaries[0].trimmed, 1);
    }

    #[tokio::test]
    async fn test_loop_stops_when_targets_exit() {
        // Alive for the first pass and the first exit check only
        let platform = MockPlatform::new()
            .with_process(MockProcess::new(10, "target.exe", 80 * MB).lives_for(2))
            .with_process(MockProcess::new(11, "other.exe", 80 * MB));
        let config = TrimConfig { pids: vec![10], repeat: true, interval_secs: 1, ..Default::default() };
        let policy = TrimPolicy::from_config(&config).unwrap();
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, looping(Duration::from_millis(1)));
        let report = scheduler.run(&mut sink, std::future::pending()).await.unwrap();

        assert_eq!(report.stop, StopReason::TargetsExited);
        assert_eq!(report.passes, 2);
        assert_eq!(sink.summaries[0].trimmed, 1);
        // The other process is never targeted
        assert_eq!(sink.summaries[1].considered, 0);
        assert!(platform.requests(11).is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let platform = MockPlatform::new().with_process(MockProcess::new(1, "a.exe", 80 * MB));
        let policy = TrimPolicy::from_config(&TrimConfig::default()).unwrap();
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, looping(Duration::from_secs(3600)));
        let report = scheduler.run(&mut sink, std::future::ready(())).await.unwrap();

        assert_eq!(report.stop, StopReason::Interrupted);
        assert_eq!(report.passes, 1);
    }

    #[tokio::test]
    async fn test_one_shot_pass_error_is_returned() {
        let platform = MockPlatform::new()
            .with_foreground(Err(PlatformError::os(5, "denied")))
            .with_process(MockProcess::new(1, "a.exe", 80 * MB));
        let config = TrimConfig { exclude_foreground: true, ..Default::default() };
        let policy = TrimPolicy::from_config(&config).unwrap();
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, Schedule::once());
        let err = scheduler.run(&mut sink, std::future::pending()).await.unwrap_err();

        assert!(matches!(err, TrimError::Pass(_)));
        assert!(!err.is_configuration());
        assert!(sink.summaries.is_empty());
    }

    #[tokio::test]
    async fn test_loop_survives_pass_errors() {
        let platform = MockPlatform::new()
            .with_foreground(Ok(None))
            .with_process(MockProcess::new(10, "a.exe", 80 * MB).lives_for(1));
        let config = TrimConfig {
            pids: vec![10],
            exclude_foreground: true,
            repeat: true,
            interval_secs: 1,
            ..Default::default()
        };
        let policy = TrimPolicy::from_config(&config).unwrap();
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, looping(Duration::from_millis(1)));
        let report = scheduler.run(&mut sink, std::future::pending()).await.unwrap();

        assert_eq!(report, RunReport { passes: 0, failed_passes: 2, stop: StopReason::TargetsExited });
    }

    #[tokio::test]
    async fn test_waits_for_target_before_first_pass() {
        let platform = MockPlatform::new()
            .with_process(MockProcess::new(5, "setup.exe", 80 * MB).appears_after(2));
        let policy = TrimPolicy::from_config(&TrimConfig::default()).unwrap();
        let schedule = Schedule {
            wait_for: vec![NamePattern::parse("setup").unwrap()],
            wait_poll: Duration::from_millis(1),
            ..Schedule::once()
        };
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, schedule);
        let report = scheduler.run(&mut sink, std::future::pending()).await.unwrap();

        assert_eq!(report.passes, 1);
        // Two empty polls, the poll that found it, then the pass itself
        assert_eq!(platform.enumerations(), 4);
        assert_eq!(sink.summaries[0].trimmed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting() {
        let platform = MockPlatform::new();
        let policy = TrimPolicy::from_config(&TrimConfig::default()).unwrap();
        let schedule = Schedule {
            wait_for: vec![NamePattern::parse("never").unwrap()],
            ..Schedule::once()
        };
        let mut sink = CollectingSink::default();

        let mut scheduler = Scheduler::new(&platform, &policy, schedule);
        let report = scheduler.run(&mut sink, std::future::ready(())).await.unwrap();

        assert_eq!(report, RunReport { passes: 0, failed_passes: 0, stop: StopReason::Interrupted });
    }

    #[test]
    fn test_schedule_from_config() {
        let once = Schedule::from_config(&TrimConfig::default()).unwrap();
        assert!(once.repeat.is_none());
        assert_eq!(once.wait_poll, DEFAULT_WAIT_POLL);

        let config = TrimConfig {
            repeat: true,
            interval_secs: 2,
            wait_for: vec!["setup.*".into()],
            ..Default::default()
        };
        let schedule = Schedule::from_config(&config).unwrap();
        assert_eq!(schedule.repeat, Some(Duration::from_secs(2)));
        assert_eq!(schedule.wait_poll, Duration::from_secs(2));
        assert_eq!(schedule.wait_for.len(), 1);

        let bad = TrimConfig { wait_for: vec!["(".into()], ..Default::default() };
        assert!(Schedule::from_config(&bad).is_err());
    }
}

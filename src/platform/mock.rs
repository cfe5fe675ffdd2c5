//! In-memory platform used by unit tests

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Local};

use super::traits::*;

#[derive(Debug, Clone)]
pub struct MockProcess {
    snapshot: ProcessSnapshot,
    bounds: WorkingSetBounds,
    denied: bool,
    unreadable: bool,
    set_error: Option<PlatformError>,
    trims_to: u64,
    /// Number of enumerations the process stays alive for
    lifetime: Option<usize>,
    /// Number of enumerations before the process shows up
    hidden_for: usize,
}

impl MockProcess {
    pub fn new(pid: u32, name: &str, working_set: u64) -> Self {
        Self {
            snapshot: ProcessSnapshot {
                working_set_bytes: working_set,
                session_id: Some(1),
                ..ProcessSnapshot::new(pid, name)
            },
            bounds: WorkingSetBounds {
                min_bytes: 200 * 1024,
                max_bytes: 1380 * 1024,
                min_hardness: Hardness::Soft,
                max_hardness: Hardness::Soft,
            },
            denied: false,
            unreadable: false,
            set_error: None,
            trims_to: working_set / 2,
            lifetime: None,
            hidden_for: 0,
        }
    }

    pub fn denied(mut self) -> Self {
        self.denied = true;
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    pub fn failing_set(mut self, code: u32) -> Self {
        self.set_error = Some(PlatformError::os(code, "mock failure"));
        self
    }

    pub fn exits_on_set(mut self) -> Self {
        self.set_error = Some(PlatformError::Exited { pid: self.snapshot.pid });
        self
    }

    pub fn trims_to(mut self, bytes: u64) -> Self {
        self.trims_to = bytes;
        self
    }

    pub fn session(mut self, id: u32) -> Self {
        self.snapshot.session_id = Some(id);
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.snapshot.user = Some(user.to_string());
        self
    }

    pub fn started(mut self, at: DateTime<Local>) -> Self {
        self.snapshot.start_time = Some(at);
        self
    }

    pub fn lives_for(mut self, enumerations: usize) -> Self {
        self.lifetime = Some(enumerations);
        self
    }

    pub fn appears_after(mut self, enumerations: usize) -> Self {
        self.hidden_for = enumerations;
        self
    }
}

#[derive(Debug)]
struct MockState {
    processes: BTreeMap<u32, MockProcess>,
    requests: HashMap<u32, Vec<BoundsRequest>>,
    idle: PlatformResult<Duration>,
    foreground: PlatformResult<Option<u32>>,
    current_session: PlatformResult<u32>,
    sessions: PlatformResult<Vec<SessionInfo>>,
    priority: PriorityClass,
    priority_changes: Vec<PriorityClass>,
    enumerations: usize,
}

/// Fake host. Clones share state, so a test can keep one and hand one out.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    state: Rc<RefCell<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                processes: BTreeMap::new(),
                requests: HashMap::new(),
                idle: Ok(Duration::ZERO),
                foreground: Ok(None),
                current_session: Ok(1),
                sessions: Ok(vec![SessionInfo { id: 1, name: "Console".into(), state: SessionState::Active }]),
                priority: PriorityClass::Normal,
                priority_changes: Vec::new(),
                enumerations: 0,
            })),
        }
    }

    pub fn with_process(self, process: MockProcess) -> Self {
        self.state.borrow_mut().processes.insert(process.snapshot.pid, process);
        self
    }

    pub fn with_idle(self, idle: PlatformResult<Duration>) -> Self {
        self.state.borrow_mut().idle = idle;
        self
    }

    pub fn with_foreground(self, foreground: PlatformResult<Option<u32>>) -> Self {
        self.state.borrow_mut().foreground = foreground;
        self
    }

    pub fn with_sessions(self, current: u32, sessions: Vec<SessionInfo>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.current_session = Ok(current);
            state.sessions = Ok(sessions);
        }
        self
    }

    /// Host without terminal services: no session can be read.
    pub fn without_sessions(self) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.current_session = Err(PlatformError::NotSupported("sessions".into()));
            state.sessions = Err(PlatformError::NotSupported("sessions".into()));
        }
        self
    }

    pub fn snapshot(&self, pid: u32) -> ProcessSnapshot {
        self.state.borrow().processes[&pid].snapshot.clone()
    }

    pub fn requests(&self, pid: u32) -> Vec<BoundsRequest> {
        self.state.borrow().requests.get(&pid).cloned().unwrap_or_default()
    }

    pub fn priority_changes(&self) -> Vec<PriorityClass> {
        self.state.borrow().priority_changes.clone()
    }

    pub fn current_priority(&self) -> PriorityClass {
        self.state.borrow().priority
    }

    pub fn enumerations(&self) -> usize {
        self.state.borrow().enumerations
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

struct MockHandle {
    pid: u32,
    state: Rc<RefCell<MockState>>,
}

impl MockHandle {
    fn with_process<T>(&self, f: impl FnOnce(&mut MockProcess) -> PlatformResult<T>) -> PlatformResult<T> {
        let mut state = self.state.borrow_mut();
        match state.processes.get_mut(&self.pid) {
            Some(process) => f(process),
            None => Err(PlatformError::Exited { pid: self.pid }),
        }
    }
}

impl ProcessHandle for MockHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn bounds(&self) -> PlatformResult<WorkingSetBounds> {
        self.with_process(|p| {
            if p.unreadable {
                Err(PlatformError::os(5, "mock unreadable"))
            } else {
                Ok(p.bounds)
            }
        })
    }

    fn set_bounds(&self, request: &BoundsRequest) -> PlatformResult<()> {
        let result = self.with_process(|p| {
            if let Some(err) = &p.set_error {
                return Err(err.clone());
            }
            p.snapshot.working_set_bytes = p.trims_to;
            if let BoundsRequest::Set { min_bytes, max_bytes, min_hardness, max_hardness } = *request {
                p.bounds.min_bytes = min_bytes;
                p.bounds.max_bytes = max_bytes;
                if let Some(h) = min_hardness {
                    p.bounds.min_hardness = h;
                }
                if let Some(h) = max_hardness {
                    p.bounds.max_hardness = h;
                }
            }
            Ok(())
        });
        if result.is_ok() {
            self.state.borrow_mut().requests.entry(self.pid).or_default().push(*request);
        }
        result
    }

    fn working_set_bytes(&self) -> PlatformResult<u64> {
        self.with_process(|p| Ok(p.snapshot.working_set_bytes))
    }
}

impl ProcessEnumerator for MockPlatform {
    fn list_processes(&self, filter: &ProcessFilter) -> PlatformResult<Vec<ProcessSnapshot>> {
        let mut state = self.state.borrow_mut();
        state.enumerations += 1;
        let round = state.enumerations;
        state.processes.retain(|_, p| p.lifetime.map_or(true, |n| round <= n));

        Ok(state
            .processes
            .values()
            .filter(|p| round > p.hidden_for)
            .filter(|p| filter.accepts(p.snapshot.pid, &p.snapshot.name))
            .map(|p| p.snapshot.clone())
            .collect())
    }
}

impl WorkingSetControl for MockPlatform {
    fn open(&self, pid: u32) -> PlatformResult<Box<dyn ProcessHandle>> {
        let state = self.state.borrow();
        match state.processes.get(&pid) {
            None => Err(PlatformError::Exited { pid }),
            Some(p) if p.denied => Err(PlatformError::AccessDenied { pid }),
            Some(_) => Ok(Box::new(MockHandle { pid, state: Rc::clone(&self.state) })),
        }
    }
}

impl InputMonitor for MockPlatform {
    fn idle_time(&self) -> PlatformResult<Duration> {
        self.state.borrow().idle.clone()
    }
}

impl ForegroundResolver for MockPlatform {
    fn foreground_pid(&self) -> PlatformResult<Option<u32>> {
        self.state.borrow().foreground.clone()
    }
}

impl SessionEnumerator for MockPlatform {
    fn current_session_id(&self) -> PlatformResult<u32> {
        self.state.borrow().current_session.clone()
    }

    fn list_sessions(&self) -> PlatformResult<Vec<SessionInfo>> {
        self.state.borrow().sessions.clone()
    }
}

impl PriorityControl for MockPlatform {
    fn priority(&self) -> PlatformResult<PriorityClass> {
        Ok(self.state.borrow().priority)
    }

    fn set_priority(&self, class: PriorityClass) -> PlatformResult<()> {
        let mut state = self.state.borrow_mut();
        state.priority = class;
        state.priority_changes.push(class);
        Ok(())
    }
}

impl Platform for MockPlatform {
    fn platform_name(&self) -> &'static str {
        "mock"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn available_memory(&self) -> Option<u64> {
        None
    }
}

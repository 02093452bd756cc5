/// What the caller should do next with its timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommitStep {
    Idle,
    /// Arm (or re-arm) the timer for this absolute time.
    WaitUntil(i64),
    /// Take a snapshot and send it now.
    Send,
}

/// Debounce + single-flight bookkeeping for full-collection commits.
///
/// Time is passed in by the caller (ms), so the browser timer glue stays thin and this
/// stays testable. Invariants:
/// - at most one commit is in flight;
/// - every mutation pushes the deadline out by `debounce_ms`;
/// - a mutation during flight is committed by the next cycle, never dropped;
/// - a failed commit keeps the local state and retries after `retry_ms`.
#[derive(Clone, Debug)]
pub(crate) struct CommitScheduler {
    debounce_ms: i64,
    retry_ms: i64,
    deadline: Option<i64>,
    in_flight: bool,
    dirty: bool,
}

impl CommitScheduler {
    pub fn new(debounce_ms: i64, retry_ms: i64) -> Self {
        Self {
            debounce_ms,
            retry_ms,
            deadline: None,
            in_flight: false,
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// A mutation happened. Cancels any pending deadline and starts a new quiet period.
    pub fn touch(&mut self, now: i64) -> CommitStep {
        self.dirty = true;
        let d = now + self.debounce_ms;
        self.deadline = Some(d);
        CommitStep::WaitUntil(d)
    }

    /// Timer fired (or the caller is checking).
    pub fn poll(&mut self, now: i64) -> CommitStep {
        match self.deadline {
            None => CommitStep::Idle,
            Some(d) if now < d => CommitStep::WaitUntil(d),
            // Due, but a commit is still out; `finish` re-arms.
            Some(_) if self.in_flight => CommitStep::Idle,
            Some(_) => {
                self.deadline = None;
                self.in_flight = true;
                self.dirty = false;
                CommitStep::Send
            }
        }
    }

    /// Skip the quiet period (page hidden, connectivity back).
    pub fn flush_now(&mut self, now: i64) -> CommitStep {
        if !self.dirty {
            return CommitStep::Idle;
        }
        self.deadline = Some(now);
        self.poll(now)
    }

    /// The in-flight commit settled.
    pub fn finish(&mut self, ok: bool, now: i64) -> CommitStep {
        self.in_flight = false;

        if !ok {
            self.dirty = true;
            if self.deadline.is_none() {
                self.deadline = Some(now + self.retry_ms);
            }
        }

        match self.deadline {
            Some(d) if self.dirty => CommitStep::WaitUntil(d),
            _ => {
                self.deadline = None;
                CommitStep::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rapid_mutations_collapse_into_one_commit() {
        let mut s = CommitScheduler::new(1200, 2000);
        assert_eq!(s.touch(0), CommitStep::WaitUntil(1200));
        assert_eq!(s.touch(500), CommitStep::WaitUntil(1700));

        // The first timer fires, but the deadline moved.
        assert_eq!(s.poll(1200), CommitStep::WaitUntil(1700));
        assert_eq!(s.poll(1700), CommitStep::Send);
        assert!(s.is_in_flight());
        assert!(!s.is_dirty());

        assert_eq!(s.poll(1800), CommitStep::Idle);
        assert_eq!(s.finish(true, 1900), CommitStep::Idle);
    }

    #[test]
    fn test_mutation_during_flight_is_sent_next() {
        let mut s = CommitScheduler::new(100, 2000);
        s.touch(0);
        assert_eq!(s.poll(100), CommitStep::Send);

        s.touch(150);
        // Due while the first commit is still out: no second request.
        assert_eq!(s.poll(250), CommitStep::Idle);
        assert!(s.is_in_flight());

        assert_eq!(s.finish(true, 300), CommitStep::WaitUntil(250));
        assert_eq!(s.poll(300), CommitStep::Send);
        assert_eq!(s.finish(true, 400), CommitStep::Idle);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_failure_keeps_state_and_retries() {
        let mut s = CommitScheduler::new(100, 2000);
        s.touch(0);
        assert_eq!(s.poll(100), CommitStep::Send);

        assert_eq!(
            s.finish(false, 200),
            CommitStep::WaitUntil(2200)
        );
        assert!(s.is_dirty());

        assert_eq!(s.poll(2200), CommitStep::Send);
        assert_eq!(s.finish(true, 2300), CommitStep::Idle);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_failure_with_newer_mutation_uses_its_deadline() {
        let mut s = CommitScheduler::new(100, 2000);
        s.touch(0);
        s.poll(100);
        s.touch(120);
        assert_eq!(
            s.finish(false, 150),
            CommitStep::WaitUntil(220)
        );
    }

    #[test]
    fn test_flush_now() {
        let mut s = CommitScheduler::new(1200, 2000);
        assert_eq!(s.flush_now(0), CommitStep::Idle);

        s.touch(0);
        assert_eq!(s.flush_now(10), CommitStep::Send);
        // Already in flight: flushing again does not issue a second request.
        s.touch(20);
        assert_eq!(s.flush_now(30), CommitStep::Idle);
    }
}

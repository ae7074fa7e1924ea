use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle status of one mirror attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    New,
    Preparation,
    Transition,
    Purge,
    Completed,
    Failed,
}

/// Snapshot of the most recent mirror attempt. `progress` is meaningful
/// only in [`Status::Preparation`] and is monotone non-decreasing within
/// one attempt.
#[derive(Debug, Clone)]
pub struct Revision {
    status: Status,
    progress: Option<u8>,
    start_ts: Option<i64>,
    end_ts: Option<i64>,
    error: Option<String>,
}

impl Default for Revision {
    fn default() -> Self {
        Self {
            status: Status::New,
            progress: None,
            start_ts: None,
            end_ts: None,
            error: None,
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Revision {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn start_ts(&self) -> Option<i64> {
        self.start_ts
    }

    pub fn end_ts(&self) -> Option<i64> {
        self.end_ts
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// NEW, COMPLETED, and FAILED are the idle states `update()` may start
    /// a new attempt from.
    pub fn is_idle(&self) -> bool {
        matches!(self.status, Status::New | Status::Completed | Status::Failed)
    }

    pub fn is_transiting(&self) -> bool {
        self.status == Status::Transition
    }

    pub(crate) fn indicate_started(&mut self) {
        self.start_ts = Some(now_unix());
        self.end_ts = None;
        self.error = None;
        self.progress = Some(0);
        self.status = Status::Preparation;
    }

    pub(crate) fn set_progress(&mut self, progress: u8) {
        debug_assert!(self.status == Status::Preparation);
        self.progress = Some(progress.min(100));
    }

    pub(crate) fn indicate_prepared(&mut self) {
        self.progress = None;
        self.status = Status::Transition;
    }

    pub(crate) fn indicate_transited(&mut self) {
        self.status = Status::Purge;
    }

    pub(crate) fn indicate_completed(&mut self) {
        self.end_ts = Some(now_unix());
        self.status = Status::Completed;
    }

    pub(crate) fn indicate_failed(&mut self, error: impl Into<String>) {
        self.end_ts = Some(now_unix());
        self.error = Some(error.into());
        self.status = Status::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_happy_path() {
        let mut revision = Revision::default();
        assert!(revision.is_idle());
        revision.indicate_started();
        assert_eq!(revision.status(), Status::Preparation);
        assert_eq!(revision.progress(), Some(0));
        revision.set_progress(50);
        assert_eq!(revision.progress(), Some(50));
        revision.indicate_prepared();
        assert_eq!(revision.status(), Status::Transition);
        assert_eq!(revision.progress(), None);
        revision.indicate_transited();
        assert_eq!(revision.status(), Status::Purge);
        revision.indicate_completed();
        assert_eq!(revision.status(), Status::Completed);
        assert!(revision.end_ts().is_some());
        assert!(revision.is_idle());
    }

    #[test]
    fn failure_from_any_non_terminal_state() {
        let mut revision = Revision::default();
        revision.indicate_started();
        revision.indicate_failed("boom");
        assert_eq!(revision.status(), Status::Failed);
        assert_eq!(revision.error(), Some("boom"));
        assert!(revision.is_idle());
    }
}

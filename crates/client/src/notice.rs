//! Transient success and error banners.
//!
//! A notice stays visible until it is dismissed, replaced by a newer one, or
//! [`NOTICE_TTL`] has passed since it was raised.

use std::time::{Duration, Instant};

/// How long a notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: Instant,
}

impl Notice {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= NOTICE_TTL
    }
}

/// Holds at most one notice at a time.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
}

impl NoticeBoard {
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.raise(NoticeKind::Success, message.into(), Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.raise(NoticeKind::Error, message.into(), Instant::now());
    }

    /// Show a notice raised at `now`, replacing any current one.
    pub fn raise(&mut self, kind: NoticeKind, message: String, now: Instant) {
        self.current = Some(Notice {
            kind,
            message,
            raised_at: now,
        });
    }

    /// The visible notice at `now`. Expired notices are dropped.
    pub fn current(&mut self, now: Instant) -> Option<&Notice> {
        if self.current.as_ref().is_some_and(|notice| notice.is_expired(now)) {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_expires_after_ttl() {
        let start = Instant::now();
        let mut board = NoticeBoard::new();
        board.raise(NoticeKind::Success, "Customer added".into(), start);

        assert_eq!(
            board.current(start + Duration::from_secs(4)).unwrap().message,
            "Customer added"
        );
        assert!(board.current(start + NOTICE_TTL).is_none());
        // stays gone
        assert!(board.current(start).is_none());
    }

    #[test]
    fn test_newer_notice_replaces_older() {
        let start = Instant::now();
        let mut board = NoticeBoard::new();
        board.raise(NoticeKind::Success, "saved".into(), start);
        board.raise(NoticeKind::Error, "failed".into(), start + Duration::from_secs(3));

        let notice = board.current(start + Duration::from_secs(7)).unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "failed");
    }

    #[test]
    fn test_dismiss() {
        let mut board = NoticeBoard::new();
        board.error("boom");
        board.dismiss();
        assert!(board.current(Instant::now()).is_none());
    }
}

//! Cooperative cancellation (spec §5): every public operation accepts an
//! optional deadline, checked at each named suspension point (disk I/O,
//! embedding calls, grammar resolution). CPU-only steps never check a
//! deadline mid-computation, matching the spec's "should not suspend inside
//! a critical section" rule.

use std::time::{Duration, Instant};

use crate::error::{AstError, ErrorKind};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
    limit: Duration,
    started_at: Instant,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            expires_at: started_at + limit,
            limit,
            started_at,
        }
    }

    /// Check the deadline at a named suspension point; `TimeoutError` on expiry.
    pub fn check(&self, operation: &str) -> Result<(), AstError> {
        let now = Instant::now();
        if now >= self.expires_at {
            return Err(AstError::new(
                ErrorKind::TimeoutError {
                    operation: operation.to_string(),
                    elapsed_ms: now.duration_since(self.started_at).as_millis() as u64,
                    limit_ms: self.limit.as_millis() as u64,
                },
                0,
            ));
        }
        Ok(())
    }
}

/// No deadline configured: every check succeeds.
pub fn check_optional(deadline: Option<&Deadline>, operation: &str) -> Result<(), AstError> {
    match deadline {
        Some(d) => d.check(operation),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn expired_deadline_reports_timeout() {
        let deadline = Deadline::after(Duration::from_millis(1));
        sleep(Duration::from_millis(5));
        let err = deadline.check("parse").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TimeoutError { .. }));
    }

    #[test]
    fn fresh_deadline_passes() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert!(deadline.check("parse").is_ok());
    }

    #[test]
    fn no_deadline_always_passes() {
        assert!(check_optional(None, "parse").is_ok());
    }
}
